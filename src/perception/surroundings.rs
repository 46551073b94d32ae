//! Queryable index of what the agent can currently see.
//!
//! The index reacts to world events cheaply (incremental recasts, cache
//! relocation) and defers the expensive part, building the snapshot that
//! groups visible things by region, to [`SurroundingsIndex::hydrate`].
//! Callers that poll frequently pass a throttle so back-to-back hydrations
//! are skipped.

use super::raycaster::VisibilityRaycaster;
use super::vicinity::{classify, Direction, Vicinity};
use super::voxel_cache::VoxelCache;
use crate::constants::perception::{DEFAULT_DISTANT_RADIUS, DEFAULT_IMMEDIATE_RADIUS};
use crate::world::{BlockId, VoxelPos, WorldClient};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct SurroundingsRadii {
    pub immediate: u32,
    pub distant: u32,
}

impl Default for SurroundingsRadii {
    fn default() -> Self {
        Self {
            immediate: DEFAULT_IMMEDIATE_RADIUS,
            distant: DEFAULT_DISTANT_RADIUS,
        }
    }
}

/// Everything within the immediate radius, with full coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImmediateSurroundings {
    pub blocks_to_all_coords: BTreeMap<String, Vec<VoxelPos>>,
    pub biomes_to_closest: BTreeMap<String, VoxelPos>,
    pub items_to_all_coords: BTreeMap<String, Vec<VoxelPos>>,
}

/// Summary of one distant direction: counts plus the closest occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistantSurroundings {
    pub block_counts: BTreeMap<String, u32>,
    pub blocks_to_closest: BTreeMap<String, VoxelPos>,
    pub biomes_to_closest: BTreeMap<String, VoxelPos>,
    pub item_counts: BTreeMap<String, u32>,
    pub items_to_closest: BTreeMap<String, VoxelPos>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurroundingsSnapshot {
    pub immediate: ImmediateSurroundings,
    pub distant: BTreeMap<Direction, DistantSurroundings>,
}

pub struct SurroundingsIndex {
    radii: SurroundingsRadii,
    raycaster: VisibilityRaycaster,
    /// Last observed block type for each visible offset.
    blocks: VoxelCache<BlockId>,
    snapshot: SurroundingsSnapshot,
    last_hydration: Option<Instant>,
    last_handled_eye: Option<VoxelPos>,
}

impl SurroundingsIndex {
    pub fn new(radii: SurroundingsRadii) -> Self {
        Self {
            radii,
            raycaster: VisibilityRaycaster::new(radii.distant),
            blocks: VoxelCache::new(radii.distant),
            snapshot: SurroundingsSnapshot::default(),
            last_hydration: None,
            last_handled_eye: None,
        }
    }

    pub fn radii(&self) -> SurroundingsRadii {
        self.radii
    }

    pub fn classify_position(&self, target: VoxelPos, agent: VoxelPos) -> Option<Vicinity> {
        classify(target, agent, self.radii.immediate, self.radii.distant)
    }

    /// Full recast from the current eye position.
    pub fn refresh(&mut self, world: &dyn WorldClient) {
        let eye = world.eye_position();
        self.raycaster.update_all(world);
        self.blocks.clear();
        self.blocks.set_origin(eye);
        let origin = VoxelPos::from_world(eye);
        for offset in self.raycaster.visible_offsets() {
            if let Some(block) = world.block_at(origin + offset) {
                self.blocks.set_offset(offset, block);
            }
        }
        self.last_handled_eye = Some(origin);
        self.last_hydration = None;
    }

    /// React to agent movement. Only an eye voxel crossing triggers work.
    pub fn handle_agent_moved(&mut self, world: &dyn WorldClient) {
        let eye_voxel = VoxelPos::from_world(world.eye_position());
        if self.last_handled_eye == Some(eye_voxel) {
            return;
        }
        self.refresh(world);
    }

    /// React to a block edit with an incremental recast.
    pub fn handle_block_changed(&mut self, world: &dyn WorldClient, voxel: VoxelPos) {
        let Some(origin) = self.raycaster.origin() else {
            self.refresh(world);
            return;
        };
        self.raycaster.handle_block_changed(world, voxel);
        let offset = voxel - origin;
        if self.blocks.in_bounds(offset) {
            if self.raycaster.is_visible_offset(offset) {
                if let Some(block) = world.block_at(voxel) {
                    self.blocks.set_offset(offset, block);
                }
            } else {
                self.blocks.clear_offset(offset);
            }
        }
        self.last_hydration = None;
    }

    /// Rebuild the snapshot unless a recent hydration is still fresh.
    ///
    /// Returns whether a rebuild actually happened.
    pub fn hydrate(&mut self, world: &dyn WorldClient, throttle: Option<Duration>) -> bool {
        if let (Some(throttle), Some(last)) = (throttle, self.last_hydration) {
            if last.elapsed() < throttle {
                return false;
            }
        }
        if self.last_handled_eye.is_none() {
            self.refresh(world);
        }

        let registry = world.registry();
        let agent = VoxelPos::from_world(world.agent_position());
        let origin = match self.raycaster.origin() {
            Some(origin) => origin,
            None => return false,
        };

        let mut snapshot = SurroundingsSnapshot::default();
        for offset in self.raycaster.visible_offsets() {
            let voxel = origin + offset;
            let block = match self.blocks.get_offset(offset) {
                Some(block) => *block,
                None => match world.block_at(voxel) {
                    Some(block) => block,
                    None => continue,
                },
            };
            if block.is_air() {
                continue;
            }
            let Some(vicinity) = self.classify_position(voxel, agent) else {
                continue;
            };
            let block_name = registry.block_name(block).to_string();
            let biome_name = world
                .biome_at(voxel)
                .map(|b| registry.biome_name(b).to_string());
            match vicinity {
                Vicinity::Immediate => {
                    snapshot
                        .immediate
                        .blocks_to_all_coords
                        .entry(block_name)
                        .or_default()
                        .push(voxel);
                    if let Some(biome) = biome_name {
                        keep_closest(
                            &mut snapshot.immediate.biomes_to_closest,
                            biome,
                            voxel,
                            agent,
                        );
                    }
                }
                Vicinity::Distant(dir) => {
                    let entry = snapshot.distant.entry(dir).or_default();
                    *entry.block_counts.entry(block_name.clone()).or_insert(0) += 1;
                    keep_closest(&mut entry.blocks_to_closest, block_name, voxel, agent);
                    if let Some(biome) = biome_name {
                        keep_closest(&mut entry.biomes_to_closest, biome, voxel, agent);
                    }
                }
            }
        }

        // Item entities are small and sparse; they are classified by
        // position alone, with no occlusion test.
        for entity in world.item_entities() {
            let voxel = VoxelPos::from_world(entity.position);
            let Some(vicinity) = self.classify_position(voxel, agent) else {
                continue;
            };
            let name = registry.item_name(entity.item).to_string();
            match vicinity {
                Vicinity::Immediate => {
                    snapshot
                        .immediate
                        .items_to_all_coords
                        .entry(name)
                        .or_default()
                        .push(voxel);
                }
                Vicinity::Distant(dir) => {
                    let entry = snapshot.distant.entry(dir).or_default();
                    *entry.item_counts.entry(name.clone()).or_insert(0) += 1;
                    keep_closest(&mut entry.items_to_closest, name, voxel, agent);
                }
            }
        }

        for coords in snapshot.immediate.blocks_to_all_coords.values_mut() {
            sort_by_distance(coords, agent);
        }
        for coords in snapshot.immediate.items_to_all_coords.values_mut() {
            sort_by_distance(coords, agent);
        }

        self.snapshot = snapshot;
        self.last_hydration = Some(Instant::now());
        true
    }

    pub fn snapshot(&self) -> &SurroundingsSnapshot {
        &self.snapshot
    }

    // Queries against the last hydrated snapshot

    /// Is a block or item with this name in the immediate region?
    pub fn immediate_contains(&self, name: &str) -> bool {
        self.snapshot.immediate.blocks_to_all_coords.contains_key(name)
            || self.snapshot.immediate.items_to_all_coords.contains_key(name)
    }

    /// Distant directions in which this block or item name appears.
    pub fn distant_directions_of(&self, name: &str) -> Vec<Direction> {
        self.snapshot
            .distant
            .iter()
            .filter(|(_, entry)| {
                entry.block_counts.contains_key(name) || entry.item_counts.contains_key(name)
            })
            .map(|(dir, _)| *dir)
            .collect()
    }

    pub fn closest_in_direction(&self, name: &str, dir: Direction) -> Option<VoxelPos> {
        let entry = self.snapshot.distant.get(&dir)?;
        entry
            .blocks_to_closest
            .get(name)
            .or_else(|| entry.items_to_closest.get(name))
            .copied()
    }
}

fn squared_distance(a: VoxelPos, b: VoxelPos) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    let dz = (a.z - b.z) as i64;
    dx * dx + dy * dy + dz * dz
}

fn keep_closest(map: &mut BTreeMap<String, VoxelPos>, name: String, voxel: VoxelPos, agent: VoxelPos) {
    match map.get_mut(&name) {
        Some(current) => {
            if squared_distance(voxel, agent) < squared_distance(*current, agent) {
                *current = voxel;
            }
        }
        None => {
            map.insert(name, voxel);
        }
    }
}

fn sort_by_distance(coords: &mut [VoxelPos], agent: VoxelPos) {
    coords.sort_by_key(|v| (squared_distance(*v, agent), v.x, v.y, v.z));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::SimWorld;
    use cgmath::Point3;

    fn radii() -> SurroundingsRadii {
        SurroundingsRadii {
            immediate: 5,
            distant: 20,
        }
    }

    #[test]
    fn visible_blocks_land_in_their_regions() {
        let mut world = SimWorld::new();
        world.set_agent_position(Point3::new(0.5, 0.0, 0.5));
        world.set_block_named(VoxelPos::new(3, 0, 0), "stone");
        world.set_block_named(VoxelPos::new(15, 0, 0), "iron_ore");
        world.set_block_named(VoxelPos::new(0, 15, 0), "oak_log");

        let mut index = SurroundingsIndex::new(radii());
        index.refresh(&world);
        assert!(index.hydrate(&world, None));

        let snap = index.snapshot();
        assert_eq!(
            snap.immediate.blocks_to_all_coords.get("stone"),
            Some(&vec![VoxelPos::new(3, 0, 0)])
        );
        let east = snap.distant.get(&Direction::East).expect("east entry");
        assert_eq!(east.block_counts.get("iron_ore"), Some(&1));
        assert_eq!(
            east.blocks_to_closest.get("iron_ore"),
            Some(&VoxelPos::new(15, 0, 0))
        );
        let up = snap.distant.get(&Direction::Up).expect("up entry");
        assert_eq!(up.block_counts.get("oak_log"), Some(&1));
    }

    #[test]
    fn occluded_blocks_stay_out_of_the_snapshot() {
        let mut world = SimWorld::new();
        world.set_agent_position(Point3::new(0.5, 0.0, 0.5));
        for dy in -2..=2 {
            for dz in -2..=2 {
                world.set_block_named(VoxelPos::new(3, 1 + dy, dz), "stone");
            }
        }
        world.set_block_named(VoxelPos::new(5, 1, 0), "iron_ore");

        let mut index = SurroundingsIndex::new(radii());
        index.refresh(&world);
        index.hydrate(&world, None);

        let snap = index.snapshot();
        assert!(snap.immediate.blocks_to_all_coords.contains_key("stone"));
        assert!(!snap.immediate.blocks_to_all_coords.contains_key("iron_ore"));
        assert!(!index.immediate_contains("iron_ore"));
    }

    #[test]
    fn block_change_updates_index_incrementally() {
        let mut world = SimWorld::new();
        world.set_agent_position(Point3::new(0.5, 0.0, 0.5));
        let voxel = VoxelPos::new(3, 1, 0);
        world.set_block_named(voxel, "stone");

        let mut index = SurroundingsIndex::new(radii());
        index.refresh(&world);
        index.hydrate(&world, None);
        assert!(index.immediate_contains("stone"));

        world.set_block(voxel, BlockId::AIR);
        index.handle_block_changed(&world, voxel);
        index.hydrate(&world, None);
        assert!(!index.immediate_contains("stone"));
    }

    #[test]
    fn item_entities_are_classified_by_position() {
        let mut world = SimWorld::new();
        world.set_agent_position(Point3::new(0.5, 0.0, 0.5));
        world.spawn_item_entity("stick", Point3::new(2.5, 0.5, 0.5));
        world.spawn_item_entity("coal", Point3::new(15.5, 0.5, 0.5));

        let mut index = SurroundingsIndex::new(radii());
        index.refresh(&world);
        index.hydrate(&world, None);

        assert!(index.immediate_contains("stick"));
        assert_eq!(index.distant_directions_of("coal"), vec![Direction::East]);
        assert_eq!(
            index.closest_in_direction("coal", Direction::East),
            Some(VoxelPos::new(15, 0, 0))
        );
    }

    #[test]
    fn hydrate_is_throttled() {
        let world = SimWorld::new();
        let mut index = SurroundingsIndex::new(radii());
        index.refresh(&world);

        assert!(index.hydrate(&world, Some(Duration::from_secs(60))));
        assert!(!index.hydrate(&world, Some(Duration::from_secs(60))));
        // An explicit unthrottled hydrate always rebuilds.
        assert!(index.hydrate(&world, None));
    }

    #[test]
    fn moving_across_a_voxel_boundary_relocates_the_view() {
        let mut world = SimWorld::new();
        world.set_agent_position(Point3::new(0.5, 0.0, 0.5));
        world.set_block_named(VoxelPos::new(4, 0, 0), "stone");

        let mut index = SurroundingsIndex::new(radii());
        index.refresh(&world);
        index.hydrate(&world, None);
        assert!(index.immediate_contains("stone"));

        // Walk far enough west that the stone leaves the immediate sphere.
        world.set_agent_position(Point3::new(-8.5, 0.0, 0.5));
        index.handle_agent_moved(&world);
        index.hydrate(&world, None);
        assert!(!index.immediate_contains("stone"));
        assert_eq!(index.distant_directions_of("stone"), vec![Direction::East]);
    }
}

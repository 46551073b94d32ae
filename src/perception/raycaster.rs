//! Incremental visibility mask over the voxels around the agent's eyes.
//!
//! A fixed fan of rays is distributed over the unit sphere with the Fibonacci
//! lattice, sized so that every surface voxel at the far radius is crossed by
//! a few rays. Which voxels each ray can pass through never changes, so the
//! penetration lists and their inverse are computed once up front; a block
//! change then only recasts the rays that pass near the changed voxel instead
//! of the whole fan.
//!
//! Invariant maintained throughout: a voxel is marked visible exactly when at
//! least one ray currently terminates in it.

use super::voxel_cache::VoxelCache;
use crate::constants::perception::{
    BLOCK_CHANGE_RECAST_RING, RAYS_PER_SURFACE_VOXEL, RAY_MARCH_STEP,
};
use crate::world::{VoxelPos, WorldClient};
use cgmath::{Point3, Vector3};
use std::collections::{HashMap, HashSet};
use std::f32::consts::PI;

pub type RayId = usize;

/// Rays needed so roughly `RAYS_PER_SURFACE_VOXEL` cross each voxel of the
/// sphere's surface at the far radius.
fn ray_budget(radius: u32) -> usize {
    let r = radius as f32;
    (4.0 * PI * r * r * RAYS_PER_SURFACE_VOXEL).ceil() as usize
}

/// Evenly distributed unit directions via the Fibonacci sphere lattice.
fn fibonacci_sphere_directions(count: usize) -> Vec<Vector3<f32>> {
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f32;
            Vector3::new(ring * theta.cos(), y, ring * theta.sin())
        })
        .collect()
}

pub struct VisibilityRaycaster {
    radius: u32,
    directions: Vec<Vector3<f32>>,
    /// Per ray, the eye-relative offsets it passes through, in march order.
    penetrations: Vec<Vec<VoxelPos>>,
    /// Inverse of `penetrations`: which rays can pass through each offset.
    offset_to_rays: HashMap<VoxelPos, Vec<RayId>>,
    /// World voxel each ray currently terminates in, if any.
    ray_hits: Vec<Option<VoxelPos>>,
    /// Rays terminating in each offset. Non-empty exactly where `mask` is set.
    hits_by_voxel: VoxelCache<Vec<RayId>>,
    mask: VoxelCache<bool>,
}

impl VisibilityRaycaster {
    pub fn new(radius: u32) -> Self {
        let count = ray_budget(radius);
        let directions = fibonacci_sphere_directions(count);

        // Penetrations are sampled from the eye voxel's center, so they are
        // valid for any eye position and survive relocation unchanged.
        let eye_center = Point3::new(0.5, 0.5, 0.5);
        let mut penetrations = Vec::with_capacity(count);
        let mut offset_to_rays: HashMap<VoxelPos, Vec<RayId>> = HashMap::new();
        for (id, dir) in directions.iter().enumerate() {
            let mut offsets = Vec::new();
            let mut distance = 0.0;
            while distance <= radius as f32 {
                let point = Point3::new(
                    eye_center.x + dir.x * distance,
                    eye_center.y + dir.y * distance,
                    eye_center.z + dir.z * distance,
                );
                let offset = VoxelPos::from_world(point);
                if offsets.last() != Some(&offset) {
                    offsets.push(offset);
                    offset_to_rays.entry(offset).or_default().push(id);
                }
                distance += RAY_MARCH_STEP;
            }
            penetrations.push(offsets);
        }

        Self {
            radius,
            directions,
            penetrations,
            offset_to_rays,
            ray_hits: vec![None; count],
            hits_by_voxel: VoxelCache::new(radius),
            mask: VoxelCache::new(radius),
        }
    }

    pub fn ray_count(&self) -> usize {
        self.directions.len()
    }

    pub fn origin(&self) -> Option<VoxelPos> {
        self.mask.origin()
    }

    pub fn is_visible_offset(&self, offset: VoxelPos) -> bool {
        self.mask.get_offset(offset).copied().unwrap_or(false)
    }

    /// Eye-relative offsets currently marked visible.
    pub fn visible_offsets(&self) -> Vec<VoxelPos> {
        self.mask.iter_set_offsets().map(|(off, _)| off).collect()
    }

    /// Recast every ray from scratch at the current eye position.
    pub fn update_all(&mut self, world: &dyn WorldClient) {
        let eye = world.eye_position();
        self.mask.clear();
        self.mask.set_origin(eye);
        self.hits_by_voxel.clear();
        self.hits_by_voxel.set_origin(eye);
        for hit in self.ray_hits.iter_mut() {
            *hit = None;
        }
        let origin = VoxelPos::from_world(eye);
        for id in 0..self.directions.len() {
            self.cast_ray(world, id, origin);
        }
        log::debug!(
            "visibility recast: {} rays, {} visible voxels",
            self.ray_count(),
            self.mask.set_count()
        );
    }

    /// Recast only the rays that pass near a changed voxel.
    ///
    /// A block edit can both cut rays short and let previously blocked rays
    /// through, so the candidate set is every ray whose penetration list
    /// touches the ring around the changed voxel.
    pub fn handle_block_changed(&mut self, world: &dyn WorldClient, voxel: VoxelPos) {
        let Some(origin) = self.mask.origin() else {
            return;
        };
        let changed = voxel - origin;
        let ring = BLOCK_CHANGE_RECAST_RING;

        let mut affected: HashSet<RayId> = HashSet::new();
        for dx in -ring..=ring {
            for dy in -ring..=ring {
                for dz in -ring..=ring {
                    let probe = changed.offset(dx, dy, dz);
                    if let Some(rays) = self.offset_to_rays.get(&probe) {
                        affected.extend(rays.iter().copied());
                    }
                }
            }
        }

        let mut affected: Vec<RayId> = affected.into_iter().collect();
        affected.sort_unstable();
        log::trace!("block change at {} recasts {} rays", voxel, affected.len());
        for id in affected {
            self.remove_hit(id);
            self.cast_ray(world, id, origin);
        }
    }

    /// Walk the ray's precomputed penetration list and terminate it in the
    /// first non-air voxel.
    fn cast_ray(&mut self, world: &dyn WorldClient, id: RayId, origin: VoxelPos) {
        for &offset in &self.penetrations[id] {
            let voxel = origin + offset;
            let Some(block) = world.block_at(voxel) else {
                continue;
            };
            if block.is_air() {
                continue;
            }
            match self.hits_by_voxel.get_offset_mut(offset) {
                Some(list) => list.push(id),
                None => {
                    self.hits_by_voxel.set_offset(offset, vec![id]);
                }
            }
            self.mask.set_offset(offset, true);
            self.ray_hits[id] = Some(voxel);
            return;
        }
    }

    fn remove_hit(&mut self, id: RayId) {
        let Some(voxel) = self.ray_hits[id].take() else {
            return;
        };
        let Some(origin) = self.mask.origin() else {
            return;
        };
        let offset = voxel - origin;
        let emptied = match self.hits_by_voxel.get_offset_mut(offset) {
            Some(list) => {
                list.retain(|&r| r != id);
                list.is_empty()
            }
            None => false,
        };
        // The voxel stays visible as long as any other ray still ends there.
        if emptied {
            self.hits_by_voxel.clear_offset(offset);
            self.mask.clear_offset(offset);
        }
    }

    /// Cross-check the mask against the hit lists and per-ray records.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let visible: HashSet<VoxelPos> =
            self.mask.iter_set_offsets().map(|(off, _)| off).collect();
        let with_hits: HashSet<VoxelPos> = self
            .hits_by_voxel
            .iter_set_offsets()
            .filter(|(_, list)| !list.is_empty())
            .map(|(off, _)| off)
            .collect();
        assert_eq!(visible, with_hits, "mask and hit lists disagree");

        let origin = self.mask.origin().expect("initialized");
        for (id, hit) in self.ray_hits.iter().enumerate() {
            if let Some(voxel) = hit {
                let list = self
                    .hits_by_voxel
                    .get_offset(*voxel - origin)
                    .expect("hit voxel has a list");
                assert!(list.contains(&id), "ray {} missing from its hit list", id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::sim::SimWorld;
    use cgmath::InnerSpace;

    fn walled_world() -> SimWorld {
        let mut world = SimWorld::new();
        world.set_agent_position(Point3::new(0.5, 0.0, 0.5));
        // A wall of stone 3 voxels east of the eye, and one block hidden
        // directly behind its center.
        for dy in -2..=2 {
            for dz in -2..=2 {
                world.set_block_named(VoxelPos::new(3, 1 + dy, dz), "stone");
            }
        }
        world.set_block_named(VoxelPos::new(5, 1, 0), "iron_ore");
        world
    }

    #[test]
    fn directions_are_unit_length_and_spread() {
        let dirs = fibonacci_sphere_directions(64);
        assert_eq!(dirs.len(), 64);
        let mut up = 0;
        let mut down = 0;
        for d in &dirs {
            assert!((d.magnitude() - 1.0).abs() < 1e-4);
            if d.y > 0.0 {
                up += 1;
            } else {
                down += 1;
            }
        }
        assert_eq!(up, down);
    }

    #[test]
    fn wall_is_visible_and_block_behind_it_is_not() {
        let world = walled_world();
        let mut caster = VisibilityRaycaster::new(8);
        caster.update_all(&world);

        let origin = caster.origin().expect("origin set");
        assert!(caster.is_visible_offset(VoxelPos::new(3, 1, 0) - origin));
        assert!(!caster.is_visible_offset(VoxelPos::new(5, 1, 0) - origin));
        caster.assert_consistent();
    }

    #[test]
    fn every_hit_lies_on_its_rays_penetration_list() {
        let world = walled_world();
        let mut caster = VisibilityRaycaster::new(8);
        caster.update_all(&world);

        let origin = caster.origin().expect("origin set");
        let mut hits = 0;
        for (id, hit) in caster.ray_hits.iter().enumerate() {
            if let Some(voxel) = hit {
                assert!(
                    caster.penetrations[id].contains(&(*voxel - origin)),
                    "ray {} terminated off its penetration list",
                    id
                );
                hits += 1;
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn removing_a_wall_block_reveals_what_was_behind() {
        let mut world = walled_world();
        let mut caster = VisibilityRaycaster::new(8);
        caster.update_all(&world);

        let hole = VoxelPos::new(3, 1, 0);
        world.set_block(hole, crate::world::BlockId::AIR);
        caster.handle_block_changed(&world, hole);

        let origin = caster.origin().expect("origin set");
        assert!(!caster.is_visible_offset(hole - origin));
        assert!(caster.is_visible_offset(VoxelPos::new(5, 1, 0) - origin));
        caster.assert_consistent();
    }

    #[test]
    fn placing_a_block_in_front_occludes_incrementally() {
        let mut world = walled_world();
        let mut caster = VisibilityRaycaster::new(8);
        caster.update_all(&world);

        // Drop a block between the eye and the wall's center.
        let blocker = VoxelPos::new(2, 1, 0);
        world.set_block_named(blocker, "dirt");
        caster.handle_block_changed(&world, blocker);

        let origin = caster.origin().expect("origin set");
        assert!(caster.is_visible_offset(blocker - origin));
        caster.assert_consistent();

        // Incremental result matches a full recast.
        let mut fresh = VisibilityRaycaster::new(8);
        fresh.update_all(&world);
        let mut a = caster.visible_offsets();
        let mut b = fresh.visible_offsets();
        a.sort_unstable_by_key(|v| (v.x, v.y, v.z));
        b.sort_unstable_by_key(|v| (v.x, v.y, v.z));
        assert_eq!(a, b);
    }
}

//! Deterministic in-process world used as the test fixture.
//!
//! Blocks live in a flat voxel map, primitive actions complete after a fixed
//! number of simulation steps, and movement teleports one block per step
//! along the straight line to the goal. The simulation advances exactly once
//! per `poll_events` call, which keeps it in lockstep with the cooperative
//! scheduling turn.

use super::client::{
    ActionStatus, EquipmentSlot, ItemEntity, ItemStack, MovementStatus, WorldClient, WorldEvent,
};
use super::ray::hit_face;
use super::{BiomeId, BlockId, ItemId, Ray, RayHit, Registry, VoxelPos};
use crate::constants::perception::RAY_MARCH_STEP;
use crate::error::{AgentError, AgentResult};
use cgmath::{InnerSpace, Point3};
use std::collections::HashMap;

const DIG_STEPS: u32 = 2;
const PLACE_STEPS: u32 = 1;
const CRAFT_STEPS: u32 = 2;
const SMELT_STEPS: u32 = 3;
const EAT_STEPS: u32 = 2;
const PICKUP_STEPS: u32 = 1;

#[derive(Debug, Clone)]
enum SimAction {
    Idle,
    Dig { voxel: VoxelPos, remaining: u32 },
    Place { item: ItemId, voxel: VoxelPos, remaining: u32 },
    Craft { item: ItemId, count: u32, remaining: u32 },
    Smelt { input: ItemId, fuel: ItemId, count: u32, remaining: u32 },
    Eat { item: ItemId, remaining: u32 },
    Pickup { entity_id: u32, remaining: u32 },
}

pub struct SimWorld {
    registry: Registry,
    blocks: HashMap<VoxelPos, BlockId>,
    biomes: HashMap<VoxelPos, BiomeId>,
    default_biome: BiomeId,

    agent_pos: Point3<f32>,
    spawn_pos: Point3<f32>,
    health: f32,
    food: f32,

    inventory: Vec<ItemStack>,
    equipment: HashMap<EquipmentSlot, ItemStack>,

    goal: Option<VoxelPos>,
    movement: MovementStatus,
    action: SimAction,
    action_result: ActionStatus,

    entities: HashMap<u32, ItemEntity>,
    next_entity_id: u32,

    pending_events: Vec<WorldEvent>,

    // Scripted-outcome knobs for tests
    pub force_no_path: bool,
    pub force_movement_timeout: bool,
    pub fail_next_action: Option<String>,
    pub auto_collect_drops: bool,
    /// Kill the agent after this many more `poll_events` calls.
    pub kill_after_polls: Option<u32>,
    /// Break every tool in the inventory after this many more completed digs.
    pub consume_tool_after_digs: Option<u32>,
}

impl SimWorld {
    pub fn new() -> Self {
        let registry = Registry::new();
        let default_biome = registry.biome_id("plains").expect("plains in catalog");
        Self {
            registry,
            blocks: HashMap::new(),
            biomes: HashMap::new(),
            default_biome,
            agent_pos: Point3::new(0.5, 0.0, 0.5),
            spawn_pos: Point3::new(0.5, 0.0, 0.5),
            health: 20.0,
            food: 20.0,
            inventory: Vec::new(),
            equipment: HashMap::new(),
            goal: None,
            movement: MovementStatus::Idle,
            action: SimAction::Idle,
            action_result: ActionStatus::Idle,
            entities: HashMap::new(),
            next_entity_id: 1,
            pending_events: Vec::new(),
            force_no_path: false,
            force_movement_timeout: false,
            fail_next_action: None,
            auto_collect_drops: true,
            kill_after_polls: None,
            consume_tool_after_digs: None,
        }
    }

    // Fixture setup helpers

    pub fn set_agent_position(&mut self, pos: Point3<f32>) {
        self.agent_pos = pos;
        self.spawn_pos = pos;
    }

    pub fn set_vitals(&mut self, health: f32, food: f32) {
        self.health = health;
        self.food = food;
    }

    pub fn set_block_named(&mut self, voxel: VoxelPos, name: &str) {
        let id = self
            .registry
            .block_id(name)
            .unwrap_or_else(|| panic!("unknown block '{}'", name));
        self.set_block(voxel, id);
    }

    pub fn set_block(&mut self, voxel: VoxelPos, block: BlockId) {
        if block.is_air() {
            self.blocks.remove(&voxel);
        } else {
            self.blocks.insert(voxel, block);
        }
        self.pending_events.push(WorldEvent::BlockChanged { voxel });
    }

    pub fn set_biome(&mut self, voxel: VoxelPos, name: &str) {
        let id = self
            .registry
            .biome_id(name)
            .unwrap_or_else(|| panic!("unknown biome '{}'", name));
        self.biomes.insert(voxel, id);
    }

    pub fn give_items(&mut self, name: &str, count: u32) {
        let item = self
            .registry
            .item_id(name)
            .unwrap_or_else(|| panic!("unknown item '{}'", name));
        self.add_items(item, count);
    }

    pub fn spawn_item_entity(&mut self, name: &str, position: Point3<f32>) -> u32 {
        let item = self
            .registry
            .item_id(name)
            .unwrap_or_else(|| panic!("unknown item '{}'", name));
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.entities.insert(id, ItemEntity { id, item, position });
        id
    }

    /// Kill the agent: respawn at the spawn point and queue a death event.
    pub fn kill_agent(&mut self) {
        self.health = 20.0;
        self.food = 20.0;
        self.agent_pos = self.spawn_pos;
        self.goal = None;
        self.movement = MovementStatus::Idle;
        self.action = SimAction::Idle;
        self.action_result = ActionStatus::Idle;
        self.pending_events.push(WorldEvent::Death);
    }

    pub fn item_total(&self, name: &str) -> u32 {
        let Some(item) = self.registry.item_id(name) else {
            return 0;
        };
        self.inventory
            .iter()
            .filter(|s| s.item == item)
            .map(|s| s.count)
            .sum()
    }

    // Inventory plumbing

    fn add_items(&mut self, item: ItemId, mut count: u32) {
        for slot in self.inventory.iter_mut() {
            if count == 0 {
                break;
            }
            if slot.item == item && slot.count < 64 {
                let room = 64 - slot.count;
                let moved = room.min(count);
                slot.count += moved;
                count -= moved;
            }
        }
        while count > 0 {
            let moved = count.min(64);
            self.inventory.push(ItemStack::new(item, moved));
            count -= moved;
        }
    }

    fn remove_items(&mut self, item: ItemId, mut count: u32) -> u32 {
        let mut removed = 0;
        for slot in self.inventory.iter_mut() {
            if count == 0 {
                break;
            }
            if slot.item == item {
                let taken = slot.count.min(count);
                slot.count -= taken;
                count -= taken;
                removed += taken;
            }
        }
        self.inventory.retain(|s| s.count > 0);
        removed
    }

    fn break_tools(&mut self) {
        let tools: Vec<ItemId> = self
            .inventory
            .iter()
            .map(|s| s.item)
            .filter(|&item| {
                self.registry
                    .item(item)
                    .and_then(|def| def.tool_class)
                    .is_some()
            })
            .collect();
        if tools.is_empty() {
            return;
        }
        self.inventory.retain(|s| !tools.contains(&s.item));
        self.pending_events.push(WorldEvent::InventoryChanged);
    }

    fn total_of(&self, item: ItemId) -> u32 {
        self.inventory
            .iter()
            .filter(|s| s.item == item)
            .map(|s| s.count)
            .sum()
    }

    // Simulation stepping

    fn step_movement(&mut self) {
        let Some(goal) = self.goal else {
            return;
        };
        if self.movement != MovementStatus::Moving {
            return;
        }
        if self.force_no_path {
            self.movement = MovementStatus::NoPath;
            return;
        }
        if self.force_movement_timeout {
            self.movement = MovementStatus::TimedOut;
            return;
        }
        // Stand in the goal voxel, feet at its floor.
        let target = Point3::new(goal.x as f32 + 0.5, goal.y as f32, goal.z as f32 + 0.5);
        let delta = target - self.agent_pos;
        let dist = delta.magnitude();
        if dist <= 1.0 {
            self.agent_pos = target;
            self.movement = MovementStatus::Reached;
        } else {
            self.agent_pos += delta / dist;
        }
        self.pending_events.push(WorldEvent::AgentMoved);
    }

    fn step_action(&mut self) {
        let action = self.action.clone();
        match action {
            SimAction::Idle => {}
            SimAction::Dig { voxel, remaining } => {
                if remaining > 1 {
                    self.action = SimAction::Dig { voxel, remaining: remaining - 1 };
                    return;
                }
                let block = self.blocks.remove(&voxel).unwrap_or(BlockId::AIR);
                self.pending_events.push(WorldEvent::BlockChanged { voxel });
                if let Some(drop) = self.registry.block(block).and_then(|d| d.drop) {
                    if self.auto_collect_drops {
                        self.add_items(drop.item, drop.min_count);
                        self.pending_events.push(WorldEvent::InventoryChanged);
                    } else {
                        let item_name = self.registry.item_name(drop.item).to_string();
                        self.spawn_item_entity(&item_name, voxel.center());
                    }
                }
                match self.consume_tool_after_digs {
                    Some(n) if n <= 1 => {
                        self.consume_tool_after_digs = None;
                        self.break_tools();
                    }
                    Some(n) => self.consume_tool_after_digs = Some(n - 1),
                    None => {}
                }
                self.finish_action();
            }
            SimAction::Place { item, voxel, remaining } => {
                if remaining > 1 {
                    self.action = SimAction::Place { item, voxel, remaining: remaining - 1 };
                    return;
                }
                if self.remove_items(item, 1) == 1 {
                    let name = self.registry.item_name(item).to_string();
                    if let Some(block) = self.registry.block_id(&name) {
                        self.blocks.insert(voxel, block);
                        self.pending_events.push(WorldEvent::BlockChanged { voxel });
                    }
                    self.pending_events.push(WorldEvent::InventoryChanged);
                    self.finish_action();
                } else {
                    self.fail_action("item no longer in inventory");
                }
            }
            SimAction::Craft { item, count, remaining } => {
                if remaining > 1 {
                    self.action = SimAction::Craft { item, count, remaining: remaining - 1 };
                    return;
                }
                let Some(recipe) = self.registry.recipe_for(item).cloned() else {
                    self.fail_action("no recipe");
                    return;
                };
                let ops = count.div_ceil(recipe.output_count);
                for (ingredient, per_op) in &recipe.ingredients {
                    if self.total_of(*ingredient) < per_op * ops {
                        self.fail_action("missing ingredients");
                        return;
                    }
                }
                for (ingredient, per_op) in &recipe.ingredients {
                    self.remove_items(*ingredient, per_op * ops);
                }
                self.add_items(item, recipe.output_count * ops);
                self.pending_events.push(WorldEvent::InventoryChanged);
                self.finish_action();
            }
            SimAction::Smelt { input, fuel, count, remaining } => {
                if remaining > 1 {
                    self.action = SimAction::Smelt { input, fuel, count, remaining: remaining - 1 };
                    return;
                }
                let Some(output) = self.registry.smelting_output(input) else {
                    self.fail_action("not smeltable");
                    return;
                };
                let smeltable = self.total_of(input).min(count);
                if smeltable == 0 {
                    self.fail_action("nothing to smelt");
                    return;
                }
                let fuel_needed = smeltable.div_ceil(8);
                if self.total_of(fuel) < fuel_needed {
                    self.fail_action("not enough fuel");
                    return;
                }
                self.remove_items(input, smeltable);
                self.remove_items(fuel, fuel_needed);
                self.add_items(output, smeltable);
                self.pending_events.push(WorldEvent::InventoryChanged);
                self.finish_action();
            }
            SimAction::Eat { item, remaining } => {
                if remaining > 1 {
                    self.action = SimAction::Eat { item, remaining: remaining - 1 };
                    return;
                }
                if self.remove_items(item, 1) == 1 {
                    let points = self
                        .registry
                        .item(item)
                        .and_then(|d| d.food_points)
                        .unwrap_or(0) as f32;
                    self.food = (self.food + points).min(20.0);
                    self.health = (self.health + 4.0).min(20.0);
                    self.pending_events.push(WorldEvent::InventoryChanged);
                    self.finish_action();
                } else {
                    self.fail_action("food no longer in inventory");
                }
            }
            SimAction::Pickup { entity_id, remaining } => {
                if remaining > 1 {
                    self.action = SimAction::Pickup { entity_id, remaining: remaining - 1 };
                    return;
                }
                if let Some(entity) = self.entities.remove(&entity_id) {
                    self.add_items(entity.item, 1);
                    self.pending_events
                        .push(WorldEvent::ItemEntityGone { id: entity_id });
                    self.pending_events.push(WorldEvent::InventoryChanged);
                    self.finish_action();
                } else {
                    self.fail_action("item entity despawned");
                }
            }
        }
    }

    fn finish_action(&mut self) {
        self.action = SimAction::Idle;
        self.action_result = ActionStatus::Completed;
    }

    fn fail_action(&mut self, reason: &str) {
        self.action = SimAction::Idle;
        self.action_result = ActionStatus::Failed(reason.to_string());
    }

    fn begin_action(&mut self, action: SimAction) -> AgentResult<()> {
        if !matches!(self.action, SimAction::Idle) {
            return Err(AgentError::Action(
                "another primitive action is already in flight".into(),
            ));
        }
        if let Some(reason) = self.fail_next_action.take() {
            self.action_result = ActionStatus::Failed(reason);
            return Ok(());
        }
        self.action = action;
        self.action_result = ActionStatus::InProgress;
        Ok(())
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldClient for SimWorld {
    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn agent_position(&self) -> Point3<f32> {
        self.agent_pos
    }

    fn health(&self) -> f32 {
        self.health
    }

    fn food(&self) -> f32 {
        self.food
    }

    fn block_at(&self, voxel: VoxelPos) -> Option<BlockId> {
        Some(self.blocks.get(&voxel).copied().unwrap_or(BlockId::AIR))
    }

    fn biome_at(&self, voxel: VoxelPos) -> Option<BiomeId> {
        Some(self.biomes.get(&voxel).copied().unwrap_or(self.default_biome))
    }

    fn raycast(&self, ray: Ray, max_distance: f32) -> Option<RayHit> {
        let mut distance = 0.0;
        while distance <= max_distance {
            let point = Point3::new(
                ray.origin.x + ray.direction.x * distance,
                ray.origin.y + ray.direction.y * distance,
                ray.origin.z + ray.direction.z * distance,
            );
            let voxel = VoxelPos::from_world(point);
            if let Some(&block) = self.blocks.get(&voxel) {
                return Some(RayHit {
                    position: voxel,
                    intersection: point,
                    face: hit_face(point, voxel),
                    distance,
                    block,
                });
            }
            distance += RAY_MARCH_STEP;
        }
        None
    }

    fn item_entities(&self) -> Vec<ItemEntity> {
        let mut entities: Vec<ItemEntity> = self.entities.values().copied().collect();
        entities.sort_by_key(|e| e.id);
        entities
    }

    fn inventory_slots(&self) -> Vec<ItemStack> {
        self.inventory.clone()
    }

    fn equipment(&self) -> Vec<(EquipmentSlot, Option<ItemStack>)> {
        EquipmentSlot::ALL
            .iter()
            .map(|slot| (*slot, self.equipment.get(slot).copied()))
            .collect()
    }

    fn equip(&mut self, item: ItemId, slot: EquipmentSlot) -> AgentResult<()> {
        if self.total_of(item) == 0 {
            return Err(AgentError::Action(format!(
                "cannot equip '{}': not in inventory",
                self.registry.item_name(item)
            )));
        }
        self.equipment.insert(slot, ItemStack::new(item, 1));
        Ok(())
    }

    fn set_movement_goal(&mut self, target: VoxelPos) -> AgentResult<()> {
        self.goal = Some(target);
        self.movement = MovementStatus::Moving;
        Ok(())
    }

    fn clear_movement_goal(&mut self) {
        self.goal = None;
        self.movement = MovementStatus::Idle;
    }

    fn movement_status(&self) -> MovementStatus {
        self.movement
    }

    fn start_dig(&mut self, voxel: VoxelPos) -> AgentResult<()> {
        if self.blocks.get(&voxel).is_none() {
            return Err(AgentError::Action(format!("no block to dig at {}", voxel)));
        }
        self.begin_action(SimAction::Dig { voxel, remaining: DIG_STEPS })
    }

    fn start_place(&mut self, item: ItemId, voxel: VoxelPos) -> AgentResult<()> {
        self.begin_action(SimAction::Place { item, voxel, remaining: PLACE_STEPS })
    }

    fn start_craft(&mut self, item: ItemId, count: u32) -> AgentResult<()> {
        self.begin_action(SimAction::Craft { item, count, remaining: CRAFT_STEPS })
    }

    fn start_smelt(&mut self, input: ItemId, fuel: ItemId, count: u32) -> AgentResult<()> {
        self.begin_action(SimAction::Smelt { input, fuel, count, remaining: SMELT_STEPS })
    }

    fn start_eat(&mut self, item: ItemId) -> AgentResult<()> {
        self.begin_action(SimAction::Eat { item, remaining: EAT_STEPS })
    }

    fn start_pickup(&mut self, entity_id: u32) -> AgentResult<()> {
        self.begin_action(SimAction::Pickup { entity_id, remaining: PICKUP_STEPS })
    }

    fn cancel_action(&mut self) {
        self.action = SimAction::Idle;
        self.action_result = ActionStatus::Idle;
    }

    fn action_status(&self) -> ActionStatus {
        self.action_result.clone()
    }

    fn capture_screenshot(&mut self, target: VoxelPos) -> AgentResult<String> {
        Ok(format!(
            "screenshots/shot_{}_{}_{}.png",
            target.x, target.y, target.z
        ))
    }

    fn poll_events(&mut self) -> Vec<WorldEvent> {
        match self.kill_after_polls {
            Some(0) | Some(1) => {
                self.kill_after_polls = None;
                self.kill_agent();
            }
            Some(n) => self.kill_after_polls = Some(n - 1),
            None => {
                self.step_movement();
                self.step_action();
            }
        }
        std::mem::take(&mut self.pending_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raycast_hits_nearest_block_along_ray() {
        let mut world = SimWorld::new();
        world.set_block_named(VoxelPos::new(5, 0, 0), "stone");
        world.set_block_named(VoxelPos::new(8, 0, 0), "dirt");

        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), cgmath::Vector3::new(1.0, 0.0, 0.0));
        let hit = world.raycast(ray, 20.0).expect("should hit stone");
        assert_eq!(hit.position, VoxelPos::new(5, 0, 0));
        assert_eq!(world.registry().block_name(hit.block), "stone");
    }

    #[test]
    fn raycast_misses_when_nothing_in_range() {
        let world = SimWorld::new();
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), cgmath::Vector3::new(0.0, 1.0, 0.0));
        assert!(world.raycast(ray, 10.0).is_none());
    }

    #[test]
    fn dig_completes_and_collects_drop() {
        let mut world = SimWorld::new();
        let voxel = VoxelPos::new(1, 0, 0);
        world.set_block_named(voxel, "oak_log");
        world.poll_events();

        world.start_dig(voxel).expect("dig starts");
        assert_eq!(world.action_status(), ActionStatus::InProgress);
        for _ in 0..DIG_STEPS {
            world.poll_events();
        }
        assert_eq!(world.action_status(), ActionStatus::Completed);
        assert_eq!(world.block_at(voxel), Some(BlockId::AIR));
        assert_eq!(world.item_total("oak_log"), 1);
    }

    #[test]
    fn movement_walks_toward_goal_and_reaches_it() {
        let mut world = SimWorld::new();
        world.set_movement_goal(VoxelPos::new(4, 0, 0)).expect("goal set");
        for _ in 0..8 {
            world.poll_events();
        }
        assert_eq!(world.movement_status(), MovementStatus::Reached);
        assert_eq!(VoxelPos::from_world(world.agent_position()), VoxelPos::new(4, 0, 0));
    }

    #[test]
    fn scripted_no_path_is_reported() {
        let mut world = SimWorld::new();
        world.force_no_path = true;
        world.set_movement_goal(VoxelPos::new(10, 64, 10)).expect("goal set");
        world.poll_events();
        assert_eq!(world.movement_status(), MovementStatus::NoPath);
    }
}

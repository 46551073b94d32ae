//! The collaborator interface to the low-level world/protocol client.
//!
//! Primitive actions are asynchronous: a skill starts one, then polls its
//! status across cooperative turns. At most one primitive action is in
//! flight at a time, matching the single-threaded execution model.

use super::{BiomeId, BlockId, ItemId, Ray, RayHit, Registry, VoxelPos};
use crate::error::AgentResult;
use cgmath::Point3;
use serde::{Deserialize, Serialize};

/// One inventory slot's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStack {
    pub item: ItemId,
    pub count: u32,
    /// Durability already spent, for items that have durability.
    pub durability_used: Option<u32>,
}

impl ItemStack {
    pub fn new(item: ItemId, count: u32) -> Self {
        Self {
            item,
            count,
            durability_used: None,
        }
    }
}

/// Equipment destinations, in the wire order the controller sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EquipmentSlot {
    #[serde(rename = "hand")]
    Hand,
    #[serde(rename = "off-hand")]
    OffHand,
    #[serde(rename = "feet")]
    Feet,
    #[serde(rename = "legs")]
    Legs,
    #[serde(rename = "torso")]
    Torso,
    #[serde(rename = "head")]
    Head,
}

impl EquipmentSlot {
    pub const ALL: [EquipmentSlot; 6] = [
        EquipmentSlot::Hand,
        EquipmentSlot::OffHand,
        EquipmentSlot::Feet,
        EquipmentSlot::Legs,
        EquipmentSlot::Torso,
        EquipmentSlot::Head,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            EquipmentSlot::Hand => "hand",
            EquipmentSlot::OffHand => "off-hand",
            EquipmentSlot::Feet => "feet",
            EquipmentSlot::Legs => "legs",
            EquipmentSlot::Torso => "torso",
            EquipmentSlot::Head => "head",
        }
    }
}

/// A dropped item floating in the world.
#[derive(Debug, Clone, Copy)]
pub struct ItemEntity {
    pub id: u32,
    pub item: ItemId,
    pub position: Point3<f32>,
}

/// Status of the movement goal, polled once per cooperative turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementStatus {
    /// No goal set.
    Idle,
    Moving,
    Reached,
    NoPath,
    TimedOut,
}

/// Status of the single in-flight primitive action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Idle,
    InProgress,
    Completed,
    Failed(String),
}

/// World mutations and agent lifecycle notifications, drained once per turn.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// A block appeared, disappeared, or changed type.
    BlockChanged { voxel: VoxelPos },
    /// The agent's position changed since the last poll.
    AgentMoved,
    /// An inventory slot changed.
    InventoryChanged,
    /// An item entity despawned or was collected.
    ItemEntityGone { id: u32 },
    /// The agent died and respawned.
    Death,
}

/// Everything the agent core may ask of the world.
pub trait WorldClient {
    fn registry(&self) -> &Registry;

    // Observation

    fn agent_position(&self) -> Point3<f32>;

    fn eye_position(&self) -> Point3<f32> {
        let p = self.agent_position();
        Point3::new(p.x, p.y + crate::constants::agent::EYE_HEIGHT, p.z)
    }

    fn health(&self) -> f32;
    fn food(&self) -> f32;

    fn block_at(&self, voxel: VoxelPos) -> Option<BlockId>;
    fn biome_at(&self, voxel: VoxelPos) -> Option<BiomeId>;

    /// Nearest non-air block struck along the ray, if any.
    fn raycast(&self, ray: Ray, max_distance: f32) -> Option<RayHit>;

    fn item_entities(&self) -> Vec<ItemEntity>;
    fn inventory_slots(&self) -> Vec<ItemStack>;
    fn equipment(&self) -> Vec<(EquipmentSlot, Option<ItemStack>)>;

    // Primitive actions

    fn equip(&mut self, item: ItemId, slot: EquipmentSlot) -> AgentResult<()>;

    fn set_movement_goal(&mut self, target: VoxelPos) -> AgentResult<()>;
    fn clear_movement_goal(&mut self);
    fn movement_status(&self) -> MovementStatus;

    fn start_dig(&mut self, voxel: VoxelPos) -> AgentResult<()>;
    fn start_place(&mut self, item: ItemId, voxel: VoxelPos) -> AgentResult<()>;
    fn start_craft(&mut self, item: ItemId, count: u32) -> AgentResult<()>;
    fn start_smelt(&mut self, input: ItemId, fuel: ItemId, count: u32) -> AgentResult<()>;
    fn start_eat(&mut self, item: ItemId) -> AgentResult<()>;
    fn start_pickup(&mut self, entity_id: u32) -> AgentResult<()>;

    /// Cancel the in-flight primitive action, if any. Safe to call when idle.
    fn cancel_action(&mut self);
    fn action_status(&self) -> ActionStatus;

    /// Render a screenshot centered on the target; returns the saved path.
    fn capture_screenshot(&mut self, target: VoxelPos) -> AgentResult<String>;

    /// Drain pending world events. Called exactly once per cooperative turn;
    /// implementations may advance their simulation here.
    fn poll_events(&mut self) -> Vec<WorldEvent>;
}

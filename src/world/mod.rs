//! World boundary module
//!
//! Everything the agent core knows about the world it is embodied in passes
//! through here: fundamental voxel/block data types, the name catalog, the
//! `WorldClient` collaborator trait, and the deterministic `SimWorld`
//! fixture that implements it for tests.

mod block;
mod client;
mod position;
mod ray;
mod registry;

pub mod sim;

pub use block::{BiomeId, BlockId, ItemId, ToolClass};
pub use client::{
    ActionStatus, EquipmentSlot, ItemEntity, ItemStack, MovementStatus, WorldClient, WorldEvent,
};
pub use position::VoxelPos;
pub use ray::{BlockFace, Ray, RayHit};
pub use registry::{BlockDef, ItemDef, Recipe, Registry, Thing, SUPPORTED_THING_TYPES};

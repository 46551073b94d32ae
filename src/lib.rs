//! Voxel Agent - embodied agent core for a live voxel world
//!
//! Two subsystems form the core:
//!
//! - **Perception**: budgeted visibility raycasting into eye-relative voxel
//!   caches, classified into 11 named vicinity regions and exposed as a
//!   throttled surroundings snapshot.
//! - **Orchestration**: a cooperative, single-threaded skill state machine
//!   driven by an external controller over a duplex message channel, with
//!   pause/resume/stop semantics, timeouts, inventory deltas, and death
//!   recovery.
//!
//! The low-level world/protocol client is a collaborator behind the
//! `WorldClient` trait; `world::sim::SimWorld` is the deterministic
//! in-process implementation used by the tests.

// Constants module
pub mod constants;

// Core modules
pub mod error;
pub mod events;

// World boundary (collaborator interfaces + fixture implementation)
pub mod world;

// Perception engine
pub mod perception;

// Environment state reporting
pub mod env_state;

// Skills and their shared lifecycle contract
pub mod skills;

// Controller-facing orchestration
pub mod orchestrator;

pub use error::AgentError;
pub use events::{EventBus, EventFilter, Subscription};
pub use perception::{
    Direction, SurroundingsIndex, SurroundingsRadii, SurroundingsSnapshot, Vicinity,
    VisibilityRaycaster, VoxelCache,
};
pub use skills::{Skill, SkillContext, SkillResult, SkillStatus, StepOutcome};
pub use world::{
    BiomeId, BlockId, ItemId, ItemStack, Ray, RayHit, Registry, Thing, VoxelPos, WorldClient,
    WorldEvent,
};

pub use orchestrator::{AgentReport, ControllerChannel, PairChannel, SkillOrchestrator};

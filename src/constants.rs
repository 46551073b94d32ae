//! Central constants for the agent core.
//!
//! Grouped by subsystem so call sites read as `constants::agent::EYE_HEIGHT`.

/// Agent body constants
pub mod agent {
    /// Eye height above the agent's feet position, in blocks.
    /// Variation from crouching/riding is not accounted for.
    pub const EYE_HEIGHT: f32 = 1.62;

    /// Maximum distance at which the agent can dig or place a block.
    pub const MAX_REACH: f32 = 4.5;

    /// Vanilla maximum health and hunger.
    pub const MAX_HEALTH: f32 = 20.0;
    pub const MAX_FOOD: f32 = 20.0;
}

/// Perception engine constants
pub mod perception {
    /// Default radius of the immediate-surroundings sphere, in blocks.
    pub const DEFAULT_IMMEDIATE_RADIUS: u32 = 5;

    /// Default radius of the distant-surroundings sphere, in blocks.
    pub const DEFAULT_DISTANT_RADIUS: u32 = 20;

    /// Managed-ray budget per voxel of sphere surface area. The total
    /// direction count is `ceil(4 * PI * r^2 * RAYS_PER_SURFACE_VOXEL)` so
    /// ray density tracks the radius of interest.
    pub const RAYS_PER_SURFACE_VOXEL: f32 = 4.0;

    /// Step length used when sampling a ray's voxel penetrations.
    pub const RAY_MARCH_STEP: f32 = 0.1;

    /// Ring radius (in voxels) re-cast around a single changed block.
    pub const BLOCK_CHANGE_RECAST_RING: i32 = 1;

    /// Default hydration throttle for opportunistic readers.
    pub const DEFAULT_HYDRATION_THROTTLE_MS: u64 = 1000;
}

/// World coordinate limits
pub mod world {
    pub const COORD_LIMIT_XZ: i32 = 30_000_000;
    pub const MIN_Y: i32 = -64;
    pub const MAX_Y: i32 = 320;
}

/// Orchestration constants
pub mod orchestration {
    /// Non-blocking sleep between iterations of the main polling loop.
    pub const POLL_DELAY_MS: u64 = 10;

    /// Wall-clock budget for a skill invocation unless the skill overrides it.
    pub const DEFAULT_SKILL_TIMEOUT_MS: u64 = 40_000;

    /// Cadence of the self-preservation check.
    pub const SELF_PRESERVATION_THROTTLE_MS: u64 = 5_000;

    /// Health below which the self-preserver will eat if food is on hand.
    pub const LOW_HEALTH_THRESHOLD: f32 = 8.0;

    /// Upper bound on cooperative steps a preservation action may take
    /// before it is abandoned.
    pub const MAX_PRESERVATION_STEPS: u32 = 256;
}

/// Skill-specific constants
pub mod skills {
    /// Hydration throttle for per-move stop-if-found checks during
    /// pathfinding.
    pub const STOP_IF_FOUND_CHECK_THROTTLE_MS: u64 = 1_800;

    pub const PATHFIND_TIMEOUT_MS: u64 = 25_000;
    pub const APPROACH_TIMEOUT_MS: u64 = 23_000;
    pub const MINE_BLOCKS_TIMEOUT_MS: u64 = 38_000;
    pub const GET_PLACEABLE_TIMEOUT_MS: u64 = 2_000;
}

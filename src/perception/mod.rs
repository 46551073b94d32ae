//! Perception: visibility raycasting, region classification, and the
//! queryable surroundings index built from them.

mod raycaster;
mod surroundings;
mod vicinity;
mod voxel_cache;

pub use raycaster::{RayId, VisibilityRaycaster};
pub use surroundings::{
    DistantSurroundings, ImmediateSurroundings, SurroundingsIndex, SurroundingsRadii,
    SurroundingsSnapshot,
};
pub use vicinity::{classify, Direction, Vicinity};
pub use voxel_cache::VoxelCache;

use super::{BlockId, VoxelPos};
use cgmath::{InnerSpace, Point3, Vector3};

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFace {
    East,   // +X
    West,   // -X
    Top,    // +Y
    Bottom, // -Y
    South,  // +Z
    North,  // -Z
}

impl BlockFace {
    pub const ALL: [BlockFace; 6] = [
        BlockFace::East,
        BlockFace::West,
        BlockFace::Top,
        BlockFace::Bottom,
        BlockFace::South,
        BlockFace::North,
    ];

    pub fn offset(&self) -> VoxelPos {
        match self {
            BlockFace::East => VoxelPos::new(1, 0, 0),
            BlockFace::West => VoxelPos::new(-1, 0, 0),
            BlockFace::Top => VoxelPos::new(0, 1, 0),
            BlockFace::Bottom => VoxelPos::new(0, -1, 0),
            BlockFace::South => VoxelPos::new(0, 0, 1),
            BlockFace::North => VoxelPos::new(0, 0, -1),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Voxel of the block that was struck.
    pub position: VoxelPos,
    /// Point along the ray where the strike was registered.
    pub intersection: Point3<f32>,
    pub face: BlockFace,
    pub distance: f32,
    pub block: BlockId,
}

/// Calculate which face of a block was hit from the relative position of the
/// strike point within the voxel.
pub(crate) fn hit_face(hit_point: Point3<f32>, voxel: VoxelPos) -> BlockFace {
    let rel_x = hit_point.x - voxel.x as f32;
    let rel_y = hit_point.y - voxel.y as f32;
    let rel_z = hit_point.z - voxel.z as f32;

    let distances = [
        (rel_x, BlockFace::West),
        (1.0 - rel_x, BlockFace::East),
        (rel_y, BlockFace::Bottom),
        (1.0 - rel_y, BlockFace::Top),
        (rel_z, BlockFace::North),
        (1.0 - rel_z, BlockFace::South),
    ];

    distances
        .iter()
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(_, face)| *face)
        .unwrap_or(BlockFace::Top)
}

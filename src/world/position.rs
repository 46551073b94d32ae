use cgmath::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Integer-aligned voxel coordinate, addressed by its floored world position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Voxel containing a real-valued world position.
    pub fn from_world(p: Point3<f32>) -> Self {
        Self {
            x: p.x.floor() as i32,
            y: p.y.floor() as i32,
            z: p.z.floor() as i32,
        }
    }

    /// Center point of this voxel in world space.
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            self.x as f32 + 0.5,
            self.y as f32 + 0.5,
            self.z as f32 + 0.5,
        )
    }

    /// Minimum corner of this voxel in world space.
    pub fn min_corner(&self) -> Point3<f32> {
        Point3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Euclidean distance between voxel corners.
    pub fn distance_to(&self, other: VoxelPos) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        let dz = (self.z - other.z) as f32;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for VoxelPos {
    type Output = VoxelPos;

    fn add(self, rhs: VoxelPos) -> VoxelPos {
        VoxelPos::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for VoxelPos {
    type Output = VoxelPos;

    fn sub(self, rhs: VoxelPos) -> VoxelPos {
        VoxelPos::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for VoxelPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_world_floors_negative_coordinates() {
        let v = VoxelPos::from_world(Point3::new(-0.5, 2.9, -3.0));
        assert_eq!(v, VoxelPos::new(-1, 2, -3));
    }

    #[test]
    fn center_is_half_block_offset() {
        let c = VoxelPos::new(1, -2, 0).center();
        assert_eq!(c, Point3::new(1.5, -1.5, 0.5));
    }
}

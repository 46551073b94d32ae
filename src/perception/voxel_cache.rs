//! Flat cache of values for the cube of voxels around the agent's eyes.
//!
//! Storage is addressed by offset from the eye voxel, so moving the agent
//! does not invalidate the whole cache: [`VoxelCache::relocate`] shifts the
//! surviving entries to their new offsets and drops the ones that fall out
//! of range. World-coordinate accessors double-check that the caller's idea
//! of the eye position still matches the cache's, turning silent staleness
//! into a hard error.

use crate::error::{AgentError, AgentResult};
use crate::world::VoxelPos;
use cgmath::Point3;
use std::collections::HashSet;

pub struct VoxelCache<T> {
    radius: i32,
    dimension: usize,
    cells: Vec<Option<T>>,
    set_indices: HashSet<usize>,
    eye_pos_at_last_update: Option<Point3<f32>>,
}

impl<T> VoxelCache<T> {
    pub fn new(radius: u32) -> Self {
        let radius = radius as i32;
        let dimension = (2 * radius + 1) as usize;
        let len = dimension * dimension * dimension;
        let mut cells = Vec::with_capacity(len);
        cells.resize_with(len, || None);
        Self {
            radius,
            dimension,
            cells,
            set_indices: HashSet::new(),
            eye_pos_at_last_update: None,
        }
    }

    pub fn radius(&self) -> u32 {
        self.radius as u32
    }

    /// Eye voxel the offsets are currently relative to.
    pub fn origin(&self) -> Option<VoxelPos> {
        self.eye_pos_at_last_update.map(VoxelPos::from_world)
    }

    pub fn set_origin(&mut self, eye_pos: Point3<f32>) {
        self.eye_pos_at_last_update = Some(eye_pos);
    }

    pub fn in_bounds(&self, offset: VoxelPos) -> bool {
        offset.x.abs() <= self.radius
            && offset.y.abs() <= self.radius
            && offset.z.abs() <= self.radius
    }

    fn index_of(&self, offset: VoxelPos) -> Option<usize> {
        if !self.in_bounds(offset) {
            return None;
        }
        let d = self.dimension;
        let x = (offset.x + self.radius) as usize;
        let y = (offset.y + self.radius) as usize;
        let z = (offset.z + self.radius) as usize;
        Some((x * d + y) * d + z)
    }

    fn offset_of(&self, index: usize) -> VoxelPos {
        let d = self.dimension;
        let z = (index % d) as i32 - self.radius;
        let y = ((index / d) % d) as i32 - self.radius;
        let x = (index / (d * d)) as i32 - self.radius;
        VoxelPos::new(x, y, z)
    }

    // Offset-addressed accessors

    pub fn get_offset(&self, offset: VoxelPos) -> Option<&T> {
        let idx = self.index_of(offset)?;
        self.cells[idx].as_ref()
    }

    pub fn get_offset_mut(&mut self, offset: VoxelPos) -> Option<&mut T> {
        let idx = self.index_of(offset)?;
        self.cells[idx].as_mut()
    }

    /// Store a value; returns false when the offset is out of range.
    pub fn set_offset(&mut self, offset: VoxelPos, value: T) -> bool {
        match self.index_of(offset) {
            Some(idx) => {
                self.cells[idx] = Some(value);
                self.set_indices.insert(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear_offset(&mut self, offset: VoxelPos) -> Option<T> {
        let idx = self.index_of(offset)?;
        self.set_indices.remove(&idx);
        self.cells[idx].take()
    }

    // World-addressed accessors. These verify the caller's eye position
    // against the one recorded at the last update.

    fn offset_for_world(&self, voxel: VoxelPos, eye_pos: Point3<f32>) -> AgentResult<VoxelPos> {
        let recorded = self.eye_pos_at_last_update.ok_or_else(|| {
            AgentError::StaleCacheReference {
                expected: "an initialized origin".to_string(),
                actual: "none".to_string(),
            }
        })?;
        let recorded_voxel = VoxelPos::from_world(recorded);
        let caller_voxel = VoxelPos::from_world(eye_pos);
        if recorded_voxel != caller_voxel {
            return Err(AgentError::StaleCacheReference {
                expected: recorded_voxel.to_string(),
                actual: caller_voxel.to_string(),
            });
        }
        Ok(voxel - recorded_voxel)
    }

    pub fn get_world(&self, voxel: VoxelPos, eye_pos: Point3<f32>) -> AgentResult<Option<&T>> {
        let offset = self.offset_for_world(voxel, eye_pos)?;
        Ok(self.get_offset(offset))
    }

    pub fn set_world(
        &mut self,
        voxel: VoxelPos,
        eye_pos: Point3<f32>,
        value: T,
    ) -> AgentResult<bool> {
        let offset = self.offset_for_world(voxel, eye_pos)?;
        Ok(self.set_offset(offset, value))
    }

    pub fn clear_world(&mut self, voxel: VoxelPos, eye_pos: Point3<f32>) -> AgentResult<Option<T>> {
        let offset = self.offset_for_world(voxel, eye_pos)?;
        Ok(self.clear_offset(offset))
    }

    /// Move the origin to a new eye position, shifting surviving entries.
    ///
    /// Entries whose shifted offset falls outside the cube are dropped.
    /// Returns the offset shift applied, or `None` when the eye stayed in
    /// the same voxel (entries untouched).
    pub fn relocate(&mut self, new_eye_pos: Point3<f32>) -> Option<VoxelPos> {
        let prev = match self.eye_pos_at_last_update {
            Some(prev) => prev,
            None => {
                self.eye_pos_at_last_update = Some(new_eye_pos);
                return None;
            }
        };
        let prev_voxel = VoxelPos::from_world(prev);
        let new_voxel = VoxelPos::from_world(new_eye_pos);
        self.eye_pos_at_last_update = Some(new_eye_pos);
        if prev_voxel == new_voxel {
            return None;
        }

        let shift = prev_voxel - new_voxel;
        let mut moved = Vec::with_capacity(self.set_indices.len());
        let indices: Vec<usize> = self.set_indices.drain().collect();
        for idx in indices {
            let dest = self.offset_of(idx) + shift;
            if let Some(value) = self.cells[idx].take() {
                if self.in_bounds(dest) {
                    moved.push((dest, value));
                }
            }
        }
        for (dest, value) in moved {
            self.set_offset(dest, value);
        }
        Some(shift)
    }

    pub fn set_count(&self) -> usize {
        self.set_indices.len()
    }

    /// Offsets that currently hold a value, in no particular order.
    pub fn iter_set_offsets(&self) -> impl Iterator<Item = (VoxelPos, &T)> + '_ {
        self.set_indices.iter().filter_map(move |&idx| {
            self.cells[idx]
                .as_ref()
                .map(|value| (self.offset_of(idx), value))
        })
    }

    /// Every offset in the cube, set or not.
    pub fn iter_all_offsets(&self) -> impl Iterator<Item = VoxelPos> + '_ {
        (0..self.cells.len()).map(move |idx| self.offset_of(idx))
    }

    pub fn clear(&mut self) {
        for idx in self.set_indices.drain() {
            self.cells[idx] = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_round_trip_and_bounds() {
        let mut cache: VoxelCache<u32> = VoxelCache::new(2);
        assert!(cache.set_offset(VoxelPos::new(-2, 1, 2), 7));
        assert_eq!(cache.get_offset(VoxelPos::new(-2, 1, 2)), Some(&7));
        assert!(!cache.set_offset(VoxelPos::new(3, 0, 0), 9));
        assert_eq!(cache.set_count(), 1);
    }

    #[test]
    fn world_access_requires_matching_eye_voxel() {
        let mut cache: VoxelCache<&str> = VoxelCache::new(3);
        let eye = Point3::new(10.3, 65.62, -4.7);
        cache.set_origin(eye);
        cache
            .set_world(VoxelPos::new(11, 65, -5), eye, "stone")
            .expect("same eye voxel");

        // Sub-voxel wiggle is fine.
        let wiggled = Point3::new(10.9, 65.1, -4.2);
        assert_eq!(
            cache.get_world(VoxelPos::new(11, 65, -5), wiggled).ok(),
            Some(Some(&"stone"))
        );

        // Crossing a voxel boundary is not.
        let moved = Point3::new(12.1, 65.62, -4.7);
        assert!(matches!(
            cache.get_world(VoxelPos::new(11, 65, -5), moved),
            Err(AgentError::StaleCacheReference { .. })
        ));
    }

    #[test]
    fn relocate_shifts_entries_and_drops_out_of_range() {
        let mut cache: VoxelCache<char> = VoxelCache::new(2);
        cache.set_origin(Point3::new(0.5, 0.5, 0.5));
        cache.set_offset(VoxelPos::new(2, 0, 0), 'a');
        cache.set_offset(VoxelPos::new(-2, 0, 0), 'b');

        // Eye moves one voxel east: offsets shift one voxel west.
        let shift = cache.relocate(Point3::new(1.5, 0.5, 0.5));
        assert_eq!(shift, Some(VoxelPos::new(-1, 0, 0)));
        assert_eq!(cache.get_offset(VoxelPos::new(1, 0, 0)), Some(&'a'));
        // 'b' shifted to x = -3, outside the cube.
        assert_eq!(cache.set_count(), 1);

        // Same world voxel is still reachable through the new origin.
        let eye = Point3::new(1.5, 0.5, 0.5);
        assert_eq!(
            cache.get_world(VoxelPos::new(2, 0, 0), eye).ok(),
            Some(Some(&'a'))
        );
    }

    #[test]
    fn relocate_within_same_voxel_is_a_no_op() {
        let mut cache: VoxelCache<u8> = VoxelCache::new(1);
        cache.set_origin(Point3::new(0.2, 0.2, 0.2));
        cache.set_offset(VoxelPos::new(1, 0, 0), 1);
        assert_eq!(cache.relocate(Point3::new(0.8, 0.9, 0.1)), None);
        assert_eq!(cache.get_offset(VoxelPos::new(1, 0, 0)), Some(&1));
    }
}

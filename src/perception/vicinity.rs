//! Classifies voxel positions into regions around the agent.
//!
//! Space is carved into an immediate sphere, a vertical column above and
//! below it, and eight compass sectors out to the distant radius. Everything
//! beyond the distant radius is unclassified.

use crate::world::VoxelPos;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a distant region relative to the agent.
///
/// Orderable so snapshot maps iterate in a stable wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

impl Direction {
    pub const ALL: [Direction; 10] = [
        Direction::Up,
        Direction::Down,
        Direction::North,
        Direction::Northeast,
        Direction::East,
        Direction::Southeast,
        Direction::South,
        Direction::Southwest,
        Direction::West,
        Direction::Northwest,
    ];

    pub fn from_wire(name: &str) -> Option<Direction> {
        Direction::ALL.iter().copied().find(|d| d.wire_name() == name)
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::North => "north",
            Direction::Northeast => "northeast",
            Direction::East => "east",
            Direction::Southeast => "southeast",
            Direction::South => "south",
            Direction::Southwest => "southwest",
            Direction::West => "west",
            Direction::Northwest => "northwest",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Region a position falls into, relative to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vicinity {
    /// Within the immediate radius, any direction.
    Immediate,
    /// Between the immediate and distant radii, in the given direction.
    Distant(Direction),
}

impl Vicinity {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Vicinity::Immediate => None,
            Vicinity::Distant(dir) => Some(*dir),
        }
    }
}

impl fmt::Display for Vicinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vicinity::Immediate => f.write_str("immediate"),
            Vicinity::Distant(dir) => dir.fmt(f),
        }
    }
}

/// Classify `target` relative to `agent`, both as floor positions.
///
/// Returns `None` beyond the distant radius. Positions whose horizontal
/// offset fits inside the immediate radius but that sit too high or low for
/// the immediate sphere classify as up or down rather than a compass sector.
pub fn classify(
    target: VoxelPos,
    agent: VoxelPos,
    immediate_radius: u32,
    distant_radius: u32,
) -> Option<Vicinity> {
    let dx = (target.x - agent.x) as f64;
    let dy = (target.y - agent.y) as f64;
    let dz = (target.z - agent.z) as f64;

    let distance = (dx * dx + dy * dy + dz * dz).sqrt();
    if distance <= immediate_radius as f64 {
        return Some(Vicinity::Immediate);
    }
    if distance > distant_radius as f64 {
        return None;
    }

    let horizontal = (dx * dx + dz * dz).sqrt();
    if horizontal <= immediate_radius as f64 {
        let dir = if dy > 0.0 { Direction::Up } else { Direction::Down };
        return Some(Vicinity::Distant(dir));
    }

    // Compass heading with north at -Z, east at +X, measured clockwise.
    let mut heading = dx.atan2(-dz).to_degrees();
    if heading < 0.0 {
        heading += 360.0;
    }

    // 45 degree sectors centered on each compass point; lower bound inclusive.
    let dir = if !(22.5..337.5).contains(&heading) {
        Direction::North
    } else if heading < 67.5 {
        Direction::Northeast
    } else if heading < 112.5 {
        Direction::East
    } else if heading < 157.5 {
        Direction::Southeast
    } else if heading < 202.5 {
        Direction::South
    } else if heading < 247.5 {
        Direction::Southwest
    } else if heading < 292.5 {
        Direction::West
    } else {
        Direction::Northwest
    };
    Some(Vicinity::Distant(dir))
}

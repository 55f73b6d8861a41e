//! Left/right vertex partition.
//!
//! Every vertex is assigned to one side by the sign of its Basis coordinate
//! on the partition axis. Vertices inside the tolerance band around the seam
//! belong to the right side; the two pathways disagree only about a vertex
//! sitting exactly on the band's negative edge.

use glam::Vec3;
use payu_config::{Axis, ShapeKeyConfig};

/// Side of the seam a vertex belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// How a coordinate exactly equal to `-tolerance` is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// `c > -tolerance` is right: the edge goes left. Suffix pairs.
    Exclusive,
    /// `c >= -tolerance` is right: the edge goes right. MMD alias pairs.
    Inclusive,
}

/// Assigns vertices to a side from their Basis coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partition {
    pub axis: Axis,
    pub tolerance: f32,
    pub tie_break: TieBreak,
}

impl Partition {
    pub fn new(axis: Axis, tolerance: f32, tie_break: TieBreak) -> Self {
        Self {
            axis,
            tolerance,
            tie_break,
        }
    }

    /// Partition used for `name左`/`name右` pairs.
    pub fn suffix(config: &ShapeKeyConfig) -> Self {
        Self::new(config.axis, config.tolerance, TieBreak::Exclusive)
    }

    /// Partition used for MMD alias pairs.
    pub fn alias(config: &ShapeKeyConfig) -> Self {
        Self::new(config.axis, config.tolerance, TieBreak::Inclusive)
    }

    /// Side owning a vertex whose Basis position is `base`.
    pub fn side_of(&self, base: Vec3) -> Side {
        let coordinate = base[self.axis.index()];
        let right = match self.tie_break {
            TieBreak::Exclusive => coordinate > -self.tolerance,
            TieBreak::Inclusive => coordinate >= -self.tolerance,
        };
        if right { Side::Right } else { Side::Left }
    }

    /// Sides of every vertex, in vertex order.
    pub fn sides<'a>(&'a self, base: &'a [Vec3]) -> impl Iterator<Item = Side> + 'a {
        base.iter().map(move |&position| self.side_of(position))
    }
}

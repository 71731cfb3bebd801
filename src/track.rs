// Track geometry: pieces, lanes, and arc-length queries

use itertools::{Itertools, MinMaxResult};

use crate::errors::HairpinError;

/// One track piece, either a straight or a bend. Either kind can carry the
/// switch flag marking it as a point where lanes can be changed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Piece {
    Straight { length: f64, switch: bool },
    Bend { radius: f64, angle: f64, switch: bool },
}

impl Piece {
    /// Distance covered along this piece when holding a lane at the given
    /// signed offset from the track centerline (positive = right of center).
    ///
    /// Straights are unaffected by the lane. In a bend the offset shrinks
    /// the effective radius on right turns (positive angle) and widens it on
    /// left turns, so the inner lane through a corner is genuinely shorter.
    pub fn travel(&self, lane_offset: f64) -> f64 {
        match *self {
            Piece::Straight { length, .. } => length,
            Piece::Bend { radius, angle, .. } => {
                let effective = if angle > 0.0 {
                    radius - lane_offset
                } else {
                    radius + lane_offset
                };
                2.0 * std::f64::consts::PI * effective * angle.abs() / 360.0
            }
        }
    }

    pub fn is_bend(&self) -> bool {
        matches!(self, Piece::Bend { .. })
    }

    pub fn has_switch(&self) -> bool {
        match *self {
            Piece::Straight { switch, .. } | Piece::Bend { switch, .. } => switch,
        }
    }
}

/// Immutable circuit description: an ordered, cyclic sequence of pieces and
/// the per-lane center offsets, indexed by lane id.
#[derive(Clone, Debug, Default)]
pub struct Track {
    pieces: Vec<Piece>,
    lane_offsets: Vec<f64>,
}

impl Track {
    pub fn new(pieces: Vec<Piece>, lane_offsets: Vec<f64>) -> Self {
        Self {
            pieces,
            lane_offsets,
        }
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Piece at the given index; indices wrap around the circuit.
    pub fn piece(&self, index: usize) -> &Piece {
        &self.pieces[index % self.pieces.len()]
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.pieces.len()
    }

    pub fn lane_count(&self) -> usize {
        self.lane_offsets.len()
    }

    pub fn lane_offset(&self, lane: usize) -> Result<f64, HairpinError> {
        self.lane_offsets
            .get(lane)
            .copied()
            .ok_or(HairpinError::UnknownLane {
                lane,
                lanes: self.lane_offsets.len(),
            })
    }

    /// Leftmost and rightmost lane offsets. The lane table is not guaranteed
    /// to be sorted by lane id, so the extremes are found by scanning the
    /// offset values.
    pub fn lane_offset_extremes(&self) -> (f64, f64) {
        match self.lane_offsets.iter().copied().minmax() {
            MinMaxResult::NoElements => (0.0, 0.0),
            MinMaxResult::OneElement(offset) => (offset, offset),
            MinMaxResult::MinMax(min, max) => (min, max),
        }
    }
}

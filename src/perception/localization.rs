//! Heading frame of an autonomous routine
//!
//! Routines are written for one starting side of the field. The frame
//! mirrors their headings for the other side and shifts them by the absolute
//! heading captured when the routine started.

use crate::common::types::Degrees;

/// Starting side of the field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSide {
    /// Headings are used as written
    Normal,
    /// Headings are mirrored
    Mirrored,
    /// No side selected; every target collapses onto the start offset
    Unset,
}

impl FieldSide {
    pub fn sign(self) -> f64 {
        match self {
            FieldSide::Normal => 1.0,
            FieldSide::Mirrored => -1.0,
            FieldSide::Unset => 0.0,
        }
    }
}

/// Mapping between routine-relative and absolute headings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingFrame {
    pub side: FieldSide,
    /// Absolute heading captured when the frame was established
    pub start_offset_deg: Degrees,
    /// Routine-relative heading of the last turn command
    pub last_commanded_deg: Degrees,
}

impl HeadingFrame {
    pub fn new(side: FieldSide, start_offset_deg: Degrees) -> Self {
        HeadingFrame {
            side,
            start_offset_deg,
            last_commanded_deg: 0.0,
        }
    }

    /// Convert a routine-relative heading into the sensor's frame
    pub fn to_absolute(&self, heading_deg: Degrees) -> Degrees {
        self.side.sign() * heading_deg + self.start_offset_deg
    }

    /// Convert an absolute reading back into the routine frame
    ///
    /// `None` while no side is selected, since the mapping is not invertible.
    pub fn to_relative(&self, absolute_deg: Degrees) -> Option<Degrees> {
        match self.side {
            FieldSide::Unset => None,
            side => Some((absolute_deg - self.start_offset_deg) * side.sign()),
        }
    }

    /// Absolute heading of the last turn command
    pub fn reference_absolute(&self) -> Degrees {
        self.to_absolute(self.last_commanded_deg)
    }
}

impl Default for HeadingFrame {
    fn default() -> Self {
        HeadingFrame::new(FieldSide::Normal, 0.0)
    }
}

/*
    FluxFox
    https://github.com/dbalsom/fluxfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    structs.rs

    Defines common structs
*/

use crate::{
    detect::infer_drive_type,
    types::{DataRates, Direction, DriveType, MotionMode, MotionState, Vendor},
    QicError,
};

/// The position of the tape relative to the head.
///
/// A [TapePosition] maintains its own end-of-tape flags: `at_bot` is set only at segment 0 and
/// `at_eot` only at the last segment of a track, so the two can never be set together.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TapePosition {
    segment: u16,
    track: u8,
    direction: Direction,
    at_bot: bool,
    at_eot: bool,
    at_file_mark: bool,
}

impl Default for TapePosition {
    fn default() -> Self {
        TapePosition {
            segment: 0,
            track: 0,
            direction: Direction::Forward,
            at_bot: true,
            at_eot: false,
            at_file_mark: false,
        }
    }
}

impl TapePosition {
    /// Create a new [TapePosition] at the given segment and track.
    /// Returns [QicError::InvalidPosition] if either lies outside the tape geometry.
    pub fn new(segment: u16, track: u8, max_segments: u16, max_tracks: u8) -> Result<TapePosition, QicError> {
        if max_segments < 2 || segment >= max_segments || track >= max_tracks {
            return Err(QicError::InvalidPosition { segment, track });
        }
        let mut position = TapePosition {
            track,
            ..Default::default()
        };
        position.set_segment(segment, max_segments);
        Ok(position)
    }

    #[inline]
    pub fn segment(&self) -> u16 {
        self.segment
    }
    #[inline]
    pub fn track(&self) -> u8 {
        self.track
    }
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }
    #[inline]
    pub fn at_bot(&self) -> bool {
        self.at_bot
    }
    #[inline]
    pub fn at_eot(&self) -> bool {
        self.at_eot
    }
    #[inline]
    pub fn at_file_mark(&self) -> bool {
        self.at_file_mark
    }

    /// Return true if the tape cannot move any further in `direction`.
    pub fn at_limit(&self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => self.at_eot,
            Direction::Reverse => self.at_bot,
        }
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn set_track(&mut self, track: u8) {
        self.track = track;
    }

    pub(crate) fn set_file_mark(&mut self, state: bool) {
        self.at_file_mark = state;
    }

    pub(crate) fn set_segment(&mut self, segment: u16, max_segments: u16) {
        self.segment = segment.min(max_segments.saturating_sub(1));
        self.at_bot = self.segment == 0;
        self.at_eot = self.segment == max_segments.saturating_sub(1);
    }

    /// Move one segment in the current direction. Returns false if the tape was already at the
    /// limit in that direction and did not move.
    pub(crate) fn step_segment(&mut self, max_segments: u16) -> bool {
        if self.at_limit(self.direction) {
            return false;
        }
        let segment = match self.direction {
            Direction::Forward => self.segment + 1,
            Direction::Reverse => self.segment - 1,
        };
        self.set_segment(segment, max_segments);
        self.at_file_mark = false;
        true
    }
}

/// The mutable state of the tape transport.
///
/// A [TapeState] is owned by the motion controller, which is the only component that mutates it.
/// Everything else receives a shared reference.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TapeState {
    pub position: TapePosition,
    pub state: MotionState,
    pub motor_on: bool,
    pub tape_moving: bool,
    pub write_gate: bool,
    pub format_mode: bool,
}

impl TapeState {
    pub fn mode(&self) -> MotionMode {
        self.state.into()
    }
}

/// The identity bytes a drive reports to the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveIdentity {
    pub vendor_id: u8,
    pub model_id: u8,
    pub rom_version: u8,
    pub drive_config: u8,
}

impl Default for DriveIdentity {
    /// A CMS QIC-80 drive.
    fn default() -> Self {
        DriveIdentity {
            vendor_id: 0x01,
            model_id: 0x10,
            rom_version: 0x40,
            drive_config: 0x04,
        }
    }
}

/// A `DriveProfile` describes an identified drive and the capabilities inferred from its identity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveProfile {
    pub vendor_id: u8,
    pub model_id: u8,
    pub rom_version: u8,
    pub drive_config: u8,
    pub drive_type: DriveType,
    pub max_tracks: u8,
    pub supported_rates: DataRates,
}

impl DriveProfile {
    pub fn new(vendor_id: u8, model_id: u8, rom_version: u8, drive_config: u8) -> DriveProfile {
        let drive_type = infer_drive_type(vendor_id, model_id, drive_config);
        DriveProfile {
            vendor_id,
            model_id,
            rom_version,
            drive_config,
            drive_type,
            max_tracks: drive_type.max_tracks(),
            supported_rates: drive_type.supported_rates(),
        }
    }

    pub fn vendor(&self) -> Option<Vendor> {
        Vendor::from_id(self.vendor_id)
    }
}

impl From<&DriveIdentity> for DriveProfile {
    fn from(identity: &DriveIdentity) -> Self {
        DriveProfile::new(
            identity.vendor_id,
            identity.model_id,
            identity.rom_version,
            identity.drive_config,
        )
    }
}

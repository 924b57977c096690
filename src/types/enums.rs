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

    enums.rs

    Defines common enum types
*/
use std::{
    fmt,
    fmt::{Display, Formatter},
};

use crate::types::DataRates;

/// The physical direction of tape travel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn reversed(&self) -> Direction {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "Forward"),
            Direction::Reverse => write!(f, "Reverse"),
        }
    }
}

/// The externally visible motion mode of the tape transport. Exactly one mode is active at a time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionMode {
    #[default]
    Idle,
    Seeking,
    Skipping,
    Streaming,
    Retensioning,
    Ejecting,
    Error,
}

/// The internal state of the tape motion state machine.
///
/// [MotionState] is finer grained than [MotionMode]: `Resetting` and `Paused` both report as
/// [MotionMode::Idle] since the tape is stationary in either.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionState {
    #[default]
    Idle,
    Resetting,
    Seeking,
    Skipping,
    Streaming,
    Paused,
    Retensioning,
    Ejecting,
    Error,
}

impl From<MotionState> for MotionMode {
    fn from(state: MotionState) -> Self {
        use MotionState::*;
        match state {
            Idle | Resetting | Paused => MotionMode::Idle,
            Seeking => MotionMode::Seeking,
            Skipping => MotionMode::Skipping,
            Streaming => MotionMode::Streaming,
            Retensioning => MotionMode::Retensioning,
            Ejecting => MotionMode::Ejecting,
            Error => MotionMode::Error,
        }
    }
}

impl Display for MotionState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The classification of a tape block, derived from its header byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockKind {
    Data,
    FileMark,
    Eod,
    Bad,
    #[default]
    Unknown,
}

impl BlockKind {
    pub const DATA_HEADER: u8 = 0x00;
    pub const FILE_MARK_HEADER: u8 = 0x1F;
    pub const EOD_HEADER: u8 = 0x0F;
    pub const BAD_HEADER: u8 = 0xFF;

    /// Classify a block by its header byte. Headers outside the reserved codes carry data.
    pub fn from_header(header: u8) -> BlockKind {
        match header {
            BlockKind::FILE_MARK_HEADER => BlockKind::FileMark,
            BlockKind::EOD_HEADER => BlockKind::Eod,
            BlockKind::BAD_HEADER => BlockKind::Bad,
            _ => BlockKind::Data,
        }
    }

    /// Return the reserved header byte for this block kind, if it has one.
    pub fn header(&self) -> Option<u8> {
        match self {
            BlockKind::Data => Some(BlockKind::DATA_HEADER),
            BlockKind::FileMark => Some(BlockKind::FILE_MARK_HEADER),
            BlockKind::Eod => Some(BlockKind::EOD_HEADER),
            BlockKind::Bad => Some(BlockKind::BAD_HEADER),
            BlockKind::Unknown => None,
        }
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            BlockKind::Data => write!(f, "Data"),
            BlockKind::FileMark => write!(f, "File Mark"),
            BlockKind::Eod => write!(f, "End of Data"),
            BlockKind::Bad => write!(f, "Bad Block"),
            BlockKind::Unknown => write!(f, "Unknown"),
        }
    }
}

/// The drive family inferred from a drive's identity bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DriveType {
    #[default]
    Unknown,
    Qic40,
    Qic80,
    Qic3010,
    Qic3020,
    Ditto,
}

impl DriveType {
    /// Return the number of tracks a drive of this type records.
    pub fn max_tracks(&self) -> u8 {
        match self {
            DriveType::Unknown => 0,
            DriveType::Qic40 => 20,
            DriveType::Qic80 => 28,
            DriveType::Qic3010 => 40,
            DriveType::Qic3020 => 40,
            DriveType::Ditto => 40,
        }
    }

    /// Return the data rates a drive of this type supports.
    pub fn supported_rates(&self) -> DataRates {
        match self {
            DriveType::Unknown => DataRates::empty(),
            DriveType::Qic40 | DriveType::Qic80 => DataRates::RATE_250K | DataRates::RATE_500K,
            DriveType::Qic3010 => DataRates::RATE_500K | DataRates::RATE_1M,
            DriveType::Qic3020 => DataRates::RATE_1M | DataRates::RATE_2M,
            DriveType::Ditto => DataRates::RATE_500K | DataRates::RATE_1M | DataRates::RATE_2M,
        }
    }
}

impl Display for DriveType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            DriveType::Unknown => write!(f, "Unknown"),
            DriveType::Qic40 => write!(f, "QIC-40"),
            DriveType::Qic80 => write!(f, "QIC-80"),
            DriveType::Qic3010 => write!(f, "QIC-3010"),
            DriveType::Qic3020 => write!(f, "QIC-3020"),
            DriveType::Ditto => write!(f, "Ditto"),
        }
    }
}

/// Drive vendors with a known identification byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Vendor {
    Cms,
    Conner,
    Iomega,
    Colorado,
    Wangtek,
}

impl Vendor {
    pub fn from_id(id: u8) -> Option<Vendor> {
        match id {
            0x01 => Some(Vendor::Cms),
            0x02 => Some(Vendor::Conner),
            0x03 => Some(Vendor::Iomega),
            0x04 => Some(Vendor::Colorado),
            0x05 => Some(Vendor::Wangtek),
            _ => None,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Vendor::Cms => 0x01,
            Vendor::Conner => 0x02,
            Vendor::Iomega => 0x03,
            Vendor::Colorado => 0x04,
            Vendor::Wangtek => 0x05,
        }
    }
}

impl Display for Vendor {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Vendor::Cms => write!(f, "CMS"),
            Vendor::Conner => write!(f, "Conner"),
            Vendor::Iomega => write!(f, "Iomega"),
            Vendor::Colorado => write!(f, "Colorado Memory Systems"),
            Vendor::Wangtek => write!(f, "Wangtek"),
        }
    }
}

/// The error code a drive reports in response to a Report Error Code command.
/// Values follow the QIC-117 error code table.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DriveErrorCode {
    #[default]
    NoError = 0,
    NotReady = 1,
    NoCartridge = 2,
    WriteProtected = 5,
    UndefinedCommand = 6,
    IllegalTrack = 7,
    SoftwareReset = 27,
    RateSelection = 31,
    IllegalSegment = 33,
    FileMarkNotFound = 39,
}

impl From<DriveErrorCode> for u8 {
    fn from(code: DriveErrorCode) -> Self {
        code as u8
    }
}

impl DriveErrorCode {
    pub fn is_error(&self) -> bool {
        !matches!(self, DriveErrorCode::NoError | DriveErrorCode::SoftwareReset)
    }
}

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

    src/status/mod.rs

    Defines report kinds and the TRK0 pulse-width codecs used to return them.
*/

//! A QIC-117 drive answers report commands by pulling the TRK0 line low once per bit, most
//! significant bit first. The width of the low pulse carries the bit value and a fixed high gap
//! separates bits.
//!
//! [StatusEncoder] implements the drive side of this transport and [Trk0Receiver] the host side.

mod encoder;
mod receiver;

pub use encoder::StatusEncoder;
pub use receiver::{Trk0Event, Trk0Receiver};

use crate::{command::Command, types::StatusWord};

/// The value a [StatusEncoder] transmission reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReportKind {
    Status,
    /// A single bit of the most recently reported byte.
    NextBit,
    Vendor,
    Model,
    RomVersion,
    DriveConfig,
    ErrorCode,
    TapeStatus,
    FormatSegments,
}

impl ReportKind {
    /// Return the report a command requests, if it is a report command.
    pub fn for_command(command: Command) -> Option<ReportKind> {
        match command {
            Command::ReportStatus => Some(ReportKind::Status),
            Command::ReportNextBit => Some(ReportKind::NextBit),
            Command::ReportVendor => Some(ReportKind::Vendor),
            Command::ReportModel => Some(ReportKind::Model),
            Command::ReportRomVersion => Some(ReportKind::RomVersion),
            Command::ReportDriveConfig => Some(ReportKind::DriveConfig),
            Command::ReportErrorCode => Some(ReportKind::ErrorCode),
            Command::ReportTapeStatus => Some(ReportKind::TapeStatus),
            Command::ReportFormatSegments => Some(ReportKind::FormatSegments),
            _ => None,
        }
    }
}

/// A snapshot of every value a drive can report, taken at the moment a report is triggered.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportSources {
    pub status: StatusWord,
    pub vendor: u8,
    pub model: u8,
    pub rom_version: u8,
    pub drive_config: u8,
    pub error_code: u8,
    pub tape_status: u8,
    pub format_segments: u8,
}

impl ReportSources {
    /// Return the byte a report of `kind` transmits. [ReportKind::NextBit] has no byte of its own.
    pub fn value(&self, kind: ReportKind) -> Option<u8> {
        match kind {
            ReportKind::Status => Some(self.status.bits()),
            ReportKind::NextBit => None,
            ReportKind::Vendor => Some(self.vendor),
            ReportKind::Model => Some(self.model),
            ReportKind::RomVersion => Some(self.rom_version),
            ReportKind::DriveConfig => Some(self.drive_config),
            ReportKind::ErrorCode => Some(self.error_code),
            ReportKind::TapeStatus => Some(self.tape_status),
            ReportKind::FormatSegments => Some(self.format_segments),
        }
    }
}

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
*/

//! # fluxfox_qic
//!
//! An emulation of the QIC-117 tape drive protocol as spoken over a floppy controller style
//! interface. The host selects commands by pulsing the STEP line, the drive reports status
//! bytes by pulse-width encoding bits onto the TRK0 line, and data moves as an MFM bit stream
//! framed into 512-byte blocks grouped into segments.
//!
//! Every component is an independently steppable state machine advanced one tick at a time by
//! a caller-owned loop. Components never share mutable state; they exchange events.
//!
//! * [`CommandDecoder`] turns STEP edges into [`Command`]s.
//! * [`StatusEncoder`] serializes report bytes onto TRK0.
//! * [`BlockFramer`] splits a decoded MFM stream into [`Block`]s and segments.
//! * [`MotionController`] owns the [`TapeState`] and executes motion commands.
//! * [`DetectSequencer`] identifies an attached drive from the host side.
//! * [`QicDrive`] wires the drive side components together.

pub mod command;
pub mod config;
pub mod detect;
pub mod drive;
pub mod framer;
pub mod motion;
pub mod status;
pub mod types;

use thiserror::Error;

/// The number of payload bytes carried by a single tape block.
pub const BLOCK_PAYLOAD_SIZE: usize = 512;
/// The number of ECC bytes trailing each tape block.
pub const BLOCK_ECC_SIZE: usize = 3;
/// The highest pulse count the command decoder will accumulate.
pub const MAX_PULSE_COUNT: u8 = 63;
/// The highest valid command code.
pub const MAX_COMMAND_CODE: u8 = 48;

#[derive(Debug, Error)]
pub enum QicError {
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
    #[error("Invalid command code: {0}")]
    InvalidCommandCode(u8),
    #[error("Invalid tape position: segment {segment} track {track}")]
    InvalidPosition { segment: u16, track: u8 },
}

pub use crate::{
    command::{Command, CommandCategory, CommandDecoder, DecodedCommand, StepPulser},
    config::QicConfig,
    detect::{DetectError, DetectOptions, DetectSequencer, DetectStep},
    drive::{DriveEvent, DriveInputs, DriveObservables, DriveOutputs, QicDrive},
    framer::{Block, BlockFramer, BlockWriter, ByteField, FramerEvent, MfmSample},
    motion::{MotionController, MotionError, MotionEvent, MotionInputs},
    status::{ReportKind, ReportSources, StatusEncoder, Trk0Event, Trk0Receiver},
    types::{
        BlockKind,
        DataRates,
        Direction,
        DriveErrorCode,
        DriveIdentity,
        DriveProfile,
        DriveType,
        MotionMode,
        MotionState,
        StatusWord,
        TapePosition,
        TapeState,
        Vendor,
    },
};

pub mod prelude {
    pub use crate::{
        command::{Command, CommandCategory},
        config::QicConfig,
        drive::QicDrive,
        framer::{Block, MfmSample},
        types::{BlockKind, Direction, DriveProfile, DriveType, MotionMode, StatusWord, TapePosition},
        QicError,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_come_from_api_boundaries() {
        let errors = [
            QicConfig::new().with_geometry(1, 28).validate().unwrap_err(),
            Command::try_from(0).unwrap_err(),
            TapePosition::new(150, 0, 150, 28).unwrap_err(),
        ];
        for error in errors {
            match error {
                QicError::ConfigError(msg) => assert!(!msg.is_empty()),
                QicError::InvalidCommandCode(code) => assert_eq!(code, 0),
                QicError::InvalidPosition { segment, track } => assert_eq!((segment, track), (150, 0)),
            }
        }
    }
}

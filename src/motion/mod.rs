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

    src/motion/mod.rs

    Defines the inputs, events and errors of the tape motion state machine.
*/

//! The motion controller owns the [crate::TapeState] and is the only component that mutates
//! it. It executes motion commands, counts INDEX pulses to track the tape position, and reacts
//! to file marks reported by the framer.

mod controller;

pub use controller::MotionController;

use crate::{command::Command, types::DriveErrorCode};
use thiserror::Error;

/// Sensor inputs sampled by the [MotionController] on each tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MotionInputs {
    /// A segment boundary passed the head on this tick.
    pub index_pulse: bool,
    /// The framer detected a file mark on this tick.
    pub file_mark: bool,
    pub cartridge_present: bool,
}

impl Default for MotionInputs {
    /// No pulses, with a cartridge loaded.
    fn default() -> Self {
        MotionInputs {
            index_pulse: false,
            file_mark: false,
            cartridge_present: true,
        }
    }
}

impl MotionInputs {
    pub fn with_index(mut self) -> MotionInputs {
        self.index_pulse = true;
        self
    }

    pub fn with_file_mark(mut self) -> MotionInputs {
        self.file_mark = true;
        self
    }

    pub fn without_cartridge(mut self) -> MotionInputs {
        self.cartridge_present = false;
        self
    }
}

/// Signals raised by the [MotionController].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MotionEvent {
    /// A command completed successfully.
    CommandDone(Command),
    /// A command failed. The controller is left in the Error state.
    CommandError { command: Command, error: MotionError },
    /// A command in progress was abandoned in favour of a newer one.
    Aborted(Command),
    /// Streaming reached the physical end of the tape in the direction of travel.
    EndOfTape,
    /// The cartridge has been unloaded.
    Ejected,
}

/// Precondition failures of motion commands.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
pub enum MotionError {
    #[error("The tape is at the beginning of tape")]
    AtBeginningOfTape,
    #[error("The tape is at the end of tape")]
    AtEndOfTape,
    #[error("No cartridge is present")]
    NoCartridge,
    #[error("The cartridge is write protected")]
    WriteProtected,
    #[error("The drive is not ready")]
    NotReady,
    #[error("The motion controller is disabled")]
    Disabled,
    #[error("Illegal track: {0}")]
    IllegalTrack(u8),
    #[error("No file mark was found before the end of the tape")]
    FileMarkNotFound,
}

impl MotionError {
    /// Return the drive error code reported for this error.
    pub fn code(&self) -> DriveErrorCode {
        match self {
            MotionError::AtBeginningOfTape | MotionError::AtEndOfTape => DriveErrorCode::IllegalSegment,
            MotionError::NoCartridge => DriveErrorCode::NoCartridge,
            MotionError::WriteProtected => DriveErrorCode::WriteProtected,
            MotionError::NotReady | MotionError::Disabled => DriveErrorCode::NotReady,
            MotionError::IllegalTrack(_) => DriveErrorCode::IllegalTrack,
            MotionError::FileMarkNotFound => DriveErrorCode::FileMarkNotFound,
        }
    }
}

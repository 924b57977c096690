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

    src/command/mod.rs

    Defines the QIC-117 command set and the STEP pulse codecs used to transport it.
*/

//! QIC-117 commands are sent by pulsing the floppy controller's STEP line. The number of pulses
//! received within a timing window selects the command; codes 1 through 48 are defined.
//!
//! [CommandDecoder] implements the drive side of this transport and [StepPulser] the host side.

mod decoder;
mod pulser;

pub use decoder::{CommandDecoder, DecodedCommand};
pub use pulser::StepPulser;

use crate::{QicError, MAX_COMMAND_CODE};
use std::{
    fmt,
    fmt::{Display, Formatter},
};

/// The broad class a [Command] belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandCategory {
    Reset,
    Seek,
    Skip,
    Motion,
    Status,
    Config,
    Data,
    Diagnostic,
}

/// A QIC-117 command, identified by the number of STEP pulses that select it.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    Reset = 1,
    ReportNextBit = 2,
    Pause = 3,
    MicroStepPause = 4,
    AltTimeout = 5,
    ReportStatus = 6,
    ReportErrorCode = 7,
    ReportDriveConfig = 8,
    ReportRomVersion = 9,
    LogicalFwd = 10,
    PhysicalRev = 11,
    PhysicalFwd = 12,
    SeekTrack = 13,
    SeekBot = 14,
    EnterFormatMode = 15,
    WriteReferenceBurst = 16,
    EnterVerifyMode = 17,
    Stop = 18,
    LogicalRev = 19,
    SeekEot = 20,
    MicroStepUp = 21,
    MicroStepDown = 22,
    SoftSelect = 23,
    SoftDeselect = 24,
    SkipRevSeg = 25,
    SkipFwdSeg = 26,
    SelectRate = 27,
    EnterDiagnostic1 = 28,
    EnterDiagnostic2 = 29,
    EnterPrimaryMode = 30,
    Retension = 31,
    ReportVendor = 32,
    ReportTapeStatus = 33,
    SkipRevFile = 34,
    SkipFwdFile = 35,
    CalibrateTapeLength = 36,
    ReportFormatSegments = 37,
    SetFormatSegments = 38,
    ReportModel = 39,
    Eject = 40,
    ClearNewCartridge = 41,
    VendorUnique42 = 42,
    VendorUnique43 = 43,
    VendorUnique44 = 44,
    VendorUnique45 = 45,
    PhantomSelect = 46,
    PhantomDeselect = 47,
    VendorUnique48 = 48,
}

impl Command {
    /// Resolve a pulse count to a command. Returns `None` for 0 and for counts above 48.
    pub fn from_code(code: u8) -> Option<Command> {
        use Command::*;
        let command = match code {
            1 => Reset,
            2 => ReportNextBit,
            3 => Pause,
            4 => MicroStepPause,
            5 => AltTimeout,
            6 => ReportStatus,
            7 => ReportErrorCode,
            8 => ReportDriveConfig,
            9 => ReportRomVersion,
            10 => LogicalFwd,
            11 => PhysicalRev,
            12 => PhysicalFwd,
            13 => SeekTrack,
            14 => SeekBot,
            15 => EnterFormatMode,
            16 => WriteReferenceBurst,
            17 => EnterVerifyMode,
            18 => Stop,
            19 => LogicalRev,
            20 => SeekEot,
            21 => MicroStepUp,
            22 => MicroStepDown,
            23 => SoftSelect,
            24 => SoftDeselect,
            25 => SkipRevSeg,
            26 => SkipFwdSeg,
            27 => SelectRate,
            28 => EnterDiagnostic1,
            29 => EnterDiagnostic2,
            30 => EnterPrimaryMode,
            31 => Retension,
            32 => ReportVendor,
            33 => ReportTapeStatus,
            34 => SkipRevFile,
            35 => SkipFwdFile,
            36 => CalibrateTapeLength,
            37 => ReportFormatSegments,
            38 => SetFormatSegments,
            39 => ReportModel,
            40 => Eject,
            41 => ClearNewCartridge,
            42 => VendorUnique42,
            43 => VendorUnique43,
            44 => VendorUnique44,
            45 => VendorUnique45,
            46 => PhantomSelect,
            47 => PhantomDeselect,
            48 => VendorUnique48,
            _ => return None,
        };
        Some(command)
    }

    /// Return the number of STEP pulses that select this command.
    #[inline]
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn category(&self) -> CommandCategory {
        use Command::*;
        match self {
            Reset => CommandCategory::Reset,
            SeekTrack | SeekBot | SeekEot | MicroStepUp | MicroStepDown => CommandCategory::Seek,
            SkipRevSeg | SkipFwdSeg | SkipRevFile | SkipFwdFile => CommandCategory::Skip,
            Pause | MicroStepPause | LogicalFwd | LogicalRev | PhysicalFwd | PhysicalRev | Stop | Retension
            | Eject => CommandCategory::Motion,
            ReportNextBit | ReportStatus | ReportErrorCode | ReportDriveConfig | ReportRomVersion | ReportVendor
            | ReportTapeStatus | ReportFormatSegments | ReportModel => CommandCategory::Status,
            AltTimeout | SoftSelect | SoftDeselect | SelectRate | EnterPrimaryMode | SetFormatSegments
            | ClearNewCartridge | PhantomSelect | PhantomDeselect => CommandCategory::Config,
            EnterFormatMode | WriteReferenceBurst | EnterVerifyMode => CommandCategory::Data,
            EnterDiagnostic1 | EnterDiagnostic2 | CalibrateTapeLength | VendorUnique42 | VendorUnique43
            | VendorUnique44 | VendorUnique45 | VendorUnique48 => CommandCategory::Diagnostic,
        }
    }

    /// Return true if the command is followed by a parameter sent as a second pulse sequence.
    /// Parameters are encoded as `value + 2` pulses.
    pub fn takes_parameter(&self) -> bool {
        matches!(self, Command::SeekTrack | Command::SelectRate)
    }

    /// Return true if the command is executed by the tape motion state machine.
    pub fn is_motion(&self) -> bool {
        use Command::*;
        matches!(
            self,
            Reset
                | SeekBot
                | SeekEot
                | SkipFwdSeg
                | SkipRevSeg
                | SkipFwdFile
                | SkipRevFile
                | LogicalFwd
                | LogicalRev
                | PhysicalFwd
                | PhysicalRev
                | Pause
                | Stop
                | Retension
                | Eject
        )
    }

    /// Return true if the command selects the drive.
    pub fn is_select(&self) -> bool {
        matches!(self, Command::PhantomSelect | Command::SoftSelect)
    }
}

impl TryFrom<u8> for Command {
    type Error = QicError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Command::from_code(code).ok_or(QicError::InvalidCommandCode(code))
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.code()
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Return true if `code` selects a defined command.
#[inline]
pub fn is_valid_code(code: u8) -> bool {
    (1..=MAX_COMMAND_CODE).contains(&code)
}

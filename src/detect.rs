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

    src/detect.rs

    Implements host side drive detection and drive type inference.
*/

//! Drive detection runs a fixed command script against an attached drive: a phantom select,
//! followed by a series of report commands whose responses are captured from TRK0. The
//! identity bytes are then used to infer the drive type.

use crate::{
    command::{Command, StepPulser},
    config::QicConfig,
    status::{Trk0Event, Trk0Receiver},
    types::{DriveProfile, DriveType, StatusWord, Vendor},
};
use thiserror::Error;

/// The drive config bit set by CMS drives recording the QIC-80 format.
pub const CONFIG_QIC80: u8 = 0x04;
/// The high drive config bit, set by drives supporting the higher data rates.
pub const CONFIG_HIGH_RATE: u8 = 0x80;

/// Model ids at or below this value identify Ditto drives from non-CMS vendors.
const DITTO_MAX_MODEL: u8 = 0x10;
/// Model ids above this value may identify QIC-3020 drives.
const QIC3020_MIN_MODEL: u8 = 0x20;

const DEFAULT_SCRIPT: [DetectStep; 5] = [
    DetectStep::PhantomSelect,
    DetectStep::ReportStatus,
    DetectStep::ReportVendor,
    DetectStep::ReportModel,
    DetectStep::ReportDriveConfig,
];

/// Infer the type of drive from its identity bytes.
///
/// CMS drives report QIC-80 capability with a drive config bit. Other known vendors are
/// classified by model id. A drive from an unknown vendor is only classified when it sets the
/// high rate config bit, and then conservatively as a QIC-3010.
pub fn infer_drive_type(vendor_id: u8, model_id: u8, drive_config: u8) -> DriveType {
    match Vendor::from_id(vendor_id) {
        Some(Vendor::Cms) => {
            if drive_config & CONFIG_QIC80 != 0 {
                DriveType::Qic80
            }
            else {
                DriveType::Qic40
            }
        }
        Some(_) => {
            if model_id <= DITTO_MAX_MODEL {
                DriveType::Ditto
            }
            else if model_id > QIC3020_MIN_MODEL && drive_config & CONFIG_HIGH_RATE != 0 {
                DriveType::Qic3020
            }
            else {
                DriveType::Qic3010
            }
        }
        None if drive_config & CONFIG_HIGH_RATE != 0 => DriveType::Qic3010,
        None => {
            log::debug!("infer_drive_type(): unknown vendor {:02X}", vendor_id);
            DriveType::Unknown
        }
    }
}

/// A step of the detection script.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DetectStep {
    PhantomSelect,
    ReportStatus,
    ReportVendor,
    ReportModel,
    ReportRomVersion,
    ReportDriveConfig,
}

impl DetectStep {
    pub fn command(&self) -> Command {
        match self {
            DetectStep::PhantomSelect => Command::PhantomSelect,
            DetectStep::ReportStatus => Command::ReportStatus,
            DetectStep::ReportVendor => Command::ReportVendor,
            DetectStep::ReportModel => Command::ReportModel,
            DetectStep::ReportRomVersion => Command::ReportRomVersion,
            DetectStep::ReportDriveConfig => Command::ReportDriveConfig,
        }
    }

    /// Return true if the drive answers this step with a report byte.
    pub fn expects_response(&self) -> bool {
        !matches!(self, DetectStep::PhantomSelect)
    }
}

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("No response from drive to {0:?}")]
    NoResponse(DetectStep),
    #[error("Drive detection was aborted")]
    Aborted,
}

/// Options controlling the detection script.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DetectOptions {
    rom_version: bool,
}

impl DetectOptions {
    pub fn new() -> DetectOptions {
        Default::default()
    }

    /// Also request the ROM version, immediately before the drive config.
    pub fn with_rom_version(mut self, state: bool) -> DetectOptions {
        self.rom_version = state;
        self
    }

    /// Return the steps of the detection script in the order they are executed.
    pub fn script(&self) -> Vec<DetectStep> {
        let mut steps = DEFAULT_SCRIPT.to_vec();
        if self.rom_version {
            steps.insert(steps.len() - 1, DetectStep::ReportRomVersion);
        }
        steps
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DetectPhase {
    Idle,
    Sending,
    AwaitResponse(u32),
    Settle(u32),
}

/// Identifies a drive from the host side of the STEP and TRK0 lines.
///
/// The sequencer is advanced one tick at a time with the sampled TRK0 level and returns the
/// STEP level to drive. Each report step must be answered within the response timeout or the
/// whole sequence fails; a partial identification is never returned.
pub struct DetectSequencer {
    options: DetectOptions,
    pulser: StepPulser,
    receiver: Trk0Receiver,
    response_timeout_ticks: u32,
    settle_ticks: u32,
    gap_ticks: u32,
    steps: Vec<DetectStep>,
    step_idx: usize,
    phase: DetectPhase,
    detecting: bool,
    complete: bool,
    error: Option<DetectError>,
    status: Option<u8>,
    vendor_id: Option<u8>,
    model_id: Option<u8>,
    rom_version: Option<u8>,
    drive_config: Option<u8>,
    profile: Option<DriveProfile>,
}

impl DetectSequencer {
    pub fn new(config: &QicConfig, options: DetectOptions) -> DetectSequencer {
        DetectSequencer {
            options,
            pulser: StepPulser::new(config),
            receiver: Trk0Receiver::new(config),
            response_timeout_ticks: config.ticks(config.response_timeout_us),
            settle_ticks: config.ticks(config.select_settle_us),
            gap_ticks: config.ticks(config.bit_gap_us),
            steps: options.script(),
            step_idx: 0,
            phase: DetectPhase::Idle,
            detecting: false,
            complete: false,
            error: None,
            status: None,
            vendor_id: None,
            model_id: None,
            rom_version: None,
            drive_config: None,
            profile: None,
        }
    }

    #[inline]
    pub fn detecting(&self) -> bool {
        self.detecting
    }
    #[inline]
    pub fn detect_complete(&self) -> bool {
        self.complete
    }
    #[inline]
    pub fn detect_error(&self) -> bool {
        self.error.is_some()
    }
    #[inline]
    pub fn error(&self) -> Option<DetectError> {
        self.error
    }

    /// Return the step being executed.
    pub fn current_step(&self) -> Option<DetectStep> {
        match self.detecting {
            true => self.steps.get(self.step_idx).copied(),
            false => None,
        }
    }

    /// Return the identified drive. Only available once detection has completed without error.
    pub fn profile(&self) -> Option<&DriveProfile> {
        match (self.complete, self.error) {
            (true, None) => self.profile.as_ref(),
            _ => None,
        }
    }

    /// Return the status word captured by the ReportStatus step.
    pub fn status_word(&self) -> Option<StatusWord> {
        self.status.map(StatusWord::from_bits_truncate)
    }

    /// Return true if the drive answered the status request.
    #[inline]
    pub fn drive_present(&self) -> bool {
        self.status.is_some()
    }

    pub fn cartridge_present(&self) -> bool {
        self.status_word().is_some_and(|s| s.contains(StatusWord::CARTRIDGE))
    }

    pub fn write_protected(&self) -> bool {
        self.status_word()
            .is_some_and(|s| s.contains(StatusWord::WRITE_PROTECT))
    }

    /// Begin a new detection, discarding the results of any previous one.
    pub fn start_detect(&mut self) {
        log::debug!("DetectSequencer::start_detect(): running {} steps", self.steps.len());
        self.pulser.cancel();
        self.receiver.reset();
        self.steps = self.options.script();
        self.step_idx = 0;
        self.detecting = true;
        self.complete = false;
        self.error = None;
        self.status = None;
        self.vendor_id = None;
        self.model_id = None;
        self.rom_version = None;
        self.drive_config = None;
        self.profile = None;
        self.begin_step();
    }

    /// Abandon detection. Always leaves the sequencer in the error state.
    pub fn abort_detect(&mut self) {
        if self.detecting {
            log::warn!("DetectSequencer::abort_detect(): aborted at {:?}", self.current_step());
        }
        self.pulser.cancel();
        self.detecting = false;
        self.phase = DetectPhase::Idle;
        self.error = Some(DetectError::Aborted);
    }

    /// Advance one tick with the sampled TRK0 level. Returns the STEP level to drive.
    pub fn tick(&mut self, trk0: bool) -> bool {
        let step_level = self.pulser.tick();
        if !self.detecting {
            return step_level;
        }
        let Some(step) = self.steps.get(self.step_idx).copied()
        else {
            self.finish();
            return step_level;
        };

        match self.phase {
            DetectPhase::Idle => {}
            DetectPhase::Sending => {
                if !self.pulser.busy() {
                    self.phase = if step.expects_response() {
                        self.receiver.reset();
                        DetectPhase::AwaitResponse(0)
                    }
                    else {
                        DetectPhase::Settle(self.settle_ticks)
                    };
                }
            }
            DetectPhase::AwaitResponse(elapsed) => {
                if let Some(Trk0Event::Byte(byte)) = self.receiver.tick(trk0) {
                    log::debug!("DetectSequencer::tick(): {:?} -> {:02X}", step, byte);
                    self.capture(step, byte);
                    self.phase = DetectPhase::Settle(self.gap_ticks);
                }
                else if elapsed + 1 >= self.response_timeout_ticks {
                    self.fail(DetectError::NoResponse(step));
                }
                else {
                    self.phase = DetectPhase::AwaitResponse(elapsed + 1);
                }
            }
            DetectPhase::Settle(remaining) => {
                if remaining > 1 {
                    self.phase = DetectPhase::Settle(remaining - 1);
                }
                else {
                    self.step_idx += 1;
                    if self.step_idx < self.steps.len() {
                        self.begin_step();
                    }
                    else {
                        self.finish();
                    }
                }
            }
        }
        step_level
    }

    fn begin_step(&mut self) {
        match self.steps.get(self.step_idx) {
            Some(step) => {
                log::trace!("DetectSequencer::begin_step(): {:?}", step);
                self.pulser.send_command(step.command());
                self.phase = DetectPhase::Sending;
            }
            None => self.finish(),
        }
    }

    fn capture(&mut self, step: DetectStep, byte: u8) {
        match step {
            DetectStep::ReportStatus => self.status = Some(byte),
            DetectStep::ReportVendor => self.vendor_id = Some(byte),
            DetectStep::ReportModel => self.model_id = Some(byte),
            DetectStep::ReportRomVersion => self.rom_version = Some(byte),
            DetectStep::ReportDriveConfig => self.drive_config = Some(byte),
            DetectStep::PhantomSelect => {}
        }
    }

    fn fail(&mut self, error: DetectError) {
        log::warn!("DetectSequencer::fail(): {}", error);
        self.pulser.cancel();
        self.detecting = false;
        self.phase = DetectPhase::Idle;
        self.error = Some(error);
        self.profile = None;
    }

    fn finish(&mut self) {
        self.detecting = false;
        self.phase = DetectPhase::Idle;
        let (Some(vendor_id), Some(model_id), Some(drive_config)) = (self.vendor_id, self.model_id, self.drive_config)
        else {
            self.fail(DetectError::NoResponse(DetectStep::ReportDriveConfig));
            return;
        };
        let profile = DriveProfile::new(vendor_id, model_id, self.rom_version.unwrap_or(0), drive_config);
        log::debug!(
            "DetectSequencer::finish(): vendor {:02X} model {:02X} config {:02X}: {} ({} tracks)",
            vendor_id,
            model_id,
            drive_config,
            profile.drive_type,
            profile.max_tracks
        );
        self.profile = Some(profile);
        self.complete = true;
    }
}

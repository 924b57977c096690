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

    src/drive.rs

    Implements a QIC-117 tape drive by wiring the command decoder, status encoder,
    block framer and motion controller to the drive's sensors and interface lines.
*/

//! [QicDrive] is the drive side of the interface. The caller owns the scheduling loop: it
//! samples the host's STEP line, the INDEX sensor and the recovered MFM stream once per tick,
//! passes them to [QicDrive::tick], and drives TRK0 and the mechanics from the returned
//! [DriveOutputs].

use crate::{
    command::{Command, CommandDecoder, DecodedCommand},
    config::QicConfig,
    framer::{BlockFramer, FramerEvent, MfmSample},
    motion::{MotionController, MotionEvent, MotionInputs},
    status::{ReportKind, ReportSources, StatusEncoder},
    types::{DataRates, Direction, DriveErrorCode, DriveIdentity, DriveProfile, MotionState, StatusWord, TapeState},
    QicError,
};

/// Lines and sensors sampled by the drive on each tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DriveInputs {
    pub step: bool,
    pub index: bool,
    pub mfm: MfmSample,
}

/// Lines driven by the drive on each tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DriveOutputs {
    pub trk0: bool,
    pub motor_on: bool,
    pub direction: Direction,
    pub write_gate: bool,
}

/// Events raised by a [QicDrive] during a tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriveEvent {
    /// A command window closed.
    Command(DecodedCommand),
    /// The drive was selected or deselected.
    Selected(bool),
    /// A parameter was received for a parameterised command.
    Parameter { command: Command, value: u8 },
    /// A report transmission was started.
    ReportSent { kind: ReportKind, value: Option<u8> },
    /// A report was requested while the encoder was busy and has been dropped.
    ReportDropped(ReportKind),
    /// An error code was latched.
    Error(DriveErrorCode),
    Motion(MotionEvent),
    Framer(FramerEvent),
}

/// A snapshot of the values a host side caller can observe.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DriveObservables {
    pub current_command: Option<Command>,
    pub command_strobe: bool,
    pub segment_position: u16,
    pub track_position: u8,
    pub tape_status: StatusWord,
    pub command_active: bool,
    pub tape_ready: bool,
    pub tape_error: bool,
    pub block_sync: bool,
    pub block_in_segment: u16,
    pub segment_complete: bool,
    pub file_mark_detect: bool,
}

/// An emulated QIC-117 tape drive.
///
/// Each tick runs the components in a fixed order: the command decoder, dispatch of any decoded
/// command, the block framer (only while the tape moves in a streaming or skipping state), the
/// motion controller, and finally the status encoder that drives TRK0.
pub struct QicDrive {
    config: QicConfig,
    identity: DriveIdentity,
    profile: DriveProfile,
    decoder: CommandDecoder,
    encoder: StatusEncoder,
    framer: BlockFramer,
    motion: MotionController,
    tape_mode: bool,
    selected: bool,
    cartridge_present: bool,
    write_protected: bool,
    new_cartridge: bool,
    tape_format: u8,
    pending_parameter: Option<Command>,
    data_rate: DataRates,
    error_code: DriveErrorCode,
    current_command: Option<Command>,
    command_strobe: bool,
    segment_complete: bool,
    file_mark_detect: bool,
    trk0: bool,
    framer_events: Vec<FramerEvent>,
    motion_events: Vec<MotionEvent>,
}

impl QicDrive {
    /// Create a new drive with no cartridge loaded.
    pub fn new(config: QicConfig, identity: DriveIdentity) -> Result<QicDrive, QicError> {
        config.validate()?;
        let profile = DriveProfile::from(&identity);
        log::debug!(
            "QicDrive::new(): vendor {:02X} model {:02X} config {:02X}: {}",
            identity.vendor_id,
            identity.model_id,
            identity.drive_config,
            profile.drive_type
        );
        let data_rate = Self::default_rate(&profile);
        Ok(QicDrive {
            decoder: CommandDecoder::new(&config),
            encoder: StatusEncoder::new(&config),
            framer: BlockFramer::new(&config),
            motion: MotionController::new(&config),
            config,
            identity,
            profile,
            tape_mode: true,
            selected: false,
            cartridge_present: false,
            write_protected: false,
            new_cartridge: false,
            tape_format: 0,
            pending_parameter: None,
            data_rate,
            error_code: DriveErrorCode::NoError,
            current_command: None,
            command_strobe: false,
            segment_complete: false,
            file_mark_detect: false,
            trk0: true,
            framer_events: Vec::new(),
            motion_events: Vec::new(),
        })
    }

    fn default_rate(profile: &DriveProfile) -> DataRates {
        (0..4)
            .filter_map(DataRates::from_rate_code)
            .find(|rate| profile.supported_rates.contains(*rate))
            .unwrap_or(DataRates::RATE_500K)
    }

    #[inline]
    pub fn config(&self) -> &QicConfig {
        &self.config
    }
    #[inline]
    pub fn identity(&self) -> &DriveIdentity {
        &self.identity
    }
    #[inline]
    pub fn profile(&self) -> &DriveProfile {
        &self.profile
    }
    #[inline]
    pub fn selected(&self) -> bool {
        self.selected
    }
    #[inline]
    pub fn tape_mode(&self) -> bool {
        self.tape_mode
    }
    #[inline]
    pub fn data_rate(&self) -> DataRates {
        self.data_rate
    }
    #[inline]
    pub fn error_code(&self) -> DriveErrorCode {
        self.error_code
    }
    #[inline]
    pub fn cartridge_present(&self) -> bool {
        self.cartridge_present
    }
    #[inline]
    pub fn tape_state(&self) -> &TapeState {
        self.motion.tape_state()
    }
    #[inline]
    pub fn motion(&self) -> &MotionController {
        &self.motion
    }
    #[inline]
    pub fn framer(&self) -> &BlockFramer {
        &self.framer
    }
    #[inline]
    pub fn encoder(&self) -> &StatusEncoder {
        &self.encoder
    }

    /// Load a cartridge. The tape is positioned at BOT on track 0.
    pub fn insert_cartridge(&mut self, write_protected: bool) {
        log::debug!("QicDrive::insert_cartridge(): write protected: {}", write_protected);
        self.cartridge_present = true;
        self.write_protected = write_protected;
        self.new_cartridge = true;
        self.motion.load_tape();
        self.framer.reset();
    }

    /// Remove the cartridge. A tape in motion stops on the next tick with a NoCartridge error.
    pub fn remove_cartridge(&mut self) {
        log::debug!("QicDrive::remove_cartridge()");
        self.cartridge_present = false;
        self.write_protected = false;
        self.new_cartridge = false;
    }

    pub fn set_write_protected(&mut self, state: bool) {
        self.write_protected = state;
    }

    /// Set the format byte returned by Report Tape Status for the loaded cartridge.
    pub fn set_tape_format(&mut self, format: u8) {
        self.tape_format = format;
    }

    /// Enable or disable tape mode. Disabling takes effect immediately: any partial command is
    /// discarded, any report transmission abandoned, and the motor stopped.
    pub fn set_tape_mode(&mut self, enabled: bool) {
        log::debug!("QicDrive::set_tape_mode(): {}", enabled);
        self.tape_mode = enabled;
        self.decoder.set_enabled(enabled);
        self.encoder.set_enabled(enabled);
        self.motion.set_enabled(enabled);
        if !enabled {
            self.pending_parameter = None;
            self.framer.resync();
        }
    }

    /// Compute the status word from the live drive state.
    pub fn status_word(&self) -> StatusWord {
        let mut status = StatusWord::empty();
        let position = self.motion.position();
        status.set(StatusWord::READY, self.tape_mode && !self.motion.busy());
        status.set(
            StatusWord::ERROR,
            self.error_code.is_error() || self.motion.motion_state() == MotionState::Error,
        );
        status.set(StatusWord::CARTRIDGE, self.cartridge_present);
        status.set(StatusWord::WRITE_PROTECT, self.cartridge_present && self.write_protected);
        status.set(StatusWord::NEW_CARTRIDGE, self.new_cartridge);
        status.set(StatusWord::AT_BOT, self.cartridge_present && position.at_bot());
        status.set(StatusWord::AT_EOT, self.cartridge_present && position.at_eot());
        status
    }

    /// Take a snapshot of every reportable value.
    pub fn report_sources(&self) -> ReportSources {
        ReportSources {
            status: self.status_word(),
            vendor: self.identity.vendor_id,
            model: self.identity.model_id,
            rom_version: self.identity.rom_version,
            drive_config: self.identity.drive_config,
            error_code: self.error_code.into(),
            tape_status: if self.cartridge_present { self.tape_format } else { 0 },
            format_segments: self.config.max_segments as u8,
        }
    }

    pub fn observables(&self) -> DriveObservables {
        let status = self.status_word();
        let position = self.motion.position();
        DriveObservables {
            current_command: self.current_command,
            command_strobe: self.command_strobe,
            segment_position: position.segment(),
            track_position: position.track(),
            tape_status: status,
            command_active: self.motion.busy() || self.encoder.busy() || self.pending_parameter.is_some(),
            tape_ready: self.cartridge_present
                && !self.motion.busy()
                && self.motion.motion_state() != MotionState::Error,
            tape_error: status.contains(StatusWord::ERROR),
            block_sync: self.framer.in_block(),
            block_in_segment: self.framer.block_in_segment(),
            segment_complete: self.segment_complete,
            file_mark_detect: self.file_mark_detect,
        }
    }

    /// Advance the drive by one tick.
    pub fn tick(&mut self, inputs: &DriveInputs, events: &mut Vec<DriveEvent>) -> DriveOutputs {
        self.command_strobe = false;
        self.segment_complete = false;
        self.file_mark_detect = false;

        if let Some(decoded) = self.decoder.tick(inputs.step) {
            self.command_strobe = true;
            events.push(DriveEvent::Command(decoded));
            self.dispatch(decoded, events);
        }

        let framing = self.motion.tape_moving()
            && matches!(
                self.motion.motion_state(),
                MotionState::Streaming | MotionState::Skipping
            );
        if framing {
            self.framer.tick(inputs.mfm, &mut self.framer_events);
        }
        else {
            self.framer.resync();
        }
        for event in self.framer_events.drain(..) {
            match event {
                FramerEvent::FileMark => self.file_mark_detect = true,
                FramerEvent::SegmentComplete { .. } => self.segment_complete = true,
                _ => {}
            }
            events.push(DriveEvent::Framer(event));
        }

        let motion_inputs = MotionInputs {
            index_pulse: inputs.index,
            file_mark: self.file_mark_detect,
            cartridge_present: self.cartridge_present,
        };
        self.motion.tick(&motion_inputs, &mut self.motion_events);
        self.drain_motion_events(events);

        self.trk0 = self.encoder.tick();

        DriveOutputs {
            trk0: self.trk0,
            motor_on: self.motion.motor_on(),
            direction: self.motion.position().direction(),
            write_gate: self.motion.write_gate(),
        }
    }

    fn dispatch(&mut self, decoded: DecodedCommand, events: &mut Vec<DriveEvent>) {
        if let Some(command) = self.pending_parameter.take() {
            self.apply_parameter(command, decoded.pulse_count, events);
            return;
        }

        let Some(command) = decoded.command
        else {
            log::warn!("QicDrive::dispatch(): undefined command {}", decoded.pulse_count);
            self.set_error(DriveErrorCode::UndefinedCommand, events);
            return;
        };

        if self.config.require_select && !self.selected && !command.is_select() {
            log::debug!("QicDrive::dispatch(): not selected, ignoring {}", command);
            return;
        }
        self.current_command = Some(command);

        if command.takes_parameter() {
            log::trace!("QicDrive::dispatch(): {} awaiting parameter", command);
            self.pending_parameter = Some(command);
            return;
        }

        if let Some(kind) = ReportKind::for_command(command) {
            self.send_report(kind, events);
            return;
        }

        match command {
            Command::PhantomSelect | Command::SoftSelect => {
                self.selected = true;
                events.push(DriveEvent::Selected(true));
            }
            Command::PhantomDeselect | Command::SoftDeselect => {
                self.selected = false;
                events.push(DriveEvent::Selected(false));
            }
            Command::ClearNewCartridge => {
                self.new_cartridge = false;
            }
            Command::EnterFormatMode => {
                if !self.cartridge_present {
                    self.set_error(DriveErrorCode::NoCartridge, events);
                }
                else if self.write_protected {
                    self.set_error(DriveErrorCode::WriteProtected, events);
                }
                else {
                    self.motion.set_format_mode(true);
                }
            }
            Command::EnterPrimaryMode | Command::EnterVerifyMode => {
                self.motion.set_format_mode(false);
            }
            Command::Reset => {
                self.error_code = DriveErrorCode::SoftwareReset;
                self.issue_motion(command, events);
            }
            _ if command.is_motion() => {
                self.issue_motion(command, events);
            }
            _ => {
                log::debug!("QicDrive::dispatch(): {} has no effect", command);
            }
        }
    }

    fn apply_parameter(&mut self, command: Command, pulse_count: u8, events: &mut Vec<DriveEvent>) {
        let value = pulse_count.checked_sub(2);
        log::debug!("QicDrive::apply_parameter(): {} parameter {:?}", command, value);
        match (command, value) {
            (Command::SeekTrack, Some(track)) => {
                events.push(DriveEvent::Parameter { command, value: track });
                let _ = self.motion.seek_track(track, &mut self.motion_events);
                self.drain_motion_events(events);
            }
            (Command::SeekTrack, None) => {
                self.set_error(DriveErrorCode::IllegalTrack, events);
            }
            (Command::SelectRate, Some(code)) => {
                match DataRates::from_rate_code(code).filter(|rate| self.profile.supported_rates.contains(*rate)) {
                    Some(rate) => {
                        events.push(DriveEvent::Parameter { command, value: code });
                        self.data_rate = rate;
                    }
                    None => self.set_error(DriveErrorCode::RateSelection, events),
                }
            }
            (Command::SelectRate, None) => {
                self.set_error(DriveErrorCode::RateSelection, events);
            }
            _ => {}
        }
    }

    fn send_report(&mut self, kind: ReportKind, events: &mut Vec<DriveEvent>) {
        let sources = self.report_sources();
        if !self.encoder.send(kind, &sources) {
            events.push(DriveEvent::ReportDropped(kind));
            return;
        }
        events.push(DriveEvent::ReportSent {
            kind,
            value: sources.value(kind),
        });
        match kind {
            ReportKind::ErrorCode => self.error_code = DriveErrorCode::NoError,
            ReportKind::Status => self.new_cartridge = false,
            _ => {}
        }
    }

    fn issue_motion(&mut self, command: Command, events: &mut Vec<DriveEvent>) {
        // Failures are reported through the motion event queue.
        let _ = self.motion.issue(command, &mut self.motion_events);
        self.drain_motion_events(events);
    }

    fn drain_motion_events(&mut self, events: &mut Vec<DriveEvent>) {
        for event in std::mem::take(&mut self.motion_events) {
            match event {
                MotionEvent::CommandError { error, .. } => self.set_error(error.code(), events),
                MotionEvent::Ejected => {
                    self.cartridge_present = false;
                    self.new_cartridge = false;
                    self.framer.reset();
                }
                _ => {}
            }
            events.push(DriveEvent::Motion(event));
        }
    }

    fn set_error(&mut self, code: DriveErrorCode, events: &mut Vec<DriveEvent>) {
        log::warn!("QicDrive::set_error(): {:?}", code);
        self.error_code = code;
        events.push(DriveEvent::Error(code));
    }
}

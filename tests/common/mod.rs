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

    tests/common/mod.rs

    Common support routines for tests
*/
#![allow(dead_code)]

use fluxfox_qic::{
    prelude::*,
    CommandDecoder,
    DecodedCommand,
    DriveEvent,
    DriveIdentity,
    DriveInputs,
    ReportKind,
    ReportSources,
    StatusEncoder,
    StepPulser,
    Trk0Event,
    Trk0Receiver,
};

/// The tick limit for any single simulated exchange.
pub const MAX_TICKS: usize = 2_000_000;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A configuration running at 1 tick per µs with the default protocol timings.
pub fn test_config() -> QicConfig {
    QicConfig::new().with_tick_rate(1_000_000)
}

/// Return the STEP levels for a train of `count` pulses followed by enough silence to close the
/// drive's command window.
pub fn step_train(config: &QicConfig, count: u8) -> Vec<bool> {
    let mut pulser = StepPulser::new(config);
    let mut levels = Vec::new();
    if pulser.start(count) {
        while pulser.busy() {
            levels.push(pulser.tick());
        }
    }
    let silence = config.ticks(config.command_timeout_us) as usize + 2;
    levels.extend(std::iter::repeat(false).take(silence));
    levels
}

/// Feed STEP levels to a decoder and collect every command it decodes.
pub fn decode_levels(decoder: &mut CommandDecoder, levels: &[bool]) -> Vec<DecodedCommand> {
    levels.iter().filter_map(|level| decoder.tick(*level)).collect()
}

/// Run an encoder until it falls idle, returning the TRK0 level of every tick.
pub fn encode_levels(encoder: &mut StatusEncoder) -> Vec<bool> {
    let mut levels = Vec::new();
    while encoder.busy() {
        levels.push(encoder.tick());
    }
    levels
}

/// Feed TRK0 levels to a receiver and collect every byte it decodes.
pub fn receive_bytes(receiver: &mut Trk0Receiver, levels: &[bool]) -> Vec<u8> {
    levels
        .iter()
        .filter_map(|level| match receiver.tick(*level) {
            Some(Trk0Event::Byte(byte)) => Some(byte),
            _ => None,
        })
        .collect()
}

/// A minimal drive that answers report commands with fixed bytes. A responder that is not
/// present never drives TRK0 low.
pub struct FakeResponder {
    decoder: CommandDecoder,
    encoder: StatusEncoder,
    pub sources: ReportSources,
    pub present: bool,
    pub commands: Vec<DecodedCommand>,
}

impl FakeResponder {
    pub fn new(config: &QicConfig, vendor: u8, model: u8, drive_config: u8, status: u8) -> FakeResponder {
        FakeResponder {
            decoder: CommandDecoder::new(config),
            encoder: StatusEncoder::new(config),
            sources: ReportSources {
                status: StatusWord::from_bits_retain(status),
                vendor,
                model,
                rom_version: 0x5A,
                drive_config,
                ..Default::default()
            },
            present: true,
            commands: Vec::new(),
        }
    }

    pub fn absent(config: &QicConfig) -> FakeResponder {
        let mut responder = FakeResponder::new(config, 0, 0, 0, 0);
        responder.present = false;
        responder
    }

    /// Sample STEP for one tick and return the TRK0 level.
    pub fn tick(&mut self, step: bool) -> bool {
        if !self.present {
            return true;
        }
        if let Some(decoded) = self.decoder.tick(step) {
            self.commands.push(decoded);
            if let Some(kind) = decoded.command.and_then(ReportKind::for_command) {
                self.encoder.send(kind, &self.sources);
            }
        }
        self.encoder.tick()
    }
}

/// Drives a [QicDrive] from the host side, collecting every event it raises.
pub struct Host {
    pub config: QicConfig,
    pub drive: QicDrive,
    pub events: Vec<DriveEvent>,
    pub index: bool,
    pub mfm: MfmSample,
    pub trk0: bool,
    pub ticks: usize,
}

impl Host {
    pub fn new(config: QicConfig, drive: QicDrive) -> Host {
        Host {
            config,
            drive,
            events: Vec::new(),
            index: false,
            mfm: MfmSample::default(),
            trk0: true,
            ticks: 0,
        }
    }

    pub fn tick(&mut self, step: bool) {
        let inputs = DriveInputs {
            step,
            index: self.index,
            mfm: self.mfm,
        };
        let outputs = self.drive.tick(&inputs, &mut self.events);
        self.trk0 = outputs.trk0;
        self.ticks += 1;
    }

    pub fn idle(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.tick(false);
        }
    }

    /// Send a pulse train and wait for the drive's command window to close.
    pub fn send_pulses(&mut self, count: u8) {
        for level in step_train(&self.config, count) {
            self.tick(level);
        }
    }

    pub fn send_command(&mut self, command: Command) {
        self.send_pulses(command.code());
    }

    pub fn send_parameter(&mut self, value: u8) {
        self.send_pulses(value + 2);
    }

    /// Send a report command and capture the byte returned on TRK0. Returns `None` if nothing
    /// arrives within the response timeout.
    pub fn report(&mut self, command: Command) -> Option<u8> {
        let mut receiver = Trk0Receiver::new(&self.config);
        let mut pulser = StepPulser::new(&self.config);
        pulser.send_command(command);
        let timeout = self.config.ticks(self.config.response_timeout_us) as usize;
        let mut waited = 0;
        let mut byte = None;
        loop {
            let step = pulser.tick();
            self.tick(step);
            if let Some(Trk0Event::Byte(b)) = receiver.tick(self.trk0) {
                byte = Some(b);
            }
            if byte.is_some() && !self.drive.encoder().busy() {
                break;
            }
            if !pulser.busy() {
                waited += 1;
                if byte.is_none() && waited > timeout {
                    break;
                }
            }
        }
        byte
    }

    /// Step with the INDEX line pulsed once per `period` ticks until `done` returns true.
    pub fn run_with_index<F: FnMut(&Host) -> bool>(&mut self, period: usize, mut done: F) -> bool {
        for i in 0..MAX_TICKS {
            self.index = i % period == period - 1;
            self.tick(false);
            self.index = false;
            if done(self) {
                return true;
            }
        }
        false
    }

    pub fn take_events(&mut self) -> Vec<DriveEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Create a selected drive with a cartridge loaded.
pub fn ready_host(identity: DriveIdentity) -> Host {
    let config = test_config();
    let mut drive = QicDrive::new(config.clone(), identity).unwrap();
    drive.insert_cartridge(false);
    let mut host = Host::new(config, drive);
    host.send_command(Command::PhantomSelect);
    assert!(host.drive.selected());
    host.take_events();
    host
}

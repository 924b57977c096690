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

    src/command/decoder.rs

    Implements the drive side STEP pulse counting command decoder.
*/

use crate::{command::Command, config::QicConfig, MAX_PULSE_COUNT};

/// The result of a closed command window.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodedCommand {
    /// The number of debounced STEP pulses counted in the window, saturating at 63.
    pub pulse_count: u8,
    /// The command selected by `pulse_count`, or `None` if the count is not a defined command.
    pub command: Option<Command>,
}

impl DecodedCommand {
    pub fn from_pulse_count(pulse_count: u8) -> DecodedCommand {
        DecodedCommand {
            pulse_count,
            command: Command::from_code(pulse_count),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.command.is_some()
    }
}

/// Counts STEP pulses into commands.
///
/// The STEP level is debounced by requiring it to be stable for the debounce interval before a
/// change is accepted, so any burst of transitions narrower than the interval collapses into at
/// most one edge. Rising edges of the debounced level are counted. The command window closes once
/// no debounced edge has been seen for the command timeout, at which point [CommandDecoder::tick]
/// returns the [DecodedCommand] for exactly one tick.
pub struct CommandDecoder {
    debounce_ticks: u32,
    timeout_ticks: u32,
    enabled: bool,
    raw_level: bool,
    stable_ticks: u32,
    level: bool,
    counting: bool,
    pulse_count: u8,
    idle_ticks: u32,
    last_command: Option<DecodedCommand>,
}

impl CommandDecoder {
    pub fn new(config: &QicConfig) -> CommandDecoder {
        CommandDecoder {
            debounce_ticks: config.ticks(config.debounce_us),
            timeout_ticks: config.ticks(config.command_timeout_us),
            enabled: true,
            raw_level: false,
            stable_ticks: 0,
            level: false,
            counting: false,
            pulse_count: 0,
            idle_ticks: 0,
            last_command: None,
        }
    }

    /// Enable or disable tape mode. Disabling discards any count in progress immediately.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled && self.counting {
            log::debug!(
                "CommandDecoder::set_enabled(): discarding {} pulses in progress",
                self.pulse_count
            );
        }
        if !enabled {
            self.reset();
        }
        self.enabled = enabled;
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Return true while a command window is open.
    #[inline]
    pub fn counting(&self) -> bool {
        self.counting
    }

    /// Return the number of pulses counted so far in the open window.
    #[inline]
    pub fn pulse_count(&self) -> u8 {
        self.pulse_count
    }

    /// Return the most recently decoded command, valid or not.
    #[inline]
    pub fn last_command(&self) -> Option<DecodedCommand> {
        self.last_command
    }

    /// Return the debounced STEP level.
    #[inline]
    pub fn level(&self) -> bool {
        self.level
    }

    pub fn reset(&mut self) {
        self.counting = false;
        self.pulse_count = 0;
        self.idle_ticks = 0;
    }

    /// Sample the STEP line for one tick.
    pub fn tick(&mut self, step: bool) -> Option<DecodedCommand> {
        if step != self.raw_level {
            self.raw_level = step;
            self.stable_ticks = 1;
        }
        else {
            self.stable_ticks = self.stable_ticks.saturating_add(1);
        }

        if !self.enabled {
            // Follow the line so re-enabling while STEP is high does not count a phantom edge.
            self.level = self.raw_level;
            return None;
        }

        if self.raw_level != self.level && self.stable_ticks >= self.debounce_ticks {
            self.level = self.raw_level;
            self.idle_ticks = 0;
            if self.level {
                self.pulse_count = self.pulse_count.saturating_add(1).min(MAX_PULSE_COUNT);
                self.counting = true;
                log::trace!("CommandDecoder::tick(): pulse {}", self.pulse_count);
            }
            return None;
        }

        if self.counting {
            self.idle_ticks += 1;
            if self.idle_ticks >= self.timeout_ticks {
                let decoded = DecodedCommand::from_pulse_count(self.pulse_count);
                match decoded.command {
                    Some(command) => log::debug!("CommandDecoder::tick(): decoded {}", command),
                    None => log::warn!(
                        "CommandDecoder::tick(): invalid command code {}",
                        decoded.pulse_count
                    ),
                }
                self.reset();
                self.last_command = Some(decoded);
                return Some(decoded);
            }
        }
        None
    }
}

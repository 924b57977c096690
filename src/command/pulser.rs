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

    src/command/pulser.rs

    Implements the host side STEP pulse generator.
*/

use crate::{command::Command, config::QicConfig, MAX_PULSE_COUNT};

#[derive(Copy, Clone, Debug, PartialEq)]
enum PulsePhase {
    Idle,
    High(u32),
    Low(u32),
}

/// Generates STEP pulse trains the way a host floppy controller issues QIC-117 commands.
///
/// Each pulse holds STEP high for the configured high time followed by the low time. The pulser
/// does not wait out the drive's command timeout; callers that send back-to-back commands must
/// leave the STEP line idle for at least that long between them.
pub struct StepPulser {
    high_ticks: u32,
    low_ticks: u32,
    remaining: u8,
    phase: PulsePhase,
}

impl StepPulser {
    pub fn new(config: &QicConfig) -> StepPulser {
        StepPulser {
            high_ticks: config.ticks(config.step_high_us),
            low_ticks: config.ticks(config.step_low_us),
            remaining: 0,
            phase: PulsePhase::Idle,
        }
    }

    /// Begin sending `count` pulses. Returns false and does nothing if a train is already in
    /// progress or `count` is zero.
    pub fn start(&mut self, count: u8) -> bool {
        if self.busy() || count == 0 {
            return false;
        }
        let count = count.min(MAX_PULSE_COUNT);
        log::trace!("StepPulser::start(): sending {} pulses", count);
        self.remaining = count - 1;
        self.phase = PulsePhase::High(self.high_ticks);
        true
    }

    /// Begin sending the pulse train selecting `command`.
    pub fn send_command(&mut self, command: Command) -> bool {
        self.start(command.code())
    }

    /// Begin sending a command parameter, encoded as `value + 2` pulses.
    pub fn send_parameter(&mut self, value: u8) -> bool {
        self.start(value.saturating_add(2))
    }

    #[inline]
    pub fn busy(&self) -> bool {
        self.phase != PulsePhase::Idle
    }

    /// Abandon any pulse train in progress and return STEP low.
    pub fn cancel(&mut self) {
        self.remaining = 0;
        self.phase = PulsePhase::Idle;
    }

    /// Advance one tick and return the STEP level for this tick.
    pub fn tick(&mut self) -> bool {
        match self.phase {
            PulsePhase::Idle => false,
            PulsePhase::High(ticks) => {
                self.phase = if ticks > 1 {
                    PulsePhase::High(ticks - 1)
                }
                else {
                    PulsePhase::Low(self.low_ticks)
                };
                true
            }
            PulsePhase::Low(ticks) => {
                self.phase = if ticks > 1 {
                    PulsePhase::Low(ticks - 1)
                }
                else if self.remaining > 0 {
                    self.remaining -= 1;
                    PulsePhase::High(self.high_ticks)
                }
                else {
                    PulsePhase::Idle
                };
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_train_shape() {
        let config = QicConfig::new()
            .with_tick_rate(1_000_000)
            .with_step_timing(2.0, 3.0);
        let mut pulser = StepPulser::new(&config);
        assert!(pulser.start(3));
        assert!(!pulser.start(1));

        let mut levels = Vec::new();
        while pulser.busy() {
            levels.push(pulser.tick());
        }
        let expected = [true, true, false, false, false].repeat(3);
        assert_eq!(levels, expected);
        assert!(!pulser.tick());
    }
}

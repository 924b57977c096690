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

    src/config.rs

    Defines the timing and geometry parameters shared by the protocol components.

    All durations are specified in microseconds and resolved to whole scheduler ticks
*/

use crate::QicError;

/// The number of microseconds in a second.
const US_PER_SECOND: f64 = 1_000_000.0;

/// Timing and geometry parameters for the QIC-117 protocol components.
///
/// Durations are stored in microseconds and converted to scheduler ticks with [QicConfig::ticks].
/// Use the `with_*` methods to override individual defaults, then [QicConfig::validate] before
/// handing the configuration to a component.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QicConfig {
    #[doc = "The scheduler tick rate, in Hz."]
    pub tick_rate_hz: u32,
    #[doc = "The minimum stable time for a STEP level change to be accepted, in µs."]
    pub debounce_us: f64,
    #[doc = "Silence on the STEP line that closes a command window, in µs."]
    pub command_timeout_us: f64,
    #[doc = "TRK0 low time encoding a `0` bit, in µs."]
    pub bit0_low_us: f64,
    #[doc = "TRK0 low time encoding a `1` bit, in µs."]
    pub bit1_low_us: f64,
    #[doc = "TRK0 high time following each bit, in µs."]
    pub bit_gap_us: f64,
    #[doc = "Absence of bit strobes between blocks that constitutes an inter-record gap, in µs."]
    pub irg_us: f64,
    #[doc = "The minimum number of zero preamble bytes required before a sync mark."]
    pub min_preamble_bytes: u16,
    #[doc = "The number of segments on each track."]
    pub max_segments: u16,
    #[doc = "The number of tracks on the tape."]
    pub max_tracks: u8,
    #[doc = "Time spent in the Resetting state, in µs."]
    pub reset_us: f64,
    #[doc = "Time required to unload a cartridge once at BOT, in µs."]
    pub eject_us: f64,
    #[doc = "Time required to step the head by one track, in µs."]
    pub head_step_us: f64,
    #[doc = "Host STEP pulse high time, in µs."]
    pub step_high_us: f64,
    #[doc = "Host STEP pulse low time between pulses, in µs."]
    pub step_low_us: f64,
    #[doc = "Time the host waits for a report byte during drive detection, in µs."]
    pub response_timeout_us: f64,
    #[doc = "Time the host waits after a phantom select before continuing, in µs."]
    pub select_settle_us: f64,
    #[doc = "Whether the drive ignores commands until it has been selected."]
    pub require_select: bool,
}

impl Default for QicConfig {
    fn default() -> Self {
        QicConfig {
            tick_rate_hz: 4_000_000,
            debounce_us: 1.0,
            command_timeout_us: 1000.0,
            bit0_low_us: 500.0,
            bit1_low_us: 1500.0,
            bit_gap_us: 1000.0,
            irg_us: 100.0,
            min_preamble_bytes: 6,
            max_segments: 150,
            max_tracks: 28,
            reset_us: 1000.0,
            eject_us: 2000.0,
            head_step_us: 500.0,
            step_high_us: 4.0,
            step_low_us: 4.0,
            response_timeout_us: 30000.0,
            select_settle_us: 2000.0,
            require_select: true,
        }
    }
}

impl QicConfig {
    pub fn new() -> QicConfig {
        Default::default()
    }

    /// Convert a duration in microseconds to a whole number of ticks at the configured tick rate.
    /// The result is rounded to the nearest tick and is never less than one.
    pub fn ticks(&self, us: f64) -> u32 {
        let ticks = (us * self.tick_rate_hz as f64 / US_PER_SECOND).round();
        if ticks < 1.0 {
            1
        }
        else if ticks > u32::MAX as f64 {
            u32::MAX
        }
        else {
            ticks as u32
        }
    }

    /// Return the TRK0 low time, in ticks, that separates a `0` bit from a `1` bit.
    /// This is the midpoint between the two nominal pulse widths. An unvalidated config with the
    /// widths inverted yields the bit 0 width.
    pub fn bit_threshold_ticks(&self) -> u32 {
        let zero = self.ticks(self.bit0_low_us);
        let one = self.ticks(self.bit1_low_us);
        zero + one.saturating_sub(zero) / 2
    }

    /// Set the scheduler tick rate, in Hz.
    pub fn with_tick_rate(mut self, tick_rate_hz: u32) -> QicConfig {
        self.tick_rate_hz = tick_rate_hz;
        self
    }

    /// Set the STEP debounce interval, in µs.
    pub fn with_debounce(mut self, us: f64) -> QicConfig {
        self.debounce_us = us;
        self
    }

    /// Set the command window timeout, in µs.
    pub fn with_command_timeout(mut self, us: f64) -> QicConfig {
        self.command_timeout_us = us;
        self
    }

    /// Set the TRK0 pulse widths for `0` and `1` bits and the gap following each bit, in µs.
    pub fn with_bit_timing(mut self, bit0_low_us: f64, bit1_low_us: f64, bit_gap_us: f64) -> QicConfig {
        self.bit0_low_us = bit0_low_us;
        self.bit1_low_us = bit1_low_us;
        self.bit_gap_us = bit_gap_us;
        self
    }

    /// Set the inter-record gap length, in µs.
    pub fn with_irg(mut self, us: f64) -> QicConfig {
        self.irg_us = us;
        self
    }

    /// Set the minimum number of preamble bytes accepted before a sync mark.
    pub fn with_min_preamble(mut self, bytes: u16) -> QicConfig {
        self.min_preamble_bytes = bytes;
        self
    }

    /// Set the tape geometry.
    pub fn with_geometry(mut self, max_segments: u16, max_tracks: u8) -> QicConfig {
        self.max_segments = max_segments;
        self.max_tracks = max_tracks;
        self
    }

    /// Set the reset, eject and head step durations, in µs.
    pub fn with_mechanics(mut self, reset_us: f64, eject_us: f64, head_step_us: f64) -> QicConfig {
        self.reset_us = reset_us;
        self.eject_us = eject_us;
        self.head_step_us = head_step_us;
        self
    }

    /// Set the host STEP pulse high and low times, in µs.
    pub fn with_step_timing(mut self, high_us: f64, low_us: f64) -> QicConfig {
        self.step_high_us = high_us;
        self.step_low_us = low_us;
        self
    }

    /// Set the per-step response timeout used during drive detection, in µs.
    pub fn with_response_timeout(mut self, us: f64) -> QicConfig {
        self.response_timeout_us = us;
        self
    }

    /// Set whether the drive requires a select command before it acts on other commands.
    pub fn with_require_select(mut self, require: bool) -> QicConfig {
        self.require_select = require;
        self
    }

    /// Check the configuration for values that would break protocol invariants.
    pub fn validate(&self) -> Result<(), QicError> {
        if self.tick_rate_hz == 0 {
            return Err(QicError::ConfigError("tick rate must be non-zero".to_string()));
        }
        let durations = [
            ("debounce", self.debounce_us),
            ("command timeout", self.command_timeout_us),
            ("bit 0 width", self.bit0_low_us),
            ("bit 1 width", self.bit1_low_us),
            ("bit gap", self.bit_gap_us),
            ("irg", self.irg_us),
            ("reset", self.reset_us),
            ("eject", self.eject_us),
            ("head step", self.head_step_us),
            ("step high", self.step_high_us),
            ("step low", self.step_low_us),
            ("response timeout", self.response_timeout_us),
            ("select settle", self.select_settle_us),
        ];
        for (name, us) in durations {
            if !us.is_finite() || us <= 0.0 {
                return Err(QicError::ConfigError(format!("{} must be a positive duration", name)));
            }
        }
        if self.ticks(self.debounce_us) >= self.ticks(self.command_timeout_us) {
            return Err(QicError::ConfigError(
                "debounce interval must be shorter than the command timeout".to_string(),
            ));
        }
        if self.ticks(self.step_high_us) < self.ticks(self.debounce_us)
            || self.ticks(self.step_low_us) < self.ticks(self.debounce_us)
        {
            return Err(QicError::ConfigError(
                "host STEP pulses must not be narrower than the debounce interval".to_string(),
            ));
        }
        if self.ticks(self.bit1_low_us) <= self.ticks(self.bit0_low_us) + 1 {
            return Err(QicError::ConfigError(
                "bit 1 pulse width must be distinguishable from bit 0".to_string(),
            ));
        }
        if self.max_segments < 2 {
            return Err(QicError::ConfigError("a track needs at least two segments".to_string()));
        }
        if self.max_tracks == 0 {
            return Err(QicError::ConfigError("a tape needs at least one track".to_string()));
        }
        if self.min_preamble_bytes == 0 {
            return Err(QicError::ConfigError("minimum preamble must be at least one byte".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(QicConfig::default().validate().is_ok());
    }

    #[test]
    fn test_ticks_conversion() {
        let config = QicConfig::new().with_tick_rate(4_000_000);
        assert_eq!(config.ticks(1.0), 4);
        assert_eq!(config.ticks(500.0), 2000);
        assert_eq!(config.ticks(1500.0), 6000);
        // Durations shorter than a tick still take one tick.
        assert_eq!(config.ticks(0.01), 1);
    }

    #[test]
    fn test_bit_threshold_is_midpoint() {
        let config = QicConfig::new().with_tick_rate(1_000_000);
        assert_eq!(config.bit_threshold_ticks(), 1000);
    }

    #[test]
    fn test_bit_threshold_with_inverted_widths() {
        let config = QicConfig::new()
            .with_tick_rate(1_000_000)
            .with_bit_timing(1500.0, 500.0, 1000.0);
        assert_eq!(config.bit_threshold_ticks(), 1500);
        // Components built from an unvalidated config must not panic.
        let _ = crate::status::StatusEncoder::new(&config);
        let _ = crate::status::Trk0Receiver::new(&config);
        let _ = crate::detect::DetectSequencer::new(&config, Default::default());
    }

    #[test]
    fn test_validate_rejects_bad_geometry() {
        let config = QicConfig::new().with_geometry(1, 28);
        assert!(matches!(config.validate(), Err(QicError::ConfigError(_))));
    }

    #[test]
    fn test_validate_rejects_overlapping_bit_widths() {
        let config = QicConfig::new().with_bit_timing(1500.0, 500.0, 1000.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_long_debounce() {
        let config = QicConfig::new().with_debounce(2000.0);
        assert!(config.validate().is_err());
    }
}

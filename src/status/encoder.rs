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

    src/status/encoder.rs

    Implements the drive side TRK0 pulse-width status encoder.
*/

use crate::{
    config::QicConfig,
    status::{ReportKind, ReportSources},
};

#[derive(Copy, Clone, Debug, PartialEq)]
enum EncoderPhase {
    Idle,
    Low(u32),
    Gap(u32),
}

/// Serializes report bytes onto the TRK0 line.
///
/// Each bit is a low pulse whose width encodes its value, followed by a fixed high gap. The line
/// idles high. A send requested while a transmission is in flight is ignored, and disabling the
/// encoder abandons the transmission and releases the line at once.
///
/// A [ReportKind::NextBit] send transmits a single bit of the current byte, starting at the MSB
/// and moving towards the LSB on each request. A full byte transmission restarts the sequence.
pub struct StatusEncoder {
    zero_ticks: u32,
    one_ticks: u32,
    gap_ticks: u32,
    enabled: bool,
    phase: EncoderPhase,
    current_byte: u8,
    current_bit: u8,
    bits_left: u8,
    next_bit: u8,
}

impl StatusEncoder {
    pub fn new(config: &QicConfig) -> StatusEncoder {
        StatusEncoder {
            zero_ticks: config.ticks(config.bit0_low_us),
            one_ticks: config.ticks(config.bit1_low_us),
            gap_ticks: config.ticks(config.bit_gap_us),
            enabled: true,
            phase: EncoderPhase::Idle,
            current_byte: 0,
            current_bit: 7,
            bits_left: 0,
            next_bit: 7,
        }
    }

    /// Enable or disable the encoder. Disabling drops any transmission in progress.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled && self.busy() {
            log::debug!(
                "StatusEncoder::set_enabled(): abandoning transmission of {:02X} at bit {}",
                self.current_byte,
                self.current_bit
            );
        }
        if !enabled {
            self.phase = EncoderPhase::Idle;
            self.bits_left = 0;
        }
        self.enabled = enabled;
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Return true for the whole of a transmission, including the gap after the final bit.
    #[inline]
    pub fn busy(&self) -> bool {
        self.phase != EncoderPhase::Idle
    }

    /// Return the byte being (or most recently) transmitted.
    #[inline]
    pub fn current_byte(&self) -> u8 {
        self.current_byte
    }

    /// Return the index of the bit being (or most recently) transmitted, 7 being the MSB.
    #[inline]
    pub fn current_bit(&self) -> u8 {
        self.current_bit
    }

    /// Return the TRK0 line level. The line is high when idle.
    #[inline]
    pub fn line_level(&self) -> bool {
        !matches!(self.phase, EncoderPhase::Low(_))
    }

    /// Begin reporting `kind` from `sources`. Returns false if the encoder is busy or disabled.
    pub fn send(&mut self, kind: ReportKind, sources: &ReportSources) -> bool {
        if !self.ready(kind) {
            return false;
        }
        match sources.value(kind) {
            Some(byte) => self.start_byte(byte),
            None => self.start_next_bit(),
        }
        true
    }

    /// Begin transmitting an arbitrary byte. Returns false if the encoder is busy or disabled.
    pub fn send_byte(&mut self, byte: u8) -> bool {
        if !self.ready(ReportKind::Status) {
            return false;
        }
        self.start_byte(byte);
        true
    }

    /// Advance one tick and return the TRK0 level for this tick.
    pub fn tick(&mut self) -> bool {
        let level = self.line_level();
        let phase = self.phase;
        self.phase = match phase {
            EncoderPhase::Idle => EncoderPhase::Idle,
            EncoderPhase::Low(ticks) if ticks > 1 => EncoderPhase::Low(ticks - 1),
            EncoderPhase::Low(_) => EncoderPhase::Gap(self.gap_ticks),
            EncoderPhase::Gap(ticks) if ticks > 1 => EncoderPhase::Gap(ticks - 1),
            EncoderPhase::Gap(_) if self.bits_left > 0 => {
                self.bits_left -= 1;
                self.current_bit -= 1;
                EncoderPhase::Low(self.bit_width(self.current_bit))
            }
            EncoderPhase::Gap(_) => {
                log::trace!("StatusEncoder::tick(): finished sending {:02X}", self.current_byte);
                EncoderPhase::Idle
            }
        };
        level
    }

    fn ready(&self, kind: ReportKind) -> bool {
        if !self.enabled {
            log::debug!("StatusEncoder::send(): encoder disabled, ignoring {:?}", kind);
            return false;
        }
        if self.busy() {
            log::debug!("StatusEncoder::send(): busy, ignoring {:?}", kind);
            return false;
        }
        true
    }

    fn start_byte(&mut self, byte: u8) {
        log::trace!("StatusEncoder::start_byte(): sending {:02X}", byte);
        self.current_byte = byte;
        self.current_bit = 7;
        self.bits_left = 7;
        self.next_bit = 7;
        self.phase = EncoderPhase::Low(self.bit_width(7));
    }

    fn start_next_bit(&mut self) {
        self.current_bit = self.next_bit;
        self.bits_left = 0;
        self.next_bit = self.next_bit.wrapping_sub(1) & 0x07;
        log::trace!(
            "StatusEncoder::start_next_bit(): sending bit {} of {:02X}",
            self.current_bit,
            self.current_byte
        );
        self.phase = EncoderPhase::Low(self.bit_width(self.current_bit));
    }

    fn bit_width(&self, bit: u8) -> u32 {
        if self.current_byte & (1 << bit) != 0 {
            self.one_ticks
        }
        else {
            self.zero_ticks
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> StatusEncoder {
        let config = QicConfig::new()
            .with_tick_rate(1_000_000)
            .with_bit_timing(5.0, 15.0, 10.0);
        StatusEncoder::new(&config)
    }

    #[test]
    fn test_idle_line_is_high() {
        let mut encoder = encoder();
        for _ in 0..10 {
            assert!(encoder.tick());
        }
        assert!(!encoder.busy());
    }

    #[test]
    fn test_pulse_widths() {
        let mut encoder = encoder();
        assert!(encoder.send_byte(0b1000_0000));
        let mut levels = Vec::new();
        while encoder.busy() {
            levels.push(encoder.tick());
        }
        // MSB is a one: 15 low, 10 high. Seven zeros follow: 5 low, 10 high each.
        assert_eq!(levels.len(), 25 + 7 * 15);
        assert!(levels[0..15].iter().all(|l| !*l));
        assert!(levels[15..25].iter().all(|l| *l));
        assert!(levels[25..30].iter().all(|l| !*l));
    }

    #[test]
    fn test_send_while_busy_is_ignored() {
        let mut encoder = encoder();
        assert!(encoder.send_byte(0xA5));
        encoder.tick();
        assert!(!encoder.send_byte(0x5A));
        assert_eq!(encoder.current_byte(), 0xA5);
    }

    #[test]
    fn test_disable_releases_line() {
        let mut encoder = encoder();
        encoder.send_byte(0x00);
        assert!(!encoder.tick());
        encoder.set_enabled(false);
        assert!(!encoder.busy());
        assert!(encoder.line_level());
        assert!(encoder.tick());
        assert!(!encoder.send_byte(0x00));
    }

    #[test]
    fn test_next_bit_walks_current_byte() {
        let mut encoder = encoder();
        let sources = ReportSources {
            vendor: 0b0100_0000,
            ..Default::default()
        };
        assert!(encoder.send(ReportKind::Vendor, &sources));
        while encoder.busy() {
            encoder.tick();
        }

        let mut widths = Vec::new();
        for _ in 0..2 {
            assert!(encoder.send(ReportKind::NextBit, &sources));
            let mut low = 0;
            while encoder.busy() {
                if !encoder.tick() {
                    low += 1;
                }
            }
            widths.push(low);
        }
        assert_eq!(widths, vec![5, 15]);
        assert_eq!(encoder.current_bit(), 6);
    }
}

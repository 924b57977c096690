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

    src/status/receiver.rs

    Implements the host side TRK0 pulse-width receiver.
*/

use crate::config::QicConfig;

/// A bit or completed byte recovered from the TRK0 line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trk0Event {
    /// A bit was received; the byte is not yet complete.
    Bit(bool),
    /// The eighth bit was received, completing a byte.
    Byte(u8),
}

/// Recovers report bytes from TRK0 pulse widths.
///
/// A low pulse longer than the midpoint between the nominal `0` and `1` widths is a `1`. Low
/// pulses shorter than half the nominal `0` width are treated as glitches and ignored. Bits are
/// assembled MSB first.
pub struct Trk0Receiver {
    threshold_ticks: u32,
    min_low_ticks: u32,
    last_level: bool,
    low_ticks: u32,
    shift_reg: u8,
    bits: u8,
}

impl Trk0Receiver {
    pub fn new(config: &QicConfig) -> Trk0Receiver {
        Trk0Receiver {
            threshold_ticks: config.bit_threshold_ticks(),
            min_low_ticks: (config.ticks(config.bit0_low_us) / 2).max(1),
            last_level: true,
            low_ticks: 0,
            shift_reg: 0,
            bits: 0,
        }
    }

    /// Discard any partially received byte.
    pub fn reset(&mut self) {
        self.low_ticks = 0;
        self.shift_reg = 0;
        self.bits = 0;
    }

    /// Return the number of bits received towards the current byte.
    #[inline]
    pub fn bits_received(&self) -> u8 {
        self.bits
    }

    /// Sample the TRK0 line for one tick.
    pub fn tick(&mut self, level: bool) -> Option<Trk0Event> {
        let falling = self.last_level && !level;
        let rising = !self.last_level && level;
        self.last_level = level;

        if falling {
            self.low_ticks = 1;
            return None;
        }
        if !level {
            self.low_ticks = self.low_ticks.saturating_add(1);
            return None;
        }
        if !rising {
            return None;
        }

        let low_ticks = std::mem::take(&mut self.low_ticks);
        if low_ticks < self.min_low_ticks {
            log::trace!("Trk0Receiver::tick(): ignoring {} tick glitch", low_ticks);
            return None;
        }

        let bit = low_ticks > self.threshold_ticks;
        self.shift_reg = (self.shift_reg << 1) | bit as u8;
        self.bits += 1;
        if self.bits == 8 {
            let byte = self.shift_reg;
            self.shift_reg = 0;
            self.bits = 0;
            log::trace!("Trk0Receiver::tick(): received {:02X}", byte);
            Some(Trk0Event::Byte(byte))
        }
        else {
            Some(Trk0Event::Bit(bit))
        }
    }
}

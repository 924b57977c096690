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

    flags.rs

    Defines common bitflags
*/

use bitflags::bitflags;

bitflags! {
    /// The drive status word returned by a Report Drive Status command.
    ///
    /// The status word is never stored; it is recomputed from live drive state every time it is
    /// requested.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[rustfmt::skip]
    pub struct StatusWord: u8 {
        #[doc = "Drive is ready to accept a command"]
        const READY         = 0b1000_0000;
        #[doc = "An error code is pending"]
        const ERROR         = 0b0100_0000;
        #[doc = "A cartridge is present"]
        const CARTRIDGE     = 0b0010_0000;
        #[doc = "The cartridge is write protected"]
        const WRITE_PROTECT = 0b0001_0000;
        #[doc = "A new cartridge has been inserted since status was last reported"]
        const NEW_CARTRIDGE = 0b0000_1000;
        #[doc = "The tape is at the beginning of tape"]
        const AT_BOT        = 0b0000_0100;
        #[doc = "The tape is at the end of tape"]
        const AT_EOT        = 0b0000_0010;
    }
}

bitflags! {
    /// A set of data rates supported by a drive.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[rustfmt::skip]
    pub struct DataRates: u8 {
        const RATE_250K     = 0b0000_0001;
        const RATE_500K     = 0b0000_0010;
        const RATE_1M       = 0b0000_0100;
        const RATE_2M       = 0b0000_1000;
    }
}

impl DataRates {
    /// Resolve a Select Rate parameter to a single data rate.
    pub fn from_rate_code(code: u8) -> Option<DataRates> {
        match code {
            0 => Some(DataRates::RATE_250K),
            1 => Some(DataRates::RATE_500K),
            2 => Some(DataRates::RATE_1M),
            3 => Some(DataRates::RATE_2M),
            _ => None,
        }
    }

    /// Return the data rate in bits per second, if exactly one rate is set.
    pub fn bits_per_second(&self) -> Option<u32> {
        match *self {
            DataRates::RATE_250K => Some(250_000),
            DataRates::RATE_500K => Some(500_000),
            DataRates::RATE_1M => Some(1_000_000),
            DataRates::RATE_2M => Some(2_000_000),
            _ => None,
        }
    }
}

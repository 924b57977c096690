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

    src/framer/writer.rs

    Produces MFM sample streams for recorded tape blocks.
*/

use crate::{
    framer::{block_ecc, MfmSample, SYNC_MARK},
    BLOCK_ECC_SIZE,
    BLOCK_PAYLOAD_SIZE,
};

/// The default number of zero preamble bytes written before each block.
pub const DEFAULT_PREAMBLE_BYTES: u16 = 10;

/// Generates the recovered bit stream of recorded blocks, one [MfmSample] per tick.
///
/// Each bit occupies `ticks_per_bit` ticks: a strobe carrying the bit followed by idle ticks.
/// A [BlockWriter] is used to feed a [crate::BlockFramer] from a tape model or a test harness.
#[derive(Copy, Clone, Debug)]
pub struct BlockWriter {
    ticks_per_bit: u32,
    preamble_bytes: u16,
}

impl BlockWriter {
    pub fn new(ticks_per_bit: u32) -> BlockWriter {
        BlockWriter {
            ticks_per_bit: ticks_per_bit.max(1),
            preamble_bytes: DEFAULT_PREAMBLE_BYTES,
        }
    }

    /// Set the number of zero bytes written before each sync mark.
    pub fn with_preamble(mut self, bytes: u16) -> BlockWriter {
        self.preamble_bytes = bytes;
        self
    }

    pub fn write_bit(&self, bit: bool, out: &mut Vec<MfmSample>) {
        out.push(MfmSample::bit(bit));
        for _ in 1..self.ticks_per_bit {
            out.push(MfmSample::idle());
        }
    }

    /// Write a byte, most significant bit first.
    pub fn write_byte(&self, byte: u8, out: &mut Vec<MfmSample>) {
        for i in (0..8).rev() {
            self.write_bit(byte & (1 << i) != 0, out);
        }
    }

    pub fn write_bytes(&self, bytes: &[u8], out: &mut Vec<MfmSample>) {
        for byte in bytes {
            self.write_byte(*byte, out);
        }
    }

    pub fn write_preamble(&self, out: &mut Vec<MfmSample>) {
        for _ in 0..self.preamble_bytes {
            self.write_byte(0x00, out);
        }
    }

    pub fn write_sync(&self, out: &mut Vec<MfmSample>) {
        self.write_byte(SYNC_MARK, out);
        self.write_byte(SYNC_MARK, out);
    }

    /// Write a complete block with a correct ECC.
    pub fn write_block(&self, header: u8, payload: &[u8; BLOCK_PAYLOAD_SIZE], out: &mut Vec<MfmSample>) {
        self.write_raw_block(header, payload, &block_ecc(payload), out);
    }

    /// Write a complete block with the ECC bytes given.
    pub fn write_raw_block(
        &self,
        header: u8,
        payload: &[u8; BLOCK_PAYLOAD_SIZE],
        ecc: &[u8; BLOCK_ECC_SIZE],
        out: &mut Vec<MfmSample>,
    ) {
        self.write_preamble(out);
        self.write_sync(out);
        self.write_byte(header, out);
        self.write_bytes(payload, out);
        self.write_bytes(ecc, out);
    }

    /// Write `ticks` ticks with no bit strobes.
    pub fn write_gap(&self, ticks: u32, out: &mut Vec<MfmSample>) {
        out.extend(std::iter::repeat(MfmSample::idle()).take(ticks as usize));
    }

    /// Return the samples for a single complete block.
    pub fn block_samples(&self, header: u8, payload: &[u8; BLOCK_PAYLOAD_SIZE]) -> Vec<MfmSample> {
        let mut out = Vec::with_capacity(
            (self.preamble_bytes as usize + 3 + BLOCK_PAYLOAD_SIZE + BLOCK_ECC_SIZE) * 8 * self.ticks_per_bit as usize,
        );
        self.write_block(header, payload, &mut out);
        out
    }
}

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

    src/framer/mod.rs

    Defines tape blocks and the events produced while framing an MFM bit stream.
*/

//! Data on a QIC tape is recorded as an MFM bit stream. Each block is introduced by a run of zero
//! preamble bytes and a double `0xA1` sync mark, followed by a header byte, 512 payload bytes and
//! 3 ECC bytes. Blocks are grouped into segments separated by inter-record gaps.
//!
//! Bit recovery is performed upstream; [BlockFramer] consumes one [MfmSample] per tick.

mod ecc;
#[allow(clippy::module_inception)]
mod framer;
mod writer;

pub use ecc::{block_ecc, crc24};
pub use framer::BlockFramer;
pub use writer::BlockWriter;

use crate::{types::BlockKind, BLOCK_ECC_SIZE, BLOCK_PAYLOAD_SIZE};

/// The sync mark that follows the preamble, recorded twice.
pub const SYNC_MARK: u8 = 0xA1;
/// The value of the sync shift register once both sync marks have been received.
pub const DOUBLE_SYNC: u16 = (SYNC_MARK as u16) << 8 | SYNC_MARK as u16;

/// A decoded MFM bit cell as presented to the framer on each tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MfmSample {
    /// The decoded data bit. Only meaningful when `clock` is set.
    pub bit: bool,
    /// Set when a bit cell was recovered on this tick.
    pub clock: bool,
    /// Set while the upstream data separator is locked to the bit stream.
    pub locked: bool,
}

impl MfmSample {
    /// A recovered bit.
    pub fn bit(bit: bool) -> MfmSample {
        MfmSample {
            bit,
            clock: true,
            locked: true,
        }
    }

    /// A tick with no recovered bit while the data separator remains locked.
    pub fn idle() -> MfmSample {
        MfmSample {
            bit: false,
            clock: false,
            locked: true,
        }
    }

    /// A tick on which the data separator has lost lock.
    pub fn unlocked() -> MfmSample {
        MfmSample {
            bit: false,
            clock: false,
            locked: false,
        }
    }
}

/// A complete tape block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub header: u8,
    pub payload: [u8; BLOCK_PAYLOAD_SIZE],
    pub ecc: [u8; BLOCK_ECC_SIZE],
    pub kind: BlockKind,
}

impl Default for Block {
    fn default() -> Self {
        Block {
            header: 0,
            payload: [0; BLOCK_PAYLOAD_SIZE],
            ecc: [0; BLOCK_ECC_SIZE],
            kind: BlockKind::Unknown,
        }
    }
}

impl Block {
    /// Create a block with the given header and payload and a freshly computed ECC.
    pub fn new(header: u8, payload: &[u8; BLOCK_PAYLOAD_SIZE]) -> Block {
        Block {
            header,
            payload: *payload,
            ecc: block_ecc(payload),
            kind: BlockKind::from_header(header),
        }
    }

    /// Return true if the recorded ECC matches the payload.
    pub fn ecc_valid(&self) -> bool {
        block_ecc(&self.payload) == self.ecc
    }
}

/// The part of a block a framed byte belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ByteField {
    Header,
    Payload,
    Ecc,
}

impl ByteField {
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, ByteField::Header)
    }
    #[inline]
    pub fn is_ecc(&self) -> bool {
        matches!(self, ByteField::Ecc)
    }
}

/// Signals raised by the [BlockFramer]. Each event is raised on exactly one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FramerEvent {
    /// A header, payload or ECC byte was framed.
    Byte { value: u8, field: ByteField },
    /// The first block of a new segment has synchronized.
    SegmentStart { segment: u32 },
    /// A full block has been framed.
    BlockComplete { block: Box<Block>, block_in_segment: u16 },
    /// The completed block was a file mark.
    FileMark,
    /// A sync mark followed a preamble shorter than the configured minimum.
    PreambleError { preamble_bytes: u16 },
    /// The data separator lost lock part way through a block.
    SyncLost,
    /// An inter-record gap was detected between blocks.
    InterRecordGap,
    /// An inter-record gap closed a segment.
    SegmentComplete { segment_count: u32, blocks: u16 },
}

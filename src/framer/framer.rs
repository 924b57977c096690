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

    src/framer/framer.rs

    Implements the preamble/sync/block state machine that frames an MFM bit stream into
    tape blocks and segments.
*/

use crate::{
    config::QicConfig,
    framer::{Block, ByteField, FramerEvent, MfmSample, DOUBLE_SYNC},
    types::BlockKind,
    BLOCK_ECC_SIZE,
    BLOCK_PAYLOAD_SIZE,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FramerState {
    HuntPreamble,
    InPreamble,
    SyncVerify,
    Header,
    PayloadAndEcc,
}

/// Splits a recovered MFM bit stream into blocks.
///
/// The framer searches for at least one byte of zero bits, then shifts the bits following the
/// first `1` into a 16-bit register that must match the double sync mark. A sync found after a
/// preamble shorter than the configured minimum is rejected, as is a sync mark seen while
/// hunting with no preamble byte before it. Once synchronized, the header,
/// payload and ECC bytes are collected MSB first.
///
/// Ticks without a bit strobe are counted while the framer is between blocks. Once the count
/// reaches the inter-record gap length an [FramerEvent::InterRecordGap] is raised, and if any
/// blocks were framed since the last gap the segment is closed.
pub struct BlockFramer {
    min_preamble_bytes: u16,
    irg_ticks: u32,
    state: FramerState,
    zero_bits: u32,
    preamble_bytes: u16,
    shift_reg: u16,
    bit_ct: u8,
    byte_ct: usize,
    block: Block,
    block_in_segment: u16,
    segment_count: u32,
    gap_ticks: u32,
    in_gap: bool,
}

impl BlockFramer {
    pub fn new(config: &QicConfig) -> BlockFramer {
        BlockFramer {
            min_preamble_bytes: config.min_preamble_bytes,
            irg_ticks: config.ticks(config.irg_us),
            state: FramerState::HuntPreamble,
            zero_bits: 0,
            preamble_bytes: 0,
            shift_reg: 0,
            bit_ct: 0,
            byte_ct: 0,
            block: Block::default(),
            block_in_segment: 0,
            segment_count: 0,
            gap_ticks: 0,
            in_gap: false,
        }
    }

    /// Return true while the framer is synchronized inside a block.
    #[inline]
    pub fn in_block(&self) -> bool {
        matches!(self.state, FramerState::Header | FramerState::PayloadAndEcc)
    }

    /// Return the index within the current segment of the next block to be framed.
    #[inline]
    pub fn block_in_segment(&self) -> u16 {
        self.block_in_segment
    }

    /// Return the number of segments closed by an inter-record gap since the last reset.
    #[inline]
    pub fn segment_count(&self) -> u32 {
        self.segment_count
    }

    /// Return the framer to its power-on state, discarding any partial block and segment.
    pub fn reset(&mut self) {
        self.hunt();
        self.block_in_segment = 0;
        self.segment_count = 0;
        self.gap_ticks = 0;
        self.in_gap = false;
    }

    /// Abandon any partial block. Segment tracking is retained.
    pub fn resync(&mut self) {
        if self.in_block() || self.state == FramerState::SyncVerify {
            log::debug!("BlockFramer::resync(): discarding partial block");
        }
        self.hunt();
    }

    /// Process one tick of the recovered bit stream, pushing any resulting events to `events`.
    pub fn tick(&mut self, sample: MfmSample, events: &mut Vec<FramerEvent>) {
        if !sample.locked {
            if self.mid_block() {
                log::warn!(
                    "BlockFramer::tick(): sync lost in {:?} after {} bytes",
                    self.state,
                    self.byte_ct
                );
                events.push(FramerEvent::SyncLost);
            }
            self.hunt();
            self.count_gap(events);
            return;
        }

        if !sample.clock {
            if !self.mid_block() {
                self.count_gap(events);
            }
            return;
        }

        self.gap_ticks = 0;
        self.in_gap = false;
        self.shift_bit(sample.bit, events);
    }

    fn mid_block(&self) -> bool {
        matches!(
            self.state,
            FramerState::SyncVerify | FramerState::Header | FramerState::PayloadAndEcc
        )
    }

    fn hunt(&mut self) {
        self.state = FramerState::HuntPreamble;
        self.zero_bits = 0;
        self.preamble_bytes = 0;
        self.shift_reg = 0;
        self.bit_ct = 0;
        self.byte_ct = 0;
    }

    fn count_gap(&mut self, events: &mut Vec<FramerEvent>) {
        self.gap_ticks = self.gap_ticks.saturating_add(1);
        if self.in_gap || self.gap_ticks < self.irg_ticks {
            return;
        }
        self.in_gap = true;
        // A gap breaks any preamble run being counted.
        self.zero_bits = 0;
        self.shift_reg = 0;
        self.state = FramerState::HuntPreamble;
        events.push(FramerEvent::InterRecordGap);

        if self.block_in_segment > 0 {
            self.segment_count += 1;
            log::debug!(
                "BlockFramer::count_gap(): segment {} complete with {} blocks",
                self.segment_count,
                self.block_in_segment
            );
            events.push(FramerEvent::SegmentComplete {
                segment_count: self.segment_count,
                blocks: self.block_in_segment,
            });
            self.block_in_segment = 0;
        }
    }

    fn shift_bit(&mut self, bit: bool, events: &mut Vec<FramerEvent>) {
        match self.state {
            FramerState::HuntPreamble => {
                self.shift_reg = self.shift_reg << 1 | bit as u16;
                if bit {
                    self.zero_bits = 0;
                }
                else {
                    self.zero_bits += 1;
                    if self.zero_bits >= 8 {
                        self.state = FramerState::InPreamble;
                        return;
                    }
                }
                // A sync mark with less than a byte of preamble never reaches InPreamble.
                if self.shift_reg == DOUBLE_SYNC {
                    let preamble_bytes = (self.zero_bits / 8) as u16;
                    log::warn!(
                        "BlockFramer::shift_bit(): sync without preamble (minimum {} bytes)",
                        self.min_preamble_bytes
                    );
                    events.push(FramerEvent::PreambleError { preamble_bytes });
                    self.hunt();
                }
            }
            FramerState::InPreamble => {
                if bit {
                    self.preamble_bytes = (self.zero_bits / 8).min(u16::MAX as u32) as u16;
                    self.shift_reg = 1;
                    self.bit_ct = 1;
                    self.state = FramerState::SyncVerify;
                }
                else {
                    self.zero_bits = self.zero_bits.saturating_add(1);
                }
            }
            FramerState::SyncVerify => {
                self.shift_reg = self.shift_reg << 1 | bit as u16;
                self.bit_ct += 1;
                if self.bit_ct < 16 {
                    return;
                }
                if self.shift_reg != DOUBLE_SYNC {
                    log::trace!("BlockFramer::shift_bit(): sync mismatch: {:04X}", self.shift_reg);
                    self.hunt();
                }
                else if self.preamble_bytes < self.min_preamble_bytes {
                    log::warn!(
                        "BlockFramer::shift_bit(): preamble too short: {} bytes (minimum {})",
                        self.preamble_bytes,
                        self.min_preamble_bytes
                    );
                    events.push(FramerEvent::PreambleError {
                        preamble_bytes: self.preamble_bytes,
                    });
                    self.hunt();
                }
                else {
                    log::trace!(
                        "BlockFramer::shift_bit(): sync after {} preamble bytes",
                        self.preamble_bytes
                    );
                    if self.block_in_segment == 0 {
                        events.push(FramerEvent::SegmentStart {
                            segment: self.segment_count,
                        });
                    }
                    self.shift_reg = 0;
                    self.bit_ct = 0;
                    self.byte_ct = 0;
                    self.state = FramerState::Header;
                }
            }
            FramerState::Header => {
                if let Some(byte) = self.shift_byte(bit) {
                    self.block.header = byte;
                    events.push(FramerEvent::Byte {
                        value: byte,
                        field: ByteField::Header,
                    });
                    self.state = FramerState::PayloadAndEcc;
                }
            }
            FramerState::PayloadAndEcc => {
                if let Some(byte) = self.shift_byte(bit) {
                    let field = if self.byte_ct < BLOCK_PAYLOAD_SIZE {
                        self.block.payload[self.byte_ct] = byte;
                        ByteField::Payload
                    }
                    else {
                        self.block.ecc[self.byte_ct - BLOCK_PAYLOAD_SIZE] = byte;
                        ByteField::Ecc
                    };
                    events.push(FramerEvent::Byte { value: byte, field });
                    self.byte_ct += 1;
                    if self.byte_ct == BLOCK_PAYLOAD_SIZE + BLOCK_ECC_SIZE {
                        self.complete_block(events);
                    }
                }
            }
        }
    }

    fn shift_byte(&mut self, bit: bool) -> Option<u8> {
        self.shift_reg = self.shift_reg << 1 | bit as u16;
        self.bit_ct += 1;
        if self.bit_ct == 8 {
            let byte = self.shift_reg as u8;
            self.shift_reg = 0;
            self.bit_ct = 0;
            Some(byte)
        }
        else {
            None
        }
    }

    fn complete_block(&mut self, events: &mut Vec<FramerEvent>) {
        let mut block = std::mem::take(&mut self.block);
        block.kind = BlockKind::from_header(block.header);
        let is_file_mark = block.kind == BlockKind::FileMark;

        log::debug!(
            "BlockFramer::complete_block(): block {} of segment {}: {} ecc_valid: {}",
            self.block_in_segment,
            self.segment_count,
            block.kind,
            block.ecc_valid()
        );
        events.push(FramerEvent::BlockComplete {
            block: Box::new(block),
            block_in_segment: self.block_in_segment,
        });
        if is_file_mark {
            events.push(FramerEvent::FileMark);
        }
        self.block_in_segment = self.block_in_segment.saturating_add(1);
        self.hunt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer::BlockWriter;

    fn config() -> QicConfig {
        QicConfig::new().with_tick_rate(1_000_000).with_irg(20.0)
    }

    fn run(framer: &mut BlockFramer, samples: &[MfmSample]) -> Vec<FramerEvent> {
        let mut events = Vec::new();
        for sample in samples {
            framer.tick(*sample, &mut events);
        }
        events
    }

    #[test]
    fn test_header_byte_is_reported() {
        let mut framer = BlockFramer::new(&config());
        let mut samples = Vec::new();
        let writer = BlockWriter::new(1).with_preamble(8);
        writer.write_preamble(&mut samples);
        writer.write_sync(&mut samples);
        writer.write_byte(0x1F, &mut samples);

        let events = run(&mut framer, &samples);
        assert_eq!(events[0], FramerEvent::SegmentStart { segment: 0 });
        assert_eq!(
            events[1],
            FramerEvent::Byte {
                value: 0x1F,
                field: ByteField::Header
            }
        );
        assert!(framer.in_block());
    }

    #[test]
    fn test_bad_sync_returns_to_hunt() {
        let mut framer = BlockFramer::new(&config());
        let mut samples = Vec::new();
        let writer = BlockWriter::new(1).with_preamble(8);
        writer.write_preamble(&mut samples);
        writer.write_byte(0xA1, &mut samples);
        writer.write_byte(0xA2, &mut samples);

        let events = run(&mut framer, &samples);
        assert!(events.is_empty());
        assert!(!framer.in_block());
    }

    #[test]
    fn test_gap_raised_once() {
        let mut framer = BlockFramer::new(&config());
        let events = run(&mut framer, &[MfmSample::idle(); 100]);
        assert_eq!(events, vec![FramerEvent::InterRecordGap]);
        assert_eq!(framer.segment_count(), 0);
    }
}

mod common;

use crate::common::{init, test_config};
use fluxfox_qic::{
    framer::block_ecc,
    Block,
    BlockFramer,
    BlockKind,
    BlockWriter,
    ByteField,
    FramerEvent,
    MfmSample,
    BLOCK_PAYLOAD_SIZE,
};

fn payload(seed: u8) -> [u8; BLOCK_PAYLOAD_SIZE] {
    let mut payload = [0u8; BLOCK_PAYLOAD_SIZE];
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte = (i as u8).wrapping_mul(7).wrapping_add(seed);
    }
    payload
}

fn run(framer: &mut BlockFramer, samples: &[MfmSample]) -> Vec<FramerEvent> {
    let mut events = Vec::new();
    for sample in samples {
        framer.tick(*sample, &mut events);
    }
    events
}

fn completed_blocks(events: &[FramerEvent]) -> Vec<(Block, u16)> {
    events
        .iter()
        .filter_map(|e| match e {
            FramerEvent::BlockComplete { block, block_in_segment } => Some(((**block).clone(), *block_in_segment)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_well_formed_block() {
    init();
    let config = test_config();
    let data = payload(3);

    for ticks_per_bit in [1, 2, 4] {
        for preamble in [6, 10, 40] {
            let mut framer = BlockFramer::new(&config);
            let writer = BlockWriter::new(ticks_per_bit).with_preamble(preamble);
            let events = run(&mut framer, &writer.block_samples(0x00, &data));

            let blocks = completed_blocks(&events);
            assert_eq!(blocks.len(), 1, "preamble {} ticks/bit {}", preamble, ticks_per_bit);
            let (block, index) = &blocks[0];
            assert_eq!(*index, 0);
            assert_eq!(block.header, 0x00);
            assert_eq!(block.kind, BlockKind::Data);
            assert_eq!(block.payload, data);
            assert_eq!(block.ecc, block_ecc(&data));
            assert!(block.ecc_valid());
            assert!(!events.iter().any(|e| matches!(e, FramerEvent::PreambleError { .. })));
        }
    }
}

#[test]
fn test_byte_qualifiers() {
    init();
    let config = test_config();
    let mut framer = BlockFramer::new(&config);
    let writer = BlockWriter::new(1);

    let events = run(&mut framer, &writer.block_samples(0x0F, &payload(0)));
    let fields: Vec<ByteField> = events
        .iter()
        .filter_map(|e| match e {
            FramerEvent::Byte { field, .. } => Some(*field),
            _ => None,
        })
        .collect();

    assert_eq!(fields.len(), 1 + 512 + 3);
    assert!(fields[0].is_header());
    assert_eq!(fields.iter().filter(|f| **f == ByteField::Payload).count(), 512);
    assert!(fields[513..].iter().all(|f| f.is_ecc()));
    assert_eq!(completed_blocks(&events)[0].0.kind, BlockKind::Eod);
}

#[test]
fn test_short_preamble() {
    init();
    let config = test_config();
    let mut framer = BlockFramer::new(&config);
    let writer = BlockWriter::new(1).with_preamble(5);

    let events = run(&mut framer, &writer.block_samples(0x00, &payload(1)));
    assert!(events.contains(&FramerEvent::PreambleError { preamble_bytes: 5 }));
    assert!(completed_blocks(&events).is_empty());
    assert!(!events.iter().any(|e| matches!(e, FramerEvent::SegmentStart { .. })));
}

fn preamble_errors(events: &[FramerEvent]) -> Vec<u16> {
    events
        .iter()
        .filter_map(|e| match e {
            FramerEvent::PreambleError { preamble_bytes } => Some(*preamble_bytes),
            _ => None,
        })
        .collect()
}

#[test]
fn test_sync_without_preamble() {
    init();
    let config = test_config();
    let mut framer = BlockFramer::new(&config);
    let mut samples = Vec::new();
    let writer = BlockWriter::new(1);
    writer.write_gap(200, &mut samples);
    samples.extend(writer.with_preamble(0).block_samples(0x00, &payload(2)));

    let events = run(&mut framer, &samples);
    assert!(events.contains(&FramerEvent::InterRecordGap));
    assert_eq!(preamble_errors(&events), vec![0]);
    assert!(completed_blocks(&events).is_empty());
}

#[test]
fn test_sync_after_partial_preamble_byte() {
    init();
    let config = test_config();
    let mut framer = BlockFramer::new(&config);
    let data = payload(2);
    let writer = BlockWriter::new(1).with_preamble(0);
    let mut samples = Vec::new();
    for _ in 0..5 {
        writer.write_bit(false, &mut samples);
    }
    writer.write_block(0x00, &data, &mut samples);
    // A properly recorded block afterwards is still framed.
    BlockWriter::new(1).write_block(0x00, &data, &mut samples);

    let events = run(&mut framer, &samples);
    assert_eq!(preamble_errors(&events), vec![0]);
    let blocks = completed_blocks(&events);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].0.payload, data);
}

#[test]
fn test_configured_minimum_preamble() {
    init();
    let config = test_config().with_min_preamble(12);
    let mut framer = BlockFramer::new(&config);

    let events = run(&mut framer, &BlockWriter::new(1).with_preamble(10).block_samples(0, &payload(1)));
    assert!(events.contains(&FramerEvent::PreambleError { preamble_bytes: 10 }));

    let events = run(&mut framer, &BlockWriter::new(1).with_preamble(12).block_samples(0, &payload(1)));
    assert_eq!(completed_blocks(&events).len(), 1);
}

#[test]
fn test_sync_lost_mid_block() {
    init();
    let config = test_config();
    let mut framer = BlockFramer::new(&config);
    let writer = BlockWriter::new(1);

    let mut samples = writer.block_samples(0x00, &payload(2));
    samples.truncate(samples.len() / 2);
    samples.push(MfmSample::unlocked());

    let events = run(&mut framer, &samples);
    assert_eq!(events.iter().filter(|e| **e == FramerEvent::SyncLost).count(), 1);
    assert!(completed_blocks(&events).is_empty());
    assert!(!framer.in_block());

    // The framer recovers on the next well-formed block.
    let events = run(&mut framer, &writer.block_samples(0x00, &payload(2)));
    assert_eq!(completed_blocks(&events).len(), 1);
}

#[test]
fn test_unlock_between_blocks_is_silent() {
    init();
    let config = test_config();
    let mut framer = BlockFramer::new(&config);

    let events = run(&mut framer, &[MfmSample::unlocked(); 10]);
    assert!(!events.contains(&FramerEvent::SyncLost));
}

#[test]
fn test_segments_and_gaps() {
    init();
    let config = test_config().with_irg(50.0);
    let mut framer = BlockFramer::new(&config);
    let writer = BlockWriter::new(2);

    let mut samples = Vec::new();
    for segment in 0..2u8 {
        for block in 0..3u8 {
            writer.write_block(block, &payload(segment * 3 + block), &mut samples);
        }
        writer.write_gap(60, &mut samples);
    }
    let events = run(&mut framer, &samples);

    let blocks = completed_blocks(&events);
    let indices: Vec<u16> = blocks.iter().map(|(_, i)| *i).collect();
    assert_eq!(indices, vec![0, 1, 2, 0, 1, 2]);

    let starts: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, FramerEvent::SegmentStart { .. }))
        .cloned()
        .collect();
    assert_eq!(
        starts,
        vec![FramerEvent::SegmentStart { segment: 0 }, FramerEvent::SegmentStart { segment: 1 }]
    );

    let completes: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, FramerEvent::SegmentComplete { .. }))
        .cloned()
        .collect();
    assert_eq!(
        completes,
        vec![
            FramerEvent::SegmentComplete {
                segment_count: 1,
                blocks: 3
            },
            FramerEvent::SegmentComplete {
                segment_count: 2,
                blocks: 3
            },
        ]
    );
    assert_eq!(events.iter().filter(|e| **e == FramerEvent::InterRecordGap).count(), 2);
    assert_eq!(framer.segment_count(), 2);
}

#[test]
fn test_file_mark() {
    init();
    let config = test_config();
    let mut framer = BlockFramer::new(&config);
    let writer = BlockWriter::new(1);

    let mut samples = Vec::new();
    writer.write_block(0x00, &payload(0), &mut samples);
    writer.write_block(BlockKind::FILE_MARK_HEADER, &[0u8; BLOCK_PAYLOAD_SIZE], &mut samples);
    let events = run(&mut framer, &samples);

    let blocks = completed_blocks(&events);
    assert_eq!(blocks[1].0.kind, BlockKind::FileMark);
    assert_eq!(events.iter().filter(|e| **e == FramerEvent::FileMark).count(), 1);
    // The file mark follows its block completion.
    let complete_pos = events
        .iter()
        .rposition(|e| matches!(e, FramerEvent::BlockComplete { .. }))
        .unwrap();
    assert_eq!(events[complete_pos + 1], FramerEvent::FileMark);
}

#[test]
fn test_corrupt_ecc_is_reported_not_corrected() {
    init();
    let config = test_config();
    let mut framer = BlockFramer::new(&config);
    let writer = BlockWriter::new(1);
    let data = payload(9);

    let mut ecc = block_ecc(&data);
    ecc[1] ^= 0x40;
    let mut samples = Vec::new();
    writer.write_raw_block(0x00, &data, &ecc, &mut samples);
    let events = run(&mut framer, &samples);

    let blocks = completed_blocks(&events);
    assert_eq!(blocks[0].0.ecc, ecc);
    assert_eq!(blocks[0].0.payload, data);
    assert!(!blocks[0].0.ecc_valid());
}

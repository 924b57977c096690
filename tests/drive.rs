mod common;

use crate::common::{init, ready_host, test_config, Host, MAX_TICKS};
use fluxfox_qic::{
    BlockWriter,
    Command,
    DataRates,
    DetectOptions,
    DetectSequencer,
    DriveErrorCode,
    DriveEvent,
    DriveIdentity,
    DriveType,
    FramerEvent,
    MotionEvent,
    MotionMode,
    QicDrive,
    ReportKind,
    StatusWord,
    BLOCK_PAYLOAD_SIZE,
};

fn qic40() -> DriveIdentity {
    DriveIdentity {
        vendor_id: 0x01,
        model_id: 0x10,
        rom_version: 0x40,
        drive_config: 0x02,
    }
}

fn wait_idle(host: &mut Host) {
    for _ in 0..MAX_TICKS {
        if !host.drive.motion().busy() {
            return;
        }
        host.tick(false);
    }
    panic!("drive did not become idle");
}

#[test]
fn test_detect_emulated_drive() {
    init();
    let config = test_config();
    let mut drive = QicDrive::new(config.clone(), qic40()).unwrap();
    drive.insert_cartridge(false);
    let mut host = Host::new(config.clone(), drive);

    let mut sequencer = DetectSequencer::new(&config, DetectOptions::new().with_rom_version(true));
    sequencer.start_detect();
    for _ in 0..MAX_TICKS {
        let step = sequencer.tick(host.trk0);
        host.tick(step);
        if !sequencer.detecting() {
            break;
        }
    }

    assert!(sequencer.detect_complete());
    assert!(sequencer.drive_present());
    assert!(sequencer.cartridge_present());
    assert!(!sequencer.write_protected());
    assert_eq!(
        sequencer.status_word(),
        Some(StatusWord::READY | StatusWord::CARTRIDGE | StatusWord::NEW_CARTRIDGE | StatusWord::AT_BOT)
    );
    let profile = sequencer.profile().expect("profile should be valid");
    assert_eq!(profile.drive_type, DriveType::Qic40);
    assert_eq!(profile.max_tracks, 20);
    assert_eq!(profile.rom_version, 0x40);
    assert_eq!(profile, host.drive.profile());
}

#[test]
fn test_commands_ignored_until_selected() {
    init();
    let config = test_config();
    let mut drive = QicDrive::new(config.clone(), DriveIdentity::default()).unwrap();
    drive.insert_cartridge(false);
    let mut host = Host::new(config, drive);

    assert_eq!(host.report(Command::ReportVendor), None);
    host.send_command(Command::PhantomSelect);
    assert!(host.events.contains(&DriveEvent::Selected(true)));
    assert_eq!(host.report(Command::ReportVendor), Some(0x01));
    assert_eq!(host.report(Command::ReportModel), Some(0x10));

    host.send_command(Command::PhantomDeselect);
    assert!(!host.drive.selected());
    assert_eq!(host.report(Command::ReportVendor), None);
}

#[test]
fn test_select_not_required() {
    init();
    let config = test_config().with_require_select(false);
    let mut drive = QicDrive::new(config.clone(), DriveIdentity::default()).unwrap();
    drive.insert_cartridge(false);
    let mut host = Host::new(config, drive);

    assert_eq!(host.report(Command::ReportDriveConfig), Some(0x04));
}

#[test]
fn test_status_clears_new_cartridge() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    let first = host.report(Command::ReportStatus).map(StatusWord::from_bits_retain);
    assert_eq!(
        first,
        Some(StatusWord::READY | StatusWord::CARTRIDGE | StatusWord::NEW_CARTRIDGE | StatusWord::AT_BOT)
    );
    let second = host.report(Command::ReportStatus).map(StatusWord::from_bits_retain);
    assert_eq!(
        second,
        Some(StatusWord::READY | StatusWord::CARTRIDGE | StatusWord::AT_BOT)
    );
}

#[test]
fn test_undefined_command_sets_error() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    host.send_pulses(50);
    assert!(host
        .events
        .iter()
        .any(|e| matches!(e, DriveEvent::Command(d) if d.pulse_count == 50 && !d.is_valid())));
    assert_eq!(host.drive.error_code(), DriveErrorCode::UndefinedCommand);
    assert!(host.drive.observables().tape_error);

    assert_eq!(host.report(Command::ReportErrorCode), Some(6));
    assert_eq!(host.drive.error_code(), DriveErrorCode::NoError);
    let status = host.report(Command::ReportStatus).map(StatusWord::from_bits_retain);
    assert!(!status.unwrap().contains(StatusWord::ERROR));
}

#[test]
fn test_seek_track_parameter() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    host.send_command(Command::SeekTrack);
    assert!(host.drive.observables().command_active);
    host.send_parameter(3);
    wait_idle(&mut host);

    assert!(host.events.contains(&DriveEvent::Parameter {
        command: Command::SeekTrack,
        value: 3
    }));
    assert!(host
        .events
        .contains(&DriveEvent::Motion(MotionEvent::CommandDone(Command::SeekTrack))));
    let observables = host.drive.observables();
    assert_eq!(observables.track_position, 3);
    assert_eq!(observables.current_command, Some(Command::SeekTrack));
    assert!(!observables.command_active);
}

#[test]
fn test_seek_illegal_track() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    host.send_command(Command::SeekTrack);
    host.send_parameter(30);
    assert_eq!(host.drive.error_code(), DriveErrorCode::IllegalTrack);
    assert_eq!(host.drive.motion().mode(), MotionMode::Error);
    assert_eq!(host.report(Command::ReportErrorCode), Some(7));
}

#[test]
fn test_select_rate() {
    init();
    let mut host = ready_host(DriveIdentity::default());
    assert_eq!(host.drive.data_rate(), DataRates::RATE_250K);

    host.send_command(Command::SelectRate);
    host.send_parameter(1);
    assert_eq!(host.drive.data_rate(), DataRates::RATE_500K);

    host.send_command(Command::SelectRate);
    host.send_parameter(3);
    assert_eq!(host.drive.data_rate(), DataRates::RATE_500K);
    assert_eq!(host.drive.error_code(), DriveErrorCode::RateSelection);
}

#[test]
fn test_stream_blocks() {
    init();
    let mut host = ready_host(DriveIdentity::default());
    let writer = BlockWriter::new(2);
    let mut samples = Vec::new();
    for i in 0..3u8 {
        writer.write_block(0x00, &[i; BLOCK_PAYLOAD_SIZE], &mut samples);
    }
    writer.write_gap(200, &mut samples);

    host.send_command(Command::LogicalFwd);
    assert_eq!(host.drive.motion().mode(), MotionMode::Streaming);
    host.take_events();

    let mut saw_sync = false;
    let mut saw_segment_complete = false;
    for sample in samples {
        host.mfm = sample;
        host.tick(false);
        let observables = host.drive.observables();
        saw_sync |= observables.block_sync;
        saw_segment_complete |= observables.segment_complete;
    }
    assert!(saw_sync);
    assert!(saw_segment_complete);

    let blocks: Vec<_> = host
        .events
        .iter()
        .filter_map(|e| match e {
            DriveEvent::Framer(FramerEvent::BlockComplete { block, block_in_segment }) => {
                Some((block.payload[0], *block_in_segment, block.ecc_valid()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(blocks, vec![(0, 0, true), (1, 1, true), (2, 2, true)]);
    assert!(host.events.contains(&DriveEvent::Framer(FramerEvent::SegmentComplete {
        segment_count: 1,
        blocks: 3
    })));

    host.send_command(Command::Stop);
    assert_eq!(host.drive.motion().mode(), MotionMode::Idle);
    assert!(!host.drive.motion().motor_on());
}

#[test]
fn test_framer_idle_while_stopped() {
    init();
    let mut host = ready_host(DriveIdentity::default());
    let samples = BlockWriter::new(1).block_samples(0x00, &[0x55; BLOCK_PAYLOAD_SIZE]);

    for sample in samples {
        host.mfm = sample;
        host.tick(false);
    }
    assert!(!host.events.iter().any(|e| matches!(e, DriveEvent::Framer(_))));
}

#[test]
fn test_file_mark_ends_file_skip() {
    init();
    let mut host = ready_host(DriveIdentity::default());
    let writer = BlockWriter::new(1);
    let mut samples = Vec::new();
    writer.write_block(0x00, &[0; BLOCK_PAYLOAD_SIZE], &mut samples);
    writer.write_block(0x1F, &[0; BLOCK_PAYLOAD_SIZE], &mut samples);

    host.send_command(Command::SkipFwdFile);
    assert_eq!(host.drive.motion().mode(), MotionMode::Skipping);
    for sample in samples {
        host.mfm = sample;
        host.tick(false);
    }
    assert!(host.events.contains(&DriveEvent::Framer(FramerEvent::FileMark)));
    assert!(host
        .events
        .contains(&DriveEvent::Motion(MotionEvent::CommandDone(Command::SkipFwdFile))));
    assert!(host.drive.tape_state().position.at_file_mark());
}

#[test]
fn test_index_pulses_move_tape() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    host.send_command(Command::SeekEot);
    let done = host.run_with_index(10, |h| !h.drive.motion().busy());
    assert!(done);
    let observables = host.drive.observables();
    assert_eq!(observables.segment_position, host.config.max_segments - 1);
    assert!(observables.tape_status.contains(StatusWord::AT_EOT));
    assert!(!observables.tape_status.contains(StatusWord::AT_BOT));
}

#[test]
fn test_format_mode_write_gate() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    host.send_command(Command::EnterFormatMode);
    assert!(host.drive.motion().format_mode());
    host.send_command(Command::PhysicalFwd);
    assert!(host.drive.motion().write_gate());

    host.send_command(Command::Pause);
    assert!(!host.drive.motion().write_gate());

    host.send_command(Command::EnterPrimaryMode);
    host.send_command(Command::PhysicalFwd);
    assert!(!host.drive.motion().write_gate());
}

#[test]
fn test_format_mode_write_protected() {
    init();
    let mut host = ready_host(DriveIdentity::default());
    host.drive.set_write_protected(true);

    host.send_command(Command::EnterFormatMode);
    assert!(!host.drive.motion().format_mode());
    assert_eq!(host.drive.error_code(), DriveErrorCode::WriteProtected);
}

#[test]
fn test_skip_rev_at_bot() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    host.send_command(Command::SkipRevSeg);
    assert_eq!(host.drive.error_code(), DriveErrorCode::IllegalSegment);
    let observables = host.drive.observables();
    assert!(observables.tape_error);
    assert!(!observables.tape_ready);
    assert_eq!(observables.segment_position, 0);
}

#[test]
fn test_tape_mode_disable_stops_motor() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    host.send_command(Command::PhysicalFwd);
    assert!(host.drive.motion().motor_on());

    host.drive.set_tape_mode(false);
    let outputs = host.drive.tick(&Default::default(), &mut host.events);
    assert!(!outputs.motor_on);
    assert!(outputs.trk0);

    // Commands are not decoded while tape mode is off.
    host.take_events();
    host.send_command(Command::PhysicalFwd);
    assert!(host.events.is_empty());
    assert!(!host.drive.motion().motor_on());
}

#[test]
fn test_eject() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    host.send_command(Command::Eject);
    wait_idle(&mut host);
    assert!(host.events.contains(&DriveEvent::Motion(MotionEvent::Ejected)));
    assert!(!host.drive.cartridge_present());
    assert!(!host.drive.status_word().contains(StatusWord::CARTRIDGE));
}

#[test]
fn test_report_while_busy_is_dropped() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    host.send_command(Command::ReportVendor);
    assert!(host.drive.encoder().busy());
    host.send_command(Command::ReportModel);
    assert!(host.events.contains(&DriveEvent::ReportDropped(ReportKind::Model)));
    assert_eq!(host.drive.encoder().current_byte(), 0x01);
}

#[test]
fn test_reset_reports_software_reset() {
    init();
    let mut host = ready_host(DriveIdentity::default());

    host.send_command(Command::Reset);
    wait_idle(&mut host);
    assert_eq!(host.drive.error_code(), DriveErrorCode::SoftwareReset);
    assert!(!host.drive.status_word().contains(StatusWord::ERROR));
    assert_eq!(host.report(Command::ReportErrorCode), Some(27));
}

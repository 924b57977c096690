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

    src/motion/controller.rs

    Implements the tape motion state machine.
*/

use crate::{
    command::Command,
    config::QicConfig,
    motion::{MotionError, MotionEvent, MotionInputs},
    types::{Direction, MotionMode, MotionState, TapePosition, TapeState},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Operation {
    Reset { remaining: u32 },
    Seek { command: Command, target: Direction },
    HeadStep { track: u8, remaining: u32 },
    SkipSegment { command: Command },
    SkipFile { command: Command },
    Stream { command: Command },
    Retension,
    Rewind,
    Unload { remaining: u32 },
}

impl Operation {
    fn command(&self) -> Command {
        match self {
            Operation::Reset { .. } => Command::Reset,
            Operation::HeadStep { .. } => Command::SeekTrack,
            Operation::Seek { command, .. }
            | Operation::SkipSegment { command }
            | Operation::SkipFile { command }
            | Operation::Stream { command } => *command,
            Operation::Retension => Command::Retension,
            Operation::Rewind | Operation::Unload { .. } => Command::Eject,
        }
    }
}

/// The tape motion state machine.
///
/// The controller accepts motion commands with [MotionController::issue] and advances any
/// operation in progress with [MotionController::tick]. Each INDEX pulse seen while the tape is
/// moving moves the position one segment in the direction of travel. Seeks complete on arrival
/// at BOT or EOT, segment skips after a single INDEX pulse, and file skips on the next file mark.
///
/// Issuing a motion command while another is in progress abandons the earlier one with a
/// [MotionEvent::Aborted] event. `Pause` and `Stop` end streaming without an abort event.
/// Failed preconditions leave the position untouched and put the controller in the Error state,
/// which any subsequently accepted command leaves. Commands refused while a reset is in progress
/// are reported without disturbing the reset.
pub struct MotionController {
    max_segments: u16,
    max_tracks: u8,
    reset_ticks: u32,
    eject_ticks: u32,
    head_step_ticks: u32,
    enabled: bool,
    cartridge_present: bool,
    tape: TapeState,
    operation: Option<Operation>,
    operation_timer: u32,
    last_error: Option<MotionError>,
}

impl MotionController {
    pub fn new(config: &QicConfig) -> MotionController {
        MotionController {
            max_segments: config.max_segments,
            max_tracks: config.max_tracks,
            reset_ticks: config.ticks(config.reset_us),
            eject_ticks: config.ticks(config.eject_us),
            head_step_ticks: config.ticks(config.head_step_us),
            enabled: true,
            cartridge_present: true,
            tape: TapeState::default(),
            operation: None,
            operation_timer: 0,
            last_error: None,
        }
    }

    /// Return a shared view of the tape state.
    #[inline]
    pub fn tape_state(&self) -> &TapeState {
        &self.tape
    }
    #[inline]
    pub fn position(&self) -> TapePosition {
        self.tape.position
    }
    #[inline]
    pub fn mode(&self) -> MotionMode {
        self.tape.mode()
    }
    #[inline]
    pub fn motion_state(&self) -> MotionState {
        self.tape.state
    }
    #[inline]
    pub fn motor_on(&self) -> bool {
        self.tape.motor_on
    }
    #[inline]
    pub fn tape_moving(&self) -> bool {
        self.tape.tape_moving
    }
    #[inline]
    pub fn write_gate(&self) -> bool {
        self.tape.write_gate
    }
    #[inline]
    pub fn format_mode(&self) -> bool {
        self.tape.format_mode
    }
    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }
    #[inline]
    pub fn max_segments(&self) -> u16 {
        self.max_segments
    }
    #[inline]
    pub fn max_tracks(&self) -> u8 {
        self.max_tracks
    }

    /// Return true while a command is in progress.
    #[inline]
    pub fn busy(&self) -> bool {
        self.operation.is_some()
    }

    /// Return the command in progress, if any.
    pub fn current_command(&self) -> Option<Command> {
        self.operation.map(|op| op.command())
    }

    /// Return the number of ticks spent in the current state.
    #[inline]
    pub fn operation_timer(&self) -> u32 {
        self.operation_timer
    }

    /// Return the most recent command failure. Cleared by Reset.
    #[inline]
    pub fn last_error(&self) -> Option<MotionError> {
        self.last_error
    }

    /// Enable or disable the controller. Disabling stops the motor at once and abandons any
    /// command in progress; the position is held.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            if let Some(op) = self.operation.take() {
                log::debug!(
                    "MotionController::set_enabled(): disabled during {}",
                    op.command()
                );
            }
            self.stop_motor();
            self.enter(MotionState::Idle);
        }
        self.enabled = enabled;
    }

    pub fn set_format_mode(&mut self, state: bool) {
        log::debug!("MotionController::set_format_mode(): {}", state);
        self.tape.format_mode = state;
        self.update_write_gate();
    }

    /// Reinitialize the position for a freshly loaded cartridge: track 0 at BOT.
    pub fn load_tape(&mut self) {
        if self.tape.tape_moving {
            log::warn!("MotionController::load_tape(): tape loaded while moving");
            self.operation = None;
            self.stop_motor();
            self.enter(MotionState::Idle);
        }
        self.tape.position = TapePosition::default();
        self.tape.format_mode = false;
    }

    /// Issue a motion command. Commands that are not motion commands are ignored.
    ///
    /// On a failed precondition a [MotionEvent::CommandError] is pushed to `events`, the
    /// controller enters the Error state, and the error is returned.
    pub fn issue(&mut self, command: Command, events: &mut Vec<MotionEvent>) -> Result<(), MotionError> {
        if !self.enabled {
            log::warn!("MotionController::issue(): disabled, rejecting {}", command);
            return Err(MotionError::Disabled);
        }
        if !command.is_motion() {
            log::debug!("MotionController::issue(): {} is not a motion command", command);
            return Ok(());
        }
        log::debug!(
            "MotionController::issue(): {} in state {} at segment {}",
            command,
            self.tape.state,
            self.tape.position.segment()
        );

        match command {
            Command::Reset => {
                self.abort(events);
                self.stop_motor();
                self.tape.format_mode = false;
                self.last_error = None;
                self.operation = Some(Operation::Reset {
                    remaining: self.reset_ticks,
                });
                self.enter(MotionState::Resetting);
                return Ok(());
            }
            Command::Pause | Command::Stop => {
                if matches!(self.operation, Some(Operation::Stream { .. })) {
                    self.operation = None;
                }
                self.abort(events);
                self.stop_motor();
                self.enter(match command {
                    Command::Pause => MotionState::Paused,
                    _ => MotionState::Idle,
                });
                events.push(MotionEvent::CommandDone(command));
                return Ok(());
            }
            _ => {}
        }

        if self.tape.state == MotionState::Resetting {
            return self.reject(command, MotionError::NotReady, events);
        }
        if !self.cartridge_present {
            return self.fail(command, MotionError::NoCartridge, events);
        }

        let position = self.tape.position;
        match command {
            Command::SeekBot | Command::SeekEot => {
                let target = match command {
                    Command::SeekBot => Direction::Reverse,
                    _ => Direction::Forward,
                };
                self.abort(events);
                if position.at_limit(target) {
                    self.complete(command, events);
                }
                else {
                    self.start_motion(target, Operation::Seek { command, target }, MotionState::Seeking);
                }
            }
            Command::SkipFwdSeg | Command::SkipRevSeg | Command::SkipFwdFile | Command::SkipRevFile => {
                let direction = match command {
                    Command::SkipFwdSeg | Command::SkipFwdFile => Direction::Forward,
                    _ => Direction::Reverse,
                };
                if position.at_limit(direction) {
                    return self.fail(command, Self::limit_error(direction), events);
                }
                self.abort(events);
                let op = match command {
                    Command::SkipFwdSeg | Command::SkipRevSeg => Operation::SkipSegment { command },
                    _ => Operation::SkipFile { command },
                };
                self.start_motion(direction, op, MotionState::Skipping);
            }
            Command::LogicalFwd | Command::LogicalRev | Command::PhysicalFwd | Command::PhysicalRev => {
                let direction = self.stream_direction(command);
                if position.at_limit(direction) {
                    return self.fail(command, Self::limit_error(direction), events);
                }
                self.abort(events);
                self.start_motion(direction, Operation::Stream { command }, MotionState::Streaming);
            }
            Command::Retension => {
                self.abort(events);
                let direction = if position.at_eot() {
                    Direction::Reverse
                }
                else {
                    Direction::Forward
                };
                self.start_motion(direction, Operation::Retension, MotionState::Retensioning);
            }
            Command::Eject => {
                self.abort(events);
                if position.at_bot() {
                    self.stop_motor();
                    self.operation = Some(Operation::Unload {
                        remaining: self.eject_ticks,
                    });
                    self.enter(MotionState::Ejecting);
                }
                else {
                    self.start_motion(Direction::Reverse, Operation::Rewind, MotionState::Ejecting);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Step the head to `track`. The tape does not move.
    pub fn seek_track(&mut self, track: u8, events: &mut Vec<MotionEvent>) -> Result<(), MotionError> {
        if !self.enabled {
            log::warn!("MotionController::seek_track(): disabled, rejecting seek");
            return Err(MotionError::Disabled);
        }
        if self.tape.state == MotionState::Resetting {
            return self.reject(Command::SeekTrack, MotionError::NotReady, events);
        }
        if !self.cartridge_present {
            return self.fail(Command::SeekTrack, MotionError::NoCartridge, events);
        }
        if track >= self.max_tracks {
            return self.fail(Command::SeekTrack, MotionError::IllegalTrack(track), events);
        }

        self.abort(events);
        self.stop_motor();
        let steps = track.abs_diff(self.tape.position.track()) as u32;
        log::debug!(
            "MotionController::seek_track(): track {} -> {} ({} steps)",
            self.tape.position.track(),
            track,
            steps
        );
        if steps == 0 {
            self.complete(Command::SeekTrack, events);
        }
        else {
            self.operation = Some(Operation::HeadStep {
                track,
                remaining: steps.saturating_mul(self.head_step_ticks),
            });
            self.enter(MotionState::Seeking);
        }
        Ok(())
    }

    /// Advance one tick.
    pub fn tick(&mut self, inputs: &MotionInputs, events: &mut Vec<MotionEvent>) {
        self.cartridge_present = inputs.cartridge_present;
        if !self.enabled {
            return;
        }
        self.operation_timer = self.operation_timer.saturating_add(1);

        if let Some(op) = self.operation {
            if !inputs.cartridge_present && !matches!(op, Operation::Reset { .. }) {
                self.operation = None;
                let _ = self.fail(op.command(), MotionError::NoCartridge, events);
                return;
            }

            match op {
                Operation::Reset { remaining } => {
                    if remaining > 1 {
                        self.operation = Some(Operation::Reset {
                            remaining: remaining - 1,
                        });
                    }
                    else {
                        self.complete(Command::Reset, events);
                    }
                }
                Operation::HeadStep { track, remaining } => {
                    if remaining > 1 {
                        self.operation = Some(Operation::HeadStep {
                            track,
                            remaining: remaining - 1,
                        });
                    }
                    else {
                        self.tape.position.set_track(track);
                        self.complete(Command::SeekTrack, events);
                    }
                }
                Operation::Unload { remaining } => {
                    if remaining > 1 {
                        self.operation = Some(Operation::Unload {
                            remaining: remaining - 1,
                        });
                    }
                    else {
                        log::debug!("MotionController::tick(): cartridge unloaded");
                        self.complete(Command::Eject, events);
                        events.push(MotionEvent::Ejected);
                    }
                }
                _ => self.tick_motion(op, inputs, events),
            }
        }
        self.update_write_gate();
    }

    fn tick_motion(&mut self, op: Operation, inputs: &MotionInputs, events: &mut Vec<MotionEvent>) {
        let direction = self.tape.position.direction();

        if inputs.file_mark {
            self.tape.position.set_file_mark(true);
            if let Operation::SkipFile { command } = op {
                log::debug!(
                    "MotionController::tick_motion(): file mark at segment {}",
                    self.tape.position.segment()
                );
                self.complete(command, events);
                return;
            }
        }

        if inputs.index_pulse {
            if self.tape.position.at_limit(direction) {
                match op {
                    Operation::Stream { .. } => {
                        log::debug!("MotionController::tick_motion(): end of tape while streaming {}", direction);
                        self.operation = None;
                        self.stop_motor();
                        self.enter(MotionState::Idle);
                        events.push(MotionEvent::EndOfTape);
                    }
                    Operation::SkipFile { command } => {
                        self.operation = None;
                        let _ = self.fail(command, MotionError::FileMarkNotFound, events);
                    }
                    _ => {}
                }
                return;
            }
            self.tape.position.step_segment(self.max_segments);
            log::trace!(
                "MotionController::tick_motion(): segment {}",
                self.tape.position.segment()
            );
        }

        let position = self.tape.position;
        match op {
            Operation::Seek { command, target } if position.at_limit(target) => {
                self.complete(command, events);
            }
            Operation::SkipSegment { command } if inputs.index_pulse => {
                self.complete(command, events);
            }
            Operation::Retension if position.at_limit(direction) => {
                if direction == Direction::Forward {
                    log::debug!("MotionController::tick_motion(): retension reached EOT, reversing");
                    self.tape.position.set_direction(Direction::Reverse);
                }
                else {
                    self.complete(Command::Retension, events);
                }
            }
            Operation::Rewind if position.at_bot() => {
                self.stop_motor();
                self.operation = Some(Operation::Unload {
                    remaining: self.eject_ticks,
                });
                self.operation_timer = 0;
            }
            _ => {}
        }
    }

    /// Refuse a command without disturbing the operation in progress.
    fn reject(
        &mut self,
        command: Command,
        error: MotionError,
        events: &mut Vec<MotionEvent>,
    ) -> Result<(), MotionError> {
        log::warn!("MotionController::reject(): {} rejected: {}", command, error);
        events.push(MotionEvent::CommandError { command, error });
        Err(error)
    }

    fn limit_error(direction: Direction) -> MotionError {
        match direction {
            Direction::Forward => MotionError::AtEndOfTape,
            Direction::Reverse => MotionError::AtBeginningOfTape,
        }
    }

    /// Resolve the physical direction of a streaming command. Logical directions follow the
    /// serpentine track layout: even tracks are recorded forward, odd tracks in reverse.
    fn stream_direction(&self, command: Command) -> Direction {
        let even_track = self.tape.position.track() % 2 == 0;
        match command {
            Command::PhysicalFwd => Direction::Forward,
            Command::PhysicalRev => Direction::Reverse,
            Command::LogicalFwd if even_track => Direction::Forward,
            Command::LogicalFwd => Direction::Reverse,
            _ if even_track => Direction::Reverse,
            _ => Direction::Forward,
        }
    }

    fn start_motion(&mut self, direction: Direction, op: Operation, state: MotionState) {
        self.tape.position.set_direction(direction);
        self.tape.motor_on = true;
        self.tape.tape_moving = true;
        self.operation = Some(op);
        self.enter(state);
        self.update_write_gate();
    }

    fn stop_motor(&mut self) {
        self.tape.motor_on = false;
        self.tape.tape_moving = false;
        self.tape.write_gate = false;
    }

    fn enter(&mut self, state: MotionState) {
        if state != self.tape.state {
            log::debug!("MotionController::enter(): {} -> {}", self.tape.state, state);
        }
        self.tape.state = state;
        self.operation_timer = 0;
    }

    fn abort(&mut self, events: &mut Vec<MotionEvent>) {
        if let Some(op) = self.operation.take() {
            log::debug!("MotionController::abort(): aborting {}", op.command());
            events.push(MotionEvent::Aborted(op.command()));
        }
    }

    fn complete(&mut self, command: Command, events: &mut Vec<MotionEvent>) {
        log::debug!(
            "MotionController::complete(): {} done at segment {} track {}",
            command,
            self.tape.position.segment(),
            self.tape.position.track()
        );
        self.operation = None;
        self.stop_motor();
        self.enter(MotionState::Idle);
        events.push(MotionEvent::CommandDone(command));
    }

    fn fail(
        &mut self,
        command: Command,
        error: MotionError,
        events: &mut Vec<MotionEvent>,
    ) -> Result<(), MotionError> {
        log::warn!("MotionController::fail(): {} failed: {}", command, error);
        self.abort(events);
        self.stop_motor();
        self.last_error = Some(error);
        self.enter(MotionState::Error);
        events.push(MotionEvent::CommandError { command, error });
        Err(error)
    }

    fn update_write_gate(&mut self) {
        self.tape.write_gate = self.enabled
            && self.tape.format_mode
            && self.tape.tape_moving
            && self.tape.state == MotionState::Streaming
            && self.tape.position.direction() == Direction::Forward;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> MotionController {
        let config = QicConfig::new()
            .with_tick_rate(1_000_000)
            .with_geometry(10, 4)
            .with_mechanics(5.0, 5.0, 3.0);
        MotionController::new(&config)
    }

    #[test]
    fn test_head_step_time() {
        let mut motion = controller();
        let mut events = Vec::new();
        motion.seek_track(2, &mut events).unwrap();
        assert_eq!(motion.mode(), MotionMode::Seeking);
        assert!(!motion.tape_moving());
        for _ in 0..5 {
            motion.tick(&MotionInputs::default(), &mut events);
        }
        assert!(events.is_empty());
        motion.tick(&MotionInputs::default(), &mut events);
        assert_eq!(events, vec![MotionEvent::CommandDone(Command::SeekTrack)]);
        assert_eq!(motion.position().track(), 2);
    }

    #[test]
    fn test_logical_direction_on_odd_track() {
        let mut motion = controller();
        let mut events = Vec::new();
        motion.seek_track(1, &mut events).unwrap();
        for _ in 0..3 {
            motion.tick(&MotionInputs::default(), &mut events);
        }
        motion.issue(Command::SeekEot, &mut events).unwrap();
        for _ in 0..9 {
            motion.tick(&MotionInputs::default().with_index(), &mut events);
        }
        assert!(motion.position().at_eot());

        motion.issue(Command::LogicalFwd, &mut events).unwrap();
        assert_eq!(motion.position().direction(), Direction::Reverse);
        assert!(motion.motor_on());
    }

    #[test]
    fn test_write_gate_follows_format_mode() {
        let mut motion = controller();
        let mut events = Vec::new();
        motion.set_format_mode(true);
        motion.issue(Command::PhysicalFwd, &mut events).unwrap();
        motion.tick(&MotionInputs::default(), &mut events);
        assert!(motion.write_gate());
        motion.issue(Command::Pause, &mut events).unwrap();
        assert!(!motion.write_gate());
        assert_eq!(motion.motion_state(), MotionState::Paused);
        assert_eq!(motion.mode(), MotionMode::Idle);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MotionError::AtBeginningOfTape.code(),
            crate::types::DriveErrorCode::IllegalSegment
        );
        assert_eq!(MotionError::IllegalTrack(40).code(), crate::types::DriveErrorCode::IllegalTrack);
    }
}

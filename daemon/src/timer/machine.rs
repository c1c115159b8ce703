//! Interval timer state machine
//!
//! Owns phase, remaining time and the running flag. All mutation happens
//! through the operations below, driven one `Command` at a time by `run`.

use std::ops::ControlFlow;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use super::command::{Command, Control};
use super::phase::Phase;
use super::state::{CompletionPolicy, TimerState};
use super::tick::TickSource;
use crate::audio::Volume;
use crate::events::TimerEvent;
use crate::sink::{Frame, NotifierSink, PresentationSink};

/// Snapshot served to IPC clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerStatus {
    #[serde(flatten)]
    pub frame: Frame,
    pub volume_percent: u8,
}

/// The Pomodoro state machine
pub struct TimerMachine {
    state: TimerState,
    policy: CompletionPolicy,
    /// Bumped on every start; ticks from older activations are dropped
    generation: u64,
    /// When the current activation started
    started_at: Option<Instant>,
    music_enabled: bool,
    volume: Volume,
    ticks: Box<dyn TickSource>,
    presenter: Box<dyn PresentationSink>,
    notifier: Box<dyn NotifierSink>,
    event_tx: broadcast::Sender<TimerEvent>,
    status_tx: watch::Sender<TimerStatus>,
}

impl TimerMachine {
    /// Create an idle machine at the top of a work session
    pub fn new(
        policy: CompletionPolicy,
        ticks: Box<dyn TickSource>,
        presenter: Box<dyn PresentationSink>,
        notifier: Box<dyn NotifierSink>,
        event_tx: broadcast::Sender<TimerEvent>,
    ) -> Self {
        let state = TimerState::new();
        let volume = Volume::default();
        let (status_tx, _) = watch::channel(TimerStatus {
            frame: Frame::derive(&state, false),
            volume_percent: volume.percent(),
        });

        Self {
            state,
            policy,
            generation: 0,
            started_at: None,
            music_enabled: false,
            volume,
            ticks,
            presenter,
            notifier,
            event_tx,
            status_tx,
        }
    }

    /// Current timer state
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Subscribe to status snapshots, updated after every change
    pub fn status(&self) -> watch::Receiver<TimerStatus> {
        self.status_tx.subscribe()
    }

    /// Current status snapshot
    pub fn snapshot(&self) -> TimerStatus {
        TimerStatus {
            frame: Frame::derive(&self.state, self.music_enabled),
            volume_percent: self.volume.percent(),
        }
    }

    /// Run the controller loop until `Quit` or the channel closes
    pub async fn run(&mut self, mut command_rx: mpsc::Receiver<Command>) {
        info!(phase = %self.state.phase, "timer controller started");
        self.present();

        while let Some(command) = command_rx.recv().await {
            if self.handle(command).is_break() {
                break;
            }
        }

        self.shutdown();
        info!("timer controller stopped");
    }

    /// Apply a single command
    pub fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Control(control) => {
                debug!(%control, "control received");
                match control {
                    Control::Start => self.start(),
                    Control::Pause => self.pause(),
                    Control::ResetToWork => self.reset_to_work(),
                    Control::SwitchToBreak => self.force_switch_to_break(),
                    Control::ToggleMusic => self.toggle_music(),
                }
            }
            Command::SetVolume(percent) => self.set_volume(percent),
            Command::Tick {
                generation,
                elapsed_secs,
            } => {
                if generation == self.generation {
                    self.tick(elapsed_secs);
                } else {
                    debug!(generation, current = self.generation, "dropping stale tick");
                }
            }
            Command::Quit => {
                info!("quit requested");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Begin counting down. No-op if already running.
    pub fn start(&mut self) {
        if self.state.running {
            debug!("start ignored, already running");
            return;
        }

        self.generation += 1;
        self.state.running = true;
        self.started_at = Some(Instant::now());
        self.ticks.start(self.generation);

        info!(
            phase = %self.state.phase,
            remaining_secs = self.state.remaining_secs,
            generation = self.generation,
            "timer started"
        );
        self.emit(TimerEvent::Started {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_secs,
            generation: self.generation,
        });
        self.present();
    }

    /// Stop counting down, keeping the remaining time. No-op if idle.
    pub fn pause(&mut self) {
        if !self.state.running {
            debug!("pause ignored, not running");
            return;
        }

        self.stop_ticking();
        info!(
            phase = %self.state.phase,
            remaining_secs = self.state.remaining_secs,
            "timer paused"
        );
        self.emit(TimerEvent::Paused {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_secs,
        });
        self.present();
    }

    /// Advance the countdown by `elapsed_secs`. Ignored while idle.
    pub fn tick(&mut self, elapsed_secs: u64) {
        if !self.state.running {
            return;
        }

        self.state.remaining_secs = self.state.remaining_secs.saturating_sub(elapsed_secs);
        self.present();

        if self.state.remaining_secs == 0 {
            self.complete_phase();
        }
    }

    /// Finish the current phase and load the next one
    pub fn complete_phase(&mut self) {
        self.stop_ticking();

        let completed = self.state.phase;
        let next = completed.next();
        self.state = TimerState::idle(next);

        info!(from = %completed, to = %next, policy = ?self.policy, "phase completed");

        let message = completed.completion_message();
        self.notifier.phase_completed(completed, message);
        self.refresh_music();
        self.emit(TimerEvent::PhaseCompleted {
            completed,
            next,
            message: message.to_string(),
        });

        match self.policy {
            CompletionPolicy::AutoStart => self.start(),
            CompletionPolicy::Stop => self.present(),
        }
    }

    /// Jump straight into a break and start it
    pub fn force_switch_to_break(&mut self) {
        self.stop_ticking();
        self.state = TimerState::idle(Phase::Break);

        info!("switched to break");
        self.refresh_music();
        self.emit(TimerEvent::SwitchedToBreak);
        self.present();

        self.start();
    }

    /// Return to an idle work session
    pub fn reset_to_work(&mut self) {
        self.stop_ticking();
        self.state = TimerState::idle(Phase::Work);

        info!("reset to work");
        self.refresh_music();
        self.emit(TimerEvent::ResetToWork);
        self.present();
    }

    /// Switch background music on or off
    pub fn toggle_music(&mut self) {
        if self.music_enabled {
            self.notifier.stop_music();
            self.music_enabled = false;
        } else {
            self.music_enabled = self.notifier.play_music(self.state.phase);
            if !self.music_enabled {
                warn!("music did not start, toggle stays off");
            }
        }

        info!(enabled = self.music_enabled, "music toggled");
        self.emit(TimerEvent::MusicToggled {
            enabled: self.music_enabled,
        });
        self.present();
    }

    /// Set playback volume from a percentage, clamped to 100
    pub fn set_volume(&mut self, percent: u32) {
        self.volume = Volume::from_percent(percent);
        let playing = self.notifier.set_volume(self.volume);
        if self.music_enabled && !playing {
            warn!("music stopped, track did not restart at new volume");
            self.music_enabled = false;
        }

        info!(percent = self.volume.percent(), "volume changed");
        self.emit(TimerEvent::VolumeChanged {
            percent: self.volume.percent(),
        });
        self.present();
    }

    /// Re-render the current state to the presentation sink
    pub fn present(&mut self) {
        let status = self.snapshot();
        self.presenter.render(&status.frame);
        self.status_tx.send_replace(status);
    }

    /// Stop ticking and music before exit
    pub fn shutdown(&mut self) {
        self.stop_ticking();
        if self.music_enabled {
            self.notifier.stop_music();
            self.music_enabled = false;
        }
    }

    fn stop_ticking(&mut self) {
        if self.ticks.is_active() {
            self.ticks.cancel();
        }
        self.state.running = false;

        if let Some(started_at) = self.started_at.take() {
            debug!(
                active_ms = started_at.elapsed().as_millis() as u64,
                generation = self.generation,
                "tick source stopped"
            );
        }
    }

    /// Keep the playing track in line with the current phase
    fn refresh_music(&mut self) {
        if self.music_enabled && !self.notifier.play_music(self.state.phase) {
            warn!(phase = %self.state.phase, "music stopped, track for phase unavailable");
            self.music_enabled = false;
        }
    }

    fn emit(&self, event: TimerEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::timer::phase::{BREAK_DURATION_SECS, WORK_DURATION_SECS};

    #[derive(Debug, Clone, PartialEq)]
    enum TickCall {
        Start(u64),
        Cancel,
    }

    #[derive(Clone, Default)]
    struct FakeTicks {
        calls: Arc<Mutex<Vec<TickCall>>>,
        active: Arc<Mutex<bool>>,
    }

    impl FakeTicks {
        fn starts(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|call| matches!(call, TickCall::Start(_)))
                .count()
        }
    }

    impl TickSource for FakeTicks {
        fn start(&mut self, generation: u64) {
            self.calls.lock().unwrap().push(TickCall::Start(generation));
            *self.active.lock().unwrap() = true;
        }

        fn cancel(&mut self) {
            self.calls.lock().unwrap().push(TickCall::Cancel);
            *self.active.lock().unwrap() = false;
        }

        fn is_active(&self) -> bool {
            *self.active.lock().unwrap()
        }
    }

    #[derive(Clone, Default)]
    struct RecordingPresenter {
        frames: Arc<Mutex<Vec<Frame>>>,
    }

    impl PresentationSink for RecordingPresenter {
        fn render(&mut self, frame: &Frame) {
            self.frames.lock().unwrap().push(frame.clone());
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum NotifierCall {
        Completed(Phase, String),
        Play(Phase),
        Stop,
        Volume(Volume),
    }

    #[derive(Clone)]
    struct RecordingNotifier {
        calls: Arc<Mutex<Vec<NotifierCall>>>,
        music_works: Arc<Mutex<bool>>,
        playing: bool,
    }

    impl RecordingNotifier {
        fn new(music_works: bool) -> Self {
            Self {
                calls: Arc::default(),
                music_works: Arc::new(Mutex::new(music_works)),
                playing: false,
            }
        }

        /// Make every later playback attempt fail
        fn break_music(&self) {
            *self.music_works.lock().unwrap() = false;
        }

        fn calls(&self) -> Vec<NotifierCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl NotifierSink for RecordingNotifier {
        fn phase_completed(&mut self, completed: Phase, message: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(NotifierCall::Completed(completed, message.to_string()));
        }

        fn play_music(&mut self, phase: Phase) -> bool {
            self.calls.lock().unwrap().push(NotifierCall::Play(phase));
            self.playing = *self.music_works.lock().unwrap();
            self.playing
        }

        fn stop_music(&mut self) {
            self.calls.lock().unwrap().push(NotifierCall::Stop);
            self.playing = false;
        }

        fn set_volume(&mut self, volume: Volume) -> bool {
            self.calls.lock().unwrap().push(NotifierCall::Volume(volume));
            self.playing = self.playing && *self.music_works.lock().unwrap();
            self.playing
        }
    }

    struct Harness {
        machine: TimerMachine,
        ticks: FakeTicks,
        frames: Arc<Mutex<Vec<Frame>>>,
        notifier: RecordingNotifier,
        events: broadcast::Receiver<TimerEvent>,
    }

    fn harness_with(policy: CompletionPolicy, music_works: bool) -> Harness {
        let ticks = FakeTicks::default();
        let presenter = RecordingPresenter::default();
        let frames = Arc::clone(&presenter.frames);
        let notifier = RecordingNotifier::new(music_works);
        let (event_tx, events) = broadcast::channel(256);

        let machine = TimerMachine::new(
            policy,
            Box::new(ticks.clone()),
            Box::new(presenter),
            Box::new(notifier.clone()),
            event_tx,
        );

        Harness {
            machine,
            ticks,
            frames,
            notifier,
            events,
        }
    }

    fn harness() -> Harness {
        harness_with(CompletionPolicy::Stop, true)
    }

    fn drain(events: &mut broadcast::Receiver<TimerEvent>) -> Vec<TimerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn test_initial_state() {
        let h = harness();
        assert_eq!(h.machine.state(), TimerState::new());
        assert!(!h.ticks.is_active());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut h = harness();

        h.machine.start();
        h.machine.start();

        assert!(h.machine.state().running);
        assert_eq!(h.ticks.starts(), 1);
        assert!(h.ticks.is_active());
    }

    #[test]
    fn test_start_renders_running_frame() {
        let mut h = harness();
        h.machine.start();

        let frames = h.frames.lock().unwrap();
        let last = frames.last().unwrap();
        assert!(last.running);
        assert!(!last.buttons.start);
        assert!(last.buttons.pause);
    }

    #[test]
    fn test_pause_then_start_resumes() {
        let mut h = harness();

        h.machine.start();
        h.machine.tick(10);
        h.machine.pause();
        assert!(!h.ticks.is_active());
        assert_eq!(h.machine.state().remaining_secs, WORK_DURATION_SECS - 10);

        h.machine.start();
        assert_eq!(h.machine.state().remaining_secs, WORK_DURATION_SECS - 10);
        assert!(h.machine.state().running);
    }

    #[test]
    fn test_pause_when_idle_is_noop() {
        let mut h = harness();
        h.machine.pause();

        assert!(h.ticks.calls.lock().unwrap().is_empty());
        assert!(drain(&mut h.events).is_empty());
    }

    #[test]
    fn test_tick_ignored_while_idle() {
        let mut h = harness();
        h.machine.tick(5);
        assert_eq!(h.machine.state().remaining_secs, WORK_DURATION_SECS);
    }

    #[test]
    fn test_tick_floors_at_zero_and_completes() {
        let mut h = harness();
        h.machine.start();
        h.machine.tick(WORK_DURATION_SECS + 100);

        let state = h.machine.state();
        assert_eq!(state.phase, Phase::Break);
        assert_eq!(state.remaining_secs, BREAK_DURATION_SECS);
    }

    #[test]
    fn test_remaining_is_monotonic() {
        let mut h = harness();
        h.machine.start();

        let mut previous = h.machine.state().remaining_secs;
        for elapsed in [1, 3, 0, 2, 7, 1, 1, 4] {
            h.machine.tick(elapsed);
            let remaining = h.machine.state().remaining_secs;
            assert!(remaining <= previous);
            previous = remaining;
        }
        assert_eq!(previous, WORK_DURATION_SECS - 19);
    }

    #[test]
    fn test_full_work_session_completes_once() {
        let mut h = harness();
        h.machine.start();

        for _ in 0..WORK_DURATION_SECS {
            h.machine.tick(1);
        }

        let state = h.machine.state();
        assert_eq!(state.phase, Phase::Break);
        assert_eq!(state.remaining_secs, BREAK_DURATION_SECS);
        assert!(!state.running);

        let completions: Vec<_> = h
            .notifier
            .calls()
            .into_iter()
            .filter(|call| matches!(call, NotifierCall::Completed(..)))
            .collect();
        assert_eq!(
            completions,
            vec![NotifierCall::Completed(
                Phase::Work,
                "Work session completed! Time for a break!".to_string()
            )]
        );
    }

    #[test]
    fn test_the_zero_frame_is_rendered_before_completion() {
        let mut h = harness();
        h.machine.start();
        h.machine.tick(WORK_DURATION_SECS);

        let frames = h.frames.lock().unwrap();
        assert!(frames.iter().any(|frame| frame.phase == Phase::Work
            && frame.remaining_secs == 0
            && frame.warning));
        assert_eq!(frames.last().unwrap().phase, Phase::Break);
    }

    #[test]
    fn test_break_completion_returns_to_work() {
        let mut h = harness();
        h.machine.force_switch_to_break();
        h.machine.tick(BREAK_DURATION_SECS);

        let state = h.machine.state();
        assert_eq!(state.phase, Phase::Work);
        assert_eq!(state.remaining_secs, WORK_DURATION_SECS);
        assert!(h.notifier.calls().contains(&NotifierCall::Completed(
            Phase::Break,
            "Break time is over! Ready to work?".to_string()
        )));
    }

    #[test]
    fn test_auto_start_policy_restarts_next_phase() {
        let mut h = harness_with(CompletionPolicy::AutoStart, true);
        h.machine.start();
        h.machine.tick(WORK_DURATION_SECS);

        let state = h.machine.state();
        assert_eq!(state.phase, Phase::Break);
        assert_eq!(state.remaining_secs, BREAK_DURATION_SECS);
        assert!(state.running);
        assert_eq!(h.ticks.starts(), 2);
    }

    #[test]
    fn test_force_switch_to_break_while_running() {
        let mut h = harness();
        h.machine.start();
        assert_eq!(h.machine.state().remaining_secs, 1500);

        h.machine.force_switch_to_break();

        let state = h.machine.state();
        assert_eq!(state.phase, Phase::Break);
        assert_eq!(state.remaining_secs, BREAK_DURATION_SECS);
        assert!(state.running);

        let calls = h.ticks.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![TickCall::Start(1), TickCall::Cancel, TickCall::Start(2)]
        );
    }

    #[test]
    fn test_reset_to_work_does_not_start() {
        let mut h = harness();
        h.machine.force_switch_to_break();
        h.machine.tick(42);

        h.machine.reset_to_work();

        let state = h.machine.state();
        assert_eq!(state, TimerState::new());
        assert!(!h.ticks.is_active());

        let events = drain(&mut h.events);
        assert_eq!(events.last(), Some(&TimerEvent::ResetToWork));
    }

    #[test]
    fn test_stale_tick_is_dropped() {
        let mut h = harness();
        h.machine.start();
        h.machine.pause();
        h.machine.start();

        h.machine.handle(Command::Tick {
            generation: 1,
            elapsed_secs: 30,
        });
        assert_eq!(h.machine.state().remaining_secs, WORK_DURATION_SECS);

        h.machine.handle(Command::Tick {
            generation: 2,
            elapsed_secs: 30,
        });
        assert_eq!(h.machine.state().remaining_secs, WORK_DURATION_SECS - 30);
    }

    #[test]
    fn test_tick_after_pause_is_dropped() {
        let mut h = harness();
        h.machine.start();
        h.machine.pause();

        h.machine.handle(Command::Tick {
            generation: 1,
            elapsed_secs: 30,
        });
        assert_eq!(h.machine.state().remaining_secs, WORK_DURATION_SECS);
    }

    #[test]
    fn test_toggle_music_follows_phase() {
        let mut h = harness();

        h.machine.toggle_music();
        assert!(h.machine.snapshot().frame.music);

        h.machine.force_switch_to_break();
        h.machine.toggle_music();
        assert!(!h.machine.snapshot().frame.music);

        assert_eq!(
            h.notifier.calls(),
            vec![
                NotifierCall::Play(Phase::Work),
                NotifierCall::Play(Phase::Break),
                NotifierCall::Stop,
            ]
        );
    }

    #[test]
    fn test_failed_music_keeps_toggle_off() {
        let mut h = harness_with(CompletionPolicy::Stop, false);
        h.machine.toggle_music();

        assert!(!h.machine.snapshot().frame.music);
        assert!(!h.frames.lock().unwrap().last().unwrap().music);
        assert_eq!(
            drain(&mut h.events),
            vec![TimerEvent::MusicToggled { enabled: false }]
        );
    }

    #[test]
    fn test_set_volume_clamps_and_forwards() {
        let mut h = harness();
        h.machine.set_volume(50);
        h.machine.set_volume(180);

        assert_eq!(
            h.notifier.calls(),
            vec![
                NotifierCall::Volume(Volume::from_percent(50)),
                NotifierCall::Volume(Volume::from_percent(100)),
            ]
        );
        assert_eq!(h.machine.snapshot().volume_percent, 100);
    }

    #[test]
    fn test_failed_restart_on_volume_change_turns_music_off() {
        let mut h = harness();
        h.machine.toggle_music();
        assert!(h.machine.snapshot().frame.music);

        h.notifier.break_music();
        h.machine.set_volume(30);

        assert!(!h.machine.snapshot().frame.music);
        assert!(!h.frames.lock().unwrap().last().unwrap().music);
        assert!(!h.machine.status().borrow().frame.music);
    }

    #[test]
    fn test_volume_change_keeps_playing_music_on() {
        let mut h = harness();
        h.machine.toggle_music();
        h.machine.set_volume(30);

        assert!(h.machine.snapshot().frame.music);
        assert_eq!(h.machine.snapshot().volume_percent, 30);
    }

    #[test]
    fn test_status_channel_tracks_changes() {
        let mut h = harness();
        let status = h.machine.status();

        h.machine.start();
        h.machine.tick(65);

        let current = status.borrow().clone();
        assert!(current.frame.running);
        assert_eq!(current.frame.remaining_secs, WORK_DURATION_SECS - 65);
        assert_eq!(current.frame.clock, "23:55");
    }

    #[test]
    fn test_quit_breaks_the_loop() {
        let mut h = harness();
        assert!(h.machine.handle(Command::Quit).is_break());
        assert!(h.machine.handle(Control::Start.into()).is_continue());
    }

    #[tokio::test]
    async fn test_run_processes_commands_until_quit() {
        let mut h = harness();
        let (tx, rx) = mpsc::channel(8);

        tx.send(Control::Start.into()).await.unwrap();
        tx.send(Command::Tick {
            generation: 1,
            elapsed_secs: 5,
        })
        .await
        .unwrap();
        tx.send(Command::Quit).await.unwrap();

        h.machine.run(rx).await;

        let state = h.machine.state();
        assert_eq!(state.remaining_secs, WORK_DURATION_SECS - 5);
        assert!(!state.running);
        assert!(!h.ticks.is_active());
    }
}

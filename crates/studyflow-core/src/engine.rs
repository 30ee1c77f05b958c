//! Timer state machine.
//!
//! The engine is a wall-clock-based state machine. It owns no thread and no
//! timer handle -- it exposes an `armed` flag and the host service maps that
//! flag to at most one live tick source. Every transition that re-arms
//! ticking disarms first; at most one tick source exists at any time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running
//!   ^        |
//!   +--------+ (complete / reset)
//! ```
//!
//! Elapsed time is computed from actual timestamp deltas, never from the
//! nominal tick cadence, so throttled or suspended hosts catch up correctly.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::events::{CompletedCategory, Event};
use crate::modes::{next_mode, DurationSettings, Mode, ModeDurations};

/// Remaining-time multiple (seconds) at which a running timer requests a
/// checkpoint save. A catch-up tick that jumps more than one second can step
/// over a multiple entirely; the next one lands within 30 s, so the gap is
/// accepted rather than patched.
const CHECKPOINT_INTERVAL_SECS: u64 = 30;

/// Snapshot of the timer, serialized flat for persistence and for every
/// outbound event. The engine owns the only mutable copy; hosts and storage
/// only ever see clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub is_running: bool,
    pub is_paused: bool,
    pub mode: Mode,
    pub time_remaining_seconds: u64,
    /// Duration of the current session, fixed when the mode was entered.
    pub total_seconds: u64,
    /// Lifetime focus completions; only an explicit reset-all clears it.
    #[serde(default)]
    pub completed_focus_sessions: u32,
    /// Set when a running interval begins; cleared on pause/reset/complete.
    #[serde(default)]
    pub started_at_epoch_ms: Option<u64>,
    /// Timestamp of the last processed tick, used for drift correction.
    #[serde(default)]
    pub last_tick_epoch_ms: Option<u64>,
}

impl TimerState {
    pub fn idle(mode: Mode, total_seconds: u64) -> Self {
        Self {
            is_running: false,
            is_paused: false,
            mode,
            time_remaining_seconds: total_seconds,
            total_seconds,
            completed_focus_sessions: 0,
            started_at_epoch_ms: None,
            last_tick_epoch_ms: None,
        }
    }
}

/// Inbound command protocol.
///
/// Invalid commands for the current state are silent no-ops (empty event
/// vec), never errors -- the engine has no failure states.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Command {
    #[serde(rename = "INIT")]
    Init {
        #[serde(default)]
        saved_state: Option<TimerState>,
    },
    #[serde(rename = "START")]
    Start,
    #[serde(rename = "PAUSE")]
    Pause,
    #[serde(rename = "RESUME")]
    Resume,
    #[serde(rename = "RESET")]
    Reset,
    #[serde(rename = "CHANGE_MODE")]
    ChangeMode {
        mode: Mode,
        /// Explicit session duration override, in seconds.
        #[serde(default)]
        duration: Option<u64>,
    },
    #[serde(rename = "UPDATE_SETTINGS")]
    UpdateSettings { settings: DurationSettings },
    #[serde(rename = "GET_STATE")]
    GetState,
}

impl Command {
    /// Parse a wire-format JSON command. The caller logs and drops parse
    /// failures; they must never desynchronize the engine.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

/// Core timer engine.
///
/// Single-threaded; the host service owns it on one task and feeds it
/// commands and ticks in arrival order.
#[derive(Debug)]
pub struct TimerEngine<C: Clock = SystemClock> {
    state: TimerState,
    durations: ModeDurations,
    clock: C,
    armed: bool,
}

impl TimerEngine<SystemClock> {
    pub fn new(durations: ModeDurations) -> Self {
        Self::with_clock(durations, SystemClock)
    }
}

impl<C: Clock> TimerEngine<C> {
    pub fn with_clock(durations: ModeDurations, clock: C) -> Self {
        let total = durations.for_mode(Mode::Focus);
        Self {
            state: TimerState::idle(Mode::Focus, total),
            durations,
            clock,
            armed: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn durations(&self) -> &ModeDurations {
        &self.durations
    }

    /// Whether a periodic tick source should currently be live.
    pub fn armed(&self) -> bool {
        self.armed
    }

    // ── Command dispatch ─────────────────────────────────────────────

    pub fn handle(&mut self, command: Command) -> Vec<Event> {
        match command {
            Command::Init { saved_state } => self.init(saved_state),
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Reset => self.reset(),
            Command::ChangeMode { mode, duration } => self.change_mode(mode, duration),
            Command::UpdateSettings { settings } => self.update_settings(&settings),
            Command::GetState => vec![self.event_state_update()],
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Adopt the saved snapshot (if any) and reconcile wall-clock time that
    /// passed while no tick source existed. A running snapshot either
    /// restarts with the corrected remainder or completes immediately when
    /// the downtime consumed it.
    pub fn init(&mut self, saved_state: Option<TimerState>) -> Vec<Event> {
        if let Some(saved) = saved_state {
            self.adopt(saved);
        }
        let mut events = Vec::new();
        if self.state.is_running && !self.state.is_paused {
            let now = self.clock.now_ms();
            let passed = self
                .state
                .last_tick_epoch_ms
                .map(|last| now.saturating_sub(last) / 1000)
                .unwrap_or(0);
            self.state.time_remaining_seconds =
                self.state.time_remaining_seconds.saturating_sub(passed);
            self.state.is_running = false;
            self.state.started_at_epoch_ms = None;
            self.state.last_tick_epoch_ms = None;
            if self.state.time_remaining_seconds > 0 {
                events.extend(self.start());
            } else {
                events.extend(self.complete());
            }
        }
        events.insert(
            0,
            Event::Initialized {
                state: self.state.clone(),
                at: Utc::now(),
            },
        );
        events
    }

    /// Begin (or restart) ticking. Valid when not already running; a session
    /// with nothing left completes instead of arming a dead countdown.
    pub fn start(&mut self) -> Vec<Event> {
        if self.state.is_running {
            return Vec::new();
        }
        if self.state.time_remaining_seconds == 0 {
            return self.complete();
        }
        self.disarm();
        let now = self.clock.now_ms();
        self.state.is_running = true;
        self.state.is_paused = false;
        self.state.started_at_epoch_ms = Some(now);
        self.state.last_tick_epoch_ms = Some(now);
        self.arm();
        vec![self.event_update(), self.event_save()]
    }

    /// Advance by actual elapsed wall time. Called by the host's periodic
    /// tick source; sub-second fires are ignored without touching
    /// `last_tick_epoch_ms`, so fractions accumulate until a whole second
    /// has passed.
    pub fn tick(&mut self) -> Vec<Event> {
        if !self.state.is_running {
            return Vec::new();
        }
        let Some(last) = self.state.last_tick_epoch_ms else {
            return Vec::new();
        };
        let now = self.clock.now_ms();
        let elapsed = now.saturating_sub(last) / 1000;
        if elapsed < 1 {
            return Vec::new();
        }
        self.state.time_remaining_seconds =
            self.state.time_remaining_seconds.saturating_sub(elapsed);
        self.state.last_tick_epoch_ms = Some(now);
        let mut events = vec![self.event_update()];
        if self.state.time_remaining_seconds == 0 {
            events.extend(self.complete());
        } else if self.state.time_remaining_seconds % CHECKPOINT_INTERVAL_SECS == 0 {
            events.push(self.event_save());
        }
        events
    }

    /// Valid from running only; pausing twice is a no-op.
    pub fn pause(&mut self) -> Vec<Event> {
        if !self.state.is_running {
            return Vec::new();
        }
        self.disarm();
        self.state.is_running = false;
        self.state.is_paused = true;
        self.state.started_at_epoch_ms = None;
        vec![
            Event::TimerPaused {
                state: self.state.clone(),
                at: Utc::now(),
            },
            self.event_save(),
        ]
    }

    /// Valid from paused only. A paused session that already hit zero
    /// completes instead of restarting.
    pub fn resume(&mut self) -> Vec<Event> {
        if !self.state.is_paused {
            return Vec::new();
        }
        self.state.is_paused = false;
        if self.state.time_remaining_seconds > 0 {
            self.start()
        } else {
            self.complete()
        }
    }

    /// Return to idle with the full session duration restored. Valid from
    /// any state. The focus counter survives; only completion moves it.
    pub fn reset(&mut self) -> Vec<Event> {
        self.disarm();
        self.state.is_running = false;
        self.state.is_paused = false;
        self.state.started_at_epoch_ms = None;
        self.state.last_tick_epoch_ms = None;
        self.state.time_remaining_seconds = self.state.total_seconds;
        vec![
            Event::TimerReset {
                state: self.state.clone(),
                at: Utc::now(),
            },
            self.event_save(),
        ]
    }

    /// Explicit user mode switch. If it interrupts a running session the new
    /// session starts immediately.
    pub fn change_mode(&mut self, mode: Mode, duration: Option<u64>) -> Vec<Event> {
        let was_running = self.state.is_running;
        self.disarm();
        let total = duration
            .filter(|d| *d > 0)
            .unwrap_or_else(|| self.durations.for_mode(mode));
        self.state.mode = mode;
        self.state.total_seconds = total;
        self.state.time_remaining_seconds = total;
        self.state.is_running = false;
        self.state.is_paused = false;
        self.state.started_at_epoch_ms = None;
        self.state.last_tick_epoch_ms = None;
        let mut events = vec![Event::ModeChanged {
            state: self.state.clone(),
            at: Utc::now(),
        }];
        if was_running {
            events.extend(self.start());
        } else {
            events.push(self.event_save());
        }
        events
    }

    /// Merge duration overrides. The current mode's visible time reapplies
    /// immediately only while the machine is not running; otherwise the new
    /// duration waits for the next entry into that mode.
    pub fn update_settings(&mut self, settings: &DurationSettings) -> Vec<Event> {
        self.durations.apply(settings);
        if settings.touches(self.state.mode) && !self.state.is_running {
            let total = self.durations.for_mode(self.state.mode);
            self.state.total_seconds = total;
            self.state.time_remaining_seconds = total;
            return vec![self.event_update()];
        }
        Vec::new()
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Session over: credit focus completions, move to the next mode in the
    /// cycle, and settle into idle.
    fn complete(&mut self) -> Vec<Event> {
        self.disarm();
        let finished = self.state.mode;
        if finished == Mode::Focus {
            self.state.completed_focus_sessions += 1;
        }
        let category = if finished == Mode::Focus {
            CompletedCategory::Focus
        } else {
            CompletedCategory::Break
        };
        let next = next_mode(finished, self.state.completed_focus_sessions);
        let total = self.durations.for_mode(next);
        self.state.mode = next;
        self.state.total_seconds = total;
        self.state.time_remaining_seconds = total;
        self.state.is_running = false;
        self.state.is_paused = false;
        self.state.started_at_epoch_ms = None;
        self.state.last_tick_epoch_ms = None;
        vec![
            Event::TimerCompleted {
                state: self.state.clone(),
                completed_category: category,
                next_mode: next,
                at: Utc::now(),
            },
            self.event_update(),
            self.event_save(),
        ]
    }

    /// Sanitize a loaded snapshot so engine invariants hold before any
    /// transition runs against it.
    fn adopt(&mut self, mut saved: TimerState) {
        if saved.total_seconds == 0 {
            saved.total_seconds = self.durations.for_mode(saved.mode);
        }
        saved.time_remaining_seconds = saved.time_remaining_seconds.min(saved.total_seconds);
        if saved.is_running && saved.is_paused {
            saved.is_paused = false;
        }
        self.state = saved;
    }

    fn arm(&mut self) {
        self.armed = true;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn event_update(&self) -> Event {
        Event::TimerUpdate {
            state: self.state.clone(),
            at: Utc::now(),
        }
    }

    fn event_save(&self) -> Event {
        Event::SaveState {
            state: self.state.clone(),
            at: Utc::now(),
        }
    }

    fn event_state_update(&self) -> Event {
        Event::StateUpdate {
            state: self.state.clone(),
            at: Utc::now(),
        }
    }
}

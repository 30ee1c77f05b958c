//! Async host channel.
//!
//! The engine runs on its own tokio task, reachable only through message
//! passing: commands in over an unbounded channel, events out over another.
//! Commands are processed strictly in arrival order; tick-driven changes
//! interleave with command-driven ones in real-time order on the same task.
//!
//! The periodic tick source is reconciled with the engine's `armed` flag
//! after every command and tick, so at most one interval is ever live.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::warn;

use crate::clock::Clock;
use crate::engine::{Command, TimerEngine};
use crate::events::Event;
use crate::modes::ModeDurations;

/// Nominal tick cadence. The engine computes effects from actual elapsed
/// wall time, so jitter or throttling here only delays updates.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Command-side handle to a spawned engine task.
///
/// Dropping every handle closes the command channel and shuts the task down.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl EngineHandle {
    /// Send a command. Returns `false` once the engine task is gone.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Parse and forward a wire-format JSON command line. Malformed input
    /// is logged and dropped; it never reaches the engine.
    pub fn send_json(&self, line: &str) -> bool {
        match Command::from_json(line) {
            Ok(command) => self.send(command),
            Err(e) => {
                warn!(error = %e, input = line, "dropping malformed command");
                true
            }
        }
    }
}

/// Spawn the engine on its own task and return the command handle plus the
/// outbound event stream. The caller is expected to send `INIT` first.
pub fn spawn<C: Clock>(
    clock: C,
    durations: ModeDurations,
) -> (EngineHandle, mpsc::UnboundedReceiver<Event>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let engine = TimerEngine::with_clock(durations, clock);
    tokio::spawn(run(engine, cmd_rx, event_tx));
    (EngineHandle { commands: cmd_tx }, event_rx)
}

async fn run<C: Clock>(
    mut engine: TimerEngine<C>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<Event>,
) {
    let mut ticker: Option<Interval> = None;
    loop {
        let produced = tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                engine.handle(command)
            }
            _ = next_tick(&mut ticker) => engine.tick(),
        };
        for event in produced {
            if events.send(event).is_err() {
                // Event side hung up; no host left to serve.
                return;
            }
        }
        reconcile_tick_source(&engine, &mut ticker);
    }
}

/// Keep exactly one live interval iff the engine is armed.
fn reconcile_tick_source<C: Clock>(engine: &TimerEngine<C>, ticker: &mut Option<Interval>) {
    match (engine.armed(), ticker.is_some()) {
        (true, false) => {
            let mut interval = time::interval(TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First fire one period from now, not immediately.
            interval.reset();
            *ticker = Some(interval);
        }
        (false, true) => *ticker = None,
        _ => {}
    }
}

/// Awaits the armed interval, or forever when the engine is idle -- the
/// command branch is then the only way the select resumes.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::modes::Mode;

    async fn recv(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        events.recv().await.expect("engine task ended early")
    }

    #[tokio::test(start_paused = true)]
    async fn init_then_get_state_replies_in_order() {
        let clock = ManualClock::new(1_000_000);
        let (handle, mut events) = spawn(clock, ModeDurations::default());
        handle.send(Command::Init { saved_state: None });
        handle.send(Command::GetState);
        assert!(matches!(recv(&mut events).await, Event::Initialized { .. }));
        assert!(matches!(recv(&mut events).await, Event::StateUpdate { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_drive_updates() {
        let clock = ManualClock::new(1_000_000);
        let (handle, mut events) = spawn(clock.clone(), ModeDurations::default());
        handle.send(Command::Start);
        assert!(matches!(recv(&mut events).await, Event::TimerUpdate { .. }));
        assert!(matches!(recv(&mut events).await, Event::SaveState { .. }));

        // Let wall time pass, then wait for the armed interval to fire.
        clock.advance_secs(3);
        match recv(&mut events).await {
            Event::TimerUpdate { state, .. } => {
                assert_eq!(state.time_remaining_seconds, 25 * 60 - 3);
            }
            other => panic!("expected TimerUpdate, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_pause_emits_single_event() {
        let clock = ManualClock::new(1_000_000);
        let (handle, mut events) = spawn(clock, ModeDurations::default());
        handle.send(Command::Start);
        handle.send(Command::Pause);
        handle.send(Command::Pause);
        handle.send(Command::GetState);

        let mut paused_events = 0;
        loop {
            match recv(&mut events).await {
                Event::TimerPaused { .. } => paused_events += 1,
                Event::StateUpdate { state, .. } => {
                    assert!(state.is_paused);
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(paused_events, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_wire_input_is_dropped() {
        let clock = ManualClock::new(1_000_000);
        let (handle, mut events) = spawn(clock, ModeDurations::default());
        assert!(handle.send_json("{not json"));
        assert!(handle.send_json(r#"{"type":"SELF_DESTRUCT"}"#));
        handle.send_json(r#"{"type":"GET_STATE"}"#);
        // Only the valid command produced a reply; the engine is intact.
        match recv(&mut events).await {
            Event::StateUpdate { state, .. } => assert_eq!(state.mode, Mode::Focus),
            other => panic!("expected StateUpdate, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closing_command_channel_stops_task() {
        let clock = ManualClock::new(1_000_000);
        let (handle, mut events) = spawn(clock, ModeDurations::default());
        drop(handle);
        assert!(events.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn change_mode_over_channel() {
        let clock = ManualClock::new(1_000_000);
        let (handle, mut events) = spawn(clock, ModeDurations::default());
        handle.send(Command::ChangeMode {
            mode: Mode::LongBreak,
            duration: None,
        });
        match recv(&mut events).await {
            Event::ModeChanged { state, .. } => {
                assert_eq!(state.mode, Mode::LongBreak);
                assert_eq!(state.total_seconds, 15 * 60);
            }
            other => panic!("expected ModeChanged, got {other:?}"),
        }
    }
}

//! Outbound event protocol.
//!
//! Every state change in the engine produces an [`Event`] carrying a full
//! snapshot of the timer state. The host renders `TIMER_*` events and
//! services `SAVE_STATE` by writing the snapshot to durable storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::TimerState;
use crate::modes::Mode;

/// Category of the session that just finished, as reported by
/// `TIMER_COMPLETED`. Both break kinds collapse to `Break`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletedCategory {
    Focus,
    Break,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Event {
    /// Reply to `INIT`, after any elapsed-time reconciliation.
    #[serde(rename = "INITIALIZED")]
    Initialized { state: TimerState, at: DateTime<Utc> },
    /// Snapshot after a tick or any transition that (re)arms the countdown.
    #[serde(rename = "TIMER_UPDATE")]
    TimerUpdate { state: TimerState, at: DateTime<Utc> },
    #[serde(rename = "TIMER_PAUSED")]
    TimerPaused { state: TimerState, at: DateTime<Utc> },
    #[serde(rename = "TIMER_RESET")]
    TimerReset { state: TimerState, at: DateTime<Utc> },
    /// A session reached zero. Carries the category that finished and the
    /// mode the engine moved into; `state` is the resulting idle snapshot.
    #[serde(rename = "TIMER_COMPLETED")]
    TimerCompleted {
        state: TimerState,
        completed_category: CompletedCategory,
        next_mode: Mode,
        at: DateTime<Utc>,
    },
    /// Explicit user mode switch took effect.
    #[serde(rename = "MODE_CHANGED")]
    ModeChanged { state: TimerState, at: DateTime<Utc> },
    /// Reply to `GET_STATE`.
    #[serde(rename = "STATE_UPDATE")]
    StateUpdate { state: TimerState, at: DateTime<Utc> },
    /// Request to the host: persist this snapshot. Best-effort, never
    /// acknowledged back to the engine.
    #[serde(rename = "SAVE_STATE")]
    SaveState { state: TimerState, at: DateTime<Utc> },
}

impl Event {
    /// The snapshot carried by the event.
    pub fn state(&self) -> &TimerState {
        match self {
            Event::Initialized { state, .. }
            | Event::TimerUpdate { state, .. }
            | Event::TimerPaused { state, .. }
            | Event::TimerReset { state, .. }
            | Event::TimerCompleted { state, .. }
            | Event::ModeChanged { state, .. }
            | Event::StateUpdate { state, .. }
            | Event::SaveState { state, .. } => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::ModeDurations;

    fn idle_state() -> TimerState {
        TimerState::idle(Mode::Focus, ModeDurations::default().for_mode(Mode::Focus))
    }

    #[test]
    fn events_use_screaming_snake_wire_tags() {
        let json = serde_json::to_string(&Event::TimerUpdate {
            state: idle_state(),
            at: Utc::now(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"TIMER_UPDATE""#));
    }

    #[test]
    fn state_accessor_returns_carried_snapshot() {
        let state = idle_state();
        let event = Event::SaveState {
            state: state.clone(),
            at: Utc::now(),
        };
        assert_eq!(event.state(), &state);
    }

    #[test]
    fn completed_event_carries_category_and_next_mode() {
        let json = serde_json::to_string(&Event::TimerCompleted {
            state: idle_state(),
            completed_category: CompletedCategory::Focus,
            next_mode: Mode::ShortBreak,
            at: Utc::now(),
        })
        .unwrap();
        assert!(json.contains(r#""completedCategory":"focus""#));
        assert!(json.contains(r#""nextMode":"shortBreak""#));
    }
}

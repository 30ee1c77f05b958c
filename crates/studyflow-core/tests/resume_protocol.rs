//! End-to-end resume protocol: a host persists every SAVE_STATE snapshot,
//! tears the engine down, and a fresh engine reconstructs from the store.

use std::cell::RefCell;

use studyflow_core::{
    Clock, Command, CompletedCategory, Event, ManualClock, Mode, ModeDurations, SnapshotStore,
    TimerEngine, TimerState,
};

/// Host-owned store: keeps the serialized document, like the real thing.
#[derive(Default)]
struct MemoryStore {
    doc: RefCell<Option<String>>,
}

impl SnapshotStore for MemoryStore {
    fn save(&self, state: &TimerState) {
        if let Ok(json) = serde_json::to_string(state) {
            *self.doc.borrow_mut() = Some(json);
        }
    }

    fn load(&self) -> Option<TimerState> {
        let doc = self.doc.borrow();
        serde_json::from_str(doc.as_deref()?).ok()
    }
}

fn drain_to_store(store: &MemoryStore, events: &[Event]) {
    for event in events {
        if let Event::SaveState { state, .. } = event {
            store.save(state);
        }
    }
}

const T0: u64 = 1_700_000_000_000;

#[test]
fn running_session_survives_host_teardown() {
    let store = MemoryStore::default();
    let clock = ManualClock::new(T0);

    // First host lifetime: run 40 s into a default focus session.
    {
        let mut engine = TimerEngine::with_clock(ModeDurations::default(), clock.clone());
        drain_to_store(&store, &engine.handle(Command::Init { saved_state: None }));
        drain_to_store(&store, &engine.handle(Command::Start));
        clock.advance_secs(40);
        drain_to_store(&store, &engine.tick());
        // Host dies here; the last checkpoint is whatever made it to the store.
    }

    // 70 s of downtime while no engine exists.
    clock.advance_secs(70);

    // Second host lifetime: reload and reconcile.
    let mut engine = TimerEngine::with_clock(ModeDurations::default(), clock.clone());
    let events = engine.handle(Command::Init {
        saved_state: store.load(),
    });
    assert!(matches!(events[0], Event::Initialized { .. }));

    let state = engine.state();
    assert!(state.is_running, "positive remainder must restart ticking");
    assert_eq!(state.time_remaining_seconds, 25 * 60 - 40 - 70);
    assert_eq!(state.last_tick_epoch_ms, Some(clock.now_ms()));
}

#[test]
fn downtime_longer_than_remainder_completes_on_reload() {
    let store = MemoryStore::default();
    let clock = ManualClock::new(T0);

    {
        let mut engine = TimerEngine::with_clock(
            ModeDurations {
                focus_secs: 60,
                short_break_secs: 300,
                long_break_secs: 900,
            },
            clock.clone(),
        );
        drain_to_store(&store, &engine.handle(Command::Start));
        clock.advance_secs(30);
        // remaining 30, a checkpoint multiple
        drain_to_store(&store, &engine.tick());
    }

    clock.advance_secs(3_600);

    let mut engine = TimerEngine::with_clock(
        ModeDurations {
            focus_secs: 60,
            short_break_secs: 300,
            long_break_secs: 900,
        },
        clock.clone(),
    );
    let events = engine.handle(Command::Init {
        saved_state: store.load(),
    });
    let completed = events.iter().find_map(|e| match e {
        Event::TimerCompleted {
            completed_category,
            next_mode,
            ..
        } => Some((*completed_category, *next_mode)),
        _ => None,
    });
    assert_eq!(completed, Some((CompletedCategory::Focus, Mode::ShortBreak)));
    let state = engine.state();
    assert!(!state.is_running);
    assert_eq!(state.mode, Mode::ShortBreak);
    assert_eq!(state.completed_focus_sessions, 1);
}

#[test]
fn paused_session_reloads_verbatim() {
    let store = MemoryStore::default();
    let clock = ManualClock::new(T0);

    let paused_state;
    {
        let mut engine = TimerEngine::with_clock(ModeDurations::default(), clock.clone());
        engine.handle(Command::Start);
        clock.advance_secs(125);
        engine.tick();
        drain_to_store(&store, &engine.handle(Command::Pause));
        paused_state = engine.state().clone();
    }

    // Downtime must not eat into a paused session.
    clock.advance_secs(10_000);

    let mut engine = TimerEngine::with_clock(ModeDurations::default(), clock.clone());
    engine.handle(Command::Init {
        saved_state: store.load(),
    });
    assert_eq!(engine.state(), &paused_state);
}

//! Timer commands.
//!
//! Most subcommands act as a synchronous host: reconstruct the engine from
//! the last snapshot, apply one command, print the resulting events as JSON,
//! and save the final state for the next invocation. `watch` instead runs
//! the engine as a long-lived host over stdin/stdout JSON lines.

use std::io::BufRead;

use clap::Subcommand;
use studyflow_core::storage::{Config, Database, SnapshotStore};
use studyflow_core::{service, Command, DurationSettings, Event, Mode, SystemClock, TimerEngine};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the countdown
    Start,
    /// Pause the running countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Reset the current session to its full duration
    Reset,
    /// Print current timer state as JSON (reconciles elapsed time first)
    Status,
    /// Switch to a different mode (focus, short-break, long-break)
    Mode {
        mode: Mode,
        /// Session duration override, in minutes
        #[arg(long)]
        minutes: Option<u64>,
    },
    /// Update default session durations, in minutes
    Settings {
        #[arg(long)]
        focus: Option<u64>,
        #[arg(long)]
        short_break: Option<u64>,
        #[arg(long)]
        long_break: Option<u64>,
    },
    /// Run the engine as a long-lived host: JSON commands on stdin,
    /// JSON events on stdout, until stdin closes
    Watch,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    if let TimerAction::Watch = action {
        return watch();
    }

    let db = Database::open()?;
    let config = Config::load_or_default();
    let mut engine = TimerEngine::new(config.durations());

    // Reconstruct from the last snapshot. A snapshot saved while running
    // reconciles downtime here and may complete immediately.
    let mut events = engine.handle(Command::Init {
        saved_state: db.load(),
    });

    events.extend(match action {
        TimerAction::Start => engine.handle(Command::Start),
        TimerAction::Pause => engine.handle(Command::Pause),
        TimerAction::Resume => engine.handle(Command::Resume),
        TimerAction::Reset => engine.handle(Command::Reset),
        TimerAction::Status => engine.handle(Command::GetState),
        TimerAction::Mode { mode, minutes } => engine.handle(Command::ChangeMode {
            mode,
            duration: minutes.map(|m| m.saturating_mul(60)),
        }),
        TimerAction::Settings {
            focus,
            short_break,
            long_break,
        } => engine.handle(Command::UpdateSettings {
            settings: DurationSettings {
                focus,
                short_break,
                long_break,
            },
        }),
        TimerAction::Watch => unreachable!("handled above"),
    });

    for event in &events {
        match event {
            Event::SaveState { .. } => db.save(event.state()),
            other => println!("{}", serde_json::to_string_pretty(other)?),
        }
    }

    // Always persist the final state so the next invocation resumes here.
    db.save(engine.state());
    Ok(())
}

fn watch() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let db = Database::open()?;
        let config = Config::load_or_default();
        let (handle, mut events) = service::spawn(SystemClock, config.durations());
        handle.send(Command::Init {
            saved_state: db.load(),
        });

        // stdin is blocking; feed the engine from a plain thread. Dropping
        // the handle on EOF closes the command channel and stops the task.
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                if !handle.send_json(&line) {
                    break;
                }
            }
        });

        while let Some(event) = events.recv().await {
            match &event {
                Event::SaveState { .. } => db.save(event.state()),
                other => println!("{}", serde_json::to_string(other)?),
            }
        }
        Ok(())
    })
}

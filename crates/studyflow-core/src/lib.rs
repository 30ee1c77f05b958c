//! # Studyflow Core Library
//!
//! Core business logic for the Studyflow focus timer. The product around it
//! is CRUD glue; this crate holds the one piece with real temporal-correctness
//! concerns: the background focus-timer engine that keeps counting correctly
//! across host teardowns, suspensions, and scheduler throttling.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a wall-clock-based state machine; the host arms a 1 s
//!   tick source whenever the engine reports itself armed, and every tick's
//!   effect is computed from actual timestamp deltas (drift correction)
//! - **Host Channel**: the engine runs on its own tokio task, reachable only
//!   through async command/event message passing
//! - **Persistence**: best-effort snapshot storage over SQLite plus a
//!   TOML-based configuration file
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: core timer state machine
//! - [`service`]: async host channel around the engine
//! - [`Database`]: durable snapshot store
//! - [`Config`]: application configuration management

pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod modes;
pub mod service;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Command, TimerEngine, TimerState};
pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::{CompletedCategory, Event};
pub use modes::{DurationSettings, Mode, ModeDurations};
pub use service::EngineHandle;
pub use storage::{Config, Database, SnapshotStore};

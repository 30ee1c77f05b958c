//! Session modes and the mode table.
//!
//! Maps each session kind to its configured duration and encodes the
//! Pomodoro cycle rule for escalating to a long break.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of completed focus sessions between long breaks.
pub const FOCUS_SESSIONS_PER_CYCLE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Focus => "focus",
            Mode::ShortBreak => "short-break",
            Mode::LongBreak => "long-break",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(Mode::Focus),
            "short-break" | "shortBreak" => Ok(Mode::ShortBreak),
            "long-break" | "longBreak" => Ok(Mode::LongBreak),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// The mode that follows a completed session.
///
/// `completed_focus_sessions` is the counter *after* the finished session was
/// credited: the 4th, 8th, 12th... focus completion earns a long break.
pub fn next_mode(finished: Mode, completed_focus_sessions: u32) -> Mode {
    match finished {
        Mode::Focus => {
            if completed_focus_sessions % FOCUS_SESSIONS_PER_CYCLE == 0 {
                Mode::LongBreak
            } else {
                Mode::ShortBreak
            }
        }
        Mode::ShortBreak | Mode::LongBreak => Mode::Focus,
    }
}

/// Configured duration per mode, in seconds.
///
/// Process-wide configuration owned by the engine; replaceable at runtime
/// via `UPDATE_SETTINGS`. Defaults to the classic 25/5/15 minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeDurations {
    pub focus_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
}

impl Default for ModeDurations {
    fn default() -> Self {
        Self::from_minutes(25, 5, 15)
    }
}

impl ModeDurations {
    pub fn from_minutes(focus: u64, short_break: u64, long_break: u64) -> Self {
        Self {
            focus_secs: focus.saturating_mul(60),
            short_break_secs: short_break.saturating_mul(60),
            long_break_secs: long_break.saturating_mul(60),
        }
    }

    pub fn for_mode(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Focus => self.focus_secs,
            Mode::ShortBreak => self.short_break_secs,
            Mode::LongBreak => self.long_break_secs,
        }
    }

    /// Merge a partial settings update. Zero values are ignored -- a session
    /// duration must stay positive.
    pub fn apply(&mut self, settings: &DurationSettings) {
        if let Some(m) = settings.focus.filter(|m| *m > 0) {
            self.focus_secs = m.saturating_mul(60);
        }
        if let Some(m) = settings.short_break.filter(|m| *m > 0) {
            self.short_break_secs = m.saturating_mul(60);
        }
        if let Some(m) = settings.long_break.filter(|m| *m > 0) {
            self.long_break_secs = m.saturating_mul(60);
        }
    }
}

/// Partial duration override carried by `UPDATE_SETTINGS`, in minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationSettings {
    #[serde(default)]
    pub focus: Option<u64>,
    #[serde(default)]
    pub short_break: Option<u64>,
    #[serde(default)]
    pub long_break: Option<u64>,
}

impl DurationSettings {
    /// Whether this update names the given mode.
    pub fn touches(&self, mode: Mode) -> bool {
        match mode {
            Mode::Focus => self.focus.is_some(),
            Mode::ShortBreak => self.short_break.is_some(),
            Mode::LongBreak => self.long_break.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_25_5_15_minutes() {
        let d = ModeDurations::default();
        assert_eq!(d.for_mode(Mode::Focus), 25 * 60);
        assert_eq!(d.for_mode(Mode::ShortBreak), 5 * 60);
        assert_eq!(d.for_mode(Mode::LongBreak), 15 * 60);
    }

    #[test]
    fn fourth_focus_completion_earns_long_break() {
        assert_eq!(next_mode(Mode::Focus, 1), Mode::ShortBreak);
        assert_eq!(next_mode(Mode::Focus, 3), Mode::ShortBreak);
        assert_eq!(next_mode(Mode::Focus, 4), Mode::LongBreak);
        assert_eq!(next_mode(Mode::Focus, 8), Mode::LongBreak);
        assert_eq!(next_mode(Mode::Focus, 9), Mode::ShortBreak);
    }

    #[test]
    fn breaks_always_return_to_focus() {
        assert_eq!(next_mode(Mode::ShortBreak, 4), Mode::Focus);
        assert_eq!(next_mode(Mode::LongBreak, 4), Mode::Focus);
    }

    #[test]
    fn apply_merges_only_named_modes() {
        let mut d = ModeDurations::default();
        d.apply(&DurationSettings {
            focus: Some(50),
            ..Default::default()
        });
        assert_eq!(d.focus_secs, 50 * 60);
        assert_eq!(d.short_break_secs, 5 * 60);
    }

    #[test]
    fn apply_ignores_zero_minutes() {
        let mut d = ModeDurations::default();
        d.apply(&DurationSettings {
            focus: Some(0),
            ..Default::default()
        });
        assert_eq!(d.focus_secs, 25 * 60);
    }

    #[test]
    fn mode_parses_wire_and_cli_spellings() {
        assert_eq!("focus".parse::<Mode>().unwrap(), Mode::Focus);
        assert_eq!("short-break".parse::<Mode>().unwrap(), Mode::ShortBreak);
        assert_eq!("longBreak".parse::<Mode>().unwrap(), Mode::LongBreak);
        assert!("nap".parse::<Mode>().is_err());
    }
}

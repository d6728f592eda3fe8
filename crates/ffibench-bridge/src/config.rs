//! Bridge configuration.
//!
//! Both settings are read from the environment on first use and cached for
//! the rest of the process:
//! - `FFIBENCH_LOG`: diagnostic threshold, one of `off`, `error`, `warn`
//!   (default), `info`, `debug`. Fatal diagnostics are emitted regardless.
//! - `FFIBENCH_ON_FATAL`: what an unrecoverable bridge error does to the
//!   process. `exit` (default) exits with status 70, `abort` raises SIGABRT so
//!   a JVM writes its crash log.

use std::sync::atomic::{AtomicU8, Ordering};

/// Diagnostic severity, also used as the emission threshold.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Only fatal diagnostics.
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// Parse from string (case-insensitive). Unknown values give the default.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "quiet" | "0" => Self::Off,
            "error" | "err" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "info" => Self::Info,
            "debug" | "trace" | "all" => Self::Debug,
            _ => Self::default(),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    const fn encode(self) -> u8 {
        match self {
            Self::Off => 1,
            Self::Error => 2,
            Self::Warn => 3,
            Self::Info => 4,
            Self::Debug => 5,
        }
    }

    const fn decode(v: u8) -> Self {
        match v {
            1 => Self::Off,
            2 => Self::Error,
            4 => Self::Info,
            5 => Self::Debug,
            _ => Self::Warn,
        }
    }
}

/// Process-level reaction to an unrecoverable bridge error.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatalAction {
    /// `std::process::exit` with a non-zero status.
    #[default]
    Exit,
    /// `std::process::abort`.
    Abort,
}

impl FatalAction {
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "crash" | "sigabrt" => Self::Abort,
            _ => Self::Exit,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Abort => "abort",
        }
    }

    const fn encode(self) -> u8 {
        match self {
            Self::Exit => 1,
            Self::Abort => 2,
        }
    }

    const fn decode(v: u8) -> Self {
        match v {
            2 => Self::Abort,
            _ => Self::Exit,
        }
    }
}

// Cache states: 0 = unresolved, 255 = resolving, anything else is an encoded
// value. A caller that arrives while another one resolves gets the default
// instead of blocking.
const UNRESOLVED: u8 = 0;
const RESOLVING: u8 = 255;

static CACHED_LOG_LEVEL: AtomicU8 = AtomicU8::new(UNRESOLVED);
static CACHED_FATAL_ACTION: AtomicU8 = AtomicU8::new(UNRESOLVED);

fn resolve_cached(cache: &AtomicU8, var: &str, parse: fn(&str) -> u8, default: u8) -> u8 {
    let cached = cache.load(Ordering::Relaxed);

    // Fast path: already resolved.
    if cached != UNRESOLVED && cached != RESOLVING {
        return cached;
    }

    if cached == RESOLVING {
        return default;
    }

    // Try to claim the resolution slot.
    if cache
        .compare_exchange(UNRESOLVED, RESOLVING, Ordering::SeqCst, Ordering::Relaxed)
        .is_err()
    {
        let v = cache.load(Ordering::Relaxed);
        return if v != UNRESOLVED && v != RESOLVING {
            v
        } else {
            default
        };
    }

    let value = std::env::var(var).map(|v| parse(&v)).unwrap_or(default);
    cache.store(value, Ordering::Release);
    value
}

/// Configured diagnostic threshold (reads `FFIBENCH_LOG` once).
#[must_use]
pub fn log_level() -> LogLevel {
    LogLevel::decode(resolve_cached(
        &CACHED_LOG_LEVEL,
        "FFIBENCH_LOG",
        |raw| LogLevel::from_str_loose(raw).encode(),
        LogLevel::default().encode(),
    ))
}

/// Whether a diagnostic at `level` passes the configured threshold.
#[must_use]
pub fn log_enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= log_level()
}

/// Configured fatal-error reaction (reads `FFIBENCH_ON_FATAL` once).
#[must_use]
pub fn fatal_action() -> FatalAction {
    FatalAction::decode(resolve_cached(
        &CACHED_FATAL_ACTION,
        "FFIBENCH_ON_FATAL",
        |raw| FatalAction::from_str_loose(raw).encode(),
        FatalAction::default().encode(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_levels() {
        assert_eq!(LogLevel::from_str_loose("off"), LogLevel::Off);
        assert_eq!(LogLevel::from_str_loose("ERROR"), LogLevel::Error);
        assert_eq!(LogLevel::from_str_loose("warning"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str_loose(" info "), LogLevel::Info);
        assert_eq!(LogLevel::from_str_loose("trace"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str_loose("bogus"), LogLevel::Warn);
    }

    #[test]
    fn parse_fatal_actions() {
        assert_eq!(FatalAction::from_str_loose("exit"), FatalAction::Exit);
        assert_eq!(FatalAction::from_str_loose("ABORT"), FatalAction::Abort);
        assert_eq!(FatalAction::from_str_loose("crash"), FatalAction::Abort);
        assert_eq!(FatalAction::from_str_loose("bogus"), FatalAction::Exit);
    }

    #[test]
    fn encodings_round_trip_and_avoid_sentinels() {
        for level in [
            LogLevel::Off,
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
        ] {
            let code = level.encode();
            assert!(code != UNRESOLVED && code != RESOLVING);
            assert_eq!(LogLevel::decode(code), level);
        }
        for action in [FatalAction::Exit, FatalAction::Abort] {
            assert_eq!(FatalAction::decode(action.encode()), action);
        }
    }

    #[test]
    fn threshold_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Off < LogLevel::Error);
    }

    #[test]
    fn cached_level_is_process_sticky_until_cache_reset() {
        let previous = CACHED_LOG_LEVEL.swap(LogLevel::Debug.encode(), Ordering::SeqCst);
        assert_eq!(log_level(), LogLevel::Debug);
        assert!(log_enabled(LogLevel::Info));
        assert!(!log_enabled(LogLevel::Off));

        CACHED_LOG_LEVEL.store(LogLevel::Off.encode(), Ordering::SeqCst);
        assert_eq!(log_level(), LogLevel::Off);
        assert!(!log_enabled(LogLevel::Error));

        CACHED_LOG_LEVEL.store(previous, Ordering::SeqCst);
    }

    #[test]
    fn resolving_state_returns_default() {
        let previous = CACHED_FATAL_ACTION.swap(RESOLVING, Ordering::SeqCst);
        assert_eq!(fatal_action(), FatalAction::Exit);
        CACHED_FATAL_ACTION.store(previous, Ordering::SeqCst);
    }
}

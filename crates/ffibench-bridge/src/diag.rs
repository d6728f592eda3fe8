//! Bridge diagnostics: one JSON object per line on stderr.
//!
//! Lines look like
//! `{"timestamp_ms":..,"level":"info","component":"bridge","event":"binding_established",...}`.
//! Nothing is emitted per comparison; only binding outcomes and the fatal path
//! produce lines.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::config::{self, LogLevel};

pub const COMPONENT: &str = "bridge";

/// Level string used for lines emitted on the fatal path.
pub const FATAL_LEVEL: &str = "fatal";

/// Emit `event` at `level` if the configured threshold allows it.
pub fn emit(level: LogLevel, event: &str, fields: Value) {
    if config::log_enabled(level) {
        write_line(&render(level.as_str(), event, fields));
    }
}

/// Emit a fatal diagnostic. Ignores the threshold.
pub fn fatal(event: &str, fields: Value) {
    write_line(&render(FATAL_LEVEL, event, fields));
}

/// Build the JSON line for `event`. `fields` is flattened into the top-level
/// object when it is an object, otherwise stored under `"detail"`.
#[must_use]
pub fn render(level: &str, event: &str, fields: Value) -> String {
    let mut line = Map::new();
    line.insert("timestamp_ms".into(), Value::from(now_ms()));
    line.insert("level".into(), Value::from(level));
    line.insert("component".into(), Value::from(COMPONENT));
    line.insert("event".into(), Value::from(event));
    match fields {
        Value::Object(extra) => {
            for (key, value) in extra {
                line.entry(key).or_insert(value);
            }
        }
        Value::Null => {}
        other => {
            line.insert("detail".into(), other);
        }
    }
    Value::Object(line).to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

fn write_line(line: &str) {
    let mut stderr = std::io::stderr().lock();
    // Diagnostics must never turn into a second failure.
    let _ = writeln!(stderr, "{line}");
    let _ = stderr.flush();
}

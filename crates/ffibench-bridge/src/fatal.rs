//! Process termination for unrecoverable bridge errors.
//!
//! A comparison that cannot cross the boundary leaves the sort with no
//! correct way to continue, and a raw-address entry point has no error
//! channel back to its managed caller. Such entry points end here.

use serde_json::json;

use crate::config::{self, FatalAction};
use crate::diag;
use crate::error::BridgeError;

/// Exit status used when the configured action is [`FatalAction::Exit`].
pub const EXIT_BRIDGE_FAILURE: i32 = 70;

/// Event name of the diagnostic line written before terminating.
pub const FATAL_EVENT: &str = "bridge_fatal";

/// Report `err` on stderr and end the process.
pub fn terminate(err: &BridgeError) -> ! {
    let action = config::fatal_action();
    diag::fatal(
        FATAL_EVENT,
        json!({
            "kind": err.kind(),
            "error": err.to_string(),
            "action": action.as_str(),
            "exit_code": EXIT_BRIDGE_FAILURE,
        }),
    );
    match action {
        FatalAction::Exit => std::process::exit(EXIT_BRIDGE_FAILURE),
        FatalAction::Abort => std::process::abort(),
    }
}

/// Unwrap `result` or terminate.
pub fn or_terminate<T>(result: Result<T, BridgeError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => terminate(&err),
    }
}

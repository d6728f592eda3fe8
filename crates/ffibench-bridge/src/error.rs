//! Bridge error taxonomy.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Step of one-time binding that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    /// The runtime-wide handle used to attach threads could not be obtained.
    RuntimeHandle,
    /// The comparator's class (or the well-known static class) was not found.
    ClassLookup,
    /// No method with the expected name and signature exists.
    MethodLookup,
    /// The call-scoped reference could not be promoted to a global one.
    GlobalRef,
}

impl ResolutionStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RuntimeHandle => "runtime_handle",
            Self::ClassLookup => "class_lookup",
            Self::MethodLookup => "method_lookup",
            Self::GlobalRef => "global_ref",
        }
    }
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures crossing the native/managed boundary. None of them is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("binding resolution failed at {stage}: {detail}")]
    BindingResolution {
        stage: ResolutionStage,
        detail: String,
    },
    #[error("thread attachment failed: {detail}")]
    Attachment { detail: String },
    #[error("managed call failed: {detail}")]
    Invocation { detail: String },
}

impl BridgeError {
    #[must_use]
    pub fn resolution(stage: ResolutionStage, detail: impl Into<String>) -> Self {
        Self::BindingResolution {
            stage,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn attachment(detail: impl Into<String>) -> Self {
        Self::Attachment {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn invocation(detail: impl Into<String>) -> Self {
        Self::Invocation {
            detail: detail.into(),
        }
    }

    /// Stable identifier used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BindingResolution { .. } => "binding_resolution",
            Self::Attachment { .. } => "attachment",
            Self::Invocation { .. } => "invocation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failed_stage() {
        let err = BridgeError::resolution(ResolutionStage::MethodLookup, "no compare(JJ)I");
        assert_eq!(
            err.to_string(),
            "binding resolution failed at method_lookup: no compare(JJ)I"
        );
        assert_eq!(err.kind(), "binding_resolution");
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            BridgeError::resolution(ResolutionStage::ClassLookup, "x").kind(),
            BridgeError::attachment("x").kind(),
            BridgeError::invocation("x").kind(),
        ];
        assert_eq!(kinds, ["binding_resolution", "attachment", "invocation"]);
    }

    #[test]
    fn stage_serializes_snake_case() {
        let json = serde_json::to_string(&ResolutionStage::GlobalRef).unwrap();
        assert_eq!(json, "\"global_ref\"");
    }
}

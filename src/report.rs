//! Result value objects returned by validation and consistency checks.

use serde::Serialize;

/// Outcome of a validation call: a verdict plus ordered diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub messages: Vec<String>,
}

/// Outcome of a consistency check.
pub type ConsistencyReport = ValidationResult;

impl ValidationResult {
    /// Creates a passing result with one informational message.
    #[must_use]
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            messages: vec![message.into()],
        }
    }

    /// Creates a failing result.
    #[must_use]
    pub fn invalid(messages: Vec<String>) -> Self {
        Self {
            valid: false,
            messages,
        }
    }

    /// Joins the messages into a single feedback text.
    #[must_use]
    pub fn feedback(&self) -> String {
        self.messages.join("\n")
    }
}

//! Proposed fact batches and their schema validation.

pub mod batch;
pub mod validator;

pub use batch::{FactBatch, FactInstance};
pub use validator::DataValidator;

use crate::{ontology::SerializeError, report::ValidationResult, schema::SchemaDefinition};

/// Errors raised while validating a fact batch.
#[derive(Debug, thiserror::Error)]
pub enum DataValidationError {
    /// The batch names classes the schema does not declare.
    #[error("{}", unknown_classes_message(.0))]
    UnknownClass(Vec<String>),
    /// An instance body is not valid Turtle.
    #[error("Data does not parse for class `{class}` (instance {}): {cause}", .index + 1)]
    DataSyntax {
        class: String,
        index: usize,
        cause: String,
    },
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

impl DataValidationError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UnknownClass(_) | Self::DataSyntax { .. })
    }
}

fn unknown_classes_message(classes: &[String]) -> String {
    classes
        .iter()
        .map(|class| format!("Class not in schema: {class}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validates `batch` against `schema`.
///
/// # Errors
///
/// See [`DataValidator::validate`].
pub fn validate(
    schema: &SchemaDefinition,
    batch: &FactBatch,
) -> Result<ValidationResult, DataValidationError> {
    DataValidator::new(schema).validate(batch)
}

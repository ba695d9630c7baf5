//! Schema documents: compilation, structural validation and the OWL
//! projection used for consistency reasoning.

pub mod compiler;
pub mod definition;

pub use compiler::{compile, compile_and_save, derive_ontology, SchemaSyntaxError};
pub use definition::{
    ClassDefinition, EnumDefinition, ParentRef, Primitive, Range, SchemaDefinition,
    SlotDefinition, SlotPattern,
};

use crate::report::ValidationResult;

/// Checks that `text` is a well-formed schema without keeping the result.
///
/// Every diagnostic is returned in the result instead of as an error so the
/// caller can feed them back verbatim.
#[must_use]
pub fn validate_schema(text: &str) -> ValidationResult {
    match compile(text) {
        Ok(schema) => ValidationResult::valid(format!(
            "Schema `{}` is valid ({} classes)",
            schema.name,
            schema.classes.len()
        )),
        Err(err) => ValidationResult::invalid(err.messages()),
    }
}

#[cfg(test)]
mod tests {
    use super::validate_schema;

    #[test]
    fn reports_schema_problems_as_messages() {
        let result = validate_schema("description: nothing else");
        assert!(!result.valid);
        assert_eq!(
            result.messages,
            vec![
                "Schema does not have a top level id".to_string(),
                "Schema does not have a top level name".to_string(),
            ]
        );

        let result = validate_schema("id: https://example.org/s\nname: s\n");
        assert!(result.valid);
        assert_eq!(result.messages, vec!["Schema `s` is valid (0 classes)".to_string()]);
    }
}

//! Crate-wide error type.
//!
//! Every module owns its own error enum; [`Error`] wraps them at the public
//! seams and classifies them into retryable and fatal conditions.

use crate::{
    config::ConfigError,
    consistency::{ConsistencyError, FactStoreError},
    data::DataValidationError,
    extraction::ExtractionError,
    ontology::{OntologyError, SerializeError},
    reasoner::{ReasonerError, WorldError},
    schema::SchemaSyntaxError,
    session::SessionError,
    workdir::WorkdirError,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaSyntaxError),

    #[error(transparent)]
    Data(#[from] DataValidationError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Reasoner(#[from] ReasonerError),

    #[error(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Workdir(#[from] WorkdirError),

    #[error(transparent)]
    FactStore(#[from] FactStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[cfg(feature = "retrieval")]
    #[error(transparent)]
    Retrieval(#[from] crate::retrieval::RetrievalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Returns `true` when the caller can revise its input and try again.
    ///
    /// Schema problems are fatal for a session; so are storage, configuration
    /// and I/O failures. Fact-level problems and outbound lookups are retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Data(err) => err.is_retryable(),
            Self::Consistency(err) => err.is_retryable(),
            Self::Reasoner(err) => err.is_retryable(),
            Self::Session(err) => err.is_retryable(),
            Self::World(_) | Self::Extraction(_) => true,
            Self::Schema(_)
            | Self::Ontology(_)
            | Self::Serialize(_)
            | Self::Workdir(_)
            | Self::FactStore(_)
            | Self::Config(_)
            | Self::Io(_) => false,
            #[cfg(feature = "retrieval")]
            Self::Retrieval(_) => true,
        }
    }

    /// Diagnostic lines suitable for feeding back to the caller.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Schema(err) => err.messages(),
            other => other
                .to_string()
                .lines()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_the_taxonomy() {
        let schema = Error::from(SchemaSyntaxError::MissingFields {
            missing: vec!["id", "name"],
        });
        assert!(!schema.is_retryable());
        assert_eq!(schema.messages().len(), 2);

        let unknown = Error::from(DataValidationError::UnknownClass(vec!["Robot".to_string()]));
        assert!(unknown.is_retryable());
        assert_eq!(unknown.messages(), vec!["Class not in schema: Robot".to_string()]);

        let parse = Error::from(WorldError::Parse {
            document: "new facts".to_string(),
            message: "unexpected end".to_string(),
        });
        assert!(parse.is_retryable());

        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!io.is_retryable());
    }
}

//! Ontology consistency checking and the persisted fact store.

pub mod checker;
pub mod store;

pub use checker::{merged_document, strip_fences, ConsistencyChecker};
pub use store::{FactStore, FactStoreError};

use crate::reasoner::{ReasonerError, WorldError};

#[derive(Debug, thiserror::Error)]
pub enum ConsistencyError {
    /// A document could not be loaded into the world.
    #[error(transparent)]
    Parse(#[from] WorldError),
    /// The merged world has no model.
    #[error("OWL ontology is logically inconsistent. Reasoner output: {explanation}")]
    Inconsistent { explanation: String },
    #[error(transparent)]
    Reasoner(#[from] ReasonerError),
    #[error(transparent)]
    Store(#[from] FactStoreError),
    /// The reasoning task panicked or was cancelled.
    #[error("consistency check did not finish: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

impl ConsistencyError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Parse(_) | Self::Inconsistent { .. } => true,
            Self::Reasoner(err) => err.is_retryable(),
            Self::Store(_) | Self::Aborted(_) => false,
        }
    }
}

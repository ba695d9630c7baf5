//! Description-logic reasoning over an isolated [`World`].
//!
//! Two backends implement [`Reasoner`]: the native tableau procedure and an
//! external program. [`from_config`] picks one.

pub mod axioms;
pub mod command;
pub mod datatypes;
pub mod tableau;
pub mod world;

use std::sync::Arc;

use tracing::{debug, info_span};

pub use command::CommandReasoner;
pub use tableau::{Budget, Explanation};
pub use world::{Inventory, World, WorldError};

use crate::{
    config::{ReasonerBackend, ReasonerConfig},
    ontology::SerializeError,
};

/// Errors raised while reasoning.
#[derive(Debug, thiserror::Error)]
pub enum ReasonerError {
    /// The search outgrew its configured limits.
    #[error("Reasoning budget exceeded ({nodes} nodes, {branches} branches); the ontology is too complex to check")]
    BudgetExceeded { nodes: usize, branches: usize },
    /// The external reasoner could not be run or failed without a verdict.
    #[error("reasoner `{program}` failed: {message}")]
    Command { program: String, message: String },
    #[error("invalid inconsistency pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReasonerError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BudgetExceeded { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Consistent,
    Inconsistent { explanation: String },
}

pub trait Reasoner: Send + Sync {
    fn name(&self) -> &str;

    /// Decides whether the world has a model.
    ///
    /// # Errors
    ///
    /// Fails when no verdict could be reached.
    fn check(&self, world: &World) -> Result<Verdict, ReasonerError>;
}

/// Type alias simplifying reasoner trait object usage.
pub type ReasonerHandle = dyn Reasoner + Send + Sync + 'static;

/// Builds the reasoner selected by the configuration.
///
/// # Errors
///
/// Fails when the command backend's pattern does not compile.
pub fn from_config(config: &ReasonerConfig) -> Result<Arc<ReasonerHandle>, ReasonerError> {
    let reasoner: Arc<ReasonerHandle> = match config.backend {
        ReasonerBackend::Native => Arc::new(NativeReasoner::new(Budget {
            max_nodes: config.max_nodes,
            max_branches: config.max_branches,
        })),
        ReasonerBackend::Command => Arc::new(CommandReasoner::new(config.command.clone())?),
    };
    Ok(reasoner)
}

/// In-process tableau reasoner.
#[derive(Clone, Debug, Default)]
pub struct NativeReasoner {
    budget: Budget,
}

impl NativeReasoner {
    #[must_use]
    pub fn new(budget: Budget) -> Self {
        Self { budget }
    }
}

impl Reasoner for NativeReasoner {
    fn name(&self) -> &str {
        "native"
    }

    fn check(&self, world: &World) -> Result<Verdict, ReasonerError> {
        let span = info_span!("tableau", triples = world.len());
        let _guard = span.enter();
        let kb = axioms::KnowledgeBase::from_triples(world.triples());
        let outcome = tableau::Tableau::new(kb, self.budget).check()?;
        debug!(consistent = matches!(outcome, tableau::Outcome::Consistent), "native verdict");
        Ok(match outcome {
            tableau::Outcome::Consistent => Verdict::Consistent,
            tableau::Outcome::Inconsistent(explanation) => Verdict::Inconsistent {
                explanation: explanation.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandConfig;

    #[test]
    fn builds_configured_backend() {
        let native = from_config(&ReasonerConfig::default()).expect("native");
        assert_eq!(native.name(), "native");

        let command = from_config(&ReasonerConfig {
            backend: ReasonerBackend::Command,
            command: CommandConfig {
                program: "hermit".to_string(),
                ..CommandConfig::default()
            },
            ..ReasonerConfig::default()
        })
        .expect("command");
        assert_eq!(command.name(), "hermit");
    }

    #[test]
    fn empty_world_is_consistent() {
        let reasoner = NativeReasoner::default();
        let world = World::new("https://example.org/empty");
        assert_eq!(reasoner.check(&world).expect("verdict"), Verdict::Consistent);
    }

    #[test]
    fn budget_errors_are_retryable() {
        let err = ReasonerError::BudgetExceeded {
            nodes: 10,
            branches: 2,
        };
        assert!(err.is_retryable());
        assert!(!ReasonerError::Command {
            program: "pellet".to_string(),
            message: "not found".to_string()
        }
        .is_retryable());
    }
}

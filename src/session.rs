//! One knowledge extraction session: proposed facts are validated against the
//! schema, checked against the ontology and committed only when both pass.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, info_span, warn, Instrument};

use crate::{
    config::Config,
    consistency::{ConsistencyChecker, FactStore},
    data::{DataValidator, FactBatch},
    ontology::OntologyModel,
    report::{ConsistencyReport, ValidationResult},
    schema::{self, SchemaDefinition},
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The batch violates the schema.
    #[error("Data does not validate:\n{}", .0.feedback())]
    Invalid(ValidationResult),
    /// Every attempt failed with a retryable error.
    #[error("No valid facts after {attempts} attempts. Last error: {last}")]
    Exhausted { attempts: usize, last: String },
    /// The schema document could not be read.
    #[error("cannot read schema `{path}`: {source}")]
    SchemaUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("fact extraction failed: {0}")]
    Extractor(String),
}

impl SessionError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

/// Produces candidate facts from free text.
///
/// `feedback` carries the diagnostics of the previous attempt, if any.
#[async_trait]
pub trait FactExtractor: Send + Sync {
    async fn extract(&self, text: &str, feedback: Option<&str>) -> crate::Result<FactBatch>;
}

/// Result of a committed session run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Attempts used, counting the successful one.
    pub attempts: usize,
    pub validation: ValidationResult,
    pub consistency: ConsistencyReport,
}

pub struct KnowledgeExtractionSession {
    schema: SchemaDefinition,
    ontology: OntologyModel,
    checker: ConsistencyChecker,
    store: FactStore,
    max_attempts: usize,
}

impl KnowledgeExtractionSession {
    /// Compiles the session schema and derives its ontology.
    ///
    /// # Errors
    ///
    /// Schema problems are fatal for the session and returned here.
    pub fn new(
        schema_text: &str,
        checker: ConsistencyChecker,
        store: FactStore,
        max_attempts: usize,
    ) -> crate::Result<Self> {
        let schema = schema::compile(schema_text)?;
        let ontology = schema::derive_ontology(&schema)?;
        info!(
            schema = %schema.name,
            classes = schema.classes.len(),
            store = %store.path().display(),
            "session ready"
        );
        Ok(Self {
            schema,
            ontology,
            checker,
            store,
            max_attempts: max_attempts.max(1),
        })
    }

    /// Builds a session from the project paths, reasoner and retry settings.
    ///
    /// # Errors
    ///
    /// Fails when the schema file cannot be read or compiled, or the reasoner
    /// cannot be built.
    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        let path = &config.project.schema_path;
        let schema_text =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SessionError::SchemaUnavailable {
                    path: path.clone(),
                    source,
                })?;
        let checker = ConsistencyChecker::from_config(&config.reasoner)?;
        Self::new(
            &schema_text,
            checker,
            FactStore::new(&config.project.data_path),
            config.session.max_attempts,
        )
    }

    #[must_use]
    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    #[must_use]
    pub fn ontology(&self) -> &OntologyModel {
        &self.ontology
    }

    #[must_use]
    pub fn store(&self) -> &FactStore {
        &self.store
    }

    fn validate(&self, batch: &FactBatch) -> crate::Result<(ValidationResult, String)> {
        let validation = DataValidator::new(&self.schema).validate(batch)?;
        if !validation.valid {
            return Err(SessionError::Invalid(validation).into());
        }
        let facts = batch.to_rdf_xml(&self.schema)?;
        Ok((validation, facts))
    }

    /// Validates and checks `batch` against the committed facts without
    /// committing anything.
    ///
    /// # Errors
    ///
    /// Same as [`KnowledgeExtractionSession::submit`].
    pub async fn preview(&self, batch: &FactBatch) -> crate::Result<ConsistencyReport> {
        let (_, facts) = self.validate(batch)?;
        let prior = self.store.read().await?;
        Ok(self.checker.check(&self.ontology, prior.as_deref(), &facts)?)
    }

    /// Validates `batch`, checks it for consistency and commits it.
    ///
    /// # Errors
    ///
    /// Data and consistency problems are retryable (see
    /// [`crate::Error::is_retryable`]); the store is untouched on any error.
    pub async fn submit(&self, batch: &FactBatch) -> crate::Result<SessionOutcome> {
        let (validation, facts) = self.validate(batch)?;
        let consistency = self
            .checker
            .merge_and_check(&self.ontology, &self.store, &facts)
            .await?;
        Ok(SessionOutcome {
            attempts: 1,
            validation,
            consistency,
        })
    }

    /// Drives `extractor` until a batch is committed, feeding each retryable
    /// failure back as feedback.
    ///
    /// # Errors
    ///
    /// Returns fatal errors as soon as they occur and
    /// [`SessionError::Exhausted`] once every attempt failed.
    pub async fn run(
        &self,
        text: &str,
        extractor: &dyn FactExtractor,
    ) -> crate::Result<SessionOutcome> {
        let mut feedback: Option<String> = None;
        for attempt in 1..=self.max_attempts {
            let span = info_span!("attempt", attempt, max_attempts = self.max_attempts);
            let result = async {
                let batch = extractor.extract(text, feedback.as_deref()).await?;
                self.submit(&batch).await
            }
            .instrument(span)
            .await;

            match result {
                Ok(outcome) => {
                    info!(attempt, "facts committed");
                    return Ok(SessionOutcome {
                        attempts: attempt,
                        ..outcome
                    });
                }
                Err(err) if err.is_retryable() => {
                    warn!(attempt, error = %err, "attempt rejected");
                    feedback = Some(err.to_string());
                }
                Err(err) => return Err(err),
            }
        }
        Err(SessionError::Exhausted {
            attempts: self.max_attempts,
            last: feedback.unwrap_or_default(),
        }
        .into())
    }
}

//! Merging proposed facts into the accepted corpus under a reasoner.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, info, info_span, warn, Instrument, Level, Span};

use super::{ConsistencyError, FactStore};
use crate::{
    config::ReasonerConfig,
    ontology::OntologyModel,
    reasoner::{self, ReasonerError, ReasonerHandle, Verdict, World, WorldError},
    report::ConsistencyReport,
};

const FENCE_PATTERN: &str = r"(?i)```(?:xml|owl|rdf)?\s*([\s\S]*?)```";

const NEW_FACTS: &str = "new facts";
const PRIOR_FACTS: &str = "prior facts";

fn fence() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(FENCE_PATTERN).ok()).as_ref()
}

/// Removes Markdown code fences around generated content.
///
/// When several fenced blocks are present their contents are joined in order
/// with a blank line; text without fences is only trimmed.
#[must_use]
pub fn strip_fences(text: &str) -> String {
    let text = text.trim();
    let Some(fence) = fence() else {
        return text.to_string();
    };
    let blocks: Vec<&str> = fence
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|block| block.as_str().trim())
        .collect();
    if blocks.is_empty() {
        text.to_string()
    } else {
        blocks.join("\n\n")
    }
}

/// The document committed after a successful check.
#[must_use]
pub fn merged_document(prior: Option<&str>, new_facts: &str) -> String {
    match prior {
        Some(prior) => format!("{prior}\n\n{new_facts}"),
        None => new_facts.to_string(),
    }
}

/// Checks proposed facts against an ontology and the accepted facts.
#[derive(Clone)]
pub struct ConsistencyChecker {
    reasoner: Arc<ReasonerHandle>,
}

impl ConsistencyChecker {
    #[must_use]
    pub fn new(reasoner: Arc<ReasonerHandle>) -> Self {
        Self { reasoner }
    }

    /// # Errors
    ///
    /// Fails when the configured reasoner cannot be built.
    pub fn from_config(config: &ReasonerConfig) -> Result<Self, ReasonerError> {
        Ok(Self::new(reasoner::from_config(config)?))
    }

    /// Decides whether `ontology`, `prior` and `new_facts` are jointly
    /// consistent. Nothing is persisted; repeated calls give the same verdict.
    ///
    /// # Errors
    ///
    /// * [`ConsistencyError::Parse`] when a document is malformed, before any
    ///   reasoning happens.
    /// * [`ConsistencyError::Inconsistent`] with the reasoner's explanation.
    /// * [`ConsistencyError::Reasoner`] when no verdict could be reached.
    pub fn check(
        &self,
        ontology: &OntologyModel,
        prior: Option<&str>,
        new_facts: &str,
    ) -> Result<ConsistencyReport, ConsistencyError> {
        let new_facts = strip_fences(new_facts);
        self.check_stripped(ontology, prior, &new_facts)
    }

    /// Checks, then appends `new_facts` to `store` when consistent.
    ///
    /// The store's write lock is held from the read of the prior facts until
    /// the commit, so concurrent commits to one path cannot lose each other's
    /// facts. On any error the store is left untouched.
    ///
    /// # Errors
    ///
    /// See [`ConsistencyChecker::check`]; storage failures are reported as
    /// [`ConsistencyError::Store`].
    pub async fn merge_and_check(
        &self,
        ontology: &OntologyModel,
        store: &FactStore,
        new_facts: &str,
    ) -> Result<ConsistencyReport, ConsistencyError> {
        let span = info_span!("merge_and_check", store = %store.path().display());
        async {
            let _guard = store.lock().await;
            let prior = store.read().await?;
            let new_facts = strip_fences(new_facts);
            let report = self
                .check_blocking(ontology.clone(), prior.clone(), new_facts.clone())
                .await?;
            store
                .write(&merged_document(prior.as_deref(), &new_facts))
                .await?;
            info!(first_commit = prior.is_none(), "committed new facts");
            Ok::<_, ConsistencyError>(report)
        }
        .instrument(span)
        .await
    }

    /// Runs the reasoner on the blocking pool, keeping the current span.
    async fn check_blocking(
        &self,
        ontology: OntologyModel,
        prior: Option<String>,
        new_facts: String,
    ) -> Result<ConsistencyReport, ConsistencyError> {
        let checker = self.clone();
        let span = Span::current();
        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            checker.check_stripped(&ontology, prior.as_deref(), &new_facts)
        })
        .await?
    }

    fn check_stripped(
        &self,
        ontology: &OntologyModel,
        prior: Option<&str>,
        new_facts: &str,
    ) -> Result<ConsistencyReport, ConsistencyError> {
        if new_facts.is_empty() {
            return Err(WorldError::Parse {
                document: NEW_FACTS.to_string(),
                message: "the document is empty".to_string(),
            }
            .into());
        }

        let mut world = World::new(ontology.id().as_str());
        let schema_triples = world.load_triples(ontology.to_triples());
        let prior_triples = match prior {
            Some(prior) => FactStore::load_into(prior, &mut world, PRIOR_FACTS)?,
            None => 0,
        };
        let new_triples = FactStore::load_into(new_facts, &mut world, NEW_FACTS)?;
        info!(
            schema_triples,
            prior_triples, new_triples, "loaded ontology with new facts"
        );
        if tracing::enabled!(Level::DEBUG) {
            log_inventory(&world);
        }

        let verdict = self.reasoner.check(&world).map_err(|err| {
            warn!(reasoner = self.reasoner.name(), error = %err, "reasoning failed");
            err
        })?;
        match verdict {
            Verdict::Consistent => Ok(ConsistencyReport::valid(format!(
                "OWL ontology is consistent ({} triples checked by the {} reasoner)",
                world.len(),
                self.reasoner.name()
            ))),
            Verdict::Inconsistent { explanation } => {
                info!(reasoner = self.reasoner.name(), "facts are inconsistent");
                Err(ConsistencyError::Inconsistent { explanation })
            }
        }
    }
}

fn log_inventory(world: &World) {
    let inventory = world.inventory();
    debug!(count = inventory.classes.len(), "OWL classes found");
    for class in &inventory.classes {
        debug!(iri = %class, "class");
    }
    debug!(
        count = inventory.object_properties.len(),
        "OWL object properties found"
    );
    for property in &inventory.object_properties {
        debug!(iri = %property, "object property");
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("<rdf:RDF/>", "<rdf:RDF/>")]
    #[case("  \n<rdf:RDF/>\n", "<rdf:RDF/>")]
    #[case("```xml\n<rdf:RDF/>\n```", "<rdf:RDF/>")]
    #[case("```XML\n<rdf:RDF/>\n```", "<rdf:RDF/>")]
    #[case("Here you go:\n```owl\n<a/>\n```\nand\n```\n<b/>\n```", "<a/>\n\n<b/>")]
    fn strips_fences(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_fences(input), expected);
    }

    #[test]
    fn merges_with_a_blank_line() {
        assert_eq!(merged_document(None, "<b/>"), "<b/>");
        assert_eq!(merged_document(Some("<a/>"), "<b/>"), "<a/>\n\n<b/>");
    }
}

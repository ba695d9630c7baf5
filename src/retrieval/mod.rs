//! Outbound collaborators used while grounding extracted facts: web page
//! retrieval and ontology term search.
//!
//! Lookups are best effort. Searches degrade to an empty list; page retrieval
//! reports its error so the caller can try another source.

pub mod page;

use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

pub use page::{html_to_text, truncate};

use crate::{config::RetrievalConfig, consistency::FactStore};

const OLS_PREFIX: &str = "ols:";

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("`{url}` answered with status {status}")]
    Status { url: String, status: u16 },
    /// Only `ols:<name>` references are supported.
    #[error("Unable to search ontology '{0}' - unknown url type: '{0}'")]
    UnsupportedOntology(String),
}

#[derive(Deserialize)]
struct OlsSearch {
    response: OlsResponse,
}

#[derive(Deserialize)]
struct OlsResponse {
    #[serde(default)]
    docs: Vec<OlsDoc>,
}

#[derive(Deserialize)]
struct OlsDoc {
    obo_id: Option<String>,
    short_form: Option<String>,
    iri: Option<String>,
    label: Option<String>,
}

impl OlsDoc {
    fn into_term(self) -> Option<(String, String)> {
        let id = self.obo_id.or(self.short_form).or(self.iri)?;
        Some((id, self.label.unwrap_or_default()))
    }
}

/// Extracts the ontology name from an `ols:<name>` reference.
///
/// # Errors
///
/// Fails for any other kind of reference.
pub fn ols_ontology(reference: &str) -> Result<&str, RetrievalError> {
    let reference = reference.trim();
    let name = reference
        .get(..OLS_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(OLS_PREFIX))
        .map(|_| reference[OLS_PREFIX.len()..].trim())
        .filter(|name| !name.is_empty() && !name.contains(&['/', '?', '&', ' '][..]));
    name.ok_or_else(|| RetrievalError::UnsupportedOntology(reference.to_string()))
}

/// HTTP client for page retrieval and ontology search.
#[derive(Clone, Debug)]
pub struct Retriever {
    client: reqwest::Client,
    config: RetrievalConfig,
}

impl Retriever {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(config: RetrievalConfig) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Fetches `url` and returns its readable text, truncated to the
    /// configured length.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, timeouts and non-success statuses.
    pub async fn retrieve_web_page(&self, url: &str) -> Result<String, RetrievalError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let html = response.text().await?;
        let text = html_to_text(&html);
        info!(url, characters = text.chars().count(), "retrieved web page");
        Ok(truncate(&text, self.config.max_page_length))
    }

    /// Searches an external ontology for `term`, returning `(id, label)`
    /// pairs in relevance order. A `limit` of 0 keeps every row of the first
    /// OLS page.
    ///
    /// Unreachable services and unknown references yield an empty list.
    pub async fn search_external_ontology(
        &self,
        term: &str,
        ontology_ref: &str,
        limit: usize,
    ) -> Vec<(String, String)> {
        match self.try_search_external(term, ontology_ref, limit).await {
            Ok(results) => {
                info!(term, ontology = ontology_ref, found = results.len(), "searched ontology");
                results
            }
            Err(err) => {
                warn!(term, ontology = ontology_ref, error = %err, "ontology search failed");
                Vec::new()
            }
        }
    }

    async fn try_search_external(
        &self,
        term: &str,
        ontology_ref: &str,
        limit: usize,
    ) -> Result<Vec<(String, String)>, RetrievalError> {
        let ontology = ols_ontology(ontology_ref)?.to_lowercase();
        let rows = if limit == 0 { self.config.ols_page_size } else { limit };
        let url = format!("{}/search", self.config.ols_base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", term),
                ("ontology", ontology.as_str()),
                ("rows", rows.to_string().as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let search: OlsSearch = response.json().await?;
        let mut terms: Vec<_> = search
            .response
            .docs
            .into_iter()
            .filter_map(OlsDoc::into_term)
            .collect();
        if limit > 0 {
            terms.truncate(limit);
        }
        Ok(terms)
    }

    /// Searches the accepted facts for resources labelled like `term`.
    ///
    /// An unreadable or unparsable store yields an empty list.
    pub async fn search_project_ontology(
        &self,
        store: &FactStore,
        term: &str,
        limit: usize,
    ) -> Vec<(String, String)> {
        search_project_ontology(store, term, limit).await
    }
}

/// Label search over the persisted fact store; see
/// [`FactStore::search_labels`]. A `limit` of 0 returns every match.
pub async fn search_project_ontology(
    store: &FactStore,
    term: &str,
    limit: usize,
) -> Vec<(String, String)> {
    match store.search_labels(term, limit).await {
        Ok(results) => {
            info!(term, found = results.len(), "searched project ontology");
            results
        }
        Err(err) => {
            warn!(term, error = %err, "project ontology search failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("ols:mondo", Some("mondo"))]
    #[case("OLS:hp", Some("hp"))]
    #[case(" ols: go ", Some("go"))]
    #[case("sqlite:obo:hp", None)]
    #[case("ols:", None)]
    #[case("ols:../admin", None)]
    #[case("mondo", None)]
    fn parses_ols_references(#[case] reference: &str, #[case] expected: Option<&str>) {
        assert_eq!(ols_ontology(reference).ok(), expected);
    }

    #[test]
    fn reads_ols_documents() {
        let search: OlsSearch = serde_json::from_str(
            r#"{"response":{"numFound":2,"docs":[
                {"iri":"http://purl.obolibrary.org/obo/MONDO_0007254","obo_id":"MONDO:0007254","label":"breast cancer"},
                {"iri":"http://example.org/x","label":"x"},
                {"label":"no id"}
            ]}}"#,
        )
        .expect("search");
        let terms: Vec<_> = search.response.docs.into_iter().filter_map(OlsDoc::into_term).collect();
        assert_eq!(
            terms,
            vec![
                ("MONDO:0007254".to_string(), "breast cancer".to_string()),
                ("http://example.org/x".to_string(), "x".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_references_yield_nothing() {
        let retriever = Retriever::new(RetrievalConfig::default()).expect("client");
        assert!(retriever
            .search_external_ontology("cancer", "sqlite:obo:mondo", 5)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn unreachable_services_yield_nothing() {
        let retriever = Retriever::new(RetrievalConfig {
            ols_base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..RetrievalConfig::default()
        })
        .expect("client");
        assert!(retriever
            .search_external_ontology("cancer", "ols:mondo", 5)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn zero_limit_returns_every_project_match() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FactStore::new(dir.path().join("data.xml"));
        store
            .write(
                r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#">
  <rdf:Description rdf:about="https://example.org/people/clark"><rdfs:label>Clark Kent</rdfs:label></rdf:Description>
  <rdf:Description rdf:about="https://example.org/people/kara"><rdfs:label>Kara Kent</rdfs:label></rdf:Description>
  <rdf:Description rdf:about="https://example.org/people/martha"><rdfs:label>Martha Kent</rdfs:label></rdf:Description>
</rdf:RDF>"#,
            )
            .await
            .expect("write");
        let retriever = Retriever::new(RetrievalConfig::default()).expect("client");

        assert_eq!(retriever.search_project_ontology(&store, "kent", 0).await.len(), 3);
        assert_eq!(
            retriever.search_project_ontology(&store, "KENT", 2).await,
            vec![
                ("https://example.org/people/clark".to_string(), "Clark Kent".to_string()),
                ("https://example.org/people/kara".to_string(), "Kara Kent".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn project_search_of_a_missing_store_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FactStore::new(dir.path().join("data.xml"));
        assert!(search_project_ontology(&store, "clark", 10).await.is_empty());
    }
}

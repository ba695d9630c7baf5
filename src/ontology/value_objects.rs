use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use oxrdf::NamedNode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An absolute IRI naming a class, property or individual.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri {
    value: String,
}

impl Iri {
    /// # Errors
    ///
    /// Fails when `value` is not an absolute IRI.
    pub fn new(value: impl Into<String>) -> Result<Self, IriError> {
        let value = value.into();
        NamedNode::new(value.as_str()).map_err(|_| IriError::Invalid {
            value: value.clone(),
        })?;
        Ok(Self { value })
    }

    /// Parsed nodes are already valid.
    pub(crate) fn from_named_node(node: &NamedNode) -> Self {
        Self {
            value: node.as_str().to_string(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// `Person` for both `https://example.org/people/Person` and `...#Person`.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.value
            .rsplit(['#', '/'])
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.value)
    }

    /// Returns the namespace used to mint child identifiers.
    ///
    /// Identifiers already ending in `/` or `#` are returned unchanged,
    /// anything else gets a trailing `/`.
    #[must_use]
    pub fn as_namespace(&self) -> String {
        if self.value.ends_with('/') || self.value.ends_with('#') {
            self.value.clone()
        } else {
            format!("{}/", self.value)
        }
    }

    #[must_use]
    pub fn to_named_node(&self) -> NamedNode {
        NamedNode::new_unchecked(self.value.clone())
    }
}

impl Display for Iri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for Iri {
    type Err = IriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl TryFrom<String> for Iri {
    type Error = IriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Serialize for Iri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de> Deserialize<'de> for Iri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IriError {
    #[error("`{value}` is not an absolute IRI")]
    Invalid { value: String },
}

/// Namespace prefix table used to expand and compact CURIEs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrefixMap {
    prefixes: BTreeMap<String, String>,
}

impl PrefixMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a prefix, replacing any previous binding.
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Returns the namespace bound to `prefix`.
    #[must_use]
    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Returns `true` when the prefix is declared.
    #[must_use]
    pub fn contains(&self, prefix: &str) -> bool {
        self.prefixes.contains_key(prefix)
    }

    /// Expands `prefix:local` into a full IRI when the prefix is known.
    #[must_use]
    pub fn expand(&self, curie: &str) -> Option<String> {
        let (prefix, local) = curie.split_once(':')?;
        if local.starts_with("//") {
            return None;
        }
        self.namespace(prefix)
            .map(|namespace| format!("{namespace}{local}"))
    }

    /// Compacts an IRI against the longest matching namespace.
    #[must_use]
    pub fn compact(&self, iri: &str) -> String {
        self.prefixes
            .iter()
            .filter(|(_, namespace)| !namespace.is_empty() && iri.starts_with(namespace.as_str()))
            .max_by_key(|(_, namespace)| namespace.len())
            .map_or_else(
                || iri.to_string(),
                |(prefix, namespace)| format!("{prefix}:{}", &iri[namespace.len()..]),
            )
    }

    /// Iterates over `(prefix, namespace)` pairs in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes
            .iter()
            .map(|(prefix, namespace)| (prefix.as_str(), namespace.as_str()))
    }
}

impl FromIterator<(String, String)> for PrefixMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            prefixes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Iri, PrefixMap};

    #[test]
    fn relative_identifiers_are_rejected() {
        let orcid = Iri::new("https://orcid.org/1234").expect("absolute");
        assert_eq!(orcid.as_str(), "https://orcid.org/1234");
        let err = Iri::new("ORCID 1234").expect_err("not an IRI");
        assert_eq!(err.to_string(), "`ORCID 1234` is not an absolute IRI");
    }

    #[test]
    fn local_names_and_namespaces() {
        let hashed = Iri::new("http://example.org/onto#Concept").expect("valid IRI");
        assert_eq!(hashed.local_name(), "Concept");
        let slashed = Iri::new("https://w3id.org/linkml/examples/personinfo").expect("valid IRI");
        assert_eq!(slashed.local_name(), "personinfo");
        assert_eq!(
            slashed.as_namespace(),
            "https://w3id.org/linkml/examples/personinfo/"
        );
    }

    #[test]
    fn prefix_map_expands_and_compacts() {
        let mut prefixes = PrefixMap::new();
        prefixes.insert("ORCID", "https://orcid.org/");
        prefixes.insert("personinfo", "https://w3id.org/linkml/examples/personinfo/");
        assert_eq!(
            prefixes.expand("ORCID:1234").as_deref(),
            Some("https://orcid.org/1234")
        );
        assert_eq!(prefixes.expand("unknown:1"), None);
        assert_eq!(prefixes.expand("http://example.org/x"), None);
        assert_eq!(
            prefixes.compact("https://w3id.org/linkml/examples/personinfo/Person"),
            "personinfo:Person"
        );
        assert_eq!(prefixes.compact("urn:x"), "urn:x");
    }
}

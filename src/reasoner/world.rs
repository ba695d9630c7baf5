//! An isolated reasoning universe.
//!
//! A [`World`] is a plain value: every consistency check creates its own,
//! loads documents into it and drops it afterwards. Nothing is shared between
//! worlds, so repeated attempts never see each other's names.

use std::collections::BTreeSet;

use oxrdf::{BlankNode, Term, Triple};
use oxrdfxml::RdfXmlParser;
use tracing::debug;

use crate::ontology::{
    vocab::{owl, rdf},
    write_rdf_xml, SerializeError,
};

/// Errors raised while loading documents into a [`World`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// A document is not well-formed RDF/XML.
    #[error("Error parsing OWL content ({document}): {message}")]
    Parse { document: String, message: String },
    #[error("invalid base IRI `{base}`: {message}")]
    InvalidBase { base: String, message: String },
}

/// Classes and object properties declared in a world.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    pub classes: Vec<String>,
    pub object_properties: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct World {
    base: String,
    triples: Vec<Triple>,
    documents: usize,
}

impl World {
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            triples: Vec::new(),
            documents: 0,
        }
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    #[must_use]
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Adds already-parsed triples as one document.
    pub fn load_triples(&mut self, triples: impl IntoIterator<Item = Triple>) -> usize {
        let document = self.next_document();
        let before = self.triples.len();
        self.triples
            .extend(triples.into_iter().map(|triple| rename_blank_nodes(triple, document)));
        self.triples.len() - before
    }

    /// Parses an RDF/XML document, resolving relative IRIs against the
    /// world's base. Either every triple of the document is loaded or none.
    ///
    /// Blank whitespace-only documents load nothing.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Parse`] naming `document` when the content is
    /// not well-formed.
    pub fn load_rdf_xml(&mut self, content: &str, document: &str) -> Result<usize, WorldError> {
        if content.trim().is_empty() {
            return Ok(0);
        }
        let mut parser = RdfXmlParser::new();
        if !self.base.is_empty() {
            parser = parser
                .with_base_iri(self.base.as_str())
                .map_err(|err| WorldError::InvalidBase {
                    base: self.base.clone(),
                    message: err.to_string(),
                })?;
        }
        let mut parsed = Vec::new();
        for triple in parser.for_reader(content.as_bytes()) {
            let triple = triple.map_err(|err| WorldError::Parse {
                document: document.to_string(),
                message: err.to_string(),
            })?;
            parsed.push(triple);
        }
        let loaded = self.load_triples(parsed);
        debug!(document, triples = loaded, "loaded document into world");
        Ok(loaded)
    }

    /// Serialises the whole world back to RDF/XML.
    ///
    /// # Errors
    ///
    /// Fails when serialisation fails.
    pub fn to_rdf_xml(&self) -> Result<String, SerializeError> {
        write_rdf_xml(&self.triples)
    }

    /// Lists the named classes and object properties declared in the world.
    #[must_use]
    pub fn inventory(&self) -> Inventory {
        let mut classes = BTreeSet::new();
        let mut object_properties = BTreeSet::new();
        for triple in &self.triples {
            if triple.predicate.as_str() != rdf::TYPE {
                continue;
            }
            let (Term::NamedNode(subject), Term::NamedNode(kind)) =
                (Term::from(triple.subject.clone()), &triple.object)
            else {
                continue;
            };
            match kind.as_str() {
                owl::CLASS => {
                    classes.insert(subject.into_string());
                }
                owl::OBJECT_PROPERTY => {
                    object_properties.insert(subject.into_string());
                }
                _ => {}
            }
        }
        Inventory {
            classes: classes.into_iter().collect(),
            object_properties: object_properties.into_iter().collect(),
        }
    }

    fn next_document(&mut self) -> usize {
        self.documents += 1;
        self.documents
    }
}

fn rename_blank_nodes(triple: Triple, document: usize) -> Triple {
    let rename =
        |node: &BlankNode| BlankNode::new(format!("d{document}x{}", node.as_str())).unwrap_or_default();
    let object = match triple.object {
        Term::BlankNode(node) => Term::BlankNode(rename(&node)),
        other => other,
    };
    match Term::from(triple.subject) {
        Term::BlankNode(node) => Triple::new(rename(&node), triple.predicate, object),
        Term::NamedNode(node) => Triple::new(node, triple.predicate, object),
        _ => Triple::new(BlankNode::default(), triple.predicate, object),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON: &str = r##"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:owl="http://www.w3.org/2002/07/owl#"
         xmlns:ex="https://example.org/people/">
  <owl:Class rdf:about="https://example.org/people/Person"/>
  <owl:ObjectProperty rdf:about="https://example.org/people/knows"/>
  <ex:Person rdf:about="#clark">
    <ex:knows><ex:Person/></ex:knows>
  </ex:Person>
</rdf:RDF>"##;

    #[test]
    fn resolves_relative_names_against_the_base() {
        let mut world = World::new("https://example.org/people");
        let loaded = world.load_rdf_xml(PERSON, "facts").expect("loads");
        assert_eq!(loaded, 5);
        assert!(world.triples().iter().any(|triple| {
            Term::from(triple.subject.clone()).to_string() == "<https://example.org/people#clark>"
        }));
        assert_eq!(
            world.inventory(),
            Inventory {
                classes: vec!["https://example.org/people/Person".to_string()],
                object_properties: vec!["https://example.org/people/knows".to_string()],
            }
        );
    }

    #[test]
    fn blank_nodes_are_scoped_per_document() {
        let mut world = World::new("https://example.org/people");
        world.load_rdf_xml(PERSON, "prior").expect("prior");
        world.load_rdf_xml(PERSON, "new").expect("new");
        let blank_nodes: BTreeSet<String> = world
            .triples()
            .iter()
            .filter_map(|triple| match &triple.object {
                Term::BlankNode(node) => Some(node.as_str().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(blank_nodes.len(), 2);
    }

    #[test]
    fn malformed_documents_load_nothing() {
        let mut world = World::new("https://example.org/people");
        world.load_rdf_xml(PERSON, "prior").expect("prior");
        let before = world.len();
        let broken = PERSON.replace("</ex:Person>\n</rdf:RDF>", "</ex:Dog>\n</rdf:RDF>");
        let err = world.load_rdf_xml(&broken, "new").expect_err("truncated");
        assert!(matches!(err, WorldError::Parse { ref document, .. } if document == "new"));
        assert!(err.to_string().starts_with("Error parsing OWL content"));
        assert_eq!(world.len(), before);
        assert_eq!(world.load_rdf_xml("  \n", "empty").expect("empty"), 0);
    }
}

//! Serialisation of an [`OntologyModel`] into OWL triples and RDF/XML.

use std::collections::BTreeSet;

use oxrdf::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Term, Triple};
use oxrdfxml::RdfXmlSerializer;
use thiserror::Error;

use super::{
    entities::{Class, DataRangeSpec, OntologyModel, Property, PropertyKind, Restriction},
    value_objects::Iri,
    vocab::{owl, rdf, rdfs, xsd},
};

/// Errors raised while writing RDF/XML.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to serialize RDF/XML: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialized RDF/XML is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Writes triples as an RDF/XML document.
pub fn write_rdf_xml<'a>(triples: impl IntoIterator<Item = &'a Triple>) -> Result<String, SerializeError> {
    let mut serializer = RdfXmlSerializer::new().for_writer(Vec::new());
    for triple in triples {
        serializer.serialize_triple(triple)?;
    }
    let bytes = serializer.finish()?;
    Ok(String::from_utf8(bytes)?)
}

impl OntologyModel {
    /// Projects the model into OWL triples.
    ///
    /// The output is deterministic: classes and properties are emitted in
    /// identifier order and blank nodes are numbered sequentially.
    #[must_use]
    pub fn to_triples(&self) -> Vec<Triple> {
        let mut writer = TripleWriter::default();
        let ontology = self.id().to_named_node();
        writer.push(ontology.clone(), rdf::TYPE, named(owl::ONTOLOGY));
        if let Some(label) = self.label() {
            writer.push(ontology.clone(), rdfs::LABEL, Literal::new_simple_literal(label));
        }
        if let Some(comment) = self.comment() {
            writer.push(ontology, rdfs::COMMENT, Literal::new_simple_literal(comment));
        }

        for class in self.classes().values() {
            writer.class(class);
        }
        for property in self.properties().values() {
            writer.property(property);
        }
        writer.triples
    }

    /// Serialises the model as an RDF/XML document.
    pub fn to_rdf_xml(&self) -> Result<String, SerializeError> {
        write_rdf_xml(&self.to_triples())
    }
}

#[derive(Default)]
struct TripleWriter {
    triples: Vec<Triple>,
    blank_nodes: usize,
}

impl TripleWriter {
    fn push(
        &mut self,
        subject: impl Into<NamedOrBlankNode>,
        predicate: &str,
        object: impl Into<Term>,
    ) {
        self.triples
            .push(Triple::new(subject, named(predicate), object));
    }

    fn fresh(&mut self) -> BlankNode {
        self.blank_nodes += 1;
        BlankNode::new_unchecked(format!("onto{}", self.blank_nodes))
    }

    fn class(&mut self, class: &Class) {
        let subject = class.id().to_named_node();
        self.push(subject.clone(), rdf::TYPE, named(owl::CLASS));
        if let Some(label) = class.label() {
            self.push(subject.clone(), rdfs::LABEL, Literal::new_simple_literal(label));
        }
        if let Some(comment) = class.comment() {
            self.push(subject.clone(), rdfs::COMMENT, Literal::new_simple_literal(comment));
        }
        for parent in class.parents() {
            self.push(subject.clone(), rdfs::SUB_CLASS_OF, parent.to_named_node());
        }
        for restriction in class.restrictions() {
            let node = self.restriction(restriction);
            self.push(subject.clone(), rdfs::SUB_CLASS_OF, node);
        }
    }

    fn restriction(&mut self, restriction: &Restriction) -> BlankNode {
        let node = self.fresh();
        self.push(node.clone(), rdf::TYPE, named(owl::RESTRICTION));
        self.push(
            node.clone(),
            owl::ON_PROPERTY,
            restriction.property().to_named_node(),
        );
        match restriction {
            Restriction::MinCardinality { cardinality, .. } => {
                self.push(node.clone(), owl::MIN_CARDINALITY, cardinality_literal(*cardinality));
            }
            Restriction::MaxCardinality { cardinality, .. } => {
                self.push(node.clone(), owl::MAX_CARDINALITY, cardinality_literal(*cardinality));
            }
            Restriction::AllValuesFrom { range, .. } => {
                let datatype = self.data_range(range);
                self.push(node.clone(), owl::ALL_VALUES_FROM, datatype);
            }
        }
        node
    }

    fn data_range(&mut self, range: &DataRangeSpec) -> BlankNode {
        let node = self.fresh();
        self.push(node.clone(), rdf::TYPE, named(rdfs::DATATYPE));
        match range {
            DataRangeSpec::Bounded {
                datatype,
                minimum,
                maximum,
            } => {
                self.push(node.clone(), owl::ON_DATATYPE, datatype.to_named_node());
                let mut facets = Vec::new();
                for (facet, value) in [(xsd::MIN_INCLUSIVE, minimum), (xsd::MAX_INCLUSIVE, maximum)] {
                    if let Some(value) = value {
                        let facet_node = self.fresh();
                        self.push(
                            facet_node.clone(),
                            facet,
                            Literal::new_typed_literal(value.clone(), datatype.to_named_node()),
                        );
                        facets.push(Term::from(facet_node));
                    }
                }
                let list = self.list(facets);
                self.push(node.clone(), owl::WITH_RESTRICTIONS, list);
            }
            DataRangeSpec::OneOf(values) => {
                let members = values
                    .iter()
                    .map(|value| Term::from(Literal::new_simple_literal(value.clone())))
                    .collect();
                let list = self.list(members);
                self.push(node.clone(), owl::ONE_OF, list);
            }
        }
        node
    }

    fn list(&mut self, members: Vec<Term>) -> Term {
        let mut head = Term::from(named(rdf::NIL));
        for member in members.into_iter().rev() {
            let cell = self.fresh();
            self.push(cell.clone(), rdf::FIRST, member);
            self.push(cell.clone(), rdf::REST, head);
            head = Term::from(cell);
        }
        head
    }

    fn class_set(&mut self, classes: &BTreeSet<Iri>) -> Option<Term> {
        match classes.len() {
            0 => None,
            1 => classes
                .iter()
                .next()
                .map(|class| Term::from(class.to_named_node())),
            _ => {
                let node = self.fresh();
                self.push(node.clone(), rdf::TYPE, named(owl::CLASS));
                let members = classes
                    .iter()
                    .map(|class| Term::from(class.to_named_node()))
                    .collect();
                let list = self.list(members);
                self.push(node.clone(), owl::UNION_OF, list);
                Some(Term::from(node))
            }
        }
    }

    fn property(&mut self, property: &Property) {
        let subject = property.id().to_named_node();
        let kind = match property.kind() {
            PropertyKind::Object => owl::OBJECT_PROPERTY,
            PropertyKind::Data => owl::DATATYPE_PROPERTY,
        };
        self.push(subject.clone(), rdf::TYPE, named(kind));
        if let Some(label) = property.label() {
            self.push(subject.clone(), rdfs::LABEL, Literal::new_simple_literal(label));
        }
        if let Some(domain) = self.class_set(property.domains()) {
            self.push(subject.clone(), rdfs::DOMAIN, domain);
        }
        match property.kind() {
            PropertyKind::Object => {
                if let Some(range) = self.class_set(property.ranges()) {
                    self.push(subject, rdfs::RANGE, range);
                }
            }
            // a datatype union is not expressible with plain rdfs:range, keep the first
            PropertyKind::Data => {
                if let Some(datatype) = property.ranges().iter().next() {
                    self.push(subject, rdfs::RANGE, datatype.to_named_node());
                }
            }
        }
    }
}

fn named(iri: &str) -> NamedNode {
    NamedNode::new_unchecked(iri)
}

fn cardinality_literal(value: u32) -> Literal {
    Literal::new_typed_literal(value.to_string(), named(xsd::NON_NEGATIVE_INTEGER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::entities::{Class, Property, PropertyKind};

    fn iri(text: &str) -> Iri {
        Iri::new(text).expect("valid iri")
    }

    fn sample() -> OntologyModel {
        let mut ontology = OntologyModel::new(iri("https://example.org/onto")).with_label("onto");
        let mut person = Class::new(iri("https://example.org/onto/Person"));
        person.add_parent(iri("https://example.org/onto/Agent"));
        ontology
            .add_class(Class::new(iri("https://example.org/onto/Agent")))
            .expect("agent");
        ontology.add_class(person).expect("person");
        let mut knows = Property::new(iri("https://example.org/onto/knows"), PropertyKind::Object);
        knows.add_domain(iri("https://example.org/onto/Person"));
        knows.add_range(iri("https://example.org/onto/Person"));
        ontology.add_property(knows).expect("knows");
        ontology
    }

    #[test]
    fn emits_one_owl_class_per_class() {
        let triples = sample().to_triples();
        let classes = triples
            .iter()
            .filter(|triple| {
                triple.predicate.as_str() == rdf::TYPE
                    && triple.object == Term::from(named(owl::CLASS))
            })
            .count();
        assert_eq!(classes, 2);
        assert!(triples.iter().any(|triple| {
            triple.predicate.as_str() == rdfs::SUB_CLASS_OF
                && triple.object == Term::from(named("https://example.org/onto/Agent"))
        }));
    }

    #[test]
    fn projection_is_deterministic() {
        assert_eq!(sample().to_triples(), sample().to_triples());
        let xml = sample().to_rdf_xml().expect("serialized");
        assert!(xml.contains("https://example.org/onto/knows"));
    }
}

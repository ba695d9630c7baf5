//! Proposed facts awaiting validation.

use oxrdf::{BlankNode, Term, Triple};
use oxttl::TurtleParser;
use serde::{Deserialize, Serialize};

use super::DataValidationError;
use crate::{
    ontology::{write_rdf_xml, PrefixMap},
    schema::SchemaDefinition,
};

/// One proposed instance: the class it claims to be plus its Turtle body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactInstance {
    pub class_name: String,
    pub body: String,
}

/// Ordered batch of proposed instances sharing one prefix block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactBatch {
    /// Turtle `@prefix` declarations prepended to every instance body.
    pub prefixes: String,
    pub instances: Vec<FactInstance>,
}

impl FactBatch {
    /// Creates an empty batch with the given prefix block.
    #[must_use]
    pub fn new(prefixes: impl Into<String>) -> Self {
        Self {
            prefixes: prefixes.into(),
            instances: Vec::new(),
        }
    }

    /// Appends an instance, builder style.
    #[must_use]
    pub fn with_instance(mut self, class_name: impl Into<String>, body: impl Into<String>) -> Self {
        self.push(class_name, body);
        self
    }

    pub fn push(&mut self, class_name: impl Into<String>, body: impl Into<String>) {
        self.instances.push(FactInstance {
            class_name: class_name.into(),
            body: body.into(),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Returns the full Turtle document for one instance.
    #[must_use]
    pub fn document(&self, instance: &FactInstance) -> String {
        format!("{}\n\n{}", self.prefixes, instance.body)
    }

    /// Prefixes declared in the batch's prefix block.
    #[must_use]
    pub fn declared_prefixes(&self) -> PrefixMap {
        let mut prefixes = PrefixMap::new();
        for line in self.prefixes.lines() {
            let line = line.trim();
            let rest = line
                .strip_prefix("@prefix")
                .or_else(|| {
                    line.get(..6)
                        .filter(|keyword| keyword.eq_ignore_ascii_case("prefix"))
                        .map(|_| &line[6..])
                });
            let Some((name, iri)) = rest.and_then(|rest| rest.split_once(':')) else {
                continue;
            };
            let iri = iri
                .trim()
                .strip_prefix('<')
                .and_then(|iri| iri.split_once('>'))
                .map(|(iri, _)| iri);
            if let Some(iri) = iri {
                prefixes.insert(name.trim(), iri);
            }
        }
        prefixes
    }

    /// Parses the instance at `index` into triples.
    ///
    /// Schema prefixes are available to the body even when the batch does not
    /// declare them; relative IRIs resolve against the schema namespace. Blank
    /// node labels are scoped to the instance.
    ///
    /// # Errors
    ///
    /// Returns [`DataValidationError::DataSyntax`] with the parser's message.
    pub fn parse_instance(
        &self,
        schema: &SchemaDefinition,
        index: usize,
    ) -> Result<Vec<Triple>, DataValidationError> {
        let Some(instance) = self.instances.get(index) else {
            return Ok(Vec::new());
        };
        let syntax = |cause: String| DataValidationError::DataSyntax {
            class: instance.class_name.clone(),
            index,
            cause,
        };

        let mut parser = TurtleParser::new();
        for (prefix, namespace) in schema.prefixes.iter() {
            parser = parser
                .with_prefix(prefix, namespace)
                .map_err(|err| syntax(err.to_string()))?;
        }
        if !schema.default_namespace.is_empty() {
            parser = parser
                .with_base_iri(schema.default_namespace.as_str())
                .map_err(|err| syntax(err.to_string()))?;
        }

        let document = self.document(instance);
        let mut triples = Vec::new();
        for triple in parser.for_reader(document.as_bytes()) {
            let triple = triple.map_err(|err| syntax(err.to_string()))?;
            triples.push(scope_blank_nodes(triple, index));
        }
        Ok(triples)
    }

    /// Parses every instance, in order.
    ///
    /// # Errors
    ///
    /// Fails on the first instance that does not parse.
    pub fn to_triples(&self, schema: &SchemaDefinition) -> Result<Vec<Triple>, DataValidationError> {
        let mut triples = Vec::new();
        for index in 0..self.instances.len() {
            triples.extend(self.parse_instance(schema, index)?);
        }
        Ok(triples)
    }

    /// Renders the batch as the RDF/XML fact document used for reasoning.
    ///
    /// # Errors
    ///
    /// Fails when an instance does not parse or serialisation fails.
    pub fn to_rdf_xml(&self, schema: &SchemaDefinition) -> Result<String, DataValidationError> {
        let triples = self.to_triples(schema)?;
        Ok(write_rdf_xml(&triples)?)
    }
}

fn scope_blank_nodes(triple: Triple, index: usize) -> Triple {
    let scope = |node: &BlankNode| {
        BlankNode::new(format!("i{index}x{}", node.as_str())).unwrap_or_default()
    };
    let object = match triple.object {
        Term::BlankNode(node) => Term::BlankNode(scope(&node)),
        other => other,
    };
    match Term::from(triple.subject) {
        Term::BlankNode(node) => Triple::new(scope(&node), triple.predicate, object),
        Term::NamedNode(node) => Triple::new(node, triple.predicate, object),
        _ => Triple::new(BlankNode::default(), triple.predicate, object),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::compile;

    const SCHEMA: &str = r"
id: https://example.org/people
name: people
prefixes:
  ex: https://example.org/people/
default_prefix: ex
classes:
  Person:
    attributes:
      id:
        identifier: true
      name: {}
";

    #[test]
    fn parses_instances_with_scoped_blank_nodes() {
        let schema = compile(SCHEMA).expect("schema");
        let batch = FactBatch::new("@prefix ex: <https://example.org/people/> .")
            .with_instance("Person", "ex:p1 a ex:Person ; ex:name \"Ada\" .")
            .with_instance("Person", "_:x a ex:Person ; ex:name \"Bob\" .")
            .with_instance("Person", "_:x a ex:Person ; ex:name \"Cy\" .");
        let triples = batch.to_triples(&schema).expect("triples");
        assert_eq!(triples.len(), 6);
        let blank_subjects: std::collections::HashSet<String> = triples
            .iter()
            .filter_map(|triple| match Term::from(triple.subject.clone()) {
                Term::BlankNode(node) => Some(node.as_str().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(blank_subjects.len(), 2);
    }

    #[test]
    fn reports_parse_failures_with_the_class() {
        let schema = compile(SCHEMA).expect("schema");
        let batch = FactBatch::new("").with_instance("Person", "ex:p1 a ex:Person ; ex:name");
        let err = batch.parse_instance(&schema, 0).expect_err("syntax error");
        assert!(matches!(
            err,
            DataValidationError::DataSyntax { ref class, index: 0, .. } if class == "Person"
        ));
    }

    #[test]
    fn schema_prefixes_are_implicit() {
        let schema = compile(SCHEMA).expect("schema");
        let batch = FactBatch::new("").with_instance("Person", "ex:p1 ex:name \"Ada\" .");
        let xml = batch.to_rdf_xml(&schema).expect("xml");
        assert!(xml.contains("https://example.org/people/"));
        assert_eq!(batch.declared_prefixes().iter().count(), 0);

        let batch = FactBatch::new("@prefix ex: <https://example.org/people/> .\nPREFIX foaf: <http://xmlns.com/foaf/0.1/>");
        let prefixes = batch.declared_prefixes();
        assert_eq!(prefixes.namespace("ex"), Some("https://example.org/people/"));
        assert_eq!(prefixes.namespace("foaf"), Some("http://xmlns.com/foaf/0.1/"));
    }
}

//! Schema-driven validation of proposed instances.
//!
//! The compiled [`SchemaDefinition`] is walked as data: each instance graph is
//! matched against the induced attributes of its class, and every violation is
//! recorded before moving on so one round reports as much as possible.

use std::collections::{HashMap, HashSet};

use oxrdf::{Literal, NamedNode, Term, Triple};
use tracing::{debug, info};

use super::{DataValidationError, FactBatch};
use crate::{
    ontology::{literals, vocab, PrefixMap},
    report::ValidationResult,
    schema::{Range, SchemaDefinition, SlotDefinition},
};

/// Validates fact batches against one compiled schema.
#[derive(Clone, Copy, Debug)]
pub struct DataValidator<'a> {
    schema: &'a SchemaDefinition,
}

impl<'a> DataValidator<'a> {
    #[must_use]
    pub fn new(schema: &'a SchemaDefinition) -> Self {
        Self { schema }
    }

    /// Validates every instance of `batch`.
    ///
    /// Constraint violations are returned in an invalid [`ValidationResult`];
    /// a passing result carries the number of validated instances.
    ///
    /// # Errors
    ///
    /// Returns [`DataValidationError::UnknownClass`] naming every undeclared
    /// class, or [`DataValidationError::DataSyntax`] when an instance body
    /// does not parse.
    pub fn validate(&self, batch: &FactBatch) -> Result<ValidationResult, DataValidationError> {
        let mut unknown: Vec<String> = Vec::new();
        for instance in &batch.instances {
            if self.schema.class(&instance.class_name).is_none()
                && !unknown.contains(&instance.class_name)
            {
                unknown.push(instance.class_name.clone());
            }
        }
        if !unknown.is_empty() {
            debug!(?unknown, "batch references undeclared classes");
            return Err(DataValidationError::UnknownClass(unknown));
        }

        let mut prefixes = self.schema.prefixes.clone();
        for (prefix, namespace) in batch.declared_prefixes().iter() {
            prefixes.insert(prefix, namespace);
        }

        let mut identifiers: HashMap<Term, usize> = HashMap::new();
        let mut messages = Vec::new();
        for (index, instance) in batch.instances.iter().enumerate() {
            let graph = InstanceGraph::new(batch.parse_instance(self.schema, index)?);
            let mut check = InstanceCheck {
                schema: self.schema,
                prefixes: &prefixes,
                graph: &graph,
                visited: HashSet::new(),
                messages: Vec::new(),
            };

            let roots = check.roots(&instance.class_name);
            if roots.is_empty() {
                check.messages.push(format!(
                    "instance {}: no subject is typed as `{}`",
                    index + 1,
                    instance.class_name
                ));
            }
            for root in &roots {
                if matches!(root, Term::NamedNode(_)) {
                    if let Some(previous) = identifiers.insert(root.clone(), index) {
                        if previous != index {
                            check.messages.push(format!(
                                "{}: duplicate identifier, already used by instance {}",
                                check.label(root),
                                previous + 1
                            ));
                        }
                    }
                }
                check.node(root, &instance.class_name);
            }
            check.unprocessed();

            debug!(
                class = %instance.class_name,
                index,
                roots = roots.len(),
                problems = check.messages.len(),
                "validated instance"
            );
            messages.append(&mut check.messages);
        }

        if messages.is_empty() {
            info!(instances = batch.len(), "data batch is valid");
            let noun = if batch.len() == 1 { "instance" } else { "instances" };
            Ok(ValidationResult::valid(format!(
                "Validated {} {noun}",
                batch.len()
            )))
        } else {
            info!(problems = messages.len(), "data batch failed validation");
            Ok(ValidationResult::invalid(messages))
        }
    }
}

/// Subject-indexed view of one parsed instance.
struct InstanceGraph {
    subjects: Vec<Term>,
    edges: HashMap<Term, Vec<(NamedNode, Term)>>,
}

impl InstanceGraph {
    fn new(triples: Vec<Triple>) -> Self {
        let mut subjects = Vec::new();
        let mut edges: HashMap<Term, Vec<(NamedNode, Term)>> = HashMap::new();
        for triple in triples {
            let subject = Term::from(triple.subject);
            let entry = edges.entry(subject.clone()).or_default();
            if entry.is_empty() {
                subjects.push(subject);
            }
            entry.push((triple.predicate, triple.object));
        }
        Self { subjects, edges }
    }

    fn edges(&self, node: &Term) -> &[(NamedNode, Term)] {
        self.edges.get(node).map_or(&[], Vec::as_slice)
    }

    fn types<'g>(&'g self, node: &Term) -> impl Iterator<Item = &'g NamedNode> + 'g {
        self.edges(node)
            .iter()
            .filter(|(predicate, _)| predicate.as_str() == vocab::rdf::TYPE)
            .filter_map(|(_, object)| match object {
                Term::NamedNode(class) => Some(class),
                _ => None,
            })
    }
}

struct InstanceCheck<'a> {
    schema: &'a SchemaDefinition,
    prefixes: &'a PrefixMap,
    graph: &'a InstanceGraph,
    visited: HashSet<Term>,
    messages: Vec<String>,
}

impl<'a> InstanceCheck<'a> {
    /// Subjects typed with `class` or one of its subclasses.
    fn roots(&self, class: &str) -> Vec<Term> {
        self.graph
            .subjects
            .iter()
            .filter(|subject| {
                self.graph.types(subject).any(|uri| {
                    self.schema
                        .class_by_uri(uri.as_str())
                        .is_some_and(|typed| self.schema.is_same_or_subclass(&typed.name, class))
                })
            })
            .cloned()
            .collect()
    }

    fn node(&mut self, node: &Term, expected: &str) {
        if !self.visited.insert(node.clone()) {
            return;
        }
        let (schema, graph) = (self.schema, self.graph);
        let label = self.label(node);
        let class = self.effective_class(node, &label, expected);

        if self.schema.class(&class).is_some_and(|definition| definition.is_abstract) {
            self.messages.push(format!(
                "{label}: `{class}` is abstract and cannot be instantiated"
            ));
        }
        self.identifier(node, &label, &class);

        let attributes = schema.induced_attributes(&class);
        let slots: HashMap<&str, &SlotDefinition> = attributes
            .values()
            .filter(|slot| !slot.identifier)
            .map(|slot| (slot.slot_uri.as_str(), *slot))
            .collect();

        let edges = graph.edges(node);
        for (predicate, object) in edges {
            if predicate.as_str() != vocab::rdf::TYPE && !slots.contains_key(predicate.as_str()) {
                self.messages.push(format!(
                    "{label}: `{}` is not an attribute of `{class}` (value {})",
                    self.prefixes.compact(predicate.as_str()),
                    self.describe(object)
                ));
            }
        }

        for slot in attributes.values().filter(|slot| !slot.identifier) {
            let values: Vec<&Term> = edges
                .iter()
                .filter(|(predicate, _)| predicate.as_str() == slot.slot_uri.as_str())
                .map(|(_, object)| object)
                .collect();
            if slot.required && values.is_empty() {
                self.messages
                    .push(format!("{label}: `{}` is required for `{class}`", slot.name));
            }
            if !slot.multivalued && values.len() > 1 {
                self.messages.push(format!(
                    "{label}: `{}` takes a single value but has {}",
                    slot.name,
                    values.len()
                ));
            }
            for value in values {
                self.value(&label, slot, value);
            }
        }
    }

    /// Resolves the most specific declared type compatible with `expected`.
    fn effective_class(&mut self, node: &Term, label: &str, expected: &str) -> String {
        let mut class = expected.to_string();
        let types: Vec<NamedNode> = self.graph.types(node).cloned().collect();
        for uri in types {
            if vocab::is_builtin(uri.as_str()) {
                continue;
            }
            match self.schema.class_by_uri(uri.as_str()) {
                Some(typed) if self.schema.is_same_or_subclass(&typed.name, &class) => {
                    class = typed.name.clone();
                }
                Some(typed) if self.schema.is_same_or_subclass(&class, &typed.name) => {}
                Some(typed) => self.messages.push(format!(
                    "{label}: typed as `{}`, which is not a `{expected}`",
                    typed.name
                )),
                None => self.messages.push(format!(
                    "{label}: `{}` is not a class of the schema",
                    self.prefixes.compact(uri.as_str())
                )),
            }
        }
        class
    }

    fn identifier(&mut self, node: &Term, label: &str, class: &str) {
        let Some(slot) = self.schema.identifier_slot(class) else {
            return;
        };
        let Term::NamedNode(subject) = node else {
            self.messages.push(format!(
                "{label}: `{class}` is identified by `{}`, use an IRI subject instead of a blank node",
                slot.name
            ));
            return;
        };
        let allowed = self.schema.id_prefixes(class);
        if allowed.is_empty() {
            return;
        }
        let compact = self.prefixes.compact(subject.as_str());
        let prefix = compact
            .split_once(':')
            .map(|(prefix, _)| prefix)
            .filter(|_| compact != subject.as_str());
        if !prefix.is_some_and(|prefix| allowed.iter().any(|allowed| allowed == prefix)) {
            self.messages.push(format!(
                "{label}: identifiers of `{class}` must use one of the prefixes {}",
                allowed.join(", ")
            ));
        }
    }

    fn value(&mut self, label: &str, slot: &SlotDefinition, value: &Term) {
        match &slot.range {
            Range::Primitive(primitive) => {
                let Term::Literal(literal) = value else {
                    self.messages.push(format!(
                        "{label}: `{}` expects a {primitive} literal but got {}",
                        slot.name,
                        self.describe(value)
                    ));
                    return;
                };
                let expected = primitive.xsd();
                if literal.language().is_some()
                    || !literals::conforms(literal.datatype().as_str(), expected)
                {
                    self.messages.push(format!(
                        "{label}: `{}` expects {primitive} but got {}",
                        slot.name,
                        self.describe(value)
                    ));
                    return;
                }
                self.literal_facets(label, slot, literal);
            }
            Range::Enum(name) => {
                let Term::Literal(literal) = value else {
                    self.messages.push(format!(
                        "{label}: `{}` expects a value of `{name}` but got {}",
                        slot.name,
                        self.describe(value)
                    ));
                    return;
                };
                let permitted = self
                    .schema
                    .enumeration(name)
                    .is_some_and(|definition| definition.permits(literal.value()));
                if !permitted {
                    let allowed = self
                        .schema
                        .enumeration(name)
                        .map(|definition| definition.permissible_values.join(", "))
                        .unwrap_or_default();
                    self.messages.push(format!(
                        "{label}: `{}` value \"{}\" is not a permissible value of `{name}` ({allowed})",
                        slot.name,
                        literal.value()
                    ));
                }
            }
            Range::Class(range) => match value {
                Term::Literal(_) => self.messages.push(format!(
                    "{label}: `{}` expects a reference to a `{range}` but got {}",
                    slot.name,
                    self.describe(value)
                )),
                Term::BlankNode(_) if self.graph.edges(value).is_empty() => {
                    self.messages.push(format!(
                        "{label}: `{}` points to an empty blank node",
                        slot.name
                    ));
                }
                _ if !self.graph.edges(value).is_empty() => self.node(value, range),
                _ => {}
            },
        }
    }

    fn literal_facets(&mut self, label: &str, slot: &SlotDefinition, literal: &Literal) {
        let parsed = match literals::from_literal(literal) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.messages
                    .push(format!("{label}: `{}` {err}", slot.name));
                return;
            }
        };
        if let Some(number) = parsed.as_f64() {
            if let Some(minimum) = slot.minimum_value.filter(|minimum| number < *minimum) {
                self.messages.push(format!(
                    "{label}: `{}` value {} is less than the minimum {minimum}",
                    slot.name,
                    literal.value()
                ));
            }
            if let Some(maximum) = slot.maximum_value.filter(|maximum| number > *maximum) {
                self.messages.push(format!(
                    "{label}: `{}` value {} is greater than the maximum {maximum}",
                    slot.name,
                    literal.value()
                ));
            }
        }
        if let Some(pattern) = &slot.pattern {
            if !pattern.is_match(literal.value()) {
                self.messages.push(format!(
                    "{label}: `{}` value \"{}\" does not match the pattern `{}`",
                    slot.name,
                    literal.value(),
                    pattern.as_str()
                ));
            }
        }
    }

    /// Reports triples whose subject was never reached from a root.
    fn unprocessed(&mut self) {
        let graph = self.graph;
        for subject in &graph.subjects {
            if self.visited.contains(subject) {
                continue;
            }
            for (predicate, object) in graph.edges(subject) {
                self.messages.push(format!(
                    "unprocessed triple: {} {} {}",
                    self.label(subject),
                    self.prefixes.compact(predicate.as_str()),
                    self.describe(object)
                ));
            }
        }
    }

    fn label(&self, node: &Term) -> String {
        match node {
            Term::NamedNode(node) => self.prefixes.compact(node.as_str()),
            Term::BlankNode(node) => format!("_:{}", node.as_str()),
            other => other.to_string(),
        }
    }

    fn describe(&self, term: &Term) -> String {
        match term {
            Term::Literal(literal) => {
                if let Some(language) = literal.language() {
                    format!("\"{}\"@{language}", literal.value())
                } else if literal.datatype().as_str() == vocab::xsd::STRING {
                    format!("\"{}\"", literal.value())
                } else {
                    format!(
                        "\"{}\" ({})",
                        literal.value(),
                        self.prefixes.compact(literal.datatype().as_str())
                    )
                }
            }
            other => self.label(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::schema::compile;

    const SCHEMA: &str = r"
id: https://w3id.org/linkml/examples/personinfo
name: personinfo
prefixes:
  personinfo: https://w3id.org/linkml/examples/personinfo/
  ORCID: https://orcid.org/
default_prefix: personinfo
classes:
  NamedThing:
    abstract: true
    attributes:
      id:
        identifier: true
  Person:
    is_a: NamedThing
    id_prefixes:
      - ORCID
    attributes:
      full_name:
        required: true
      age:
        range: integer
        minimum_value: 0
        maximum_value: 120
      phone:
        pattern: '^[0-9-]+$'
      status:
        range: LivingStatus
      employer:
        range: Organization
  Organization:
    is_a: NamedThing
    attributes:
      org_name: {}
enums:
  LivingStatus:
    permissible_values:
      LIVING:
      DEAD:
";

    const PREFIXES: &str = "@prefix personinfo: <https://w3id.org/linkml/examples/personinfo/> .\n@prefix ORCID: <https://orcid.org/> .\n@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .";

    fn validate(body: &str) -> Result<ValidationResult, DataValidationError> {
        let schema = compile(SCHEMA).expect("schema");
        let batch = FactBatch::new(PREFIXES).with_instance("Person", body);
        DataValidator::new(&schema).validate(&batch)
    }

    #[test]
    fn accepts_conforming_instance() {
        let result = validate(
            "ORCID:1234 a personinfo:Person ; personinfo:full_name \"Clark Kent\" ; personinfo:age 30 ; personinfo:status \"LIVING\" .",
        )
        .expect("validated");
        assert!(result.valid, "{:?}", result.messages);
        assert_eq!(result.messages, vec!["Validated 1 instance".to_string()]);
    }

    #[test]
    fn summary_counts_every_instance() {
        let schema = compile(SCHEMA).expect("schema");
        let batch = FactBatch::new(PREFIXES)
            .with_instance("Person", "ORCID:1 a personinfo:Person ; personinfo:full_name \"Clark Kent\" .")
            .with_instance("Person", "ORCID:2 a personinfo:Person ; personinfo:full_name \"Lois Lane\" .");
        let result = DataValidator::new(&schema).validate(&batch).expect("validated");
        assert_eq!(result.messages, vec!["Validated 2 instances".to_string()]);
    }

    #[test]
    fn reports_bound_violations() {
        let result = validate(
            "ORCID:1234 a personinfo:Person ; personinfo:full_name \"Clark Kent\" ; personinfo:age 330 .",
        )
        .expect("validated");
        assert!(!result.valid);
        assert_snapshot!(result.feedback(), @"ORCID:1234: `age` value 330 is greater than the maximum 120");
    }

    #[test]
    fn collects_every_problem_of_an_instance() {
        let result = validate(
            "<https://example.org/p1> a personinfo:Person ; personinfo:age \"old\" ; personinfo:phone \"call me\" ; personinfo:status \"UNKNOWN\" ; personinfo:nickname \"CK\" .",
        )
        .expect("validated");
        assert!(!result.valid);
        let feedback = result.feedback();
        assert!(feedback.contains("must use one of the prefixes ORCID"));
        assert!(feedback.contains("`personinfo:nickname` is not an attribute of `Person`"));
        assert!(feedback.contains("`full_name` is required for `Person`"));
        assert!(feedback.contains("`age` expects integer but got \"old\""));
        assert!(feedback.contains("does not match the pattern"));
        assert!(feedback.contains("is not a permissible value of `LivingStatus`"));
    }

    #[test]
    fn validates_inlined_objects_and_types() {
        let result = validate(
            "ORCID:1 a personinfo:Person ; personinfo:full_name \"A\" ; personinfo:employer [ a personinfo:Organization ; personinfo:org_name 5 ] .",
        )
        .expect("validated");
        assert!(!result.valid);
        assert!(result.feedback().contains("`org_name` expects string"));

        let result = validate("ORCID:1 a personinfo:NamedThing .").expect("validated");
        assert!(result.feedback().contains("no subject is typed as `Person`"));
    }

    #[test]
    fn names_unknown_classes() {
        let schema = compile(SCHEMA).expect("schema");
        let batch = FactBatch::new(PREFIXES)
            .with_instance("Person", "ORCID:1 a personinfo:Person ; personinfo:full_name \"A\" .")
            .with_instance("Superhero", "ORCID:2 a personinfo:Superhero .");
        let err = DataValidator::new(&schema)
            .validate(&batch)
            .expect_err("unknown class");
        assert_eq!(err.to_string(), "Class not in schema: Superhero");
    }

    #[test]
    fn rejects_duplicate_identifiers_across_instances() {
        let schema = compile(SCHEMA).expect("schema");
        let body = "ORCID:1 a personinfo:Person ; personinfo:full_name \"A\" .";
        let batch = FactBatch::new(PREFIXES)
            .with_instance("Person", body)
            .with_instance("Person", body);
        let result = DataValidator::new(&schema).validate(&batch).expect("validated");
        assert_eq!(
            result.messages,
            vec!["ORCID:1: duplicate identifier, already used by instance 1".to_string()]
        );
    }
}

//! Description-logic view of the triples loaded in a [`super::World`].
//!
//! Class expressions are interned in negation normal form. Axioms with an
//! atomic left-hand side are absorbed into unfolding rules, domains are kept
//! apart, and everything else becomes a general inclusion applied to every
//! node of the completion graph.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
};

use oxrdf::{Literal, Term, Triple};
use tracing::debug;

use crate::ontology::{
    literals::{self, DataValue, LiteralError},
    vocab::{self, owl, rdf, rdfs, xsd},
};

pub type ConceptId = usize;
pub type AxiomId = usize;

const MAX_EXPRESSION_DEPTH: usize = 64;

/// Named property, possibly used in the inverse direction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Role {
    pub name: String,
    pub inverse: bool,
}

impl Role {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inverse: false,
        }
    }

    #[must_use]
    pub fn inv(&self) -> Self {
        Self {
            name: self.name.clone(),
            inverse: !self.inverse,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inverse {
            write!(f, "inverse {}", short(&self.name))
        } else {
            f.write_str(short(&self.name))
        }
    }
}

/// Literal as written, hashable so it can live inside concepts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LiteralKey {
    pub lexical: String,
    pub datatype: String,
    pub language: Option<String>,
}

impl LiteralKey {
    #[must_use]
    pub fn from_literal(literal: &Literal) -> Self {
        Self {
            lexical: literal.value().to_string(),
            datatype: literal.datatype().as_str().to_string(),
            language: literal.language().map(str::to_ascii_lowercase),
        }
    }

    /// Maps the literal to its value.
    ///
    /// # Errors
    ///
    /// Fails for ill-typed literals of supported datatypes.
    pub fn value(&self) -> Result<DataValue, LiteralError> {
        match &self.language {
            Some(language) => Ok(DataValue::Text {
                datatype: rdf::LANG_STRING.to_string(),
                value: self.lexical.clone(),
                language: Some(language.clone()),
            }),
            None => literals::parse(&self.datatype, &self.lexical),
        }
    }
}

impl fmt::Display for LiteralKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.language {
            Some(language) => write!(f, "\"{}\"@{language}", self.lexical),
            None if self.datatype == xsd::STRING => write!(f, "\"{}\"", self.lexical),
            None if literals::is_integer_type(&self.datatype) || self.datatype == xsd::DECIMAL => {
                f.write_str(&self.lexical)
            }
            None => write!(f, "\"{}\"^^{}", self.lexical, short(&self.datatype)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataRange {
    /// `rdfs:Literal`.
    Any,
    Datatype(String),
    Not(Box<DataRange>),
    OneOf(Vec<LiteralKey>),
    Restricted {
        base: String,
        facets: Vec<(String, LiteralKey)>,
    },
    And(Vec<DataRange>),
    Or(Vec<DataRange>),
}

impl DataRange {
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

impl fmt::Display for DataRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Literal"),
            Self::Datatype(datatype) => f.write_str(short(datatype)),
            Self::Not(inner) => write!(f, "not {inner}"),
            Self::OneOf(values) => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", values.join(", "))
            }
            Self::Restricted { base, facets } => {
                let facets: Vec<String> = facets
                    .iter()
                    .map(|(facet, value)| format!("{} {value}", facet_symbol(facet)))
                    .collect();
                write!(f, "{}[{}]", short(base), facets.join(", "))
            }
            Self::And(parts) => write!(f, "({})", join(parts, " and ")),
            Self::Or(parts) => write!(f, "({})", join(parts, " or ")),
        }
    }
}

fn join<T: fmt::Display>(parts: &[T], separator: &str) -> String {
    parts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

fn facet_symbol(facet: &str) -> &str {
    match facet {
        xsd::MIN_INCLUSIVE => ">=",
        xsd::MAX_INCLUSIVE => "<=",
        xsd::MIN_EXCLUSIVE => ">",
        xsd::MAX_EXCLUSIVE => "<",
        other => short(other),
    }
}

/// Class expression in negation normal form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Concept {
    Top,
    Bottom,
    Atom(String),
    NotAtom(String),
    And(Vec<ConceptId>),
    Or(Vec<ConceptId>),
    Some(Role, ConceptId),
    All(Role, ConceptId),
    AtLeast(u32, Role, ConceptId),
    AtMost(u32, Role, ConceptId),
    OneOf(Vec<String>),
    NotOneOf(Vec<String>),
    HasSelf(Role),
    NotHasSelf(Role),
    DataSome(String, DataRange),
    DataAll(String, DataRange),
    DataAtLeast(u32, String, DataRange),
    DataAtMost(u32, String, DataRange),
}

/// Interning arena for concepts; ids are stable for the arena's lifetime.
#[derive(Debug)]
pub struct Concepts {
    items: Vec<Concept>,
    index: HashMap<Concept, ConceptId>,
    negations: HashMap<ConceptId, ConceptId>,
}

impl Default for Concepts {
    fn default() -> Self {
        let mut concepts = Self {
            items: Vec::new(),
            index: HashMap::new(),
            negations: HashMap::new(),
        };
        concepts.intern(Concept::Top);
        concepts.intern(Concept::Bottom);
        concepts
    }
}

impl Concepts {
    pub const TOP: ConceptId = 0;
    pub const BOTTOM: ConceptId = 1;

    #[must_use]
    pub fn get(&self, id: ConceptId) -> &Concept {
        &self.items[id]
    }

    pub fn intern(&mut self, concept: Concept) -> ConceptId {
        if let Some(id) = self.index.get(&concept) {
            return *id;
        }
        let id = self.items.len();
        self.items.push(concept.clone());
        self.index.insert(concept, id);
        id
    }

    pub fn atom(&mut self, name: &str) -> ConceptId {
        self.intern(Concept::Atom(name.to_string()))
    }

    pub fn and(&mut self, parts: Vec<ConceptId>) -> ConceptId {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match self.get(part) {
                Concept::Top => {}
                Concept::Bottom => return Self::BOTTOM,
                Concept::And(inner) => flat.extend(inner.iter().copied()),
                _ => flat.push(part),
            }
        }
        flat.sort_unstable();
        flat.dedup();
        match flat.len() {
            0 => Self::TOP,
            1 => flat[0],
            _ => self.intern(Concept::And(flat)),
        }
    }

    pub fn or(&mut self, parts: Vec<ConceptId>) -> ConceptId {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match self.get(part) {
                Concept::Bottom => {}
                Concept::Top => return Self::TOP,
                Concept::Or(inner) => flat.extend(inner.iter().copied()),
                _ => flat.push(part),
            }
        }
        flat.sort_unstable();
        flat.dedup();
        match flat.len() {
            0 => Self::BOTTOM,
            1 => flat[0],
            _ => self.intern(Concept::Or(flat)),
        }
    }

    pub fn one_of(&mut self, mut names: Vec<String>) -> ConceptId {
        names.sort();
        names.dedup();
        if names.is_empty() {
            return Self::BOTTOM;
        }
        self.intern(Concept::OneOf(names))
    }

    pub fn at_least(&mut self, count: u32, role: Role, filler: ConceptId) -> ConceptId {
        if count == 0 {
            return Self::TOP;
        }
        self.intern(Concept::AtLeast(count, role, filler))
    }

    pub fn data_at_least(&mut self, count: u32, property: String, range: DataRange) -> ConceptId {
        if count == 0 {
            return Self::TOP;
        }
        self.intern(Concept::DataAtLeast(count, property, range))
    }

    /// Returns the negation normal form of `not id`.
    pub fn negate(&mut self, id: ConceptId) -> ConceptId {
        if let Some(negation) = self.negations.get(&id) {
            return *negation;
        }
        let negation = match self.get(id).clone() {
            Concept::Top => Self::BOTTOM,
            Concept::Bottom => Self::TOP,
            Concept::Atom(name) => self.intern(Concept::NotAtom(name)),
            Concept::NotAtom(name) => self.intern(Concept::Atom(name)),
            Concept::And(parts) => {
                let parts = parts.into_iter().map(|part| self.negate(part)).collect();
                self.or(parts)
            }
            Concept::Or(parts) => {
                let parts = parts.into_iter().map(|part| self.negate(part)).collect();
                self.and(parts)
            }
            Concept::Some(role, filler) => {
                let filler = self.negate(filler);
                self.intern(Concept::All(role, filler))
            }
            Concept::All(role, filler) => {
                let filler = self.negate(filler);
                if filler == Self::BOTTOM {
                    Self::BOTTOM
                } else {
                    self.intern(Concept::Some(role, filler))
                }
            }
            Concept::AtLeast(count, role, filler) => {
                self.intern(Concept::AtMost(count - 1, role, filler))
            }
            Concept::AtMost(count, role, filler) => {
                self.intern(Concept::AtLeast(count + 1, role, filler))
            }
            Concept::OneOf(names) => self.intern(Concept::NotOneOf(names)),
            Concept::NotOneOf(names) => self.intern(Concept::OneOf(names)),
            Concept::HasSelf(role) => self.intern(Concept::NotHasSelf(role)),
            Concept::NotHasSelf(role) => self.intern(Concept::HasSelf(role)),
            Concept::DataSome(property, range) => {
                self.intern(Concept::DataAll(property, range.negate()))
            }
            Concept::DataAll(property, range) => {
                self.intern(Concept::DataSome(property, range.negate()))
            }
            Concept::DataAtLeast(count, property, range) => {
                self.intern(Concept::DataAtMost(count - 1, property, range))
            }
            Concept::DataAtMost(count, property, range) => {
                self.intern(Concept::DataAtLeast(count + 1, property, range))
            }
        };
        self.negations.insert(id, negation);
        self.negations.insert(negation, id);
        negation
    }

    /// Renders a concept in a Manchester-like syntax with short names.
    #[must_use]
    pub fn render(&self, id: ConceptId) -> String {
        match self.get(id) {
            Concept::Top => "Thing".to_string(),
            Concept::Bottom => "Nothing".to_string(),
            Concept::Atom(name) => short(name).to_string(),
            Concept::NotAtom(name) => format!("not {}", short(name)),
            Concept::And(parts) => format!("({})", self.render_all(parts, " and ")),
            Concept::Or(parts) => format!("({})", self.render_all(parts, " or ")),
            Concept::Some(role, filler) => format!("({role} some {})", self.render(*filler)),
            Concept::All(role, filler) => format!("({role} only {})", self.render(*filler)),
            Concept::AtLeast(count, role, filler) => {
                format!("({role} min {count}{})", self.qualifier(*filler))
            }
            Concept::AtMost(count, role, filler) => {
                format!("({role} max {count}{})", self.qualifier(*filler))
            }
            Concept::OneOf(names) => format!("{{{}}}", short_names(names)),
            Concept::NotOneOf(names) => format!("not {{{}}}", short_names(names)),
            Concept::HasSelf(role) => format!("({role} Self)"),
            Concept::NotHasSelf(role) => format!("not ({role} Self)"),
            Concept::DataSome(property, range) => {
                format!("({} some {range})", short(property))
            }
            Concept::DataAll(property, range) => {
                format!("({} only {range})", short(property))
            }
            Concept::DataAtLeast(count, property, range) => {
                format!("({} min {count} {range})", short(property))
            }
            Concept::DataAtMost(count, property, range) => {
                format!("({} max {count} {range})", short(property))
            }
        }
    }

    fn render_all(&self, parts: &[ConceptId], separator: &str) -> String {
        parts
            .iter()
            .map(|part| self.render(*part))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn qualifier(&self, filler: ConceptId) -> String {
        if filler == Self::TOP {
            String::new()
        } else {
            format!(" {}", self.render(filler))
        }
    }
}

fn short_names(names: &[String]) -> String {
    names
        .iter()
        .map(|name| short(name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Local part of an IRI, used in explanations.
#[must_use]
pub fn short(iri: &str) -> &str {
    if iri.starts_with("_:") {
        return iri;
    }
    iri.rsplit(['#', '/'])
        .next()
        .filter(|local| !local.is_empty())
        .unwrap_or(iri)
}

/// Property hierarchy and characteristics.
#[derive(Debug, Default)]
pub struct RoleBox {
    told: Vec<(Role, Role, AxiomId)>,
    closure: HashMap<Role, Vec<(Role, BTreeSet<AxiomId>)>>,
    transitive: HashMap<String, AxiomId>,
    pub asymmetric: Vec<(String, AxiomId)>,
    pub disjoint: Vec<(Role, Role, AxiomId)>,
}

impl RoleBox {
    /// Records `sub` as a sub-property of `sup`, in both directions.
    pub fn add_sub(&mut self, sub: Role, sup: Role, axiom: AxiomId) {
        self.told.push((sub.inv(), sup.inv(), axiom));
        self.told.push((sub, sup, axiom));
    }

    pub fn add_transitive(&mut self, name: &str, axiom: AxiomId) {
        self.transitive.insert(name.to_string(), axiom);
    }

    /// Computes the transitive closure of the told hierarchy.
    pub fn close(&mut self) {
        let roles: BTreeSet<Role> = self
            .told
            .iter()
            .map(|(sub, _, _)| sub.clone())
            .collect();
        let mut closure = HashMap::new();
        for role in roles {
            let mut reached: Vec<(Role, BTreeSet<AxiomId>)> = Vec::new();
            let mut frontier = vec![(role.clone(), BTreeSet::new())];
            while let Some((current, deps)) = frontier.pop() {
                for (sub, sup, axiom) in &self.told {
                    if *sub != current || *sup == role || reached.iter().any(|(seen, _)| seen == sup)
                    {
                        continue;
                    }
                    let mut deps = deps.clone();
                    deps.insert(*axiom);
                    reached.push((sup.clone(), deps.clone()));
                    frontier.push((sup.clone(), deps));
                }
            }
            closure.insert(role, reached);
        }
        self.closure = closure;
    }

    /// Returns the axioms that make `sub` a sub-property of `sup`, or `None`.
    #[must_use]
    pub fn subsumes(&self, sub: &Role, sup: &Role) -> Option<BTreeSet<AxiomId>> {
        if sub == sup {
            return Some(BTreeSet::new());
        }
        self.closure.get(sub).and_then(|supers| {
            supers
                .iter()
                .find(|(candidate, _)| candidate == sup)
                .map(|(_, deps)| deps.clone())
        })
    }

    /// Transitive roles below `role`, including `role` itself.
    #[must_use]
    pub fn transitive_below(&self, role: &Role) -> Vec<(Role, BTreeSet<AxiomId>)> {
        let mut below = Vec::new();
        if let Some(axiom) = self.transitive.get(&role.name) {
            below.push((role.clone(), BTreeSet::from([*axiom])));
        }
        for (sub, supers) in &self.closure {
            let Some(axiom) = self.transitive.get(&sub.name) else {
                continue;
            };
            if let Some((_, deps)) = supers.iter().find(|(sup, _)| sup == role) {
                let mut deps = deps.clone();
                deps.insert(*axiom);
                below.push((sub.clone(), deps));
            }
        }
        below
    }
}

/// Everything the tableau needs, extracted from one world.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    pub concepts: Concepts,
    /// Human-readable text of every axiom, indexed by [`AxiomId`].
    pub axioms: Vec<String>,
    pub unfold: HashMap<String, Vec<(ConceptId, AxiomId)>>,
    pub gcis: Vec<(ConceptId, AxiomId)>,
    pub domains: Vec<(Role, ConceptId, AxiomId)>,
    pub data_domains: Vec<(String, ConceptId, AxiomId)>,
    pub roles: RoleBox,
    pub individuals: Vec<String>,
    pub class_assertions: Vec<(String, ConceptId, AxiomId)>,
    pub role_assertions: Vec<(String, String, String, AxiomId)>,
    pub data_assertions: Vec<(String, String, LiteralKey, AxiomId)>,
    pub negative_role_assertions: Vec<(String, Role, String, AxiomId)>,
    pub negative_data_assertions: Vec<(String, String, LiteralKey, AxiomId)>,
    pub same: Vec<(String, String, AxiomId)>,
    pub different: Vec<(String, String, AxiomId)>,
}

impl KnowledgeBase {
    /// Extracts the axioms expressed by `triples`.
    ///
    /// Constructs outside the supported fragment are kept as opaque atomic
    /// classes so they never introduce a contradiction of their own.
    #[must_use]
    pub fn from_triples(triples: &[Triple]) -> Self {
        let mut extractor = Extractor::new(triples);
        extractor.declarations();
        extractor.tbox();
        extractor.abox();
        extractor.kb.roles.close();
        debug!(
            axioms = extractor.kb.axioms.len(),
            individuals = extractor.kb.individuals.len(),
            gcis = extractor.kb.gcis.len(),
            "extracted knowledge base"
        );
        extractor.kb
    }
}

const CHARACTERISTICS: &[&str] = &[
    owl::FUNCTIONAL_PROPERTY,
    owl::INVERSE_FUNCTIONAL_PROPERTY,
    owl::TRANSITIVE_PROPERTY,
    owl::SYMMETRIC_PROPERTY,
    owl::ASYMMETRIC_PROPERTY,
    owl::REFLEXIVE_PROPERTY,
    owl::IRREFLEXIVE_PROPERTY,
];

const STRUCTURAL_PREDICATES: &[&str] = &[
    rdf::FIRST,
    rdf::REST,
    owl::ON_PROPERTY,
    owl::INTERSECTION_OF,
    owl::UNION_OF,
    owl::COMPLEMENT_OF,
    owl::ONE_OF,
    owl::INVERSE_OF,
    owl::ON_DATATYPE,
    owl::WITH_RESTRICTIONS,
    owl::DATATYPE_COMPLEMENT_OF,
    owl::MEMBERS,
    owl::DISTINCT_MEMBERS,
    SOURCE_INDIVIDUAL,
    ANNOTATED_SOURCE,
    xsd::MIN_INCLUSIVE,
    xsd::MAX_INCLUSIVE,
    xsd::MIN_EXCLUSIVE,
    xsd::MAX_EXCLUSIVE,
    xsd::PATTERN,
];

const SOURCE_INDIVIDUAL: &str = "http://www.w3.org/2002/07/owl#sourceIndividual";
const ASSERTION_PROPERTY: &str = "http://www.w3.org/2002/07/owl#assertionProperty";
const TARGET_INDIVIDUAL: &str = "http://www.w3.org/2002/07/owl#targetIndividual";
const TARGET_VALUE: &str = "http://www.w3.org/2002/07/owl#targetValue";
const ANNOTATED_SOURCE: &str = "http://www.w3.org/2002/07/owl#annotatedSource";
const ALL_DISJOINT_PROPERTIES: &str = "http://www.w3.org/2002/07/owl#AllDisjointProperties";
const NEGATIVE_PROPERTY_ASSERTION: &str =
    "http://www.w3.org/2002/07/owl#NegativePropertyAssertion";

struct Extractor<'w> {
    triples: &'w [Triple],
    kb: KnowledgeBase,
    subjects: HashMap<Term, Vec<(&'w str, &'w Term)>>,
    classes: HashSet<String>,
    object_properties: HashSet<String>,
    data_properties: HashSet<String>,
    annotation_properties: HashSet<String>,
    datatypes: HashSet<String>,
    literal_predicates: HashSet<&'w str>,
    structural: HashSet<Term>,
    known_individuals: HashSet<String>,
}

impl<'w> Extractor<'w> {
    fn new(triples: &'w [Triple]) -> Self {
        let mut subjects: HashMap<Term, Vec<(&'w str, &'w Term)>> = HashMap::new();
        for triple in triples {
            subjects
                .entry(Term::from(triple.subject.clone()))
                .or_default()
                .push((triple.predicate.as_str(), &triple.object));
        }
        Self {
            triples,
            kb: KnowledgeBase::default(),
            subjects,
            classes: HashSet::new(),
            object_properties: HashSet::new(),
            data_properties: HashSet::new(),
            annotation_properties: HashSet::new(),
            datatypes: HashSet::new(),
            literal_predicates: HashSet::new(),
            structural: HashSet::new(),
            known_individuals: HashSet::new(),
        }
    }

    fn object(&self, subject: &Term, predicate: &str) -> Option<&'w Term> {
        self.subjects.get(subject).and_then(|pairs| {
            pairs
                .iter()
                .find(|(candidate, _)| *candidate == predicate)
                .map(|(_, object)| *object)
        })
    }

    fn objects(&self, subject: &Term, predicate: &str) -> Vec<&'w Term> {
        self.subjects
            .get(subject)
            .map(|pairs| {
                pairs
                    .iter()
                    .filter(|(candidate, _)| *candidate == predicate)
                    .map(|(_, object)| *object)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn list(&self, head: &Term) -> Option<Vec<&'w Term>> {
        let mut members = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = head.clone();
        loop {
            if let Term::NamedNode(node) = &cursor {
                return (node.as_str() == rdf::NIL).then_some(members);
            }
            if !seen.insert(cursor.clone()) {
                return None;
            }
            members.push(self.object(&cursor, rdf::FIRST)?);
            cursor = self.object(&cursor, rdf::REST)?.clone();
        }
    }

    fn axiom(&mut self, text: String) -> AxiomId {
        self.kb.axioms.push(text);
        self.kb.axioms.len() - 1
    }

    fn declarations(&mut self) {
        let triples = self.triples;
        for triple in triples {
            let subject = Term::from(triple.subject.clone());
            let predicate = triple.predicate.as_str();
            if matches!(triple.object, Term::Literal(_)) {
                self.literal_predicates.insert(predicate);
            }
            if matches!(subject, Term::BlankNode(_)) && STRUCTURAL_PREDICATES.contains(&predicate) {
                self.structural.insert(subject.clone());
            }
            if predicate != rdf::TYPE {
                continue;
            }
            let Term::NamedNode(kind) = &triple.object else {
                continue;
            };
            let kind = kind.as_str();
            if matches!(subject, Term::BlankNode(_))
                && vocab::is_builtin(kind)
                && kind != owl::THING
                && kind != owl::NAMED_INDIVIDUAL
            {
                self.structural.insert(subject.clone());
            }
            let Term::NamedNode(name) = &subject else {
                continue;
            };
            let name = name.as_str().to_string();
            match kind {
                owl::CLASS | rdfs::CLASS => {
                    self.classes.insert(name);
                }
                owl::DATATYPE_PROPERTY => {
                    self.data_properties.insert(name);
                }
                owl::ANNOTATION_PROPERTY => {
                    self.annotation_properties.insert(name);
                }
                rdfs::DATATYPE => {
                    self.datatypes.insert(name);
                }
                owl::OBJECT_PROPERTY => {
                    self.object_properties.insert(name);
                }
                kind if CHARACTERISTICS.contains(&kind) && kind != owl::FUNCTIONAL_PROPERTY => {
                    self.object_properties.insert(name);
                }
                _ => {}
            }
        }
    }

    fn is_data_property(&self, name: &str) -> bool {
        self.data_properties.contains(name)
            || (!self.object_properties.contains(name) && self.literal_predicates.contains(name))
    }

    fn is_datatype(&self, term: &Term) -> bool {
        match term {
            Term::NamedNode(node) => {
                let iri = node.as_str();
                iri.starts_with(vocab::XSD_NS)
                    || iri == rdfs::LITERAL
                    || iri == rdf::LANG_STRING
                    || iri == rdf::PLAIN_LITERAL
                    || iri == owl::REAL
                    || iri == owl::RATIONAL
                    || self.datatypes.contains(iri)
            }
            Term::BlankNode(_) => self
                .objects(term, rdf::TYPE)
                .iter()
                .any(|kind| matches!(kind, Term::NamedNode(node) if node.as_str() == rdfs::DATATYPE)),
            Term::Literal(_) => false,
        }
    }

    fn role(&self, term: &Term) -> Option<Role> {
        match term {
            Term::NamedNode(node) => Some(Role::named(node.as_str())),
            Term::BlankNode(_) => match self.object(term, owl::INVERSE_OF)? {
                Term::NamedNode(node) => Some(Role::named(node.as_str()).inv()),
                _ => None,
            },
            Term::Literal(_) => None,
        }
    }

    fn class(&mut self, term: &Term) -> ConceptId {
        self.class_at(term, 0)
    }

    fn class_at(&mut self, term: &Term, depth: usize) -> ConceptId {
        match term {
            Term::NamedNode(node) => match node.as_str() {
                owl::THING | rdfs::CLASS => Concepts::TOP,
                owl::NOTHING => Concepts::BOTTOM,
                iri => self.kb.concepts.atom(iri),
            },
            Term::BlankNode(_) if depth < MAX_EXPRESSION_DEPTH => self
                .expression(term, depth + 1)
                .unwrap_or_else(|| self.opaque(term)),
            _ => self.opaque(term),
        }
    }

    fn opaque(&mut self, term: &Term) -> ConceptId {
        debug!(%term, "unsupported class expression kept opaque");
        self.kb.concepts.atom(&term.to_string())
    }

    fn classes_of(&mut self, head: &Term, depth: usize) -> Option<Vec<ConceptId>> {
        let members = self.list(head)?;
        Some(
            members
                .into_iter()
                .map(|member| self.class_at(member, depth))
                .collect(),
        )
    }

    /// Interprets the structural triples of `node` as a class expression.
    fn expression(&mut self, node: &Term, depth: usize) -> Option<ConceptId> {
        if let Some(head) = self.object(node, owl::INTERSECTION_OF) {
            let parts = self.classes_of(head, depth)?;
            return Some(self.kb.concepts.and(parts));
        }
        if let Some(head) = self.object(node, owl::UNION_OF) {
            let parts = self.classes_of(head, depth)?;
            return Some(self.kb.concepts.or(parts));
        }
        if let Some(operand) = self.object(node, owl::COMPLEMENT_OF) {
            let operand = self.class_at(operand, depth);
            return Some(self.kb.concepts.negate(operand));
        }
        if let Some(head) = self.object(node, owl::ONE_OF) {
            let names = self
                .list(head)?
                .into_iter()
                .filter_map(individual_name)
                .collect();
            return Some(self.kb.concepts.one_of(names));
        }
        if let Some(property) = self.object(node, owl::ON_PROPERTY) {
            return self.restriction(node, property, depth);
        }
        None
    }

    fn is_data_restriction(&self, node: &Term, role: &Role) -> bool {
        if role.inverse {
            return false;
        }
        if self.data_properties.contains(&role.name) {
            return true;
        }
        if self.object_properties.contains(&role.name) {
            return false;
        }
        self.object(node, owl::ON_DATA_RANGE).is_some()
            || matches!(self.object(node, owl::HAS_VALUE), Some(Term::Literal(_)))
            || [owl::SOME_VALUES_FROM, owl::ALL_VALUES_FROM]
                .iter()
                .filter_map(|predicate| self.object(node, predicate))
                .any(|filler| self.is_datatype(filler))
            || self.literal_predicates.contains(role.name.as_str())
    }

    fn restriction(&mut self, node: &Term, property: &Term, depth: usize) -> Option<ConceptId> {
        let role = self.role(property)?;
        let cardinality = |predicate: &str| {
            self.object(node, predicate).and_then(|value| match value {
                Term::Literal(literal) => literal.value().trim().parse::<u32>().ok(),
                _ => None,
            })
        };
        let min = cardinality(owl::MIN_CARDINALITY).or(cardinality(owl::MIN_QUALIFIED_CARDINALITY));
        let max = cardinality(owl::MAX_CARDINALITY).or(cardinality(owl::MAX_QUALIFIED_CARDINALITY));
        let exact = cardinality(owl::CARDINALITY).or(cardinality(owl::QUALIFIED_CARDINALITY));

        if self.is_data_restriction(node, &role) {
            let property = role.name;
            if let Some(filler) = self.object(node, owl::SOME_VALUES_FROM) {
                let range = self.data_range(filler, depth);
                return Some(self.kb.concepts.intern(Concept::DataSome(property, range)));
            }
            if let Some(filler) = self.object(node, owl::ALL_VALUES_FROM) {
                let range = self.data_range(filler, depth);
                return Some(self.kb.concepts.intern(Concept::DataAll(property, range)));
            }
            if let Some(Term::Literal(value)) = self.object(node, owl::HAS_VALUE) {
                let range = DataRange::OneOf(vec![LiteralKey::from_literal(value)]);
                return Some(self.kb.concepts.intern(Concept::DataSome(property, range)));
            }
            let range = match self.object(node, owl::ON_DATA_RANGE) {
                Some(filler) => self.data_range(filler, depth),
                None => DataRange::Any,
            };
            let concepts = &mut self.kb.concepts;
            return match (min, max, exact) {
                (_, _, Some(count)) => {
                    let at_least = concepts.data_at_least(count, property.clone(), range.clone());
                    let at_most = concepts.intern(Concept::DataAtMost(count, property, range));
                    Some(concepts.and(vec![at_least, at_most]))
                }
                (Some(count), _, _) => Some(concepts.data_at_least(count, property, range)),
                (_, Some(count), _) => {
                    Some(concepts.intern(Concept::DataAtMost(count, property, range)))
                }
                _ => None,
            };
        }

        if let Some(filler) = self.object(node, owl::SOME_VALUES_FROM) {
            let filler = self.class_at(filler, depth);
            return Some(self.kb.concepts.intern(Concept::Some(role, filler)));
        }
        if let Some(filler) = self.object(node, owl::ALL_VALUES_FROM) {
            let filler = self.class_at(filler, depth);
            return Some(self.kb.concepts.intern(Concept::All(role, filler)));
        }
        if let Some(value) = self.object(node, owl::HAS_VALUE).and_then(individual_name) {
            let filler = self.kb.concepts.one_of(vec![value]);
            return Some(self.kb.concepts.intern(Concept::Some(role, filler)));
        }
        if self.object(node, owl::HAS_SELF).is_some() {
            return Some(self.kb.concepts.intern(Concept::HasSelf(role)));
        }
        let filler = match self.object(node, owl::ON_CLASS) {
            Some(filler) => self.class_at(filler, depth),
            None => Concepts::TOP,
        };
        let concepts = &mut self.kb.concepts;
        match (min, max, exact) {
            (_, _, Some(count)) => {
                let at_least = concepts.at_least(count, role.clone(), filler);
                let at_most = concepts.intern(Concept::AtMost(count, role, filler));
                Some(concepts.and(vec![at_least, at_most]))
            }
            (Some(count), _, _) => Some(concepts.at_least(count, role, filler)),
            (_, Some(count), _) => Some(concepts.intern(Concept::AtMost(count, role, filler))),
            _ => None,
        }
    }

    fn data_range(&self, term: &Term, depth: usize) -> DataRange {
        match term {
            Term::NamedNode(node) if node.as_str() == rdfs::LITERAL => DataRange::Any,
            Term::NamedNode(node) => DataRange::Datatype(node.as_str().to_string()),
            Term::BlankNode(_) if depth < MAX_EXPRESSION_DEPTH => {
                self.data_expression(term, depth + 1).unwrap_or(DataRange::Any)
            }
            _ => DataRange::Any,
        }
    }

    fn data_expression(&self, node: &Term, depth: usize) -> Option<DataRange> {
        if let Some(base) = self.object(node, owl::ON_DATATYPE) {
            let Term::NamedNode(base) = base else {
                return None;
            };
            let mut facets = Vec::new();
            if let Some(head) = self.object(node, owl::WITH_RESTRICTIONS) {
                for facet in self.list(head)? {
                    let pairs = self.subjects.get(facet).cloned().unwrap_or_default();
                    for (predicate, value) in pairs {
                        if let Term::Literal(value) = value {
                            facets.push((predicate.to_string(), LiteralKey::from_literal(value)));
                        }
                    }
                }
            }
            return Some(DataRange::Restricted {
                base: base.as_str().to_string(),
                facets,
            });
        }
        if let Some(head) = self.object(node, owl::ONE_OF) {
            let values = self
                .list(head)?
                .into_iter()
                .filter_map(|member| match member {
                    Term::Literal(literal) => Some(LiteralKey::from_literal(literal)),
                    _ => None,
                })
                .collect();
            return Some(DataRange::OneOf(values));
        }
        if let Some(operand) = self.object(node, owl::DATATYPE_COMPLEMENT_OF) {
            return Some(self.data_range(operand, depth).negate());
        }
        for (predicate, conjunctive) in [(owl::INTERSECTION_OF, true), (owl::UNION_OF, false)] {
            if let Some(head) = self.object(node, predicate) {
                let parts = self
                    .list(head)?
                    .into_iter()
                    .map(|member| self.data_range(member, depth))
                    .collect();
                return Some(if conjunctive {
                    DataRange::And(parts)
                } else {
                    DataRange::Or(parts)
                });
            }
        }
        None
    }

    /// Records `sub SubClassOf sup`, absorbing it when possible.
    fn subsumption(&mut self, sub: ConceptId, sup: ConceptId, axiom: AxiomId) {
        match self.kb.concepts.get(sub).clone() {
            Concept::Bottom => {}
            Concept::Top => self.kb.gcis.push((sup, axiom)),
            Concept::Atom(name) => self.kb.unfold.entry(name).or_default().push((sup, axiom)),
            Concept::Or(parts) => {
                for part in parts {
                    self.subsumption(part, sup, axiom);
                }
            }
            Concept::OneOf(names) => {
                for name in names {
                    self.individual(&name);
                    self.kb.class_assertions.push((name, sup, axiom));
                }
            }
            Concept::Some(role, filler) if filler == Concepts::TOP => {
                self.kb.domains.push((role, sup, axiom));
            }
            Concept::DataSome(property, DataRange::Any) => {
                self.kb.data_domains.push((property, sup, axiom));
            }
            Concept::And(parts) => {
                let atom = parts
                    .iter()
                    .copied()
                    .find(|part| matches!(self.kb.concepts.get(*part), Concept::Atom(_)));
                match atom {
                    Some(atom) => {
                        let rest: Vec<ConceptId> =
                            parts.into_iter().filter(|part| *part != atom).collect();
                        let rest = self.kb.concepts.and(rest);
                        let not_rest = self.kb.concepts.negate(rest);
                        let absorbed = self.kb.concepts.or(vec![not_rest, sup]);
                        self.subsumption(atom, absorbed, axiom);
                    }
                    None => self.internalize(sub, sup, axiom),
                }
            }
            _ => self.internalize(sub, sup, axiom),
        }
    }

    fn internalize(&mut self, sub: ConceptId, sup: ConceptId, axiom: AxiomId) {
        let not_sub = self.kb.concepts.negate(sub);
        let gci = self.kb.concepts.or(vec![not_sub, sup]);
        self.kb.gcis.push((gci, axiom));
    }

    fn equivalence(&mut self, left: ConceptId, right: ConceptId, axiom: AxiomId) {
        self.subsumption(left, right, axiom);
        self.subsumption(right, left, axiom);
    }

    fn disjoint(&mut self, left: ConceptId, right: ConceptId, axiom: AxiomId) {
        let both = self.kb.concepts.and(vec![left, right]);
        self.subsumption(both, Concepts::BOTTOM, axiom);
    }

    fn render(&self, id: ConceptId) -> String {
        self.kb.concepts.render(id)
    }

    fn tbox(&mut self) {
        let triples = self.triples;
        for triple in triples {
            let subject = Term::from(triple.subject.clone());
            let object = &triple.object;
            match triple.predicate.as_str() {
                rdfs::SUB_CLASS_OF => {
                    let (sub, sup) = (self.class(&subject), self.class(object));
                    let axiom =
                        self.axiom(format!("{} SubClassOf {}", self.render(sub), self.render(sup)));
                    self.subsumption(sub, sup, axiom);
                }
                owl::EQUIVALENT_CLASS => {
                    let (left, right) = (self.class(&subject), self.class(object));
                    let axiom = self.axiom(format!(
                        "{} EquivalentTo {}",
                        self.render(left),
                        self.render(right)
                    ));
                    self.equivalence(left, right, axiom);
                }
                owl::DISJOINT_WITH => {
                    let (left, right) = (self.class(&subject), self.class(object));
                    let axiom = self.axiom(format!(
                        "{} DisjointWith {}",
                        self.render(left),
                        self.render(right)
                    ));
                    self.disjoint(left, right, axiom);
                }
                owl::DISJOINT_UNION_OF => self.disjoint_union(&subject, object),
                owl::COMPLEMENT_OF | owl::INTERSECTION_OF | owl::UNION_OF | owl::ONE_OF
                    if matches!(subject, Term::NamedNode(_)) =>
                {
                    self.named_expression(&subject);
                }
                rdfs::SUB_PROPERTY_OF => {
                    if let (Some(sub), Some(sup)) = (self.role(&subject), self.role(object)) {
                        let axiom = self.axiom(format!("{sub} SubPropertyOf {sup}"));
                        self.kb.roles.add_sub(sub, sup, axiom);
                    }
                }
                owl::EQUIVALENT_PROPERTY => {
                    if let (Some(left), Some(right)) = (self.role(&subject), self.role(object)) {
                        let axiom = self.axiom(format!("{left} EquivalentTo {right}"));
                        self.kb.roles.add_sub(left.clone(), right.clone(), axiom);
                        self.kb.roles.add_sub(right, left, axiom);
                    }
                }
                owl::INVERSE_OF if matches!(subject, Term::NamedNode(_)) => {
                    if let (Some(left), Some(right)) = (self.role(&subject), self.role(object)) {
                        let axiom = self.axiom(format!("{left} InverseOf {right}"));
                        self.kb.roles.add_sub(left.clone(), right.inv(), axiom);
                        self.kb.roles.add_sub(right.inv(), left, axiom);
                    }
                }
                owl::PROPERTY_DISJOINT_WITH => {
                    if let (Some(left), Some(right)) = (self.role(&subject), self.role(object)) {
                        let axiom = self.axiom(format!("{left} DisjointWith {right}"));
                        self.kb.roles.disjoint.push((left, right, axiom));
                    }
                }
                rdfs::DOMAIN => self.domain(&subject, object),
                rdfs::RANGE => self.range(&subject, object),
                rdf::TYPE => self.typed(&subject, object),
                predicate @ (owl::IMPORTS | "http://www.w3.org/2002/07/owl#hasKey"
                | "http://www.w3.org/2002/07/owl#propertyChainAxiom") => {
                    debug!(predicate, "axiom not used for consistency checking");
                }
                _ => {}
            }
        }
    }

    fn named_expression(&mut self, subject: &Term) {
        let Term::NamedNode(name) = subject else {
            return;
        };
        if self.datatypes.contains(name.as_str()) {
            return;
        }
        if let Some(expression) = self.expression(subject, 1) {
            let atom = self.kb.concepts.atom(name.as_str());
            let axiom = self.axiom(format!(
                "{} EquivalentTo {}",
                self.render(atom),
                self.render(expression)
            ));
            self.equivalence(atom, expression, axiom);
        }
    }

    fn disjoint_union(&mut self, subject: &Term, head: &Term) {
        let Some(members) = self.classes_of(head, 1) else {
            return;
        };
        let whole = self.class(subject);
        let union = self.kb.concepts.or(members.clone());
        let axiom = self.axiom(format!(
            "{} DisjointUnionOf {}",
            self.render(whole),
            members
                .iter()
                .map(|member| self.render(*member))
                .collect::<Vec<_>>()
                .join(", ")
        ));
        self.equivalence(whole, union, axiom);
        self.pairwise_disjoint(&members, axiom);
    }

    fn pairwise_disjoint(&mut self, members: &[ConceptId], axiom: AxiomId) {
        for (position, left) in members.iter().enumerate() {
            for right in &members[position + 1..] {
                self.disjoint(*left, *right, axiom);
            }
        }
    }

    fn domain(&mut self, subject: &Term, object: &Term) {
        let Some(role) = self.role(subject) else {
            return;
        };
        let class = self.class(object);
        let axiom = self.axiom(format!("{role} Domain {}", self.render(class)));
        if !role.inverse && self.is_data_property(&role.name) {
            self.kb.data_domains.push((role.name, class, axiom));
        } else {
            self.kb.domains.push((role, class, axiom));
        }
    }

    fn range(&mut self, subject: &Term, object: &Term) {
        let Some(role) = self.role(subject) else {
            return;
        };
        if !role.inverse && (self.is_data_property(&role.name) || self.is_datatype(object)) {
            let range = self.data_range(object, 0);
            let axiom = self.axiom(format!("{role} Range {range}"));
            let concept = self.kb.concepts.intern(Concept::DataAll(role.name, range));
            self.kb.gcis.push((concept, axiom));
        } else {
            let class = self.class(object);
            let axiom = self.axiom(format!("{role} Range {}", self.render(class)));
            let concept = self.kb.concepts.intern(Concept::All(role, class));
            self.kb.gcis.push((concept, axiom));
        }
    }

    fn typed(&mut self, subject: &Term, object: &Term) {
        let Term::NamedNode(kind) = object else {
            return;
        };
        let Term::NamedNode(property) = subject else {
            self.typed_blank(subject, kind.as_str());
            return;
        };
        let name = property.as_str();
        let role = Role::named(name);
        match kind.as_str() {
            owl::FUNCTIONAL_PROPERTY => {
                let axiom = self.axiom(format!("Functional {role}"));
                let concept = if self.is_data_property(name) {
                    self.kb
                        .concepts
                        .intern(Concept::DataAtMost(1, name.to_string(), DataRange::Any))
                } else {
                    self.kb
                        .concepts
                        .intern(Concept::AtMost(1, role, Concepts::TOP))
                };
                self.kb.gcis.push((concept, axiom));
            }
            owl::INVERSE_FUNCTIONAL_PROPERTY => {
                let concept = self
                    .kb
                    .concepts
                    .intern(Concept::AtMost(1, role.inv(), Concepts::TOP));
                let axiom = self.axiom(format!("InverseFunctional {role}"));
                self.kb.gcis.push((concept, axiom));
            }
            owl::TRANSITIVE_PROPERTY => {
                let axiom = self.axiom(format!("Transitive {role}"));
                self.kb.roles.add_transitive(name, axiom);
            }
            owl::SYMMETRIC_PROPERTY => {
                let axiom = self.axiom(format!("Symmetric {role}"));
                self.kb.roles.add_sub(role.clone(), role.inv(), axiom);
            }
            owl::ASYMMETRIC_PROPERTY => {
                let axiom = self.axiom(format!("Asymmetric {role}"));
                self.kb.roles.asymmetric.push((name.to_string(), axiom));
            }
            owl::REFLEXIVE_PROPERTY => {
                let concept = self.kb.concepts.intern(Concept::HasSelf(role.clone()));
                let axiom = self.axiom(format!("Reflexive {role}"));
                self.kb.gcis.push((concept, axiom));
            }
            owl::IRREFLEXIVE_PROPERTY => {
                let concept = self.kb.concepts.intern(Concept::NotHasSelf(role.clone()));
                let axiom = self.axiom(format!("Irreflexive {role}"));
                self.kb.gcis.push((concept, axiom));
            }
            _ => {}
        }
    }

    fn typed_blank(&mut self, subject: &Term, kind: &str) {
        match kind {
            owl::ALL_DISJOINT_CLASSES => {
                let Some(head) = self.object(subject, owl::MEMBERS) else {
                    return;
                };
                let Some(members) = self.classes_of(head, 1) else {
                    return;
                };
                let axiom = self.axiom(format!(
                    "DisjointClasses {}",
                    members
                        .iter()
                        .map(|member| self.render(*member))
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
                self.pairwise_disjoint(&members, axiom);
            }
            ALL_DISJOINT_PROPERTIES => {
                let Some(head) = self.object(subject, owl::MEMBERS) else {
                    return;
                };
                let roles: Vec<Role> = self
                    .list(head)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|member| self.role(member))
                    .collect();
                let axiom = self.axiom(format!("DisjointProperties {}", join(&roles, ", ")));
                for (position, left) in roles.iter().enumerate() {
                    for right in &roles[position + 1..] {
                        self.kb.roles.disjoint.push((left.clone(), right.clone(), axiom));
                    }
                }
            }
            owl::ALL_DIFFERENT => {
                let head = self
                    .object(subject, owl::DISTINCT_MEMBERS)
                    .or_else(|| self.object(subject, owl::MEMBERS));
                let Some(head) = head else {
                    return;
                };
                let names: Vec<String> = self
                    .list(head)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(individual_name)
                    .collect();
                let axiom = self.axiom(format!("DifferentIndividuals {}", short_names(&names)));
                for name in &names {
                    self.individual(name);
                }
                for (position, left) in names.iter().enumerate() {
                    for right in &names[position + 1..] {
                        self.kb.different.push((left.clone(), right.clone(), axiom));
                    }
                }
            }
            NEGATIVE_PROPERTY_ASSERTION => self.negative_assertion(subject),
            _ => {}
        }
    }

    fn negative_assertion(&mut self, subject: &Term) {
        let source = self.object(subject, SOURCE_INDIVIDUAL).and_then(individual_name);
        let property = self.object(subject, ASSERTION_PROPERTY).and_then(|term| self.role(term));
        let (Some(source), Some(role)) = (source, property) else {
            return;
        };
        self.individual(&source);
        if let Some(target) = self.object(subject, TARGET_INDIVIDUAL).and_then(individual_name) {
            let axiom = self.axiom(format!(
                "not {} {role} {}",
                short(&source),
                short(&target)
            ));
            self.individual(&target);
            self.kb
                .negative_role_assertions
                .push((source, role, target, axiom));
        } else if let Some(Term::Literal(value)) = self.object(subject, TARGET_VALUE) {
            let value = LiteralKey::from_literal(value);
            let axiom = self.axiom(format!("not {} {role} {value}", short(&source)));
            self.kb
                .negative_data_assertions
                .push((source, role.name, value, axiom));
        }
    }

    fn individual(&mut self, name: &str) {
        if self.known_individuals.insert(name.to_string()) {
            self.kb.individuals.push(name.to_string());
        }
    }

    fn abox(&mut self) {
        let triples = self.triples;
        for triple in triples {
            let subject = Term::from(triple.subject.clone());
            if self.structural.contains(&subject) {
                continue;
            }
            let Some(name) = individual_name(&subject) else {
                continue;
            };
            let predicate = triple.predicate.as_str();
            let object = &triple.object;
            match predicate {
                rdf::TYPE => {
                    let Term::NamedNode(kind) = object else {
                        if !self.structural.contains(object) {
                            continue;
                        }
                        self.individual(&name);
                        let class = self.class(object);
                        let axiom = self.axiom(format!("{} Type {}", short(&name), self.render(class)));
                        self.kb.class_assertions.push((name, class, axiom));
                        continue;
                    };
                    let kind = kind.as_str();
                    if kind == owl::NAMED_INDIVIDUAL || kind == owl::THING {
                        self.individual(&name);
                    } else if !vocab::is_builtin(kind) {
                        self.individual(&name);
                        let class = self.kb.concepts.atom(kind);
                        let axiom = self.axiom(format!("{} Type {}", short(&name), short(kind)));
                        self.kb.class_assertions.push((name, class, axiom));
                    }
                }
                owl::SAME_AS | owl::DIFFERENT_FROM => {
                    let Some(other) = individual_name(object) else {
                        continue;
                    };
                    self.individual(&name);
                    self.individual(&other);
                    if predicate == owl::SAME_AS {
                        let axiom = self.axiom(format!("{} SameAs {}", short(&name), short(&other)));
                        self.kb.same.push((name, other, axiom));
                    } else {
                        let axiom =
                            self.axiom(format!("{} DifferentFrom {}", short(&name), short(&other)));
                        self.kb.different.push((name, other, axiom));
                    }
                }
                predicate
                    if vocab::is_builtin(predicate)
                        || vocab::is_annotation(predicate)
                        || self.annotation_properties.contains(predicate) => {}
                predicate => match object {
                    Term::Literal(value) => {
                        self.individual(&name);
                        let value = LiteralKey::from_literal(value);
                        let axiom =
                            self.axiom(format!("{} {} {value}", short(&name), short(predicate)));
                        self.kb
                            .data_assertions
                            .push((name, predicate.to_string(), value, axiom));
                    }
                    other => {
                        if self.structural.contains(other) {
                            continue;
                        }
                        let Some(target) = individual_name(other) else {
                            continue;
                        };
                        self.individual(&name);
                        self.individual(&target);
                        let axiom = self.axiom(format!(
                            "{} {} {}",
                            short(&name),
                            short(predicate),
                            short(&target)
                        ));
                        self.kb.role_assertions.push((
                            name,
                            predicate.to_string(),
                            target,
                            axiom,
                        ));
                    }
                },
            }
        }
    }
}

fn individual_name(term: &Term) -> Option<String> {
    match term {
        Term::NamedNode(node) => Some(node.as_str().to_string()),
        Term::BlankNode(node) => Some(format!("_:{}", node.as_str())),
        Term::Literal(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use oxrdf::{BlankNode, NamedNode};

    use super::*;

    fn iri(text: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("https://example.org/{text}"))
    }

    fn vocab_node(text: &str) -> NamedNode {
        NamedNode::new_unchecked(text)
    }

    #[test]
    fn negation_is_in_normal_form() {
        let mut concepts = Concepts::default();
        let a = concepts.atom("A");
        let b = concepts.atom("B");
        let some = concepts.intern(Concept::Some(Role::named("r"), b));
        let conjunction = concepts.and(vec![a, some]);
        let negated = concepts.negate(conjunction);
        assert_eq!(concepts.render(negated), "(not A or (r only not B))");
        assert_eq!(concepts.negate(negated), conjunction);
    }

    #[test]
    fn conjunctions_flatten_and_simplify() {
        let mut concepts = Concepts::default();
        let a = concepts.atom("A");
        let b = concepts.atom("B");
        let inner = concepts.and(vec![a, b]);
        assert_eq!(concepts.and(vec![inner, a, Concepts::TOP]), inner);
        assert_eq!(concepts.and(vec![a, Concepts::BOTTOM]), Concepts::BOTTOM);
        assert_eq!(concepts.or(vec![a, Concepts::TOP]), Concepts::TOP);
    }

    #[test]
    fn complement_equivalence_becomes_a_general_inclusion() {
        let node = BlankNode::new_unchecked("c");
        let triples = vec![
            Triple::new(iri("A"), vocab_node(rdf::TYPE), vocab_node(owl::CLASS)),
            Triple::new(iri("A"), vocab_node(owl::EQUIVALENT_CLASS), node.clone()),
            Triple::new(node, vocab_node(owl::COMPLEMENT_OF), iri("A")),
        ];
        let kb = KnowledgeBase::from_triples(&triples);
        assert_eq!(kb.axioms, vec!["A EquivalentTo not A".to_string()]);
        assert_eq!(kb.gcis.len(), 1);
        assert!(kb.unfold.contains_key("https://example.org/A"));
        assert!(kb.individuals.is_empty());
    }

    #[test]
    fn separates_assertions_from_declarations() {
        let age = iri("age");
        let triples = vec![
            Triple::new(iri("Person"), vocab_node(rdf::TYPE), vocab_node(owl::CLASS)),
            Triple::new(age.clone(), vocab_node(rdf::TYPE), vocab_node(owl::DATATYPE_PROPERTY)),
            Triple::new(age.clone(), vocab_node(rdf::TYPE), vocab_node(owl::FUNCTIONAL_PROPERTY)),
            Triple::new(iri("p1"), vocab_node(rdf::TYPE), iri("Person")),
            Triple::new(iri("p1"), vocab_node(rdfs::LABEL), Literal::new_simple_literal("Clark")),
            Triple::new(
                iri("p1"),
                age,
                Literal::new_typed_literal("30", vocab_node(xsd::INTEGER)),
            ),
            Triple::new(iri("p1"), iri("knows"), iri("p2")),
        ];
        let kb = KnowledgeBase::from_triples(&triples);
        assert_eq!(
            kb.individuals,
            vec![
                "https://example.org/p1".to_string(),
                "https://example.org/p2".to_string()
            ]
        );
        assert_eq!(kb.class_assertions.len(), 1);
        assert_eq!(kb.data_assertions.len(), 1);
        assert_eq!(kb.role_assertions.len(), 1);
        assert!(matches!(
            kb.concepts.get(kb.gcis[0].0),
            Concept::DataAtMost(1, _, DataRange::Any)
        ));
        assert!(kb.axioms.contains(&"p1 age 30".to_string()));
    }

    #[test]
    fn role_hierarchy_is_closed_with_inverses() {
        let mut roles = RoleBox::default();
        roles.add_sub(Role::named("hasMother"), Role::named("hasParent"), 0);
        roles.add_sub(Role::named("hasParent"), Role::named("hasAncestor"), 1);
        roles.close();
        assert_eq!(
            roles.subsumes(&Role::named("hasMother"), &Role::named("hasAncestor")),
            Some(BTreeSet::from([0, 1]))
        );
        assert!(roles
            .subsumes(&Role::named("hasMother").inv(), &Role::named("hasAncestor").inv())
            .is_some());
        assert!(roles
            .subsumes(&Role::named("hasAncestor"), &Role::named("hasMother"))
            .is_none());
    }
}

//! Tableau procedure deciding whether a [`KnowledgeBase`] has a model.
//!
//! The completion graph starts from the named individuals (or one anonymous
//! node for an empty ABox) and is expanded by deterministic rules first, then
//! generating rules, then non-deterministic choices. Choices are explored
//! depth first on copies of the graph. Every label entry carries the axioms it
//! was derived from so a clash can be explained.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    fmt,
    rc::Rc,
};

use tracing::{debug, trace};

use super::{
    axioms::{short, AxiomId, Concept, ConceptId, Concepts, DataRange, KnowledgeBase, LiteralKey, Role},
    datatypes, ReasonerError,
};
use crate::ontology::literals;

type Deps = Rc<BTreeSet<AxiomId>>;

fn deps_of(axioms: impl IntoIterator<Item = AxiomId>) -> Deps {
    Rc::new(axioms.into_iter().collect())
}

fn union(left: &Deps, right: &Deps) -> Deps {
    if right.is_subset(left) {
        Rc::clone(left)
    } else if left.is_subset(right) {
        Rc::clone(right)
    } else {
        Rc::new(left.union(right).copied().collect())
    }
}

fn extend(left: &Deps, axioms: &BTreeSet<AxiomId>) -> Deps {
    if axioms.is_subset(left) {
        Rc::clone(left)
    } else {
        Rc::new(left.union(axioms).copied().collect())
    }
}

/// Limits on the size of the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Budget {
    /// Anonymous nodes the expansion rules may create.
    pub max_nodes: usize,
    pub max_branches: usize,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            max_branches: 10_000,
        }
    }
}

/// Why the knowledge base has no model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Explanation {
    pub clashes: Vec<String>,
    pub axioms: Vec<String>,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for clash in &self.clashes {
            writeln!(f, "Clash: {clash}")?;
        }
        if !self.axioms.is_empty() {
            f.write_str("Axioms involved:")?;
            for axiom in &self.axioms {
                write!(f, "\n  - {axiom}")?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Consistent,
    Inconsistent(Explanation),
}

#[derive(Clone, Debug)]
struct Node {
    label: BTreeMap<ConceptId, Deps>,
    names: BTreeSet<String>,
    parent: Option<usize>,
    merged: Option<(usize, Deps)>,
    edges: Vec<usize>,
    data: Vec<usize>,
}

impl Node {
    fn new(parent: Option<usize>) -> Self {
        Self {
            label: BTreeMap::new(),
            names: BTreeSet::new(),
            parent,
            merged: None,
            edges: Vec::new(),
            data: Vec::new(),
        }
    }

    fn is_named(&self) -> bool {
        !self.names.is_empty()
    }
}

#[derive(Clone, Debug)]
struct Edge {
    from: usize,
    to: usize,
    role: String,
    deps: Deps,
}

#[derive(Clone, Debug)]
struct DataNode {
    property: String,
    literal: Option<LiteralKey>,
    ranges: Vec<(DataRange, Deps)>,
    deps: Deps,
    merged: Option<usize>,
}

impl DataNode {
    fn has_range(&self, range: &DataRange) -> bool {
        self.ranges.iter().any(|(candidate, _)| candidate == range)
    }
}

#[derive(Clone, Debug, Default)]
struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    data: Vec<DataNode>,
    different: Vec<(usize, usize, Deps)>,
    data_different: Vec<(usize, usize, Deps)>,
    names: HashMap<String, usize>,
    applied: HashSet<(usize, ConceptId)>,
}

impl Graph {
    fn find(&self, mut node: usize) -> usize {
        while let Some((target, _)) = &self.nodes[node].merged {
            node = *target;
        }
        node
    }

    fn find_with_deps(&self, mut node: usize) -> (usize, Deps) {
        let mut deps = Deps::default();
        while let Some((target, merge)) = &self.nodes[node].merged {
            deps = union(&deps, merge);
            node = *target;
        }
        (node, deps)
    }

    fn find_data(&self, mut node: usize) -> usize {
        while let Some(target) = self.data[node].merged {
            node = target;
        }
        node
    }

    fn add_node(&mut self, parent: Option<usize>) -> usize {
        self.nodes.push(Node::new(parent));
        self.nodes.len() - 1
    }

    /// Nodes introduced by expansion rules; named individuals are free.
    fn generated(&self) -> usize {
        self.nodes.len().saturating_sub(self.names.len())
    }

    fn named(&mut self, name: &str) -> usize {
        if let Some(node) = self.names.get(name) {
            return self.find(*node);
        }
        let node = self.add_node(None);
        self.nodes[node].names.insert(name.to_string());
        self.names.insert(name.to_string(), node);
        node
    }

    fn add(&mut self, node: usize, concept: ConceptId, deps: Deps) -> bool {
        let node = self.find(node);
        if concept == Concepts::TOP || self.nodes[node].label.contains_key(&concept) {
            return false;
        }
        self.nodes[node].label.insert(concept, deps);
        true
    }

    fn has(&self, node: usize, concept: ConceptId) -> bool {
        concept == Concepts::TOP || self.nodes[node].label.contains_key(&concept)
    }

    fn add_edge(&mut self, from: usize, to: usize, role: &Role, deps: Deps) -> bool {
        let (from, to) = if role.inverse { (to, from) } else { (from, to) };
        let (from, to) = (self.find(from), self.find(to));
        let exists = self.nodes[from].edges.iter().any(|edge| {
            let edge = &self.edges[*edge];
            edge.role == role.name && self.find(edge.from) == from && self.find(edge.to) == to
        });
        if exists {
            return false;
        }
        let id = self.edges.len();
        self.edges.push(Edge {
            from,
            to,
            role: role.name.clone(),
            deps,
        });
        self.nodes[from].edges.push(id);
        if to != from {
            self.nodes[to].edges.push(id);
        }
        true
    }

    fn add_data(&mut self, owner: usize, property: &str, literal: Option<LiteralKey>, deps: Deps) -> usize {
        let owner = self.find(owner);
        let id = self.data.len();
        self.data.push(DataNode {
            property: property.to_string(),
            literal,
            ranges: Vec::new(),
            deps,
            merged: None,
        });
        self.nodes[owner].data.push(id);
        id
    }

    fn neighbors(&self, node: usize, role: &Role, kb: &KnowledgeBase) -> Vec<(usize, Deps)> {
        let node = self.find(node);
        let mut found: Vec<(usize, Deps)> = Vec::new();
        for edge in &self.nodes[node].edges {
            let edge = &self.edges[*edge];
            let (from, to) = (self.find(edge.from), self.find(edge.to));
            let mut candidates = Vec::with_capacity(2);
            if from == node {
                if let Some(axioms) = kb.roles.subsumes(&Role::named(edge.role.as_str()), role) {
                    candidates.push((to, axioms));
                }
            }
            if to == node {
                if let Some(axioms) = kb.roles.subsumes(&Role::named(edge.role.as_str()).inv(), role) {
                    candidates.push((from, axioms));
                }
            }
            for (neighbor, axioms) in candidates {
                if !found.iter().any(|(seen, _)| *seen == neighbor) {
                    found.push((neighbor, extend(&edge.deps, &axioms)));
                }
            }
        }
        found
    }

    fn data_successors(&self, node: usize, property: &str, kb: &KnowledgeBase) -> Vec<(usize, Deps)> {
        let node = self.find(node);
        let target = Role::named(property);
        let mut found: Vec<(usize, Deps)> = Vec::new();
        for data in &self.nodes[node].data {
            let data = self.find_data(*data);
            if found.iter().any(|(seen, _)| *seen == data) {
                continue;
            }
            let value = &self.data[data];
            if let Some(axioms) = kb.roles.subsumes(&Role::named(value.property.as_str()), &target) {
                found.push((data, extend(&value.deps, &axioms)));
            }
        }
        found
    }

    fn are_different(&self, left: usize, right: usize) -> Option<Deps> {
        let (left, right) = (self.find(left), self.find(right));
        self.different.iter().find_map(|(a, b, deps)| {
            let (a, b) = (self.find(*a), self.find(*b));
            ((a == left && b == right) || (a == right && b == left)).then(|| Rc::clone(deps))
        })
    }

    fn data_are_different(&self, left: usize, right: usize) -> bool {
        let (left, right) = (self.find_data(left), self.find_data(right));
        if let (Some(a), Some(b)) = (&self.data[left].literal, &self.data[right].literal) {
            if let (Ok(a), Ok(b)) = (a.value(), b.value()) {
                return !a.same_value(&b);
            }
        }
        self.data_different.iter().any(|(a, b, _)| {
            let (a, b) = (self.find_data(*a), self.find_data(*b));
            (a == left && b == right) || (a == right && b == left)
        })
    }

    /// Merges `from` into `into`.
    fn merge(&mut self, from: usize, into: usize, deps: &Deps) {
        let (from, into) = (self.find(from), self.find(into));
        if from == into {
            return;
        }
        let moved = std::mem::take(&mut self.nodes[from].label);
        for (concept, concept_deps) in moved {
            self.add(into, concept, union(&concept_deps, deps));
        }
        let names = std::mem::take(&mut self.nodes[from].names);
        for name in &names {
            self.names.insert(name.clone(), into);
        }
        self.nodes[into].names.extend(names);
        let edges = std::mem::take(&mut self.nodes[from].edges);
        for edge in &edges {
            self.edges[*edge].deps = union(&self.edges[*edge].deps, deps);
        }
        self.nodes[into].edges.extend(edges);
        let data = std::mem::take(&mut self.nodes[from].data);
        for value in &data {
            self.data[*value].deps = union(&self.data[*value].deps, deps);
        }
        self.nodes[into].data.extend(data);
        self.nodes[from].merged = Some((into, Rc::clone(deps)));
    }

    fn merge_data(&mut self, from: usize, into: usize, deps: &Deps) {
        let (from, into) = (self.find_data(from), self.find_data(into));
        if from == into {
            return;
        }
        let ranges = std::mem::take(&mut self.data[from].ranges);
        let literal = self.data[from].literal.take();
        let from_deps = union(&self.data[from].deps, deps);
        let target = &mut self.data[into];
        for (range, range_deps) in ranges {
            if !target.ranges.iter().any(|(candidate, _)| *candidate == range) {
                target.ranges.push((range, union(&range_deps, deps)));
            }
        }
        if target.literal.is_none() {
            target.literal = literal;
        }
        target.deps = union(&target.deps, &from_deps);
        self.data[from].merged = Some(into);
    }

    fn active(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|node| self.nodes[*node].merged.is_none())
    }
}

#[derive(Clone, Debug)]
struct Clash {
    reasons: Vec<String>,
    deps: Deps,
}

impl Clash {
    fn new(reason: String, deps: Deps) -> Self {
        Self {
            reasons: vec![reason],
            deps,
        }
    }

    fn absorb(&mut self, other: Self) {
        for reason in other.reasons {
            if !self.reasons.contains(&reason) && self.reasons.len() < 5 {
                self.reasons.push(reason);
            }
        }
        self.deps = union(&self.deps, &other.deps);
    }
}

#[derive(Clone, Debug)]
enum Alternative {
    Add(usize, ConceptId, Deps),
    Merge { from: usize, into: usize, deps: Deps },
    AddRange(usize, DataRange, Deps),
    MergeData { from: usize, into: usize, deps: Deps },
}

#[derive(Debug)]
struct Choice {
    alternatives: Vec<Alternative>,
}

enum Step {
    Clash(Clash),
    Branch(Choice),
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Block {
    Open,
    Direct,
    Indirect,
}

struct Frame {
    graph: Graph,
    pending: std::vec::IntoIter<Alternative>,
    clash: Option<Clash>,
}

/// Consistency checker over one knowledge base.
pub struct Tableau {
    kb: KnowledgeBase,
    budget: Budget,
    branches: usize,
}

impl Tableau {
    #[must_use]
    pub fn new(kb: KnowledgeBase, budget: Budget) -> Self {
        Self {
            kb,
            budget,
            branches: 0,
        }
    }

    /// Decides consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ReasonerError::BudgetExceeded`] when the completion graph or
    /// the number of explored branches outgrows the budget.
    pub fn check(mut self) -> Result<Outcome, ReasonerError> {
        let graph = self.initial_graph();
        let outcome = match self.search(graph)? {
            None => Outcome::Consistent,
            Some(clash) => Outcome::Inconsistent(Explanation {
                clashes: clash.reasons,
                axioms: clash
                    .deps
                    .iter()
                    .filter_map(|axiom| self.kb.axioms.get(*axiom).cloned())
                    .collect(),
            }),
        };
        debug!(branches = self.branches, consistent = matches!(outcome, Outcome::Consistent), "tableau finished");
        Ok(outcome)
    }

    fn initial_graph(&mut self) -> Graph {
        let mut graph = Graph::default();
        let kb = &self.kb;
        for name in &kb.individuals {
            graph.named(name);
        }
        if kb.individuals.is_empty() {
            graph.add_node(None);
        }
        for (name, concept, axiom) in &kb.class_assertions {
            let node = graph.named(name);
            graph.add(node, *concept, deps_of([*axiom]));
        }
        for (subject, property, object, axiom) in &kb.role_assertions {
            let (from, to) = (graph.named(subject), graph.named(object));
            graph.add_edge(from, to, &Role::named(property.as_str()), deps_of([*axiom]));
        }
        for (subject, property, value, axiom) in &kb.data_assertions {
            let node = graph.named(subject);
            graph.add_data(node, property, Some(value.clone()), deps_of([*axiom]));
        }
        for (left, right, axiom) in &kb.different {
            let (left, right) = (graph.named(left), graph.named(right));
            graph.different.push((left, right, deps_of([*axiom])));
        }
        for (left, right, axiom) in &kb.same {
            let (left, right) = (graph.named(left), graph.named(right));
            graph.merge(right, left, &deps_of([*axiom]));
        }
        graph
    }

    fn search(&mut self, graph: Graph) -> Result<Option<Clash>, ReasonerError> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut current = graph;
        loop {
            let clash = match self.saturate(&mut current)? {
                Step::Complete => return Ok(None),
                Step::Branch(choice) => {
                    let mut pending = choice.alternatives.into_iter();
                    if let Some(first) = pending.next() {
                        stack.push(Frame {
                            graph: current.clone(),
                            pending,
                            clash: None,
                        });
                        self.take_branch(&mut current, first)?;
                    }
                    continue;
                }
                Step::Clash(clash) => clash,
            };

            let mut clash = clash;
            loop {
                let Some(mut frame) = stack.pop() else {
                    return Ok(Some(clash));
                };
                let collected = match frame.clash.take() {
                    Some(mut collected) => {
                        collected.absorb(clash);
                        collected
                    }
                    None => clash,
                };
                if let Some(next) = frame.pending.next() {
                    current = frame.graph.clone();
                    frame.clash = Some(collected);
                    stack.push(frame);
                    self.take_branch(&mut current, next)?;
                    break;
                }
                clash = collected;
            }
        }
    }

    fn take_branch(&mut self, graph: &mut Graph, alternative: Alternative) -> Result<(), ReasonerError> {
        self.branches += 1;
        if self.branches > self.budget.max_branches {
            return Err(self.exceeded(graph));
        }
        trace!(?alternative, "branching");
        match alternative {
            Alternative::Add(node, concept, deps) => {
                graph.add(node, concept, deps);
            }
            Alternative::Merge { from, into, deps } => graph.merge(from, into, &deps),
            Alternative::AddRange(data, range, deps) => {
                let data = graph.find_data(data);
                graph.data[data].ranges.push((range, deps));
            }
            Alternative::MergeData { from, into, deps } => graph.merge_data(from, into, &deps),
        }
        Ok(())
    }

    fn exceeded(&self, graph: &Graph) -> ReasonerError {
        ReasonerError::BudgetExceeded {
            nodes: graph.generated(),
            branches: self.branches,
        }
    }

    fn saturate(&mut self, graph: &mut Graph) -> Result<Step, ReasonerError> {
        loop {
            if graph.generated() > self.budget.max_nodes {
                return Err(self.exceeded(graph));
            }
            if let Some(clash) = self.find_clash(graph) {
                return Ok(Step::Clash(clash));
            }
            let blocks = self.blocking(graph);
            match self.deterministic(graph, &blocks) {
                Err(clash) => return Ok(Step::Clash(clash)),
                Ok(true) => continue,
                Ok(false) => {}
            }
            if self.generate(graph, &blocks) {
                continue;
            }
            return Ok(match self.choose(graph, &blocks) {
                Err(clash) => Step::Clash(clash),
                Ok(Some(choice)) => Step::Branch(choice),
                Ok(None) => Step::Complete,
            });
        }
    }

    fn describe(&self, graph: &Graph, node: usize) -> String {
        let node = graph.find(node);
        let names: Vec<&str> = graph.nodes[node].names.iter().map(|name| short(name)).collect();
        if names.is_empty() {
            format!("anonymous individual #{node}")
        } else {
            names.join(" = ")
        }
    }

    fn find_clash(&mut self, graph: &Graph) -> Option<Clash> {
        for node in graph.active() {
            let label = &graph.nodes[node].label;
            for (concept, deps) in label {
                match self.kb.concepts.get(*concept).clone() {
                    Concept::Bottom => {
                        return Some(Clash::new(
                            format!("{} belongs to Nothing", self.describe(graph, node)),
                            Rc::clone(deps),
                        ));
                    }
                    Concept::Atom(name) => {
                        let negation = self.kb.concepts.negate(*concept);
                        if let Some(negated) = graph.nodes[node].label.get(&negation) {
                            return Some(Clash::new(
                                format!(
                                    "{} is both {} and not {}",
                                    self.describe(graph, node),
                                    short(&name),
                                    short(&name)
                                ),
                                union(deps, negated),
                            ));
                        }
                    }
                    Concept::NotOneOf(names) => {
                        if names.iter().any(|name| graph.nodes[node].names.contains(name)) {
                            let excluded = self.kb.concepts.negate(*concept);
                            return Some(Clash::new(
                                format!(
                                    "{} is excluded from {}",
                                    self.describe(graph, node),
                                    self.kb.concepts.render(excluded)
                                ),
                                Rc::clone(deps),
                            ));
                        }
                    }
                    Concept::NotHasSelf(role) => {
                        if let Some((_, edge)) = graph
                            .neighbors(node, &role, &self.kb)
                            .into_iter()
                            .find(|(neighbor, _)| *neighbor == node)
                        {
                            return Some(Clash::new(
                                format!("{} is related to itself by {role}", self.describe(graph, node)),
                                union(deps, &edge),
                            ));
                        }
                    }
                    _ => {}
                }
            }

            for (property, axiom) in &self.kb.roles.asymmetric {
                let role = Role::named(property.as_str());
                for (neighbor, forward) in graph.neighbors(node, &role, &self.kb) {
                    if let Some((_, backward)) = graph
                        .neighbors(neighbor, &role, &self.kb)
                        .into_iter()
                        .find(|(back, _)| *back == node)
                    {
                        return Some(Clash::new(
                            format!(
                                "{} and {} are related both ways by asymmetric {role}",
                                self.describe(graph, node),
                                self.describe(graph, neighbor)
                            ),
                            extend(&union(&forward, &backward), &BTreeSet::from([*axiom])),
                        ));
                    }
                }
            }
            for (left, right, axiom) in &self.kb.roles.disjoint {
                let through_right = graph.neighbors(node, right, &self.kb);
                for (neighbor, left_deps) in graph.neighbors(node, left, &self.kb) {
                    if let Some((_, right_deps)) =
                        through_right.iter().find(|(other, _)| *other == neighbor)
                    {
                        return Some(Clash::new(
                            format!(
                                "{} reaches {} through disjoint properties {left} and {right}",
                                self.describe(graph, node),
                                self.describe(graph, neighbor)
                            ),
                            extend(&union(&left_deps, right_deps), &BTreeSet::from([*axiom])),
                        ));
                    }
                }
            }
        }

        for (left, right, deps) in &graph.different {
            let (left_root, left_deps) = graph.find_with_deps(*left);
            let (right_root, right_deps) = graph.find_with_deps(*right);
            if left_root == right_root {
                return Some(Clash::new(
                    format!(
                        "{} must be different from itself",
                        self.describe(graph, left_root)
                    ),
                    union(&union(deps, &left_deps), &right_deps),
                ));
            }
        }

        for (subject, role, object, axiom) in &self.kb.negative_role_assertions {
            let (Some(subject), Some(object)) = (graph.names.get(subject), graph.names.get(object))
            else {
                continue;
            };
            let object = graph.find(*object);
            if let Some((_, deps)) = graph
                .neighbors(*subject, role, &self.kb)
                .into_iter()
                .find(|(neighbor, _)| *neighbor == object)
            {
                return Some(Clash::new(
                    format!(
                        "{} is related to {} by {role} although this is denied",
                        self.describe(graph, *subject),
                        self.describe(graph, object)
                    ),
                    extend(&deps, &BTreeSet::from([*axiom])),
                ));
            }
        }
        for (subject, property, value, axiom) in &self.kb.negative_data_assertions {
            let Some(subject) = graph.names.get(subject) else {
                continue;
            };
            let Ok(denied) = value.value() else {
                continue;
            };
            for (data, deps) in graph.data_successors(*subject, property, &self.kb) {
                let matches = graph.data[data]
                    .literal
                    .as_ref()
                    .and_then(|literal| literal.value().ok())
                    .is_some_and(|actual| actual.same_value(&denied));
                if matches {
                    return Some(Clash::new(
                        format!(
                            "{} has {} {value} although this is denied",
                            self.describe(graph, *subject),
                            short(property)
                        ),
                        extend(&deps, &BTreeSet::from([*axiom])),
                    ));
                }
            }
        }

        self.find_data_clash(graph)
    }

    fn find_data_clash(&self, graph: &Graph) -> Option<Clash> {
        for node in graph.active() {
            for data in &graph.nodes[node].data {
                let data = graph.find_data(*data);
                let value = &graph.data[data];
                let owner = self.describe(graph, node);
                let property = short(&value.property);
                match &value.literal {
                    Some(literal) => {
                        let parsed = match literal.value() {
                            Ok(parsed) => parsed,
                            Err(err) => {
                                return Some(Clash::new(
                                    format!("{property} of {owner}: {err}"),
                                    Rc::clone(&value.deps),
                                ));
                            }
                        };
                        for (range, deps) in &value.ranges {
                            if !datatypes::admits(range, &parsed) {
                                return Some(Clash::new(
                                    format!("{property} value {literal} of {owner} is not in {range}"),
                                    union(&value.deps, deps),
                                ));
                            }
                        }
                    }
                    None => {
                        let ranges: Vec<&DataRange> =
                            value.ranges.iter().map(|(range, _)| range).collect();
                        if !datatypes::satisfiable(&ranges) {
                            let deps = value
                                .ranges
                                .iter()
                                .fold(Rc::clone(&value.deps), |acc, (_, deps)| union(&acc, deps));
                            let rendered: Vec<String> =
                                ranges.iter().map(ToString::to_string).collect();
                            return Some(Clash::new(
                                format!(
                                    "no {property} value of {owner} can be {}",
                                    rendered.join(" and ")
                                ),
                                deps,
                            ));
                        }
                    }
                }
            }
        }
        for (left, right, deps) in &graph.data_different {
            let (left, right) = (graph.find_data(*left), graph.find_data(*right));
            let same = left == right
                || match (&graph.data[left].literal, &graph.data[right].literal) {
                    (Some(a), Some(b)) => match (a.value(), b.value()) {
                        (Ok(a), Ok(b)) => a.same_value(&b),
                        _ => false,
                    },
                    _ => false,
                };
            if same {
                return Some(Clash::new(
                    format!("distinct {} values coincide", short(&graph.data[left].property)),
                    union(&union(deps, &graph.data[left].deps), &graph.data[right].deps),
                ));
            }
        }
        None
    }

    /// Pairwise blocking over anonymous nodes.
    fn blocking(&self, graph: &Graph) -> Vec<Block> {
        let mut blocks = vec![Block::Open; graph.nodes.len()];
        for node in 0..graph.nodes.len() {
            let current = &graph.nodes[node];
            if current.merged.is_some() || current.is_named() {
                continue;
            }
            let Some(parent) = current.parent.map(|parent| graph.find(parent)) else {
                continue;
            };
            if parent < node && blocks[parent] != Block::Open {
                blocks[node] = Block::Indirect;
                continue;
            }
            let mut ancestor = Some(parent);
            let mut steps = 0;
            while let Some(candidate) = ancestor {
                steps += 1;
                if steps > graph.nodes.len() {
                    break;
                }
                let candidate_node = &graph.nodes[candidate];
                if candidate_node.is_named() {
                    break;
                }
                let Some(candidate_parent) = candidate_node.parent.map(|p| graph.find(p)) else {
                    break;
                };
                if candidate != node
                    && candidate_node.label.keys().eq(current.label.keys())
                    && graph.nodes[candidate_parent]
                        .label
                        .keys()
                        .eq(graph.nodes[parent].label.keys())
                    && edge_roles(graph, candidate_parent, candidate) == edge_roles(graph, parent, node)
                {
                    blocks[node] = Block::Direct;
                    break;
                }
                if candidate_parent == candidate {
                    break;
                }
                ancestor = Some(candidate_parent);
            }
        }
        blocks
    }

    /// Applies every deterministic rule once. Returns `true` if the graph changed.
    fn deterministic(&mut self, graph: &mut Graph, blocks: &[Block]) -> Result<bool, Clash> {
        let mut changed = false;
        let node_count = graph.nodes.len();
        for node in 0..node_count {
            if graph.nodes[node].merged.is_some() || blocks.get(node) == Some(&Block::Indirect) {
                continue;
            }
            for (gci, axiom) in &self.kb.gcis {
                changed |= graph.add(node, *gci, deps_of([*axiom]));
            }
            for (role, class, axiom) in &self.kb.domains {
                if let Some((_, deps)) = graph.neighbors(node, role, &self.kb).into_iter().next() {
                    changed |= graph.add(node, *class, extend(&deps, &BTreeSet::from([*axiom])));
                }
            }
            for (property, class, axiom) in &self.kb.data_domains {
                if let Some((_, deps)) = graph.data_successors(node, property, &self.kb).into_iter().next() {
                    changed |= graph.add(node, *class, extend(&deps, &BTreeSet::from([*axiom])));
                }
            }

            let label: Vec<(ConceptId, Deps)> = graph.nodes[node]
                .label
                .iter()
                .map(|(concept, deps)| (*concept, Rc::clone(deps)))
                .collect();
            for (concept, deps) in label {
                if graph.nodes[node].merged.is_some() {
                    return Ok(true);
                }
                let rule = self.kb.concepts.get(concept).clone();
                match rule {
                    Concept::Atom(name) => {
                        if let Some(unfolded) = self.kb.unfold.get(&name) {
                            for (sup, axiom) in unfolded {
                                changed |= graph.add(node, *sup, extend(&deps, &BTreeSet::from([*axiom])));
                            }
                        }
                    }
                    Concept::And(parts) => {
                        for part in parts {
                            changed |= graph.add(node, part, Rc::clone(&deps));
                        }
                    }
                    Concept::Or(parts) => {
                        if parts.iter().any(|part| graph.has(node, *part)) {
                            continue;
                        }
                        let (open, excluded) = self.open_disjuncts(graph, node, &parts);
                        let deps = union(&deps, &excluded);
                        match open.as_slice() {
                            [] => {
                                return Err(Clash::new(
                                    format!(
                                        "{} cannot satisfy {}",
                                        self.describe(graph, node),
                                        self.kb.concepts.render(concept)
                                    ),
                                    deps,
                                ));
                            }
                            [only] => changed |= graph.add(node, *only, deps),
                            _ => {}
                        }
                    }
                    Concept::All(role, filler) => {
                        for (neighbor, edge) in graph.neighbors(node, &role, &self.kb) {
                            changed |= graph.add(neighbor, filler, union(&deps, &edge));
                        }
                        for (transitive, axioms) in self.kb.roles.transitive_below(&role) {
                            let propagated =
                                self.kb.concepts.intern(Concept::All(transitive.clone(), filler));
                            for (neighbor, edge) in graph.neighbors(node, &transitive, &self.kb) {
                                changed |= graph.add(
                                    neighbor,
                                    propagated,
                                    extend(&union(&deps, &edge), &axioms),
                                );
                            }
                        }
                    }
                    Concept::Some(role, filler) => {
                        let Concept::OneOf(names) = self.kb.concepts.get(filler) else {
                            continue;
                        };
                        let [name] = names.as_slice() else {
                            continue;
                        };
                        let target = graph.named(name);
                        let reached = graph
                            .neighbors(node, &role, &self.kb)
                            .iter()
                            .any(|(neighbor, _)| *neighbor == target);
                        if !reached {
                            changed |= graph.add_edge(node, target, &role, deps);
                        }
                    }
                    Concept::OneOf(names) => {
                        if names.iter().any(|name| graph.nodes[node].names.contains(name)) {
                            continue;
                        }
                        if let [name] = names.as_slice() {
                            let target = graph.named(name);
                            graph.merge(node, target, &deps);
                            return Ok(true);
                        }
                    }
                    Concept::HasSelf(role) => {
                        changed |= graph.add_edge(node, node, &role, deps);
                    }
                    Concept::DataSome(property, range) => {
                        changed |= self.data_some(graph, node, &property, range, deps);
                    }
                    Concept::DataAll(property, range) => {
                        for (data, edge) in graph.data_successors(node, &property, &self.kb) {
                            if !graph.data[data].has_range(&range) {
                                graph.data[data].ranges.push((range.clone(), union(&deps, &edge)));
                                changed = true;
                            }
                        }
                    }
                    Concept::DataAtLeast(count, property, range) => {
                        changed |= self.data_at_least(graph, node, concept, count, &property, &range, deps);
                    }
                    _ => {}
                }
            }
        }
        Ok(changed)
    }

    fn open_disjuncts(&mut self, graph: &Graph, node: usize, parts: &[ConceptId]) -> (Vec<ConceptId>, Deps) {
        let mut open = Vec::new();
        let mut excluded = Deps::default();
        for part in parts {
            let negation = self.kb.concepts.negate(*part);
            match graph.nodes[graph.find(node)].label.get(&negation) {
                Some(deps) => excluded = union(&excluded, deps),
                None if *part == Concepts::BOTTOM => {}
                None => open.push(*part),
            }
        }
        (open, excluded)
    }

    fn data_satisfies(graph: &Graph, data: usize, range: &DataRange) -> bool {
        let value = &graph.data[data];
        match &value.literal {
            Some(literal) => literal
                .value()
                .is_ok_and(|parsed| datatypes::admits(range, &parsed)),
            None => *range == DataRange::Any || value.has_range(range),
        }
    }

    fn data_some(&self, graph: &mut Graph, node: usize, property: &str, range: DataRange, deps: Deps) -> bool {
        let satisfied = graph
            .data_successors(node, property, &self.kb)
            .iter()
            .any(|(data, _)| Self::data_satisfies(graph, *data, &range));
        if satisfied {
            return false;
        }
        match &range {
            DataRange::OneOf(values) if values.len() == 1 => {
                graph.add_data(node, property, values.first().cloned(), deps);
            }
            _ => {
                let data = graph.add_data(node, property, None, Rc::clone(&deps));
                graph.data[data].ranges.push((range, deps));
            }
        }
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn data_at_least(
        &self,
        graph: &mut Graph,
        node: usize,
        concept: ConceptId,
        count: u32,
        property: &str,
        range: &DataRange,
        deps: Deps,
    ) -> bool {
        let node = graph.find(node);
        if graph.applied.contains(&(node, concept)) {
            return false;
        }
        let mut distinct: Vec<literals::DataValue> = Vec::new();
        for (data, _) in graph.data_successors(node, property, &self.kb) {
            let Some(literal) = &graph.data[data].literal else {
                continue;
            };
            let Ok(value) = literal.value() else {
                continue;
            };
            if datatypes::admits(range, &value) && !distinct.iter().any(|seen| seen.same_value(&value)) {
                distinct.push(value);
            }
        }
        if distinct.len() >= count as usize {
            return false;
        }
        graph.applied.insert((node, concept));
        let created: Vec<usize> = (0..count)
            .map(|_| {
                let data = graph.add_data(node, property, None, Rc::clone(&deps));
                graph.data[data].ranges.push((range.clone(), Rc::clone(&deps)));
                data
            })
            .collect();
        for (position, left) in created.iter().enumerate() {
            for right in &created[position + 1..] {
                graph.data_different.push((*left, *right, Rc::clone(&deps)));
            }
        }
        true
    }

    /// Existential and at-least rules. Returns `true` if nodes were created.
    fn generate(&mut self, graph: &mut Graph, blocks: &[Block]) -> bool {
        let mut changed = false;
        let node_count = graph.nodes.len();
        for node in 0..node_count {
            if graph.nodes[node].merged.is_some() || blocks.get(node) != Some(&Block::Open) {
                continue;
            }
            let label: Vec<(ConceptId, Deps)> = graph.nodes[node]
                .label
                .iter()
                .map(|(concept, deps)| (*concept, Rc::clone(deps)))
                .collect();
            for (concept, deps) in label {
                match self.kb.concepts.get(concept).clone() {
                    Concept::Some(role, filler) => {
                        if matches!(self.kb.concepts.get(filler), Concept::OneOf(names) if names.len() == 1) {
                            continue;
                        }
                        let satisfied = graph
                            .neighbors(node, &role, &self.kb)
                            .iter()
                            .any(|(neighbor, _)| graph.has(*neighbor, filler));
                        if !satisfied {
                            let child = graph.add_node(Some(node));
                            graph.add(child, filler, Rc::clone(&deps));
                            graph.add_edge(node, child, &role, deps);
                            changed = true;
                        }
                    }
                    Concept::AtLeast(count, role, filler) => {
                        if graph.applied.contains(&(node, concept)) {
                            continue;
                        }
                        let matching: Vec<usize> = graph
                            .neighbors(node, &role, &self.kb)
                            .into_iter()
                            .filter(|(neighbor, _)| graph.has(*neighbor, filler))
                            .map(|(neighbor, _)| neighbor)
                            .collect();
                        if pairwise_different(graph, &matching) >= count as usize {
                            continue;
                        }
                        graph.applied.insert((node, concept));
                        let children: Vec<usize> = (0..count)
                            .map(|_| {
                                let child = graph.add_node(Some(node));
                                graph.add(child, filler, Rc::clone(&deps));
                                graph.add_edge(node, child, &role, Rc::clone(&deps));
                                child
                            })
                            .collect();
                        for (position, left) in children.iter().enumerate() {
                            for right in &children[position + 1..] {
                                graph.different.push((*left, *right, Rc::clone(&deps)));
                            }
                        }
                        changed = true;
                    }
                    _ => {}
                }
            }
        }
        changed
    }

    /// Finds the first non-deterministic decision.
    fn choose(&mut self, graph: &Graph, blocks: &[Block]) -> Result<Option<Choice>, Clash> {
        for node in graph.active() {
            if blocks.get(node) == Some(&Block::Indirect) {
                continue;
            }
            for (concept, deps) in &graph.nodes[node].label {
                let rule = self.kb.concepts.get(*concept).clone();
                let choice = match rule {
                    Concept::Or(parts) => {
                        if parts.iter().any(|part| graph.has(node, *part)) {
                            continue;
                        }
                        let (open, excluded) = self.open_disjuncts(graph, node, &parts);
                        let deps = union(deps, &excluded);
                        Some(Choice {
                            alternatives: open
                                .into_iter()
                                .map(|part| Alternative::Add(node, part, Rc::clone(&deps)))
                                .collect(),
                        })
                    }
                    Concept::AtMost(count, role, filler) => {
                        self.at_most(graph, node, *concept, count, &role, filler, deps)?
                    }
                    Concept::OneOf(names) => {
                        if names.iter().any(|name| graph.nodes[node].names.contains(name)) {
                            continue;
                        }
                        Some(Choice {
                            alternatives: names
                                .iter()
                                .filter_map(|name| graph.names.get(name))
                                .map(|target| Alternative::Merge {
                                    from: node,
                                    into: graph.find(*target),
                                    deps: Rc::clone(deps),
                                })
                                .collect(),
                        })
                    }
                    Concept::DataAtMost(count, property, range) => {
                        self.data_at_most(graph, node, *concept, count, &property, &range, deps)?
                    }
                    _ => None,
                };
                if let Some(choice) = choice {
                    if choice.alternatives.is_empty() {
                        return Err(Clash::new(
                            format!(
                                "{} cannot satisfy {}",
                                self.describe(graph, node),
                                self.kb.concepts.render(*concept)
                            ),
                            Rc::clone(deps),
                        ));
                    }
                    return Ok(Some(choice));
                }
            }
        }
        Ok(None)
    }

    #[allow(clippy::too_many_arguments)]
    fn at_most(
        &mut self,
        graph: &Graph,
        node: usize,
        concept: ConceptId,
        count: u32,
        role: &Role,
        filler: ConceptId,
        deps: &Deps,
    ) -> Result<Option<Choice>, Clash> {
        let neighbors = graph.neighbors(node, role, &self.kb);
        if filler != Concepts::TOP {
            let negation = self.kb.concepts.negate(filler);
            for (neighbor, edge) in &neighbors {
                if !graph.has(*neighbor, filler) && !graph.has(*neighbor, negation) {
                    let deps = union(deps, edge);
                    return Ok(Some(Choice {
                        alternatives: vec![
                            Alternative::Add(*neighbor, filler, Rc::clone(&deps)),
                            Alternative::Add(*neighbor, negation, deps),
                        ],
                    }));
                }
            }
        }
        let matching: Vec<&(usize, Deps)> = neighbors
            .iter()
            .filter(|(neighbor, _)| graph.has(*neighbor, filler))
            .collect();
        if matching.len() <= count as usize {
            return Ok(None);
        }
        let mut involved = Rc::clone(deps);
        let mut alternatives = Vec::new();
        for (position, (left, left_deps)) in matching.iter().enumerate() {
            involved = union(&involved, left_deps);
            for (right, right_deps) in &matching[position + 1..] {
                if let Some(different) = graph.are_different(*left, *right) {
                    involved = union(&involved, &different);
                    continue;
                }
                let (from, into) = merge_order(graph, *left, *right);
                alternatives.push(Alternative::Merge {
                    from,
                    into,
                    deps: union(&union(deps, left_deps), right_deps),
                });
            }
        }
        if alternatives.is_empty() {
            return Err(Clash::new(
                format!(
                    "{} has more than {count} distinct {role} successors allowed by {}",
                    self.describe(graph, node),
                    self.kb.concepts.render(concept)
                ),
                involved,
            ));
        }
        Ok(Some(Choice { alternatives }))
    }

    #[allow(clippy::too_many_arguments)]
    fn data_at_most(
        &self,
        graph: &Graph,
        node: usize,
        concept: ConceptId,
        count: u32,
        property: &str,
        range: &DataRange,
        deps: &Deps,
    ) -> Result<Option<Choice>, Clash> {
        let successors = graph.data_successors(node, property, &self.kb);
        if *range != DataRange::Any {
            let negation = range.clone().negate();
            for (data, edge) in &successors {
                let value = &graph.data[*data];
                if value.literal.is_none() && !value.has_range(range) && !value.has_range(&negation) {
                    let deps = union(deps, edge);
                    return Ok(Some(Choice {
                        alternatives: vec![
                            Alternative::AddRange(*data, range.clone(), Rc::clone(&deps)),
                            Alternative::AddRange(*data, negation, deps),
                        ],
                    }));
                }
            }
        }
        let matching: Vec<&(usize, Deps)> = successors
            .iter()
            .filter(|(data, _)| Self::data_satisfies(graph, *data, range))
            .collect();

        let mut distinct = 0usize;
        let mut values: Vec<literals::DataValue> = Vec::new();
        for (data, _) in &matching {
            match graph.data[*data].literal.as_ref().map(LiteralKey::value) {
                Some(Ok(value)) => {
                    if !values.iter().any(|seen| seen.same_value(&value)) {
                        values.push(value);
                        distinct += 1;
                    }
                }
                _ => distinct += 1,
            }
        }
        if distinct <= count as usize {
            return Ok(None);
        }

        let mut involved = Rc::clone(deps);
        let mut alternatives = Vec::new();
        for (position, (left, left_deps)) in matching.iter().enumerate() {
            involved = union(&involved, left_deps);
            for (right, right_deps) in &matching[position + 1..] {
                if graph.data_are_different(*left, *right) {
                    continue;
                }
                let (left_literal, right_literal) =
                    (&graph.data[*left].literal, &graph.data[*right].literal);
                if left_literal.is_some() && right_literal.is_some() {
                    continue;
                }
                let (from, into) = if left_literal.is_some() {
                    (*right, *left)
                } else {
                    (*left, *right)
                };
                alternatives.push(Alternative::MergeData {
                    from,
                    into,
                    deps: union(&union(deps, left_deps), right_deps),
                });
            }
        }
        if alternatives.is_empty() {
            let shown: Vec<String> = matching
                .iter()
                .filter_map(|(data, _)| graph.data[*data].literal.as_ref().map(ToString::to_string))
                .collect();
            return Err(Clash::new(
                format!(
                    "{} has {} values {} but {} allows at most {count}",
                    self.describe(graph, node),
                    short(property),
                    shown.join(", "),
                    self.kb.concepts.render(concept)
                ),
                involved,
            ));
        }
        Ok(Some(Choice { alternatives }))
    }
}

fn merge_order(graph: &Graph, left: usize, right: usize) -> (usize, usize) {
    let (left_named, right_named) = (graph.nodes[left].is_named(), graph.nodes[right].is_named());
    match (left_named, right_named) {
        (true, false) => (right, left),
        (false, true) => (left, right),
        _ if left < right => (right, left),
        _ => (left, right),
    }
}

fn pairwise_different(graph: &Graph, nodes: &[usize]) -> usize {
    let mut chosen: Vec<usize> = Vec::new();
    for node in nodes {
        if chosen
            .iter()
            .all(|other| graph.are_different(*node, *other).is_some())
        {
            chosen.push(*node);
        }
    }
    chosen.len()
}

fn edge_roles(graph: &Graph, parent: usize, child: usize) -> BTreeSet<(String, bool)> {
    graph.nodes[child]
        .edges
        .iter()
        .filter_map(|edge| {
            let edge = &graph.edges[*edge];
            let (from, to) = (graph.find(edge.from), graph.find(edge.to));
            if from == parent && to == child {
                Some((edge.role.clone(), true))
            } else if from == child && to == parent {
                Some((edge.role.clone(), false))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use oxrdf::{BlankNode, Literal, NamedNode, Triple};

    use super::*;
    use crate::ontology::vocab::{owl, rdf, rdfs, xsd};

    fn ex(local: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("https://example.org/{local}"))
    }

    fn term(iri: &str) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    fn check(triples: &[Triple]) -> Outcome {
        Tableau::new(KnowledgeBase::from_triples(triples), Budget::default())
            .check()
            .expect("within budget")
    }

    fn integer(value: &str) -> Literal {
        Literal::new_typed_literal(value, term(xsd::INTEGER))
    }

    #[test]
    fn self_complementary_class_is_inconsistent() {
        let complement = BlankNode::new_unchecked("c");
        let triples = vec![
            Triple::new(ex("A"), term(rdf::TYPE), term(owl::CLASS)),
            Triple::new(ex("A"), term(owl::EQUIVALENT_CLASS), complement.clone()),
            Triple::new(complement, term(owl::COMPLEMENT_OF), ex("A")),
        ];
        let Outcome::Inconsistent(explanation) = check(&triples) else {
            panic!("expected a clash");
        };
        assert_eq!(explanation.axioms, vec!["A EquivalentTo not A".to_string()]);
    }

    #[test]
    fn disjoint_types_clash() {
        let triples = vec![
            Triple::new(ex("Cat"), term(owl::DISJOINT_WITH), ex("Dog")),
            Triple::new(ex("Puppy"), term(rdfs::SUB_CLASS_OF), ex("Dog")),
            Triple::new(ex("rex"), term(rdf::TYPE), ex("Cat")),
            Triple::new(ex("rex"), term(rdf::TYPE), ex("Puppy")),
        ];
        let Outcome::Inconsistent(explanation) = check(&triples) else {
            panic!("expected a clash");
        };
        assert_eq!(explanation.axioms.len(), 4);
        assert!(explanation.to_string().starts_with("Clash: rex is both"));
    }

    #[test]
    fn plain_facts_are_consistent() {
        let triples = vec![
            Triple::new(ex("Person"), term(rdf::TYPE), term(owl::CLASS)),
            Triple::new(ex("clark"), term(rdf::TYPE), ex("Person")),
            Triple::new(ex("clark"), ex("knows"), ex("lois")),
            Triple::new(ex("clark"), ex("age"), integer("30")),
        ];
        assert_eq!(check(&triples), Outcome::Consistent);
    }

    #[test]
    fn functional_data_property_rejects_two_values() {
        let triples = vec![
            Triple::new(ex("age"), term(rdf::TYPE), term(owl::DATATYPE_PROPERTY)),
            Triple::new(ex("age"), term(rdf::TYPE), term(owl::FUNCTIONAL_PROPERTY)),
            Triple::new(ex("clark"), ex("age"), integer("30")),
            Triple::new(ex("clark"), ex("age"), integer("31")),
        ];
        assert!(matches!(check(&triples), Outcome::Inconsistent(_)));

        let same_value = vec![
            Triple::new(ex("age"), term(rdf::TYPE), term(owl::DATATYPE_PROPERTY)),
            Triple::new(ex("age"), term(rdf::TYPE), term(owl::FUNCTIONAL_PROPERTY)),
            Triple::new(ex("clark"), ex("age"), integer("30")),
            Triple::new(
                ex("clark"),
                ex("age"),
                Literal::new_typed_literal("30.0", term(xsd::DECIMAL)),
            ),
        ];
        assert_eq!(check(&same_value), Outcome::Consistent);
    }

    #[test]
    fn data_range_violation_is_explained() {
        let triples = vec![
            Triple::new(ex("age"), term(rdf::TYPE), term(owl::DATATYPE_PROPERTY)),
            Triple::new(ex("age"), term(rdfs::RANGE), term(xsd::INTEGER)),
            Triple::new(ex("clark"), ex("age"), Literal::new_simple_literal("thirty")),
        ];
        let Outcome::Inconsistent(explanation) = check(&triples) else {
            panic!("expected a clash");
        };
        assert_eq!(
            explanation.clashes,
            vec!["age value \"thirty\" of clark is not in integer".to_string()]
        );
    }

    #[test]
    fn functional_object_property_merges_then_clashes_on_difference() {
        let triples = vec![
            Triple::new(ex("spouse"), term(rdf::TYPE), term(owl::OBJECT_PROPERTY)),
            Triple::new(ex("spouse"), term(rdf::TYPE), term(owl::FUNCTIONAL_PROPERTY)),
            Triple::new(ex("clark"), ex("spouse"), ex("lois")),
            Triple::new(ex("clark"), ex("spouse"), ex("lana")),
        ];
        assert_eq!(check(&triples), Outcome::Consistent);

        let mut distinct = triples.clone();
        distinct.push(Triple::new(ex("lois"), term(owl::DIFFERENT_FROM), ex("lana")));
        assert!(matches!(check(&distinct), Outcome::Inconsistent(_)));
    }

    #[test]
    fn existential_cycles_terminate_through_blocking() {
        let restriction = BlankNode::new_unchecked("r");
        let triples = vec![
            Triple::new(ex("Person"), term(rdfs::SUB_CLASS_OF), restriction.clone()),
            Triple::new(restriction.clone(), term(rdf::TYPE), term(owl::RESTRICTION)),
            Triple::new(restriction.clone(), term(owl::ON_PROPERTY), ex("hasParent")),
            Triple::new(restriction, term(owl::SOME_VALUES_FROM), ex("Person")),
            Triple::new(ex("clark"), term(rdf::TYPE), ex("Person")),
        ];
        assert_eq!(check(&triples), Outcome::Consistent);
    }

    #[test]
    fn union_branches_are_explored() {
        let union_node = BlankNode::new_unchecked("u");
        let list = BlankNode::new_unchecked("l1");
        let tail = BlankNode::new_unchecked("l2");
        let triples = vec![
            Triple::new(ex("Pet"), term(owl::EQUIVALENT_CLASS), union_node.clone()),
            Triple::new(union_node, term(owl::UNION_OF), list.clone()),
            Triple::new(list.clone(), term(rdf::FIRST), ex("Cat")),
            Triple::new(list, term(rdf::REST), tail.clone()),
            Triple::new(tail.clone(), term(rdf::FIRST), ex("Dog")),
            Triple::new(tail, term(rdf::REST), term(rdf::NIL)),
            Triple::new(ex("Cat"), term(owl::DISJOINT_WITH), ex("Dog")),
            Triple::new(ex("rex"), term(rdf::TYPE), ex("Pet")),
        ];
        assert_eq!(check(&triples), Outcome::Consistent);

        let mut neither = triples.clone();
        let not_cat = BlankNode::new_unchecked("nc");
        let not_dog = BlankNode::new_unchecked("nd");
        neither.extend([
            Triple::new(ex("rex"), term(rdf::TYPE), not_cat.clone()),
            Triple::new(not_cat, term(owl::COMPLEMENT_OF), ex("Cat")),
            Triple::new(ex("rex"), term(rdf::TYPE), not_dog.clone()),
            Triple::new(not_dog, term(owl::COMPLEMENT_OF), ex("Dog")),
        ]);
        assert!(matches!(check(&neither), Outcome::Inconsistent(_)));
    }

    #[test]
    fn budget_is_enforced() {
        let restriction = BlankNode::new_unchecked("r");
        let triples = vec![
            Triple::new(ex("Person"), term(rdfs::SUB_CLASS_OF), restriction.clone()),
            Triple::new(restriction.clone(), term(rdf::TYPE), term(owl::RESTRICTION)),
            Triple::new(restriction.clone(), term(owl::ON_PROPERTY), ex("hasParent")),
            Triple::new(restriction, term(owl::SOME_VALUES_FROM), ex("Person")),
            Triple::new(ex("clark"), term(rdf::TYPE), ex("Person")),
        ];
        let budget = Budget {
            max_nodes: 0,
            max_branches: 10,
        };
        let result = Tableau::new(KnowledgeBase::from_triples(&triples), budget).check();
        assert!(matches!(result, Err(ReasonerError::BudgetExceeded { .. })));
    }

    #[test]
    fn named_individuals_do_not_consume_the_node_budget() {
        let triples: Vec<_> = (0..50)
            .flat_map(|n| {
                let person = ex(&format!("person{n}"));
                [
                    Triple::new(person.clone(), term(rdf::TYPE), ex("Person")),
                    Triple::new(person, ex("knows"), ex(&format!("person{}", n + 1))),
                ]
            })
            .collect();
        let budget = Budget {
            max_nodes: 10,
            max_branches: 10,
        };
        let result = Tableau::new(KnowledgeBase::from_triples(&triples), budget).check();
        assert!(matches!(result, Ok(Outcome::Consistent)));
    }
}

//! Schema compilation.
//!
//! [`compile`] turns a raw schema document into a [`SchemaDefinition`],
//! collecting every structural problem it finds into one
//! [`SchemaSyntaxError`]. [`derive_ontology`] projects a compiled schema into
//! the [`OntologyModel`] handed to the consistency checker.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use super::definition::{
    ClassDefinition, EnumDefinition, ParentRef, Primitive, Range, SchemaDefinition,
    SlotDefinition, SlotPattern,
};
use crate::{
    ontology::{
        vocab, Class, DataRangeSpec, Iri, OntologyError, OntologyModel, PrefixMap, Property,
        PropertyKind, Restriction,
    },
    workdir::WorkingStore,
};

/// Errors raised when a schema document is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaSyntaxError {
    /// The text is not a YAML document.
    #[error("Schema is not valid yaml: {0}")]
    Yaml(String),
    /// Required top-level identity fields are absent.
    #[error("{}", missing_fields_message(.missing))]
    MissingFields { missing: Vec<&'static str> },
    /// The document parsed but does not load into the schema model.
    #[error("Schema does not validate: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl SchemaSyntaxError {
    /// Returns the individual diagnostics carried by the error.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Yaml(_) => vec![self.to_string()],
            Self::MissingFields { missing } => missing
                .iter()
                .map(|field| format!("Schema does not have a top level {field}"))
                .collect(),
            Self::Invalid(messages) => messages.clone(),
        }
    }
}

fn missing_fields_message(missing: &[&'static str]) -> String {
    missing
        .iter()
        .map(|field| format!("Schema does not have a top level {field}"))
        .collect::<Vec<_>>()
        .join("\n")
}

const METADATA_KEYS: &[&str] = &[
    "title",
    "aliases",
    "comments",
    "notes",
    "examples",
    "see_also",
    "exact_mappings",
    "close_mappings",
    "related_mappings",
    "broad_mappings",
    "narrow_mappings",
    "annotations",
    "in_subset",
    "deprecated",
    "rank",
];

const CLASS_KEYS: &[&str] = &[
    "is_a",
    "mixins",
    "abstract",
    "tree_root",
    "class_uri",
    "description",
    "attributes",
    "slots",
    "slot_usage",
    "id_prefixes",
];

const SLOT_KEYS: &[&str] = &[
    "range",
    "required",
    "recommended",
    "multivalued",
    "identifier",
    "minimum_value",
    "maximum_value",
    "pattern",
    "slot_uri",
    "inlined",
    "inlined_as_list",
    "description",
];

const ENUM_KEYS: &[&str] = &["description", "permissible_values", "enum_uri"];

const TYPE_KEYS: &[&str] = &[
    "typeof",
    "uri",
    "base",
    "repr",
    "pattern",
    "minimum_value",
    "maximum_value",
    "description",
];

const BUILTIN_PREFIXES: &[(&str, &str)] = &[
    ("linkml", "https://w3id.org/linkml/"),
    ("rdf", vocab::RDF_NS),
    ("rdfs", vocab::RDFS_NS),
    ("owl", vocab::OWL_NS),
    ("xsd", vocab::XSD_NS),
];

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    id: String,
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    version: Option<Value>,
    #[serde(default, deserialize_with = "null_default")]
    prefixes: BTreeMap<String, RawPrefix>,
    #[serde(default)]
    default_prefix: Option<String>,
    #[serde(default)]
    default_range: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    imports: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    classes: BTreeMap<String, Option<RawClass>>,
    #[serde(default, deserialize_with = "null_default")]
    slots: BTreeMap<String, Option<RawSlot>>,
    #[serde(default, deserialize_with = "null_default")]
    enums: BTreeMap<String, Option<RawEnum>>,
    #[serde(default, deserialize_with = "null_default")]
    types: BTreeMap<String, Option<RawType>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPrefix {
    Reference(String),
    Expanded { prefix_reference: String },
}

impl RawPrefix {
    fn reference(&self) -> &str {
        match self {
            Self::Reference(reference) | Self::Expanded { prefix_reference: reference } => {
                reference
            }
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
struct RawClass {
    is_a: Option<String>,
    #[serde(deserialize_with = "null_default")]
    mixins: Vec<String>,
    #[serde(rename = "abstract")]
    is_abstract: bool,
    tree_root: bool,
    class_uri: Option<String>,
    description: Option<String>,
    #[serde(deserialize_with = "null_default")]
    attributes: BTreeMap<String, Option<RawSlot>>,
    #[serde(deserialize_with = "null_default")]
    slots: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    slot_usage: BTreeMap<String, Option<RawSlot>>,
    #[serde(deserialize_with = "null_default")]
    id_prefixes: Vec<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
struct RawSlot {
    range: Option<String>,
    required: Option<bool>,
    multivalued: Option<bool>,
    identifier: Option<bool>,
    minimum_value: Option<f64>,
    maximum_value: Option<f64>,
    pattern: Option<String>,
    slot_uri: Option<String>,
    inlined: Option<bool>,
    inlined_as_list: Option<bool>,
    description: Option<String>,
}

impl RawSlot {
    /// Applies a class-level refinement on top of an inherited definition.
    fn refined_by(&self, usage: &Self) -> Self {
        Self {
            range: usage.range.clone().or_else(|| self.range.clone()),
            required: usage.required.or(self.required),
            multivalued: usage.multivalued.or(self.multivalued),
            identifier: usage.identifier.or(self.identifier),
            minimum_value: usage.minimum_value.or(self.minimum_value),
            maximum_value: usage.maximum_value.or(self.maximum_value),
            pattern: usage.pattern.clone().or_else(|| self.pattern.clone()),
            slot_uri: self.slot_uri.clone(),
            inlined: usage.inlined.or(self.inlined),
            inlined_as_list: usage.inlined_as_list.or(self.inlined_as_list),
            description: usage.description.clone().or_else(|| self.description.clone()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEnum {
    description: Option<String>,
    permissible_values: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawType {
    #[serde(rename = "typeof")]
    type_of: Option<String>,
    uri: Option<String>,
    pattern: Option<String>,
    minimum_value: Option<f64>,
    maximum_value: Option<f64>,
}

/// Custom type folded down to its primitive base.
#[derive(Clone, Debug, Default)]
struct TypeFacets {
    pattern: Option<String>,
    minimum_value: Option<f64>,
    maximum_value: Option<f64>,
}

/// Parses and validates a raw schema document.
///
/// # Errors
///
/// Returns [`SchemaSyntaxError::Yaml`] when the text is not YAML,
/// [`SchemaSyntaxError::MissingFields`] listing every absent identity field,
/// and [`SchemaSyntaxError::Invalid`] with all structural problems found.
pub fn compile(text: &str) -> Result<SchemaDefinition, SchemaSyntaxError> {
    let document: Value =
        serde_yaml::from_str(text).map_err(|err| SchemaSyntaxError::Yaml(err.to_string()))?;

    let empty = Mapping::new();
    let mapping = document.as_mapping().unwrap_or(&empty);
    let missing: Vec<&'static str> = ["id", "name"]
        .into_iter()
        .filter(|field| !has_text(mapping, field))
        .collect();
    if !missing.is_empty() {
        debug!(?missing, "schema is missing identity fields");
        return Err(SchemaSyntaxError::MissingFields { missing });
    }

    let mut messages = unknown_keys(mapping);
    let raw: RawSchema = match serde_yaml::from_value(document) {
        Ok(raw) => raw,
        Err(err) => {
            messages.push(err.to_string());
            return Err(SchemaSyntaxError::Invalid(messages));
        }
    };

    let mut resolver = Resolver::new(&raw);
    resolver.messages.append(&mut messages);
    match resolver.resolve() {
        Ok(schema) => {
            info!(
                schema = %schema.name,
                classes = schema.classes.len(),
                enums = schema.enums.len(),
                "compiled schema"
            );
            Ok(schema)
        }
        Err(messages) => {
            debug!(problems = messages.len(), "schema failed to compile");
            Err(SchemaSyntaxError::Invalid(messages))
        }
    }
}

/// Compiles `text` and, only if it is valid, stores it under `name`.
///
/// # Errors
///
/// Returns the compilation error untouched (nothing is written) or the store
/// error raised while persisting.
pub async fn compile_and_save(
    text: &str,
    store: &WorkingStore,
    name: &str,
) -> crate::Result<SchemaDefinition> {
    let schema = compile(text)?;
    store.write(name, text).await?;
    info!(schema = %schema.name, file = name, "saved schema");
    Ok(schema)
}

fn has_text(mapping: &Mapping, field: &str) -> bool {
    match mapping.get(field) {
        Some(Value::String(value)) => !value.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn unknown_keys(document: &Mapping) -> Vec<String> {
    let mut messages = Vec::new();
    let sections: [(&str, &str, &[&str]); 4] = [
        ("classes", "class", CLASS_KEYS),
        ("slots", "slot", SLOT_KEYS),
        ("enums", "enum", ENUM_KEYS),
        ("types", "type", TYPE_KEYS),
    ];
    for (section, kind, allowed) in sections {
        let Some(Value::Mapping(entries)) = document.get(section) else {
            continue;
        };
        for (name, body) in entries {
            let name = key_text(name);
            check_keys(&mut messages, &format!("{kind} `{name}`"), body, allowed);
            if section != "classes" {
                continue;
            }
            for nested in ["attributes", "slot_usage"] {
                let Some(Value::Mapping(slots)) = body.get(nested) else {
                    continue;
                };
                for (slot, slot_body) in slots {
                    let context = format!("attribute `{name}.{}`", key_text(slot));
                    check_keys(&mut messages, &context, slot_body, SLOT_KEYS);
                }
            }
        }
    }
    messages
}

fn check_keys(messages: &mut Vec<String>, context: &str, body: &Value, allowed: &[&str]) {
    let Value::Mapping(body) = body else {
        return;
    };
    for key in body.keys() {
        let key = key_text(key);
        if !allowed.contains(&key.as_str()) && !METADATA_KEYS.contains(&key.as_str()) {
            messages.push(format!("{context} has unknown key `{key}`"));
        }
    }
}

fn key_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => format!("{other:?}"),
    }
}

struct Resolver<'a> {
    raw: &'a RawSchema,
    prefixes: PrefixMap,
    namespace: String,
    types: BTreeMap<String, (Primitive, TypeFacets)>,
    messages: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(raw: &'a RawSchema) -> Self {
        Self {
            raw,
            prefixes: PrefixMap::new(),
            namespace: String::new(),
            types: BTreeMap::new(),
            messages: Vec::new(),
        }
    }

    fn resolve(mut self) -> Result<SchemaDefinition, Vec<String>> {
        let id = match Iri::new(self.raw.id.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                self.messages
                    .push(format!("id `{}` is not a valid IRI", self.raw.id));
                None
            }
        };

        self.resolve_prefixes();
        self.namespace = self.default_namespace(id.as_ref());
        self.resolve_types();
        let enums = self.resolve_enums();

        let raw = self.raw;
        let mut classes = BTreeMap::new();
        for (name, body) in &raw.classes {
            let body = body.clone().unwrap_or_default();
            if let Some(class) = self.class(name, &body, &enums) {
                classes.insert(name.clone(), class);
            }
        }

        let Some(id) = id else {
            return Err(self.messages);
        };
        let schema = SchemaDefinition {
            id,
            name: self.raw.name.clone(),
            title: self.raw.title.clone(),
            description: self.raw.description.clone(),
            version: self.raw.version.as_ref().map(key_text),
            prefixes: self.prefixes.clone(),
            default_prefix: self.raw.default_prefix.clone(),
            default_namespace: self.namespace.clone(),
            imports: self.raw.imports.clone(),
            classes,
            enums,
        };
        self.check_hierarchy(&schema);
        self.check_shared_slots(&schema);

        if self.messages.is_empty() {
            Ok(schema)
        } else {
            Err(self.messages)
        }
    }

    fn resolve_prefixes(&mut self) {
        let raw = self.raw;
        for (prefix, reference) in &raw.prefixes {
            let reference = reference.reference();
            if Iri::new(reference).is_err() {
                self.messages.push(format!(
                    "prefix `{prefix}` maps to `{reference}`, which is not a valid IRI"
                ));
                continue;
            }
            self.prefixes.insert(prefix.clone(), reference);
        }
        for (prefix, namespace) in BUILTIN_PREFIXES {
            if !self.prefixes.contains(prefix) {
                self.prefixes.insert(*prefix, *namespace);
            }
        }
    }

    fn default_namespace(&mut self, id: Option<&Iri>) -> String {
        if let Some(prefix) = &self.raw.default_prefix {
            if let Some(namespace) = self.prefixes.namespace(prefix) {
                return namespace.to_string();
            }
            if prefix != &self.raw.name {
                self.messages
                    .push(format!("default_prefix `{prefix}` is not a declared prefix"));
            }
        }
        id.map_or_else(String::new, Iri::as_namespace)
    }

    fn resolve_types(&mut self) {
        let raw = self.raw;
        for name in raw.types.keys() {
            let mut visited = BTreeSet::new();
            match self.fold_type(name, &mut visited) {
                Ok(folded) => {
                    self.types.insert(name.clone(), folded);
                }
                Err(message) => self.messages.push(message),
            }
        }
    }

    fn fold_type(
        &self,
        name: &str,
        visited: &mut BTreeSet<String>,
    ) -> Result<(Primitive, TypeFacets), String> {
        if let Some(primitive) = Primitive::from_name(name) {
            return Ok((primitive, TypeFacets::default()));
        }
        if !visited.insert(name.to_string()) {
            return Err(format!("type `{name}` has a cyclic typeof chain"));
        }
        let raw = match self.raw.types.get(name) {
            Some(Some(raw)) => raw,
            Some(None) => return Err(format!("type `{name}` declares neither typeof nor uri")),
            None => return Err(format!("type `{name}` is not declared")),
        };
        let (base, inherited) = if let Some(parent) = &raw.type_of {
            self.fold_type(parent, visited)?
        } else if let Some(uri) = &raw.uri {
            let expanded = self.expand(uri).map(|iri| iri.as_str().to_string());
            let primitive = expanded
                .and_then(|iri| primitive_for_xsd(&iri))
                .ok_or_else(|| format!("type `{name}` maps to unsupported uri `{uri}`"))?;
            (primitive, TypeFacets::default())
        } else {
            return Err(format!("type `{name}` declares neither typeof nor uri"));
        };
        Ok((
            base,
            TypeFacets {
                pattern: raw.pattern.clone().or(inherited.pattern),
                minimum_value: raw.minimum_value.or(inherited.minimum_value),
                maximum_value: raw.maximum_value.or(inherited.maximum_value),
            },
        ))
    }

    fn resolve_enums(&mut self) -> BTreeMap<String, EnumDefinition> {
        let raw = self.raw;
        let mut enums = BTreeMap::new();
        for (name, body) in &raw.enums {
            let (description, values) = match body {
                Some(body) => (body.description.clone(), body.permissible_values.as_ref()),
                None => (None, None),
            };
            let permissible_values = match values {
                Some(Value::Mapping(values)) => values.keys().map(key_text).collect(),
                Some(Value::Sequence(values)) => values.iter().map(key_text).collect(),
                Some(Value::Null) | None => Vec::new(),
                Some(_) => {
                    self.messages.push(format!(
                        "enum `{name}` permissible_values must be a mapping or a list"
                    ));
                    continue;
                }
            };
            enums.insert(
                name.clone(),
                EnumDefinition {
                    name: name.clone(),
                    permissible_values,
                    description,
                },
            );
        }
        enums
    }

    fn class(
        &mut self,
        name: &str,
        raw: &RawClass,
        enums: &BTreeMap<String, EnumDefinition>,
    ) -> Option<ClassDefinition> {
        let before = self.messages.len();

        if !raw.mixins.is_empty() {
            self.messages.push(format!(
                "class `{name}` uses mixins; only single inheritance through is_a is supported"
            ));
        }

        let is_a = raw.is_a.as_deref().and_then(|parent| {
            if self.raw.classes.contains_key(parent) {
                Some(ParentRef::Declared(parent.to_string()))
            } else if let Some(iri) = parent.contains(':').then(|| self.expand(parent)).flatten() {
                Some(ParentRef::External(iri))
            } else {
                self.messages
                    .push(format!("class `{name}` has undeclared parent `{parent}`"));
                None
            }
        });

        let class_uri = match &raw.class_uri {
            Some(reference) => self.expand(reference).or_else(|| {
                self.messages.push(format!(
                    "class `{name}` has class_uri `{reference}` that cannot be expanded"
                ));
                None
            }),
            None => self.mint(name, &format!("class `{name}`")),
        };

        let mut attributes = BTreeMap::new();
        for (slot_name, body) in &raw.attributes {
            let body = body.clone().unwrap_or_default();
            if let Some(slot) = self.slot(name, slot_name, &body, enums) {
                attributes.insert(slot_name.clone(), slot);
            }
        }
        for slot_name in &raw.slots {
            match self.raw.slots.get(slot_name) {
                Some(body) => {
                    let body = body.clone().unwrap_or_default();
                    if let Some(slot) = self.slot(name, slot_name, &body, enums) {
                        attributes.insert(slot_name.clone(), slot);
                    }
                }
                None => self
                    .messages
                    .push(format!("class `{name}` references undeclared slot `{slot_name}`")),
            }
        }
        for (slot_name, usage) in &raw.slot_usage {
            let Some(base) = self.inherited_slot(name, slot_name) else {
                self.messages.push(format!(
                    "class `{name}` refines `{slot_name}`, which it neither declares nor inherits"
                ));
                continue;
            };
            let body = base.refined_by(&usage.clone().unwrap_or_default());
            if let Some(slot) = self.slot(name, slot_name, &body, enums) {
                attributes.insert(slot_name.clone(), slot);
            }
        }

        if self.messages.len() != before {
            return None;
        }
        Some(ClassDefinition {
            name: name.to_string(),
            class_uri: class_uri?,
            is_a,
            is_abstract: raw.is_abstract,
            tree_root: raw.tree_root,
            description: raw.description.clone(),
            attributes,
            id_prefixes: raw.id_prefixes.clone(),
        })
    }

    /// Finds the raw definition a `slot_usage` entry refines.
    fn inherited_slot(&self, class: &str, slot: &str) -> Option<RawSlot> {
        let mut visited = BTreeSet::new();
        let mut current = Some(class);
        while let Some(name) = current {
            if !visited.insert(name) {
                break;
            }
            let Some(Some(body)) = self.raw.classes.get(name) else {
                break;
            };
            if let Some(found) = body.attributes.get(slot) {
                return Some(found.clone().unwrap_or_default());
            }
            if body.slots.iter().any(|name| name == slot) {
                if let Some(found) = self.raw.slots.get(slot) {
                    return Some(found.clone().unwrap_or_default());
                }
            }
            current = body.is_a.as_deref();
        }
        self.raw
            .slots
            .get(slot)
            .map(|found| found.clone().unwrap_or_default())
    }

    fn slot(
        &mut self,
        owner: &str,
        name: &str,
        raw: &RawSlot,
        enums: &BTreeMap<String, EnumDefinition>,
    ) -> Option<SlotDefinition> {
        let context = format!("attribute `{owner}.{name}`");
        let range_name = raw
            .range
            .as_deref()
            .or(self.raw.default_range.as_deref())
            .unwrap_or("string");

        let mut facets = TypeFacets::default();
        let range = if let Some(primitive) = Primitive::from_name(range_name) {
            Range::Primitive(primitive)
        } else if let Some((primitive, type_facets)) = self.types.get(range_name) {
            facets = type_facets.clone();
            Range::Primitive(*primitive)
        } else if enums.contains_key(range_name) {
            Range::Enum(range_name.to_string())
        } else if self.raw.classes.contains_key(range_name) {
            Range::Class(range_name.to_string())
        } else {
            self.messages
                .push(format!("{context} has unknown range `{range_name}`"));
            return None;
        };

        let before = self.messages.len();
        let minimum_value = raw.minimum_value.or(facets.minimum_value);
        let maximum_value = raw.maximum_value.or(facets.maximum_value);
        let numeric = matches!(range, Range::Primitive(primitive) if primitive.is_numeric());
        if (minimum_value.is_some() || maximum_value.is_some()) && !numeric {
            self.messages.push(format!(
                "{context} declares numeric bounds on non-numeric range `{range}`"
            ));
        }
        if let (Some(minimum), Some(maximum)) = (minimum_value, maximum_value) {
            if minimum > maximum {
                self.messages.push(format!(
                    "{context} has minimum_value {minimum} greater than maximum_value {maximum}"
                ));
            }
        }

        let pattern = match raw.pattern.clone().or(facets.pattern) {
            Some(source) => match Regex::new(&source) {
                Ok(regex) => Some(SlotPattern::new(regex)),
                Err(err) => {
                    self.messages
                        .push(format!("{context} has an invalid pattern `{source}`: {err}"));
                    None
                }
            },
            None => None,
        };

        let identifier = raw.identifier.unwrap_or(false);
        let multivalued = raw.multivalued.unwrap_or(false);
        if identifier && multivalued {
            self.messages
                .push(format!("{context} cannot be both identifier and multivalued"));
        }

        let slot_uri = match &raw.slot_uri {
            Some(reference) => self.expand(reference).or_else(|| {
                self.messages.push(format!(
                    "{context} has slot_uri `{reference}` that cannot be expanded"
                ));
                None
            }),
            None => self.mint(name, &context),
        };

        if self.messages.len() != before {
            return None;
        }
        Some(SlotDefinition {
            name: name.to_string(),
            slot_uri: slot_uri?,
            range,
            required: raw.required.unwrap_or(false) || identifier,
            multivalued,
            identifier,
            minimum_value,
            maximum_value,
            pattern,
            inlined: raw.inlined.or(raw.inlined_as_list).unwrap_or(false),
            description: raw.description.clone(),
        })
    }

    /// Expands a CURIE with a declared prefix, or accepts an absolute IRI.
    fn expand(&self, reference: &str) -> Option<Iri> {
        match self.prefixes.expand(reference) {
            Some(expanded) => Iri::new(expanded).ok(),
            None if reference.contains("://") || reference.starts_with("urn:") => {
                Iri::new(reference).ok()
            }
            None => None,
        }
    }

    fn mint(&mut self, local: &str, context: &str) -> Option<Iri> {
        match Iri::new(format!("{}{local}", self.namespace)) {
            Ok(iri) => Some(iri),
            Err(_) if self.namespace.is_empty() => None,
            Err(_) => {
                self.messages
                    .push(format!("{context} does not form a valid IRI"));
                None
            }
        }
    }

    fn check_hierarchy(&mut self, schema: &SchemaDefinition) {
        let mut cyclic = BTreeSet::new();
        for class in schema.classes.values() {
            let mut visited = BTreeSet::new();
            let mut current = class.parent_name();
            while let Some(parent) = current {
                if parent == class.name {
                    cyclic.insert(class.name.as_str());
                    break;
                }
                if !visited.insert(parent) {
                    break;
                }
                current = schema.class(parent).and_then(ClassDefinition::parent_name);
            }
        }
        if !cyclic.is_empty() {
            let names: Vec<&str> = cyclic.into_iter().collect();
            self.messages
                .push(format!("cyclic is_a chain through {}", names.join(", ")));
            return;
        }

        let mut uris: BTreeMap<&str, &str> = BTreeMap::new();
        for class in schema.classes.values() {
            if let Some(other) = uris.insert(class.class_uri.as_str(), &class.name) {
                self.messages.push(format!(
                    "classes `{other}` and `{}` share the IRI `{}`",
                    class.name, class.class_uri
                ));
            }
            let identifiers: Vec<&str> = schema
                .induced_attributes(&class.name)
                .into_values()
                .filter(|slot| slot.identifier)
                .map(|slot| slot.name.as_str())
                .collect();
            if identifiers.len() > 1 {
                self.messages.push(format!(
                    "class `{}` has more than one identifier: {}",
                    class.name,
                    identifiers.join(", ")
                ));
            }
        }
    }

    /// A slot IRI maps to one OWL property, so every use must agree on its kind.
    fn check_shared_slots(&mut self, schema: &SchemaDefinition) {
        let mut kinds: BTreeMap<&str, (&str, &'static str)> = BTreeMap::new();
        for class in schema.classes.values() {
            for slot in class.attributes.values().filter(|slot| !slot.identifier) {
                let kind = property_range_kind(&slot.range);
                match kinds.get(slot.slot_uri.as_str()) {
                    Some((first, existing)) if *existing != kind => {
                        self.messages.push(format!(
                            "slot `{}` is used with incompatible ranges in `{first}` and `{}`",
                            slot.name, class.name
                        ));
                    }
                    Some(_) => {}
                    None => {
                        kinds.insert(slot.slot_uri.as_str(), (&class.name, kind));
                    }
                }
            }
        }
    }
}

fn primitive_for_xsd(iri: &str) -> Option<Primitive> {
    [
        Primitive::String,
        Primitive::Integer,
        Primitive::Float,
        Primitive::Double,
        Primitive::Decimal,
        Primitive::Boolean,
        Primitive::Date,
        Primitive::DateTime,
        Primitive::Time,
        Primitive::Uri,
    ]
    .into_iter()
    .find(|primitive| primitive.xsd() == iri)
}

fn property_range_kind(range: &Range) -> &'static str {
    match range {
        Range::Class(_) => vocab::owl::THING,
        Range::Enum(_) => vocab::xsd::STRING,
        Range::Primitive(primitive) => primitive.xsd(),
    }
}

/// Projects a compiled schema into its OWL equivalent.
///
/// Every class becomes an `owl:Class`, every parent link a subclass axiom,
/// class-valued attributes become object properties and the rest datatype
/// properties. Identifier attributes name the subject and are skipped.
/// Cardinality, numeric bounds and enum ranges become class restrictions.
///
/// # Errors
///
/// Fails only when the schema violates the uniqueness guarantees that
/// [`compile`] enforces.
pub fn derive_ontology(schema: &SchemaDefinition) -> Result<OntologyModel, OntologyError> {
    let mut ontology = OntologyModel::new(schema.id.clone()).with_label(schema.name.clone());
    if let Some(description) = &schema.description {
        ontology = ontology.with_comment(description.clone());
    }

    let mut external = BTreeSet::new();
    for class in schema.classes.values() {
        let mut owl_class = Class::new(class.class_uri.clone()).with_label(class.name.clone());
        if let Some(description) = &class.description {
            owl_class = owl_class.with_comment(description.clone());
        }
        match &class.is_a {
            Some(ParentRef::Declared(parent)) => {
                if let Some(parent) = schema.class(parent) {
                    owl_class.add_parent(parent.class_uri.clone());
                }
            }
            Some(ParentRef::External(parent)) => {
                owl_class.add_parent(parent.clone());
                external.insert(parent.clone());
            }
            None => {}
        }
        ontology.add_class(owl_class)?;
    }
    for parent in external {
        if ontology.class(&parent).is_none() {
            ontology.add_class(Class::new(parent))?;
        }
    }

    let mut properties: BTreeMap<Iri, Property> = BTreeMap::new();
    for class in schema.classes.values() {
        for slot in class.attributes.values().filter(|slot| !slot.identifier) {
            let kind = if slot.range.is_relation() {
                PropertyKind::Object
            } else {
                PropertyKind::Data
            };
            let property = properties.entry(slot.slot_uri.clone()).or_insert_with(|| {
                Property::new(slot.slot_uri.clone(), kind).with_label(slot.name.clone())
            });
            property.add_domain(class.class_uri.clone());
            if let Some(range) = property_range(schema, &slot.range) {
                property.add_range(range);
            }
        }
    }
    for property in properties.into_values() {
        ontology.add_property(property)?;
    }

    for class in schema.classes.values() {
        for slot in class.attributes.values().filter(|slot| !slot.identifier) {
            for restriction in restrictions(schema, slot) {
                ontology.add_restriction(&class.class_uri, restriction)?;
            }
        }
    }

    debug!(
        ontology = %ontology.id(),
        classes = ontology.classes().len(),
        properties = ontology.properties().len(),
        "derived ontology"
    );
    Ok(ontology)
}

fn property_range(schema: &SchemaDefinition, range: &Range) -> Option<Iri> {
    match range {
        Range::Class(name) => schema.class(name).map(|class| class.class_uri.clone()),
        Range::Enum(_) => Iri::new(vocab::xsd::STRING).ok(),
        Range::Primitive(primitive) => Iri::new(primitive.xsd()).ok(),
    }
}

fn restrictions(schema: &SchemaDefinition, slot: &SlotDefinition) -> Vec<Restriction> {
    let property = slot.slot_uri.clone();
    let mut restrictions = Vec::new();
    if slot.required {
        restrictions.push(Restriction::MinCardinality {
            property: property.clone(),
            cardinality: 1,
        });
    }
    if !slot.multivalued {
        restrictions.push(Restriction::MaxCardinality {
            property: property.clone(),
            cardinality: 1,
        });
    }
    match &slot.range {
        Range::Primitive(primitive)
            if slot.minimum_value.is_some() || slot.maximum_value.is_some() =>
        {
            if let Ok(datatype) = Iri::new(primitive.xsd()) {
                restrictions.push(Restriction::AllValuesFrom {
                    property,
                    range: DataRangeSpec::Bounded {
                        datatype,
                        minimum: slot
                            .minimum_value
                            .map(|value| bound_lexical(*primitive, value, f64::ceil)),
                        maximum: slot
                            .maximum_value
                            .map(|value| bound_lexical(*primitive, value, f64::floor)),
                    },
                });
            }
        }
        Range::Enum(name) => {
            if let Some(definition) = schema.enumeration(name) {
                restrictions.push(Restriction::AllValuesFrom {
                    property,
                    range: DataRangeSpec::OneOf(definition.permissible_values.clone()),
                });
            }
        }
        _ => {}
    }
    restrictions
}

/// Renders a numeric bound in the lexical space of `primitive`.
///
/// Integer bounds are rounded inwards with `round`, so the restriction admits
/// exactly the integers the validator accepts.
fn bound_lexical(primitive: Primitive, value: f64, round: fn(f64) -> f64) -> String {
    match primitive {
        Primitive::Integer => format!("{}", round(value) + 0.0),
        _ if value.fract() == 0.0 => format!("{value:.1}"),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    const PERSONINFO: &str = r#"
id: https://w3id.org/linkml/examples/personinfo
name: personinfo
prefixes:
  personinfo: https://w3id.org/linkml/examples/personinfo/
  linkml: https://w3id.org/linkml/
default_prefix: personinfo
default_range: string
classes:
  NamedThing:
    abstract: true
    attributes:
      id:
        identifier: true
      full_name:
        required: true
  Person:
    is_a: NamedThing
    id_prefixes:
      - ORCID
    attributes:
      age:
        range: integer
        minimum_value: 0
        maximum_value: 120
      knows:
        range: Person
        multivalued: true
      status:
        range: LivingStatus
  Organization:
    is_a: NamedThing
    attributes:
      members:
        range: Person
        multivalued: true
enums:
  LivingStatus:
    permissible_values:
      LIVING:
      DEAD:
"#;

    #[test]
    fn compiles_classes_with_inheritance() {
        let schema = compile(PERSONINFO).expect("valid schema");
        assert_eq!(schema.classes.len(), 3);
        assert_eq!(
            schema.default_namespace,
            "https://w3id.org/linkml/examples/personinfo/"
        );
        let person = schema.class("Person").expect("person");
        assert_eq!(
            person.class_uri.as_str(),
            "https://w3id.org/linkml/examples/personinfo/Person"
        );
        assert_eq!(person.parent_name(), Some("NamedThing"));
        assert_eq!(
            schema.identifier_slot("Person").map(|slot| slot.name.as_str()),
            Some("id")
        );
        assert!(schema.induced_attributes("Person").contains_key("full_name"));
        assert_eq!(schema.id_prefixes("Person"), ["ORCID".to_string()]);
    }

    #[test]
    fn reports_every_missing_identity_field() {
        let err = compile("classes: {}").expect_err("missing fields");
        assert_snapshot!(err.to_string(), @r"
        Schema does not have a top level id
        Schema does not have a top level name
        ");
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn rejects_text_that_is_not_yaml() {
        let err = compile("id: [unclosed").expect_err("invalid yaml");
        assert!(matches!(err, SchemaSyntaxError::Yaml(_)));
        assert!(err.to_string().starts_with("Schema is not valid yaml"));
    }

    #[test]
    fn collects_all_structural_problems() {
        let text = r"
id: https://example.org/broken
name: broken
classes:
  A:
    is_a: Missing
    attributes:
      size:
        range: Unknown
      code:
        pattern: '(['
      score:
        range: integer
        minimum_value: 10
        maximum_value: 1
      colour:
        favourite: true
";
        let err = compile(text).expect_err("broken schema");
        let messages = err.messages();
        assert!(messages
            .iter()
            .any(|message| message.contains("undeclared parent `Missing`")));
        assert!(messages
            .iter()
            .any(|message| message.contains("unknown range `Unknown`")));
        assert!(messages
            .iter()
            .any(|message| message.contains("invalid pattern")));
        assert!(messages
            .iter()
            .any(|message| message.contains("greater than maximum_value")));
        assert!(messages
            .iter()
            .any(|message| message.contains("unknown key `favourite`")));
    }

    #[test]
    fn rejects_cycles_and_duplicate_identifiers() {
        let text = r"
id: https://example.org/cycle
name: cycle
classes:
  A:
    is_a: B
  B:
    is_a: A
  Keyed:
    attributes:
      first:
        identifier: true
  Twice:
    is_a: Keyed
    attributes:
      second:
        identifier: true
";
        let err = compile(text).expect_err("cycle");
        assert_eq!(err.messages(), vec!["cyclic is_a chain through A, B".to_string()]);

        let text = text.replace("is_a: B", "description: fine").replace("is_a: A", "description: fine");
        let err = compile(&text).expect_err("two identifiers");
        assert!(err.messages()[0].contains("more than one identifier"));
    }

    #[test]
    fn external_parents_need_a_declared_prefix() {
        let text = r"
id: https://example.org/bio
name: bio
prefixes:
  obo: http://purl.obolibrary.org/obo/
classes:
  Gene:
    is_a: obo:SO_0000704
";
        let schema = compile(text).expect("external parent");
        assert!(matches!(
            schema.class("Gene").and_then(|class| class.is_a.clone()),
            Some(ParentRef::External(iri)) if iri.as_str() == "http://purl.obolibrary.org/obo/SO_0000704"
        ));

        let err = compile(&text.replace("obo:SO", "nope:SO")).expect_err("undeclared prefix");
        assert!(err.messages()[0].contains("undeclared parent"));
    }

    #[test]
    fn custom_types_fold_into_slots() {
        let text = r"
id: https://example.org/typed
name: typed
types:
  Percentage:
    typeof: float
    minimum_value: 0
    maximum_value: 100
classes:
  Measurement:
    attributes:
      value:
        range: Percentage
";
        let schema = compile(text).expect("typed schema");
        let slot = &schema.class("Measurement").expect("class").attributes["value"];
        assert_eq!(slot.range, Range::Primitive(Primitive::Float));
        assert_eq!(slot.maximum_value, Some(100.0));
    }

    #[test]
    fn derives_one_owl_class_per_schema_class() {
        let schema = compile(PERSONINFO).expect("valid schema");
        let ontology = derive_ontology(&schema).expect("ontology");
        assert_eq!(ontology.classes().len(), schema.classes.len());
        assert_eq!(ontology.subclass_axioms().count(), 2);

        let knows = ontology
            .property(&Iri::new("https://w3id.org/linkml/examples/personinfo/knows").expect("iri"))
            .expect("object property");
        assert_eq!(knows.kind(), PropertyKind::Object);
        assert!(knows
            .ranges()
            .iter()
            .any(|range| range.local_name() == "Person"));

        let age = Iri::new("https://w3id.org/linkml/examples/personinfo/age").expect("iri");
        assert_eq!(
            ontology.property(&age).map(Property::kind),
            Some(PropertyKind::Data)
        );
        assert!(ontology
            .property(&Iri::new("https://w3id.org/linkml/examples/personinfo/id").expect("iri"))
            .is_none());

        let person = ontology
            .class(&Iri::new("https://w3id.org/linkml/examples/personinfo/Person").expect("iri"))
            .expect("person");
        assert!(person.restrictions().contains(&Restriction::AllValuesFrom {
            property: age,
            range: DataRangeSpec::Bounded {
                datatype: Iri::new(vocab::xsd::INTEGER).expect("iri"),
                minimum: Some("0".to_string()),
                maximum: Some("120".to_string()),
            },
        }));
    }

    #[test]
    fn fractional_integer_bounds_round_inwards() {
        assert_eq!(bound_lexical(Primitive::Integer, 0.5, f64::ceil), "1");
        assert_eq!(bound_lexical(Primitive::Integer, -0.5, f64::ceil), "0");
        assert_eq!(bound_lexical(Primitive::Integer, 120.7, f64::floor), "120");
        assert_eq!(bound_lexical(Primitive::Float, 0.5, f64::ceil), "0.5");
        assert_eq!(bound_lexical(Primitive::Float, 2.0, f64::floor), "2.0");
    }

    #[tokio::test]
    async fn saves_only_valid_schemas() {
        let store = WorkingStore::in_memory().expect("store");
        compile_and_save(PERSONINFO, &store, "schema.yaml")
            .await
            .expect("saved");
        assert_eq!(
            store.read("schema.yaml").await.expect("read"),
            PERSONINFO
        );

        let result = compile_and_save("name: only", &store, "broken.yaml").await;
        assert!(result.is_err());
        assert!(!store.exists("broken.yaml").await.expect("exists"));
    }
}

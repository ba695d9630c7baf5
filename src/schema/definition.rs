//! Compiled schema model.
//!
//! A [`SchemaDefinition`] is the validated, fully resolved form of a schema
//! document: every range points at a primitive, a declared class or a
//! declared enum, every parent exists and every custom type has been folded
//! into the slots that use it. Validators walk this tree directly instead of
//! generating code per schema.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use regex::Regex;

use crate::ontology::{vocab::xsd, Iri, PrefixMap};

/// Built-in value types available to every schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    String,
    Integer,
    Float,
    Double,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Uri,
    UriOrCurie,
    Curie,
    NcName,
}

impl Primitive {
    const ALL: [Self; 13] = [
        Self::String,
        Self::Integer,
        Self::Float,
        Self::Double,
        Self::Decimal,
        Self::Boolean,
        Self::Date,
        Self::DateTime,
        Self::Time,
        Self::Uri,
        Self::UriOrCurie,
        Self::Curie,
        Self::NcName,
    ];

    /// Resolves a primitive by its schema name (`string`, `integer`, ...).
    ///
    /// `linkml:`-prefixed names are accepted as well.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("linkml:").unwrap_or(name);
        Self::ALL.into_iter().find(|primitive| primitive.name() == name)
    }

    /// Returns the schema name of the primitive.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Uri => "uri",
            Self::UriOrCurie => "uriorcurie",
            Self::Curie => "curie",
            Self::NcName => "ncname",
        }
    }

    /// Returns the XSD datatype the primitive maps to.
    #[must_use]
    pub fn xsd(self) -> &'static str {
        match self {
            Self::String | Self::Curie | Self::NcName => xsd::STRING,
            Self::Integer => xsd::INTEGER,
            Self::Float => xsd::FLOAT,
            Self::Double => xsd::DOUBLE,
            Self::Decimal => xsd::DECIMAL,
            Self::Boolean => xsd::BOOLEAN,
            Self::Date => xsd::DATE,
            Self::DateTime => xsd::DATE_TIME,
            Self::Time => xsd::TIME,
            Self::Uri | Self::UriOrCurie => xsd::ANY_URI,
        }
    }

    /// Returns `true` for primitives that accept numeric bounds.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Float | Self::Double | Self::Decimal
        )
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved value range of a slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Range {
    Primitive(Primitive),
    Class(String),
    Enum(String),
}

impl Range {
    /// Returns `true` when values are references to other instances.
    #[must_use]
    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Class(_))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(primitive) => write!(f, "{primitive}"),
            Self::Class(name) | Self::Enum(name) => f.write_str(name),
        }
    }
}

/// Compiled regular expression attached to a slot.
#[derive(Clone, Debug)]
pub struct SlotPattern(Regex);

impl SlotPattern {
    pub(crate) fn new(regex: Regex) -> Self {
        Self(regex)
    }

    /// Returns the source of the expression.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Tests a lexical value against the expression.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }
}

impl PartialEq for SlotPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Constraints on one attribute of a class.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotDefinition {
    pub name: String,
    pub slot_uri: Iri,
    pub range: Range,
    pub required: bool,
    pub multivalued: bool,
    pub identifier: bool,
    pub minimum_value: Option<f64>,
    pub maximum_value: Option<f64>,
    pub pattern: Option<SlotPattern>,
    pub inlined: bool,
    pub description: Option<String>,
}

/// Parent link of a class: another declared class or an imported term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParentRef {
    Declared(String),
    External(Iri),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDefinition {
    pub name: String,
    pub class_uri: Iri,
    pub is_a: Option<ParentRef>,
    pub is_abstract: bool,
    pub tree_root: bool,
    pub description: Option<String>,
    /// Attributes declared (or refined) on this class, excluding inherited ones.
    pub attributes: BTreeMap<String, SlotDefinition>,
    pub id_prefixes: Vec<String>,
}

impl ClassDefinition {
    /// Name of the declared parent class, if the parent is not external.
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        match &self.is_a {
            Some(ParentRef::Declared(name)) => Some(name),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDefinition {
    pub name: String,
    pub permissible_values: Vec<String>,
    pub description: Option<String>,
}

impl EnumDefinition {
    #[must_use]
    pub fn permits(&self, value: &str) -> bool {
        self.permissible_values.iter().any(|allowed| allowed == value)
    }
}

/// Validated in-memory schema model.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaDefinition {
    pub id: Iri,
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    pub prefixes: PrefixMap,
    pub default_prefix: Option<String>,
    /// Namespace used to mint class and slot IRIs.
    pub default_namespace: String,
    pub imports: Vec<String>,
    pub classes: BTreeMap<String, ClassDefinition>,
    pub enums: BTreeMap<String, EnumDefinition>,
}

impl SchemaDefinition {
    /// Looks up a class by name.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassDefinition> {
        self.classes.get(name)
    }

    /// Looks up a class by its IRI.
    #[must_use]
    pub fn class_by_uri(&self, uri: &str) -> Option<&ClassDefinition> {
        self.classes
            .values()
            .find(|class| class.class_uri.as_str() == uri)
    }

    /// Looks up an enum by name.
    #[must_use]
    pub fn enumeration(&self, name: &str) -> Option<&EnumDefinition> {
        self.enums.get(name)
    }

    /// Returns the declared ancestors of `class`, nearest first.
    #[must_use]
    pub fn ancestors(&self, class: &str) -> Vec<&ClassDefinition> {
        let mut visited = BTreeSet::new();
        let mut result = Vec::new();
        let mut current = self.class(class).and_then(ClassDefinition::parent_name);
        while let Some(name) = current {
            if !visited.insert(name) {
                break;
            }
            let Some(parent) = self.class(name) else {
                break;
            };
            result.push(parent);
            current = parent.parent_name();
        }
        result
    }

    /// Returns the transitive subclasses of `class` in breadth-first order.
    #[must_use]
    pub fn descendants(&self, class: &str) -> Vec<&ClassDefinition> {
        let mut visited = BTreeSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::from([class]);
        while let Some(current) = queue.pop_front() {
            for candidate in self.classes.values() {
                if candidate.parent_name() == Some(current) && visited.insert(candidate.name.as_str())
                {
                    result.push(candidate);
                    queue.push_back(candidate.name.as_str());
                }
            }
        }
        result
    }

    /// Returns `true` if `candidate` is `class` or one of its subclasses.
    #[must_use]
    pub fn is_same_or_subclass(&self, candidate: &str, class: &str) -> bool {
        candidate == class
            || self
                .ancestors(candidate)
                .iter()
                .any(|ancestor| ancestor.name == class)
    }

    /// Collects the attributes that apply to `class`, including inherited ones.
    ///
    /// A refinement on a subclass replaces the inherited definition.
    #[must_use]
    pub fn induced_attributes(&self, class: &str) -> BTreeMap<&str, &SlotDefinition> {
        let mut chain = self.ancestors(class);
        chain.reverse();
        if let Some(own) = self.class(class) {
            chain.push(own);
        }
        let mut attributes = BTreeMap::new();
        for definition in chain {
            for (name, slot) in &definition.attributes {
                attributes.insert(name.as_str(), slot);
            }
        }
        attributes
    }

    /// Returns the identifier attribute of `class`, inherited or own.
    #[must_use]
    pub fn identifier_slot(&self, class: &str) -> Option<&SlotDefinition> {
        self.induced_attributes(class)
            .into_values()
            .find(|slot| slot.identifier)
    }

    /// Returns the grounding prefixes of `class`, falling back to ancestors.
    #[must_use]
    pub fn id_prefixes(&self, class: &str) -> &[String] {
        std::iter::once(self.class(class))
            .flatten()
            .chain(self.ancestors(class))
            .map(|definition| definition.id_prefixes.as_slice())
            .find(|prefixes| !prefixes.is_empty())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::Primitive;
    use crate::ontology::vocab::xsd;

    #[rstest]
    #[case("string", Some(Primitive::String))]
    #[case("integer", Some(Primitive::Integer))]
    #[case("linkml:datetime", Some(Primitive::DateTime))]
    #[case("uriorcurie", Some(Primitive::UriOrCurie))]
    #[case("Person", None)]
    fn resolves_primitive_names(#[case] name: &str, #[case] expected: Option<Primitive>) {
        assert_eq!(Primitive::from_name(name), expected);
    }

    #[test]
    fn primitives_map_to_xsd() {
        assert_eq!(Primitive::Integer.xsd(), xsd::INTEGER);
        assert_eq!(Primitive::Uri.xsd(), xsd::ANY_URI);
        assert!(Primitive::Decimal.is_numeric());
        assert!(!Primitive::Boolean.is_numeric());
    }
}

//! The OWL projection of a compiled schema.
//!
//! [`OntologyModel`] is assembled once by the schema compiler and only read
//! afterwards. Every property must point at declared classes so that the
//! serialised ontology never mentions an undeclared class.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::value_objects::Iri;

/// `rdfs:label` / `rdfs:comment` pair shared by every ontology entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Annotations {
    label: Option<String>,
    comment: Option<String>,
}

/// A named OWL class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Class {
    id: Iri,
    annotations: Annotations,
    parents: BTreeSet<Iri>,
    restrictions: Vec<Restriction>,
}

impl Class {
    #[must_use]
    pub fn new(id: Iri) -> Self {
        Self {
            id,
            annotations: Annotations::default(),
            parents: BTreeSet::new(),
            restrictions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.annotations.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.annotations.comment = Some(comment.into());
        self
    }

    /// Records an `rdfs:subClassOf` edge; `false` when it was already known.
    pub fn add_parent(&mut self, parent: Iri) -> bool {
        self.parents.insert(parent)
    }

    #[must_use]
    pub fn id(&self) -> &Iri {
        &self.id
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.annotations.label.as_deref()
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.annotations.comment.as_deref()
    }

    #[must_use]
    pub fn parents(&self) -> &BTreeSet<Iri> {
        &self.parents
    }

    /// Anonymous superclasses, in the order the compiler attached them.
    #[must_use]
    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }
}

/// An `owl:ObjectProperty` or `owl:DatatypeProperty`.
///
/// Several domains mean the property is shared by several schema classes and
/// is serialised with a union domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    id: Iri,
    annotations: Annotations,
    kind: PropertyKind,
    domain: BTreeSet<Iri>,
    range: BTreeSet<Iri>,
}

impl Property {
    #[must_use]
    pub fn new(id: Iri, kind: PropertyKind) -> Self {
        Self {
            id,
            annotations: Annotations::default(),
            kind,
            domain: BTreeSet::new(),
            range: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.annotations.label = Some(label.into());
        self
    }

    pub fn add_domain(&mut self, class: Iri) -> bool {
        self.domain.insert(class)
    }

    /// A class for object properties, a datatype for data properties.
    pub fn add_range(&mut self, range: Iri) -> bool {
        self.range.insert(range)
    }

    #[must_use]
    pub fn id(&self) -> &Iri {
        &self.id
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.annotations.label.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    #[must_use]
    pub fn domains(&self) -> &BTreeSet<Iri> {
        &self.domain
    }

    #[must_use]
    pub fn ranges(&self) -> &BTreeSet<Iri> {
        &self.range
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    /// Relates two individuals.
    Object,
    /// Relates an individual to a literal.
    Data,
}

/// Anonymous superclass restriction attached to a class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Restriction {
    /// Every instance has at least `cardinality` values for `property`.
    MinCardinality { property: Iri, cardinality: u32 },
    /// Every instance has at most `cardinality` values for `property`.
    MaxCardinality { property: Iri, cardinality: u32 },
    /// Every value of `property` falls into `range`.
    AllValuesFrom { property: Iri, range: DataRangeSpec },
}

impl Restriction {
    #[must_use]
    pub fn property(&self) -> &Iri {
        match self {
            Self::MinCardinality { property, .. }
            | Self::MaxCardinality { property, .. }
            | Self::AllValuesFrom { property, .. } => property,
        }
    }
}

/// Literal value space used by [`Restriction::AllValuesFrom`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataRangeSpec {
    /// Numeric datatype with optional inclusive bounds (lexical forms).
    Bounded {
        datatype: Iri,
        minimum: Option<String>,
        maximum: Option<String>,
    },
    /// Enumerated string values.
    OneOf(Vec<String>),
}

/// Derived, read-only projection of a schema into description-logic primitives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OntologyModel {
    id: Iri,
    annotations: Annotations,
    classes: BTreeMap<Iri, Class>,
    properties: BTreeMap<Iri, Property>,
}

impl OntologyModel {
    #[must_use]
    pub fn new(id: Iri) -> Self {
        Self {
            id,
            annotations: Annotations::default(),
            classes: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.annotations.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.annotations.comment = Some(comment.into());
        self
    }

    /// # Errors
    ///
    /// Fails when a class with the same IRI was already added.
    pub fn add_class(&mut self, class: Class) -> Result<(), OntologyError> {
        if self.classes.contains_key(class.id()) {
            return Err(OntologyError::DuplicateClass(class.id));
        }
        self.classes.insert(class.id.clone(), class);
        Ok(())
    }

    /// # Errors
    ///
    /// Fails on a duplicate IRI, an undeclared domain class or, for object
    /// properties, an undeclared range class. Data property ranges are
    /// datatypes and are not looked up.
    pub fn add_property(&mut self, property: Property) -> Result<(), OntologyError> {
        if self.properties.contains_key(property.id()) {
            return Err(OntologyError::DuplicateProperty(property.id));
        }
        let referenced = match property.kind {
            PropertyKind::Object => property.domain.iter().chain(property.range.iter()).collect::<Vec<_>>(),
            PropertyKind::Data => property.domain.iter().collect(),
        };
        if let Some(missing) = referenced.into_iter().find(|class| !self.classes.contains_key(*class)) {
            return Err(self.missing_class(missing));
        }
        self.properties.insert(property.id.clone(), property);
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when the class or the restricted property is not declared.
    pub fn add_restriction(
        &mut self,
        class: &Iri,
        restriction: Restriction,
    ) -> Result<(), OntologyError> {
        if !self.properties.contains_key(restriction.property()) {
            return Err(OntologyError::MissingProperty {
                ontology: self.id.clone(),
                property: restriction.property().clone(),
            });
        }
        if !self.classes.contains_key(class) {
            return Err(self.missing_class(class));
        }
        if let Some(target) = self.classes.get_mut(class) {
            target.restrictions.push(restriction);
        }
        Ok(())
    }

    fn missing_class(&self, class: &Iri) -> OntologyError {
        OntologyError::MissingClass {
            ontology: self.id.clone(),
            class: class.clone(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &Iri {
        &self.id
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.annotations.label.as_deref()
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.annotations.comment.as_deref()
    }

    #[must_use]
    pub fn class(&self, id: &Iri) -> Option<&Class> {
        self.classes.get(id)
    }

    #[must_use]
    pub fn property(&self, id: &Iri) -> Option<&Property> {
        self.properties.get(id)
    }

    #[must_use]
    pub fn classes(&self) -> &BTreeMap<Iri, Class> {
        &self.classes
    }

    #[must_use]
    pub fn properties(&self) -> &BTreeMap<Iri, Property> {
        &self.properties
    }

    pub fn object_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties_of(PropertyKind::Object)
    }

    pub fn data_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties_of(PropertyKind::Data)
    }

    fn properties_of(&self, kind: PropertyKind) -> impl Iterator<Item = &Property> {
        self.properties
            .values()
            .filter(move |property| property.kind == kind)
    }

    /// `(child, parent)` pairs, one per `rdfs:subClassOf` edge.
    pub fn subclass_axioms(&self) -> impl Iterator<Item = (&Iri, &Iri)> {
        self.classes
            .values()
            .flat_map(|class| class.parents.iter().map(move |parent| (&class.id, parent)))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OntologyError {
    #[error("class `{0}` is declared twice")]
    DuplicateClass(Iri),
    #[error("property `{0}` is declared twice")]
    DuplicateProperty(Iri),
    /// A property or restriction names a class the ontology does not declare.
    #[error("ontology `{ontology}` does not declare class `{class}`")]
    MissingClass { ontology: Iri, class: Iri },
    /// A restriction names a property the ontology does not declare.
    #[error("ontology `{ontology}` does not declare property `{property}`")]
    MissingProperty { ontology: Iri, property: Iri },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::vocab::xsd;

    fn people(local: &str) -> Iri {
        Iri::new(format!("https://example.org/people/{local}")).expect("valid iri")
    }

    fn with_person() -> OntologyModel {
        let mut ontology = OntologyModel::new(people("")).with_label("people");
        ontology
            .add_class(Class::new(people("Person")).with_label("Person"))
            .expect("person");
        ontology
    }

    #[test]
    fn classes_are_unique_and_annotated() {
        let mut ontology = with_person();
        let err = ontology
            .add_class(Class::new(people("Person")))
            .expect_err("duplicate");
        assert_eq!(
            err.to_string(),
            "class `https://example.org/people/Person` is declared twice"
        );

        let mut employee = Class::new(people("Employee")).with_comment("Someone with an employer");
        assert!(employee.add_parent(people("Person")));
        assert!(!employee.add_parent(people("Person")));
        ontology.add_class(employee).expect("employee");

        let employee = ontology.class(&people("Employee")).expect("declared");
        assert_eq!(employee.comment(), Some("Someone with an employer"));
        assert_eq!(employee.label(), None);
        assert_eq!(
            ontology.subclass_axioms().collect::<Vec<_>>(),
            vec![(&people("Employee"), &people("Person"))]
        );
    }

    #[test]
    fn object_property_ranges_must_be_declared() {
        let mut ontology = with_person();
        let mut employer = Property::new(people("employer"), PropertyKind::Object);
        employer.add_domain(people("Person"));
        employer.add_range(people("Organization"));
        let err = ontology.add_property(employer).expect_err("undeclared range");
        assert_eq!(
            err,
            OntologyError::MissingClass {
                ontology: people(""),
                class: people("Organization"),
            }
        );

        let mut age = Property::new(people("age"), PropertyKind::Data).with_label("age");
        age.add_domain(people("Person"));
        age.add_range(Iri::new(xsd::INTEGER).expect("xsd"));
        ontology.add_property(age).expect("datatype ranges are not classes");
        assert_eq!(ontology.data_properties().count(), 1);
        assert_eq!(ontology.object_properties().count(), 0);
    }

    #[test]
    fn restrictions_need_a_declared_property() {
        let mut ontology = with_person();
        let bounded_age = Restriction::AllValuesFrom {
            property: people("age"),
            range: DataRangeSpec::Bounded {
                datatype: Iri::new(xsd::INTEGER).expect("xsd"),
                minimum: Some("0".into()),
                maximum: Some("120".into()),
            },
        };
        assert!(matches!(
            ontology.add_restriction(&people("Person"), bounded_age.clone()),
            Err(OntologyError::MissingProperty { .. })
        ));

        ontology
            .add_property(Property::new(people("age"), PropertyKind::Data))
            .expect("age");
        ontology
            .add_restriction(&people("Person"), bounded_age.clone())
            .expect("restriction");
        assert_eq!(
            ontology
                .class(&people("Person"))
                .map(Class::restrictions),
            Some(&[bounded_age][..])
        );
    }
}

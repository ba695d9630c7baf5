//! Core ontology domain primitives.
//!
//! The module defines value objects and the [`OntologyModel`] aggregate, the
//! OWL projection of a compiled schema. The model is derived once per check,
//! never mutated afterwards and serialised on demand through [`owl`].

pub mod entities;
pub mod literals;
pub mod owl;
pub mod value_objects;
pub mod vocab;

pub use entities::{
    Class, DataRangeSpec, OntologyError, OntologyModel, Property, PropertyKind, Restriction,
};
pub use owl::{write_rdf_xml, SerializeError};
pub use value_objects::{Iri, IriError, PrefixMap};

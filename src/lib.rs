//! # ontoforge
//!
//! Schema-driven validation of extracted knowledge. A YAML schema is compiled
//! into a [`schema::SchemaDefinition`] and projected to an OWL ontology;
//! proposed facts are validated against the schema, checked for logical
//! consistency with everything accepted so far and appended to a persisted
//! fact store only when both checks pass.
//!
//! ```no_run
//! use ontoforge::{config::Config, session::KnowledgeExtractionSession};
//!
//! # async fn run() -> ontoforge::Result<()> {
//! let config = Config::from_file("config/development.yaml")?;
//! ontoforge::logger::init(&config.logger);
//! let session = KnowledgeExtractionSession::from_config(&config).await?;
//! println!("schema `{}` loaded", session.schema().name);
//! # Ok(())
//! # }
//! ```

pub use self::errors::{Error, Result};

pub mod config;
pub mod consistency;
pub mod data;
pub mod errors;
pub mod extraction;
pub mod logger;
pub mod ontology;
pub mod reasoner;
pub mod report;
#[cfg(feature = "retrieval")]
pub mod retrieval;
pub mod schema;
pub mod session;
pub mod workdir;

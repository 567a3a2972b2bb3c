//! Cellgraph - projects annotated record graphs into spreadsheet cells and templates
//!
//! Classes are declared in a schema (usually YAML) whose fields carry export
//! annotations. The engine decides per export target which fields take part,
//! builds record skeletons generically, resolves dotted property paths and
//! `{{ }}` placeholders against loosely typed contexts, and caches per-class
//! metadata so large exports never rediscover structure per row.
//!
//! # Features
//!
//! - Target-scoped export names (`"Name_1,FullName_2"`)
//! - Shared, thread-safe class metadata cache
//! - Object graph construction with a nesting guard
//! - Property paths and formula placeholders (`{{=price * qty}}`)
//! - Image format sniffing and `.xlsx` output
//!
//! # Example
//!
//! ```no_run
//! use cellgraph::builder::ObjectGraphBuilder;
//! use cellgraph::metadata::MetadataCache;
//! use cellgraph::schema::SchemaRegistry;
//! use cellgraph::template::render_with_context;
//! use cellgraph::types::Value;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(SchemaRegistry::from_path(Path::new("schema.yaml"))?);
//! let cache = MetadataCache::new(registry);
//!
//! let mut person = ObjectGraphBuilder::new(&cache).build_record("Person", Some("1"))?;
//! person.set("name", "Sam")?;
//!
//! let context = Value::map([("person", Value::Record(person))]);
//! let text = render_with_context("Dear {{person.name}},", &context)?;
//! println!("{}", text);
//! # Ok::<(), cellgraph::error::ProjectionError>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod filter;
pub mod image;
pub mod metadata;
pub mod resolver;
pub mod schema;
pub mod template;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use error::{ProjectionError, ProjectionResult};
pub use types::{ListEntity, Record, Value};

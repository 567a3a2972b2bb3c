//! Generic construction of record graphs for an export target

use crate::config::EngineConfig;
use crate::error::{ProjectionError, ProjectionResult};
use crate::filter::include;
use crate::metadata::{FieldDescriptor, MetadataCache};
use crate::schema::declared_type::LibraryType;
use crate::schema::{CollectionKind, DeclaredType, TypeClass};
use crate::types::{Record, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Builds empty record skeletons: every composite field that participates in
/// the target is itself constructed, every collection field gets an empty
/// collection of its annotated kind
pub struct ObjectGraphBuilder<'a> {
    cache: &'a MetadataCache,
    max_depth: usize,
}

impl<'a> ObjectGraphBuilder<'a> {
    pub fn new(cache: &'a MetadataCache) -> Self {
        Self::with_config(cache, &EngineConfig::default())
    }

    pub fn with_config(cache: &'a MetadataCache, config: &EngineConfig) -> Self {
        Self {
            cache,
            max_depth: config.max_build_depth,
        }
    }

    /// Build an instance of `type_name` for `target`
    ///
    /// `map` yields an empty mapping; a schema class yields a record graph.
    /// Any failure aborts the whole build with a single construction error.
    pub fn build(&self, type_name: &str, target: Option<&str>) -> ProjectionResult<Value> {
        let result = DeclaredType::parse(type_name)
            .and_then(|ty| self.build_type(&ty, target, 0))
            .map_err(|e| match e {
                ProjectionError::ObjectConstruction { .. } => e,
                other => ProjectionError::ObjectConstruction {
                    class: type_name.to_string(),
                    reason: other.to_string(),
                },
            });

        if let Err(e) = &result {
            error!(class = type_name, target = ?target, "{}", e);
        }
        result
    }

    /// Build a schema class and return the record itself
    pub fn build_record(&self, class_name: &str, target: Option<&str>) -> ProjectionResult<Record> {
        match self.build(class_name, target)? {
            Value::Record(record) => Ok(record),
            other => Err(ProjectionError::ObjectConstruction {
                class: class_name.to_string(),
                reason: format!("expected a class, built a {}", other.kind_name()),
            }),
        }
    }

    fn build_type(
        &self,
        ty: &DeclaredType,
        target: Option<&str>,
        depth: usize,
    ) -> ProjectionResult<Value> {
        match ty {
            DeclaredType::Library(LibraryType::Map) => Ok(Value::Map(BTreeMap::new())),
            DeclaredType::Named(name) if self.cache.registry().class(name).is_some() => self
                .build_class(name, target, depth)
                .map(Value::Record),
            other => Err(ProjectionError::ObjectConstruction {
                class: other.to_string(),
                reason: "type cannot be instantiated".to_string(),
            }),
        }
    }

    fn build_class(
        &self,
        class_name: &str,
        target: Option<&str>,
        depth: usize,
    ) -> ProjectionResult<Record> {
        if depth > self.max_depth {
            return Err(ProjectionError::ObjectConstruction {
                class: class_name.to_string(),
                reason: format!(
                    "nesting deeper than {} levels (cyclic class graph?)",
                    self.max_depth
                ),
            });
        }

        let metadata = self.cache.from_cache(class_name).map_err(|e| {
            ProjectionError::ObjectConstruction {
                class: class_name.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut record = Record::new(Arc::clone(&metadata));
        for field in metadata.fields() {
            if !include(field, None, target) {
                continue;
            }
            match field.class {
                TypeClass::Collection => {
                    record.set(&field.name, Value::empty_collection(collection_kind(field)))?
                }
                TypeClass::Composite => {
                    let child = self.build_type(&field.ty, target, depth + 1)?;
                    record.set(&field.name, child)?;
                }
                TypeClass::Scalar | TypeClass::Enum => {}
            }
        }

        debug!(class = class_name, depth, "constructed record");
        Ok(record)
    }
}

/// Annotated collection kind, else the kind of the declared type, else a list
fn collection_kind(field: &FieldDescriptor) -> CollectionKind {
    if let Some(kind) = field.annotations.collection.as_ref().and_then(|c| c.kind) {
        return kind;
    }
    match &field.ty {
        DeclaredType::Collection { kind, .. } => *kind,
        _ => CollectionKind::List,
    }
}

//! Per-class field metadata and the shared cache that builds it once

use crate::error::{ProjectionError, ProjectionResult};
use crate::schema::{DeclaredType, ExportAnnotations, SchemaRegistry, TypeClass};
use crate::types::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// One field of a class, including fields inherited from ancestors
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: DeclaredType,
    pub class: TypeClass,
    /// Class that declares the field
    pub owner: String,
    pub annotations: ExportAnnotations,
}

impl FieldDescriptor {
    pub fn zero_value(&self) -> Value {
        self.ty.zero_value()
    }

    pub fn is_inherited_in(&self, class_name: &str) -> bool {
        self.owner != class_name
    }
}

/// Immutable field list and accessor table for one class
#[derive(Debug)]
pub struct ClassMetadata {
    class_name: String,
    fields: Vec<FieldDescriptor>,
    slots: HashMap<String, usize>,
}

impl ClassMetadata {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Own fields first, then each ancestor's, nearest first
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.slot_of(name).map(|slot| &self.fields[slot])
    }

    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    fn build(registry: &SchemaRegistry, class_name: &str) -> ProjectionResult<Self> {
        if registry.class(class_name).is_none() {
            return Err(ProjectionError::UnknownClass(class_name.to_string()));
        }

        let mut fields = Vec::new();
        let mut slots = HashMap::new();
        let mut current = Some(class_name);

        while let Some(owner) = current {
            let class = registry.class(owner).ok_or_else(|| {
                ProjectionError::Schema(format!(
                    "Class '{}' inherits from unknown class '{}'",
                    class_name, owner
                ))
            })?;

            for field in &class.fields {
                if let Some(name) = field.ty.referenced_name() {
                    if registry.class(name).is_none() && !registry.is_enum(name) {
                        return Err(ProjectionError::Schema(format!(
                            "Field '{}.{}' has unknown type '{}'",
                            owner, field.name, name
                        )));
                    }
                }
                if slots.insert(field.name.clone(), fields.len()).is_some() {
                    return Err(ProjectionError::Schema(format!(
                        "Field '{}' of class '{}' is bound more than once",
                        field.name, class_name
                    )));
                }
                fields.push(FieldDescriptor {
                    name: field.name.clone(),
                    ty: field.ty.clone(),
                    class: registry.classify(&field.ty),
                    owner: owner.to_string(),
                    annotations: field.annotations.clone(),
                });
            }

            current = class.extends.as_deref();
        }

        Ok(Self {
            class_name: class_name.to_string(),
            fields,
            slots,
        })
    }
}

/// Shared, lazily populated metadata store keyed by class name
///
/// Each class is built at most once per successful publish: concurrent first
/// lookups may build in parallel, but only the first published instance is
/// ever handed out.
#[derive(Debug)]
pub struct MetadataCache {
    registry: Arc<SchemaRegistry>,
    entries: RwLock<HashMap<String, Arc<ClassMetadata>>>,
}

impl MetadataCache {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn from_cache(&self, class_name: &str) -> ProjectionResult<Arc<ClassMetadata>> {
        if let Some(found) = self.entries.read().get(class_name) {
            trace!(class = class_name, "metadata cache hit");
            return Ok(Arc::clone(found));
        }

        // Build outside the lock; failures are never cached
        let built = Arc::new(ClassMetadata::build(&self.registry, class_name)?);

        let mut entries = self.entries.write();
        let published = entries
            .entry(class_name.to_string())
            .or_insert_with(|| {
                debug!(
                    class = class_name,
                    fields = built.fields.len(),
                    "built class metadata"
                );
                Arc::clone(&built)
            });
        if !Arc::ptr_eq(published, &built) {
            debug!(class = class_name, "discarding metadata built concurrently");
        }
        Ok(Arc::clone(published))
    }

    /// Number of published entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

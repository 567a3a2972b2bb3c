//! Schema declarations: classes, their export annotations, and enumerations
//!
//! Schemas are usually loaded from YAML:
//!
//! ```yaml
//! enums:
//!   Status: [ACTIVE, INACTIVE]
//! classes:
//!   Person:
//!     extends: Base
//!     fields:
//!       - { name: name, type: string, excel: { name: "Name_1,FullName_2" } }
//!       - { name: address, type: Address, entity: { name: address } }
//!       - { name: orders, type: list<Order>, collection: { name: orders } }
//!       - { name: password, type: string, ignore: true }
//! ```

pub mod declared_type;

pub use declared_type::{classify, CollectionKind, DeclaredType, TypeClass};

use crate::error::{ProjectionError, ProjectionResult};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

//==============================================================================
// Export Annotations
//==============================================================================

/// Plain scalar export column
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExcelAttr {
    /// Export name; may encode target-scoped aliases ("alias_target,...")
    #[serde(default)]
    pub name: String,
}

/// Nested composite export
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntityAttr {
    #[serde(default)]
    pub name: String,
}

/// Collection of composites
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CollectionAttr {
    #[serde(default)]
    pub name: String,
    /// Collection implementation instantiated by the object graph builder;
    /// unset means the kind of the declared type (`list<T>`, `set<T>`)
    #[serde(default)]
    pub kind: Option<CollectionKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExportAnnotations {
    /// Never exported, regardless of other annotations
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub excel: Option<ExcelAttr>,
    #[serde(default)]
    pub entity: Option<EntityAttr>,
    #[serde(default)]
    pub collection: Option<CollectionAttr>,
}

//==============================================================================
// Declarations
//==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: DeclaredType,
    #[serde(flatten)]
    pub annotations: ExportAnnotations,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: DeclaredType) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: ExportAnnotations::default(),
        }
    }

    /// Parse the declared type from its schema spelling
    pub fn parse(name: impl Into<String>, ty: &str) -> ProjectionResult<Self> {
        Ok(Self::new(name, DeclaredType::parse(ty)?))
    }

    pub fn ignored(mut self) -> Self {
        self.annotations.ignore = true;
        self
    }

    pub fn excel(mut self, name: impl Into<String>) -> Self {
        self.annotations.excel = Some(ExcelAttr { name: name.into() });
        self
    }

    pub fn entity(mut self, name: impl Into<String>) -> Self {
        self.annotations.entity = Some(EntityAttr { name: name.into() });
        self
    }

    pub fn collection(mut self, name: impl Into<String>, kind: CollectionKind) -> Self {
        self.annotations.collection = Some(CollectionAttr {
            name: name.into(),
            kind: Some(kind),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClassDef {
    /// Parent class whose fields are inherited
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl ClassDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// Raw schema document as written in YAML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub classes: BTreeMap<String, ClassDef>,
}

//==============================================================================
// Registry
//==============================================================================

/// Validated set of class and enumeration declarations
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    classes: HashMap<String, ClassDef>,
    enums: HashMap<String, Vec<String>>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn from_yaml_str(content: &str) -> ProjectionResult<Self> {
        let document: SchemaDocument = serde_yaml::from_str(content)?;
        Self::from_document(document)
    }

    pub fn from_path(path: &Path) -> ProjectionResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_document(document: SchemaDocument) -> ProjectionResult<Self> {
        let registry = Self {
            classes: document.classes.into_iter().collect(),
            enums: document.enums.into_iter().collect(),
        };
        registry.validate()?;
        Ok(registry)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        self.enums.contains_key(name)
    }

    pub fn enum_constants(&self, name: &str) -> Option<&[String]> {
        self.enums.get(name).map(Vec::as_slice)
    }

    /// Class names, sorted
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Classify a declared type against this registry's enumerations
    pub fn classify(&self, ty: &DeclaredType) -> TypeClass {
        classify(ty, |name| self.is_enum(name))
    }

    /// Check name clashes, parent references, and inheritance cycles
    fn validate(&self) -> ProjectionResult<()> {
        for name in self.enums.keys() {
            if self.classes.contains_key(name) {
                return Err(ProjectionError::Schema(format!(
                    "'{}' is declared both as a class and as an enum",
                    name
                )));
            }
        }

        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut nodes = HashMap::new();
        for name in self.classes.keys() {
            nodes.insert(name.as_str(), graph.add_node(name.as_str()));
        }

        for (name, class) in &self.classes {
            let Some(parent) = class.extends.as_deref() else {
                continue;
            };
            if parent == name {
                return Err(ProjectionError::Schema(format!(
                    "Class '{}' extends itself",
                    name
                )));
            }
            let parent_idx = nodes.get(parent).ok_or_else(|| {
                ProjectionError::Schema(format!(
                    "Class '{}' extends unknown class '{}'",
                    name, parent
                ))
            })?;
            graph.add_edge(*parent_idx, nodes[name.as_str()], ());
        }

        toposort(&graph, None).map_err(|cycle| {
            let name = graph.node_weight(cycle.node_id()).copied().unwrap_or("?");
            ProjectionError::Schema(format!("Inheritance cycle involving class '{}'", name))
        })?;

        Ok(())
    }
}

/// Programmatic schema construction
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    document: SchemaDocument,
    duplicates: Vec<String>,
}

impl SchemaBuilder {
    pub fn class(mut self, name: impl Into<String>, class: ClassDef) -> Self {
        let name = name.into();
        if self.document.classes.contains_key(&name) {
            self.duplicates.push(name.clone());
        }
        self.document.classes.insert(name, class);
        self
    }

    pub fn enumeration<I, S>(mut self, name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if self.document.enums.contains_key(&name) {
            self.duplicates.push(name.clone());
        }
        self.document
            .enums
            .insert(name, constants.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> ProjectionResult<SchemaRegistry> {
        if let Some(name) = self.duplicates.first() {
            return Err(ProjectionError::Schema(format!(
                "'{}' is declared more than once",
                name
            )));
        }
        SchemaRegistry::from_document(self.document)
    }
}

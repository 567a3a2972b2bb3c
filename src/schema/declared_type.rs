//! Declared field types and their classification
//!
//! A declared type is written as a string in the schema:
//! - primitives: `bool`, `i32`, `u64`, `f64`, `int`, `long`, `double`, ...
//! - library scalars: `string`, `decimal`, `date`, `datetime`, `uuid`, `map<K, V>`, ...
//! - arrays: `T[]`
//! - collections: `list<T>`, `vec<T>`, `set<T>`, `collection<T>`
//! - anything else names a schema class or enumeration

use crate::error::{ProjectionError, ProjectionResult};
use crate::types::Value;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static GENERIC_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(\w+)\s*<\s*(.+?)\s*>$"));

static IDENT_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$"));

/// Compiled form of a static pattern, compiled on first use
fn pattern(
    lock: &'static LazyLock<Result<Regex, regex::Error>>,
) -> ProjectionResult<&'static Regex> {
    lock.as_ref()
        .map_err(|e| ProjectionError::Schema(format!("Regex error: {}", e)))
}

/// Primitive types, grouped by their zero value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    Integer,
    Float,
}

/// Standard library types that are always leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryType {
    Text,
    Char,
    Decimal,
    BigInt,
    Date,
    Time,
    DateTime,
    Timestamp,
    Duration,
    Uuid,
    Map,
}

/// Collection implementation instantiated for a collection field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    #[default]
    List,
    Set,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum DeclaredType {
    Primitive(Primitive),
    Library(LibraryType),
    Array(Box<DeclaredType>),
    Collection {
        kind: CollectionKind,
        element: Box<DeclaredType>,
    },
    /// Schema class or enumeration
    Named(String),
}

/// How the projection engine treats a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Scalar,
    Collection,
    Composite,
    Enum,
}

impl DeclaredType {
    pub fn parse(text: &str) -> ProjectionResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ProjectionError::Schema("Empty type declaration".to_string()));
        }

        if let Some(component) = text.strip_suffix("[]") {
            return Ok(DeclaredType::Array(Box::new(Self::parse(component)?)));
        }

        if let Some(caps) = pattern(&GENERIC_PATTERN)?.captures(text) {
            let base = &caps[1];
            let args = &caps[2];
            let kind = match base {
                "list" | "vec" | "collection" => CollectionKind::List,
                "set" => CollectionKind::Set,
                // Key/value types are irrelevant for a dynamic bag
                "map" => return Ok(DeclaredType::Library(LibraryType::Map)),
                other => {
                    return Err(ProjectionError::Schema(format!(
                        "Unsupported generic type '{}' in '{}'",
                        other, text
                    )))
                }
            };
            return Ok(DeclaredType::Collection {
                kind,
                element: Box::new(Self::parse(args)?),
            });
        }

        if let Some(primitive) = primitive_named(text) {
            return Ok(DeclaredType::Primitive(primitive));
        }
        if let Some(library) = library_named(text) {
            return Ok(DeclaredType::Library(library));
        }

        if !pattern(&IDENT_PATTERN)?.is_match(text) {
            return Err(ProjectionError::Schema(format!(
                "Invalid type declaration '{}'",
                text
            )));
        }
        Ok(DeclaredType::Named(text.to_string()))
    }

    /// Primitive or library type, directly or as an array of one
    pub fn is_library_scalar(&self) -> bool {
        match self {
            DeclaredType::Primitive(_) | DeclaredType::Library(_) => true,
            DeclaredType::Array(component) => component.is_library_scalar(),
            _ => false,
        }
    }

    /// Named type at the root, if any
    pub fn type_name(&self) -> Option<&str> {
        match self {
            DeclaredType::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Named type referenced anywhere in the declaration
    pub fn referenced_name(&self) -> Option<&str> {
        match self {
            DeclaredType::Named(name) => Some(name),
            DeclaredType::Array(component) => component.referenced_name(),
            DeclaredType::Collection { element, .. } => element.referenced_name(),
            _ => None,
        }
    }

    /// Value a freshly constructed field holds
    pub fn zero_value(&self) -> Value {
        match self {
            DeclaredType::Primitive(Primitive::Bool) => Value::Bool(false),
            DeclaredType::Primitive(Primitive::Integer) => Value::Int(0),
            DeclaredType::Primitive(Primitive::Float) => Value::Float(0.0),
            _ => Value::Null,
        }
    }
}

/// Classify a declared type; `is_enum` tells whether a named type is an enumeration
pub fn classify(ty: &DeclaredType, is_enum: impl Fn(&str) -> bool) -> TypeClass {
    match ty {
        DeclaredType::Primitive(_) | DeclaredType::Library(_) => TypeClass::Scalar,
        DeclaredType::Collection { .. } => TypeClass::Collection,
        DeclaredType::Named(name) if is_enum(name) => TypeClass::Enum,
        DeclaredType::Named(_) => TypeClass::Composite,
        DeclaredType::Array(component) => match classify(component, is_enum) {
            TypeClass::Scalar | TypeClass::Enum => TypeClass::Scalar,
            _ => TypeClass::Composite,
        },
    }
}

fn primitive_named(name: &str) -> Option<Primitive> {
    let primitive = match name {
        "bool" | "boolean" => Primitive::Bool,
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" | "byte" | "short" | "int" | "long" => Primitive::Integer,
        "f32" | "f64" | "float" | "double" => Primitive::Float,
        _ => return None,
    };
    Some(primitive)
}

fn library_named(name: &str) -> Option<LibraryType> {
    let library = match name {
        "string" | "String" | "str" | "text" => LibraryType::Text,
        "char" => LibraryType::Char,
        "decimal" => LibraryType::Decimal,
        "bigint" => LibraryType::BigInt,
        "date" => LibraryType::Date,
        "time" => LibraryType::Time,
        "datetime" => LibraryType::DateTime,
        "timestamp" => LibraryType::Timestamp,
        "duration" => LibraryType::Duration,
        "uuid" => LibraryType::Uuid,
        "map" => LibraryType::Map,
        _ => return None,
    };
    Some(library)
}

impl FromStr for DeclaredType {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeclaredType {
    type Error = ProjectionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredType::Primitive(p) => write!(f, "{}", format!("{p:?}").to_lowercase()),
            DeclaredType::Library(l) => write!(f, "{}", format!("{l:?}").to_lowercase()),
            DeclaredType::Array(component) => write!(f, "{component}[]"),
            DeclaredType::Collection { kind, element } => match kind {
                CollectionKind::List => write!(f, "list<{element}>"),
                CollectionKind::Set => write!(f, "set<{element}>"),
            },
            DeclaredType::Named(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_enums(_: &str) -> bool {
        false
    }

    #[test]
    fn test_parse_primitives_and_library() {
        assert_eq!(
            DeclaredType::parse("i32").unwrap(),
            DeclaredType::Primitive(Primitive::Integer)
        );
        assert_eq!(
            DeclaredType::parse("double").unwrap(),
            DeclaredType::Primitive(Primitive::Float)
        );
        assert_eq!(
            DeclaredType::parse("String").unwrap(),
            DeclaredType::Library(LibraryType::Text)
        );
        assert_eq!(
            DeclaredType::parse("map<string, i32>").unwrap(),
            DeclaredType::Library(LibraryType::Map)
        );
    }

    #[test]
    fn test_parse_nested_generics_and_arrays() {
        let ty = DeclaredType::parse("set<Order[]>").unwrap();
        assert_eq!(
            ty,
            DeclaredType::Collection {
                kind: CollectionKind::Set,
                element: Box::new(DeclaredType::Array(Box::new(DeclaredType::Named(
                    "Order".to_string()
                )))),
            }
        );
        assert_eq!(ty.to_string(), "set<Order[]>");
    }

    #[test]
    fn test_patterns_compile_once() {
        let first = pattern(&GENERIC_PATTERN).unwrap();
        let second = pattern(&GENERIC_PATTERN).unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(pattern(&IDENT_PATTERN).unwrap().is_match("Order_2"));
        for _ in 0..3 {
            assert!(DeclaredType::parse("list<Order>").is_ok());
        }
        assert!(std::ptr::eq(first, pattern(&GENERIC_PATTERN).unwrap()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(DeclaredType::parse("").is_err());
        assert!(DeclaredType::parse("tuple<a>").is_err());
        assert!(DeclaredType::parse("foo bar").is_err());
    }

    #[test]
    fn test_classify_scalars() {
        for text in ["bool", "u8", "f64", "string", "date", "decimal", "map", "i64[]", "string[]"] {
            let ty = DeclaredType::parse(text).unwrap();
            assert_eq!(classify(&ty, no_enums), TypeClass::Scalar, "{}", text);
            assert!(ty.is_library_scalar(), "{}", text);
        }
    }

    #[test]
    fn test_classify_collection_composite_enum() {
        let is_enum = |name: &str| name == "Status";

        let list = DeclaredType::parse("list<Order>").unwrap();
        assert_eq!(classify(&list, is_enum), TypeClass::Collection);

        let named = DeclaredType::parse("Address").unwrap();
        assert_eq!(classify(&named, is_enum), TypeClass::Composite);

        let status = DeclaredType::parse("Status").unwrap();
        assert_eq!(classify(&status, is_enum), TypeClass::Enum);

        let statuses = DeclaredType::parse("Status[]").unwrap();
        assert_eq!(classify(&statuses, is_enum), TypeClass::Scalar);

        let addresses = DeclaredType::parse("Address[]").unwrap();
        assert_eq!(classify(&addresses, is_enum), TypeClass::Composite);
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(DeclaredType::parse("bool").unwrap().zero_value(), Value::Bool(false));
        assert_eq!(DeclaredType::parse("long").unwrap().zero_value(), Value::Int(0));
        assert_eq!(DeclaredType::parse("f32").unwrap().zero_value(), Value::Float(0.0));
        assert_eq!(DeclaredType::parse("string").unwrap().zero_value(), Value::Null);
    }
}

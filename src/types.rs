use crate::error::{ProjectionError, ProjectionResult};
use crate::image::ImageEntity;
use crate::metadata::ClassMetadata;
use crate::schema::CollectionKind;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

//==============================================================================
// Context Values
//==============================================================================

/// Runtime value a property path or placeholder is resolved against
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value; renders as an empty string
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Enumeration constant, by name
    Enum(String),
    List(Vec<Value>),
    /// Distinct values in insertion order
    Set(Vec<Value>),
    /// Key/value bag, filled dynamically by the caller
    Map(BTreeMap<String, Value>),
    /// Instance of a schema class
    Record(Record),
    Image(ImageEntity),
    /// Rows of a class rendered as a nested table
    ListEntity(ListEntity),
}

impl Value {
    /// Build a mapping from key/value pairs
    pub fn map<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Empty collection of the given implementation kind
    pub fn empty_collection(kind: CollectionKind) -> Self {
        match kind {
            CollectionKind::List => Value::List(Vec::new()),
            CollectionKind::Set => Value::Set(Vec::new()),
        }
    }

    /// Append `item` to a list or set and report whether it was added
    ///
    /// Sets refuse values they already hold; other variants refuse everything.
    pub fn push(&mut self, item: Value) -> bool {
        match self {
            Value::List(items) => items.push(item),
            Value::Set(items) if !items.contains(&item) => items.push(item),
            _ => return false,
        }
        true
    }

    /// Collections are atomic: never traversed by property paths
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::List(_) | Value::Set(_) | Value::ListEntity(_))
    }

    /// Values that must not be flattened into template text
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            Value::Image(_) | Value::List(_) | Value::Set(_) | Value::ListEntity(_)
        )
    }

    /// Short name of the variant, for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Image(_) => "image",
            Value::ListEntity(_) => "list entity",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convert parsed JSON into a context value (objects become mappings)
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert any serializable data into a context value
    pub fn from_serialize<T: Serialize>(data: &T) -> ProjectionResult<Self> {
        Ok(Value::from_json(serde_json::to_value(data)?))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            // f64 Display never switches to scientific notation
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) | Value::Enum(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::List(items) | Value::Set(items) => write_list(f, items),
            Value::Map(map) => {
                f.write_str("{")?;
                for (idx, (key, value)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                f.write_str("}")
            }
            Value::Record(record) => write!(f, "{record}"),
            Value::Image(image) => write!(f, "{image}"),
            Value::ListEntity(entity) => write_list(f, &entity.rows),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    f.write_str("[")?;
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<ImageEntity> for Value {
    fn from(image: ImageEntity) -> Self {
        Value::Image(image)
    }
}

impl From<ListEntity> for Value {
    fn from(entity: ListEntity) -> Self {
        Value::ListEntity(entity)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

//==============================================================================
// Records
//==============================================================================

/// Instance of a schema class; slots are addressed through the class metadata
#[derive(Debug, Clone)]
pub struct Record {
    metadata: Arc<ClassMetadata>,
    slots: Vec<Value>,
}

impl Record {
    /// New instance with every field at its zero value
    pub fn new(metadata: Arc<ClassMetadata>) -> Self {
        let slots = metadata.fields().iter().map(|f| f.zero_value()).collect();
        Self { metadata, slots }
    }

    pub fn class_name(&self) -> &str {
        self.metadata.class_name()
    }

    pub fn metadata(&self) -> &Arc<ClassMetadata> {
        &self.metadata
    }

    pub fn get(&self, name: &str) -> ProjectionResult<&Value> {
        let slot = self.slot(name)?;
        Ok(&self.slots[slot])
    }

    pub fn get_mut(&mut self, name: &str) -> ProjectionResult<&mut Value> {
        let slot = self.slot(name)?;
        Ok(&mut self.slots[slot])
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> ProjectionResult<()> {
        let slot = self.slot(name)?;
        self.slots[slot] = value.into();
        Ok(())
    }

    /// Field names and values in metadata order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.metadata
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .zip(self.slots.iter())
    }

    fn slot(&self, name: &str) -> ProjectionResult<usize> {
        self.metadata
            .slot_of(name)
            .ok_or_else(|| ProjectionError::UnknownProperty {
                class: self.class_name().to_string(),
                property: name.to_string(),
            })
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.class_name() == other.class_name() && self.slots == other.slots
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.class_name())?;
        for (idx, (name, value)) in self.fields().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("}")
    }
}

/// Rows of one class, rendered by the document writer as a nested table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListEntity {
    pub class_name: String,
    /// Export target the rows are projected for
    pub target: Option<String>,
    pub rows: Vec<Value>,
}

impl ListEntity {
    pub fn new(class_name: impl Into<String>, rows: Vec<Value>) -> Self {
        Self {
            class_name: class_name.into(),
            target: None,
            rows,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(1e21).to_string(), "1000000000000000000000");
        assert_eq!(Value::text("Sam").to_string(), "Sam");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2024-03-09");
    }

    #[test]
    fn test_display_collections() {
        let list = Value::List(vec![Value::Int(1), Value::Null, Value::text("x")]);
        assert_eq!(list.to_string(), "[1, , x]");

        let map = Value::map([("b", Value::Int(2)), ("a", Value::Int(1))]);
        assert_eq!(map.to_string(), "{a=1, b=2}");
    }

    #[test]
    fn test_collection_push() {
        let mut set = Value::empty_collection(CollectionKind::Set);
        assert!(set.push(Value::text("a")));
        assert!(!set.push(Value::text("a")));
        assert_eq!(set.to_string(), "[a]");
        assert_eq!(set.kind_name(), "set");

        let mut list = Value::empty_collection(CollectionKind::List);
        assert!(list.push(Value::text("a")));
        assert!(list.push(Value::text("a")));
        assert_eq!(list, Value::List(vec![Value::text("a"), Value::text("a")]));

        let mut scalar = Value::Int(1);
        assert!(!scalar.push(Value::Int(2)));
        assert_eq!(scalar, Value::Int(1));
    }

    #[test]
    fn test_structured_values() {
        assert!(Value::Set(vec![]).is_structured());
        assert!(Value::Set(vec![]).is_collection());
        assert!(Value::List(vec![]).is_structured());
        assert!(Value::ListEntity(ListEntity::new("Order", vec![])).is_structured());
        assert!(!Value::map(Vec::<(String, Value)>::new()).is_structured());
        assert!(!Value::text("a").is_structured());
    }

    #[test]
    fn test_from_json_numbers_and_objects() {
        let json = serde_json::json!({"a": {"b": 5}, "f": 1.5, "l": [true, null]});
        let value = Value::from_json(json);
        let expected = Value::map([
            ("a", Value::map([("b", Value::Int(5))])),
            ("f", Value::Float(1.5)),
            ("l", Value::List(vec![Value::Bool(true), Value::Null])),
        ]);
        assert_eq!(value, expected);
    }

    #[test]
    fn test_from_serialize_struct() {
        #[derive(Serialize)]
        struct Person {
            name: String,
            age: u32,
        }

        let value = Value::from_serialize(&Person {
            name: "Sam".to_string(),
            age: 30,
        })
        .unwrap();
        assert_eq!(
            value,
            Value::map([("age", Value::Int(30)), ("name", Value::text("Sam"))])
        );
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::text("x"));
    }
}

//! Dotted property path resolution against context values

use crate::error::{ProjectionError, ProjectionResult};
use crate::types::Value;

pub const PATH_SEPARATOR: char = '.';

static NULL: Value = Value::Null;

/// Resolve a dotted path such as `order.customer.name` against `root`
///
/// Traversal stops early at a null (yielding `""`), at an image, or at any
/// collection, which is returned whole. A null at the final segment also
/// yields `""`. A single-segment path returns the looked-up value as is.
pub fn resolve(path: &str, root: &Value) -> ProjectionResult<Value> {
    if !path.contains(PATH_SEPARATOR) {
        return lookup(root, path).cloned();
    }

    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let last = segments.len() - 1;
    let mut current = root;

    for (idx, segment) in segments.iter().enumerate() {
        match current {
            Value::Null => return Ok(Value::text("")),
            Value::Image(_) => return Ok(current.clone()),
            v if v.is_collection() => return Ok(current.clone()),
            _ => {}
        }

        let next = step(current, segment)?;
        if next.is_collection() {
            return Ok(next.clone());
        }
        if idx == last {
            return Ok(if next.is_null() {
                Value::text("")
            } else {
                next.clone()
            });
        }
        current = next;
    }

    Ok(Value::text(""))
}

/// Final component of a dotted path
pub fn last_segment(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

fn lookup<'a>(root: &'a Value, name: &str) -> ProjectionResult<&'a Value> {
    match root {
        Value::Null => Ok(&NULL),
        Value::Image(_) | Value::List(_) | Value::Set(_) | Value::ListEntity(_) => Ok(root),
        other => step(other, name),
    }
}

fn step<'a>(current: &'a Value, segment: &str) -> ProjectionResult<&'a Value> {
    match current {
        Value::Map(map) => Ok(map.get(segment).unwrap_or(&NULL)),
        Value::Record(record) => record.get(segment),
        other => Err(ProjectionError::NotTraversable {
            segment: segment.to_string(),
            kind: other.kind_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageEntity;
    use crate::metadata::MetadataCache;
    use crate::schema::{ClassDef, FieldDef, SchemaRegistry};
    use crate::types::Record;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_single_segment_map() {
        let root = Value::map([("name", Value::text("Sam"))]);
        assert_eq!(resolve("name", &root).unwrap(), Value::text("Sam"));
        assert_eq!(resolve("missing", &root).unwrap(), Value::Null);
    }

    #[test]
    fn test_nested_maps() {
        let root = Value::map([("a", Value::map([("b", Value::Int(5))]))]);
        assert_eq!(resolve("a.b", &root).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_null_intermediate_yields_empty_string() {
        let root = Value::map([("a", Value::Null)]);
        assert_eq!(resolve("a.b", &root).unwrap(), Value::text(""));
        assert_eq!(resolve("a.b.c.d", &root).unwrap(), Value::text(""));
        assert_eq!(resolve("x.y", &root).unwrap(), Value::text(""));
    }

    #[test]
    fn test_null_leaf_yields_empty_string() {
        let root = Value::map([("a", Value::map([("b", Value::Null)]))]);
        assert_eq!(resolve("a.b", &root).unwrap(), Value::text(""));
    }

    #[test]
    fn test_collection_short_circuits() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let root = Value::map([("a", list.clone())]);
        assert_eq!(resolve("a.b", &root).unwrap(), list);
        assert_eq!(resolve("a.b.c", &root).unwrap(), list);
    }

    #[test]
    fn test_image_short_circuits() {
        let image = Value::Image(ImageEntity::from_data(vec![0x89, b'P', b'N', b'G']));
        let root = Value::map([("logo", image.clone())]);
        assert_eq!(resolve("logo.width", &root).unwrap(), image);
        assert_eq!(resolve("logo", &root).unwrap(), image);
    }

    #[test]
    fn test_scalar_not_traversable() {
        let root = Value::map([("a", Value::Int(1))]);
        let err = resolve("a.b", &root).unwrap_err();
        assert!(matches!(err, ProjectionError::NotTraversable { kind: "int", .. }));
    }

    #[test]
    fn test_records() {
        let registry = SchemaRegistry::builder()
            .class(
                "Customer",
                ClassDef::new().field(FieldDef::parse("name", "string").unwrap()),
            )
            .class(
                "Order",
                ClassDef::new().field(FieldDef::parse("customer", "Customer").unwrap()),
            )
            .build()
            .unwrap();
        let cache = MetadataCache::new(Arc::new(registry));

        let mut customer = Record::new(cache.from_cache("Customer").unwrap());
        customer.set("name", "Ada").unwrap();
        let mut order = Record::new(cache.from_cache("Order").unwrap());
        order.set("customer", customer).unwrap();
        let root = Value::map([("order", Value::Record(order))]);

        assert_eq!(resolve("order.customer.name", &root).unwrap(), Value::text("Ada"));

        let err = resolve("order.nope", &root).unwrap_err();
        assert!(matches!(err, ProjectionError::UnknownProperty { .. }));
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("a.b.c"), "c");
        assert_eq!(last_segment("name"), "name");
        assert_eq!(last_segment("a."), "");
    }
}

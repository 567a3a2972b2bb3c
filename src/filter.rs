//! Export target filtering
//!
//! An export name is either a plain name (`"Name"`) or a comma-separated list
//! of target-scoped aliases (`"Name_1,FullName_2"`), where the part after `_`
//! is the export target id.

use crate::metadata::FieldDescriptor;

/// Separates an alias from its export target id
pub const SCOPE_SEPARATOR: char = '_';

/// Separates target-scoped aliases
pub const ALIAS_SEPARATOR: char = ',';

/// Decide whether a field participates in the export for `target`
///
/// `ignore` wins over everything. Otherwise the first annotation (collection,
/// then excel, then entity) whose name is in scope and not excluded admits
/// the field. Fields without any export annotation are never exported.
pub fn include(
    field: &FieldDescriptor,
    exclusions: Option<&[String]>,
    target: Option<&str>,
) -> bool {
    if field.annotations.ignore {
        return false;
    }

    let excluded = |name: &str| exclusions.is_some_and(|list| list.iter().any(|e| e == name));
    let admits = |name: &str| is_in_scope(name, target) && !excluded(name);

    export_names(field).any(admits)
}

/// Export names of a field's annotations, in the order they are consulted
fn export_names(field: &FieldDescriptor) -> impl Iterator<Item = &str> {
    let annotations = &field.annotations;
    [
        annotations.collection.as_ref().map(|a| a.name.as_str()),
        annotations.excel.as_ref().map(|a| a.name.as_str()),
        annotations.entity.as_ref().map(|a| a.name.as_str()),
    ]
    .into_iter()
    .flatten()
}

/// Whether an export name applies to `target`
///
/// Scoped names match when they contain the target id anywhere, so target
/// `1` also matches a name scoped to `10`.
pub fn is_in_scope(export_name: &str, target: Option<&str>) -> bool {
    match target {
        None => true,
        Some(target) => {
            export_name.is_empty()
                || !export_name.contains(SCOPE_SEPARATOR)
                || export_name.contains(target)
        }
    }
}

/// Pick the alias scoped to `target` out of an export name
///
/// Unscoped names are returned unchanged. A malformed segment, or no segment
/// scoped to `target`, yields `default`.
pub fn resolve_alias(aliases: &str, target: Option<&str>, default: &str) -> String {
    let target = match target {
        Some(t) if !t.is_empty() && aliases.contains(SCOPE_SEPARATOR) => t,
        _ => return aliases.to_string(),
    };

    for segment in aliases.split(ALIAS_SEPARATOR) {
        let mut parts: Vec<&str> = segment.split(SCOPE_SEPARATOR).collect();
        while parts.last().is_some_and(|p| p.is_empty()) {
            parts.pop();
        }
        if parts.len() < 2 {
            return default.to_string();
        }
        if parts[1] == target {
            return parts[0].to_string();
        }
    }
    default.to_string()
}

/// Export key of a field for `target`, falling back to the field name
///
/// The name comes from the same annotation that admits the field in
/// [`include`], or from the first annotation when none is in scope.
pub fn export_key(field: &FieldDescriptor, target: Option<&str>) -> String {
    let aliases = export_names(field)
        .find(|name| is_in_scope(name, target))
        .or_else(|| export_names(field).next())
        .unwrap_or("");
    if aliases.is_empty() {
        return field.name.clone();
    }
    resolve_alias(aliases, target, &field.name)
}

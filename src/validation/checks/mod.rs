//! Default rule set: structural checks followed by profile checks.

mod binding;
mod cardinality;
mod datatype;
mod fixed_value;
mod unknown_element;

use serde_json::{Map, Value};
use std::sync::Arc;

use super::ResourceCheck;
use crate::core::ValidationOptions;
use crate::error::Result;
use crate::types::{ElementDefinition, StructureDefinition};

pub use binding::BindingCheck;
pub use cardinality::CardinalityCheck;
pub use datatype::DatatypeCheck;
pub use fixed_value::FixedValueCheck;
pub use unknown_element::UnknownElementCheck;

/// Checks in execution order.
pub fn default_checks(options: &ValidationOptions) -> Result<Vec<Arc<dyn ResourceCheck>>> {
    let mut checks: Vec<Arc<dyn ResourceCheck>> = vec![
        Arc::new(CardinalityCheck),
        Arc::new(UnknownElementCheck::new(options.unknown_element_severity)),
        Arc::new(DatatypeCheck::new()?),
    ];
    if options.validate_bindings {
        checks.push(Arc::new(BindingCheck));
    }
    checks.push(Arc::new(FixedValueCheck));
    Ok(checks)
}

/// One property carrying a value of an element, under one parent instance.
#[derive(Debug, Clone)]
pub(crate) struct Occurrence<'v> {
    /// `Parent[0].key`
    pub location: String,
    /// Actual JSON property name (`deceasedBoolean` for `deceased[x]`)
    pub key: &'v str,
    /// Raw value, possibly an array
    pub value: &'v Value,
}

impl<'v> Occurrence<'v> {
    /// Individual values with their locations; arrays are indexed.
    pub fn items(&self) -> Vec<(String, &'v Value)> {
        let mut out = Vec::new();
        push_items(&mut out, self.location.clone(), self.value);
        out
    }
}

/// Elements that describe properties: everything but the root and slices.
pub(crate) fn property_elements(
    profile: &StructureDefinition,
) -> impl Iterator<Item = &ElementDefinition> {
    profile
        .elements()
        .iter()
        .filter(|element| !element.is_slice() && element.path.contains('.'))
}

pub(crate) fn parent_path(path: &str) -> &str {
    path.rsplit_once('.').map(|(parent, _)| parent).unwrap_or(path)
}

/// Every instance of the element at `path`, with concrete locations.
pub(crate) fn instances<'v>(resource: &'v Value, root: &str, path: &str) -> Vec<(String, &'v Value)> {
    let mut current = vec![(root.to_string(), resource)];
    if path == root {
        return current;
    }
    let Some(rest) = path.strip_prefix(root).and_then(|r| r.strip_prefix('.')) else {
        return Vec::new();
    };

    for segment in rest.split('.') {
        let mut next = Vec::new();
        for (location, value) in current {
            let Some(object) = value.as_object() else {
                continue;
            };
            for (key, child) in properties_named(object, segment) {
                push_items(&mut next, format!("{location}.{key}"), child);
            }
        }
        current = next;
    }
    current
}

/// Properties of `element` present on each instance of its parent.
pub(crate) fn occurrences<'v>(
    resource: &'v Value,
    profile: &StructureDefinition,
    element: &ElementDefinition,
) -> Vec<Occurrence<'v>> {
    instances(resource, &profile.type_name, parent_path(&element.path))
        .into_iter()
        .filter_map(|(location, parent)| parent.as_object().map(|object| (location, object)))
        .flat_map(|(location, object)| {
            properties_named(object, element.name())
                .into_iter()
                .map(move |(key, value)| Occurrence {
                    location: format!("{location}.{key}"),
                    key,
                    value,
                })
        })
        .collect()
}

/// Properties matching an element name; `value[x]` matches `valueString`,
/// `valueQuantity` and so on.
pub(crate) fn properties_named<'v>(
    object: &'v Map<String, Value>,
    name: &str,
) -> Vec<(&'v str, &'v Value)> {
    match name.strip_suffix("[x]") {
        Some(prefix) => object
            .iter()
            .filter(|(key, _)| {
                key.strip_prefix(prefix)
                    .is_some_and(|suffix| suffix.starts_with(|c: char| c.is_ascii_uppercase()))
            })
            .map(|(key, value)| (key.as_str(), value))
            .collect(),
        None => object
            .get_key_value(name)
            .map(|(key, value)| vec![(key.as_str(), value)])
            .unwrap_or_default(),
    }
}

/// Type code of the value stored under `key` for `element`.
pub(crate) fn type_of<'e>(element: &'e ElementDefinition, key: &str) -> Option<&'e str> {
    if !element.is_choice() {
        return element.single_type();
    }
    let prefix = element.name().trim_end_matches("[x]");
    let suffix = key.strip_prefix(prefix)?;
    element.type_codes().find(|code| capitalize(code) == suffix)
}

pub(crate) fn capitalize(code: &str) -> String {
    let mut chars = code.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn push_items<'v>(out: &mut Vec<(String, &'v Value)>, location: String, value: &'v Value) {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                out.push((format!("{location}[{index}]"), item));
            }
        }
        other => out.push((location, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instances_index_arrays() {
        let claim = json!({
            "resourceType": "Claim",
            "insurance": [
                {"sequence": 1, "coverage": {"reference": "Coverage/1"}},
                {"sequence": 2}
            ]
        });

        let found = instances(&claim, "Claim", "Claim.insurance.coverage");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "Claim.insurance[0].coverage");

        let parents = instances(&claim, "Claim", "Claim.insurance");
        let locations: Vec<_> = parents.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(locations, vec!["Claim.insurance[0]", "Claim.insurance[1]"]);
    }

    #[test]
    fn test_choice_properties_and_types() {
        let patient = json!({"deceasedBoolean": false, "deceasedDateTime": "2020", "deceasedx": 1});
        let object = patient.as_object().unwrap();
        let keys: Vec<_> = properties_named(object, "deceased[x]").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["deceasedBoolean", "deceasedDateTime"]);

        let element = ElementDefinition::new("Patient.deceased[x]")
            .with_type("boolean")
            .with_type("dateTime");
        assert_eq!(type_of(&element, "deceasedDateTime"), Some("dateTime"));
        assert_eq!(type_of(&element, "deceasedString"), None);
    }
}

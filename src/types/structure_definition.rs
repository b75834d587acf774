//! StructureDefinition records.
//!
//! Only the parts of the FHIR `StructureDefinition` resource the validation
//! checks read are modelled explicitly. Everything else on an element lands
//! in [`ElementDefinition::extra`], which is also where `fixed[x]` and
//! `pattern[x]` values live.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ValidatorError};

/// Canonical URL prefix of base specification definitions.
pub const BASE_DEFINITION_PREFIX: &str = "http://hl7.org/fhir/StructureDefinition/";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    #[serde(default = "structure_definition_resource_type")]
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fhir_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub is_abstract: Option<bool>,
    /// Resource or datatype this definition describes (e.g. `Claim`).
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<String>,
    /// `specialization` for base definitions, `constraint` for profiles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ElementList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differential: Option<ElementList>,
}

fn structure_definition_resource_type() -> String {
    "StructureDefinition".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ElementList {
    #[serde(default)]
    pub element: Vec<ElementDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    /// Maximum cardinality as written in the definition (`"1"`, `"*"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    /// Cardinality of the element in the base resource definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<ElementBase>,
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<ElementType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<ElementBinding>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementBase {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementType {
    pub code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_profile: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementBinding {
    /// required | extensible | preferred | example
    pub strength: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,
}

impl StructureDefinition {
    /// Build a definition from an already-decoded JSON payload.
    ///
    /// `location` is only used to label errors.
    pub fn from_value(value: Value, location: &str) -> Result<Self> {
        match value.get("resourceType").and_then(Value::as_str) {
            Some("StructureDefinition") => {}
            Some(other) => {
                return Err(ValidatorError::parse(
                    location,
                    format!("expected a StructureDefinition, found resourceType '{other}'"),
                ));
            }
            None => {
                return Err(ValidatorError::parse(
                    location,
                    "payload has no resourceType",
                ));
            }
        }

        let definition: StructureDefinition = serde_json::from_value(value)
            .map_err(|e| ValidatorError::parse(location, e.to_string()))?;

        if definition.url.trim().is_empty() {
            return Err(ValidatorError::parse(
                location,
                "StructureDefinition has an empty canonical url",
            ));
        }
        if definition.type_name.trim().is_empty() {
            return Err(ValidatorError::parse(
                location,
                "StructureDefinition has an empty type",
            ));
        }

        Ok(definition)
    }

    /// Decode a definition from raw JSON bytes.
    pub fn from_slice(bytes: &[u8], location: &str) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ValidatorError::parse(location, format!("malformed JSON: {e}")))?;
        Self::from_value(value, location)
    }

    /// Elements used for validation: the snapshot when present, otherwise
    /// the differential.
    pub fn elements(&self) -> &[ElementDefinition] {
        self.snapshot
            .as_ref()
            .filter(|s| !s.element.is_empty())
            .or(self.differential.as_ref())
            .map(|list| list.element.as_slice())
            .unwrap_or(&[])
    }

    /// Direct children of `parent_path`, in definition order, excluding
    /// slices.
    pub fn children_of<'a>(
        &'a self,
        parent_path: &'a str,
    ) -> impl Iterator<Item = &'a ElementDefinition> + 'a {
        self.elements().iter().filter(move |element| {
            !element.is_slice()
                && element
                    .path
                    .strip_prefix(parent_path)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('.'))
        })
    }

    /// First non-slice element with exactly this path.
    pub fn element(&self, path: &str) -> Option<&ElementDefinition> {
        self.elements()
            .iter()
            .find(|element| !element.is_slice() && element.path == path)
    }

    pub fn is_base_definition(&self) -> bool {
        self.derivation.as_deref() != Some("constraint")
            && self.url.starts_with(BASE_DEFINITION_PREFIX)
    }

    /// `url|version` label used in log lines and messages.
    pub fn label(&self) -> String {
        match &self.version {
            Some(version) => format!("{}|{}", self.url, version),
            None => self.url.clone(),
        }
    }
}

impl ElementDefinition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_cardinality(mut self, min: u32, max: impl Into<String>) -> Self {
        self.min = Some(min);
        self.max = Some(max.into());
        self
    }

    pub fn with_type(mut self, code: impl Into<String>) -> Self {
        self.types.push(ElementType {
            code: code.into(),
            profile: Vec::new(),
            target_profile: Vec::new(),
        });
        self
    }

    pub fn with_binding(mut self, strength: impl Into<String>, value_set: impl Into<String>) -> Self {
        self.binding = Some(ElementBinding {
            strength: strength.into(),
            description: None,
            value_set: Some(value_set.into()),
        });
        self
    }

    /// Last path segment (`status` for `Claim.status`).
    pub fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Slices and anything nested inside a slice are identified by a `:` in
    /// the element id.
    pub fn is_slice(&self) -> bool {
        self.slice_name.is_some() || self.id.as_deref().is_some_and(|id| id.contains(':'))
    }

    /// `value[x]` style elements.
    pub fn is_choice(&self) -> bool {
        self.path.ends_with("[x]")
    }

    pub fn min(&self) -> u32 {
        self.min.unwrap_or(0)
    }

    /// `None` means unbounded (`*`).
    pub fn max(&self) -> Option<u32> {
        match self.max.as_deref() {
            None | Some("*") => None,
            Some(max) => max.parse().ok(),
        }
    }

    pub fn with_base(mut self, min: u32, max: impl Into<String>) -> Self {
        self.base = Some(ElementBase {
            path: self.path.clone(),
            min: Some(min),
            max: Some(max.into()),
        });
        self
    }

    /// `base.max`, the bound of the element in the resource it constrains.
    pub fn base_max(&self) -> Option<&str> {
        self.base.as_ref().and_then(|base| base.max.as_deref())
    }

    /// Whether the JSON representation of this element is an array.
    ///
    /// Decided by `base.max`, which profiles cannot change, falling back to
    /// the element's own `max`. `None` when neither is stated.
    pub fn is_repeating(&self) -> Option<bool> {
        self.base_max()
            .or(self.max.as_deref())
            .map(|max| max == "*" || max.parse::<u32>().is_ok_and(|max| max > 1))
    }

    pub fn type_codes(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.code.as_str())
    }

    /// The single type code, when the element is not polymorphic.
    pub fn single_type(&self) -> Option<&str> {
        match self.types.as_slice() {
            [only] => Some(only.code.as_str()),
            _ => None,
        }
    }

    /// `fixed[x]` value, if the element declares one.
    pub fn fixed_value(&self) -> Option<(&str, &Value)> {
        self.prefixed_value("fixed")
    }

    /// `pattern[x]` value, if the element declares one.
    pub fn pattern_value(&self) -> Option<(&str, &Value)> {
        self.prefixed_value("pattern")
    }

    fn prefixed_value(&self, prefix: &str) -> Option<(&str, &Value)> {
        self.extra.iter().find_map(|(key, value)| {
            key.strip_prefix(prefix)
                .filter(|suffix| suffix.starts_with(|c: char| c.is_ascii_uppercase()))
                .map(|_| (key.as_str(), value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "resourceType": "StructureDefinition",
            "url": "https://ig.example.org/StructureDefinition/Claim",
            "name": "ExampleClaim",
            "type": "Claim",
            "derivation": "constraint",
            "snapshot": {
                "element": [
                    {"id": "Claim", "path": "Claim", "min": 0, "max": "*"},
                    {"id": "Claim.status", "path": "Claim.status", "min": 1, "max": "1",
                     "type": [{"code": "code"}], "fixedCode": "active"},
                    {"id": "Claim.identifier", "path": "Claim.identifier", "min": 0, "max": "*",
                     "type": [{"code": "Identifier"}]},
                    {"id": "Claim.identifier:hcx", "path": "Claim.identifier", "sliceName": "hcx",
                     "min": 1, "max": "1"},
                    {"id": "Claim.item.sequence", "path": "Claim.item.sequence", "min": 1, "max": "1"}
                ]
            }
        })
    }

    #[test]
    fn test_children_skip_slices_and_grandchildren() {
        let definition = StructureDefinition::from_value(sample(), "test").unwrap();
        let names: Vec<_> = definition.children_of("Claim").map(|e| e.name()).collect();
        assert_eq!(names, vec!["status", "identifier"]);
    }

    #[test]
    fn test_fixed_value_is_read_from_extra_fields() {
        let definition = StructureDefinition::from_value(sample(), "test").unwrap();
        let status = definition.element("Claim.status").unwrap();
        assert_eq!(status.fixed_value(), Some(("fixedCode", &json!("active"))));
        assert!(status.pattern_value().is_none());
    }

    #[test]
    fn test_rejects_other_resource_types() {
        let err = StructureDefinition::from_value(json!({"resourceType": "Patient"}), "loc")
            .unwrap_err();
        assert!(err.is_parse());
        assert_eq!(err.location(), Some("loc"));
    }

    #[test]
    fn test_unbounded_max_is_repeating() {
        let element = ElementDefinition::new("Claim.item").with_cardinality(0, "*");
        assert_eq!(element.max(), None);
        assert_eq!(element.is_repeating(), Some(true));
        assert_eq!(
            ElementDefinition::new("Claim.use").with_cardinality(1, "1").is_repeating(),
            Some(false)
        );
    }

    #[test]
    fn test_base_max_decides_json_shape() {
        let narrowed = ElementDefinition::new("Claim.identifier")
            .with_cardinality(1, "1")
            .with_base(0, "*");
        assert_eq!(narrowed.max(), Some(1));
        assert_eq!(narrowed.is_repeating(), Some(true));

        let from_json: ElementDefinition = serde_json::from_value(json!({
            "path": "Claim.identifier",
            "min": 1,
            "max": "1",
            "base": {"path": "Claim.identifier", "min": 0, "max": "*"}
        }))
        .unwrap();
        assert_eq!(from_json.base_max(), Some("*"));
        assert!(!from_json.extra.contains_key("base"));

        // Differential elements often leave max out
        assert_eq!(ElementDefinition::new("Claim.status").is_repeating(), None);
    }
}

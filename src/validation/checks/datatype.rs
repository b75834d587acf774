use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use super::{occurrences, property_elements, type_of};
use crate::error::{Result, ValidatorError};
use crate::types::{ElementDefinition, StructureDefinition};
use crate::validation::{CheckContext, ResourceCheck};

const YEAR: &str = r"([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)";
const MONTH: &str = r"(0[1-9]|1[0-2])";
const DAY: &str = r"(0[1-9]|[1-2][0-9]|3[0-1])";
const TIME: &str = r"([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?";
const ZONE: &str = r"(Z|(\+|-)((0[0-9]|1[0-3]):[0-5][0-9]|14:00))";

/// JSON shape of every value plus the lexical rules of FHIR primitive types.
#[derive(Debug)]
pub struct DatatypeCheck {
    formats: HashMap<&'static str, Regex>,
}

impl DatatypeCheck {
    pub fn new() -> Result<Self> {
        let sources: Vec<(&'static str, String)> = vec![
            ("id", r"^[A-Za-z0-9\-\.]{1,64}$".to_string()),
            ("code", r"^[^\s]+( [^\s]+)*$".to_string()),
            ("uri", r"^\S*$".to_string()),
            ("url", r"^\S*$".to_string()),
            ("canonical", r"^\S*$".to_string()),
            ("oid", r"^urn:oid:[0-2](\.(0|[1-9][0-9]*))+$".to_string()),
            (
                "uuid",
                r"^urn:uuid:[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$".to_string(),
            ),
            ("base64Binary", r"^(\s*([0-9a-zA-Z\+/=]){4}\s*)+$".to_string()),
            ("date", format!("^{YEAR}(-{MONTH}(-{DAY})?)?$")),
            (
                "dateTime",
                format!("^{YEAR}(-{MONTH}(-{DAY}(T{TIME}{ZONE})?)?)?$"),
            ),
            ("instant", format!("^{YEAR}-{MONTH}-{DAY}T{TIME}{ZONE}$")),
            ("time", format!("^{TIME}$")),
        ];

        let mut formats = HashMap::with_capacity(sources.len());
        for (type_code, source) in sources {
            let regex = Regex::new(&source).map_err(|e| {
                ValidatorError::configuration(format!("{type_code} pattern: {e}"))
            })?;
            formats.insert(type_code, regex);
        }
        Ok(Self { formats })
    }

    fn check_value(&self, type_code: &str, value: &Value) -> Option<String> {
        match type_code {
            "boolean" => (!value.is_boolean()).then(|| expected("boolean", value)),
            "integer" | "positiveInt" | "unsignedInt" => check_integer(type_code, value),
            "decimal" => (!value.is_number()).then(|| expected("number", value)),
            "string" | "markdown" | "xhtml" => match value.as_str() {
                Some(text) if text.trim().is_empty() => {
                    Some("String values must contain at least one non-whitespace character".to_string())
                }
                Some(_) => None,
                None => Some(expected("string", value)),
            },
            "Resource" => match value.get("resourceType").and_then(Value::as_str) {
                Some(_) => None,
                None => Some("Contained resources must declare a resourceType".to_string()),
            },
            _ if self.formats.contains_key(type_code) => {
                let Some(text) = value.as_str() else {
                    return Some(expected("string", value));
                };
                let valid = self.formats.get(type_code).is_some_and(|r| r.is_match(text))
                    && is_real_calendar_value(type_code, text);
                (!valid).then(|| format!("The value '{text}' is not a valid {type_code}"))
            }
            _ if type_code.starts_with(|c: char| c.is_ascii_uppercase()) => {
                (!value.is_object()).then(|| expected("object", value))
            }
            _ => None,
        }
    }
}

impl ResourceCheck for DatatypeCheck {
    fn name(&self) -> &'static str {
        "datatype"
    }

    fn check(&self, context: &mut CheckContext<'_>) {
        let profile = context.profile();
        let resource = context.resource();

        for element in property_elements(profile) {
            let repeating = json_repeating(context, profile, element);
            for occurrence in occurrences(resource, profile, element) {
                if repeating.is_some_and(|repeating| repeating != occurrence.value.is_array()) {
                    let message = if occurrence.value.is_array() {
                        "This property must be a single value, not an Array".to_string()
                    } else {
                        format!(
                            "This property must be an Array, not {}",
                            json_kind(occurrence.value)
                        )
                    };
                    context.add_error(occurrence.location, "datatype-array", message);
                    continue;
                }

                let Some(type_code) = type_of(element, occurrence.key) else {
                    if element.is_choice() {
                        context.add_error(
                            occurrence.location.clone(),
                            "type-not-allowed",
                            format!(
                                "The property '{}' is not a permitted type for {}",
                                occurrence.key, element.path
                            ),
                        );
                    }
                    continue;
                };

                for (location, item) in occurrence.items() {
                    if let Some(message) = self.check_value(type_code, item) {
                        context.add_error(location, "datatype", message);
                    }
                }
            }
        }
    }
}

/// Array or single value, as fixed by the base resource. Elements that carry
/// no `base` (differentials, hand-written snapshots) are looked up in the
/// definition the profile derives from. `None` leaves the shape unchecked.
fn json_repeating(
    context: &CheckContext<'_>,
    profile: &StructureDefinition,
    element: &ElementDefinition,
) -> Option<bool> {
    if element.base_max().is_some() || profile.is_base_definition() {
        return element.is_repeating();
    }

    profile
        .base_definition
        .as_deref()
        .and_then(|url| context.support().fetch_structure_definition(url))
        .and_then(|base| base.element(&element.path).and_then(ElementDefinition::is_repeating))
        .or_else(|| element.is_repeating())
}

fn check_integer(type_code: &str, value: &Value) -> Option<String> {
    let Some(number) = value.as_i64() else {
        return Some(expected("integer", value));
    };
    let in_range = match type_code {
        "positiveInt" => (1..=i64::from(i32::MAX)).contains(&number),
        "unsignedInt" => (0..=i64::from(i32::MAX)).contains(&number),
        _ => (i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(&number),
    };
    (!in_range).then(|| format!("The value {number} is out of range for {type_code}"))
}

/// Rejects dates that match the grammar but do not exist (`2023-02-30`).
fn is_real_calendar_value(type_code: &str, text: &str) -> bool {
    match type_code {
        "instant" => DateTime::parse_from_rfc3339(text).is_ok(),
        "dateTime" if text.contains('T') => DateTime::parse_from_rfc3339(text).is_ok(),
        "date" | "dateTime" if text.len() == 10 => {
            NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        }
        _ => true,
    }
}

fn expected(kind: &str, value: &Value) -> String {
    format!("Expected a JSON {kind}, found {}", json_kind(value))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

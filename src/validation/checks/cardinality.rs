use serde_json::{Map, Value};

use super::{instances, parent_path, properties_named, property_elements};
use crate::types::ElementDefinition;
use crate::validation::{CheckContext, ResourceCheck};

/// Minimum and maximum occurrence of every element, evaluated under each
/// present instance of the element's parent.
#[derive(Debug, Default)]
pub struct CardinalityCheck;

impl ResourceCheck for CardinalityCheck {
    fn name(&self) -> &'static str {
        "cardinality"
    }

    fn check(&self, context: &mut CheckContext<'_>) {
        let profile = context.profile();
        let resource = context.resource();

        for element in property_elements(profile) {
            let min = element.min();
            let max = element.max();
            if min == 0 && max.is_none() {
                continue;
            }

            for (parent_location, parent) in
                instances(resource, &profile.type_name, parent_path(&element.path))
            {
                let Some(object) = parent.as_object() else {
                    continue;
                };
                let count = count_values(object, element);
                let location = format!(
                    "{parent_location}.{}",
                    element.name().trim_end_matches("[x]")
                );

                if count < min as usize {
                    context.add_error(
                        location,
                        "cardinality-min",
                        format!(
                            "{}: minimum required = {min}, but only found {count} (from {})",
                            element.path,
                            profile.label()
                        ),
                    );
                } else if let Some(max) = max.filter(|max| count > *max as usize) {
                    let message = if max == 0 {
                        format!(
                            "{}: element is prohibited by the profile (from {})",
                            element.path,
                            profile.label()
                        )
                    } else {
                        format!(
                            "{}: max allowed = {max}, but found {count} (from {})",
                            element.path,
                            profile.label()
                        )
                    };
                    context.add_error(location, "cardinality-max", message);
                }
            }
        }
    }
}

/// Number of values for `element`. A primitive carried only by its `_name`
/// companion (extensions without a value) still counts as present.
fn count_values(object: &Map<String, Value>, element: &ElementDefinition) -> usize {
    let name = element.name();
    let direct: usize = properties_named(object, name)
        .into_iter()
        .map(|(_, value)| value_count(value))
        .sum();
    if direct > 0 || element.is_choice() {
        return direct;
    }
    object
        .get(&format!("_{name}"))
        .map(value_count)
        .unwrap_or(0)
}

fn value_count(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Array(items) => items.iter().filter(|item| !item.is_null()).count(),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SupportChain;
    use crate::types::{ElementList, StructureDefinition};
    use serde_json::json;

    fn profile() -> StructureDefinition {
        let mut definition: StructureDefinition = serde_json::from_value(json!({
            "url": "http://example.org/StructureDefinition/Claim",
            "type": "Claim"
        }))
        .unwrap();
        definition.snapshot = Some(ElementList {
            element: vec![
                ElementDefinition::new("Claim").with_cardinality(0, "*"),
                ElementDefinition::new("Claim.status").with_cardinality(1, "1"),
                ElementDefinition::new("Claim.insurance").with_cardinality(1, "*"),
                ElementDefinition::new("Claim.insurance.focal").with_cardinality(1, "1"),
                ElementDefinition::new("Claim.subType").with_cardinality(0, "0"),
            ],
        });
        definition
    }

    fn run(resource: serde_json::Value) -> Vec<crate::validation::ValidationIssue> {
        let profile = profile();
        let chain = SupportChain::new();
        let mut issues = Vec::new();
        let mut context = CheckContext::new(&resource, &profile, &chain, &mut issues);
        CardinalityCheck.check(&mut context);
        issues
    }

    #[test]
    fn test_missing_required_fields() {
        let issues = run(json!({"resourceType": "Claim"}));
        let locations: Vec<_> = issues.iter().map(|i| i.location.as_str()).collect();
        assert_eq!(locations, vec!["Claim.status", "Claim.insurance"]);
        assert!(issues.iter().all(|i| i.code == "cardinality-min"));
    }

    #[test]
    fn test_nested_fields_checked_per_parent_instance() {
        let issues = run(json!({
            "resourceType": "Claim",
            "status": "active",
            "insurance": [{"focal": true}, {"sequence": 2}]
        }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location, "Claim.insurance[1].focal");
    }

    #[test]
    fn test_extension_only_primitive_counts_and_prohibited_element() {
        let issues = run(json!({
            "resourceType": "Claim",
            "_status": {"extension": [{"url": "http://example.org/absent-reason"}]},
            "insurance": [{"focal": true}],
            "subType": {"text": "x"}
        }));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "cardinality-max");
        assert!(issues[0].message.contains("prohibited"));
    }
}

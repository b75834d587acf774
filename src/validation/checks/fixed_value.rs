use serde_json::Value;

use super::{occurrences, property_elements};
use crate::validation::{CheckContext, ResourceCheck};

/// `fixed[x]` requires exact equality, `pattern[x]` requires the value to
/// contain everything the pattern states.
#[derive(Debug, Default)]
pub struct FixedValueCheck;

impl ResourceCheck for FixedValueCheck {
    fn name(&self) -> &'static str {
        "fixed-value"
    }

    fn check(&self, context: &mut CheckContext<'_>) {
        let profile = context.profile();
        let resource = context.resource();

        for element in property_elements(profile) {
            let fixed = element.fixed_value();
            let pattern = element.pattern_value();
            if fixed.is_none() && pattern.is_none() {
                continue;
            }

            for occurrence in occurrences(resource, profile, element) {
                for (location, item) in occurrence.items() {
                    if let Some((key, expected)) = fixed
                        && item != expected
                    {
                        context.add_error(
                            location.clone(),
                            "fixed-value",
                            format!("Value must be exactly {expected} ({key}), found {item}"),
                        );
                    }
                    if let Some((key, expected)) = pattern
                        && !contains_pattern(item, expected)
                    {
                        context.add_error(
                            location,
                            "pattern-value",
                            format!("Value does not match the required pattern {expected} ({key})"),
                        );
                    }
                }
            }
        }
    }
}

fn contains_pattern(value: &Value, pattern: &Value) -> bool {
    match (value, pattern) {
        (Value::Object(value), Value::Object(pattern)) => pattern
            .iter()
            .all(|(key, expected)| value.get(key).is_some_and(|v| contains_pattern(v, expected))),
        (Value::Array(values), Value::Array(patterns)) => patterns
            .iter()
            .all(|expected| values.iter().any(|v| contains_pattern(v, expected))),
        (value, pattern) => value == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SupportChain;
    use crate::types::StructureDefinition;
    use serde_json::json;

    fn profile() -> StructureDefinition {
        StructureDefinition::from_value(
            json!({
                "resourceType": "StructureDefinition",
                "url": "http://example.org/StructureDefinition/fixed-claim",
                "name": "FixedClaim",
                "type": "Claim",
                "snapshot": {"element": [
                    {"id": "Claim", "path": "Claim"},
                    {"id": "Claim.use", "path": "Claim.use", "min": 1, "max": "1",
                     "type": [{"code": "code"}], "fixedCode": "claim"},
                    {"id": "Claim.type", "path": "Claim.type", "min": 1, "max": "1",
                     "type": [{"code": "CodeableConcept"}],
                     "patternCodeableConcept": {"coding": [{
                         "system": "http://terminology.hl7.org/CodeSystem/claim-type",
                         "code": "institutional"
                     }]}}
                ]}
            }),
            "test",
        )
        .unwrap()
    }

    #[test]
    fn test_fixed_and_pattern() {
        let profile = profile();
        let chain = SupportChain::new();
        let resource = json!({
            "resourceType": "Claim",
            "use": "preauthorization",
            "type": {
                "coding": [
                    {"system": "http://terminology.hl7.org/CodeSystem/claim-type", "code": "institutional", "display": "Institutional"}
                ],
                "text": "Institutional"
            }
        });
        let mut issues = Vec::new();
        FixedValueCheck.check(&mut CheckContext::new(&resource, &profile, &chain, &mut issues));

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location, "Claim.use");
        assert_eq!(issues[0].code, "fixed-value");
    }

    #[test]
    fn test_pattern_containment() {
        assert!(contains_pattern(&json!({"a": 1, "b": [1, 2]}), &json!({"b": [2]})));
        assert!(!contains_pattern(&json!({"a": 1}), &json!({"a": 2})));
    }
}

use serde_json::Value;

use super::{occurrences, property_elements, type_of};
use crate::provider::CodeValidation;
use crate::types::ElementDefinition;
use crate::validation::{CheckContext, ResourceCheck};

/// Terminology bindings of strength `required` and `extensible`.
///
/// Codes are evaluated through the validation support, so the verdict comes
/// from whichever provider in the chain knows the value set. Weaker bindings
/// are informative only and never checked.
#[derive(Debug, Default)]
pub struct BindingCheck;

enum Verdict {
    Member,
    NotMember(String),
    Unknown,
}

impl BindingCheck {
    fn evaluate(
        &self,
        context: &CheckContext<'_>,
        codings: &[(Option<&str>, &str)],
        value_set: &str,
    ) -> Verdict {
        let mut rejection = None;
        for (system, code) in codings {
            match context.support().validate_code(*system, code, Some(value_set)) {
                Some(CodeValidation { valid: true, .. }) => return Verdict::Member,
                Some(CodeValidation { message, .. }) => {
                    rejection.get_or_insert_with(|| {
                        message.unwrap_or_else(|| {
                            format!("The code '{code}' is not in the value set '{value_set}'")
                        })
                    });
                }
                None => {}
            }
        }
        rejection.map(Verdict::NotMember).unwrap_or(Verdict::Unknown)
    }
}

impl ResourceCheck for BindingCheck {
    fn name(&self) -> &'static str {
        "binding"
    }

    fn check(&self, context: &mut CheckContext<'_>) {
        let profile = context.profile();
        let resource = context.resource();

        for element in property_elements(profile) {
            let Some((strength, value_set)) = checked_binding(element) else {
                continue;
            };
            let required = strength == "required";

            for occurrence in occurrences(resource, profile, element) {
                let Some(type_code) = type_of(element, occurrence.key) else {
                    continue;
                };
                for (location, item) in occurrence.items() {
                    let Some(codings) = codings(type_code, item) else {
                        continue;
                    };

                    if codings.is_empty() {
                        if required && type_code == "CodeableConcept" {
                            context.add_error(
                                location,
                                "binding-required",
                                format!(
                                    "No code provided, and a code from the value set '{value_set}' is required"
                                ),
                            );
                        }
                        continue;
                    }

                    match self.evaluate(context, &codings, value_set) {
                        Verdict::Member => {}
                        Verdict::NotMember(message) if required => {
                            context.add_error(location, "binding-required", message);
                        }
                        Verdict::NotMember(message) => context.add_warning(
                            location,
                            "binding-extensible",
                            format!("{message} (extensible binding)"),
                        ),
                        Verdict::Unknown => context.add_warning(
                            location,
                            "binding-unresolved",
                            format!("Unable to check codes against the value set '{value_set}'"),
                        ),
                    }
                }
            }
        }
    }
}

fn checked_binding(element: &ElementDefinition) -> Option<(&str, &str)> {
    let binding = element.binding.as_ref()?;
    let strength = binding.strength.as_str();
    if !matches!(strength, "required" | "extensible") {
        return None;
    }
    Some((strength, binding.value_set.as_deref()?))
}

/// `(system, code)` pairs carried by a coded value. `None` for values that
/// are not coded or are malformed (the datatype check reports those).
fn codings<'v>(type_code: &str, value: &'v Value) -> Option<Vec<(Option<&'v str>, &'v str)>> {
    match type_code {
        "code" => value.as_str().map(|code| vec![(None, code)]),
        "Coding" => Some(coding(value).into_iter().collect()),
        "CodeableConcept" => {
            let object = value.as_object()?;
            Some(
                object
                    .get("coding")
                    .and_then(Value::as_array)
                    .map(|codings| codings.iter().filter_map(coding).collect())
                    .unwrap_or_default(),
            )
        }
        _ => None,
    }
}

fn coding(value: &Value) -> Option<(Option<&str>, &str)> {
    let code = value.get("code")?.as_str()?;
    Some((value.get("system").and_then(Value::as_str), code))
}

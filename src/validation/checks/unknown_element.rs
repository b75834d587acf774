use crate::validation::{CheckContext, IssueSeverity, ResourceCheck, ValidationIssue};

/// Top-level properties the profile does not define.
///
/// Only runs against profiles that carry a snapshot; a differential alone
/// does not list every allowed element.
#[derive(Debug)]
pub struct UnknownElementCheck {
    severity: IssueSeverity,
}

impl UnknownElementCheck {
    pub fn new(severity: IssueSeverity) -> Self {
        Self { severity }
    }
}

impl Default for UnknownElementCheck {
    fn default() -> Self {
        Self::new(IssueSeverity::Error)
    }
}

impl ResourceCheck for UnknownElementCheck {
    fn name(&self) -> &'static str {
        "unknown-element"
    }

    fn check(&self, context: &mut CheckContext<'_>) {
        let profile = context.profile();
        if profile.snapshot.as_ref().is_none_or(|s| s.element.is_empty()) {
            return;
        }
        let Some(object) = context.resource().as_object() else {
            return;
        };

        let root = profile.type_name.as_str();
        let known: Vec<_> = profile.children_of(root).map(|e| e.name()).collect();

        for key in object.keys() {
            if key == "resourceType" {
                continue;
            }
            let name = key.strip_prefix('_').unwrap_or(key);
            let is_known = known.iter().any(|element_name| match element_name.strip_suffix("[x]") {
                Some(prefix) => is_choice_of(prefix, name),
                None => *element_name == name,
            });

            if !is_known {
                context.add_issue(ValidationIssue::new(
                    self.severity,
                    format!("{root}.{key}"),
                    "unknown-element",
                    format!("Unrecognized property '{key}' (not defined by {})", profile.label()),
                ));
            }
        }
    }
}

fn is_choice_of(prefix: &str, property: &str) -> bool {
    property
        .strip_prefix(prefix)
        .is_some_and(|suffix| suffix.starts_with(|c: char| c.is_ascii_uppercase()))
}

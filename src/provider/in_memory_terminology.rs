use super::{
    CodeValidation, Resolution, SupportProvider, SupportRequest, TerminologyAnswer,
    ValidationSupport, strip_version,
};
use crate::types::ValueSet;

/// Evaluates code membership without external calls.
///
/// Holds no terminology of its own: value sets and code systems are looked
/// up through the root support, and membership is computed from their
/// `compose.include` rules and concept lists. Declines whenever the answer
/// cannot be determined (unknown value set, incomplete code system).
#[derive(Debug, Default)]
pub struct InMemoryTerminologyProvider;

impl InMemoryTerminologyProvider {
    pub fn new() -> Self {
        Self
    }

    fn validate_in_value_set(
        &self,
        value_set: &ValueSet,
        system: Option<&str>,
        code: &str,
        root: &dyn ValidationSupport,
    ) -> Option<CodeValidation> {
        let mut undetermined = false;

        for include in value_set.includes() {
            let Some(include_system) = include.system.as_deref() else {
                undetermined = true;
                continue;
            };
            if system.is_some_and(|s| strip_version(s) != include_system) {
                continue;
            }

            if !include.concept.is_empty() {
                if let Some(concept) = include.concept.iter().find(|c| c.code == code) {
                    return Some(CodeValidation::valid(concept.display.clone()));
                }
                continue;
            }

            match root.fetch_code_system(include_system) {
                Some(code_system) => {
                    if let Some(concept) = code_system.find(code) {
                        return Some(CodeValidation::valid(concept.display.clone()));
                    }
                    if !code_system.is_complete() {
                        undetermined = true;
                    }
                }
                None => undetermined = true,
            }
        }

        if undetermined {
            return None;
        }

        Some(CodeValidation::invalid(format!(
            "The code '{}{}' is not in the value set '{}'",
            system.map(|s| format!("{s}#")).unwrap_or_default(),
            code,
            value_set.url
        )))
    }

    fn validate_in_code_system(
        &self,
        system: &str,
        code: &str,
        root: &dyn ValidationSupport,
    ) -> Option<CodeValidation> {
        let code_system = root.fetch_code_system(system)?;
        match code_system.find(code) {
            Some(concept) => Some(CodeValidation::valid(concept.display.clone())),
            None if code_system.is_complete() => Some(CodeValidation::invalid(format!(
                "Unknown code '{code}' in the code system '{system}'"
            ))),
            None => None,
        }
    }
}

impl SupportProvider for InMemoryTerminologyProvider {
    fn name(&self) -> &str {
        "in-memory-terminology"
    }

    fn resolve(&self, request: &SupportRequest, root: &dyn ValidationSupport) -> Resolution {
        let SupportRequest::ValidateCode {
            system,
            code,
            value_set,
        } = request
        else {
            return Resolution::NotFound;
        };

        let validation = match (value_set.as_deref(), system.as_deref()) {
            (Some(url), system) => root
                .fetch_value_set(url)
                .and_then(|vs| self.validate_in_value_set(&vs, system, code, root)),
            (None, Some(system)) => self.validate_in_code_system(system, code, root),
            (None, None) => None,
        };

        validation
            .map(|v| Resolution::Terminology(TerminologyAnswer::Code(v)))
            .unwrap_or(Resolution::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CommonTerminologyProvider, SupportChain};
    use std::sync::Arc;

    fn chain() -> SupportChain {
        let mut chain = SupportChain::new();
        chain.add_provider(Arc::new(CommonTerminologyProvider::new().unwrap()));
        chain.add_provider(Arc::new(InMemoryTerminologyProvider::new()));
        chain
    }

    #[test]
    fn test_membership_through_value_set() {
        let chain = chain();
        let valid = chain
            .validate_code(None, "female", Some("http://hl7.org/fhir/ValueSet/administrative-gender|4.0.1"))
            .unwrap();
        assert!(valid.valid);
        assert_eq!(valid.display.as_deref(), Some("Female"));

        let invalid = chain
            .validate_code(None, "robot", Some("http://hl7.org/fhir/ValueSet/administrative-gender"))
            .unwrap();
        assert!(!invalid.valid);
        assert!(invalid.message.unwrap().contains("robot"));
    }

    #[test]
    fn test_system_mismatch_is_not_a_member() {
        let chain = chain();
        let result = chain
            .validate_code(
                Some("http://example.org/other"),
                "male",
                Some("http://hl7.org/fhir/ValueSet/administrative-gender"),
            )
            .unwrap();
        assert!(!result.valid);
    }

    #[test]
    fn test_unknown_value_set_is_declined() {
        let chain = chain();
        assert!(
            chain
                .validate_code(None, "x", Some("http://example.org/ValueSet/unknown"))
                .is_none()
        );
    }
}

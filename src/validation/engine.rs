use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::{CheckContext, ResourceCheck, ValidationIssue, ValidationResult, default_checks};
use crate::core::ValidationOptions;
use crate::error::Result;
use crate::provider::{CachingValidationSupport, ValidationSupport};
use crate::types::{BASE_DEFINITION_PREFIX, StructureDefinition};
use crate::utils::DefinitionFingerprint;

/// Validates documents against the profiles they claim (or their base
/// definition) using a cached support chain.
///
/// The engine is immutable once built and safe to share between tasks; the
/// only state touched while validating is the lock-free resolution cache.
pub struct ValidationEngine {
    support: Arc<CachingValidationSupport>,
    checks: Vec<Arc<dyn ResourceCheck>>,
    fingerprints: Vec<DefinitionFingerprint>,
}

impl ValidationEngine {
    /// Engine running the default checks configured by `options`.
    pub fn new(support: Arc<CachingValidationSupport>, options: &ValidationOptions) -> Result<Self> {
        Ok(Self::with_checks(support, default_checks(options)?))
    }

    /// Engine running exactly `checks`, in the given order.
    pub fn with_checks(
        support: Arc<CachingValidationSupport>,
        checks: Vec<Arc<dyn ResourceCheck>>,
    ) -> Self {
        Self {
            support,
            checks,
            fingerprints: Vec::new(),
        }
    }

    pub fn with_fingerprints(mut self, fingerprints: Vec<DefinitionFingerprint>) -> Self {
        self.fingerprints = fingerprints;
        self
    }

    pub fn support(&self) -> &Arc<CachingValidationSupport> {
        &self.support
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Fingerprints of the custom definitions this engine was assembled from.
    pub fn fingerprints(&self) -> &[DefinitionFingerprint] {
        &self.fingerprints
    }

    /// Validate against every `meta.profile` entry, or against the base
    /// definition of the resource type when none is declared.
    pub fn validate(&self, document: &Value) -> ValidationResult {
        let declared = declared_profiles(document);
        if !declared.is_empty() {
            return self.validate_profiles(document, &declared);
        }

        match resource_type(document) {
            Some(resource_type) => {
                let base = format!("{BASE_DEFINITION_PREFIX}{resource_type}");
                self.validate_profiles(document, &[base])
            }
            None => ValidationResult::from_issues(vec![ValidationIssue::fatal(
                "$",
                "missing-resource-type",
                "Resource has no resourceType and declares no profile",
            )]),
        }
    }

    /// Validate against one profile, ignoring what the document declares.
    pub fn validate_against(&self, document: &Value, profile_url: &str) -> ValidationResult {
        self.validate_profiles(document, &[profile_url.to_string()])
    }

    fn validate_profiles(&self, document: &Value, urls: &[String]) -> ValidationResult {
        let root = resource_type(document).unwrap_or("$");
        if !document.is_object() {
            return ValidationResult::from_issues(vec![ValidationIssue::fatal(
                root,
                "invalid-document",
                "Resource must be a JSON object",
            )]);
        }

        let mut profiles = Vec::with_capacity(urls.len());
        for url in urls {
            match self.support.fetch_structure_definition(url) {
                Some(profile) => profiles.push(profile),
                None => {
                    tracing::debug!("Profile {} could not be resolved", url);
                    return ValidationResult::from_issues(vec![ValidationIssue::fatal(
                        root,
                        "unresolved-profile",
                        format!("Profile reference '{url}' could not be resolved"),
                    )]);
                }
            }
        }

        let mut issues = Vec::new();
        for profile in &profiles {
            self.run_checks(document, profile, &mut issues);
        }

        tracing::debug!(
            "Validated {} against {} profile(s): {} issue(s)",
            root,
            profiles.len(),
            issues.len()
        );
        ValidationResult::from_issues(issues)
    }

    fn run_checks(
        &self,
        document: &Value,
        profile: &StructureDefinition,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let actual = resource_type(document);
        if actual != Some(profile.type_name.as_str()) {
            issues.push(ValidationIssue::error(
                actual.unwrap_or("$"),
                "profile-type-mismatch",
                format!(
                    "Profile '{}' constrains {}, but the resource is {}",
                    profile.url,
                    profile.type_name,
                    actual.unwrap_or("untyped")
                ),
            ));
            return;
        }

        let support: &dyn ValidationSupport = self.support.as_ref();
        for check in &self.checks {
            let mut context = CheckContext::new(document, profile, support, issues);
            check.check(&mut context);
        }
    }
}

impl fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("checks", &self.check_names())
            .field("providers", &self.support.chain().provider_names())
            .field("fingerprints", &self.fingerprints.len())
            .finish()
    }
}

fn resource_type(document: &Value) -> Option<&str> {
    document
        .get("resourceType")
        .and_then(Value::as_str)
        .filter(|resource_type| !resource_type.is_empty())
}

fn declared_profiles(document: &Value) -> Vec<String> {
    document
        .pointer("/meta/profile")
        .and_then(Value::as_array)
        .map(|profiles| {
            profiles
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

//! Validation issues, results and the check capability the engine runs.

pub mod checks;
pub mod engine;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::provider::ValidationSupport;
use crate::types::StructureDefinition;

pub use checks::{
    BindingCheck, CardinalityCheck, DatatypeCheck, FixedValueCheck, UnknownElementCheck,
    default_checks,
};
pub use engine::ValidationEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "information",
        })
    }
}

/// One reported nonconformance or note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Path of the offending element, e.g. `Claim.insurance[0].coverage`
    pub location: String,
    pub severity: IssueSeverity,
    /// Machine-readable issue code, e.g. `cardinality-min`
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        severity: IssueSeverity,
        location: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            severity,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn fatal(
        location: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(IssueSeverity::Fatal, location, code, message)
    }

    pub fn error(
        location: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(IssueSeverity::Error, location, code, message)
    }

    pub fn warning(
        location: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(IssueSeverity::Warning, location, code, message)
    }

    pub fn information(
        location: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(IssueSeverity::Information, location, code, message)
    }

    pub fn is_error_or_worse(&self) -> bool {
        self.severity <= IssueSeverity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.location, self.message)
    }
}

/// Issues found in one document, in the order the checks produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Create a successful validation result with no issues
    pub fn success() -> Self {
        Self::default()
    }

    /// No fatal or error issues. Warnings and information do not count.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(ValidationIssue::is_error_or_worse)
    }

    pub fn has_fatal(&self) -> bool {
        self.count(IssueSeverity::Fatal) > 0
    }

    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationIssue> {
        self.issues.iter()
    }

    /// Issues grouped most severe first. Order within a severity is the
    /// check execution order.
    pub fn sorted_by_severity(&self) -> Vec<&ValidationIssue> {
        let mut sorted: Vec<_> = self.issues.iter().collect();
        sorted.sort_by_key(|issue| issue.severity);
        sorted
    }

    /// Issues reported at exactly this location.
    pub fn at<'a>(&'a self, location: &'a str) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues.iter().filter(move |i| i.location == location)
    }
}

impl<'a> IntoIterator for &'a ValidationResult {
    type Item = &'a ValidationIssue;
    type IntoIter = std::slice::Iter<'a, ValidationIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// State handed to each [`ResourceCheck`] for one document and one profile.
pub struct CheckContext<'a> {
    resource: &'a Value,
    profile: &'a StructureDefinition,
    support: &'a dyn ValidationSupport,
    issues: &'a mut Vec<ValidationIssue>,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        resource: &'a Value,
        profile: &'a StructureDefinition,
        support: &'a dyn ValidationSupport,
        issues: &'a mut Vec<ValidationIssue>,
    ) -> Self {
        Self {
            resource,
            profile,
            support,
            issues,
        }
    }

    pub fn resource(&self) -> &'a Value {
        self.resource
    }

    pub fn profile(&self) -> &'a StructureDefinition {
        self.profile
    }

    pub fn support(&self) -> &'a dyn ValidationSupport {
        self.support
    }

    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn add_error(
        &mut self,
        location: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.add_issue(ValidationIssue::error(location, code, message));
    }

    pub fn add_warning(
        &mut self,
        location: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.add_issue(ValidationIssue::warning(location, code, message));
    }
}

/// One validation rule. The engine owns the order checks run in; each
/// check owns the severity of what it reports.
pub trait ResourceCheck: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn check(&self, context: &mut CheckContext<'_>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_grouping_is_stable() {
        let result = ValidationResult::from_issues(vec![
            ValidationIssue::warning("A.b", "w1", "first warning"),
            ValidationIssue::error("A.c", "e1", "first error"),
            ValidationIssue::warning("A.d", "w2", "second warning"),
            ValidationIssue::fatal("A", "f1", "fatal"),
        ]);

        let codes: Vec<_> = result.sorted_by_severity().iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["f1", "e1", "w1", "w2"]);
        // Original order untouched
        assert_eq!(result.issues[0].code, "w1");
        assert!(!result.is_valid());
        assert!(result.has_fatal());
    }

    #[test]
    fn test_warnings_keep_result_valid() {
        let result = ValidationResult::from_issues(vec![ValidationIssue::information(
            "Patient",
            "note",
            "informational",
        )]);
        assert!(result.is_valid());
        assert_eq!(result.to_string(), "Patient -- informational\n");
    }
}

//! Code systems shared by most FHIR validation scenarios.
//!
//! Enumerated systems are published as [`CodeSystem`]/[`ValueSet`] records;
//! membership in them is evaluated by the in-memory terminology provider.
//! Grammar-based systems (MIME types, language tags) cannot be enumerated,
//! so codes in them are validated here directly.

use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{
    CodeValidation, Resolution, SupportProvider, SupportRequest, TerminologyAnswer,
    ValidationSupport, strip_version,
};
use crate::error::{Result, ValidatorError};
use crate::types::{CodeSystem, Concept, ValueSet};

pub const MIME_TYPES_SYSTEM: &str = "urn:ietf:bcp:13";
pub const LANGUAGES_SYSTEM: &str = "urn:ietf:bcp:47";
pub const CURRENCIES_SYSTEM: &str = "urn:iso:std:iso:4217";

const MIME_TYPES_VALUE_SET: &str = "http://hl7.org/fhir/ValueSet/mimetypes";
const LANGUAGE_VALUE_SETS: &[&str] = &[
    "http://hl7.org/fhir/ValueSet/languages",
    "http://hl7.org/fhir/ValueSet/all-languages",
];

/// (value set, code system, name, concepts)
type EnumeratedSystem = (
    &'static str,
    &'static str,
    &'static str,
    &'static [(&'static str, &'static str)],
);

const ENUMERATED_SYSTEMS: &[EnumeratedSystem] = &[
    (
        "http://hl7.org/fhir/ValueSet/administrative-gender",
        "http://hl7.org/fhir/administrative-gender",
        "AdministrativeGender",
        &[
            ("male", "Male"),
            ("female", "Female"),
            ("other", "Other"),
            ("unknown", "Unknown"),
        ],
    ),
    (
        "http://hl7.org/fhir/ValueSet/fm-status",
        "http://hl7.org/fhir/fm-status",
        "FinancialResourceStatusCodes",
        &[
            ("active", "Active"),
            ("cancelled", "Cancelled"),
            ("draft", "Draft"),
            ("entered-in-error", "Entered in Error"),
        ],
    ),
    (
        "http://hl7.org/fhir/ValueSet/eligibilityrequest-purpose",
        "http://hl7.org/fhir/eligibilityrequest-purpose",
        "EligibilityRequestPurpose",
        &[
            ("auth-requirements", "Coverage auth-requirements"),
            ("benefits", "Coverage benefits"),
            ("discovery", "Coverage Discovery"),
            ("validation", "Coverage Validation"),
        ],
    ),
    (
        "http://hl7.org/fhir/ValueSet/eligibilityresponse-purpose",
        "http://hl7.org/fhir/eligibilityresponse-purpose",
        "EligibilityResponsePurpose",
        &[
            ("auth-requirements", "Coverage auth-requirements"),
            ("benefits", "Coverage benefits"),
            ("discovery", "Coverage Discovery"),
            ("validation", "Coverage Validation"),
        ],
    ),
    (
        "http://hl7.org/fhir/ValueSet/claim-use",
        "http://hl7.org/fhir/claim-use",
        "Use",
        &[
            ("claim", "Claim"),
            ("preauthorization", "Preauthorization"),
            ("predetermination", "Predetermination"),
        ],
    ),
    (
        "http://hl7.org/fhir/ValueSet/remittance-outcome",
        "http://hl7.org/fhir/remittance-outcome",
        "ClaimProcessingCodes",
        &[
            ("queued", "Queued"),
            ("complete", "Processing Complete"),
            ("error", "Error"),
            ("partial", "Partial Processing"),
        ],
    ),
    (
        "http://hl7.org/fhir/ValueSet/claim-type",
        "http://terminology.hl7.org/CodeSystem/claim-type",
        "ClaimTypeCodes",
        &[
            ("institutional", "Institutional"),
            ("oral", "Oral"),
            ("pharmacy", "Pharmacy"),
            ("professional", "Professional"),
            ("vision", "Vision"),
        ],
    ),
    (
        "http://hl7.org/fhir/ValueSet/link-type",
        "http://hl7.org/fhir/link-type",
        "LinkType",
        &[
            ("replaced-by", "Replaced-by"),
            ("replaces", "Replaces"),
            ("refer", "Refer"),
            ("seealso", "See also"),
        ],
    ),
    (
        "http://hl7.org/fhir/ValueSet/currencies",
        CURRENCIES_SYSTEM,
        "Currencies",
        &[
            ("AED", "UAE Dirham"),
            ("AUD", "Australian Dollar"),
            ("BDT", "Taka"),
            ("CAD", "Canadian Dollar"),
            ("CHF", "Swiss Franc"),
            ("CNY", "Yuan Renminbi"),
            ("EUR", "Euro"),
            ("GBP", "Pound Sterling"),
            ("HKD", "Hong Kong Dollar"),
            ("IDR", "Rupiah"),
            ("INR", "Indian Rupee"),
            ("JPY", "Yen"),
            ("KES", "Kenyan Shilling"),
            ("LKR", "Sri Lanka Rupee"),
            ("NPR", "Nepalese Rupee"),
            ("NZD", "New Zealand Dollar"),
            ("PKR", "Pakistan Rupee"),
            ("SAR", "Saudi Riyal"),
            ("SGD", "Singapore Dollar"),
            ("USD", "US Dollar"),
            ("ZAR", "Rand"),
        ],
    ),
];

#[derive(Debug)]
pub struct CommonTerminologyProvider {
    code_systems: HashMap<&'static str, Arc<CodeSystem>>,
    value_sets: HashMap<&'static str, Arc<ValueSet>>,
    mime_type: Regex,
    language_tag: Regex,
}

impl CommonTerminologyProvider {
    pub fn new() -> Result<Self> {
        let mut code_systems = HashMap::new();
        let mut value_sets = HashMap::new();

        for (value_set, system, name, concepts) in ENUMERATED_SYSTEMS {
            let concepts = concepts
                .iter()
                .map(|(code, display)| Concept::new(*code, *display))
                .collect();
            code_systems.insert(*system, Arc::new(CodeSystem::new(*system, *name, concepts)));
            value_sets.insert(
                *value_set,
                Arc::new(ValueSet::including_systems(*value_set, *name, [*system])),
            );
        }

        Ok(Self {
            code_systems,
            value_sets,
            mime_type: pattern(r"^[a-z]+/[a-z0-9][a-z0-9!#$&^_.+-]*(\s*;\s*[^;]+)*$")?,
            language_tag: pattern(r"^[a-zA-Z]{2,3}(-[a-zA-Z0-9]{2,8})*$")?,
        })
    }

    fn grammar_for(&self, system: Option<&str>, value_set: Option<&str>) -> Option<(&str, &Regex)> {
        let system = system.map(strip_version);
        let value_set = value_set.map(strip_version);

        if system == Some(MIME_TYPES_SYSTEM) || value_set == Some(MIME_TYPES_VALUE_SET) {
            Some(("MIME type", &self.mime_type))
        } else if system == Some(LANGUAGES_SYSTEM)
            || value_set.is_some_and(|vs| LANGUAGE_VALUE_SETS.contains(&vs))
        {
            Some(("language tag", &self.language_tag))
        } else {
            None
        }
    }
}

fn pattern(source: &str) -> Result<Regex> {
    Regex::new(source).map_err(|e| ValidatorError::configuration(format!("pattern {source}: {e}")))
}

impl SupportProvider for CommonTerminologyProvider {
    fn name(&self) -> &str {
        "common-terminology"
    }

    fn resolve(&self, request: &SupportRequest, _root: &dyn ValidationSupport) -> Resolution {
        match request {
            SupportRequest::CodeSystem { url } => self
                .code_systems
                .get(strip_version(url))
                .map(|cs| Resolution::Terminology(TerminologyAnswer::CodeSystem(Arc::clone(cs))))
                .unwrap_or(Resolution::NotFound),
            SupportRequest::ValueSet { url } => self
                .value_sets
                .get(strip_version(url))
                .map(|vs| Resolution::Terminology(TerminologyAnswer::ValueSet(Arc::clone(vs))))
                .unwrap_or(Resolution::NotFound),
            SupportRequest::ValidateCode {
                system,
                code,
                value_set,
            } => match self.grammar_for(system.as_deref(), value_set.as_deref()) {
                Some((kind, grammar)) => {
                    let validation = if grammar.is_match(code) {
                        CodeValidation::valid(None)
                    } else {
                        CodeValidation::invalid(format!("'{code}' is not a valid {kind}"))
                    };
                    Resolution::Terminology(TerminologyAnswer::Code(validation))
                }
                None => Resolution::NotFound,
            },
            SupportRequest::StructureDefinition { .. } => Resolution::NotFound,
        }
    }
}

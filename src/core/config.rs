use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, ValidatorError};
use crate::validation::IssueSeverity;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub implementation_guides: Vec<ImplementationGuide>,
    /// Extra definition locations (URLs or file paths) outside any guide.
    pub profile_locations: Vec<String>,
    pub fetch_timeout: Duration,
    pub fetch_concurrency: usize,
    pub validation: ValidationOptions,
}

/// A published implementation guide and the profiles taken from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationGuide {
    /// Base URL ending in `/`, e.g. `https://ig.hcxprotocol.io/v0.7/`
    pub base_url: String,
    /// Profile names, e.g. `Claim`
    pub profiles: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    pub validate_bindings: bool,
    pub unknown_element_severity: IssueSeverity,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            implementation_guides: Vec::new(),
            profile_locations: Vec::new(),
            fetch_timeout: Duration::from_secs(30),
            fetch_concurrency: num_cpus::get(),
            validation: ValidationOptions::default(),
        }
    }
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            validate_bindings: true,
            unknown_element_severity: IssueSeverity::Error,
        }
    }
}

impl ValidatorConfig {
    /// HCX protocol v0.7 profiles plus the NRCES patient profile.
    pub fn hcx() -> Self {
        Self {
            implementation_guides: vec![
                ImplementationGuide::new(
                    "https://ig.hcxprotocol.io/v0.7/",
                    ["CoverageEligibilityRequest", "CoverageEligibilityResponse", "Claim"],
                ),
                ImplementationGuide::new("https://nrces.in/ndhm/fhir/r4/", ["Patient"]),
            ],
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            ValidatorError::configuration(format!("{}: {}", path.display(), e))
        })
    }

    pub fn with_implementation_guide(mut self, guide: ImplementationGuide) -> Self {
        self.implementation_guides.push(guide);
        self
    }

    pub fn with_profile_location(mut self, location: impl Into<String>) -> Self {
        self.profile_locations.push(location.into());
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_fetch_concurrency(mut self, concurrency: usize) -> Self {
        self.fetch_concurrency = concurrency;
        self
    }

    pub fn with_validation(mut self, validation: ValidationOptions) -> Self {
        self.validation = validation;
        self
    }

    /// Every location to fetch: guide profiles first, then explicit ones.
    pub fn locations(&self) -> Vec<String> {
        self.implementation_guides
            .iter()
            .flat_map(ImplementationGuide::locations)
            .chain(self.profile_locations.iter().cloned())
            .collect()
    }
}

impl ImplementationGuide {
    pub fn new<I, S>(base_url: impl Into<String>, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_url: base_url.into(),
            profiles: profiles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn locations(&self) -> Vec<String> {
        let base = if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        };
        self.profiles
            .iter()
            .map(|name| format!("{base}StructureDefinition-{name}.json"))
            .collect()
    }
}

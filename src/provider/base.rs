use std::collections::HashMap;
use std::sync::Arc;

use super::{Resolution, SupportProvider, SupportRequest, ValidationSupport, strip_version};
use crate::error::Result;
use crate::types::{BASE_DEFINITION_PREFIX, StructureDefinition};

/// Base specification definitions compiled into the crate.
const BUNDLED_DEFINITIONS: &[(&str, &str)] = &[
    (
        "CoverageEligibilityRequest",
        include_str!("../../definitions/base/CoverageEligibilityRequest.json"),
    ),
    (
        "CoverageEligibilityResponse",
        include_str!("../../definitions/base/CoverageEligibilityResponse.json"),
    ),
    ("Claim", include_str!("../../definitions/base/Claim.json")),
    ("Patient", include_str!("../../definitions/base/Patient.json")),
];

/// Resolves canonical base specification definitions (FHIR R4).
///
/// Requests may use the full canonical URL, a versioned canonical, or the
/// bare type name (`Patient`).
#[derive(Debug)]
pub struct BaseDefinitionProvider {
    definitions: HashMap<String, Arc<StructureDefinition>>,
}

impl BaseDefinitionProvider {
    /// Decode the bundled definitions. Fails only if the bundled JSON itself
    /// is corrupt.
    pub fn new() -> Result<Self> {
        let mut definitions = HashMap::with_capacity(BUNDLED_DEFINITIONS.len());
        for (name, json) in BUNDLED_DEFINITIONS {
            let location = format!("bundled:{name}");
            let definition = StructureDefinition::from_slice(json.as_bytes(), &location)?;
            definitions.insert(definition.url.clone(), Arc::new(definition));
        }

        tracing::debug!("Loaded {} bundled base definitions", definitions.len());
        Ok(Self { definitions })
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Resource types covered by the bundled definitions.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.definitions.values().map(|d| d.type_name.as_str())
    }

    fn lookup(&self, url: &str) -> Option<&Arc<StructureDefinition>> {
        let url = strip_version(url);
        if url.contains('/') {
            self.definitions.get(url)
        } else {
            self.definitions.get(&format!("{BASE_DEFINITION_PREFIX}{url}"))
        }
    }
}

impl SupportProvider for BaseDefinitionProvider {
    fn name(&self) -> &str {
        "base-definitions"
    }

    fn resolve(&self, request: &SupportRequest, _root: &dyn ValidationSupport) -> Resolution {
        match request {
            SupportRequest::StructureDefinition { url } => self
                .lookup(url)
                .map(|definition| Resolution::Definition(Arc::clone(definition)))
                .unwrap_or(Resolution::NotFound),
            _ => Resolution::NotFound,
        }
    }

    fn provides_base_definitions(&self) -> bool {
        true
    }
}

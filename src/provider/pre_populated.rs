use std::collections::HashMap;
use std::sync::Arc;

use super::{
    Resolution, SupportProvider, SupportRequest, TerminologyAnswer, ValidationSupport,
    strip_version,
};
use crate::types::{CodeSystem, StructureDefinition, ValueSet};

/// Custom definitions registered once, at construction.
///
/// Built through [`PrePopulatedProviderBuilder`]; there is no way to add
/// content to a finished provider.
#[derive(Debug, Default)]
pub struct PrePopulatedProvider {
    name: String,
    structure_definitions: HashMap<String, Arc<StructureDefinition>>,
    code_systems: HashMap<String, Arc<CodeSystem>>,
    value_sets: HashMap<String, Arc<ValueSet>>,
}

#[derive(Debug, Default)]
pub struct PrePopulatedProviderBuilder {
    provider: PrePopulatedProvider,
}

impl PrePopulatedProvider {
    pub fn builder() -> PrePopulatedProviderBuilder {
        PrePopulatedProviderBuilder::default()
    }

    pub fn structure_definition_count(&self) -> usize {
        self.structure_definitions.len()
    }

    /// Canonical URLs of the registered structure definitions.
    pub fn structure_definition_urls(&self) -> impl Iterator<Item = &str> {
        self.structure_definitions.keys().map(String::as_str)
    }
}

impl PrePopulatedProviderBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.provider.name = name.into();
        self
    }

    /// Register a definition. A later definition with the same canonical URL
    /// replaces the earlier one.
    pub fn structure_definition(mut self, definition: StructureDefinition) -> Self {
        let url = definition.url.clone();
        if self
            .provider
            .structure_definitions
            .insert(url.clone(), Arc::new(definition))
            .is_some()
        {
            tracing::warn!("Duplicate StructureDefinition {} replaced", url);
        }
        self
    }

    pub fn structure_definitions<I>(self, definitions: I) -> Self
    where
        I: IntoIterator<Item = StructureDefinition>,
    {
        definitions
            .into_iter()
            .fold(self, |builder, definition| builder.structure_definition(definition))
    }

    pub fn code_system(mut self, code_system: CodeSystem) -> Self {
        let url = code_system.url.clone();
        if self
            .provider
            .code_systems
            .insert(url.clone(), Arc::new(code_system))
            .is_some()
        {
            tracing::warn!("Duplicate CodeSystem {} replaced", url);
        }
        self
    }

    pub fn value_set(mut self, value_set: ValueSet) -> Self {
        let url = value_set.url.clone();
        if self
            .provider
            .value_sets
            .insert(url.clone(), Arc::new(value_set))
            .is_some()
        {
            tracing::warn!("Duplicate ValueSet {} replaced", url);
        }
        self
    }

    pub fn build(mut self) -> PrePopulatedProvider {
        if self.provider.name.is_empty() {
            self.provider.name = "pre-populated".to_string();
        }
        self.provider
    }
}

impl SupportProvider for PrePopulatedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, request: &SupportRequest, _root: &dyn ValidationSupport) -> Resolution {
        match request {
            SupportRequest::StructureDefinition { url } => self
                .structure_definitions
                .get(strip_version(url))
                .map(|sd| Resolution::Definition(Arc::clone(sd))),
            SupportRequest::CodeSystem { url } => self
                .code_systems
                .get(strip_version(url))
                .map(|cs| Resolution::Terminology(TerminologyAnswer::CodeSystem(Arc::clone(cs)))),
            SupportRequest::ValueSet { url } => self
                .value_sets
                .get(strip_version(url))
                .map(|vs| Resolution::Terminology(TerminologyAnswer::ValueSet(Arc::clone(vs)))),
            SupportRequest::ValidateCode { .. } => None,
        }
        .unwrap_or(Resolution::NotFound)
    }
}

use std::sync::Arc;

use super::{
    BaseDefinitionProvider, CommonTerminologyProvider, InMemoryTerminologyProvider,
    PrePopulatedProvider, Resolution, SupportProvider, SupportRequest, ValidationSupport,
};
use crate::error::{Result, ValidatorError};

/// Ordered providers; the first provider that answers wins.
///
/// Order is the precedence policy: an earlier provider shadows later ones
/// for the same request. Providers are added through `&mut self` while the
/// chain is being assembled; once it is shared behind an `Arc` it can no
/// longer change.
#[derive(Debug, Default)]
pub struct SupportChain {
    providers: Vec<Arc<dyn SupportProvider>>,
}

impl SupportChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard order: base definitions, common terminology, in-memory
    /// terminology, then the custom definitions.
    pub fn standard(base: BaseDefinitionProvider, custom: PrePopulatedProvider) -> Result<Self> {
        let mut chain = Self::new();
        chain.add_provider(Arc::new(base));
        chain.add_provider(Arc::new(CommonTerminologyProvider::new()?));
        chain.add_provider(Arc::new(InMemoryTerminologyProvider::new()));
        chain.add_provider(Arc::new(custom));
        chain.ensure_usable()?;
        Ok(chain)
    }

    pub fn add_provider(&mut self, provider: Arc<dyn SupportProvider>) -> &mut Self {
        tracing::debug!(
            "Adding provider '{}' at position {}",
            provider.name(),
            self.providers.len()
        );
        self.providers.push(provider);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn SupportProvider>) -> Self {
        self.add_provider(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// A chain without a base definition provider cannot resolve any
    /// document's profile.
    pub fn ensure_usable(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(ValidatorError::configuration(
                "support chain has no providers",
            ));
        }
        if !self.providers.iter().any(|p| p.provides_base_definitions()) {
            return Err(ValidatorError::configuration(
                "support chain has no provider for base definitions",
            ));
        }
        Ok(())
    }

    /// Query providers in insertion order, handing `root` to each one for
    /// nested lookups.
    pub fn resolve_with_root(
        &self,
        request: &SupportRequest,
        root: &dyn ValidationSupport,
    ) -> Resolution {
        for provider in &self.providers {
            let resolution = provider.resolve(request, root);
            if resolution.is_found() {
                tracing::trace!("{} resolved by '{}'", request, provider.name());
                return resolution;
            }
        }
        Resolution::NotFound
    }
}

impl ValidationSupport for SupportChain {
    fn resolve(&self, request: &SupportRequest) -> Resolution {
        self.resolve_with_root(request, self)
    }
}

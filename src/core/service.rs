use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;

use super::{ValidationOptions, ValidatorConfig};
use crate::error::Result;
use crate::provider::{
    BaseDefinitionProvider, CachingValidationSupport, PrePopulatedProvider, SupportChain,
};
use crate::source::{DefinitionSource, FetchedDefinition, LocationDefinitionSource, fetch_definitions};
use crate::utils::DefinitionFingerprint;
use crate::validation::ValidationEngine;

/// Owns the one validation engine of a process (or of whoever holds it).
///
/// Nothing is fetched until the first [`get_validator`](Self::get_validator)
/// call. That call fetches every configured definition and assembles the
/// engine; callers arriving meanwhile wait for it. A failed assembly stores
/// nothing, so the next call starts over. After success the engine is
/// handed out as-is forever.
pub struct ValidatorService {
    config: ValidatorConfig,
    source: Arc<dyn DefinitionSource>,
    engine: OnceCell<Arc<ValidationEngine>>,
    assemblies: AtomicUsize,
}

impl ValidatorService {
    pub fn new(config: ValidatorConfig, source: Arc<dyn DefinitionSource>) -> Self {
        Self {
            config,
            source,
            engine: OnceCell::new(),
            assemblies: AtomicUsize::new(0),
        }
    }

    /// Service reading definitions over HTTP(S) or from local files,
    /// depending on each location.
    pub fn from_config(config: ValidatorConfig) -> Result<Self> {
        let source = LocationDefinitionSource::new(config.fetch_timeout)?;
        Ok(Self::new(config, Arc::new(source)))
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub async fn get_validator(&self) -> Result<Arc<ValidationEngine>> {
        self.engine
            .get_or_try_init(|| self.build())
            .await
            .map(Arc::clone)
    }

    pub fn is_ready(&self) -> bool {
        self.engine.initialized()
    }

    /// Number of completed assemblies. Never more than one.
    pub fn assembly_count(&self) -> usize {
        self.assemblies.load(Ordering::Acquire)
    }

    /// Fingerprints of the fetched definitions, once the engine is built.
    pub fn fingerprints(&self) -> Option<&[DefinitionFingerprint]> {
        self.engine.get().map(|engine| engine.fingerprints())
    }

    async fn build(&self) -> Result<Arc<ValidationEngine>> {
        let locations = self.config.locations();
        tracing::info!(
            "Assembling validator from {} definition location(s)",
            locations.len()
        );

        let fetched = fetch_definitions(
            self.source.as_ref(),
            &locations,
            self.config.fetch_concurrency,
        )
        .await
        .inspect_err(|e| tracing::warn!("Validator assembly failed: {}", e))?;

        let base = BaseDefinitionProvider::new()?;
        let engine = assemble_engine(base, fetched, &self.config.validation)?;

        self.assemblies.fetch_add(1, Ordering::AcqRel);
        tracing::info!(
            "Validator ready: providers [{}], {} custom definition(s)",
            engine.support().chain().provider_names().join(", "),
            engine.fingerprints().len()
        );
        Ok(Arc::new(engine))
    }
}

impl std::fmt::Debug for ValidatorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorService")
            .field("locations", &self.config.locations())
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Build an engine from already fetched definitions. No I/O.
pub fn assemble_engine(
    base: BaseDefinitionProvider,
    fetched: Vec<FetchedDefinition>,
    options: &ValidationOptions,
) -> Result<ValidationEngine> {
    let mut fingerprints = Vec::with_capacity(fetched.len());
    let mut custom = PrePopulatedProvider::builder();

    for FetchedDefinition {
        definition,
        fingerprint,
        ..
    } in fetched
    {
        tracing::info!(
            "Using {} from {} (sha256 {}, fetched {})",
            definition.label(),
            fingerprint.location,
            fingerprint.short_hash(),
            fingerprint.fetched_at.to_rfc3339()
        );
        custom = custom.structure_definition(definition);
        fingerprints.push(fingerprint);
    }

    let chain = SupportChain::standard(base, custom.build())?;
    let support = Arc::new(CachingValidationSupport::new(chain));
    Ok(ValidationEngine::new(support, options)?.with_fingerprints(fingerprints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidatorError;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait]
    impl DefinitionSource for Unreachable {
        async fn load_raw(&self, location: &str) -> Result<Vec<u8>> {
            Err(ValidatorError::fetch(location, "connection refused"))
        }
    }

    #[tokio::test]
    async fn test_no_locations_builds_base_only_engine() {
        let service = ValidatorService::new(ValidatorConfig::default(), Arc::new(Unreachable));
        assert!(!service.is_ready());

        let engine = service.get_validator().await.unwrap();
        assert!(service.is_ready());
        assert_eq!(service.assembly_count(), 1);
        assert!(engine.fingerprints().is_empty());
        assert_eq!(service.fingerprints().map(<[_]>::len), Some(0));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_stored() {
        let config = ValidatorConfig::default().with_profile_location("https://example.org/sd.json");
        let service = ValidatorService::new(config, Arc::new(Unreachable));

        assert!(service.get_validator().await.unwrap_err().is_fetch());
        assert!(!service.is_ready());
        assert_eq!(service.assembly_count(), 0);
    }
}

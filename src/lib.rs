//! # OctoFHIR Validation Support
//!
//! Validates FHIR R4 JSON resources against base and implementation-guide
//! profiles through an ordered, cached chain of support providers.
//!
//! ## Features
//!
//! - **Support chain**: bundled base definitions, shared terminology, in-memory
//!   code evaluation and pre-populated custom profiles, queried in order
//! - **Caching**: every resolution (misses included) memoized in a lock-free map
//! - **One-time assembly**: profiles fetched once over HTTP(S) or from disk,
//!   then the engine is shared for the life of the service
//! - **Checks**: cardinality, unknown elements, datatypes, bindings and fixed values
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use octofhir_validation_support::*;
//!
//! # async fn example() -> Result<()> {
//! let service = ValidatorService::from_config(ValidatorConfig::hcx())?;
//! let validator = service.get_validator().await?;
//!
//! let claim = serde_json::json!({"resourceType": "Claim", "status": "active"});
//! for issue in validator.validate(&claim).sorted_by_severity() {
//!     println!("{} {}", issue.severity, issue);
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod provider;
pub mod source;
pub mod types;
pub mod utils;
pub mod validation;

pub use crate::core::{
    ImplementationGuide, ValidationOptions, ValidatorConfig, ValidatorService, assemble_engine,
};
pub use error::{Result, ValidatorError};
pub use provider::{
    BaseDefinitionProvider, CacheStats, CachingValidationSupport, CodeValidation,
    CommonTerminologyProvider, InMemoryTerminologyProvider, PrePopulatedProvider,
    PrePopulatedProviderBuilder, Resolution, SupportChain, SupportProvider, SupportRequest,
    TerminologyAnswer, ValidationSupport,
};
pub use source::{
    DefinitionLocation, DefinitionSource, FetchedDefinition, FileDefinitionSource,
    HttpDefinitionSource, LocationDefinitionSource, fetch_definition, fetch_definitions,
};
pub use types::{CodeSystem, Concept, ElementDefinition, StructureDefinition, ValueSet};
pub use utils::DefinitionFingerprint;
pub use validation::{
    CheckContext, IssueSeverity, ResourceCheck, ValidationEngine, ValidationIssue,
    ValidationResult,
};

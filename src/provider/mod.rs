//! Validation support providers and the chain that orders them.
//!
//! Every provider answers the same question, "can you resolve this
//! request?", through [`SupportProvider::resolve`]. Providers are stateless
//! per request: the same request always yields the same [`Resolution`],
//! which is what lets [`CachingValidationSupport`] memoize answers forever.

pub mod base;
pub mod cache;
pub mod chain;
pub mod common_terminology;
pub mod in_memory_terminology;
pub mod pre_populated;

use std::fmt;
use std::sync::Arc;

use crate::types::{CodeSystem, StructureDefinition, ValueSet};

pub use base::BaseDefinitionProvider;
pub use cache::{CacheStats, CachingValidationSupport};
pub use chain::SupportChain;
pub use common_terminology::CommonTerminologyProvider;
pub use in_memory_terminology::InMemoryTerminologyProvider;
pub use pre_populated::{PrePopulatedProvider, PrePopulatedProviderBuilder};

/// Identity of one resolution request; doubles as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SupportRequest {
    StructureDefinition {
        url: String,
    },
    CodeSystem {
        url: String,
    },
    ValueSet {
        url: String,
    },
    ValidateCode {
        system: Option<String>,
        code: String,
        value_set: Option<String>,
    },
}

impl SupportRequest {
    pub fn structure_definition(url: impl Into<String>) -> Self {
        Self::StructureDefinition { url: url.into() }
    }

    pub fn code_system(url: impl Into<String>) -> Self {
        Self::CodeSystem { url: url.into() }
    }

    pub fn value_set(url: impl Into<String>) -> Self {
        Self::ValueSet { url: url.into() }
    }

    pub fn validate_code(
        system: Option<&str>,
        code: impl Into<String>,
        value_set: Option<&str>,
    ) -> Self {
        Self::ValidateCode {
            system: system.map(str::to_string),
            code: code.into(),
            value_set: value_set.map(str::to_string),
        }
    }
}

impl fmt::Display for SupportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StructureDefinition { url } => write!(f, "StructureDefinition {url}"),
            Self::CodeSystem { url } => write!(f, "CodeSystem {url}"),
            Self::ValueSet { url } => write!(f, "ValueSet {url}"),
            Self::ValidateCode {
                system,
                code,
                value_set,
            } => write!(
                f,
                "validate-code {}#{} in {}",
                system.as_deref().unwrap_or("?"),
                code,
                value_set.as_deref().unwrap_or("-")
            ),
        }
    }
}

/// Answer to a [`SupportRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Definition(Arc<StructureDefinition>),
    Terminology(TerminologyAnswer),
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TerminologyAnswer {
    CodeSystem(Arc<CodeSystem>),
    ValueSet(Arc<ValueSet>),
    Code(CodeValidation),
}

/// Outcome of validating one code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeValidation {
    pub valid: bool,
    /// Display text for the code (if found)
    pub display: Option<String>,
    /// Explanation, set for invalid codes
    pub message: Option<String>,
}

impl CodeValidation {
    pub fn valid(display: Option<String>) -> Self {
        Self {
            valid: true,
            display,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            display: None,
            message: Some(message.into()),
        }
    }
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    pub fn definition(&self) -> Option<&Arc<StructureDefinition>> {
        match self {
            Self::Definition(definition) => Some(definition),
            _ => None,
        }
    }

    pub fn code_system(&self) -> Option<&Arc<CodeSystem>> {
        match self {
            Self::Terminology(TerminologyAnswer::CodeSystem(system)) => Some(system),
            _ => None,
        }
    }

    pub fn value_set(&self) -> Option<&Arc<ValueSet>> {
        match self {
            Self::Terminology(TerminologyAnswer::ValueSet(value_set)) => Some(value_set),
            _ => None,
        }
    }

    pub fn code_validation(&self) -> Option<&CodeValidation> {
        match self {
            Self::Terminology(TerminologyAnswer::Code(validation)) => Some(validation),
            _ => None,
        }
    }
}

/// Something that resolves requests end to end: a chain, or the cache in
/// front of one.
pub trait ValidationSupport: Send + Sync {
    fn resolve(&self, request: &SupportRequest) -> Resolution;

    fn fetch_structure_definition(&self, url: &str) -> Option<Arc<StructureDefinition>> {
        self.resolve(&SupportRequest::structure_definition(url))
            .definition()
            .cloned()
    }

    fn fetch_code_system(&self, url: &str) -> Option<Arc<CodeSystem>> {
        self.resolve(&SupportRequest::code_system(url))
            .code_system()
            .cloned()
    }

    fn fetch_value_set(&self, url: &str) -> Option<Arc<ValueSet>> {
        self.resolve(&SupportRequest::value_set(url))
            .value_set()
            .cloned()
    }

    /// `None` when no provider could evaluate the code.
    fn validate_code(
        &self,
        system: Option<&str>,
        code: &str,
        value_set: Option<&str>,
    ) -> Option<CodeValidation> {
        self.resolve(&SupportRequest::validate_code(system, code, value_set))
            .code_validation()
            .cloned()
    }
}

/// One link of a [`SupportChain`].
///
/// `root` is the outermost support the request entered through. Providers
/// that need further lookups to answer (such as terminology evaluation)
/// must go through `root` so those lookups see the whole chain and the cache.
pub trait SupportProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn resolve(&self, request: &SupportRequest, root: &dyn ValidationSupport) -> Resolution;

    /// Whether this provider answers base specification definitions.
    fn provides_base_definitions(&self) -> bool {
        false
    }
}

/// Canonical URL without its `|version` suffix.
pub fn strip_version(canonical: &str) -> &str {
    canonical
        .split_once('|')
        .map(|(url, _)| url)
        .unwrap_or(canonical)
}

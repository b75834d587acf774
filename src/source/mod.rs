//! Definition sources.
//!
//! A [`DefinitionSource`] turns one location (a remote URL or a local path)
//! into one [`StructureDefinition`]. Sources perform I/O on every call: no
//! caching and no retries happen at this layer.

pub mod file;
pub mod http;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Result, ValidatorError};
use crate::types::StructureDefinition;
use crate::utils::{DefinitionFingerprint, content_hash};

pub use file::FileDefinitionSource;
pub use http::HttpDefinitionSource;

#[async_trait]
pub trait DefinitionSource: Send + Sync + std::fmt::Debug {
    /// Fetch the raw payload stored at `location`.
    async fn load_raw(&self, location: &str) -> Result<Vec<u8>>;

    /// Fetch and parse the definition stored at `location`.
    async fn load(&self, location: &str) -> Result<StructureDefinition> {
        let bytes = self.load_raw(location).await?;
        StructureDefinition::from_slice(&bytes, location)
    }
}

/// Where a definition lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionLocation {
    Remote(Url),
    Local(PathBuf),
}

impl DefinitionLocation {
    /// Classify a location string. Anything without a `scheme://` prefix is
    /// treated as a filesystem path.
    pub fn parse(location: &str) -> Result<Self> {
        if !location.contains("://") {
            return Ok(Self::Local(PathBuf::from(location)));
        }

        let url = Url::parse(location)
            .map_err(|e| ValidatorError::fetch(location, format!("invalid location: {e}")))?;

        match url.scheme() {
            "http" | "https" => Ok(Self::Remote(url)),
            "file" => url.to_file_path().map(Self::Local).map_err(|_| {
                ValidatorError::fetch(location, "file URL does not name a local path")
            }),
            other => Err(ValidatorError::fetch(
                location,
                format!("unsupported location scheme '{other}'"),
            )),
        }
    }
}

/// Routes each location to the HTTP or the file source by its scheme.
#[derive(Debug, Clone)]
pub struct LocationDefinitionSource {
    http: HttpDefinitionSource,
    file: FileDefinitionSource,
}

impl LocationDefinitionSource {
    pub fn new(fetch_timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpDefinitionSource::new(fetch_timeout)?,
            file: FileDefinitionSource::new(),
        })
    }

    pub fn with_file_source(mut self, file: FileDefinitionSource) -> Self {
        self.file = file;
        self
    }
}

#[async_trait]
impl DefinitionSource for LocationDefinitionSource {
    async fn load_raw(&self, location: &str) -> Result<Vec<u8>> {
        match DefinitionLocation::parse(location)? {
            DefinitionLocation::Remote(_) => self.http.load_raw(location).await,
            DefinitionLocation::Local(_) => self.file.load_raw(location).await,
        }
    }
}

/// A parsed definition together with where it came from.
#[derive(Debug, Clone)]
pub struct FetchedDefinition {
    pub location: String,
    pub definition: StructureDefinition,
    pub fingerprint: DefinitionFingerprint,
}

/// Fetch one definition and fingerprint its payload.
pub async fn fetch_definition(
    source: &dyn DefinitionSource,
    location: &str,
) -> Result<FetchedDefinition> {
    let bytes = source.load_raw(location).await?;
    let definition = StructureDefinition::from_slice(&bytes, location)?;
    let fingerprint = DefinitionFingerprint::new(
        definition.url.clone(),
        definition.version.clone(),
        location,
        content_hash(&bytes),
    );

    tracing::debug!(
        "Loaded {} from {} ({})",
        definition.label(),
        location,
        fingerprint.short_hash()
    );

    Ok(FetchedDefinition {
        location: location.to_string(),
        definition,
        fingerprint,
    })
}

/// Fetch every location, at most `concurrency` at a time.
///
/// Results keep the order of `locations`. The first failure aborts the whole
/// batch and drops the fetches still in flight.
pub async fn fetch_definitions(
    source: &dyn DefinitionSource,
    locations: &[String],
    concurrency: usize,
) -> Result<Vec<FetchedDefinition>> {
    let fetches: Vec<_> = locations
        .iter()
        .map(|location| fetch_definition(source, location))
        .collect();
    stream::iter(fetches)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_classification() {
        assert!(matches!(
            DefinitionLocation::parse("https://ig.hcxprotocol.io/v0.7/StructureDefinition-Claim.json"),
            Ok(DefinitionLocation::Remote(_))
        ));
        assert_eq!(
            DefinitionLocation::parse("definitions/Claim.json").unwrap(),
            DefinitionLocation::Local(PathBuf::from("definitions/Claim.json"))
        );

        let err = DefinitionLocation::parse("ftp://example.org/sd.json").unwrap_err();
        assert!(err.is_fetch());
    }
}

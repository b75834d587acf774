use async_trait::async_trait;
use std::path::PathBuf;

use super::{DefinitionLocation, DefinitionSource};
use crate::error::{Result, ValidatorError};

/// Reads definitions from the local filesystem.
///
/// Relative paths are resolved against `root` when one is set, otherwise
/// against the process working directory.
#[derive(Debug, Clone, Default)]
pub struct FileDefinitionSource {
    root: Option<PathBuf>,
}

impl FileDefinitionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve_path(&self, path: PathBuf) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl DefinitionSource for FileDefinitionSource {
    async fn load_raw(&self, location: &str) -> Result<Vec<u8>> {
        let path = match DefinitionLocation::parse(location)? {
            DefinitionLocation::Local(path) => self.resolve_path(path),
            DefinitionLocation::Remote(_) => {
                return Err(ValidatorError::fetch(
                    location,
                    "remote location given to the file source",
                ));
            }
        };

        tokio::fs::read(&path)
            .await
            .map_err(|e| ValidatorError::fetch(location, format!("{}: {e}", path.display())))
    }
}

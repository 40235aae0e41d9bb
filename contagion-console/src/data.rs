use contagion_engine::{
    BundledData, CatalogError, DataLoader, DiseaseCatalog, EngineConfig, EngineConfigError,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Config(#[from] EngineConfigError),
}

/// Loads the catalog and tuning from files when given, else the bundled data.
#[derive(Debug, Clone, Default)]
pub struct FileData {
    pub catalog: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl FileData {
    pub const fn new(catalog: Option<PathBuf>, config: Option<PathBuf>) -> Self {
        Self { catalog, config }
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

impl DataLoader for FileData {
    type Error = LoadError;

    fn load_catalog(&self) -> Result<DiseaseCatalog, Self::Error> {
        match &self.catalog {
            Some(path) => Ok(DiseaseCatalog::from_json(&read(path)?)?),
            None => Ok(BundledData.load_catalog()?),
        }
    }

    fn load_config(&self) -> Result<EngineConfig, Self::Error> {
        match &self.config {
            Some(path) => Ok(EngineConfig::from_json(&read(path)?)?),
            None => Ok(EngineConfig::default()),
        }
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ledgerlens_categorize::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use ledgerlens_categorize::{CategorizationService, CompletionBackend, CompletionError, OpenAiCompletion};
use ledgerlens_core::{CategoryTaxonomy, TaxonomyError};
use ledgerlens_ocr::EnhanceOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),
    #[error("Model escalation is enabled but ${0} is not set")]
    MissingApiKey(String),
    #[error("Failed to create completion backend: {0}")]
    Completion(#[from] CompletionError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ocr: OcrConfig,
    pub preprocess: EnhanceOptions,
    pub taxonomy: TaxonomyConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_data_path: Option<String>,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { tesseract_data_path: None, language: "eng".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    /// Taxonomy TOML file; the built-in taxonomy is used when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `explicit` if given (it must exist), else the per-user config file
    /// if present, else defaults. Returns the path actually read.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match default_config_path().filter(|p| p.exists()) {
                Some(p) => p,
                None => return Ok((Self::default(), None)),
            },
        };
        let content = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok((config, Some(path)))
    }

    pub fn load_taxonomy(&self) -> Result<Arc<CategoryTaxonomy>, ConfigError> {
        match &self.taxonomy.path {
            Some(path) => Ok(Arc::new(CategoryTaxonomy::load(path)?)),
            None => Ok(CategoryTaxonomy::builtin()),
        }
    }

    /// The configured completion backend, reading the key from the environment.
    pub fn completion_backend(&self) -> Result<Option<Arc<dyn CompletionBackend>>, ConfigError> {
        let key = std::env::var(&self.model.api_key_env).ok();
        self.completion_backend_with_key(key)
    }

    pub fn completion_backend_with_key(
        &self,
        api_key: Option<String>,
    ) -> Result<Option<Arc<dyn CompletionBackend>>, ConfigError> {
        if !self.model.enabled {
            return Ok(None);
        }
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(self.model.api_key_env.clone()))?;
        let backend = OpenAiCompletion::new(api_key, Duration::from_secs(self.model.timeout_secs))?
            .with_base_url(&self.model.base_url)
            .with_model(&self.model.model);
        Ok(Some(Arc::new(backend)))
    }

    pub fn categorization_service(&self) -> Result<CategorizationService, ConfigError> {
        let service = CategorizationService::new(self.load_taxonomy()?);
        Ok(match self.completion_backend()? {
            Some(backend) => service.with_model(backend),
            None => service,
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "ledgerlens", "LedgerLens")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

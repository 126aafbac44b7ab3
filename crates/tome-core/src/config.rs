use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TomeError};

/// Top-level configuration for the Tome application.
///
/// Loaded from `~/.tome/config.toml` by default. Each section corresponds
/// to one subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl TomeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TomeConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| TomeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Path of the diagnostic conversation transcript, rewritten on every
    /// committed turn. Empty string disables the transcript.
    pub transcript_path: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            transcript_path: "message_history.txt".to_string(),
        }
    }
}

/// Source document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Folder of source documents to index.
    pub folder: PathBuf,
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in characters.
    pub chunk_overlap: usize,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("./docs"),
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

/// Vector index persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Where the persisted index lives. When unset, the index path is
    /// derived from the document folder: `<folder>/.tome/index.json`.
    pub path: Option<PathBuf>,
}

impl IndexConfig {
    /// Resolve the on-disk index path for the given document folder.
    pub fn resolve(&self, docs_folder: &Path) -> PathBuf {
        match &self.path {
            Some(p) => p.clone(),
            None => docs_folder.join(".tome").join("index.json"),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of passages to retrieve per query.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Generation service settings.
///
/// The API key itself is never stored in the config file; only the name of
/// the environment variable that holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Chat model name.
    pub model: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Dimensionality of the embedding model's vectors.
    pub embedding_dimensions: usize,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomeConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.documents.chunk_size, 1000);
        assert_eq!(config.documents.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.index.path.is_none());
    }

    #[test]
    fn test_index_path_derived_from_folder() {
        let config = IndexConfig::default();
        let resolved = config.resolve(Path::new("/data/docs"));
        assert_eq!(resolved, PathBuf::from("/data/docs/.tome/index.json"));
    }

    #[test]
    fn test_index_path_explicit_override() {
        let config = IndexConfig {
            path: Some(PathBuf::from("/var/tome/shared_index.json")),
        };
        let resolved = config.resolve(Path::new("/data/docs"));
        assert_eq!(resolved, PathBuf::from("/var/tome/shared_index.json"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [documents]
            folder = "/tmp/library"

            [retrieval]
            top_k = 3
        "#;
        let config: TomeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.documents.folder, PathBuf::from("/tmp/library"));
        assert_eq!(config.documents.chunk_size, 1000);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = TomeConfig::default();
        config.retrieval.top_k = 7;
        config.documents.folder = PathBuf::from("/srv/books");
        config.save(&path).unwrap();

        let loaded = TomeConfig::load(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 7);
        assert_eq!(loaded.documents.folder, PathBuf::from("/srv/books"));
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = TomeConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn test_api_key_never_in_config() {
        // Only the env var name is serialized.
        let serialized = toml::to_string(&TomeConfig::default()).unwrap();
        assert!(serialized.contains("api_key_env"));
        assert!(!serialized.contains("sk-"));
    }
}

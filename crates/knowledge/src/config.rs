//! Knowledge base configuration and on-disk layout.
//!
//! Each base lives under `.docqa/knowledge/<base>/` with a `config.yaml`,
//! the `index.sqlite` store and a `documents/` directory holding copies of
//! ingested files.

use crate::types::KnowledgeBaseConfig;
use docqa_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Name used when no base is given on the command line.
pub const DEFAULT_BASE: &str = "default";

impl KnowledgeBaseConfig {
    /// Reject settings that would break chunking or retrieval.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be greater than 0".to_string()));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.embedding_dimension == 0 {
            return Err(AppError::Config(
                "embedding_dimension must be greater than 0".to_string(),
            ));
        }

        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be greater than 0".to_string()));
        }

        if self.batch_size == 0 {
            return Err(AppError::Config("batch_size must be greater than 0".to_string()));
        }

        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AppError::Config(format!(
                "similarity_threshold must be within [-1, 1], got {}",
                self.similarity_threshold
            )));
        }

        Ok(())
    }
}

/// Load knowledge base configuration.
///
/// Loads from `.docqa/knowledge/<base>/config.yaml` if it exists, otherwise
/// returns defaults named after the base. The result is validated either way.
pub fn load_config(workspace: &Path, base_name: &str) -> AppResult<KnowledgeBaseConfig> {
    let config_path = get_config_path(workspace, base_name);

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
        })?;

        let config: KnowledgeBaseConfig = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
        })?;

        tracing::debug!("Loaded knowledge base config for '{}'", base_name);
        config
    } else {
        tracing::debug!(
            "Using default knowledge base config for '{}' (no config file found)",
            base_name
        );
        KnowledgeBaseConfig::default()
    };

    config.name = base_name.to_string();
    config.validate()?;
    Ok(config)
}

/// Save knowledge base configuration.
pub fn save_config(workspace: &Path, config: &KnowledgeBaseConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace, &config.name);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml = serde_yaml::to_string(config)?;
    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved knowledge base config for '{}'", config.name);
    Ok(())
}

/// Get the base directory for a knowledge base.
pub fn get_base_dir(workspace: &Path, base_name: &str) -> PathBuf {
    workspace.join(".docqa").join("knowledge").join(base_name)
}

/// Get the path to a base's config file.
pub fn get_config_path(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("config.yaml")
}

/// Get the SQLite store path for a base.
pub fn get_index_path(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("index.sqlite")
}

/// Get the directory holding copies of ingested files.
pub fn get_documents_dir(workspace: &Path, base_name: &str) -> PathBuf {
    get_base_dir(workspace, base_name).join("documents")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), "test-base").unwrap();

        assert_eq!(config.name, "test-base");
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.chunk_size, 500);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let config = KnowledgeBaseConfig {
            name: "my-base".to_string(),
            chunk_size: 120,
            chunk_overlap: 20,
            ..Default::default()
        };

        save_config(temp.path(), &config).unwrap();

        let loaded = load_config(temp.path(), "my-base").unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_overlap() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path(), "bad");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "chunk_size: 10\nchunk_overlap: 10\n").unwrap();

        assert!(matches!(
            load_config(temp.path(), "bad"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_validate_threshold_range() {
        let config = KnowledgeBaseConfig {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = KnowledgeBaseConfig {
            similarity_threshold: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_sizes() {
        let config = KnowledgeBaseConfig {
            chunk_size: 0,
            chunk_overlap: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = KnowledgeBaseConfig {
            embedding_dimension: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_layout_paths() {
        let ws = Path::new("/ws");
        assert_eq!(
            get_index_path(ws, "kb"),
            PathBuf::from("/ws/.docqa/knowledge/kb/index.sqlite")
        );
        assert_eq!(
            get_documents_dir(ws, "kb"),
            PathBuf::from("/ws/.docqa/knowledge/kb/documents")
        );
    }
}

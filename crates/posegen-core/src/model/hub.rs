//! Locating base models locally or on the Hugging Face hub.

use crate::error::{PosegenError, Result};
use crate::train::{MANIFEST_FILE, TOKENIZER_FILE, WEIGHTS_FILE};
use hf_hub::api::sync::ApiBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the hub access token.
pub const DEFAULT_TOKEN_VAR: &str = "HF_TOKEN";

/// Hub access settings.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct HubConfig {
    /// Access token; anonymous when `None`.
    #[serde(skip)]
    pub token: Option<String>,
    /// Cache directory; the hub default when `None`.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl HubConfig {
    /// Read the token from the environment variable `var`. An unset or empty
    /// variable leaves the config anonymous.
    pub fn from_env(var: &str) -> Self {
        let token = std::env::var(var).ok().filter(|t| !t.trim().is_empty());
        if token.is_none() {
            tracing::warn!(var, "no hub token set; gated models will fail to download");
        }
        Self {
            token,
            cache_dir: None,
        }
    }

    /// Override the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }
}

impl std::fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

/// A resolved model location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSource {
    /// Name as given: a directory or a hub repository id.
    pub name: String,
    /// Directory holding the model files.
    pub dir: PathBuf,
    /// Tokenizer definition.
    pub tokenizer: PathBuf,
    /// Weights of a checkpoint saved by this crate. Weights without a
    /// training manifest are not read.
    pub weights: Option<PathBuf>,
    /// Whether the files came from the hub.
    pub from_hub: bool,
}

impl ModelSource {
    /// Resolve `name`: an existing directory is used as is, anything else is
    /// treated as a hub repository id and downloaded.
    pub fn resolve(name: &str, hub: &HubConfig) -> Result<Self> {
        let local = Path::new(name);
        if local.is_dir() {
            return Self::local(local);
        }
        Self::download(name, hub)
    }

    /// Use a local model directory.
    pub fn local(dir: &Path) -> Result<Self> {
        let tokenizer = dir.join(TOKENIZER_FILE);
        if !tokenizer.is_file() {
            return Err(PosegenError::model_unavailable(
                dir.display().to_string(),
                format!("{TOKENIZER_FILE} not found"),
            ));
        }
        let weights = Some(dir.join(WEIGHTS_FILE)).filter(|p| p.is_file());
        let weights = match weights {
            Some(path) if dir.join(MANIFEST_FILE).is_file() => Some(path),
            Some(path) => {
                tracing::warn!(
                    weights = %path.display(),
                    "no {MANIFEST_FILE} next to weights; using the tokenizer only"
                );
                None
            }
            None => None,
        };
        tracing::debug!(dir = %dir.display(), has_weights = weights.is_some(), "using local model");
        Ok(Self {
            name: dir.display().to_string(),
            dir: dir.to_path_buf(),
            tokenizer,
            weights,
            from_hub: false,
        })
    }

    /// Fetch a repository's tokenizer from the hub, plus its weights when the
    /// repository is a checkpoint saved by this crate.
    pub fn download(repo_id: &str, hub: &HubConfig) -> Result<Self> {
        let mut builder = ApiBuilder::new().with_token(hub.token.clone());
        if let Some(dir) = &hub.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder
            .build()
            .map_err(|e| PosegenError::Hub(format!("failed to create hub client: {e}")))?;
        let repo = api.model(repo_id.to_string());

        tracing::info!(repo = repo_id, "fetching model from hub");
        let tokenizer = repo
            .get(TOKENIZER_FILE)
            .map_err(|e| PosegenError::model_unavailable(repo_id, e))?;
        let weights = match repo.get(MANIFEST_FILE) {
            Ok(_) => Some(
                repo.get(WEIGHTS_FILE)
                    .map_err(|e| PosegenError::model_unavailable(repo_id, e))?,
            ),
            Err(_) => None,
        };
        let dir = tokenizer
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| PosegenError::model_unavailable(repo_id, "hub returned a bare file name"))?;

        Ok(Self {
            name: repo_id.to_string(),
            dir,
            tokenizer,
            weights,
            from_hub: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_directory_is_used_directly() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();
        let name = dir.path().to_str().unwrap();

        let source = ModelSource::resolve(name, &HubConfig::default()).unwrap();
        assert!(!source.from_hub);
        assert_eq!(source.tokenizer, dir.path().join("tokenizer.json"));
        assert_eq!(source.weights, None);
    }

    #[test]
    fn foreign_weights_are_not_used() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TOKENIZER_FILE), "{}").unwrap();
        std::fs::write(dir.path().join(WEIGHTS_FILE), b"not ours").unwrap();

        let source = ModelSource::local(dir.path()).unwrap();
        assert_eq!(source.weights, None);
    }

    #[test]
    fn checkpoint_weights_are_used() {
        let dir = tempfile::tempdir().unwrap();
        for file in [TOKENIZER_FILE, WEIGHTS_FILE, MANIFEST_FILE] {
            std::fs::write(dir.path().join(file), "{}").unwrap();
        }

        let source = ModelSource::local(dir.path()).unwrap();
        assert_eq!(source.weights, Some(dir.path().join(WEIGHTS_FILE)));
    }

    #[test]
    fn local_directory_without_tokenizer_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().to_str().unwrap();
        match ModelSource::resolve(name, &HubConfig::default()) {
            Err(PosegenError::ModelUnavailable { path, .. }) => assert_eq!(path, name),
            other => panic!("expected ModelUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn debug_redacts_token() {
        let hub = HubConfig {
            token: Some("hf_secret".into()),
            cache_dir: None,
        };
        let rendered = format!("{hub:?}");
        assert!(!rendered.contains("hf_secret"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn empty_env_token_is_anonymous() {
        let var = "POSEGEN_TEST_EMPTY_TOKEN";
        std::env::set_var(var, "  ");
        assert!(HubConfig::from_env(var).token.is_none());
        std::env::remove_var(var);
    }
}

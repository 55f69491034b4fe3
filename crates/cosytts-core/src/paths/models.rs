//! Model directory resolution.
//!
//! Provides utilities for resolving the model directory from explicit paths,
//! environment variables, or the first existing well-known location.

use std::env;
use std::path::{Path, PathBuf};

use super::error::PathError;

/// Environment variable overriding the model directory.
pub const MODEL_DIR_ENV: &str = "COSYTTS_MODEL_DIR";

/// Well-known model locations, searched in order.
pub const CANDIDATE_MODEL_DIRS: [&str; 3] = [
    "models/CosyVoice_300M",
    "models/CosyVoice_300M_Instruct",
    "models/CosyVoice_300M_SFT",
];

/// Location used when none of the candidates exist.
pub const DEFAULT_MODEL_DIR: &str = CANDIDATE_MODEL_DIRS[0];

/// How the model directory was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelDirSource {
    /// The caller passed an explicit path (settings or constructor).
    Explicit,
    /// The path came from `COSYTTS_MODEL_DIR`.
    EnvVar,
    /// The first existing entry of [`CANDIDATE_MODEL_DIRS`].
    Discovered,
    /// No candidate existed; [`DEFAULT_MODEL_DIR`] was assumed.
    Default,
}

/// Resolution result for the model directory.
#[derive(Debug, Clone)]
pub struct ModelDirResolution {
    /// The resolved path to the model directory.
    pub path: PathBuf,
    /// How the path was determined.
    pub source: ModelDirSource,
}

/// Resolve the model directory relative to the current working directory.
///
/// Resolution order:
/// 1. Explicit path provided by caller (highest priority)
/// 2. `COSYTTS_MODEL_DIR` environment variable
/// 3. First existing entry of [`CANDIDATE_MODEL_DIRS`]
/// 4. [`DEFAULT_MODEL_DIR`], with a warning
pub fn resolve_model_dir(explicit: Option<&str>) -> Result<ModelDirResolution, PathError> {
    resolve_model_dir_in(Path::new("."), explicit)
}

/// Same as [`resolve_model_dir`], probing candidates under `root`.
pub fn resolve_model_dir_in(
    root: &Path,
    explicit: Option<&str>,
) -> Result<ModelDirResolution, PathError> {
    if let Some(path_str) = explicit {
        return Ok(ModelDirResolution {
            path: user_path(path_str)?,
            source: ModelDirSource::Explicit,
        });
    }

    if let Ok(env_path) = env::var(MODEL_DIR_ENV) {
        if !env_path.trim().is_empty() {
            return Ok(ModelDirResolution {
                path: user_path(&env_path)?,
                source: ModelDirSource::EnvVar,
            });
        }
    }

    let found: Vec<PathBuf> = CANDIDATE_MODEL_DIRS
        .iter()
        .map(|candidate| root.join(candidate))
        .filter(|path| path.exists())
        .collect();

    if let Some(first) = found.first() {
        tracing::info!(candidates = ?found, "Found CosyVoice model directories");
        if !first.is_dir() {
            return Err(PathError::NotADirectory(first.clone()));
        }
        return Ok(ModelDirResolution {
            path: first.clone(),
            source: ModelDirSource::Discovered,
        });
    }

    let fallback = root.join(DEFAULT_MODEL_DIR);
    tracing::warn!(path = %fallback.display(), "No CosyVoice model found, using default path");
    Ok(ModelDirResolution {
        path: fallback,
        source: ModelDirSource::Default,
    })
}

fn user_path(raw: &str) -> Result<PathBuf, PathError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathError::EmptyPath);
    }
    Ok(PathBuf::from(trimmed))
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::super::test_utils::ENV_LOCK;
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let _guard = ENV_LOCK.lock().unwrap();
        let prev = env::var(MODEL_DIR_ENV).ok();
        unsafe {
            env::set_var(MODEL_DIR_ENV, "/tmp/env-value");
        }
        let resolved = resolve_model_dir(Some("/tmp/explicit")).unwrap();
        assert_eq!(resolved.source, ModelDirSource::Explicit);
        assert!(resolved.path.ends_with("explicit"));
        restore_env(MODEL_DIR_ENV, prev);
    }

    #[test]
    fn test_env_value_used() {
        let _guard = ENV_LOCK.lock().unwrap();
        let prev = env::var(MODEL_DIR_ENV).ok();
        unsafe {
            env::set_var(MODEL_DIR_ENV, "/tmp/from-env");
        }
        let resolved = resolve_model_dir(None).unwrap();
        assert_eq!(resolved.source, ModelDirSource::EnvVar);
        assert!(resolved.path.ends_with("from-env"));
        restore_env(MODEL_DIR_ENV, prev);
    }

    #[test]
    fn test_first_existing_candidate_is_discovered() {
        let _guard = ENV_LOCK.lock().unwrap();
        let prev = env::var(MODEL_DIR_ENV).ok();
        unsafe {
            env::remove_var(MODEL_DIR_ENV);
        }
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("models/CosyVoice_300M_SFT")).unwrap();
        std::fs::create_dir_all(root.path().join("models/CosyVoice_300M_Instruct")).unwrap();

        let resolved = resolve_model_dir_in(root.path(), None).unwrap();
        assert_eq!(resolved.source, ModelDirSource::Discovered);
        assert!(resolved.path.ends_with("CosyVoice_300M_Instruct"));
        restore_env(MODEL_DIR_ENV, prev);
    }

    #[test]
    fn test_default_when_nothing_exists() {
        let _guard = ENV_LOCK.lock().unwrap();
        let prev = env::var(MODEL_DIR_ENV).ok();
        unsafe {
            env::remove_var(MODEL_DIR_ENV);
        }
        let root = tempfile::tempdir().unwrap();
        let resolved = resolve_model_dir_in(root.path(), None).unwrap();
        assert_eq!(resolved.source, ModelDirSource::Default);
        assert_eq!(resolved.path, root.path().join(DEFAULT_MODEL_DIR));
        restore_env(MODEL_DIR_ENV, prev);
    }

    #[test]
    fn test_blank_explicit_path_rejected() {
        assert!(matches!(
            resolve_model_dir(Some("   ")),
            Err(PathError::EmptyPath)
        ));
    }

    fn restore_env(key: &str, previous: Option<String>) {
        if let Some(value) = previous {
            unsafe {
                env::set_var(key, value);
            }
        } else {
            unsafe {
                env::remove_var(key);
            }
        }
    }
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::EngineError;

pub const DEFAULT_MODEL_PREFIX: &str = "doc_";
pub const DEFAULT_TRANSACTION_NAME: &str = "Import Meta Properties";
const SCRATCH_STORE_FILENAME: &str = "metaprop_shared_parameters.db";
const LOG_FILENAME: &str = "metaprop.log";

/// Settings for an import run. Passed explicitly into each run; nothing is
/// remembered in globals between runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// targetId prefix marking records that apply to the whole model.
    pub model_prefix: String,
    /// Private schema store the synchronizer redirects to.
    pub scratch_store: PathBuf,
    /// Append-only run log.
    pub log_file: PathBuf,
    pub transaction_name: String,
    /// Folder relative input paths are resolved against.
    pub default_folder: Option<PathBuf>,
    /// Treat an unparsable numeric value as fatal to the whole run.
    pub strict_values: bool,
    /// Extra grouping labels mapped onto known grouping labels.
    pub group_aliases: BTreeMap<String, String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            model_prefix: DEFAULT_MODEL_PREFIX.to_string(),
            scratch_store: std::env::temp_dir().join(SCRATCH_STORE_FILENAME),
            log_file: PathBuf::from(LOG_FILENAME),
            transaction_name: DEFAULT_TRANSACTION_NAME.to_string(),
            default_folder: None,
            strict_values: false,
            group_aliases: BTreeMap::new(),
        }
    }
}

impl ImportConfig {
    pub fn from_toml(text: &str) -> Result<Self, EngineError> {
        toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }
}

/// Resolve an operator-supplied input path against the default folder.
pub fn resolve_input(default_folder: Option<&Path>, path: &Path) -> PathBuf {
    match default_folder {
        Some(folder) if path.is_relative() => folder.join(path),
        _ => path.to_path_buf(),
    }
}

//! Optional `--config <path>` TOML file, the middle layer of §10.4's
//! configuration precedence: compiled-in defaults < this file < CLI flags.
//!
//! Every field is optional; a field absent from the file simply falls
//! through to whatever the next layer (CLI, then the built-in default)
//! supplies.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub db_path: Option<PathBuf>,
    pub client_timeout: Option<u64>,
    pub receive_timeout: Option<u64>,
    pub check_period: Option<u64>,
    pub comet_prefix: Option<String>,
    pub store_prefix: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

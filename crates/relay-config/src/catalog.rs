use std::path::PathBuf;

use serde::Deserialize;

/// Location of a model catalog that replaces the built-in table
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// TOML catalog file, relative paths resolve against the config file
    pub path: PathBuf,
}

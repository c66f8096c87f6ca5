//! `filmctl` configuration file.
//!
//! ```toml
//! [storage]
//! backend = "sqlite"
//! data_dir = "/var/lib/filmrate"
//!
//! [film]
//! popular_default_count = 10
//! ```

use std::path::Path;

use film::FilmConfig;
use filmrate_core::ServiceConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CtlConfig {
    #[serde(default)]
    pub storage: ServiceConfig,

    #[serde(default)]
    pub film: FilmConfig,
}

impl CtlConfig {
    /// Load config from disk, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: CtlConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/bdm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BdmConfig {
    /// Directory downloaded files are placed in. Relative paths are
    /// resolved against the working directory; `None` means the working
    /// directory itself.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Forward `Log`-severity notices to the user-facing channel.
    pub verbose_logging: bool,
    /// Ask the engine to exempt new transfers from power-saving throttling
    /// by default (individual downloads can still override).
    pub request_unconstrained: bool,
}

impl Default for BdmConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            verbose_logging: true,
            request_unconstrained: false,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}

use anyhow::{Context, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides the data directory (config, vault, logs).
pub const HOME_ENV: &str = "OTPDECK_HOME";

/// User preferences, stored as `config.json` in the data directory.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub show_hotp_counter: bool,
    pub show_issuer: bool,
    pub show_hash_algorithm: bool,
    pub log_to_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_path: Option<PathBuf>,
}

impl Settings {
    /// Missing file means defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let settings = serde_json::from_str(&data)
            .with_context(|| format!("malformed settings in {}", path.display()))?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn vault_path(&self) -> anyhow::Result<PathBuf> {
        match &self.vault_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("vault.json")),
        }
    }

    /// Change one setting by its key, as typed on the command line.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let flag = || -> anyhow::Result<bool> {
            value
                .parse()
                .map_err(|_| anyhow!("'{value}' is not true/false"))
        };
        match key {
            "show_hotp_counter" => self.show_hotp_counter = flag()?,
            "show_issuer" => self.show_issuer = flag()?,
            "show_hash_algorithm" => self.show_hash_algorithm = flag()?,
            "log_to_file" => self.log_to_file = flag()?,
            "vault_path" => {
                self.vault_path = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            other => bail!("unknown setting '{other}'"),
        }
        Ok(())
    }
}

/// `$OTPDECK_HOME`, else e.g. `~/.local/share/otpdeck`.
pub fn data_dir() -> anyhow::Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    let mut dir = dirs::data_dir().ok_or_else(|| anyhow!("cannot get data dir"))?;
    dir.push("otpdeck");
    Ok(dir)
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(data_dir()?.join("config.json"))
}

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::submission::dispatch::TransportSettings;
use crate::utils::{app_data_dir, write_atomic};

/// Output flavour of the rendered claim document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Text,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Directory of the saved-session store. Relative paths resolve against
    /// the application data directory.
    pub store_dir: PathBuf,
    pub outbox_dir: PathBuf,
    pub service_id: String,
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub document_format: DocumentFormat,
    pub organisation: String,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("session"),
            outbox_dir: PathBuf::from("outbox"),
            service_id: "claims_outbox".into(),
            template_id: "claim_submission".into(),
            public_key: None,
            document_format: DocumentFormat::Text,
            organisation: "Ascent Administration".into(),
        }
    }
}

impl ClaimConfig {
    pub fn transport(&self) -> TransportSettings {
        TransportSettings {
            service_id: self.service_id.clone(),
            template_id: self.template_id.clone(),
        }
    }

    pub fn store_dir_in(&self, base: &Path) -> PathBuf {
        resolve(base, &self.store_dir)
    }

    pub fn outbox_dir_in(&self, base: &Path) -> PathBuf {
        resolve(base, &self.outbox_dir)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Loads and saves [`ClaimConfig`] under `<base>/config/config.json`.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    base_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&base)?;
        let config_dir = base.join("config");
        fs::create_dir_all(&config_dir)?;
        let config_path = config_dir.join("config.json");
        Ok(Self {
            base_dir: base,
            config_path,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<ClaimConfig, ConfigError> {
        if self.config_path.exists() {
            let data = fs::read_to_string(&self.config_path)?;
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))
        } else {
            Ok(ClaimConfig::default())
        }
    }

    pub fn save(&self, config: &ClaimConfig) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        write_atomic(&self.config_path, &json)?;
        Ok(())
    }
}

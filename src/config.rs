use crate::constants::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TEMP_DIR, DEFAULT_TEMP_MAX_AGE_SECS, MAX_UPLOAD_SIZE,
};
use crate::error::{CompressionError, Result};
use crate::profile::CompressionProfile;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Settings for `serve`. Every field has a default, so an empty (or absent)
/// config file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub temp_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub temp_max_age_secs: u64,
    pub profile: CompressionProfile,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            max_upload_bytes: MAX_UPLOAD_SIZE,
            temp_max_age_secs: DEFAULT_TEMP_MAX_AGE_SECS,
            profile: CompressionProfile::default(),
        }
    }
}

/// Values given on the command line; `Some` wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub temp_dir: Option<PathBuf>,
    pub profile: Option<CompressionProfile>,
}

impl ServerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CompressionError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from: {:?}", path);
        Ok(config)
    }

    /// Loads the optional file, then applies command-line overrides.
    pub fn load(path: Option<&Path>, overrides: ServerOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(host) = overrides.host {
            config.host = host;
        }
        if let Some(port) = overrides.port {
            config.port = port;
        }
        if let Some(temp_dir) = overrides.temp_dir {
            config.temp_dir = temp_dir;
        }
        if let Some(profile) = overrides.profile {
            config.profile = profile;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(CompressionError::Config(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        if self.temp_max_age_secs == 0 {
            return Err(CompressionError::Config(
                "temp_max_age_secs must be greater than zero".to_string(),
            ));
        }
        self.socket_addr().map(|_| ())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| CompressionError::Config(format!("invalid listen address: {}", e)))
    }

    pub fn temp_max_age(&self) -> Duration {
        Duration::from_secs(self.temp_max_age_secs)
    }
}

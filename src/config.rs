//! Server configuration
//!
//! Read from an optional TOML file; every key has a default, so an empty file
//! (or no file) is a valid configuration. Command-line flags are applied on
//! top by the binary.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! artifacts_dir = "/srv/prever/artifacts"
//! verticals = ["crop", "liver"]
//! max_upload_bytes = 2097152
//! max_batch_rows = 10000
//! log_filter = "info,prever=debug"
//! ```

use std::{
    fs,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{PreverError, Result},
    schema::Vertical,
};

/// Configuration for `prever serve`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    /// Address to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Directory holding `<vertical>.json` bundles
    pub artifacts_dir: PathBuf,
    /// Verticals to serve
    pub verticals: Vec<Vertical>,
    /// Request body limit in bytes (form, JSON and uploads)
    pub max_upload_bytes: usize,
    /// Maximum data rows in one CSV upload
    pub max_batch_rows: usize,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            artifacts_dir: PathBuf::from("artifacts"),
            verticals: Vertical::ALL.to_vec(),
            max_upload_bytes: 2 * 1024 * 1024,
            max_batch_rows: 10_000,
            log_filter: "info".to_string(),
        }
    }
}

impl ServeConfig {
    /// Parse a TOML document and validate it
    ///
    /// # Errors
    ///
    /// Returns `FormatError` for malformed TOML or unknown keys and
    /// `InvalidConfiguration` for unusable values.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be read, otherwise as
    /// [`ServeConfig::from_toml`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PreverError::io(path, &e))?;
        Self::from_toml(&text)
    }

    /// Check value constraints
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.host.parse::<IpAddr>().is_err() {
            return Err(PreverError::InvalidConfiguration(format!(
                "host '{}' is not an IP address",
                self.host
            )));
        }
        if self.verticals.is_empty() {
            return Err(PreverError::InvalidConfiguration(
                "at least one vertical must be configured".to_string(),
            ));
        }
        for (i, vertical) in self.verticals.iter().enumerate() {
            if self.verticals[..i].contains(vertical) {
                return Err(PreverError::InvalidConfiguration(format!(
                    "vertical '{vertical}' listed twice"
                )));
            }
        }
        if self.max_upload_bytes == 0 {
            return Err(PreverError::InvalidConfiguration(
                "max_upload_bytes must be positive".to_string(),
            ));
        }
        if self.max_batch_rows == 0 {
            return Err(PreverError::InvalidConfiguration(
                "max_batch_rows must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address to bind
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `host` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            PreverError::InvalidConfiguration(format!("host '{}' is not an IP address", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

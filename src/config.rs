//! Daemon configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file
//! (`initrack.toml` unless another path is given), then `INITRACK_*`
//! environment variables. CLI flags are applied on top by the binary.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::ddb::DEFAULT_CHARACTER_SERVICE;

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "initrack.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "INITRACK_";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// SQLite file holding the session; None keeps it in memory
    pub db_path: Option<String>,
    /// Origin of the character sheet service
    pub character_service_url: String,
    /// Relay used for character fetches, if any
    pub relay_origin: Option<String>,
    /// Hosts the built-in relay may forward to
    pub relay_allowed_hosts: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db_path: None, // None = in-memory
            character_service_url: DEFAULT_CHARACTER_SERVICE.to_string(),
            relay_origin: None,
            relay_allowed_hosts: vec!["character-service.dndbeyond.com".to_string()],
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Provider stack for a config file path
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration from file and environment
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable pointing at the config file
pub const CONFIG_ENV: &str = "BROKER_ENTRYPOINT_CONFIG";

/// Config file used when `BROKER_ENTRYPOINT_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "/etc/broker-entrypoint.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log: LogConfig,
    pub ownership: OwnershipConfig,
    pub broker: BrokerConfig,
    pub helper: HelperConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// tracing filter directive, overridden by RUST_LOG
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Recursive ownership fix applied when running as root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OwnershipConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// User name or numeric uid
    pub user: String,
    /// Group name or numeric gid
    pub group: String,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("/mosquitto"),
            user: "mosquitto".to_string(),
            group: "mosquitto".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrokerConfig {
    pub program: PathBuf,
    /// Used when the container is started without arguments
    pub default_args: Vec<String>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("/usr/sbin/mosquitto"),
            default_args: vec![
                "-c".to_string(),
                "/mosquitto/config/mosquitto.conf".to_string(),
            ],
        }
    }
}

/// The auxiliary logging helper started next to the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HelperConfig {
    pub enabled: bool,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub bridge: BridgeOptions,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: PathBuf::from("python3"),
            args: vec!["/app/main.py".to_string()],
            bridge: BridgeOptions::default(),
        }
    }
}

impl HelperConfig {
    /// Full argument list for the helper: configured args followed by bridge flags
    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.args.clone();
        argv.extend(self.bridge.to_args());
        argv
    }
}

/// Command line options understood by the MQTT to MongoDB logger.
///
/// Every field is optional. Unset fields are not passed, so the helper
/// falls back to its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeOptions {
    pub mongodb_host: Option<String>,
    pub mongodb_port: Option<u16>,
    pub mongodb_username: Option<String>,
    pub mongodb_password: Option<String>,
    pub mongodb_database: Option<String>,
    pub mqtt_host: Option<String>,
    pub mqtt_port: Option<u16>,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topics: Vec<String>,
}

impl BridgeOptions {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        let mut push = |flag: &str, value: Option<String>| {
            if let Some(value) = value {
                args.push(format!("--{flag}"));
                args.push(value);
            }
        };

        push("mongodb-host", self.mongodb_host.clone());
        push("mongodb-port", self.mongodb_port.map(|p| p.to_string()));
        push("mongodb-username", self.mongodb_username.clone());
        push("mongodb-password", self.mongodb_password.clone());
        push("mongodb-database", self.mongodb_database.clone());
        push("mqtt-host", self.mqtt_host.clone());
        push("mqtt-port", self.mqtt_port.map(|p| p.to_string()));
        push("mqtt-username", self.mqtt_username.clone());
        push("mqtt-password", self.mqtt_password.clone());

        // nargs='+' on the helper side: one flag, all topics after it
        if !self.mqtt_topics.is_empty() {
            args.push("--mqtt-topics".to_string());
            args.extend(self.mqtt_topics.iter().cloned());
        }

        args
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the config the entrypoint should use.
    ///
    /// An explicit path (from `BROKER_ENTRYPOINT_CONFIG`) must exist. Without
    /// one, `/etc/broker-entrypoint.toml` is used if present, otherwise the
    /// built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::load_or_default(Path::new(DEFAULT_CONFIG_PATH)),
        }
    }

    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

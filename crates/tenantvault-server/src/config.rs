use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tenantvault_ingress::DispatcherConfig;
use tenantvault_storage::{BackendKind, ProvisioningMode, StorageConfig, TenantsConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tenants: TenantsConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            tenants: TenantsConfig::default(),
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("invalid TOML in {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("invalid YAML in {}", path.display()))?
        };

        Ok(config)
    }

    /// Apply `TENANTVAULT_*` overrides. Unparseable values are reported and ignored.
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("TENANTVAULT_HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("TENANTVAULT_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("Warning: Invalid TENANTVAULT_PORT '{}', ignoring", val),
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("TENANTVAULT_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("TENANTVAULT_LOG_FORMAT") {
            match val.to_lowercase().as_str() {
                "text" => self.logging.format = LogFormat::Text,
                "json" => self.logging.format = LogFormat::Json,
                _ => eprintln!("Warning: Invalid TENANTVAULT_LOG_FORMAT '{}', ignoring", val),
            }
        }

        // Storage settings
        if let Ok(val) = std::env::var("TENANTVAULT_STORAGE_BACKEND") {
            match val.to_lowercase().as_str() {
                "memory" => self.storage.backend = BackendKind::Memory,
                "local" => self.storage.backend = BackendKind::Local,
                _ => eprintln!(
                    "Warning: Invalid TENANTVAULT_STORAGE_BACKEND '{}', ignoring",
                    val
                ),
            }
        }

        if let Ok(val) = std::env::var("TENANTVAULT_STORAGE_ROOT") {
            self.storage.root = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("TENANTVAULT_PROVISIONING") {
            match val.to_lowercase().as_str() {
                "on_demand" => self.tenants.provisioning = ProvisioningMode::OnDemand,
                "static" => self.tenants.provisioning = ProvisioningMode::Static,
                _ => eprintln!("Warning: Invalid TENANTVAULT_PROVISIONING '{}', ignoring", val),
            }
        }

        // Dispatcher settings
        if let Ok(val) = std::env::var("TENANTVAULT_MAX_UPLOAD_BYTES") {
            match val.parse::<usize>() {
                Ok(limit) => self.dispatcher.max_upload_bytes = limit,
                Err(_) => eprintln!(
                    "Warning: Invalid TENANTVAULT_MAX_UPLOAD_BYTES '{}', ignoring",
                    val
                ),
            }
        }

        if let Ok(val) = std::env::var("TENANTVAULT_EXPOSE_DIAGNOSTICS") {
            match val.parse::<bool>() {
                Ok(expose) => self.dispatcher.expose_diagnostics = expose,
                Err(_) => eprintln!(
                    "Warning: Invalid TENANTVAULT_EXPOSE_DIAGNOSTICS '{}', ignoring",
                    val
                ),
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.dispatcher.max_upload_bytes == 0 {
            bail!("dispatcher.max_upload_bytes must be greater than zero");
        }
        self.storage.validate()?;
        self.tenants.provisioning()?;
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_log_level() -> String {
    "info".to_string()
}

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    ConfigLoad(#[from] ConfigError),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Environment variable prefix, e.g. `TOKEN_FLOW__HELIUS__API_KEY`
pub const ENV_PREFIX: &str = "TOKEN_FLOW";

/// Largest page the Helius signature endpoint will serve
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// General system settings
    pub system: SystemSettings,

    /// Helius RPC configuration (transaction history and token metadata)
    pub helius: HeliusConfig,

    /// API server configuration
    pub api: ApiConfig,

    /// Defaults applied to analysis requests
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Debug-level logs by default when `RUST_LOG` is unset
    pub debug_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeliusConfig {
    /// Helius API key
    pub api_key: String,

    /// Helius RPC endpoint; the api key is appended as a query parameter
    pub rpc_url: String,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Signatures requested per history page (at most 1000)
    pub page_size: u32,

    /// Delay between history pages in milliseconds
    pub rate_limit_ms: u64,

    /// Transaction bodies fetched concurrently within one page
    pub max_concurrent_requests: usize,

    /// Enable Helius as the transaction source
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Deadline for a single analysis call; the call is abandoned when it expires
    pub analysis_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Wallet cap used when a request does not carry `maxWallets`
    pub default_max_wallets: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            system: SystemSettings { debug_mode: false },
            helius: HeliusConfig {
                api_key: "".to_string(), // Must be set in .env or config file
                rpc_url: "https://mainnet.helius-rpc.com".to_string(),
                request_timeout_seconds: 30,
                page_size: 100,
                rate_limit_ms: 0,
                max_concurrent_requests: 4,
                enabled: true,
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                analysis_timeout_seconds: 300,
            },
            analysis: AnalysisConfig {
                default_max_wallets: 50,
            },
        }
    }
}

impl HeliusConfig {
    /// Validate Helius configuration
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.api_key.is_empty() {
            return Err(ConfigurationError::InvalidValue(
                "Helius API key is required when Helius is enabled".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigurationError::InvalidValue(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.max_concurrent_requests == 0 {
            return Err(ConfigurationError::InvalidValue(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl SystemConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let system_config = Self::build_from_path(config_path)?;
        system_config.validate()?;
        Ok(system_config)
    }

    /// Layer defaults, the optional file and the environment without validating
    fn build_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config_builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&SystemConfig::default())?);

        if config_path.as_ref().exists() {
            info!(
                "Loading configuration from: {}",
                config_path.as_ref().display()
            );
            config_builder = config_builder.add_source(File::from(config_path.as_ref()));
        } else {
            debug!("Config file not found, using defaults and environment variables");
        }

        config_builder = config_builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );

        let config = config_builder.build()?;
        let system_config: SystemConfig = config.try_deserialize()?;

        Ok(system_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.helius.validate()?;

        if self.api.port == 0 {
            return Err(ConfigurationError::InvalidValue(
                "API port cannot be 0".to_string(),
            ));
        }

        if self.api.analysis_timeout_seconds == 0 {
            return Err(ConfigurationError::InvalidValue(
                "Analysis timeout must be greater than 0".to_string(),
            ));
        }

        if self.analysis.default_max_wallets == 0 {
            return Err(ConfigurationError::InvalidValue(
                "default_max_wallets must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Bind address for the API server
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

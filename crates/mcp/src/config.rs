// Bridge configuration: TOML file, then environment, then command line

use dmt_sdk::config::parse_base_url;
use dmt_sdk::{Credentials, DmtClient, DmtResult, RetryConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "dmt-mcp.toml";

pub const ENV_USERNAME: &str = "DMT_username";
pub const ENV_PASSWORD: &str = "DMT_password";
pub const ENV_MPS_URL: &str = "DMT_API_BASE";
pub const ENV_RPS_URL: &str = "DMT_RPS_API_BASE";

/// Set to skip loading `.env` (used by tests and packaged deployments)
pub const ENV_SKIP_DOTENV: &str = "DMT_MCP_SKIP_DOTENV";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while assembling the bridge configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential `{key}` (set it in the environment or the [credentials] table)")]
    MissingCredential { key: &'static str },
    #[error("configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}

/// Contents of `dmt-mcp.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub credentials: CredentialsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub mps_url: Option<String>,
    pub rps_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub strict_startup: Option<bool>,
}

#[derive(Clone, Default, Deserialize)]
pub struct CredentialsSection {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for CredentialsSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsSection")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl FileConfig {
    /// Load the config file. A missing file is an error only when the path
    /// was given explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        if !path.exists() {
            if explicit {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            tracing::debug!(path = %path.display(), "Configuration file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mps_url: Option<String>,
    pub rps_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub strict_startup: bool,
}

/// Fully resolved settings for the bridge process
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub mps_url: String,
    pub rps_url: String,
    pub credentials: Credentials,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Exit when the initial authorization fails instead of serving unauthenticated
    pub strict_startup: bool,
}

impl BridgeConfig {
    /// Layer file, environment and command line values, later sources winning
    pub fn resolve<F>(file: FileConfig, env: F, overrides: &Overrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |keys: &[&str]| keys.iter().find_map(|key| env(*key).and_then(non_blank));

        let username = lookup(&[ENV_USERNAME, "DMT_USERNAME"])
            .or_else(|| file.credentials.username.and_then(non_blank))
            .ok_or(ConfigError::MissingCredential { key: ENV_USERNAME })?;
        let password = lookup(&[ENV_PASSWORD, "DMT_PASSWORD"])
            .or_else(|| file.credentials.password.and_then(non_blank))
            .ok_or(ConfigError::MissingCredential { key: ENV_PASSWORD })?;
        let credentials =
            Credentials::new(username, password).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mps_url = overrides
            .mps_url
            .clone()
            .and_then(non_blank)
            .or_else(|| lookup(&[ENV_MPS_URL]))
            .or(file.server.mps_url)
            .unwrap_or_else(|| dmt_sdk::config::DEFAULT_MPS_URL.to_string());
        let rps_url = overrides
            .rps_url
            .clone()
            .and_then(non_blank)
            .or_else(|| lookup(&[ENV_RPS_URL]))
            .or(file.server.rps_url)
            .unwrap_or_else(|| dmt_sdk::config::DEFAULT_RPS_URL.to_string());

        for (name, url) in [("MPS", &mps_url), ("RPS", &rps_url)] {
            parse_base_url(url)
                .map_err(|e| ConfigError::Invalid(format!("{} URL `{}`: {}", name, url, e)))?;
        }

        let timeout_secs = overrides
            .timeout_secs
            .or(file.server.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            mps_url,
            rps_url,
            credentials,
            timeout: Duration::from_secs(timeout_secs),
            max_retries: file
                .server
                .max_retries
                .unwrap_or(RetryConfig::default().max_retries),
            strict_startup: overrides.strict_startup || file.server.strict_startup.unwrap_or(false),
        })
    }

    /// Resolve against the process environment
    pub fn from_process_env(file: FileConfig, overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::resolve(file, |key| std::env::var(key).ok(), overrides)
    }

    pub fn build_client(&self) -> DmtResult<DmtClient> {
        DmtClient::builder()
            .mps_url(&self.mps_url)
            .rps_url(&self.rps_url)
            .credentials(self.credentials.clone())
            .timeout(self.timeout)
            .retry_config(RetryConfig {
                max_retries: self.max_retries,
                ..Default::default()
            })
            .build()
    }
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Load `.env` from the working directory; a missing file is not an error
pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if std::env::var_os(ENV_SKIP_DOTENV).is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

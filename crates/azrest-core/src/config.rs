//! Configuration file handling for azrest
//!
//! Config is stored at `~/.config/azrest/config.yaml` (or the platform equivalent
//! via `dirs::config_dir()`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cloud::Cloud;

/// Config filename within the azrest config directory
const FILENAME: &str = "config.yaml";

/// Application directory name
const APP_DIR: &str = "azrest";

/// Environment variable that overrides the configured subscription
pub const SUBSCRIPTION_ENV: &str = "AZURE_SUBSCRIPTION_ID";

/// Default Azure OpenAI data plane API version
pub const DEFAULT_OPENAI_API_VERSION: &str = "2024-02-01";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config not found, run `azrest init` to get started")]
    NotFound,

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("no subscription configured. Run `azrest init` or set {SUBSCRIPTION_ENV}")]
    NoSubscription,
}

/// Which credential the CLI should use to authenticate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    /// Environment, then managed identity, then Azure CLI
    #[default]
    Default,
    /// Azure CLI only
    Cli,
    /// Service principal from AZURE_TENANT_ID / AZURE_CLIENT_ID / AZURE_CLIENT_SECRET
    Environment,
    /// Managed identity via the instance metadata service
    ManagedIdentity,
}

/// Key Vault settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyVaultConfig {
    /// Vault URL, e.g. `https://myvault.vault.azure.net`
    pub url: String,
}

/// Azure OpenAI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Resource endpoint, e.g. `https://myresource.openai.azure.com`
    pub endpoint: String,

    /// Default deployment for chat and embeddings
    pub deployment: String,

    /// Data plane API version
    #[serde(default = "default_openai_api_version")]
    pub api_version: String,

    /// Name of an environment variable holding an API key. When unset, the
    /// configured Entra ID credential is used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

fn default_openai_api_version() -> String {
    DEFAULT_OPENAI_API_VERSION.to_string()
}

/// Retry settings applied to every HTTP pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    800
}

fn default_max_retry_delay_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

/// Top-level azrest configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default Azure subscription ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,

    /// Azure cloud environment
    #[serde(default)]
    pub cloud: Cloud,

    /// Credential used for Entra ID authentication
    #[serde(default)]
    pub credential: CredentialKind,

    /// Default Key Vault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyvault: Option<KeyVaultConfig>,

    /// Azure OpenAI resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiConfig>,

    /// HTTP retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Return the path to the config file: `<config_dir>/azrest/config.yaml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load the config from the standard location.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    /// Load the config, falling back to defaults when no file exists yet.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::load() {
            Err(ConfigError::NotFound) => Ok(Self::default()),
            other => other,
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Save the config to the standard location, creating the directory if needed.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Resolve the subscription: `AZURE_SUBSCRIPTION_ID` wins over the file.
    pub fn subscription(&self) -> Result<String, ConfigError> {
        resolve_subscription(
            std::env::var(SUBSCRIPTION_ENV).ok(),
            self.subscription.as_deref(),
        )
    }
}

fn resolve_subscription(env: Option<String>, file: Option<&str>) -> Result<String, ConfigError> {
    env.filter(|s| !s.is_empty())
        .or_else(|| file.map(String::from))
        .ok_or(ConfigError::NoSubscription)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            subscription: Some("sub-123".into()),
            cloud: Cloud::AzurePublic,
            credential: CredentialKind::Cli,
            keyvault: Some(KeyVaultConfig {
                url: "https://myvault.vault.azure.net".into(),
            }),
            openai: Some(OpenAiConfig {
                endpoint: "https://myresource.openai.azure.com".into(),
                deployment: "gpt-4o".into(),
                api_version: DEFAULT_OPENAI_API_VERSION.into(),
                api_key_env: None,
            }),
            retry: RetryConfig::default(),
        }
    }

    #[test]
    fn test_config_path_is_under_config_dir() {
        let path = Config::path().unwrap();
        assert!(path.ends_with("azrest/config.yaml"));
    }

    #[test]
    fn test_config_roundtrip() {
        let yaml = serde_yaml::to_string(&sample()).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.subscription.as_deref(), Some("sub-123"));
        assert_eq!(parsed.credential, CredentialKind::Cli);
        assert_eq!(
            parsed.keyvault.unwrap().url,
            "https://myvault.vault.azure.net"
        );
        assert_eq!(parsed.openai.unwrap().deployment, "gpt-4o");
    }

    #[test]
    fn test_config_minimal_uses_defaults() {
        let yaml = "subscription: sub-old\n";
        let parsed: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.cloud, Cloud::AzurePublic);
        assert_eq!(parsed.credential, CredentialKind::Default);
        assert_eq!(parsed.retry, RetryConfig::default());
        assert!(parsed.keyvault.is_none());
        assert!(parsed.openai.is_none());
    }

    #[test]
    fn test_openai_api_version_default() {
        let yaml = r#"
openai:
  endpoint: https://x.openai.azure.com
  deployment: embed
"#;
        let parsed: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            parsed.openai.unwrap().api_version,
            DEFAULT_OPENAI_API_VERSION
        );
    }

    #[test]
    fn test_credential_kind_kebab_case() {
        let yaml = "credential: managed-identity\n";
        let parsed: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.credential, CredentialKind::ManagedIdentity);
    }

    #[test]
    fn test_config_skip_serializing_none() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(!yaml.contains("subscription"));
        assert!(!yaml.contains("keyvault"));
        assert!(!yaml.contains("openai"));
    }

    #[test]
    fn test_config_save_and_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        sample().save_to(&path).unwrap();
        assert!(path.exists());

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.subscription.as_deref(), Some("sub-123"));
        assert_eq!(loaded.retry.max_retries, 3);
    }

    #[test]
    fn test_config_load_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.yaml");
        let result = Config::load_from(&path);
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    fn test_config_save_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("config.yaml");
        Config::default().save_to(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_resolve_subscription_prefers_env() {
        let sub = resolve_subscription(Some("from-env".into()), Some("from-file")).unwrap();
        assert_eq!(sub, "from-env");
    }

    #[test]
    fn test_resolve_subscription_ignores_empty_env() {
        let sub = resolve_subscription(Some(String::new()), Some("from-file")).unwrap();
        assert_eq!(sub, "from-file");
    }

    #[test]
    fn test_resolve_subscription_missing() {
        let result = resolve_subscription(None, None);
        assert!(matches!(result, Err(ConfigError::NoSubscription)));
    }
}

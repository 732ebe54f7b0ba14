//! Layered configuration for addon-sign.
//!
//! Settings are read from `sign.toml`, then environment variables, then CLI
//! flags; each layer overrides the one before it.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! url = "https://addons.mozilla.org/api/v3"
//! key = "user:12345:67"
//! secret = "..."
//! proxy = "http://proxy.local:3128"
//!
//! [signing]
//! timeout_ms = 120000
//! poll_interval_ms = 1000
//! channel = "unlisted"
//! download_dir = "dist"
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::Credentials;
use crate::signing::PollConfig;

/// Name of the configuration file looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "sign.toml";

pub const DEFAULT_API_URL: &str = "https://addons.mozilla.org/api/v3";

pub const ENV_API_URL: &str = "ADDON_SIGN_API_URL";
pub const ENV_API_KEY: &str = "ADDON_SIGN_API_KEY";
pub const ENV_API_SECRET: &str = "ADDON_SIGN_API_SECRET";
pub const ENV_API_PROXY: &str = "ADDON_SIGN_API_PROXY";
pub const ENV_TIMEOUT_MS: &str = "ADDON_SIGN_TIMEOUT_MS";

/// Release channel for a submitted version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Public listing on the add-ons site.
    Listed,
    /// Self-distributed; signed but not listed.
    Unlisted,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Listed => write!(f, "listed"),
            Channel::Unlisted => write!(f, "unlisted"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "listed" => Ok(Channel::Listed),
            "unlisted" => Ok(Channel::Unlisted),
            _ => bail!("Invalid channel '{}'. Valid values: listed, unlisted", s),
        }
    }
}

/// `[api]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

/// `[signing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningSection {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

impl Default for SigningSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            channel: None,
            download_dir: None,
        }
    }
}

/// Contents of `sign.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignToml {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub signing: SigningSection,
}

impl SignToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse sign.toml")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize sign.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Load `sign.toml` from `dir`, or defaults when the file is absent.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Show only the first four characters of a credential.
pub fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    if visible.len() == value.len() {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub api_proxy: Option<String>,
    pub timeout_ms: Option<u64>,
    pub channel: Option<Channel>,
    pub download_dir: Option<PathBuf>,
}

/// Fully resolved settings for one signing run.
#[derive(Debug, Clone)]
pub struct SignConfig {
    pub api_url: String,
    pub credentials: Credentials,
    pub proxy: Option<String>,
    pub poll: PollConfig,
    pub channel: Option<Channel>,
    pub download_dir: PathBuf,
}

impl SignConfig {
    /// Resolve file, process environment and CLI layers.
    pub fn resolve(file: &SignToml, cli: &CliOverrides) -> Result<Self> {
        Self::resolve_with_env(file, cli, |name| std::env::var(name).ok())
    }

    /// Like [`SignConfig::resolve`] with an explicit environment lookup.
    pub fn resolve_with_env(
        file: &SignToml,
        cli: &CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let layer = |cli_value: &Option<String>, env_name: &str, file_value: &Option<String>| {
            cli_value
                .clone()
                .or_else(|| env(env_name).filter(|v| !v.is_empty()))
                .or_else(|| file_value.clone())
        };

        let api_url = layer(&cli.api_url, ENV_API_URL, &file.api.url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let Some(key) = layer(&cli.api_key, ENV_API_KEY, &file.api.key) else {
            bail!("API key is missing. Set [api].key in sign.toml, {} or --api-key", ENV_API_KEY);
        };
        let Some(secret) = layer(&cli.api_secret, ENV_API_SECRET, &file.api.secret) else {
            bail!(
                "API secret is missing. Set [api].secret in sign.toml, {} or --api-secret",
                ENV_API_SECRET
            );
        };
        let proxy = layer(&cli.api_proxy, ENV_API_PROXY, &file.api.proxy);

        let timeout_ms = match cli.timeout_ms {
            Some(ms) => ms,
            None => match env(ENV_TIMEOUT_MS).filter(|v| !v.is_empty()) {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("{} must be a number of milliseconds", ENV_TIMEOUT_MS))?,
                None => file.signing.timeout_ms,
            },
        };

        Ok(Self {
            api_url,
            credentials: Credentials::new(key, secret),
            proxy,
            poll: PollConfig::default()
                .with_timeout(Duration::from_millis(timeout_ms))
                .with_interval(Duration::from_millis(file.signing.poll_interval_ms)),
            channel: cli.channel.or(file.signing.channel),
            download_dir: cli
                .download_dir
                .clone()
                .or_else(|| file.signing.download_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn with_credentials() -> SignToml {
        SignToml::parse(
            r#"
[api]
key = "file-key"
secret = "file-secret"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_apply_when_file_is_sparse() {
        let config =
            SignConfig::resolve_with_env(&with_credentials(), &CliOverrides::default(), no_env)
                .unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.credentials.issuer(), "file-key");
        assert_eq!(config.poll.timeout, Duration::from_millis(120_000));
        assert_eq!(config.poll.interval, Duration::from_millis(1_000));
        assert_eq!(config.download_dir, PathBuf::from("."));
        assert_eq!(config.channel, None);
        assert_eq!(config.proxy, None);
    }

    #[test]
    fn test_parses_full_file() {
        let toml = SignToml::parse(
            r#"
[api]
url = "http://localhost:8000/api/v3"
key = "k"
secret = "s"
proxy = "http://proxy:3128"

[signing]
timeout_ms = 5000
poll_interval_ms = 250
channel = "unlisted"
download_dir = "dist"
"#,
        )
        .unwrap();
        let config =
            SignConfig::resolve_with_env(&toml, &CliOverrides::default(), no_env).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000/api/v3");
        assert_eq!(config.proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(config.poll.timeout, Duration::from_millis(5000));
        assert_eq!(config.poll.interval, Duration::from_millis(250));
        assert_eq!(config.channel, Some(Channel::Unlisted));
        assert_eq!(config.download_dir, PathBuf::from("dist"));
    }

    #[test]
    fn test_env_overrides_file_and_cli_overrides_env() {
        let env: HashMap<&str, &str> = [
            (ENV_API_KEY, "env-key"),
            (ENV_API_URL, "http://env/api"),
            (ENV_TIMEOUT_MS, "3000"),
        ]
        .into_iter()
        .collect();
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        let config =
            SignConfig::resolve_with_env(&with_credentials(), &CliOverrides::default(), lookup)
                .unwrap();
        assert_eq!(config.credentials.issuer(), "env-key");
        assert_eq!(config.api_url, "http://env/api");
        assert_eq!(config.poll.timeout, Duration::from_millis(3000));

        let cli = CliOverrides {
            api_key: Some("cli-key".into()),
            timeout_ms: Some(10),
            channel: Some(Channel::Listed),
            ..Default::default()
        };
        let config = SignConfig::resolve_with_env(&with_credentials(), &cli, lookup).unwrap();
        assert_eq!(config.credentials.issuer(), "cli-key");
        assert_eq!(config.poll.timeout, Duration::from_millis(10));
        assert_eq!(config.channel, Some(Channel::Listed));
    }

    #[test]
    fn test_missing_credentials_are_rejected() {
        let err = SignConfig::resolve_with_env(&SignToml::default(), &CliOverrides::default(), no_env)
            .unwrap_err();
        assert!(err.to_string().contains("API key is missing"));

        let cli = CliOverrides {
            api_key: Some("k".into()),
            ..Default::default()
        };
        let err = SignConfig::resolve_with_env(&SignToml::default(), &cli, no_env).unwrap_err();
        assert!(err.to_string().contains("API secret is missing"));
    }

    #[test]
    fn test_bad_timeout_env_is_an_error() {
        let lookup = |name: &str| (name == ENV_TIMEOUT_MS).then(|| "soon".to_string());
        let err =
            SignConfig::resolve_with_env(&with_credentials(), &CliOverrides::default(), lookup)
                .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_MS));
    }

    #[test]
    fn test_empty_env_values_count_as_unset() {
        let lookup = |name: &str| {
            matches!(name, ENV_TIMEOUT_MS | ENV_API_KEY | ENV_API_URL).then(String::new)
        };
        let config =
            SignConfig::resolve_with_env(&with_credentials(), &CliOverrides::default(), lookup)
                .unwrap();
        assert_eq!(config.poll.timeout, Duration::from_millis(120_000));
        assert_eq!(config.credentials.issuer(), "file-key");
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_channel_round_trips_through_strings() {
        assert_eq!("LISTED".parse::<Channel>().unwrap(), Channel::Listed);
        assert_eq!("unlisted".parse::<Channel>().unwrap().to_string(), "unlisted");
        assert!("beta".parse::<Channel>().is_err());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let toml = SignToml::load_or_default(dir.path()).unwrap();
        assert!(toml.api.key.is_none());
        assert_eq!(toml.signing.timeout_ms, 120_000);
    }

    #[test]
    fn test_load_or_default_reads_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[signing]\ntimeout_ms = 42\n",
        )
        .unwrap();
        let toml = SignToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml.signing.timeout_ms, 42);
    }

    #[test]
    fn test_save_then_load_keeps_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut toml = SignToml::default();
        toml.api.key = Some("user:1".into());
        toml.signing.channel = Some(Channel::Listed);
        toml.save(&path).unwrap();

        let loaded = SignToml::load(&path).unwrap();
        assert_eq!(loaded.api.key.as_deref(), Some("user:1"));
        assert_eq!(loaded.signing.channel, Some(Channel::Listed));
        assert_eq!(loaded.signing.poll_interval_ms, 1_000);
    }

    #[test]
    fn test_mask_hides_all_but_prefix() {
        assert_eq!(mask("abcdefgh"), "abcd****");
        assert_eq!(mask("abc"), "****");
        assert_eq!(mask(""), "****");
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = SignToml::parse("[api\nkey = ").unwrap_err();
        assert!(err.to_string().contains("sign.toml"));
    }
}

use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Snapchat ad account to sweep.
    #[serde(default)]
    pub account_id: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_auth_base")]
    pub auth_base: String,

    /// Newline-delimited headline corpus. Tilde-expanded on use.
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,

    /// SQLite outcome ledger. Tilde-expanded on use.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

fn default_api_base() -> String {
    "https://adsapi.snapchat.com".into()
}

fn default_auth_base() -> String {
    "https://accounts.snapchat.com".into()
}

fn default_corpus_path() -> String {
    "~/.adrotor/headline.txt".into()
}

fn default_store_path() -> String {
    "~/.adrotor/adrotor.db".into()
}

/// OAuth client credentials for the refresh-token exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
}

/// Configuration-provided fallbacks applied to fetched creatives.
///
/// The three mandatory delivery fields are never guessed; these values are
/// the only source when the API returns them empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub top_snap_media_id: String,
    #[serde(default)]
    pub web_view_url: String,
    #[serde(default)]
    pub profile_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_http_retries")]
    pub http_retries: u32,
    #[serde(default = "default_http_backoff_ms")]
    pub http_backoff_ms: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_http_retries() -> u32 {
    5
}

fn default_http_backoff_ms() -> u64 {
    500
}

fn default_http_timeout_secs() -> u64 {
    60
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            http_retries: default_http_retries(),
            http_backoff_ms: default_http_backoff_ms(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between cycle starts in daemon mode.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Pause between creative updates within a cycle.
    #[serde(default = "default_pace_secs")]
    pub pace_secs: u64,
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_pace_secs() -> u64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            pace_secs: default_pace_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
        let adrotor_dir = home.join(".adrotor");

        Self {
            config_path: adrotor_dir.join("config.toml"),
            account_id: String::new(),
            api_base: default_api_base(),
            auth_base: default_auth_base(),
            corpus_path: default_corpus_path(),
            store_path: default_store_path(),
            credentials: CredentialsConfig::default(),
            defaults: DefaultsConfig::default(),
            reliability: ReliabilityConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let adrotor_dir = home.join(".adrotor");
        let config_path = adrotor_dir.join("config.toml");

        if !adrotor_dir.exists() {
            fs::create_dir_all(&adrotor_dir).context("Failed to create .adrotor directory")?;
        }

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path;
            Ok(config)
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(account) = std::env::var("ADROTOR_ACCOUNT_ID")
            .or_else(|_| std::env::var("SNAPCHAT_AD_ACCOUNTS_ID"))
        {
            if !account.is_empty() {
                self.account_id = account;
            }
        }

        if let Ok(client_id) =
            std::env::var("ADROTOR_CLIENT_ID").or_else(|_| std::env::var("SNAPCHAT_CLIENT_ID"))
        {
            if !client_id.is_empty() {
                self.credentials.client_id = client_id;
            }
        }

        if let Ok(secret) = std::env::var("ADROTOR_CLIENT_SECRET")
            .or_else(|_| std::env::var("SNAPCHAT_CLIENT_SECRET"))
        {
            if !secret.is_empty() {
                self.credentials.client_secret = secret;
            }
        }

        if let Ok(token) = std::env::var("ADROTOR_REFRESH_TOKEN")
            .or_else(|_| std::env::var("SNAPCHAT_REFRESH_TOKEN"))
        {
            if !token.is_empty() {
                self.credentials.refresh_token = token;
            }
        }

        if let Ok(media) = std::env::var("ADROTOR_TOP_SNAP_MEDIA_ID")
            .or_else(|_| std::env::var("SNAPCHAT_TOP_SNAP_MEDIA_ID"))
        {
            if !media.is_empty() {
                self.defaults.top_snap_media_id = media;
            }
        }

        if let Ok(url) =
            std::env::var("ADROTOR_WEB_VIEW_URL").or_else(|_| std::env::var("SNAPCHAT_WEBVIEW_URL"))
        {
            if !url.is_empty() {
                self.defaults.web_view_url = url;
            }
        }

        if let Ok(profile) =
            std::env::var("ADROTOR_PROFILE_ID").or_else(|_| std::env::var("SNAPCHAT_PROFILE_ID"))
        {
            if !profile.is_empty() {
                self.defaults.profile_id = profile;
            }
        }
    }

    /// Fail early on configuration that can never produce a working cycle.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.account_id.is_empty(),
            "account_id is not set (config.toml or ADROTOR_ACCOUNT_ID)"
        );
        anyhow::ensure!(
            !self.credentials.client_id.is_empty()
                && !self.credentials.client_secret.is_empty()
                && !self.credentials.refresh_token.is_empty(),
            "credentials are incomplete (client_id, client_secret, refresh_token)"
        );
        Ok(())
    }

    pub fn corpus_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.corpus_path).into_owned())
    }

    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store_path).into_owned())
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}

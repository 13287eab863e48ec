use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::feed::FeedTransformer;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: String,
    pub level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: "logs/feed-cleaner.log".to_string(),
            level: Some("info".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    pub session_ttl_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            session_ttl_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    pub feed_url: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            api_key: None,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaseLinkerConfig {
    pub api_url: String,
    /// Used when a proxied call does not carry its own token.
    pub token: Option<String>,
}

impl Default for BaseLinkerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.baselinker.com/connector.php".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// WHATWG label of the code page tried when a feed is not valid UTF-8.
    pub legacy_encoding: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            legacy_encoding: "windows-1250".to_string(),
        }
    }
}

impl FeedConfig {
    pub fn transformer(&self) -> anyhow::Result<FeedTransformer> {
        FeedTransformer::with_legacy_encoding(&self.legacy_encoding)
            .ok_or_else(|| anyhow!("unknown legacy encoding {:?}", self.legacy_encoding))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub admin: AdminConfig,
    pub importer: ImporterConfig,
    pub baselinker: BaseLinkerConfig,
    pub feed: FeedConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let explicit_path = std::env::var("CONFIG_FILE").ok();
        let config = if let Some(path) = explicit_path {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(anyhow!("config file {:?} not found", path));
            }
            Self::load_from_file(&path)?
        } else {
            let path = locate_default_config();
            if let Some(path) = path {
                Self::load_from_file(&path)?
            } else {
                AppConfig::default()
            }
        };

        Self::apply_env_overrides(config)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        Self::from_yaml(&contents).with_context(|| format!("failed to parse config file {:?}", path))
    }

    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    fn apply_env_overrides(mut config: AppConfig) -> anyhow::Result<AppConfig> {
        if let Ok(bind) = std::env::var("SERVER_BIND") {
            config.server.bind = bind;
        }

        if let Some(limit) = parse_optional_env("MAX_UPLOAD_BYTES")? {
            config.server.max_upload_bytes = limit;
        }

        if let Ok(log_file) = std::env::var("LOG_FILE_PATH") {
            config.logging.file = log_file;
        }

        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            config.logging.level = Some(log_level);
        }

        if let Ok(username) = std::env::var("ADMIN_USERNAME") {
            config.admin.username = username;
        }

        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            config.admin.password = password;
        }

        if let Some(ttl) = parse_optional_env("ADMIN_SESSION_TTL_SECS")? {
            config.admin.session_ttl_secs = ttl;
        }

        if let Ok(url) = std::env::var("FEED_URL") {
            config.importer.feed_url = Some(url);
        }

        if let Ok(key) = std::env::var("FEED_API_KEY") {
            config.importer.api_key = Some(key);
        }

        if let Some(timeout) = parse_optional_env("FEED_TIMEOUT_SECS")? {
            config.importer.request_timeout_secs = timeout;
        }

        if let Ok(url) = std::env::var("BASELINKER_API_URL") {
            config.baselinker.api_url = url;
        }

        if let Ok(token) = std::env::var("BASELINKER_TOKEN") {
            config.baselinker.token = Some(token);
        }

        if let Ok(label) = std::env::var("FEED_LEGACY_ENCODING") {
            config.feed.legacy_encoding = label;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.feed.transformer()?;

        let api_url = url::Url::parse(self.baselinker.api_url.trim())
            .with_context(|| format!("invalid baselinker.api_url {:?}", self.baselinker.api_url))?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(anyhow!("baselinker.api_url must be an http(s) url"));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(anyhow!("server.max_upload_bytes must be greater than zero"));
        }

        if self.admin.username.trim().is_empty() != self.admin.password.is_empty() {
            return Err(anyhow!(
                "admin login needs both username and password; set ADMIN_USERNAME and ADMIN_PASSWORD"
            ));
        }

        Ok(())
    }
}

fn parse_optional_env<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => Ok(Some(
            v.parse::<T>()
                .with_context(|| format!("{key} must be a valid value"))?,
        )),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn locate_default_config() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("config/config.yaml"),
        PathBuf::from("../config/config.yaml"),
    ];

    candidates.into_iter().find(|path| path.exists())
}

//! Process configuration.
//!
//! Values are layered with the [`config`] crate, lowest priority first:
//!
//! 1. built-in defaults (the [`Default`] impls below)
//! 2. an optional TOML file
//! 3. `FORUMWATCH_*` environment variables (`__` separates nested keys,
//!    e.g. `FORUMWATCH_REDDIT__CLIENT_ID`; `channels` and `keywords` take
//!    comma-separated lists)
//!
//! The resulting [`Config`] is immutable and handed to each component when
//! it is constructed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Environment, File, FileFormat};
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_FILE_ENV: &str = "FORUMWATCH_CONFIG";

/// File read when neither an argument nor [`CONFIG_FILE_ENV`] is given.
pub const DEFAULT_CONFIG_FILE: &str = "forumwatch.toml";

const ENV_PREFIX: &str = "FORUMWATCH";

const PLACEHOLDER_CLIENT_ID: &str = "your_client_id_here";
const PLACEHOLDER_CLIENT_SECRET: &str = "your_client_secret_here";
const PLACEHOLDER_WEBHOOK_URL: &str = "your_slack_webhook_url_here";

/// Largest listing page Reddit will return.
const MAX_FETCH_LIMIT: usize = 100;

/// Upper bound for the poll interval and the error cooldown (one week).
const MAX_SLEEP_SECS: u64 = 7 * 24 * 60 * 60;

/// Upper bound for `retention_days` (ten years).
const MAX_RETENTION_DAYS: u32 = 3650;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {field} - {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }

    /// Where the operator can obtain the missing value, if we know.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ConfigError::Invalid { field, .. } if field.starts_with("reddit.") => {
                Some("create an app at https://www.reddit.com/prefs/apps")
            }
            ConfigError::Invalid { field: "webhook_url", .. } => {
                Some("create an incoming webhook at https://api.slack.com/apps")
            }
            _ => None,
        }
    }
}

/// Reddit API credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: PLACEHOLDER_CLIENT_ID.to_string(),
            client_secret: PLACEHOLDER_CLIENT_SECRET.to_string(),
            user_agent: "AccountabilityBot/1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Channels (subreddits) polled each cycle, in order.
    pub channels: Vec<String>,
    /// Case-insensitive phrases; order is preserved in notifications.
    pub keywords: Vec<String>,
    /// Incoming-webhook endpoint notifications are POSTed to.
    pub webhook_url: String,
    pub reddit: RedditConfig,
    pub poll_interval_secs: u64,
    /// Sleep after a cycle fails unexpectedly.
    pub cooldown_secs: u64,
    /// Most recent items fetched per channel per cycle.
    pub fetch_limit: usize,
    /// JSON file holding already-notified identifiers.
    pub seen_file: PathBuf,
    /// Seen identifiers older than this are forgotten. 0 keeps them forever.
    pub retention_days: u32,
    /// Upper bound on any single HTTP call.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channels: ["productivity", "pomodoro", "GetStudying", "focus"]
                .map(String::from)
                .to_vec(),
            keywords: [
                "need accountability",
                "study session",
                "focus timer",
                "pomodoro",
                "need motivation",
                "starting to study",
                "accountability partner",
                "help me focus",
                "need to study",
                "study with me",
            ]
            .map(String::from)
            .to_vec(),
            webhook_url: PLACEHOLDER_WEBHOOK_URL.to_string(),
            reddit: RedditConfig::default(),
            poll_interval_secs: 1800,
            cooldown_secs: 300,
            fetch_limit: 25,
            seen_file: PathBuf::from("seen_posts.json"),
            retention_days: 30,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Resolve the configuration file path: explicit argument, then
    /// [`CONFIG_FILE_ENV`], then [`DEFAULT_CONFIG_FILE`].
    pub fn resolve_path(arg: Option<String>) -> PathBuf {
        arg.or_else(|| std::env::var(CONFIG_FILE_ENV).ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load defaults, overlay `path` (if it exists), then the environment.
    ///
    /// Does not validate; call [`Config::validate`] before use.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: &Path, env: Environment) -> Result<Self, ConfigError> {
        let layered = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(env)
            .build()?;

        Ok(layered.try_deserialize()?)
    }

    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_credential("reddit.client_id", &self.reddit.client_id, PLACEHOLDER_CLIENT_ID)?;
        check_credential(
            "reddit.client_secret",
            &self.reddit.client_secret,
            PLACEHOLDER_CLIENT_SECRET,
        )?;
        if self.reddit.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid("reddit.user_agent", "must not be empty"));
        }

        let webhook = self.webhook_url.trim();
        if webhook.is_empty() || webhook == PLACEHOLDER_WEBHOOK_URL {
            return Err(ConfigError::invalid("webhook_url", "webhook URL is not configured"));
        }
        match Url::parse(webhook) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::invalid(
                    "webhook_url",
                    format!("not an absolute http(s) URL: {webhook}"),
                ))
            }
        }

        check_list("channels", &self.channels)?;
        check_list("keywords", &self.keywords)?;

        if !(1..=MAX_FETCH_LIMIT).contains(&self.fetch_limit) {
            return Err(ConfigError::invalid(
                "fetch_limit",
                format!("must be between 1 and {MAX_FETCH_LIMIT}, got {}", self.fetch_limit),
            ));
        }
        if !(1..=MAX_SLEEP_SECS).contains(&self.poll_interval_secs) {
            return Err(ConfigError::invalid(
                "poll_interval_secs",
                format!("must be between 1 and {MAX_SLEEP_SECS}, got {}", self.poll_interval_secs),
            ));
        }
        if self.cooldown_secs > MAX_SLEEP_SECS {
            return Err(ConfigError::invalid(
                "cooldown_secs",
                format!("must be at most {MAX_SLEEP_SECS}, got {}", self.cooldown_secs),
            ));
        }
        if self.retention_days > MAX_RETENTION_DAYS {
            return Err(ConfigError::invalid(
                "retention_days",
                format!(
                    "must be at most {MAX_RETENTION_DAYS} (0 keeps ids forever), got {}",
                    self.retention_days
                ),
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retention window for seen identifiers; `None` disables pruning.
    pub fn retention(&self) -> Option<chrono::Duration> {
        (self.retention_days > 0).then(|| chrono::Duration::days(i64::from(self.retention_days)))
    }
}

/// The `FORUMWATCH_*` layer.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("channels")
        .with_list_parse_key("keywords")
        .try_parsing(true)
}

fn check_credential(field: &'static str, value: &str, placeholder: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    if value.is_empty() || value == placeholder {
        return Err(ConfigError::invalid(field, "credential is not configured"));
    }
    Ok(())
}

fn check_list(field: &'static str, values: &[String]) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::invalid(field, "must contain at least one entry"));
    }
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(ConfigError::invalid(field, "entries must not be blank"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

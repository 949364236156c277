use crate::error::{Error, Result};
use crate::provider::{
    DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_REFERER, DEFAULT_TITLE, RequestBuilder,
    Timeouts,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Model used when neither the CLI nor the config names one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Default model id, e.g. `anthropic/claude-sonnet-4`.
    pub model: Option<String>,
    pub base_url: String,
    /// Explicit key. When unset the key is read from `api_key_env` at request time.
    pub api_key: Option<String>,
    pub api_key_env: String,
    /// `HTTP-Referer` sent with every request.
    pub referer: String,
    /// `X-Title` sent with every request.
    pub title: String,

    pub connect_timeout_secs: u64,
    /// Wait for response status and headers.
    pub header_timeout_secs: u64,
    /// Budget for the whole exchange, body included.
    pub total_timeout_secs: u64,
    pub socket_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let timeouts = Timeouts::default();
        Self {
            model: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
            connect_timeout_secs: timeouts.connect.as_secs(),
            header_timeout_secs: timeouts.header.as_secs(),
            total_timeout_secs: timeouts.total.as_secs(),
            socket_timeout_secs: timeouts.socket.as_secs(),
        }
    }
}

impl Config {
    /// Path to the config file (`<config dir>/chatstream/config.toml`).
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("chatstream").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".chatstream/config.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, secs) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("header_timeout_secs", self.header_timeout_secs),
            ("total_timeout_secs", self.total_timeout_secs),
        ] {
            if secs == 0 {
                return Err(Error::Config(format!("{name} must be positive")));
            }
        }
        self.check_budget(self.timeouts().total)?;
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url must not be empty".into()));
        }
        Ok(())
    }

    /// A stream budget must end before the socket idle limit.
    pub fn check_budget(&self, budget: Duration) -> Result<()> {
        if budget >= self.timeouts().socket {
            return Err(Error::Config(format!(
                "timeout of {}s must be shorter than socket_timeout_secs ({}s)",
                budget.as_secs(),
                self.socket_timeout_secs
            )));
        }
        Ok(())
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            header: Duration::from_secs(self.header_timeout_secs),
            total: Duration::from_secs(self.total_timeout_secs),
            socket: Duration::from_secs(self.socket_timeout_secs),
        }
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Request builder carrying the configured credential source and identity.
    pub fn request_builder(&self) -> RequestBuilder {
        let builder = RequestBuilder::new()
            .api_key_env(&self.api_key_env)
            .referer(&self.referer)
            .title(&self.title);

        match &self.api_key {
            Some(key) => builder.api_key(key),
            None => builder,
        }
    }
}

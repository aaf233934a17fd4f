#[cfg(feature = "cli")]
pub mod cli;
pub mod global;

use crate::domain::ConfigProvider;
use crate::utils::error::{Result, RssError};
use crate::utils::validation::{validate_time_zone, validate_url, Validate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const DEFAULT_BASE_URI: &str = "http://localhost:5000/";
pub const DEFAULT_TIME_ZONE: &str = "Etc/UTC";

/// Service address, tenant secret and the zone used to read timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RssConfig {
    pub base_uri: String,
    pub secret: String,
    pub time_zone: String,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            secret: String::new(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
        }
    }
}

impl RssConfig {
    pub fn new(base_uri: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            secret: secret.into(),
            ..Self::default()
        }
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    /// Read `RSS_BASE_URI`, `RSS_SECRET` and `RSS_TIME_ZONE`, keeping defaults
    /// for unset variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_uri: env::var("RSS_BASE_URI").unwrap_or(defaults.base_uri),
            secret: env::var("RSS_SECRET").unwrap_or(defaults.secret),
            time_zone: env::var("RSS_TIME_ZONE").unwrap_or(defaults.time_zone),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML, either flat or under an `[rss]` table. `${VAR}` references
    /// are replaced from the environment first.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Wrapped {
            rss: RssConfig,
        }

        let processed = substitute_env_vars(content);
        let table: toml::Table = toml::from_str(&processed).map_err(parse_error)?;

        if table.contains_key("rss") {
            let wrapped: Wrapped = toml::from_str(&processed).map_err(parse_error)?;
            return Ok(wrapped.rss);
        }

        toml::from_str(&processed).map_err(parse_error)
    }

    pub fn zone(&self) -> Result<Tz> {
        validate_time_zone("time_zone", &self.time_zone)
    }
}

fn parse_error(e: toml::de::Error) -> RssError {
    RssError::ConfigError {
        message: format!("TOML parsing error: {}", e),
    }
}

fn substitute_env_vars(content: &str) -> String {
    use regex::{Captures, Regex};
    use std::sync::OnceLock;

    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = PATTERN
        .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").ok())
        .as_ref()
    else {
        return content.to_string();
    };

    re.replace_all(content, |caps: &Captures| {
        let var_name = &caps[1];
        env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .into_owned()
}

impl Validate for RssConfig {
    fn validate(&self) -> Result<()> {
        if self.base_uri.trim().is_empty() {
            return Err(RssError::MissingConfigError {
                field: "base_uri".to_string(),
            });
        }
        validate_url("base_uri", &self.base_uri)?;
        self.zone()?;
        Ok(())
    }
}

impl ConfigProvider for RssConfig {
    fn base_uri(&self) -> &str {
        &self.base_uri
    }

    fn secret(&self) -> &str {
        &self.secret
    }

    fn time_zone(&self) -> Result<Tz> {
        self.zone()
    }
}

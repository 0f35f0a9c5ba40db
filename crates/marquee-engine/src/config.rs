//! Engine configuration
//!
//! Resolution order (lowest to highest):
//! 1. Built-in defaults
//! 2. TOML file passed to [`MarqueeConfig::load`]
//! 3. `MARQUEE_*` environment variables
//!
//! The resolved struct is validated once and then passed by reference into
//! service constructors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use marquee_core::rules::validation::parse_timezone;
use marquee_core::{MarqueeError, Result};
use serde::{Deserialize, Serialize};

pub const ENV_DATABASE_PATH: &str = "MARQUEE_DATABASE_PATH";
pub const ENV_CODE_TTL_SECS: &str = "MARQUEE_CODE_TTL_SECS";
pub const ENV_OFFLINE_AFTER_SECS: &str = "MARQUEE_OFFLINE_AFTER_SECS";
pub const ENV_DEFAULT_TIMEZONE: &str = "MARQUEE_DEFAULT_TIMEZONE";

/// Upper bound for every duration setting (one year)
const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarqueeConfig {
    #[serde(default)]
    pub activation: ActivationConfig,
    #[serde(default)]
    pub displays: DisplayConfig,
    #[serde(default)]
    pub rules: RuleConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Device-flow pairing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActivationConfig {
    /// Lifetime of a freshly generated code (seconds)
    pub code_ttl_secs: u64,
    /// Poll interval handed to the display (seconds)
    pub poll_interval_secs: u32,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: 900, // 15 minutes
            poll_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// An active display silent for longer than this reads as offline
    pub offline_after_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            offline_after_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    /// Bucket spacing used when a reorder renumbers every rule
    pub priority_step: i64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            priority_step: marquee_core::ops::ordering::DEFAULT_PRIORITY_STEP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 10,
            max_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolutionConfig {
    /// IANA name used when neither the schedule nor the site names one
    pub default_timezone: String,
    /// Site id to IANA timezone name
    pub site_timezones: BTreeMap<String, String>,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            site_timezones: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("marquee.db"),
        }
    }
}

fn invalid(reason: impl Into<String>) -> MarqueeError {
    MarqueeError::InvalidConfig {
        reason: reason.into(),
    }
}

impl MarqueeConfig {
    /// Read a TOML file, apply environment overrides, validate
    ///
    /// # Errors
    /// `InvalidConfig` when the file cannot be read or parsed, an override
    /// is malformed, or validation fails.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            invalid(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| {
            invalid(format!(
                "failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, validated
    ///
    /// # Errors
    /// As for [`MarqueeConfig::load`], minus file access.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `InvalidConfig` for malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| invalid(format!("failed to parse config: {}", e)))
    }

    /// Apply `MARQUEE_*` overrides from the process environment
    ///
    /// # Errors
    /// `InvalidConfig` when a numeric override does not parse.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    ///
    /// # Errors
    /// `InvalidConfig` when a numeric override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Some(val) = lookup(ENV_CODE_TTL_SECS) {
            self.activation.code_ttl_secs = parse_number(ENV_CODE_TTL_SECS, &val)?;
        }
        if let Some(val) = lookup(ENV_OFFLINE_AFTER_SECS) {
            self.displays.offline_after_secs = parse_number(ENV_OFFLINE_AFTER_SECS, &val)?;
        }
        if let Some(tz) = lookup(ENV_DEFAULT_TIMEZONE) {
            self.resolution.default_timezone = tz;
        }
        Ok(())
    }

    /// # Errors
    /// `InvalidConfig` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.activation.code_ttl_secs == 0 {
            return Err(invalid("activation.code_ttl_secs must be positive"));
        }
        if self.activation.code_ttl_secs > MAX_DURATION_SECS {
            return Err(invalid("activation.code_ttl_secs is longer than a year"));
        }
        if self.activation.poll_interval_secs == 0 {
            return Err(invalid("activation.poll_interval_secs must be positive"));
        }
        if self.displays.offline_after_secs == 0 {
            return Err(invalid("displays.offline_after_secs must be positive"));
        }
        if self.displays.offline_after_secs > MAX_DURATION_SECS {
            return Err(invalid("displays.offline_after_secs is longer than a year"));
        }
        if self.rules.priority_step <= 0 {
            return Err(invalid("rules.priority_step must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts must be at least 1"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(invalid("retry.base_delay_ms exceeds retry.max_delay_ms"));
        }
        self.default_timezone()?;
        for site in self.resolution.site_timezones.keys() {
            self.site_timezone(site)?;
        }
        Ok(())
    }

    /// # Errors
    /// `InvalidConfig` for a name outside the IANA database.
    pub fn default_timezone(&self) -> Result<Tz> {
        parse_timezone(&self.resolution.default_timezone).map_err(|_| {
            invalid(format!(
                "resolution.default_timezone '{}' is not a known timezone",
                self.resolution.default_timezone
            ))
        })
    }

    /// Timezone for a site, falling back to the default
    ///
    /// # Errors
    /// `InvalidConfig` for a name outside the IANA database.
    pub fn site_timezone(&self, site_id: &str) -> Result<Tz> {
        match self.resolution.site_timezones.get(site_id) {
            Some(name) => parse_timezone(name).map_err(|_| {
                invalid(format!(
                    "resolution.site_timezones.{} '{}' is not a known timezone",
                    site_id, name
                ))
            }),
            None => self.default_timezone(),
        }
    }

    pub fn code_ttl(&self) -> chrono::Duration {
        bounded_seconds(self.activation.code_ttl_secs)
    }

    pub fn offline_after(&self) -> chrono::Duration {
        bounded_seconds(self.displays.offline_after_secs)
    }
}

fn bounded_seconds(secs: u64) -> chrono::Duration {
    // Lossless: MAX_DURATION_SECS fits in i64
    chrono::Duration::seconds(secs.min(MAX_DURATION_SECS) as i64)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(format!("{} must be a number, got '{}'", key, value)))
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::CurlOptions;
use crate::redact::DefaultRedactor;
use crate::retry::{BackoffSchedule, PolicySet, RetryPolicy};

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("backoff schedule must contain at least one delay")]
    EmptySchedule,
    #[error("{field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration { field: &'static str, value: f64 },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Retry policy parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Wait before each retry, in seconds. Its length is the transient retry budget.
    pub backoff_schedule_secs: Vec<f64>,
    /// Per-attempt timeout applied to idempotent methods.
    pub retry_timeout_secs: f64,
    /// Optional deadline for a whole call, retries included.
    #[serde(default)]
    pub call_timeout_secs: Option<f64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_schedule_secs: vec![4.0, 8.0, 16.0],
            retry_timeout_secs: 30.0,
            call_timeout_secs: None,
        }
    }
}

impl RetryConfig {
    pub fn schedule(&self) -> Result<BackoffSchedule, ConfigError> {
        let delays = self
            .backoff_schedule_secs
            .iter()
            .map(|&s| secs("backoff_schedule_secs", s))
            .collect::<Result<Vec<_>, _>>()?;
        BackoffSchedule::new(delays)
    }

    /// Build the default and Get policies.
    pub fn policies(&self) -> Result<PolicySet, ConfigError> {
        let schedule = self.schedule()?;
        let retry_timeout = positive_secs("retry_timeout_secs", self.retry_timeout_secs)?;
        let call_timeout = self
            .call_timeout_secs
            .map(|s| positive_secs("call_timeout_secs", s))
            .transpose()?;
        Ok(PolicySet {
            default: RetryPolicy::default_policy()
                .with_schedule(schedule.clone())
                .with_call_timeout(call_timeout),
            get: RetryPolicy::get_policy(retry_timeout)
                .with_schedule(schedule)
                .with_call_timeout(call_timeout),
        })
    }
}

/// Transport parameters (optional `[transport]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub connect_timeout_secs: f64,
    /// Overall limit for one exchange; expiry is not retried.
    pub request_timeout_secs: f64,
    pub follow_redirects: bool,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10.0,
            request_timeout_secs: 100.0,
            follow_redirects: true,
            user_agent: None,
        }
    }
}

impl TransportConfig {
    pub fn curl_options(&self) -> Result<CurlOptions, ConfigError> {
        let defaults = CurlOptions::default();
        Ok(CurlOptions {
            connect_timeout: positive_secs("connect_timeout_secs", self.connect_timeout_secs)?,
            request_timeout: positive_secs("request_timeout_secs", self.request_timeout_secs)?,
            follow_redirects: self.follow_redirects,
            max_redirects: defaults.max_redirects,
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        })
    }
}

/// What to hide in diagnostics (optional `[redaction]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    pub sensitive_headers: Vec<String>,
    pub sensitive_fields: Vec<String>,
    pub max_body_chars: usize,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        let r = DefaultRedactor::default();
        Self {
            sensitive_headers: r.sensitive_headers().to_vec(),
            sensitive_fields: r.sensitive_fields().to_vec(),
            max_body_chars: r.max_body_chars(),
        }
    }
}

impl RedactionConfig {
    pub fn redactor(&self) -> DefaultRedactor {
        DefaultRedactor::new(
            self.sensitive_headers.clone(),
            self.sensitive_fields.clone(),
            self.max_body_chars,
        )
    }
}

/// Global configuration loaded from `~/.config/rhc/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RhcConfig {
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub transport: Option<TransportConfig>,
    #[serde(default)]
    pub redaction: Option<RedactionConfig>,
}

impl RhcConfig {
    pub fn retry_or_default(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn transport_or_default(&self) -> TransportConfig {
        self.transport.clone().unwrap_or_default()
    }

    pub fn redaction_or_default(&self) -> RedactionConfig {
        self.redaction.clone().unwrap_or_default()
    }

    /// Render as the TOML that `load_from_path` accepts.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section by building what it describes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry_or_default().policies()?;
        self.transport_or_default().curl_options()?;
        Ok(())
    }
}

fn secs(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration { field, value })
}

fn positive_secs(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    let d = secs(field, value)?;
    if d.is_zero() {
        return Err(ConfigError::Zero { field });
    }
    Ok(d)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rhc")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RhcConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RhcConfig {
            retry: Some(RetryConfig::default()),
            transport: Some(TransportConfig::default()),
            redaction: Some(RedactionConfig::default()),
        };
        let toml = default_cfg.to_toml_string()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<RhcConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RhcConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#![forbid(unsafe_code)]

//! Manager configuration (deterministic, env-overridable).
//!
//! # Environment Variables
//! - `TRAFFIC_REINIT_POLICY` = reject|ignore|reregister
//! - `TRAFFIC_WARN_EMPTY_DETACH` (bool)
//!
//! Parsing never fails: a bad value keeps the default for that field and is
//! reported in [`TrafficConfigParse::errors`].

use std::env;
use std::fmt;

const ENV_REINIT_POLICY: &str = "TRAFFIC_REINIT_POLICY";
const ENV_WARN_EMPTY_DETACH: &str = "TRAFFIC_WARN_EMPTY_DETACH";

/// What a second `initialize()` call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReinitPolicy {
    /// Fail with `AlreadyInitialized`.
    #[default]
    Reject,
    /// Log and return without touching the engine.
    Ignore,
    /// Register the listener with the engine again.
    Reregister,
}

impl ReinitPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" | "error" | "strict" => Some(Self::Reject),
            "ignore" | "idempotent" => Some(Self::Ignore),
            "reregister" | "legacy" => Some(Self::Reregister),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Ignore => "ignore",
            Self::Reregister => "reregister",
        }
    }
}

impl fmt::Display for ReinitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traffic manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficConfig {
    pub reinit: ReinitPolicy,
    /// Log a warning when `detach_all()` finds nothing to detach.
    pub warn_on_empty_detach: bool,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            reinit: ReinitPolicy::Reject,
            warn_on_empty_detach: true,
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct TrafficConfigParse {
    pub config: TrafficConfig,
    pub errors: Vec<TrafficConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl TrafficConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TrafficConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for TrafficConfigError {}

impl TrafficConfig {
    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> TrafficConfig {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> TrafficConfigParse {
        from_env_with(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn with_reinit(mut self, reinit: ReinitPolicy) -> Self {
        self.reinit = reinit;
        self
    }

    #[must_use]
    pub fn with_warn_on_empty_detach(mut self, warn: bool) -> Self {
        self.warn_on_empty_detach = warn;
        self
    }

    /// Short human-readable summary for debug overlays.
    #[must_use]
    pub fn summary_short(&self) -> String {
        let warn = if self.warn_on_empty_detach { "on" } else { "off" };
        format!("Traffic: reinit={} · empty-detach warn {warn}", self.reinit)
    }
}

fn from_env_with<F>(mut get: F) -> TrafficConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = TrafficConfig::default();
    let mut errors = Vec::new();

    if let Some(value) = get(ENV_REINIT_POLICY) {
        match ReinitPolicy::parse(&value) {
            Some(parsed) => config.reinit = parsed,
            None => errors.push(TrafficConfigError::new(
                "reinit",
                value,
                "expected reject|ignore|reregister",
            )),
        }
    }

    if let Some(value) = get(ENV_WARN_EMPTY_DETACH) {
        match parse_bool(&value) {
            Some(parsed) => config.warn_on_empty_detach = parsed,
            None => errors.push(TrafficConfigError::new(
                "warn_on_empty_detach",
                value,
                "expected bool (1/0/true/false)",
            )),
        }
    }

    TrafficConfigParse { config, errors }
}

#[inline]
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

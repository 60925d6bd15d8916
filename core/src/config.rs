use std::time::Duration;

pub const INACTIVITY_TIMEOUT_ENV: &str = "RISKFLOW_INACTIVITY_TIMEOUT_SECS";
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sliding window after which a locked assessment is abandoned
    pub inactivity_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(DEFAULT_INACTIVITY_TIMEOUT_SECS),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_timeout_value(std::env::var(INACTIVITY_TIMEOUT_ENV).ok().as_deref())
    }

    /// Zero, negative or unparsable values fall back to the default.
    pub fn from_timeout_value(raw: Option<&str>) -> Self {
        match raw.and_then(|v| v.trim().parse::<u64>().ok()) {
            Some(secs) if secs > 0 => Self::with_timeout_secs(secs),
            _ => Self::default(),
        }
    }

    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(secs),
        }
    }
}

//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Values consumed by the conversation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Cumulative score at which a conversation is treated as a scam.
    pub scam_threshold: u32,
    /// Messages required before a report may fire (plateau or expiry path).
    pub min_messages_before_report: usize,
    /// Hard cap on messages per session; reaching it concludes the session.
    pub max_messages_per_session: usize,
    /// Idle time after which a session expires.
    pub session_timeout: Duration,
    /// Upper bound on a single report delivery.
    pub report_timeout: Duration,
    /// How often the background sweep looks for idle sessions.
    pub sweep_interval: Duration,
    /// Consecutive engaged turns without new intelligence that count as a
    /// plateau. Zero disables the early conclusion.
    pub plateau_turns: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scam_threshold: 4,
            min_messages_before_report: 3,
            max_messages_per_session: 20,
            session_timeout: Duration::from_secs(30 * 60), // 30 minutes
            report_timeout: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(120), // 2 minutes
            plateau_turns: 3,
        }
    }
}

impl PipelineConfig {
    /// Build from `HONEYPOT_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let session_timeout = env_parse::<u64>("HONEYPOT_SESSION_TIMEOUT_MINUTES")
            .map(|m| Duration::from_secs(m * 60))
            .unwrap_or(defaults.session_timeout);

        let report_timeout = env_parse::<u64>("HONEYPOT_REPORT_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.report_timeout);

        let sweep_interval = env_parse::<u64>("HONEYPOT_SWEEP_INTERVAL_SECS")
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);

        Self {
            scam_threshold: env_parse("HONEYPOT_SCAM_THRESHOLD").unwrap_or(defaults.scam_threshold),
            min_messages_before_report: env_parse("HONEYPOT_MIN_MESSAGES")
                .unwrap_or(defaults.min_messages_before_report),
            max_messages_per_session: env_parse("HONEYPOT_MAX_MESSAGES")
                .unwrap_or(defaults.max_messages_per_session),
            session_timeout,
            report_timeout,
            sweep_interval,
            plateau_turns: env_parse("HONEYPOT_PLATEAU_TURNS").unwrap_or(defaults.plateau_turns),
        }
    }

    /// Reject combinations the state machine cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_messages_per_session == 0 {
            return Err(ConfigError::InvalidValue {
                key: "HONEYPOT_MAX_MESSAGES".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.min_messages_before_report > self.max_messages_per_session {
            return Err(ConfigError::InvalidValue {
                key: "HONEYPOT_MIN_MESSAGES".into(),
                message: format!(
                    "{} exceeds the per-session maximum of {}",
                    self.min_messages_before_report, self.max_messages_per_session
                ),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Expected value of the `x-api-key` header.
    pub api_key: SecretString,
    /// Report collaborator endpoint. Reports are only logged when unset.
    pub report_url: Option<String>,
}

impl ServerConfig {
    /// Build from environment variables. `HONEYPOT_API_KEY` is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("HONEYPOT_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("HONEYPOT_API_KEY".into()))?;

        let port = match std::env::var("HONEYPOT_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HONEYPOT_PORT".into(),
                message: format!("'{raw}' is not a port number"),
            })?,
            Err(_) => 8000,
        };

        let report_url = std::env::var("HONEYPOT_REPORT_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            port,
            api_key: SecretString::from(api_key),
            report_url,
        })
    }
}

/// Load and validate both configurations from the environment.
pub fn load() -> crate::error::Result<(ServerConfig, PipelineConfig)> {
    let server = ServerConfig::from_env()?;
    let pipeline = PipelineConfig::from_env();
    pipeline.validate()?;
    Ok((server, pipeline))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_settings() {
        let config = PipelineConfig::default();
        assert_eq!(config.scam_threshold, 4);
        assert_eq!(config.min_messages_before_report, 3);
        assert_eq!(config.max_messages_per_session, 20);
        assert_eq!(config.session_timeout, Duration::from_secs(1800));
        assert_eq!(config.report_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_min_above_max() {
        let config = PipelineConfig {
            min_messages_before_report: 30,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_max() {
        let config = PipelineConfig {
            max_messages_per_session: 0,
            min_messages_before_report: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

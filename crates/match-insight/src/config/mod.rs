use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::analysis::cache::FreshnessPolicy;
use crate::analysis::weights::DefaultWeights;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            analysis: AnalysisConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Freshness windows and baseline weights for the analysis engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnalysisConfig {
    pub freshness: FreshnessPolicy,
    pub default_weights: DefaultWeights,
}

impl AnalysisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let freshness = FreshnessPolicy::from_hours(
            env_hours("ANALYSIS_JOB_MATCH_TTL_HOURS", 24)?,
            env_hours("ANALYSIS_SKILLS_GAP_TTL_HOURS", 24)?,
            env_hours("ANALYSIS_INTERVIEW_TTL_HOURS", 168)?,
        );

        let default_weights = DefaultWeights {
            skills: env_weight("ANALYSIS_DEFAULT_WEIGHT_SKILLS")?,
            experience: env_weight("ANALYSIS_DEFAULT_WEIGHT_EXPERIENCE")?,
            education: env_weight("ANALYSIS_DEFAULT_WEIGHT_EDUCATION")?,
            requirements: env_weight("ANALYSIS_DEFAULT_WEIGHT_REQUIREMENTS")?,
        };

        Ok(Self {
            freshness,
            default_weights,
        })
    }
}

fn env_hours(variable: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(variable) {
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(hours) if hours > 0 => Ok(hours),
            _ => Err(ConfigError::InvalidNumber { variable }),
        },
        Err(_) => Ok(default),
    }
}

fn env_weight(variable: &'static str) -> Result<f64, ConfigError> {
    match env::var(variable) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(weight) if weight.is_finite() && weight > 0.0 => Ok(weight),
            _ => Err(ConfigError::InvalidNumber { variable }),
        },
        Err(_) => Ok(1.0),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a positive number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub limiter: LimiterConfig,
    pub tokens: TokenConfig,
    pub security: SecurityConfig,
    pub mailer: MailerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" | "prod" => Ok(Environment::Production),
            "staging" | "stage" => Ok(Environment::Staging),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long in-flight requests may run once shutdown begins.
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub dsn: Option<String>,
    pub max_connections: u32,
    pub max_idle_time_secs: u64,
    pub connection_timeout: u64,
    /// Upper bound on any single store call made on behalf of a request.
    pub query_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    pub enabled: bool,
    pub rps: f64,
    pub burst: u32,
    pub sweep_interval_secs: u64,
    pub idle_ttl_secs: u64,
}

impl LimiterConfig {
    /// Time to replenish one request, rejecting rates no `Duration` can represent.
    pub fn replenish_period(&self) -> Result<Duration, ConfigError> {
        if !(self.rps.is_finite() && self.rps > 0.0) {
            return Err(ConfigError::InvalidLimiterRate(self.rps));
        }
        match Duration::try_from_secs_f64(1.0 / self.rps) {
            Ok(period) if !period.is_zero() => Ok(period),
            _ => Err(ConfigError::InvalidLimiterRate(self.rps)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub activation_ttl_secs: i64,
    pub authentication_ttl_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub sender: String,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown environment '{0}' (expected development|staging|production)")]
    UnknownEnvironment(String),

    #[error("limiter rate must be a positive number of requests per second, got {0}")]
    InvalidLimiterRate(f64),

    #[error("limiter burst must be at least 1")]
    InvalidLimiterBurst,

    #[error("bcrypt cost must be between 4 and 31, got {0}")]
    InvalidBcryptCost(u32),
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = env::var("APP_ENV")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Environment::Development);

        Self::for_environment(environment).with_env_overrides()
    }

    /// Preset defaults for an environment, before any overrides.
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    pub fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        override_from_env(&mut self.server.port, "SERVER_PORT");
        override_from_env(&mut self.server.shutdown_grace_secs, "SERVER_SHUTDOWN_GRACE_SECS");

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.dsn = Some(v);
        }
        override_from_env(&mut self.database.max_connections, "DATABASE_MAX_CONNECTIONS");
        override_from_env(&mut self.database.max_idle_time_secs, "DATABASE_MAX_IDLE_TIME_SECS");
        override_from_env(&mut self.database.connection_timeout, "DATABASE_CONNECTION_TIMEOUT");
        override_from_env(&mut self.database.query_timeout_secs, "DATABASE_QUERY_TIMEOUT_SECS");

        // API overrides
        override_from_env(&mut self.api.max_request_size_bytes, "API_MAX_REQUEST_SIZE_BYTES");

        // Limiter overrides
        override_from_env(&mut self.limiter.enabled, "LIMITER_ENABLED");
        override_from_env(&mut self.limiter.rps, "LIMITER_RPS");
        override_from_env(&mut self.limiter.burst, "LIMITER_BURST");
        override_from_env(&mut self.limiter.sweep_interval_secs, "LIMITER_SWEEP_INTERVAL_SECS");
        override_from_env(&mut self.limiter.idle_ttl_secs, "LIMITER_IDLE_TTL_SECS");

        // Token overrides
        override_from_env(&mut self.tokens.activation_ttl_secs, "TOKENS_ACTIVATION_TTL_SECS");
        override_from_env(&mut self.tokens.authentication_ttl_secs, "TOKENS_AUTHENTICATION_TTL_SECS");

        // Security overrides
        override_from_env(&mut self.security.enable_cors, "SECURITY_ENABLE_CORS");
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        override_from_env(&mut self.security.bcrypt_cost, "SECURITY_BCRYPT_COST");

        // Mailer overrides
        if let Ok(v) = env::var("MAILER_SENDER") {
            self.mailer.sender = v;
        }
        override_from_env(&mut self.mailer.max_attempts, "MAILER_MAX_ATTEMPTS");
        override_from_env(&mut self.mailer.initial_backoff_ms, "MAILER_INITIAL_BACKOFF_MS");

        self
    }

    /// Reject settings the rate limiter and password hasher cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limiter.replenish_period()?;
        if self.limiter.burst == 0 {
            return Err(ConfigError::InvalidLimiterBurst);
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(self.security.bcrypt_cost));
        }
        Ok(())
    }

    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_grace_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.database.query_timeout_secs)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 4000,
                shutdown_grace_secs: 5,
            },
            database: DatabaseConfig {
                dsn: None,
                max_connections: 25,
                max_idle_time_secs: 15 * 60,
                connection_timeout: 5,
                query_timeout_secs: 3,
            },
            api: ApiConfig {
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            limiter: LimiterConfig {
                enabled: true,
                rps: 4.0,
                burst: 8,
                sweep_interval_secs: 60,
                idle_ttl_secs: 3 * 60,
            },
            tokens: TokenConfig {
                activation_ttl_secs: 3 * 24 * 60 * 60,
                authentication_ttl_secs: 24 * 60 * 60,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                bcrypt_cost: 10,
            },
            mailer: MailerConfig {
                sender: "Reel <no-reply@reel.local>".to_string(),
                max_attempts: 3,
                initial_backoff_ms: 500,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 4000,
                shutdown_grace_secs: 5,
            },
            database: DatabaseConfig {
                dsn: None,
                max_connections: 25,
                max_idle_time_secs: 15 * 60,
                connection_timeout: 5,
                query_timeout_secs: 3,
            },
            api: ApiConfig {
                max_request_size_bytes: 1024 * 1024,
            },
            limiter: LimiterConfig {
                enabled: true,
                rps: 4.0,
                burst: 8,
                sweep_interval_secs: 60,
                idle_ttl_secs: 3 * 60,
            },
            tokens: TokenConfig {
                activation_ttl_secs: 3 * 24 * 60 * 60,
                authentication_ttl_secs: 24 * 60 * 60,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                bcrypt_cost: 12,
            },
            mailer: MailerConfig {
                sender: "Reel <no-reply@staging.example.com>".to_string(),
                max_attempts: 3,
                initial_backoff_ms: 500,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 4000,
                shutdown_grace_secs: 5,
            },
            database: DatabaseConfig {
                dsn: None,
                max_connections: 50,
                max_idle_time_secs: 15 * 60,
                connection_timeout: 5,
                query_timeout_secs: 3,
            },
            api: ApiConfig {
                max_request_size_bytes: 1024 * 1024,
            },
            limiter: LimiterConfig {
                enabled: true,
                rps: 2.0,
                burst: 4,
                sweep_interval_secs: 60,
                idle_ttl_secs: 3 * 60,
            },
            tokens: TokenConfig {
                activation_ttl_secs: 3 * 24 * 60 * 60,
                authentication_ttl_secs: 24 * 60 * 60,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                bcrypt_cost: 12,
            },
            mailer: MailerConfig {
                sender: "Reel <no-reply@example.com>".to_string(),
                max_attempts: 3,
                initial_backoff_ms: 500,
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn override_from_env<T: FromStr>(field: &mut T, key: &str) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => tracing::warn!(key, value = %v, "ignoring unparsable config override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.limiter.enabled);
        assert_eq!(config.limiter.burst, 8);
        assert_eq!(config.server.shutdown_grace_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.security.bcrypt_cost, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unusable_limiter_settings() {
        let mut config = AppConfig::development();
        config.limiter.rps = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimiterRate(_))));

        config.limiter.rps = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimiterRate(_))));

        config.limiter.rps = 1e-300;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimiterRate(_))));

        config.limiter.rps = 1e300;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimiterRate(_))));

        config.limiter.rps = 2.0;
        config.limiter.burst = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimiterBurst)));
    }

    #[test]
    fn parses_environment_aliases() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("stage".parse::<Environment>().unwrap(), Environment::Staging);
        assert!("qa".parse::<Environment>().is_err());
    }
}

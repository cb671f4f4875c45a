use clap::{Parser, ValueEnum};

use crate::config::{AppConfig, Environment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// Postgres at `--db-dsn` / `DATABASE_URL`
    Postgres,
    /// In-process stores; data is lost on exit
    Memory,
}

#[derive(Debug, Parser)]
#[command(name = "reel-api")]
#[command(about = "Reel movie catalogue JSON API")]
#[command(version)]
pub struct Args {
    #[arg(long, help = "Listen port (overrides SERVER_PORT)")]
    pub port: Option<u16>,

    #[arg(long = "env", env = "APP_ENV", help = "development | staging | production")]
    pub environment: Option<Environment>,

    #[arg(long, help = "Postgres DSN (overrides DATABASE_URL)")]
    pub db_dsn: Option<String>,

    #[arg(long, help = "Rate limiter requests per second")]
    pub limiter_rps: Option<f64>,

    #[arg(long, help = "Rate limiter burst size")]
    pub limiter_burst: Option<u32>,

    #[arg(long, help = "Enable or disable the rate limiter")]
    pub limiter_enabled: Option<bool>,

    #[arg(long, value_enum, env = "STORAGE", default_value = "postgres")]
    pub storage: StorageKind,
}

impl Args {
    /// Environment preset plus env overrides, then these flags on top.
    pub fn load_config(&self) -> AppConfig {
        let mut config = match self.environment {
            Some(environment) => AppConfig::for_environment(environment).with_env_overrides(),
            None => AppConfig::from_env(),
        };
        self.apply(&mut config);
        config
    }

    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dsn) = &self.db_dsn {
            config.database.dsn = Some(dsn.clone());
        }
        if let Some(rps) = self.limiter_rps {
            config.limiter.rps = rps;
        }
        if let Some(burst) = self.limiter_burst {
            config.limiter.burst = burst;
        }
        if let Some(enabled) = self.limiter_enabled {
            config.limiter.enabled = enabled;
        }
    }
}

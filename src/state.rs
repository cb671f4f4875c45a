use std::sync::Arc;

use crate::auth::{BcryptHasher, PasswordHasher, TokenService};
use crate::background::BackgroundTasks;
use crate::config::{AppConfig, ConfigError};
use crate::database::Stores;
use crate::mailer::{LogMailer, Mailer, RetryingMailer};
use crate::middleware::ClientRateLimiter;

/// Everything a handler or middleware may need, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    pub tokens: TokenService,
    pub limiter: ClientRateLimiter,
    pub background: BackgroundTasks,
    pub mailer: Arc<dyn Mailer>,
    pub hasher: Arc<dyn PasswordHasher>,
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores) -> Result<Self, ConfigError> {
        config.validate()?;

        let limiter = ClientRateLimiter::new(&config.limiter)?;
        let tokens = TokenService::new(stores.tokens.clone(), stores.users.clone());
        let mailer = Arc::new(RetryingMailer::new(LogMailer, &config.mailer));
        let hasher = Arc::new(BcryptHasher::new(config.security.bcrypt_cost));

        Ok(Self {
            config: Arc::new(config),
            stores,
            tokens,
            limiter,
            background: BackgroundTasks::new(),
            mailer,
            hasher,
        })
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}

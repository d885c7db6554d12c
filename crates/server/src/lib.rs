use std::sync::Arc;

use config::{Config, ConfigError};
use db::{DBService, DbErr};
use rand::{Rng, distributions::Alphanumeric};
use thiserror::Error;
use utils_jwt::TokenService;

pub mod error;
pub mod extract;
pub mod http;
pub mod middleware;
pub mod password;
pub mod routes;

const GENERATED_SECRET_LEN: usize = 48;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Application state shared by every handler.
#[derive(Clone)]
pub struct Deployment {
    config: Arc<Config>,
    db: DBService,
    tokens: TokenService,
}

impl Deployment {
    pub async fn new(config: Config) -> Result<Self, DeploymentError> {
        let database_url = config.database_url()?;
        let db = DBService::new(&database_url).await?;
        Ok(Self::from_parts(config, db))
    }

    pub fn from_parts(config: Config, db: DBService) -> Self {
        let secret = match config.jwt_secret.clone() {
            Some(secret) => secret,
            None => {
                tracing::warn!(
                    "No JWT secret configured; generated an ephemeral one, issued tokens will not survive a restart"
                );
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(GENERATED_SECRET_LEN)
                    .map(char::from)
                    .collect()
            }
        };
        let tokens = TokenService::new(&secret, chrono::Duration::days(config.token_ttl_days));

        Self {
            config: Arc::new(config),
            db,
            tokens,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}

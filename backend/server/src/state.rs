use std::sync::Arc;

use ledger::{Authenticator, Store};

use super::{config::Config, error::AppError};

pub struct State {
    pub config: Config,
    pub store: Store,
    pub auth: Authenticator,
}

impl State {
    pub async fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let store = Store::connect(&config.database_url).await?;
        store.migrate().await?;

        Ok(Self::from_parts(config, store))
    }

    pub fn from_parts(config: Config, store: Store) -> Arc<Self> {
        let auth = Authenticator::new(config.jwt_secret.clone());

        Arc::new(Self {
            config,
            store,
            auth,
        })
    }
}

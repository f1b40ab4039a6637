use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub frontend_url: Option<String>,
    pub jwt_secret: String,
    pub setup_key: String,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Ok(Self {
            port: try_load("RUST_PORT", "3001")?,
            database_url: try_load("DATABASE_URL", "sqlite://nominations.db")?,
            frontend_url: var("FRONTEND_URL").ok(),
            jwt_secret: read_secret("JWT_SECRET")?,
            setup_key: read_secret("SETUP_KEY")?,
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid {key} value: {e}")))
}

/// Docker secrets first, then the plain environment.
fn read_secret(secret_name: &str) -> Result<String, AppError> {
    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(s) if !s.trim().is_empty() => return Ok(s.trim().to_string()),
        Ok(_) => warn!("{path} is empty"),
        Err(e) => info!("Failed to read {secret_name} from file: {e}"),
    }

    env::var(secret_name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Config(format!("{secret_name} is not configured")))
}

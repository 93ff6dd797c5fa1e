use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub redis_url: Option<String>,
    pub public_url: String,
    pub images_dir: String,
    pub jwt_secret: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "4000"),
            redis_url: env::var("REDIS_URL").ok(),
            public_url: try_load("PUBLIC_URL", "http://localhost:4000"),
            images_dir: try_load("IMAGES_DIR", "images"),
            jwt_secret: load_secret("JWT_SECRET"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Docker-style secret file first, plain environment variable second.
fn load_secret(secret_name: &str) -> String {
    let path = format!("/run/secrets/{secret_name}");

    if let Ok(secret) = read_to_string(&path) {
        return secret.trim().to_string();
    }

    var(secret_name).expect("Secrets misconfigured!")
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            redis_url: None,
            public_url: "http://localhost:4000".to_string(),
            images_dir: "images".to_string(),
            jwt_secret: "test-secret".to_string(),
        }
    }
}

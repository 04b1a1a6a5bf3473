use serde::Deserialize;
use std::{env, error::Error, fs};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonConfig {
    pub project_name: String,
    pub database_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub server_address: String,
    pub log_level: String,
    /// Origins allowed by CORS. `"*"` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:8000".to_string(),
            log_level: "info".to_string(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret".to_string(),
            token_ttl_minutes: default_token_ttl_minutes(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_token_ttl_minutes() -> i64 {
    60
}

fn default_bcrypt_cost() -> u32 {
    12
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub common: CommonConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let contents = fs::read_to_string(config_path)?;
        let config = serde_yml::from_str(&contents)?;

        Ok(config)
    }

    /// Values from the process environment (and `.env`, if present) win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        if let Ok(url) = env::var("DATABASE_URL") {
            self.common.database_url = url;
        }
        if let Ok(secret) = env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(address) = env::var("SERVER_ADDRESS") {
            self.backend.server_address = address;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.backend.log_level = level;
        }
    }
}

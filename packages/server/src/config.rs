use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{S3Config, StorageBackend, StorageConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// `postgres://...` for the database-backed store, `memory://` for the
    /// in-process store.
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory:")
    }
}

/// The single clinic login and the session token settings.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    pub jwt_secret: String,
    pub session_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// One of: trace, debug, info, warn, error.
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CLINIC_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "memory://")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.username", "admin")?
            .set_default("auth.password", "admin123")?
            .set_default("auth.session_hours", 12)?
            .set_default("log.level", "info")?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., CLINIC__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CLINIC").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

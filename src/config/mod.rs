use once_cell::sync::Lazy;
use std::env;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string; `None` selects the in-memory store
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Clone)]
pub struct SecurityConfig {
    pub user_jwt_secret: String,
    pub admin_jwt_secret: String,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

// Secrets stay out of logs
impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("user_jwt_secret", &"<redacted>")
            .field("admin_jwt_secret", &"<redacted>")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingSecret(&'static str),

    #[error("JWT_SECRET and ADMIN_JWT_SECRET must differ")]
    SharedSecret,

    #[error("DATABASE_URL is required in production")]
    MissingDatabase,

    #[error("bcrypt cost {0} is outside 4..=31")]
    InvalidBcryptCost(u32),
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process environment in practice)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Database overrides
        if let Some(v) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = lookup("LEDGER_API_PORT").or_else(|| lookup("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Some(v) = lookup("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.user_jwt_secret = v;
        }
        if let Some(v) = lookup("ADMIN_JWT_SECRET") {
            self.security.admin_jwt_secret = v;
        }
        if let Some(v) = lookup("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    /// Reject configurations the server must not start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.user_jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret("JWT_SECRET"));
        }
        if self.security.admin_jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret("ADMIN_JWT_SECRET"));
        }
        if self.security.user_jwt_secret == self.security.admin_jwt_secret {
            return Err(ConfigError::SharedSecret);
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(self.security.bcrypt_cost));
        }
        if self.environment == Environment::Production && self.database.url.is_none() {
            return Err(ConfigError::MissingDatabase);
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 5000,
                enable_request_logging: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            security: SecurityConfig {
                user_jwt_secret: "development-user-secret".to_string(),
                admin_jwt_secret: "development-admin-secret".to_string(),
                bcrypt_cost: 10,
                cors_origins: vec!["*".to_string()],
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 5000,
                enable_request_logging: true,
                max_request_size_bytes: 512 * 1024,
            },
            security: SecurityConfig {
                user_jwt_secret: String::new(),
                admin_jwt_secret: String::new(),
                bcrypt_cost: 10,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 5000,
                enable_request_logging: false,
                max_request_size_bytes: 256 * 1024,
            },
            security: SecurityConfig {
                user_jwt_secret: String::new(),
                admin_jwt_secret: String::new(),
                bcrypt_cost: 12,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

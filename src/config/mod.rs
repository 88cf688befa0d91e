use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub endpoint: String,
    pub from_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    pub bucket: String,
    pub upload_ttl_secs: u64,
    pub download_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        Self::defaults(environment).with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs =
                v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }

        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }

        if let Ok(v) = env::var("SECRET_KEY") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        if let Ok(v) = env::var("MAIL_ENDPOINT") {
            self.mail.endpoint = v;
        }
        if let Ok(v) = env::var("FROM_EMAIL") {
            self.mail.from_email = v;
        }

        if let Ok(v) = env::var("ASSETS_BUCKET") {
            self.assets.bucket = v;
        }
        if let Ok(v) = env::var("ASSETS_UPLOAD_TTL_SECS") {
            self.assets.upload_ttl_secs = v.parse().unwrap_or(self.assets.upload_ttl_secs);
        }
        if let Ok(v) = env::var("ASSETS_DOWNLOAD_TTL_SECS") {
            self.assets.download_ttl_secs = v.parse().unwrap_or(self.assets.download_ttl_secs);
        }

        self
    }

    fn defaults(environment: Environment) -> Self {
        Self {
            environment,
            database: DatabaseConfig {
                max_connections: 10,
                acquire_timeout_secs: 5,
            },
            api: ApiConfig {
                default_page_size: 25,
                max_page_size: 1000,
            },
            security: SecurityConfig {
                // Overridden via SECRET_KEY in any real deployment
                jwt_secret: "CHANGE_ME".to_string(),
                jwt_expiry_hours: 24,
            },
            mail: MailConfig {
                endpoint: "http://localhost:8025/send".to_string(),
                from_email: "info@campus.local".to_string(),
            },
            assets: AssetsConfig {
                bucket: "campus-assets".to_string(),
                upload_ttl_secs: 900,
                download_ttl_secs: 3600,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::defaults(Environment::Development);
        assert_eq!(config.api.default_page_size, 25);
        assert_eq!(config.api.max_page_size, 1000);
        assert_eq!(config.security.jwt_expiry_hours, 24);
    }
}

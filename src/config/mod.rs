use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub session_token_hours: u64,
    pub verification_token_hours: u64,
    pub reset_token_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: String,
}

/// Fields a project search term is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchField {
    Title,
    Description,
    Tags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub project_fields: Vec<SearchField>,
}

impl SearchConfig {
    pub fn matches(&self, field: SearchField) -> bool {
        self.project_fields.contains(&field)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // API overrides
        if let Some(port) = env::var("HUB_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SECURITY_SESSION_TOKEN_HOURS") {
            self.security.session_token_hours = v.parse().unwrap_or(self.security.session_token_hours);
        }
        if let Ok(v) = env::var("SECURITY_VERIFICATION_TOKEN_HOURS") {
            self.security.verification_token_hours =
                v.parse().unwrap_or(self.security.verification_token_hours);
        }
        if let Ok(v) = env::var("SECURITY_RESET_TOKEN_MINUTES") {
            self.security.reset_token_minutes = v.parse().unwrap_or(self.security.reset_token_minutes);
        }

        // Email overrides
        if let Ok(v) = env::var("EMAIL_SMTP_HOST") {
            self.email.smtp_host = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Ok(v) = env::var("EMAIL_SMTP_PORT") {
            self.email.smtp_port = v.parse().unwrap_or(self.email.smtp_port);
        }
        if let Ok(v) = env::var("EMAIL_USER") {
            self.email.username = Some(v);
        }
        if let Ok(v) = env::var("EMAIL_PASS") {
            self.email.password = Some(v);
        }
        if let Ok(v) = env::var("EMAIL_FROM") {
            self.email.from_address = v;
        }
        if let Ok(v) = env::var("EMAIL_FRONTEND_URL") {
            self.email.frontend_url = v.trim_end_matches('/').to_string();
        }

        // Storage overrides
        if let Ok(v) = env::var("UPLOAD_DIR") {
            self.storage.upload_dir = v;
        }

        // Search overrides
        if let Ok(v) = env::var("SEARCH_PROJECT_FIELDS") {
            let fields = parse_search_fields(&v);
            if !fields.is_empty() {
                self.search.project_fields = fields;
            }
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            api: ApiConfig {
                port: 5000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                default_page_size: 10,
                max_page_size: 100,
            },
            security: SecurityConfig {
                jwt_secret: "development-secret-change-me".to_string(),
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                session_token_hours: 24 * 7,
                verification_token_hours: 24,
                reset_token_minutes: 60,
            },
            email: EmailConfig {
                smtp_host: None,
                smtp_port: 587,
                username: None,
                password: None,
                from_address: "Research Hub <no-reply@localhost>".to_string(),
                frontend_url: "http://localhost:3000".to_string(),
            },
            storage: StorageConfig {
                upload_dir: "uploads".to_string(),
            },
            search: SearchConfig::default(),
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.api.max_request_size_bytes = 10 * 1024 * 1024;
        config.api.max_page_size = 50;
        // Secrets must be supplied explicitly outside development
        config.security.jwt_secret = String::new();
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config.email.frontend_url = "https://staging.example.com".to_string();
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.database.run_migrations = false;
        config.api.max_page_size = 50;
        config.security.jwt_secret = String::new();
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config.email.frontend_url = "https://app.example.com".to_string();
        config
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            project_fields: vec![SearchField::Title, SearchField::Description, SearchField::Tags],
        }
    }
}

fn parse_search_fields(raw: &str) -> Vec<SearchField> {
    raw.split(',')
        .filter_map(|s| match s.trim().to_ascii_lowercase().as_str() {
            "title" => Some(SearchField::Title),
            "description" => Some(SearchField::Description),
            "tags" => Some(SearchField::Tags),
            _ => None,
        })
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

// Helper macros for common checks
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,

    // Sessions
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,

    // Rate limiting (attempts per window)
    pub auth_rate_limit: u32,
    pub auth_rate_window_seconds: i64,
    pub reset_rate_limit: u32,
    pub reset_rate_window_seconds: i64,

    // App settings
    pub app_name: String,
    pub app_description: String,
    pub base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://rayat.db".to_string()),
            jwt_secret: env::var("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),

            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24 * 7),
            bcrypt_cost: env::var("BCRYPT_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(12),

            auth_rate_limit: env::var("AUTH_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            auth_rate_window_seconds: 15 * 60,
            reset_rate_limit: env::var("RESET_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            reset_rate_window_seconds: 60 * 60,

            app_name: env::var("APP_NAME").unwrap_or_else(|_| "راية الفرسان".to_string()),
            app_description: "منتدى عربي للنقاشات والمجتمعات".to_string(),
            base_url: env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    /// Settings used by tests: in-memory store, cheap hashing.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            session_ttl_hours: 24,
            bcrypt_cost: 4,
            auth_rate_limit: 15,
            auth_rate_window_seconds: 15 * 60,
            reset_rate_limit: 10,
            reset_rate_window_seconds: 60 * 60,
            app_name: "راية الفرسان".to_string(),
            app_description: "منتدى عربي للنقاشات والمجتمعات".to_string(),
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

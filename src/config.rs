//! Server configuration loaded from environment variables.
//!
//! Every setting has a development default, so the server starts with no
//! configuration at all. A `.env` file is honored when present.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address for the HTTP server.
    /// Env: `HTTP_ADDR`, or `PORT` to bind `0.0.0.0:PORT`.
    pub http_addr: SocketAddr,

    /// SQLite connection string. Env: `DATABASE_URL`.
    pub database_url: String,

    /// Env: `DB_MAX_CONNECTIONS`.
    pub max_db_connections: u32,

    /// Login name of the administrator bypass. Env: `ADMIN_LOGIN`.
    pub admin_login: String,

    /// Password of the administrator bypass. Env: `ADMIN_PASSWORD`.
    pub admin_password: String,

    /// Domain used for generated email aliases. Env: `EMAIL_DOMAIN`.
    pub email_domain: String,

    /// Directory where uploaded files are stored. Env: `UPLOAD_DIR`.
    pub upload_dir: PathBuf,

    /// Env: `MAX_UPLOAD_BYTES`.
    pub max_upload_bytes: usize,

    /// Upper bound on the time spent handling one HTTP request.
    /// Env: `REQUEST_TIMEOUT_SECS`.
    pub request_timeout: Duration,

    /// Sessions expire after this much inactivity. Env: `SESSION_TTL_HOURS`.
    pub session_ttl_hours: i64,

    /// Env: `SECURE_COOKIES` (true/false).
    pub secure_cookies: bool,

    /// Env: `BCRYPT_COST`.
    pub bcrypt_cost: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_url: "sqlite://mailgram.db".to_string(),
            max_db_connections: 20,
            admin_login: "admin".to_string(),
            admin_password: "admin123".to_string(),
            email_domain: "Mailgram.com".to_string(),
            upload_dir: PathBuf::from("static/uploads"),
            max_upload_bytes: 16 * 1024 * 1024, // 16 MiB
            request_timeout: Duration::from_secs(30),
            session_ttl_hours: 24 * 7,
            secure_cookies: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        // A missing .env file is fine; real deployments set variables directly.
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.http_addr = ([0, 0, 0, 0], port).into(),
                Err(_) => tracing::warn!(value = %port, "Invalid PORT, using default"),
            }
        }

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(n) = parse_var::<u32>("DB_MAX_CONNECTIONS") {
            config.max_db_connections = n.max(1);
        }

        if let Ok(login) = std::env::var("ADMIN_LOGIN") {
            if !login.is_empty() {
                config.admin_login = login;
            }
        }

        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            if !password.is_empty() {
                config.admin_password = password;
            }
        }

        if let Ok(domain) = std::env::var("EMAIL_DOMAIN") {
            config.email_domain = domain;
        }

        if let Ok(dir) = std::env::var("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }

        if let Some(n) = parse_var::<usize>("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = n;
        }

        if let Some(secs) = parse_var::<u64>("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(hours) = parse_var::<i64>("SESSION_TTL_HOURS") {
            config.session_ttl_hours = hours;
        }

        if let Ok(val) = std::env::var("SECURE_COOKIES") {
            config.secure_cookies = parse_bool(&val);
        }

        if let Some(cost) = parse_var::<u32>("BCRYPT_COST") {
            config.bcrypt_cost = cost.clamp(4, 31);
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Invalid value, using default");
            None
        }
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

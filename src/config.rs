use std::str::FromStr;

use anyhow::Context;

/// Token settings. Loaded so deployments can set them ahead of a login
/// feature; nothing reads them yet.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    /// Raw comma-separated list, see [`AppConfig::cors_origins`].
    pub cors_origins: String,
    pub project_name: String,
    pub debug: bool,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| get(key).with_context(|| format!("{key} must be set"));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt = JwtConfig {
            secret: required("JWT_SECRET_KEY")?,
            algorithm: or_default("JWT_ALGORITHM", "HS256"),
            access_ttl_minutes: parse_num(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", 1440)?,
            refresh_ttl_minutes: parse_num(&get, "REFRESH_TOKEN_EXPIRE_MINUTES", 1440)?,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse_num(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            jwt,
            cors_origins: required("CORS_ORIGINS")?,
            project_name: or_default("PROJECT_NAME", "Signup Service API"),
            debug: match get("DEBUG") {
                Some(v) => parse_bool(&v).with_context(|| format!("DEBUG: invalid boolean {v:?}"))?,
                None => false,
            },
            host: or_default("APP_HOST", "0.0.0.0"),
            port: parse_num(&get, "APP_PORT", 8080)?,
        })
    }

    /// Allowed CORS origins, trimmed, empty entries dropped.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect()
    }
}

fn parse_num<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key}: invalid number {v:?}")),
        None => Ok(default),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

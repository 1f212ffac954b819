use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_secret: String,
    pub auth_jwt_secret: String,
    pub bind_addr: String,
    pub workday_start_hour: u32,
    pub workday_end_hour: u32,
    pub slot_interval_minutes: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_secret: String::new(),
            auth_jwt_secret: String::new(),
            bind_addr: "0.0.0.0:3000".to_string(),
            workday_start_hour: 9,
            workday_end_hour: 17,
            slot_interval_minutes: 30,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using empty value");
                    String::new()
                }),
            database_secret: env::var("DATABASE_SECRET")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_SECRET not set, requests will use caller tokens only");
                    String::new()
                }),
            auth_jwt_secret: env::var("AUTH_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("AUTH_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| defaults.bind_addr.clone()),
            workday_start_hour: parse_var("WORKDAY_START_HOUR", defaults.workday_start_hour),
            workday_end_hour: parse_var("WORKDAY_END_HOUR", defaults.workday_end_hour),
            slot_interval_minutes: parse_var("SLOT_INTERVAL_MINUTES", defaults.slot_interval_minutes),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty() && !self.auth_jwt_secret.is_empty()
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

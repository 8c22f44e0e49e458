//! Process settings from environment variables (after `.env` is loaded by the binary).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Postgres,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub api_base_url: String,
    /// CORS origin in production.
    pub frontend_url: Option<String>,
    pub backend: Backend,
    pub database_url: String,
    pub seed_mock_data: bool,
    pub data_dir: PathBuf,
    pub pages_dir: PathBuf,
    pub body_limit_bytes: usize,
}

/// Origin allowed outside production.
pub const DEV_FRONTEND_ORIGIN: &str = "http://localhost:3001";

fn parse<T: std::str::FromStr>(var: &'static str, value: Option<String>, default: T) -> Result<T, SettingsError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| SettingsError::Invalid { var, value: v }),
    }
}

fn parse_bool(var: &'static str, value: Option<String>, default: bool) -> Result<bool, SettingsError> {
    match value.as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(SettingsError::Invalid {
            var,
            value: other.to_string(),
        }),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|k| std::env::var(k).ok().filter(|v| !v.is_empty()))
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let environment = match get("NODE_ENV").as_deref() {
            None | Some("development") => Environment::Development,
            Some("production") => Environment::Production,
            Some("test") => Environment::Test,
            Some(other) => {
                return Err(SettingsError::Invalid {
                    var: "NODE_ENV",
                    value: other.to_string(),
                })
            }
        };
        let backend = match get("STORE_BACKEND").as_deref() {
            None | Some("memory") => Backend::Memory,
            Some("postgres") => Backend::Postgres,
            Some(other) => {
                return Err(SettingsError::Invalid {
                    var: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };
        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => {
                let host = get("DB_HOST").unwrap_or_else(|| "localhost".into());
                let user = get("DB_USER").unwrap_or_else(|| "postgres".into());
                let password = get("DB_PASSWORD").unwrap_or_default();
                let name = get("DB_NAME").unwrap_or_else(|| "inventory_db".into());
                let port: u16 = parse("DB_PORT", get("DB_PORT"), 5432)?;
                let auth = if password.is_empty() { user } else { format!("{}:{}", user, password) };
                format!("postgres://{}@{}:{}/{}", auth, host, port, name)
            }
        };
        let data_dir = PathBuf::from(get("DATA_DIR").unwrap_or_else(|| "./data".into()));
        let pages_dir = get("PAGES_DIR").map(PathBuf::from).unwrap_or_else(|| data_dir.join("pages"));
        Ok(Settings {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse("PORT", get("PORT"), 3000)?,
            environment,
            api_base_url: get("API_BASE_URL").unwrap_or_else(|| "http://localhost:3000".into()),
            frontend_url: get("FRONTEND_URL"),
            backend,
            database_url,
            seed_mock_data: parse_bool("SEED_MOCK_DATA", get("SEED_MOCK_DATA"), true)?,
            data_dir,
            pages_dir,
            body_limit_bytes: parse("BODY_LIMIT_BYTES", get("BODY_LIMIT_BYTES"), 10 * 1024 * 1024)?,
        })
    }

    /// Origin the browser app is served from.
    pub fn cors_origin(&self) -> &str {
        match (self.environment, self.frontend_url.as_deref()) {
            (Environment::Production, Some(url)) => url,
            _ => DEV_FRONTEND_ORIGIN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.port, 3000);
        assert_eq!(s.backend, Backend::Memory);
        assert_eq!(s.database_url, "postgres://postgres@localhost:5432/inventory_db");
        assert!(s.seed_mock_data);
        assert_eq!(s.pages_dir, PathBuf::from("./data").join("pages"));
        assert_eq!(s.body_limit_bytes, 10 * 1024 * 1024);
        assert_eq!(s.cors_origin(), DEV_FRONTEND_ORIGIN);
    }

    #[test]
    fn database_url_from_parts() {
        let s = settings(&[("DB_USER", "app"), ("DB_PASSWORD", "pw"), ("DB_HOST", "db"), ("DB_NAME", "erp")]).unwrap();
        assert_eq!(s.database_url, "postgres://app:pw@db:5432/erp");
    }

    #[test]
    fn production_cors_uses_frontend_url() {
        let s = settings(&[("NODE_ENV", "production"), ("FRONTEND_URL", "https://erp.example.com")]).unwrap();
        assert_eq!(s.cors_origin(), "https://erp.example.com");
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(settings(&[("PORT", "http")]).is_err());
        assert!(settings(&[("STORE_BACKEND", "sqlite")]).is_err());
        assert!(settings(&[("SEED_MOCK_DATA", "maybe")]).is_err());
    }
}

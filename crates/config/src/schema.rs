use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use utils_core::assets::asset_dir;

use crate::ConfigError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    #[serde(alias = "databaseUrl")]
    pub database_url: Option<String>,
    #[serde(alias = "jwtSecret")]
    pub jwt_secret: Option<String>,
    #[serde(alias = "tokenTtlDays")]
    pub token_ttl_days: i64,
    #[serde(alias = "frontendDir")]
    pub frontend_dir: Option<String>,
    #[serde(alias = "corsAllowAnyOrigin")]
    pub cors_allow_any_origin: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_days", &self.token_ttl_days)
            .field("frontend_dir", &self.frontend_dir)
            .field("cors_allow_any_origin", &self.cors_allow_any_origin)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_url: None,
            jwt_secret: None,
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            frontend_dir: None,
            cors_allow_any_origin: true,
        }
    }
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        if self.host.trim().is_empty() {
            self.host = DEFAULT_HOST.to_string();
        } else {
            self.host = self.host.trim().to_string();
        }

        if self.token_ttl_days <= 0 {
            tracing::warn!(
                "Invalid token lifetime of {} days, resetting to default",
                self.token_ttl_days
            );
            self.token_ttl_days = DEFAULT_TOKEN_TTL_DAYS;
        }

        for value in [
            &mut self.database_url,
            &mut self.jwt_secret,
            &mut self.frontend_dir,
        ] {
            if matches!(value.as_deref(), Some(text) if text.trim().is_empty()) {
                *value = None;
            }
        }

        self
    }

    /// Applies process-level overrides on top of file values. `lookup` is
    /// usually `std::env::var(..).ok()`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(raw) = lookup("BACKEND_PORT").or_else(|| lookup("PORT")) {
            // Some launchers wrap env values in ANSI color codes.
            let cleaned = strip_ansi_escapes::strip_str(&raw);
            self.port = cleaned.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("Invalid port `{}`", cleaned.trim()))
            })?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt_secret = Some(secret);
        }
        if let Some(raw) = lookup("JWT_TTL_DAYS") {
            self.token_ttl_days = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("Invalid token lifetime `{}`", raw.trim()))
            })?;
        }
        if let Some(dir) = lookup("FRONTEND_DIR") {
            self.frontend_dir = Some(dir);
        }

        Ok(self.normalized())
    }

    /// Connection string for the task store, defaulting to `db.sqlite` in
    /// the asset directory.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }
        let path = asset_dir()?.join("db.sqlite");
        Ok(format!("sqlite://{}?mode=rwc", path.to_string_lossy()))
    }

    pub fn frontend_dir(&self) -> Option<PathBuf> {
        self.frontend_dir.as_deref().map(PathBuf::from)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_for_empty_config() {
        let config = Config::from_raw("{}");

        assert_eq!(config, Config::default());
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.token_ttl_days, 30);
        assert!(config.cors_allow_any_origin);
    }

    #[test]
    fn invalid_json_falls_back_to_default() {
        let config = Config::from_raw("{invalid json");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn aliases_and_normalization_are_applied() {
        let raw = r#"{
            "host": "  ",
            "port": 8080,
            "jwtSecret": "   ",
            "frontendDir": "dist",
            "tokenTtlDays": -3
        }"#;

        let config = Config::from_raw(raw);

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_secret, None);
        assert_eq!(config.frontend_dir(), Some(PathBuf::from("dist")));
        assert_eq!(config.token_ttl_days, DEFAULT_TOKEN_TTL_DAYS);
    }

    #[test]
    fn env_overrides_take_precedence_over_file_values() {
        let file = Config::from_raw(r#"{ "port": 8080, "databaseUrl": "sqlite::memory:" }"#);
        let config = file
            .with_env_overrides(lookup_from(&[
                ("PORT", "9000"),
                ("BACKEND_PORT", "7000"),
                ("JWT_SECRET", "s3cret"),
                ("JWT_TTL_DAYS", "7"),
            ]))
            .unwrap();

        assert_eq!(config.port, 7000);
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.database_url().unwrap(), "sqlite::memory:");
    }

    #[test]
    fn port_override_ignores_ansi_escapes() {
        let config = Config::default()
            .with_env_overrides(lookup_from(&[("PORT", "\u{1b}[32m8123\u{1b}[0m")]))
            .unwrap();
        assert_eq!(config.port, 8123);
    }

    #[test]
    fn invalid_port_override_is_rejected() {
        let err = Config::default()
            .with_env_overrides(lookup_from(&[("PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(msg) if msg.contains("http")));
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let config = Config {
            jwt_secret: Some("s3cret".to_string()),
            ..Config::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}

use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::connection::PoolSettings;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_FILE: &str = "checklist.toml";
pub const ENV_PREFIX: &str = "CHECKLIST_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
    pub photo_root: PathBuf,
    pub photo_namespace: String,
    pub photo_public_base_url: String,
    /// Refuse completion until every required question has an in-bounds answer.
    pub strict_completion: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://checklist.db".to_string(),
            max_connections: 4,
            busy_timeout_secs: 5,
            photo_root: PathBuf::from("uploads"),
            photo_namespace: "checklist-photos".to_string(),
            photo_public_base_url: "http://localhost:8080/uploads/".to_string(),
            strict_completion: false,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then `checklist.toml`, then `CHECKLIST_*` environment variables
    /// (a `.env` file is loaded into the environment first).
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(AppError::ConfigError("database_url is required".to_string()));
        }
        if self.max_connections == 0 {
            return Err(AppError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.photo_namespace.trim().is_empty() {
            return Err(AppError::ConfigError("photo_namespace is required".to_string()));
        }
        url::Url::parse(&self.photo_public_base_url).map_err(|e| {
            AppError::ConfigError(format!(
                "photo_public_base_url {} is not an absolute URL: {e}",
                self.photo_public_base_url
            ))
        })?;
        Ok(())
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            busy_timeout: Duration::from_secs(self.busy_timeout_secs),
            ..PoolSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::from_figment(base()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.pool_settings().max_connections, 4);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = base().merge(Toml::string(
            r#"
            database_url = "sqlite://inspections.db"
            strict_completion = true
            photo_namespace = "evidence"
            "#,
        ));
        let settings = Settings::from_figment(figment).unwrap();
        assert_eq!(settings.database_url, "sqlite://inspections.db");
        assert!(settings.strict_completion);
        assert_eq!(settings.photo_namespace, "evidence");
        assert_eq!(settings.busy_timeout_secs, 5);
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let zero_pool = base().merge(Serialized::default("max_connections", 0));
        assert!(matches!(
            Settings::from_figment(zero_pool),
            Err(AppError::ConfigError(_))
        ));

        let relative_url = base().merge(Serialized::default("photo_public_base_url", "/uploads/"));
        assert!(matches!(
            Settings::from_figment(relative_url),
            Err(AppError::ConfigError(_))
        ));
    }
}

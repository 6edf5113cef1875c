use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub list: ListConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    pub default_page_size: u32,
    pub max_page_size: Option<u32>,
    /// Reject unparseable filter values instead of dropping them
    pub strict_values: bool,
    pub debug_logging: bool,
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
        if let Ok(v) = env::var("LIST_DEFAULT_PAGE_SIZE") {
            self.list.default_page_size = v.parse().unwrap_or(self.list.default_page_size);
        }
        if let Ok(v) = env::var("LIST_MAX_PAGE_SIZE") {
            self.list.max_page_size = v.parse().ok();
        }
        if let Ok(v) = env::var("LIST_STRICT_VALUES") {
            self.list.strict_values = v.parse().unwrap_or(self.list.strict_values);
        }
        if let Ok(v) = env::var("LIST_DEBUG_LOGGING") {
            self.list.debug_logging = v.parse().unwrap_or(self.list.debug_logging);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            list: ListConfig {
                default_page_size: 20,
                max_page_size: None,
                strict_values: true,
                debug_logging: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            list: ListConfig {
                default_page_size: 20,
                max_page_size: Some(1000),
                strict_values: true,
                debug_logging: false,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            list: ListConfig {
                default_page_size: 20,
                max_page_size: Some(500),
                strict_values: false,
                debug_logging: false,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

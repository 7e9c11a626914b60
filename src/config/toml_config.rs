use crate::domain::ports::BackendSettings;
use crate::utils::error::{Result, WaqtiError};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_PROFILE_TABLE: &str = "users";
pub const DEFAULT_SESSION_PATH: &str = "./.waqti";

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout_seconds: Option<u64>,
    pub profile_table: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub storage_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON 檔案；未設定時使用內建目錄
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(WaqtiError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| WaqtiError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 沒有設定檔時，從環境變數組出配置
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("WAQTI_BACKEND_URL").map_err(|_| WaqtiError::MissingConfigError {
            field: "WAQTI_BACKEND_URL".to_string(),
        })?;
        let anon_key = std::env::var("WAQTI_ANON_KEY").map_err(|_| WaqtiError::MissingConfigError {
            field: "WAQTI_ANON_KEY".to_string(),
        })?;

        Ok(Self {
            backend: BackendConfig {
                url,
                anon_key,
                timeout_seconds: std::env::var("WAQTI_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok()),
                profile_table: std::env::var("WAQTI_PROFILE_TABLE").ok(),
            },
            session: SessionConfig {
                storage_path: std::env::var("WAQTI_SESSION_PATH").ok(),
            },
            catalog: CatalogConfig {
                path: std::env::var("WAQTI_CATALOG_PATH").ok(),
            },
            logging: LoggingConfig::default(),
        })
    }

    /// 替換環境變數 (例如 ${SUPABASE_ANON_KEY})；未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn session_path(&self) -> &str {
        self.session
            .storage_path
            .as_deref()
            .unwrap_or(DEFAULT_SESSION_PATH)
    }

    pub fn catalog_path(&self) -> Option<&str> {
        self.catalog.path.as_deref()
    }

    pub fn json_logs(&self) -> bool {
        self.logging.json.unwrap_or(false)
    }
}

impl BackendSettings for AppConfig {
    fn backend_url(&self) -> &str {
        self.backend.url.trim_end_matches('/')
    }

    fn anon_key(&self) -> &str {
        &self.backend.anon_key
    }

    fn profile_table(&self) -> &str {
        self.backend
            .profile_table
            .as_deref()
            .unwrap_or(DEFAULT_PROFILE_TABLE)
    }

    fn timeout_seconds(&self) -> u64 {
        self.backend.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        use crate::utils::validation::*;

        validate_url("backend.url", &self.backend.url)?;

        // 變數沒被替換代表環境變數缺少
        if self.backend.anon_key.starts_with("${") {
            return Err(WaqtiError::MissingConfigError {
                field: self.backend.anon_key.clone(),
            });
        }
        validate_non_empty_string("backend.anon_key", &self.backend.anon_key)?;

        if let Some(table) = &self.backend.profile_table {
            validate_non_empty_string("backend.profile_table", table)?;
        }

        validate_range("backend.timeout_seconds", self.timeout_seconds(), 1, 300)?;
        validate_path("session.storage_path", self.session_path())?;

        if let Some(path) = self.catalog_path() {
            validate_path("catalog.path", path)?;
        }

        if let Some(level) = &self.logging.level {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level.as_str()) {
                return Err(WaqtiError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.clone(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }

        Ok(())
    }
}

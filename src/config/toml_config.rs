use crate::core::{ConfigProvider, DEFAULT_CART_KEY};
use crate::utils::error::{CartError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub dir: String,
    #[serde(default = "default_storage_key")]
    pub key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub json: bool,
}

fn default_storage_key() -> String {
    DEFAULT_CART_KEY.to_string()
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CartError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::from_toml_str_with(content, |name| std::env::var(name).ok())
    }

    /// 同上，但變數值由 `lookup` 提供
    pub fn from_toml_str_with<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let processed_content = substitute_vars(content, lookup)?;

        toml::from_str(&processed_content).map_err(|e| CartError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn verbose(&self) -> bool {
        self.logging.as_ref().map(|l| l.verbose).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().map(|l| l.json).unwrap_or(false)
    }
}

/// 替換 `${NAME}` (例如 ${STORE_API}); 找不到的變數保持原樣
fn substitute_vars<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CartError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.api.endpoint
    }

    fn storage_dir(&self) -> &str {
        &self.storage.dir
    }

    fn storage_key(&self) -> &str {
        &self.storage.key
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.api.timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.endpoint", &self.api.endpoint)?;
        validate_path("storage.dir", &self.storage.dir)?;
        validate_non_empty_string("storage.key", &self.storage.key)?;
        if let Some(timeout) = self.api.timeout_seconds {
            validate_range("api.timeout_seconds", timeout, 1, 300)?;
        }
        Ok(())
    }
}

use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::{env, fmt, fs, io, path::Path};

use crate::param::{DEFAULT_CACHE_CAPACITY, DEFAULT_PROVIDER, ENVIRONMENT_VAR};

/// 运行环境，决定 500 响应中是否携带内部错误详情
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "test" => Some(Environment::Test),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    /// 从 `ROUTEKIT_ENV` 读取，未设置或无法识别时返回 `None`
    pub fn from_env() -> Option<Self> {
        let value = env::var(ENVIRONMENT_VAR).ok()?;
        let parsed = Self::parse(&value);
        if parsed.is_none() {
            warn!("无法识别的运行环境{}={}，忽略", ENVIRONMENT_VAR, value);
        }
        parsed
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default)]
    environment: Environment,
    #[serde(default = "default_provider")]
    provider: String,
    #[serde(default = "default_match_cache_enabled")]
    match_cache_enabled: bool,
    #[serde(default = "default_match_cache_capacity")]
    match_cache_capacity: usize,
    #[serde(default)]
    worker_threads: usize,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_match_cache_enabled() -> bool {
    true
}

fn default_match_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Config {
    pub fn new() -> Self {
        Self {
            environment: Environment::default(),
            provider: default_provider(),
            match_cache_enabled: default_match_cache_enabled(),
            match_cache_capacity: default_match_cache_capacity(),
            worker_threads: 0,
        }
        .normalized()
    }

    /// 读取 TOML 配置文件。文件无法读取时返回错误，内容无法解析时记录错误并使用默认配置。
    pub fn from_toml(filename: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(filename.as_ref()).map_err(ConfigError::Io)?;
        Ok(Self::from_toml_str(&content))
    }

    pub fn from_toml_str(content: &str) -> Self {
        let raw_config: Config = match toml::from_str(content) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        raw_config.normalized()
    }

    /// 若设置了 `ROUTEKIT_ENV`，用它覆盖配置文件中的运行环境
    pub fn with_env_override(mut self) -> Self {
        if let Some(environment) = Environment::from_env() {
            self.environment = environment;
        }
        self
    }

    fn normalized(mut self) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.match_cache_capacity == 0 {
            warn!(
                "match_cache_capacity被设置为0，如需禁用缓存请使用match_cache_enabled，该值将被改为{}。",
                DEFAULT_CACHE_CAPACITY
            );
            self.match_cache_capacity = DEFAULT_CACHE_CAPACITY;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn match_cache_enabled(&self) -> bool {
        self.match_cache_enabled
    }

    pub fn match_cache_capacity(&self) -> usize {
        self.match_cache_capacity
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.environment(), Environment::Development);
        assert_eq!(config.provider(), "local");
        assert!(config.match_cache_enabled());
        assert_eq!(config.match_cache_capacity(), 1000);
        assert!(config.worker_threads() > 0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str("environment = \"production\"\nprovider = \"lambda\"\n");
        assert_eq!(config.environment(), Environment::Production);
        assert_eq!(config.provider(), "lambda");
        assert!(config.match_cache_enabled());
        assert_eq!(config.match_cache_capacity(), 1000);
    }

    #[test]
    fn test_zero_capacity_is_reset() {
        let config = Config::from_toml_str("match_cache_capacity = 0\nworker_threads = 3\n");
        assert_eq!(config.match_cache_capacity(), 1000);
        assert_eq!(config.worker_threads(), 3);
    }

    #[test]
    fn test_invalid_toml_falls_back() {
        let config = Config::from_toml_str("environment = [not toml");
        assert_eq!(config.environment(), Environment::Development);
    }

    #[test]
    fn test_unknown_environment_falls_back() {
        let config = Config::from_toml_str("environment = \"staging\"\n");
        assert_eq!(config.environment(), Environment::Development);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "environment = \"test\"").unwrap();
        writeln!(file, "match_cache_enabled = false").unwrap();
        writeln!(file, "match_cache_capacity = 64").unwrap();

        let config = Config::from_toml(file.path()).unwrap();
        assert_eq!(config.environment(), Environment::Test);
        assert!(!config.match_cache_enabled());
        assert_eq!(config.match_cache_capacity(), 64);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_toml(dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("PROD"), Some(Environment::Production));
        assert_eq!(Environment::parse("dev"), Some(Environment::Development));
        assert_eq!(Environment::parse(" test "), Some(Environment::Test));
        assert_eq!(Environment::parse("staging"), None);
        assert!(Environment::Production.is_production());
        assert!(!Environment::Test.is_production());
        assert_eq!(Environment::Production.to_string(), "production");
    }
}

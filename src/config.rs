use crate::chains::{Chain, CHAIN_SPECS};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub explorer: ExplorerConfig,
    pub prices: PriceConfig,
    pub telegram: TelegramConfig,
    pub poll: PollConfig,
    pub logging: LoggingConfig,
}

/// Explorer API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// API key per chain slug (eth, bsc, polygon, avalanche, fantom, arbitrum)
    pub api_keys: HashMap<String, String>,
    /// Optional API base URL override per chain slug; defaults come from
    /// the static chain table
    pub base_urls: HashMap<String, String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Price feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    /// Price API base URL
    pub api_base: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Messaging transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token
    pub bot_token: String,
    /// Bot API base URL
    pub api_base: String,
    /// Suppress link previews in notifications
    pub disable_link_preview: bool,
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Wall-clock interval between poll cycles in seconds
    pub interval_seconds: u64,
    /// Delivery attempt cap per notification
    pub max_send_attempts: u32,
    /// Cooldown when the transport rate-limits without a retry-after value
    pub rate_limit_cooldown_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            explorer: ExplorerConfig::default(),
            prices: PriceConfig::default(),
            telegram: TelegramConfig::default(),
            poll: PollConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            base_urls: HashMap::new(),
            timeout_seconds: 30,
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.coingecko.com/api/v3".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            disable_link_preview: true,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 10,
            max_send_attempts: 3,
            rate_limit_cooldown_seconds: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables.
    /// Environment variables take precedence over file values.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file().unwrap_or_default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        let config: AppConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Transport configuration. TELEGRAM_API is the token variable the
        // deployment environment already carries.
        if let Ok(token) = env::var("TELEGRAM_API") {
            self.telegram.bot_token = token;
        }
        if let Ok(base) = env::var("TELEGRAM_API_BASE") {
            self.telegram.api_base = base;
        }

        // Per-chain explorer API keys
        for spec in &CHAIN_SPECS {
            if let Ok(key) = env::var(spec.api_key_env) {
                self.explorer.api_keys.insert(spec.slug.to_string(), key);
            }
        }

        // Price feed
        if let Ok(base) = env::var("PRICE_API_BASE") {
            self.prices.api_base = base;
        }

        // Poll loop
        if let Ok(interval) = env::var("POLL_INTERVAL_SECONDS") {
            self.poll.interval_seconds =
                interval.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "POLL_INTERVAL_SECONDS".to_string(),
                    value: interval,
                })?;
        }
        if let Ok(attempts) = env::var("MAX_SEND_ATTEMPTS") {
            self.poll.max_send_attempts =
                attempts.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "MAX_SEND_ATTEMPTS".to_string(),
                    value: attempts,
                })?;
        }

        // Logging
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Without a token every delivery would be rejected at
        // /bot/sendMessage; refuse to start instead.
        if self.telegram.bot_token.is_empty() {
            return Err(ConfigError::MissingEnvVar("TELEGRAM_API".to_string()));
        }

        if !self.prices.api_base.starts_with("http://")
            && !self.prices.api_base.starts_with("https://")
        {
            return Err(ConfigError::InvalidUrl(self.prices.api_base.clone()));
        }

        if !self.telegram.api_base.starts_with("http://")
            && !self.telegram.api_base.starts_with("https://")
        {
            return Err(ConfigError::InvalidUrl(self.telegram.api_base.clone()));
        }

        for (slug, url) in &self.explorer.base_urls {
            if Chain::from_slug(slug).is_none() {
                return Err(ConfigError::InvalidValue {
                    key: "explorer.base_urls".to_string(),
                    value: slug.clone(),
                });
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }

        for slug in self.explorer.api_keys.keys() {
            if Chain::from_slug(slug).is_none() {
                return Err(ConfigError::InvalidValue {
                    key: "explorer.api_keys".to_string(),
                    value: slug.clone(),
                });
            }
        }

        if self.poll.interval_seconds == 0 || self.poll.interval_seconds > 3600 {
            return Err(ConfigError::InvalidValue {
                key: "poll.interval_seconds".to_string(),
                value: self.poll.interval_seconds.to_string(),
            });
        }

        if self.poll.max_send_attempts == 0 || self.poll.max_send_attempts > 10 {
            return Err(ConfigError::InvalidValue {
                key: "poll.max_send_attempts".to_string(),
                value: self.poll.max_send_attempts.to_string(),
            });
        }

        if self.explorer.timeout_seconds == 0 || self.explorer.timeout_seconds > 300 {
            return Err(ConfigError::InvalidValue {
                key: "explorer.timeout_seconds".to_string(),
                value: self.explorer.timeout_seconds.to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        let mut config = Self::default();
        for spec in &CHAIN_SPECS {
            config
                .explorer
                .api_keys
                .insert(spec.slug.to_string(), "YOUR_API_KEY".to_string());
        }
        toml::to_string_pretty(&config).map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.poll.interval_seconds, 10);
        assert_eq!(config.poll.max_send_attempts, 3);
        assert_eq!(config.poll.rate_limit_cooldown_seconds, 60);
        assert_eq!(config.prices.api_base, "https://api.coingecko.com/api/v3");
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert!(config.telegram.disable_link_preview);
        assert_eq!(config.logging.level, "info");
    }

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.telegram.bot_token = "42:token".to_string();
        config
    }

    #[test]
    fn test_config_validation() {
        let mut config = configured();
        assert!(config.validate().is_ok());

        config.prices.api_base = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config = configured();
        config.poll.interval_seconds = 0;
        assert!(config.validate().is_err());

        config = configured();
        config.poll.max_send_attempts = 0;
        assert!(config.validate().is_err());

        config = configured();
        config
            .explorer
            .api_keys
            .insert("solana".to_string(), "key".to_string());
        assert!(config.validate().is_err());

        config = configured();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_bot_token_fails_validation() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvVar(_))
        ));

        let mut config = configured();
        config.telegram.bot_token = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("TELEGRAM_API", "123:abc");
        env::set_var("API_ETHERSCAN", "eth-key");
        env::set_var("POLL_INTERVAL_SECONDS", "30");

        let mut config = AppConfig::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.explorer.api_keys.get("eth").unwrap(), "eth-key");
        assert_eq!(config.poll.interval_seconds, 30);

        env::remove_var("TELEGRAM_API");
        env::remove_var("API_ETHERSCAN");
        env::remove_var("POLL_INTERVAL_SECONDS");
    }

    #[test]
    fn test_invalid_env_values() {
        env::set_var("MAX_SEND_ATTEMPTS", "lots");

        let mut config = AppConfig::default();
        let result = config.apply_env_overrides();

        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));

        env::remove_var("MAX_SEND_ATTEMPTS");
    }

    #[test]
    fn test_config_file_loading() {
        let config_content = r#"
[explorer]
timeout_seconds = 15

[explorer.api_keys]
eth = "etherscan-key"
bsc = "bscscan-key"

[explorer.base_urls]
eth = "http://127.0.0.1:9999/api"

[prices]
api_base = "http://127.0.0.1:9998"
timeout_seconds = 5

[telegram]
bot_token = "42:token"
api_base = "http://127.0.0.1:9997"
disable_link_preview = false

[poll]
interval_seconds = 3
max_send_attempts = 2
rate_limit_cooldown_seconds = 30

[logging]
level = "debug"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut temp_file, config_content.as_bytes()).unwrap();

        env::set_var("CONFIG_FILE", temp_file.path().to_str().unwrap());

        let config = AppConfig::load_from_file().unwrap();

        assert_eq!(config.explorer.timeout_seconds, 15);
        assert_eq!(config.explorer.api_keys.get("eth").unwrap(), "etherscan-key");
        assert_eq!(
            config.explorer.base_urls.get("eth").unwrap(),
            "http://127.0.0.1:9999/api"
        );
        assert_eq!(config.prices.api_base, "http://127.0.0.1:9998");
        assert_eq!(config.telegram.bot_token, "42:token");
        assert!(!config.telegram.disable_link_preview);
        assert_eq!(config.poll.interval_seconds, 3);
        assert_eq!(config.poll.max_send_attempts, 2);
        assert_eq!(config.logging.level, "debug");

        env::remove_var("CONFIG_FILE");
    }

    #[test]
    fn test_generate_sample_config() {
        let sample = AppConfig::generate_sample_config().unwrap();
        assert!(sample.contains("[explorer"));
        assert!(sample.contains("[prices]"));
        assert!(sample.contains("[telegram]"));
        assert!(sample.contains("[poll]"));
        assert!(sample.contains("[logging]"));
        assert!(sample.contains("eth"));
    }

    #[test]
    fn test_config_roundtrip() {
        let original = AppConfig::default();
        let toml_string = toml::to_string_pretty(&original).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_string).unwrap();

        assert_eq!(original.poll.interval_seconds, parsed.poll.interval_seconds);
        assert_eq!(original.prices.api_base, parsed.prices.api_base);
        assert_eq!(original.telegram.api_base, parsed.telegram.api_base);
    }
}

use crate::chains::Chain;
use thiserror::Error;

/// Main error type for the chainwatch engine
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("price error: {0}")]
    Price(#[from] PriceError),

    #[error("delivery error: {0}")]
    Delivery(#[from] TransportError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// One chain/address explorer lookup failed. Never fatal: the aggregator
/// logs it and treats the lookup as having returned zero transactions.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("explorer for {chain} returned HTTP {status}")]
    Status { chain: Chain, status: u16 },

    #[error("malformed explorer payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("no endpoint configured for chain {0}")]
    UnknownEndpoint(Chain),
}

/// Price lookup failure. Degrades formatting (USD amounts omitted),
/// never aborts a cycle.
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("price service returned HTTP {0}")]
    Status(u16),

    #[error("malformed price payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Messaging transport failures, as surfaced by one send attempt.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Recoverable: the transport asked us to back off. `retry_after` is
    /// the server-specified cooldown in seconds, when it gave one.
    #[error("rate limited by transport (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("transport rejected message: {0}")]
    Rejected(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Watch-list registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("nickname cannot be empty")]
    EmptyNickname,

    #[error("nickname already in use: {0}")]
    NicknameTaken(String),

    #[error("address already watched: {0}")]
    AddressTaken(String),

    #[error("no watched address with nickname: {0}")]
    UnknownNickname(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("configuration parsing failed: {0}")]
    Parsing(String),

    #[error("invalid URL format: {0}")]
    InvalidUrl(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, WatchError>;

impl WatchError {
    /// Check if the error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            WatchError::Delivery(TransportError::RateLimited { .. }) => true,
            WatchError::Fetch(FetchError::Http(_)) => true,
            WatchError::Fetch(FetchError::Status { .. }) => true,
            WatchError::Price(PriceError::Http(_)) => true,
            WatchError::Registry(RegistryError::Unavailable(_)) => true,

            WatchError::Config(_) => false,
            WatchError::Delivery(_) => false,
            _ => false,
        }
    }

    /// Suggested retry delay in seconds for recoverable errors
    pub fn retry_delay(&self) -> Option<u64> {
        if !self.is_recoverable() {
            return None;
        }

        match self {
            WatchError::Delivery(TransportError::RateLimited { retry_after }) => {
                Some(retry_after.unwrap_or(60))
            }
            _ => Some(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_recoverable() {
        let err = WatchError::Delivery(TransportError::RateLimited {
            retry_after: Some(30),
        });
        assert!(err.is_recoverable());
        assert_eq!(err.retry_delay(), Some(30));
    }

    #[test]
    fn test_rate_limit_default_cooldown() {
        let err = WatchError::Delivery(TransportError::RateLimited { retry_after: None });
        assert_eq!(err.retry_delay(), Some(60));
    }

    #[test]
    fn test_rejection_is_not_recoverable() {
        let err = WatchError::Delivery(TransportError::Rejected("bad chat id".to_string()));
        assert!(!err.is_recoverable());
        assert_eq!(err.retry_delay(), None);
    }

    #[test]
    fn test_config_error_not_recoverable() {
        let err = WatchError::Config(ConfigError::MissingEnvVar("TELEGRAM_API".to_string()));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = WatchError::Fetch(FetchError::Status {
            chain: Chain::Polygon,
            status: 502,
        });
        assert_eq!(
            format!("{}", err),
            "fetch error: explorer for Polygon returned HTTP 502"
        );
    }
}

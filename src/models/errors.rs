//! Centralized Error Handling Module
//!
//! Every failure carries a unique code so log lines can be grepped and
//! alerted on per category.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - RPC_xxx: node access errors
//! - CHAIN_xxx: block / chain identity errors
//! - CONTRACT_xxx: contract read errors
//! - SCORER_xxx: external risk scorer errors
//! - STORE_xxx: persistence errors
//! - CFG_xxx: configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Whether the failed operation may succeed if attempted again
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // RPC Errors
    // ============================================
    /// Websocket / node connection failed
    RpcConnectionFailed,
    /// RPC request timeout
    RpcTimeout,
    /// RPC returned error response
    RpcError,
    /// Block subscription could not be opened
    RpcSubscriptionFailed,

    // ============================================
    // Chain Errors
    // ============================================
    /// Block or its transaction list is unavailable
    BlockUnavailable,
    /// Node reports a different chain than configured
    ChainIdMismatch,

    // ============================================
    // Contract Errors
    // ============================================
    /// eth_call failed or reverted
    ContractCallFailed,
    /// Return data could not be decoded
    ContractDecodeFailed,

    // ============================================
    // Risk Scorer Errors
    // ============================================
    /// Scorer process could not be started
    ScorerSpawnFailed,
    /// Scorer did not answer in time
    ScorerTimeout,
    /// Scorer exited with an error status
    ScorerExitFailure,
    /// Scorer output was not a verdict sequence
    ScorerOutputMalformed,

    // ============================================
    // Store Errors
    // ============================================
    /// Transport-level store failure
    StoreRequestFailed,
    /// Store request timeout
    StoreTimeout,
    /// Store rate limited (HTTP 429)
    StoreRateLimited,
    /// Store refused the record (constraint, auth, schema)
    StoreRejected,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Missing environment variable
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,
    /// No network configured or none survived validation
    ConfigNoNetworks,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RpcConnectionFailed => "RPC_CONNECTION_FAILED",
            Self::RpcTimeout => "RPC_TIMEOUT",
            Self::RpcError => "RPC_ERROR",
            Self::RpcSubscriptionFailed => "RPC_SUBSCRIPTION_FAILED",

            Self::BlockUnavailable => "CHAIN_BLOCK_UNAVAILABLE",
            Self::ChainIdMismatch => "CHAIN_ID_MISMATCH",

            Self::ContractCallFailed => "CONTRACT_CALL_FAILED",
            Self::ContractDecodeFailed => "CONTRACT_DECODE_FAILED",

            Self::ScorerSpawnFailed => "SCORER_SPAWN_FAILED",
            Self::ScorerTimeout => "SCORER_TIMEOUT",
            Self::ScorerExitFailure => "SCORER_EXIT_FAILURE",
            Self::ScorerOutputMalformed => "SCORER_OUTPUT_MALFORMED",

            Self::StoreRequestFailed => "STORE_REQUEST_FAILED",
            Self::StoreTimeout => "STORE_TIMEOUT",
            Self::StoreRateLimited => "STORE_RATE_LIMITED",
            Self::StoreRejected => "STORE_REJECTED",

            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigNoNetworks => "CFG_NO_NETWORKS",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RpcTimeout
                | Self::RpcConnectionFailed
                | Self::StoreRequestFailed
                | Self::StoreTimeout
                | Self::StoreRateLimited
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Node connection failed
    pub fn rpc_connection_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcConnectionFailed, msg)
    }

    /// Node returned an error
    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    /// Block or its transactions unavailable
    pub fn block_unavailable(network: &str, number: u64) -> Self {
        Self::new(
            ErrorCode::BlockUnavailable,
            format!("block {} unavailable on {}", number, network),
        )
    }

    /// Contract call failed
    pub fn call_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ContractCallFailed, msg)
    }

    /// Contract return data undecodable
    pub fn decode_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ContractDecodeFailed, msg)
    }

    /// Scorer output malformed
    pub fn scorer_output(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ScorerOutputMalformed, msg)
    }

    /// Store rejected the record
    pub fn store_rejected(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreRejected, msg)
    }

    /// Missing environment variable
    pub fn missing_env(key: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingEnv,
            format!("Missing environment variable: {}", key),
        )
    }

    /// Invalid configuration value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", key, value),
        )
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::StoreTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::StoreRequestFailed, "Connection failed")
        } else {
            Self::new(ErrorCode::StoreRequestFailed, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ScorerOutputMalformed, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::block_unavailable("ethereum", 42);
        assert_eq!(err.code, ErrorCode::BlockUnavailable);
        assert_eq!(err.code_str(), "CHAIN_BLOCK_UNAVAILABLE");
        assert!(err.to_string().contains("block 42"));
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::StoreTimeout.is_retryable());
        assert!(ErrorCode::StoreRateLimited.is_retryable());
        assert!(!ErrorCode::StoreRejected.is_retryable());
        assert!(!ErrorCode::ScorerOutputMalformed.is_retryable());
    }

    #[test]
    fn test_json_error_maps_to_scorer_output() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::ScorerOutputMalformed);
        assert!(std::error::Error::source(&err).is_some());
    }
}

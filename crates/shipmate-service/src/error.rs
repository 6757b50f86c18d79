//! # Service Error Types
//!
//! Error types for the shipping service layer.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Service Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Upstream     │  │     Calculation         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Http           │  │  Shipping (core)        │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  Data (files)           │ │
//! │  │  ConfigLoad/Save│  │  UpstreamStatus │  │                         │ │
//! │  │                 │  │  InvalidPayload │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Upstream errors never reach callers of the quote API: the exchange    │
//! │  provider and the postal resolver absorb them and degrade.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use shipmate_core::{ErrorKind, ShippingError};
use shipmate_data::DataError;
use thiserror::Error;

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error type.
#[derive(Debug, Error)]
pub enum ServiceError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid service configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid upstream URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Upstream Errors
    // =========================================================================
    /// Request could not be sent or the body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Upstream did not answer in time.
    #[error("Upstream timeout: {0}")]
    Timeout(String),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// Upstream answered but the payload is unusable.
    #[error("Invalid upstream payload: {0}")]
    InvalidPayload(String),

    // =========================================================================
    // Calculation Errors
    // =========================================================================
    /// Data file could not be loaded.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Shipping calculation failed.
    #[error(transparent)]
    Shipping(#[from] ShippingError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            ServiceError::UpstreamStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            ServiceError::Http(err.to_string())
        }
    }
}

impl From<url::ParseError> for ServiceError {
    fn from(err: url::ParseError) -> Self {
        ServiceError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::InvalidPayload(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ServiceError {
    fn from(err: toml::de::Error) -> Self {
        ServiceError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ServiceError {
    fn from(err: toml::ser::Error) -> Self {
        ServiceError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl ServiceError {
    /// Returns true if the upstream call can be retried.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts
    /// - 5xx and 429 responses
    ///
    /// ## Non-Retryable Errors
    /// - Other 4xx responses
    /// - Unusable payloads (retrying returns the same body)
    /// - Configuration, data and calculation errors
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Http(_) | ServiceError::Timeout(_) => true,
            ServiceError::UpstreamStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidConfig(_)
                | ServiceError::InvalidUrl(_)
                | ServiceError::ConfigLoadFailed(_)
                | ServiceError::ConfigSaveFailed(_)
        )
    }

    /// Routing kind, as reported next to the message in quote responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Shipping(err) => err.kind(),
            ServiceError::Http(_)
            | ServiceError::Timeout(_)
            | ServiceError::UpstreamStatus { .. }
            | ServiceError::InvalidPayload(_) => ErrorKind::UpstreamDegraded,
            ServiceError::InvalidConfig(_)
            | ServiceError::InvalidUrl(_)
            | ServiceError::ConfigLoadFailed(_)
            | ServiceError::ConfigSaveFailed(_)
            | ServiceError::Data(_) => ErrorKind::ConfigurationGap,
        }
    }
}

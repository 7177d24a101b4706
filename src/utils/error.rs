use crate::domain::model::ProductId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Unexpected API response: {message}")]
    UnexpectedResponse { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Requested amount {requested} of product {product_id} exceeds stock of {available}")]
    StockExceeded {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    #[error("Product {product_id} is not in the cart")]
    NotInCart { product_id: ProductId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 預期中的業務條件 (庫存不足、商品不在購物車)
    Business,
    Transport,
    Storage,
    Configuration,
}

impl CartError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CartError::StockExceeded { .. } | CartError::NotInCart { .. } => {
                ErrorCategory::Business
            }
            CartError::ApiError(_)
            | CartError::UpstreamStatus { .. }
            | CartError::UnexpectedResponse { .. } => ErrorCategory::Transport,
            CartError::IoError(_) | CartError::SerializationError(_) => ErrorCategory::Storage,
            CartError::UrlError(_)
            | CartError::ConfigError { .. }
            | CartError::InvalidConfigValueError { .. }
            | CartError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn is_stock_exceeded(&self) -> bool {
        matches!(self, CartError::StockExceeded { .. })
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Business => self.to_string(),
            ErrorCategory::Transport => format!("Could not reach the store API: {}", self),
            ErrorCategory::Storage => format!("Could not read or write the saved cart: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CartError::StockExceeded { .. } => "Choose a smaller amount",
            CartError::NotInCart { .. } => "Add the product to the cart first",
            CartError::ApiError(_)
            | CartError::UpstreamStatus { .. }
            | CartError::UnexpectedResponse { .. } => {
                "Check that --api-endpoint points to a running store API"
            }
            CartError::SerializationError(_) => {
                "The saved cart is corrupted; delete the storage file to start over"
            }
            CartError::IoError(_) => "Check permissions of --storage-dir",
            CartError::UrlError(_)
            | CartError::ConfigError { .. }
            | CartError::InvalidConfigValueError { .. }
            | CartError::MissingConfigError { .. } => "Review the command line flags or config file",
        }
    }
}

pub type Result<T> = std::result::Result<T, CartError>;

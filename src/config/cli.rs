use crate::core::{ConfigProvider, ProductId, DEFAULT_CART_KEY};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, Validate,
};
use clap::{Parser, Subcommand};
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "rocket-cart")]
#[command(about = "Shopping cart for the RocketShoes storefront")]
pub struct CliConfig {
    #[arg(long, default_value = "http://localhost:3333")]
    pub api_endpoint: String,

    #[arg(long, default_value = "./.rocket-cart")]
    pub storage_dir: String,

    #[arg(long, default_value = DEFAULT_CART_KEY)]
    pub storage_key: String,

    #[arg(long, help = "Per-request timeout for the store API (no timeout when unset)")]
    pub timeout_seconds: Option<u64>,

    #[arg(long, short, help = "Load settings from a TOML file instead of flags")]
    pub config: Option<String>,

    #[arg(long, short, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: CartCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum CartCommand {
    /// Print the saved cart
    Show,
    /// Add one unit of a product
    Add { product_id: u64 },
    /// Remove a product from the cart
    Remove { product_id: u64 },
    /// Set the amount of a product already in the cart
    Update {
        product_id: u64,
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
}

impl CartCommand {
    pub fn product_id(&self) -> Option<ProductId> {
        match *self {
            CartCommand::Show => None,
            CartCommand::Add { product_id }
            | CartCommand::Remove { product_id }
            | CartCommand::Update { product_id, .. } => Some(ProductId(product_id)),
        }
    }
}

impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn storage_dir(&self) -> &str {
        &self.storage_dir
    }

    fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api_endpoint", &self.api_endpoint)?;
        validate_path("storage_dir", &self.storage_dir)?;
        validate_non_empty_string("storage_key", &self.storage_key)?;
        if let Some(timeout) = self.timeout_seconds {
            validate_range("timeout_seconds", timeout, 1, 300)?;
        }
        Ok(())
    }
}

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CartCommand, CliConfig};
pub use config::TomlConfig;

pub use adapters::{
    http::HttpCatalog,
    notify::{RecordingNotifier, TracingNotifier},
    storage::{LocalStorage, MemoryStorage},
};
pub use core::cart_store::CartStore;
pub use domain::model::{Cart, LineItem, Product, ProductId, Stock, UpdateProductAmount};
pub use domain::notice::Notice;
pub use utils::error::{CartError, Result};

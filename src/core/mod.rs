pub mod cart_store;

pub use crate::domain::model::{
    Cart, LineItem, Product, ProductId, Stock, UpdateProductAmount, DEFAULT_CART_KEY,
};
pub use crate::domain::notice::Notice;
pub use crate::domain::ports::{CartStorage, Catalog, ConfigProvider, Notifier};
pub use crate::utils::error::Result;

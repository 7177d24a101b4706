use crate::domain::model::{Product, ProductId, Stock};
use crate::domain::notice::Notice;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Named text slots that outlive the process (the browser's local storage).
pub trait CartStorage: Send + Sync {
    fn read_slot(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
    fn write_slot(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Remote inventory and product services.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn stock(&self, product_id: ProductId) -> Result<Stock>;
    async fn product(&self, product_id: ProductId) -> Result<Product>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn storage_dir(&self) -> &str;
    fn storage_key(&self) -> &str;
    fn request_timeout(&self) -> Option<Duration>;
}

use crate::core::{Catalog, ConfigProvider, Product, ProductId, Stock};
use crate::utils::error::{CartError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Store API client for `/stock/{id}` and `/products/{id}`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
    base_url: Url,
}

impl HttpCatalog {
    pub fn new(api_endpoint: &str) -> Result<Self> {
        Self::with_timeout(api_endpoint, None)
    }

    pub fn with_timeout(api_endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base_url = Url::parse(api_endpoint)?;

        // 確保 join 時保留 base path (例如 http://host/api/)
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::with_timeout(config.api_endpoint(), config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path)?;

        tracing::debug!("Making API request to: {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            return Err(CartError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait::async_trait]
impl Catalog for HttpCatalog {
    async fn stock(&self, product_id: ProductId) -> Result<Stock> {
        self.get_json(&format!("stock/{}", product_id)).await
    }

    async fn product(&self, product_id: ProductId) -> Result<Product> {
        self.get_json(&format!("products/{}", product_id)).await
    }
}

use crate::core::{
    Cart, CartStorage, Catalog, LineItem, Notice, Notifier, ProductId, Result,
    UpdateProductAmount, DEFAULT_CART_KEY,
};
use crate::utils::error::CartError;
use std::sync::Arc;
use tokio::sync::watch;

/// Process-wide cart state.
///
/// The three mutating operations never return an error: failures are logged,
/// turned into one [`Notice`] and leave the snapshot untouched. A new snapshot
/// is published only after it has been written to storage.
///
/// Overlapping calls are not serialized. Each operation works from the
/// snapshot it read and the last write wins.
pub struct CartStore<S: CartStorage, C: Catalog, N: Notifier> {
    storage: S,
    catalog: C,
    notifier: N,
    storage_key: String,
    snapshot: watch::Sender<Arc<Cart>>,
}

impl<S: CartStorage, C: Catalog, N: Notifier> CartStore<S, C, N> {
    pub async fn load(storage: S, catalog: C, notifier: N) -> Result<Self> {
        Self::load_with_key(storage, catalog, notifier, DEFAULT_CART_KEY).await
    }

    /// Reads the persisted cart from `storage_key`. An absent or blank slot
    /// yields an empty cart; an unreadable one is an error.
    pub async fn load_with_key(
        storage: S,
        catalog: C,
        notifier: N,
        storage_key: impl Into<String>,
    ) -> Result<Self> {
        let storage_key = storage_key.into();

        let cart = match storage.read_slot(&storage_key).await? {
            Some(raw) if !raw.trim().is_empty() => {
                let items: Vec<LineItem> = serde_json::from_str(&raw)?;
                Cart::from_items(items)
            }
            _ => Cart::new(),
        };

        tracing::debug!(
            "Loaded cart from '{}' with {} line items",
            storage_key,
            cart.len()
        );

        let (snapshot, _) = watch::channel(Arc::new(cart));

        Ok(Self {
            storage,
            catalog,
            notifier,
            storage_key,
            snapshot,
        })
    }

    pub fn cart(&self) -> Arc<Cart> {
        self.snapshot.borrow().clone()
    }

    /// Receiver that observes every snapshot published after this call.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Cart>> {
        self.snapshot.subscribe()
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub async fn add_product(&self, product_id: ProductId) {
        if let Err(e) = self.try_add_product(product_id).await {
            self.report(Notice::AddFailed, product_id, &e);
        }
    }

    pub async fn remove_product(&self, product_id: ProductId) {
        if let Err(e) = self.try_remove_product(product_id).await {
            self.report(Notice::RemoveFailed, product_id, &e);
        }
    }

    pub async fn update_product_amount(&self, request: UpdateProductAmount) {
        if request.amount <= 0 {
            tracing::debug!(
                "Ignoring amount {} for product {}",
                request.amount,
                request.product_id
            );
            return;
        }

        if let Err(e) = self.try_update_product_amount(request).await {
            self.report(Notice::UpdateFailed, request.product_id, &e);
        }
    }

    async fn try_add_product(&self, product_id: ProductId) -> Result<()> {
        let current = self.cart();
        let existing = current.find(product_id);

        tracing::debug!("Fetching stock for product {}", product_id);
        let stock = self.catalog.stock(product_id).await?;

        let desired = existing.map_or(0, |item| i64::from(item.amount)) + 1;
        if !stock.allows(desired) {
            return Err(CartError::StockExceeded {
                product_id,
                requested: desired,
                available: stock.amount,
            });
        }

        let next = match existing {
            Some(_) => current
                .with_amount(product_id, to_amount(product_id, desired, stock.amount)?)
                .ok_or(CartError::NotInCart { product_id })?,
            None => {
                tracing::debug!("Fetching details for product {}", product_id);
                let product = self.catalog.product(product_id).await?;
                if product.id != product_id {
                    return Err(CartError::UnexpectedResponse {
                        message: format!(
                            "asked for product {} but received product {}",
                            product_id, product.id
                        ),
                    });
                }
                current
                    .with_item(LineItem::new(product))
                    .ok_or_else(|| CartError::UnexpectedResponse {
                        message: format!("product {} is already in the cart", product_id),
                    })?
            }
        };

        self.commit(next).await
    }

    async fn try_remove_product(&self, product_id: ProductId) -> Result<()> {
        let next = self
            .cart()
            .without(product_id)
            .ok_or(CartError::NotInCart { product_id })?;

        self.commit(next).await
    }

    async fn try_update_product_amount(&self, request: UpdateProductAmount) -> Result<()> {
        let UpdateProductAmount { product_id, amount } = request;

        tracing::debug!("Fetching stock for product {}", product_id);
        let stock = self.catalog.stock(product_id).await?;

        if !stock.allows(amount) {
            return Err(CartError::StockExceeded {
                product_id,
                requested: amount,
                available: stock.amount,
            });
        }

        let next = self
            .cart()
            .with_amount(product_id, to_amount(product_id, amount, stock.amount)?)
            .ok_or(CartError::NotInCart { product_id })?;

        self.commit(next).await
    }

    /// Writes `next` to storage, then publishes it.
    async fn commit(&self, next: Cart) -> Result<()> {
        let serialized = serde_json::to_string(&next)?;
        self.storage
            .write_slot(&self.storage_key, &serialized)
            .await?;

        tracing::debug!(
            "Saved cart to '{}' ({} line items, {} units)",
            self.storage_key,
            next.len(),
            next.total_units()
        );

        self.snapshot.send_replace(Arc::new(next));
        Ok(())
    }

    fn report(&self, fallback: Notice, product_id: ProductId, error: &CartError) {
        let notice = if error.is_stock_exceeded() {
            tracing::warn!("Rejected product {}: {}", product_id, error);
            Notice::StockExceeded
        } else {
            tracing::error!(
                "{} (product {}, {:?} error): {}",
                fallback.message(),
                product_id,
                error.category(),
                error
            );
            fallback
        };

        self.notifier.notify(notice);
    }
}

fn to_amount(product_id: ProductId, requested: i64, available: i64) -> Result<u32> {
    u32::try_from(requested).map_err(|_| CartError::StockExceeded {
        product_id,
        requested,
        available,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notify::RecordingNotifier;
    use crate::adapters::storage::MemoryStorage;
    use crate::core::{Product, Stock};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct StubCatalog {
        stock: Arc<HashMap<ProductId, i64>>,
        products: Arc<HashMap<ProductId, Product>>,
        stock_calls: Arc<AtomicUsize>,
        product_calls: Arc<AtomicUsize>,
    }

    impl StubCatalog {
        fn new(stock: &[(u64, i64)]) -> Self {
            let stock: HashMap<ProductId, i64> = stock
                .iter()
                .map(|&(id, amount)| (ProductId(id), amount))
                .collect();
            let products: HashMap<ProductId, Product> = stock
                .keys()
                .map(|&id| (id, product(id.0)))
                .collect();
            Self {
                stock: Arc::new(stock),
                products: Arc::new(products),
                ..Default::default()
            }
        }

        fn stock_calls(&self) -> usize {
            self.stock_calls.load(Ordering::SeqCst)
        }

        fn product_calls(&self) -> usize {
            self.product_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Catalog for StubCatalog {
        async fn stock(&self, product_id: ProductId) -> Result<Stock> {
            self.stock_calls.fetch_add(1, Ordering::SeqCst);
            self.stock
                .get(&product_id)
                .map(|&amount| Stock {
                    id: Some(product_id),
                    amount,
                })
                .ok_or_else(|| CartError::UpstreamStatus {
                    url: format!("/stock/{}", product_id),
                    status: 404,
                })
        }

        async fn product(&self, product_id: ProductId) -> Result<Product> {
            self.product_calls.fetch_add(1, Ordering::SeqCst);
            self.products
                .get(&product_id)
                .cloned()
                .ok_or_else(|| CartError::UpstreamStatus {
                    url: format!("/products/{}", product_id),
                    status: 404,
                })
        }
    }

    struct ReadOnlyStorage {
        inner: MemoryStorage,
    }

    impl CartStorage for ReadOnlyStorage {
        async fn read_slot(&self, key: &str) -> Result<Option<String>> {
            self.inner.read_slot(key).await
        }

        async fn write_slot(&self, _key: &str, _value: &str) -> Result<()> {
            Err(CartError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "storage is read-only",
            )))
        }
    }

    fn product(id: u64) -> Product {
        Product {
            id: ProductId(id),
            title: format!("Tênis VR Caminhada {}", id),
            price: 139.9,
            image: format!("https://rocketseat-cdn.s3-sa-east-1.amazonaws.com/modulo-redux/tenis{}.jpg", id),
        }
    }

    fn items(entries: &[(u64, u32)]) -> Vec<LineItem> {
        entries
            .iter()
            .map(|&(id, amount)| LineItem {
                product: product(id),
                amount,
            })
            .collect()
    }

    async fn seeded_storage(entries: &[(u64, u32)]) -> MemoryStorage {
        let storage = MemoryStorage::new();
        if !entries.is_empty() {
            let raw = serde_json::to_string(&items(entries)).unwrap();
            storage.insert(DEFAULT_CART_KEY, raw).await;
        }
        storage
    }

    fn amounts(cart: &Cart) -> Vec<(u64, u32)> {
        cart.items().iter().map(|i| (i.id().0, i.amount)).collect()
    }

    async fn store_with(
        entries: &[(u64, u32)],
        stock: &[(u64, i64)],
    ) -> (
        CartStore<MemoryStorage, StubCatalog, RecordingNotifier>,
        MemoryStorage,
        StubCatalog,
        RecordingNotifier,
    ) {
        let storage = seeded_storage(entries).await;
        let catalog = StubCatalog::new(stock);
        let notifier = RecordingNotifier::new();
        let store = CartStore::load(storage.clone(), catalog.clone(), notifier.clone())
            .await
            .unwrap();
        (store, storage, catalog, notifier)
    }

    async fn stored_cart(storage: &MemoryStorage) -> Cart {
        let raw = storage.get(DEFAULT_CART_KEY).await.unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_load_empty_slot_gives_empty_cart() {
        let (store, _, _, _) = store_with(&[], &[]).await;
        assert!(store.cart().is_empty());
        assert_eq!(store.storage_key(), "@RocketShoes:cart");
    }

    #[tokio::test]
    async fn test_load_corrupted_slot_fails() {
        let storage = MemoryStorage::new();
        storage.insert(DEFAULT_CART_KEY, "[{not json").await;

        let result =
            CartStore::load(storage, StubCatalog::default(), RecordingNotifier::new()).await;

        assert!(matches!(result, Err(CartError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_load_skips_zero_amount_items() {
        let storage = MemoryStorage::new();
        let mut raw = serde_json::to_value(items(&[(1, 2), (2, 1)])).unwrap();
        raw[0]["amount"] = serde_json::json!(0);
        storage.insert(DEFAULT_CART_KEY, raw.to_string()).await;

        let store = CartStore::load(storage, StubCatalog::default(), RecordingNotifier::new())
            .await
            .unwrap();

        assert_eq!(amounts(&store.cart()), vec![(2, 1)]);
        assert!(store.cart().items().iter().all(|item| item.amount > 0));
    }

    #[tokio::test]
    async fn test_add_new_product_to_empty_cart() {
        let (store, storage, catalog, notifier) = store_with(&[], &[(1, 5)]).await;

        store.add_product(ProductId(1)).await;

        assert_eq!(amounts(&store.cart()), vec![(1, 1)]);
        assert_eq!(store.cart().items()[0].product, product(1));
        assert_eq!(stored_cart(&storage).await, *store.cart());
        assert_eq!(catalog.stock_calls(), 1);
        assert_eq!(catalog.product_calls(), 1);
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn test_add_appends_after_existing_items() {
        let (store, storage, _, _) = store_with(&[(2, 1)], &[(1, 5), (2, 5)]).await;

        store.add_product(ProductId(1)).await;

        assert_eq!(amounts(&store.cart()), vec![(2, 1), (1, 1)]);
        assert_eq!(stored_cart(&storage).await, *store.cart());
    }

    #[tokio::test]
    async fn test_add_existing_product_increments_without_product_fetch() {
        let (store, storage, catalog, notifier) = store_with(&[(1, 2)], &[(1, 3)]).await;

        store.add_product(ProductId(1)).await;

        assert_eq!(amounts(&store.cart()), vec![(1, 3)]);
        assert_eq!(stored_cart(&storage).await, *store.cart());
        assert_eq!(catalog.product_calls(), 0);
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn test_add_beyond_stock_notifies_and_keeps_cart() {
        let (store, storage, catalog, notifier) = store_with(&[(1, 1)], &[(1, 1)]).await;
        let before = serde_json::to_string(&*store.cart()).unwrap();

        store.add_product(ProductId(1)).await;

        assert_eq!(serde_json::to_string(&*store.cart()).unwrap(), before);
        assert_eq!(storage.get(DEFAULT_CART_KEY).await.unwrap(), before);
        assert_eq!(notifier.notices(), vec![Notice::StockExceeded]);
        assert_eq!(catalog.product_calls(), 0);
    }

    #[tokio::test]
    async fn test_add_with_zero_stock_for_new_product() {
        let (store, storage, catalog, notifier) = store_with(&[], &[(4, 0)]).await;

        store.add_product(ProductId(4)).await;

        assert!(store.cart().is_empty());
        assert!(storage.get(DEFAULT_CART_KEY).await.is_none());
        assert_eq!(notifier.notices(), vec![Notice::StockExceeded]);
        assert_eq!(catalog.product_calls(), 0);
    }

    #[tokio::test]
    async fn test_add_with_failing_stock_lookup_reports_add_failed() {
        let (store, _, _, notifier) = store_with(&[(1, 1)], &[(1, 5)]).await;

        store.add_product(ProductId(99)).await;

        assert_eq!(amounts(&store.cart()), vec![(1, 1)]);
        assert_eq!(notifier.notices(), vec![Notice::AddFailed]);
    }

    #[tokio::test]
    async fn test_add_with_mismatched_product_reports_add_failed() {
        let mut catalog = StubCatalog::new(&[(1, 5)]);
        let mut products = HashMap::new();
        products.insert(ProductId(1), product(2));
        catalog.products = Arc::new(products);
        let notifier = RecordingNotifier::new();
        let store = CartStore::load(MemoryStorage::new(), catalog, notifier.clone())
            .await
            .unwrap();

        store.add_product(ProductId(1)).await;

        assert!(store.cart().is_empty());
        assert_eq!(notifier.notices(), vec![Notice::AddFailed]);
    }

    #[tokio::test]
    async fn test_add_with_failing_storage_keeps_snapshot() {
        let inner = seeded_storage(&[(1, 1)]).await;
        let notifier = RecordingNotifier::new();
        let store = CartStore::load(
            ReadOnlyStorage { inner },
            StubCatalog::new(&[(1, 5)]),
            notifier.clone(),
        )
        .await
        .unwrap();

        store.add_product(ProductId(1)).await;

        assert_eq!(amounts(&store.cart()), vec![(1, 1)]);
        assert_eq!(notifier.notices(), vec![Notice::AddFailed]);
    }

    #[tokio::test]
    async fn test_remove_present_product_keeps_relative_order() {
        let (store, storage, catalog, notifier) =
            store_with(&[(1, 2), (2, 1), (3, 4)], &[]).await;

        store.remove_product(ProductId(2)).await;

        assert_eq!(amounts(&store.cart()), vec![(1, 2), (3, 4)]);
        assert_eq!(stored_cart(&storage).await, *store.cart());
        assert_eq!(catalog.stock_calls(), 0);
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn test_remove_scenario_two_items() {
        let (store, _, _, _) = store_with(&[(1, 2), (2, 1)], &[]).await;

        store.remove_product(ProductId(2)).await;

        assert_eq!(amounts(&store.cart()), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_remove_absent_product_reports_remove_failed() {
        let (store, storage, _, notifier) = store_with(&[(1, 2)], &[]).await;
        let before = storage.get(DEFAULT_CART_KEY).await;

        store.remove_product(ProductId(5)).await;

        assert_eq!(amounts(&store.cart()), vec![(1, 2)]);
        assert_eq!(storage.get(DEFAULT_CART_KEY).await, before);
        assert_eq!(notifier.notices(), vec![Notice::RemoveFailed]);
    }

    #[tokio::test]
    async fn test_remove_with_failing_storage_reports_remove_failed() {
        let inner = seeded_storage(&[(1, 1)]).await;
        let notifier = RecordingNotifier::new();
        let store = CartStore::load(
            ReadOnlyStorage { inner },
            StubCatalog::default(),
            notifier.clone(),
        )
        .await
        .unwrap();

        store.remove_product(ProductId(1)).await;

        assert_eq!(amounts(&store.cart()), vec![(1, 1)]);
        assert_eq!(notifier.notices(), vec![Notice::RemoveFailed]);
    }

    #[tokio::test]
    async fn test_update_sets_amount_within_stock() {
        let (store, storage, catalog, notifier) = store_with(&[(1, 1)], &[(1, 10)]).await;

        store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId(1),
                amount: 3,
            })
            .await;

        assert_eq!(amounts(&store.cart()), vec![(1, 3)]);
        assert_eq!(stored_cart(&storage).await, *store.cart());
        assert_eq!(catalog.stock_calls(), 1);
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn test_update_non_positive_amount_is_silent_noop() {
        let (store, storage, catalog, notifier) = store_with(&[(1, 2)], &[(1, 10)]).await;
        let before = storage.get(DEFAULT_CART_KEY).await;

        for amount in [0, -1, i64::MIN] {
            store
                .update_product_amount(UpdateProductAmount {
                    product_id: ProductId(1),
                    amount,
                })
                .await;
        }

        assert_eq!(amounts(&store.cart()), vec![(1, 2)]);
        assert_eq!(storage.get(DEFAULT_CART_KEY).await, before);
        assert_eq!(catalog.stock_calls(), 0);
        assert!(notifier.is_empty());
    }

    #[tokio::test]
    async fn test_update_beyond_stock_notifies_stock_exceeded() {
        let (store, _, _, notifier) = store_with(&[(1, 2)], &[(1, 4)]).await;

        store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId(1),
                amount: 5,
            })
            .await;

        assert_eq!(amounts(&store.cart()), vec![(1, 2)]);
        assert_eq!(notifier.notices(), vec![Notice::StockExceeded]);
    }

    #[tokio::test]
    async fn test_update_absent_product_reports_update_failed() {
        let (store, _, _, notifier) = store_with(&[(1, 2)], &[(1, 4), (2, 4)]).await;

        store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId(2),
                amount: 1,
            })
            .await;

        assert_eq!(amounts(&store.cart()), vec![(1, 2)]);
        assert_eq!(notifier.notices(), vec![Notice::UpdateFailed]);
    }

    #[tokio::test]
    async fn test_update_checks_stock_before_cart_membership() {
        let (store, _, _, notifier) = store_with(&[], &[(2, 1)]).await;

        store
            .update_product_amount(UpdateProductAmount {
                product_id: ProductId(2),
                amount: 2,
            })
            .await;

        assert_eq!(notifier.notices(), vec![Notice::StockExceeded]);
    }

    #[tokio::test]
    async fn test_subscribers_see_published_snapshots() {
        let (store, _, _, _) = store_with(&[], &[(1, 5)]).await;
        let mut rx = store.subscribe();

        store.add_product(ProductId(1)).await;

        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(amounts(&seen), vec![(1, 1)]);

        // 失敗的操作不會發布新快照
        store.remove_product(ProductId(7)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_previous_snapshot_is_not_mutated() {
        let (store, _, _, _) = store_with(&[(1, 1)], &[(1, 5)]).await;
        let before = store.cart();

        store.add_product(ProductId(1)).await;

        assert_eq!(amounts(&before), vec![(1, 1)]);
        assert_eq!(amounts(&store.cart()), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_reload_round_trip_preserves_order() {
        let (store, storage, catalog, _) =
            store_with(&[], &[(3, 5), (1, 5), (2, 5)]).await;

        for id in [3, 1, 2, 1] {
            store.add_product(ProductId(id)).await;
        }

        let reloaded = CartStore::load(storage, catalog, RecordingNotifier::new())
            .await
            .unwrap();

        assert_eq!(amounts(&reloaded.cart()), vec![(3, 1), (1, 2), (2, 1)]);
        assert_eq!(*reloaded.cart(), *store.cart());
    }

    #[tokio::test]
    async fn test_custom_storage_key() {
        let storage = MemoryStorage::new();
        let store = CartStore::load_with_key(
            storage.clone(),
            StubCatalog::new(&[(1, 1)]),
            RecordingNotifier::new(),
            "test:cart",
        )
        .await
        .unwrap();

        store.add_product(ProductId(1)).await;

        assert!(storage.get("test:cart").await.is_some());
        assert!(storage.get(DEFAULT_CART_KEY).await.is_none());
    }
}

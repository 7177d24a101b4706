use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage slot the storefront has always used for the cart.
pub const DEFAULT_CART_KEY: &str = "@RocketShoes:cart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Product record as served by `GET /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: f64,
    pub image: String,
}

/// Available quantity as served by `GET /stock/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProductId>,
    pub amount: i64,
}

impl Stock {
    pub fn allows(&self, requested: i64) -> bool {
        requested <= self.amount
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(flatten)]
    pub product: Product,
    pub amount: u32,
}

impl LineItem {
    pub fn new(product: Product) -> Self {
        Self { product, amount: 1 }
    }

    pub fn id(&self) -> ProductId {
        self.product.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    pub amount: i64,
}

/// Ordered line items, at most one per product.
///
/// A `Cart` is never mutated once published. Every change goes through one of
/// the `with_*`/`without` methods, which build a new value and leave `self`
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cart from stored items. Items with a zero amount and later
    /// duplicates of a product id are dropped, so hand-edited data still has
    /// one positive line item per product.
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut unique: Vec<LineItem> = Vec::with_capacity(items.len());
        for item in items {
            if item.amount == 0 {
                continue;
            }
            if !unique.iter().any(|existing| existing.id() == item.id()) {
                unique.push(item);
            }
        }
        Self { items: unique }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn find(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id() == product_id)
    }

    pub fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == product_id)
    }

    pub fn amount_of(&self, product_id: ProductId) -> Option<u32> {
        self.find(product_id).map(|item| item.amount)
    }

    /// Number of distinct products (the header badge).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.amount)).sum()
    }

    /// Appends `item`, or returns `None` if its product is already present.
    pub fn with_item(&self, item: LineItem) -> Option<Cart> {
        if self.find(item.id()).is_some() {
            return None;
        }
        let mut items = self.items.clone();
        items.push(item);
        Some(Cart { items })
    }

    /// Replaces the amount of an existing line item, keeping its position.
    pub fn with_amount(&self, product_id: ProductId, amount: u32) -> Option<Cart> {
        let index = self.position(product_id)?;
        let mut items = self.items.clone();
        items[index] = LineItem {
            product: items[index].product.clone(),
            amount,
        };
        Some(Cart { items })
    }

    pub fn without(&self, product_id: ProductId) -> Option<Cart> {
        let index = self.position(product_id)?;
        let mut items = self.items.clone();
        items.remove(index);
        Some(Cart { items })
    }
}

//! # Catalog & Cart Contracts
//!
//! The pipeline never owns products or carts. It consumes a
//! [`ProductCatalog`] and produces into a [`CartSink`], both injected by the
//! host application.
//!
//! ```text
//! ┌──────────────┐  get_by_barcode / barcodes  ┌──────────────────────┐
//! │   Resolver   │ ──────────────────────────► │   ProductCatalog     │
//! │              │                             │   (SQLite, JSON,     │
//! │              │                             │    in-memory ...)    │
//! └──────┬───────┘                             └──────────────────────┘
//!        │ add_item(product, 1)
//!        ▼
//! ┌──────────────┐
//! │   CartSink   │  merges repeat scans into one line (its job, not ours)
//! └──────────────┘
//! ```

use std::collections::HashMap;

/// Read access to the product catalog.
pub trait ProductCatalog: Send + Sync {
    /// Opaque product reference handed back to the cart.
    type Product: Clone + Send + Sync;

    /// Exact barcode lookup.
    fn get_by_barcode(&self, code: &str) -> Option<Self::Product>;

    /// Every barcode in the catalog, in a stable enumeration order.
    ///
    /// Used by the fuzzy passes; order decides ties between equally good
    /// candidates.
    fn barcodes(&self) -> Vec<String>;
}

/// Receives resolved products.
pub trait CartSink<P>: Send + Sync {
    /// Adds `quantity` units of `product` to the current cart.
    fn add_item(&self, product: &P, quantity: u32);
}

// =============================================================================
// In-Memory Catalog
// =============================================================================

/// Barcode-keyed catalog held in memory.
///
/// Keeps insertion order for enumeration so fuzzy matching is deterministic.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog<P> {
    order: Vec<String>,
    products: HashMap<String, P>,
}

impl<P> Default for InMemoryCatalog<P> {
    fn default() -> Self {
        InMemoryCatalog {
            order: Vec::new(),
            products: HashMap::new(),
        }
    }
}

impl<P> InMemoryCatalog<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product under `barcode`.
    pub fn insert(&mut self, barcode: impl Into<String>, product: P) {
        let barcode = barcode.into();
        if self.products.insert(barcode.clone(), product).is_none() {
            self.order.push(barcode);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<P> FromIterator<(String, P)> for InMemoryCatalog<P> {
    fn from_iter<I: IntoIterator<Item = (String, P)>>(iter: I) -> Self {
        let mut catalog = InMemoryCatalog::new();
        for (barcode, product) in iter {
            catalog.insert(barcode, product);
        }
        catalog
    }
}

impl<P: Clone + Send + Sync> ProductCatalog for InMemoryCatalog<P> {
    type Product = P;

    fn get_by_barcode(&self, code: &str) -> Option<P> {
        self.products.get(code).cloned()
    }

    fn barcodes(&self) -> Vec<String> {
        self.order.clone()
    }
}

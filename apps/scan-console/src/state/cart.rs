//! # Console Cart
//!
//! The cart the scan pipeline adds to. Repeat scans of the same product
//! merge into one line; the pipeline itself never deduplicates.
//!
//! ```text
//!   add_item(Surf Excel, 1) ──► [Surf Excel × 1]
//!   add_item(Surf Excel, 1) ──► [Surf Excel × 2]
//!   add_item(Stabilo,    1) ──► [Surf Excel × 2, Stabilo × 1]
//! ```

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use titan_scan_core::CartSink;

use super::catalog::ConsoleProduct;

/// One line in the cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub barcode: String,
    pub name: String,
    /// Price at time of adding (frozen)
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * i64::from(self.quantity)
    }
}

/// Thread-safe cart shared between the pipeline and the console.
#[derive(Debug, Default, Clone)]
pub struct CartState {
    lines: Arc<Mutex<Vec<CartLine>>>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current lines.
    pub fn lines(&self) -> Vec<CartLine> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    pub fn total_cents(&self) -> i64 {
        self.lines().iter().map(CartLine::line_total_cents).sum()
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }
}

impl CartSink<ConsoleProduct> for CartState {
    fn add_item(&self, product: &ConsoleProduct, quantity: u32) {
        let Ok(mut lines) = self.lines.lock() else {
            tracing::error!("Cart lock poisoned, dropping scan");
            return;
        };

        if let Some(line) = lines.iter_mut().find(|l| l.barcode == product.barcode) {
            line.quantity += quantity;
        } else {
            lines.push(CartLine {
                barcode: product.barcode.clone(),
                name: product.name.clone(),
                unit_price_cents: product.price_cents,
                quantity,
                added_at: Utc::now(),
            });
        }
    }
}

//! # Catalog State
//!
//! Products the console can resolve scans against, loaded from a JSON file:
//!
//! ```json
//! [
//!   { "barcode": "8901030875071", "name": "Surf Excel 1kg", "price_cents": 45000 },
//!   { "barcode": "4006381333931", "name": "Stabilo Boss",   "price_cents": 12000 }
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use titan_scan_core::InMemoryCatalog;

use crate::error::{ConsoleError, ConsoleResult};

/// A product as the console knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleProduct {
    pub barcode: String,
    pub name: String,
    #[serde(default)]
    pub price_cents: i64,
}

/// Loads the catalog from a JSON array of products.
pub fn load_catalog(path: &Path) -> ConsoleResult<InMemoryCatalog<ConsoleProduct>> {
    let path_str = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| ConsoleError::CatalogRead {
        path: path_str.clone(),
        source,
    })?;
    let catalog = parse_catalog(&contents).map_err(|source| ConsoleError::CatalogParse {
        path: path_str.clone(),
        source,
    })?;
    info!(path = %path_str, products = catalog.len(), "Catalog loaded");
    Ok(catalog)
}

/// Parses a JSON catalog. Later duplicates replace earlier ones.
pub fn parse_catalog(json: &str) -> Result<InMemoryCatalog<ConsoleProduct>, serde_json::Error> {
    let products: Vec<ConsoleProduct> = serde_json::from_str(json)?;
    Ok(products
        .into_iter()
        .map(|p| (p.barcode.clone(), p))
        .collect())
}

/// A handful of retail products for trying the console without a file.
pub fn demo_catalog() -> InMemoryCatalog<ConsoleProduct> {
    [
        ("8901030875071", "Surf Excel 1kg", 45000),
        ("4006381333931", "Stabilo Boss Highlighter", 12000),
        ("5449000000996", "Coca-Cola 330ml", 8000),
        ("96385074", "Mint Gum", 2500),
    ]
    .into_iter()
    .map(|(barcode, name, price_cents)| {
        (
            barcode.to_string(),
            ConsoleProduct {
                barcode: barcode.to_string(),
                name: name.to_string(),
                price_cents,
            },
        )
    })
    .collect()
}

//! # Console State
//!
//! - [`catalog`] - Products scans resolve against
//! - [`cart`] - Where resolved products land

pub mod cart;
pub mod catalog;

pub use cart::{CartLine, CartState};
pub use catalog::{demo_catalog, load_catalog, parse_catalog, ConsoleProduct};

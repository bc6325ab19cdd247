//! Market data models
//!
//! - `types` - Identifier types (Ticker) and the Currency alias
//! - `price_point` - The canonical price observation (PricePoint, Money, PriceSource)

mod price_point;
mod types;

pub use price_point::{Money, PricePoint, PriceSource};
pub use types::{Currency, Ticker};

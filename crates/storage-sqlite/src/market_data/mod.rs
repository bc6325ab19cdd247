mod model;
mod repository;

pub use model::{LatestPriceDB, PriceHistoryDB};
pub use repository::MarketDataRepository;

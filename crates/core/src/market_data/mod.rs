//! Market data module - warm store contract and the read gateway.

mod market_data_constants;
mod market_data_errors;
mod market_data_gateway;
mod market_data_traits;


pub use market_data_constants::*;
pub use market_data_errors::GatewayError;
pub use market_data_gateway::MarketDataGateway;
pub use market_data_traits::WarmStore;

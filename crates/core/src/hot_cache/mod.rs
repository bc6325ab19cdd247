//! Hot cache module - short-TTL read cache in front of the warm store.

mod hot_cache_traits;
mod memory_hot_cache;

pub use hot_cache_traits::HotCache;
pub use memory_hot_cache::MemoryHotCache;

mod repository;

pub use repository::SqliteRateLimitStore;

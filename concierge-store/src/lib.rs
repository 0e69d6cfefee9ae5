pub mod app_config;
pub mod database;
pub mod memory;
pub mod redis_repo;
pub mod events;

pub use database::{DbClient, PgStore};
pub use memory::{InMemoryCache, InMemoryStore};
pub use redis_repo::RedisClient;
pub use events::EventBus;

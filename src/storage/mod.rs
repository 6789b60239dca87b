mod feeds;
mod memory;
mod repository;
mod schema;
mod types;

pub use memory::InMemoryRepository;
pub use repository::FeedRepository;
pub use schema::Database;
pub use types::{Feed, FeedQuery, StorageError};

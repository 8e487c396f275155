//! Storage backends for short URL records and click events.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;

pub use portkey_core::repository::{
    ClickRepository, CodeReuse, ReadRepository, Result, UrlRepository,
};
pub use portkey_core::StorageError;

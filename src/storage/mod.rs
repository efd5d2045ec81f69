//! Storage implementations for different backends

pub mod in_memory;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod stores;

pub use in_memory::InMemoryDataService;
#[cfg(feature = "mysql")]
pub use mysql::{MysqlDataService, ensure_schema};
pub use stores::Stores;

pub mod connection;
pub mod json_store;
pub mod migrate;
pub mod queries;

pub use json_store::JsonStore;
pub use queries::SqliteStore;

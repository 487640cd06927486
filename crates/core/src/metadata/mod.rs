//! Durable per-manifest metadata: current status plus append-only history.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteMetadataStore;
pub use store::{MetadataError, MetadataStore};
pub use types::{MetadataRecord, Status, StatusEntry};

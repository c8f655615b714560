//! Persistence layer: the libSQL-backed local message cache.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{MessageRecord, MessageStore};

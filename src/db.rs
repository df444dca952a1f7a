pub use self::error::DatabaseError;
pub use self::manager::{DatabaseManager, DbType};
pub use self::models::{LATEST_LIMIT, Snippet};
pub use self::stores::SnippetStore;

pub mod error;
pub mod manager;
pub mod models;
pub mod stores;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(not(any(feature = "mysql", feature = "postgres", feature = "sqlite")))]
compile_error!("enable at least one database backend: `mysql`, `postgres` or `sqlite`");

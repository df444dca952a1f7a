use crate::config::{DatabaseConfig as ConfigDatabaseConfig, DbType as ConfigDbType};
use crate::db::{DatabaseError, SnippetStore};
use diesel::r2d2::{self, ConnectionManager, R2D2Connection};
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "mysql")]
use crate::db::mysql::MysqlSnippetStore;
#[cfg(feature = "mysql")]
use diesel::mysql::MysqlConnection;

#[cfg(feature = "postgres")]
use crate::db::postgres::PostgresSnippetStore;
#[cfg(feature = "postgres")]
use diesel::pg::PgConnection;

#[cfg(feature = "sqlite")]
use crate::db::sqlite::SqliteSnippetStore;
#[cfg(feature = "sqlite")]
use diesel::sqlite::SqliteConnection;

pub type Pool<C> = r2d2::Pool<ConnectionManager<C>>;

/// Runs `operation` on a pooled connection inside a blocking task.
///
/// The connection goes back to the pool when the closure returns, whether it
/// succeeded or not.
pub(crate) async fn with_connection<C, T, F>(pool: Pool<C>, operation: F) -> Result<T, DatabaseError>
where
    C: R2D2Connection + Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut C) -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        operation(&mut conn)
    })
    .await?
}

#[derive(Clone)]
enum Backend {
    #[cfg(feature = "mysql")]
    Mysql(Pool<MysqlConnection>),
    #[cfg(feature = "postgres")]
    Postgres(Pool<PgConnection>),
    #[cfg(feature = "sqlite")]
    Sqlite(Pool<SqliteConnection>),
}

#[derive(Clone)]
pub struct DatabaseManager {
    backend: Backend,
    snippet_store: Arc<dyn SnippetStore>,
    db_type: DbType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbType {
    Mysql,
    Postgres,
    Sqlite,
}

impl From<ConfigDbType> for DbType {
    fn from(value: ConfigDbType) -> Self {
        match value {
            ConfigDbType::Mysql => DbType::Mysql,
            ConfigDbType::Postgres => DbType::Postgres,
            ConfigDbType::Sqlite => DbType::Sqlite,
        }
    }
}

fn build_pool<C>(
    url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<Pool<C>, DatabaseError>
where
    C: R2D2Connection + Send + 'static,
{
    let manager = ConnectionManager::<C>::new(url);
    r2d2::Pool::builder()
        .max_size(max_connections)
        .min_idle(Some(min_connections.min(max_connections)))
        .build(manager)
        .map_err(|e| DatabaseError::Connection(e.to_string()))
}

impl DatabaseManager {
    pub async fn new(config: &ConfigDatabaseConfig) -> Result<Self, DatabaseError> {
        let db_type = DbType::from(config.db_type());
        let max_connections = config.max_connections().unwrap_or(10);
        let min_connections = config.min_connections().unwrap_or(1);

        let backend = match db_type {
            #[cfg(feature = "mysql")]
            DbType::Mysql => {
                let url = config.connection_string();
                let pool = tokio::task::spawn_blocking(move || {
                    build_pool::<MysqlConnection>(&url, max_connections, min_connections)
                })
                .await??;
                Backend::Mysql(pool)
            }
            #[cfg(feature = "postgres")]
            DbType::Postgres => {
                let url = config.connection_string();
                let pool = tokio::task::spawn_blocking(move || {
                    build_pool::<PgConnection>(&url, max_connections, min_connections)
                })
                .await??;
                Backend::Postgres(pool)
            }
            #[cfg(feature = "sqlite")]
            DbType::Sqlite => {
                let path = config.sqlite_path().ok_or_else(|| {
                    DatabaseError::Connection("sqlite path is not configured".to_string())
                })?;
                let pool = tokio::task::spawn_blocking(move || {
                    build_pool::<SqliteConnection>(&path, max_connections, min_connections)
                })
                .await??;
                Backend::Sqlite(pool)
            }
            #[cfg(not(feature = "mysql"))]
            DbType::Mysql => {
                return Err(DatabaseError::Connection(
                    "MySQL feature not enabled".to_string(),
                ));
            }
            #[cfg(not(feature = "postgres"))]
            DbType::Postgres => {
                return Err(DatabaseError::Connection(
                    "PostgreSQL feature not enabled".to_string(),
                ));
            }
            #[cfg(not(feature = "sqlite"))]
            DbType::Sqlite => {
                return Err(DatabaseError::Connection(
                    "SQLite feature not enabled".to_string(),
                ));
            }
        };

        let snippet_store: Arc<dyn SnippetStore> = match &backend {
            #[cfg(feature = "mysql")]
            Backend::Mysql(pool) => Arc::new(MysqlSnippetStore::new(pool.clone())),
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => Arc::new(PostgresSnippetStore::new(pool.clone())),
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => Arc::new(SqliteSnippetStore::new(pool.clone())),
        };

        info!(?db_type, max_connections, "database pool ready");

        Ok(Self {
            backend,
            snippet_store,
            db_type,
        })
    }

    /// Creates the `snippets` table and its index when they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), DatabaseError> {
        match &self.backend {
            #[cfg(feature = "mysql")]
            Backend::Mysql(pool) => crate::db::mysql::create_schema(pool.clone()).await?,
            #[cfg(feature = "postgres")]
            Backend::Postgres(pool) => crate::db::postgres::create_schema(pool.clone()).await?,
            #[cfg(feature = "sqlite")]
            Backend::Sqlite(pool) => crate::db::sqlite::create_schema(pool.clone()).await?,
        }

        info!(db_type = ?self.db_type, "snippets schema ready");
        Ok(())
    }

    pub fn snippet_store(&self) -> Arc<dyn SnippetStore> {
        self.snippet_store.clone()
    }

    pub fn db_type(&self) -> DbType {
        self.db_type
    }
}

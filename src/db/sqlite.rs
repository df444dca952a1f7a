use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Text, Timestamp};
use diesel::sqlite::SqliteConnection;
use tracing::debug;

use crate::db::manager::{Pool, with_connection};

use super::{
    DatabaseError,
    models::{LATEST_LIMIT, Snippet},
};

// SQLite has no native timestamp type; `datetime('now')` yields UTC text in
// `YYYY-MM-DD HH:MM:SS` form, which sorts and compares correctly as text.
const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS snippets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        created TEXT NOT NULL,
        expires TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_snippets_expires_created ON snippets(expires, created)",
];

const INSERT_SNIPPET: &str = r#"
    INSERT INTO snippets (title, content, created, expires)
    VALUES (?, ?, datetime('now'), datetime('now', printf('+%d days', ?)))
    RETURNING id
"#;

const SELECT_LIVE_BY_ID: &str = r#"
    SELECT id, title, content, created, expires
    FROM snippets
    WHERE expires > datetime('now') AND id = ?
"#;

const SELECT_LATEST: &str = r#"
    SELECT id, title, content, created, expires
    FROM snippets
    WHERE expires > datetime('now')
    ORDER BY created DESC, id DESC
    LIMIT ?
"#;

pub(crate) async fn create_schema(pool: Pool<SqliteConnection>) -> Result<(), DatabaseError> {
    with_connection(pool, |conn| {
        for statement in SCHEMA {
            diesel::sql_query(statement)
                .execute(conn)
                .map_err(|e| DatabaseError::Schema(e.to_string()))?;
        }
        Ok(())
    })
    .await
}

#[derive(Debug, QueryableByName)]
struct InsertedId {
    #[diesel(sql_type = BigInt)]
    id: i64,
}

#[derive(Debug, Clone, QueryableByName)]
struct DbSnippet {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Text)]
    title: String,
    #[diesel(sql_type = Text)]
    content: String,
    #[diesel(sql_type = Timestamp)]
    created: NaiveDateTime,
    #[diesel(sql_type = Timestamp)]
    expires: NaiveDateTime,
}

impl From<DbSnippet> for Snippet {
    fn from(value: DbSnippet) -> Self {
        Self {
            id: value.id,
            title: value.title,
            content: value.content,
            created: value.created.and_utc(),
            expires: value.expires.and_utc(),
        }
    }
}

pub struct SqliteSnippetStore {
    pool: Pool<SqliteConnection>,
}

impl SqliteSnippetStore {
    pub fn new(pool: Pool<SqliteConnection>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::SnippetStore for SqliteSnippetStore {
    async fn create(
        &self,
        title: &str,
        content: &str,
        expires_days: i32,
    ) -> Result<i64, DatabaseError> {
        let pool = self.pool.clone();
        let title = title.to_string();
        let content = content.to_string();
        let id = with_connection(pool, move |conn| {
            let inserted = diesel::sql_query(INSERT_SNIPPET)
                .bind::<Text, _>(title)
                .bind::<Text, _>(content)
                .bind::<Integer, _>(expires_days)
                .get_result::<InsertedId>(conn)?;
            Ok(inserted.id)
        })
        .await?;

        debug!(id, expires_days, "inserted snippet");
        Ok(id)
    }

    async fn get_by_id(&self, snippet_id: i64) -> Result<Snippet, DatabaseError> {
        let pool = self.pool.clone();
        with_connection(pool, move |conn| {
            diesel::sql_query(SELECT_LIVE_BY_ID)
                .bind::<BigInt, _>(snippet_id)
                .get_result::<DbSnippet>(conn)
                .optional()?
                .map(Into::into)
                .ok_or(DatabaseError::NoRecord)
        })
        .await
    }

    async fn list_latest(&self) -> Result<Vec<Snippet>, DatabaseError> {
        let pool = self.pool.clone();
        let snippets: Vec<Snippet> = with_connection(pool, move |conn| {
            let rows = diesel::sql_query(SELECT_LATEST)
                .bind::<BigInt, _>(LATEST_LIMIT)
                .load::<DbSnippet>(conn)?;
            Ok(rows.into_iter().map(Into::into).collect())
        })
        .await?;

        debug!(count = snippets.len(), "loaded latest snippets");
        Ok(snippets)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use diesel::prelude::*;
    use diesel::r2d2::{self, ConnectionManager};
    use diesel::sql_types::{Integer, Text};
    use diesel::sqlite::SqliteConnection;
    use tempfile::NamedTempFile;
    use tokio_test::{assert_err, assert_ok};

    use super::{SCHEMA, SqliteSnippetStore};
    use crate::db::manager::Pool;
    use crate::db::{DatabaseError, SnippetStore};

    fn test_pool(file: &NamedTempFile) -> Pool<SqliteConnection> {
        let manager =
            ConnectionManager::<SqliteConnection>::new(file.path().to_string_lossy().to_string());
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("sqlite pool");

        let mut conn = pool.get().expect("sqlite connection");
        for statement in SCHEMA {
            diesel::sql_query(statement)
                .execute(&mut conn)
                .expect("create snippets table");
        }
        drop(conn);

        pool
    }

    /// Inserts a row with `created`/`expires` offset from the database clock by
    /// the given number of minutes, so tests can control ordering and expiry.
    fn insert_at(
        pool: &Pool<SqliteConnection>,
        title: &str,
        created_minutes: i32,
        expires_minutes: i32,
    ) -> i64 {
        #[derive(QueryableByName)]
        struct Id {
            #[diesel(sql_type = diesel::sql_types::BigInt)]
            id: i64,
        }

        let mut conn = pool.get().expect("sqlite connection");
        diesel::sql_query(
            "INSERT INTO snippets (title, content, created, expires) \
             VALUES (?, 'body', datetime('now', printf('%+d minutes', ?)), \
             datetime('now', printf('%+d minutes', ?))) RETURNING id",
        )
        .bind::<Text, _>(title)
        .bind::<Integer, _>(created_minutes)
        .bind::<Integer, _>(expires_minutes)
        .get_result::<Id>(&mut conn)
        .expect("insert snippet")
        .id
    }

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let store = SqliteSnippetStore::new(test_pool(&file));

        let id = store
            .create("Test title", "Test content", 7)
            .await
            .expect("create snippet");
        assert_eq!(id, 1);

        let snippet = store.get_by_id(id).await.expect("fetch snippet");
        assert_eq!(snippet.id, 1);
        assert_eq!(snippet.title, "Test title");
        assert_eq!(snippet.content, "Test content");
        assert_eq!(snippet.expires - snippet.created, Duration::days(7));

        let now = Utc::now();
        assert!((snippet.created - now).num_seconds().abs() < 60);
    }

    #[tokio::test]
    async fn unknown_id_is_no_record() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let store = SqliteSnippetStore::new(test_pool(&file));

        assert_ok!(store.create("Test title", "Test content", 7).await);

        let err = store.get_by_id(999).await.expect_err("id 999 was never inserted");
        assert!(matches!(err, DatabaseError::NoRecord));
    }

    #[tokio::test]
    async fn expired_snippet_is_hidden_but_kept() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let pool = test_pool(&file);
        let store = SqliteSnippetStore::new(pool.clone());

        let expired = insert_at(&pool, "stale", -120, -60);
        let err = assert_err!(store.get_by_id(expired).await);
        assert!(err.is_no_record());

        let latest = store.list_latest().await.expect("list latest");
        assert!(latest.is_empty());

        #[derive(QueryableByName)]
        struct Count {
            #[diesel(sql_type = diesel::sql_types::BigInt)]
            n: i64,
        }
        let mut conn = pool.get().expect("sqlite connection");
        let count = diesel::sql_query("SELECT COUNT(*) AS n FROM snippets")
            .get_result::<Count>(&mut conn)
            .expect("count rows");
        assert_eq!(count.n, 1);
    }

    #[tokio::test]
    async fn latest_is_newest_first() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let pool = test_pool(&file);
        let store = SqliteSnippetStore::new(pool.clone());

        let first = insert_at(&pool, "first", -30, 600);
        let second = insert_at(&pool, "second", -20, 600);
        let third = insert_at(&pool, "third", -10, 600);
        insert_at(&pool, "expired", -5, -1);

        let latest = store.list_latest().await.expect("list latest");
        let ids: Vec<i64> = latest.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![third, second, first]);
        assert!(latest.windows(2).all(|w| w[0].created > w[1].created));
    }

    #[tokio::test]
    async fn latest_is_capped_at_ten() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let pool = test_pool(&file);
        let store = SqliteSnippetStore::new(pool.clone());

        let ids: Vec<i64> = (0..15)
            .map(|i| insert_at(&pool, &format!("snippet {i}"), -100 + i, 600))
            .collect();

        let latest = store.list_latest().await.expect("list latest");
        assert_eq!(latest.len(), 10);

        let expected: Vec<i64> = ids.iter().rev().take(10).copied().collect();
        let returned: Vec<i64> = latest.iter().map(|s| s.id).collect();
        assert_eq!(returned, expected);
    }

    #[tokio::test]
    async fn latest_on_empty_table_is_empty() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let store = SqliteSnippetStore::new(test_pool(&file));

        let latest = assert_ok!(store.list_latest().await);
        assert!(latest.is_empty());
    }

    #[tokio::test]
    async fn missing_table_surfaces_query_error() {
        let file = NamedTempFile::new().expect("temp sqlite file");
        let manager =
            ConnectionManager::<SqliteConnection>::new(file.path().to_string_lossy().to_string());
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("sqlite pool");
        let store = SqliteSnippetStore::new(pool);

        let err = store.get_by_id(1).await.expect_err("table does not exist");
        assert!(matches!(err, DatabaseError::Query(_)));

        let err = store.list_latest().await.expect_err("table does not exist");
        assert!(matches!(err, DatabaseError::Query(_)));
    }
}

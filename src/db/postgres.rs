use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Text, Timestamp};
use tracing::debug;

use crate::db::manager::{Pool, with_connection};

use super::{
    DatabaseError,
    models::{LATEST_LIMIT, Snippet},
};

// Timestamps are stored without a zone and always hold UTC wall-clock time.
const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS snippets (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        created TIMESTAMP NOT NULL,
        expires TIMESTAMP NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_snippets_expires_created ON snippets(expires, created)",
];

const INSERT_SNIPPET: &str = r#"
    INSERT INTO snippets (title, content, created, expires)
    VALUES (
        $1,
        $2,
        NOW() AT TIME ZONE 'UTC',
        (NOW() AT TIME ZONE 'UTC') + make_interval(days => $3)
    )
    RETURNING id
"#;

const SELECT_LIVE_BY_ID: &str = r#"
    SELECT id, title, content, created, expires
    FROM snippets
    WHERE expires > NOW() AT TIME ZONE 'UTC' AND id = $1
"#;

const SELECT_LATEST: &str = r#"
    SELECT id, title, content, created, expires
    FROM snippets
    WHERE expires > NOW() AT TIME ZONE 'UTC'
    ORDER BY created DESC, id DESC
    LIMIT $1
"#;

pub(crate) async fn create_schema(pool: Pool<PgConnection>) -> Result<(), DatabaseError> {
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

pub struct PostgresSnippetStore {
    pool: Pool<PgConnection>,
}

impl PostgresSnippetStore {
    pub fn new(pool: Pool<PgConnection>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::SnippetStore for PostgresSnippetStore {
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

use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::mysql::MysqlConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Datetime, Integer, Text};
use tracing::debug;

use crate::db::manager::{Pool, with_connection};

use super::{
    DatabaseError,
    models::{LATEST_LIMIT, Snippet},
};

const SCHEMA: [&str; 1] = [
    r#"
    CREATE TABLE IF NOT EXISTS snippets (
        id BIGINT NOT NULL PRIMARY KEY AUTO_INCREMENT,
        title VARCHAR(100) NOT NULL,
        content TEXT NOT NULL,
        created DATETIME NOT NULL,
        expires DATETIME NOT NULL,
        INDEX idx_snippets_expires_created (expires, created)
    ) ENGINE = InnoDB DEFAULT CHARACTER SET = utf8mb4
    "#,
];

const INSERT_SNIPPET: &str = r#"
    INSERT INTO snippets (title, content, created, expires)
    VALUES (?, ?, UTC_TIMESTAMP(), DATE_ADD(UTC_TIMESTAMP(), INTERVAL ? DAY))
"#;

// Scoped to the connection that ran the insert.
const LAST_INSERT_ID: &str = "SELECT CAST(LAST_INSERT_ID() AS SIGNED) AS id";

const SELECT_LIVE_BY_ID: &str = r#"
    SELECT id, title, content, created, expires
    FROM snippets
    WHERE expires > UTC_TIMESTAMP() AND id = ?
"#;

const SELECT_LATEST: &str = r#"
    SELECT id, title, content, created, expires
    FROM snippets
    WHERE expires > UTC_TIMESTAMP()
    ORDER BY created DESC, id DESC
    LIMIT ?
"#;

pub(crate) async fn create_schema(pool: Pool<MysqlConnection>) -> Result<(), DatabaseError> {
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
    #[diesel(sql_type = Datetime)]
    created: NaiveDateTime,
    #[diesel(sql_type = Datetime)]
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

pub struct MysqlSnippetStore {
    pool: Pool<MysqlConnection>,
}

impl MysqlSnippetStore {
    pub fn new(pool: Pool<MysqlConnection>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl super::SnippetStore for MysqlSnippetStore {
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
            diesel::sql_query(INSERT_SNIPPET)
                .bind::<Text, _>(title)
                .bind::<Text, _>(content)
                .bind::<Integer, _>(expires_days)
                .execute(conn)?;

            let inserted = diesel::sql_query(LAST_INSERT_ID).get_result::<InsertedId>(conn)?;
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

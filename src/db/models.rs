use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of rows returned by [`SnippetStore::list_latest`](super::SnippetStore::list_latest).
pub const LATEST_LIMIT: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

use async_trait::async_trait;

use super::DatabaseError;
use super::models::Snippet;

/// Access to the `snippets` table.
///
/// Timestamps are taken from the database clock, never from the caller's.
/// A snippet whose `expires` is not in the future is invisible to reads.
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Inserts a snippet that expires `expires_days` days from now and returns its id.
    async fn create(
        &self,
        title: &str,
        content: &str,
        expires_days: i32,
    ) -> Result<i64, DatabaseError>;

    /// Fetches a live snippet, or [`DatabaseError::NoRecord`] when the id is
    /// unknown or the snippet has expired.
    async fn get_by_id(&self, id: i64) -> Result<Snippet, DatabaseError>;

    /// Up to ten live snippets, newest first.
    async fn list_latest(&self) -> Result<Vec<Snippet>, DatabaseError>;
}

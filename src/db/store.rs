use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Feed, NewPost, Post};

/// The slice of the store that feed ingestion depends on.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// The feed that has gone longest without a fetch; never-fetched feeds first.
    async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>>;

    /// Inserts a post. A link that is already stored yields `AppError::Conflict`.
    async fn create_post(&self, post: NewPost) -> Result<Post>;

    async fn mark_feed_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
impl<T> FeedStore for &T
where
    T: FeedStore + ?Sized,
{
    async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        (**self).get_next_feed_to_fetch().await
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        (**self).create_post(post).await
    }

    async fn mark_feed_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        (**self).mark_feed_fetched(feed_id, at).await
    }
}

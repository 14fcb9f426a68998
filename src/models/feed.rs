use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` until the scheduler has fetched the feed successfully once.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewFeed {
    pub name: String,
    pub url: String,
    pub user_id: i64,
}

/// A feed joined with the name of the user who added it.
#[derive(Debug, Clone, Serialize)]
pub struct FeedWithOwner {
    pub feed: Feed,
    pub owner_name: String,
}

/// A follow row joined with the names it links together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedFollow {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: String,
    pub feed_name: String,
}

use chrono::{DateTime, Utc};

use crate::db::FeedStore;
use crate::error::AppError;
use crate::models::{Feed, NewPost};

use super::fetcher::{RssFeed, RssItem};

/// RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`,
/// minus the leading weekday.
const PUB_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

/// Stores the items of `parsed` as posts of `feed` and returns how many were
/// new. Items whose link is already stored are skipped quietly; any other
/// failure skips only that item.
pub async fn ingest<S>(store: &S, feed: &Feed, parsed: &RssFeed) -> usize
where
    S: FeedStore + ?Sized,
{
    let mut stored = 0;

    for item in &parsed.items {
        let post = to_new_post(feed.id, item);
        match store.create_post(post).await {
            Ok(_) => stored += 1,
            Err(AppError::Conflict(_)) => {}
            Err(e) => {
                tracing::warn!(feed = %feed.name, link = %item.link, "Failed to save post: {}", e);
            }
        }
    }

    stored
}

fn to_new_post(feed_id: i64, item: &RssItem) -> NewPost {
    let published_at = parse_pub_date(&item.pub_date);
    if published_at.is_none() {
        tracing::debug!(link = %item.link, "Unparseable pubDate {:?}", item.pub_date);
    }

    NewPost {
        feed_id,
        title: item.title.clone(),
        url: item.link.clone(),
        description: Some(item.description.clone()).filter(|d| !d.is_empty()),
        published_at,
    }
}

/// The weekday must be three letters but is not checked against the date;
/// plenty of feeds get it wrong.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let (weekday, rest) = raw.trim().split_once(", ")?;
    if weekday.len() != 3 || !weekday.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    DateTime::parse_from_str(rest, PUB_DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{is_unique_violation, AppError, Result};
use crate::models::{Feed, FeedFollow, FeedWithOwner, NewFeed, NewPost, Post, PostWithFeed, User};

use super::schema::SCHEMA;
use super::store::FeedStore;

const FEED_COLUMNS: &str =
    "f.id, f.name, f.url, f.user_id, f.created_at, f.updated_at, f.last_fetched_at";

const FOLLOW_SELECT: &str = r#"SELECT ff.id, ff.user_id, ff.feed_id, ff.created_at, ff.updated_at,
                                      u.name, f.name
                               FROM feed_follows ff
                               JOIN users u ON ff.user_id = u.id
                               JOIN feeds f ON ff.feed_id = f.id"#;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // User operations

    pub async fn create_user(&self, name: &str) -> Result<User> {
        let name = name.to_string();
        let now = stored_now();
        let stamp = timestamp(&now);
        let inserted = name.clone();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
                    params![inserted, stamp],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| conflict_or(e, format!("user '{}'", name)))?;

        Ok(User {
            id,
            name,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_user_by_name(&self, name: &str) -> Result<User> {
        let name = name.to_string();
        let lookup = name.clone();
        let user = self
            .conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, name, created_at, updated_at FROM users WHERE name = ?1",
                        params![lookup],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await?;
        user.ok_or_else(|| AppError::NotFound(format!("user '{}'", name)))
    }

    pub async fn get_users(&self) -> Result<Vec<User>> {
        let users = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, name, created_at, updated_at FROM users ORDER BY name")?;
                let users = stmt
                    .query_map([], user_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(users)
            })
            .await?;
        Ok(users)
    }

    /// Deletes every user; feeds, follows and posts go with them.
    pub async fn clear_users(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute("DELETE FROM users", [])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Feed operations

    pub async fn create_feed(&self, feed: NewFeed) -> Result<Feed> {
        let now = stored_now();
        let stamp = timestamp(&now);
        let NewFeed { name, url, user_id } = feed;
        let (inserted_name, inserted_url) = (name.clone(), url.clone());
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO feeds (name, url, user_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![inserted_name, inserted_url, user_id, stamp],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| conflict_or(e, format!("feed with url {}", url)))?;

        Ok(Feed {
            id,
            name,
            url,
            user_id,
            created_at: now,
            updated_at: now,
            last_fetched_at: None,
        })
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Feed> {
        let url = url.to_string();
        let lookup = url.clone();
        let feed = self
            .conn
            .call(move |conn| {
                let feed = conn
                    .query_row(
                        &format!("SELECT {} FROM feeds f WHERE f.url = ?1", FEED_COLUMNS),
                        params![lookup],
                        feed_from_row,
                    )
                    .optional()?;
                Ok(feed)
            })
            .await?;
        feed.ok_or_else(|| AppError::NotFound(format!("feed with url {}", url)))
    }

    pub async fn get_feeds(&self) -> Result<Vec<FeedWithOwner>> {
        let feeds = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {}, u.name FROM feeds f JOIN users u ON f.user_id = u.id ORDER BY f.name",
                    FEED_COLUMNS
                ))?;
                let feeds = stmt
                    .query_map([], |row| {
                        Ok(FeedWithOwner {
                            feed: feed_from_row(row)?,
                            owner_name: row.get(7)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(feeds)
            })
            .await?;
        Ok(feeds)
    }

    // Follow operations

    pub async fn create_feed_follow(&self, feed_id: i64, user_id: i64) -> Result<FeedFollow> {
        let stamp = timestamp(&stored_now());
        let follow = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                    params![user_id, feed_id, stamp],
                )?;
                let id = conn.last_insert_rowid();
                let follow = conn.query_row(
                    &format!("{} WHERE ff.id = ?1", FOLLOW_SELECT),
                    params![id],
                    follow_from_row,
                )?;
                Ok(follow)
            })
            .await
            .map_err(|e| conflict_or(e, "feed follow".to_string()))?;
        Ok(follow)
    }

    pub async fn remove_feed_follow(&self, feed_id: i64, user_id: i64) -> Result<()> {
        let removed = self
            .conn
            .call(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM feed_follows WHERE feed_id = ?1 AND user_id = ?2",
                    params![feed_id, user_id],
                )?;
                Ok(removed)
            })
            .await?;
        if removed == 0 {
            return Err(AppError::NotFound("feed follow".to_string()));
        }
        Ok(())
    }

    pub async fn get_feed_follows_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>> {
        let follows = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("{} WHERE ff.user_id = ?1 ORDER BY f.name", FOLLOW_SELECT))?;
                let follows = stmt
                    .query_map(params![user_id], follow_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(follows)
            })
            .await?;
        Ok(follows)
    }

    // Post operations

    /// Newest posts first from the feeds `user_id` follows.
    pub async fn get_posts_for_user(&self, user_id: i64, limit: u32) -> Result<Vec<PostWithFeed>> {
        let posts = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at,
                              p.created_at, p.updated_at, f.name
                       FROM posts p
                       JOIN feed_follows ff ON ff.feed_id = p.feed_id
                       JOIN feeds f ON f.id = p.feed_id
                       WHERE ff.user_id = ?1
                       ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC
                       LIMIT ?2"#,
                )?;
                let posts = stmt
                    .query_map(params![user_id, limit], |row| {
                        Ok(PostWithFeed {
                            post: post_from_row(row)?,
                            feed_name: row.get(8)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(posts)
            })
            .await?;
        Ok(posts)
    }

    #[cfg(test)]
    pub async fn count_posts(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    #[cfg(test)]
    pub async fn get_feed(&self, id: i64) -> Result<Feed> {
        let feed = self
            .conn
            .call(move |conn| {
                let feed = conn.query_row(
                    &format!("SELECT {} FROM feeds f WHERE f.id = ?1", FEED_COLUMNS),
                    params![id],
                    feed_from_row,
                )?;
                Ok(feed)
            })
            .await?;
        Ok(feed)
    }
}

#[async_trait]
impl FeedStore for Repository {
    async fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        let feed = self
            .conn
            .call(|conn| {
                let feed = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM feeds f ORDER BY f.last_fetched_at ASC NULLS FIRST, f.id ASC LIMIT 1",
                            FEED_COLUMNS
                        ),
                        [],
                        feed_from_row,
                    )
                    .optional()?;
                Ok(feed)
            })
            .await?;
        Ok(feed)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let now = stored_now();
        let stamp = timestamp(&now);
        let row = post.clone();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)"#,
                    params![
                        row.feed_id,
                        row.title,
                        row.url,
                        row.description,
                        row.published_at.as_ref().map(timestamp),
                        stamp,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| conflict_or(e, format!("post with url {}", post.url)))?;

        Ok(Post {
            id,
            feed_id: post.feed_id,
            title: post.title,
            url: post.url,
            description: post.description,
            published_at: post.published_at,
            created_at: now,
            updated_at: now,
        })
    }

    async fn mark_feed_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        let stamp = timestamp(&at);
        let updated = self
            .conn
            .call(move |conn| {
                let updated = conn.execute(
                    "UPDATE feeds SET last_fetched_at = ?1, updated_at = ?1 WHERE id = ?2",
                    params![stamp, feed_id],
                )?;
                Ok(updated)
            })
            .await?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("feed {}", feed_id)));
        }
        Ok(())
    }
}

fn conflict_or(err: tokio_rusqlite::Error, what: String) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict(what)
    } else {
        AppError::Database(err)
    }
}

/// Fixed-width UTC text, so lexical order in SQL matches time order.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The current time at the precision `timestamp` keeps.
fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn parse_datetime(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        // SQLite datetime('now') format
        Err(_) => chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|n| n.and_utc()),
    }
}

fn conversion_error(idx: usize, err: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn required_datetime(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).map_err(|e| conversion_error(idx, e))
}

fn optional_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_datetime(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: required_datetime(row, 2)?,
        updated_at: required_datetime(row, 3)?,
    })
}

fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
    Ok(Feed {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        user_id: row.get(3)?,
        created_at: required_datetime(row, 4)?,
        updated_at: required_datetime(row, 5)?,
        last_fetched_at: optional_datetime(row, 6)?,
    })
}

fn follow_from_row(row: &Row) -> rusqlite::Result<FeedFollow> {
    Ok(FeedFollow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        feed_id: row.get(2)?,
        created_at: required_datetime(row, 3)?,
        updated_at: required_datetime(row, 4)?,
        user_name: row.get(5)?,
        feed_name: row.get(6)?,
    })
}

fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        description: row.get(4)?,
        published_at: optional_datetime(row, 5)?,
        created_at: required_datetime(row, 6)?,
        updated_at: required_datetime(row, 7)?,
    })
}

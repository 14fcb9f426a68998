use url::Url;

use crate::app::State;
use crate::error::{AppError, Result};
use crate::models::{Feed, NewFeed, User};

use super::{Command, SEPARATOR};

/// Adds a feed owned by `user` and follows it on their behalf.
pub async fn add_feed(state: &mut State, cmd: Command, user: User) -> Result<()> {
    cmd.expect_args(2..=2, "<name> <url>")?;
    let name = cmd.args[0].trim();
    let url = parse_feed_url(&cmd.args[1])?;

    if name.is_empty() {
        return Err(AppError::Validation("feed name must not be empty".to_string()));
    }

    let feed = state
        .repository
        .create_feed(NewFeed {
            name: name.to_string(),
            url,
            user_id: user.id,
        })
        .await?;
    let follow = state.repository.create_feed_follow(feed.id, user.id).await?;
    tracing::info!(feed = %feed.name, user = %follow.user_name, "Added feed");

    println!("Feed has been created:");
    print_feed(&feed);
    println!("{}", SEPARATOR);
    println!("Feed follow has been created:");
    println!("* User:          {}", follow.user_name);
    println!("* Feed:          {}", follow.feed_name);
    Ok(())
}

pub async fn list(state: &mut State, cmd: Command) -> Result<()> {
    cmd.expect_args(0..=0, "")?;
    let feeds = state.repository.get_feeds().await?;

    if feeds.is_empty() {
        println!("No feeds found.");
        return Ok(());
    }

    for entry in &feeds {
        println!("Feed-------------------------------");
        println!("* Name:          {}", entry.feed.name);
        println!("* URL:           {}", entry.feed.url);
        println!("* User:          {}", entry.owner_name);
    }
    Ok(())
}

/// Feed URLs must be absolute http(s) URLs.
fn parse_feed_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::Validation(format!("invalid feed url {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(AppError::Validation(format!(
            "unsupported url scheme {:?}, expected http or https",
            other
        ))),
    }
}

fn print_feed(feed: &Feed) {
    println!("* ID:            {}", feed.id);
    println!("* Created:       {}", feed.created_at);
    println!("* Updated:       {}", feed.updated_at);
    println!("* Name:          {}", feed.name);
    println!("* URL:           {}", feed.url);
    println!("* UserID:        {}", feed.user_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn logged_in_state(name: &str) -> (State, User, tempfile::TempDir) {
        let (mut state, dir) = State::in_memory().await;
        let user = state.repository.create_user(name).await.unwrap();
        state.config.set_user(name).unwrap();
        (state, user, dir)
    }

    fn addfeed(name: &str, url: &str) -> Command {
        Command::new("addfeed", vec![name.to_string(), url.to_string()])
    }

    #[tokio::test]
    async fn add_feed_creates_feed_and_follow() {
        let (mut state, alice, _dir) = logged_in_state("alice").await;

        add_feed(&mut state, addfeed("Example", "http://example.com/rss"), alice.clone())
            .await
            .unwrap();

        let feeds = state.repository.get_feeds().await.unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].feed.name, "Example");
        assert_eq!(feeds[0].feed.url, "http://example.com/rss");
        assert_eq!(feeds[0].owner_name, "alice");

        let follows = state.repository.get_feed_follows_for_user(alice.id).await.unwrap();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].feed_id, feeds[0].feed.id);
    }

    #[tokio::test]
    async fn add_feed_with_known_url_is_conflict() {
        let (mut state, alice, _dir) = logged_in_state("alice").await;
        add_feed(&mut state, addfeed("One", "http://example.com/rss"), alice.clone())
            .await
            .unwrap();

        let err = add_feed(&mut state, addfeed("Two", "http://example.com/rss"), alice)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(state.repository.get_feeds().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_feed_rejects_bad_urls() {
        let (mut state, alice, _dir) = logged_in_state("alice").await;

        for url in ["not a url", "ftp://example.com/rss", "/relative/rss"] {
            let err = add_feed(&mut state, addfeed("Bad", url), alice.clone())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{}", url);
        }
        assert!(state.repository.get_feeds().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_feed_needs_name_and_url() {
        let (mut state, alice, _dir) = logged_in_state("alice").await;
        let err = add_feed(
            &mut state,
            Command::new("addfeed", vec!["Only name".to_string()]),
            alice,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "usage: addfeed <name> <url>");
    }
}

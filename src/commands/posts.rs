use crate::app::State;
use crate::error::Result;
use crate::models::{PostWithFeed, User};

use super::{Command, SEPARATOR};

const DEFAULT_BROWSE_LIMIT: u32 = 2;

pub async fn browse(state: &mut State, cmd: Command, user: User) -> Result<()> {
    cmd.expect_args(0..=1, "[limit]")?;
    let limit = browse_limit(cmd.arg(0));

    let posts = state.repository.get_posts_for_user(user.id, limit).await?;

    if posts.is_empty() {
        println!("No posts found for this user.");
        return Ok(());
    }

    println!(
        "Here are the {} most recent posts for the feeds {} follows:",
        posts.len(),
        user.name
    );
    for post in &posts {
        print_post(post);
        println!("{}", SEPARATOR);
    }
    Ok(())
}

/// An unparseable limit falls back to the default rather than failing.
fn browse_limit(raw: Option<&str>) -> u32 {
    match raw.map(str::parse::<u32>) {
        None => DEFAULT_BROWSE_LIMIT,
        Some(Ok(limit)) => limit,
        Some(Err(e)) => {
            tracing::warn!(
                "Failed to parse limit {:?}, using default of {}: {}",
                raw.unwrap_or_default(),
                DEFAULT_BROWSE_LIMIT,
                e
            );
            DEFAULT_BROWSE_LIMIT
        }
    }
}

fn print_post(entry: &PostWithFeed) {
    let post = &entry.post;
    println!("* Feed:          {}", entry.feed_name);
    match post.published_at {
        Some(at) => println!("* Published At:  {}", at.format("%d %b %y %H:%M UTC")),
        None => println!("* Published At:  unknown"),
    }
    println!("* Title:         {}", post.title);
    println!("* URL:           {}", post.url);
    println!(
        "* Description:   {}",
        post.description.as_deref().unwrap_or_default()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FeedStore;
    use crate::models::{NewFeed, NewPost};

    #[test]
    fn limit_defaults_and_falls_back() {
        assert_eq!(browse_limit(None), 2);
        assert_eq!(browse_limit(Some("5")), 5);
        assert_eq!(browse_limit(Some("lots")), 2);
        assert_eq!(browse_limit(Some("-1")), 2);
    }

    #[tokio::test]
    async fn browse_with_no_posts_is_ok() {
        let (mut state, _dir) = State::in_memory().await;
        let alice = state.repository.create_user("alice").await.unwrap();

        browse(&mut state, Command::new("browse", vec![]), alice.clone())
            .await
            .unwrap();

        assert!(state
            .repository
            .get_posts_for_user(alice.id, DEFAULT_BROWSE_LIMIT)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn browse_reads_followed_posts() {
        let (mut state, _dir) = State::in_memory().await;
        let alice = state.repository.create_user("alice").await.unwrap();
        let feed = state
            .repository
            .create_feed(NewFeed {
                name: "Example".to_string(),
                url: "http://example.com/rss".to_string(),
                user_id: alice.id,
            })
            .await
            .unwrap();
        state.repository.create_feed_follow(feed.id, alice.id).await.unwrap();
        state
            .repository
            .create_post(NewPost {
                feed_id: feed.id,
                title: "Hello".to_string(),
                url: "http://example.com/1".to_string(),
                description: None,
                published_at: None,
            })
            .await
            .unwrap();

        browse(&mut state, Command::new("browse", vec!["10".to_string()]), alice)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn browse_rejects_extra_arguments() {
        let (mut state, _dir) = State::in_memory().await;
        let alice = state.repository.create_user("alice").await.unwrap();
        let args = vec!["1".to_string(), "2".to_string()];
        assert!(browse(&mut state, Command::new("browse", args), alice).await.is_err());
    }
}

use crate::app::State;
use crate::error::Result;
use crate::models::User;

use super::{Command, SEPARATOR};

pub async fn follow(state: &mut State, cmd: Command, user: User) -> Result<()> {
    cmd.expect_args(1..=1, "<url>")?;
    let feed = state.repository.get_feed_by_url(&cmd.args[0]).await?;
    let follow = state.repository.create_feed_follow(feed.id, user.id).await?;

    println!("Feed follow has been created:");
    println!("* User:          {}", follow.user_name);
    println!("* Feed:          {}", follow.feed_name);
    println!("{}", SEPARATOR);
    Ok(())
}

pub async fn unfollow(state: &mut State, cmd: Command, user: User) -> Result<()> {
    cmd.expect_args(1..=1, "<url>")?;
    let feed = state.repository.get_feed_by_url(&cmd.args[0]).await?;
    state.repository.remove_feed_follow(feed.id, user.id).await?;

    println!("Unfollowed {}", feed.name);
    Ok(())
}

pub async fn following(state: &mut State, cmd: Command, user: User) -> Result<()> {
    cmd.expect_args(0..=0, "")?;
    let follows = state.repository.get_feed_follows_for_user(user.id).await?;

    if follows.is_empty() {
        println!("No feed follows found for this user.");
        return Ok(());
    }

    println!("{} is following these feeds:", user.name);
    for follow in &follows {
        println!("* {}", follow.feed_name);
    }
    Ok(())
}

use crate::app::State;
use crate::error::Result;
use crate::models::User;

use super::{Command, SEPARATOR};

pub async fn login(state: &mut State, cmd: Command) -> Result<()> {
    cmd.expect_args(1..=1, "<username>")?;
    let name = &cmd.args[0];

    let user = state.repository.get_user_by_name(name).await?;
    state.config.set_user(&user.name)?;

    println!("Username '{}' has been set", user.name);
    Ok(())
}

pub async fn register(state: &mut State, cmd: Command) -> Result<()> {
    cmd.expect_args(1..=1, "<username>")?;
    let name = &cmd.args[0];

    let user = state.repository.create_user(name).await?;
    state.config.set_user(&user.name)?;
    tracing::info!(user = %user.name, "Registered user");

    println!("User has been created:");
    print_user(&user);
    println!("{}", SEPARATOR);
    Ok(())
}

pub async fn reset(state: &mut State, cmd: Command) -> Result<()> {
    cmd.expect_args(0..=0, "")?;
    state.repository.clear_users().await?;

    println!("Cleared the users table");
    Ok(())
}

pub async fn list(state: &mut State, cmd: Command) -> Result<()> {
    cmd.expect_args(0..=0, "")?;
    let users = state.repository.get_users().await?;

    if users.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    let current = state.current_user_name();
    for user in &users {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}

fn print_user(user: &User) {
    println!(" * ID:      {}", user.id);
    println!(" * Name:    {}", user.name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn cmd(name: &str, args: &[&str]) -> Command {
        Command::new(name, args.iter().map(|a| a.to_string()).collect())
    }

    #[tokio::test]
    async fn register_creates_user_and_logs_in() {
        let (mut state, _dir) = State::in_memory().await;

        register(&mut state, cmd("register", &["alice"])).await.unwrap();

        assert_eq!(state.current_user_name(), Some("alice"));
        assert!(state.repository.get_user_by_name("alice").await.is_ok());
    }

    #[tokio::test]
    async fn register_twice_is_conflict_and_keeps_session() {
        let (mut state, _dir) = State::in_memory().await;
        register(&mut state, cmd("register", &["alice"])).await.unwrap();
        register(&mut state, cmd("register", &["bob"])).await.unwrap();

        let err = register(&mut state, cmd("register", &["alice"])).await.unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(state.current_user_name(), Some("bob"));
    }

    #[tokio::test]
    async fn login_requires_existing_user() {
        let (mut state, _dir) = State::in_memory().await;

        let err = login(&mut state, cmd("login", &["ghost"])).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(state.current_user_name(), None);
    }

    #[tokio::test]
    async fn login_switches_session() {
        let (mut state, _dir) = State::in_memory().await;
        register(&mut state, cmd("register", &["alice"])).await.unwrap();
        register(&mut state, cmd("register", &["bob"])).await.unwrap();

        login(&mut state, cmd("login", &["alice"])).await.unwrap();

        assert_eq!(state.current_user_name(), Some("alice"));
    }

    #[tokio::test]
    async fn login_without_name_is_validation_error() {
        let (mut state, _dir) = State::in_memory().await;
        let err = login(&mut state, cmd("login", &[])).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn reset_removes_all_users() {
        let (mut state, _dir) = State::in_memory().await;
        register(&mut state, cmd("register", &["alice"])).await.unwrap();

        reset(&mut state, cmd("reset", &[])).await.unwrap();

        assert!(state.repository.get_users().await.unwrap().is_empty());
    }
}

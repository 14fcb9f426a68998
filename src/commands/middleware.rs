use std::rc::Rc;

use crate::app::State;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::User;

use super::{handler, Command, HandlerFuture};

/// Looks up the session user. An unset name and an unknown name both fail
/// with `Unauthenticated`.
pub async fn resolve_current_user(session_user: Option<&str>, repo: &Repository) -> Result<User> {
    let name = session_user.ok_or(AppError::Unauthenticated)?;
    match repo.get_user_by_name(name).await {
        Ok(user) => Ok(user),
        Err(AppError::NotFound(_)) => {
            tracing::debug!(user = name, "Session user no longer exists");
            Err(AppError::Unauthenticated)
        }
        Err(e) => Err(e),
    }
}

/// Wraps a handler that needs the current user. The wrapped handler only
/// runs once the session user has been resolved.
pub fn logged_in<F>(inner: F) -> impl for<'a> Fn(&'a mut State, Command) -> HandlerFuture<'a> + 'static
where
    F: for<'a> Fn(&'a mut State, Command, User) -> HandlerFuture<'a> + 'static,
{
    let inner = Rc::new(inner);
    handler(move |state, cmd| {
        let inner = Rc::clone(&inner);
        Box::pin(async move {
            let user = resolve_current_user(state.current_user_name(), &state.repository).await?;
            (*inner)(state, cmd, user).await
        })
    })
}

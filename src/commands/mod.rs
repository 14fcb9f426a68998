//! Command registry and dispatch.
//!
//! Every CLI command is a named handler taking the shared [`State`] and the
//! raw arguments. Handlers that need a logged in user are wrapped with
//! [`logged_in`] at registration time.

mod agg;
mod feeds;
mod follows;
mod middleware;
mod posts;
mod users;

use std::collections::HashMap;
use std::ops::RangeInclusive;

use futures::future::LocalBoxFuture;

use crate::app::State;
use crate::error::{AppError, Result};

use middleware::logged_in;

pub type HandlerFuture<'a> = LocalBoxFuture<'a, Result<()>>;

pub type Handler = Box<dyn for<'a> Fn(&'a mut State, Command) -> HandlerFuture<'a>>;

/// A command name plus its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Builds a command from process arguments, program name already skipped.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let name = args.next().ok_or_else(|| {
            AppError::Validation(
                "not enough arguments, expected a command name".to_string(),
            )
        })?;
        Ok(Self::new(name, args.collect()))
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Fails with a usage message unless the argument count is in `allowed`.
    pub fn expect_args(&self, allowed: RangeInclusive<usize>, usage: &str) -> Result<()> {
        if allowed.contains(&self.args.len()) {
            Ok(())
        } else {
            let usage = format!("usage: {} {}", self.name, usage);
            Err(AppError::Validation(usage.trim_end().to_string()))
        }
    }
}

/// Name to handler table.
#[derive(Default)]
pub struct Commands {
    handlers: HashMap<String, Handler>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: for<'a> Fn(&'a mut State, Command) -> HandlerFuture<'a> + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub async fn run(&self, state: &mut State, cmd: Command) -> Result<()> {
        let handler = self
            .handlers
            .get(&cmd.name)
            .ok_or_else(|| AppError::UnknownCommand(cmd.name.clone()))?;
        tracing::debug!(command = %cmd.name, args = ?cmd.args, "Dispatching");
        handler(state, cmd).await
    }
}

/// The full command set of the CLI.
pub fn registry() -> Commands {
    let mut cmds = Commands::new();

    cmds.register("login", |s, c| Box::pin(users::login(s, c)));
    cmds.register("register", |s, c| Box::pin(users::register(s, c)));
    cmds.register("reset", |s, c| Box::pin(users::reset(s, c)));
    cmds.register("users", |s, c| Box::pin(users::list(s, c)));
    cmds.register("agg", |s, c| Box::pin(agg::agg(s, c)));
    cmds.register("feeds", |s, c| Box::pin(feeds::list(s, c)));
    cmds.register(
        "addfeed",
        logged_in(|s, c, u| Box::pin(feeds::add_feed(s, c, u))),
    );
    cmds.register(
        "follow",
        logged_in(|s, c, u| Box::pin(follows::follow(s, c, u))),
    );
    cmds.register(
        "unfollow",
        logged_in(|s, c, u| Box::pin(follows::unfollow(s, c, u))),
    );
    cmds.register(
        "following",
        logged_in(|s, c, u| Box::pin(follows::following(s, c, u))),
    );
    cmds.register(
        "browse",
        logged_in(|s, c, u| Box::pin(posts::browse(s, c, u))),
    );

    cmds
}

/// Pins down the higher-ranked signature of a handler closure.
fn handler<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut State, Command) -> HandlerFuture<'a>,
{
    f
}

const SEPARATOR: &str = "=========================================";

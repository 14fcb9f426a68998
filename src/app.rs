use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;

/// Everything a command handler may read or change.
pub struct State {
    /// Holds the session: `current_user_name` is the logged in user.
    pub config: Config,
    pub repository: Repository,
}

impl State {
    pub async fn new(config: Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        Ok(Self { config, repository })
    }

    pub fn current_user_name(&self) -> Option<&str> {
        self.config.current_user_name()
    }
}

#[cfg(test)]
impl State {
    /// A state backed by an in-memory database and a throwaway config file.
    pub async fn in_memory() -> (Self, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        let repository = Repository::open_in_memory().await.unwrap();
        (Self { config, repository }, dir)
    }
}

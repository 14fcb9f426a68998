use std::time::Duration;

use crate::app::State;
use crate::error::{AppError, Result};
use crate::feed::{FeedFetcher, Scheduler, SystemClock};

use super::Command;

/// Runs the fetch scheduler. Only returns when a cycle limit is given.
pub async fn agg(state: &mut State, cmd: Command) -> Result<()> {
    cmd.expect_args(1..=2, "<time_between_requests> [max_cycles]")?;
    let every = parse_interval(&cmd.args[0])?;
    let max_cycles = cmd.arg(1).map(parse_max_cycles).transpose()?;

    let fetcher = FeedFetcher::new()?;
    let scheduler = Scheduler::new(&state.repository, fetcher, SystemClock);

    println!("Collecting feeds every {:?}", every);
    tracing::info!(interval = ?every, max_cycles = ?max_cycles, "Starting feed aggregation");
    scheduler.run(every, max_cycles).await;
    Ok(())
}

fn parse_interval(raw: &str) -> Result<Duration> {
    let every = duration_str::parse(raw)
        .map_err(|e| AppError::Validation(format!("invalid interval {:?}: {}", raw, e)))?;
    if every.is_zero() {
        return Err(AppError::Validation("interval must be greater than zero".to_string()));
    }
    Ok(every)
}

fn parse_max_cycles(raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid cycle limit {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_strings() {
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn rejects_bad_or_zero_intervals() {
        assert!(matches!(parse_interval("soon"), Err(AppError::Validation(_))));
        assert!(matches!(parse_interval("0s"), Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_bad_cycle_limit() {
        assert_eq!(parse_max_cycles("3").unwrap(), 3);
        assert!(parse_max_cycles("many").is_err());
    }

    #[tokio::test]
    async fn agg_without_interval_is_validation_error() {
        let (mut state, _dir) = State::in_memory().await;
        let err = agg(&mut state, Command::new("agg", vec![])).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn agg_with_no_feeds_returns_after_limit() {
        let (mut state, _dir) = State::in_memory().await;
        let args = vec!["1ms".to_string(), "2".to_string()];
        agg(&mut state, Command::new("agg", args)).await.unwrap();
    }
}

mod fetcher;
mod ingest;
mod scheduler;

pub use fetcher::FeedFetcher;
pub use scheduler::{Scheduler, SystemClock};

pub mod config;
pub mod monitoring;
pub mod scraper;

pub use scraper::error::{ErrorKind, ScraperError};
pub use scraper::models::{Match, OddsMap};
pub use scraper::Scraper;

pub mod config;
pub mod infer;
pub mod parser;
pub mod scraper;
pub mod types;
pub mod utils;

pub use config::{CrawlConfig, EmitMode};
pub use infer::infer;
pub use scraper::{CrawlOutcome, ScraperError, WebScraper};
pub use types::{MpRecord, ProfileTags};

pub const THEYWORKFORYOU_DOMAIN: &str = "theyworkforyou.com";
pub const PARLIAMENT_DOMAIN: &str = "members.parliament.uk";

pub(crate) const SEED_URLS: [&str; 2] = [
    "https://www.theyworkforyou.com/mps/",
    "https://members.parliament.uk/constituencies",
];

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::{ConfigError, CrawlConfig, EmitMode};
use crate::parser::{
    ParseError, classify, extract_links, parse_event_text, parse_profile, parse_url,
};
use crate::types::{FetchRequest, MpRecord, PageKind, Source};
use crate::utils::CrawlStats;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("None of the seed URLs is a recognised listing page")]
    NoUsableSeeds,
}

#[derive(Debug)]
pub struct CrawlOutcome {
    pub records: Vec<MpRecord>,
    pub stats: CrawlStats,
}

#[derive(Debug, Default)]
struct ProfileOutcome {
    records: Vec<MpRecord>,
    events_processed: usize,
    events_failed: usize,
    events_rejected: usize,
}

#[derive(Debug)]
enum PageOutcome {
    Links(Vec<FetchRequest>),
    Profile(ProfileOutcome),
}

/// Pending requests for one crawl. Every URL is queued at most once and only
/// when it is inside the allowlist.
#[derive(Debug, Default)]
pub(crate) struct Frontier {
    queue: VecDeque<FetchRequest>,
    seen: HashSet<Url>,
    profiles_scheduled: usize,
}

impl Frontier {
    pub(crate) fn push(
        &mut self,
        request: FetchRequest,
        config: &CrawlConfig,
        stats: &mut CrawlStats,
    ) -> bool {
        if !config.is_allowed(&request.url) {
            log::debug!("Ignoring off-site link {}", request.url);
            stats.links_rejected += 1;
            return false;
        }

        let is_profile = matches!(request.kind, PageKind::MpProfile(_));
        if is_profile
            && config
                .max_profiles
                .is_some_and(|max| self.profiles_scheduled >= max)
        {
            log::debug!("Profile limit reached, skipping {}", request.url);
            return false;
        }

        if !self.seen.insert(request.url.clone()) {
            return false;
        }

        if is_profile {
            self.profiles_scheduled += 1;
        }
        log::debug!("Queued {} {}", request.kind, request.url);
        self.queue.push_back(request);
        true
    }

    pub(crate) fn pop(&mut self) -> Option<FetchRequest> {
        self.queue.pop_front()
    }
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    config: CrawlConfig,
}

impl WebScraper {
    pub fn new(config: CrawlConfig) -> Result<Self, ScraperError> {
        let config = config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawls from the configured seeds until no requests remain.
    ///
    /// Individual page failures are logged and counted in the returned stats;
    /// they never end the crawl early.
    pub async fn crawl(&self) -> Result<CrawlOutcome, ScraperError> {
        let mut requests = Vec::new();
        for seed in &self.config.seeds {
            match classify(seed) {
                Some(kind) => requests.push(FetchRequest::new(seed.clone(), kind)),
                None => log::warn!("Seed {} is not a recognised listing page, skipping", seed),
            }
        }

        if requests.is_empty() {
            return Err(ScraperError::NoUsableSeeds);
        }

        Ok(self.crawl_from(requests).await)
    }

    /// Runs the crawl loop starting from already classified requests.
    pub(crate) async fn crawl_from(&self, requests: Vec<FetchRequest>) -> CrawlOutcome {
        let mut stats = CrawlStats::default();
        let mut records = Vec::new();
        let mut frontier = Frontier::default();

        for request in requests {
            frontier.push(request, &self.config, &mut stats);
        }

        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < self.config.concurrency
                && let Some(request) = frontier.pop()
            {
                in_flight.push(async move {
                    let result = self.process(&request).await;
                    (request, result)
                });
            }

            let Some((request, result)) = in_flight.next().await else {
                break;
            };

            match result {
                Ok(PageOutcome::Links(links)) => {
                    stats.pages_fetched += 1;
                    log::info!(
                        "Found {} link(s) on {} {}",
                        links.len(),
                        request.kind,
                        request.url
                    );
                    for link in links {
                        frontier.push(link, &self.config, &mut stats);
                    }
                }
                Ok(PageOutcome::Profile(outcome)) => {
                    stats.pages_fetched += 1 + outcome.events_processed;
                    stats.pages_failed += outcome.events_failed;
                    stats.links_rejected += outcome.events_rejected;
                    stats.profiles_parsed += 1;
                    stats.event_pages += outcome.events_processed;
                    stats.records += outcome.records.len();
                    records.extend(outcome.records);
                }
                Err(ScraperError::ParseError(e)) => {
                    stats.pages_fetched += 1;
                    stats.profiles_skipped += 1;
                    log::warn!("Skipping {} {}: {}", request.kind, request.url, e);
                }
                Err(e) => {
                    stats.pages_failed += 1;
                    log::warn!("Failed to fetch {} {}: {}", request.kind, request.url, e);
                }
            }
        }

        log::info!(
            "Crawl finished: {} record(s) from {} profile(s)",
            stats.records,
            stats.profiles_parsed
        );

        CrawlOutcome { records, stats }
    }

    async fn process(&self, request: &FetchRequest) -> Result<PageOutcome, ScraperError> {
        match request.kind {
            PageKind::MpProfile(source) => Ok(PageOutcome::Profile(
                self.process_profile(&request.url, source).await?,
            )),
            kind => {
                let html = self.fetch_html(&request.url).await?;
                Ok(PageOutcome::Links(extract_links(&html, &request.url, kind)))
            }
        }
    }

    /// Parses one MP profile and then walks its event pages in order. The
    /// record never leaves this task until the walk is done, so appends to its
    /// text happen one at a time.
    async fn process_profile(
        &self,
        url: &Url,
        source: Source,
    ) -> Result<ProfileOutcome, ScraperError> {
        log::info!("Fetching {} profile: {}", source, url);
        let html = self.fetch_html(url).await?;
        let mut record = parse_profile(&html, url, source)?;

        if record.name.is_empty() {
            log::warn!("No name found on {} profile {}", source, url);
        }
        log::info!("Parsed profile: {}", record);

        let mut outcome = ProfileOutcome::default();

        for event_url in record.event_urls.clone() {
            let event_url = match parse_url(&event_url) {
                Ok(url) => url,
                Err(e) => {
                    log::warn!("Skipping event page: {}", e);
                    continue;
                }
            };
            if !self.config.is_allowed(&event_url) {
                log::debug!("Ignoring off-site event page {}", event_url);
                outcome.events_rejected += 1;
                continue;
            }

            match self.fetch_html(&event_url).await {
                Ok(html) => {
                    record.absorb_event_text(&parse_event_text(&html));
                    outcome.events_processed += 1;
                    log::debug!("{} now tagged {}", record.name, record.inferred_profile);
                    if self.config.emit == EmitMode::PerEvent {
                        outcome.records.push(record.clone());
                    }
                }
                Err(e) => {
                    outcome.events_failed += 1;
                    log::warn!("Failed to fetch event page {}: {}", event_url, e);
                }
            }
        }

        if self.config.emit == EmitMode::Final {
            outcome.records.push(record);
        }

        Ok(outcome)
    }

    /// Fetches `url`, retrying timeouts, connection failures, 429 and 5xx
    /// responses with exponential backoff.
    pub async fn fetch_html(&self, url: &Url) -> Result<String, ScraperError> {
        let mut attempt = 0;
        loop {
            match self.get_html(url).await {
                Ok(html) => return Ok(html),
                Err(e) if attempt < self.config.max_retries && is_transient(&e) => {
                    let backoff = backoff_delay(self.config.retry_backoff, attempt);
                    attempt += 1;
                    log::warn!(
                        "Request to {} failed (attempt {}/{}), backing off {:.1}s: {}",
                        url,
                        attempt,
                        self.config.max_retries + 1,
                        backoff.as_secs_f64(),
                        e
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn get_html(&self, url: &Url) -> Result<String, reqwest::Error> {
        self.client
            .get(url.as_str())
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))
    }
}

/// Delay before retry number `attempt + 1`, doubling from `base` and
/// saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout()
        || error.is_connect()
        || error
            .status()
            .is_some_and(|s| s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error())
}

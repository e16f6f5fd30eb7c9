use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::types::host_in_domain;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
pub const DEFAULT_OUTPUT: &str = "ukmpprofile2.json";
pub const MAX_RETRIES: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid seed URL '{0}': {1}")]
    InvalidSeed(String, url::ParseError),
    #[error("Seed URL {0} is outside the allowed domains")]
    SeedNotAllowed(String),
    #[error("At least one seed URL is required")]
    NoSeeds,
    #[error("At least one allowed domain is required")]
    NoAllowedDomains,
    #[error("{0} must be greater than 0")]
    Zero(&'static str),
    #[error("Max retries must be at most 10, got {0}")]
    TooManyRetries(u32),
    #[error("Invalid emit mode '{0}'. Accepted values: 'final', 'per-event'")]
    EmitMode(String),
}

/// When a record is written to the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmitMode {
    /// Once per MP, after its last event page.
    #[default]
    Final,
    /// A snapshot after every processed event page.
    PerEvent,
}

impl FromStr for EmitMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "final" => Ok(EmitMode::Final),
            "per-event" | "per_event" => Ok(EmitMode::PerEvent),
            _ => Err(ConfigError::EmitMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seeds: Vec<Url>,
    pub allowed_domains: Vec<String>,
    pub user_agent: String,
    pub concurrency: usize,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub emit: EmitMode,
    pub max_profiles: Option<usize>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seeds: crate::SEED_URLS
                .iter()
                .filter_map(|s| Url::parse(s).ok())
                .collect(),
            allowed_domains: vec![
                crate::THEYWORKFORYOU_DOMAIN.to_string(),
                crate::PARLIAMENT_DOMAIN.to_string(),
            ],
            user_agent: DEFAULT_USER_AGENT.to_string(),
            concurrency: 8,
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            emit: EmitMode::Final,
            max_profiles: None,
        }
    }
}

impl CrawlConfig {
    pub fn with_seeds<I, S>(mut self, seeds: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.seeds = seeds
            .into_iter()
            .map(|s| {
                let s = s.as_ref();
                Url::parse(s).map_err(|e| ConfigError::InvalidSeed(s.to_string(), e))
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    pub fn is_allowed(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.allowed_domains
            .iter()
            .any(|domain| host_in_domain(&host, &domain.to_ascii_lowercase()))
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.seeds.is_empty() {
            return Err(ConfigError::NoSeeds);
        }
        if self.allowed_domains.is_empty() {
            return Err(ConfigError::NoAllowedDomains);
        }
        if let Some(seed) = self.seeds.iter().find(|s| !self.is_allowed(s)) {
            return Err(ConfigError::SeedNotAllowed(seed.to_string()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Zero("Concurrency"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Zero("Timeout"));
        }
        if self.max_profiles.is_some_and(|m| m == 0) {
            return Err(ConfigError::Zero("Max profiles"));
        }
        if self.max_retries > MAX_RETRIES {
            return Err(ConfigError::TooManyRetries(self.max_retries));
        }
        Ok(self)
    }
}

use std::collections::BTreeMap;

use crate::types::MpRecord;

/// Counters for a single crawl run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub profiles_parsed: usize,
    pub profiles_skipped: usize,
    pub event_pages: usize,
    pub records: usize,
    pub links_rejected: usize,
}

impl std::fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Pages fetched:      {}", self.pages_fetched)?;
        writeln!(f, "  Pages failed:       {}", self.pages_failed)?;
        writeln!(f, "  Profiles parsed:    {}", self.profiles_parsed)?;
        writeln!(f, "  Profiles skipped:   {}", self.profiles_skipped)?;
        writeln!(f, "  Event pages:        {}", self.event_pages)?;
        writeln!(f, "  Off-site links:     {}", self.links_rejected)?;
        writeln!(f, "  Records written:    {}", self.records)
    }
}

/// How many records carry each inferred label.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TagStats {
    pub labels: BTreeMap<String, usize>,
    pub untagged: usize,
}

impl TagStats {
    pub fn from_records(records: &[MpRecord]) -> TagStats {
        let mut stats = TagStats::default();
        for record in records {
            let tags = &record.inferred_profile;
            if tags.is_empty() {
                stats.untagged += 1;
                continue;
            }
            for label in tags.values.iter().chain(&tags.ideology).chain(&tags.time_focus) {
                *stats.labels.entry(label.clone()).or_default() += 1;
            }
        }
        stats
    }
}

impl std::fmt::Display for TagStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nTags:")?;
        for (label, count) in &self.labels {
            writeln!(f, "  {:<22}{}", format!("{}:", label), count)?;
        }
        writeln!(f, "  {:<22}{}", "Untagged:", self.untagged)
    }
}

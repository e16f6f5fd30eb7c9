use std::fmt::Display;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::infer::infer;

/// The two parliamentary sites an MP profile can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    TheyWorkForYou,
    Parliament,
}

impl Source {
    pub fn domain(&self) -> &'static str {
        match self {
            Source::TheyWorkForYou => crate::THEYWORKFORYOU_DOMAIN,
            Source::Parliament => crate::PARLIAMENT_DOMAIN,
        }
    }

    /// Matches the bare domain and any subdomain of it, so `www.theyworkforyou.com`
    /// maps to [`Source::TheyWorkForYou`].
    pub fn from_host(host: &str) -> Option<Source> {
        let host = host.to_ascii_lowercase();
        [Source::TheyWorkForYou, Source::Parliament]
            .into_iter()
            .find(|source| host_in_domain(&host, source.domain()))
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::TheyWorkForYou => write!(f, "TheyWorkForYou"),
            Source::Parliament => write!(f, "UK Parliament"),
        }
    }
}

pub(crate) fn host_in_domain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    /// TheyWorkForYou MP listing, links to individual MP pages.
    MpListing,
    /// members.parliament.uk constituency index, links to every constituency.
    ConstituencyIndex,
    /// A single constituency page, links to its sitting member.
    ConstituencyListing,
    MpProfile(Source),
    EventPage,
}

impl Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageKind::MpListing => write!(f, "MP listing"),
            PageKind::ConstituencyIndex => write!(f, "constituency index"),
            PageKind::ConstituencyListing => write!(f, "constituency"),
            PageKind::MpProfile(source) => write!(f, "{} MP profile", source),
            PageKind::EventPage => write!(f, "event page"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub kind: PageKind,
}

impl FetchRequest {
    pub fn new(url: Url, kind: PageKind) -> Self {
        Self { url, kind }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileTags {
    pub values: Vec<String>,
    pub ideology: Vec<String>,
    pub time_focus: Vec<String>,
}

impl ProfileTags {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.ideology.is_empty() && self.time_focus.is_empty()
    }
}

impl Display for ProfileTags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "no tags");
        }
        let families = [
            ("values", &self.values),
            ("ideology", &self.ideology),
            ("time focus", &self.time_focus),
        ];
        let rendered = families
            .iter()
            .filter(|(_, labels)| !labels.is_empty())
            .map(|(family, labels)| format!("{}: {}", family, labels.join(", ")))
            .collect::<Vec<_>>();
        write!(f, "{}", rendered.join(" | "))
    }
}

/// One MP as it appears in the output file.
///
/// `extracted_text` only ever grows, and `inferred_profile` is always derived
/// from the whole of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MpRecord {
    pub name: String,
    pub constituency: String,
    pub party: String,
    #[serde(rename = "mp_profile_url")]
    pub profile_url: String,
    #[serde(rename = "events_urls")]
    pub event_urls: Vec<String>,
    pub extracted_text: String,
    pub inferred_profile: ProfileTags,
}

impl MpRecord {
    pub fn new(profile_url: impl Into<String>) -> Self {
        Self {
            profile_url: profile_url.into(),
            ..Default::default()
        }
    }

    pub fn absorb_event_text(&mut self, text: &str) {
        self.extracted_text.push_str(text);
        self.extracted_text.push('\n');
        self.inferred_profile = infer(&self.extracted_text);
    }
}

impl Display for MpRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = if self.name.is_empty() {
            "[unnamed]"
        } else {
            self.name.as_str()
        };
        write!(f, "{}", name)?;
        match (self.party.is_empty(), self.constituency.is_empty()) {
            (false, false) => write!(f, " ({}, {})", self.party, self.constituency)?,
            (false, true) => write!(f, " ({})", self.party)?,
            (true, false) => write!(f, " ({})", self.constituency)?,
            (true, true) => {}
        }
        write!(
            f,
            ", {} event page(s), {}",
            self.event_urls.len(),
            self.inferred_profile
        )
    }
}

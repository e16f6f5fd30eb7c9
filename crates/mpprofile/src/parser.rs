use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::types::{FetchRequest, MpRecord, PageKind, Source};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse URL: {0}")]
    UrlParse(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classifies a seed URL from its domain and path alone.
///
/// Pages reached by following links carry the kind they were requested with,
/// so anything that is not one of the two listing entry points is `None`.
pub fn classify(url: &Url) -> Option<PageKind> {
    let source = Source::from_host(url.host_str()?)?;
    let path = url.path().to_ascii_lowercase();

    match source {
        Source::TheyWorkForYou if path.starts_with("/mps") => Some(PageKind::MpListing),
        Source::Parliament if path.starts_with("/constituencies") => {
            Some(PageKind::ConstituencyIndex)
        }
        _ => None,
    }
}

pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Resolves every `href` matched by `selector`, keeping first-seen order and
/// dropping repeats.
fn collect_links<'a, F>(
    document: &'a Html,
    selector: &Selector,
    base: &Url,
    mut keep: F,
) -> Vec<Url>
where
    F: FnMut(&'a str) -> bool,
{
    let mut seen = HashSet::new();

    document
        .select(selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| keep(*href))
        .filter_map(|href| resolve_link(base, href))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Emits the follow-up requests for a listing-type page. Profile and event
/// pages are not link sources and yield nothing here.
pub fn extract_links(html: &str, url: &Url, kind: PageKind) -> Vec<FetchRequest> {
    let document = Html::parse_document(html);

    match kind {
        PageKind::MpListing => {
            let selector = Selector::parse("div#container li a[href]").unwrap();
            collect_links(&document, &selector, url, |href| href.contains("/mp/"))
                .into_iter()
                .map(|u| FetchRequest::new(u, PageKind::MpProfile(Source::TheyWorkForYou)))
                .collect()
        }
        PageKind::ConstituencyIndex => {
            let selector = Selector::parse("a[href*='/constituency/']").unwrap();
            collect_links(&document, &selector, url, |_| true)
                .into_iter()
                .map(|u| FetchRequest::new(u, PageKind::ConstituencyListing))
                .collect()
        }
        PageKind::ConstituencyListing => {
            let selector = Selector::parse("a[href*='/member/']").unwrap();
            document
                .select(&selector)
                .filter_map(|a| a.value().attr("href"))
                .next()
                .and_then(|href| resolve_link(url, href))
                .map(|u| FetchRequest::new(u, PageKind::MpProfile(Source::Parliament)))
                .into_iter()
                .collect()
        }
        PageKind::MpProfile(_) | PageKind::EventPage => Vec::new(),
    }
}

pub fn parse_profile(html: &str, url: &Url, source: Source) -> Result<MpRecord, ParseError> {
    let document = Html::parse_document(html);
    match source {
        Source::TheyWorkForYou => parse_twfy_profile(&document, url),
        Source::Parliament => Ok(parse_parliament_profile(&document, url)),
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).unwrap();
    document
        .select(&selector)
        .next()
        .map(|e| normalize_whitespace(&elem_text(e)))
}

/// `/mp/<id>` prefix of a TheyWorkForYou profile path, if it has one.
fn mp_path_prefix(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some("mp"), Some(id)) => Some(format!("/mp/{}", id)),
        _ => None,
    }
}

fn parse_twfy_profile(document: &Html, url: &Url) -> Result<MpRecord, ParseError> {
    let name = first_text(document, "h1")
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ParseError::MissingField("name".to_string()))?;

    let party = first_text(document, ".person .affiliation").unwrap_or_default();
    let constituency = first_text(document, ".person .constituency").unwrap_or_default();

    let own_prefix = mp_path_prefix(url);
    let event_selector = Selector::parse("a[href*='/mp/'][href*='section']").unwrap();
    let event_urls = collect_links(document, &event_selector, url, |_| true)
        .into_iter()
        .filter(|event| match &own_prefix {
            Some(prefix) => {
                event.path() == prefix.as_str()
                    || event.path().starts_with(&format!("{}/", prefix))
            }
            None => true,
        })
        .map(String::from)
        .collect();

    Ok(MpRecord {
        name,
        party,
        constituency,
        event_urls,
        ..MpRecord::new(url.as_str())
    })
}

/// Text of the `dd` describing the first `dt` whose label contains `term`.
///
/// Falls back to the first `dd` of a `dl` whose text mentions `term`, which
/// covers lists that omit `dt` labels.
fn definition_value(document: &Html, term: &str) -> Option<String> {
    let dt_selector = Selector::parse("dt").unwrap();
    let from_dt = document
        .select(&dt_selector)
        .filter(|dt| elem_text(*dt).contains(term))
        .find_map(|dt| {
            dt.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "dd")
        })
        .map(|dd| normalize_whitespace(&elem_text(dd)));

    if from_dt.is_some() {
        return from_dt;
    }

    let dl_selector = Selector::parse("dl").unwrap();
    let dd_selector = Selector::parse("dd").unwrap();
    document
        .select(&dl_selector)
        .filter(|dl| elem_text(*dl).contains(term))
        .find_map(|dl| dl.select(&dd_selector).next())
        .map(|dd| normalize_whitespace(&elem_text(dd)))
}

fn parse_parliament_profile(document: &Html, url: &Url) -> MpRecord {
    let name = first_text(document, "h1").unwrap_or_default();
    let party = definition_value(document, "Party").unwrap_or_default();
    let constituency = definition_value(document, "Constituency").unwrap_or_default();

    let event_selector = Selector::parse("a[href*='Activity'], a[href*='Speech']").unwrap();
    let event_urls = collect_links(document, &event_selector, url, |_| true)
        .into_iter()
        .map(String::from)
        .collect();

    MpRecord {
        name,
        party,
        constituency,
        event_urls,
        ..MpRecord::new(url.as_str())
    }
}

/// Visible text of an event or speech page: every paragraph and `div.content`
/// block in document order, joined by single spaces.
pub fn parse_event_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = Selector::parse("p, div.content").unwrap();

    document
        .select(&selector)
        .map(|e| {
            // Paragraphs nested in a content block are selected on their own,
            // so the block only contributes its direct text.
            if e.value().name() == "p" {
                normalize_whitespace(&elem_text(e))
            } else {
                let direct = e
                    .children()
                    .filter_map(|c| c.value().as_text().map(|t| &**t))
                    .collect::<Vec<_>>()
                    .join(" ");
                normalize_whitespace(&direct)
            }
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

pub fn parse_url(raw: &str) -> Result<Url, ParseError> {
    Url::parse(raw).map_err(|e| ParseError::UrlParse(format!("{}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("Failed to parse test URL")
    }

    #[test]
    fn test_classify_seeds() {
        assert_eq!(
            classify(&url("https://www.theyworkforyou.com/mps/")),
            Some(PageKind::MpListing)
        );
        assert_eq!(
            classify(&url("https://members.parliament.uk/constituencies")),
            Some(PageKind::ConstituencyIndex)
        );
    }

    #[test]
    fn test_classify_dead_ends() {
        assert_eq!(classify(&url("https://www.theyworkforyou.com/debates/")), None);
        assert_eq!(classify(&url("https://members.parliament.uk/member/172/contact")), None);
        assert_eq!(classify(&url("https://example.com/mps/")), None);
    }

    #[test]
    fn test_resolve_relative_link() {
        let base = url("https://example.com/mps/");
        let resolved = resolve_link(&base, "/mp/123/section").expect("Should resolve");
        assert_eq!(resolved.as_str(), "https://example.com/mp/123/section");

        let resolved = resolve_link(&base, "jane_doe#bio").expect("Should resolve");
        assert_eq!(resolved.as_str(), "https://example.com/mps/jane_doe");
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        let base = url("https://example.com/mps/");
        assert!(resolve_link(&base, "mailto:mp@parliament.uk").is_none());
        assert!(resolve_link(&base, "javascript:void(0)").is_none());
        assert!(resolve_link(&base, "#top").is_none());
        assert!(resolve_link(&base, "   ").is_none());
    }

    #[test]
    fn test_parse_url_reports_input() {
        let err = parse_url("not a url").expect_err("Should fail");
        assert!(matches!(err, ParseError::UrlParse(msg) if msg.starts_with("not a url")));
    }

    #[test]
    fn test_extract_mp_listing_links() {
        let html = r#"
            <div id="container">
                <ul>
                    <li><a href="/mp/25337/jane_doe/somewhere">Jane Doe</a></li>
                    <li><a href="/mp/10001/john_roe/elsewhere">John Roe</a></li>
                    <li><a href="/mp/25337/jane_doe/somewhere">Jane Doe (again)</a></li>
                    <li><a href="/debates/">Debates</a></li>
                </ul>
            </div>
            <ul><li><a href="/mp/99999/outside_container">Outside</a></li></ul>
        "#;
        let page = url("https://www.theyworkforyou.com/mps/");

        let requests = extract_links(html, &page, PageKind::MpListing);

        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].url.as_str(),
            "https://www.theyworkforyou.com/mp/25337/jane_doe/somewhere"
        );
        assert_eq!(
            requests[1].url.as_str(),
            "https://www.theyworkforyou.com/mp/10001/john_roe/elsewhere"
        );
        assert!(
            requests
                .iter()
                .all(|r| r.kind == PageKind::MpProfile(Source::TheyWorkForYou))
        );
    }

    #[test]
    fn test_extract_constituency_index_links() {
        let html = r#"
            <a href="/constituency/3321/overview">Aberavon</a>
            <a href="https://members.parliament.uk/constituency/3322/overview">Aberconwy</a>
            <a href="/member/172/contact">Someone</a>
        "#;
        let page = url("https://members.parliament.uk/constituencies");

        let requests = extract_links(html, &page, PageKind::ConstituencyIndex);

        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].url.as_str(),
            "https://members.parliament.uk/constituency/3321/overview"
        );
        assert!(
            requests
                .iter()
                .all(|r| r.kind == PageKind::ConstituencyListing)
        );
    }

    #[test]
    fn test_extract_constituency_member_first_only() {
        let html = r#"
            <a href="/member/4514/contact">Current member</a>
            <a href="/member/1200/contact">Former member</a>
        "#;
        let page = url("https://members.parliament.uk/constituency/3321/overview");

        let requests = extract_links(html, &page, PageKind::ConstituencyListing);

        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url.as_str(),
            "https://members.parliament.uk/member/4514/contact"
        );
        assert_eq!(requests[0].kind, PageKind::MpProfile(Source::Parliament));
    }

    #[test]
    fn test_extract_constituency_unusable_first_member_link() {
        let html = r#"
            <a href="mailto:clerk@parliament.uk?subject=/member/4514">Write to the clerk</a>
            <a href="/member/1200/contact">Former member</a>
        "#;
        let page = url("https://members.parliament.uk/constituency/3321/overview");

        // only the first member link counts, even when it cannot be followed
        assert!(extract_links(html, &page, PageKind::ConstituencyListing).is_empty());
    }

    #[test]
    fn test_extract_constituency_without_member() {
        let html = r#"<p>This seat is currently vacant.</p>"#;
        let page = url("https://members.parliament.uk/constituency/3321/overview");

        assert!(extract_links(html, &page, PageKind::ConstituencyListing).is_empty());
    }

    #[test]
    fn test_profile_and_event_pages_yield_no_links() {
        let html = r#"<div id="container"><li><a href="/mp/1/x">x</a></li></div>"#;
        let page = url("https://www.theyworkforyou.com/mp/1/x");
        assert!(
            extract_links(html, &page, PageKind::MpProfile(Source::TheyWorkForYou)).is_empty()
        );
        assert!(extract_links(html, &page, PageKind::EventPage).is_empty());
    }

    #[test]
    fn test_parse_twfy_profile_jane_doe() {
        let html = r#"
            <div class="person">
                <h1>Jane Doe</h1>
                <p><span class="affiliation">Independent</span></p>
            </div>
            <a href="/mp/25337/jane_doe/somewhere/votes?section=1">Votes</a>
            <a href="/mp/25337/jane_doe/somewhere/speeches?section=2">Speeches</a>
            <a href="/mp/10001/john_roe/elsewhere?section=1">Someone else</a>
            <a href="/mp/25337/jane_doe/somewhere/expenses">No marker</a>
        "#;
        let page = url("https://www.theyworkforyou.com/mp/25337/jane_doe/somewhere");

        let record =
            parse_profile(html, &page, Source::TheyWorkForYou).expect("Failed to parse profile");

        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.party, "Independent");
        assert_eq!(record.constituency, "");
        assert_eq!(record.profile_url, page.as_str());
        assert_eq!(
            record.event_urls,
            vec![
                "https://www.theyworkforyou.com/mp/25337/jane_doe/somewhere/votes?section=1",
                "https://www.theyworkforyou.com/mp/25337/jane_doe/somewhere/speeches?section=2",
            ]
        );
        assert_eq!(record.extracted_text, "");
        assert!(record.inferred_profile.is_empty());
    }

    #[test]
    fn test_parse_twfy_profile_missing_heading() {
        let html = r#"<div class="person"><span class="affiliation">Labour</span></div>"#;
        let page = url("https://www.theyworkforyou.com/mp/25337/jane_doe/somewhere");

        let err = parse_profile(html, &page, Source::TheyWorkForYou)
            .expect_err("Profile without a heading should fail");
        assert!(matches!(err, ParseError::MissingField(field) if field == "name"));
    }

    #[test]
    fn test_parse_twfy_profile_from_fixture() {
        let html = fs::read_to_string("fixtures/twfy_profile.html")
            .expect("Failed to read fixture");
        let page = url("https://www.theyworkforyou.com/mp/25337/jane_doe/bristol_south");

        let record =
            parse_profile(&html, &page, Source::TheyWorkForYou).expect("Failed to parse profile");

        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.party, "Labour");
        assert_eq!(record.constituency, "Bristol South");
        assert_eq!(record.event_urls.len(), 2);
        assert!(
            record
                .event_urls
                .iter()
                .all(|u| u.starts_with("https://www.theyworkforyou.com/mp/25337/"))
        );
    }

    #[test]
    fn test_parse_parliament_profile_from_fixture() {
        let html = fs::read_to_string("fixtures/parliament_profile.html")
            .expect("Failed to read fixture");
        let page = url("https://members.parliament.uk/member/4514/contact");

        let record =
            parse_profile(&html, &page, Source::Parliament).expect("Failed to parse profile");

        assert_eq!(record.name, "John Roe");
        assert_eq!(record.party, "Conservative");
        assert_eq!(record.constituency, "Aberconwy");
        assert_eq!(
            record.event_urls,
            vec![
                "https://members.parliament.uk/member/4514/writtenquestions?type=Activity",
                "https://hansard.parliament.uk/search/Contributions?memberId=4514&type=Speech",
            ]
        );
    }

    #[test]
    fn test_parse_parliament_profile_defaults() {
        let html = r#"<div><p>Nothing to see here</p></div>"#;
        let page = url("https://members.parliament.uk/member/4514/contact");

        let record =
            parse_profile(html, &page, Source::Parliament).expect("Should not fail on defaults");

        assert_eq!(record.name, "");
        assert_eq!(record.party, "");
        assert_eq!(record.constituency, "");
        assert!(record.event_urls.is_empty());
        assert_eq!(record.profile_url, page.as_str());
    }

    #[test]
    fn test_parse_event_text() {
        let html = r#"
            <html><body>
                <p>We must   act on
                   climate change.</p>
                <div class="content">Second block</div>
                <p>   </p>
                <span>Ignored</span>
            </body></html>
        "#;

        assert_eq!(
            parse_event_text(html),
            "We must act on climate change. Second block"
        );
    }

    #[test]
    fn test_parse_event_text_nested_paragraphs_once() {
        let html = r#"
            <div class="content">
                Intro line
                <p>Nested <a href="/x">paragraph</a> text</p>
            </div>
        "#;

        assert_eq!(parse_event_text(html), "Intro line Nested paragraph text");
    }

    #[test]
    fn test_parse_event_text_without_content() {
        assert_eq!(parse_event_text("<html><body><h2>Empty</h2></body></html>"), "");
    }

    #[test]
    fn test_parse_event_text_from_fixture() {
        let html =
            fs::read_to_string("fixtures/event_page.html").expect("Failed to read fixture");

        let text = parse_event_text(&html);

        assert!(text.starts_with("Mr Speaker,"));
        assert!(text.contains("net zero"));
        assert!(!text.contains("Cookie settings"));
    }
}

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ProfileTags;

pub const ENVIRONMENTAL_CONCERN: &str = "Environmental concern";
pub const ECONOMIC_LIBERALISM: &str = "Economic liberalism";
pub const SOCIAL_DEMOCRACY: &str = "Social democracy";
pub const SHORT_TERM: &str = "Short-term";
pub const LONG_TERM: &str = "Long-term";

static RE_ENVIRONMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(climate change|net zero|sustainability)\b")
        .expect("invalid regex: environment")
});

static RE_ECONOMIC_LIBERALISM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(tax cuts|free market|privatization)\b")
        .expect("invalid regex: economic liberalism")
});

static RE_SOCIAL_DEMOCRACY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(public service|welfare|redistribution)\b")
        .expect("invalid regex: social democracy")
});

static RE_SHORT_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(urgent|this week|immediately)\b").expect("invalid regex: short term")
});

static RE_LONG_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(vision|2030|future generations)\b").expect("invalid regex: long term")
});

enum Family {
    Values,
    Ideology,
    TimeFocus,
}

// Evaluation order fixes the label order within each family.
static CHECKS: [(&LazyLock<Regex>, Family, &str); 5] = [
    (&RE_ENVIRONMENT, Family::Values, ENVIRONMENTAL_CONCERN),
    (&RE_ECONOMIC_LIBERALISM, Family::Ideology, ECONOMIC_LIBERALISM),
    (&RE_SOCIAL_DEMOCRACY, Family::Ideology, SOCIAL_DEMOCRACY),
    (&RE_SHORT_TERM, Family::TimeFocus, SHORT_TERM),
    (&RE_LONG_TERM, Family::TimeFocus, LONG_TERM),
];

/// Tags `text` with every label whose keyword pattern occurs anywhere in it.
pub fn infer(text: &str) -> ProfileTags {
    let mut tags = ProfileTags::default();

    for (pattern, family, label) in CHECKS.iter() {
        if !pattern.is_match(text) {
            continue;
        }
        let target = match family {
            Family::Values => &mut tags.values,
            Family::Ideology => &mut tags.ideology,
            Family::TimeFocus => &mut tags.time_focus,
        };
        target.push(label.to_string());
    }

    tags
}

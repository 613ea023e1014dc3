// Per-page SEO and accessibility checks

use crate::warning::{WarningMap, WarningType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use siteaudit_scanner::LinkVerifier;
use std::collections::{BTreeMap, HashMap};
use std::sync::{LazyLock, PoisonError, RwLock};
use tracing::warn;
use url::Url;

pub const TITLE_MIN_LEN: usize = 30;
pub const TITLE_MAX_LEN: usize = 65;
pub const DESCRIPTION_MIN_LEN: usize = 30;
pub const DESCRIPTION_MAX_LEN: usize = 165;

/// Which checks run on each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checks {
    pub headings: bool,
    pub title: bool,
    pub description: bool,
    pub keywords: bool,
    /// Accepted for request compatibility; no image check exists.
    pub images: bool,
    pub links: bool,
    pub security: bool,
}

impl Default for Checks {
    fn default() -> Self {
        Self::all()
    }
}

impl Checks {
    pub const NAMES: [&'static str; 7] = [
        "headings",
        "title",
        "description",
        "keywords",
        "images",
        "links",
        "security",
    ];

    pub fn all() -> Self {
        Self {
            headings: true,
            title: true,
            description: true,
            keywords: true,
            images: true,
            links: true,
            security: true,
        }
    }

    pub fn none() -> Self {
        Self {
            headings: false,
            title: false,
            description: false,
            keywords: false,
            images: false,
            links: false,
            security: false,
        }
    }

    /// Defaults for auditing an explicit page list: link probing is off.
    pub fn list_defaults() -> Self {
        Self {
            images: false,
            links: false,
            ..Self::all()
        }
    }

    /// Toggle a check by name. Returns false for an unknown name.
    pub fn set(&mut self, name: &str, enabled: bool) -> bool {
        let flag = match name.to_lowercase().as_str() {
            "headings" => &mut self.headings,
            "title" => &mut self.title,
            "description" => &mut self.description,
            "keywords" => &mut self.keywords,
            "images" => &mut self.images,
            "links" => &mut self.links,
            "security" => &mut self.security,
            _ => return false,
        };
        *flag = enabled;
        true
    }

    pub fn without(mut self, name: &str) -> Self {
        self.set(name, false);
        self
    }
}

pub fn check_headings(h1s: &[String], page_url: &str) -> WarningMap {
    let mut warnings = WarningMap::new();

    if h1s.is_empty() {
        warnings.push(WarningType::H1Missing, vec![page_url.to_string()]);
        return warnings;
    }

    if h1s.len() > 1 {
        warnings.push(
            WarningType::H1Multiple,
            vec![page_url.to_string(), h1s.len().to_string()],
        );
    }

    if h1s.iter().any(|h1| h1.trim().is_empty()) {
        warnings.push(WarningType::H1Missing, vec![page_url.to_string()]);
    }

    warnings
}

pub fn check_title(title: &str, page_url: &str) -> WarningMap {
    check_length(
        title,
        page_url,
        (TITLE_MIN_LEN, TITLE_MAX_LEN),
        [
            WarningType::TitleMissing,
            WarningType::TitleTooShort,
            WarningType::TitleTooLong,
        ],
    )
}

pub fn check_description(description: &str, page_url: &str) -> WarningMap {
    check_length(
        description,
        page_url,
        (DESCRIPTION_MIN_LEN, DESCRIPTION_MAX_LEN),
        [
            WarningType::MetaDescriptionMissing,
            WarningType::MetaDescriptionTooShort,
            WarningType::MetaDescriptionTooLong,
        ],
    )
}

// Missing, too short and too long are exclusive; the first match wins.
fn check_length(
    text: &str,
    page_url: &str,
    (min, max): (usize, usize),
    [missing, too_short, too_long]: [WarningType; 3],
) -> WarningMap {
    let mut warnings = WarningMap::new();
    let len = text.chars().count();

    if text.is_empty() {
        warnings.push(missing, vec![page_url.to_string()]);
    } else if len < min {
        warnings.push(too_short, vec![page_url.to_string(), text.to_string()]);
    } else if len > max {
        warnings.push(too_long, vec![page_url.to_string(), text.to_string()]);
    }

    warnings
}

/// Flag plain-http links on the page as one occurrence listing all of them.
pub fn check_link_protocol(links: &[String], page_url: &str) -> WarningMap {
    let mut warnings = WarningMap::new();

    let http_links: Vec<String> = links
        .iter()
        .filter(|link| {
            Url::parse(link)
                .map(|u| u.scheme() == "http")
                .unwrap_or(false)
        })
        .cloned()
        .collect();

    if !http_links.is_empty() {
        let mut evidence = vec![page_url.to_string()];
        evidence.extend(http_links);
        warnings.push(WarningType::HttpsToHttpLinks, evidence);
    }

    warnings
}

static KEYWORD_PATTERNS: LazyLock<RwLock<HashMap<String, Option<Regex>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Case-insensitive whole-word pattern for `word`, compiled once per process.
fn keyword_pattern(word: &str) -> Option<Regex> {
    {
        let patterns = KEYWORD_PATTERNS
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pattern) = patterns.get(word) {
            return pattern.clone();
        }
    }

    let mut patterns = KEYWORD_PATTERNS
        .write()
        .unwrap_or_else(PoisonError::into_inner);

    patterns
        .entry(word.to_string())
        .or_insert_with(|| {
            let source = format!(r"(?i)\b{}\b", regex::escape(word));
            Regex::new(&source)
                .map_err(|e| warn!("Cannot compile keyword pattern for {:?}: {}", word, e))
                .ok()
        })
        .clone()
}

/// True when every word of `phrase` occurs as a whole word in `content`.
pub fn phrase_matches(phrase: &str, content: &str) -> bool {
    let mut words = phrase.split_whitespace().peekable();
    if words.peek().is_none() {
        return false;
    }

    words.all(|word| keyword_pattern(word).is_some_and(|re| re.is_match(content)))
}

/// Count each matching phrase once for this page.
pub fn check_keywords(content: &str, keywords: &[String]) -> BTreeMap<String, usize> {
    let mut matches = BTreeMap::new();

    for phrase in keywords {
        if phrase_matches(phrase, content) {
            *matches.entry(phrase.clone()).or_insert(0) += 1;
        }
    }

    matches
}

/// True when `link` was already verified according to `checked_paths`.
///
/// An entry matches the full link, the link's path, or any path below it.
pub fn is_checked_path(link: &str, checked_paths: &[String]) -> bool {
    let path = Url::parse(link).map(|u| u.path().to_string()).ok();

    checked_paths.iter().any(|checked| {
        if checked == link {
            return true;
        }
        let Some(path) = path.as_deref() else {
            return false;
        };
        if checked == path {
            return true;
        }
        let prefix = format!("{}/", checked.trim_end_matches('/'));
        path.starts_with(&prefix)
    })
}

/// Probe every link not covered by `checked_paths` and report the dead ones
/// as a single occurrence for the page.
pub async fn check_broken_links(
    verifier: &LinkVerifier,
    page_url: &str,
    links: &[String],
    checked_paths: &[String],
) -> WarningMap {
    let mut warnings = WarningMap::new();

    let candidates: Vec<String> = links
        .iter()
        .filter(|link| !is_checked_path(link, checked_paths))
        .cloned()
        .collect();

    let dead = verifier.dead_links(&candidates).await;

    if !dead.is_empty() {
        let mut evidence = vec![page_url.to_string()];
        evidence.extend(dead);
        warnings.push(WarningType::LinksBroken, evidence);
    }

    warnings
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningType {
    H1Missing,
    H1Multiple,
    H1Duplicate,
    TitleMissing,
    TitleTooShort,
    TitleTooLong,
    TitleDuplicate,
    MetaDescriptionMissing,
    MetaDescriptionTooShort,
    MetaDescriptionTooLong,
    LinksBroken,
    HttpsToHttpLinks,
    KeywordsMissing,
}

impl WarningType {
    pub const ALL: [WarningType; 13] = [
        WarningType::H1Missing,
        WarningType::H1Multiple,
        WarningType::H1Duplicate,
        WarningType::TitleMissing,
        WarningType::TitleTooShort,
        WarningType::TitleTooLong,
        WarningType::TitleDuplicate,
        WarningType::MetaDescriptionMissing,
        WarningType::MetaDescriptionTooShort,
        WarningType::MetaDescriptionTooLong,
        WarningType::LinksBroken,
        WarningType::HttpsToHttpLinks,
        WarningType::KeywordsMissing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::H1Missing => "h1_missing",
            WarningType::H1Multiple => "h1_multiple",
            WarningType::H1Duplicate => "h1_duplicate",
            WarningType::TitleMissing => "title_missing",
            WarningType::TitleTooShort => "title_too_short",
            WarningType::TitleTooLong => "title_too_long",
            WarningType::TitleDuplicate => "title_duplicate",
            WarningType::MetaDescriptionMissing => "meta_description_missing",
            WarningType::MetaDescriptionTooShort => "meta_description_too_short",
            WarningType::MetaDescriptionTooLong => "meta_description_too_long",
            WarningType::LinksBroken => "links_broken",
            WarningType::HttpsToHttpLinks => "https_to_http_links",
            WarningType::KeywordsMissing => "keywords_missing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for WarningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One occurrence of a warning: the page URL first, then context.
pub type Evidence = Vec<String>;

/// Warnings grouped by type, one evidence list per occurrence.
///
/// Keyed by an ordered map so identical input always serializes to
/// identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarningMap(BTreeMap<WarningType, Vec<Evidence>>);

impl WarningMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: WarningType, evidence: Evidence) {
        self.0.entry(kind).or_default().push(evidence);
    }

    /// Append every occurrence from `other` after the ones already held.
    pub fn extend(&mut self, other: WarningMap) {
        for (kind, occurrences) in other.0 {
            self.0.entry(kind).or_default().extend(occurrences);
        }
    }

    pub fn get(&self, kind: WarningType) -> &[Evidence] {
        self.0.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, kind: WarningType) -> bool {
        !self.get(kind).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Number of evidence entries across all types.
    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn kinds(&self) -> impl Iterator<Item = WarningType> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WarningType, &[Evidence])> + '_ {
        self.0.iter().map(|(kind, list)| (*kind, list.as_slice()))
    }

    /// Concatenate many maps in iteration order.
    pub fn flatten<'a, I>(maps: I) -> WarningMap
    where
        I: IntoIterator<Item = &'a WarningMap>,
    {
        let mut merged = WarningMap::new();
        for map in maps {
            merged.extend(map.clone());
        }
        merged
    }

    /// Regroup occurrences by the page URL they were recorded for.
    pub fn split_by_page(&self) -> BTreeMap<String, WarningMap> {
        let mut pages: BTreeMap<String, WarningMap> = BTreeMap::new();

        for (kind, occurrences) in &self.0 {
            for evidence in occurrences {
                let Some(page) = evidence.first() else {
                    continue;
                };
                pages
                    .entry(page.clone())
                    .or_default()
                    .push(*kind, evidence.clone());
            }
        }

        pages
    }
}

impl FromIterator<(WarningType, Evidence)> for WarningMap {
    fn from_iter<I: IntoIterator<Item = (WarningType, Evidence)>>(iter: I) -> Self {
        let mut map = WarningMap::new();
        for (kind, evidence) in iter {
            map.push(kind, evidence);
        }
        map
    }
}

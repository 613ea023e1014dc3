// Crawl report assembly and rendering

use crate::audit::PageResult;
use crate::checks::Checks;
use crate::crawl::CrawlState;
use crate::error::Result;
use crate::warning::{WarningMap, WarningType};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub task_id: String,
    pub state: CrawlState,
    /// Audited page URLs in completion order.
    pub pages: Vec<String>,
    pub warnings: WarningMap,
    pub keyword_matches: BTreeMap<String, usize>,
    pub errors: Vec<PageError>,
}

impl CrawlReport {
    pub fn build(
        task_id: String,
        state: CrawlState,
        start_url: &str,
        pages: &[PageResult],
        keywords: &[String],
        checks: &Checks,
    ) -> Self {
        let keyword_matches = tally_keywords(pages);

        let mut warnings = flatten_warnings(pages);
        warnings.extend(duplicate_warnings(pages, checks));
        if checks.keywords {
            warnings.extend(missing_keywords(start_url, keywords, &keyword_matches));
        }

        let errors = pages
            .iter()
            .filter_map(|page| {
                page.error.as_ref().map(|error| PageError {
                    url: page.url.clone(),
                    error: error.clone(),
                })
            })
            .collect();

        Self {
            task_id,
            state,
            pages: pages.iter().map(|page| page.url.clone()).collect(),
            warnings,
            keyword_matches,
            errors,
        }
    }

    pub fn warning_total(&self) -> usize {
        self.warnings.total()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Concatenate per-page warnings in page order.
pub fn flatten_warnings(pages: &[PageResult]) -> WarningMap {
    WarningMap::flatten(pages.iter().map(|page| &page.warnings))
}

/// Sum of every page's keyword matches.
pub fn tally_keywords(pages: &[PageResult]) -> BTreeMap<String, usize> {
    let mut tally = BTreeMap::new();
    for page in pages {
        for (phrase, count) in &page.keyword_matches {
            *tally.entry(phrase.clone()).or_insert(0) += count;
        }
    }
    tally
}

/// H1 and title texts shared by more than one page.
pub fn duplicate_warnings(pages: &[PageResult], checks: &Checks) -> WarningMap {
    let mut warnings = WarningMap::new();

    if checks.headings {
        let h1s = pages.iter().flat_map(|page| {
            page.h1s.iter().map(move |h1| (page.url.as_str(), h1.as_str()))
        });
        push_duplicates(&mut warnings, WarningType::H1Duplicate, h1s);
    }

    if checks.title {
        let titles = pages
            .iter()
            .map(|page| (page.url.as_str(), page.title.as_str()));
        push_duplicates(&mut warnings, WarningType::TitleDuplicate, titles);
    }

    warnings
}

fn push_duplicates<'a, I>(warnings: &mut WarningMap, kind: WarningType, entries: I)
where
    I: Iterator<Item = (&'a str, &'a str)>,
{
    let mut by_text: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (url, text) in entries {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let urls = by_text.entry(text).or_default();
        if !urls.contains(&url) {
            urls.push(url);
        }
    }

    for (text, urls) in by_text {
        if urls.len() < 2 {
            continue;
        }
        for url in urls {
            warnings.push(kind, vec![url.to_string(), text.to_string()]);
        }
    }
}

/// One `keywords_missing` entry per phrase that matched on no page.
pub fn missing_keywords(
    start_url: &str,
    keywords: &[String],
    tally: &BTreeMap<String, usize>,
) -> WarningMap {
    let mut warnings = WarningMap::new();

    for phrase in keywords {
        if phrase.trim().is_empty() {
            continue;
        }
        if tally.get(phrase).copied().unwrap_or(0) == 0 {
            warnings.push(
                WarningType::KeywordsMissing,
                vec![start_url.to_string(), phrase.clone()],
            );
        }
    }

    warnings
}

pub fn render_report(report: &CrawlReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Json => report.to_json(),
    }
}

pub fn generate_text_report(report: &CrawlReport) -> String {
    let rule = "━".repeat(72);
    let mut out = String::new();

    out.push_str(&format!("{}\n", rule.bright_blue()));
    out.push_str(&format!("{}\n", "  SITE AUDIT REPORT".bright_white().bold()));
    out.push_str(&format!("{}\n\n", rule.bright_blue()));

    out.push_str(&format!("Task:         {}\n", report.task_id));
    out.push_str(&format!("Outcome:      {}\n", format_state(report.state)));
    out.push_str(&format!("Pages:        {}\n", report.pages.len()));
    out.push_str(&format!("Warnings:     {}\n", report.warning_total()));
    out.push_str(&format!("Errors:       {}\n\n", report.errors.len()));

    if !report.warnings.is_empty() {
        out.push_str(&format!("{}\n", "WARNINGS".bold()));
        out.push_str(&format_warnings(&report.warnings));
        out.push('\n');
    }

    if !report.keyword_matches.is_empty() {
        out.push_str(&format!("{}\n", "KEYWORD MATCHES".bold()));
        for (phrase, count) in &report.keyword_matches {
            out.push_str(&format!("  {:<40} {}\n", phrase, count));
        }
        out.push('\n');
    }

    if !report.errors.is_empty() {
        out.push_str(&format!("{}\n", "PAGE ERRORS".bold()));
        for error in &report.errors {
            out.push_str(&format!("  {} {}\n", "✗".red(), error.url));
            out.push_str(&format!("      {}\n", error.error));
        }
        out.push('\n');
    }

    out.push_str(&format!("{}\n", rule.bright_blue()));
    out
}

/// Text rendering of one page result, used for single-page and list audits.
pub fn generate_page_report(page: &PageResult) -> String {
    let mut out = String::new();

    let marker = if page.error.is_some() {
        "✗".red().bold()
    } else if page.warnings.is_empty() {
        "✓".green().bold()
    } else {
        "⚠".yellow().bold()
    };
    out.push_str(&format!("{} {}\n", marker, page.url.bold()));

    if page.skipped {
        out.push_str("  skipped (not a page)\n");
        return out;
    }
    if let Some(error) = &page.error {
        out.push_str(&format!("  error: {}\n", error));
        return out;
    }

    if !page.title.is_empty() {
        out.push_str(&format!("  title: {}\n", page.title));
    }
    out.push_str(&format_warnings(&page.warnings));

    for (phrase, count) in &page.keyword_matches {
        out.push_str(&format!("  keyword {:?}: {}\n", phrase, count));
    }

    out
}

fn format_warnings(warnings: &WarningMap) -> String {
    let mut out = String::new();

    for (kind, occurrences) in warnings.iter() {
        if occurrences.is_empty() {
            continue;
        }
        out.push_str(&format!(
            "  {} ({})\n",
            format_warning_type(kind).yellow(),
            occurrences.len()
        ));
        for evidence in occurrences {
            out.push_str(&format!("    - {}\n", evidence.join(" | ")));
        }
    }

    out
}

fn format_state(state: CrawlState) -> String {
    match state {
        CrawlState::Completed => "Completed (page cap reached)".green().to_string(),
        CrawlState::Exhausted => "Completed (no pages left)".green().to_string(),
        CrawlState::Cancelled => "Cancelled".yellow().to_string(),
        CrawlState::Running => "Running".to_string(),
        CrawlState::Idle => "Idle".to_string(),
    }
}

fn format_warning_type(kind: WarningType) -> String {
    kind.as_str()
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn save_report(content: &str, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

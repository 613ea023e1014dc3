// Tests for the per-page check engine

use siteaudit_core::checks::{
    Checks, check_broken_links, check_description, check_headings, check_keywords,
    check_link_protocol, check_title, is_checked_path, phrase_matches,
};
use siteaudit_core::warning::WarningType;
use siteaudit_scanner::LinkVerifier;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = "https://x.com/";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Heading Tests
// ============================================================================

#[test]
fn test_headings_missing() {
    let warnings = check_headings(&[], PAGE);
    assert_eq!(warnings.get(WarningType::H1Missing), &[vec![PAGE.to_string()]]);
    assert_eq!(warnings.total(), 1);
}

#[test]
fn test_headings_multiple_carries_count() {
    let warnings = check_headings(&strings(&["A", "B"]), PAGE);
    assert_eq!(
        warnings.get(WarningType::H1Multiple),
        &[strings(&[PAGE, "2"])]
    );
    assert!(!warnings.contains(WarningType::H1Missing));
}

#[test]
fn test_headings_blank_text_is_missing() {
    let warnings = check_headings(&strings(&["   "]), PAGE);
    assert!(warnings.contains(WarningType::H1Missing));
    assert!(!warnings.contains(WarningType::H1Multiple));
}

#[test]
fn test_headings_multiple_with_blank() {
    let warnings = check_headings(&strings(&["Welcome", ""]), PAGE);
    assert!(warnings.contains(WarningType::H1Multiple));
    assert!(warnings.contains(WarningType::H1Missing));
}

#[test]
fn test_headings_single_is_clean() {
    assert!(check_headings(&strings(&["Welcome"]), PAGE).is_empty());
}

// ============================================================================
// Title / Description Length Tests
// ============================================================================

#[test]
fn test_title_missing() {
    let warnings = check_title("", PAGE);
    assert_eq!(warnings.get(WarningType::TitleMissing), &[vec![PAGE.to_string()]]);
}

#[test]
fn test_title_boundary_short() {
    let at_min = "a".repeat(30);
    let below = "a".repeat(29);

    assert!(check_title(&at_min, PAGE).is_empty());

    let warnings = check_title(&below, PAGE);
    assert_eq!(
        warnings.get(WarningType::TitleTooShort),
        &[vec![PAGE.to_string(), below.clone()]]
    );
}

#[test]
fn test_title_boundary_long() {
    let at_max = "a".repeat(65);
    let above = "a".repeat(66);

    assert!(check_title(&at_max, PAGE).is_empty());
    assert!(check_title(&above, PAGE).contains(WarningType::TitleTooLong));
}

#[test]
fn test_title_counts_characters_not_bytes() {
    // 30 two-byte characters
    let title = "é".repeat(30);
    assert!(check_title(&title, PAGE).is_empty());
}

#[test]
fn test_description_thresholds() {
    assert!(check_description("", PAGE).contains(WarningType::MetaDescriptionMissing));
    assert!(check_description(&"d".repeat(29), PAGE).contains(WarningType::MetaDescriptionTooShort));
    assert!(check_description(&"d".repeat(30), PAGE).is_empty());
    assert!(check_description(&"d".repeat(165), PAGE).is_empty());
    assert!(check_description(&"d".repeat(166), PAGE).contains(WarningType::MetaDescriptionTooLong));
}

#[test]
fn test_length_outcomes_are_exclusive() {
    let warnings = check_title("short", PAGE);
    assert_eq!(warnings.total(), 1);
    assert!(!warnings.contains(WarningType::TitleMissing));
    assert!(!warnings.contains(WarningType::TitleTooLong));
}

// ============================================================================
// Protocol Tests
// ============================================================================

#[test]
fn test_http_links_flagged() {
    let links = strings(&["http://a.com", "https://b.com"]);
    let warnings = check_link_protocol(&links, "https://x.com");

    assert_eq!(
        warnings.get(WarningType::HttpsToHttpLinks),
        &[strings(&["https://x.com", "http://a.com"])]
    );
}

#[test]
fn test_http_links_grouped_in_one_entry() {
    let links = strings(&["http://a.com/", "http://c.com/", "not a url"]);
    let warnings = check_link_protocol(&links, PAGE);

    let entries = warnings.get(WarningType::HttpsToHttpLinks);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0], strings(&[PAGE, "http://a.com/", "http://c.com/"]));
}

#[test]
fn test_https_only_links_clean() {
    let links = strings(&["https://a.com", "mailto:x@y.z"]);
    assert!(check_link_protocol(&links, PAGE).is_empty());
}

// ============================================================================
// Keyword Tests
// ============================================================================

#[test]
fn test_phrase_needs_every_word() {
    assert!(phrase_matches("foo bar", "the bar is near the foo"));
    assert!(!phrase_matches("foo bar", "only foo here"));
}

#[test]
fn test_phrase_whole_word_case_insensitive() {
    assert!(phrase_matches("foo", "Foo, and more"));
    assert!(!phrase_matches("foo", "food and football"));
}

#[test]
fn test_phrase_with_regex_metacharacters() {
    assert!(phrase_matches("c.d", "we sell c.d players"));
    assert!(!phrase_matches("c.d", "we sell cxd players"));
}

#[test]
fn test_empty_phrase_never_matches() {
    assert!(!phrase_matches("", "anything"));
    assert!(!phrase_matches("   ", "anything"));
}

#[test]
fn test_check_keywords_counts_once_per_page() {
    let keywords = strings(&["rust", "fast crawler", "missing"]);
    let matches = check_keywords("Rust is fast. A crawler in rust.", &keywords);

    assert_eq!(matches.get("rust"), Some(&1));
    assert_eq!(matches.get("fast crawler"), Some(&1));
    assert_eq!(matches.get("missing"), None);
}

// ============================================================================
// Checked Path Tests
// ============================================================================

#[test]
fn test_checked_path_matches() {
    let checked = strings(&["/docs", "https://x.com/exact"]);

    assert!(is_checked_path("https://x.com/docs", &checked));
    assert!(is_checked_path("https://x.com/docs/intro", &checked));
    assert!(is_checked_path("https://x.com/exact", &checked));
    assert!(!is_checked_path("https://x.com/docs-old", &checked));
    assert!(!is_checked_path("https://x.com/other", &checked));
}

// ============================================================================
// Broken Link Tests
// ============================================================================

#[tokio::test]
async fn test_broken_links_single_entry_per_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let base = server.uri();
    let links = vec![
        format!("{}/ok", base),
        format!("{}/gone", base),
        format!("{}/broken", base),
    ];

    let verifier = LinkVerifier::new().unwrap();
    let warnings = check_broken_links(&verifier, PAGE, &links, &[]).await;

    let entries = warnings.get(WarningType::LinksBroken);
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0],
        vec![PAGE.to_string(), format!("{}/gone", base), format!("{}/broken", base)]
    );
}

#[tokio::test]
async fn test_broken_links_skip_checked_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private/a"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let links = vec![format!("{}/private/a", server.uri())];
    let verifier = LinkVerifier::new().unwrap();
    let warnings =
        check_broken_links(&verifier, PAGE, &links, &strings(&["/private"])).await;

    assert!(warnings.is_empty());
    assert_eq!(verifier.probe_count(), 0);
}

// ============================================================================
// Checks Configuration Tests
// ============================================================================

#[test]
fn test_checks_default_all_enabled() {
    let checks = Checks::default();
    assert_eq!(checks, Checks::all());
}

#[test]
fn test_checks_missing_fields_default_enabled() {
    let checks: Checks = serde_json::from_str(r#"{"links": false}"#).unwrap();
    assert!(!checks.links);
    assert!(checks.headings);
    assert!(checks.security);
}

#[test]
fn test_checks_set_by_name() {
    let mut checks = Checks::none();
    assert!(checks.set("Title", true));
    assert!(checks.title);
    assert!(!checks.set("lighthouse", true));
}

#[test]
fn test_list_defaults() {
    let checks = Checks::list_defaults();
    assert!(!checks.links);
    assert!(!checks.images);
    assert!(checks.keywords);
}

#[test]
fn test_checks_are_idempotent() {
    let h1s = strings(&["A", "B", ""]);
    let first = check_headings(&h1s, PAGE);
    let second = check_headings(&h1s, PAGE);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

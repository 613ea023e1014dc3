// Tests for the warning map model

use siteaudit_core::checks::{check_headings, check_link_protocol, check_title};
use siteaudit_core::warning::{WarningMap, WarningType};

fn page_warnings(url: &str, h1s: &[&str], title: &str, links: &[&str]) -> WarningMap {
    let h1s: Vec<String> = h1s.iter().map(|s| s.to_string()).collect();
    let links: Vec<String> = links.iter().map(|s| s.to_string()).collect();

    let mut warnings = WarningMap::new();
    warnings.extend(check_headings(&h1s, url));
    warnings.extend(check_title(title, url));
    warnings.extend(check_link_protocol(&links, url));
    warnings
}

#[test]
fn test_flatten_then_split_restores_pages() {
    let a = page_warnings("https://x.com/a", &[], "short", &["http://insecure.com"]);
    let b = page_warnings("https://x.com/b", &["One", "Two"], &"t".repeat(80), &[]);
    let c = page_warnings("https://x.com/c", &["Fine"], &"t".repeat(40), &[]);

    let flat = WarningMap::flatten([&a, &b, &c]);
    assert_eq!(flat.total(), a.total() + b.total() + c.total());

    let split = flat.split_by_page();
    assert_eq!(split.get("https://x.com/a"), Some(&a));
    assert_eq!(split.get("https://x.com/b"), Some(&b));
    // A page with no warnings has nothing to split back into
    assert!(c.is_empty());
    assert!(!split.contains_key("https://x.com/c"));
}

#[test]
fn test_flatten_preserves_page_order_per_type() {
    let a = page_warnings("https://x.com/a", &[], "", &[]);
    let b = page_warnings("https://x.com/b", &[], "", &[]);

    let flat = WarningMap::flatten([&b, &a]);
    let missing = flat.get(WarningType::H1Missing);

    assert_eq!(missing[0][0], "https://x.com/b");
    assert_eq!(missing[1][0], "https://x.com/a");
}

#[test]
fn test_split_keeps_duplicate_occurrences() {
    let mut map = WarningMap::new();
    map.push(WarningType::H1Missing, vec!["https://x.com/a".into()]);
    map.push(WarningType::H1Missing, vec!["https://x.com/a".into()]);

    let split = map.split_by_page();
    assert_eq!(split["https://x.com/a"].get(WarningType::H1Missing).len(), 2);
}

#[test]
fn test_same_input_same_bytes() {
    let first = page_warnings("https://x.com/", &["A", "B"], "tiny", &["http://a.com"]);
    let second = page_warnings("https://x.com/", &["A", "B"], "tiny", &["http://a.com"]);

    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[test]
fn test_collect_from_pairs() {
    let map: WarningMap = vec![
        (WarningType::TitleMissing, vec!["https://x.com/".to_string()]),
        (WarningType::TitleMissing, vec!["https://x.com/b".to_string()]),
    ]
    .into_iter()
    .collect();

    assert_eq!(map.get(WarningType::TitleMissing).len(), 2);
    assert_eq!(map.kinds().collect::<Vec<_>>(), vec![WarningType::TitleMissing]);
}

#[test]
fn test_deserialize_round_trip_through_json() {
    let map = page_warnings("https://x.com/", &[], "", &["http://a.com"]);
    let json = serde_json::to_string(&map).unwrap();
    let back: WarningMap = serde_json::from_str(&json).unwrap();
    assert_eq!(back, map);
}

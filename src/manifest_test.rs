use super::*;
use crate::geometry::{Rect, Size};
use crate::host::ShapeKind;
use crate::memory::MemoryDeck;
use crate::tags::parse_json;

fn deck() -> (MemoryDeck, String) {
    let deck = MemoryDeck::with_pages(Size::default(), 1);
    let page = deck.pages()[0].clone();
    (deck, page)
}

fn shape(deck: &mut MemoryDeck, page: &str) -> String {
    deck.create_shape(page, ShapeKind::Rectangle, Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap()
}

// =============================================================
// Parsing
// =============================================================

#[test]
fn parses_poll_manifest_with_question_alias() {
    let raw = r#"{"container":"c","title":"t","question":"q","items":[{"label":"l","bg":"b","fill":"f"}]}"#;
    let manifest: WidgetManifest<PollItem> = parse_json(raw).unwrap();
    assert_eq!(manifest.body, "q");
    assert_eq!(manifest.items[0].group, None);
}

#[test]
fn parses_legacy_word_cloud_bare_ids() {
    let raw = r#"{"container":"c","title":"t","body":"b","words":["w0",{"bubble":"w1","label":"l1"}]}"#;
    let manifest: WidgetManifest<WordItem> = parse_json(raw).unwrap();
    assert_eq!(manifest.items.len(), 2);
    assert!(manifest.items[0].is_legacy());
    assert_eq!(manifest.items[1].label.as_deref(), Some("l1"));
}

#[test]
fn missing_required_role_fails_to_parse() {
    let raw = r#"{"container":"c","body":"b"}"#;
    assert_eq!(parse_json::<WidgetManifest<QnaItem>>(raw), None);
}

#[test]
fn serialization_skips_absent_optionals() {
    let manifest: WidgetManifest<QnaItem> = WidgetManifest::new("c".into(), "t".into(), "b".into());
    let raw = serde_json::to_string(&manifest).unwrap();
    assert_eq!(raw, r#"{"container":"c","title":"t","body":"b","items":[]}"#);
}

// =============================================================
// Validation
// =============================================================

#[test]
fn shape_ids_covers_items() {
    let mut manifest: WidgetManifest<PollItem> = WidgetManifest::new("c".into(), "t".into(), "b".into());
    manifest.shadow = Some("s".into());
    manifest.items.push(PollItem { label: "l".into(), bg: "bg".into(), fill: "f".into(), group: Some("g".into()) });
    assert_eq!(manifest.shape_ids(), vec!["s", "c", "t", "b", "l", "bg", "f", "g"]);
}

#[test]
fn valid_when_required_ids_resolve() {
    let (mut deck, page) = deck();
    let c = shape(&mut deck, &page);
    let t = shape(&mut deck, &page);
    let b = shape(&mut deck, &page);
    let mut manifest: WidgetManifest<QnaItem> = WidgetManifest::new(c, t, b.clone());
    manifest.subtitle = Some("deleted-subtitle".into());
    assert!(manifest.is_valid(&deck, &page));
    assert_eq!(manifest.dangling_ids(&deck, &page), vec!["deleted-subtitle".to_string()]);

    deck.delete_shape(&page, &b).unwrap();
    assert!(!manifest.is_valid(&deck, &page));
}

#[test]
fn invalid_on_unreadable_page() {
    let (mut deck, page) = deck();
    let c = shape(&mut deck, &page);
    let t = shape(&mut deck, &page);
    let b = shape(&mut deck, &page);
    let manifest: WidgetManifest<QnaItem> = WidgetManifest::new(c, t, b);
    deck.block_reads(&page);
    assert!(!manifest.is_valid(&deck, &page));
}

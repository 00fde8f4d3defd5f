use serde::Deserialize;

use super::*;
use crate::geometry::{Rect, Size};
use crate::host::ShapeKind;
use crate::memory::MemoryDeck;

fn deck() -> (MemoryDeck, String) {
    let deck = MemoryDeck::with_pages(Size::default(), 1);
    let page = deck.pages()[0].clone();
    (deck, page)
}

#[derive(Debug, Deserialize, PartialEq)]
struct Payload {
    a: u32,
}

// =============================================================
// Reads
// =============================================================

#[test]
fn empty_and_whitespace_read_as_absent() {
    let (mut deck, page) = deck();
    deck.set_tag(TagScope::Page(&page), "k", "   ").unwrap();
    assert_eq!(read_raw(&deck, TagScope::Page(&page), "k"), None);
    assert_eq!(read_raw(&deck, TagScope::Page(&page), "missing"), None);
}

#[test]
fn host_error_reads_as_absent() {
    let (mut deck, page) = deck();
    deck.set_tag(TagScope::Page(&page), "k", "v").unwrap();
    deck.block_reads(&page);
    assert_eq!(read_raw(&deck, TagScope::Page(&page), "k"), None);
}

#[test]
fn read_id_trims() {
    let (mut deck, page) = deck();
    deck.set_tag(TagScope::Page(&page), "k", "  s1 ").unwrap();
    assert_eq!(read_id(&deck, TagScope::Page(&page), "k").as_deref(), Some("s1"));
}

#[test]
fn flag_is_true_only_for_true() {
    let (mut deck, page) = deck();
    for (raw, expected) in [("true", true), ("TRUE", true), ("1", false), ("yes", false), ("", false)] {
        deck.set_tag(TagScope::Page(&page), "p", raw).unwrap();
        assert_eq!(read_flag(&deck, TagScope::Page(&page), "p"), expected, "{raw:?}");
    }
}

#[test]
fn read_object_rejects_non_objects() {
    let (mut deck, page) = deck();
    deck.set_tag(TagScope::Page(&page), "s", "[1,2]").unwrap();
    assert_eq!(read_object(&deck, TagScope::Page(&page), "s"), None);
    deck.set_tag(TagScope::Page(&page), "s", "{\"a\":1").unwrap();
    assert_eq!(read_object(&deck, TagScope::Page(&page), "s"), None);
    deck.set_tag(TagScope::Page(&page), "s", "{\"a\":1}").unwrap();
    assert!(read_object(&deck, TagScope::Page(&page), "s").is_some());
}

#[test]
fn read_json_failure_is_absent() {
    let (mut deck, page) = deck();
    deck.set_tag(TagScope::Page(&page), "j", "{\"a\":\"x\"}").unwrap();
    assert_eq!(read_json::<Payload, _>(&deck, TagScope::Page(&page), "j"), None);
    deck.set_tag(TagScope::Page(&page), "j", "{\"a\":3}").unwrap();
    assert_eq!(read_json::<Payload, _>(&deck, TagScope::Page(&page), "j"), Some(Payload { a: 3 }));
}

// =============================================================
// Writes
// =============================================================

#[test]
fn oversized_value_is_written_empty() {
    let (mut deck, page) = deck();
    let big = "x".repeat(MAX_TAG_VALUE_LEN + 1);
    write_bounded(&mut deck, TagScope::Page(&page), "big", &big).unwrap();
    assert_eq!(deck.get_tag(TagScope::Page(&page), "big").unwrap().as_deref(), Some(""));
    assert_eq!(read_raw(&deck, TagScope::Page(&page), "big"), None);

    let fits = "x".repeat(MAX_TAG_VALUE_LEN);
    write_bounded(&mut deck, TagScope::Page(&page), "fits", &fits).unwrap();
    assert_eq!(read_raw(&deck, TagScope::Page(&page), "fits"), Some(fits));
}

#[test]
fn tag_shape_sets_marker_and_role() {
    let (mut deck, page) = deck();
    let id = deck.create_shape(&page, ShapeKind::TextBox, Rect::default()).unwrap();
    tag_shape(&mut deck, &page, &id, WidgetKind::Poll, "poll-title").unwrap();
    let shape = deck.shape(&page, &id).unwrap();
    assert!(has_marker(shape, WidgetKind::Poll));
    assert!(!has_marker(shape, WidgetKind::Qna));
    assert_eq!(shape_role(shape), Some("poll-title"));
}

#[test]
fn clear_binding_tags_removes_owned_keys_only() {
    let (mut deck, page) = deck();
    let keys = WidgetKind::Qna.tags();
    for key in [keys.marker, keys.session, keys.manifest, keys.pending, keys.style, keys.resource, keys.legacy[0]] {
        deck.set_tag(TagScope::Page(&page), key, "x").unwrap();
    }
    deck.set_tag(TagScope::Page(&page), WidgetKind::Poll.tags().session, "keep").unwrap();

    clear_binding_tags(&mut deck, &page, WidgetKind::Qna).unwrap();
    let tags = &deck.page(&page).unwrap().tags;
    assert_eq!(tags.len(), 1);
    assert_eq!(tags.get(WidgetKind::Poll.tags().session).map(String::as_str), Some("keep"));
}

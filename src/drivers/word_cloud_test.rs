#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::geometry::Size;
use crate::host::{PageId, Shape};
use crate::memory::MemoryDeck;
use crate::tags::read_json;

// =============================================================
// Helpers
// =============================================================

fn deck() -> (MemoryDeck, PageId) {
    let deck = MemoryDeck::with_pages(Size::new(800.0, 600.0), 1);
    let page = deck.pages()[0].clone();
    (deck, page)
}

fn snapshot(cloud_id: &str, fast: u32, slow: u32) -> SessionSnapshot {
    serde_json::from_value(json!({
        "session": { "id": "s1", "code": "ABCD" },
        "word_clouds": [{
            "id": cloud_id,
            "prompt": "One word for today?",
            "status": "open",
            "words": [
                { "id": "w1", "label": "slow", "votes": slow },
                { "id": "w2", "label": "fast", "votes": fast }
            ]
        }]
    }))
    .unwrap()
}

fn inserted() -> (MemoryDeck, PageId, WidgetManifest<WordItem>) {
    let (mut deck, page) = deck();
    let request = InsertRequest { session_id: Some("s1"), ..InsertRequest::default() };
    let manifest = insert(&mut deck, &ShapeKindResolver::new(), &page, &request).unwrap();
    (deck, page, manifest)
}

async fn sync(deck: &mut MemoryDeck, snapshot: &SessionSnapshot) -> TickReport {
    let ctx = SyncContext { session_id: "s1", code: Some("ABCD"), snapshot };
    update(deck, &ShapeKindResolver::new(), &ctx, Duration::ZERO).await.unwrap()
}

fn frames(report: &TickReport, page: &str) -> usize {
    match report.outcome(page, KIND) {
        Some(PageOutcome::Updated { frames, .. }) => *frames,
        other => panic!("unexpected outcome {other:?}"),
    }
}

fn anim_state(deck: &MemoryDeck, page: &str) -> WordCloudAnimState {
    read_json(deck, TagScope::Page(page), KIND.tags().anim_state.unwrap()).unwrap()
}

// =============================================================
// Insert
// =============================================================

#[test]
fn insert_creates_hidden_slots() {
    let (deck, page, manifest) = inserted();
    assert_eq!(manifest.items.len(), 5);
    for (slot, item) in manifest.items.iter().enumerate() {
        let bubble = deck.shape(&page, &item.bubble).unwrap();
        assert_eq!(bubble.transparency, 1.0);
        assert_eq!(bubble.tag("WordIndex"), Some(slot.to_string().as_str()));
        let label = deck.shape(&page, item.label.as_deref().unwrap()).unwrap();
        assert!(label.text.is_empty());
    }
    assert_eq!(deck.shape(&page, &manifest.body).unwrap().text, "Waiting for word cloud votes...");
}

#[test]
fn copy_follows_cloud_state() {
    let mut snapshot = snapshot("c1", 10, 2);
    assert_eq!(subtitle_text(choose_cloud(&snapshot, None)), "One word for today?");
    assert_eq!(body_text(choose_cloud(&snapshot, None)), "Voting is live.");
    assert_eq!(body_text(choose_cloud(&snapshot, Some("c9"))), "Word cloud not found.");
    assert_eq!(subtitle_text(choose_cloud(&snapshot, Some("c9"))), DEFAULT_SUBTITLE);

    snapshot.word_clouds[0].status = ResourceStatus::Closed;
    assert_eq!(body_text(choose_cloud(&snapshot, None)), "Voting is closed.");
    snapshot.word_clouds.clear();
    assert_eq!(body_text(choose_cloud(&snapshot, None)), "No active word cloud yet.");
}

// =============================================================
// Animation
// =============================================================

#[tokio::test]
async fn first_render_animates_and_persists_ratios() {
    let (mut deck, page, manifest) = inserted();
    let report = sync(&mut deck, &snapshot("c1", 10, 2)).await;

    assert_eq!(frames(&report, &page), ANIMATION_FRAMES);
    assert_eq!(deck.flush_count(), ANIMATION_FRAMES);

    let state = anim_state(&deck, &page);
    assert_eq!(state.cloud_id.as_deref(), Some("c1"));
    assert_eq!(state.ratios.get("fast"), Some(&1.0));
    assert_eq!(state.ratios.get("slow"), Some(&0.2));

    let top = &manifest.items[0];
    let label = deck.shape(&page, top.label.as_deref().unwrap()).unwrap();
    assert_eq!(label.text, "fast");
    assert_eq!(label.font.bold, Some(true));
    let slow = deck.shape(&page, manifest.items[1].label.as_deref().unwrap()).unwrap();
    assert_eq!(slow.text, "slow");
    assert!(label.font.size.unwrap() > slow.font.size.unwrap());
    assert_eq!(deck.shape(&page, &top.bubble).unwrap().transparency, 0.0);
    assert_eq!(deck.shape(&page, &manifest.items[2].bubble).unwrap().transparency, 1.0);
}

#[tokio::test]
async fn small_changes_render_one_frame() {
    let (mut deck, page, _) = inserted();
    sync(&mut deck, &snapshot("c1", 50, 10)).await;
    let flushes = deck.flush_count();

    let report = sync(&mut deck, &snapshot("c1", 50, 11)).await;
    assert_eq!(frames(&report, &page), 1);
    assert_eq!(deck.flush_count(), flushes + 1);
}

#[tokio::test]
async fn a_new_cloud_animates_from_zero() {
    let (mut deck, page, _) = inserted();
    sync(&mut deck, &snapshot("c1", 10, 2)).await;
    let report = sync(&mut deck, &snapshot("c2", 10, 2)).await;
    assert_eq!(frames(&report, &page), ANIMATION_FRAMES);
    assert_eq!(anim_state(&deck, &page).cloud_id.as_deref(), Some("c2"));
}

// =============================================================
// Legacy upgrade
// =============================================================

#[tokio::test]
async fn legacy_bubbles_get_labels_once() {
    let (mut deck, page, mut manifest) = inserted();
    for item in &mut manifest.items {
        let label = item.label.take().unwrap();
        deck.delete_shape(&page, &label).unwrap();
    }
    // Early builds stored bare ids and drew the word inside the bubble.
    let bare: Vec<&str> = manifest.items.iter().map(|i| i.bubble.as_str()).collect();
    let raw = json!({
        "container": manifest.container,
        "title": manifest.title,
        "body": manifest.body,
        "words": bare,
    });
    deck.set_tag(TagScope::Page(&page), KIND.tags().manifest, &raw.to_string()).unwrap();
    deck.shape_mut(&page, &manifest.items[0].bubble).unwrap().text = "old".into();

    sync(&mut deck, &snapshot("c1", 10, 2)).await;
    let upgraded: WidgetManifest<WordItem> = read_json(&deck, TagScope::Page(&page), KIND.tags().manifest).unwrap();
    assert!(upgraded.items.iter().all(|item| !item.is_legacy()));
    let first_label = upgraded.items[0].label.as_deref().unwrap();
    assert_eq!(deck.shape(&page, first_label).unwrap().text, "fast");
    assert_eq!(deck.shape(&page, &upgraded.items[0].bubble).unwrap().text, "");
    let count = deck.list_shapes(&page).unwrap().len();

    sync(&mut deck, &snapshot("c1", 10, 2)).await;
    assert_eq!(deck.list_shapes(&page).unwrap().len(), count);
    let role = Role::BubbleLabel.tag_value(KIND);
    let shapes = deck.list_shapes(&page).unwrap();
    let labels: Vec<&Shape> = shapes.iter().filter(|s| tags::shape_role(s) == Some(role.as_str())).collect();
    assert_eq!(labels.len(), 5);
}

const ANIMATION_FRAMES: usize = crate::consts::ANIMATION_FRAME_COUNT;

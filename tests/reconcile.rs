//! Full reconciliation ticks against the in-memory deck.

use std::sync::Arc;
use std::time::Duration;

use livedeck::binding::BindingPhase;
use livedeck::capability::ShapeKindResolver;
use livedeck::drivers::{InsertRequest, PageOutcome, SyncContext, TickReport};
use livedeck::engine::WidgetEngine;
use livedeck::geometry::Size;
use livedeck::host::{DocumentHost, PageId, ShapeKind, TagScope};
use livedeck::kind::WidgetKind;
use livedeck::manifest::{ItemRef, PollItem, WidgetManifest, WordItem};
use livedeck::memory::MemoryDeck;
use livedeck::recovery::Confidence;
use livedeck::session::SessionSnapshot;
use livedeck::tags::read_json;
use serde_json::json;

// =============================================================
// Helpers
// =============================================================

fn engine_with(deck: MemoryDeck) -> WidgetEngine<MemoryDeck> {
    WidgetEngine::with_resolver(deck, Arc::new(ShapeKindResolver::new()), Duration::ZERO)
}

fn snapshot(fast: u32) -> SessionSnapshot {
    serde_json::from_value(json!({
        "session": { "id": "s1", "code": "ABCD", "qna_open": true },
        "questions": [
            { "id": "q1", "text": "Slides shared after?", "status": "approved", "votes": 4 },
            { "id": "q2", "text": "Pending one", "status": "pending", "votes": 0 }
        ],
        "polls": [{
            "id": "p1", "question": "Tabs or spaces?", "status": "open",
            "options": [{ "id": "a", "label": "Tabs", "votes": 3 }, { "id": "b", "label": "Spaces", "votes": 1 }]
        }],
        "word_clouds": [{
            "id": "c1", "status": "open",
            "words": [{ "id": "w1", "label": "fast", "votes": fast }, { "id": "w2", "label": "slow", "votes": 2 }]
        }]
    }))
    .unwrap()
}

async fn sync(engine: &WidgetEngine<MemoryDeck>, session_id: &str, snapshot: &SessionSnapshot) -> TickReport {
    engine.sync_all(&SyncContext { session_id, code: Some("ABCD"), snapshot }).await
}

async fn insert_on(engine: &WidgetEngine<MemoryDeck>, page: &str, kind: WidgetKind, session_id: Option<&str>) {
    let page = page.to_string();
    engine.with_host(|deck| deck.select_page(&page)).await;
    let request = InsertRequest { session_id, ..InsertRequest::default() };
    engine.insert_widget(kind, request).await.unwrap();
}

async fn pages(engine: &WidgetEngine<MemoryDeck>) -> Vec<PageId> {
    engine.with_host(|deck| deck.pages()).await
}

fn assert_manifest_live<I: ItemRef>(
    deck: &MemoryDeck,
    page: &str,
    kind: WidgetKind,
) {
    let manifest: WidgetManifest<I> = read_json(deck, TagScope::Page(page), kind.tags().manifest).unwrap();
    for id in manifest.shape_ids() {
        assert!(deck.shape(page, id).is_some(), "{kind} manifest on {page} points at missing {id}");
    }
}

// =============================================================
// Scenarios
// =============================================================

#[tokio::test]
async fn pending_widgets_are_claimed_and_rendered() {
    let engine = engine_with(MemoryDeck::with_pages(Size::new(960.0, 540.0), 1));
    let page = pages(&engine).await.remove(0);
    for kind in WidgetKind::ALL {
        insert_on(&engine, &page, kind, None).await;
    }

    let report = sync(&engine, "s1", &snapshot(10)).await;
    assert_eq!(report.updated(), 4);
    for kind in WidgetKind::ALL {
        let session = engine.with_host(|deck| deck.get_tag(TagScope::Page(&page), kind.tags().session).unwrap()).await;
        assert_eq!(session.as_deref(), Some("s1"));
    }
}

#[tokio::test]
async fn widgets_bound_elsewhere_are_left_alone() {
    let engine = engine_with(MemoryDeck::with_pages(Size::new(960.0, 540.0), 1));
    let page = pages(&engine).await.remove(0);
    insert_on(&engine, &page, WidgetKind::Poll, Some("other")).await;
    let before = engine.with_host(|deck| serde_json::to_value(deck.page(&page)).unwrap()).await;

    let report = sync(&engine, "s1", &snapshot(10)).await;
    assert_eq!(report.outcome(&page, WidgetKind::Poll), Some(&PageOutcome::Skipped(BindingPhase::Stale)));
    let after = engine.with_host(|deck| serde_json::to_value(deck.page(&page)).unwrap()).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn duplicated_page_recovers_its_own_shapes() {
    let engine = engine_with(MemoryDeck::with_pages(Size::new(960.0, 540.0), 1));
    let original = pages(&engine).await.remove(0);
    insert_on(&engine, &original, WidgetKind::Poll, Some("s1")).await;
    sync(&engine, "s1", &snapshot(10)).await;

    let copy = engine.with_host(|deck| deck.duplicate_page(&original)).await.unwrap();
    let report = sync(&engine, "s1", &snapshot(10)).await;

    assert!(matches!(
        report.outcome(&copy, WidgetKind::Poll),
        Some(PageOutcome::Updated { recovered: Some(Confidence::Tagged), .. })
    ));
    assert!(matches!(
        report.outcome(&original, WidgetKind::Poll),
        Some(PageOutcome::Updated { recovered: None, .. })
    ));
    engine
        .with_host(|deck| {
            assert_manifest_live::<PollItem>(deck, &copy, WidgetKind::Poll);
            assert_manifest_live::<PollItem>(deck, &original, WidgetKind::Poll);
        })
        .await;

    // Recovery is persisted, so the next tick finds a valid manifest.
    let report = sync(&engine, "s1", &snapshot(10)).await;
    assert!(matches!(
        report.outcome(&copy, WidgetKind::Poll),
        Some(PageOutcome::Updated { recovered: None, .. })
    ));
}

#[tokio::test]
async fn a_locked_page_does_not_stop_the_others() {
    let engine = engine_with(MemoryDeck::with_pages(Size::new(960.0, 540.0), 2));
    let all = pages(&engine).await;
    for page in &all {
        insert_on(&engine, page, WidgetKind::Qna, None).await;
    }
    let locked = all[1].clone();
    engine.with_host(|deck| deck.poison_page(&locked)).await;

    let report = sync(&engine, "s1", &snapshot(10)).await;
    assert!(matches!(report.outcome(&all[0], WidgetKind::Qna), Some(PageOutcome::Updated { .. })));
    assert!(matches!(report.outcome(&locked, WidgetKind::Qna), Some(PageOutcome::Failed(_))));
    assert_eq!(report.failed(), 1);
}

#[tokio::test]
async fn unsupported_round_rectangles_fall_back() {
    let mut deck = MemoryDeck::with_pages(Size::new(960.0, 540.0), 1);
    deck.set_unsupported(ShapeKind::RoundRectangle);
    let engine = engine_with(deck);
    let page = pages(&engine).await.remove(0);

    insert_on(&engine, &page, WidgetKind::Poll, Some("s1")).await;
    insert_on(&engine, &page, WidgetKind::Qna, Some("s1")).await;
    assert_eq!(engine.resolver().resolved(ShapeKind::RoundRectangle), Some(ShapeKind::Rectangle));

    let shapes = engine.with_host(|deck| deck.list_shapes(&page).unwrap()).await;
    assert!(shapes.iter().all(|s| s.kind != ShapeKind::RoundRectangle));
    assert!(shapes.iter().any(|s| s.kind == ShapeKind::Rectangle));

    let report = sync(&engine, "s1", &snapshot(10)).await;
    assert_eq!(report.failed(), 0);
}

#[tokio::test]
async fn word_cloud_ticks_animate_then_settle() {
    let engine = engine_with(MemoryDeck::with_pages(Size::new(800.0, 600.0), 1));
    let page = pages(&engine).await.remove(0);
    insert_on(&engine, &page, WidgetKind::WordCloud, Some("s1")).await;
    let flushes = engine.with_host(|deck| deck.flush_count()).await;

    let first = engine
        .update_widget(WidgetKind::WordCloud, &SyncContext { session_id: "s1", code: None, snapshot: &snapshot(10) })
        .await
        .unwrap();
    let Some(PageOutcome::Updated { frames, .. }) = first.outcome(&page, WidgetKind::WordCloud) else {
        panic!("cloud not updated");
    };
    assert!(*frames > 1);
    assert_eq!(engine.with_host(|deck| deck.flush_count()).await, flushes + frames);

    let second = engine
        .update_widget(WidgetKind::WordCloud, &SyncContext { session_id: "s1", code: None, snapshot: &snapshot(10) })
        .await
        .unwrap();
    assert!(matches!(
        second.outcome(&page, WidgetKind::WordCloud),
        Some(PageOutcome::Updated { frames: 1, .. })
    ));
    engine.with_host(|deck| assert_manifest_live::<WordItem>(deck, &page, WidgetKind::WordCloud)).await;
}

#[tokio::test]
async fn repeated_ticks_do_not_grow_the_page() {
    let engine = engine_with(MemoryDeck::with_pages(Size::new(960.0, 540.0), 1));
    let page = pages(&engine).await.remove(0);
    for kind in WidgetKind::ALL {
        insert_on(&engine, &page, kind, Some("s1")).await;
    }

    sync(&engine, "s1", &snapshot(10)).await;
    let count = engine.with_host(|deck| deck.list_shapes(&page).unwrap().len()).await;
    for fast in [11, 30, 5] {
        sync(&engine, "s1", &snapshot(fast)).await;
    }
    assert_eq!(engine.with_host(|deck| deck.list_shapes(&page).unwrap().len()).await, count);
}

#[tokio::test]
async fn deleted_bubble_and_subtitle_are_dropped_from_the_manifest() {
    let engine = engine_with(MemoryDeck::with_pages(Size::new(800.0, 600.0), 1));
    let page = pages(&engine).await.remove(0);
    insert_on(&engine, &page, WidgetKind::WordCloud, Some("s1")).await;
    sync(&engine, "s1", &snapshot(10)).await;

    let manifest: WidgetManifest<WordItem> = engine
        .with_host(|deck| read_json(deck, TagScope::Page(&page), WidgetKind::WordCloud.tags().manifest).unwrap())
        .await;
    let bubble = manifest.items[3].bubble.clone();
    let subtitle = manifest.subtitle.clone().unwrap();
    engine
        .with_host(|deck| {
            deck.delete_shape(&page, &bubble).unwrap();
            deck.delete_shape(&page, &subtitle).unwrap();
        })
        .await;

    for _ in 0..2 {
        let report = sync(&engine, "s1", &snapshot(10)).await;
        assert!(matches!(
            report.outcome(&page, WidgetKind::WordCloud),
            Some(PageOutcome::Updated { recovered: None, .. })
        ));
    }
    engine
        .with_host(|deck| {
            assert_manifest_live::<WordItem>(deck, &page, WidgetKind::WordCloud);
            let manifest: WidgetManifest<WordItem> =
                read_json(deck, TagScope::Page(&page), WidgetKind::WordCloud.tags().manifest).unwrap();
            assert_eq!(manifest.items.len(), 4);
            assert!(manifest.subtitle.is_none());
        })
        .await;
}

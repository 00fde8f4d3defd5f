#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::style::WidgetStyle;

// =============================================================
// Helpers
// =============================================================

fn container() -> Rect {
    Rect::new(0.0, 0.0, 800.0, 600.0)
}

fn word(label: &str, votes: u32) -> RankedWord {
    RankedWord { id: format!("id-{label}"), label: label.to_string(), votes }
}

fn fast_slow() -> Vec<RankedWord> {
    vec![word("fast", 10), word("slow", 2)]
}

fn final_frame(words: &[RankedWord], previous: &BTreeMap<String, f64>) -> WordCloudFrame {
    layout_word_cloud(container(), &WordCloudStyle::default(), words, previous).pop().unwrap()
}

// =============================================================
// Ranking
// =============================================================

#[test]
fn rank_words_sorts_by_votes_and_keeps_ties_stable() {
    let words = vec![
        WordCloudWord { id: "a".into(), label: "alpha".into(), votes: 1 },
        WordCloudWord { id: "b".into(), label: "beta".into(), votes: 3 },
        WordCloudWord { id: "c".into(), label: "gamma".into(), votes: 1 },
    ];
    let ranked: Vec<_> = rank_words(&words, 5).into_iter().map(|w| w.id).collect();
    assert_eq!(ranked, vec!["b", "a", "c"]);
    assert_eq!(rank_words(&words, 1).len(), 1);
}

#[test]
fn vote_ratios_against_max() {
    assert_eq!(vote_ratios(&fast_slow()), vec![1.0, 0.2]);
    assert_eq!(vote_ratios(&[word("a", 0), word("b", 0)]), vec![0.0, 0.0]);
    assert!(vote_ratios(&[]).is_empty());
}

#[test]
fn word_keys_ignore_case_and_spacing() {
    assert_eq!(normalize_word_key("  Machine   Learning "), "machine learning");
    assert_eq!(normalize_word_key("FAST"), normalize_word_key("fast"));
}

// =============================================================
// Static layout
// =============================================================

#[test]
fn fast_and_slow_scenario() {
    let frame = final_frame(&fast_slow(), &BTreeMap::new());
    let fast = &frame.slots[0];
    let slow = &frame.slots[1];

    assert_eq!(fast.ratio, 1.0);
    assert_eq!(fast.font_size, 56.0);
    assert_eq!(slow.ratio, 0.2);
    assert_eq!(slow.font_size, 32.0);
    assert!(!fast.bubble.intersects(&slow.bubble));

    let area = usable_area(container(), &WordCloudStyle::default());
    assert!(area.contains(&fast.bubble));
    assert!(area.contains(&slow.bubble));
}

#[test]
fn usable_area_insets_header_and_sides() {
    let area = usable_area(container(), &WordCloudStyle::default());
    assert_eq!(area, Rect::new(24.0, 120.0, 752.0, 460.0));
}

#[test]
fn unused_slots_are_hidden_at_base_frame() {
    let frame = final_frame(&fast_slow(), &BTreeMap::new());
    assert_eq!(frame.slots.len(), 5);
    let area = usable_area(container(), &WordCloudStyle::default());
    for slot in &frame.slots[2..] {
        assert!(slot.hidden);
        assert_eq!(slot.word_id, None);
        assert_eq!(slot.text, "");
        assert_eq!(slot.bubble, base_frame(area, &ANCHORS[slot.slot]));
    }
}

#[test]
fn max_words_hides_lower_ranks() {
    let style = WordCloudStyle::normalize(Some(&json!({ "maxWords": 1 })));
    let slots = layout_at_ratios(container(), &style, &fast_slow(), &[1.0, 0.2]);
    assert!(!slots[0].hidden);
    assert!(slots[1].hidden);
}

#[test]
fn labels_fit_inside_bubbles() {
    let words = vec![
        word("extraordinarily", 9),
        word("ok", 8),
        word("internationalization", 7),
        word("a", 1),
        word("medium sized", 4),
    ];
    let frame = final_frame(&words, &BTreeMap::new());
    for slot in &frame.slots {
        assert!(slot.font_size >= MIN_LABEL_FONT_SIZE);
        assert!(slot.font_size <= (slot.bubble.height * LINE_FILL).floor().max(MIN_LABEL_FONT_SIZE));
        if slot.font_size > MIN_LABEL_FONT_SIZE {
            let est = GLYPH_WIDTH * char_count(&slot.text) * slot.font_size;
            assert!(est <= slot.bubble.width, "{} overflows: {est} > {}", slot.text, slot.bubble.width);
        }
    }
}

#[test]
fn colors_and_emphasis_follow_ratio() {
    let style = WordCloudStyle::default();
    let slots = layout_at_ratios(container(), &style, &[word("a", 1), word("b", 1), word("c", 1)], &[1.0, 0.5, 0.2]);
    assert_eq!(slots[0].text_color, WHITE);
    assert!(slots[0].bold);
    assert_eq!(slots[1].text_color, style.text_color);
    assert!(slots[1].bold);
    assert!(!slots[2].bold);
    assert_eq!(slots[0].border_color, mix_colors(&style.border_color, &style.accent_color, 0.73));
}

#[test]
fn equal_ratios_still_tint_slots_differently() {
    let slots = layout_at_ratios(container(), &WordCloudStyle::default(), &[word("a", 1), word("b", 1)], &[0.5, 0.5]);
    assert_ne!(slots[0].fill_color, slots[1].fill_color);
}

#[test]
fn more_votes_never_shrink_a_word() {
    let mut last: Option<(f64, f64, f64)> = None;
    for votes in 0..=10 {
        let words = vec![word("anchor", 10), word("growing", votes)];
        let slot = final_frame(&words, &BTreeMap::new()).slots[1].clone();
        let now = (slot.font_size, slot.bubble.width, slot.bubble.height);
        if let Some(prev) = last {
            assert!(now.0 >= prev.0 && now.1 >= prev.1 && now.2 >= prev.2, "{prev:?} -> {now:?}");
        }
        last = Some(now);
    }
}

#[test]
fn layout_is_deterministic() {
    let previous = BTreeMap::from([("fast".to_string(), 0.3)]);
    let a = layout_word_cloud(container(), &WordCloudStyle::default(), &fast_slow(), &previous);
    let b = layout_word_cloud(container(), &WordCloudStyle::default(), &fast_slow(), &previous);
    assert_eq!(a, b);
}

// =============================================================
// Animation
// =============================================================

#[test]
fn large_change_emits_five_eased_frames() {
    let frames = layout_word_cloud(container(), &WordCloudStyle::default(), &fast_slow(), &BTreeMap::new());
    assert_eq!(frames.len(), ANIMATION_FRAME_COUNT);
    assert!(frames.iter().all(|f| f.total == ANIMATION_FRAME_COUNT));

    let ratios: Vec<f64> = frames.iter().map(|f| f.slots[0].ratio).collect();
    assert!(ratios.windows(2).all(|w| w[0] < w[1]));
    assert!((ratios[0] - ease_out_cubic(0.2)).abs() < 1e-12);
    assert_eq!(*ratios.last().unwrap(), 1.0);
    assert_eq!(frames.last().unwrap().slots[1].ratio, 0.2);
}

#[test]
fn small_change_emits_single_frame() {
    let first = WordCloudAnimation::new(container(), &WordCloudStyle::default(), &fast_slow(), &BTreeMap::new());
    let state = first.final_state(Some("cloud"));

    // Both words move by less than 0.02 from the stored ratios.
    let words = vec![word("FAST", 50), word("slow ", 10)];
    let previous = BTreeMap::from([("fast".to_string(), 1.0), ("slow".to_string(), 0.196)]);
    let frames = layout_word_cloud(container(), &WordCloudStyle::default(), &words, &previous);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].slots[1].ratio, 0.2);
    assert_eq!(state.ratios.get("fast"), Some(&1.0));
}

#[test]
fn iterator_reports_remaining_frames() {
    let mut anim = WordCloudAnimation::new(container(), &WordCloudStyle::default(), &fast_slow(), &BTreeMap::new());
    assert_eq!(anim.size_hint(), (5, Some(5)));
    anim.next();
    assert_eq!(anim.size_hint(), (4, Some(4)));
    assert_eq!(anim.by_ref().count(), 4);
    assert!(anim.next().is_none());
}

#[test]
fn replaying_a_frame_is_identical() {
    let anim = WordCloudAnimation::new(container(), &WordCloudStyle::default(), &fast_slow(), &BTreeMap::new());
    assert_eq!(anim.frame(2), anim.frame(2));
}

// =============================================================
// Persisted state
// =============================================================

#[test]
fn anim_state_resets_for_a_different_cloud() {
    let state = WordCloudAnimState { cloud_id: Some("c1".into()), ratios: BTreeMap::from([("fast".into(), 0.5)]) };
    assert_eq!(state.ratios_for(Some("c1")).len(), 1);
    assert!(state.ratios_for(Some("c2")).is_empty());
    assert!(state.ratios_for(None).is_empty());
}

#[test]
fn anim_state_sanitizes_ratios() {
    let raw = r#"{"cloudId":"c","ratios":{"a":4.0,"b":-1.0,"c":0.25}}"#;
    let state: WordCloudAnimState = serde_json::from_str(raw).unwrap();
    let state = state.sanitized();
    assert_eq!(state.ratios.get("a"), Some(&1.0));
    assert_eq!(state.ratios.get("b"), Some(&0.0));
    assert_eq!(state.ratios.get("c"), Some(&0.25));
}

#[test]
fn default_frame_is_centered() {
    let frame = word_cloud_frame(Size::new(960.0, 540.0));
    assert_eq!(frame.width, 672.0);
    assert_eq!(frame.left, 144.0);
    assert_eq!(frame.height, 324.0);
}

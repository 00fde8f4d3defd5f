#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;
use crate::style::WidgetStyle;

fn container() -> Rect {
    Rect::new(100.0, 50.0, 600.0, 400.0)
}

fn option(label: &str, votes: u32) -> PollOption {
    PollOption { id: format!("o-{label}"), label: label.to_string(), votes }
}

fn vertical() -> PollStyle {
    PollStyle::normalize(Some(&json!({ "orientation": "vertical" })))
}

// =============================================================
// Ratios
// =============================================================

#[test]
fn ratios_against_total() {
    let ratios = option_ratios(&[option("a", 3), option("b", 1)]);
    assert_eq!(ratios, vec![0.75, 0.25]);
    assert_eq!(option_ratios(&[option("a", 0)]), vec![0.0]);
}

#[test]
fn label_shows_votes_and_percent() {
    assert_eq!(option_label(&option("Yes", 3), 0.75), "Yes · 3 (75%)");
}

// =============================================================
// Horizontal
// =============================================================

#[test]
fn horizontal_rows_stack_and_fill_scales() {
    let options = [option("a", 3), option("b", 1)];
    let layout = layout_poll(container(), &PollStyle::default(), Some(&options[..]));
    let a = &layout.slots[0];
    let b = &layout.slots[1];

    assert_eq!(a.track, Rect::new(124.0, 176.0, 552.0, 10.0));
    assert_eq!(a.label, Rect::new(124.0, 158.0, 552.0, 16.0));
    assert_eq!(b.track.top, a.track.top + 34.0);
    assert_eq!(a.fill, Rect::new(124.0, 176.0, 414.0, 10.0));
    assert_eq!(b.fill.width, 138.0);
    assert_eq!(a.state, SlotState::Active);
    assert_eq!(a.fill_transparency, 0.0);
    assert_eq!(a.track_transparency, 0.0);
}

#[test]
fn zero_vote_option_in_voted_poll_gets_hidden_minimum_fill() {
    let options = [option("a", 4), option("b", 0)];
    let layout = layout_poll(container(), &PollStyle::default(), Some(&options[..]));
    assert_eq!(layout.slots[1].fill.width, MIN_FILL_EXTENT);
    assert_eq!(layout.slots[1].fill_transparency, 1.0);
    assert_eq!(layout.slots[1].track_transparency, 0.0);
}

#[test]
fn all_zero_votes_render_minimum_fill_and_faint_track() {
    let options = [option("a", 0), option("b", 0), option("c", 0)];
    let layout = layout_poll(container(), &PollStyle::default(), Some(&options[..]));
    for slot in &layout.slots[..3] {
        assert_eq!(slot.state, SlotState::Active);
        assert_eq!(slot.fill.width, 2.0);
        assert_eq!(slot.fill_transparency, 1.0);
        assert_eq!(slot.track_transparency, REDUCED_TRACK_TRANSPARENCY);
    }
}

#[test]
fn slots_without_options_are_hidden_once_a_poll_exists() {
    let layout = layout_poll(container(), &PollStyle::default(), Some(&[option("a", 1)][..]));
    for slot in &layout.slots[1..] {
        assert_eq!(slot.state, SlotState::Empty);
        assert_eq!(slot.label_text, "");
        assert_eq!(slot.track_transparency, 1.0);
    }
}

#[test]
fn no_poll_keeps_placeholder_tracks() {
    let layout = layout_poll(container(), &PollStyle::default(), None);
    assert!(layout.slots.iter().all(|s| s.state == SlotState::Empty));
    assert!(layout.slots.iter().all(|s| s.track_transparency == REDUCED_TRACK_TRANSPARENCY));
}

#[test]
fn options_beyond_max_are_disabled() {
    let style = PollStyle::normalize(Some(&json!({ "maxOptions": 2 })));
    let options = [option("a", 1), option("b", 2), option("c", 3)];
    let layout = layout_poll(container(), &style, Some(&options[..]));
    assert_eq!(layout.slots[1].state, SlotState::Active);
    let c = &layout.slots[2];
    assert_eq!(c.state, SlotState::Disabled);
    assert_eq!(c.fill.width, MIN_FILL_EXTENT);
    assert_eq!(c.fill_transparency, 1.0);
    assert_eq!(c.track_transparency, REDUCED_TRACK_TRANSPARENCY);
    assert_eq!(c.label_text, "");
}

#[test]
fn thickness_scale_widens_rows() {
    let style = PollStyle::normalize(Some(&json!({ "barThicknessScale": 2 })));
    let layout = layout_poll(container(), &style, None);
    assert_eq!(layout.slots[0].track.height, 20.0);
    assert_eq!(layout.slots[1].track.top - layout.slots[0].track.top, 38.0);
}

// =============================================================
// Vertical
// =============================================================

#[test]
fn vertical_columns_are_equal_width_and_fill_grows_up() {
    let options = [option("a", 1), option("b", 3)];
    let layout = layout_poll(container(), &vertical(), Some(&options[..]));
    assert_eq!(layout.orientation, Orientation::Vertical);

    let column = 552.0 / 5.0;
    let a = &layout.slots[0];
    let b = &layout.slots[1];
    assert!((b.label.left - a.label.left - column).abs() < 1e-9);
    assert_eq!(a.track.width, column * 0.85);
    assert_eq!(a.track.top, 50.0 + 108.0);
    assert_eq!(a.track.height, 400.0 - 108.0 - 16.0 - 24.0);

    assert_eq!(b.fill.bottom(), b.track.bottom());
    assert_eq!(b.fill.height, b.track.height * 0.75);
    assert!(a.label.top > a.track.bottom());
}

#[test]
fn orientation_toggle_recomputes_geometry() {
    let options = [option("a", 1)];
    let h = layout_poll(container(), &PollStyle::default(), Some(&options[..]));
    let v = layout_poll(container(), &vertical(), Some(&options[..]));
    assert_ne!(h.slots[0].track, v.slots[0].track);
    assert_eq!(h.title, v.title);
}

#[test]
fn default_frame_fits_five_rows() {
    let style = PollStyle::default();
    let frame = poll_frame(Size::new(960.0, 540.0), &style);
    assert_eq!(frame.width, 576.0);
    assert_eq!(frame.left, 192.0);
    let layout = layout_poll(frame, &style, None);
    assert!(layout.slots.iter().all(|s| frame.contains(&s.track)));
}

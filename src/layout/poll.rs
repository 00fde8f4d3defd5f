//! Poll bar geometry.
//!
//! Five slots are laid out as stacked rows (horizontal) or equal-width columns
//! (vertical). Each slot has a label, a track and a fill whose extent along
//! the track is `max(2, track * ratio)` with `ratio = votes / total`.
//! Orientation changes recompute everything; nothing is carried over.

#[cfg(test)]
#[path = "poll_test.rs"]
mod poll_test;

use crate::consts::{MAX_POLL_OPTIONS, MIN_FILL_EXTENT, REDUCED_TRACK_TRANSPARENCY};
use crate::geometry::{Rect, Size};
use crate::session::PollOption;
use crate::style::{Orientation, PollStyle};

const PAD_X: f64 = 24.0;
const OPTION_START: f64 = 108.0;
const LABEL_HEIGHT: f64 = 16.0;
const BAR_THICKNESS: f64 = 10.0;
const ROW_HEIGHT: f64 = 34.0;
const MIN_BAR_AREA: f64 = 60.0;

/// What a slot is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Bound to a poll option.
    Active,
    /// Within the configured maximum but the poll has no option for it.
    Empty,
    /// Beyond the configured maximum.
    Disabled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollSlotLayout {
    pub slot: usize,
    pub state: SlotState,
    pub label_text: String,
    pub label: Rect,
    pub track: Rect,
    pub fill: Rect,
    pub ratio: f64,
    pub track_transparency: f64,
    pub fill_transparency: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollLayout {
    pub orientation: Orientation,
    pub title: Rect,
    pub question: Rect,
    pub slots: Vec<PollSlotLayout>,
}

/// `votes / total`, or 0 everywhere when nobody has voted.
#[must_use]
pub fn option_ratios(options: &[PollOption]) -> Vec<f64> {
    let total: u64 = options.iter().map(|o| u64::from(o.votes)).sum();
    options
        .iter()
        .map(|o| {
            if total == 0 {
                0.0
            } else {
                #[allow(clippy::cast_precision_loss)]
                let ratio = f64::from(o.votes) / total as f64;
                ratio
            }
        })
        .collect()
}

/// Label line for an active option.
#[must_use]
pub fn option_label(option: &PollOption, ratio: f64) -> String {
    let percent = (ratio * 100.0).round();
    format!("{} · {} ({percent}%)", option.label, option.votes)
}

fn thickness(style: &PollStyle) -> f64 {
    BAR_THICKNESS * style.spacing_scale * style.bar_thickness_scale
}

fn row_height(style: &PollStyle) -> f64 {
    (ROW_HEIGHT * style.spacing_scale).max(thickness(style) + 18.0)
}

/// Default container for a freshly inserted poll.
#[must_use]
pub fn poll_frame(page: Size, style: &PollStyle) -> Rect {
    let s = style.spacing_scale;
    let width = (page.width * 0.6).max(360.0);
    #[allow(clippy::cast_precision_loss)]
    let slots = MAX_POLL_OPTIONS as f64;
    let content = match style.orientation {
        Orientation::Horizontal => OPTION_START * s + slots * row_height(style) + 24.0,
        Orientation::Vertical => OPTION_START * s + 160.0 * s + LABEL_HEIGHT * s + 30.0,
    };
    let height = (page.height * 0.55).max(260.0).max(content);
    let top = ((page.height - height) / 2.0).max(12.0);
    Rect::new((page.width - width) / 2.0, top, width, height)
}

struct SlotGeometry {
    label: Rect,
    track: Rect,
}

fn slot_geometry(container: Rect, style: &PollStyle, slot: usize) -> SlotGeometry {
    let s = style.spacing_scale;
    let left = container.left + PAD_X;
    let full = (container.width - PAD_X * 2.0).max(0.0);
    let option_top = container.top + OPTION_START * s;
    #[allow(clippy::cast_precision_loss)]
    let index = slot as f64;

    match style.orientation {
        Orientation::Horizontal => {
            let row_top = option_top + index * row_height(style);
            SlotGeometry {
                label: Rect::new(left, row_top, full, LABEL_HEIGHT * s),
                track: Rect::new(left, row_top + 18.0, full, thickness(style)),
            }
        }
        Orientation::Vertical => {
            #[allow(clippy::cast_precision_loss)]
            let column = full / MAX_POLL_OPTIONS as f64;
            let label_height = LABEL_HEIGHT * s;
            let bar_area = (MIN_BAR_AREA * s).max(container.height - OPTION_START * s - label_height - 24.0);
            let bar_width = (column * 0.95).min((column * 0.85 * style.bar_thickness_scale).max(6.0));
            let column_left = left + index * column;
            let track = Rect::new(column_left + (column - bar_width) / 2.0, option_top, bar_width, bar_area);
            SlotGeometry {
                label: Rect::new(column_left, track.bottom() + 6.0, column, label_height),
                track,
            }
        }
    }
}

fn fill_rect(track: Rect, orientation: Orientation, extent: f64) -> Rect {
    match orientation {
        Orientation::Horizontal => Rect::new(track.left, track.top, extent.min(track.width), track.height),
        Orientation::Vertical => {
            let extent = extent.min(track.height);
            Rect::new(track.left, track.bottom() - extent, track.width, extent)
        }
    }
}

/// Lay out all five slots.
///
/// `options` is `None` when no poll exists yet; empty slots then keep a faint
/// track as a placeholder. With a poll, slots past its option count are hidden.
#[must_use]
pub fn layout_poll(container: Rect, style: &PollStyle, options: Option<&[PollOption]>) -> PollLayout {
    let s = style.spacing_scale;
    let inner_width = (container.width - PAD_X * 2.0).max(0.0);
    let ratios = options.map(option_ratios).unwrap_or_default();
    let has_votes = options.is_some_and(|opts| opts.iter().any(|o| o.votes > 0));

    let slots = (0..MAX_POLL_OPTIONS)
        .map(|slot| {
            let SlotGeometry { label, track } = slot_geometry(container, style, slot);
            let track_extent = match style.orientation {
                Orientation::Horizontal => track.width,
                Orientation::Vertical => track.height,
            };
            let min_fill = fill_rect(track, style.orientation, MIN_FILL_EXTENT);
            let option = options.and_then(|opts| opts.get(slot));

            match option {
                _ if slot >= style.max_options => PollSlotLayout {
                    slot,
                    state: SlotState::Disabled,
                    label_text: String::new(),
                    label,
                    track,
                    fill: min_fill,
                    ratio: 0.0,
                    track_transparency: REDUCED_TRACK_TRANSPARENCY,
                    fill_transparency: 1.0,
                },
                Some(option) => {
                    let ratio = ratios.get(slot).copied().unwrap_or(0.0);
                    let (fill, fill_transparency, track_transparency) = if has_votes {
                        let extent = (track_extent * ratio).max(MIN_FILL_EXTENT);
                        let hidden = if ratio > 0.0 { 0.0 } else { 1.0 };
                        (fill_rect(track, style.orientation, extent), hidden, 0.0)
                    } else {
                        (min_fill, 1.0, REDUCED_TRACK_TRANSPARENCY)
                    };
                    PollSlotLayout {
                        slot,
                        state: SlotState::Active,
                        label_text: option_label(option, ratio),
                        label,
                        track,
                        fill,
                        ratio,
                        track_transparency,
                        fill_transparency,
                    }
                }
                None => PollSlotLayout {
                    slot,
                    state: SlotState::Empty,
                    label_text: String::new(),
                    label,
                    track,
                    fill: min_fill,
                    ratio: 0.0,
                    track_transparency: if options.is_some() { 1.0 } else { REDUCED_TRACK_TRANSPARENCY },
                    fill_transparency: 1.0,
                },
            }
        })
        .collect();

    PollLayout {
        orientation: style.orientation,
        title: Rect::new(container.left + PAD_X, container.top + 18.0 * s, inner_width, 34.0 * s),
        question: Rect::new(container.left + PAD_X, container.top + 56.0 * s, inner_width, 40.0 * s),
        slots,
    }
}

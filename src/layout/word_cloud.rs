//! Word-cloud layout and animated transitions.
//!
//! DESIGN
//! ======
//! Five fixed anchor slots are laid out over the container's usable area
//! (the container minus a header band and side padding). A word's rank picks
//! its anchor: rank 0 is the large central slot. Within its anchor a bubble
//! grows with the word's vote ratio, is floored so the label fits at the
//! target font size, and is capped to a share of the usable area. The font is
//! then re-fitted so the label's estimated width and height stay inside the
//! bubble.
//!
//! Transitions are an iterator of complete frames. The caller (the word-cloud
//! driver) owns pacing and flushes between frames; this module never sleeps.
//!
//! Every computation is deterministic in its inputs, so identical
//! `(container, style, words, previous ratios)` yield identical frames.

#[cfg(test)]
#[path = "word_cloud_test.rs"]
mod word_cloud_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::{WHITE, mix_colors};
use crate::consts::{ANIMATION_DELTA_THRESHOLD, ANIMATION_FRAME_COUNT, MAX_WORD_CLOUD_WORDS, MIN_LABEL_FONT_SIZE};
use crate::geometry::{Rect, Size, clamp, ease_out_cubic, interpolate};
use crate::session::WordCloudWord;
use crate::style::WordCloudStyle;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Header band above the bubble area, before spacing scale.
const HEADER_INSET: f64 = 120.0;
const SIDE_INSET: f64 = 24.0;
const BOTTOM_INSET: f64 = 20.0;

/// Estimated glyph width as a fraction of font size.
const GLYPH_WIDTH: f64 = 0.53;
/// Label height as a fraction of bubble height that the font may use.
const LINE_FILL: f64 = 0.7;
/// Horizontal padding between bubble edge and label.
const LABEL_PAD: f64 = 12.0;

const MAX_BUBBLE_WIDTH_SHARE: f64 = 0.56;
const MAX_BUBBLE_HEIGHT_SHARE: f64 = 0.48;

struct Anchor {
    /// Center, as fractions of the usable area.
    cx: f64,
    cy: f64,
    /// Base extent, as fractions of the usable area.
    w: f64,
    h: f64,
    /// Fixed accent tint so slots differ at equal votes.
    seed: f64,
}

const ANCHORS: [Anchor; MAX_WORD_CLOUD_WORDS] = [
    Anchor { cx: 0.50, cy: 0.24, w: 0.42, h: 0.30, seed: 0.14 },
    Anchor { cx: 0.24, cy: 0.58, w: 0.32, h: 0.24, seed: 0.10 },
    Anchor { cx: 0.76, cy: 0.58, w: 0.32, h: 0.24, seed: 0.07 },
    Anchor { cx: 0.30, cy: 0.86, w: 0.28, h: 0.20, seed: 0.05 },
    Anchor { cx: 0.70, cy: 0.86, w: 0.28, h: 0.20, seed: 0.03 },
];

// =============================================================================
// RANKING
// =============================================================================

/// A word with its vote count, in rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedWord {
    pub id: String,
    pub label: String,
    pub votes: u32,
}

/// Case- and whitespace-insensitive key used to carry ratios across updates.
#[must_use]
pub fn normalize_word_key(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Order by votes (descending, ties keep input order) and keep `limit`.
#[must_use]
pub fn rank_words(words: &[WordCloudWord], limit: usize) -> Vec<RankedWord> {
    let mut ranked: Vec<RankedWord> = words
        .iter()
        .map(|w| RankedWord { id: w.id.clone(), label: w.label.clone(), votes: w.votes })
        .collect();
    ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
    ranked.truncate(limit.min(MAX_WORD_CLOUD_WORDS));
    ranked
}

/// `votes / max(votes)`, or 0 for every word when nobody has voted.
#[must_use]
pub fn vote_ratios(words: &[RankedWord]) -> Vec<f64> {
    let max = words.iter().map(|w| w.votes).max().unwrap_or(0);
    words
        .iter()
        .map(|w| if max == 0 { 0.0 } else { f64::from(w.votes) / f64::from(max) })
        .collect()
}

// =============================================================================
// ANIMATION STATE
// =============================================================================

/// Last-rendered ratios, persisted on the page between updates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCloudAnimState {
    #[serde(default)]
    pub cloud_id: Option<String>,
    #[serde(default)]
    pub ratios: BTreeMap<String, f64>,
}

impl WordCloudAnimState {
    /// Drop entries that are not finite ratios and clamp the rest to `[0, 1]`.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.ratios.retain(|_, r| r.is_finite());
        for ratio in self.ratios.values_mut() {
            *ratio = clamp(*ratio, 0.0, 1.0);
        }
        self
    }

    /// Starting ratios for `cloud_id`. A different cloud starts from zero.
    #[must_use]
    pub fn ratios_for(&self, cloud_id: Option<&str>) -> BTreeMap<String, f64> {
        if self.cloud_id.as_deref() == cloud_id { self.ratios.clone() } else { BTreeMap::new() }
    }
}

// =============================================================================
// FRAME GEOMETRY
// =============================================================================

/// Default container for a freshly inserted cloud.
#[must_use]
pub fn word_cloud_frame(page: Size) -> Rect {
    let width = (page.width * 0.7).max(360.0);
    let height = (page.height * 0.6).max(300.0);
    Rect::new((page.width - width) / 2.0, page.height * 0.15, width, height)
}

/// Header text rectangles inside a cloud container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordCloudChrome {
    pub title: Rect,
    pub subtitle: Rect,
    pub body: Rect,
}

#[must_use]
pub fn word_cloud_chrome(container: Rect, style: &WordCloudStyle) -> WordCloudChrome {
    let s = style.spacing_scale;
    let left = container.left + SIDE_INSET;
    let width = (container.width - SIDE_INSET * 2.0).max(0.0);
    WordCloudChrome {
        title: Rect::new(left, container.top + 18.0 * s, width, 32.0 * s),
        subtitle: Rect::new(left, container.top + 52.0 * s, width, 20.0 * s),
        body: Rect::new(left, container.top + 76.0 * s, width, 22.0 * s),
    }
}

/// Area bubbles may occupy.
#[must_use]
pub fn usable_area(container: Rect, style: &WordCloudStyle) -> Rect {
    let s = style.spacing_scale;
    container.inset(SIDE_INSET * s, HEADER_INSET * s, SIDE_INSET * s, BOTTOM_INSET * s)
}

/// Layout for one anchor slot.
#[derive(Debug, Clone, PartialEq)]
pub struct WordSlot {
    pub slot: usize,
    /// Word shown in this slot, `None` when hidden.
    pub word_id: Option<String>,
    pub text: String,
    pub ratio: f64,
    pub bubble: Rect,
    pub label: Rect,
    pub font_size: f64,
    pub fill_color: String,
    pub border_color: String,
    pub text_color: String,
    pub bold: bool,
    /// Hidden slots sit at their anchor's base frame, fully transparent.
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordCloudFrame {
    pub index: usize,
    pub total: usize,
    pub slots: Vec<WordSlot>,
}

fn base_frame(area: Rect, anchor: &Anchor) -> Rect {
    Rect::from_center(
        area.left + area.width * anchor.cx,
        area.top + area.height * anchor.cy,
        area.width * anchor.w,
        area.height * anchor.h,
    )
}

fn label_rect(bubble: Rect) -> Rect {
    let width = (bubble.width - LABEL_PAD * 2.0).max(0.0);
    let height = bubble.height * 0.72;
    let (cx, cy) = bubble.center();
    Rect::from_center(cx, cy, width, height)
}

/// Target font size before fitting: concave in ratio.
#[must_use]
pub fn target_font_size(style: &WordCloudStyle, ratio: f64) -> f64 {
    let r = clamp(ratio, 0.0, 1.0);
    (style.min_font_size + (style.max_font_size - style.min_font_size) * r.powf(0.7)).round()
}

#[allow(clippy::cast_precision_loss)]
fn char_count(label: &str) -> f64 {
    label.chars().count().max(1) as f64
}

fn hidden_slot(area: Rect, slot: usize, style: &WordCloudStyle) -> WordSlot {
    let bubble = base_frame(area, &ANCHORS[slot]);
    WordSlot {
        slot,
        word_id: None,
        text: String::new(),
        ratio: 0.0,
        bubble,
        label: label_rect(bubble),
        font_size: style.min_font_size,
        fill_color: style.panel_color.clone(),
        border_color: style.border_color.clone(),
        text_color: style.text_color.clone(),
        bold: false,
        hidden: true,
    }
}

fn word_slot(area: Rect, slot: usize, word: &RankedWord, ratio: f64, style: &WordCloudStyle) -> WordSlot {
    let anchor = &ANCHORS[slot];
    let r = clamp(ratio, 0.0, 1.0);
    let base = base_frame(area, anchor);
    let chars = char_count(&word.label);
    let target = target_font_size(style, r);

    // Grow with the ratio, floor to fit the label at the target size, then cap.
    let mut width = base.width * (0.9 + 0.28 * r);
    let mut height = base.height * (0.94 + 0.22 * r);
    width = width.max(GLYPH_WIDTH * chars * target + LABEL_PAD * 2.0);
    height = height.max(target / LINE_FILL);
    width = width.min(area.width * MAX_BUBBLE_WIDTH_SHARE);
    height = height.min(area.height * MAX_BUBBLE_HEIGHT_SHARE);

    let fit_width = ((width - LABEL_PAD * 2.0).max(0.0) / (GLYPH_WIDTH * chars)).floor();
    let fit_height = (height * LINE_FILL).floor();
    let font_size = target.min(fit_width).min(fit_height).max(MIN_LABEL_FONT_SIZE);

    let (cx, cy) = base.center();
    let bubble = Rect::from_center(cx, cy, width, height).shifted_inside(&area);

    let tinted = mix_colors(&style.panel_color, &style.accent_color, anchor.seed);
    WordSlot {
        slot,
        word_id: Some(word.id.clone()),
        text: word.label.clone(),
        ratio: r,
        bubble,
        label: label_rect(bubble),
        font_size,
        fill_color: mix_colors(&tinted, &style.accent_color, 0.16 + 0.56 * r),
        border_color: mix_colors(&style.border_color, &style.accent_color, 0.28 + 0.45 * r),
        text_color: if r > 0.6 { WHITE.to_string() } else { style.text_color.clone() },
        bold: r >= 0.4,
        hidden: false,
    }
}

/// Static layout: one slot per anchor, words in rank order at `ratios`.
#[must_use]
pub fn layout_at_ratios(container: Rect, style: &WordCloudStyle, words: &[RankedWord], ratios: &[f64]) -> Vec<WordSlot> {
    let area = usable_area(container, style);
    let shown = words.len().min(style.max_words).min(MAX_WORD_CLOUD_WORDS);
    (0..MAX_WORD_CLOUD_WORDS)
        .map(|slot| match (slot < shown, words.get(slot)) {
            (true, Some(word)) => word_slot(area, slot, word, ratios.get(slot).copied().unwrap_or(0.0), style),
            _ => hidden_slot(area, slot, style),
        })
        .collect()
}

// =============================================================================
// ANIMATION
// =============================================================================

/// Frame iterator from the previous rendered ratios to the current votes.
#[derive(Debug, Clone)]
pub struct WordCloudAnimation {
    container: Rect,
    style: WordCloudStyle,
    words: Vec<RankedWord>,
    from: Vec<f64>,
    to: Vec<f64>,
    total: usize,
    next: usize,
}

impl WordCloudAnimation {
    /// `previous` maps normalized word keys to last-rendered ratios; words
    /// missing from it start at 0.
    #[must_use]
    pub fn new(container: Rect, style: &WordCloudStyle, words: &[RankedWord], previous: &BTreeMap<String, f64>) -> Self {
        let limit = style.max_words.min(MAX_WORD_CLOUD_WORDS);
        let words: Vec<RankedWord> = words.iter().take(limit).cloned().collect();
        let to = vote_ratios(&words);
        let from: Vec<f64> = words
            .iter()
            .map(|w| clamp(previous.get(&normalize_word_key(&w.label)).copied().unwrap_or(0.0), 0.0, 1.0))
            .collect();
        let animate = from.iter().zip(&to).any(|(a, b)| (b - a).abs() > ANIMATION_DELTA_THRESHOLD);
        let total = if animate { ANIMATION_FRAME_COUNT } else { 1 };
        Self { container, style: style.clone(), words, from, to, total, next: 0 }
    }

    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn target_ratios(&self) -> &[f64] {
        &self.to
    }

    /// Ratios at frame `index`. The last frame is exactly the target.
    #[must_use]
    pub fn ratios_at(&self, index: usize) -> Vec<f64> {
        if index + 1 >= self.total {
            return self.to.clone();
        }
        #[allow(clippy::cast_precision_loss)]
        let t = ease_out_cubic((index + 1) as f64 / self.total as f64);
        self.from.iter().zip(&self.to).map(|(a, b)| interpolate(*a, *b, t)).collect()
    }

    #[must_use]
    pub fn frame(&self, index: usize) -> WordCloudFrame {
        WordCloudFrame {
            index,
            total: self.total,
            slots: layout_at_ratios(self.container, &self.style, &self.words, &self.ratios_at(index)),
        }
    }

    /// State to persist once the final frame has been rendered.
    #[must_use]
    pub fn final_state(&self, cloud_id: Option<&str>) -> WordCloudAnimState {
        WordCloudAnimState {
            cloud_id: cloud_id.map(str::to_string),
            ratios: self
                .words
                .iter()
                .zip(&self.to)
                .map(|(w, r)| (normalize_word_key(&w.label), *r))
                .collect(),
        }
    }
}

impl Iterator for WordCloudAnimation {
    type Item = WordCloudFrame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let frame = self.frame(self.next);
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total.saturating_sub(self.next);
        (left, Some(left))
    }
}

/// All frames of the transition from `previous` to the words' current ratios.
#[must_use]
pub fn layout_word_cloud(
    container: Rect,
    style: &WordCloudStyle,
    words: &[RankedWord],
    previous: &BTreeMap<String, f64>,
) -> Vec<WordCloudFrame> {
    WordCloudAnimation::new(container, style, words, previous).collect()
}

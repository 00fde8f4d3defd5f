//! Q&A and discussion panel geometry.
//!
//! The panel is a header (eyebrow, title, subtitle and a count badge on the
//! right), a body text box, and as many item cards as fit below the header,
//! capped by `max_questions`.

#[cfg(test)]
#[path = "panel_test.rs"]
mod panel_test;

use crate::geometry::{Rect, Size};
use crate::style::QnaStyle;

use super::shadow_rect;

const PAD_X: f64 = 24.0;
const HEADER_TOP: f64 = 18.0;
const BADGE_WIDTH: f64 = 98.0;
const BADGE_HEIGHT: f64 = 22.0;
const BADGE_GAP: f64 = 12.0;
const EYEBROW_HEIGHT: f64 = 12.0;
const TITLE_HEIGHT: f64 = 22.0;
const SUBTITLE_HEIGHT: f64 = 16.0;
const ROW_GAP: f64 = 6.0;
const BODY_GAP: f64 = 12.0;
const BOTTOM_PAD: f64 = 16.0;
const ITEM_HEIGHT: f64 = 48.0;
const ITEM_GAP: f64 = 12.0;
const MIN_BODY_HEIGHT: f64 = 80.0;

// Font sizes (points) for each text role.
pub const META_FONT_SIZE: f64 = 11.0;
pub const TITLE_FONT_SIZE: f64 = 18.0;
pub const SUBTITLE_FONT_SIZE: f64 = 13.0;
pub const BADGE_FONT_SIZE: f64 = 11.0;
pub const BODY_FONT_SIZE: f64 = 14.0;
pub const ITEM_TEXT_FONT_SIZE: f64 = 14.0;
pub const ITEM_VOTES_FONT_SIZE: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemCardLayout {
    pub card: Rect,
    pub text: Rect,
    pub votes: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelLayout {
    pub shadow: Rect,
    pub container: Rect,
    pub meta: Rect,
    pub title: Rect,
    pub subtitle: Rect,
    pub badge: Rect,
    pub body: Rect,
    pub items: Vec<ItemCardLayout>,
}

/// Default container for a freshly inserted panel.
#[must_use]
pub fn panel_frame(page: Size) -> Rect {
    let width = (page.width * 0.68).max(360.0);
    let height = (page.height * 0.52).max(280.0);
    Rect::new((page.width - width) / 2.0, page.height * 0.12, width, height)
}

/// Number of item cards that fit in `available` height, at least one.
#[must_use]
pub fn item_capacity(available: f64, style: &QnaStyle) -> usize {
    let s = style.spacing_scale;
    let (height, gap) = (ITEM_HEIGHT * s, ITEM_GAP * s);
    let fit = ((available + gap) / (height + gap)).floor().max(0.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let fit = fit as usize;
    fit.min(style.max_questions).max(1)
}

#[must_use]
pub fn layout_panel(container: Rect, style: &QnaStyle) -> PanelLayout {
    let s = style.spacing_scale;
    let Rect { left, top, width, .. } = container;
    let text_left = left + PAD_X;
    let inner_width = (width - PAD_X * 2.0).max(0.0);
    let text_width = width - PAD_X * 2.0 - BADGE_WIDTH - BADGE_GAP;

    let header_top = top + HEADER_TOP * s;
    let title_top = header_top + EYEBROW_HEIGHT * s + ROW_GAP * s;
    let subtitle_top = title_top + TITLE_HEIGHT * s + ROW_GAP * s;
    let body_top = subtitle_top + SUBTITLE_HEIGHT * s + BODY_GAP * s;
    let available = container.height - (body_top - top) - BOTTOM_PAD;

    let (item_height, item_gap) = (ITEM_HEIGHT * s, ITEM_GAP * s);
    let items = (0..item_capacity(available, style))
        .map(|index| {
            #[allow(clippy::cast_precision_loss)]
            let card_top = body_top + index as f64 * (item_height + item_gap);
            let card = Rect::new(text_left, card_top, inner_width, item_height);
            ItemCardLayout {
                card,
                text: Rect::new(text_left + 12.0, card_top + 10.0 * s, inner_width - 24.0, 20.0 * s),
                votes: Rect::new(text_left + 12.0, card_top + 30.0 * s, inner_width - 24.0, 14.0 * s),
            }
        })
        .collect();

    PanelLayout {
        shadow: shadow_rect(container),
        container,
        meta: Rect::new(text_left, header_top, text_width.max(160.0), EYEBROW_HEIGHT * s),
        title: Rect::new(text_left, title_top, text_width.max(160.0), TITLE_HEIGHT * s),
        subtitle: Rect::new(text_left, subtitle_top, text_width.max(180.0), SUBTITLE_HEIGHT * s),
        badge: Rect::new(left + width - PAD_X - BADGE_WIDTH, title_top, BADGE_WIDTH, BADGE_HEIGHT),
        body: Rect::new(text_left, body_top, inner_width, available.max(MIN_BODY_HEIGHT)),
        items,
    }
}

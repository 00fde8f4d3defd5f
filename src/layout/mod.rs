//! Pure geometry for each widget kind.
//!
//! Layout functions take rectangles, a normalized style and data, and return
//! plain values. They never touch the host, so every number they produce can
//! be asserted exactly in tests.

pub mod panel;
pub mod poll;
pub mod word_cloud;

use crate::consts::{SHADOW_OFFSET_X, SHADOW_OFFSET_Y};
use crate::geometry::Rect;

/// Drop-shadow rectangle for a container.
#[must_use]
pub fn shadow_rect(container: Rect) -> Rect {
    container.offset(SHADOW_OFFSET_X, SHADOW_OFFSET_Y)
}

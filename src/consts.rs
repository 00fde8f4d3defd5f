//! Shared constants for the reconciliation engine.

// ── Tags ────────────────────────────────────────────────────────

/// Shape-level tag naming the role a shape plays inside its widget.
pub const ROLE_TAG: &str = "PrezoWidgetRole";

/// Shape-level tag written by early word-cloud builds: the bubble/label slot index.
pub const WORD_INDEX_TAG: &str = "WordIndex";

/// Value stored in a widget marker tag.
pub const MARKER_VALUE: &str = "true";

/// Document-level tag holding the deck's session binding.
pub const DOCUMENT_BINDING_TAG: &str = "PrezoSessionBinding";

/// Longest tag value the engine will write. Longer serializations are stored
/// as an empty value so the next read sees "absent" rather than broken JSON.
pub const MAX_TAG_VALUE_LEN: usize = 4000;

// ── Slots ───────────────────────────────────────────────────────

/// Poll bar slots created per widget.
pub const MAX_POLL_OPTIONS: usize = 5;

/// Word-cloud bubble slots created per widget.
pub const MAX_WORD_CLOUD_WORDS: usize = 5;

/// Upper bound on Q&A item cards.
pub const MAX_QNA_ITEMS: usize = 5;

/// Lines shown in a Q&A body when the widget has no item cards.
pub const MAX_BODY_LINES: usize = 6;

// ── Animation ───────────────────────────────────────────────────

/// Frames emitted for an animated word-cloud transition.
pub const ANIMATION_FRAME_COUNT: usize = 5;

/// Smallest per-word ratio change that triggers an animated transition.
pub const ANIMATION_DELTA_THRESHOLD: f64 = 0.035;

// ── Geometry ────────────────────────────────────────────────────

/// Smallest font size a fitted word-cloud label may shrink to.
pub const MIN_LABEL_FONT_SIZE: f64 = 12.0;

/// Minimum extent of a poll fill bar, in points.
pub const MIN_FILL_EXTENT: f64 = 2.0;

/// Track transparency for disabled or vote-less poll slots.
pub const REDUCED_TRACK_TRANSPARENCY: f64 = 0.35;

/// Offset of a widget's drop shadow from its container.
pub const SHADOW_OFFSET_X: f64 = 4.0;
pub const SHADOW_OFFSET_Y: f64 = 6.0;

//! Style normalization per widget kind.
//!
//! DESIGN
//! ======
//! Style input is free-form JSON: whatever the caller passed at insert time or
//! whatever survived in the page's style tag. Every field is optional and every
//! invalid field falls back to its default, so normalization is total. The
//! normalized struct serializes back into the same key vocabulary it reads, which
//! makes `normalize(serialize(normalize(x))) == normalize(x)`.
//!
//! Keys are accepted in camelCase (what the style tag stores) and snake_case.

#[cfg(test)]
#[path = "style_test.rs"]
mod style_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::normalize_hex_color;
use crate::geometry::clamp;

// =============================================================================
// SHARED FIELD READERS
// =============================================================================

/// First present value among `keys`.
fn field<'a>(input: Option<&'a Value>, keys: &[&str]) -> Option<&'a Value> {
    let obj = input?.as_object()?;
    keys.iter().find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

fn number_field(input: Option<&Value>, keys: &[&str], default: f64, min: f64, max: f64) -> f64 {
    let raw = field(input, keys).and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    });
    match raw {
        Some(n) if n.is_finite() => clamp(n, min, max),
        _ => default,
    }
}

fn count_field(input: Option<&Value>, keys: &[&str], default: usize, min: usize, max: usize) -> usize {
    #[allow(clippy::cast_precision_loss)]
    let (default_f, min_f, max_f) = (default as f64, min as f64, max as f64);
    let value = number_field(input, keys, default_f, min_f, max_f).round();
    // Clamped to [min, max] above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = value as usize;
    count
}

fn color_field(input: Option<&Value>, keys: &[&str], default: &str) -> String {
    match field(input, keys).and_then(Value::as_str) {
        Some(raw) => normalize_hex_color(raw, default),
        None => normalize_hex_color(default, default),
    }
}

fn font_field(input: Option<&Value>) -> Option<String> {
    field(input, &["fontFamily", "font_family"])
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn bool_field(input: Option<&Value>, keys: &[&str]) -> bool {
    match field(input, keys) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// A normalized, persistable widget style.
pub trait WidgetStyle: Clone + Serialize + PartialEq + Send + Sync {
    /// Total normalization from free-form JSON. `None` yields defaults.
    fn normalize(input: Option<&Value>) -> Self;

    /// When set, colors from the style are re-applied to the widget chrome on
    /// every update instead of only at insert time.
    fn lock_style(&self) -> bool;

    fn shadow_opacity(&self) -> f64;

    /// Serialized form stored in the style tag.
    fn to_tag_value(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// =============================================================================
// Q&A
// =============================================================================

/// Style for Q&A and discussion panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QnaStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    pub text_color: String,
    pub muted_color: String,
    pub accent_color: String,
    pub panel_color: String,
    pub card_color: String,
    pub border_color: String,
    pub shadow_color: String,
    pub shadow_opacity: f64,
    pub spacing_scale: f64,
    pub max_questions: usize,
    pub lock_style: bool,
}

impl WidgetStyle for QnaStyle {
    fn normalize(input: Option<&Value>) -> Self {
        Self {
            font_family: font_field(input),
            text_color: color_field(input, &["textColor", "text_color"], "#0f172a"),
            muted_color: color_field(input, &["mutedColor", "muted_color"], "#64748b"),
            accent_color: color_field(input, &["accentColor", "accent_color"], "#2563eb"),
            panel_color: color_field(input, &["panelColor", "panel_color"], "#ffffff"),
            card_color: color_field(input, &["cardColor", "card_color"], "#f8fafc"),
            border_color: color_field(input, &["borderColor", "border_color"], "#e2e8f0"),
            shadow_color: color_field(input, &["shadowColor", "shadow_color"], "#e2e8f0"),
            shadow_opacity: number_field(input, &["shadowOpacity", "shadow_opacity"], 0.4, 0.0, 0.8),
            spacing_scale: number_field(input, &["spacingScale", "spacing_scale"], 1.0, 0.8, 1.3),
            max_questions: count_field(input, &["maxQuestions", "max_questions"], 3, 1, 5),
            lock_style: bool_field(input, &["lockStyle", "lock_style"]),
        }
    }

    fn lock_style(&self) -> bool {
        self.lock_style
    }

    fn shadow_opacity(&self) -> f64 {
        self.shadow_opacity
    }
}

impl Default for QnaStyle {
    fn default() -> Self {
        Self::normalize(None)
    }
}

// =============================================================================
// POLL
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    pub text_color: String,
    pub muted_color: String,
    pub accent_color: String,
    pub panel_color: String,
    pub bar_color: String,
    pub border_color: String,
    pub shadow_color: String,
    pub shadow_opacity: f64,
    pub spacing_scale: f64,
    pub orientation: Orientation,
    pub bar_thickness_scale: f64,
    pub max_options: usize,
    pub lock_style: bool,
}

impl WidgetStyle for PollStyle {
    fn normalize(input: Option<&Value>) -> Self {
        let border_color = color_field(input, &["borderColor", "border_color"], "#e2e8f0");
        let orientation = match field(input, &["orientation"]).and_then(Value::as_str) {
            Some(s) if s.trim().eq_ignore_ascii_case("vertical") => Orientation::Vertical,
            _ => Orientation::Horizontal,
        };
        Self {
            font_family: font_field(input),
            text_color: color_field(input, &["textColor", "text_color"], "#0f172a"),
            muted_color: color_field(input, &["mutedColor", "muted_color"], "#64748b"),
            accent_color: color_field(input, &["accentColor", "accent_color"], "#2563eb"),
            panel_color: color_field(input, &["panelColor", "panel_color"], "#ffffff"),
            bar_color: color_field(input, &["barColor", "bar_color"], "#e2e8f0"),
            shadow_color: color_field(input, &["shadowColor", "shadow_color"], &border_color),
            border_color,
            shadow_opacity: number_field(input, &["shadowOpacity", "shadow_opacity"], 0.35, 0.0, 0.8),
            spacing_scale: number_field(input, &["spacingScale", "spacing_scale"], 1.0, 0.8, 1.3),
            orientation,
            bar_thickness_scale: number_field(
                input,
                &["barThicknessScale", "bar_thickness_scale", "barWidthScale", "widthScale"],
                1.0,
                0.4,
                2.0,
            ),
            max_options: count_field(input, &["maxOptions", "max_options"], 5, 1, 5),
            lock_style: bool_field(input, &["lockStyle", "lock_style"]),
        }
    }

    fn lock_style(&self) -> bool {
        self.lock_style
    }

    fn shadow_opacity(&self) -> f64 {
        self.shadow_opacity
    }
}

impl Default for PollStyle {
    fn default() -> Self {
        Self::normalize(None)
    }
}

// =============================================================================
// WORD CLOUD
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCloudStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    pub text_color: String,
    pub muted_color: String,
    pub accent_color: String,
    pub panel_color: String,
    pub border_color: String,
    pub shadow_color: String,
    pub shadow_opacity: f64,
    pub spacing_scale: f64,
    pub min_font_size: f64,
    pub max_font_size: f64,
    pub max_words: usize,
    pub lock_style: bool,
}

impl WidgetStyle for WordCloudStyle {
    fn normalize(input: Option<&Value>) -> Self {
        let min_font_size = number_field(input, &["minFontSize", "min_font_size"], 20.0, 12.0, 32.0);
        let max_font_size = number_field(input, &["maxFontSize", "max_font_size"], 56.0, 24.0, 72.0).max(min_font_size);
        Self {
            font_family: font_field(input),
            text_color: color_field(input, &["textColor", "text_color"], "#0f172a"),
            muted_color: color_field(input, &["mutedColor", "muted_color"], "#64748b"),
            accent_color: color_field(input, &["accentColor", "accent_color"], "#2563eb"),
            panel_color: color_field(input, &["panelColor", "panel_color"], "#ffffff"),
            border_color: color_field(input, &["borderColor", "border_color"], "#e2e8f0"),
            shadow_color: color_field(input, &["shadowColor", "shadow_color"], "#e2e8f0"),
            shadow_opacity: number_field(input, &["shadowOpacity", "shadow_opacity"], 0.3, 0.0, 0.8),
            spacing_scale: number_field(input, &["spacingScale", "spacing_scale"], 1.0, 0.8, 1.3),
            min_font_size,
            max_font_size,
            max_words: count_field(input, &["maxWords", "max_words"], 5, 1, 5),
            lock_style: bool_field(input, &["lockStyle", "lock_style"]),
        }
    }

    fn lock_style(&self) -> bool {
        self.lock_style
    }

    fn shadow_opacity(&self) -> f64 {
        self.shadow_opacity
    }
}

impl Default for WordCloudStyle {
    fn default() -> Self {
        Self::normalize(None)
    }
}

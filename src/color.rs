//! Color parsing, normalization and mixing for widget styling.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

use crate::geometry::clamp;

pub const WHITE: &str = "#ffffff";
pub const BLACK: &str = "#000000";

/// Parse `#RGB` or `#RRGGBB` values into RGB channels.
#[must_use]
pub fn parse_hex_rgb(raw: &str) -> Option<(u8, u8, u8)> {
    let hex = raw.trim().strip_prefix('#')?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some((r, g, b))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        _ => None,
    }
}

/// True for `#RGB` / `#RRGGBB` input.
#[must_use]
pub fn is_hex_color(raw: &str) -> bool {
    parse_hex_rgb(raw).is_some()
}

fn format_rgb((r, g, b): (u8, u8, u8)) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Normalize a color to canonical lowercase `#rrggbb`.
///
/// Invalid input falls back to `fallback`; an invalid fallback yields black.
#[must_use]
pub fn normalize_hex_color(value: &str, fallback: &str) -> String {
    let fallback_rgb = parse_hex_rgb(fallback).unwrap_or((0, 0, 0));
    format_rgb(parse_hex_rgb(value).unwrap_or(fallback_rgb))
}

/// Mix two colors channel-wise: `a + (b - a) * t`, rounded, with `t` clamped
/// to `[0, 1]`. Unparseable colors mix as black.
#[must_use]
pub fn mix_colors(a: &str, b: &str, t: f64) -> String {
    let t = clamp(t, 0.0, 1.0);
    let (ar, ag, ab) = parse_hex_rgb(a).unwrap_or((0, 0, 0));
    let (br, bg, bb) = parse_hex_rgb(b).unwrap_or((0, 0, 0));
    let channel = |from: u8, to: u8| -> u8 {
        let mixed = f64::from(from) + (f64::from(to) - f64::from(from)) * t;
        // Bounded to 0..=255 by construction.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let out = clamp(mixed.round(), 0.0, 255.0) as u8;
        out
    };
    format_rgb((channel(ar, br), channel(ag, bg), channel(ab, bb)))
}

/// Mix toward white by `amount`.
#[must_use]
pub fn lighten(color: &str, amount: f64) -> String {
    mix_colors(color, WHITE, amount)
}

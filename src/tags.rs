//! Typed view over the host's string tags.
//!
//! DESIGN
//! ======
//! Tags are untyped strings that users, older builds and page duplication can
//! all leave in any state. Every key has a validator; a read whose value is
//! missing, empty, unparseable or fails validation yields `None`, never an
//! error. Host errors on read are treated the same way.
//!
//! Writes are bounded: a value longer than [`MAX_TAG_VALUE_LEN`] is stored as
//! the empty string, so the next read sees "absent" instead of a truncated
//! serialization.

#[cfg(test)]
#[path = "tags_test.rs"]
mod tags_test;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::consts::{MARKER_VALUE, MAX_TAG_VALUE_LEN, ROLE_TAG, WORD_INDEX_TAG};
use crate::host::{DocumentHost, HostError, Shape, TagScope};
use crate::kind::WidgetKind;

// =============================================================================
// READS
// =============================================================================

/// Raw read: host errors and empty values read as absent.
pub fn read_raw<H: DocumentHost + ?Sized>(host: &H, scope: TagScope<'_>, key: &str) -> Option<String> {
    match host.get_tag(scope, key) {
        Ok(Some(value)) if !value.trim().is_empty() => Some(value),
        Ok(_) => None,
        Err(err) => {
            debug!(key, error = %err, "tag read failed; treating as absent");
            None
        }
    }
}

/// Trimmed non-empty string.
pub fn read_id<H: DocumentHost + ?Sized>(host: &H, scope: TagScope<'_>, key: &str) -> Option<String> {
    read_raw(host, scope, key).map(|v| v.trim().to_string())
}

/// `"true"` (any case) reads as true; everything else, including absence, as false.
pub fn read_flag<H: DocumentHost + ?Sized>(host: &H, scope: TagScope<'_>, key: &str) -> bool {
    read_raw(host, scope, key).is_some_and(|v| v.trim().eq_ignore_ascii_case(MARKER_VALUE))
}

/// JSON object (style blobs).
pub fn read_object<H: DocumentHost + ?Sized>(host: &H, scope: TagScope<'_>, key: &str) -> Option<Value> {
    let raw = read_raw(host, scope, key)?;
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) if value.is_object() => Some(value),
        _ => {
            debug!(key, "tag is not a JSON object; treating as absent");
            None
        }
    }
}

/// Typed JSON payload (manifests, animation state).
pub fn read_json<T: DeserializeOwned, H: DocumentHost + ?Sized>(host: &H, scope: TagScope<'_>, key: &str) -> Option<T> {
    let raw = read_raw(host, scope, key)?;
    parse_json(&raw)
}

/// Parse a tag payload; failures read as absent.
#[must_use]
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Option<T> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(error = %err, "tag payload failed to parse; treating as absent");
            None
        }
    }
}

// =============================================================================
// WRITES
// =============================================================================

/// The value that will actually be stored for `value`.
#[must_use]
pub fn bounded_value(value: &str) -> &str {
    if value.len() > MAX_TAG_VALUE_LEN { "" } else { value }
}

/// Write with the length bound applied.
pub fn write_bounded<H: DocumentHost + ?Sized>(
    host: &mut H,
    scope: TagScope<'_>,
    key: &str,
    value: &str,
) -> Result<(), HostError> {
    let stored = bounded_value(value);
    if stored.len() != value.len() {
        warn!(key, len = value.len(), max = MAX_TAG_VALUE_LEN, "tag value too long; storing empty");
    }
    host.set_tag(scope, key, stored)
}

/// Serialize and write with the length bound applied.
pub fn write_json<T: serde::Serialize, H: DocumentHost + ?Sized>(
    host: &mut H,
    scope: TagScope<'_>,
    key: &str,
    value: &T,
) -> Result<(), HostError> {
    let raw = serde_json::to_string(value)?;
    write_bounded(host, scope, key, &raw)
}

// =============================================================================
// SHAPE ROLES
// =============================================================================

/// Tag a freshly created shape as part of a widget: marker plus role.
pub fn tag_shape<H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    shape: &str,
    kind: WidgetKind,
    role: &str,
) -> Result<(), HostError> {
    let scope = TagScope::Shape { page, shape };
    host.set_tag(scope, kind.tags().marker, MARKER_VALUE)?;
    host.set_tag(scope, ROLE_TAG, role)
}

/// Role tag of a shape record.
#[must_use]
pub fn shape_role(shape: &Shape) -> Option<&str> {
    shape.tag(ROLE_TAG).map(str::trim).filter(|r| !r.is_empty())
}

/// True when the shape carries `kind`'s widget marker.
#[must_use]
pub fn has_marker(shape: &Shape, kind: WidgetKind) -> bool {
    shape.tag(kind.tags().marker).is_some_and(|v| v.trim().eq_ignore_ascii_case(MARKER_VALUE))
}

/// Legacy word-cloud slot index.
#[must_use]
pub fn word_index(shape: &Shape) -> Option<usize> {
    shape.tag(WORD_INDEX_TAG)?.trim().parse().ok()
}

// =============================================================================
// BINDING TAGS
// =============================================================================

/// Remove every page-level tag `kind` owns, legacy keys included.
pub fn clear_binding_tags<H: DocumentHost + ?Sized>(host: &mut H, page: &str, kind: WidgetKind) -> Result<(), HostError> {
    let keys = kind.tags();
    let scope = TagScope::Page(page);
    for key in [keys.marker, keys.session, keys.manifest, keys.pending, keys.style, keys.resource] {
        host.delete_tag(scope, key)?;
    }
    if let Some(anim) = keys.anim_state {
        host.delete_tag(scope, anim)?;
    }
    for key in keys.legacy {
        host.delete_tag(scope, key)?;
    }
    Ok(())
}

//! Shape-kind capability resolution.
//!
//! Some hosts refuse to create certain geometric shapes. The resolver tries a
//! kind's fallback chain once, remembers which kind actually worked, and uses
//! that answer for every later creation. The cache is shared (behind an `Arc`)
//! by every widget driver of one engine.

#[cfg(test)]
#[path = "capability_test.rs"]
mod capability_test;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::geometry::Rect;
use crate::host::{DocumentHost, HostError, ShapeId, ShapeKind};

#[derive(Debug, Default)]
pub struct ShapeKindResolver {
    resolved: Mutex<HashMap<ShapeKind, ShapeKind>>,
}

impl ShapeKindResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Kinds to try, in order, when `kind` is requested.
    #[must_use]
    pub fn fallbacks(kind: ShapeKind) -> &'static [ShapeKind] {
        match kind {
            ShapeKind::RoundRectangle => &[ShapeKind::RoundRectangle, ShapeKind::Rectangle],
            ShapeKind::Rectangle => &[ShapeKind::Rectangle, ShapeKind::RoundRectangle],
            ShapeKind::TextBox => &[ShapeKind::TextBox, ShapeKind::Rectangle],
            ShapeKind::Group => &[ShapeKind::Group],
        }
    }

    /// The kind previously resolved for `kind`, if any.
    #[must_use]
    pub fn resolved(&self, kind: ShapeKind) -> Option<ShapeKind> {
        self.resolved.lock().unwrap_or_else(PoisonError::into_inner).get(&kind).copied()
    }

    /// Create a shape of `kind` (or its first working fallback).
    ///
    /// Only [`HostError::UnsupportedShapeKind`] advances the chain; any other
    /// error is returned as-is.
    pub fn create<H: DocumentHost + ?Sized>(
        &self,
        host: &mut H,
        page: &str,
        kind: ShapeKind,
        rect: Rect,
    ) -> Result<(ShapeId, ShapeKind), HostError> {
        if let Some(known) = self.resolved(kind) {
            return host.create_shape(page, known, rect).map(|id| (id, known));
        }

        let mut last_err = HostError::UnsupportedShapeKind(kind);
        for candidate in Self::fallbacks(kind) {
            match host.create_shape(page, *candidate, rect) {
                Ok(id) => {
                    if *candidate != kind {
                        warn!(requested = ?kind, using = ?candidate, "shape kind unsupported by host; falling back");
                    } else {
                        debug!(kind = ?kind, "shape kind supported");
                    }
                    self.resolved.lock().unwrap_or_else(PoisonError::into_inner).insert(kind, *candidate);
                    return Ok((id, *candidate));
                }
                Err(err @ HostError::UnsupportedShapeKind(_)) => last_err = err,
                Err(err) => return Err(err),
            }
        }
        Err(last_err)
    }
}

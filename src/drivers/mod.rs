//! Widget update drivers.
//!
//! DESIGN
//! ======
//! One driver per widget family orchestrates binding, layout and the host:
//!
//! - `qna`: Q&A and discussion panels (same shapes, different tags and texts)
//! - `poll`: bar or column chart of the bound poll
//! - `word_cloud`: animated bubbles for the bound cloud
//!
//! Each driver exposes `insert` (explicit user action on the selected page)
//! and `update` (reconcile every page of the document for one session). An
//! `update` call is one transaction: every page is resolved and rendered, then
//! the host is flushed once. The word-cloud driver additionally flushes
//! between animation frames.
//!
//! ERROR HANDLING
//! ==============
//! A page that fails is logged and reported as [`PageOutcome::Failed`]; the
//! remaining pages still render. A slot whose shape no longer resolves is
//! skipped silently. Insert failures delete whatever shapes were already
//! created before the error is returned.

pub mod poll;
pub mod qna;
pub mod word_cloud;

use serde_json::Value;
use tracing::{debug, warn};

use crate::binding::BindingPhase;
use crate::capability::ShapeKindResolver;
use crate::consts::WORD_INDEX_TAG;
use crate::geometry::Rect;
use crate::host::{DocumentHost, Font, HostError, PageId, ShapeId, ShapeKind, ShapePatch, TagScope};
use crate::kind::WidgetKind;
use crate::manifest::{ItemRef, WidgetManifest};
use crate::recovery::{Confidence, Role};
use crate::session::SessionSnapshot;
use crate::tags::{self, clear_binding_tags, has_marker, tag_shape};

// =============================================================================
// REQUESTS & REPORTS
// =============================================================================

/// Arguments of an explicit insert.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertRequest<'a> {
    /// `None` inserts a pending widget that the next sync claims.
    pub session_id: Option<&'a str>,
    pub code: Option<&'a str>,
    pub style: Option<&'a Value>,
}

/// The session being reconciled.
#[derive(Debug, Clone, Copy)]
pub struct SyncContext<'a> {
    pub session_id: &'a str,
    pub code: Option<&'a str>,
    pub snapshot: &'a SessionSnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Updated {
        /// Flush cycles spent on this page (animation frames for clouds).
        frames: usize,
        recovered: Option<Confidence>,
    },
    Skipped(BindingPhase),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub page: PageId,
    pub kind: WidgetKind,
    pub outcome: PageOutcome,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub pages: Vec<PageReport>,
}

impl TickReport {
    pub fn merge(&mut self, other: TickReport) {
        self.pages.extend(other.pages);
    }

    #[must_use]
    pub fn updated(&self) -> usize {
        self.pages.iter().filter(|p| matches!(p.outcome, PageOutcome::Updated { .. })).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.pages.iter().filter(|p| matches!(p.outcome, PageOutcome::Failed(_))).count()
    }

    #[must_use]
    pub fn outcome(&self, page: &str, kind: WidgetKind) -> Option<&PageOutcome> {
        self.pages.iter().find(|p| p.page == page && p.kind == kind).map(|p| &p.outcome)
    }

    /// Record a page result, turning errors into `Failed`.
    pub(crate) fn record(&mut self, page: &str, kind: WidgetKind, result: Result<Option<PageOutcome>, HostError>) {
        let outcome = match result {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return,
            Err(err) => {
                warn!(page, %kind, error = %err, "page update failed; continuing");
                PageOutcome::Failed(err.to_string())
            }
        };
        self.pages.push(PageReport { page: page.to_string(), kind, outcome });
    }
}

// =============================================================================
// SHAPE CREATION
// =============================================================================

/// Creates and tags widget shapes, remembering them for cleanup.
pub(crate) struct ShapeBuilder<'a, H: ?Sized> {
    host: &'a mut H,
    resolver: &'a ShapeKindResolver,
    page: &'a str,
    kind: WidgetKind,
    created: Vec<ShapeId>,
}

impl<'a, H: DocumentHost + ?Sized> ShapeBuilder<'a, H> {
    pub(crate) fn new(host: &'a mut H, resolver: &'a ShapeKindResolver, page: &'a str, kind: WidgetKind) -> Self {
        Self { host, resolver, page, kind, created: Vec::new() }
    }

    pub(crate) fn host(&mut self) -> &mut H {
        &mut *self.host
    }

    /// Create a shape, tag it with its role and apply `patch`.
    pub(crate) fn add(&mut self, shape: ShapeKind, rect: Rect, role: Role, patch: ShapePatch) -> Result<ShapeId, HostError> {
        let (id, _) = self.resolver.create(&mut *self.host, self.page, shape, rect)?;
        self.created.push(id.clone());
        tag_shape(&mut *self.host, self.page, &id, self.kind, &role.tag_value(self.kind))?;
        if !patch.is_empty() {
            self.host.apply_patch(self.page, &id, &patch)?;
        }
        Ok(id)
    }

    /// Like [`add`](Self::add), also recording the slot index.
    pub(crate) fn add_slot(
        &mut self,
        shape: ShapeKind,
        rect: Rect,
        role: Role,
        slot: usize,
        patch: ShapePatch,
    ) -> Result<ShapeId, HostError> {
        let id = self.add(shape, rect, role, patch)?;
        let scope = TagScope::Shape { page: self.page, shape: &id };
        self.host.set_tag(scope, WORD_INDEX_TAG, &slot.to_string())?;
        Ok(id)
    }

    /// Group shapes and tag the group with `role`.
    pub(crate) fn group(&mut self, ids: &[ShapeId], role: Role) -> Result<ShapeId, HostError> {
        let id = self.host.group_shapes(self.page, ids)?;
        self.created.push(id.clone());
        tag_shape(&mut *self.host, self.page, &id, self.kind, &role.tag_value(self.kind))?;
        Ok(id)
    }

    /// Best-effort removal of everything created so far.
    pub(crate) fn rollback(self) {
        for id in self.created.iter().rev() {
            if let Err(err) = self.host.delete_shape(self.page, id) {
                debug!(page = self.page, shape = %id, error = %err, "rollback delete failed");
            }
        }
    }
}

// =============================================================================
// RENDER HELPERS
// =============================================================================

/// Apply `patch` to an optional slot. A missing or failing shape renders as
/// absent and returns false.
pub(crate) fn patch_slot<H: DocumentHost + ?Sized>(host: &mut H, page: &str, id: Option<&str>, patch: &ShapePatch) -> bool {
    let Some(id) = id else { return false };
    match host.apply_patch(page, id, patch) {
        Ok(()) => true,
        Err(HostError::ShapeNotFound(_)) => false,
        Err(err) => {
            debug!(page, shape = id, error = %err, "slot patch failed; treating slot as absent");
            false
        }
    }
}

pub(crate) fn font(family: Option<&str>, size: f64, bold: bool, color: &str) -> Font {
    Font {
        family: family.map(str::to_string),
        size: Some(size),
        bold: Some(bold),
        color: Some(color.to_string()),
    }
}

/// Current rectangle of a shape, if it still resolves.
pub(crate) fn shape_rect<H: DocumentHost + ?Sized>(host: &H, page: &str, id: &str) -> Option<Rect> {
    host.get_shape(page, id).ok().flatten().map(|s| s.rect)
}

/// Remove an existing widget of `kind` from `page`: every shape its manifest
/// references, every shape carrying its marker, and its page tags.
pub(crate) fn remove_widget<I: ItemRef, H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    kind: WidgetKind,
) -> Result<usize, HostError> {
    let mut doomed: Vec<ShapeId> = Vec::new();
    if let Some(manifest) = tags::read_json::<WidgetManifest<I>, H>(host, TagScope::Page(page), kind.tags().manifest) {
        doomed.extend(manifest.shape_ids().into_iter().map(str::to_string));
    }
    for shape in host.list_shapes(page)? {
        if has_marker(&shape, kind) && !doomed.contains(&shape.id) {
            doomed.push(shape.id);
        }
    }

    let mut removed = 0;
    for id in &doomed {
        match host.delete_shape(page, id) {
            Ok(()) => removed += 1,
            Err(HostError::ShapeNotFound(_)) => {}
            Err(err) => return Err(err),
        }
    }
    clear_binding_tags(host, page, kind)?;
    Ok(removed)
}

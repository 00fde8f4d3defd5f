//! Per-page binding state machine.
//!
//! DESIGN
//! ======
//! Every (page, kind) pair moves through these phases on each tick:
//!
//! ```text
//! Unbound (pending, no session) ──┐
//!                                 ├─> Bound ──> update
//! Recovering ──(recovered)────────┘
//!      └──(nothing recoverable)──> Orphaned ──> skip
//! Stale (bound to another session) ──> skip
//! ```
//!
//! The stored manifest is checked first. If it is missing or any required id
//! dangles, the page is recovered from its shapes; a recovered manifest is
//! written back immediately and the page is rebound to the syncing session.
//! A dangling manifest with nothing to recover means the user deleted the
//! widget: its binding tags are cleared so later ticks stop looking at it.
//!
//! Session and pending tags are only rewritten by [`finish_binding`], after
//! the page rendered successfully, so a failed page keeps its old binding.

#[cfg(test)]
#[path = "binding_test.rs"]
mod binding_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use crate::consts::{DOCUMENT_BINDING_TAG, MARKER_VALUE};
use crate::error::WidgetError;
use crate::host::{DocumentHost, HostError, TagScope};
use crate::kind::WidgetKind;
use crate::manifest::WidgetManifest;
use crate::recovery::{Confidence, Recoverable, RecoveryContext, RecoveryOutcome, recover};
use crate::tags::{self, clear_binding_tags, has_marker};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPhase {
    /// Inserted without a session; the next sync claims it.
    Unbound,
    Bound,
    /// Bound to a different session than the one syncing.
    Stale,
    /// Manifest missing or dangling; shapes are being re-identified.
    Recovering,
    /// Nothing recoverable on the page.
    Orphaned,
}

/// Everything a page stores for one widget kind, read through validators.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingState<I> {
    pub session_id: Option<String>,
    pub pending: bool,
    pub manifest: Option<WidgetManifest<I>>,
    /// True when a manifest tag exists, even if it failed to parse.
    pub manifest_tagged: bool,
    pub marked: bool,
    pub style: Option<Value>,
    pub resource_id: Option<String>,
    /// Raw animation state; the word-cloud driver decodes it.
    pub anim_state: Option<String>,
}

impl<I: Recoverable> BindingState<I> {
    pub fn read<H: DocumentHost + ?Sized>(host: &H, page: &str, kind: WidgetKind) -> Self {
        let keys = kind.tags();
        let scope = TagScope::Page(page);
        Self {
            session_id: tags::read_id(host, scope, keys.session),
            pending: tags::read_flag(host, scope, keys.pending),
            manifest: tags::read_json(host, scope, keys.manifest),
            manifest_tagged: tags::read_raw(host, scope, keys.manifest).is_some(),
            marked: tags::read_flag(host, scope, keys.marker),
            style: tags::read_object(host, scope, keys.style),
            resource_id: tags::read_id(host, scope, keys.resource),
            anim_state: keys.anim_state.and_then(|key| tags::read_raw(host, scope, key)),
        }
    }

    /// Whether the page carries any trace of a widget of this kind.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.pending || self.session_id.is_some() || self.manifest_tagged || self.marked
    }

    /// Phase before manifest validation.
    #[must_use]
    pub fn phase(&self, session_id: &str) -> BindingPhase {
        match self.session_id.as_deref() {
            Some(bound) if bound == session_id => BindingPhase::Bound,
            _ if self.pending => BindingPhase::Unbound,
            Some(_) => BindingPhase::Stale,
            None => BindingPhase::Unbound,
        }
    }
}

/// A page that is ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyPage<I> {
    pub manifest: WidgetManifest<I>,
    pub style: Option<Value>,
    pub resource_id: Option<String>,
    pub anim_state: Option<String>,
    /// Session/pending tags must be rewritten after rendering.
    pub rebind: bool,
    /// Set when the manifest was rebuilt this tick.
    pub recovered: Option<Confidence>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<I> {
    /// No widget of this kind on the page.
    Absent,
    Skip(BindingPhase),
    Ready(ReadyPage<I>),
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Decide what to do with one page for one sync of `session_id`.
///
/// # Errors
///
/// Only host write failures while persisting a recovered manifest or clearing
/// an orphaned binding; reads never fail.
pub fn resolve_page<I: Recoverable, H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    state: BindingState<I>,
    ctx: &RecoveryContext,
    session_id: &str,
) -> Result<Resolution<I>, HostError> {
    let kind = ctx.kind;
    if !state.is_present() {
        return Ok(Resolution::Absent);
    }

    let phase = state.phase(session_id);
    let pending = state.pending;
    let stored = state.manifest.filter(|m| m.is_valid(&*host, page));
    let (manifest, recovered) = match stored {
        Some(_) if phase == BindingPhase::Stale => return Ok(Resolution::Skip(BindingPhase::Stale)),
        Some(mut manifest) => {
            prune_manifest(host, page, kind, &mut manifest)?;
            (manifest, None)
        }
        None => {
            let shapes = host.list_shapes(page)?;
            match recover::<I>(&shapes, ctx) {
                RecoveryOutcome::Recovered { manifest, confidence } => {
                    if confidence == Confidence::Heuristic {
                        warn!(page, %kind, "manifest rebuilt from geometry; verify the widget");
                    } else {
                        info!(page, %kind, ?confidence, "manifest recovered from shape tags");
                    }
                    tags::write_json(host, TagScope::Page(page), kind.tags().manifest, &manifest)?;
                    (manifest, Some(confidence))
                }
                RecoveryOutcome::Orphaned { missing } => {
                    let any_marked = shapes.iter().any(|s| has_marker(s, kind));
                    if state.manifest_tagged && !any_marked {
                        info!(page, %kind, "widget shapes are gone; clearing binding");
                        clear_binding_tags(host, page, kind)?;
                    } else {
                        warn!(page, %kind, ?missing, "widget unrecoverable this tick");
                    }
                    return Ok(Resolution::Skip(BindingPhase::Orphaned));
                }
            }
        }
    };

    // A recovered page, a claimed page, or a leftover pending flag all need
    // their tags rewritten after rendering.
    let rebind = recovered.is_some() || phase != BindingPhase::Bound || pending;

    Ok(Resolution::Ready(ReadyPage {
        manifest,
        style: state.style,
        resource_id: state.resource_id,
        anim_state: state.anim_state,
        rebind,
        recovered,
    }))
}

/// Drop ids the user deleted from a stored manifest and persist the result.
/// Items that lost a required shape are removed along with whatever is left
/// of them, so no half-drawn slot stays on the page.
fn prune_manifest<I: Recoverable, H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    kind: WidgetKind,
    manifest: &mut WidgetManifest<I>,
) -> Result<(), HostError> {
    let before = manifest.clone();
    let leftovers = manifest.prune_dangling(&*host, page);
    if *manifest == before {
        return Ok(());
    }
    // Deleting a group takes its members with it.
    for id in &leftovers {
        if host.get_shape(page, id)?.is_some() {
            host.delete_shape(page, id)?;
        }
    }
    info!(page, %kind, dropped_items = before.items.len() - manifest.items.len(), "pruned deleted shapes from manifest");
    tags::write_json(host, TagScope::Page(page), kind.tags().manifest, manifest)
}

/// Bind the page to `session_id` and consume `pending`.
///
/// # Errors
///
/// Host write failures.
pub fn finish_binding<H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    kind: WidgetKind,
    session_id: &str,
) -> Result<(), HostError> {
    let keys = kind.tags();
    let scope = TagScope::Page(page);
    tags::write_bounded(host, scope, keys.session, session_id)?;
    host.delete_tag(scope, keys.pending)
}

/// Tag a freshly inserted widget: manifest, style, marker and either the
/// session or the pending flag.
///
/// # Errors
///
/// Host write failures.
pub fn write_insert_tags<I: Recoverable, H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    kind: WidgetKind,
    manifest: &WidgetManifest<I>,
    style_json: &str,
    session_id: Option<&str>,
) -> Result<(), HostError> {
    let keys = kind.tags();
    let scope = TagScope::Page(page);
    host.set_tag(scope, keys.marker, MARKER_VALUE)?;
    match session_id {
        Some(session_id) => {
            tags::write_bounded(host, scope, keys.session, session_id)?;
            host.delete_tag(scope, keys.pending)?;
        }
        None => {
            host.set_tag(scope, keys.pending, MARKER_VALUE)?;
            host.delete_tag(scope, keys.session)?;
        }
    }
    host.delete_tag(scope, keys.resource)?;
    for key in keys.legacy {
        host.delete_tag(scope, key)?;
    }
    if let Some(anim) = keys.anim_state {
        host.delete_tag(scope, anim)?;
    }
    tags::write_bounded(host, scope, keys.style, style_json)?;
    tags::write_json(host, scope, keys.manifest, manifest)
}

/// Point the widget on `page` at a session and, optionally, a resource.
///
/// # Errors
///
/// [`WidgetError::NoWidget`] when the page has neither a manifest tag nor any
/// shape carrying the kind's marker.
pub fn bind_page<H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    kind: WidgetKind,
    session_id: &str,
    resource_id: Option<&str>,
) -> Result<(), WidgetError> {
    let keys = kind.tags();
    let scope = TagScope::Page(page);
    let has_widget = tags::read_raw(&*host, scope, keys.manifest).is_some()
        || host.list_shapes(page)?.iter().any(|s| has_marker(s, kind));
    if !has_widget {
        return Err(WidgetError::NoWidget(kind));
    }

    for key in keys.legacy {
        host.delete_tag(scope, key)?;
    }
    match resource_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => tags::write_bounded(host, scope, keys.resource, id)?,
        None => host.delete_tag(scope, keys.resource)?,
    }
    finish_binding(host, page, kind, session_id)?;
    Ok(())
}

// =============================================================================
// DOCUMENT BINDING
// =============================================================================

/// Deck-level record of the session this document presents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentBinding {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl DocumentBinding {
    /// Binding stamped with the current UTC time.
    #[must_use]
    pub fn new(session_id: impl Into<String>, code: Option<String>, api_base_url: Option<String>) -> Self {
        Self {
            session_id: session_id.into(),
            code,
            api_base_url,
            updated_at: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
        }
    }

    pub fn read<H: DocumentHost + ?Sized>(host: &H) -> Option<Self> {
        tags::read_json::<Self, H>(host, TagScope::Document, DOCUMENT_BINDING_TAG)
            .filter(|b| !b.session_id.trim().is_empty())
    }

    /// # Errors
    ///
    /// Host write failures.
    pub fn write<H: DocumentHost + ?Sized>(&self, host: &mut H) -> Result<(), HostError> {
        tags::write_json(host, TagScope::Document, DOCUMENT_BINDING_TAG, self)
    }
}

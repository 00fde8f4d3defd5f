//! Poll bar charts.
//!
//! The chart follows the poll the page is bound to, or the open poll (else the
//! newest) when unbound. Geometry is recomputed from the container's current
//! rectangle on every update, so a user who moved or resized the panel keeps
//! their placement.
//!
//! Polls inserted before bars were grouped carry items without `group`; the
//! first update that sees one groups its track and fill and rewrites the
//! manifest.

#[cfg(test)]
#[path = "poll_test.rs"]
mod poll_test;

use tracing::{debug, info};

use crate::binding::{BindingState, ReadyPage, Resolution, finish_binding, resolve_page, write_insert_tags};
use crate::capability::ShapeKindResolver;
use crate::geometry::Rect;
use crate::host::{DocumentHost, Font, HostError, ShapeKind, ShapePatch, TagScope};
use crate::kind::WidgetKind;
use crate::layout::poll::{PollLayout, layout_poll, poll_frame};
use crate::layout::shadow_rect;
use crate::manifest::{PollItem, WidgetManifest};
use crate::recovery::{RecoveryContext, Role};
use crate::session::{Poll, ResourceStatus, SessionSnapshot, find_by_id, pick_resource};
use crate::style::{PollStyle, WidgetStyle};
use crate::tags::{self, tag_shape};

use super::{InsertRequest, PageOutcome, ShapeBuilder, SyncContext, TickReport, font, patch_slot, remove_widget, shape_rect};

const KIND: WidgetKind = WidgetKind::Poll;

const TITLE_FONT_SIZE: f64 = 20.0;
const QUESTION_FONT_SIZE: f64 = 14.0;
const LABEL_FONT_SIZE: f64 = 13.0;

const PLACEHOLDER_QUESTION: &str = "Connect a session to go live.";

// =============================================================================
// COPY
// =============================================================================

#[must_use]
pub fn title_text(code: Option<&str>) -> String {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => format!("Live Poll • {code}"),
        None => "Live Poll".to_string(),
    }
}

/// Which poll a page shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollChoice<'a> {
    Shown(&'a Poll),
    /// Bound to a poll id the session no longer has.
    Missing,
    /// The session has no polls at all.
    None,
}

#[must_use]
pub fn choose_poll<'a>(snapshot: &'a SessionSnapshot, resource_id: Option<&str>) -> PollChoice<'a> {
    match resource_id {
        Some(id) => find_by_id(&snapshot.polls, id).map_or(PollChoice::Missing, PollChoice::Shown),
        None => pick_resource(&snapshot.polls).map_or(PollChoice::None, PollChoice::Shown),
    }
}

#[must_use]
pub fn question_text(choice: PollChoice<'_>) -> String {
    match choice {
        PollChoice::Shown(poll) if poll.status == ResourceStatus::Open => format!("Live poll: {}", poll.question),
        PollChoice::Shown(poll) => format!("Poll: {}", poll.question),
        PollChoice::Missing => "Poll not found.".to_string(),
        PollChoice::None => "No polls yet.".to_string(),
    }
}

// =============================================================================
// INSERT
// =============================================================================

/// Build a poll chart on `page`, replacing any previous one.
///
/// # Errors
///
/// Host failures. Shapes created before the failure are deleted first.
pub fn insert<H: DocumentHost + ?Sized>(
    host: &mut H,
    resolver: &ShapeKindResolver,
    page: &str,
    request: &InsertRequest<'_>,
) -> Result<WidgetManifest<PollItem>, HostError> {
    remove_widget::<PollItem, H>(host, page, KIND)?;

    let style = PollStyle::normalize(request.style);
    let container = poll_frame(host.page_size(), &style);
    let layout = layout_poll(container, &style, None);
    let mut builder = ShapeBuilder::new(host, resolver, page, KIND);
    let result = build_chart(&mut builder, container, &layout, &style, request).and_then(|manifest| {
        write_insert_tags(builder.host(), page, KIND, &manifest, &style.to_tag_value(), request.session_id)?;
        Ok(manifest)
    });
    match result {
        Ok(manifest) => {
            info!(page, orientation = ?style.orientation, pending = request.session_id.is_none(), "poll inserted");
            Ok(manifest)
        }
        Err(err) => {
            builder.rollback();
            Err(err)
        }
    }
}

fn build_chart<H: DocumentHost + ?Sized>(
    b: &mut ShapeBuilder<'_, H>,
    container: Rect,
    layout: &PollLayout,
    style: &PollStyle,
    request: &InsertRequest<'_>,
) -> Result<WidgetManifest<PollItem>, HostError> {
    let family = style.font_family.as_deref();
    let shadow = b.add(ShapeKind::RoundRectangle, shadow_rect(container), Role::Shadow, shadow_patch(style))?;
    let container = b.add(ShapeKind::RoundRectangle, container, Role::Container, container_patch(style))?;
    let title = b.add(
        ShapeKind::TextBox,
        layout.title,
        Role::Title,
        ShapePatch::new().text(title_text(request.code)).font(font(family, TITLE_FONT_SIZE, true, &style.text_color)),
    )?;
    let placeholder =
        if request.session_id.is_some() { question_text(PollChoice::None) } else { PLACEHOLDER_QUESTION.to_string() };
    let question = b.add(
        ShapeKind::TextBox,
        layout.question,
        Role::Body,
        ShapePatch::new().text(placeholder).font(font(family, QUESTION_FONT_SIZE, false, &style.muted_color)),
    )?;

    let mut items = Vec::with_capacity(layout.slots.len());
    for slot in &layout.slots {
        let label = b.add_slot(
            ShapeKind::TextBox,
            slot.label,
            Role::OptionLabel,
            slot.slot,
            ShapePatch::new().text(slot.label_text.clone()).font(label_font(style)),
        )?;
        let bg = b.add_slot(
            ShapeKind::Rectangle,
            slot.track,
            Role::BarTrack,
            slot.slot,
            ShapePatch::new().fill(&style.bar_color).transparency(slot.track_transparency).no_line(),
        )?;
        let fill = b.add_slot(
            ShapeKind::Rectangle,
            slot.fill,
            Role::BarFill,
            slot.slot,
            ShapePatch::new().fill(&style.accent_color).transparency(slot.fill_transparency).no_line(),
        )?;
        let group = b.group(&[bg.clone(), fill.clone()], Role::BarGroup)?;
        items.push(PollItem { label, bg, fill, group: Some(group) });
    }

    let mut manifest = WidgetManifest::new(container, title, question);
    manifest.shadow = Some(shadow);
    manifest.items = items;
    Ok(manifest)
}

fn shadow_patch(style: &PollStyle) -> ShapePatch {
    ShapePatch::new().fill(&style.shadow_color).transparency(style.shadow_opacity).no_line()
}

fn container_patch(style: &PollStyle) -> ShapePatch {
    ShapePatch::new().fill(&style.panel_color).line(&style.border_color, 1.0)
}

fn label_font(style: &PollStyle) -> Font {
    font(style.font_family.as_deref(), LABEL_FONT_SIZE, false, &style.text_color)
}

// =============================================================================
// LEGACY UPGRADE
// =============================================================================

/// Group every ungrouped track/fill pair. Returns true when the manifest
/// changed; pairs that fail to group stay legacy until the next tick.
fn group_legacy_bars<H: DocumentHost + ?Sized>(host: &mut H, page: &str, manifest: &mut WidgetManifest<PollItem>) -> bool {
    let mut changed = false;
    for item in manifest.items.iter_mut().filter(|item| item.group.is_none()) {
        let pair = [item.bg.clone(), item.fill.clone()];
        let group = match host.group_shapes(page, &pair) {
            Ok(group) => group,
            Err(err) => {
                debug!(page, bar = %item.bg, error = %err, "legacy bar grouping failed");
                continue;
            }
        };
        if let Err(err) = tag_shape(host, page, &group, KIND, &Role::BarGroup.tag_value(KIND)) {
            debug!(page, group = %group, error = %err, "legacy bar group left untagged");
        }
        item.group = Some(group);
        changed = true;
    }
    changed
}

// =============================================================================
// UPDATE
// =============================================================================

fn render_page<H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    ready: &ReadyPage<PollItem>,
    style: &PollStyle,
    snapshot: &SessionSnapshot,
    code: Option<&str>,
) {
    let manifest = &ready.manifest;
    let choice = choose_poll(snapshot, ready.resource_id.as_deref());
    let options = match choice {
        PollChoice::Shown(poll) => Some(poll.options.as_slice()),
        PollChoice::Missing => Some(&[][..]),
        PollChoice::None => None,
    };
    let Some(container) = shape_rect(&*host, page, &manifest.container) else {
        debug!(page, "poll container vanished mid-tick");
        return;
    };
    let layout = layout_poll(container, style, options);
    let family = style.font_family.as_deref();

    let mut shadow = ShapePatch::new().rect(shadow_rect(container));
    let mut title = ShapePatch::new().rect(layout.title).text(title_text(code));
    let mut question = ShapePatch::new().rect(layout.question).text(question_text(choice));
    if style.lock_style() {
        shadow = shadow.fill(&style.shadow_color).transparency(style.shadow_opacity).no_line();
        title = title.font(font(family, TITLE_FONT_SIZE, true, &style.text_color));
        question = question.font(font(family, QUESTION_FONT_SIZE, false, &style.muted_color));
        patch_slot(host, page, Some(&manifest.container), &container_patch(style));
    }
    patch_slot(host, page, manifest.shadow.as_deref(), &shadow);
    patch_slot(host, page, Some(&manifest.title), &title);
    patch_slot(host, page, Some(&manifest.body), &question);

    for (item, slot) in manifest.items.iter().zip(&layout.slots) {
        let label = ShapePatch::new().rect(slot.label).text(slot.label_text.clone()).font(label_font(style));
        let mut track = ShapePatch::new().rect(slot.track).transparency(slot.track_transparency);
        let mut fill = ShapePatch::new().rect(slot.fill).transparency(slot.fill_transparency);
        if style.lock_style() {
            track = track.fill(&style.bar_color);
            fill = fill.fill(&style.accent_color);
        }
        patch_slot(host, page, Some(&item.label), &label);
        patch_slot(host, page, Some(&item.bg), &track);
        patch_slot(host, page, Some(&item.fill), &fill);
    }
}

fn update_page<H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    sync: &SyncContext<'_>,
) -> Result<Option<PageOutcome>, HostError> {
    let state = BindingState::<PollItem>::read(&*host, page, KIND);
    let style = PollStyle::normalize(state.style.as_ref());
    let ctx = RecoveryContext { kind: KIND, orientation: style.orientation };
    let mut ready = match resolve_page(host, page, state, &ctx, sync.session_id)? {
        Resolution::Absent => return Ok(None),
        Resolution::Skip(phase) => return Ok(Some(PageOutcome::Skipped(phase))),
        Resolution::Ready(ready) => ready,
    };

    if group_legacy_bars(host, page, &mut ready.manifest) {
        info!(page, "grouped legacy poll bars");
        tags::write_json(host, TagScope::Page(page), KIND.tags().manifest, &ready.manifest)?;
    }

    render_page(host, page, &ready, &style, sync.snapshot, sync.code);
    if ready.rebind {
        finish_binding(host, page, KIND, sync.session_id)?;
    }
    Ok(Some(PageOutcome::Updated { frames: 1, recovered: ready.recovered }))
}

/// Reconcile every poll chart in the document with `sync`.
///
/// # Errors
///
/// Only the final flush; per-page failures are reported in the tick report.
pub async fn update<H: DocumentHost + ?Sized>(host: &mut H, sync: &SyncContext<'_>) -> Result<TickReport, HostError> {
    let mut report = TickReport::default();
    for page in host.pages() {
        let result = update_page(host, &page, sync);
        report.record(&page, KIND, result);
    }
    host.flush().await?;
    debug!(session_id = sync.session_id, updated = report.updated(), "polls reconciled");
    Ok(report)
}

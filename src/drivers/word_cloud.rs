//! Animated word clouds.
//!
//! DESIGN
//! ======
//! Each page renders the cloud it is bound to (or the open cloud, else the
//! newest). The ratios rendered last time are kept in the page's animation
//! tag; when the new ratios differ enough the transition is played as a short
//! sequence of frames, each one a flush cycle followed by `frame_delay`.
//! The final ratios are written back once the last frame is applied.
//!
//! Early builds drew the word inside the bubble and stored bare bubble ids.
//! Those bubbles get a separate label text box on the first update that
//! sees them.

#[cfg(test)]
#[path = "word_cloud_test.rs"]
mod word_cloud_test;

use std::time::Duration;

use tracing::{debug, info};

use crate::binding::{BindingState, ReadyPage, Resolution, finish_binding, resolve_page, write_insert_tags};
use crate::capability::ShapeKindResolver;
use crate::geometry::Rect;
use crate::host::{DocumentHost, HostError, ShapeKind, ShapePatch, TagScope, TextAlign};
use crate::kind::WidgetKind;
use crate::layout::shadow_rect;
use crate::layout::word_cloud::{
    WordCloudAnimState, WordCloudAnimation, WordCloudChrome, WordSlot, layout_at_ratios, rank_words, word_cloud_chrome,
    word_cloud_frame,
};
use crate::manifest::{WidgetManifest, WordItem};
use crate::recovery::{RecoveryContext, Role};
use crate::session::{ResourceStatus, SessionSnapshot, WordCloud, find_by_id, pick_resource};
use crate::style::{WidgetStyle, WordCloudStyle};
use crate::tags;

use super::{InsertRequest, PageOutcome, ShapeBuilder, SyncContext, TickReport, font, patch_slot, remove_widget, shape_rect};

const KIND: WidgetKind = WidgetKind::WordCloud;

const TITLE_FONT_SIZE: f64 = 22.0;
const SUBTITLE_FONT_SIZE: f64 = 14.0;
const BODY_FONT_SIZE: f64 = 13.0;
const BUBBLE_LINE_WEIGHT: f64 = 1.5;

const DEFAULT_SUBTITLE: &str = "Pick a word to shape the cloud.";

// =============================================================================
// COPY
// =============================================================================

#[must_use]
pub fn title_text(code: Option<&str>) -> String {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => format!("Word Cloud • {code}"),
        None => "Word Cloud".to_string(),
    }
}

/// Which cloud a page shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloudChoice<'a> {
    Shown(&'a WordCloud),
    Missing,
    None,
}

impl<'a> CloudChoice<'a> {
    fn cloud(self) -> Option<&'a WordCloud> {
        match self {
            Self::Shown(cloud) => Some(cloud),
            Self::Missing | Self::None => None,
        }
    }
}

#[must_use]
pub fn choose_cloud<'a>(snapshot: &'a SessionSnapshot, resource_id: Option<&str>) -> CloudChoice<'a> {
    match resource_id {
        Some(id) => find_by_id(&snapshot.word_clouds, id).map_or(CloudChoice::Missing, CloudChoice::Shown),
        None => pick_resource(&snapshot.word_clouds).map_or(CloudChoice::None, CloudChoice::Shown),
    }
}

#[must_use]
pub fn subtitle_text(choice: CloudChoice<'_>) -> String {
    choice
        .cloud()
        .and_then(|c| c.prompt.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_SUBTITLE)
        .to_string()
}

#[must_use]
pub fn body_text(choice: CloudChoice<'_>) -> &'static str {
    match choice {
        CloudChoice::Shown(cloud) if cloud.status == ResourceStatus::Open => "Voting is live.",
        CloudChoice::Shown(_) => "Voting is closed.",
        CloudChoice::Missing => "Word cloud not found.",
        CloudChoice::None => "No active word cloud yet.",
    }
}

// =============================================================================
// PATCHES
// =============================================================================

fn bubble_patch(slot: &WordSlot) -> ShapePatch {
    let patch = ShapePatch::new().rect(slot.bubble).fill(&slot.fill_color).text("");
    if slot.hidden {
        patch.transparency(1.0).no_line()
    } else {
        patch.transparency(0.0).line(&slot.border_color, BUBBLE_LINE_WEIGHT)
    }
}

fn label_patch(slot: &WordSlot, family: Option<&str>) -> ShapePatch {
    ShapePatch::new()
        .rect(slot.label)
        .text(slot.text.clone())
        .font(font(family, slot.font_size, slot.bold, &slot.text_color))
        .align(TextAlign::Center)
}

fn shadow_patch(style: &WordCloudStyle) -> ShapePatch {
    ShapePatch::new().fill(&style.shadow_color).transparency(style.shadow_opacity).no_line()
}

fn container_patch(style: &WordCloudStyle) -> ShapePatch {
    ShapePatch::new().fill(&style.panel_color).line(&style.border_color, 1.0)
}

fn chrome_patches(style: &WordCloudStyle, chrome: &WordCloudChrome) -> [ShapePatch; 3] {
    let family = style.font_family.as_deref();
    [
        ShapePatch::new().rect(chrome.title).font(font(family, TITLE_FONT_SIZE, true, &style.text_color)),
        ShapePatch::new().rect(chrome.subtitle).font(font(family, SUBTITLE_FONT_SIZE, false, &style.muted_color)),
        ShapePatch::new().rect(chrome.body).font(font(family, BODY_FONT_SIZE, false, &style.accent_color)),
    ]
}

// =============================================================================
// INSERT
// =============================================================================

/// Build an empty word cloud on `page`, replacing any previous one.
///
/// # Errors
///
/// Host failures. Shapes created before the failure are deleted first.
pub fn insert<H: DocumentHost + ?Sized>(
    host: &mut H,
    resolver: &ShapeKindResolver,
    page: &str,
    request: &InsertRequest<'_>,
) -> Result<WidgetManifest<WordItem>, HostError> {
    remove_widget::<WordItem, H>(host, page, KIND)?;

    let style = WordCloudStyle::normalize(request.style);
    let container = word_cloud_frame(host.page_size());
    let mut builder = ShapeBuilder::new(host, resolver, page, KIND);
    let result = build_cloud(&mut builder, container, &style, request).and_then(|manifest| {
        write_insert_tags(builder.host(), page, KIND, &manifest, &style.to_tag_value(), request.session_id)?;
        Ok(manifest)
    });
    match result {
        Ok(manifest) => {
            info!(page, pending = request.session_id.is_none(), "word cloud inserted");
            Ok(manifest)
        }
        Err(err) => {
            builder.rollback();
            Err(err)
        }
    }
}

fn build_cloud<H: DocumentHost + ?Sized>(
    b: &mut ShapeBuilder<'_, H>,
    container: Rect,
    style: &WordCloudStyle,
    request: &InsertRequest<'_>,
) -> Result<WidgetManifest<WordItem>, HostError> {
    let live = request.session_id.is_some();
    let chrome = word_cloud_chrome(container, style);
    let [title_style, subtitle_style, body_style] = chrome_patches(style, &chrome);

    let shadow = b.add(ShapeKind::RoundRectangle, shadow_rect(container), Role::Shadow, shadow_patch(style))?;
    let container_id = b.add(ShapeKind::RoundRectangle, container, Role::Container, container_patch(style))?;
    let title = b.add(ShapeKind::TextBox, chrome.title, Role::Title, title_style.text(title_text(request.code)))?;
    let subtitle_text = if live { "Audience votes animate each cloud." } else { "Connect a session to go live." };
    let subtitle = b.add(ShapeKind::TextBox, chrome.subtitle, Role::Subtitle, subtitle_style.text(subtitle_text))?;
    let body_text = if live { "Waiting for word cloud votes..." } else { "No active word cloud yet." };
    let body = b.add(ShapeKind::TextBox, chrome.body, Role::Body, body_style.text(body_text))?;

    let family = style.font_family.as_deref();
    let mut items = Vec::new();
    for slot in layout_at_ratios(container, style, &[], &[]) {
        let bubble = b.add_slot(ShapeKind::RoundRectangle, slot.bubble, Role::Bubble, slot.slot, bubble_patch(&slot))?;
        let label = b.add_slot(ShapeKind::TextBox, slot.label, Role::BubbleLabel, slot.slot, label_patch(&slot, family))?;
        items.push(WordItem { bubble, label: Some(label) });
    }

    let mut manifest = WidgetManifest::new(container_id, title, body);
    manifest.shadow = Some(shadow);
    manifest.subtitle = Some(subtitle);
    manifest.items = items;
    Ok(manifest)
}

// =============================================================================
// LEGACY UPGRADE
// =============================================================================

/// Give every label-less bubble its own label text box. Returns true when
/// the manifest changed.
fn add_missing_labels<H: DocumentHost + ?Sized>(
    host: &mut H,
    resolver: &ShapeKindResolver,
    page: &str,
    manifest: &mut WidgetManifest<WordItem>,
) -> bool {
    if manifest.items.iter().all(|item| !item.is_legacy()) {
        return false;
    }
    let mut builder = ShapeBuilder::new(host, resolver, page, KIND);
    let mut changed = false;
    for (slot, item) in manifest.items.iter_mut().enumerate().filter(|(_, item)| item.is_legacy()) {
        let Some(rect) = shape_rect(&*builder.host(), page, &item.bubble) else { continue };
        match builder.add_slot(ShapeKind::TextBox, rect, Role::BubbleLabel, slot, ShapePatch::new()) {
            Ok(label) => {
                patch_slot(builder.host(), page, Some(&item.bubble), &ShapePatch::new().text(""));
                item.label = Some(label);
                changed = true;
            }
            Err(err) => debug!(page, bubble = %item.bubble, error = %err, "legacy bubble label not created"),
        }
    }
    changed
}

// =============================================================================
// UPDATE
// =============================================================================

fn apply_frame<H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    manifest: &WidgetManifest<WordItem>,
    slots: &[WordSlot],
    family: Option<&str>,
) {
    for (item, slot) in manifest.items.iter().zip(slots) {
        patch_slot(host, page, Some(&item.bubble), &bubble_patch(slot));
        patch_slot(host, page, item.label.as_deref(), &label_patch(slot, family));
    }
}

fn render_chrome<H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    manifest: &WidgetManifest<WordItem>,
    style: &WordCloudStyle,
    container: Rect,
    choice: CloudChoice<'_>,
    code: Option<&str>,
) {
    let title = ShapePatch::new().text(title_text(code));
    let subtitle = ShapePatch::new().text(subtitle_text(choice));
    let body = ShapePatch::new().text(body_text(choice));
    if style.lock_style() {
        let [title_style, subtitle_style, body_style] = chrome_patches(style, &word_cloud_chrome(container, style));
        patch_slot(host, page, manifest.shadow.as_deref(), &shadow_patch(style).rect(shadow_rect(container)));
        patch_slot(host, page, Some(&manifest.container), &container_patch(style));
        patch_slot(host, page, Some(&manifest.title), &title_style);
        patch_slot(host, page, manifest.subtitle.as_deref(), &subtitle_style);
        patch_slot(host, page, Some(&manifest.body), &body_style);
    }
    patch_slot(host, page, Some(&manifest.title), &title);
    patch_slot(host, page, manifest.subtitle.as_deref(), &subtitle);
    patch_slot(host, page, Some(&manifest.body), &body);
}

async fn update_page<H: DocumentHost + ?Sized>(
    host: &mut H,
    resolver: &ShapeKindResolver,
    page: &str,
    sync: &SyncContext<'_>,
    frame_delay: Duration,
) -> Result<Option<PageOutcome>, HostError> {
    let state = BindingState::<WordItem>::read(&*host, page, KIND);
    let mut ready: ReadyPage<WordItem> =
        match resolve_page(host, page, state, &RecoveryContext::new(KIND), sync.session_id)? {
            Resolution::Absent => return Ok(None),
            Resolution::Skip(phase) => return Ok(Some(PageOutcome::Skipped(phase))),
            Resolution::Ready(ready) => ready,
        };
    let scope = TagScope::Page(page);

    if add_missing_labels(host, resolver, page, &mut ready.manifest) {
        info!(page, "added labels to legacy word bubbles");
        tags::write_json(host, scope, KIND.tags().manifest, &ready.manifest)?;
    }

    let style = WordCloudStyle::normalize(ready.style.as_ref());
    let container = shape_rect(&*host, page, &ready.manifest.container)
        .unwrap_or_else(|| word_cloud_frame(host.page_size()));
    let choice = choose_cloud(sync.snapshot, ready.resource_id.as_deref());
    let cloud_id = choice.cloud().map(|c| c.id.as_str());
    let words = choice.cloud().map(|c| rank_words(&c.words, style.max_words)).unwrap_or_default();
    let previous = ready
        .anim_state
        .as_deref()
        .and_then(tags::parse_json::<WordCloudAnimState>)
        .map(WordCloudAnimState::sanitized)
        .unwrap_or_default()
        .ratios_for(cloud_id);

    render_chrome(host, page, &ready.manifest, &style, container, choice, sync.code);

    let family = style.font_family.as_deref();
    let animation = WordCloudAnimation::new(container, &style, &words, &previous);
    let final_state = animation.final_state(cloud_id);
    let mut frames = 0;
    for frame in animation {
        apply_frame(host, page, &ready.manifest, &frame.slots, family);
        frames += 1;
        if frame.index + 1 < frame.total {
            host.flush().await?;
            tokio::time::sleep(frame_delay).await;
        }
    }

    if let Some(key) = KIND.tags().anim_state {
        tags::write_json(host, scope, key, &final_state)?;
    }
    if ready.rebind {
        finish_binding(host, page, KIND, sync.session_id)?;
    }
    debug!(page, frames, words = words.len(), "word cloud rendered");
    Ok(Some(PageOutcome::Updated { frames, recovered: ready.recovered }))
}

/// Reconcile every word cloud in the document with `sync`, animating pages
/// whose ratios moved.
///
/// # Errors
///
/// Only the final flush; per-page failures are reported in the tick report.
pub async fn update<H: DocumentHost + ?Sized>(
    host: &mut H,
    resolver: &ShapeKindResolver,
    sync: &SyncContext<'_>,
    frame_delay: Duration,
) -> Result<TickReport, HostError> {
    let mut report = TickReport::default();
    for page in host.pages() {
        let result = update_page(host, resolver, &page, sync, frame_delay).await;
        report.record(&page, KIND, result);
    }
    host.flush().await?;
    debug!(session_id = sync.session_id, updated = report.updated(), "word clouds reconciled");
    Ok(report)
}

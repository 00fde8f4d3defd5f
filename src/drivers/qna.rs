//! Q&A and discussion panels.
//!
//! Both kinds share one shape layout (see [`crate::layout::panel`]) and one
//! update path; they differ only in tags and copy. A panel bound to a prompt
//! shows that prompt's answers sorted by votes. An unbound Q&A panel shows
//! unprompted audience questions; an unbound discussion panel shows nothing.
//!
//! Panels written by early builds have no item cards, meta, subtitle or badge.
//! Those keep rendering the numbered list into the body text box.

#[cfg(test)]
#[path = "qna_test.rs"]
mod qna_test;

use tracing::{debug, info};

use crate::binding::{BindingState, ReadyPage, Resolution, finish_binding, resolve_page, write_insert_tags};
use crate::capability::ShapeKindResolver;
use crate::color::lighten;
use crate::consts::MAX_BODY_LINES;
use crate::host::{DocumentHost, HostError, ShapeKind, ShapePatch};
use crate::kind::WidgetKind;
use crate::layout::panel::{
    BADGE_FONT_SIZE, BODY_FONT_SIZE, ITEM_TEXT_FONT_SIZE, ITEM_VOTES_FONT_SIZE, META_FONT_SIZE, PanelLayout,
    SUBTITLE_FONT_SIZE, TITLE_FONT_SIZE, layout_panel, panel_frame,
};
use crate::manifest::{QnaItem, WidgetManifest};
use crate::recovery::{RecoveryContext, Role};
use crate::session::{QnaMode, QnaView};
use crate::style::{QnaStyle, WidgetStyle};

use super::{InsertRequest, PageOutcome, ShapeBuilder, SyncContext, TickReport, font, patch_slot, remove_widget};

// =============================================================================
// COPY
// =============================================================================

/// Fixed strings for one panel kind.
#[derive(Debug)]
pub struct PanelTexts {
    pub eyebrow: &'static str,
    pub prompt_eyebrow: &'static str,
    pub title: &'static str,
    pub prompt_title: &'static str,
    pub prompt_missing: &'static str,
    pub badge_audience: &'static str,
    pub badge_prompt: &'static str,
    pub empty_audience: &'static str,
    pub empty_prompt: &'static str,
    /// Unbound panels show unprompted questions.
    pub audience_when_unbound: bool,
}

const QNA_TEXTS: PanelTexts = PanelTexts {
    eyebrow: "LIVE Q&A",
    prompt_eyebrow: "LIVE PROMPT",
    title: "Questions from your audience",
    prompt_title: "Audience answers",
    prompt_missing: "Prompt not found.",
    badge_audience: "Pending",
    badge_prompt: "Answers",
    empty_audience: "No approved questions yet.",
    empty_prompt: "No answers yet.",
    audience_when_unbound: true,
};

const DISCUSSION_TEXTS: PanelTexts = PanelTexts {
    eyebrow: "OPEN DISCUSSION",
    prompt_eyebrow: "OPEN DISCUSSION",
    title: "Open discussion",
    prompt_title: "Open discussion",
    prompt_missing: "Prompt not found.",
    badge_audience: "Answers",
    badge_prompt: "Answers",
    empty_audience: "Select a prompt to show answers.",
    empty_prompt: "No answers yet.",
    audience_when_unbound: false,
};

const PLACEHOLDER_SUBTITLE: &str = "Connect a session to go live.";
const PLACEHOLDER_BODY: &str = "Connect a session to populate this slide.";

#[must_use]
pub fn texts(kind: WidgetKind) -> &'static PanelTexts {
    match kind {
        WidgetKind::Discussion => &DISCUSSION_TEXTS,
        _ => &QNA_TEXTS,
    }
}

#[must_use]
pub fn meta_text(code: Option<&str>) -> String {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => format!("Join code {code}"),
        None => "Waiting for new questions.".to_string(),
    }
}

#[must_use]
pub fn badge_text(view: &QnaView<'_>, texts: &PanelTexts) -> String {
    match view.mode {
        QnaMode::Prompt => format!("{} {}", texts.badge_prompt, view.approved.len()),
        QnaMode::Audience => format!("{} {}", texts.badge_audience, view.pending),
    }
}

#[must_use]
pub fn panel_title(view: &QnaView<'_>, texts: &PanelTexts) -> String {
    match view.mode {
        QnaMode::Audience => texts.title.to_string(),
        QnaMode::Prompt => match view.prompt.map(|p| p.prompt.trim()).filter(|p| !p.is_empty()) {
            Some(prompt) => prompt.to_string(),
            None if view.prompt_missing() => texts.prompt_missing.to_string(),
            None => texts.prompt_title.to_string(),
        },
    }
}

/// Title for panels without a header row, which fold the join code in.
#[must_use]
pub fn legacy_title(kind: WidgetKind, view: &QnaView<'_>, code: Option<&str>) -> String {
    let prompt = view.prompt.map(|p| p.prompt.trim()).filter(|p| !p.is_empty());
    let code = code.map(str::trim).filter(|c| !c.is_empty());
    match (kind, view.mode, prompt, code) {
        (_, QnaMode::Prompt, Some(prompt), _) => prompt.to_string(),
        (WidgetKind::Discussion, _, _, Some(code)) => format!("Open discussion • {code}"),
        (WidgetKind::Discussion, _, _, None) => DISCUSSION_TEXTS.title.to_string(),
        (_, QnaMode::Prompt, None, _) => QNA_TEXTS.prompt_title.to_string(),
        (_, QnaMode::Audience, _, Some(code)) => format!("Live Q&A • {code}"),
        (_, QnaMode::Audience, _, None) => "Live Q&A".to_string(),
    }
}

fn empty_body(view: &QnaView<'_>, texts: &PanelTexts) -> &'static str {
    match view.mode {
        QnaMode::Prompt => texts.empty_prompt,
        QnaMode::Audience => texts.empty_audience,
    }
}

/// Numbered list for panels without item cards.
#[must_use]
pub fn body_list(view: &QnaView<'_>, texts: &PanelTexts) -> String {
    if view.approved.is_empty() {
        return empty_body(view, texts).to_string();
    }
    view.approved
        .iter()
        .take(MAX_BODY_LINES)
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q.text))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// INSERT
// =============================================================================

/// Build a panel on `page`, replacing any previous panel of the same kind.
///
/// # Errors
///
/// Host failures. Shapes created before the failure are deleted first.
pub fn insert<H: DocumentHost + ?Sized>(
    host: &mut H,
    resolver: &ShapeKindResolver,
    page: &str,
    kind: WidgetKind,
    request: &InsertRequest<'_>,
) -> Result<WidgetManifest<QnaItem>, HostError> {
    let removed = remove_widget::<QnaItem, H>(host, page, kind)?;
    if removed > 0 {
        debug!(page, %kind, removed, "replaced existing panel");
    }

    let style = QnaStyle::normalize(request.style);
    let layout = layout_panel(panel_frame(host.page_size()), &style);
    let mut builder = ShapeBuilder::new(host, resolver, page, kind);
    let result = build_panel(&mut builder, kind, &layout, &style, request).and_then(|manifest| {
        write_insert_tags(builder.host(), page, kind, &manifest, &style.to_tag_value(), request.session_id)?;
        Ok(manifest)
    });
    match result {
        Ok(manifest) => {
            info!(page, %kind, items = manifest.items.len(), pending = request.session_id.is_none(), "panel inserted");
            Ok(manifest)
        }
        Err(err) => {
            builder.rollback();
            Err(err)
        }
    }
}

fn build_panel<H: DocumentHost + ?Sized>(
    b: &mut ShapeBuilder<'_, H>,
    kind: WidgetKind,
    layout: &PanelLayout,
    style: &QnaStyle,
    request: &InsertRequest<'_>,
) -> Result<WidgetManifest<QnaItem>, HostError> {
    let texts = texts(kind);
    let family = style.font_family.as_deref();
    let live = request.session_id.is_some();

    let shadow = b.add(ShapeKind::RoundRectangle, layout.shadow, Role::Shadow, shadow_patch(style))?;
    let container = b.add(ShapeKind::RoundRectangle, layout.container, Role::Container, container_patch(style))?;
    let meta = b.add(
        ShapeKind::TextBox,
        layout.meta,
        Role::Meta,
        ShapePatch::new().text(texts.eyebrow).font(font(family, META_FONT_SIZE, false, &style.muted_color)),
    )?;
    let title = b.add(
        ShapeKind::TextBox,
        layout.title,
        Role::Title,
        ShapePatch::new().text(texts.title).font(font(family, TITLE_FONT_SIZE, true, &style.text_color)),
    )?;
    let subtitle_text = if live { meta_text(request.code) } else { PLACEHOLDER_SUBTITLE.to_string() };
    let subtitle = b.add(
        ShapeKind::TextBox,
        layout.subtitle,
        Role::Subtitle,
        ShapePatch::new().text(subtitle_text).font(font(family, SUBTITLE_FONT_SIZE, false, &style.muted_color)),
    )?;
    let badge = b.add(
        ShapeKind::RoundRectangle,
        layout.badge,
        Role::Badge,
        badge_patch(style).text(format!("{} 0", texts.badge_audience)),
    )?;
    let body_text = if live { texts.empty_audience } else { PLACEHOLDER_BODY };
    let body = b.add(
        ShapeKind::TextBox,
        layout.body,
        Role::Body,
        ShapePatch::new().text(body_text).font(font(family, BODY_FONT_SIZE, false, &style.muted_color)),
    )?;

    let mut items = Vec::with_capacity(layout.items.len());
    for card in &layout.items {
        let container = b.add(
            ShapeKind::RoundRectangle,
            card.card,
            Role::Item,
            card_patch(style).transparency(1.0).no_line(),
        )?;
        let text = b.add(ShapeKind::TextBox, card.text, Role::ItemText, item_text_patch(style))?;
        let votes = b.add(ShapeKind::TextBox, card.votes, Role::ItemVotes, item_votes_patch(style))?;
        items.push(QnaItem { container, text, votes });
    }

    let mut manifest = WidgetManifest::new(container, title, body);
    manifest.shadow = Some(shadow);
    manifest.meta = Some(meta);
    manifest.subtitle = Some(subtitle);
    manifest.badge = Some(badge);
    manifest.items = items;
    Ok(manifest)
}

// =============================================================================
// STYLE PATCHES
// =============================================================================

fn shadow_patch(style: &QnaStyle) -> ShapePatch {
    ShapePatch::new().fill(&style.shadow_color).transparency(style.shadow_opacity).no_line()
}

fn container_patch(style: &QnaStyle) -> ShapePatch {
    ShapePatch::new().fill(&style.panel_color).line(&style.border_color, 1.0)
}

fn badge_patch(style: &QnaStyle) -> ShapePatch {
    ShapePatch::new()
        .fill(lighten(&style.accent_color, 0.82))
        .no_line()
        .font(font(style.font_family.as_deref(), BADGE_FONT_SIZE, true, &style.accent_color))
}

fn card_patch(style: &QnaStyle) -> ShapePatch {
    ShapePatch::new().fill(&style.card_color).line(&style.border_color, 1.0)
}

fn item_text_patch(style: &QnaStyle) -> ShapePatch {
    ShapePatch::new().font(font(style.font_family.as_deref(), ITEM_TEXT_FONT_SIZE, false, &style.text_color))
}

fn item_votes_patch(style: &QnaStyle) -> ShapePatch {
    ShapePatch::new().font(font(style.font_family.as_deref(), ITEM_VOTES_FONT_SIZE, false, &style.muted_color))
}

fn apply_locked_style<H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    manifest: &WidgetManifest<QnaItem>,
    style: &QnaStyle,
) {
    let family = style.font_family.as_deref();
    patch_slot(host, page, manifest.shadow.as_deref(), &shadow_patch(style));
    patch_slot(host, page, Some(&manifest.container), &container_patch(style));
    patch_slot(
        host,
        page,
        manifest.meta.as_deref(),
        &ShapePatch::new().font(font(family, META_FONT_SIZE, false, &style.muted_color)),
    );
    patch_slot(
        host,
        page,
        Some(&manifest.title),
        &ShapePatch::new().font(font(family, TITLE_FONT_SIZE, true, &style.text_color)),
    );
    patch_slot(
        host,
        page,
        manifest.subtitle.as_deref(),
        &ShapePatch::new().font(font(family, SUBTITLE_FONT_SIZE, false, &style.muted_color)),
    );
    patch_slot(host, page, manifest.badge.as_deref(), &badge_patch(style));
    patch_slot(
        host,
        page,
        Some(&manifest.body),
        &ShapePatch::new().font(font(family, BODY_FONT_SIZE, false, &style.muted_color)),
    );
    for item in &manifest.items {
        patch_slot(host, page, Some(&item.container), &card_patch(style));
        patch_slot(host, page, Some(&item.text), &item_text_patch(style));
        patch_slot(host, page, Some(&item.votes), &item_votes_patch(style));
    }
}

// =============================================================================
// UPDATE
// =============================================================================

/// Render one resolved page.
fn render_page<H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    kind: WidgetKind,
    ready: &ReadyPage<QnaItem>,
    sync: &SyncContext<'_>,
) {
    let texts = texts(kind);
    let manifest = &ready.manifest;
    let style = QnaStyle::normalize(ready.style.as_ref());
    if style.lock_style() {
        apply_locked_style(host, page, manifest, &style);
    }

    let view = sync.snapshot.qna_view(ready.resource_id.as_deref(), texts.audience_when_unbound);
    let has_header =
        !manifest.items.is_empty() || manifest.subtitle.is_some() || manifest.meta.is_some() || manifest.badge.is_some();

    let title = if has_header { panel_title(&view, texts) } else { legacy_title(kind, &view, sync.code) };
    patch_slot(host, page, Some(&manifest.title), &ShapePatch::new().text(title));

    let eyebrow = match view.mode {
        QnaMode::Prompt => texts.prompt_eyebrow,
        QnaMode::Audience => texts.eyebrow,
    };
    patch_slot(host, page, manifest.meta.as_deref(), &ShapePatch::new().text(eyebrow));
    patch_slot(host, page, manifest.subtitle.as_deref(), &ShapePatch::new().text(meta_text(sync.code)));
    patch_slot(host, page, manifest.badge.as_deref(), &ShapePatch::new().text(badge_text(&view, texts)));

    if manifest.items.is_empty() {
        patch_slot(host, page, Some(&manifest.body), &ShapePatch::new().text(body_list(&view, texts)));
        return;
    }

    let body = if view.approved.is_empty() { empty_body(&view, texts) } else { "" };
    patch_slot(host, page, Some(&manifest.body), &ShapePatch::new().text(body));

    for (index, item) in manifest.items.iter().enumerate() {
        let (card, text, votes) = match view.approved.get(index) {
            Some(question) => (
                ShapePatch::new().transparency(0.0).line(&style.border_color, 1.0),
                question.text.clone(),
                format!("{} votes", question.votes),
            ),
            None => (ShapePatch::new().transparency(1.0).no_line(), String::new(), String::new()),
        };
        patch_slot(host, page, Some(&item.container), &card);
        patch_slot(host, page, Some(&item.text), &ShapePatch::new().text(text));
        patch_slot(host, page, Some(&item.votes), &ShapePatch::new().text(votes));
    }
}

fn update_page<H: DocumentHost + ?Sized>(
    host: &mut H,
    page: &str,
    kind: WidgetKind,
    sync: &SyncContext<'_>,
) -> Result<Option<PageOutcome>, HostError> {
    let state = BindingState::<QnaItem>::read(&*host, page, kind);
    let ready = match resolve_page(host, page, state, &RecoveryContext::new(kind), sync.session_id)? {
        Resolution::Absent => return Ok(None),
        Resolution::Skip(phase) => return Ok(Some(PageOutcome::Skipped(phase))),
        Resolution::Ready(ready) => ready,
    };

    render_page(host, page, kind, &ready, sync);
    if ready.rebind {
        finish_binding(host, page, kind, sync.session_id)?;
    }
    Ok(Some(PageOutcome::Updated { frames: 1, recovered: ready.recovered }))
}

/// Reconcile every Q&A (or discussion) panel in the document with `sync`.
///
/// # Errors
///
/// Only the final flush; per-page failures are reported in the tick report.
pub async fn update<H: DocumentHost + ?Sized>(
    host: &mut H,
    kind: WidgetKind,
    sync: &SyncContext<'_>,
) -> Result<TickReport, HostError> {
    let mut report = TickReport::default();
    for page in host.pages() {
        let result = update_page(host, &page, kind, sync);
        report.record(&page, kind, result);
    }
    host.flush().await?;
    debug!(%kind, session_id = sync.session_id, updated = report.updated(), "panels reconciled");
    Ok(report)
}

//! Manifest reconstruction from what is actually on the page.
//!
//! DESIGN
//! ======
//! When a page's stored manifest is missing or dangling (the page was
//! duplicated, an old build wrote it, the user deleted a shape), the engine
//! rebuilds it from the shapes themselves. Each shape is offered to a chain of
//! matchers, most reliable first:
//!
//! 1. role tag: the shape says which role it plays (`Confidence::Tagged`)
//! 2. legacy tag: older word-cloud builds only wrote a slot index
//!    (`Confidence::Legacy`)
//! 3. heuristics: geometry over shapes that still carry the widget marker but
//!    no role (`Confidence::Heuristic`)
//!
//! The first matcher to claim a shape wins. Heuristics never look at unmarked
//! shapes, so a user's own rectangles and text boxes are never adopted.
//!
//! Recovery is a pure function of the shape list: the same page always
//! produces the same manifest.
//!
//! TRADE-OFFS
//! ==========
//! A manifest needs container, title and body. Everything else (shadow,
//! subtitle, item slots) is optional and simply skipped when absent, so a
//! half-deleted widget still renders its remaining parts.

#[cfg(test)]
#[path = "recovery_test.rs"]
mod recovery_test;

use std::cmp::Ordering;

use crate::host::{Shape, ShapeKind};
use crate::kind::WidgetKind;
use crate::manifest::{ItemRef, PollItem, QnaItem, WidgetManifest, WordItem};
use crate::style::Orientation;
use crate::tags::{has_marker, shape_role, word_index};

// =============================================================================
// ROLES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Shadow,
    Container,
    Meta,
    Title,
    Subtitle,
    Badge,
    Body,
    /// Q&A card background.
    Item,
    ItemText,
    ItemVotes,
    OptionLabel,
    BarTrack,
    BarFill,
    BarGroup,
    Bubble,
    BubbleLabel,
}

impl Role {
    fn base(self, kind: WidgetKind) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::Container => "container",
            Self::Meta => "meta",
            Self::Title => "title",
            Self::Subtitle => "subtitle",
            Self::Badge => "badge",
            Self::Body if kind == WidgetKind::Poll => "question",
            Self::Body => "body",
            Self::Item => "item",
            Self::ItemText => "item-text",
            Self::ItemVotes => "item-votes",
            Self::OptionLabel | Self::BubbleLabel => "label",
            Self::BarTrack => "bar-bg",
            Self::BarFill => "bar-fill",
            Self::BarGroup => "bar-group",
            Self::Bubble => "bubble",
        }
    }

    /// Role tag value written on shapes of `kind`.
    #[must_use]
    pub fn tag_value(self, kind: WidgetKind) -> String {
        format!("{}{}", role_prefix(kind), self.base(kind))
    }

    /// Parse a role tag value written for `kind`.
    #[must_use]
    pub fn from_tag(kind: WidgetKind, value: &str) -> Option<Self> {
        let base = value.trim().strip_prefix(role_prefix(kind))?;
        let role = match (kind, base) {
            (_, "shadow") => Self::Shadow,
            (_, "container") => Self::Container,
            (_, "title") => Self::Title,
            (_, "subtitle") => Self::Subtitle,
            (WidgetKind::Qna | WidgetKind::Discussion, "meta") => Self::Meta,
            (WidgetKind::Qna | WidgetKind::Discussion, "badge") => Self::Badge,
            (WidgetKind::Poll, "question" | "body") => Self::Body,
            (_, "body") => Self::Body,
            (WidgetKind::Qna | WidgetKind::Discussion, "item") => Self::Item,
            (WidgetKind::Qna | WidgetKind::Discussion, "item-text") => Self::ItemText,
            (WidgetKind::Qna | WidgetKind::Discussion, "item-votes") => Self::ItemVotes,
            (WidgetKind::Poll, "label") => Self::OptionLabel,
            (WidgetKind::Poll, "bar-bg") => Self::BarTrack,
            (WidgetKind::Poll, "bar-fill") => Self::BarFill,
            (WidgetKind::Poll, "bar-group") => Self::BarGroup,
            (WidgetKind::WordCloud, "bubble") => Self::Bubble,
            (WidgetKind::WordCloud, "label") => Self::BubbleLabel,
            _ => return None,
        };
        Some(role)
    }
}

fn role_prefix(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::Qna | WidgetKind::Discussion => "",
        WidgetKind::Poll => "poll-",
        WidgetKind::WordCloud => "wc-",
    }
}

/// How a role assignment was derived. Ordered best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Confidence {
    Tagged,
    Legacy,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleMatch {
    pub role: Role,
    pub confidence: Confidence,
    /// Slot index, when the shape recorded one.
    pub slot: Option<usize>,
}

// =============================================================================
// MATCHERS
// =============================================================================

type Matcher = fn(WidgetKind, &Shape) -> Option<RoleMatch>;

/// Per-shape matchers, most reliable first. Heuristics run as a separate
/// page-level pass because they rank shapes against each other.
const MATCHERS: [Matcher; 2] = [match_role_tag, match_legacy_tag];

fn carries_foreign_marker(kind: WidgetKind, shape: &Shape) -> bool {
    WidgetKind::ALL.iter().any(|other| *other != kind && has_marker(shape, *other))
}

fn match_role_tag(kind: WidgetKind, shape: &Shape) -> Option<RoleMatch> {
    // Q&A and discussion share role names; the marker decides ownership.
    if !has_marker(shape, kind) && carries_foreign_marker(kind, shape) {
        return None;
    }
    let role = Role::from_tag(kind, shape_role(shape)?)?;
    Some(RoleMatch { role, confidence: Confidence::Tagged, slot: word_index(shape) })
}

fn match_legacy_tag(kind: WidgetKind, shape: &Shape) -> Option<RoleMatch> {
    if kind != WidgetKind::WordCloud || !has_marker(shape, kind) {
        return None;
    }
    let slot = word_index(shape)?;
    let role = match shape.kind {
        ShapeKind::TextBox => Role::BubbleLabel,
        ShapeKind::RoundRectangle | ShapeKind::Rectangle => Role::Bubble,
        ShapeKind::Group => return None,
    };
    Some(RoleMatch { role, confidence: Confidence::Legacy, slot: Some(slot) })
}

/// Run the per-shape matcher chain.
#[must_use]
pub fn match_shape(kind: WidgetKind, shape: &Shape) -> Option<RoleMatch> {
    MATCHERS.iter().find_map(|matcher| matcher(kind, shape))
}

// =============================================================================
// CLAIMS
// =============================================================================

/// A shape and the role a matcher assigned to it.
#[derive(Debug, Clone, Copy)]
pub struct RoleClaim<'a> {
    pub shape: &'a Shape,
    pub matched: RoleMatch,
}

fn reading_order(a: &Shape, b: &Shape) -> Ordering {
    a.rect
        .top
        .total_cmp(&b.rect.top)
        .then(a.rect.left.total_cmp(&b.rect.left))
        .then_with(|| a.id.cmp(&b.id))
}

fn center_inside(inner: &Shape, outer: &Shape) -> bool {
    let (cx, cy) = inner.rect.center();
    cx >= outer.rect.left && cx <= outer.rect.right() && cy >= outer.rect.top && cy <= outer.rect.bottom()
}

/// Role assignments for one page, sorted by confidence then reading order.
pub struct RoleAssignments<'a> {
    list: Vec<RoleClaim<'a>>,
}

impl<'a> RoleAssignments<'a> {
    #[must_use]
    pub fn classify(kind: WidgetKind, shapes: &'a [Shape]) -> Self {
        let mut list: Vec<RoleClaim<'a>> = shapes
            .iter()
            .filter_map(|shape| match_shape(kind, shape).map(|matched| RoleClaim { shape, matched }))
            .collect();

        let unclaimed: Vec<&Shape> = shapes
            .iter()
            .filter(|s| has_marker(s, kind) && shape_role(s).is_none() && !list.iter().any(|c| c.shape.id == s.id))
            .collect();
        let heuristic = heuristic_claims(&list, &unclaimed);
        list.extend(heuristic);

        list.sort_by(|a, b| a.matched.confidence.cmp(&b.matched.confidence).then_with(|| reading_order(a.shape, b.shape)));
        Self { list }
    }

    /// Best claim for `role`.
    #[must_use]
    pub fn first(&self, role: Role) -> Option<&RoleClaim<'a>> {
        self.list.iter().find(|c| c.matched.role == role)
    }

    #[must_use]
    pub fn all(&self, role: Role) -> Vec<&RoleClaim<'a>> {
        self.list.iter().filter(|c| c.matched.role == role).collect()
    }

    #[must_use]
    pub fn has(&self, role: Role) -> bool {
        self.first(role).is_some()
    }
}

/// Geometry fallback over marked shapes that no matcher claimed.
///
/// The largest geometric shape becomes the container; a second geometric
/// shape of about the same size becomes the shadow. Text boxes inside the container
/// become title, subtitle and body in reading order.
fn heuristic_claims<'a>(claimed: &[RoleClaim<'a>], unclaimed: &[&'a Shape]) -> Vec<RoleClaim<'a>> {
    let taken = |role: Role| claimed.iter().any(|c| c.matched.role == role);
    let mut out = Vec::new();
    let claim = |shape: &'a Shape, role: Role| RoleClaim {
        shape,
        matched: RoleMatch { role, confidence: Confidence::Heuristic, slot: None },
    };

    let mut geometric: Vec<&Shape> = unclaimed.iter().copied().filter(|s| s.kind.is_geometric()).collect();
    geometric.sort_by(|a, b| b.rect.area().total_cmp(&a.rect.area()).then_with(|| reading_order(a, b)));

    let mut container: Option<&Shape> = claimed.iter().find(|c| c.matched.role == Role::Container).map(|c| c.shape);
    let mut geometric = geometric.into_iter();
    if container.is_none() {
        if let Some(largest) = geometric.next() {
            container = Some(largest);
            out.push(claim(largest, Role::Container));
        }
    }
    if !taken(Role::Shadow) {
        if let (Some(next), Some(frame)) = (geometric.next(), container) {
            let ratio = next.rect.area() / frame.rect.area().max(1.0);
            if (0.9..=1.1).contains(&ratio) {
                out.push(claim(next, Role::Shadow));
            }
        }
    }

    let mut texts: Vec<&Shape> = unclaimed
        .iter()
        .copied()
        .filter(|s| s.kind == ShapeKind::TextBox)
        .filter(|s| container.is_none_or(|frame| center_inside(s, frame)))
        .collect();
    texts.sort_by(|a, b| reading_order(a, b));

    let want_title = !taken(Role::Title);
    let want_subtitle = !taken(Role::Subtitle);
    let want_body = !taken(Role::Body);
    let mut texts = texts.into_iter();
    if want_title {
        if let Some(title) = texts.next() {
            out.push(claim(title, Role::Title));
        }
    }
    let rest: Vec<&Shape> = texts.collect();
    if want_body {
        if let Some((body, middle)) = rest.split_last() {
            out.push(claim(body, Role::Body));
            if want_subtitle {
                if let Some(subtitle) = middle.first() {
                    out.push(claim(subtitle, Role::Subtitle));
                }
            }
        }
    } else if want_subtitle {
        if let Some(subtitle) = rest.first() {
            out.push(claim(subtitle, Role::Subtitle));
        }
    }
    out
}

// =============================================================================
// ASSEMBLY
// =============================================================================

/// Inputs recovery needs beyond the shapes.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryContext {
    pub kind: WidgetKind,
    /// Poll options are ordered along this axis.
    pub orientation: Orientation,
}

impl RecoveryContext {
    #[must_use]
    pub fn new(kind: WidgetKind) -> Self {
        Self { kind, orientation: Orientation::Horizontal }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome<I> {
    Recovered {
        manifest: WidgetManifest<I>,
        /// Worst confidence among the shapes used.
        confidence: Confidence,
    },
    /// Required roles could not be found.
    Orphaned { missing: Vec<Role> },
}

/// Item types that can be rebuilt from classified shapes.
pub trait Recoverable: ItemRef {
    fn assemble(claims: &RoleAssignments<'_>, ctx: &RecoveryContext) -> (Vec<Self>, Option<Confidence>);
}

fn worst(a: Option<Confidence>, b: Confidence) -> Option<Confidence> {
    Some(a.map_or(b, |a| a.max(b)))
}

impl Recoverable for QnaItem {
    fn assemble(claims: &RoleAssignments<'_>, _ctx: &RecoveryContext) -> (Vec<Self>, Option<Confidence>) {
        let mut cards = claims.all(Role::Item);
        cards.sort_by(|a, b| reading_order(a.shape, b.shape));
        let texts = claims.all(Role::ItemText);
        let votes = claims.all(Role::ItemVotes);

        let mut confidence = None;
        let mut items = Vec::new();
        for card in cards {
            let text = texts.iter().find(|t| center_inside(t.shape, card.shape));
            let vote = votes.iter().find(|v| center_inside(v.shape, card.shape));
            if let (Some(text), Some(vote)) = (text, vote) {
                for c in [card.matched.confidence, text.matched.confidence, vote.matched.confidence] {
                    confidence = worst(confidence, c);
                }
                items.push(QnaItem {
                    container: card.shape.id.clone(),
                    text: text.shape.id.clone(),
                    votes: vote.shape.id.clone(),
                });
            }
        }
        (items, confidence)
    }
}

impl Recoverable for PollItem {
    fn assemble(claims: &RoleAssignments<'_>, ctx: &RecoveryContext) -> (Vec<Self>, Option<Confidence>) {
        let axis = |shape: &Shape| match ctx.orientation {
            Orientation::Horizontal => shape.rect.top,
            Orientation::Vertical => shape.rect.left,
        };
        let mut labels = claims.all(Role::OptionLabel);
        labels.sort_by(|a, b| axis(a.shape).total_cmp(&axis(b.shape)).then_with(|| reading_order(a.shape, b.shape)));
        let mut tracks = claims.all(Role::BarTrack);
        tracks.sort_by(|a, b| axis(a.shape).total_cmp(&axis(b.shape)).then_with(|| reading_order(a.shape, b.shape)));
        let fills = claims.all(Role::BarFill);
        let groups = claims.all(Role::BarGroup);

        let mut confidence = None;
        let mut items = Vec::new();
        for (label, track) in labels.iter().zip(tracks.iter()) {
            let fill = fills
                .iter()
                .find(|f| f.shape.parent.is_some() && f.shape.parent == track.shape.parent)
                .or_else(|| fills.iter().find(|f| center_inside(f.shape, track.shape)));
            let Some(fill) = fill else { continue };
            let group = track.shape.parent.clone().filter(|parent| {
                fill.shape.parent.as_ref() == Some(parent) || groups.iter().any(|g| &g.shape.id == parent)
            });
            for c in [label.matched.confidence, track.matched.confidence, fill.matched.confidence] {
                confidence = worst(confidence, c);
            }
            items.push(PollItem {
                label: label.shape.id.clone(),
                bg: track.shape.id.clone(),
                fill: fill.shape.id.clone(),
                group,
            });
        }
        (items, confidence)
    }
}

impl Recoverable for WordItem {
    fn assemble(claims: &RoleAssignments<'_>, _ctx: &RecoveryContext) -> (Vec<Self>, Option<Confidence>) {
        let mut bubbles = claims.all(Role::Bubble);
        bubbles.sort_by(|a, b| match (a.matched.slot, b.matched.slot) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| reading_order(a.shape, b.shape)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => reading_order(a.shape, b.shape),
        });
        let labels = claims.all(Role::BubbleLabel);

        let mut confidence = None;
        let mut items = Vec::new();
        for bubble in bubbles {
            let label = labels
                .iter()
                .find(|l| l.matched.slot.is_some() && l.matched.slot == bubble.matched.slot)
                .or_else(|| labels.iter().find(|l| center_inside(l.shape, bubble.shape)));
            confidence = worst(confidence, bubble.matched.confidence);
            if let Some(label) = label {
                confidence = worst(confidence, label.matched.confidence);
            }
            items.push(WordItem {
                bubble: bubble.shape.id.clone(),
                label: label.map(|l| l.shape.id.clone()),
            });
        }
        (items, confidence)
    }
}

/// Rebuild a manifest for `ctx.kind` from the page's shapes.
#[must_use]
pub fn recover<I: Recoverable>(shapes: &[Shape], ctx: &RecoveryContext) -> RecoveryOutcome<I> {
    let claims = RoleAssignments::classify(ctx.kind, shapes);

    let missing: Vec<Role> = [Role::Container, Role::Title, Role::Body]
        .into_iter()
        .filter(|role| !claims.has(*role))
        .collect();
    let (Some(container), Some(title), Some(body)) =
        (claims.first(Role::Container), claims.first(Role::Title), claims.first(Role::Body))
    else {
        return RecoveryOutcome::Orphaned { missing };
    };

    let mut confidence = container.matched.confidence.max(title.matched.confidence).max(body.matched.confidence);
    let optional = |role: Role| claims.first(role).map(|c| (c.shape.id.clone(), c.matched.confidence));

    let mut manifest: WidgetManifest<I> =
        WidgetManifest::new(container.shape.id.clone(), title.shape.id.clone(), body.shape.id.clone());
    for (role, slot) in [
        (Role::Shadow, &mut manifest.shadow),
        (Role::Meta, &mut manifest.meta),
        (Role::Subtitle, &mut manifest.subtitle),
        (Role::Badge, &mut manifest.badge),
    ] {
        if let Some((id, c)) = optional(role) {
            *slot = Some(id);
            confidence = confidence.max(c);
        }
    }

    let (items, item_confidence) = I::assemble(&claims, ctx);
    if let Some(c) = item_confidence {
        confidence = confidence.max(c);
    }
    manifest.items = items;

    RecoveryOutcome::Recovered { manifest, confidence }
}

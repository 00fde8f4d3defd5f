//! Document host interface.
//!
//! DESIGN
//! ======
//! The engine never talks to a concrete editor. It drives an injected
//! [`DocumentHost`] which exposes pages, shapes and string tags. Writes are
//! queued by the host and committed by [`DocumentHost::flush`]; a real editor
//! add-in maps one flush to one batched round-trip.
//!
//! Shape ids are stable until the user deletes the shape. Nothing else is
//! assumed: a page may be duplicated (copying tags verbatim), shapes may be
//! removed behind the engine's back, and a host may refuse to create some
//! shape kinds at all.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::geometry::{Rect, Size};

pub type PageId = String;
pub type ShapeId = String;

/// Shape kinds the engine creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    RoundRectangle,
    Rectangle,
    TextBox,
    Group,
}

impl ShapeKind {
    /// Geometric shapes carry a fill; text boxes and groups do not.
    #[must_use]
    pub fn is_geometric(self) -> bool {
        matches!(self, Self::RoundRectangle | Self::Rectangle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Font attributes. Unset fields leave the host's current value alone.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Font {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A shape as read back from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub rect: Rect,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    /// 0 = opaque, 1 = invisible.
    #[serde(default)]
    pub transparency: f64,
    #[serde(default)]
    pub line_visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_weight: Option<f64>,
    #[serde(default)]
    pub font: Font,
    #[serde(default)]
    pub align: TextAlign,
    /// Group containing this shape, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ShapeId>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Shape {
    #[must_use]
    pub fn new(id: impl Into<ShapeId>, kind: ShapeKind, rect: Rect) -> Self {
        Self {
            id: id.into(),
            kind,
            rect,
            text: String::new(),
            fill_color: None,
            transparency: 0.0,
            line_visible: false,
            line_color: None,
            line_weight: None,
            font: Font::default(),
            align: TextAlign::Left,
            parent: None,
            tags: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Partial shape update. `None` fields are not touched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Font>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
}

impl ShapePatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn fill(mut self, color: impl Into<String>) -> Self {
        self.fill_color = Some(color.into());
        self
    }

    #[must_use]
    pub fn transparency(mut self, transparency: f64) -> Self {
        self.transparency = Some(transparency);
        self
    }

    #[must_use]
    pub fn line(mut self, color: impl Into<String>, weight: f64) -> Self {
        self.line_visible = Some(true);
        self.line_color = Some(color.into());
        self.line_weight = Some(weight);
        self
    }

    #[must_use]
    pub fn no_line(mut self) -> Self {
        self.line_visible = Some(false);
        self
    }

    #[must_use]
    pub fn font(mut self, font: Font) -> Self {
        self.font = Some(font);
        self
    }

    #[must_use]
    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = Some(align);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply onto a shape record. Used by hosts that hold shapes in memory.
    pub fn apply_to(&self, shape: &mut Shape) {
        if let Some(rect) = self.rect {
            shape.rect = rect;
        }
        if let Some(text) = &self.text {
            shape.text.clone_from(text);
        }
        if let Some(color) = &self.fill_color {
            shape.fill_color = Some(color.clone());
        }
        if let Some(t) = self.transparency {
            shape.transparency = t;
        }
        if let Some(visible) = self.line_visible {
            shape.line_visible = visible;
        }
        if let Some(color) = &self.line_color {
            shape.line_color = Some(color.clone());
        }
        if let Some(weight) = self.line_weight {
            shape.line_weight = Some(weight);
        }
        if let Some(font) = &self.font {
            if let Some(family) = &font.family {
                shape.font.family = Some(family.clone());
            }
            if let Some(size) = font.size {
                shape.font.size = Some(size);
            }
            if let Some(bold) = font.bold {
                shape.font.bold = Some(bold);
            }
            if let Some(color) = &font.color {
                shape.font.color = Some(color.clone());
            }
        }
        if let Some(align) = self.align {
            shape.align = align;
        }
    }
}

/// Where a tag lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagScope<'a> {
    Document,
    Page(&'a str),
    Shape { page: &'a str, shape: &'a str },
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("page not found: {0}")]
    PageNotFound(PageId),
    #[error("shape not found: {0}")]
    ShapeNotFound(ShapeId),
    #[error("host cannot create {0:?} shapes")]
    UnsupportedShapeKind(ShapeKind),
    #[error("host rejected the batched call: {0}")]
    Rejected(String),
    #[error("deck io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("deck decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ErrorCode for HostError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PageNotFound(_) => "E_PAGE_NOT_FOUND",
            Self::ShapeNotFound(_) => "E_SHAPE_NOT_FOUND",
            Self::UnsupportedShapeKind(_) => "E_UNSUPPORTED_SHAPE",
            Self::Rejected(_) => "E_HOST_REJECTED",
            Self::Io(_) => "E_DECK_IO",
            Self::Decode(_) => "E_DECK_DECODE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Pages, shapes and tags of one open document.
///
/// Synchronous calls enqueue; [`flush`](Self::flush) commits. An implementation
/// that applies writes eagerly is valid as long as `flush` is still awaited by
/// the engine at every commit point.
#[async_trait::async_trait]
pub trait DocumentHost: Send {
    /// Page ids in document order.
    fn pages(&self) -> Vec<PageId>;

    /// The page the user is looking at.
    fn selected_page(&self) -> Option<PageId>;

    fn page_size(&self) -> Size;

    /// Every shape on the page, group members included.
    fn list_shapes(&self, page: &str) -> Result<Vec<Shape>, HostError>;

    /// `Ok(None)` when the id no longer resolves.
    fn get_shape(&self, page: &str, id: &str) -> Result<Option<Shape>, HostError>;

    fn create_shape(&mut self, page: &str, kind: ShapeKind, rect: Rect) -> Result<ShapeId, HostError>;

    /// Deleting a group deletes its members.
    fn delete_shape(&mut self, page: &str, id: &str) -> Result<(), HostError>;

    fn group_shapes(&mut self, page: &str, ids: &[ShapeId]) -> Result<ShapeId, HostError>;

    fn apply_patch(&mut self, page: &str, id: &str, patch: &ShapePatch) -> Result<(), HostError>;

    fn get_tag(&self, scope: TagScope<'_>, key: &str) -> Result<Option<String>, HostError>;

    fn set_tag(&mut self, scope: TagScope<'_>, key: &str, value: &str) -> Result<(), HostError>;

    fn delete_tag(&mut self, scope: TagScope<'_>, key: &str) -> Result<(), HostError>;

    async fn flush(&mut self) -> Result<(), HostError>;
}

/// True when `id` resolves on `page`. Host errors count as "does not resolve".
pub fn shape_exists<H: DocumentHost + ?Sized>(host: &H, page: &str, id: &str) -> bool {
    matches!(host.get_shape(page, id), Ok(Some(_)))
}

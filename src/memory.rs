//! In-memory document host.
//!
//! `MemoryDeck` holds pages, shapes and tags in plain collections and applies
//! writes immediately; [`DocumentHost::flush`] only counts commits. It backs the
//! CLI (the deck is a JSON file on disk) and every test in the crate.
//!
//! Test hooks let a deck refuse a shape kind, reject writes to one page or
//! fail reads of one page. Per-page failure isolation and shape-kind
//! fallback are exercised through them.

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Rect, Size};
use crate::host::{DocumentHost, HostError, PageId, Shape, ShapeId, ShapeKind, ShapePatch, TagScope};

/// One page (slide) of a deck.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Shapes in z-order, bottom first.
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDeck {
    #[serde(default)]
    page_size: Size,
    #[serde(default)]
    pages: Vec<Page>,
    #[serde(default)]
    selected: Option<PageId>,
    #[serde(default)]
    document_tags: BTreeMap<String, String>,
    #[serde(skip)]
    unsupported: HashSet<ShapeKind>,
    #[serde(skip)]
    poisoned: HashSet<PageId>,
    #[serde(skip)]
    unreadable: HashSet<PageId>,
    #[serde(skip)]
    flushes: usize,
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl MemoryDeck {
    #[must_use]
    pub fn new(page_size: Size) -> Self {
        Self { page_size, ..Self::default() }
    }

    /// Deck with `count` empty pages; the first one is selected.
    #[must_use]
    pub fn with_pages(page_size: Size, count: usize) -> Self {
        let mut deck = Self::new(page_size);
        for _ in 0..count {
            deck.add_page();
        }
        deck.selected = deck.pages.first().map(|p| p.id.clone());
        deck
    }

    // =========================================================================
    // FILE I/O
    // =========================================================================

    pub fn load(path: &Path) -> Result<Self, HostError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), HostError> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    // =========================================================================
    // PAGES
    // =========================================================================

    pub fn add_page(&mut self) -> PageId {
        let id = new_id();
        self.pages.push(Page { id: id.clone(), ..Page::default() });
        id
    }

    pub fn select_page(&mut self, page: &str) -> bool {
        if self.pages.iter().any(|p| p.id == page) {
            self.selected = Some(page.to_string());
            true
        } else {
            false
        }
    }

    pub fn remove_page(&mut self, page: &str) -> bool {
        let before = self.pages.len();
        self.pages.retain(|p| p.id != page);
        if self.selected.as_deref() == Some(page) {
            self.selected = None;
        }
        self.pages.len() != before
    }

    /// Copy a page the way an editor does: shapes get fresh ids, tags (page and
    /// shape) are copied verbatim. Stored manifests on the copy therefore point
    /// at the original page's shape ids.
    pub fn duplicate_page(&mut self, page: &str) -> Option<PageId> {
        let source = self.pages.iter().find(|p| p.id == page)?.clone();
        let remap: BTreeMap<ShapeId, ShapeId> = source.shapes.iter().map(|s| (s.id.clone(), new_id())).collect();
        let shapes = source
            .shapes
            .into_iter()
            .map(|mut shape| {
                if let Some(id) = remap.get(&shape.id) {
                    shape.id.clone_from(id);
                }
                shape.parent = shape.parent.and_then(|p| remap.get(&p).cloned());
                shape
            })
            .collect();
        let id = new_id();
        self.pages.push(Page { id: id.clone(), tags: source.tags, shapes });
        Some(id)
    }

    #[must_use]
    pub fn page(&self, page: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page)
    }

    /// Shape lookup without going through the host trait.
    #[must_use]
    pub fn shape(&self, page: &str, id: &str) -> Option<&Shape> {
        self.page(page)?.shapes.iter().find(|s| s.id == id)
    }

    /// Mutable shape access, for simulating user edits.
    pub fn shape_mut(&mut self, page: &str, id: &str) -> Option<&mut Shape> {
        self.pages.iter_mut().find(|p| p.id == page)?.shapes.iter_mut().find(|s| s.id == id)
    }

    /// Insert a shape as-is (used to seed legacy layouts in tests and fixtures).
    pub fn insert_shape(&mut self, page: &str, shape: Shape) -> Result<(), HostError> {
        self.page_mut(page)?.shapes.push(shape);
        Ok(())
    }

    // =========================================================================
    // TEST HOOKS
    // =========================================================================

    /// Make `create_shape` refuse `kind`.
    pub fn set_unsupported(&mut self, kind: ShapeKind) {
        self.unsupported.insert(kind);
    }

    /// Reject every write that touches `page`. Reads still succeed.
    pub fn poison_page(&mut self, page: &str) {
        self.poisoned.insert(page.to_string());
    }

    /// Fail every read that touches `page`, as a host does for a slide that
    /// was removed mid-tick.
    pub fn block_reads(&mut self, page: &str) {
        self.unreadable.insert(page.to_string());
    }

    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn check(&self, page: &str) -> Result<(), HostError> {
        if self.poisoned.contains(page) {
            return Err(HostError::Rejected(format!("page {page} is locked")));
        }
        Ok(())
    }

    fn page_ref(&self, page: &str) -> Result<&Page, HostError> {
        if self.unreadable.contains(page) {
            return Err(HostError::Rejected(format!("page {page} is unreadable")));
        }
        self.pages
            .iter()
            .find(|p| p.id == page)
            .ok_or_else(|| HostError::PageNotFound(page.to_string()))
    }

    fn page_mut(&mut self, page: &str) -> Result<&mut Page, HostError> {
        self.check(page)?;
        self.pages
            .iter_mut()
            .find(|p| p.id == page)
            .ok_or_else(|| HostError::PageNotFound(page.to_string()))
    }

    fn tags_ref(&self, scope: TagScope<'_>) -> Result<&BTreeMap<String, String>, HostError> {
        match scope {
            TagScope::Document => Ok(&self.document_tags),
            TagScope::Page(page) => Ok(&self.page_ref(page)?.tags),
            TagScope::Shape { page, shape } => self
                .page_ref(page)?
                .shapes
                .iter()
                .find(|s| s.id == shape)
                .map(|s| &s.tags)
                .ok_or_else(|| HostError::ShapeNotFound(shape.to_string())),
        }
    }

    fn tags_mut(&mut self, scope: TagScope<'_>) -> Result<&mut BTreeMap<String, String>, HostError> {
        match scope {
            TagScope::Document => Ok(&mut self.document_tags),
            TagScope::Page(page) => Ok(&mut self.page_mut(page)?.tags),
            TagScope::Shape { page, shape } => self
                .page_mut(page)?
                .shapes
                .iter_mut()
                .find(|s| s.id == shape)
                .map(|s| &mut s.tags)
                .ok_or_else(|| HostError::ShapeNotFound(shape.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl DocumentHost for MemoryDeck {
    fn pages(&self) -> Vec<PageId> {
        self.pages.iter().map(|p| p.id.clone()).collect()
    }

    fn selected_page(&self) -> Option<PageId> {
        self.selected.clone()
    }

    fn page_size(&self) -> Size {
        self.page_size
    }

    fn list_shapes(&self, page: &str) -> Result<Vec<Shape>, HostError> {
        Ok(self.page_ref(page)?.shapes.clone())
    }

    fn get_shape(&self, page: &str, id: &str) -> Result<Option<Shape>, HostError> {
        Ok(self.page_ref(page)?.shapes.iter().find(|s| s.id == id).cloned())
    }

    fn create_shape(&mut self, page: &str, kind: ShapeKind, rect: Rect) -> Result<ShapeId, HostError> {
        if self.unsupported.contains(&kind) {
            return Err(HostError::UnsupportedShapeKind(kind));
        }
        let id = new_id();
        self.page_mut(page)?.shapes.push(Shape::new(id.clone(), kind, rect));
        Ok(id)
    }

    fn delete_shape(&mut self, page: &str, id: &str) -> Result<(), HostError> {
        let page = self.page_mut(page)?;
        if !page.shapes.iter().any(|s| s.id == id) {
            return Err(HostError::ShapeNotFound(id.to_string()));
        }
        page.shapes.retain(|s| s.id != id && s.parent.as_deref() != Some(id));
        Ok(())
    }

    fn group_shapes(&mut self, page: &str, ids: &[ShapeId]) -> Result<ShapeId, HostError> {
        let page = self.page_mut(page)?;
        let mut rects = Vec::with_capacity(ids.len());
        for id in ids {
            let shape = page
                .shapes
                .iter()
                .find(|s| &s.id == id)
                .ok_or_else(|| HostError::ShapeNotFound(id.clone()))?;
            rects.push(shape.rect);
        }
        let Some(bounds) = Rect::union_all(&rects) else {
            return Err(HostError::Rejected("cannot group zero shapes".into()));
        };
        let group_id = new_id();
        for shape in page.shapes.iter_mut().filter(|s| ids.contains(&s.id)) {
            shape.parent = Some(group_id.clone());
        }
        page.shapes.push(Shape::new(group_id.clone(), ShapeKind::Group, bounds));
        Ok(group_id)
    }

    fn apply_patch(&mut self, page: &str, id: &str, patch: &ShapePatch) -> Result<(), HostError> {
        let shape = self
            .page_mut(page)?
            .shapes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| HostError::ShapeNotFound(id.to_string()))?;
        patch.apply_to(shape);
        Ok(())
    }

    fn get_tag(&self, scope: TagScope<'_>, key: &str) -> Result<Option<String>, HostError> {
        Ok(self.tags_ref(scope)?.get(key).cloned())
    }

    fn set_tag(&mut self, scope: TagScope<'_>, key: &str, value: &str) -> Result<(), HostError> {
        self.tags_mut(scope)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_tag(&mut self, scope: TagScope<'_>, key: &str) -> Result<(), HostError> {
        self.tags_mut(scope)?.remove(key);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), HostError> {
        self.flushes += 1;
        Ok(())
    }
}

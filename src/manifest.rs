//! Widget manifests: which shape id plays which role.
//!
//! A manifest is the page-level record written at insert time and read on
//! every tick. It is only trusted after [`WidgetManifest::is_valid`] confirms
//! the required ids still resolve on the page. Optional slots and items that
//! no longer resolve are pruned from the stored manifest on the next tick.

#[cfg(test)]
#[path = "manifest_test.rs"]
mod manifest_test;

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::host::{DocumentHost, ShapeId, shape_exists};

/// A per-slot group of shape ids inside a manifest.
pub trait ItemRef: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync {
    /// Every id this item references.
    fn shape_ids(&self) -> Vec<&str>;

    /// The item with dead optional ids cleared, or `None` when a required
    /// shape is gone.
    fn pruned(&self, alive: &dyn Fn(&str) -> bool) -> Option<Self>;
}

// =============================================================================
// ITEM SHAPES
// =============================================================================

/// One Q&A card: background, question text and vote count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaItem {
    pub container: ShapeId,
    pub text: ShapeId,
    pub votes: ShapeId,
}

impl ItemRef for QnaItem {
    fn shape_ids(&self) -> Vec<&str> {
        vec![self.container.as_str(), self.text.as_str(), self.votes.as_str()]
    }

    fn pruned(&self, alive: &dyn Fn(&str) -> bool) -> Option<Self> {
        self.shape_ids().into_iter().all(|id| alive(id)).then(|| self.clone())
    }
}

/// One poll option slot: label text, bar track and bar fill.
///
/// `group` is absent on widgets inserted before bars were grouped; the poll
/// driver upgrades those in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollItem {
    pub label: ShapeId,
    pub bg: ShapeId,
    pub fill: ShapeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<ShapeId>,
}

impl ItemRef for PollItem {
    fn shape_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.label.as_str(), self.bg.as_str(), self.fill.as_str()];
        if let Some(group) = &self.group {
            ids.push(group);
        }
        ids
    }

    fn pruned(&self, alive: &dyn Fn(&str) -> bool) -> Option<Self> {
        if ![&self.label, &self.bg, &self.fill].into_iter().all(|id| alive(id.as_str())) {
            return None;
        }
        // A lost group is rebuilt by the poll driver's legacy upgrade.
        let group = self.group.clone().filter(|id| alive(id.as_str()));
        Some(Self { group, ..self.clone() })
    }
}

/// One word-cloud slot: the bubble and its separate label text box.
///
/// Early builds stored a bare bubble id with the word drawn inside the bubble;
/// those deserialize with `label: None` and are upgraded by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WordItemRepr")]
pub struct WordItem {
    pub bubble: ShapeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<ShapeId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WordItemRepr {
    Bare(ShapeId),
    Full {
        bubble: ShapeId,
        #[serde(default)]
        label: Option<ShapeId>,
    },
}

impl From<WordItemRepr> for WordItem {
    fn from(repr: WordItemRepr) -> Self {
        match repr {
            WordItemRepr::Bare(bubble) => Self { bubble, label: None },
            WordItemRepr::Full { bubble, label } => Self { bubble, label },
        }
    }
}

impl WordItem {
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.label.is_none()
    }
}

impl ItemRef for WordItem {
    fn shape_ids(&self) -> Vec<&str> {
        let mut ids = vec![self.bubble.as_str()];
        if let Some(label) = &self.label {
            ids.push(label);
        }
        ids
    }

    fn pruned(&self, alive: &dyn Fn(&str) -> bool) -> Option<Self> {
        if !alive(self.bubble.as_str()) {
            return None;
        }
        let label = self.label.clone().filter(|id| alive(id.as_str()));
        Some(Self { bubble: self.bubble.clone(), label })
    }
}

// =============================================================================
// MANIFEST
// =============================================================================

/// Role → shape id record for one widget on one page.
///
/// Poll manifests historically named the body slot `question`, word clouds
/// named their items `words`; both spellings are accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetManifest<I> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<ShapeId>,
    pub container: ShapeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ShapeId>,
    pub title: ShapeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<ShapeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<ShapeId>,
    #[serde(alias = "question")]
    pub body: ShapeId,
    #[serde(default = "Vec::new", alias = "words")]
    pub items: Vec<I>,
}

impl<I: ItemRef> WidgetManifest<I> {
    /// Manifest with the required roles only.
    #[must_use]
    pub fn new(container: ShapeId, title: ShapeId, body: ShapeId) -> Self {
        Self {
            shadow: None,
            container,
            meta: None,
            title,
            subtitle: None,
            badge: None,
            body,
            items: Vec::new(),
        }
    }

    /// Ids of the roles every widget must have.
    #[must_use]
    pub fn required_ids(&self) -> [&str; 3] {
        [self.container.as_str(), self.title.as_str(), self.body.as_str()]
    }

    /// Every id the manifest references, items included.
    #[must_use]
    pub fn shape_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        ids.extend(self.shadow.as_deref());
        ids.push(&self.container);
        ids.extend(self.meta.as_deref());
        ids.push(&self.title);
        ids.extend(self.subtitle.as_deref());
        ids.extend(self.badge.as_deref());
        ids.push(&self.body);
        for item in &self.items {
            ids.extend(item.shape_ids());
        }
        ids
    }

    /// Valid when every required id resolves on `page`.
    pub fn is_valid<H: DocumentHost + ?Sized>(&self, host: &H, page: &str) -> bool {
        self.required_ids().iter().all(|id| shape_exists(host, page, id))
    }

    /// Clear optional roles whose shape is gone and drop items that lost a
    /// required shape. Returns the still-live ids of dropped items.
    pub fn prune_dangling<H: DocumentHost + ?Sized>(&mut self, host: &H, page: &str) -> Vec<ShapeId> {
        let alive = |id: &str| shape_exists(host, page, id);
        for slot in [&mut self.shadow, &mut self.meta, &mut self.subtitle, &mut self.badge] {
            if slot.as_deref().is_some_and(|id| !alive(id)) {
                *slot = None;
            }
        }

        let mut leftovers = Vec::new();
        let items = std::mem::take(&mut self.items);
        for item in items {
            match item.pruned(&alive) {
                Some(kept) => self.items.push(kept),
                None => leftovers.extend(item.shape_ids().into_iter().filter(|id| alive(*id)).map(str::to_string)),
            }
        }
        leftovers
    }

    /// Referenced ids that no longer resolve.
    pub fn dangling_ids<H: DocumentHost + ?Sized>(&self, host: &H, page: &str) -> Vec<String> {
        self.shape_ids()
            .into_iter()
            .filter(|id| !shape_exists(host, page, id))
            .map(str::to_string)
            .collect()
    }
}

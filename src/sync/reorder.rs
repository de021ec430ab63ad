//! Ordered-set reorder engine.
//!
//! Features are split into a fixed tier (`A`) and a reorderable tier
//! (`B`/`C`). A [`DragSession`] turns pointer gestures over the reorderable
//! container into a 1-based order; [`build_proposal`] turns that into a
//! full ordering with every `A` feature first in its existing relative
//! order. The proposal is only ever reflected locally through the feature
//! re-fetch that follows the server's answer.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::errors::{SyncError, SyncResult};
use crate::sync::api::DashboardApi;
use crate::sync::cache::Store;
use crate::sync::models::{Feature, OrderEntry, Priority};

/// Vertical extent of a rendered sibling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Item(String),
    Placeholder,
}

/// One drag gesture over the reorderable container.
#[derive(Debug, Clone)]
pub struct DragSession {
    original: Vec<String>,
    dragged: String,
    slots: Vec<Slot>,
}

impl DragSession {
    /// Pick up `dragged` from `container`. The placeholder starts where the
    /// element was. Returns `None` if the element is not in the container.
    pub fn pick_up(container: &[String], dragged: &str) -> Option<Self> {
        if !container.iter().any(|id| id == dragged) {
            return None;
        }
        let slots = container
            .iter()
            .map(|id| {
                if id == dragged {
                    Slot::Placeholder
                } else {
                    Slot::Item(id.clone())
                }
            })
            .collect();
        Some(Self {
            original: container.to_vec(),
            dragged: dragged.to_string(),
            slots,
        })
    }

    pub fn dragged(&self) -> &str {
        &self.dragged
    }

    /// Pointer moved over `sibling`. The placeholder goes before the
    /// sibling when the pointer is in its upper half, after it otherwise.
    /// Returns whether the placeholder moved.
    pub fn drag_over(&mut self, sibling: &str, pointer_y: f64, rect: Rect) -> bool {
        if sibling == self.dragged {
            return false;
        }
        let before = self.slots.clone();
        let Some(placeholder) = self.slots.iter().position(|s| *s == Slot::Placeholder) else {
            return false;
        };
        self.slots.remove(placeholder);
        let Some(target) = self
            .slots
            .iter()
            .position(|s| matches!(s, Slot::Item(id) if id == sibling))
        else {
            self.slots = before;
            return false;
        };
        let insert_at = if pointer_y < rect.midpoint() {
            target
        } else {
            target + 1
        };
        self.slots.insert(insert_at, Slot::Placeholder);
        self.slots != before
    }

    /// Current arrangement with the dragged element shown at the
    /// placeholder.
    pub fn preview(&self) -> Vec<&str> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Item(id) => id.as_str(),
                Slot::Placeholder => self.dragged.as_str(),
            })
            .collect()
    }

    /// Drop or drag-end: the dragged element takes the placeholder's
    /// position and the whole container is emitted as a 1-based order.
    pub fn finish(self) -> Vec<OrderEntry> {
        self.preview()
            .into_iter()
            .enumerate()
            .map(|(i, id)| OrderEntry {
                id: id.to_string(),
                order_index: i as i64 + 1,
            })
            .collect()
    }

    /// Abandon the gesture; the container keeps its original order.
    pub fn cancel(self) -> Vec<String> {
        self.original
    }
}

/// Build the full ordering proposal for a project.
///
/// `A` features come first in their existing relative order. The emitted
/// container order follows, with `A` ids, unknown ids and duplicates
/// dropped. Reorderable features missing from the emitted order keep their
/// existing relative order at the end. Indices run 1..=N.
pub fn build_proposal(features: &[Feature], emitted: &[OrderEntry]) -> Vec<OrderEntry> {
    let mut existing: Vec<&Feature> = features.iter().collect();
    existing.sort_by_key(|f| f.order_index);

    let mut ordered: Vec<&str> = existing
        .iter()
        .filter(|f| f.priority == Priority::A)
        .map(|f| f.id.as_str())
        .collect();

    let mut emitted_sorted: Vec<&OrderEntry> = emitted.iter().collect();
    emitted_sorted.sort_by_key(|e| e.order_index);

    let mut seen: HashSet<&str> = ordered.iter().copied().collect();
    for entry in emitted_sorted {
        let Some(feature) = features.iter().find(|f| f.id == entry.id) else {
            debug!(id = %entry.id, "dropping unknown id from reorder");
            continue;
        };
        if !feature.priority.is_reorderable() {
            debug!(id = %entry.id, "dropping fixed-tier id from reorder");
            continue;
        }
        if seen.insert(feature.id.as_str()) {
            ordered.push(feature.id.as_str());
        }
    }

    for feature in existing {
        if seen.insert(feature.id.as_str()) {
            ordered.push(feature.id.as_str());
        }
    }

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, id)| OrderEntry {
            id: id.to_string(),
            order_index: i as i64 + 1,
        })
        .collect()
}

/// Submit a reorder as a single batch and re-fetch the feature list
/// whatever the answer. On rejection nothing of the proposal is applied.
pub async fn submit(
    api: &dyn DashboardApi,
    store: &mut Store,
    project_id: &str,
    emitted: &[OrderEntry],
) -> SyncResult<Vec<OrderEntry>> {
    let proposal = build_proposal(store.cache.features_for(project_id), emitted);

    let outcome = match api.reorder(project_id, &proposal).await {
        Ok(ack) if ack.ok => Ok(proposal),
        Ok(ack) => Err(SyncError::CommandRejected {
            command: "reorder".to_string(),
            message: ack.reason(),
        }),
        Err(e) => Err(e),
    };

    match api.fetch_features(project_id).await {
        Ok(features) => store.apply_features(project_id, features),
        Err(e) => warn!(project_id, error = %e, "feature re-fetch after reorder failed"),
    }

    outcome
}

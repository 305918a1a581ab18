use std::sync::Arc;

use serde::Serialize;

use crate::error::CoreError;
use crate::ingest::IngestMode;
use crate::model::Entity;
use crate::store::SortSpec;

/// Immutable snapshot of a session, published after every change.
#[derive(Debug, Clone)]
pub struct SessionView<T: Entity> {
    /// Visible items in display order.
    pub items: Vec<Arc<T>>,
    /// Items in the collection, visible or not.
    pub total: usize,
    pub selected: Option<T::Id>,
    pub previous: Option<T::Id>,
    pub filter: Option<String>,
    pub highlight: Option<String>,
    pub sorter: Option<SortSpec>,
    pub error: Option<CoreError>,
    pub fetching: bool,
    /// Newest fetch generation that completed. Zero until the first fetch settles.
    pub settled_generation: u64,
    pub mode: IngestMode,
    pub version: u64,
}

impl<T: Entity> Default for SessionView<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            selected: None,
            previous: None,
            filter: None,
            highlight: None,
            sorter: None,
            error: None,
            fetching: false,
            settled_generation: 0,
            mode: IngestMode::Active,
            version: 0,
        }
    }
}

impl<T: Entity> SessionView<T> {
    /// The selected item, if it is currently visible.
    pub fn selected_item(&self) -> Option<&Arc<T>> {
        let id = self.selected.as_ref()?;
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected.as_ref()?;
        self.items.iter().position(|item| item.id() == id)
    }

    /// At least one fetch has completed and none is outstanding.
    pub fn is_synced(&self) -> bool {
        self.settled_generation > 0 && !self.fetching
    }

    pub fn hidden_count(&self) -> usize {
        self.total.saturating_sub(self.items.len())
    }
}

/// Serializable summary of a view, without the items.
#[derive(Debug, Clone, Serialize)]
pub struct ViewStatus {
    pub visible: usize,
    pub total: usize,
    pub filter: Option<String>,
    pub sorter: Option<SortSpec>,
    pub fetching: bool,
    pub mode: IngestMode,
    pub error: Option<String>,
}

impl<T: Entity> From<&SessionView<T>> for ViewStatus {
    fn from(view: &SessionView<T>) -> Self {
        Self {
            visible: view.items.len(),
            total: view.total,
            filter: view.filter.clone(),
            sorter: view.sorter.clone(),
            fetching: view.fetching,
            mode: view.mode,
            error: view.error.as_ref().map(ToString::to_string),
        }
    }
}

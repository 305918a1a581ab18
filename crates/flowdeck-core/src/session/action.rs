use std::fmt;

use crate::error::CoreError;
use crate::ingest::Delta;
use crate::model::Entity;
use crate::store::KeyFn;

/// Everything the session reducer reacts to.
#[derive(Debug)]
pub enum Action<T: Entity> {
    /// New filter text. `None` or blank shows everything.
    UpdateFilter(Option<String>),
    /// New highlight text. Stored for presentation only.
    UpdateHighlight(Option<String>),
    /// New sort. `None` restores arrival order.
    UpdateSorter(Option<SortRequest<T>>),
    Select(T::Id),
    /// Move the selection within the visible list (keyboard navigation).
    SelectRelative(isize),
    /// A decoded push-channel message.
    WsMessage(Delta<T>),
    /// Re-fetch everything without discarding the current list.
    Refresh,
    /// A fetch completed.
    Received { generation: u64, items: Vec<T> },
    /// A fetch failed.
    FetchFailed { generation: u64, error: CoreError },
    /// A REST action was sent. Carries no state.
    RequestAcknowledged,
}

impl<T: Entity> Action<T> {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateFilter(_) => "update_filter",
            Self::UpdateHighlight(_) => "update_highlight",
            Self::UpdateSorter(_) => "update_sorter",
            Self::Select(_) => "select",
            Self::SelectRelative(_) => "select_relative",
            Self::WsMessage(_) => "ws_message",
            Self::Refresh => "refresh",
            Self::Received { .. } => "received",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::RequestAcknowledged => "request_acknowledged",
        }
    }
}

/// A sort column plus the key extractor that implements it.
pub struct SortRequest<T> {
    pub column: String,
    pub descending: bool,
    pub key: KeyFn<T>,
}

impl<T> SortRequest<T> {
    pub fn new(column: impl Into<String>, descending: bool, key: KeyFn<T>) -> Self {
        Self {
            column: column.into(),
            descending,
            key,
        }
    }
}

impl<T> fmt::Debug for SortRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortRequest")
            .field("column", &self.column)
            .field("descending", &self.descending)
            .finish_non_exhaustive()
    }
}

/// Side effects the reducer asks its owner to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Fetch every item and report back with `generation`.
    FetchAll { generation: u64 },
}

// ── Session reducer ──
//
// `Session` composes the ordered list with what the user is doing to it:
// filter and highlight text, the active sort, and the selection. It is a
// plain value; `reduce` consumes it and returns the next value together
// with any side effects the owner must run.

mod action;
mod view;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{CoreError, ErrorKind};
use crate::filter::{FilterCompiler, TextFilter};
use crate::ingest::{Delta, DeltaIngest, Ingested};
use crate::model::{Entity, Flow};
use crate::store::{OrderedList, SortSpec, arrival_order, compile_filter, sort_comparator};

pub use action::{Action, Effect, SortRequest};
pub use view::{SessionView, ViewStatus};

/// How many selections are remembered (current + previous).
const SELECTION_DEPTH: usize = 2;

pub struct Session<T: Entity> {
    list: OrderedList<T>,
    ingest: DeltaIngest,
    compiler: Arc<dyn FilterCompiler<T>>,
    /// Most recent first.
    selected: Vec<T::Id>,
    filter: Option<String>,
    highlight: Option<String>,
    sorter: Option<SortSpec>,
    error: Option<CoreError>,
    version: u64,
}

impl Session<Flow> {
    /// A flow session using the default text filter grammar.
    pub fn for_flows() -> Self {
        Self::new(Arc::new(TextFilter))
    }
}

impl<T: Entity> Session<T> {
    pub fn new(compiler: Arc<dyn FilterCompiler<T>>) -> Self {
        Self {
            list: OrderedList::new(),
            ingest: DeltaIngest::new(),
            compiler,
            selected: Vec::new(),
            filter: None,
            highlight: None,
            sorter: None,
            error: None,
            version: 0,
        }
    }

    /// Apply one action. `version` is bumped whenever observable state changes.
    pub fn reduce(mut self, action: Action<T>) -> (Self, Vec<Effect>) {
        let mut effects = Vec::new();
        let name = action.name();
        let mode_before = self.ingest.mode();

        let changed = match action {
            Action::UpdateFilter(text) => self.update_filter(text),
            Action::UpdateHighlight(text) => self.update_highlight(text),
            Action::UpdateSorter(request) => self.update_sorter(request),
            Action::Select(id) => self.select(id),
            Action::SelectRelative(delta) => self.select_relative(delta),
            Action::WsMessage(delta) => self.ingest_delta(delta, &mut effects),
            Action::Refresh => {
                let generation = self.ingest.begin_fetch();
                effects.push(Effect::FetchAll { generation });
                true
            }
            Action::Received { generation, items } => self.receive(generation, items),
            Action::FetchFailed { generation, error } => self.fetch_failed(generation, error),
            Action::RequestAcknowledged => false,
        };

        if changed || self.ingest.mode() != mode_before {
            self.version += 1;
        }
        debug!(action = name, changed, version = self.version, "reduced");
        (self, effects)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn list(&self) -> &OrderedList<T> {
        &self.list
    }

    pub fn ingest(&self) -> &DeltaIngest {
        &self.ingest
    }

    /// Current selection.
    pub fn selected(&self) -> Option<&T::Id> {
        self.selected.first()
    }

    /// The selection before the current one.
    pub fn previous(&self) -> Option<&T::Id> {
        self.selected.get(1)
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn highlight(&self) -> Option<&str> {
        self.highlight.as_deref()
    }

    pub fn sorter(&self) -> Option<&SortSpec> {
        self.sorter.as_ref()
    }

    pub fn error(&self) -> Option<&CoreError> {
        self.error.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn view(&self) -> SessionView<T> {
        SessionView {
            items: self.list.visible_items(),
            total: self.list.len(),
            selected: self.selected.first().cloned(),
            previous: self.selected.get(1).cloned(),
            filter: self.filter.clone(),
            highlight: self.highlight.clone(),
            sorter: self.sorter.clone(),
            error: self.error.clone(),
            fetching: self.ingest.is_fetching(),
            settled_generation: self.ingest.settled(),
            mode: self.ingest.mode(),
            version: self.version,
        }
    }

    // ── Handlers ─────────────────────────────────────────────────────

    fn update_filter(&mut self, text: Option<String>) -> bool {
        let text = text.filter(|t| !t.trim().is_empty());
        match compile_filter(self.compiler.as_ref(), text.as_deref()) {
            Ok(predicate) => {
                self.list.replace_policy(Some(predicate), None);
                self.clear_error(ErrorKind::Compile);
            }
            Err(e) => {
                warn!(error = %e, "filter rejected, previous filter stays active");
                self.error = Some(e);
            }
        }
        self.filter = text;
        true
    }

    fn update_highlight(&mut self, text: Option<String>) -> bool {
        if self.highlight == text {
            return false;
        }
        self.highlight = text;
        true
    }

    fn update_sorter(&mut self, request: Option<SortRequest<T>>) -> bool {
        match request {
            Some(SortRequest {
                column,
                descending,
                key,
            }) => {
                self.list
                    .replace_policy(None, Some(sort_comparator(key, descending)));
                self.sorter = Some(SortSpec { column, descending });
            }
            None => {
                self.list.replace_policy(None, Some(arrival_order()));
                self.sorter = None;
            }
        }
        true
    }

    fn select(&mut self, id: T::Id) -> bool {
        if self.selected.first() == Some(&id) {
            return false;
        }
        self.selected.retain(|s| *s != id);
        self.selected.insert(0, id);
        self.selected.truncate(SELECTION_DEPTH);
        true
    }

    /// Step through the visible list, clamping at both ends. Without a
    /// visible selection, a forward step picks the first item and a
    /// backward step the last.
    fn select_relative(&mut self, delta: isize) -> bool {
        let visible = self.list.visible_ids();
        let Some(last) = visible.len().checked_sub(1) else {
            return false;
        };
        let target = match self.selected.first().and_then(|id| self.list.visible_position(id)) {
            Some(pos) => pos.saturating_add_signed(delta).min(last),
            None if delta < 0 => last,
            None => 0,
        };
        match visible.get(target).cloned() {
            Some(id) => self.select(id),
            None => false,
        }
    }

    fn ingest_delta(&mut self, delta: Delta<T>, effects: &mut Vec<Effect>) -> bool {
        match self.ingest.apply(&mut self.list, delta) {
            Ingested::FetchRequired { generation } => {
                effects.push(Effect::FetchAll { generation });
                true
            }
            Ingested::Upserted { .. } => true,
            Ingested::Removed { id, existed } => {
                let before = self.selected.len();
                self.selected.retain(|s| *s != id);
                existed || self.selected.len() != before
            }
            Ingested::Ignored => false,
        }
    }

    fn receive(&mut self, generation: u64, items: Vec<T>) -> bool {
        if !self.ingest.accept_snapshot(&mut self.list, generation, items) {
            return false;
        }
        let list = &self.list;
        self.selected.retain(|id| list.contains(id));
        self.clear_error(ErrorKind::Transport);
        true
    }

    fn fetch_failed(&mut self, generation: u64, error: CoreError) -> bool {
        if !self.ingest.fetch_failed(generation) {
            return false;
        }
        warn!(error = %error, generation, "fetch failed, keeping last known list");
        self.error = Some(error);
        true
    }

    fn clear_error(&mut self, kind: ErrorKind) {
        if self.error.as_ref().is_some_and(|e| e.kind() == kind) {
            self.error = None;
        }
    }
}

// ── Delta ingestion ──
//
// Routes push-channel deltas to the collection and tracks whether a full
// reset is pending. A reset clears the list and hands out a new fetch
// generation; only the snapshot carrying the newest unsettled generation
// may repopulate the list.

use tracing::{debug, warn};

use crate::model::Entity;
use crate::store::OrderedList;

/// An incremental change, or the reset sentinel.
#[derive(Debug, Clone)]
pub enum Delta<T: Entity> {
    Reset,
    Add(T),
    Update(T),
    Remove(T::Id),
    /// Anything the transport could not map to the above.
    Unrecognized { kind: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IngestMode {
    #[default]
    Active,
    AwaitingFullReset,
}

/// What a delta did to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingested<Id> {
    /// The list was cleared; a fetch tagged `generation` must follow.
    FetchRequired { generation: u64 },
    Upserted { id: Id, is_new: bool },
    Removed { id: Id, existed: bool },
    Ignored,
}

/// Mode flag plus the fetch generation guard.
#[derive(Debug, Clone, Default)]
pub struct DeltaIngest {
    mode: IngestMode,
    /// Newest fetch generation handed out.
    generation: u64,
    /// Newest generation that completed (successfully or not).
    settled: u64,
}

impl DeltaIngest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> IngestMode {
        self.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn settled(&self) -> u64 {
        self.settled
    }

    /// A fetch has been issued and not yet completed.
    pub fn is_fetching(&self) -> bool {
        self.generation > self.settled
    }

    /// Apply one delta.
    ///
    /// Deltas that arrive while a reset fetch is outstanding are applied
    /// like any other; the snapshot replaces them once it lands.
    pub fn apply<T: Entity>(&mut self, list: &mut OrderedList<T>, delta: Delta<T>) -> Ingested<T::Id> {
        match delta {
            Delta::Reset => {
                list.reset();
                self.mode = IngestMode::AwaitingFullReset;
                let generation = self.begin_fetch();
                debug!(generation, "reset received, collection cleared");
                Ingested::FetchRequired { generation }
            }
            Delta::Add(item) | Delta::Update(item) => {
                self.mode = IngestMode::Active;
                let id = item.id().clone();
                let is_new = list.insert_or_replace(item);
                debug!(?id, is_new, "upserted");
                Ingested::Upserted { id, is_new }
            }
            Delta::Remove(id) => {
                self.mode = IngestMode::Active;
                let existed = list.remove(&id).is_some();
                debug!(?id, existed, "removed");
                Ingested::Removed { id, existed }
            }
            Delta::Unrecognized { kind } => {
                debug!(%kind, "ignoring unrecognized delta");
                Ingested::Ignored
            }
        }
    }

    /// Hand out a new fetch generation. Any older outstanding fetch becomes stale.
    pub fn begin_fetch(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Whether a completion tagged `generation` may still be applied.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && generation > self.settled
    }

    /// Apply a fetched snapshot if `generation` is current. Returns `false`
    /// (and leaves the list alone) for stale completions.
    pub fn accept_snapshot<T: Entity>(
        &mut self,
        list: &mut OrderedList<T>,
        generation: u64,
        items: Vec<T>,
    ) -> bool {
        if !self.is_current(generation) {
            warn!(
                generation,
                current = self.generation,
                "discarding stale fetch result"
            );
            return false;
        }
        let count = items.len();
        list.replace_all(items);
        self.settled = generation;
        self.mode = IngestMode::Active;
        debug!(generation, count, "snapshot applied");
        true
    }

    /// Record a failed fetch. Returns `false` for stale failures.
    pub fn fetch_failed(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            warn!(generation, current = self.generation, "discarding stale fetch failure");
            return false;
        }
        self.settled = generation;
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(u32, &'static str);

    impl Entity for Item {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.0
        }
    }

    #[test]
    fn reset_clears_and_requests_fetch() {
        let mut list = OrderedList::new();
        let mut ingest = DeltaIngest::new();
        ingest.apply(&mut list, Delta::Add(Item(1, "a")));

        let out = ingest.apply(&mut list, Delta::Reset);
        assert_eq!(out, Ingested::FetchRequired { generation: 1 });
        assert!(list.is_empty());
        assert_eq!(ingest.mode(), IngestMode::AwaitingFullReset);
        assert!(ingest.is_fetching());
    }

    #[test]
    fn deltas_during_reset_are_applied_and_reactivate() {
        let mut list = OrderedList::new();
        let mut ingest = DeltaIngest::new();
        ingest.apply(&mut list, Delta::Reset);

        ingest.apply(&mut list, Delta::Add(Item(2, "b")));
        assert!(list.contains(&2));
        assert_eq!(ingest.mode(), IngestMode::Active);
        // The fetch is still outstanding.
        assert!(ingest.is_fetching());
    }

    #[test]
    fn snapshot_replaces_everything() {
        let mut list = OrderedList::new();
        let mut ingest = DeltaIngest::new();
        let ActiveFetch(generation) = reset(&mut ingest, &mut list);
        ingest.apply(&mut list, Delta::Add(Item(9, "early")));

        assert!(ingest.accept_snapshot(&mut list, generation, vec![Item(5, "e")]));
        assert_eq!(list.visible_ids(), &[5]);
        assert!(!ingest.is_fetching());
    }

    #[test]
    fn stale_snapshot_is_discarded() {
        let mut list = OrderedList::new();
        let mut ingest = DeltaIngest::new();
        let ActiveFetch(first) = reset(&mut ingest, &mut list);
        let ActiveFetch(second) = reset(&mut ingest, &mut list);
        ingest.apply(&mut list, Delta::Add(Item(3, "fresh")));

        assert!(!ingest.accept_snapshot(&mut list, first, vec![Item(1, "stale")]));
        assert_eq!(list.visible_ids(), &[3]);

        assert!(ingest.accept_snapshot(&mut list, second, vec![Item(4, "new")]));
        assert_eq!(list.visible_ids(), &[4]);

        // Same generation twice is also stale.
        assert!(!ingest.accept_snapshot(&mut list, second, vec![]));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn failure_settles_without_touching_list() {
        let mut list = OrderedList::new();
        let mut ingest = DeltaIngest::new();
        list.insert_or_replace(Item(1, "kept"));
        let generation = ingest.begin_fetch();

        assert!(ingest.fetch_failed(generation));
        assert!(!ingest.is_fetching());
        assert_eq!(list.len(), 1);
        assert!(!ingest.fetch_failed(generation));
    }

    #[test]
    fn unknown_remove_and_unrecognized_are_harmless() {
        let mut list: OrderedList<Item> = OrderedList::new();
        let mut ingest = DeltaIngest::new();
        assert_eq!(
            ingest.apply(&mut list, Delta::Remove(7)),
            Ingested::Removed { id: 7, existed: false }
        );
        assert_eq!(
            ingest.apply(&mut list, Delta::Unrecognized { kind: "events/add".into() }),
            Ingested::Ignored
        );
    }

    struct ActiveFetch(u64);

    fn reset(ingest: &mut DeltaIngest, list: &mut OrderedList<Item>) -> ActiveFetch {
        match ingest.apply(list, Delta::Reset) {
            Ingested::FetchRequired { generation } => ActiveFetch(generation),
            other => panic!("expected FetchRequired, got {other:?}"),
        }
    }
}

// ── Ordered, filtered collection ──
//
// Authoritative id -> item map plus a cached visible projection. The map
// is an `IndexMap`, so its key order *is* arrival order and doubles as
// the tie-break for items the comparator treats as equal.
//
// Single-item mutations patch `visible` in place; policy changes rebuild
// it from scratch.

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;

use super::policy::{Comparator, Policy, Predicate};
use crate::model::Entity;

/// Authoritative item map with a derived, ordered, filtered view.
///
/// After every operation `visible_ids()` equals the arrival-ordered ids
/// that pass the predicate, stably sorted by the comparator.
pub struct OrderedList<T: Entity> {
    by_id: IndexMap<T::Id, Arc<T>>,
    visible: Vec<T::Id>,
    policy: Policy<T>,
}

impl<T: Entity> Default for OrderedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T: Entity> IntoIterator for &'a OrderedList<T> {
    type Item = &'a Arc<T>;
    type IntoIter = indexmap::map::Values<'a, T::Id, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Entity> OrderedList<T> {
    pub fn new() -> Self {
        Self::with_policy(Policy::default())
    }

    pub fn with_policy(policy: Policy<T>) -> Self {
        Self {
            by_id: IndexMap::new(),
            visible: Vec::new(),
            policy,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Insert a new item at the end of arrival order, or replace an
    /// existing one in place. Returns `true` if the id was new.
    pub fn insert_or_replace(&mut self, item: T) -> bool {
        let item = Arc::new(item);
        let id = item.id().clone();

        // `IndexMap::insert` keeps the slot of an existing key.
        let is_new = self.by_id.insert(id.clone(), Arc::clone(&item)).is_none();
        if !is_new {
            self.excise(&id);
        }

        if self.policy.accepts(&item) {
            let pos = self.insertion_point(&id, &item);
            self.visible.insert(pos, id);
        }

        is_new
    }

    /// Remove an item. Unknown ids are a no-op.
    pub fn remove(&mut self, id: &T::Id) -> Option<Arc<T>> {
        let removed = self.by_id.shift_remove(id)?;
        self.excise(id);
        Some(removed)
    }

    /// Drop every item. The policy is kept.
    pub fn reset(&mut self) {
        self.by_id.clear();
        self.visible.clear();
    }

    /// Replace the whole dataset, in sequence order. Equivalent to
    /// `reset()` followed by `insert_or_replace` for each item.
    pub fn replace_all(&mut self, items: impl IntoIterator<Item = T>) {
        self.by_id.clear();
        for item in items {
            self.by_id.insert(item.id().clone(), Arc::new(item));
        }
        self.rederive();
    }

    /// Swap whichever policy halves are given, then rebuild the view.
    pub fn replace_policy(
        &mut self,
        predicate: Option<Predicate<T>>,
        comparator: Option<Comparator<T>>,
    ) {
        if let Some(predicate) = predicate {
            self.policy.set_predicate(predicate);
        }
        if let Some(comparator) = comparator {
            self.policy.set_comparator(comparator);
        }
        self.rederive();
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn get(&self, id: &T::Id) -> Option<&Arc<T>> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Visible ids, in display order.
    pub fn visible_ids(&self) -> &[T::Id] {
        &self.visible
    }

    /// Visible items, in display order.
    pub fn visible_items(&self) -> Vec<Arc<T>> {
        self.visible
            .iter()
            .filter_map(|id| self.by_id.get(id).map(Arc::clone))
            .collect()
    }

    /// Index of `id` in the visible view.
    pub fn visible_position(&self, id: &T::Id) -> Option<usize> {
        self.visible.iter().position(|v| v == id)
    }

    /// Every item, in arrival order.
    pub fn iter(&self) -> indexmap::map::Values<'_, T::Id, Arc<T>> {
        self.by_id.values()
    }

    pub fn policy(&self) -> &Policy<T> {
        &self.policy
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn excise(&mut self, id: &T::Id) {
        if let Some(pos) = self.visible_position(id) {
            self.visible.remove(pos);
        }
    }

    /// Where a full sort would place `item` among the current visible ids.
    fn insertion_point(&self, id: &T::Id, item: &T) -> usize {
        let Some(arrival) = self.by_id.get_index_of(id) else {
            return self.visible.len();
        };
        self.visible.partition_point(|probe_id| {
            let Some((probe_arrival, _, probe)) = self.by_id.get_full(probe_id) else {
                return true;
            };
            self.policy
                .compare(probe, item)
                .then_with(|| probe_arrival.cmp(&arrival))
                == Ordering::Less
        })
    }

    /// Filter arrival order, then stable-sort.
    fn rederive(&mut self) {
        let policy = &self.policy;
        let mut items: Vec<&Arc<T>> = self
            .by_id
            .values()
            .filter(|item| policy.accepts(item))
            .collect();
        items.sort_by(|a, b| policy.compare(a, b));
        self.visible = items.into_iter().map(|item| item.id().clone()).collect();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::store::policy::{KeyFn, SortKey, accept_all, arrival_order, sort_comparator};

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        size: i64,
    }

    impl Entity for Item {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    fn item(id: u32, size: i64) -> Item {
        Item { id, size }
    }

    fn by_size() -> KeyFn<Item> {
        Arc::new(|i: &Item| SortKey::Int(i.size))
    }

    fn larger_than(limit: i64) -> Predicate<Item> {
        Arc::new(move |i: &Item| i.size > limit)
    }

    fn scenario_list() -> OrderedList<Item> {
        let mut list = OrderedList::new();
        list.insert_or_replace(item(1, 10));
        list.insert_or_replace(item(2, 5));
        list.insert_or_replace(item(3, 20));
        list
    }

    // ── Scenarios ────────────────────────────────────────────────────

    #[test]
    fn sort_then_filter_keeps_size_order() {
        let mut list = scenario_list();
        assert_eq!(list.visible_ids(), &[1, 2, 3]);

        list.replace_policy(None, Some(sort_comparator(by_size(), false)));
        assert_eq!(list.visible_ids(), &[2, 1, 3]);

        list.replace_policy(Some(larger_than(8)), None);
        assert_eq!(list.visible_ids(), &[1, 3]);
    }

    #[test]
    fn removing_hidden_item_leaves_view_unchanged() {
        let mut list = scenario_list();
        list.replace_policy(
            Some(larger_than(8)),
            Some(sort_comparator(by_size(), false)),
        );
        let before = list.visible_ids().to_vec();

        let removed = list.remove(&2).unwrap();
        assert_eq!(removed.size, 5);
        assert_eq!(list.visible_ids(), before.as_slice());
        assert!(!list.contains(&2));
    }

    #[test]
    fn update_of_hidden_item_is_revealed_later() {
        let mut list = scenario_list();
        list.replace_policy(Some(larger_than(8)), None);
        list.insert_or_replace(item(2, 6));
        assert_eq!(list.visible_ids(), &[1, 3]);

        list.replace_policy(Some(accept_all()), None);
        assert_eq!(list.get(&2).unwrap().size, 6);
        assert_eq!(list.visible_ids(), &[1, 2, 3]);
    }

    #[test]
    fn update_can_move_and_hide_items() {
        let mut list = scenario_list();
        list.replace_policy(Some(larger_than(8)), Some(sort_comparator(by_size(), false)));

        list.insert_or_replace(item(2, 15));
        assert_eq!(list.visible_ids(), &[1, 2, 3]);

        list.insert_or_replace(item(3, 1));
        assert_eq!(list.visible_ids(), &[1, 2]);
    }

    #[test]
    fn replace_keeps_arrival_slot() {
        let mut list = scenario_list();
        assert!(!list.insert_or_replace(item(1, 99)));
        let arrival: Vec<u32> = list.iter().map(|i| i.id).collect();
        assert_eq!(arrival, vec![1, 2, 3]);
    }

    #[test]
    fn unknown_remove_is_a_noop() {
        let mut list = scenario_list();
        assert!(list.remove(&42).is_none());
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn reset_keeps_policy() {
        let mut list = scenario_list();
        list.replace_policy(Some(larger_than(8)), None);
        list.reset();
        assert!(list.is_empty());
        assert!(list.visible_ids().is_empty());

        list.insert_or_replace(item(7, 1));
        assert!(list.visible_ids().is_empty());
    }

    #[test]
    fn replace_all_matches_sequential_inserts() {
        let items = vec![item(4, 3), item(5, 3), item(6, 1), item(4, 2)];
        let mut bulk = OrderedList::new();
        bulk.replace_policy(None, Some(sort_comparator(by_size(), true)));
        bulk.replace_all(items.clone());

        let mut seq = OrderedList::new();
        seq.replace_policy(None, Some(sort_comparator(by_size(), true)));
        for i in items {
            seq.insert_or_replace(i);
        }

        assert_eq!(bulk.visible_ids(), seq.visible_ids());
        assert_eq!(bulk.visible_ids(), &[5, 4, 6]);
    }

    // ── Properties ───────────────────────────────────────────────────

    /// Tiny deterministic generator so property runs are reproducible.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            self.0 >> 33
        }

        fn below(&mut self, n: u64) -> u64 {
            self.next() % n
        }
    }

    #[derive(Clone, Copy)]
    enum Filter {
        All,
        Above(i64),
    }

    #[derive(Clone, Copy)]
    enum Sort {
        Arrival,
        Size { descending: bool },
    }

    impl Filter {
        fn predicate(self) -> Predicate<Item> {
            match self {
                Self::All => accept_all(),
                Self::Above(n) => larger_than(n),
            }
        }
    }

    impl Sort {
        fn comparator(self) -> Comparator<Item> {
            match self {
                Self::Arrival => arrival_order(),
                Self::Size { descending } => sort_comparator(by_size(), descending),
            }
        }
    }

    /// Independent model: a plain arrival-ordered vec.
    fn expected(model: &[Item], filter: Filter, sort: Sort) -> Vec<u32> {
        let pred = filter.predicate();
        let cmp = sort.comparator();
        let mut visible: Vec<&Item> = model.iter().filter(|i| pred(i)).collect();
        visible.sort_by(|a, b| cmp(a, b));
        visible.into_iter().map(|i| i.id).collect()
    }

    #[test]
    fn view_matches_independent_derivation_after_every_op() {
        for seed in 1..=25 {
            let mut rng = Lcg(seed);
            let mut list = OrderedList::new();
            let mut model: Vec<Item> = Vec::new();
            let mut filter = Filter::All;
            let mut sort = Sort::Arrival;

            for _ in 0..300 {
                match rng.below(10) {
                    0..=4 => {
                        let id = u32::try_from(rng.below(25)).unwrap();
                        let size = i64::try_from(rng.below(8)).unwrap();
                        list.insert_or_replace(item(id, size));
                        match model.iter_mut().find(|i| i.id == id) {
                            Some(existing) => existing.size = size,
                            None => model.push(item(id, size)),
                        }
                    }
                    5..=6 => {
                        let id = u32::try_from(rng.below(25)).unwrap();
                        list.remove(&id);
                        model.retain(|i| i.id != id);
                    }
                    7 => {
                        filter = match rng.below(3) {
                            0 => Filter::All,
                            _ => Filter::Above(i64::try_from(rng.below(8)).unwrap()),
                        };
                        list.replace_policy(Some(filter.predicate()), None);
                    }
                    8 => {
                        sort = match rng.below(3) {
                            0 => Sort::Arrival,
                            1 => Sort::Size { descending: false },
                            _ => Sort::Size { descending: true },
                        };
                        list.replace_policy(None, Some(sort.comparator()));
                    }
                    _ => {
                        // Re-insert an existing item unchanged.
                        if let Some(existing) = model.first().cloned() {
                            list.insert_or_replace(existing);
                        }
                    }
                }

                assert_eq!(
                    list.visible_ids(),
                    expected(&model, filter, sort).as_slice(),
                    "seed {seed}"
                );
                assert_eq!(list.len(), model.len());
            }
        }
    }

    #[test]
    fn double_insert_is_idempotent() {
        let mut once = scenario_list();
        once.replace_policy(Some(larger_than(4)), Some(sort_comparator(by_size(), true)));
        let mut twice = scenario_list();
        twice.replace_policy(Some(larger_than(4)), Some(sort_comparator(by_size(), true)));

        once.insert_or_replace(item(9, 12));
        twice.insert_or_replace(item(9, 12));
        twice.insert_or_replace(item(9, 12));

        assert_eq!(once.visible_ids(), twice.visible_ids());
        let a: Vec<_> = once.iter().map(|i| (i.id, i.size)).collect();
        let b: Vec<_> = twice.iter().map(|i| (i.id, i.size)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn equal_keys_keep_arrival_order_across_comparator_swaps() {
        let mut list = OrderedList::new();
        for (id, size) in [(1, 3), (2, 1), (3, 3), (4, 3), (5, 1)] {
            list.insert_or_replace(item(id, size));
        }

        for round in 0..6 {
            let descending = round % 2 == 1;
            list.replace_policy(None, Some(sort_comparator(by_size(), descending)));
            let threes: Vec<u32> = list
                .visible_ids()
                .iter()
                .copied()
                .filter(|id| list.get(id).unwrap().size == 3)
                .collect();
            assert_eq!(threes, vec![1, 3, 4]);
        }
    }

    #[test]
    fn reset_and_reinsert_reproduces_view() {
        let mut list = scenario_list();
        list.insert_or_replace(item(4, 10));
        list.replace_policy(Some(larger_than(6)), Some(sort_comparator(by_size(), false)));
        let before = list.visible_ids().to_vec();
        let items: Vec<Item> = list.iter().map(|i| (**i).clone()).collect();

        list.reset();
        for i in items {
            list.insert_or_replace(i);
        }

        assert_eq!(list.visible_ids(), before.as_slice());
    }

    #[test]
    fn predicate_swap_preserves_relative_order() {
        let mut list = OrderedList::new();
        for (id, size) in [(1, 4), (2, 9), (3, 2), (4, 7), (5, 9), (6, 1)] {
            list.insert_or_replace(item(id, size));
        }
        list.replace_policy(None, Some(sort_comparator(by_size(), true)));
        let before = list.visible_ids().to_vec();

        list.replace_policy(Some(larger_than(3)), None);
        let after = list.visible_ids().to_vec();

        let survivors: Vec<u32> = before.into_iter().filter(|id| after.contains(id)).collect();
        assert_eq!(survivors, after);
    }
}

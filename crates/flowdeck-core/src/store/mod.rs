// ── Collection storage ──
//
// `OrderedList` holds the authoritative items and the derived view;
// `policy` holds the predicate/comparator pair that shapes the view.

mod list;
mod policy;

pub use list::OrderedList;
pub use policy::{
    Comparator, KeyFn, Policy, Predicate, SortKey, SortSpec, accept_all, arrival_order,
    compile_filter, sort_comparator,
};

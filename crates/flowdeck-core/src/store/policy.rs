// ── Visibility and ordering policy ──
//
// A policy is a predicate (what is visible) plus a comparator (in what
// order). Either half can be swapped without touching the other.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::filter::FilterCompiler;

/// Visibility test for a single item.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Display order between two items. `Equal` defers to arrival order.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Per-column key extraction.
pub type KeyFn<T> = Arc<dyn Fn(&T) -> SortKey + Send + Sync>;

/// A totally ordered sort key.
///
/// Keys of different variants compare by variant position, so a column
/// that is absent on some items still sorts deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SortKey {
    Missing,
    Bool(bool),
    Int(i64),
    Text(String),
}

/// The sort the user asked for, kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub descending: bool,
}

/// The active predicate and comparator.
pub struct Policy<T> {
    predicate: Predicate<T>,
    comparator: Comparator<T>,
}

impl<T> Policy<T> {
    pub fn new(predicate: Predicate<T>, comparator: Comparator<T>) -> Self {
        Self {
            predicate,
            comparator,
        }
    }

    pub fn accepts(&self, item: &T) -> bool {
        (self.predicate)(item)
    }

    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.comparator)(a, b)
    }

    pub fn set_predicate(&mut self, predicate: Predicate<T>) {
        self.predicate = predicate;
    }

    pub fn set_comparator(&mut self, comparator: Comparator<T>) {
        self.comparator = comparator;
    }
}

impl<T: 'static> Default for Policy<T> {
    fn default() -> Self {
        Self::new(accept_all(), arrival_order())
    }
}

impl<T> Clone for Policy<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            comparator: Arc::clone(&self.comparator),
        }
    }
}

impl<T> fmt::Debug for Policy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy").finish_non_exhaustive()
    }
}

// ── Builders ────────────────────────────────────────────────────────

pub fn accept_all<T: 'static>() -> Predicate<T> {
    Arc::new(|_: &T| true)
}

/// Comparator that treats every pair as equal, leaving arrival order.
pub fn arrival_order<T: 'static>() -> Comparator<T> {
    Arc::new(|_: &T, _: &T| Ordering::Equal)
}

/// Compare extracted keys with their natural order, reversed when
/// `descending`. Equal keys stay `Equal` in both directions.
pub fn sort_comparator<T: 'static>(key: KeyFn<T>, descending: bool) -> Comparator<T> {
    Arc::new(move |a: &T, b: &T| {
        let ord = key(a).cmp(&key(b));
        if descending { ord.reverse() } else { ord }
    })
}

/// Compile a filter expression. `None` and blank text yield [`accept_all`].
pub fn compile_filter<T: 'static>(
    compiler: &dyn FilterCompiler<T>,
    expression: Option<&str>,
) -> Result<Predicate<T>, CoreError> {
    match expression.map(str::trim) {
        None | Some("") => Ok(accept_all()),
        Some(expr) => compiler.compile(expr),
    }
}

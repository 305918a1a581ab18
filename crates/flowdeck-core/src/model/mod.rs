// ── Domain model ──
//
// `Entity` is the only thing the collection engine knows about an item.
// `Flow` is the concrete record the controller and CLI work with.

pub mod column;
pub mod flow;
pub mod flow_id;

use std::fmt::Debug;
use std::hash::Hash;

// ── Re-exports ──────────────────────────────────────────────────────

pub use column::FlowColumn;
pub use flow::{Flow, FlowKind, RequestSummary, ResponseSummary};
pub use flow_id::FlowId;

/// An item with a stable unique identifier.
///
/// The collection engine never looks past `id()`; everything else on the
/// item is payload for predicates and sort keys.
pub trait Entity: Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    fn id(&self) -> &Self::Id;
}

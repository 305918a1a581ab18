// flowdeck-core: Live flow list state between flowdeck-api and front ends.

pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{CommandResult, FlowCommand};
pub use config::{ControllerConfig, TlsVerification};
pub use controller::{ControllerState, FlowController};
pub use error::{CoreError, ErrorKind};
pub use filter::{FilterCompiler, TextFilter};
pub use ingest::{Delta, DeltaIngest, IngestMode, Ingested};
pub use session::{Action, Effect, Session, SessionView, SortRequest, ViewStatus};
pub use store::{OrderedList, Policy, SortKey, SortSpec};
pub use stream::ViewStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{Entity, Flow, FlowColumn, FlowId, FlowKind, RequestSummary, ResponseSummary};

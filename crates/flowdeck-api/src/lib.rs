// flowdeck-api: Async Rust client for the flows REST API and push-channel messages

pub mod client;
pub mod error;
pub mod transport;
pub mod wire;

pub use client::FlowsClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use wire::{FlowRecord, WsMessage};

//! Orchestration core for a stable C-callable boundary over an
//! asynchronous, event-driven XMPP client engine.
//!
//! The protocol machine itself (stream negotiation, TLS, SASL, BOSH,
//! SOCKS5) is an external collaborator behind the [`engine`] traits; this
//! crate supplies everything between that engine and a C caller:
//!
//! - the [`Registry`] of live context handles and live stream handles,
//!   shared by application threads and engine tasks;
//! - the per-context [`Context`] orchestrator that builds engine
//!   configuration, spawns negotiation, and relays typed lifecycle events
//!   to a plain-data [`ConnectionSink`];
//! - the exhaustive [`translate`] mapping from the internal
//!   [`EngineError`] taxonomy to the closed, ABI-stable [`ErrorCode`] set.
//!
//! The C surface itself lives in the companion `raxmpp-ffi` crate.

pub mod engine;
pub mod error;

mod context;
mod registry;
mod types;

#[cfg(any(test, feature = "test-engine"))]
pub mod testing;

pub use context::{ConnectionSink, Context, DisconnectError, disconnect};
pub use error::{EngineError, EngineResult, ErrorCode, ProtocolError, translate, translate_error};
pub use registry::Registry;
pub use types::{ConnectParams, Handle, JabberId, ProxyConfig, ProxyKind, Secret};

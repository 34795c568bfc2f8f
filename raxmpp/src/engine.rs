//! The engine boundary contract.
//!
//! The XMPP protocol machine (stream negotiation, TLS, SASL, BOSH, SOCKS5)
//! lives outside this crate, behind the traits below. This layer only builds
//! the configuration an engine consumes and observes the lifecycle events it
//! emits. Events fire on arbitrary engine tasks or threads.
//!
//! Delivery contract an engine must honor: the created event is delivered
//! exactly once per initiate call, synchronously with respect to later
//! events on the same stream, so an observer attached during created
//! delivery sees every subsequent connected/closed event. Connected fires at
//! most once; closed fires at most once and is terminal. A created failure
//! and a closed event are mutually exclusive for one attempt.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::types::{JabberId, ProxyConfig, Secret};

/// SASL mechanism name for SCRAM-SHA-1.
pub const SASL_SCRAM_SHA1: &str = "SCRAM-SHA-1";
/// SASL mechanism name for PLAIN.
pub const SASL_PLAIN: &str = "PLAIN";

/// Future driving one connect attempt's protocol work.
///
/// Progress and failure are reported exclusively through observers; the
/// future's completion carries no result.
pub type EngineFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Credentials registered for one SASL mechanism.
#[derive(Debug, Clone)]
pub struct SaslCredential {
    /// Mechanism name, e.g. [`SASL_SCRAM_SHA1`].
    pub mechanism: String,
    /// Authentication user name.
    pub user_name: String,
    /// Authentication secret.
    pub secret: Secret,
}

/// Session configuration consumed by the engine when negotiating.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The user's JID.
    pub user_jid: JabberId,
    /// The XMPP domain to negotiate against.
    pub domain: String,
    /// Whether TLS negotiation is mandatory. Always set by this layer.
    pub require_tls: bool,
    /// SASL credentials, in registration order. The engine chooses the
    /// strongest mutually supported mechanism.
    pub sasl: Vec<SaslCredential>,
    /// Whether to request in-band registration.
    pub inband_registration: bool,
}

/// How the engine's transport should reach the server.
#[derive(Debug, Clone)]
pub struct TransportRoute {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Proxy descriptor, passed through unchanged.
    pub proxy: ProxyConfig,
}

/// The stream-created checkpoint, fired once per initiate call.
pub struct StreamCreatedEvent {
    /// The created stream, or the failure that prevented creation.
    pub result: Result<Arc<dyn EngineStream>, EngineError>,
}

impl fmt::Debug for StreamCreatedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCreatedEvent")
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

/// Negotiation completion, fired at most once per stream.
#[derive(Debug, Clone)]
pub struct ConnectedEvent {
    /// Negotiation outcome.
    pub result: EngineResult<()>,
    /// The JID the stream was bound to, when negotiation succeeded.
    pub bound_jid: Option<JabberId>,
}

/// Stream closure, fired at most once per stream; terminal.
#[derive(Debug, Clone)]
pub struct ClosedEvent {
    /// Closure outcome. `Ok` for an orderly close.
    pub result: EngineResult<()>,
}

/// Observer for the client-level stream-created checkpoint.
pub trait CreatedObserver: Send + Sync {
    /// Called exactly once per initiate call.
    fn on_stream_created(&self, event: StreamCreatedEvent);
}

/// Observer for the lifecycle events of one live stream.
pub trait StreamObserver: Send + Sync {
    /// Negotiation finished, successfully or not.
    fn on_connected(&self, event: ConnectedEvent);
    /// The stream closed. Terminal.
    fn on_closed(&self, event: ClosedEvent);
}

/// Factory for engine client instances.
pub trait Engine: Send + Sync {
    /// Create a fresh client for one connect attempt.
    ///
    /// # Errors
    ///
    /// Returns the engine's categorized failure when a client cannot be
    /// constructed.
    fn new_client(&self) -> EngineResult<Arc<dyn EngineClient>>;
}

/// One engine client instance, driving at most one connect attempt.
pub trait EngineClient: Send + Sync {
    /// Register the observer that receives the stream-created checkpoint.
    /// Must be called before [`initiate`](Self::initiate).
    fn on_stream_created(&self, observer: Arc<dyn CreatedObserver>);

    /// Begin asynchronous session negotiation over the given route.
    ///
    /// The returned future performs the protocol work when polled; all
    /// progress is reported through observers.
    fn initiate(&self, config: SessionConfig, route: TransportRoute) -> EngineFuture;
}

/// One negotiated or negotiating stream, owned by the engine.
pub trait EngineStream: Send + Sync {
    /// Attach the observer for connected/closed events.
    fn attach(&self, observer: Arc<dyn StreamObserver>);

    /// Request asynchronous closure. Idempotent; completion is observed via
    /// [`StreamObserver::on_closed`].
    ///
    /// # Errors
    ///
    /// Returns the engine's categorized failure when the close request
    /// cannot be issued.
    fn close(&self) -> EngineResult<()>;
}

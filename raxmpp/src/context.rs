//! Per-context connection orchestration.
//!
//! A [`Context`] bridges one application-held handle to the engine: it
//! builds the session configuration and transport route for a connect
//! attempt, wires observer relays that forward typed engine events to the
//! plain-data [`ConnectionSink`], and keeps the registry in step with stream
//! lifecycle. Callbacks are always invoked with the registry lock released.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::{
    ClosedEvent, ConnectedEvent, CreatedObserver, Engine, EngineClient, EngineStream,
    SASL_PLAIN, SASL_SCRAM_SHA1, SaslCredential, SessionConfig, StreamCreatedEvent,
    StreamObserver, TransportRoute,
};
use crate::error::{EngineError, EngineResult, ErrorCode, translate, translate_error};
use crate::registry::Registry;
use crate::types::{ConnectParams, Handle, JabberId};

/// Receiver of translated lifecycle notifications.
///
/// Implementations are invoked from engine tasks and threads; they must be
/// cheap and must not block. The registry lock is never held across these
/// calls. Notifications whose owning context has been destroyed are
/// suppressed, so an implementation is never invoked on behalf of a context
/// the application has already released.
pub trait ConnectionSink: Send + Sync {
    /// Negotiation finished. `handle` is the stream handle, or the context
    /// handle when stream creation itself failed.
    fn on_connected(&self, code: ErrorCode, handle: Handle);
    /// The stream closed. Terminal for that stream handle.
    fn on_disconnected(&self, code: ErrorCode, handle: Handle);
}

/// One logical user of the library.
///
/// Owns at most one live engine client; a new connect attempt replaces the
/// previous client instance.
pub struct Context {
    engine: Arc<dyn Engine>,
    registry: Arc<Registry>,
    runtime: tokio::runtime::Handle,
    client: Mutex<Option<Arc<dyn EngineClient>>>,
}

impl Context {
    /// Create a context bound to an engine, a registry, and the runtime that
    /// will drive initiate futures.
    #[must_use]
    pub fn new(
        engine: Arc<dyn Engine>,
        registry: Arc<Registry>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            engine,
            registry,
            runtime,
            client: Mutex::new(None),
        }
    }

    /// Whether a connect attempt has installed an engine client.
    #[must_use]
    pub fn has_client(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Begin an asynchronous connect attempt.
    ///
    /// `own` must be the handle under which this context is registered; it
    /// is the value reported to the sink when stream creation fails before
    /// a stream handle exists. Returns as soon as the request is accepted;
    /// everything later arrives through `sink`.
    ///
    /// # Errors
    ///
    /// Returns the engine's categorized failure when the client cannot be
    /// constructed. No callback fires for a failed synchronous setup.
    pub fn connect(
        &self,
        own: Handle,
        params: ConnectParams,
        sink: Arc<dyn ConnectionSink>,
    ) -> EngineResult<()> {
        let client = self.engine.new_client()?;

        let config = SessionConfig {
            user_jid: JabberId::new(params.user_jid.clone()),
            domain: params.effective_domain().to_owned(),
            require_tls: true,
            sasl: vec![
                SaslCredential {
                    mechanism: SASL_SCRAM_SHA1.to_owned(),
                    user_name: params.user_name.clone(),
                    secret: params.password.clone(),
                },
                SaslCredential {
                    mechanism: SASL_PLAIN.to_owned(),
                    user_name: params.user_name.clone(),
                    secret: params.password.clone(),
                },
            ],
            inband_registration: params.inband_registration,
        };
        let route = TransportRoute {
            host: params.host.clone(),
            port: params.port,
            proxy: params.proxy.clone(),
        };

        client.on_stream_created(Arc::new(CreatedRelay {
            owner: own,
            registry: Arc::clone(&self.registry),
            sink,
        }));

        tracing::debug!(host = %params.host, port = params.port, domain = %config.domain,
            "initiating xmpp session");
        let work = client.initiate(config, route);
        *self.client.lock().unwrap_or_else(PoisonError::into_inner) = Some(client);
        self.runtime.spawn(work);
        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("has_client", &self.has_client())
            .finish()
    }
}

/// Failure modes of a disconnect request.
#[derive(Debug, thiserror::Error)]
pub enum DisconnectError {
    /// The handle is unknown, already closed, or was never issued.
    #[error("unknown or already-closed stream handle")]
    UnknownHandle,
    /// The engine rejected the close request.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Request closure of the stream behind `handle`.
///
/// Advisory: a successful return only means the close request was issued;
/// completion and registry cleanup arrive through the closed notification.
///
/// # Errors
///
/// [`DisconnectError::UnknownHandle`] when the handle does not resolve to a
/// live stream; the engine's failure when the close request is rejected.
pub fn disconnect(registry: &Registry, handle: Handle) -> Result<(), DisconnectError> {
    let stream = registry
        .resolve_stream(handle)
        .ok_or(DisconnectError::UnknownHandle)?;
    stream.close()?;
    Ok(())
}

/// Relay for the stream-created checkpoint of one connect attempt.
struct CreatedRelay {
    owner: Handle,
    registry: Arc<Registry>,
    sink: Arc<dyn ConnectionSink>,
}

impl CreatedObserver for CreatedRelay {
    fn on_stream_created(&self, event: StreamCreatedEvent) {
        match event.result {
            Ok(stream) => {
                let handle = self.registry.register_stream(self.owner, &stream);
                stream.attach(Arc::new(LifecycleRelay {
                    handle,
                    owner: self.owner,
                    registry: Arc::clone(&self.registry),
                    sink: Arc::clone(&self.sink),
                }));
            }
            Err(err) => {
                let code = translate_error(&err);
                // There is no stream handle yet; report against the context,
                // unless the application already destroyed it.
                if self.registry.is_valid_context(self.owner) {
                    self.sink.on_connected(code, self.owner);
                } else {
                    tracing::debug!(owner = %self.owner, ?code,
                        "suppressing created-failure callback for destroyed context");
                }
            }
        }
    }
}

/// Relay for connected/closed events of one registered stream.
struct LifecycleRelay {
    handle: Handle,
    owner: Handle,
    registry: Arc<Registry>,
    sink: Arc<dyn ConnectionSink>,
}

impl StreamObserver for LifecycleRelay {
    fn on_connected(&self, event: ConnectedEvent) {
        let code = translate(&event.result);
        if self.registry.is_valid_context(self.owner) {
            self.sink.on_connected(code, self.handle);
        } else {
            tracing::debug!(stream = %self.handle, owner = %self.owner, ?code,
                "suppressing connected callback for destroyed context");
        }
    }

    fn on_closed(&self, event: ClosedEvent) {
        let code = translate(&event.result);
        if self.registry.is_valid_context(self.owner) {
            self.sink.on_disconnected(code, self.handle);
        } else {
            tracing::debug!(stream = %self.handle, owner = %self.owner, ?code,
                "suppressing closed callback for destroyed context");
        }
        // The single retirement site for a stream's registry entry.
        self.registry.unregister_stream(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    use crate::error::ProtocolError;
    use crate::testing::{ScriptOutcome, ScriptedEngine};
    use crate::types::{ProxyConfig, Secret};

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Connected(ErrorCode, Handle),
        Disconnected(ErrorCode, Handle),
    }

    struct ChannelSink(Mutex<mpsc::Sender<Event>>);

    impl ChannelSink {
        fn pair() -> (Arc<Self>, mpsc::Receiver<Event>) {
            let (tx, rx) = mpsc::channel();
            (Arc::new(Self(Mutex::new(tx))), rx)
        }
    }

    impl ConnectionSink for ChannelSink {
        fn on_connected(&self, code: ErrorCode, handle: Handle) {
            let _ = self.0.lock().expect("sink lock").send(Event::Connected(code, handle));
        }
        fn on_disconnected(&self, code: ErrorCode, handle: Handle) {
            let _ = self
                .0
                .lock()
                .expect("sink lock")
                .send(Event::Disconnected(code, handle));
        }
    }

    fn params(host: &str) -> ConnectParams {
        ConnectParams {
            host: host.to_owned(),
            port: 5222,
            domain: None,
            user_name: "alice".into(),
            password: Secret::new(b"secret".to_vec()),
            user_jid: "alice@example.com/ra".into(),
            inband_registration: false,
            proxy: ProxyConfig::direct(),
        }
    }

    fn new_context(engine: &Arc<ScriptedEngine>) -> (Arc<Registry>, Arc<Context>, Handle) {
        let registry = Arc::new(Registry::new());
        let context = Arc::new(Context::new(
            Arc::clone(engine) as Arc<dyn Engine>,
            Arc::clone(&registry),
            tokio::runtime::Handle::current(),
        ));
        let handle = registry.add_context(Arc::clone(&context));
        (registry, context, handle)
    }

    fn recv(rx: &mpsc::Receiver<Event>) -> Event {
        rx.recv_timeout(Duration::from_secs(2)).expect("lifecycle event")
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn connect_then_close_delivers_one_terminal_notification() {
        let engine = ScriptedEngine::new();
        engine.script("talk.example.com", ScriptOutcome::Negotiate(Ok(())));
        let (registry, context, ctx_handle) = new_context(&engine);
        let (sink, rx) = ChannelSink::pair();

        context
            .connect(ctx_handle, params("talk.example.com"), sink)
            .expect("connect accepted");
        assert!(context.has_client());

        let Event::Connected(code, stream_handle) = recv(&rx) else {
            panic!("expected connected first");
        };
        assert_eq!(code, ErrorCode::Ok);
        assert_ne!(stream_handle, ctx_handle);
        assert!(registry.resolve_stream(stream_handle).is_some());

        disconnect(&registry, stream_handle).expect("close requested");
        assert_eq!(recv(&rx), Event::Disconnected(ErrorCode::Ok, stream_handle));

        wait_until(|| registry.resolve_stream(stream_handle).is_none());
        // A second disconnect after closure reports the handle as gone.
        assert!(matches!(
            disconnect(&registry, stream_handle),
            Err(DisconnectError::UnknownHandle)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failed_negotiation_reports_connected_then_closed() {
        let engine = ScriptedEngine::new();
        engine.script(
            "sasl.example.com",
            ScriptOutcome::Negotiate(Err(ProtocolError::SaslNegotiationFailed.into())),
        );
        let (_registry, context, ctx_handle) = new_context(&engine);
        let (sink, rx) = ChannelSink::pair();

        context
            .connect(ctx_handle, params("sasl.example.com"), sink)
            .expect("connect accepted");

        let Event::Connected(code, stream_handle) = recv(&rx) else {
            panic!("expected connected first");
        };
        assert_eq!(code, ErrorCode::SaslNegotiationFailed);
        assert_eq!(
            recv(&rx),
            Event::Disconnected(ErrorCode::SaslNegotiationFailed, stream_handle)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn created_alone_produces_no_callback() {
        let engine = ScriptedEngine::new();
        engine.script("stall.example.com", ScriptOutcome::StallAfterCreate);
        let (_registry, context, ctx_handle) = new_context(&engine);
        let (sink, rx) = ChannelSink::pair();

        context
            .connect(ctx_handle, params("stall.example.com"), sink)
            .expect("connect accepted");

        // The created checkpoint registers the stream but notifies nobody;
        // the application only hears about connected and closed.
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn created_failure_reports_against_context_handle() {
        let engine = ScriptedEngine::new();
        engine.script(
            "down.example.com",
            ScriptOutcome::FailCreate(ProtocolError::SocketConnectFailed.into()),
        );
        let (_registry, context, ctx_handle) = new_context(&engine);
        let (sink, rx) = ChannelSink::pair();

        context
            .connect(ctx_handle, params("down.example.com"), sink)
            .expect("connect accepted");

        assert_eq!(recv(&rx), Event::Connected(ErrorCode::ConnectError, ctx_handle));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn created_failure_is_suppressed_after_destroy() {
        let engine = ScriptedEngine::new();
        let gate = engine.script_gated(
            "gone.example.com",
            ScriptOutcome::FailCreate(ProtocolError::SocketConnectFailed.into()),
        );
        let (registry, context, ctx_handle) = new_context(&engine);
        let (sink, rx) = ChannelSink::pair();

        context
            .connect(ctx_handle, params("gone.example.com"), sink)
            .expect("connect accepted");

        drop(registry.remove_context(ctx_handle));
        gate.notify_one();

        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn lifecycle_callbacks_are_suppressed_after_destroy() {
        let engine = ScriptedEngine::new();
        let gate = engine.script_gated(
            "late.example.com",
            ScriptOutcome::Negotiate(Err(ProtocolError::TlsNegotiationFailed.into())),
        );
        let (registry, context, ctx_handle) = new_context(&engine);
        let (sink, rx) = ChannelSink::pair();

        context
            .connect(ctx_handle, params("late.example.com"), sink)
            .expect("connect accepted");

        drop(registry.remove_context(ctx_handle));
        gate.notify_one();

        // Connected and closed both fire inside the engine, but neither may
        // reach the sink once the owning context is gone.
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn sequential_connects_yield_independent_streams() {
        let engine = ScriptedEngine::new();
        engine.script("first.example.com", ScriptOutcome::Negotiate(Ok(())));
        engine.script("second.example.com", ScriptOutcome::Negotiate(Ok(())));
        let (registry, context, ctx_handle) = new_context(&engine);
        let (sink, rx) = ChannelSink::pair();

        context
            .connect(ctx_handle, params("first.example.com"), Arc::clone(&sink) as _)
            .expect("first connect");
        let Event::Connected(ErrorCode::Ok, first) = recv(&rx) else {
            panic!("expected first connected");
        };

        context
            .connect(ctx_handle, params("second.example.com"), sink)
            .expect("second connect");
        let Event::Connected(ErrorCode::Ok, second) = recv(&rx) else {
            panic!("expected second connected");
        };

        assert_ne!(first, second);
        assert!(registry.resolve_stream(first).is_some());
        assert!(registry.resolve_stream(second).is_some());

        // Closing one stream leaves the other's registry entry untouched.
        disconnect(&registry, first).expect("close first");
        assert_eq!(recv(&rx), Event::Disconnected(ErrorCode::Ok, first));
        wait_until(|| registry.resolve_stream(first).is_none());
        assert!(registry.resolve_stream(second).is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn disconnect_of_unknown_handle_is_rejected() {
        let registry = Registry::new();
        assert!(matches!(
            disconnect(&registry, Handle::from_raw(0x5150)),
            Err(DisconnectError::UnknownHandle)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn synchronous_setup_failure_surfaces_without_callbacks() {
        struct BrokenEngine;
        impl Engine for BrokenEngine {
            fn new_client(&self) -> EngineResult<Arc<dyn EngineClient>> {
                Err(EngineError::Io("no route to host".into()))
            }
        }

        let registry = Arc::new(Registry::new());
        let context = Arc::new(Context::new(
            Arc::new(BrokenEngine),
            Arc::clone(&registry),
            tokio::runtime::Handle::current(),
        ));
        let ctx_handle = registry.add_context(Arc::clone(&context));
        let (sink, rx) = ChannelSink::pair();

        let err = context
            .connect(ctx_handle, params("talk.example.com"), sink)
            .expect_err("setup failure");
        assert_eq!(translate_error(&err), ErrorCode::ConnectError);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn close_failure_is_passed_through() {
        struct StubbornStream;
        impl EngineStream for StubbornStream {
            fn attach(&self, _observer: Arc<dyn StreamObserver>) {}
            fn close(&self) -> EngineResult<()> {
                Err(ProtocolError::ExtensionInShutdown.into())
            }
        }

        let registry = Registry::new();
        let stream: Arc<dyn EngineStream> = Arc::new(StubbornStream);
        let handle = registry.register_stream(Handle::from_raw(1), &stream);

        match disconnect(&registry, handle) {
            Err(DisconnectError::Engine(err)) => {
                assert_eq!(translate_error(&err), ErrorCode::StreamClosingNotAvailable);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

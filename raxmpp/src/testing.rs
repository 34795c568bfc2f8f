//! Scripted in-memory engine for driving lifecycle tests.
//!
//! Scripts are keyed by the route host, so concurrently running tests can
//! share one installed engine without interfering: each test connects to a
//! host name of its own and scripts that host's outcome. A host with no
//! script negotiates successfully.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::engine::{
    ClosedEvent, ConnectedEvent, CreatedObserver, Engine, EngineClient, EngineFuture,
    EngineStream, SessionConfig, StreamCreatedEvent, StreamObserver, TransportRoute,
};
use crate::error::{EngineError, EngineResult};

/// Outcome scripted for one connect attempt.
#[derive(Debug)]
pub enum ScriptOutcome {
    /// Stream creation fails before any stream exists.
    FailCreate(EngineError),
    /// A stream is created and negotiation completes with this result.
    /// A failed negotiation is followed by a closed event, mirroring an
    /// engine tearing the stream down.
    Negotiate(EngineResult<()>),
    /// A stream is created but no further event fires until it is closed.
    StallAfterCreate,
}

struct ScriptEntry {
    outcome: ScriptOutcome,
    gate: Option<Arc<Notify>>,
}

type Scripts = Arc<Mutex<HashMap<String, ScriptEntry>>>;
type LiveStreams = Arc<Mutex<Vec<Arc<ScriptedStream>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Engine test double whose connect attempts follow per-host scripts.
pub struct ScriptedEngine {
    scripts: Scripts,
    // The engine owns its streams; entries stay alive so weak registry
    // references remain resolvable until the test process ends.
    live: LiveStreams,
}

impl ScriptedEngine {
    /// Create a scripted engine.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Arc::default(),
            live: Arc::default(),
        })
    }

    /// Script the outcome for connect attempts to `host`.
    pub fn script(&self, host: impl Into<String>, outcome: ScriptOutcome) {
        lock(&self.scripts).insert(
            host.into(),
            ScriptEntry {
                outcome,
                gate: None,
            },
        );
    }

    /// Script an outcome that is held back until the returned gate is
    /// notified, letting tests order events around it.
    pub fn script_gated(&self, host: impl Into<String>, outcome: ScriptOutcome) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        lock(&self.scripts).insert(
            host.into(),
            ScriptEntry {
                outcome,
                gate: Some(Arc::clone(&gate)),
            },
        );
        gate
    }
}

impl Engine for ScriptedEngine {
    fn new_client(&self) -> EngineResult<Arc<dyn EngineClient>> {
        Ok(Arc::new(ScriptedClient {
            scripts: Arc::clone(&self.scripts),
            live: Arc::clone(&self.live),
            observer: Mutex::new(None),
        }))
    }
}

impl fmt::Debug for ScriptedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedEngine")
            .field("scripts", &lock(&self.scripts).len())
            .field("live", &lock(&self.live).len())
            .finish()
    }
}

struct ScriptedClient {
    scripts: Scripts,
    live: LiveStreams,
    observer: Mutex<Option<Arc<dyn CreatedObserver>>>,
}

impl EngineClient for ScriptedClient {
    fn on_stream_created(&self, observer: Arc<dyn CreatedObserver>) {
        *lock(&self.observer) = Some(observer);
    }

    fn initiate(&self, config: SessionConfig, route: TransportRoute) -> EngineFuture {
        let observer = lock(&self.observer).take();
        let entry = lock(&self.scripts)
            .remove(&route.host)
            .unwrap_or_else(|| ScriptEntry {
                outcome: ScriptOutcome::Negotiate(Ok(())),
                gate: None,
            });
        let live = Arc::clone(&self.live);

        Box::pin(async move {
            let Some(observer) = observer else { return };
            if let Some(gate) = entry.gate {
                gate.notified().await;
            }
            match entry.outcome {
                ScriptOutcome::FailCreate(err) => {
                    observer.on_stream_created(StreamCreatedEvent { result: Err(err) });
                }
                ScriptOutcome::StallAfterCreate => {
                    let stream = Arc::new(ScriptedStream::default());
                    lock(&live).push(Arc::clone(&stream));
                    observer.on_stream_created(StreamCreatedEvent {
                        result: Ok(stream as Arc<dyn EngineStream>),
                    });
                }
                ScriptOutcome::Negotiate(result) => {
                    let stream = Arc::new(ScriptedStream::default());
                    lock(&live).push(Arc::clone(&stream));
                    observer.on_stream_created(StreamCreatedEvent {
                        result: Ok(Arc::clone(&stream) as Arc<dyn EngineStream>),
                    });
                    let bound_jid = result.is_ok().then(|| config.user_jid.clone());
                    stream.fire_connected(ConnectedEvent {
                        result: result.clone(),
                        bound_jid,
                    });
                    if let Err(err) = result {
                        stream.fire_closed(ClosedEvent { result: Err(err) });
                    }
                }
            }
        })
    }
}

/// Stream test double; closes exactly once.
#[derive(Default)]
pub struct ScriptedStream {
    observer: Mutex<Option<Arc<dyn StreamObserver>>>,
    closed: AtomicBool,
}

impl ScriptedStream {
    fn fire_connected(&self, event: ConnectedEvent) {
        if let Some(observer) = lock(&self.observer).clone() {
            observer.on_connected(event);
        }
    }

    fn fire_closed(&self, event: ClosedEvent) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(observer) = lock(&self.observer).clone() {
            observer.on_closed(event);
        }
    }
}

impl EngineStream for ScriptedStream {
    fn attach(&self, observer: Arc<dyn StreamObserver>) {
        *lock(&self.observer) = Some(observer);
    }

    fn close(&self) -> EngineResult<()> {
        self.fire_closed(ClosedEvent { result: Ok(()) });
        Ok(())
    }
}

impl fmt::Debug for ScriptedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedStream")
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

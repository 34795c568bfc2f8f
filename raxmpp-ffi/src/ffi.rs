//! Core FFI infrastructure: library state, panic guards, string helpers,
//! logger initialization.

use std::ffi::{CStr, c_char, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock};

use raxmpp::engine::Engine;
use raxmpp::{ErrorCode, Registry, Secret};

// ---------------------------------------------------------------------------
// Library state
// ---------------------------------------------------------------------------

/// Process-wide state shared by every entry point: the handle registry, the
/// installed engine, and the runtime driving initiate futures.
pub(crate) struct Library {
    pub(crate) registry: Arc<Registry>,
    pub(crate) engine: Arc<dyn Engine>,
    runtime: tokio::runtime::Runtime,
}

impl Library {
    pub(crate) fn runtime(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }
}

static LIBRARY: OnceLock<Library> = OnceLock::new();

/// Install the protocol engine and initialize library state.
///
/// Called once by the embedding application (the side that links an engine)
/// before any wrapper entry point is used; until then,
/// [`crate::wrapper::xmpp_wrapper_create_wrapper`] returns null and the
/// other entry points report `INVALID_HANDLE`.
///
/// Returns `false` when the library was already initialized or the runtime
/// could not be built.
pub fn initialize(engine: Arc<dyn Engine>) -> bool {
    if LIBRARY.get().is_some() {
        return false;
    }
    let Ok(runtime) = tokio::runtime::Builder::new_multi_thread().enable_all().build() else {
        return false;
    };
    LIBRARY
        .set(Library {
            registry: Arc::new(Registry::new()),
            engine,
            runtime,
        })
        .is_ok()
}

pub(crate) fn library() -> Option<&'static Library> {
    LIBRARY.get()
}

// ---------------------------------------------------------------------------
// Panic guards
// ---------------------------------------------------------------------------

/// Run an entry-point body, mapping a panic to `INTERNAL_ERROR`.
pub(crate) fn guard_code(f: impl FnOnce() -> ErrorCode) -> ErrorCode {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or(ErrorCode::InternalError)
}

/// Run an entry-point body returning a handle, mapping a panic to null.
pub(crate) fn guard_ptr(f: impl FnOnce() -> *mut c_void) -> *mut c_void {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or(std::ptr::null_mut())
}

/// Run a cleanup body, swallowing any panic.
pub(crate) fn guard_cleanup(f: impl FnOnce()) {
    let _ = catch_unwind(AssertUnwindSafe(f));
}

// ---------------------------------------------------------------------------
// String helpers
// ---------------------------------------------------------------------------

/// Owned string from a nullable C string. `None` when null. Invalid UTF-8 is
/// converted lossily; only null-ness is validated at the boundary.
pub(crate) unsafe fn opt_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

/// Owned string from a nullable C string, defaulting to empty.
pub(crate) unsafe fn string_or_empty(ptr: *const c_char) -> String {
    unsafe { opt_string(ptr) }.unwrap_or_default()
}

/// Credential buffer from a nullable C string. The bytes go straight into a
/// zeroizing buffer and are never interpreted as text.
pub(crate) unsafe fn secret_or_empty(ptr: *const c_char) -> Secret {
    if ptr.is_null() {
        Secret::default()
    } else {
        Secret::new(unsafe { CStr::from_ptr(ptr) }.to_bytes().to_vec())
    }
}

// ---------------------------------------------------------------------------
// Logger initialization
// ---------------------------------------------------------------------------

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Initialize the tracing logger. Call at most once. `level` is a C string
/// like "debug", "info", "warn", "error", or "off"; pass null for the
/// default ("info"). Returns 0 on success.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xmpp_wrapper_init_logger(level: *const c_char) -> i32 {
    let installed = catch_unwind(AssertUnwindSafe(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        LOGGER_INIT.get_or_init(|| {
            let filter_str = if level.is_null() {
                "info".to_owned()
            } else {
                unsafe { CStr::from_ptr(level) }
                    .to_str()
                    .unwrap_or("info")
                    .to_owned()
            };
            let filter = EnvFilter::builder().parse_lossy(&filter_str);
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .init();
        });
    }));
    if installed.is_ok() { 0 } else { -1 }
}

//! The four stable entry points of the wrapper ABI.
//!
//! Every entry point validates its arguments, catches all internal
//! failures, and translates results into the closed [`ErrorCode`] set
//! before returning. Nothing internal (error taxonomies, panics, engine
//! types) ever crosses the boundary.

use std::ffi::c_void;
use std::sync::Arc;

use raxmpp::{
    ConnectParams, ConnectionSink, Context, DisconnectError, ErrorCode, Handle, ProxyConfig,
    translate_error,
};

use crate::ffi::{
    guard_cleanup, guard_code, guard_ptr, library, opt_string, secret_or_empty, string_or_empty,
};
use crate::types::{
    XMPP_PROXY_SOCKS5, XmppConnectionCallback, XmppConnectionCallbackFn, XmppHost, XmppIdentity,
    XmppProxy,
};

/// Bridges translated lifecycle notifications onto C function pointers.
struct CallbackSink {
    param: usize,
    on_connected: Option<XmppConnectionCallbackFn>,
    on_disconnected: Option<XmppConnectionCallbackFn>,
}

impl ConnectionSink for CallbackSink {
    fn on_connected(&self, code: ErrorCode, handle: Handle) {
        if let Some(cb) = self.on_connected {
            unsafe { cb(self.param as *mut c_void, code, handle.as_raw() as *const c_void) };
        }
    }

    fn on_disconnected(&self, code: ErrorCode, handle: Handle) {
        if let Some(cb) = self.on_disconnected {
            unsafe { cb(self.param as *mut c_void, code, handle.as_raw() as *const c_void) };
        }
    }
}

/// Create a wrapper context and return its opaque handle.
///
/// Returns null when the library has not been initialized (see
/// [`crate::initialize`]) or construction fails. The handle stays valid
/// until passed to [`xmpp_wrapper_destroy_wrapper`].
#[unsafe(no_mangle)]
pub extern "C" fn xmpp_wrapper_create_wrapper() -> *mut c_void {
    guard_ptr(|| {
        let Some(lib) = library() else {
            return std::ptr::null_mut();
        };
        let context = Arc::new(Context::new(
            Arc::clone(&lib.engine),
            Arc::clone(&lib.registry),
            lib.runtime(),
        ));
        lib.registry.add_context(context).as_raw() as *mut c_void
    })
}

/// Destroy a wrapper context.
///
/// No-op on a null, unknown, or already-destroyed handle; destruction never
/// faults the caller. Streams the context initiated are not closed; they
/// remain addressable by stream handle, but their notifications stop.
#[unsafe(no_mangle)]
pub extern "C" fn xmpp_wrapper_destroy_wrapper(handle: *mut c_void) {
    guard_cleanup(|| {
        if handle.is_null() {
            return;
        }
        if let Some(lib) = library() {
            drop(lib.registry.remove_context(Handle::from_raw(handle as usize)));
        }
    });
}

/// Begin an asynchronous connect attempt.
///
/// Returns `OK` as soon as the request is accepted; negotiation progress
/// arrives only through `callback`. A non-`OK` return means no callback will
/// ever fire for this attempt. Null sub-fields of the descriptors default to
/// empty; a null `xmpp_domain` defaults to the host; a null `proxy` means a
/// direct connection.
///
/// # Safety
///
/// `host`, `identity`, and `proxy` (when non-null) must point to valid
/// descriptors whose string fields are null or valid C strings for the
/// duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn xmpp_wrapper_connect(
    handle: *mut c_void,
    host: *const XmppHost,
    identity: *const XmppIdentity,
    proxy: *const XmppProxy,
    callback: XmppConnectionCallback,
) -> ErrorCode {
    guard_code(|| {
        if handle.is_null() {
            return ErrorCode::InvalidHandle;
        }
        if host.is_null() || identity.is_null() {
            return ErrorCode::InvalidParameter;
        }
        let Some(lib) = library() else {
            return ErrorCode::InvalidHandle;
        };
        let own = Handle::from_raw(handle as usize);
        let Some(context) = lib.registry.resolve_context(own) else {
            return ErrorCode::InvalidHandle;
        };

        let host = unsafe { &*host };
        let identity = unsafe { &*identity };

        let proxy = if proxy.is_null() {
            ProxyConfig::direct()
        } else {
            let proxy = unsafe { &*proxy };
            let host = unsafe { string_or_empty(proxy.proxy_host) };
            match proxy.proxy_type {
                XMPP_PROXY_SOCKS5 => ProxyConfig::socks5(host, proxy.proxy_port),
                _ => ProxyConfig::direct(),
            }
        };

        let params = ConnectParams {
            host: unsafe { string_or_empty(host.host) },
            port: host.port,
            domain: unsafe { opt_string(host.xmpp_domain) },
            user_name: unsafe { string_or_empty(identity.user_name) },
            password: unsafe { secret_or_empty(identity.password) },
            user_jid: unsafe { string_or_empty(identity.user_jid) },
            inband_registration: identity.inband_registration != 0,
            proxy,
        };
        let sink = Arc::new(CallbackSink {
            param: callback.param as usize,
            on_connected: callback.on_connected,
            on_disconnected: callback.on_disconnected,
        });

        match context.connect(own, params, sink) {
            Ok(()) => ErrorCode::Ok,
            Err(err) => translate_error(&err),
        }
    })
}

/// Request closure of the stream behind `connection`.
///
/// Returns `OK` once closure has been requested; completion and registry
/// cleanup arrive through the disconnected callback. A handle that is null,
/// never issued, or already closed reports `INVALID_HANDLE`.
#[unsafe(no_mangle)]
pub extern "C" fn xmpp_wrapper_disconnect(connection: *const c_void) -> ErrorCode {
    guard_code(|| {
        if connection.is_null() {
            return ErrorCode::InvalidHandle;
        }
        let Some(lib) = library() else {
            return ErrorCode::InvalidHandle;
        };
        match raxmpp::disconnect(&lib.registry, Handle::from_raw(connection as usize)) {
            Ok(()) => ErrorCode::Ok,
            Err(DisconnectError::UnknownHandle) => ErrorCode::InvalidHandle,
            Err(DisconnectError::Engine(err)) => translate_error(&err),
        }
    })
}

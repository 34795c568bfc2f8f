//! Flat, repr(C) descriptors of the wrapper ABI.
//!
//! All string fields are borrowed, nullable C strings; null means
//! "unset/default". Descriptors are read once during the call that receives
//! them and never retained.

use std::ffi::{c_char, c_void};

use raxmpp::ErrorCode;

/// `proxy_type` value selecting a direct, unproxied connection.
pub const XMPP_PROXY_DIRECT_CONNECT: i32 = 0;
/// `proxy_type` value selecting a SOCKS5 proxy.
pub const XMPP_PROXY_SOCKS5: i32 = 1;

/// Where to connect.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XmppHost {
    /// Server host name or address.
    pub host: *const c_char,
    /// Server port.
    pub port: u16,
    /// XMPP domain. Null defaults to [`host`](Self::host).
    pub xmpp_domain: *const c_char,
}

/// Who is connecting.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XmppIdentity {
    /// SASL user name. Null means empty.
    pub user_name: *const c_char,
    /// SASL secret. Treated as a credential buffer: copied into zeroizing
    /// storage immediately and never logged.
    pub password: *const c_char,
    /// The user's JID. Null means empty.
    pub user_jid: *const c_char,
    /// Non-zero to request in-band registration.
    pub inband_registration: i32,
}

/// How to reach the server. Passing a null descriptor pointer instead means
/// a direct connection with no proxying.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XmppProxy {
    /// [`XMPP_PROXY_DIRECT_CONNECT`] or [`XMPP_PROXY_SOCKS5`]; unknown
    /// values fall back to direct.
    pub proxy_type: i32,
    /// Proxy host. Passed through to the transport unchanged, even if empty.
    pub proxy_host: *const c_char,
    /// Proxy port.
    pub proxy_port: u16,
}

/// Lifecycle notification function. `param` is the caller-owned opaque value
/// from [`XmppConnectionCallback::param`]; `handle` is the stream handle,
/// or the context handle when stream creation failed before a stream
/// existed.
pub type XmppConnectionCallbackFn =
    unsafe extern "C" fn(param: *mut c_void, code: ErrorCode, handle: *const c_void);

/// Caller-supplied notification sinks for one connect attempt.
///
/// Either function pointer may be null to skip that notification. Callbacks
/// fire on internal engine tasks and stop firing once the owning context is
/// destroyed.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct XmppConnectionCallback {
    /// Opaque caller-owned value passed back on every notification.
    pub param: *mut c_void,
    /// Invoked when negotiation finishes (successfully or not), and for
    /// stream-creation failures.
    pub on_connected: Option<XmppConnectionCallbackFn>,
    /// Invoked when a stream closes. Terminal for that handle.
    pub on_disconnected: Option<XmppConnectionCallbackFn>,
}

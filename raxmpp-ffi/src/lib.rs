#![allow(unsafe_code)]
//! `raxmpp-ffi` — C ABI stable bindings over the `raxmpp` orchestration core.
//!
//! Design principles:
//! - Every entry point returns a value from the closed [`ErrorCode`] set (or
//!   a nullable handle); internal error detail never crosses the boundary.
//! - Handles are opaque identity values validated through the registry on
//!   every call; a stale handle yields `INVALID_HANDLE`, never a fault.
//! - Panics are caught at every entry point and reported as
//!   `INTERNAL_ERROR` / null.
//! - Lifecycle notifications are delivered through C callback function
//!   pointers, on engine tasks, never while an internal lock is held.
//! - The embedding application installs its engine once via [`initialize`];
//!   until then [`wrapper::xmpp_wrapper_create_wrapper`] returns null.

mod ffi;

pub mod types;
pub mod wrapper;

pub use ffi::initialize;
pub use raxmpp::ErrorCode;

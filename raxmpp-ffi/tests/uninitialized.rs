//! Entry-point behavior before the embedding application has installed an
//! engine. Runs in its own binary so no other test can initialize the
//! process-wide library state first.

use std::ffi::{CString, c_void};

use raxmpp_ffi::ErrorCode;
use raxmpp_ffi::types::{XmppConnectionCallback, XmppHost, XmppIdentity};
use raxmpp_ffi::wrapper::{
    xmpp_wrapper_connect, xmpp_wrapper_create_wrapper, xmpp_wrapper_destroy_wrapper,
    xmpp_wrapper_disconnect,
};

#[test]
fn entry_points_are_inert_before_initialization() {
    assert!(xmpp_wrapper_create_wrapper().is_null());

    // Destruction must be unconditionally safe, even for garbage handles.
    xmpp_wrapper_destroy_wrapper(std::ptr::null_mut());
    xmpp_wrapper_destroy_wrapper(0x5150 as *mut c_void);

    assert_eq!(
        xmpp_wrapper_disconnect(0x5150 as *const c_void),
        ErrorCode::InvalidHandle
    );

    let host_c = CString::new("talk.example.com").expect("host");
    let host = XmppHost {
        host: host_c.as_ptr(),
        port: 5222,
        xmpp_domain: std::ptr::null(),
    };
    let identity = XmppIdentity {
        user_name: std::ptr::null(),
        password: std::ptr::null(),
        user_jid: std::ptr::null(),
        inband_registration: 0,
    };
    let code = unsafe {
        xmpp_wrapper_connect(
            0x5150 as *mut c_void,
            &host,
            &identity,
            std::ptr::null(),
            XmppConnectionCallback {
                param: std::ptr::null_mut(),
                on_connected: None,
                on_disconnected: None,
            },
        )
    };
    assert_eq!(code, ErrorCode::InvalidHandle);
}

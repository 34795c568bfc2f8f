//! Error taxonomy and the public error translation table.
//!
//! Two worlds meet here. [`EngineError`] is the rich, categorized failure
//! taxonomy reported by the underlying engine; it never crosses the C
//! boundary. [`ErrorCode`] is the closed, ABI-stable enumeration handed to
//! applications. [`translate`] maps the former onto the latter, exhaustively
//! and with a mandatory catch-all, so an engine growing new failure modes can
//! never produce an unmapped value at the boundary.

/// Convenience alias for engine-fallible operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

macro_rules! abi_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $($(#[$vm:meta])* $variant:ident = $val:literal),* $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name { $($(#[$vm])* $variant = $val),* }

        impl $name {
            /// Convert from an ABI `i32`. Returns `None` for unknown values.
            #[must_use]
            pub fn from_abi(v: i32) -> Option<Self> {
                match v { $($val => Some(Self::$variant),)* _ => None }
            }
        }
    };
}

abi_enum! {
    /// Public error code delivered across the C boundary.
    ///
    /// The set is closed and the discriminants are part of the stable ABI;
    /// values are never reordered or reused.
    pub enum ErrorCode {
        /// Success.
        Ok = 0,
        /// Generic failure with no more specific public code.
        Fail = 1,
        /// A handle was null, unknown, or no longer refers to a live object.
        InvalidHandle = 2,
        /// A required parameter was null or malformed.
        InvalidParameter = 3,
        /// The stream has not completed negotiation.
        StreamNotNegotiated = 4,
        /// The server closed the stream or the socket went away.
        ServerDisconnected = 5,
        /// The requested capability is not supported.
        FeatureNotSupported = 6,
        /// An internal fault that should not occur in correct operation.
        InternalError = 7,
        /// A BOSH session or HTTP transport failure.
        BoshError = 8,
        /// The host could not be connected to as specified.
        HostConnectionFailed = 9,
        /// SOCKS5 proxy negotiation or configuration failure.
        ProxyConnectError = 10,
        /// TLS negotiation failed.
        TlsNegotiationFailed = 11,
        /// SASL authentication failed.
        SaslNegotiationFailed = 12,
        /// In-band registration failed.
        InbandRegistrationFailure = 13,
        /// A request was answered with an error stanza.
        RequestErrorResponse = 14,
        /// Stream closure is unavailable while shutdown is in progress.
        StreamClosingNotAvailable = 15,
        /// The raw socket connection attempt failed.
        ConnectError = 16,
        /// A server stanza could not be translated or was oversized.
        InvalidServerStanza = 17,
    }
}

/// Fine-grained protocol-level failure reported by the engine.
///
/// Carried inside [`EngineError::Protocol`]. The engine may add codes over
/// time; translation always funnels unknown codes into [`ErrorCode::Fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// TLS negotiation has started but not finished.
    #[error("TLS negotiation still in progress")]
    TlsNegotiationInProgress,
    /// The stream resource was never bound.
    #[error("stream resource not bound")]
    ResourceNotBound,
    /// The server closed the stream.
    #[error("server closed the stream")]
    ServerClosedStream,
    /// The transport socket closed underneath the stream.
    #[error("socket closed")]
    SocketClosed,
    /// The operation is not supported by this engine build.
    #[error("operation not supported")]
    NotSupported,
    /// The incoming byte stream failed to parse as XML.
    #[error("XML parser error")]
    XmlParse,
    /// The server referenced a session id this client never issued.
    #[error("unknown session id")]
    UnknownSessionId,
    /// A session id was presented twice.
    #[error("session id reused")]
    SessionIdReused,
    /// A query id was submitted more than once.
    #[error("query id already submitted")]
    DuplicateQueryId,
    /// A restart was attempted on an already-bound stream.
    #[error("attempt to restart a bound stream")]
    BoundStreamRestart,
    /// BOSH session creation response lacked the `wait` attribute.
    #[error("BOSH wait attribute missing")]
    BoshWaitMissing,
    /// BOSH session creation response lacked the `requests` attribute.
    #[error("BOSH requests attribute missing")]
    BoshRequestsMissing,
    /// The XMPP session could not be started after binding.
    #[error("unable to start session")]
    SessionStartFailed,
    /// The stream is in an invalid state for the attempted operation.
    #[error("invalid stream")]
    InvalidStream,
    /// The user resource could not be bound.
    #[error("unable to bind user")]
    UserBindFailed,
    /// The supplied port is out of range for the transport.
    #[error("invalid port")]
    InvalidPort,
    /// The host name exceeds the SOCKS5 length limit.
    #[error("host name too long for SOCKS5")]
    Socks5HostNameTooLong,
    /// The SOCKS5 reply carried an unknown address type.
    #[error("unknown SOCKS5 address type")]
    Socks5UnknownAddressType,
    /// The user name exceeds the SOCKS5 length limit.
    #[error("user name too long for SOCKS5")]
    Socks5UserNameTooLong,
    /// The password exceeds the SOCKS5 length limit.
    #[error("password too long for SOCKS5")]
    Socks5PasswordTooLong,
    /// The proxy rejected the supplied credentials.
    #[error("SOCKS5 rejected user name or password")]
    Socks5BadCredentials,
    /// The configured proxy type is not supported.
    #[error("proxy type not supported")]
    ProxyTypeUnsupported,
    /// The TLS handshake failed.
    #[error("TLS negotiation failure")]
    TlsNegotiationFailed,
    /// SASL negotiation failed.
    #[error("SASL negotiation failure")]
    SaslNegotiationFailed,
    /// SASL negotiation was aborted by either party.
    #[error("SASL negotiation aborted")]
    SaslAborted,
    /// No mutually supported SASL mechanism exists.
    #[error("no SASL mechanism")]
    NoSaslMechanism,
    /// A plaintext-equivalent mechanism was offered over an insecure stream.
    #[error("insecure SASL over insecure stream")]
    InsecureSaslOverInsecureStream,
    /// A SASL nonce could not be encoded.
    #[error("error encoding nonce")]
    NonceEncoding,
    /// An in-band registration attempt is already running.
    #[error("registration already running")]
    RegistrationAlreadyRunning,
    /// The in-band registration request was invalid or rejected.
    #[error("invalid registration")]
    InvalidRegistration,
    /// A request was answered with an error stanza.
    #[error("request failed")]
    RequestFailed,
    /// An extension was called while stream shutdown is in progress.
    #[error("extension in shutdown")]
    ExtensionInShutdown,
    /// The raw socket connect failed.
    #[error("socket connect error")]
    SocketConnectFailed,
    /// A stanza could not be translated into its typed form.
    #[error("stanza translation error")]
    StanzaTranslation,
    /// A stanza exceeded the permitted size.
    #[error("stanza too long")]
    StanzaTooLong,
    /// The stream is already shutting down.
    #[error("stream in shutdown")]
    StreamInShutdown,
}

/// Categorized failure reported by the underlying engine.
///
/// This is the engine-boundary error contract: every lifecycle event and
/// every fallible engine operation reports one of these categories. It is
/// internal to the library pair and never crosses the C boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Connection/protocol-level failure with a fine-grained code.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// HTTP transport-layer failure (BOSH path).
    #[error("http transport error: {0}")]
    HttpTransport(String),
    /// SOCKS5 proxy library failure.
    #[error("socks5 proxy error: {0}")]
    Socks5Proxy(String),
    /// Generic async I/O failure from a transport backend.
    #[error("i/o error: {0}")]
    Io(String),
}

/// Translate an engine lifecycle result into a public error code.
///
/// Total and deterministic; safe to call from any thread without locking.
#[must_use]
pub fn translate(result: &EngineResult<()>) -> ErrorCode {
    match result {
        Ok(()) => ErrorCode::Ok,
        Err(err) => translate_error(err),
    }
}

/// Translate a categorized engine failure into a public error code.
///
/// Unrecognized protocol codes and unrecognized categories both degrade to
/// [`ErrorCode::Fail`] rather than leaking internal detail.
#[must_use]
pub fn translate_error(err: &EngineError) -> ErrorCode {
    match err {
        EngineError::Protocol(code) => translate_protocol(*code),
        EngineError::HttpTransport(_) => ErrorCode::BoshError,
        EngineError::Socks5Proxy(_) => ErrorCode::ProxyConnectError,
        EngineError::Io(_) => ErrorCode::ConnectError,
    }
}

fn translate_protocol(code: ProtocolError) -> ErrorCode {
    use ProtocolError as P;
    match code {
        P::TlsNegotiationInProgress
        | P::ResourceNotBound
        | P::SessionStartFailed
        | P::InvalidStream
        | P::UserBindFailed => ErrorCode::StreamNotNegotiated,
        P::ServerClosedStream | P::SocketClosed => ErrorCode::ServerDisconnected,
        P::NotSupported => ErrorCode::FeatureNotSupported,
        P::XmlParse
        | P::UnknownSessionId
        | P::SessionIdReused
        | P::DuplicateQueryId
        | P::BoundStreamRestart => ErrorCode::InternalError,
        P::BoshWaitMissing | P::BoshRequestsMissing => ErrorCode::BoshError,
        P::InvalidPort => ErrorCode::HostConnectionFailed,
        P::Socks5HostNameTooLong
        | P::Socks5UnknownAddressType
        | P::Socks5UserNameTooLong
        | P::Socks5PasswordTooLong
        | P::Socks5BadCredentials
        | P::ProxyTypeUnsupported => ErrorCode::ProxyConnectError,
        P::TlsNegotiationFailed => ErrorCode::TlsNegotiationFailed,
        P::SaslNegotiationFailed
        | P::SaslAborted
        | P::NoSaslMechanism
        | P::InsecureSaslOverInsecureStream
        | P::NonceEncoding => ErrorCode::SaslNegotiationFailed,
        P::RegistrationAlreadyRunning | P::InvalidRegistration => {
            ErrorCode::InbandRegistrationFailure
        }
        P::RequestFailed => ErrorCode::RequestErrorResponse,
        P::ExtensionInShutdown => ErrorCode::StreamClosingNotAvailable,
        P::SocketConnectFailed => ErrorCode::ConnectError,
        P::StanzaTranslation | P::StanzaTooLong => ErrorCode::InvalidServerStanza,
        // StreamInShutdown deliberately has no specific public code.
        _ => ErrorCode::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PROTOCOL: &[(ProtocolError, ErrorCode)] = &[
        (ProtocolError::TlsNegotiationInProgress, ErrorCode::StreamNotNegotiated),
        (ProtocolError::ResourceNotBound, ErrorCode::StreamNotNegotiated),
        (ProtocolError::ServerClosedStream, ErrorCode::ServerDisconnected),
        (ProtocolError::SocketClosed, ErrorCode::ServerDisconnected),
        (ProtocolError::NotSupported, ErrorCode::FeatureNotSupported),
        (ProtocolError::XmlParse, ErrorCode::InternalError),
        (ProtocolError::UnknownSessionId, ErrorCode::InternalError),
        (ProtocolError::SessionIdReused, ErrorCode::InternalError),
        (ProtocolError::DuplicateQueryId, ErrorCode::InternalError),
        (ProtocolError::BoundStreamRestart, ErrorCode::InternalError),
        (ProtocolError::BoshWaitMissing, ErrorCode::BoshError),
        (ProtocolError::BoshRequestsMissing, ErrorCode::BoshError),
        (ProtocolError::SessionStartFailed, ErrorCode::StreamNotNegotiated),
        (ProtocolError::InvalidStream, ErrorCode::StreamNotNegotiated),
        (ProtocolError::UserBindFailed, ErrorCode::StreamNotNegotiated),
        (ProtocolError::InvalidPort, ErrorCode::HostConnectionFailed),
        (ProtocolError::Socks5HostNameTooLong, ErrorCode::ProxyConnectError),
        (ProtocolError::Socks5UnknownAddressType, ErrorCode::ProxyConnectError),
        (ProtocolError::Socks5UserNameTooLong, ErrorCode::ProxyConnectError),
        (ProtocolError::Socks5PasswordTooLong, ErrorCode::ProxyConnectError),
        (ProtocolError::Socks5BadCredentials, ErrorCode::ProxyConnectError),
        (ProtocolError::ProxyTypeUnsupported, ErrorCode::ProxyConnectError),
        (ProtocolError::TlsNegotiationFailed, ErrorCode::TlsNegotiationFailed),
        (ProtocolError::SaslNegotiationFailed, ErrorCode::SaslNegotiationFailed),
        (ProtocolError::SaslAborted, ErrorCode::SaslNegotiationFailed),
        (ProtocolError::NoSaslMechanism, ErrorCode::SaslNegotiationFailed),
        (ProtocolError::InsecureSaslOverInsecureStream, ErrorCode::SaslNegotiationFailed),
        (ProtocolError::NonceEncoding, ErrorCode::SaslNegotiationFailed),
        (ProtocolError::RegistrationAlreadyRunning, ErrorCode::InbandRegistrationFailure),
        (ProtocolError::InvalidRegistration, ErrorCode::InbandRegistrationFailure),
        (ProtocolError::RequestFailed, ErrorCode::RequestErrorResponse),
        (ProtocolError::ExtensionInShutdown, ErrorCode::StreamClosingNotAvailable),
        (ProtocolError::SocketConnectFailed, ErrorCode::ConnectError),
        (ProtocolError::StanzaTranslation, ErrorCode::InvalidServerStanza),
        (ProtocolError::StanzaTooLong, ErrorCode::InvalidServerStanza),
        (ProtocolError::StreamInShutdown, ErrorCode::Fail),
    ];

    #[test]
    fn success_translates_to_ok() {
        assert_eq!(translate(&Ok(())), ErrorCode::Ok);
    }

    #[test]
    fn protocol_table_is_pinned() {
        for (code, expected) in ALL_PROTOCOL {
            let err = EngineError::Protocol(*code);
            assert_eq!(translate_error(&err), *expected, "mapping for {code:?}");
        }
    }

    #[test]
    fn categories_map_to_their_public_codes() {
        assert_eq!(
            translate_error(&EngineError::HttpTransport("timeout".into())),
            ErrorCode::BoshError
        );
        assert_eq!(
            translate_error(&EngineError::Socks5Proxy("refused".into())),
            ErrorCode::ProxyConnectError
        );
        assert_eq!(
            translate_error(&EngineError::Io("connection reset".into())),
            ErrorCode::ConnectError
        );
    }

    #[test]
    fn translation_is_deterministic() {
        for (code, _) in ALL_PROTOCOL {
            let err = EngineError::Protocol(*code);
            assert_eq!(translate_error(&err), translate_error(&err));
        }
        let err = EngineError::Io("reset".into());
        assert_eq!(translate(&Err(err.clone())), translate(&Err(err)));
    }

    #[test]
    fn abi_values_are_stable() {
        assert_eq!(ErrorCode::Ok as i32, 0);
        assert_eq!(ErrorCode::Fail as i32, 1);
        assert_eq!(ErrorCode::InvalidHandle as i32, 2);
        assert_eq!(ErrorCode::InvalidParameter as i32, 3);
        assert_eq!(ErrorCode::StreamNotNegotiated as i32, 4);
        assert_eq!(ErrorCode::ServerDisconnected as i32, 5);
        assert_eq!(ErrorCode::FeatureNotSupported as i32, 6);
        assert_eq!(ErrorCode::InternalError as i32, 7);
        assert_eq!(ErrorCode::BoshError as i32, 8);
        assert_eq!(ErrorCode::HostConnectionFailed as i32, 9);
        assert_eq!(ErrorCode::ProxyConnectError as i32, 10);
        assert_eq!(ErrorCode::TlsNegotiationFailed as i32, 11);
        assert_eq!(ErrorCode::SaslNegotiationFailed as i32, 12);
        assert_eq!(ErrorCode::InbandRegistrationFailure as i32, 13);
        assert_eq!(ErrorCode::RequestErrorResponse as i32, 14);
        assert_eq!(ErrorCode::StreamClosingNotAvailable as i32, 15);
        assert_eq!(ErrorCode::ConnectError as i32, 16);
        assert_eq!(ErrorCode::InvalidServerStanza as i32, 17);
    }

    #[test]
    fn from_abi_round_trips_known_values() {
        for v in 0..=17 {
            let code = ErrorCode::from_abi(v).expect("known value");
            assert_eq!(code as i32, v);
        }
        assert_eq!(ErrorCode::from_abi(18), None);
        assert_eq!(ErrorCode::from_abi(-1), None);
    }
}

//! Plain data types shared by the orchestration core and the C surface.

use std::fmt;

use zeroize::Zeroizing;

/// Opaque identity value handed across the boundary.
///
/// A handle is never dereferenced by callers; it is only meaningful as a key
/// into the registry. Context handles carry the address of the context
/// allocation, stream handles are minted from a process-wide counter and are
/// never reused within a process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

impl Handle {
    /// The null handle. Never valid.
    pub const NULL: Self = Self(0);

    /// Wrap a raw handle value.
    #[must_use]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// The raw handle value, for transport across the ABI.
    #[must_use]
    pub const fn as_raw(self) -> usize {
        self.0
    }

    /// Whether this is the null handle.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A Jabber identifier, carried opaquely.
///
/// This layer does not parse or validate JIDs; interpretation belongs to the
/// engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JabberId(String);

impl JabberId {
    /// Wrap a JID string.
    #[must_use]
    pub fn new(jid: impl Into<String>) -> Self {
        Self(jid.into())
    }

    /// The JID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JabberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A credential buffer that is zeroized on drop and redacted in `Debug`.
#[derive(Clone, Default)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    /// Take ownership of credential bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    /// Borrow the credential bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the credential in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// Proxy selection for an outbound connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyKind {
    /// Connect directly, no proxying.
    #[default]
    Direct,
    /// Connect through a SOCKS5 proxy.
    Socks5,
}

/// Proxy descriptor consumed by the engine's transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProxyConfig {
    /// Proxy kind.
    pub kind: ProxyKind,
    /// Proxy host. Passed through to the transport unchanged, even if empty.
    pub host: String,
    /// Proxy port.
    pub port: u16,
}

impl ProxyConfig {
    /// A direct (unproxied) connection.
    #[must_use]
    pub fn direct() -> Self {
        Self::default()
    }

    /// A SOCKS5 proxy at `host:port`.
    #[must_use]
    pub fn socks5(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: ProxyKind::Socks5,
            host: host.into(),
            port,
        }
    }
}

/// Parameters for one connect attempt.
///
/// Consumed once when the engine configuration is built; never mutated after
/// the connect request is issued.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    /// Server host to connect to.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// XMPP domain. Defaults to [`host`](Self::host) when unset.
    pub domain: Option<String>,
    /// SASL user name.
    pub user_name: String,
    /// SASL secret.
    pub password: Secret,
    /// The user's JID.
    pub user_jid: String,
    /// Whether to request in-band registration.
    pub inband_registration: bool,
    /// Proxy descriptor.
    pub proxy: ProxyConfig,
}

impl ConnectParams {
    /// The effective XMPP domain for this attempt.
    #[must_use]
    pub fn effective_domain(&self) -> &str {
        self.domain.as_deref().unwrap_or(&self.host)
    }
}

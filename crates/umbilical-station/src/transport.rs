//! Byte-oriented duplex channel abstraction.
//!
//! A [`Transport`] moves raw bytes; it knows nothing about frames. The
//! communication manager layers the protocol on top and decides how to
//! react to the error taxonomy here: [`TransportError::Timeout`] means
//! retry, [`TransportError::Closed`] means reconnect.
//!
//! Only TCP is realized today ([`crate::tcp::TcpTransport`]); the
//! trait exists so serial or websocket variants can be added without
//! touching the manager.

use std::{fmt, net::Ipv4Addr, time::Duration};

use thiserror::Error;

/// Transport-layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The channel is closed or the peer went away; reconnect to
    /// recover.
    #[error("transport is closed")]
    Closed,

    /// No bytes within the configured budget; retry later.
    #[error("timed out waiting for the transport")]
    Timeout,

    /// A read larger than the read-ahead buffer can ever hold.
    #[error("read of {requested} bytes exceeds the {capacity}-byte read buffer")]
    ReadTooLarge {
        /// Bytes the caller asked for.
        requested: usize,
        /// Fixed ring capacity.
        capacity: usize,
    },

    /// The requested transport kind has no implementation.
    #[error("transport kind {0:?} is not available")]
    Unsupported(TransportKind),

    /// An operation was attempted before any transport was selected.
    #[error("no transport selected")]
    NotSelected,

    /// Connection settings failed validation.
    #[error("invalid transport settings: {0}")]
    InvalidSettings(String),

    /// Any other socket-level failure.
    #[error("transport i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The transport variants a manager can be switched between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Point-to-point serial line (not yet implemented).
    Serial,
    /// TCP stream socket.
    Tcp,
    /// Websocket bridge (not yet implemented).
    WebSocket,
}

/// Validated TCP endpoint settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpSettings {
    /// Peer IPv4 address.
    pub address: Ipv4Addr,
    /// Peer TCP port.
    pub port: u16,
}

impl TcpSettings {
    /// Parse and validate an endpoint from a dotted-quad string and a
    /// port.
    ///
    /// # Errors
    ///
    /// `TransportError::InvalidSettings` if the address is not a valid
    /// IPv4 dotted quad. The port range needs no check: any `u16` is a
    /// legal port.
    pub fn new(address: &str, port: u16) -> Result<Self, TransportError> {
        let address = address.parse::<Ipv4Addr>().map_err(|_| {
            TransportError::InvalidSettings(format!(
                "address {address:?} is not a valid IPv4 address"
            ))
        })?;
        Ok(Self { address, port })
    }
}

/// Settings for whichever transport kind is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSettings {
    /// TCP endpoint settings.
    Tcp(TcpSettings),
}

/// A snapshot of transport state for operator display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportInfo {
    /// Whether the channel is currently open.
    pub active: bool,
    /// Which transport variant this is.
    pub kind: TransportKind,
    /// Connected peer address, if any.
    pub address: Option<Ipv4Addr>,
    /// Connected peer port, if any.
    pub port: Option<u16>,
}

impl fmt::Display for TransportInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.active { "active" } else { "inactive" };
        match (self.address, self.port) {
            (Some(address), Some(port)) => {
                write!(f, "{:?} {status} ({address}:{port})", self.kind)
            }
            _ => write!(f, "{:?} {status}", self.kind),
        }
    }
}

/// A byte-oriented duplex channel.
///
/// Reads are served through a bounded read-ahead buffer so that
/// frame-sized reads stay decoupled from the peer's arbitrary
/// chunking: bytes received beyond the current request are retained
/// for the next one.
pub trait Transport {
    /// Open the channel.
    ///
    /// Timeout semantics for both directions: `None` waits
    /// indefinitely, `Some(Duration::ZERO)` polls once without
    /// blocking, a positive duration bounds the wait.
    fn open(
        &mut self,
        settings: &TransportSettings,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Result<(), TransportError>;

    /// Close the channel. Idempotent; afterwards `is_open()` is false.
    fn close(&mut self);

    /// Whether the channel is currently open.
    fn is_open(&self) -> bool;

    /// Read exactly `n` bytes.
    ///
    /// # Errors
    ///
    /// - `ReadTooLarge` if `n` can never be satisfied by the buffer
    /// - `Timeout` if fewer than `n` bytes are available in the budget
    ///   (bytes received so far stay buffered for the retry)
    /// - `Closed` if the peer has gone away
    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError>;

    /// Write all of `data`, or fail without a partial-write report.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Snapshot of the channel state.
    fn info(&self) -> TransportInfo;

    /// Bytes currently held in the read-ahead buffer.
    fn read_buffer_size(&self) -> usize;
}

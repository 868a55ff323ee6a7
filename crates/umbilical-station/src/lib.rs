//! Ground station side of the umbilical link.
//!
//! Wraps the wire protocol from `umbilical-proto` with the pieces a
//! control host needs to talk to avionics:
//!
//! - [`transport`]: the byte-channel abstraction and its TCP
//!   realization ([`tcp::TcpTransport`]) with read-ahead buffering
//! - [`manager`]: the [`CommunicationManager`] owning the priority
//!   send queue, the callback registry and the receive pump
//!
//! The crate is deliberately synchronous: reads poll, timeouts surface
//! as [`TransportError::Timeout`], and the caller owns the retry loop.
//! Async concerns live on the proxy side of the link.

pub mod manager;
pub mod tcp;
pub mod transport;

pub use manager::{CommunicationError, CommunicationManager};
pub use tcp::TcpTransport;
pub use transport::{
    TcpSettings, Transport, TransportError, TransportInfo, TransportKind, TransportSettings,
};

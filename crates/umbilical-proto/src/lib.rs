//! Wire protocol for the ground station ↔ rocket link.
//!
//! The link exchanges fixed 14-byte frames: a header literal, five
//! bytes of bit-packed identifiers, a 32-bit payload region and a
//! CRC-32/MPEG-2 trailer. This crate owns everything about those
//! frames and nothing about how they move:
//!
//! - [`ids`]: the closed identifier sets and their wire encodings
//! - [`Frame`] / [`Fingerprint`] / [`Payload`]: the message value type
//!   and its callback-routing identity
//! - [`codec`]: pure encode/decode between frames and wire bytes
//!
//! Transports, send queues and callback dispatch live in the station
//! crate; the fan-out proxy relays these frames without decoding them.

mod errors;
mod frame;

pub mod codec;
pub mod ids;

pub use errors::{ProtocolError, Result};
pub use frame::{Fingerprint, Frame, MAX_DEVICE_ID, Payload};
pub use ids::{
    ActionId, BoardId, DataTypeId, DeviceId, HEADER_BYTE, Operation, PriorityId,
};

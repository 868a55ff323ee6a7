//! Protocol error types.
//!
//! Every way a frame can fail to cross the wire boundary: bad CRC,
//! truncated input, or bit patterns that do not name a known
//! identifier. Transport-level failures live in the station crate;
//! this taxonomy covers only frame content.

use thiserror::Error;

use crate::ids::DeviceId;

/// Errors produced while encoding or decoding frames.
///
/// All variants are terminal for the frame in question but never for
/// the connection: the caller drops the frame and keeps reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The trailing CRC does not match the received bytes.
    #[error("frame checksum mismatch: computed {expected:#010x}, received {received:#010x}")]
    ChecksumMismatch {
        /// CRC recomputed over the received prefix.
        expected: u32,
        /// CRC carried in the frame trailer.
        received: u32,
    },

    /// Decode input is not exactly one wire frame long.
    #[error("frame length mismatch: expected {expected} bytes, got {actual}")]
    FrameLength {
        /// Required wire length.
        expected: usize,
        /// Length of the provided buffer.
        actual: usize,
    },

    /// The 5-bit board field holds a value outside the board registry.
    #[error("unknown board id {0:#04x}")]
    UnknownBoard(u8),

    /// The 2-bit priority field holds an unassigned value.
    #[error("unknown priority id {0:#04x}")]
    UnknownPriority(u8),

    /// The 4-bit action field holds an unassigned value.
    #[error("unknown action id {0:#04x}")]
    UnknownAction(u8),

    /// The 6-bit device-family field holds an unassigned value.
    #[error("unknown device type {0:#04x}")]
    UnknownDevice(u8),

    /// The 4-bit data-type field holds an unassigned value.
    #[error("unknown data type {0:#04x}")]
    UnknownDataType(u8),

    /// The operation code is not defined for the given device family.
    #[error("unknown operation {code:#04x} for device family {device:?}")]
    UnknownOperation {
        /// Device family the frame addressed.
        device: DeviceId,
        /// Raw operation code.
        code: u8,
    },

    /// A device id wider than the 6-bit wire field.
    #[error("device id {0} exceeds the 6-bit field width")]
    DeviceIdOverflow(u8),
}

/// Convenience alias used throughout the protocol crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

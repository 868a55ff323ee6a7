//! Frame value type and its registry fingerprint.
//!
//! A [`Frame`] is one application-level message: eight header fields
//! plus a 32-bit payload region. Frames are immutable after
//! construction; transformations like [`Frame::reversed`] return new
//! values.
//!
//! Callback routing compares frames by [`Fingerprint`], which
//! deliberately ignores `priority`, `data_type` and `payload`: a
//! response matches the registered pattern whatever data it carries
//! and whichever queue class it rode in on.

use std::fmt;

use crate::{
    errors::{ProtocolError, Result},
    ids::{ActionId, BoardId, DataTypeId, DeviceId, Operation, PriorityId},
};

/// Widest value the 6-bit device id field can carry.
pub const MAX_DEVICE_ID: u8 = 0x3F;

/// Payload of a frame: the 32-bit data region with its layout.
///
/// The variant is the `data_type` selector; carrying both in one tag
/// makes element-count mismatches unrepresentable. Scalars narrower
/// than 32 bits are padded with zero bits on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    /// No payload elements, 32 pad bits.
    NoData,
    /// One unsigned 32-bit scalar.
    Uint32(u32),
    /// One unsigned 16-bit scalar.
    Uint16(u16),
    /// One unsigned 8-bit scalar.
    Uint8(u8),
    /// One signed 32-bit scalar.
    Int32(i32),
    /// One signed 16-bit scalar.
    Int16(i16),
    /// One signed 8-bit scalar.
    Int8(i8),
    /// One single-precision float.
    Float(f32),
    /// Two signed 16-bit scalars.
    Int16x2(i16, i16),
    /// An unsigned 16-bit scalar followed by a signed one.
    Uint16Int16(u16, i16),
}

impl Payload {
    /// Layout selector for this payload.
    #[must_use]
    pub fn data_type(&self) -> DataTypeId {
        match self {
            Self::NoData => DataTypeId::NoData,
            Self::Uint32(_) => DataTypeId::Uint32,
            Self::Uint16(_) => DataTypeId::Uint16,
            Self::Uint8(_) => DataTypeId::Uint8,
            Self::Int32(_) => DataTypeId::Int32,
            Self::Int16(_) => DataTypeId::Int16,
            Self::Int8(_) => DataTypeId::Int8,
            Self::Float(_) => DataTypeId::Float,
            Self::Int16x2(..) => DataTypeId::Int16x2,
            Self::Uint16Int16(..) => DataTypeId::Uint16Int16,
        }
    }

    /// Pack into the 4-byte wire region, big-endian, zero pad bits.
    #[must_use]
    pub fn encode(&self) -> [u8; 4] {
        match *self {
            Self::NoData => [0; 4],
            Self::Uint32(v) => v.to_be_bytes(),
            Self::Int32(v) => v.to_be_bytes(),
            Self::Float(v) => v.to_be_bytes(),
            Self::Uint16(v) => {
                let b = v.to_be_bytes();
                [b[0], b[1], 0, 0]
            }
            Self::Int16(v) => {
                let b = v.to_be_bytes();
                [b[0], b[1], 0, 0]
            }
            Self::Uint8(v) => [v, 0, 0, 0],
            Self::Int8(v) => [v as u8, 0, 0, 0],
            Self::Int16x2(a, b) => {
                let (a, b) = (a.to_be_bytes(), b.to_be_bytes());
                [a[0], a[1], b[0], b[1]]
            }
            Self::Uint16Int16(a, b) => {
                let (a, b) = (a.to_be_bytes(), b.to_be_bytes());
                [a[0], a[1], b[0], b[1]]
            }
        }
    }

    /// Unpack the 4-byte wire region under the given layout.
    ///
    /// Pad bits are ignored, not validated: the wire contract only
    /// promises they are zero on encode.
    #[must_use]
    pub fn decode(data_type: DataTypeId, bytes: [u8; 4]) -> Self {
        match data_type {
            DataTypeId::NoData => Self::NoData,
            DataTypeId::Uint32 => Self::Uint32(u32::from_be_bytes(bytes)),
            DataTypeId::Int32 => Self::Int32(i32::from_be_bytes(bytes)),
            DataTypeId::Float => Self::Float(f32::from_be_bytes(bytes)),
            DataTypeId::Uint16 => Self::Uint16(u16::from_be_bytes([bytes[0], bytes[1]])),
            DataTypeId::Int16 => Self::Int16(i16::from_be_bytes([bytes[0], bytes[1]])),
            DataTypeId::Uint8 => Self::Uint8(bytes[0]),
            DataTypeId::Int8 => Self::Int8(bytes[0] as i8),
            DataTypeId::Int16x2 => Self::Int16x2(
                i16::from_be_bytes([bytes[0], bytes[1]]),
                i16::from_be_bytes([bytes[2], bytes[3]]),
            ),
            DataTypeId::Uint16Int16 => Self::Uint16Int16(
                u16::from_be_bytes([bytes[0], bytes[1]]),
                i16::from_be_bytes([bytes[2], bytes[3]]),
            ),
        }
    }
}

/// Callback identity of a frame: the six fields that survive into the
/// registry key.
///
/// `priority`, `data_type` and `payload` are excluded on purpose; see
/// the module docs. Constructed via [`Frame::fingerprint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Target board.
    pub destination: BoardId,
    /// Message kind.
    pub action: ActionId,
    /// Originating board.
    pub source: BoardId,
    /// Device family.
    pub device_type: DeviceId,
    /// Instance within the family.
    pub device_id: u8,
    /// Raw family-local operation code.
    pub operation: u8,
}

/// One wire message.
///
/// Field widths are fixed by the wire format (see the codec module).
/// The enum-typed fields enforce their widths by construction;
/// [`Frame::new`] checks the raw `device_id` against its 6-bit field
/// and `operation` occupies a full byte.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    destination: BoardId,
    priority: PriorityId,
    action: ActionId,
    source: BoardId,
    device_type: DeviceId,
    device_id: u8,
    operation: u8,
    payload: Payload,
}

impl Frame {
    /// Construct a frame, validating field widths.
    ///
    /// # Errors
    ///
    /// `ProtocolError::DeviceIdOverflow` if `device_id` does not fit
    /// the 6-bit wire field.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        destination: BoardId,
        priority: PriorityId,
        action: ActionId,
        source: BoardId,
        device_type: DeviceId,
        device_id: u8,
        operation: u8,
        payload: Payload,
    ) -> Result<Self> {
        if device_id > MAX_DEVICE_ID {
            return Err(ProtocolError::DeviceIdOverflow(device_id));
        }

        Ok(Self {
            destination,
            priority,
            action,
            source,
            device_type,
            device_id,
            operation,
            payload,
        })
    }

    /// Target board.
    #[must_use]
    pub fn destination(&self) -> BoardId {
        self.destination
    }

    /// Send-queue class.
    #[must_use]
    pub fn priority(&self) -> PriorityId {
        self.priority
    }

    /// Message kind.
    #[must_use]
    pub fn action(&self) -> ActionId {
        self.action
    }

    /// Originating board.
    #[must_use]
    pub fn source(&self) -> BoardId {
        self.source
    }

    /// Device family.
    #[must_use]
    pub fn device_type(&self) -> DeviceId {
        self.device_type
    }

    /// Device instance within its family.
    #[must_use]
    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    /// Raw operation code; interpret via [`Operation::decode`].
    #[must_use]
    pub fn operation(&self) -> u8 {
        self.operation
    }

    /// Payload region.
    #[must_use]
    pub fn payload(&self) -> Payload {
        self.payload
    }

    /// Payload layout selector.
    #[must_use]
    pub fn data_type(&self) -> DataTypeId {
        self.payload.data_type()
    }

    /// Typed view of the operation field.
    ///
    /// # Errors
    ///
    /// `ProtocolError::UnknownOperation` if the code is not defined for
    /// this frame's device family.
    pub fn typed_operation(&self) -> Result<Operation> {
        Operation::decode(self.device_type, self.operation)
    }

    /// New frame with source and destination swapped, everything else
    /// preserved. Applying it twice is the identity.
    ///
    /// Used to derive the reception pattern for an outgoing request.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            destination: self.source,
            source: self.destination,
            ..*self
        }
    }

    /// Registry key for callback routing.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            destination: self.destination,
            action: self.action,
            source: self.source,
            device_type: self.device_type,
            device_id: self.device_id,
            operation: self.operation,
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame({:?}, {:?}, {:?}, {:?}, {:?}, {}, ",
            self.destination, self.priority, self.action, self.source, self.device_type,
            self.device_id,
        )?;
        // Unknown operation codes relay fine; render them as hex.
        match self.typed_operation() {
            Ok(op) => write!(f, "{op:?}, ")?,
            Err(_) => write!(f, "op {:#04x}, ", self.operation)?,
        }
        write!(f, "{:?})", self.payload)
    }
}

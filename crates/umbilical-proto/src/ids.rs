//! Identifier registry for the ground station wire protocol.
//!
//! Every multi-bit field in a frame draws its values from one of the
//! closed sets below. The numeric encodings are part of the wire
//! contract and must never be reordered; new members are appended with
//! explicit values.
//!
//! Operation codes are the one family-dependent set: the same 8-bit
//! value means something different on a servo than on a relay, so
//! interpretation goes through [`Operation::decode`] with the frame's
//! device family in hand.

use crate::errors::{ProtocolError, Result};

/// First byte of every wire frame. Never bit-reversed on the wire.
pub const HEADER_BYTE: u8 = 0x05;

/// Board addresses, 5 bits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BoardId {
    /// Ground station control software.
    Software = 0x01,
    /// On-board rocket avionics.
    Rocket = 0x02,
    /// Ground-support fill station (this deployment's own board).
    FillStation = 0x03,
    /// Sentinel terminating board iteration during broadcast expansion.
    /// Not a real board; no frame carries it as source or destination.
    LastBoard = 0x09,
    /// The fan-out proxy itself.
    Proxy = 0x1E,
    /// Address every concrete board at once.
    Broadcast = 0x1F,
}

impl BoardId {
    /// All members in ascending numeric order.
    pub const ALL: [Self; 6] = [
        Self::Software,
        Self::Rocket,
        Self::FillStation,
        Self::LastBoard,
        Self::Proxy,
        Self::Broadcast,
    ];

    /// Parse a raw board id. `None` if unassigned.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Software),
            0x02 => Some(Self::Rocket),
            0x03 => Some(Self::FillStation),
            0x09 => Some(Self::LastBoard),
            0x1E => Some(Self::Proxy),
            0x1F => Some(Self::Broadcast),
            _ => None,
        }
    }

    /// Wire encoding.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Send-queue classes, 2 bits on the wire. Lower value drains first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PriorityId {
    /// Drained before anything else.
    High = 0x00,
    /// Default class for routine traffic.
    Low = 0x01,
}

impl PriorityId {
    /// Number of priority classes; sizes the manager's queue array.
    pub const COUNT: usize = 2;

    /// All members in ascending numeric (descending urgency) order.
    pub const ALL: [Self; Self::COUNT] = [Self::High, Self::Low];

    /// Parse a raw priority id. `None` if unassigned.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::High),
            0x01 => Some(Self::Low),
            _ => None,
        }
    }

    /// Wire encoding; doubles as the send-queue index.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Message kinds, 4 bits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ActionId {
    /// Unsolicited telemetry from a board.
    Feed = 0x00,
    /// Command a device to act.
    Service = 0x01,
    /// Positive acknowledgement.
    Ack = 0x02,
    /// Negative acknowledgement.
    Nack = 0x03,
    /// Link liveness probe.
    Heartbeat = 0x04,
    /// Ask a board for a value.
    Request = 0x05,
    /// Answer to a request.
    Response = 0x06,
    /// Enqueue a deferred command on the scheduler.
    Schedule = 0x07,
    /// Scheduler acknowledgement.
    Sack = 0x08,
    /// Scheduler rejection.
    Snack = 0x09,
}

impl ActionId {
    /// Parse a raw action id. `None` if unassigned.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Feed),
            0x01 => Some(Self::Service),
            0x02 => Some(Self::Ack),
            0x03 => Some(Self::Nack),
            0x04 => Some(Self::Heartbeat),
            0x05 => Some(Self::Request),
            0x06 => Some(Self::Response),
            0x07 => Some(Self::Schedule),
            0x08 => Some(Self::Sack),
            0x09 => Some(Self::Snack),
            _ => None,
        }
    }

    /// Wire encoding.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Device families, 6 bits on the wire.
///
/// The family selects the operation vocabulary for the frame's 8-bit
/// operation field; see [`Operation::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceId {
    /// PWM valve servo.
    Servo = 0x00,
    /// Switched relay output.
    Relay = 0x01,
    /// Single-channel sensor.
    Sensor = 0x02,
    /// Smart bus servo with velocity control.
    Dynamixel = 0x03,
    /// On-board command scheduler.
    Scheduler = 0x04,
    /// Pyrotechnic igniter channel.
    Igniter = 0x05,
    /// On-board flash logger.
    Flash = 0x06,
    /// Pneumatic piston (sensor-style readout).
    Piston = 0x07,
    /// Recovery arming unit.
    Recovery = 0x08,
    /// Power supply channel.
    Supply = 0x09,
    /// Parachute deployment unit.
    Parachute = 0x0A,
    /// Board reset line.
    Reset = 0x0B,
    /// Watchdog keep-alive endpoint.
    KeepAlive = 0x0C,
    /// Oxidizer heating lamp.
    HeatingLamp = 0x0D,
    /// Multi-channel sensor bank.
    MultiSensor = 0x0E,
}

impl DeviceId {
    /// Parse a raw device family. `None` if unassigned.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Servo),
            0x01 => Some(Self::Relay),
            0x02 => Some(Self::Sensor),
            0x03 => Some(Self::Dynamixel),
            0x04 => Some(Self::Scheduler),
            0x05 => Some(Self::Igniter),
            0x06 => Some(Self::Flash),
            0x07 => Some(Self::Piston),
            0x08 => Some(Self::Recovery),
            0x09 => Some(Self::Supply),
            0x0A => Some(Self::Parachute),
            0x0B => Some(Self::Reset),
            0x0C => Some(Self::KeepAlive),
            0x0D => Some(Self::HeatingLamp),
            0x0E => Some(Self::MultiSensor),
            _ => None,
        }
    }

    /// Wire encoding.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Payload layout selectors, 4 bits on the wire.
///
/// Every layout occupies the same 32-bit payload region; narrower
/// scalars are padded with zero bits to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataTypeId {
    /// 32 pad bits, no payload elements.
    NoData = 0x00,
    /// One unsigned 32-bit scalar.
    Uint32 = 0x01,
    /// One unsigned 16-bit scalar.
    Uint16 = 0x02,
    /// One unsigned 8-bit scalar.
    Uint8 = 0x03,
    /// One signed 32-bit scalar.
    Int32 = 0x04,
    /// One signed 16-bit scalar.
    Int16 = 0x05,
    /// One signed 8-bit scalar.
    Int8 = 0x06,
    /// One IEEE-754 single-precision scalar.
    Float = 0x07,
    /// Two signed 16-bit scalars.
    Int16x2 = 0x08,
    /// An unsigned 16-bit scalar followed by a signed one.
    Uint16Int16 = 0x09,
}

impl DataTypeId {
    /// Parse a raw data type. `None` if unassigned.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::NoData),
            0x01 => Some(Self::Uint32),
            0x02 => Some(Self::Uint16),
            0x03 => Some(Self::Uint8),
            0x04 => Some(Self::Int32),
            0x05 => Some(Self::Int16),
            0x06 => Some(Self::Int8),
            0x07 => Some(Self::Float),
            0x08 => Some(Self::Int16x2),
            0x09 => Some(Self::Uint16Int16),
            _ => None,
        }
    }

    /// Wire encoding.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Number of payload elements this layout carries.
    #[must_use]
    pub fn element_count(self) -> usize {
        match self {
            Self::NoData => 0,
            Self::Uint32
            | Self::Uint16
            | Self::Uint8
            | Self::Int32
            | Self::Int16
            | Self::Int8
            | Self::Float => 1,
            Self::Int16x2 | Self::Uint16Int16 => 2,
        }
    }
}

/// Defines one family-local operation vocabulary: a `#[repr(u8)]` enum
/// with `from_u8`/`code` conversions mirroring the id enums above.
macro_rules! operation_family {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($variant = $code),+
        }

        impl $name {
            /// Parse a raw operation code. `None` if unassigned.
            #[must_use]
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Wire encoding of this operation.
            #[must_use]
            pub fn code(self) -> u8 {
                self as u8
            }
        }
    };
}

operation_family! {
    /// Valve servo operations.
    ServoOp {
        Open = 0x01,
        Close = 0x02,
        OpenedPos = 0x03,
        ClosedPos = 0x04,
        Position = 0x05,
        Disable = 0x06,
        Range = 0x07,
    }
}

operation_family! {
    /// Smart bus servo operations; a superset of [`ServoOp`].
    DynamixelOp {
        Open = 0x01,
        Close = 0x02,
        OpenedPos = 0x03,
        ClosedPos = 0x04,
        Position = 0x05,
        Disable = 0x06,
        Range = 0x07,
        Reset = 0x08,
        Velocity = 0x09,
    }
}

operation_family! {
    /// Relay output operations.
    RelayOp {
        Open = 0x01,
        Close = 0x02,
        Status = 0x03,
    }
}

operation_family! {
    /// Power supply channel operations.
    SupplyOp {
        Open = 0x01,
        Close = 0x02,
        Status = 0x03,
    }
}

operation_family! {
    /// Command scheduler operations.
    SchedulerOp {
        Clear = 0x01,
        Start = 0x02,
        Abort = 0x03,
    }
}

operation_family! {
    /// Igniter channel operations.
    IgniterOp {
        Ignite = 0x01,
        Off = 0x02,
        Resistance = 0x03,
        Status = 0x04,
    }
}

operation_family! {
    /// Flash logger operations.
    FlashOp {
        Erase = 0x01,
        Purge = 0x02,
        StartLogging = 0x03,
        StopLogging = 0x04,
    }
}

operation_family! {
    /// Sensor readout; shared by pistons and multi-sensor banks.
    SensorOp {
        Read = 0x01,
    }
}

operation_family! {
    /// Recovery arming operations.
    RecoveryOp {
        Arm = 0x01,
        Disarm = 0x02,
    }
}

operation_family! {
    /// Parachute deployment operations.
    ParachuteOp {
        Drogue = 0x01,
        Main = 0x02,
    }
}

operation_family! {
    /// Board reset operations.
    ResetOp {
        Reset = 0x01,
    }
}

operation_family! {
    /// Watchdog keep-alive operations.
    KeepAliveOp {
        KeepAlive = 0x01,
    }
}

operation_family! {
    /// Heating lamp operations.
    HeatingLampOp {
        Open = 0x01,
        Close = 0x02,
        Status = 0x03,
    }
}

/// A typed operation: the device family plus its family-local code.
///
/// Frames carry the raw 8-bit code; this union is the decoded view for
/// callers that want to match on meaning rather than numbers. Families
/// with identical vocabularies (pistons and multi-sensor banks read
/// like sensors) share their operation enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Valve servo operation.
    Servo(ServoOp),
    /// Smart bus servo operation.
    Dynamixel(DynamixelOp),
    /// Relay operation.
    Relay(RelayOp),
    /// Scheduler operation.
    Scheduler(SchedulerOp),
    /// Igniter operation.
    Igniter(IgniterOp),
    /// Flash logger operation.
    Flash(FlashOp),
    /// Sensor readout.
    Sensor(SensorOp),
    /// Piston readout.
    Piston(SensorOp),
    /// Recovery arming operation.
    Recovery(RecoveryOp),
    /// Power supply operation.
    Supply(SupplyOp),
    /// Parachute deployment operation.
    Parachute(ParachuteOp),
    /// Board reset.
    Reset(ResetOp),
    /// Watchdog keep-alive.
    KeepAlive(KeepAliveOp),
    /// Heating lamp operation.
    HeatingLamp(HeatingLampOp),
    /// Multi-sensor bank readout.
    MultiSensor(SensorOp),
}

impl Operation {
    /// Interpret a raw operation code in the context of a device family.
    ///
    /// # Errors
    ///
    /// `ProtocolError::UnknownOperation` if the family defines no
    /// operation under that code.
    pub fn decode(device: DeviceId, code: u8) -> Result<Self> {
        let unknown = || ProtocolError::UnknownOperation { device, code };
        Ok(match device {
            DeviceId::Servo => Self::Servo(ServoOp::from_u8(code).ok_or_else(unknown)?),
            DeviceId::Dynamixel => {
                Self::Dynamixel(DynamixelOp::from_u8(code).ok_or_else(unknown)?)
            }
            DeviceId::Relay => Self::Relay(RelayOp::from_u8(code).ok_or_else(unknown)?),
            DeviceId::Scheduler => {
                Self::Scheduler(SchedulerOp::from_u8(code).ok_or_else(unknown)?)
            }
            DeviceId::Igniter => Self::Igniter(IgniterOp::from_u8(code).ok_or_else(unknown)?),
            DeviceId::Flash => Self::Flash(FlashOp::from_u8(code).ok_or_else(unknown)?),
            DeviceId::Sensor => Self::Sensor(SensorOp::from_u8(code).ok_or_else(unknown)?),
            DeviceId::Piston => Self::Piston(SensorOp::from_u8(code).ok_or_else(unknown)?),
            DeviceId::Recovery => Self::Recovery(RecoveryOp::from_u8(code).ok_or_else(unknown)?),
            DeviceId::Supply => Self::Supply(SupplyOp::from_u8(code).ok_or_else(unknown)?),
            DeviceId::Parachute => {
                Self::Parachute(ParachuteOp::from_u8(code).ok_or_else(unknown)?)
            }
            DeviceId::Reset => Self::Reset(ResetOp::from_u8(code).ok_or_else(unknown)?),
            DeviceId::KeepAlive => {
                Self::KeepAlive(KeepAliveOp::from_u8(code).ok_or_else(unknown)?)
            }
            DeviceId::HeatingLamp => {
                Self::HeatingLamp(HeatingLampOp::from_u8(code).ok_or_else(unknown)?)
            }
            DeviceId::MultiSensor => {
                Self::MultiSensor(SensorOp::from_u8(code).ok_or_else(unknown)?)
            }
        })
    }

    /// Device family this operation belongs to.
    #[must_use]
    pub fn device(self) -> DeviceId {
        match self {
            Self::Servo(_) => DeviceId::Servo,
            Self::Dynamixel(_) => DeviceId::Dynamixel,
            Self::Relay(_) => DeviceId::Relay,
            Self::Scheduler(_) => DeviceId::Scheduler,
            Self::Igniter(_) => DeviceId::Igniter,
            Self::Flash(_) => DeviceId::Flash,
            Self::Sensor(_) => DeviceId::Sensor,
            Self::Piston(_) => DeviceId::Piston,
            Self::Recovery(_) => DeviceId::Recovery,
            Self::Supply(_) => DeviceId::Supply,
            Self::Parachute(_) => DeviceId::Parachute,
            Self::Reset(_) => DeviceId::Reset,
            Self::KeepAlive(_) => DeviceId::KeepAlive,
            Self::HeatingLamp(_) => DeviceId::HeatingLamp,
            Self::MultiSensor(_) => DeviceId::MultiSensor,
        }
    }

    /// Raw 8-bit wire encoding.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Servo(op) => op.code(),
            Self::Dynamixel(op) => op.code(),
            Self::Relay(op) => op.code(),
            Self::Scheduler(op) => op.code(),
            Self::Igniter(op) => op.code(),
            Self::Flash(op) => op.code(),
            Self::Sensor(op) | Self::Piston(op) | Self::MultiSensor(op) => op.code(),
            Self::Recovery(op) => op.code(),
            Self::Supply(op) => op.code(),
            Self::Parachute(op) => op.code(),
            Self::Reset(op) => op.code(),
            Self::KeepAlive(op) => op.code(),
            Self::HeatingLamp(op) => op.code(),
        }
    }
}

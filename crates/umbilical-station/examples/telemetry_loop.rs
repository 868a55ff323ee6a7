//! Minimal station session: register a telemetry callback, queue two
//! commands, then poll for incoming frames.
//!
//! Expects a proxy (or simulated rocket) listening on 127.0.0.1:3000:
//!
//! ```bash
//! cargo run -p umbilical-proxy &
//! cargo run -p umbilical-station --example telemetry_loop
//! ```

use std::{thread, time::Duration};

use umbilical_proto::{
    ActionId, BoardId, DeviceId, Frame, Payload, PriorityId,
    ids::{RelayOp, SensorOp, ServoOp},
};
use umbilical_station::{
    CommunicationError, CommunicationManager, TcpSettings, TransportError, TransportKind,
    TransportSettings,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut station = CommunicationManager::new();
    station.change_transport(TransportKind::Tcp)?;

    // Pattern for the frames we want delivered to the callback: an
    // altitude feed from the rocket's sensor 2. Priority, data type and
    // payload are ignored during matching.
    let altitude = Frame::new(
        BoardId::Software,
        PriorityId::Low,
        ActionId::Feed,
        BoardId::Rocket,
        DeviceId::Sensor,
        2,
        SensorOp::Read.code(),
        Payload::Float(0.0),
    )?;
    station.register_callback(&altitude, |frame| {
        tracing::info!(%frame, "altitude feed");
    });

    let settings = TransportSettings::Tcp(TcpSettings::new("127.0.0.1", 3000)?);
    station.connect(&settings, Some(Duration::ZERO), Some(Duration::from_secs(1)))?;

    // Open the oxidizer heater relay, then command the intake servo.
    station.push(Frame::new(
        BoardId::Rocket,
        PriorityId::Low,
        ActionId::Service,
        BoardId::Software,
        DeviceId::Relay,
        0,
        RelayOp::Open.code(),
        Payload::NoData,
    )?);
    station.push(Frame::new(
        BoardId::Rocket,
        PriorityId::Low,
        ActionId::Service,
        BoardId::Software,
        DeviceId::Servo,
        1,
        ServoOp::Position.code(),
        Payload::Int16(0),
    )?);
    while station.send()?.is_some() {}

    // Poll for frames; timeouts just mean nothing has arrived yet.
    loop {
        match station.receive() {
            Ok(_) => {}
            Err(CommunicationError::Transport(TransportError::Timeout)) => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(CommunicationError::UnregisteredCallback(frame)) => {
                tracing::warn!(%frame, "no callback registered");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

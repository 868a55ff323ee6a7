//! End-to-end relay tests over real loopback sockets.
//!
//! Each test wires a software side (mirroring) to a hardware side
//! (non-mirroring) exactly as the binary does, connects raw TCP
//! clients, and watches where framed bytes come out.

use std::{net::SocketAddr, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::{sleep, timeout},
};
use umbilical_proto::{
    ActionId, BoardId, DeviceId, Frame, Payload, PriorityId, codec,
};
use umbilical_proxy::Proxy;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Time for the accept loop to register a client before traffic flows.
const SETTLE: Duration = Duration::from_millis(100);

/// Bind and serve a software/hardware pair, returning their addresses.
async fn spawn_pair() -> (SocketAddr, SocketAddr) {
    let any: SocketAddr = "127.0.0.1:0".parse().expect("addr");
    let mut software = Proxy::bind("software", any, true).await.expect("bind software");
    let mut hardware = Proxy::bind("hardware", any, false).await.expect("bind hardware");

    software.register_listener(hardware.forward_handle());
    hardware.register_listener(software.forward_handle());

    let software_addr = software.local_addr().expect("software addr");
    let hardware_addr = hardware.local_addr().expect("hardware addr");

    tokio::spawn(software.serve());
    tokio::spawn(hardware.serve());

    (software_addr, hardware_addr)
}

fn command_frame(device_id: u8) -> [u8; codec::FRAME_LEN] {
    let frame = Frame::new(
        BoardId::Rocket,
        PriorityId::Low,
        ActionId::Service,
        BoardId::Software,
        DeviceId::Servo,
        device_id,
        0x05,
        Payload::Int16(0),
    )
    .expect("valid frame");
    codec::encode(&frame)
}

async fn read_frame(stream: &mut TcpStream) -> [u8; codec::FRAME_LEN] {
    let mut buf = [0u8; codec::FRAME_LEN];
    timeout(READ_TIMEOUT, stream.read_exact(&mut buf))
        .await
        .expect("frame within the deadline")
        .expect("read frame");
    buf
}

/// Assert nothing arrives on `stream` for a little while.
async fn assert_silent(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    let result = timeout(Duration::from_millis(200), stream.read_exact(&mut buf)).await;
    assert!(result.is_err(), "unexpected byte {buf:?}");
}

#[tokio::test]
async fn software_frame_reaches_peer_and_mirror_but_not_itself() {
    let (software_addr, hardware_addr) = spawn_pair().await;

    let mut client_1 = TcpStream::connect(software_addr).await.expect("client 1");
    let mut client_2 = TcpStream::connect(software_addr).await.expect("client 2");
    let mut hardware = TcpStream::connect(hardware_addr).await.expect("hardware");
    sleep(SETTLE).await;

    let wire = command_frame(1);
    client_1.write_all(&wire).await.expect("send");

    // The mirror peer and the hardware endpoint both see the frame.
    assert_eq!(read_frame(&mut client_2).await, wire);
    assert_eq!(read_frame(&mut hardware).await, wire);

    // The sender never receives its own echo.
    assert_silent(&mut client_1).await;
}

#[tokio::test]
async fn hardware_side_forwards_without_mirroring() {
    let (software_addr, hardware_addr) = spawn_pair().await;

    let mut software = TcpStream::connect(software_addr).await.expect("software client");
    let mut hardware_1 = TcpStream::connect(hardware_addr).await.expect("hardware 1");
    let mut hardware_2 = TcpStream::connect(hardware_addr).await.expect("hardware 2");
    sleep(SETTLE).await;

    let wire = command_frame(2);
    hardware_1.write_all(&wire).await.expect("send");

    assert_eq!(read_frame(&mut software).await, wire);
    assert_silent(&mut hardware_2).await;
    assert_silent(&mut hardware_1).await;
}

#[tokio::test]
async fn garbage_bytes_are_dropped_until_the_next_header() {
    let (software_addr, hardware_addr) = spawn_pair().await;

    let mut software = TcpStream::connect(software_addr).await.expect("software client");
    let mut hardware = TcpStream::connect(hardware_addr).await.expect("hardware");
    sleep(SETTLE).await;

    let wire = command_frame(3);
    let mut noisy = vec![0xAB, 0xCD, 0x00];
    noisy.extend_from_slice(&wire);
    software.write_all(&noisy).await.expect("send");

    assert_eq!(read_frame(&mut hardware).await, wire);
    assert_silent(&mut hardware).await;
}

#[tokio::test]
async fn frames_from_one_client_stay_in_order() {
    let (software_addr, hardware_addr) = spawn_pair().await;

    let mut software = TcpStream::connect(software_addr).await.expect("software client");
    let mut hardware = TcpStream::connect(hardware_addr).await.expect("hardware");
    sleep(SETTLE).await;

    let frames: Vec<_> = (1u8..=5).map(command_frame).collect();
    for wire in &frames {
        software.write_all(wire).await.expect("send");
    }

    for wire in &frames {
        assert_eq!(&read_frame(&mut hardware).await, wire);
    }
}

#[tokio::test]
async fn a_dropped_client_does_not_break_the_fan_out() {
    let (software_addr, hardware_addr) = spawn_pair().await;

    let mut survivor = TcpStream::connect(software_addr).await.expect("survivor");
    let doomed = TcpStream::connect(software_addr).await.expect("doomed");
    let mut hardware = TcpStream::connect(hardware_addr).await.expect("hardware");
    sleep(SETTLE).await;

    drop(doomed);
    sleep(SETTLE).await;

    // Hardware-sourced frames still fan out to the remaining client.
    let wire = command_frame(4);
    hardware.write_all(&wire).await.expect("send");
    assert_eq!(read_frame(&mut survivor).await, wire);

    // And software-sourced traffic still reaches the hardware side.
    let reply = command_frame(5);
    survivor.write_all(&reply).await.expect("send");
    assert_eq!(read_frame(&mut hardware).await, reply);
}

#[tokio::test]
async fn partial_frame_from_a_dying_client_is_never_relayed() {
    let (software_addr, hardware_addr) = spawn_pair().await;

    let mut partial = TcpStream::connect(software_addr).await.expect("partial client");
    let mut hardware = TcpStream::connect(hardware_addr).await.expect("hardware");
    sleep(SETTLE).await;

    // Header plus half a body, then the connection dies.
    let wire = command_frame(6);
    partial.write_all(&wire[..7]).await.expect("send");
    partial.flush().await.expect("flush");
    drop(partial);
    sleep(SETTLE).await;

    // The incomplete read terminates the client task without pushing
    // anything; a later full frame from another client is unaffected.
    assert_silent(&mut hardware).await;

    let mut fresh = TcpStream::connect(software_addr).await.expect("fresh client");
    sleep(SETTLE).await;
    fresh.write_all(&wire).await.expect("send");
    assert_eq!(read_frame(&mut hardware).await, wire);
}

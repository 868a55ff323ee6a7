//! Integration tests for the TCP transport and manager over real
//! loopback sockets.
//!
//! The transport is non-blocking by design, so every read here goes
//! through a retry-on-timeout helper with a deadline; that is exactly
//! the client loop the station runs in production.

use std::{
    cell::RefCell,
    io::Write,
    net::{TcpListener, TcpStream},
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

use umbilical_proto::{
    ActionId, BoardId, DeviceId, Frame, Payload, PriorityId, codec,
};
use umbilical_station::{
    CommunicationError, CommunicationManager, TcpSettings, TcpTransport, Transport,
    TransportError, TransportKind, TransportSettings,
};

const DEADLINE: Duration = Duration::from_secs(5);

/// Bind a loopback listener and run `script` against the accepted
/// connection on a background thread.
fn serve<F>(script: F) -> (u16, thread::JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let port = listener.local_addr().expect("local addr").port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        script(stream);
    });
    (port, handle)
}

fn connect_transport(port: u16) -> TcpTransport {
    let mut transport = TcpTransport::new();
    let settings = TransportSettings::Tcp(TcpSettings::new("127.0.0.1", port).expect("settings"));
    transport
        .open(&settings, Some(Duration::ZERO), Some(Duration::from_secs(1)))
        .expect("connect");
    transport
}

/// Retry a non-blocking read until it succeeds or the deadline passes.
fn read_retry(transport: &mut TcpTransport, n: usize) -> Result<Vec<u8>, TransportError> {
    let start = Instant::now();
    loop {
        match transport.read(n) {
            Err(TransportError::Timeout) if start.elapsed() < DEADLINE => {
                thread::sleep(Duration::from_millis(2));
            }
            other => return other,
        }
    }
}

/// Retry `receive` while the transport reports a timeout.
fn receive_retry(manager: &mut CommunicationManager) -> Result<Frame, CommunicationError> {
    let start = Instant::now();
    loop {
        match manager.receive() {
            Err(CommunicationError::Transport(TransportError::Timeout))
                if start.elapsed() < DEADLINE =>
            {
                thread::sleep(Duration::from_millis(2));
            }
            other => return other,
        }
    }
}

fn feed_frame() -> Frame {
    Frame::new(
        BoardId::Software,
        PriorityId::Low,
        ActionId::Feed,
        BoardId::Rocket,
        DeviceId::Sensor,
        2,
        0x01,
        Payload::Float(141.5),
    )
    .expect("valid frame")
}

#[test]
fn delivers_the_peer_byte_sequence_across_odd_read_sizes() {
    let payload: Vec<u8> = (0..200u16).map(|i| (i % 251) as u8).collect();
    let sent = payload.clone();
    let (port, server) = serve(move |mut stream| {
        // Dribble the bytes out in awkward chunks.
        for chunk in sent.chunks(23) {
            stream.write_all(chunk).expect("server write");
            stream.flush().expect("server flush");
            thread::sleep(Duration::from_millis(1));
        }
    });

    let mut transport = connect_transport(port);
    let mut collected = Vec::new();
    for n in [7usize, 13, 80, 100] {
        collected.extend(read_retry(&mut transport, n).expect("read"));
    }
    assert_eq!(collected, payload);
    server.join().expect("server thread");
}

#[test]
fn oversized_reads_are_rejected_without_touching_the_socket() {
    let (port, server) = serve(|stream| {
        // Keep the connection alive until the client is done.
        thread::sleep(Duration::from_millis(50));
        drop(stream);
    });

    let mut transport = connect_transport(port);
    assert!(matches!(
        transport.read(8193),
        Err(TransportError::ReadTooLarge { requested: 8193, capacity: 8192 })
    ));
    assert!(transport.is_open());
    server.join().expect("server thread");
}

#[test]
fn peer_close_surfaces_closed_and_marks_the_transport() {
    let (port, server) = serve(drop);

    let mut transport = connect_transport(port);
    let err = read_retry(&mut transport, 1).expect_err("peer closed");
    assert!(matches!(err, TransportError::Closed));
    assert!(!transport.is_open());
    server.join().expect("server thread");
}

#[test]
fn manager_receives_a_late_frame_after_timeouts() {
    let frame = feed_frame();
    let wire = codec::encode(&frame);
    let (port, server) = serve(move |mut stream| {
        // Nothing for a while; the station loop soaks up timeouts.
        thread::sleep(Duration::from_millis(50));
        stream.write_all(&wire).expect("server write");
    });

    let mut manager = CommunicationManager::new();
    manager.change_transport(TransportKind::Tcp).expect("tcp");
    let settings = TransportSettings::Tcp(TcpSettings::new("127.0.0.1", port).expect("settings"));
    manager
        .connect(&settings, Some(Duration::ZERO), Some(Duration::from_secs(1)))
        .expect("connect");

    let seen = Rc::new(RefCell::new(0u32));
    let counter = Rc::clone(&seen);
    manager.register_callback(&frame, move |_| *counter.borrow_mut() += 1);

    let received = receive_retry(&mut manager).expect("receive");
    assert_eq!(received, frame);
    assert_eq!(*seen.borrow(), 1);
    server.join().expect("server thread");
}

#[test]
fn garbage_byte_yields_missing_header_and_the_frame_survives() {
    let frame = feed_frame();
    let (port, server) = serve(move |mut stream| {
        let mut bytes = vec![0x00];
        bytes.extend(codec::encode(&frame));
        stream.write_all(&bytes).expect("server write");
        thread::sleep(Duration::from_millis(50));
    });

    let mut manager = CommunicationManager::new();
    manager.change_transport(TransportKind::Tcp).expect("tcp");
    let settings = TransportSettings::Tcp(TcpSettings::new("127.0.0.1", port).expect("settings"));
    manager
        .connect(&settings, Some(Duration::ZERO), Some(Duration::from_secs(1)))
        .expect("connect");

    let start = Instant::now();
    loop {
        match manager.receive() {
            Err(CommunicationError::MissingHeader(0x00)) => break,
            Err(CommunicationError::Transport(TransportError::Timeout))
                if start.elapsed() < DEADLINE =>
            {
                thread::sleep(Duration::from_millis(2));
            }
            other => panic!("expected missing header, got {other:?}"),
        }
    }
    // Whatever followed the garbage byte is still buffered.
    assert_eq!(manager.read_buffer_size().expect("buffer"), codec::FRAME_LEN);

    match receive_retry(&mut manager) {
        Err(CommunicationError::UnregisteredCallback(carried)) => assert_eq!(carried, frame),
        other => panic!("expected the surviving frame, got {other:?}"),
    }
    server.join().expect("server thread");
}

#[test]
fn back_to_back_frames_are_retained_across_receives() {
    let first = feed_frame();
    let second = Frame::new(
        first.destination(),
        first.priority(),
        first.action(),
        first.source(),
        first.device_type(),
        3,
        first.operation(),
        Payload::Float(7.0),
    )
    .expect("valid frame");
    let (port, server) = serve(move |mut stream| {
        let mut bytes = Vec::new();
        bytes.extend(codec::encode(&first));
        bytes.extend(codec::encode(&second));
        stream.write_all(&bytes).expect("server write");
        thread::sleep(Duration::from_millis(50));
    });

    let mut manager = CommunicationManager::new();
    manager.change_transport(TransportKind::Tcp).expect("tcp");
    let settings = TransportSettings::Tcp(TcpSettings::new("127.0.0.1", port).expect("settings"));
    manager
        .connect(&settings, Some(Duration::ZERO), Some(Duration::from_secs(1)))
        .expect("connect");

    let got_first = match receive_retry(&mut manager) {
        Err(CommunicationError::UnregisteredCallback(frame)) => frame,
        other => panic!("unexpected: {other:?}"),
    };
    let got_second = match receive_retry(&mut manager) {
        Err(CommunicationError::UnregisteredCallback(frame)) => frame,
        other => panic!("unexpected: {other:?}"),
    };
    assert_eq!((got_first, got_second), (first, second));
    server.join().expect("server thread");
}

#[test]
fn station_send_reaches_the_peer() {
    let frame = feed_frame().reversed();
    let expected = codec::encode(&frame);
    let (port, server) = serve(move |mut stream| {
        use std::io::Read;
        stream
            .set_read_timeout(Some(DEADLINE))
            .expect("server timeout");
        let mut got = vec![0u8; expected.len()];
        stream.read_exact(&mut got).expect("server read");
        assert_eq!(got, expected);
    });

    let mut manager = CommunicationManager::new();
    manager.change_transport(TransportKind::Tcp).expect("tcp");
    let settings = TransportSettings::Tcp(TcpSettings::new("127.0.0.1", port).expect("settings"));
    manager
        .connect(&settings, Some(Duration::ZERO), Some(Duration::from_secs(1)))
        .expect("connect");

    manager.push(frame);
    let sent = manager.send().expect("send").expect("a frame was queued");
    assert_eq!(sent, frame);
    server.join().expect("server thread");
}

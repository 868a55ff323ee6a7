//! Fan-out relay between a pool of TCP clients and a peer proxy.
//!
//! One [`Proxy`] serves one named side ("software" or "hardware").
//! Frames received from its own clients go onto the uplink queue and
//! from there into every registered peer's forward queue; frames
//! arriving on the forward queue fan out to every connected client.
//! With mirroring enabled, client-sourced frames are additionally
//! echoed to the sender's same-side peers.
//!
//! The relay never validates CRCs or frame semantics: it is a byte
//! relay framed only by the `0x05` header. Exactly-14-byte reads keep
//! a half-written frame from one client from corrupting another's
//! stream. Every queue edge has a single producer context and a single
//! consumer task; ordering is FIFO per edge, with no guarantee across
//! clients on the same side.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        TcpListener,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{Mutex, mpsc},
};
use umbilical_proto::{
    HEADER_BYTE,
    codec::{FRAME_LEN, HEADER_LEN},
};

/// Relay errors. Connection-lifecycle failures inside client tasks are
/// logged and handled by reaping the client, never surfaced here.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested listen address.
        addr: SocketAddr,
        /// Underlying socket error.
        source: std::io::Error,
    },

    /// Any other socket-level failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One connected client: its outgoing FIFO and stop flag.
///
/// Dropping the handle drops the queue's only persistent sender, which
/// lets the send task drain and exit; the stop flag catches the
/// receive task at its next iteration.
#[derive(Debug)]
struct ClientHandle {
    queue: mpsc::UnboundedSender<Bytes>,
    stop: Arc<AtomicBool>,
}

type ClientTable = Arc<Mutex<HashMap<u64, ClientHandle>>>;

/// One side of the fan-out relay.
#[derive(Debug)]
pub struct Proxy {
    name: Arc<str>,
    mirror_frames: bool,
    listener: TcpListener,
    clients: ClientTable,
    uplink_tx: mpsc::UnboundedSender<Bytes>,
    uplink_rx: mpsc::UnboundedReceiver<Bytes>,
    forward_tx: mpsc::UnboundedSender<Bytes>,
    forward_rx: mpsc::UnboundedReceiver<Bytes>,
    peers: Vec<mpsc::UnboundedSender<Bytes>>,
}

impl Proxy {
    /// Bind a listener for this side.
    ///
    /// `mirror_frames` controls whether client-sourced frames are
    /// echoed to the sender's same-side peers; the software side
    /// typically mirrors, the hardware side does not.
    pub async fn bind(
        name: &str,
        addr: SocketAddr,
        mirror_frames: bool,
    ) -> Result<Self, ProxyError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ProxyError::Bind { addr, source })?;
        let (uplink_tx, uplink_rx) = mpsc::unbounded_channel();
        let (forward_tx, forward_rx) = mpsc::unbounded_channel();

        tracing::info!(proxy = name, %addr, mirror_frames, "listening");

        Ok(Self {
            name: Arc::from(name),
            mirror_frames,
            listener,
            clients: Arc::new(Mutex::new(HashMap::new())),
            uplink_tx,
            uplink_rx,
            forward_tx,
            forward_rx,
            peers: Vec::new(),
        })
    }

    /// Address the listener actually bound to (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ProxyError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle other sides use to push frames into this side's forward
    /// queue.
    #[must_use]
    pub fn forward_handle(&self) -> mpsc::UnboundedSender<Bytes> {
        self.forward_tx.clone()
    }

    /// Register a peer: frames from this side's clients will be pushed
    /// into `peer`'s forward queue.
    pub fn register_listener(&mut self, peer: mpsc::UnboundedSender<Bytes>) {
        self.peers.push(peer);
    }

    /// Run this side: the two station tasks plus two tasks per
    /// accepted client. Runs until the process exits.
    pub async fn serve(self) -> Result<(), ProxyError> {
        let Self {
            name,
            mirror_frames,
            listener,
            clients,
            uplink_tx,
            uplink_rx,
            forward_tx: _forward_tx,
            forward_rx,
            peers,
        } = self;

        tokio::spawn(station_send(Arc::clone(&name), uplink_rx, peers));
        tokio::spawn(station_receive(
            Arc::clone(&name),
            forward_rx,
            Arc::clone(&clients),
        ));

        let mut next_client_id: u64 = 0;
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let id = next_client_id;
                    next_client_id += 1;

                    let (reader, writer) = stream.into_split();
                    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
                    let stop = Arc::new(AtomicBool::new(false));

                    clients.lock().await.insert(
                        id,
                        ClientHandle { queue: queue_tx, stop: Arc::clone(&stop) },
                    );
                    tracing::info!(proxy = %name, client = id, %peer_addr, "added new client");

                    tokio::spawn(client_receive(
                        Arc::clone(&name),
                        id,
                        reader,
                        uplink_tx.clone(),
                        Arc::clone(&clients),
                        mirror_frames,
                        Arc::clone(&stop),
                    ));
                    tokio::spawn(client_send(
                        Arc::clone(&name),
                        id,
                        writer,
                        queue_rx,
                        Arc::clone(&clients),
                        Arc::clone(&stop),
                    ));
                }
                Err(err) => {
                    tracing::error!(proxy = %name, "accept failed: {err}");
                }
            }
        }
    }
}

/// Remove a client from the table and flag both of its tasks to stop.
async fn remove_client(name: &str, clients: &ClientTable, id: u64) {
    let removed = clients.lock().await.remove(&id);
    if let Some(client) = removed {
        client.stop.store(true, Ordering::Relaxed);
        tracing::info!(proxy = name, client = id, "removed client");
    }
}

/// Read framed bytes from one client: push them onto the uplink queue
/// and, when mirroring, onto every other same-side client's queue.
async fn client_receive(
    name: Arc<str>,
    id: u64,
    mut reader: OwnedReadHalf,
    uplink: mpsc::UnboundedSender<Bytes>,
    clients: ClientTable,
    mirror_frames: bool,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        let mut header = [0u8; HEADER_LEN];
        if let Err(err) = reader.read_exact(&mut header).await {
            tracing::debug!(proxy = %name, client = id, "client read ended: {err}");
            break;
        }
        // Resynchronize: drop bytes until the next frame header.
        if header[0] != HEADER_BYTE {
            tracing::debug!(proxy = %name, client = id, byte = header[0], "missing header");
            continue;
        }

        let mut frame = BytesMut::zeroed(FRAME_LEN);
        frame[..HEADER_LEN].copy_from_slice(&header);
        if let Err(err) = reader.read_exact(&mut frame[HEADER_LEN..]).await {
            tracing::debug!(proxy = %name, client = id, "client read ended: {err}");
            break;
        }
        let frame = frame.freeze();

        if uplink.send(frame.clone()).is_err() {
            break;
        }

        if mirror_frames {
            let clients = clients.lock().await;
            for (other_id, other) in clients.iter() {
                if *other_id == id {
                    continue;
                }
                let _ = other.queue.send(frame.clone());
            }
        }
    }

    remove_client(&name, &clients, id).await;
}

/// Drain one client's outgoing queue into its socket.
async fn client_send(
    name: Arc<str>,
    id: u64,
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<Bytes>,
    clients: ClientTable,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        // The sender lives in the client table; removal drops it and
        // ends this loop once the queue drains.
        let Some(data) = queue.recv().await else { break };
        if let Err(err) = writer.write_all(&data).await {
            tracing::debug!(proxy = %name, client = id, "client write failed: {err}");
            break;
        }
    }

    remove_client(&name, &clients, id).await;
}

/// Fan frames from the forward queue out to every live client.
/// Clients whose queue is gone are reaped after the iteration.
async fn station_receive(
    name: Arc<str>,
    mut forward_rx: mpsc::UnboundedReceiver<Bytes>,
    clients: ClientTable,
) {
    while let Some(data) = forward_rx.recv().await {
        let stale: Vec<u64> = {
            let clients = clients.lock().await;
            clients
                .iter()
                .filter(|(_, client)| client.queue.send(data.clone()).is_err())
                .map(|(id, _)| *id)
                .collect()
        };
        for id in stale {
            remove_client(&name, &clients, id).await;
        }
    }
}

/// Hand every uplinked frame to each registered peer's forward queue.
async fn station_send(
    name: Arc<str>,
    mut uplink_rx: mpsc::UnboundedReceiver<Bytes>,
    peers: Vec<mpsc::UnboundedSender<Bytes>>,
) {
    while let Some(data) = uplink_rx.recv().await {
        for peer in &peers {
            if peer.send(data.clone()).is_err() {
                tracing::warn!(proxy = %name, "peer forward queue is gone");
            }
        }
    }
}

//! Communication manager: priority send queue, callback registry and
//! protocol pump over a pluggable transport.
//!
//! The manager is single-threaded by contract. It makes no
//! thread-safety promises; callers interleaving `receive` with
//! `push`/`send` from different threads must serialize at their level.
//! The recommended receive loop is: try `receive`, sleep briefly on
//! [`TransportError::Timeout`], retry.

use std::{cell::RefCell, collections::VecDeque, rc::Rc, time::Duration};

use thiserror::Error;
use umbilical_proto::{
    BoardId, Fingerprint, Frame, HEADER_BYTE, PriorityId, ProtocolError, codec,
};

use crate::{
    tcp::TcpTransport,
    transport::{Transport, TransportError, TransportInfo, TransportKind, TransportSettings},
};

/// Errors surfaced by manager operations.
///
/// The manager never swallows these; retry and backoff policy belongs
/// to the calling task.
#[derive(Debug, Error)]
pub enum CommunicationError {
    /// The transport failed; see [`TransportError`] for recovery.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A received frame was malformed; drop it, keep the transport.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The first byte read was not the frame header. The stream
    /// resynchronizes on the next `0x05`.
    #[error("received byte {0:#04x} where a frame header was expected")]
    MissingHeader(u8),

    /// A valid frame arrived with no handler under its fingerprint.
    /// Carries the frame so the caller can still observe it.
    #[error("no callback registered for frame: {0}")]
    UnregisteredCallback(Frame),
}

/// Shared, reentrant-callable frame handler.
///
/// One registration can fan out to several fingerprints (broadcast
/// expansion), so handlers are reference-counted rather than owned per
/// key. No `Send` bound: the manager is single-threaded by contract.
type Handler = Rc<RefCell<dyn FnMut(&Frame)>>;

/// Main communication interface for the ground station.
///
/// Owns one transport (selectable by kind), the protocol codec, one
/// FIFO queue per priority class and the callback registry keyed by
/// frame fingerprint.
#[derive(Default)]
pub struct CommunicationManager {
    transport: Option<Box<dyn Transport>>,
    queues: [VecDeque<Frame>; PriorityId::COUNT],
    callbacks: std::collections::HashMap<Fingerprint, Handler>,
}

impl CommunicationManager {
    /// New manager with no transport selected and empty queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the transport kind, closing any current transport first.
    ///
    /// # Errors
    ///
    /// `TransportError::Unsupported` for kinds without an
    /// implementation; the previous transport stays closed.
    pub fn change_transport(&mut self, kind: TransportKind) -> Result<(), TransportError> {
        if let Some(transport) = self.transport.as_mut() {
            transport.close();
        }
        match kind {
            TransportKind::Tcp => {
                self.transport = Some(Box::new(TcpTransport::new()));
                Ok(())
            }
            other => Err(TransportError::Unsupported(other)),
        }
    }

    /// Install a custom transport implementation.
    ///
    /// Extension point for transport variants this crate does not ship;
    /// the manager drives any [`Transport`] identically.
    pub fn set_transport(&mut self, transport: Box<dyn Transport>) {
        if let Some(mut current) = self.transport.take() {
            current.close();
        }
        self.transport = Some(transport);
    }

    /// Whether a transport is selected and open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_open())
    }

    /// Snapshot of the selected transport's state.
    ///
    /// # Errors
    ///
    /// `TransportError::NotSelected` before [`Self::change_transport`].
    pub fn transport_info(&self) -> Result<TransportInfo, TransportError> {
        Ok(self.transport.as_ref().ok_or(TransportError::NotSelected)?.info())
    }

    /// Bytes currently buffered by the transport's read-ahead ring.
    ///
    /// # Errors
    ///
    /// `TransportError::NotSelected` before [`Self::change_transport`].
    pub fn read_buffer_size(&self) -> Result<usize, TransportError> {
        Ok(self
            .transport
            .as_ref()
            .ok_or(TransportError::NotSelected)?
            .read_buffer_size())
    }

    /// Open the transport. All priority queues are cleared first so a
    /// fresh connection never replays stale traffic.
    pub fn connect(
        &mut self,
        settings: &TransportSettings,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Result<(), TransportError> {
        for queue in &mut self.queues {
            queue.clear();
        }
        self.transport
            .as_mut()
            .ok_or(TransportError::NotSelected)?
            .open(settings, read_timeout, write_timeout)
    }

    /// Close the transport.
    pub fn disconnect(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            transport.close();
        }
    }

    /// Register `handler` for frames matching `frame`'s fingerprint.
    ///
    /// For a non-broadcast destination the frame itself is the key: pass
    /// the frame you expect to receive. A `Broadcast` destination is the
    /// outgoing form; it expands into one key per concrete board by
    /// reversing the frame and substituting each board below the
    /// iteration sentinel as the source, excluding `Broadcast` and the
    /// station's own `FillStation` board.
    ///
    /// # Panics
    ///
    /// Registering a fingerprint twice is a programming error and
    /// asserts.
    pub fn register_callback<F>(&mut self, frame: &Frame, handler: F)
    where
        F: FnMut(&Frame) + 'static,
    {
        let handler: Handler = Rc::new(RefCell::new(handler));
        if frame.destination() == BoardId::Broadcast {
            for key in Self::broadcast_fingerprints(frame) {
                tracing::debug!(?key, "registering broadcast callback");
                let previous = self.callbacks.insert(key, Rc::clone(&handler));
                assert!(previous.is_none(), "callback already registered for {key:?}");
            }
        } else {
            let key = frame.fingerprint();
            tracing::debug!(?key, "registering callback");
            let previous = self.callbacks.insert(key, handler);
            assert!(previous.is_none(), "callback already registered for {key:?}");
        }
    }

    /// Remove the handler keyed by `reversed(frame)`. Silent if absent.
    pub fn unregister_callback(&mut self, frame: &Frame) {
        self.callbacks.remove(&frame.reversed().fingerprint());
    }

    /// Drop every registered handler.
    pub fn clear_callbacks(&mut self) {
        self.callbacks.clear();
    }

    /// Number of registered fingerprints.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Queue a frame for sending in its priority class.
    pub fn push(&mut self, frame: Frame) {
        self.queues[frame.priority().to_u8() as usize].push_back(frame);
    }

    /// Dequeue the next frame: classes are scanned in ascending numeric
    /// order and the first non-empty one drains FIFO.
    pub fn pop(&mut self) -> Option<Frame> {
        self.queues.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Encode and write the next queued frame.
    ///
    /// Returns the frame that went out, or `None` when every queue was
    /// empty, so the caller can observe outbound traffic.
    pub fn send(&mut self) -> Result<Option<Frame>, CommunicationError> {
        let Some(frame) = self.pop() else {
            return Ok(None);
        };
        let wire = codec::encode(&frame);
        self.transport
            .as_mut()
            .ok_or(TransportError::NotSelected)?
            .write(&wire)?;
        tracing::trace!(%frame, "sent");
        Ok(Some(frame))
    }

    /// Read, decode and dispatch one frame.
    ///
    /// Reads one header byte, then the remaining thirteen. A failed
    /// read propagates its transport error without consuming queue
    /// state; bytes already buffered stay in the ring for the retry.
    ///
    /// # Errors
    ///
    /// - [`CommunicationError::MissingHeader`] if the first byte is not
    ///   `0x05` (that byte is consumed; the stream resynchronizes on
    ///   the next header)
    /// - [`CommunicationError::UnregisteredCallback`] if no handler
    ///   matches; the decoded frame rides in the error
    /// - transport and protocol errors as-is
    pub fn receive(&mut self) -> Result<Frame, CommunicationError> {
        let transport = self.transport.as_mut().ok_or(TransportError::NotSelected)?;

        let header = transport.read(codec::HEADER_LEN)?;
        if header[0] != HEADER_BYTE {
            return Err(CommunicationError::MissingHeader(header[0]));
        }

        let body = transport.read(codec::BODY_LEN)?;
        let mut raw = [0u8; codec::FRAME_LEN];
        raw[..codec::HEADER_LEN].copy_from_slice(&header);
        raw[codec::HEADER_LEN..].copy_from_slice(&body);
        let frame = codec::decode(&raw)?;
        tracing::trace!(%frame, "received");

        // Clone the handle out of the registry so the handler runs
        // without borrowing the map.
        let handler = self.callbacks.get(&frame.fingerprint()).map(Rc::clone);
        match handler {
            Some(handler) => {
                (handler.borrow_mut())(&frame);
                Ok(frame)
            }
            None => Err(CommunicationError::UnregisteredCallback(frame)),
        }
    }

    /// One fingerprint per concrete board for a broadcast registration.
    fn broadcast_fingerprints(frame: &Frame) -> Vec<Fingerprint> {
        let template = frame.reversed().fingerprint();
        debug_assert_eq!(template.source, BoardId::Broadcast);

        let mut keys = Vec::new();
        for board in BoardId::ALL {
            if board == BoardId::LastBoard {
                break;
            }
            if matches!(board, BoardId::Broadcast | BoardId::FillStation) {
                continue;
            }
            keys.push(Fingerprint { source: board, ..template });
        }
        keys
    }
}

impl std::fmt::Debug for CommunicationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommunicationManager")
            .field("transport", &self.transport.as_ref().map(|t| t.info()))
            .field("queued", &self.queues.iter().map(VecDeque::len).sum::<usize>())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

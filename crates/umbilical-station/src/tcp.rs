//! TCP realization of [`Transport`].
//!
//! Wraps a stream socket with a bounded read-ahead ring. The protocol
//! reads one header byte and then thirteen more; whatever else arrived
//! in the same TCP segment must be retained for the next frame, and
//! the ring is what decouples those frame-sized reads from the
//! kernel's arbitrary chunking.

use std::{
    collections::VecDeque,
    io::{ErrorKind, Read, Write},
    net::{Shutdown, SocketAddr, TcpStream},
    time::Duration,
};

use crate::transport::{
    TcpSettings, Transport, TransportError, TransportInfo, TransportKind, TransportSettings,
};

/// Capacity of the read-ahead ring in bytes.
pub const READ_BUFFER_SIZE: usize = 8192;

/// TCP stream transport with read-ahead buffering.
#[derive(Debug, Default)]
pub struct TcpTransport {
    socket: Option<TcpStream>,
    ring: VecDeque<u8>,
    endpoint: Option<TcpSettings>,
    open: bool,
}

impl TcpTransport {
    /// New, unconnected transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop exactly `n` bytes off the front of the ring.
    fn take(&mut self, n: usize) -> Vec<u8> {
        self.ring.drain(..n).collect()
    }

    fn mark_closed(&mut self) {
        self.open = false;
    }
}

impl Transport for TcpTransport {
    fn open(
        &mut self,
        settings: &TransportSettings,
        read_timeout: Option<Duration>,
        write_timeout: Option<Duration>,
    ) -> Result<(), TransportError> {
        let TransportSettings::Tcp(settings) = settings;

        let addr = SocketAddr::from((settings.address, settings.port));
        let socket = TcpStream::connect(addr)?;

        // One socket, one mode: a zero timeout in either direction puts
        // the whole socket into non-blocking polling. Positive timeouts
        // bound the kernel wait; `None` blocks indefinitely.
        let zero_read = read_timeout == Some(Duration::ZERO);
        let zero_write = write_timeout == Some(Duration::ZERO);
        if zero_read || zero_write {
            socket.set_nonblocking(true)?;
        } else {
            socket.set_read_timeout(read_timeout)?;
            socket.set_write_timeout(write_timeout)?;
        }

        self.socket = Some(socket);
        self.ring.clear();
        self.endpoint = Some(*settings);
        self.open = true;
        tracing::debug!("tcp transport connected to {addr}");
        Ok(())
    }

    fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            let _ = socket.shutdown(Shutdown::Both);
            tracing::debug!("tcp transport closed");
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        if n > READ_BUFFER_SIZE {
            return Err(TransportError::ReadTooLarge {
                requested: n,
                capacity: READ_BUFFER_SIZE,
            });
        }

        // Already buffered: serve without touching the socket.
        if self.ring.len() >= n {
            return Ok(self.take(n));
        }

        let socket = self.socket.as_mut().ok_or(TransportError::Closed)?;
        let mut scratch = [0u8; READ_BUFFER_SIZE];
        let available = READ_BUFFER_SIZE - self.ring.len();
        match socket.read(&mut scratch[..available]) {
            // Zero-length receive means the peer closed the stream.
            Ok(0) => {
                self.mark_closed();
                return Err(TransportError::Closed);
            }
            Ok(received) => self.ring.extend(&scratch[..received]),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(TransportError::Timeout);
            }
            Err(err) if err.kind() == ErrorKind::ConnectionReset => {
                self.mark_closed();
                return Err(TransportError::Closed);
            }
            Err(err) => return Err(TransportError::Io(err)),
        }

        // One receive was not enough; the caller retries and the bytes
        // stay in the ring.
        if self.ring.len() < n {
            return Err(TransportError::Timeout);
        }

        Ok(self.take(n))
    }

    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        let socket = self.socket.as_mut().ok_or(TransportError::Closed)?;
        match socket.write_all(data) {
            Ok(()) => Ok(()),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Err(TransportError::Timeout)
            }
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::BrokenPipe
                        | ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionAborted
                        | ErrorKind::NotConnected
                ) =>
            {
                self.mark_closed();
                Err(TransportError::Closed)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn info(&self) -> TransportInfo {
        TransportInfo {
            active: self.open,
            kind: TransportKind::Tcp,
            address: self.endpoint.map(|e| e.address),
            port: self.endpoint.map(|e| e.port),
        }
    }

    fn read_buffer_size(&self) -> usize {
        self.ring.len()
    }
}

//! Blocking byte-stream transport consumed by the handshake.

use std::{
    io::{self, Read, Write},
    net::{Shutdown, SocketAddr, TcpStream},
    ops::{Deref, DerefMut},
    time::Duration,
};

use tracing::{debug, warn};

/// Opens connections to peers.
pub trait Transport {
    type Connection: Connection;

    fn connect(&self, addr: SocketAddr) -> io::Result<Self::Connection>;
}

/// An open, exclusively owned connection.
pub trait Connection {
    /// Writes all of `bytes`.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Performs a single read of at most `max_bytes`. An empty result means the peer closed the stream.
    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>>;

    /// Bounds subsequent reads; expiry surfaces as [`io::ErrorKind::TimedOut`]. `None` blocks indefinitely.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    fn close(&mut self) -> io::Result<()>;
}

/// Closes the wrapped connection when dropped.
pub struct ScopedConnection<C: Connection> {
    inner: C,
}

impl<C: Connection> ScopedConnection<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: Connection> Deref for ScopedConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C: Connection> DerefMut for ScopedConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

impl<C: Connection> Drop for ScopedConnection<C> {
    fn drop(&mut self) {
        match self.inner.close() {
            Ok(()) => debug!("Connection closed"),
            Err(e) => warn!("Failed to close connection: {}", e),
        }
    }
}

/// [`Transport`] over `std::net::TcpStream`.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    connect_timeout: Option<Duration>,
}

impl TcpTransport {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;

    fn connect(&self, addr: SocketAddr) -> io::Result<TcpConnection> {
        let stream = match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        debug!("Connected to {} from {}", addr, stream.local_addr()?);

        Ok(TcpConnection { stream })
    }
}

#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl TcpConnection {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }
}

impl Connection for TcpConnection {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    fn read(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; max_bytes];
        let n = self.stream.read(&mut buf).map_err(|e| match e.kind() {
            // unix reports an expired read timeout as WouldBlock
            io::ErrorKind::WouldBlock => io::Error::new(io::ErrorKind::TimedOut, e),
            _ => e,
        })?;
        buf.truncate(n);

        Ok(buf)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

//! Transport polymorphism over plain TCP and TLS
//!
//! The HTTP exchange is written against a single stream handle so no I/O
//! site branches on the transport kind. Dropping the transport closes the
//! TLS session (when present) and the socket.

use crate::{Error, Result};
use native_tls::{Protocol, TlsConnector, TlsStream};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Socket send timeout for the request bytes
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Socket receive timeout for response headers and body
pub const RECV_TIMEOUT: Duration = Duration::from_secs(15);

/// One connected byte stream to the remote service
pub enum Transport {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Transport {
    /// Resolve the host, connect, and optionally negotiate a TLS client
    /// session.
    ///
    /// Nagle is disabled and the fixed send/receive timeouts are applied to
    /// the socket before any handshake traffic.
    pub fn connect(host: &str, port: u16, tls: bool) -> Result<Self> {
        if host.is_empty() {
            return Err(Error::Resolve(host.to_string()));
        }

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|_| Error::Resolve(host.to_string()))?
            .next()
            .ok_or_else(|| Error::Resolve(host.to_string()))?;

        let stream = TcpStream::connect(addr).map_err(|e| Error::Connect(e.to_string()))?;
        stream
            .set_nodelay(true)
            .and_then(|_| stream.set_write_timeout(Some(SEND_TIMEOUT)))
            .and_then(|_| stream.set_read_timeout(Some(RECV_TIMEOUT)))
            .map_err(|e| Error::Connect(e.to_string()))?;

        if tls {
            let connector = TlsConnector::builder()
                .min_protocol_version(Some(Protocol::Tlsv10))
                .build()
                .map_err(|e| Error::TlsHandshake(e.to_string()))?;
            let session = connector
                .connect(host, stream)
                .map_err(|e| Error::TlsHandshake(e.to_string()))?;
            Ok(Self::Tls(Box::new(session)))
        } else {
            Ok(Self::Plain(stream))
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.read(buf),
            Self::Tls(session) => session.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.write(buf),
            Self::Tls(session) => session.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(stream) => stream.flush(),
            Self::Tls(session) => session.flush(),
        }
    }
}

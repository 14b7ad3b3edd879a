use std::{io, net::SocketAddr};
use thiserror::Error;

/// Errors produced while encoding or decoding wire data.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("insufficient data for message header: {available} of 24 bytes")]
    InsufficientHeader { available: usize },

    #[error("insufficient data for payload: header declares {declared} bytes, {available} available")]
    InsufficientPayload { declared: u32, available: usize },

    #[error("truncated input: needed {needed} bytes, {available} available")]
    TruncatedInput { needed: usize, available: usize },

    #[error("invalid network address: {0}")]
    InvalidAddress(String),

    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("command name too long")]
    CommandNameTooLong,

    #[error("command name has to be ASCII string")]
    CommandNameNonAscii,

    #[error("string of {0} bytes does not fit a single-byte length prefix")]
    StringTooLong(usize),

    #[error("payload is larger than MAX_SIZE")]
    PayloadTooBig,

    #[error("FromUtf8Error during deserialization: {0}")]
    Utf8DeserializationError(#[from] std::string::FromUtf8Error),

    #[error("IO Error during (de)serialization: {0}")]
    SerializationError(#[from] io::Error),
}

/// Errors ending a handshake attempt.
#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to send version message: {0}")]
    Send(#[source] io::Error),

    #[error("failed to receive reply: {0}")]
    Receive(#[source] io::Error),

    #[error("unexpected command in reply: `{0}`")]
    UnexpectedCommand(String),

    #[error("malformed reply: {0}")]
    Wire(#[from] WireError),
}

impl HandshakeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            HandshakeError::Connect { .. } => FailureKind::Connect,
            HandshakeError::Send(_) => FailureKind::Send,
            HandshakeError::Receive(_) => FailureKind::Receive,
            HandshakeError::UnexpectedCommand(_) => FailureKind::UnexpectedCommand,
            HandshakeError::Wire(e) => match e {
                WireError::InsufficientHeader { .. } => FailureKind::InsufficientHeader,
                WireError::InsufficientPayload { .. } => FailureKind::InsufficientPayload,
                WireError::TruncatedInput { .. } => FailureKind::TruncatedInput,
                WireError::InvalidAddress(_) => FailureKind::InvalidAddress,
                _ => FailureKind::Malformed,
            },
        }
    }

    /// `true` when the reply did not arrive before the read deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            HandshakeError::Receive(e)
                if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
        )
    }
}

/// Classification of a failed handshake, kept in [`crate::handshake::HandshakeState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connect,
    Send,
    Receive,
    InsufficientHeader,
    InsufficientPayload,
    TruncatedInput,
    InvalidAddress,
    UnexpectedCommand,
    Malformed,
}

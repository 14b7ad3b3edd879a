/// Network address encoding used inside the version payload
pub mod address;

/// Fixed-width integer and length-prefixed string primitives
pub mod codec;

/// Enumarations defining networks and service flags
pub mod enums;

/// Specific errors used by this crate.
pub mod errors;

/// Version handshake state machine
pub mod handshake;

/// Bitcoin protocol message envelope
pub mod message;

/// Socket abstraction the handshake runs over
pub mod transport;

/// Checksum, clock and nonce helpers
pub mod utils;

/// `version` message payload
pub mod version;

pub use message::{BitcoinDeserialize, BitcoinSerialize};

/// Protocol version advertised when none is configured.
pub const PROTOCOL_VERSION: i32 = 60002;

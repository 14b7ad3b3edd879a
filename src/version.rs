use std::{io::Write, net::SocketAddrV4};

use byteorder::{LittleEndian, WriteBytesExt};
use getset::{CopyGetters, Getters};

use crate::{
    address::NetworkAddress,
    codec::{var_str_to_bytes, WireReader, MAX_VAR_STR_LEN},
    enums::ServiceIdentifier,
    errors::WireError,
    message::{BitcoinDeserialize, BitcoinSerialize},
    utils::{random_nonce, unix_timestamp},
};

/// Start height advertised by a freshly constructed payload.
pub const DEFAULT_START_HEIGHT: i32 = 1;

/// Bytes left after the nonce when the payload ends in the short tail.
const SHORT_TAIL_SIZE: usize = 4;

/// Content of a `version` message.
///
/// On the wire the receiver is written in the 14-byte compact form and the
/// sender slot is a zeroed 26-byte placeholder. When the user agent is empty
/// and `relay` is false both trailing fields are left out, so the payload ends
/// `nonce | start_height`; otherwise it ends
/// `nonce | user_agent | start_height | relay`.
#[derive(Getters, CopyGetters, Debug, Clone, PartialEq, Eq)]
pub struct VersionPayload {
    #[getset(get_copy = "pub")]
    protocol_version: i32,

    #[getset(get = "pub")]
    services: ServiceIdentifier,

    #[getset(get_copy = "pub")]
    timestamp: i64,

    #[getset(get = "pub")]
    receiver: NetworkAddress,

    #[getset(get = "pub")]
    sender: NetworkAddress,

    #[getset(get_copy = "pub")]
    nonce: u64,

    #[getset(get = "pub")]
    user_agent: String,

    #[getset(get_copy = "pub")]
    start_height: i32,

    #[getset(get_copy = "pub")]
    relay: bool,
}

impl VersionPayload {
    /// Builds a payload stamped with the current time and a fresh nonce.
    pub fn new(protocol_version: i32, receiver: SocketAddrV4, sender: SocketAddrV4) -> Self {
        Self {
            protocol_version,
            services: ServiceIdentifier::NODE_NETWORK,
            timestamp: unix_timestamp(),
            receiver: receiver.into(),
            sender: sender.into(),
            nonce: random_nonce(),
            user_agent: String::new(),
            start_height: DEFAULT_START_HEIGHT,
            relay: false,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Result<Self, WireError> {
        let user_agent = user_agent.into();
        if user_agent.len() > MAX_VAR_STR_LEN {
            return Err(WireError::StringTooLong(user_agent.len()));
        }
        self.user_agent = user_agent;

        Ok(self)
    }

    pub fn with_start_height(mut self, start_height: i32) -> Self {
        self.start_height = start_height;
        self
    }

    pub fn with_relay(mut self, relay: bool) -> Self {
        self.relay = relay;
        self
    }

    fn has_short_tail(&self) -> bool {
        self.user_agent.is_empty() && !self.relay
    }
}

impl BitcoinSerialize for VersionPayload {
    fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::with_capacity(80 + self.user_agent.len());
        buf.write_i32::<LittleEndian>(self.protocol_version)?;
        buf.write_u64::<LittleEndian>(self.services.bits())?;
        buf.write_i64::<LittleEndian>(self.timestamp)?;
        buf.write_all(&self.receiver.to_compact_bytes())?;
        buf.write_all(&NetworkAddress::UNSPECIFIED.to_canonical_bytes()?)?;
        buf.write_u64::<LittleEndian>(self.nonce)?;
        if self.has_short_tail() {
            buf.write_i32::<LittleEndian>(self.start_height)?;
        } else {
            buf.write_all(&var_str_to_bytes(&self.user_agent)?)?;
            buf.write_i32::<LittleEndian>(self.start_height)?;
            buf.write_u8(self.relay.into())?;
        }

        Ok(buf)
    }
}

impl BitcoinDeserialize for VersionPayload {
    fn read_from(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let protocol_version = reader.read_i32_le()?;
        tracing::trace!("Deserializing version `{}`", protocol_version);
        let services = ServiceIdentifier::from_bits_truncate(reader.read_u64_le()?);
        let timestamp = reader.read_i64_le()?;
        let receiver = NetworkAddress::read_compact(reader)?;
        let sender = NetworkAddress::read_canonical(reader)?;
        let nonce = reader.read_u64_le()?;

        let (user_agent, start_height, relay) = if reader.remaining() == SHORT_TAIL_SIZE {
            (String::new(), reader.read_i32_le()?, false)
        } else {
            let user_agent = reader.read_var_str()?;
            let start_height = reader.read_i32_le()?;
            let relay = match reader.remaining() {
                0 => false,
                _ => reader.read_u8()? != 0x00,
            };
            (user_agent, start_height, relay)
        };

        Ok(Self {
            protocol_version,
            services,
            timestamp,
            receiver,
            sender,
            nonce,
            user_agent,
            start_height,
            relay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{i32_to_bytes_le, u64_to_bytes_le};
    use hex_literal::hex;
    use std::net::Ipv4Addr;

    fn localhost_8000() -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8000)
    }

    fn reference() -> VersionPayload {
        VersionPayload::new(70015, localhost_8000(), localhost_8000())
    }

    #[test]
    fn reference_construction() {
        let payload = reference();
        assert_eq!(payload.protocol_version(), 70015);
        assert_eq!(*payload.services(), ServiceIdentifier::NODE_NETWORK);
        assert_eq!(payload.services().bits(), 0x1);
        assert!(payload.timestamp() > 0);
        assert_eq!(payload.receiver().socket_addr(), localhost_8000());
        assert_eq!(payload.sender().socket_addr(), localhost_8000());
        assert_ne!(payload.nonce(), 0);
        assert_eq!(payload.user_agent(), "");
        assert_eq!(payload.start_height(), 1);
        assert!(!payload.relay());
    }

    #[test]
    fn reference_encodes_to_72_bytes() {
        let bytes = reference().to_bytes().unwrap();
        assert_eq!(bytes.len(), 72);
    }

    #[test]
    fn reference_layout() {
        let payload = reference();
        let bytes = payload.to_bytes().unwrap();
        assert_eq!(&bytes[0..4], &hex!("7f110100"));
        assert_eq!(&bytes[4..12], &hex!("0100000000000000"));
        assert_eq!(&bytes[20..34], &hex!("0100000000000000 7f000001 1f40"));
        assert_eq!(&bytes[34..60], &[0u8; 26]);
        assert_eq!(&bytes[60..68], &u64_to_bytes_le(payload.nonce()));
        assert_eq!(&bytes[68..72], &i32_to_bytes_le(1));
    }

    #[test]
    fn full_tail_carries_user_agent_and_relay() {
        let payload = reference()
            .with_user_agent("/handshake:0.1.0/")
            .unwrap()
            .with_start_height(820000)
            .with_relay(true);
        let bytes = payload.to_bytes().unwrap();
        assert_eq!(bytes.len(), 60 + 8 + 1 + 17 + 4 + 1);
        assert_eq!(bytes[68], 17);
        assert_eq!(&bytes[69..86], b"/handshake:0.1.0/");
        assert_eq!(bytes[bytes.len() - 1], 0x01);
    }

    #[test]
    fn relay_alone_selects_full_tail() {
        let bytes = reference().with_relay(true).to_bytes().unwrap();
        assert_eq!(bytes.len(), 74);
        assert_eq!(&bytes[68..], &hex!("00 01000000 01"));
    }

    #[test]
    fn decode_reads_back_fields() {
        let payload = reference()
            .with_user_agent("/Satoshi:25.0.0/")
            .unwrap()
            .with_start_height(-7)
            .with_relay(true);
        let decoded = VersionPayload::from_bytes(&payload.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded.protocol_version(), payload.protocol_version());
        assert_eq!(decoded.services(), payload.services());
        assert_eq!(decoded.timestamp(), payload.timestamp());
        assert_eq!(decoded.receiver(), payload.receiver());
        assert_eq!(decoded.nonce(), payload.nonce());
        assert_eq!(decoded.user_agent(), "/Satoshi:25.0.0/");
        assert_eq!(decoded.start_height(), -7);
        assert!(decoded.relay());
        // the sender slot is a placeholder
        assert_eq!(
            decoded.sender().socket_addr(),
            SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)
        );
    }

    #[test]
    fn decode_short_tail() {
        let payload = reference().with_start_height(123);
        let decoded = VersionPayload::from_bytes(&payload.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.start_height(), 123);
        assert_eq!(decoded.user_agent(), "");
        assert!(!decoded.relay());
    }

    #[test]
    fn decode_full_tail_without_relay_byte() {
        let mut bytes = reference().with_relay(true).to_bytes().unwrap();
        bytes.pop();
        let decoded = VersionPayload::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.start_height(), 1);
        assert!(!decoded.relay());
    }

    #[test]
    fn truncation_is_reported_at_first_missing_field() {
        let bytes = reference().to_bytes().unwrap();
        assert!(matches!(
            VersionPayload::from_bytes(&bytes[..10]),
            Err(WireError::TruncatedInput {
                needed: 8,
                available: 6
            })
        ));
        assert!(matches!(
            VersionPayload::from_bytes(&bytes[..66]),
            Err(WireError::TruncatedInput {
                needed: 8,
                available: 6
            })
        ));
        assert!(matches!(
            VersionPayload::from_bytes(&bytes[..70]),
            Err(WireError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn truncated_address_is_invalid_address() {
        let bytes = reference().to_bytes().unwrap();
        assert!(matches!(
            VersionPayload::from_bytes(&bytes[..30]),
            Err(WireError::InvalidAddress(_))
        ));
        assert!(matches!(
            VersionPayload::from_bytes(&bytes[..50]),
            Err(WireError::InvalidAddress(_))
        ));
    }

    #[test]
    fn oversized_user_agent_is_refused() {
        assert!(matches!(
            reference().with_user_agent("x".repeat(256)),
            Err(WireError::StringTooLong(256))
        ));
    }

    #[test]
    fn fresh_payloads_get_fresh_nonces() {
        assert_ne!(reference().nonce(), reference().nonce());
    }
}

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use getset::{CopyGetters, Getters};

use crate::{
    codec::{u16_to_bytes_be, u64_to_bytes_le, WireReader},
    enums::ServiceIdentifier,
    errors::WireError,
};

/// services(8) + ipv4(4) + port(2)
pub const COMPACT_ADDRESS_SIZE: usize = 14;

/// services(8) + ipv6(16) + port(2)
pub const CANONICAL_ADDRESS_SIZE: usize = 26;

/// Address of a node as carried in the version payload. Only IPv4 is supported.
#[derive(Getters, CopyGetters, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkAddress {
    #[getset(get = "pub")]
    services: ServiceIdentifier,

    #[getset(get_copy = "pub")]
    ip: Ipv4Addr,

    #[getset(get_copy = "pub")]
    port: u16,
}

impl NetworkAddress {
    /// Written as 26 zero bytes in the canonical form.
    pub const UNSPECIFIED: NetworkAddress = NetworkAddress {
        services: ServiceIdentifier::UNNAMED,
        ip: Ipv4Addr::UNSPECIFIED,
        port: 0,
    };

    pub fn new(services: ServiceIdentifier, ip: Ipv4Addr, port: u16) -> Self {
        Self { services, ip, port }
    }

    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip, self.port)
    }

    /// 14-byte form: services LE, the four address octets as-is, port BE.
    pub fn to_compact_bytes(&self) -> [u8; COMPACT_ADDRESS_SIZE] {
        let mut buf = [0u8; COMPACT_ADDRESS_SIZE];
        buf[..8].copy_from_slice(&u64_to_bytes_le(self.services.bits()));
        buf[8..12].copy_from_slice(&self.ip.octets());
        buf[12..].copy_from_slice(&u16_to_bytes_be(self.port));
        buf
    }

    /// 26-byte form with the address as an IPv4-mapped IPv6 address.
    /// `0.0.0.0` is written as the unspecified address `::`.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, WireError> {
        let ipv6 = if self.ip.is_unspecified() {
            Ipv6Addr::UNSPECIFIED
        } else {
            self.ip.to_ipv6_mapped()
        };
        let mut buf = Vec::with_capacity(CANONICAL_ADDRESS_SIZE);
        buf.write_u64::<LittleEndian>(self.services.bits())?;
        buf.write_u128::<BigEndian>(u128::from(ipv6))?;
        buf.write_u16::<BigEndian>(self.port)?;

        Ok(buf)
    }

    pub fn read_compact(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        if reader.remaining() < COMPACT_ADDRESS_SIZE {
            return Err(WireError::InvalidAddress(format!(
                "need {} bytes, {} available",
                COMPACT_ADDRESS_SIZE,
                reader.remaining()
            )));
        }
        let services = ServiceIdentifier::from_bits_truncate(reader.read_u64_le()?);
        let ip = Ipv4Addr::from(reader.read_array::<4>()?);
        let port = reader.read_u16_be()?;

        Ok(Self { services, ip, port })
    }

    /// Reads the 26-byte form. Only IPv4-mapped addresses and the unspecified
    /// address `::` are accepted; anything else is a real IPv6 address.
    pub fn read_canonical(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        if reader.remaining() < CANONICAL_ADDRESS_SIZE {
            return Err(WireError::InvalidAddress(format!(
                "need {} bytes, {} available",
                CANONICAL_ADDRESS_SIZE,
                reader.remaining()
            )));
        }
        let services = ServiceIdentifier::from_bits_truncate(reader.read_u64_le()?);
        let ipv6 = Ipv6Addr::from(reader.read_array::<16>()?);
        let port = reader.read_u16_be()?;
        let ip = if ipv6.is_unspecified() {
            Ipv4Addr::UNSPECIFIED
        } else {
            ipv6.to_ipv4_mapped().ok_or_else(|| {
                WireError::InvalidAddress(format!("{} is not an IPv4 address", ipv6))
            })?
        };

        Ok(Self { services, ip, port })
    }

    pub fn from_compact_bytes(data: &[u8]) -> Result<Self, WireError> {
        Self::read_compact(&mut WireReader::new(data))
    }
}

impl From<SocketAddrV4> for NetworkAddress {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(ServiceIdentifier::NODE_NETWORK, *addr.ip(), addr.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn localhost() -> NetworkAddress {
        NetworkAddress::new(ServiceIdentifier::NODE_NETWORK, Ipv4Addr::LOCALHOST, 8000)
    }

    #[test]
    fn compact_layout() {
        let bytes = localhost().to_compact_bytes();
        assert_eq!(bytes.len(), 14);
        assert_eq!(bytes, hex!("0100000000000000 7f000001 1f40"));
    }

    #[test]
    fn canonical_layout() {
        let bytes = localhost().to_canonical_bytes().unwrap();
        assert_eq!(
            bytes,
            hex!("0100000000000000 00000000000000000000ffff7f000001 1f40")
        );
    }

    #[test]
    fn compact_decode_reads_fields() {
        let addr =
            NetworkAddress::from_compact_bytes(&hex!("0904000000000000 c0a80101 208d")).unwrap();
        assert_eq!(
            *addr.services(),
            ServiceIdentifier::NODE_NETWORK
                | ServiceIdentifier::NODE_WITNESS
                | ServiceIdentifier::NODE_NETWORK_LIMITED
        );
        assert_eq!(
            addr.socket_addr(),
            "192.168.1.1:8333".parse::<SocketAddrV4>().unwrap()
        );
    }

    #[test]
    fn short_input_is_invalid_address() {
        let bytes = localhost().to_compact_bytes();
        assert!(matches!(
            NetworkAddress::from_compact_bytes(&bytes[..13]),
            Err(WireError::InvalidAddress(_))
        ));

        let canonical = localhost().to_canonical_bytes().unwrap();
        let mut reader = WireReader::new(&canonical[..25]);
        assert!(matches!(
            NetworkAddress::read_canonical(&mut reader),
            Err(WireError::InvalidAddress(_))
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn canonical_accepts_zeroed_placeholder() {
        let zeros = [0u8; CANONICAL_ADDRESS_SIZE];
        let addr = NetworkAddress::read_canonical(&mut WireReader::new(&zeros)).unwrap();
        assert_eq!(addr.ip(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(addr.port(), 0);
        assert!(addr.services().is_empty());
    }

    #[test]
    fn canonical_rejects_ipv6() {
        let documentation = hex!("0000000000000000 20010db8000000000000000000000001 208d");
        let loopback = hex!("0000000000000000 00000000000000000000000000000001 208d");
        let compatible = hex!("0000000000000000 0000000000000000000000007f000001 208d");
        for bytes in [documentation, loopback, compatible] {
            let mut reader = WireReader::new(&bytes);
            assert!(matches!(
                NetworkAddress::read_canonical(&mut reader),
                Err(WireError::InvalidAddress(_))
            ));
        }
    }

    #[test]
    fn unspecified_address_is_all_zero() {
        let bytes = NetworkAddress::UNSPECIFIED.to_canonical_bytes().unwrap();
        assert_eq!(bytes, [0u8; CANONICAL_ADDRESS_SIZE]);
        let addr = NetworkAddress::read_canonical(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(addr, NetworkAddress::UNSPECIFIED);
    }

    #[test]
    fn canonical_decode_of_encoded_address() {
        let bytes = localhost().to_canonical_bytes().unwrap();
        let addr = NetworkAddress::read_canonical(&mut WireReader::new(&bytes)).unwrap();
        assert_eq!(addr, localhost());
    }
}

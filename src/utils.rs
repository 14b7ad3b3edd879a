use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use sha2::{Digest, Sha256};

pub const CHECKSUM_SIZE: usize = 4;

/// Computes Bitcoin checksum for given data
pub fn checksum(data: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let hash = hasher.finalize();

    let mut hasher = Sha256::new();
    hasher.update(hash);
    let hash = hasher.finalize();

    let mut buf = [0u8; CHECKSUM_SIZE];
    buf.clone_from_slice(&hash[..CHECKSUM_SIZE]);

    buf
}

/// [`checksum`] read as a big-endian integer, the form kept in the envelope header.
pub fn checksum_u32(data: &[u8]) -> u32 {
    u32::from_be_bytes(checksum(data))
}

/// Current unix time in seconds; a clock set before the epoch reads as 0.
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Random nonce used to detect connections to self. Never zero.
pub fn random_nonce() -> u64 {
    rand::thread_rng().gen_range(1..=u64::MAX)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use quickcheck_macros::quickcheck;

    use super::*;

    #[quickcheck]
    fn checksum_fuzz(data: Vec<u8>) -> bool {
        checksum(&data) == checksum(&data)
    }

    #[quickcheck]
    fn checksum_is_prefix_of_double_sha256(data: Vec<u8>) -> bool {
        let digest = Sha256::digest(Sha256::digest(&data));
        checksum(&data)[..] == digest[..CHECKSUM_SIZE]
    }

    #[test]
    fn checksum_of_empty_data() {
        let data = vec![];
        assert_eq!(checksum(&data), [0x5d, 0xf6, 0xe0, 0xe2]);
        assert_eq!(checksum_u32(&data), 0x5df6e0e2);
    }

    #[test]
    fn checksum_of_hello() {
        assert_eq!(checksum(b"hello"), hex!("9595c9df"));
    }

    #[test]
    fn timestamp_is_after_epoch() {
        assert!(unix_timestamp() > 0);
    }

    #[test]
    fn nonce_is_not_zero() {
        for _ in 0..1000 {
            assert_ne!(random_nonce(), 0);
        }
    }
}

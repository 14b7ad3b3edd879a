//! Wire primitives: fixed-width integers in either byte order, single-byte
//! length prefixed strings, and [`WireReader`], the cursor every structured
//! decoder reads through.
//!
//! Almost all integers on the wire are little-endian. Ports are big-endian.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::errors::WireError;

/// Largest string a single-byte length prefix can describe.
pub const MAX_VAR_STR_LEN: usize = u8::MAX as usize;

fn ensure_len(data: &[u8], needed: usize) -> Result<(), WireError> {
    if data.len() < needed {
        return Err(WireError::TruncatedInput {
            needed,
            available: data.len(),
        });
    }

    Ok(())
}

macro_rules! int_codec {
    ($ty:ty, $width:expr, $write:ident, $read:ident,
     $to_le:ident, $to_be:ident, $from_le:ident, $from_be:ident) => {
        #[doc = concat!("Encodes a `", stringify!($ty), "` as little-endian bytes.")]
        pub fn $to_le(value: $ty) -> [u8; $width] {
            let mut buf = [0u8; $width];
            LittleEndian::$write(&mut buf, value);
            buf
        }

        #[doc = concat!("Encodes a `", stringify!($ty), "` as big-endian bytes.")]
        pub fn $to_be(value: $ty) -> [u8; $width] {
            let mut buf = [0u8; $width];
            BigEndian::$write(&mut buf, value);
            buf
        }

        #[doc = concat!("Decodes a little-endian `", stringify!($ty), "` from the start of `data`.")]
        pub fn $from_le(data: &[u8]) -> Result<$ty, WireError> {
            ensure_len(data, $width)?;
            Ok(LittleEndian::$read(&data[..$width]))
        }

        #[doc = concat!("Decodes a big-endian `", stringify!($ty), "` from the start of `data`.")]
        pub fn $from_be(data: &[u8]) -> Result<$ty, WireError> {
            ensure_len(data, $width)?;
            Ok(BigEndian::$read(&data[..$width]))
        }
    };
}

int_codec!(
    u16, 2, write_u16, read_u16,
    u16_to_bytes_le, u16_to_bytes_be, bytes_to_u16_le, bytes_to_u16_be
);
int_codec!(
    u32, 4, write_u32, read_u32,
    u32_to_bytes_le, u32_to_bytes_be, bytes_to_u32_le, bytes_to_u32_be
);
int_codec!(
    u64, 8, write_u64, read_u64,
    u64_to_bytes_le, u64_to_bytes_be, bytes_to_u64_le, bytes_to_u64_be
);
int_codec!(
    i32, 4, write_i32, read_i32,
    i32_to_bytes_le, i32_to_bytes_be, bytes_to_i32_le, bytes_to_i32_be
);
int_codec!(
    i64, 8, write_i64, read_i64,
    i64_to_bytes_le, i64_to_bytes_be, bytes_to_i64_le, bytes_to_i64_be
);

/// Encodes `value` with a one-byte length prefix.
///
/// Real peers use a CompactSize prefix here; the single-byte form is identical
/// for strings up to 252 bytes and this codec refuses anything over 255.
pub fn var_str_to_bytes(value: &str) -> Result<Vec<u8>, WireError> {
    if value.len() > MAX_VAR_STR_LEN {
        return Err(WireError::StringTooLong(value.len()));
    }

    let mut buf = Vec::with_capacity(value.len() + 1);
    buf.push(value.len() as u8);
    buf.extend_from_slice(value.as_bytes());

    Ok(buf)
}

/// Reads a length-prefixed string, returning it with the unconsumed rest of `data`.
pub fn read_var_str(data: &[u8]) -> Result<(String, &[u8]), WireError> {
    let mut reader = WireReader::new(data);
    let value = reader.read_var_str()?;

    Ok((value, reader.rest()))
}

/// Forward-only cursor over a borrowed buffer.
///
/// Every read checks the remaining length first and advances past the field,
/// so decoders never index relative to the end of the buffer.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The bytes not consumed yet.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let rest = self.rest();
        ensure_len(rest, len)?;
        self.pos += len;

        Ok(&rest[..len])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);

        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16, WireError> {
        bytes_to_u16_be(self.read_bytes(2)?)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, WireError> {
        bytes_to_u32_le(self.read_bytes(4)?)
    }

    pub fn read_u64_le(&mut self) -> Result<u64, WireError> {
        bytes_to_u64_le(self.read_bytes(8)?)
    }

    pub fn read_i32_le(&mut self) -> Result<i32, WireError> {
        bytes_to_i32_le(self.read_bytes(4)?)
    }

    pub fn read_i64_le(&mut self) -> Result<i64, WireError> {
        bytes_to_i64_le(self.read_bytes(8)?)
    }

    pub fn read_var_str(&mut self) -> Result<String, WireError> {
        let len = self.read_u8()? as usize;
        let bytes = self.read_bytes(len)?;

        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

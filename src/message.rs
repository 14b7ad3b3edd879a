use crate::{codec::WireReader, enums::Chain, errors::WireError, utils::checksum_u32};
use byteorder::{LittleEndian, WriteBytesExt};
use getset::{CopyGetters, Getters};
use std::{fmt::Display, io::Write};

/// Max payload size, as per Bitcoin protocol docs
pub const MAX_SIZE: usize = 32 * 1024 * 1024;

pub const COMMAND_NAME_SIZE: usize = 12;

/// magic(4) + command(12) + length(4) + checksum(4)
pub const HEADER_SIZE: usize = 24;

/// Trait defining a data structure that can be serialized to bitcoin protocol "wire" data without any outside input.
pub trait BitcoinSerialize {
    /// Performs the serialization.
    fn to_bytes(&self) -> Result<Vec<u8>, WireError>;
}

pub trait BitcoinDeserialize: Sized {
    /// Reads `Self` at the reader's position, leaving it just past the last consumed byte.
    fn read_from(reader: &mut WireReader<'_>) -> Result<Self, WireError>;

    /// Constructs `Self` from binary data.
    fn from_bytes(data: &[u8]) -> Result<Self, WireError> {
        Self::read_from(&mut WireReader::new(data))
    }
}

/// Nul-padded ASCII name identifying what the payload contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command([u8; COMMAND_NAME_SIZE]);

impl Command {
    pub const VERSION: Command = Command(*b"version\0\0\0\0\0");

    /// Wraps raw header bytes as they appeared on the wire, padding included.
    pub const fn from_raw(bytes: [u8; COMMAND_NAME_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a command from its name. The name is checked for being ASCII string up to [`COMMAND_NAME_SIZE`] bytes.
    pub fn new(name: &str) -> Result<Self, WireError> {
        if name.len() > COMMAND_NAME_SIZE {
            return Err(WireError::CommandNameTooLong);
        }
        if !name.is_ascii() {
            return Err(WireError::CommandNameNonAscii);
        }
        let mut bytes = [0u8; COMMAND_NAME_SIZE];
        bytes[..name.len()].copy_from_slice(name.as_bytes());

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; COMMAND_NAME_SIZE] {
        &self.0
    }

    /// The name without trailing padding. Non-ASCII bytes are replaced.
    pub fn name(&self) -> String {
        let end = self
            .0
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<&str> for Command {
    type Error = WireError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Command::new(value)
    }
}

/// A single framed message: 24-byte header followed by the payload.
#[derive(Getters, CopyGetters, Debug, Clone, PartialEq, Eq)]
pub struct MessageEnvelope {
    /// Magic value indicating the originating network.
    #[getset(get_copy = "pub")]
    magic: u32,

    #[getset(get_copy = "pub")]
    command: Command,

    /// Payload size as declared in the header.
    #[getset(get_copy = "pub")]
    length: u32,

    /// First four bytes of the payload's double SHA-256, read big-endian.
    #[getset(get_copy = "pub")]
    checksum: u32,

    #[getset(get = "pub")]
    payload: Vec<u8>,
}

impl MessageEnvelope {
    /// Frames `payload` for `chain`, computing length and checksum.
    pub fn new(chain: Chain, command: Command, payload: Vec<u8>) -> Result<Self, WireError> {
        let checksum = checksum_u32(&payload);
        Self::from_parts(chain.magic(), command, checksum, payload)
    }

    /// Frames `payload` with a caller-chosen magic and checksum. The checksum is not checked.
    pub fn from_parts(
        magic: u32,
        command: Command,
        checksum: u32,
        payload: Vec<u8>,
    ) -> Result<Self, WireError> {
        if payload.len() > MAX_SIZE {
            return Err(WireError::PayloadTooBig);
        }

        Ok(Self {
            magic,
            command,
            length: payload.len() as u32,
            checksum,
            payload,
        })
    }

    /// `true` if the declared length and checksum both match the payload.
    pub fn verify(&self) -> bool {
        self.length as usize == self.payload.len() && self.checksum == checksum_u32(&self.payload)
    }

    pub fn chain(&self) -> Result<Chain, WireError> {
        Chain::from_magic(self.magic)
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Decodes one frame from the front of `data`, returning it with the bytes that follow it.
    pub fn decode_frame(data: &[u8]) -> Result<(Self, &[u8]), WireError> {
        let mut reader = WireReader::new(data);
        let envelope = Self::read_from(&mut reader)?;

        Ok((envelope, reader.rest()))
    }
}

/// Verifies an envelope's length and checksum against its payload.
pub fn verify(envelope: &MessageEnvelope) -> bool {
    envelope.verify()
}

impl BitcoinSerialize for MessageEnvelope {
    fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.write_u32::<LittleEndian>(self.magic)?;
        buf.write_all(self.command.as_bytes())?;
        buf.write_u32::<LittleEndian>(self.length)?;
        buf.write_u32::<LittleEndian>(self.checksum)?;
        buf.write_all(&self.payload)?;

        Ok(buf)
    }
}

impl BitcoinDeserialize for MessageEnvelope {
    fn read_from(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        if reader.remaining() < HEADER_SIZE {
            return Err(WireError::InsufficientHeader {
                available: reader.remaining(),
            });
        }
        let magic = reader.read_u32_le()?;
        let command = Command::from_raw(reader.read_array()?);
        let length = reader.read_u32_le()?;
        let checksum = reader.read_u32_le()?;
        tracing::trace!("Deserializing `{}` header, {} byte payload", command, length);

        if reader.remaining() < length as usize {
            return Err(WireError::InsufficientPayload {
                declared: length,
                available: reader.remaining(),
            });
        }
        if length as usize > MAX_SIZE {
            return Err(WireError::PayloadTooBig);
        }
        let payload = reader.read_bytes(length as usize)?.to_vec();

        Ok(Self {
            magic,
            command,
            length,
            checksum,
            payload,
        })
    }
}

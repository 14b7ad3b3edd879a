use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

use tracing::{debug, trace, warn};

use crate::{
    enums::Chain,
    errors::{FailureKind, HandshakeError, WireError},
    message::{BitcoinDeserialize, BitcoinSerialize, Command, MessageEnvelope},
    transport::{Connection, ScopedConnection, Transport},
    version::{VersionPayload, DEFAULT_START_HEIGHT},
    PROTOCOL_VERSION,
};

/// Upper bound of the single read waiting for the peer's reply.
pub const REPLY_BUFFER_SIZE: usize = 1024;

/// Port of a regtest node listening on its default address.
pub const DEFAULT_PEER_PORT: u16 = 18445;

/// Port advertised as ours in the sender address.
pub const DEFAULT_LOCAL_PORT: u16 = 8000;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    Connected,
    VersionSent,
    AwaitingReply,
    Completed,
    Failed(FailureKind),
}

/// Parameters of a handshake attempt.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    pub chain: Chain,
    pub peer: SocketAddrV4,
    pub protocol_version: i32,
    /// Our own address as put in the version payload.
    pub local_addr: SocketAddrV4,
    pub read_timeout: Option<Duration>,
    pub user_agent: String,
    pub start_height: i32,
    pub relay: bool,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            chain: Chain::Regtest,
            peer: SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PEER_PORT),
            protocol_version: PROTOCOL_VERSION,
            local_addr: SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_LOCAL_PORT),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            user_agent: String::new(),
            start_height: DEFAULT_START_HEIGHT,
            relay: false,
        }
    }
}

impl HandshakeConfig {
    pub fn new(chain: Chain, peer: SocketAddrV4) -> Self {
        Self {
            chain,
            peer,
            ..Default::default()
        }
    }

    pub fn with_protocol_version(mut self, protocol_version: i32) -> Self {
        self.protocol_version = protocol_version;
        self
    }

    pub fn with_local_addr(mut self, local_addr: SocketAddrV4) -> Self {
        self.local_addr = local_addr;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_start_height(mut self, start_height: i32) -> Self {
        self.start_height = start_height;
        self
    }

    pub fn with_relay(mut self, relay: bool) -> Self {
        self.relay = relay;
        self
    }

    fn version_payload(&self) -> Result<VersionPayload, WireError> {
        Ok(
            VersionPayload::new(self.protocol_version, self.peer, self.local_addr)
                .with_user_agent(self.user_agent.as_str())?
                .with_start_height(self.start_height)
                .with_relay(self.relay),
        )
    }
}

/// Sends our `version` message to one peer and checks that it answers with its own.
pub struct Handshake<T: Transport> {
    config: HandshakeConfig,
    transport: T,
    state: HandshakeState,
}

impl<T: Transport> Handshake<T> {
    pub fn new(config: HandshakeConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            state: HandshakeState::Idle,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Runs one attempt from [`HandshakeState::Idle`]. On success returns the peer's reply envelope.
    pub fn run(&mut self) -> Result<MessageEnvelope, HandshakeError> {
        self.state = HandshakeState::Idle;
        let result = self.exchange();
        match &result {
            Ok(_) => self.transition(HandshakeState::Completed),
            Err(e) => self.transition(HandshakeState::Failed(e.kind())),
        }

        result
    }

    fn transition(&mut self, next: HandshakeState) {
        debug!("Handshake {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn exchange(&mut self) -> Result<MessageEnvelope, HandshakeError> {
        let addr = SocketAddr::V4(self.config.peer);
        let conn = self
            .transport
            .connect(addr)
            .map_err(|source| HandshakeError::Connect { addr, source })?;
        let mut conn = ScopedConnection::new(conn);
        self.transition(HandshakeState::Connected);

        let payload = self.config.version_payload()?;
        trace!("Sending {:?}", payload);
        let envelope =
            MessageEnvelope::new(self.config.chain, Command::VERSION, payload.to_bytes()?)?;
        let bytes = envelope.to_bytes()?;
        conn.write(&bytes).map_err(HandshakeError::Send)?;
        debug!("TX {} bytes", bytes.len());
        self.transition(HandshakeState::VersionSent);

        conn.set_read_timeout(self.config.read_timeout)
            .map_err(HandshakeError::Receive)?;
        self.transition(HandshakeState::AwaitingReply);
        let reply = conn
            .read(REPLY_BUFFER_SIZE)
            .map_err(HandshakeError::Receive)?;
        debug!("RX {} bytes", reply.len());

        let (reply, _) = MessageEnvelope::decode_frame(&reply)?;
        self.inspect(&reply);
        if reply.command() != Command::VERSION {
            return Err(HandshakeError::UnexpectedCommand(reply.command().name()));
        }

        Ok(reply)
    }

    /// Logs anomalies in the reply that do not decide the outcome.
    fn inspect(&self, reply: &MessageEnvelope) {
        if reply.magic() != self.config.chain.magic() {
            warn!(
                "Reply magic {:#010x} does not match {} ({:#010x})",
                reply.magic(),
                self.config.chain,
                self.config.chain.magic()
            );
        }
        if !reply.verify() {
            warn!("Reply `{}` failed checksum verification", reply.command());
        }
        if reply.command() == Command::VERSION {
            match VersionPayload::from_bytes(reply.payload()) {
                Ok(version) => debug!(
                    "Peer runs protocol {} ({:?}) at height {}",
                    version.protocol_version(),
                    version.user_agent(),
                    version.start_height()
                ),
                Err(e) => debug!("Could not decode peer version payload: {}", e),
            }
        }
    }
}

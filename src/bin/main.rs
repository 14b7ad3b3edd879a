use btc_handshake::enums::Chain;
use btc_handshake::handshake::{Handshake, HandshakeConfig, DEFAULT_LOCAL_PORT};
use btc_handshake::transport::TcpTransport;
use btc_handshake::version::DEFAULT_START_HEIGHT;
use btc_handshake::PROTOCOL_VERSION;
use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::time::Duration;
use tracing::{error, info, Level};

/// Performs a Bitcoin protocol version handshake with a single peer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Peer to connect to, as host:port
    #[arg(short, long, default_value = "127.0.0.1:18445")]
    peer: String,

    /// Network whose magic value frames the messages
    #[arg(short, long, default_value_t = Chain::Regtest)]
    chain: Chain,

    #[arg(long, default_value_t = PROTOCOL_VERSION)]
    protocol_version: i32,

    /// Address advertised as ours in the version payload
    #[arg(long, default_value_t = SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_LOCAL_PORT))]
    local_addr: SocketAddrV4,

    #[arg(long, default_value = "")]
    user_agent: String,

    #[arg(long, default_value_t = DEFAULT_START_HEIGHT)]
    start_height: i32,

    /// Ask the peer to relay transactions
    #[arg(long)]
    relay: bool,

    /// Seconds to wait for the TCP connection
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    /// Seconds to wait for the reply, 0 waits forever
    #[arg(long, default_value_t = 30)]
    read_timeout: u64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn resolve_ipv4(peer: &str) -> color_eyre::Result<SocketAddrV4> {
    peer.to_socket_addrs()
        .wrap_err_with(|| format!("could not resolve `{}`", peer))?
        .find_map(|addr| match addr {
            SocketAddr::V4(addr) => Some(addr),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| eyre!("`{}` has no IPv4 address", peer))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let peer = resolve_ipv4(&args.peer)?;
    let read_timeout = match args.read_timeout {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let config = HandshakeConfig::new(args.chain, peer)
        .with_protocol_version(args.protocol_version)
        .with_local_addr(args.local_addr)
        .with_read_timeout(read_timeout)
        .with_user_agent(args.user_agent)
        .with_start_height(args.start_height)
        .with_relay(args.relay);
    let transport = TcpTransport::new(Some(Duration::from_secs(args.connect_timeout)));

    info!("Handshaking with {} on {}", peer, args.chain);
    let attempt = tokio::task::spawn_blocking(move || {
        let mut handshake = Handshake::new(config, transport);
        let result = handshake.run();
        (handshake.state(), result)
    });

    tokio::select! {
        joined = attempt => {
            let (state, result) = joined?;
            match result {
                Ok(reply) => {
                    info!(
                        "Handshake completed, peer replied with `{}` ({} byte payload)",
                        reply.command(),
                        reply.length()
                    );
                    Ok(())
                }
                Err(e) => {
                    error!("Handshake ended in {:?}", state);
                    Err(e).wrap_err_with(|| format!("handshake with {} failed", peer))
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            // the blocking read cannot be cancelled; leave it to the OS
            error!("Interrupted while handshaking with {}", peer);
            std::process::exit(130);
        }
    }
}

//! Socket establishment.
//!
//! [`establish`] opens a UDP/IPv4 socket and walks it through resolution,
//! option setup, bind, then exactly one of two paths: a source-specific
//! multicast group join (multicast bind address) or a `connect` to the
//! remote peer (unicast or wildcard bind address). TTL and the outbound
//! interface are configured only when the destination itself is a
//! multicast group.

use std::io;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;
use std::net::UdpSocket;

use crate::config::MtuCell;
use crate::config::NetConfig;
use crate::resolve::resolve_v4;
use crate::sockopt::OptStatus;
use crate::sockopt::SockOps;
use crate::sockopt::SysSock;
use crate::Error;
use crate::Result;

/// Send and receive buffer size requested on every socket: 512 KiB,
/// enough for half a second of an 8 Mb/s stream when the scheduler
/// stalls.
pub const SOCKET_BUFFER_SIZE: usize = 0x8_0000;

/// One socket establishment request.
///
/// An empty `bind_addr` binds every interface and enables broadcast
/// reception; a multicast (class D) `bind_addr` joins that group,
/// filtered to datagrams sent by `server_addr`. Any other `bind_addr`
/// binds it and connects the socket to `server_addr:server_port`.
#[derive(Clone, Debug, Default)]
pub struct SocketRequest {
    pub bind_addr: String,

    pub bind_port: u16,

    /// Remote peer for unicast, or the expected datagram source for a
    /// multicast join.
    pub server_addr: String,

    pub server_port: u16,

    /// Multicast time-to-live; zero or negative falls back to the
    /// configured default.
    pub ttl: i32,

    /// Outbound multicast interface address; `None` falls back to the
    /// configured default, then to any interface.
    pub miface_addr: Option<String>,
}

/// A ready socket and the MTU to use on it.
///
/// The socket is exclusively owned by the holder; dropping it closes the
/// descriptor.
#[derive(Debug)]
pub struct EstablishedSocket {
    pub socket: UdpSocket,
    pub mtu: u32,
}

/// Opens, binds and configures a UDP/IPv4 socket for `req`.
///
/// Returns either a fully configured socket or no socket at all: on every
/// error path the descriptor created here is closed before the error
/// surfaces.
pub fn establish(
    req: &SocketRequest, cfg: &NetConfig, mtu: &MtuCell,
) -> Result<EstablishedSocket> {
    let bind_addr = resolve_v4(&req.bind_addr, req.bind_port)?;

    let sock = SysSock::open().map_err(|e| {
        error!("cannot create socket ({})", e);
        Error::CreateSocket(e)
    })?;

    // On error `sock` drops here, closing the descriptor.
    configure(&sock, bind_addr, req, cfg)?;

    let socket: UdpSocket = sock.into_socket().into();

    Ok(EstablishedSocket {
        socket,
        mtu: mtu.get_or_init(cfg.mtu),
    })
}

/// Runs the ordered option/bind/join-or-connect sequence on an open
/// socket. Generic over [`SockOps`] so every branch can be driven by a
/// mock.
fn configure<S: SockOps>(
    sock: &S, bind_addr: SocketAddrV4, req: &SocketRequest, cfg: &NetConfig,
) -> Result<()> {
    // Reuse and buffer sizing are robustness hints; their failure never
    // fails the call.
    if let Err(e) = sock.set_reuse_address() {
        debug!("cannot configure socket (SO_REUSEADDR: {})", e);
    }
    match sock.set_reuse_port() {
        OptStatus::Applied => (),
        OptStatus::Unsupported => trace!("SO_REUSEPORT not available here"),
        OptStatus::Failed(e) => debug!("cannot configure socket (SO_REUSEPORT: {})", e),
    }
    if let Err(e) = sock.set_recv_buffer(SOCKET_BUFFER_SIZE) {
        debug!("cannot configure socket (SO_RCVBUF: {})", e);
    }
    if let Err(e) = sock.set_send_buffer(SOCKET_BUFFER_SIZE) {
        debug!("cannot configure socket (SO_SNDBUF: {})", e);
    }

    let group_bind = bind_addr.ip().is_multicast();

    let effective_bind = if group_bind && !sock.multicast_bind_supported() {
        // Bind the wildcard instead; the membership below still steers
        // group traffic to this socket.
        warn!(
            "cannot bind multicast address {} here, binding {} instead",
            bind_addr.ip(),
            Ipv4Addr::UNSPECIFIED
        );
        SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, bind_addr.port())
    } else {
        bind_addr
    };

    sock.bind(effective_bind).map_err(|e| {
        error!("cannot bind socket to {} ({})", effective_bind, e);
        Error::Bind(e)
    })?;

    // Allow broadcast reception when bound to every interface.
    if req.bind_addr.is_empty() {
        match sock.set_broadcast() {
            OptStatus::Applied => (),
            OptStatus::Unsupported => trace!("SO_BROADCAST not available here"),
            OptStatus::Failed(e) => {
                warn!("cannot configure socket (SO_BROADCAST: {})", e)
            },
        }
    }

    if group_bind {
        join_group(sock, *bind_addr.ip(), req, cfg)
    } else {
        connect_peer(sock, req, cfg)
    }
}

/// Joins the multicast group the socket was bound to, filtered to the
/// source named by the request.
///
/// Only the source-specific membership form is issued, so that IGMPv3
/// aware hosts on IGMPv3 aware networks send a source-filtered query.
/// There is no fallback to an any-source join.
fn join_group<S: SockOps>(
    sock: &S, group: Ipv4Addr, req: &SocketRequest, cfg: &NetConfig,
) -> Result<()> {
    let source = *resolve_v4(&req.server_addr, req.server_port)?.ip();
    let iface = join_iface(req, cfg);

    debug!(
        "source specific join of {} (source {}, interface {})",
        group, source, iface
    );

    match sock.join_source_group(group, source, iface) {
        OptStatus::Applied => Ok(()),
        OptStatus::Unsupported => {
            error!("no source specific multicast membership on this platform");
            Err(Error::JoinGroup(io::Error::new(
                io::ErrorKind::Unsupported,
                "no source specific multicast membership on this platform",
            )))
        },
        OptStatus::Failed(e) => {
            error!(
                "source specific multicast failed ({}) - check if the OS \
                 really supports IGMPv3",
                e
            );
            Err(Error::JoinGroup(e))
        },
    }
}

/// Interface selector for the group join: the request's address if it
/// parses, else the configured one, else any interface.
fn join_iface(req: &SocketRequest, cfg: &NetConfig) -> Ipv4Addr {
    let named = req
        .miface_addr
        .as_deref()
        .or(cfg.miface_addr.as_deref())
        .filter(|s| !s.is_empty());

    match named {
        Some(s) => match s.parse() {
            Ok(addr) => addr,
            Err(_) => {
                warn!("ignoring unparseable interface address {}", s);
                Ipv4Addr::UNSPECIFIED
            },
        },
        None => Ipv4Addr::UNSPECIFIED,
    }
}

/// Connects the socket to the remote peer, then configures the outbound
/// interface and TTL when that peer is a multicast group.
fn connect_peer<S: SockOps>(
    sock: &S, req: &SocketRequest, cfg: &NetConfig,
) -> Result<()> {
    let server = resolve_v4(&req.server_addr, req.server_port)?;

    sock.connect(server).map_err(|e| {
        error!("cannot connect socket to {} ({})", server, e);
        Error::Connect(e)
    })?;

    if !server.ip().is_multicast() {
        return Ok(());
    }

    let named = req
        .miface_addr
        .as_deref()
        .or(cfg.miface_addr.as_deref())
        .filter(|s| !s.is_empty());

    if let Some(s) = named {
        let iface: Ipv4Addr = s.parse().map_err(|_| {
            Error::MulticastInterface(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}: not an IPv4 interface address", s),
            ))
        })?;
        sock.set_multicast_if(iface).map_err(|e| {
            error!("failed to set multicast interface {} ({})", iface, e);
            Error::MulticastInterface(e)
        })?;
    }

    let ttl = if req.ttl > 0 { req.ttl } else { cfg.ttl };
    if ttl > 0 {
        set_ttl(sock, ttl)?;
    }

    Ok(())
}

/// Sets the multicast TTL. The option's width differs across stacks:
/// BSD documents a byte, others an int, so try the byte form first and
/// retry the integer way.
fn set_ttl<S: SockOps>(sock: &S, ttl: i32) -> Result<()> {
    if let Err(e) = sock.set_multicast_ttl_byte(ttl as u8) {
        debug!("failed to set ttl as a byte ({}), trying the integer way", e);

        sock.set_multicast_ttl_int(ttl as u32).map_err(|e| {
            error!("failed to set ttl ({})", e);
            Error::MulticastTtl(e)
        })?;
    }

    Ok(())
}

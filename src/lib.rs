//! UDP/IPv4 socket establishment.
//!
//! Turns a logical request (bind address/port, remote peer, multicast TTL,
//! source filter, outbound interface) into a bound, fully configured
//! datagram socket plus the MTU to use on it. Unicast, broadcast and
//! source-specific multicast binds each get the socket options and
//! membership calls they need, in the right order.
//!
//! ```no_run
//! use udp4_net::{establish, MtuCell, NetConfig, SocketRequest};
//!
//! let req = SocketRequest {
//!     bind_addr: String::new(),
//!     bind_port: 5004,
//!     server_addr: "203.0.113.9".to_string(),
//!     server_port: 5004,
//!     ..Default::default()
//! };
//!
//! let mtu = MtuCell::new();
//! let out = establish(&req, &NetConfig::default(), &mtu)?;
//! println!("ready on {:?}, mtu {}", out.socket.local_addr(), out.mtu);
//! # Ok::<(), udp4_net::Error>(())
//! ```

#[macro_use]
extern crate log;

use std::io;

pub mod config;
pub mod establish;
pub mod resolve;
pub mod sockopt;

pub use crate::config::MtuCell;
pub use crate::config::NetConfig;
pub use crate::establish::establish;
pub use crate::establish::EstablishedSocket;
pub use crate::establish::SocketRequest;

/// A socket establishment error.
///
/// Every variant is terminal for the call that produced it; the socket
/// descriptor, if one was created, has already been closed when the error
/// is returned.
#[derive(Debug)]
pub enum Error {
    /// Name resolution produced no usable IPv4 address.
    Resolution(String),

    /// The datagram socket could not be created.
    CreateSocket(io::Error),

    /// The socket could not be bound to the local address.
    Bind(io::Error),

    /// The source-specific multicast group join was refused or is not
    /// available on this platform.
    JoinGroup(io::Error),

    /// The socket could not be connected to the remote peer.
    Connect(io::Error),

    /// The outbound multicast interface could not be configured.
    MulticastInterface(io::Error),

    /// The multicast time-to-live could not be set, in either its byte or
    /// its integer form.
    MulticastTtl(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Resolution(msg) => write!(f, "cannot resolve address: {}", msg),
            Error::CreateSocket(e) => write!(f, "cannot create socket: {}", e),
            Error::Bind(e) => write!(f, "cannot bind socket: {}", e),
            Error::JoinGroup(e) => write!(
                f,
                "source specific multicast join failed: {} - check if the OS really supports IGMPv3",
                e
            ),
            Error::Connect(e) => write!(f, "cannot connect socket: {}", e),
            Error::MulticastInterface(e) => {
                write!(f, "failed to set multicast interface: {}", e)
            },
            Error::MulticastTtl(e) => write!(f, "failed to set multicast ttl: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Resolution(_) => None,

            Error::CreateSocket(e) |
            Error::Bind(e) |
            Error::JoinGroup(e) |
            Error::Connect(e) |
            Error::MulticastInterface(e) |
            Error::MulticastTtl(e) => Some(e),
        }
    }
}

/// A specialized [`Result`](std::result::Result) type for socket
/// establishment operations.
pub type Result<T> = std::result::Result<T, Error>;

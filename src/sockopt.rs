//! Socket option capability probes.
//!
//! Everything platform-conditional about datagram socket setup (reuse-port,
//! broadcast, source-specific membership, the byte-vs-int width of the
//! multicast TTL option, whether a multicast address can be bound directly)
//! sits behind the [`SockOps`] trait, so the establishment logic stays
//! platform-agnostic and can run against a mock in tests.

use std::io;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;

use socket2::Domain;
use socket2::Protocol;
use socket2::Socket;
use socket2::Type;

/// Outcome of a single option probe.
#[derive(Debug)]
pub enum OptStatus {
    /// The option was set.
    Applied,

    /// The platform has no notion of this option.
    Unsupported,

    /// The platform knows the option but refused it.
    Failed(io::Error),
}

/// Option calls issued while configuring a datagram socket.
///
/// Methods returning [`OptStatus`] are probes whose failure the caller may
/// tolerate; methods returning [`io::Result`] either apply or fail.
pub trait SockOps {
    fn bind(&self, addr: SocketAddrV4) -> io::Result<()>;

    fn connect(&self, addr: SocketAddrV4) -> io::Result<()>;

    fn set_reuse_address(&self) -> io::Result<()>;

    fn set_reuse_port(&self) -> OptStatus;

    fn set_recv_buffer(&self, bytes: usize) -> io::Result<()>;

    fn set_send_buffer(&self, bytes: usize) -> io::Result<()>;

    fn set_broadcast(&self) -> OptStatus;

    /// Joins `group` filtered to datagrams sent by `source`, on the given
    /// interface (`0.0.0.0` for any). Platforms without source-specific
    /// membership report [`OptStatus::Unsupported`].
    fn join_source_group(
        &self, group: Ipv4Addr, source: Ipv4Addr, iface: Ipv4Addr,
    ) -> OptStatus;

    fn set_multicast_if(&self, iface: Ipv4Addr) -> io::Result<()>;

    /// Sets `IP_MULTICAST_TTL` as a single byte, the width BSD stacks
    /// expect.
    fn set_multicast_ttl_byte(&self, ttl: u8) -> io::Result<()>;

    /// Sets `IP_MULTICAST_TTL` as a full integer, the fallback width.
    fn set_multicast_ttl_int(&self, ttl: u32) -> io::Result<()>;

    /// Whether this platform accepts binding a socket to a multicast
    /// address directly. Where it does not, the caller binds the wildcard
    /// address instead and relies on group membership for filtering.
    fn multicast_bind_supported(&self) -> bool;
}

/// Production [`SockOps`] implementation over a `socket2` UDP socket.
pub struct SysSock(Socket);

impl SysSock {
    /// Opens an unbound IPv4 datagram socket.
    pub fn open() -> io::Result<SysSock> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        Ok(SysSock(socket))
    }

    /// Transfers the descriptor out. From here on the caller owns it.
    pub fn into_socket(self) -> Socket {
        self.0
    }

    #[cfg(unix)]
    fn raw_setsockopt_ttl(&self, payload: *const libc::c_void, len: libc::socklen_t) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        let rc = unsafe {
            libc::setsockopt(
                self.0.as_raw_fd(),
                libc::IPPROTO_IP,
                libc::IP_MULTICAST_TTL,
                payload,
                len,
            )
        };

        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

impl SockOps for SysSock {
    fn bind(&self, addr: SocketAddrV4) -> io::Result<()> {
        self.0.bind(&addr.into())
    }

    fn connect(&self, addr: SocketAddrV4) -> io::Result<()> {
        self.0.connect(&addr.into())
    }

    fn set_reuse_address(&self) -> io::Result<()> {
        self.0.set_reuse_address(true)
    }

    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    fn set_reuse_port(&self) -> OptStatus {
        match self.0.set_reuse_port(true) {
            Ok(()) => OptStatus::Applied,
            Err(e) => OptStatus::Failed(e),
        }
    }

    #[cfg(not(all(unix, not(any(target_os = "solaris", target_os = "illumos")))))]
    fn set_reuse_port(&self) -> OptStatus {
        OptStatus::Unsupported
    }

    fn set_recv_buffer(&self, bytes: usize) -> io::Result<()> {
        self.0.set_recv_buffer_size(bytes)
    }

    fn set_send_buffer(&self, bytes: usize) -> io::Result<()> {
        self.0.set_send_buffer_size(bytes)
    }

    fn set_broadcast(&self) -> OptStatus {
        match self.0.set_broadcast(true) {
            Ok(()) => OptStatus::Applied,
            Err(e) => OptStatus::Failed(e),
        }
    }

    #[cfg(not(any(
        target_os = "dragonfly",
        target_os = "haiku",
        target_os = "hurd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "redox",
        target_os = "fuchsia",
        target_os = "nto",
        target_os = "espidf",
        target_os = "vita",
    )))]
    fn join_source_group(
        &self, group: Ipv4Addr, source: Ipv4Addr, iface: Ipv4Addr,
    ) -> OptStatus {
        match self.0.join_ssm_v4(&source, &group, &iface) {
            Ok(()) => OptStatus::Applied,
            Err(e) => OptStatus::Failed(e),
        }
    }

    #[cfg(any(
        target_os = "dragonfly",
        target_os = "haiku",
        target_os = "hurd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "redox",
        target_os = "fuchsia",
        target_os = "nto",
        target_os = "espidf",
        target_os = "vita",
    ))]
    fn join_source_group(
        &self, _group: Ipv4Addr, _source: Ipv4Addr, _iface: Ipv4Addr,
    ) -> OptStatus {
        OptStatus::Unsupported
    }

    fn set_multicast_if(&self, iface: Ipv4Addr) -> io::Result<()> {
        self.0.set_multicast_if_v4(&iface)
    }

    #[cfg(unix)]
    fn set_multicast_ttl_byte(&self, ttl: u8) -> io::Result<()> {
        self.raw_setsockopt_ttl(
            &ttl as *const u8 as *const libc::c_void,
            std::mem::size_of::<u8>() as libc::socklen_t,
        )
    }

    #[cfg(not(unix))]
    fn set_multicast_ttl_byte(&self, _ttl: u8) -> io::Result<()> {
        // Winsock only documents the integer width; let the caller fall
        // back to it.
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    fn set_multicast_ttl_int(&self, ttl: u32) -> io::Result<()> {
        self.0.set_multicast_ttl_v4(ttl)
    }

    fn multicast_bind_supported(&self) -> bool {
        // Winsock refuses to bind a multicast address; everything else
        // handles it.
        !cfg!(windows)
    }
}

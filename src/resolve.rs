//! IPv4 name resolution.

use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::net::SocketAddrV4;
use std::net::ToSocketAddrs;

use crate::Error;
use crate::Result;

/// Resolves `host:port` to a concrete IPv4 socket address.
///
/// An empty `host` means the wildcard (passive) address. A dotted quad is
/// parsed directly, anything else goes through system name resolution and
/// the first IPv4 result wins. Resolution may block on DNS traffic.
pub fn resolve_v4(host: &str, port: u16) -> Result<SocketAddrV4> {
    if host.is_empty() {
        return Ok(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    }

    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(SocketAddrV4::new(ip, port));
    }

    debug!("resolving {}:{}...", host, port);

    let addrs = (host, port).to_socket_addrs().map_err(|e| {
        warn!("{}: {}", host, e);
        Error::Resolution(format!("{}: {}", host, e))
    })?;

    for addr in addrs {
        if let SocketAddr::V4(v4) = addr {
            return Ok(v4);
        }
    }

    warn!("{}: no IPv4 address found", host);
    Err(Error::Resolution(format!("{}: no IPv4 address found", host)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_host_is_wildcard() {
        assert_eq!(
            resolve_v4("", 5004).unwrap(),
            SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 5004)
        );
    }

    #[test]
    fn dotted_quad_parses_without_resolver() {
        assert_eq!(
            resolve_v4("239.1.1.1", 1234).unwrap(),
            SocketAddrV4::new(Ipv4Addr::new(239, 1, 1, 1), 1234)
        );
    }

    #[test]
    fn localhost_resolves_to_loopback() {
        let addr = resolve_v4("localhost", 80).unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 80);
    }

    #[test]
    fn unresolvable_host_is_an_error() {
        // RFC 2606 reserves .invalid, so resolution can never succeed.
        let err = resolve_v4("unresolvable.invalid", 80).unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }
}

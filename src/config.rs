//! Defaults store and the process-wide MTU value.

use once_cell::sync::OnceCell;

/// MTU recorded on sockets when nothing else configured one.
pub const DEFAULT_MTU: u32 = 1500;

/// Defaults consulted when a [`SocketRequest`](crate::SocketRequest)
/// leaves a field unset.
#[derive(Clone, Debug)]
pub struct NetConfig {
    /// Multicast time-to-live used when the request carries none. Zero
    /// or negative leaves the socket's TTL untouched.
    pub ttl: i32,

    /// Outbound multicast interface address used when the request
    /// carries none.
    pub miface_addr: Option<String>,

    /// MTU to install into the shared [`MtuCell`] on first use.
    pub mtu: u32,
}

impl Default for NetConfig {
    fn default() -> NetConfig {
        NetConfig {
            ttl: 0,
            miface_addr: None,
            mtu: DEFAULT_MTU,
        }
    }
}

/// Process-wide MTU value with get-or-init semantics.
///
/// The first caller's default wins and every later read observes it,
/// including reads racing the initialization from other threads. Shared
/// explicitly (usually as a `static`) rather than living in ambient
/// global state.
#[derive(Debug, Default)]
pub struct MtuCell(OnceCell<u32>);

impl MtuCell {
    pub const fn new() -> MtuCell {
        MtuCell(OnceCell::new())
    }

    /// Returns the stored MTU, installing `default` if nothing was
    /// stored yet.
    pub fn get_or_init(&self, default: u32) -> u32 {
        *self.0.get_or_init(|| default)
    }

    /// Returns the stored MTU, if initialized.
    pub fn get(&self) -> Option<u32> {
        self.0.get().copied()
    }
}

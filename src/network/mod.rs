//! Definitions and implementations of the abstract network types
//!
//! The core neither opens sockets nor frames packets; it hands fully
//! serialized messages to a [`NetworkPort`] implementation injected by the
//! host and asks it for transmit timestamps afterwards.

use crate::{datastructures::messages::MessageType, time::Time};


/// Capability flags a [`NetworkPort`] implementation can advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Transmit and receive timestamps are taken by the network hardware
    pub const HARDWARE_TIMESTAMP: Capabilities = Capabilities(1 << 0);
    /// The hardware can insert the origin timestamp on the fly
    pub const ONE_STEP_TX: Capabilities = Capabilities(1 << 1);

    /// The empty capability set
    pub const fn empty() -> Self {
        Capabilities(0)
    }

    /// Whether all capabilities in `other` are present in `self`
    pub const fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    /// The union of two capability sets
    pub const fn union(self, other: Capabilities) -> Capabilities {
        Capabilities(self.0 | other.0)
    }
}

/// Abstraction for sending ptp messages on one network interface
///
/// Receiving is not part of the trait; the host pushes received buffers and
/// their reception timestamps into the port instead.
pub trait NetworkPort {
    /// Type of the error the methods of this port may return
    type Error: core::fmt::Debug;

    /// Send the given data.
    ///
    /// When `event` is true the message is time critical and the
    /// implementation must capture a transmit timestamp for it, retrievable
    /// through [`fetch_tx_timestamp`](NetworkPort::fetch_tx_timestamp).
    fn send(&mut self, data: &[u8], event: bool) -> Result<(), Self::Error>;

    /// Poll for the transmit timestamp of a previously sent event message.
    ///
    /// Returns `Ok(None)` while the timestamp is not available yet. The core
    /// polls once per tick and gives up when the pending exchange expires.
    fn fetch_tx_timestamp(
        &mut self,
        message_type: MessageType,
        sequence_id: u16,
    ) -> Result<Option<Time>, Self::Error>;

    /// The capabilities of this port implementation
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_set_operations() {
        let caps = Capabilities::HARDWARE_TIMESTAMP.union(Capabilities::ONE_STEP_TX);
        assert!(caps.contains(Capabilities::HARDWARE_TIMESTAMP));
        assert!(caps.contains(Capabilities::ONE_STEP_TX));
        assert!(!Capabilities::empty().contains(Capabilities::HARDWARE_TIMESTAMP));
    }
}

//! Hardware and OS agnostic implementation of the core of the IEEE
//! 1588-2019 Precision Time Protocol.
//!
//! The crate contains no I/O: the host injects a [`Clock`] and a
//! [`network::NetworkPort`] per port, pushes every received buffer into
//! [`port::Port::handle_receive`] and calls [`port::Port::tick`] as the
//! scheduling heartbeat. Everything else, from message parsing through the
//! best master clock algorithm to the clock servo, happens inside.

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

use core::fmt::Display;

pub mod bmc;
pub mod clock;
pub mod config;
pub mod datastructures;
pub mod network;
pub mod observability;
pub mod port;
pub mod ptp_instance;
pub mod servo;
pub mod time;

pub use clock::Clock;
pub use ptp_instance::PtpInstance;

use datastructures::common::PortIdentity;
use port::PortState;
use time::Duration;

/// A notification from the core to the host
///
/// Ports queue these in a small bounded buffer; the host drains them with
/// [`port::Port::take_event`] or [`PtpInstance::take_event`] at its own
/// pace. When the queue overflows the oldest entry is dropped and counted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// The protocol state of a port changed
    StateChanged {
        #[allow(missing_docs)]
        port_id: PortIdentity,
        #[allow(missing_docs)]
        old: PortState,
        #[allow(missing_docs)]
        new: PortState,
    },
    /// A hardware or network fault was observed; the port is now faulty
    Fault {
        #[allow(missing_docs)]
        port_id: PortIdentity,
        /// A short static description of what failed
        description: &'static str,
    },
    /// Best effort report of the synchronization quality of a slave port
    SyncStatus {
        #[allow(missing_docs)]
        port_id: PortIdentity,
        /// Whether the servo currently holds its lock
        locked: bool,
        #[allow(missing_docs)]
        offset: Duration,
        #[allow(missing_docs)]
        mean_path_delay: Duration,
    },
}

impl Display for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Event::StateChanged { port_id, old, new } => {
                write!(f, "Port {port_id} went from `{old}` to `{new}`")
            }
            Event::Fault {
                port_id,
                description,
            } => write!(f, "Port {port_id} became faulty: {description}"),
            Event::SyncStatus {
                port_id,
                locked,
                offset,
                mean_path_delay,
            } => write!(
                f,
                "Port {port_id} sync status: locked={locked} offset={offset} delay={mean_path_delay}"
            ),
        }
    }
}

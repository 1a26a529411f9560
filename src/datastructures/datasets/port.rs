use crate::{
    config::DelayMechanism,
    datastructures::common::{PortIdentity, TimeInterval},
    port::PortState,
};

/// A read-only view of the PTP Port dataset (IEEE1588-2019 section 8.2.15)
///
/// Assembled on demand from the port configuration and the dynamic port
/// state; hosts use it for observability and cross-port aggregation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortDS {
    /// See *IEEE1588-2019 section 8.2.15.2.1*
    pub port_identity: PortIdentity,
    /// See *IEEE1588-2019 section 8.2.15.3.1*
    pub port_state: PortState,
    /// See *IEEE1588-2019 section 8.2.15.4.1*
    pub log_announce_interval: i8,
    /// See *IEEE1588-2019 section 8.2.15.4.2*
    pub announce_receipt_timeout: u8,
    /// See *IEEE1588-2019 section 8.2.15.4.3*
    pub log_sync_interval: i8,
    /// See *IEEE1588-2019 section 8.2.15.4.4*
    pub delay_mechanism: DelayMechanism,
    /// The mean propagation delay on the link attached to this port, only
    /// meaningful when the peer to peer delay mechanism is in use. See
    /// *IEEE1588-2019 section 8.2.15.3.3*
    pub mean_link_delay: TimeInterval,
    /// See *IEEE1588-2019 section 8.2.15.4.6*
    pub version_number: u8,
    /// See *IEEE1588-2019 section 8.2.15.4.7*
    pub minor_version_number: u8,
}

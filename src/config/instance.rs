use crate::config::{ClockIdentity, ClockQuality, SdoId};

/// Configuration of the ptp instance as a whole
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceConfig {
    /// The unique identity of this clock
    pub clock_identity: ClockIdentity,
    /// First priority in the best master selection, lower is better,
    /// default 128
    pub priority_1: u8,
    /// Second priority in the best master selection, lower is better,
    /// default 128
    pub priority_2: u8,
    /// The PTP domain to participate in, 0..=127
    pub domain_number: u8,
    /// The advertised quality of the local clock
    pub clock_quality: ClockQuality,
    /// When set the instance never acts as a master
    pub slave_only: bool,
    /// The sdo id of the instance
    pub sdo_id: SdoId,
}

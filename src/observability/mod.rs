//! Serializable views of the instance state and the per-port health
//! counters
#![allow(missing_docs)]

mod current;
mod default;
mod parent;

pub use current::CurrentDS;
pub use default::DefaultDS;
pub use parent::ParentDS;

use crate::{
    datastructures::datasets::{PortDS, TimePropertiesDS},
    servo::LockState,
};

/// Everything a host can observe about one port, taken as one consistent
/// snapshot
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObservablePortState {
    pub default_ds: DefaultDS,
    pub current_ds: CurrentDS,
    pub parent_ds: ParentDS,
    pub time_properties_ds: TimePropertiesDS,
    pub port_ds: PortDS,
    pub servo_lock: LockState,
    pub statistics: PortStatistics,
}

/// Monotonic event counters of a port
///
/// Every dropped or anomalous message shows up in exactly one of these;
/// there is no silent success and no silent failure.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortStatistics {
    /// Messages that passed validation and were processed
    pub messages_received: u64,
    /// Messages handed to the network port for transmission
    pub messages_sent: u64,
    /// Ingress messages dropped by parse or field validation
    pub validations_failed: u64,
    /// Accepted messages whose sequence number did not follow its
    /// predecessor
    pub unexpected_sequences: u64,
    /// Delay responses rejected for not matching the outstanding request
    pub sequence_mismatches: u64,
    /// Exchanges abandoned because the hardware produced no transmit
    /// timestamp
    pub timestamps_unavailable: u64,
    /// Timestamp pairs that violated their expected order
    pub ordering_violations: u64,
    /// Events that were not legal in the state they arrived in
    pub state_machine_errors: u64,
    /// Announces dropped because the foreign master list was full
    pub foreign_overflows: u64,
    /// Completed best master clock algorithm runs
    pub bmca_selections: u64,
    /// Foreign master records created or refreshed
    pub bmca_candidate_updates: u64,
    /// Selections won by the local clock
    pub bmca_local_wins: u64,
    /// Selections won by a foreign master
    pub bmca_foreign_wins: u64,
    /// Selections that ended in the passive tiebreak
    pub bmca_passive_wins: u64,
    /// Steps requested from the clock because the offset exceeded the step
    /// threshold
    pub clock_steps: u64,
    /// Notifications dropped because the host did not drain the event queue
    pub events_dropped: u64,
}

/// Failure toggles for exercising error paths in tests
///
/// All flags default to off; production code never sets them.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FaultInjection {
    /// Pretend the hardware never delivers transmit timestamps
    pub swallow_tx_timestamps: bool,
    /// Report every send as failed
    pub fail_sends: bool,
}

use crate::time::{Duration, Interval};

/// Which delay mechanism a port is using
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DelayMechanism {
    /// End to end delay mechanism. Delay measurement is done directly to the
    /// chosen master, across potential transparent nodes in between.
    ///
    /// the interval corresponds to the PortDS logMinDelayReqInterval
    E2E {
        #[allow(missing_docs)]
        interval: Interval,
    },
    /// Peer to peer delay mechanism. The delay of the directly attached link
    /// is measured with the three message pdelay exchange, in every port
    /// state.
    ///
    /// the interval corresponds to the PortDS logMinPdelayReqInterval
    P2P {
        #[allow(missing_docs)]
        interval: Interval,
    },
}

/// Configuration items of the PTP PortDS dataset. Dynamical fields are kept
/// as part of [`Port`](crate::port::Port).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortConfig {
    /// The delay mechanism to use on this port
    pub delay_mechanism: DelayMechanism,
    /// Pacing of announce messages, the PortDS logAnnounceInterval
    pub announce_interval: Interval,
    /// Multiplier for the announce receipt timeout; at least 2
    pub announce_receipt_timeout: u8,
    /// Pacing of sync messages, the PortDS logSyncInterval
    pub sync_interval: Interval,
    /// Multiplier for the sync receipt timeout after which the servo goes
    /// into holdover
    pub sync_receipt_timeout: u8,
    /// How many consecutive offsets below the servo lock threshold promote
    /// the port from uncalibrated to slave
    pub calibration_threshold: u8,
    /// Use round-to-even instead of truncation for the halving in the delay
    /// and offset formulas, trading a cheap shift for an unbiased long-run
    /// average
    pub rounding_compensation: bool,
}

impl PortConfig {
    /// The interval between delay measurements
    pub fn min_delay_req_interval(&self) -> Interval {
        match self.delay_mechanism {
            DelayMechanism::E2E { interval } => interval,
            DelayMechanism::P2P { interval } => interval,
        }
    }

    /// How long no announce may be heard from the current master before the
    /// port considers it gone
    pub fn announce_duration(&self) -> Duration {
        self.announce_interval.as_duration() * self.announce_receipt_timeout as i64
    }

    /// How long no sync may be heard before the servo goes into holdover
    pub fn sync_duration(&self) -> Duration {
        self.sync_interval.as_duration() * self.sync_receipt_timeout as i64
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            delay_mechanism: DelayMechanism::E2E {
                interval: Interval::ONE_SECOND,
            },
            announce_interval: Interval::TWO_SECONDS,
            announce_receipt_timeout: 3,
            sync_interval: Interval::ONE_SECOND,
            sync_receipt_timeout: 3,
            calibration_threshold: 3,
            rounding_compensation: false,
        }
    }
}

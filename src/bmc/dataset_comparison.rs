//! Implementation of the dataset comparison algorithm, IEEE1588-2019
//! section 9.3.4

use core::cmp::Ordering;

use crate::datastructures::{
    common::{ClockIdentity, ClockQuality, PortIdentity},
    datasets::InternalDefaultDS,
    messages::{AnnounceMessage, Header},
};

/// A collection of data gathered from an announce message or from the
/// DefaultDS of the local instance. Two of these can be compared to find out
/// which source describes the better master, in the strict lexicographic
/// order the spec prescribes.
#[derive(Eq, PartialEq, Default, Debug, Clone, Copy)]
pub(crate) struct ComparisonDataset {
    gm_priority_1: u8,
    gm_clock_quality: ClockQuality,
    gm_priority_2: u8,
    gm_identity: ClockIdentity,
    steps_removed: u16,
    sender_identity: PortIdentity,
}

impl ComparisonDataset {
    /// Create a dataset from the data in an announce message and the
    /// identity of the port that sent it
    pub(crate) fn from_announce_message(header: &Header, message: &AnnounceMessage) -> Self {
        Self {
            gm_priority_1: message.grandmaster_priority_1,
            gm_clock_quality: message.grandmaster_clock_quality,
            gm_priority_2: message.grandmaster_priority_2,
            gm_identity: message.grandmaster_identity,
            steps_removed: message.steps_removed,
            sender_identity: header.source_port_identity,
        }
    }

    /// Create the local candidate dataset, called `D0` by the spec
    ///
    /// This is always derived from the default dataset. The parent dataset
    /// describes the master the instance is currently following, not the
    /// local candidate, and must never feed into the comparison.
    pub(crate) fn from_default_ds(data: &InternalDefaultDS, own_port: PortIdentity) -> Self {
        Self {
            gm_priority_1: data.priority_1,
            gm_clock_quality: data.clock_quality,
            gm_priority_2: data.priority_2,
            gm_identity: data.clock_identity,
            steps_removed: 0,
            sender_identity: own_port,
        }
    }

    /// Returns the ordering of `self` in comparison to `other`
    pub(crate) fn compare(&self, other: &Self) -> DatasetOrdering {
        let quality = self.gm_clock_quality;
        let other_quality = other.gm_clock_quality;

        let grandmaster = (self.gm_priority_1.cmp(&other.gm_priority_1))
            .then_with(|| quality.clock_class.cmp(&other_quality.clock_class))
            .then_with(|| quality.clock_accuracy.cmp(&other_quality.clock_accuracy))
            .then_with(|| {
                quality
                    .offset_scaled_log_variance
                    .cmp(&other_quality.offset_scaled_log_variance)
            })
            .then_with(|| self.gm_priority_2.cmp(&other.gm_priority_2))
            .then_with(|| self.gm_identity.cmp(&other.gm_identity));

        match grandmaster {
            Ordering::Less => DatasetOrdering::Better,
            Ordering::Greater => DatasetOrdering::Worse,
            // Same grandmaster: fewer boundary clocks in between wins, then
            // the sending port identity is the deterministic tiebreak
            Ordering::Equal => match self.steps_removed.cmp(&other.steps_removed) {
                Ordering::Less => DatasetOrdering::Better,
                Ordering::Greater => DatasetOrdering::Worse,
                Ordering::Equal => match self.sender_identity.cmp(&other.sender_identity) {
                    Ordering::Less => DatasetOrdering::BetterByTopology,
                    Ordering::Greater => DatasetOrdering::WorseByTopology,
                    Ordering::Equal => DatasetOrdering::Same,
                },
            },
        }
    }
}

/// The outcome of the dataset comparison algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DatasetOrdering {
    /// Clearly the better master
    Better,
    /// The same grandmaster, preferred only because of the port tiebreak
    BetterByTopology,
    /// Functionally the same data; either choice is valid
    Same,
    /// The same grandmaster, not preferred because of the port tiebreak
    WorseByTopology,
    /// Clearly the worse master
    Worse,
}

impl DatasetOrdering {
    pub(crate) const fn as_ordering(self) -> Ordering {
        match self {
            DatasetOrdering::Better | DatasetOrdering::BetterByTopology => Ordering::Greater,
            DatasetOrdering::Same => Ordering::Equal,
            DatasetOrdering::WorseByTopology | DatasetOrdering::Worse => Ordering::Less,
        }
    }

    pub(crate) fn is_better(self) -> bool {
        self.as_ordering().is_gt()
    }
}

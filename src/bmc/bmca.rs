//! Implementation of the best master clock algorithm [`Bmca`]

use core::cmp::Ordering;

use super::{
    dataset_comparison::{ComparisonDataset, DatasetOrdering},
    foreign_master::{ForeignMaster, ForeignMasterList, RegisterOutcome},
};
use crate::{
    datastructures::{
        common::PortIdentity,
        datasets::InternalDefaultDS,
        messages::{AnnounceMessage, Header},
    },
    time::{Duration, Time},
};

/// Object implementing the best master clock algorithm for a single port
///
/// Usage:
///
/// - When a port receives an announce message it registers it with
///   [`Bmca::register_announce_message`].
/// - Periodically, and whenever the candidate set may have changed, the port
///   calls [`Bmca::run`]; expired candidates are pruned first, then the
///   local candidate built from the default dataset is compared against
///   every live foreign master and a role is recommended.
#[derive(Debug)]
pub(crate) struct Bmca {
    foreign_master_list: ForeignMasterList,
    own_port_identity: PortIdentity,
}

/// The role the algorithm recommends for the port
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum RecommendedState {
    /// The local clock is the best in the domain and acts as grandmaster
    GrandMaster,
    /// The local clock beats every foreign candidate heard on this port,
    /// but foreign candidates exist
    Master,
    /// A foreign master is better; the port should synchronize to it
    Slave(ForeignMaster),
    /// The best foreign candidate advertises the same grandmaster and wins
    /// only on the port identity tiebreak
    Passive(ForeignMaster),
}

impl Bmca {
    pub(crate) fn new(own_port_identity: PortIdentity) -> Self {
        Self {
            foreign_master_list: ForeignMasterList::new(own_port_identity),
            own_port_identity,
        }
    }

    /// Register a received announce message with the algorithm
    pub(crate) fn register_announce_message(
        &mut self,
        header: &Header,
        announce: &AnnounceMessage,
        now: Time,
    ) -> RegisterOutcome {
        self.foreign_master_list
            .register_announce(header, announce, now)
    }

    /// Whether any foreign master candidates are currently known
    pub(crate) fn has_candidates(&self) -> bool {
        !self.foreign_master_list.is_empty()
    }

    /// Remove candidates that have not announced within `timeout`, without
    /// running the full algorithm
    ///
    /// Returns the number of evicted candidates.
    pub(crate) fn prune(&mut self, now: Time, timeout: Duration) -> usize {
        self.foreign_master_list.prune(now, timeout)
    }

    /// Run the algorithm and recommend a role for the port
    ///
    /// Pruning always happens first so that a silent master cannot linger in
    /// the candidate set beyond its announce timeout.
    pub(crate) fn run(
        &mut self,
        default_ds: &InternalDefaultDS,
        now: Time,
        timeout: Duration,
    ) -> RecommendedState {
        self.prune(now, timeout);

        let d0 = ComparisonDataset::from_default_ds(default_ds, self.own_port_identity);

        let best_foreign = self.best_foreign_master();

        let Some(best) = best_foreign else {
            return RecommendedState::GrandMaster;
        };

        let erbest = ComparisonDataset::from_announce_message(&best.header, &best.announce);

        match d0.compare(&erbest) {
            DatasetOrdering::Better | DatasetOrdering::BetterByTopology | DatasetOrdering::Same => {
                RecommendedState::Master
            }
            DatasetOrdering::WorseByTopology => RecommendedState::Passive(best),
            DatasetOrdering::Worse => RecommendedState::Slave(best),
        }
    }

    /// The best of the live foreign candidates, called `Erbest` by the spec
    fn best_foreign_master(&self) -> Option<ForeignMaster> {
        self.foreign_master_list
            .iter()
            .max_by(|a, b| Self::compare_foreign(a, b))
            .copied()
    }

    fn compare_foreign(a: &ForeignMaster, b: &ForeignMaster) -> Ordering {
        let dataset_a = ComparisonDataset::from_announce_message(&a.header, &a.announce);
        let dataset_b = ComparisonDataset::from_announce_message(&b.header, &b.announce);

        // prefer fresher records when the datasets are indistinguishable
        dataset_a
            .compare(&dataset_b)
            .as_ordering()
            .then(a.last_announce.cmp(&b.last_announce))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::InstanceConfig,
        datastructures::common::{ClockIdentity, ClockQuality},
    };

    fn local_default_ds(priority_1: u8, clock_class: u8) -> InternalDefaultDS {
        InternalDefaultDS::new(InstanceConfig {
            clock_identity: ClockIdentity([0xee; 8]),
            priority_1,
            priority_2: 128,
            domain_number: 0,
            slave_only: false,
            sdo_id: Default::default(),
            clock_quality: ClockQuality {
                clock_class,
                clock_accuracy: 0xfe,
                offset_scaled_log_variance: 0xffff,
            },
        })
    }

    fn own_port() -> PortIdentity {
        PortIdentity {
            clock_identity: ClockIdentity([0xee; 8]),
            port_number: 1,
        }
    }

    fn foreign_announce(
        identity: [u8; 8],
        priority_1: u8,
        clock_class: u8,
    ) -> (Header, AnnounceMessage) {
        let header = Header {
            source_port_identity: PortIdentity {
                clock_identity: ClockIdentity(identity),
                port_number: 1,
            },
            ..Default::default()
        };
        let announce = AnnounceMessage {
            origin_timestamp: Default::default(),
            current_utc_offset: 0,
            grandmaster_priority_1: priority_1,
            grandmaster_clock_quality: ClockQuality {
                clock_class,
                clock_accuracy: 0xfe,
                offset_scaled_log_variance: 0xffff,
            },
            grandmaster_priority_2: 128,
            grandmaster_identity: ClockIdentity(identity),
            steps_removed: 0,
            time_source: Default::default(),
        };
        (header, announce)
    }

    fn timeout() -> Duration {
        // announce_receipt_timeout 3 at logAnnounceInterval 1
        Duration::from_secs(6)
    }

    #[test]
    fn empty_candidate_set_recommends_grandmaster() {
        let mut bmca = Bmca::new(own_port());
        let default_ds = local_default_ds(128, 248);

        assert_eq!(
            bmca.run(&default_ds, Time::from_secs(1), timeout()),
            RecommendedState::GrandMaster
        );
    }

    #[test]
    fn priority_1_dominates_clock_class() {
        let mut bmca = Bmca::new(own_port());
        let default_ds = local_default_ds(128, 248);

        // A: equal priority but a far better clock class
        let mut identity_a = [0xaa; 8];
        identity_a[7] = 0x01;
        let (header, announce) = foreign_announce(identity_a, 128, 6);
        bmca.register_announce_message(&header, &announce, Time::from_secs(1));

        // B: worse clock class but a better priority
        let mut identity_b = [0xaa; 8];
        identity_b[7] = 0x02;
        let (header, announce) = foreign_announce(identity_b, 64, 248);
        bmca.register_announce_message(&header, &announce, Time::from_secs(1));

        let recommendation = bmca.run(&default_ds, Time::from_secs(2), timeout());
        let RecommendedState::Slave(best) = recommendation else {
            panic!("expected a slave recommendation, got {:?}", recommendation);
        };
        assert_eq!(best.announce.grandmaster_identity, ClockIdentity(identity_b));
    }

    #[test]
    fn tie_breaks_on_smallest_identity() {
        let mut bmca = Bmca::new(own_port());
        let default_ds = local_default_ds(128, 248);

        for last_byte in [0xff, 0xdd, 0xee] {
            let mut identity = [0xaa; 8];
            identity[7] = last_byte;
            let (header, announce) = foreign_announce(identity, 64, 248);
            bmca.register_announce_message(&header, &announce, Time::from_secs(1));
        }

        let recommendation = bmca.run(&default_ds, Time::from_secs(2), timeout());
        let RecommendedState::Slave(best) = recommendation else {
            panic!("expected a slave recommendation, got {:?}", recommendation);
        };
        let mut expected = [0xaa; 8];
        expected[7] = 0xdd;
        assert_eq!(best.announce.grandmaster_identity, ClockIdentity(expected));
    }

    #[test]
    fn local_wins_against_worse_foreign() {
        let mut bmca = Bmca::new(own_port());
        let default_ds = local_default_ds(64, 248);

        let (header, announce) = foreign_announce([0xaa; 8], 128, 248);
        bmca.register_announce_message(&header, &announce, Time::from_secs(1));

        assert_eq!(
            bmca.run(&default_ds, Time::from_secs(2), timeout()),
            RecommendedState::Master
        );
    }

    #[test]
    fn expired_candidates_fall_out_before_selection() {
        let mut bmca = Bmca::new(own_port());
        let default_ds = local_default_ds(128, 248);

        let (header, announce) = foreign_announce([0xaa; 8], 64, 248);
        bmca.register_announce_message(&header, &announce, Time::from_secs(1));

        // still alive shortly after
        assert!(matches!(
            bmca.run(&default_ds, Time::from_secs(3), timeout()),
            RecommendedState::Slave(_)
        ));

        // long past the timeout the candidate is gone
        assert_eq!(
            bmca.run(&default_ds, Time::from_secs(30), timeout()),
            RecommendedState::GrandMaster
        );
        assert!(!bmca.has_candidates());
    }

    #[test]
    fn same_grandmaster_tiebreak_recommends_passive() {
        let mut bmca = Bmca::new(own_port());
        // the local instance advertises the same grandmaster values and
        // loses only on the sending identity
        let default_ds = InternalDefaultDS::new(InstanceConfig {
            clock_identity: ClockIdentity([0xee; 8]),
            priority_1: 128,
            priority_2: 128,
            domain_number: 0,
            slave_only: false,
            sdo_id: Default::default(),
            clock_quality: Default::default(),
        });

        let header = Header {
            source_port_identity: PortIdentity {
                clock_identity: ClockIdentity([0x01; 8]),
                port_number: 1,
            },
            ..Default::default()
        };
        let announce = AnnounceMessage {
            origin_timestamp: Default::default(),
            current_utc_offset: 0,
            grandmaster_priority_1: 128,
            grandmaster_clock_quality: Default::default(),
            grandmaster_priority_2: 128,
            grandmaster_identity: ClockIdentity([0xee; 8]),
            steps_removed: 0,
            time_source: Default::default(),
        };
        bmca.register_announce_message(&header, &announce, Time::from_secs(1));

        assert!(matches!(
            bmca.run(&default_ds, Time::from_secs(2), timeout()),
            RecommendedState::Passive(_)
        ));
    }
}

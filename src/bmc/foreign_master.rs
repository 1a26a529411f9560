//! Record keeping for the foreign masters a port hears from

use arrayvec::ArrayVec;

use crate::{
    datastructures::{
        common::PortIdentity,
        messages::{AnnounceMessage, Header},
    },
    time::{Duration, Time},
};

/// The maximum amount of foreign masters tracked at the same time
pub(crate) const MAX_FOREIGN_MASTERS: usize = 16;

/// The last announce content heard from one foreign master
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ForeignMaster {
    pub(crate) sender_identity: PortIdentity,
    pub(crate) header: Header,
    pub(crate) announce: AnnounceMessage,
    pub(crate) last_announce: Time,
}

/// What happened to an incoming announce when it was offered to the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegisterOutcome {
    /// A new record was created for a previously unknown sender
    New,
    /// An existing record was refreshed
    Refreshed,
    /// An existing record was refreshed, but the sequence number did not
    /// follow the previous one
    UnexpectedSequence,
    /// The list is at capacity; the incoming record was dropped
    Overflow,
    /// The message came from our own instance and was ignored
    Ignored,
}

/// The foreign masters a port currently considers as candidates
///
/// The list is bounded; all operations are linear scans over at most
/// [`MAX_FOREIGN_MASTERS`] records.
#[derive(Debug)]
pub(crate) struct ForeignMasterList {
    records: ArrayVec<ForeignMaster, MAX_FOREIGN_MASTERS>,
    own_identity: PortIdentity,
}

impl ForeignMasterList {
    /// - `own_identity`: The identity of the port for which this list is
    ///   kept
    pub(crate) fn new(own_identity: PortIdentity) -> Self {
        Self {
            records: ArrayVec::new(),
            own_identity,
        }
    }

    /// Offer a received announce message to the list
    ///
    /// A record with a matching sender identity is overwritten in place and
    /// its reception time refreshed. Unknown senders get a new record if
    /// there is room; when the list is full the newcomer is dropped.
    pub(crate) fn register_announce(
        &mut self,
        header: &Header,
        announce: &AnnounceMessage,
        now: Time,
    ) -> RegisterOutcome {
        let sender_identity = header.source_port_identity;

        // Announces from our own instance are no foreign masters
        if sender_identity.clock_identity == self.own_identity.clock_identity {
            return RegisterOutcome::Ignored;
        }

        if let Some(record) = self
            .records
            .iter_mut()
            .find(|record| record.sender_identity == sender_identity)
        {
            // A refresh should carry a newer sequence number, with some
            // logic for u16 rollover
            let in_order = header
                .sequence_id
                .wrapping_sub(record.header.sequence_id)
                .wrapping_sub(1)
                < u16::MAX / 2;

            record.header = *header;
            record.announce = *announce;
            record.last_announce = now;

            if in_order {
                RegisterOutcome::Refreshed
            } else {
                log::debug!(
                    "Out of order announce from {}: {}",
                    sender_identity,
                    header.sequence_id
                );
                RegisterOutcome::UnexpectedSequence
            }
        } else if self.records.is_full() {
            log::warn!(
                "Foreign master list full, dropping announce from {}",
                sender_identity
            );
            RegisterOutcome::Overflow
        } else {
            self.records.push(ForeignMaster {
                sender_identity,
                header: *header,
                announce: *announce,
                last_announce: now,
            });
            RegisterOutcome::New
        }
    }

    /// Evict all records that have not been refreshed within `timeout`
    ///
    /// Returns the number of evicted records.
    pub(crate) fn prune(&mut self, now: Time, timeout: Duration) -> usize {
        let before = self.records.len();
        self.records
            .retain(|record| now - record.last_announce <= timeout);
        before - self.records.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ForeignMaster> {
        self.records.iter()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructures::common::ClockIdentity;

    fn announce_from(identity: u8, sequence_id: u16) -> (Header, AnnounceMessage) {
        let header = Header {
            source_port_identity: PortIdentity {
                clock_identity: ClockIdentity([identity; 8]),
                port_number: 1,
            },
            sequence_id,
            ..Default::default()
        };
        let announce = AnnounceMessage {
            origin_timestamp: Default::default(),
            current_utc_offset: 0,
            grandmaster_priority_1: 128,
            grandmaster_clock_quality: Default::default(),
            grandmaster_priority_2: 128,
            grandmaster_identity: ClockIdentity([identity; 8]),
            steps_removed: 0,
            time_source: Default::default(),
        };
        (header, announce)
    }

    fn own_port() -> PortIdentity {
        PortIdentity {
            clock_identity: ClockIdentity([0xee; 8]),
            port_number: 1,
        }
    }

    #[test]
    fn full_list_drops_newcomers_but_accepts_refreshes() {
        let mut list = ForeignMasterList::new(own_port());

        for identity in 0..MAX_FOREIGN_MASTERS as u8 {
            let (header, announce) = announce_from(identity, 0);
            assert_eq!(
                list.register_announce(&header, &announce, Time::from_secs(1)),
                RegisterOutcome::New
            );
        }
        assert_eq!(list.len(), MAX_FOREIGN_MASTERS);

        // one more sender does not fit
        let (header, announce) = announce_from(0x42, 0);
        assert_eq!(
            list.register_announce(&header, &announce, Time::from_secs(2)),
            RegisterOutcome::Overflow
        );
        assert_eq!(list.len(), MAX_FOREIGN_MASTERS);

        // but a known sender still refreshes
        let (header, announce) = announce_from(3, 1);
        assert_eq!(
            list.register_announce(&header, &announce, Time::from_secs(2)),
            RegisterOutcome::Refreshed
        );
    }

    #[test]
    fn own_instance_is_ignored() {
        let mut list = ForeignMasterList::new(own_port());
        let (header, announce) = announce_from(0xee, 0);
        assert_eq!(
            list.register_announce(&header, &announce, Time::from_secs(1)),
            RegisterOutcome::Ignored
        );
        assert!(list.is_empty());
    }

    #[test]
    fn sequence_rollback_is_flagged() {
        let mut list = ForeignMasterList::new(own_port());

        let (header, announce) = announce_from(1, 10);
        list.register_announce(&header, &announce, Time::from_secs(1));

        let (header, announce) = announce_from(1, 9);
        assert_eq!(
            list.register_announce(&header, &announce, Time::from_secs(2)),
            RegisterOutcome::UnexpectedSequence
        );

        // the record was still refreshed
        let record = list.iter().next().unwrap();
        assert_eq!(record.header.sequence_id, 9);
        assert_eq!(record.last_announce, Time::from_secs(2));
    }

    #[test]
    fn sequence_rollover_is_in_order() {
        let mut list = ForeignMasterList::new(own_port());

        let (header, announce) = announce_from(1, u16::MAX);
        list.register_announce(&header, &announce, Time::from_secs(1));

        let (header, announce) = announce_from(1, 0);
        assert_eq!(
            list.register_announce(&header, &announce, Time::from_secs(2)),
            RegisterOutcome::Refreshed
        );
    }

    #[test]
    fn prune_evicts_stale_records() {
        let mut list = ForeignMasterList::new(own_port());

        let (header, announce) = announce_from(1, 0);
        list.register_announce(&header, &announce, Time::from_secs(10));
        let (header, announce) = announce_from(2, 0);
        list.register_announce(&header, &announce, Time::from_secs(18));

        // announce timeout of 3 * 2^1 seconds
        let timeout = Duration::from_secs(6);
        assert_eq!(list.prune(Time::from_secs(20), timeout), 1);

        assert_eq!(list.len(), 1);
        assert_eq!(
            list.iter().next().unwrap().sender_identity.clock_identity,
            ClockIdentity([2; 8])
        );
    }
}

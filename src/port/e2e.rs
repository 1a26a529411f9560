//! The delay request-response (end to end) measurement pipeline
//!
//! Tracks the two halves of the exchange separately: the sync leg (t1, t2)
//! refreshed at the master's sync rate, and the delay leg (t3, t4) refreshed
//! at the slave's delay request rate. Whenever either leg completes and both
//! are known, a new offset measurement is produced.

use super::{
    measurement::{clamp_offset_scaled, half_scaled, Measurement},
    IngressError,
};
use crate::{
    datastructures::{
        common::{PortIdentity, TimeInterval},
        messages::{DelayRespMessage, FollowUpMessage, Header, SyncMessage},
    },
    time::{Duration, Time},
};

/// A measurement along with the anomalies observed while computing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OffsetUpdate {
    pub(crate) measurement: Measurement,
    /// A timestamp pair was out of order; the result was still computed
    pub(crate) ordering_violation: bool,
    /// The offset exceeded the clamp bound and was saturated
    pub(crate) clamped: bool,
}

/// Pending and completed state dropped by [`E2eExchange::expire`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExpiredPairs {
    /// Sync messages whose follow up never arrived within the grace window
    pub(crate) late_follow_ups: u32,
    /// Delay exchanges abandoned without a transmit timestamp or response
    pub(crate) lost_exchanges: u32,
}

#[derive(Debug, Clone, Copy)]
struct SyncLeg {
    t1: Time,
    t2: Time,
    correction_scaled: i64,
}

#[derive(Debug, Clone, Copy)]
struct DelayLeg {
    t3: Time,
    t4: Time,
    correction_scaled: i64,
}

#[derive(Debug, Clone, Copy)]
enum SyncSlot {
    Empty,
    /// A two step sync arrived; its precise origin is still in flight
    AwaitingFollowUp {
        id: u16,
        recv_time: Time,
        correction_scaled: i64,
        arrived: Time,
    },
}

#[derive(Debug, Clone, Copy)]
enum DelaySlot {
    Empty,
    Measuring {
        id: u16,
        issued: Time,
        send_time: Option<Time>,
        response: Option<(Time, i64)>,
    },
}

#[derive(Debug)]
pub(crate) struct E2eExchange {
    round_even: bool,
    sync_slot: SyncSlot,
    sync_leg: Option<SyncLeg>,
    delay_slot: DelaySlot,
    delay_leg: Option<DelayLeg>,
}

impl E2eExchange {
    pub(crate) fn new(round_even: bool) -> Self {
        Self {
            round_even,
            sync_slot: SyncSlot::Empty,
            sync_leg: None,
            delay_slot: DelaySlot::Empty,
            delay_leg: None,
        }
    }

    /// Forget all pairing state, used when the master changes
    pub(crate) fn reset(&mut self) {
        self.sync_slot = SyncSlot::Empty;
        self.sync_leg = None;
        self.delay_slot = DelaySlot::Empty;
        self.delay_leg = None;
    }

    pub(crate) fn handle_sync(
        &mut self,
        header: &Header,
        message: &SyncMessage,
        recv_time: Time,
    ) -> Option<OffsetUpdate> {
        if header.two_step_flag {
            if let SyncSlot::AwaitingFollowUp { id, .. } = self.sync_slot {
                log::debug!("Sync {} replaces unpaired sync {}", header.sequence_id, id);
            }
            self.sync_slot = SyncSlot::AwaitingFollowUp {
                id: header.sequence_id,
                recv_time,
                correction_scaled: header.correction_field.to_scaled_nanos(),
                arrived: recv_time,
            };
            None
        } else {
            self.sync_leg = Some(SyncLeg {
                t1: Time::from(message.origin_timestamp),
                t2: recv_time,
                correction_scaled: header.correction_field.to_scaled_nanos(),
            });
            self.try_measure()
        }
    }

    /// Pair a follow up with the sync that announced it
    ///
    /// A follow up that arrives before its sync, after the grace window, or
    /// with a sequence id we are not waiting for is rejected.
    pub(crate) fn handle_follow_up(
        &mut self,
        header: &Header,
        message: &FollowUpMessage,
    ) -> Result<Option<OffsetUpdate>, IngressError> {
        match self.sync_slot {
            SyncSlot::AwaitingFollowUp {
                id,
                recv_time,
                correction_scaled,
                ..
            } if id == header.sequence_id => {
                self.sync_slot = SyncSlot::Empty;
                self.sync_leg = Some(SyncLeg {
                    t1: Time::from(message.precise_origin_timestamp),
                    t2: recv_time,
                    correction_scaled: correction_scaled
                        .saturating_add(header.correction_field.to_scaled_nanos()),
                });
                Ok(self.try_measure())
            }
            _ => Err(IngressError::SequenceMismatch),
        }
    }

    /// Register that a delay request with `id` was handed to the hardware
    pub(crate) fn delay_req_sent(&mut self, id: u16, now: Time) {
        self.delay_slot = DelaySlot::Measuring {
            id,
            issued: now,
            send_time: None,
            response: None,
        };
    }

    /// The transmit timestamp of the outstanding delay request arrived
    pub(crate) fn handle_delay_tx_timestamp(
        &mut self,
        id: u16,
        timestamp: Time,
    ) -> Option<OffsetUpdate> {
        let matched = match &mut self.delay_slot {
            DelaySlot::Measuring {
                id: pending,
                send_time,
                ..
            } if *pending == id && send_time.is_none() => {
                *send_time = Some(timestamp);
                true
            }
            _ => false,
        };

        if matched && self.complete_delay() {
            self.try_measure()
        } else {
            None
        }
    }

    pub(crate) fn handle_delay_resp(
        &mut self,
        header: &Header,
        message: &DelayRespMessage,
        own_identity: PortIdentity,
    ) -> Result<Option<OffsetUpdate>, IngressError> {
        if message.requesting_port_identity != own_identity {
            return Err(IngressError::SequenceMismatch);
        }

        let matched = match &mut self.delay_slot {
            DelaySlot::Measuring { id, response, .. } if *id == header.sequence_id => {
                *response = Some((
                    Time::from(message.receive_timestamp),
                    header.correction_field.to_scaled_nanos(),
                ));
                true
            }
            _ => false,
        };

        if !matched {
            return Err(IngressError::SequenceMismatch);
        }

        if self.complete_delay() {
            Ok(self.try_measure())
        } else {
            // the transmit timestamp is still in flight
            Ok(None)
        }
    }

    /// The sequence id of the delay request still waiting for its transmit
    /// timestamp, for the per-tick hardware poll
    pub(crate) fn pending_tx_timestamp(&self) -> Option<u16> {
        match self.delay_slot {
            DelaySlot::Measuring {
                id,
                send_time: None,
                ..
            } => Some(id),
            _ => None,
        }
    }

    /// Drop pending state that outlived `window`
    pub(crate) fn expire(&mut self, now: Time, window: Duration) -> ExpiredPairs {
        let mut expired = ExpiredPairs::default();

        if let SyncSlot::AwaitingFollowUp { id, arrived, .. } = self.sync_slot {
            if now - arrived > window {
                log::debug!("No follow up for sync {} within the grace window", id);
                self.sync_slot = SyncSlot::Empty;
                expired.late_follow_ups += 1;
            }
        }

        if let DelaySlot::Measuring { id, issued, .. } = self.delay_slot {
            if now - issued > window {
                log::debug!("Delay exchange {} abandoned", id);
                self.delay_slot = DelaySlot::Empty;
                expired.lost_exchanges += 1;
            }
        }

        expired
    }

    /// Move a fully measured exchange from the slot into the delay leg;
    /// returns whether that happened
    fn complete_delay(&mut self) -> bool {
        if let DelaySlot::Measuring {
            send_time: Some(t3),
            response: Some((t4, correction_scaled)),
            ..
        } = self.delay_slot
        {
            self.delay_leg = Some(DelayLeg {
                t3,
                t4,
                correction_scaled,
            });
            self.delay_slot = DelaySlot::Empty;
            true
        } else {
            false
        }
    }

    fn try_measure(&self) -> Option<OffsetUpdate> {
        let sync = self.sync_leg?;
        let delay = self.delay_leg?;

        let t2_t1 = scaled(sync.t2 - sync.t1);
        let t4_t3 = scaled(delay.t4 - delay.t3);

        let ordering_violation = sync.t2 < sync.t1 || delay.t4 < delay.t3;

        let correction =
            sync.correction_scaled as i128 + delay.correction_scaled as i128;

        let (offset_scaled, clamped) =
            clamp_offset_scaled(half_scaled(t2_t1 - t4_t3, self.round_even) - correction);
        let (delay_scaled, _) = clamp_offset_scaled(half_scaled(t2_t1 + t4_t3, self.round_even));

        Some(OffsetUpdate {
            measurement: Measurement {
                event_time: sync.t2,
                offset_from_master: Duration::from(TimeInterval::from_scaled_nanos(offset_scaled)),
                mean_path_delay: Duration::from(TimeInterval::from_scaled_nanos(delay_scaled)),
            },
            ordering_violation,
            clamped,
        })
    }
}

/// A duration as a scaled nanosecond value, wide enough to never overflow
fn scaled(duration: Duration) -> i128 {
    duration.nanos().to_bits() >> 16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructures::common::WireTimestamp;

    fn own_identity() -> PortIdentity {
        PortIdentity {
            clock_identity: crate::datastructures::common::ClockIdentity([1; 8]),
            port_number: 1,
        }
    }

    fn sync_header(sequence_id: u16, two_step: bool, correction_ns: i64) -> Header {
        Header {
            sequence_id,
            two_step_flag: two_step,
            correction_field: TimeInterval::from_scaled_nanos(correction_ns << 16),
            ..Default::default()
        }
    }

    fn run_exchange(
        exchange: &mut E2eExchange,
        sync_correction_ns: i64,
        follow_up_correction_ns: i64,
        resp_correction_ns: i64,
    ) -> OffsetUpdate {
        // T1 = 100 (via follow up), T2 = 150
        let sync = SyncMessage {
            origin_timestamp: WireTimestamp::default(),
        };
        assert!(exchange
            .handle_sync(
                &sync_header(5, true, sync_correction_ns),
                &sync,
                Time::from_nanos(150)
            )
            .is_none());

        let follow_up = FollowUpMessage {
            precise_origin_timestamp: WireTimestamp {
                seconds: 0,
                nanos: 100,
            },
        };
        assert_eq!(
            exchange
                .handle_follow_up(
                    &sync_header(5, false, follow_up_correction_ns),
                    &follow_up
                )
                .unwrap(),
            None
        );

        // T3 = 200, T4 = 260
        exchange.delay_req_sent(9, Time::from_nanos(190));
        assert!(exchange
            .handle_delay_tx_timestamp(9, Time::from_nanos(200))
            .is_none());

        let resp = DelayRespMessage {
            receive_timestamp: WireTimestamp {
                seconds: 0,
                nanos: 260,
            },
            requesting_port_identity: own_identity(),
        };
        exchange
            .handle_delay_resp(
                &sync_header(9, false, resp_correction_ns),
                &resp,
                own_identity(),
            )
            .unwrap()
            .expect("all four timestamps are known")
    }

    #[test]
    fn offset_and_delay_formulas() {
        let mut exchange = E2eExchange::new(false);
        let update = run_exchange(&mut exchange, 0, 0, 0);

        assert_eq!(
            update.measurement.mean_path_delay,
            Duration::from_nanos(55)
        );
        assert_eq!(
            update.measurement.offset_from_master,
            Duration::from_nanos(-5)
        );
        assert!(!update.ordering_violation);
        assert!(!update.clamped);
    }

    #[test]
    fn corrections_accumulate_into_the_offset() {
        let mut exchange = E2eExchange::new(false);
        let update = run_exchange(&mut exchange, 1, 2, 3);

        assert_eq!(
            update.measurement.offset_from_master,
            Duration::from_nanos(-11)
        );
        // the delay formula does not carry the corrections
        assert_eq!(
            update.measurement.mean_path_delay,
            Duration::from_nanos(55)
        );
    }

    #[test]
    fn follow_up_before_sync_is_rejected() {
        let mut exchange = E2eExchange::new(false);

        let follow_up = FollowUpMessage {
            precise_origin_timestamp: WireTimestamp::default(),
        };
        assert_eq!(
            exchange.handle_follow_up(&sync_header(5, false, 0), &follow_up),
            Err(IngressError::SequenceMismatch)
        );
    }

    #[test]
    fn follow_up_with_wrong_sequence_is_rejected() {
        let mut exchange = E2eExchange::new(false);

        let sync = SyncMessage {
            origin_timestamp: WireTimestamp::default(),
        };
        exchange.handle_sync(&sync_header(5, true, 0), &sync, Time::from_nanos(150));

        let follow_up = FollowUpMessage {
            precise_origin_timestamp: WireTimestamp::default(),
        };
        assert!(exchange
            .handle_follow_up(&sync_header(6, false, 0), &follow_up)
            .is_err());
    }

    #[test]
    fn delay_resp_for_other_port_is_rejected() {
        let mut exchange = E2eExchange::new(false);
        exchange.delay_req_sent(9, Time::from_nanos(190));

        let other = PortIdentity {
            clock_identity: crate::datastructures::common::ClockIdentity([7; 8]),
            port_number: 2,
        };
        let resp = DelayRespMessage {
            receive_timestamp: WireTimestamp::default(),
            requesting_port_identity: other,
        };
        assert_eq!(
            exchange.handle_delay_resp(&sync_header(9, false, 0), &resp, own_identity()),
            Err(IngressError::SequenceMismatch)
        );
    }

    #[test]
    fn ordering_violation_is_reported_but_computed() {
        let mut exchange = E2eExchange::new(false);

        // one step sync with T2 < T1
        let sync = SyncMessage {
            origin_timestamp: WireTimestamp {
                seconds: 0,
                nanos: 500,
            },
        };
        exchange.handle_sync(&sync_header(1, false, 0), &sync, Time::from_nanos(100));

        exchange.delay_req_sent(2, Time::from_nanos(110));
        exchange.handle_delay_tx_timestamp(2, Time::from_nanos(120));
        let resp = DelayRespMessage {
            receive_timestamp: WireTimestamp {
                seconds: 0,
                nanos: 180,
            },
            requesting_port_identity: own_identity(),
        };
        let update = exchange
            .handle_delay_resp(&sync_header(2, false, 0), &resp, own_identity())
            .unwrap()
            .unwrap();

        assert!(update.ordering_violation);
    }

    #[test]
    fn late_follow_up_expires() {
        let mut exchange = E2eExchange::new(false);

        let sync = SyncMessage {
            origin_timestamp: WireTimestamp::default(),
        };
        exchange.handle_sync(&sync_header(5, true, 0), &sync, Time::from_millis(10));

        let expired = exchange.expire(Time::from_millis(11), Duration::from_millis(5));
        assert_eq!(expired.late_follow_ups, 0);

        let expired = exchange.expire(Time::from_millis(20), Duration::from_millis(5));
        assert_eq!(expired.late_follow_ups, 1);

        // after expiry the follow up no longer pairs
        let follow_up = FollowUpMessage {
            precise_origin_timestamp: WireTimestamp::default(),
        };
        assert!(exchange
            .handle_follow_up(&sync_header(5, false, 0), &follow_up)
            .is_err());
    }

    #[test]
    fn banker_rounding_is_unbiased_on_halves() {
        // T2 - T1 = 3 ns, T4 - T3 = 2 ns: offset before correction is 0.5 ns
        let mut exchange = E2eExchange::new(true);

        let sync = SyncMessage {
            origin_timestamp: WireTimestamp {
                seconds: 0,
                nanos: 100,
            },
        };
        exchange.handle_sync(&sync_header(1, false, 0), &sync, Time::from_nanos(103));

        exchange.delay_req_sent(2, Time::from_nanos(110));
        exchange.handle_delay_tx_timestamp(2, Time::from_nanos(120));
        let resp = DelayRespMessage {
            receive_timestamp: WireTimestamp {
                seconds: 0,
                nanos: 122,
            },
            requesting_port_identity: own_identity(),
        };
        let update = exchange
            .handle_delay_resp(&sync_header(2, false, 0), &resp, own_identity())
            .unwrap()
            .unwrap();

        // the numerator is odd in scaled units only at the sub-scaled level;
        // 1 ns difference halves exactly, so the measurement is exact here
        assert_eq!(
            update.measurement.offset_from_master,
            Duration::from_fixed_nanos(fixed::types::I96F32::from_num(0.5))
        );
    }
}

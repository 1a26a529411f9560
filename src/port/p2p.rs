//! The peer delay (peer to peer) measurement pipeline, requester side
//!
//! The responder side needs no bookkeeping beyond the pending follow up and
//! lives in the port itself; this module tracks the requester's three
//! message exchange and produces the mean delay of the attached link.

use super::{
    measurement::{clamp_offset_scaled, half_scaled},
    IngressError,
};
use crate::{
    datastructures::{
        common::{PortIdentity, TimeInterval},
        messages::{Header, PDelayRespFollowUpMessage, PDelayRespMessage},
    },
    time::{Duration, Time},
};

/// A completed peer delay measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PeerDelayUpdate {
    pub(crate) mean_link_delay: Duration,
    /// A timestamp pair was out of order; the result was still computed
    pub(crate) ordering_violation: bool,
}

#[derive(Debug, Clone, Copy)]
enum PdelaySlot {
    Empty,
    Measuring {
        id: u16,
        issued: Time,
        /// Local transmission time of the request (t1)
        t1: Option<Time>,
        /// Peer reception time of the request (t2) and the response
        /// correction
        response: Option<(Time, i64)>,
        /// Peer transmission time of the response (t3) and the follow up
        /// correction
        follow_up: Option<(Time, i64)>,
        /// Local reception time of the response (t4)
        t4: Option<Time>,
    },
}

#[derive(Debug)]
pub(crate) struct P2pExchange {
    round_even: bool,
    slot: PdelaySlot,
}

impl P2pExchange {
    pub(crate) fn new(round_even: bool) -> Self {
        Self {
            round_even,
            slot: PdelaySlot::Empty,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.slot = PdelaySlot::Empty;
    }

    /// Register that a pdelay request with `id` was handed to the hardware
    pub(crate) fn pdelay_req_sent(&mut self, id: u16, now: Time) {
        self.slot = PdelaySlot::Measuring {
            id,
            issued: now,
            t1: None,
            response: None,
            follow_up: None,
            t4: None,
        };
    }

    /// The transmit timestamp of the outstanding request arrived
    pub(crate) fn handle_req_tx_timestamp(
        &mut self,
        id: u16,
        timestamp: Time,
    ) -> Option<PeerDelayUpdate> {
        match &mut self.slot {
            PdelaySlot::Measuring {
                id: pending, t1, ..
            } if *pending == id && t1.is_none() => {
                *t1 = Some(timestamp);
            }
            _ => return None,
        }
        self.try_measure()
    }

    pub(crate) fn handle_pdelay_resp(
        &mut self,
        header: &Header,
        message: &PDelayRespMessage,
        own_identity: PortIdentity,
        recv_time: Time,
    ) -> Result<Option<PeerDelayUpdate>, IngressError> {
        if message.requesting_port_identity != own_identity {
            return Err(IngressError::SequenceMismatch);
        }

        match &mut self.slot {
            PdelaySlot::Measuring {
                id, response, t4, ..
            } if *id == header.sequence_id => {
                *response = Some((
                    Time::from(message.request_receipt_timestamp),
                    header.correction_field.to_scaled_nanos(),
                ));
                *t4 = Some(recv_time);
            }
            _ => return Err(IngressError::SequenceMismatch),
        }
        Ok(self.try_measure())
    }

    pub(crate) fn handle_pdelay_resp_follow_up(
        &mut self,
        header: &Header,
        message: &PDelayRespFollowUpMessage,
        own_identity: PortIdentity,
    ) -> Result<Option<PeerDelayUpdate>, IngressError> {
        if message.requesting_port_identity != own_identity {
            return Err(IngressError::SequenceMismatch);
        }

        match &mut self.slot {
            PdelaySlot::Measuring { id, follow_up, .. } if *id == header.sequence_id => {
                *follow_up = Some((
                    Time::from(message.response_origin_timestamp),
                    header.correction_field.to_scaled_nanos(),
                ));
            }
            _ => return Err(IngressError::SequenceMismatch),
        }
        Ok(self.try_measure())
    }

    /// The sequence id of the request still waiting for its transmit
    /// timestamp
    pub(crate) fn pending_tx_timestamp(&self) -> Option<u16> {
        match self.slot {
            PdelaySlot::Measuring { id, t1: None, .. } => Some(id),
            _ => None,
        }
    }

    /// Drop an exchange that outlived `window`; returns whether one was
    /// dropped
    pub(crate) fn expire(&mut self, now: Time, window: Duration) -> bool {
        if let PdelaySlot::Measuring { id, issued, .. } = self.slot {
            if now - issued > window {
                log::debug!("Pdelay exchange {} abandoned", id);
                self.slot = PdelaySlot::Empty;
                return true;
            }
        }
        false
    }

    fn try_measure(&mut self) -> Option<PeerDelayUpdate> {
        let PdelaySlot::Measuring {
            t1: Some(t1),
            response: Some((t2, resp_correction)),
            follow_up: Some((t3, follow_up_correction)),
            t4: Some(t4),
            ..
        } = self.slot
        else {
            return None;
        };

        self.slot = PdelaySlot::Empty;

        let turnaround = scaled(t4 - t1);
        let residence = scaled(t3 - t2);

        let ordering_violation = t4 < t1 || t3 < t2;

        let correction = resp_correction as i128 + follow_up_correction as i128;

        let (delay_scaled, _) =
            clamp_offset_scaled(half_scaled(turnaround - residence, self.round_even) - correction);

        Some(PeerDelayUpdate {
            mean_link_delay: Duration::from(TimeInterval::from_scaled_nanos(delay_scaled)),
            ordering_violation,
        })
    }
}

fn scaled(duration: Duration) -> i128 {
    duration.nanos().to_bits() >> 16
}

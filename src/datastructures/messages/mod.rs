//! Ptp network messages

pub use announce::*;
pub use delay_req::*;
pub use delay_resp::*;
pub use follow_up::*;
pub use header::*;
pub use p_delay_req::*;
pub use p_delay_resp::*;
pub use p_delay_resp_follow_up::*;
pub use signaling::*;
pub use sync::*;

use super::{
    common::{PortIdentity, TimeInterval, TlvSet, WireTimestamp},
    datasets::{InternalCurrentDS, InternalDefaultDS, InternalParentDS, TimePropertiesDS},
    WireFormatError,
};
use self::management::ManagementMessage;
use crate::time::{Interval, Time};

mod announce;
mod delay_req;
mod delay_resp;
mod follow_up;
mod header;
pub mod management;
mod p_delay_req;
mod p_delay_resp;
mod p_delay_resp_follow_up;
mod signaling;
mod sync;

/// Maximum length of a packet
///
/// This can be used to preallocate buffers that can always fit packets sent
/// by this crate.
pub const MAX_DATA_LEN: usize = 255;

/// The type of a message, encoded in the low nibble of the first header byte
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    num_enum::TryFromPrimitive,
    num_enum::IntoPrimitive,
)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum MessageType {
    Sync = 0x0,
    DelayReq = 0x1,
    PDelayReq = 0x2,
    PDelayResp = 0x3,
    FollowUp = 0x8,
    DelayResp = 0x9,
    PDelayRespFollowUp = 0xa,
    Announce = 0xb,
    Signaling = 0xc,
    Management = 0xd,
}

/// A parsed message along with its header and TLV suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    pub(crate) header: Header,
    pub(crate) body: MessageBody,
    pub(crate) suffix: TlvSet<'a>,
}

impl Message<'_> {
    /// Whether this message type requires a reception timestamp from the
    /// hardware
    pub fn is_event(&self) -> bool {
        use MessageBody::*;
        match self.body {
            Sync(_) | DelayReq(_) | PDelayReq(_) | PDelayResp(_) => true,
            FollowUp(_)
            | DelayResp(_)
            | PDelayRespFollowUp(_)
            | Announce(_)
            | Signaling(_)
            | Management(_) => false,
        }
    }

    /// The header of this message
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The body of this message
    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// The TLVs appended to this message
    pub fn suffix(&self) -> &TlvSet<'_> {
        &self.suffix
    }
}

/// The body of a message, one variant per message type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum MessageBody {
    Sync(SyncMessage),
    DelayReq(DelayReqMessage),
    PDelayReq(PDelayReqMessage),
    PDelayResp(PDelayRespMessage),
    FollowUp(FollowUpMessage),
    DelayResp(DelayRespMessage),
    PDelayRespFollowUp(PDelayRespFollowUpMessage),
    Announce(AnnounceMessage),
    Signaling(SignalingMessage),
    Management(ManagementMessage),
}

impl MessageBody {
    pub(crate) fn wire_size(&self) -> usize {
        match &self {
            MessageBody::Sync(m) => m.content_size(),
            MessageBody::DelayReq(m) => m.content_size(),
            MessageBody::PDelayReq(m) => m.content_size(),
            MessageBody::PDelayResp(m) => m.content_size(),
            MessageBody::FollowUp(m) => m.content_size(),
            MessageBody::DelayResp(m) => m.content_size(),
            MessageBody::PDelayRespFollowUp(m) => m.content_size(),
            MessageBody::Announce(m) => m.content_size(),
            MessageBody::Signaling(m) => m.content_size(),
            MessageBody::Management(m) => m.content_size(),
        }
    }

    pub(crate) fn content_type(&self) -> MessageType {
        match self {
            MessageBody::Sync(_) => MessageType::Sync,
            MessageBody::DelayReq(_) => MessageType::DelayReq,
            MessageBody::PDelayReq(_) => MessageType::PDelayReq,
            MessageBody::PDelayResp(_) => MessageType::PDelayResp,
            MessageBody::FollowUp(_) => MessageType::FollowUp,
            MessageBody::DelayResp(_) => MessageType::DelayResp,
            MessageBody::PDelayRespFollowUp(_) => MessageType::PDelayRespFollowUp,
            MessageBody::Announce(_) => MessageType::Announce,
            MessageBody::Signaling(_) => MessageType::Signaling,
            MessageBody::Management(_) => MessageType::Management,
        }
    }

    pub(crate) fn serialize(&self, buffer: &mut [u8]) -> Result<usize, WireFormatError> {
        match &self {
            MessageBody::Sync(m) => m.serialize_content(buffer)?,
            MessageBody::DelayReq(m) => m.serialize_content(buffer)?,
            MessageBody::PDelayReq(m) => m.serialize_content(buffer)?,
            MessageBody::PDelayResp(m) => m.serialize_content(buffer)?,
            MessageBody::FollowUp(m) => m.serialize_content(buffer)?,
            MessageBody::DelayResp(m) => m.serialize_content(buffer)?,
            MessageBody::PDelayRespFollowUp(m) => m.serialize_content(buffer)?,
            MessageBody::Announce(m) => m.serialize_content(buffer)?,
            MessageBody::Signaling(m) => m.serialize_content(buffer)?,
            MessageBody::Management(m) => m.serialize_content(buffer)?,
        }

        Ok(self.wire_size())
    }

    pub(crate) fn deserialize(
        message_type: MessageType,
        buffer: &[u8],
    ) -> Result<Self, WireFormatError> {
        let body = match message_type {
            MessageType::Sync => MessageBody::Sync(SyncMessage::deserialize_content(buffer)?),
            MessageType::DelayReq => {
                MessageBody::DelayReq(DelayReqMessage::deserialize_content(buffer)?)
            }
            MessageType::PDelayReq => {
                MessageBody::PDelayReq(PDelayReqMessage::deserialize_content(buffer)?)
            }
            MessageType::PDelayResp => {
                MessageBody::PDelayResp(PDelayRespMessage::deserialize_content(buffer)?)
            }
            MessageType::FollowUp => {
                MessageBody::FollowUp(FollowUpMessage::deserialize_content(buffer)?)
            }
            MessageType::DelayResp => {
                MessageBody::DelayResp(DelayRespMessage::deserialize_content(buffer)?)
            }
            MessageType::PDelayRespFollowUp => MessageBody::PDelayRespFollowUp(
                PDelayRespFollowUpMessage::deserialize_content(buffer)?,
            ),
            MessageType::Announce => {
                MessageBody::Announce(AnnounceMessage::deserialize_content(buffer)?)
            }
            MessageType::Signaling => {
                MessageBody::Signaling(SignalingMessage::deserialize_content(buffer)?)
            }
            MessageType::Management => {
                MessageBody::Management(ManagementMessage::deserialize_content(buffer)?)
            }
        };

        Ok(body)
    }
}

fn base_header(
    default_ds: &InternalDefaultDS,
    port_identity: PortIdentity,
    sequence_id: u16,
) -> Header {
    Header {
        sdo_id: default_ds.sdo_id,
        domain_number: default_ds.domain_number,
        source_port_identity: port_identity,
        sequence_id,
        ..Default::default()
    }
}

/// Builders for the messages this implementation emits itself
impl Message<'_> {
    pub(crate) fn sync(
        default_ds: &InternalDefaultDS,
        port_identity: PortIdentity,
        sequence_id: u16,
    ) -> Self {
        let header = Header {
            two_step_flag: true,
            ..base_header(default_ds, port_identity, sequence_id)
        };

        Message {
            header,
            body: MessageBody::Sync(SyncMessage {
                origin_timestamp: Default::default(),
            }),
            suffix: TlvSet::default(),
        }
    }

    pub(crate) fn follow_up(
        default_ds: &InternalDefaultDS,
        port_identity: PortIdentity,
        sequence_id: u16,
        timestamp: Time,
    ) -> Self {
        let header = Header {
            correction_field: timestamp.subnanos(),
            ..base_header(default_ds, port_identity, sequence_id)
        };

        Message {
            header,
            body: MessageBody::FollowUp(FollowUpMessage {
                precise_origin_timestamp: timestamp.into(),
            }),
            suffix: TlvSet::default(),
        }
    }

    pub(crate) fn announce(
        default_ds: &InternalDefaultDS,
        parent_ds: &InternalParentDS,
        current_ds: &InternalCurrentDS,
        time_properties_ds: &TimePropertiesDS,
        port_identity: PortIdentity,
        sequence_id: u16,
    ) -> Self {
        let header = Header {
            leap59: time_properties_ds.leap59,
            leap61: time_properties_ds.leap61,
            current_utc_offset_valid: time_properties_ds.current_utc_offset_valid,
            ptp_timescale: time_properties_ds.ptp_timescale,
            time_tracable: time_properties_ds.time_traceable,
            frequency_tracable: time_properties_ds.frequency_traceable,
            ..base_header(default_ds, port_identity, sequence_id)
        };

        let body = MessageBody::Announce(AnnounceMessage {
            origin_timestamp: Default::default(),
            current_utc_offset: time_properties_ds.current_utc_offset,
            grandmaster_priority_1: parent_ds.grandmaster_priority_1,
            grandmaster_clock_quality: parent_ds.grandmaster_clock_quality,
            grandmaster_priority_2: parent_ds.grandmaster_priority_2,
            grandmaster_identity: parent_ds.grandmaster_identity,
            steps_removed: current_ds.steps_removed,
            time_source: time_properties_ds.time_source,
        });

        Message {
            header,
            body,
            suffix: TlvSet::default(),
        }
    }

    pub(crate) fn delay_req(
        default_ds: &InternalDefaultDS,
        port_identity: PortIdentity,
        sequence_id: u16,
    ) -> Self {
        let header = base_header(default_ds, port_identity, sequence_id);

        Message {
            header,
            body: MessageBody::DelayReq(DelayReqMessage {
                origin_timestamp: WireTimestamp::default(),
            }),
            suffix: TlvSet::default(),
        }
    }

    pub(crate) fn delay_resp(
        request_header: Header,
        port_identity: PortIdentity,
        min_delay_req_interval: Interval,
        timestamp: Time,
    ) -> Self {
        let header = Header {
            two_step_flag: false,
            source_port_identity: port_identity,
            correction_field: request_header
                .correction_field
                .saturating_add(timestamp.subnanos()),
            log_message_interval: min_delay_req_interval.as_log_2(),
            ..request_header
        };

        let body = MessageBody::DelayResp(DelayRespMessage {
            receive_timestamp: timestamp.into(),
            requesting_port_identity: request_header.source_port_identity,
        });

        Message {
            header,
            body,
            suffix: TlvSet::default(),
        }
    }

    pub(crate) fn pdelay_req(
        default_ds: &InternalDefaultDS,
        port_identity: PortIdentity,
        sequence_id: u16,
    ) -> Self {
        let header = base_header(default_ds, port_identity, sequence_id);

        Message {
            header,
            body: MessageBody::PDelayReq(PDelayReqMessage {
                origin_timestamp: WireTimestamp::default(),
            }),
            suffix: TlvSet::default(),
        }
    }

    pub(crate) fn pdelay_resp(
        request_header: Header,
        port_identity: PortIdentity,
        timestamp: Time,
    ) -> Self {
        let header = Header {
            two_step_flag: true,
            source_port_identity: port_identity,
            correction_field: request_header
                .correction_field
                .saturating_add(timestamp.subnanos()),
            ..request_header
        };

        let body = MessageBody::PDelayResp(PDelayRespMessage {
            request_receipt_timestamp: timestamp.into(),
            requesting_port_identity: request_header.source_port_identity,
        });

        Message {
            header,
            body,
            suffix: TlvSet::default(),
        }
    }

    pub(crate) fn pdelay_resp_follow_up(
        request_header: Header,
        port_identity: PortIdentity,
        timestamp: Time,
    ) -> Self {
        let header = Header {
            two_step_flag: false,
            source_port_identity: port_identity,
            correction_field: timestamp.subnanos(),
            ..request_header
        };

        let body = MessageBody::PDelayRespFollowUp(PDelayRespFollowUpMessage {
            response_origin_timestamp: timestamp.into(),
            requesting_port_identity: request_header.source_port_identity,
        });

        Message {
            header,
            body,
            suffix: TlvSet::default(),
        }
    }
}

impl<'a> Message<'a> {
    /// The byte size on the wire of this message
    pub fn wire_size(&self) -> usize {
        self.header.wire_size() + self.body.wire_size() + self.suffix.wire_size()
    }

    /// Serializes the message into the PTP wire format.
    ///
    /// Returns the used buffer size that contains the message or an error.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<usize, WireFormatError> {
        if buffer.len() < self.wire_size() {
            return Err(WireFormatError::BufferTooShort);
        }

        let (header, rest) = buffer.split_at_mut(34);
        let (body, tlv) = rest.split_at_mut(self.body.wire_size());

        self.header.serialize_header(
            self.body.content_type(),
            self.body.wire_size() + self.suffix.wire_size(),
            header,
        )?;
        self.body.serialize(body)?;
        self.suffix.serialize(tlv)?;

        Ok(self.wire_size())
    }

    /// Deserializes a message from the PTP wire format.
    ///
    /// Returns the message or an error.
    pub fn deserialize(buffer: &'a [u8]) -> Result<Self, WireFormatError> {
        let header_data = Header::deserialize_header(buffer)?;

        if header_data.message_length < 34 {
            return Err(WireFormatError::Invalid);
        }

        // Ensure we have the entire message and ignore potential padding
        // Skip the header bytes and only keep the content
        let content_buffer = buffer
            .get(34..(header_data.message_length as usize))
            .ok_or(WireFormatError::BufferTooShort)?;

        let body = MessageBody::deserialize(header_data.message_type, content_buffer)?;

        let tlv_buffer = content_buffer
            .get(body.wire_size()..)
            .ok_or(WireFormatError::BufferTooShort)?;
        let suffix = TlvSet::deserialize(tlv_buffer)?;

        Ok(Message {
            header: header_data.header,
            body,
            suffix,
        })
    }
}

#[cfg(feature = "fuzz")]
pub use fuzz::{FuzzMessage, FuzzTlv};

#[cfg(feature = "fuzz")]
mod fuzz {
    #![allow(missing_docs)] // These are only used for internal fuzzing
    use super::*;
    use crate::datastructures::common::Tlv;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FuzzMessage<'a> {
        inner: Message<'a>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FuzzTlv<'a>(Tlv<'a>);

    impl<'a> FuzzMessage<'a> {
        pub fn deserialize(buffer: &'a [u8]) -> Result<Self, WireFormatError> {
            Ok(FuzzMessage {
                inner: Message::deserialize(buffer)?,
            })
        }

        pub fn serialize(&self, buffer: &mut [u8]) -> Result<usize, WireFormatError> {
            self.inner.serialize(buffer)
        }

        pub fn tlv(&self) -> impl Iterator<Item = FuzzTlv<'_>> + '_ {
            self.inner.suffix.tlv().map(FuzzTlv)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstanceConfig;
    use crate::datastructures::common::ClockIdentity;

    fn test_default_ds() -> InternalDefaultDS {
        InternalDefaultDS::new(InstanceConfig {
            clock_identity: ClockIdentity([1, 2, 3, 4, 5, 6, 7, 8]),
            priority_1: 128,
            priority_2: 128,
            domain_number: 0,
            sdo_id: Default::default(),
            slave_only: false,
            clock_quality: Default::default(),
        })
    }

    #[test]
    fn sync_round_trip() {
        let default_ds = test_default_ds();
        let port_identity = PortIdentity {
            clock_identity: default_ds.clock_identity,
            port_number: 1,
        };

        let message = Message::sync(&default_ds, port_identity, 42);

        let mut buffer = [0; MAX_DATA_LEN];
        let length = message.serialize(&mut buffer).unwrap();
        assert_eq!(length, 44);

        let parsed = Message::deserialize(&buffer[..length]).unwrap();
        assert_eq!(parsed, message);
        assert!(parsed.is_event());
        assert!(parsed.header.two_step_flag);
    }

    #[test]
    fn announce_round_trip() {
        let default_ds = test_default_ds();
        let parent_ds = InternalParentDS::new(&default_ds);
        let current_ds = InternalCurrentDS::default();
        let time_properties_ds = TimePropertiesDS::default();
        let port_identity = PortIdentity {
            clock_identity: default_ds.clock_identity,
            port_number: 1,
        };

        let message = Message::announce(
            &default_ds,
            &parent_ds,
            &current_ds,
            &time_properties_ds,
            port_identity,
            7,
        );

        let mut buffer = [0; MAX_DATA_LEN];
        let length = message.serialize(&mut buffer).unwrap();
        assert_eq!(length, 64);

        let parsed = Message::deserialize(&buffer[..length]).unwrap();
        assert_eq!(parsed, message);
        assert!(!parsed.is_event());

        let MessageBody::Announce(announce) = parsed.body else {
            panic!("wrong body type");
        };
        assert_eq!(announce.grandmaster_identity, default_ds.clock_identity);
        assert_eq!(announce.steps_removed, 0);
    }

    #[test]
    fn delay_resp_echoes_the_request() {
        let default_ds = test_default_ds();
        let slave_identity = PortIdentity {
            clock_identity: ClockIdentity([9; 8]),
            port_number: 3,
        };
        let master_identity = PortIdentity {
            clock_identity: default_ds.clock_identity,
            port_number: 1,
        };

        let request = Message::delay_req(&default_ds, slave_identity, 1234);
        let response = Message::delay_resp(
            request.header,
            master_identity,
            Interval::ONE_SECOND,
            Time::from_micros(500),
        );

        assert_eq!(response.header.sequence_id, 1234);
        assert_eq!(response.header.source_port_identity, master_identity);
        let MessageBody::DelayResp(body) = response.body else {
            panic!("wrong body type");
        };
        assert_eq!(body.requesting_port_identity, slave_identity);
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let default_ds = test_default_ds();
        let message = Message::sync(&default_ds, PortIdentity::default(), 0);

        let mut buffer = [0; MAX_DATA_LEN];
        let length = message.serialize(&mut buffer).unwrap();

        assert!(Message::deserialize(&buffer[..length - 1]).is_err());
        assert!(Message::deserialize(&buffer[..20]).is_err());
    }
}

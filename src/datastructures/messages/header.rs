use super::MessageType;
use crate::{
    datastructures::{
        common::{PortIdentity, TimeInterval},
        WireFormat, WireFormatError,
    },
    time::Time,
};

/// The part of the common message header that is not derived from the
/// message body or the suffix
///
/// For more details, see *IEEE1588-2019 section 13.3*.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// The sdo id of the instance, see *IEEE1588-2019 section 7.1.4*
    pub sdo_id: SdoId,
    /// The protocol version of the sender
    pub version: PtpVersion,
    /// The PTP domain this message belongs to
    pub domain_number: u8,
    /// Indicates an alternate master, see *IEEE1588-2019 section 17.4*
    pub alternate_master_flag: bool,
    /// Whether the sender uses two step operation
    pub two_step_flag: bool,
    /// Whether this message was sent over unicast
    pub unicast_flag: bool,
    #[allow(missing_docs)]
    pub ptp_profile_specific_1: bool,
    #[allow(missing_docs)]
    pub ptp_profile_specific_2: bool,
    #[allow(missing_docs)]
    pub leap61: bool,
    #[allow(missing_docs)]
    pub leap59: bool,
    #[allow(missing_docs)]
    pub current_utc_offset_valid: bool,
    #[allow(missing_docs)]
    pub ptp_timescale: bool,
    #[allow(missing_docs)]
    pub time_tracable: bool,
    #[allow(missing_docs)]
    pub frequency_tracable: bool,
    #[allow(missing_docs)]
    pub synchronization_uncertain: bool,
    /// Residence and path corrections accumulated along the way, see
    /// *IEEE1588-2019 section 13.3.2.7*
    pub correction_field: TimeInterval,
    /// The identity of the sending port
    pub source_port_identity: PortIdentity,
    /// Sequence number of this message within its type
    pub sequence_id: u16,
    /// Log2 of the interval between messages of this type
    pub log_message_interval: i8,
}

/// The `controlField` is deprecated; it is transmitted as all ones and
/// ignored on receipt.
const DEPRECATED_CONTROL_FIELD: u8 = 0xff;

/// A header along with the message type and length information needed to
/// interpret the rest of the buffer
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeserializedHeader {
    pub(crate) header: Header,
    pub(crate) message_type: MessageType,
    pub(crate) message_length: u16,
}

impl Header {
    pub(super) fn new() -> Self {
        Self {
            sdo_id: SdoId(0),
            version: PtpVersion { major: 2, minor: 1 },
            domain_number: 0,
            alternate_master_flag: false,
            two_step_flag: false,
            unicast_flag: false,
            ptp_profile_specific_1: false,
            ptp_profile_specific_2: false,
            leap59: false,
            leap61: false,
            current_utc_offset_valid: false,
            ptp_timescale: false,
            time_tracable: false,
            frequency_tracable: false,
            synchronization_uncertain: false,
            correction_field: TimeInterval::default(),
            source_port_identity: PortIdentity::default(),
            sequence_id: 0,
            log_message_interval: 0x7f,
        }
    }

    pub(crate) fn wire_size(&self) -> usize {
        34
    }

    pub(crate) fn serialize_header(
        &self,
        content_type: MessageType,
        content_length: usize,
        buffer: &mut [u8],
    ) -> Result<(), WireFormatError> {
        if buffer.len() < 34 {
            return Err(WireFormatError::BufferTooShort);
        }

        buffer[0] = ((self.sdo_id.major_sdo_id()) << 4) | ((content_type as u8) & 0x0f);
        buffer[1] = ((self.version.minor & 0x0f) << 4) | (self.version.major & 0x0f);
        buffer[2..4].copy_from_slice(&((content_length + 34) as u16).to_be_bytes());
        buffer[4] = self.domain_number;
        buffer[5] = self.sdo_id.minor_sdo_id();
        buffer[6] = 0;
        buffer[7] = 0;

        if self.alternate_master_flag {
            buffer[6] |= 1 << 0;
        }
        if self.two_step_flag {
            buffer[6] |= 1 << 1;
        }
        if self.unicast_flag {
            buffer[6] |= 1 << 2;
        }
        if self.ptp_profile_specific_1 {
            buffer[6] |= 1 << 5;
        }
        if self.ptp_profile_specific_2 {
            buffer[6] |= 1 << 6;
        }
        if self.leap61 {
            buffer[7] |= 1 << 0;
        }
        if self.leap59 {
            buffer[7] |= 1 << 1;
        }
        if self.current_utc_offset_valid {
            buffer[7] |= 1 << 2;
        }
        if self.ptp_timescale {
            buffer[7] |= 1 << 3;
        }
        if self.time_tracable {
            buffer[7] |= 1 << 4;
        }
        if self.frequency_tracable {
            buffer[7] |= 1 << 5;
        }
        if self.synchronization_uncertain {
            buffer[7] |= 1 << 6;
        }

        self.correction_field.serialize(&mut buffer[8..16])?;
        buffer[16..20].fill(0);
        self.source_port_identity.serialize(&mut buffer[20..30])?;
        buffer[30..32].copy_from_slice(&self.sequence_id.to_be_bytes());
        buffer[32] = DEPRECATED_CONTROL_FIELD;
        buffer[33] = self.log_message_interval as u8;

        Ok(())
    }

    pub(crate) fn deserialize_header(buffer: &[u8]) -> Result<DeserializedHeader, WireFormatError> {
        if buffer.len() < 34 {
            return Err(WireFormatError::BufferTooShort);
        }

        let version = PtpVersion {
            major: buffer[1] & 0x0f,
            minor: (buffer[1] >> 4) & 0x0f,
        };

        Ok(DeserializedHeader {
            header: Self {
                sdo_id: SdoId(((buffer[0] as u16 >> 4) << 8) | buffer[5] as u16),
                version,
                domain_number: buffer[4],
                alternate_master_flag: buffer[6] & (1 << 0) > 0,
                two_step_flag: buffer[6] & (1 << 1) > 0,
                unicast_flag: buffer[6] & (1 << 2) > 0,
                ptp_profile_specific_1: buffer[6] & (1 << 5) > 0,
                ptp_profile_specific_2: buffer[6] & (1 << 6) > 0,
                leap61: buffer[7] & (1 << 0) > 0,
                leap59: buffer[7] & (1 << 1) > 0,
                current_utc_offset_valid: buffer[7] & (1 << 2) > 0,
                ptp_timescale: buffer[7] & (1 << 3) > 0,
                time_tracable: buffer[7] & (1 << 4) > 0,
                frequency_tracable: buffer[7] & (1 << 5) > 0,
                synchronization_uncertain: buffer[7] & (1 << 6) > 0,
                correction_field: TimeInterval::deserialize(&buffer[8..16])?,
                source_port_identity: PortIdentity::deserialize(&buffer[20..30])?,
                sequence_id: u16::from_be_bytes(buffer[30..32].try_into().unwrap()),
                log_message_interval: buffer[33] as i8,
            },
            message_type: MessageType::try_from(buffer[0] & 0x0f)?,
            message_length: u16::from_be_bytes(buffer[2..4].try_into().unwrap()),
        })
    }
}

impl Header {
    /// Account for the residence time of a forwarded message
    ///
    /// A transparent clock adds the time a message spent inside the node to
    /// the correctionField before sending it on. Accumulation saturates so
    /// a long chain of corrections cannot wrap around.
    pub fn add_residence_time(&mut self, ingress: Time, egress: Time) {
        let residence = (egress - ingress).to_time_interval();
        self.correction_field = self.correction_field.saturating_add(residence);
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

/// A wrapper type for the 12 bit sdoId
///
/// Construction is fallible so a valid instance always contains a value in
/// the range 0..=0xfff.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SdoId(u16);

impl SdoId {
    /// Create an sdo id, returns `None` if the value does not fit in 12 bits
    pub const fn new(sdo_id: u16) -> Option<Self> {
        match sdo_id {
            0..=0xfff => Some(Self(sdo_id)),
            _ => None,
        }
    }

    fn major_sdo_id(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    fn minor_sdo_id(&self) -> u8 {
        self.0 as u8
    }
}

impl From<SdoId> for u16 {
    fn from(sdo_id: SdoId) -> Self {
        sdo_id.0
    }
}

/// The version of the PTP protocol, a major and minor pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PtpVersion {
    /// The `versionPTP` field; this implementation speaks major version 2
    pub major: u8,
    /// The `minorVersionPTP` field
    pub minor: u8,
}

impl PtpVersion {
    /// Create a version, returns `None` if either part does not fit in a
    /// nibble
    pub const fn new(major: u8, minor: u8) -> Option<Self> {
        if major >= 0x10 || minor >= 0x10 {
            None
        } else {
            Some(Self { major, minor })
        }
    }
}

#[cfg(test)]
mod tests {
    use fixed::types::I48F16;

    use super::*;
    use crate::datastructures::common::ClockIdentity;

    #[test]
    fn wireformat() {
        let representations = [(
            [
                0x59, 0x12, 0x12, 0x34, 0xaa, 0xbb, 0b0100_0101, 0b0010_1010, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x01, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0, 1, 2, 3, 4, 5, 6, 7, 0x55,
                0x55, 0xde, 0xad, 0xff, 0x16,
            ],
            DeserializedHeader {
                header: Header {
                    sdo_id: SdoId(0x5bb),
                    version: PtpVersion::new(2, 1).unwrap(),
                    domain_number: 0xaa,
                    alternate_master_flag: true,
                    two_step_flag: false,
                    unicast_flag: true,
                    ptp_profile_specific_1: false,
                    ptp_profile_specific_2: true,
                    leap61: false,
                    leap59: true,
                    current_utc_offset_valid: false,
                    ptp_timescale: true,
                    time_tracable: false,
                    frequency_tracable: true,
                    synchronization_uncertain: false,
                    correction_field: TimeInterval(I48F16::from_num(1.5f64)),
                    source_port_identity: PortIdentity {
                        clock_identity: ClockIdentity([0, 1, 2, 3, 4, 5, 6, 7]),
                        port_number: 0x5555,
                    },
                    sequence_id: 0xdead,
                    log_message_interval: 0x16,
                },
                message_type: MessageType::DelayResp,
                message_length: 0x1234,
            },
        )];

        for (byte_representation, object_representation) in representations {
            let mut serialization_buffer = [0; 34];
            object_representation
                .header
                .serialize_header(
                    object_representation.message_type,
                    object_representation.message_length as usize - 34,
                    &mut serialization_buffer,
                )
                .unwrap();
            assert_eq!(serialization_buffer, byte_representation);

            let deserialized = Header::deserialize_header(&byte_representation).unwrap();
            assert_eq!(deserialized.header, object_representation.header);
            assert_eq!(
                deserialized.message_type,
                object_representation.message_type
            );
            assert_eq!(
                deserialized.message_length,
                object_representation.message_length
            );
        }
    }

    #[test]
    fn sdo_id_is_twelve_bits() {
        assert_eq!(SdoId::new(0xfff), Some(SdoId(0xfff)));
        assert_eq!(SdoId::new(0x1000), None);
    }

    #[test]
    fn residence_time_accumulates_into_the_correction() {
        let mut header = Header {
            correction_field: TimeInterval(I48F16::from_num(10)),
            ..Default::default()
        };

        header.add_residence_time(Time::from_nanos(1000), Time::from_nanos(1250));
        assert_eq!(header.correction_field, TimeInterval(I48F16::from_num(260)));

        // saturates instead of wrapping
        header.correction_field = TimeInterval(I48F16::MAX);
        header.add_residence_time(Time::from_nanos(0), Time::from_nanos(1));
        assert_eq!(header.correction_field, TimeInterval(I48F16::MAX));
    }
}

use super::Header;
use crate::datastructures::{
    common::{ClockIdentity, ClockQuality, TimeSource, WireTimestamp},
    datasets::TimePropertiesDS,
    WireFormat, WireFormatError,
};

/// The body of an announce message, the input of the best master clock
/// algorithm
///
/// For more details, see *IEEE1588-2019 section 13.5*.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)] // wire fields, names straight from the spec
pub struct AnnounceMessage {
    pub origin_timestamp: WireTimestamp,
    pub current_utc_offset: i16,
    pub grandmaster_priority_1: u8,
    pub grandmaster_clock_quality: ClockQuality,
    pub grandmaster_priority_2: u8,
    pub grandmaster_identity: ClockIdentity,
    pub steps_removed: u16,
    pub time_source: TimeSource,
}

impl AnnounceMessage {
    pub(crate) fn content_size(&self) -> usize {
        30
    }

    pub(crate) fn serialize_content(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        if buffer.len() < 30 {
            return Err(WireFormatError::BufferTooShort);
        }

        self.origin_timestamp.serialize(&mut buffer[0..10])?;
        buffer[10..12].copy_from_slice(&self.current_utc_offset.to_be_bytes());
        buffer[12] = 0;
        buffer[13] = self.grandmaster_priority_1;
        self.grandmaster_clock_quality
            .serialize(&mut buffer[14..18])?;
        buffer[18] = self.grandmaster_priority_2;
        self.grandmaster_identity.serialize(&mut buffer[19..27])?;
        buffer[27..29].copy_from_slice(&self.steps_removed.to_be_bytes());
        buffer[29] = self.time_source.to_primitive();

        Ok(())
    }

    pub(crate) fn deserialize_content(buffer: &[u8]) -> Result<Self, WireFormatError> {
        let slice = buffer.get(0..30).ok_or(WireFormatError::BufferTooShort)?;

        // byte 12 is reserved and must be zero
        if slice[12] != 0 {
            return Err(WireFormatError::Invalid);
        }

        // the path cannot contain more than 255 hops
        let steps_removed = u16::from_be_bytes(slice[27..29].try_into().unwrap());
        if steps_removed > 255 {
            return Err(WireFormatError::Invalid);
        }

        Ok(Self {
            origin_timestamp: WireTimestamp::deserialize(&slice[0..10])?,
            current_utc_offset: i16::from_be_bytes(slice[10..12].try_into().unwrap()),
            grandmaster_priority_1: slice[13],
            grandmaster_clock_quality: ClockQuality::deserialize(&slice[14..18])?,
            grandmaster_priority_2: slice[18],
            grandmaster_identity: ClockIdentity::deserialize(&slice[19..27])?,
            steps_removed,
            time_source: TimeSource::from_primitive(slice[29]),
        })
    }

    /// The time properties the sender of this announce message advertises,
    /// combining body fields with the flags of the header it arrived under
    pub fn time_properties(&self, header: &Header) -> TimePropertiesDS {
        TimePropertiesDS {
            current_utc_offset: self.current_utc_offset,
            current_utc_offset_valid: header.current_utc_offset_valid,
            leap59: header.leap59,
            leap61: header.leap61,
            time_traceable: header.time_tracable,
            frequency_traceable: header.frequency_tracable,
            ptp_timescale: header.ptp_timescale,
            time_source: self.time_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wireformat() {
        let representations = [(
            [
                0x00, 0x00, 0x45, 0xb1, 0x11, 0x5a, 0x0a, 0x64, 0xfa, 0xb0, 0x00, 0x25, 0x00, 0x60,
                0x41, 0x27, 0x04, 0xd2, 0x30, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x00,
                0x05, 0xa0u8,
            ],
            AnnounceMessage {
                origin_timestamp: WireTimestamp {
                    seconds: 1169232218,
                    nanos: 174389936,
                },
                current_utc_offset: 37,
                grandmaster_priority_1: 96,
                grandmaster_clock_quality: ClockQuality {
                    clock_class: 65,
                    clock_accuracy: 0x27,
                    offset_scaled_log_variance: 1234,
                },
                grandmaster_priority_2: 48,
                grandmaster_identity: ClockIdentity([1, 2, 3, 4, 5, 6, 7, 8]),
                steps_removed: 5,
                time_source: TimeSource::InternalOscillator,
            },
        )];

        for (byte_representation, object_representation) in representations {
            let mut serialization_buffer = [0; 30];
            object_representation
                .serialize_content(&mut serialization_buffer)
                .unwrap();
            assert_eq!(serialization_buffer, byte_representation);

            let deserialized_data =
                AnnounceMessage::deserialize_content(&byte_representation).unwrap();
            assert_eq!(deserialized_data, object_representation);
        }
    }

    #[test]
    fn nonzero_reserved_byte_is_rejected() {
        let mut buffer = [0u8; 30];
        buffer[12] = 0xaa;
        assert_eq!(
            AnnounceMessage::deserialize_content(&buffer),
            Err(WireFormatError::Invalid)
        );
    }

    #[test]
    fn steps_removed_is_bounded() {
        let mut buffer = [0u8; 30];
        buffer[27..29].copy_from_slice(&255u16.to_be_bytes());
        let announce = AnnounceMessage::deserialize_content(&buffer).unwrap();
        assert_eq!(announce.steps_removed, 255);

        buffer[27..29].copy_from_slice(&256u16.to_be_bytes());
        assert_eq!(
            AnnounceMessage::deserialize_content(&buffer),
            Err(WireFormatError::Invalid)
        );
    }
}

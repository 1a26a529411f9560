use crate::datastructures::{WireFormat, WireFormatError};

/// A description of the accuracy and stability of a clock
///
/// Lower numeric values denote a better clock for both `clock_class` and
/// `clock_accuracy`; `offset_scaled_log_variance` is a log-scaled stability
/// estimate. The numeric ordering is exactly the ordering the best master
/// clock algorithm applies, so the fields are kept as their primitive wire
/// values.
///
/// For more details, see *IEEE1588-2019 section 7.6.2.5*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockQuality {
    /// The PTP clock class, see *IEEE1588-2019 section 7.6.2.5*.
    pub clock_class: u8,
    /// The accuracy of the clock, see *IEEE1588-2019 table 5*.
    pub clock_accuracy: u8,
    /// 2-log of the variance (in seconds^2) of the clock when not
    /// synchronized, see *IEEE1588-2019 section 7.6.3.3*.
    pub offset_scaled_log_variance: u16,
}

impl Default for ClockQuality {
    fn default() -> Self {
        Self {
            // Default to a "slave only" class clock
            clock_class: 248,
            // Accuracy unknown
            clock_accuracy: 0xfe,
            offset_scaled_log_variance: 0xffff,
        }
    }
}

impl WireFormat for ClockQuality {
    fn wire_size(&self) -> usize {
        4
    }

    fn serialize(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        buffer[0] = self.clock_class;
        buffer[1] = self.clock_accuracy;
        buffer[2..4].copy_from_slice(&self.offset_scaled_log_variance.to_be_bytes());
        Ok(())
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, WireFormatError> {
        if buffer.len() < 4 {
            return Err(WireFormatError::BufferTooShort);
        }

        Ok(Self {
            clock_class: buffer[0],
            clock_accuracy: buffer[1],
            offset_scaled_log_variance: u16::from_be_bytes(buffer[2..4].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wireformat() {
        let representations = [(
            [0x7a, 0x2a, 0x12, 0x34u8],
            ClockQuality {
                clock_class: 122,
                clock_accuracy: 0x2a,
                offset_scaled_log_variance: 0x1234,
            },
        )];

        for (byte_representation, object_representation) in representations {
            let mut serialization_buffer = [0; 4];
            object_representation
                .serialize(&mut serialization_buffer)
                .unwrap();
            assert_eq!(serialization_buffer, byte_representation);

            let deserialized_data = ClockQuality::deserialize(&byte_representation).unwrap();
            assert_eq!(deserialized_data, object_representation);
        }
    }
}

use crate::datastructures::{WireFormat, WireFormatError};

/// An on-wire timestamp: whole seconds since the epoch plus nanoseconds
/// within the second
///
/// The seconds field is 48 bits wide on the wire. Deserialization rejects a
/// nanoseconds field of a full second or more.
///
/// For more details, see *IEEE1588-2019 section 5.3.3*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct WireTimestamp {
    /// The seconds field of the timestamp, 48 bits on the wire
    pub seconds: u64,
    /// The nanoseconds field of the timestamp, always less than 10^9
    pub nanos: u32,
}

impl WireFormat for WireTimestamp {
    fn wire_size(&self) -> usize {
        10
    }

    fn serialize(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        buffer[0..6].copy_from_slice(&self.seconds.to_be_bytes()[2..8]);
        buffer[6..10].copy_from_slice(&self.nanos.to_be_bytes());
        Ok(())
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, WireFormatError> {
        if buffer.len() < 10 {
            return Err(WireFormatError::BufferTooShort);
        }

        let mut seconds_buffer = [0; 8];
        seconds_buffer[2..8].copy_from_slice(&buffer[0..6]);

        let nanos = u32::from_be_bytes(buffer[6..10].try_into().unwrap());
        if nanos >= 1_000_000_000 {
            return Err(WireFormatError::Invalid);
        }

        Ok(Self {
            seconds: u64::from_be_bytes(seconds_buffer),
            nanos,
        })
    }
}

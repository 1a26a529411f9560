use crate::datastructures::{common::WireTimestamp, WireFormat, WireFormatError};

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PDelayReqMessage {
    pub origin_timestamp: WireTimestamp,
}

impl PDelayReqMessage {
    pub(crate) fn content_size(&self) -> usize {
        20
    }

    pub(crate) fn serialize_content(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        if buffer.len() < 20 {
            return Err(WireFormatError::BufferTooShort);
        }

        self.origin_timestamp.serialize(&mut buffer[0..10])?;
        buffer[10..20].fill(0);

        Ok(())
    }

    pub(crate) fn deserialize_content(buffer: &[u8]) -> Result<Self, WireFormatError> {
        let slice = buffer.get(0..20).ok_or(WireFormatError::BufferTooShort)?;

        // the second half of the body is reserved and must be zero
        if slice[10..20].iter().any(|b| *b != 0) {
            return Err(WireFormatError::Invalid);
        }

        Ok(Self {
            origin_timestamp: WireTimestamp::deserialize(&slice[0..10])?,
        })
    }
}

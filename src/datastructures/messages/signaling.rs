use crate::datastructures::{common::PortIdentity, WireFormat, WireFormatError};

/// Framing skeleton of a signaling message
///
/// Only the target port identity is interpreted; the TLVs carrying the
/// actual signaling semantics stay in the message suffix for downstream
/// consumers.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalingMessage {
    pub target_port_identity: PortIdentity,
}

impl SignalingMessage {
    pub(crate) fn content_size(&self) -> usize {
        10
    }

    pub(crate) fn serialize_content(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        if buffer.len() < 10 {
            return Err(WireFormatError::BufferTooShort);
        }

        self.target_port_identity.serialize(&mut buffer[0..10])
    }

    pub(crate) fn deserialize_content(buffer: &[u8]) -> Result<Self, WireFormatError> {
        let slice = buffer.get(0..10).ok_or(WireFormatError::BufferTooShort)?;

        Ok(Self {
            target_port_identity: PortIdentity::deserialize(slice)?,
        })
    }
}

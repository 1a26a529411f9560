use super::TlvType;
use crate::datastructures::WireFormatError;

/// A single TLV suffix block of a message
///
/// Only the framing is interpreted here; the semantics of the value bytes
/// are left to the receiver of the TLV.
///
/// For more details, see *IEEE1588-2019 section 14.1*.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    /// The type of this TLV
    pub tlv_type: TlvType,
    /// The raw value bytes, without the type and length fields
    pub value: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Byte size of this TLV on the wire, padded to an even length
    pub fn wire_size(&self) -> usize {
        4 + self.value.len() + self.value.len() % 2
    }

    fn serialize(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        if buffer.len() < self.wire_size() {
            return Err(WireFormatError::BufferTooShort);
        }

        buffer[0..2].copy_from_slice(&self.tlv_type.to_primitive().to_be_bytes());
        buffer[2..4].copy_from_slice(&(self.value.len() as u16).to_be_bytes());
        buffer[4..4 + self.value.len()].copy_from_slice(self.value);
        if self.value.len() % 2 != 0 {
            buffer[4 + self.value.len()] = 0;
        }
        Ok(())
    }

    fn deserialize(buffer: &'a [u8]) -> Result<Self, WireFormatError> {
        let header = buffer.get(0..4).ok_or(WireFormatError::BufferTooShort)?;
        let tlv_type = TlvType::from_primitive(u16::from_be_bytes(header[0..2].try_into().unwrap()));
        let length = u16::from_be_bytes(header[2..4].try_into().unwrap()) as usize;
        let value = buffer
            .get(4..4 + length)
            .ok_or(WireFormatError::BufferTooShort)?;

        Ok(Self { tlv_type, value })
    }
}

/// The TLV suffix of a message, lazily parsed
///
/// Holds the raw suffix bytes; individual TLVs are produced on iteration so
/// no backing storage is needed inside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TlvSet<'a> {
    bytes: &'a [u8],
}

impl<'a> TlvSet<'a> {
    /// Byte size of the whole suffix on the wire
    pub fn wire_size(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn serialize(&self, buffer: &mut [u8]) -> Result<usize, WireFormatError> {
        buffer
            .get_mut(0..self.bytes.len())
            .ok_or(WireFormatError::BufferTooShort)?
            .copy_from_slice(self.bytes);
        Ok(self.bytes.len())
    }

    pub(crate) fn deserialize(mut buffer: &'a [u8]) -> Result<Self, WireFormatError> {
        let bytes = buffer;

        // Validate the framing; the values are not interpreted. Odd length
        // values are followed by a single pad byte.
        while buffer.len() > 3 {
            let length = u16::from_be_bytes(buffer[2..4].try_into().unwrap()) as usize;
            buffer = buffer
                .get(4 + length + length % 2..)
                .ok_or(WireFormatError::BufferTooShort)?;
        }

        if !buffer.is_empty() {
            log::trace!("dropping {} trailing suffix bytes", buffer.len());
        }

        Ok(Self {
            bytes: &bytes[..bytes.len() - buffer.len()],
        })
    }

    /// Iterate over all TLVs in the suffix
    pub fn tlv(&self) -> TlvSetIterator<'a> {
        TlvSetIterator { buffer: self.bytes }
    }

    /// Find the first TLV of the given type, if any
    pub fn find(&self, tlv_type: TlvType) -> Option<Tlv<'a>> {
        self.tlv().find(|tlv| tlv.tlv_type == tlv_type)
    }
}

/// Iterator over the [`Tlv`]s of a [`TlvSet`]
#[derive(Debug, Clone, Copy)]
pub struct TlvSetIterator<'a> {
    buffer: &'a [u8],
}

impl<'a> TlvSetIterator<'a> {
    pub(crate) fn empty() -> Self {
        Self { buffer: &[] }
    }
}

impl<'a> Iterator for TlvSetIterator<'a> {
    type Item = Tlv<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.len() <= 3 {
            return None;
        }

        // The set was validated at deserialization, so this must succeed
        let tlv = Tlv::deserialize(self.buffer).expect("already validated");
        self.buffer = &self.buffer[tlv.wire_size()..];
        Some(tlv)
    }
}

/// Helper to construct a [`TlvSet`] inside a caller provided buffer
#[derive(Debug)]
pub struct TlvSetBuilder<'a> {
    buffer: &'a mut [u8],
    used: usize,
}

impl<'a> TlvSetBuilder<'a> {
    /// Create a builder writing into `buffer`
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, used: 0 }
    }

    /// Append a TLV to the set
    pub fn add(&mut self, tlv: Tlv<'_>) -> Result<(), WireFormatError> {
        tlv.serialize(&mut self.buffer[self.used..])?;
        self.used += tlv.wire_size();
        Ok(())
    }

    /// Finish and return the built set
    pub fn build(self) -> TlvSet<'a> {
        TlvSet {
            bytes: &self.buffer[..self.used],
        }
    }
}

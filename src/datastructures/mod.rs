//! General data structures as defined by the ptp spec

use core::fmt::Debug;

pub mod common;
pub mod datasets;
pub mod messages;

/// Error returned when converting to/from the on-wire representation fails
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum WireFormatError {
    #[cfg_attr(feature = "std", error("enum conversion failed"))]
    EnumConversionError,
    #[cfg_attr(feature = "std", error("buffer too short"))]
    BufferTooShort,
    #[cfg_attr(feature = "std", error("capacity error"))]
    CapacityError,
    #[cfg_attr(feature = "std", error("invalid field value"))]
    Invalid,
}

impl From<arrayvec::CapacityError> for WireFormatError {
    fn from(_: arrayvec::CapacityError) -> Self {
        WireFormatError::CapacityError
    }
}

impl<Enum: num_enum::TryFromPrimitive> From<num_enum::TryFromPrimitiveError<Enum>>
    for WireFormatError
{
    fn from(_: num_enum::TryFromPrimitiveError<Enum>) -> Self {
        Self::EnumConversionError
    }
}

pub(crate) trait WireFormat: Debug + Clone + Eq {
    /// The byte size on the wire of this object
    fn wire_size(&self) -> usize;

    /// Serializes the object into the PTP wire format.
    ///
    /// The caller must provide a buffer of at least [`WireFormat::wire_size`]
    /// bytes.
    fn serialize(&self, buffer: &mut [u8]) -> Result<(), WireFormatError>;

    /// Deserializes the object from the PTP wire format.
    fn deserialize(buffer: &[u8]) -> Result<Self, WireFormatError>;
}

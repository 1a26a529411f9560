use core::ops::{Deref, DerefMut};

use az::Cast;
use fixed::types::I48F16;

use crate::{
    datastructures::{WireFormat, WireFormatError},
    time::Duration,
};

/// The on-wire representation of a time interval
///
/// Nanoseconds in a 48.16 fixed point format, the "scaled nanoseconds" every
/// correctionField and interval field of the protocol is expressed in.
///
/// For more details, see *IEEE1588-2019 section 7.7.2.1*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TimeInterval(pub I48F16);

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TimeInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(TimeInterval(I48F16::from_bits(i64::deserialize(
            deserializer,
        )?)))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TimeInterval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.0.to_bits())
    }
}

impl Deref for TimeInterval {
    type Target = I48F16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for TimeInterval {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl TimeInterval {
    /// The number of whole nanoseconds as a float
    pub fn to_nanos(self) -> f64 {
        self.0.cast()
    }

    /// The raw scaled nanosecond value (units of 2^-16 ns)
    pub fn to_scaled_nanos(self) -> i64 {
        self.0.to_bits()
    }

    /// Build an interval from a raw scaled nanosecond value
    pub fn from_scaled_nanos(scaled: i64) -> Self {
        Self(I48F16::from_bits(scaled))
    }

    /// Add another interval, saturating at the representable bounds
    ///
    /// Residence times accumulated along a transparent clock path must not
    /// wrap around.
    pub fn saturating_add(self, rhs: TimeInterval) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl WireFormat for TimeInterval {
    fn wire_size(&self) -> usize {
        8
    }

    fn serialize(&self, buffer: &mut [u8]) -> Result<(), WireFormatError> {
        buffer[0..8].copy_from_slice(&self.0.to_bits().to_be_bytes());
        Ok(())
    }

    fn deserialize(buffer: &[u8]) -> Result<Self, WireFormatError> {
        let bytes = buffer.get(0..8).ok_or(WireFormatError::BufferTooShort)?;
        Ok(Self(I48F16::from_bits(i64::from_be_bytes(
            bytes.try_into().unwrap(),
        ))))
    }
}

impl From<Duration> for TimeInterval {
    fn from(duration: Duration) -> Self {
        let val = (duration.nanos().to_bits() >> 16) as i64;
        TimeInterval(I48F16::from_bits(val))
    }
}

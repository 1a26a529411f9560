use core::{
    fmt,
    ops::{Add, AddAssign, Sub, SubAssign},
};

use fixed::{
    traits::ToFixed,
    types::{I96F32, U96F32},
};

use super::Duration;
use crate::datastructures::common::{TimeInterval, WireTimestamp};

/// A point in time on the timescale of the local PTP domain
///
/// Stored as nanoseconds since the origin of the timescale, with fractional
/// bits so that correctionField resolution survives conversions.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct Time {
    /// Time in nanoseconds since the origin
    inner: U96F32,
}

impl Time {
    /// Create an instance with the given amount of seconds from the origin
    pub fn from_secs(secs: u64) -> Self {
        let inner = U96F32::from_num(secs) * 1_000_000_000;
        Self { inner }
    }

    /// Create an instance with the given amount of milliseconds from the
    /// origin
    pub fn from_millis(millis: u64) -> Self {
        let inner = U96F32::from_num(millis) * 1_000_000;
        Self { inner }
    }

    /// Create an instance with the given amount of microseconds from the
    /// origin
    pub fn from_micros(micros: u64) -> Self {
        let inner = U96F32::from_num(micros) * 1_000;
        Self { inner }
    }

    /// Create an instance with the given amount of nanoseconds from the
    /// origin
    pub fn from_nanos(nanos: u64) -> Self {
        let inner = U96F32::from_num(nanos);
        Self { inner }
    }

    /// Create an instance from a fixed-point amount of nanoseconds
    pub fn from_fixed_nanos<F: ToFixed>(nanos: F) -> Self {
        Self {
            inner: nanos.to_fixed(),
        }
    }

    /// Create an instance from whole seconds and separate nanoseconds
    pub fn from_secs_nanos(secs: u64, nanos: u32) -> Self {
        Self::from_fixed_nanos(U96F32::from_num(secs) * 1_000_000_000 + U96F32::from_num(nanos))
    }

    /// The number of nanoseconds since the origin
    pub fn nanos(&self) -> U96F32 {
        self.inner
    }

    /// The whole seconds part
    pub fn secs(&self) -> u64 {
        (self.inner / 1_000_000_000).to_num()
    }

    /// The nanoseconds within the current second
    pub fn subsec_nanos(&self) -> u32 {
        (self.inner % 1_000_000_000).to_num()
    }

    /// The fractional nanoseconds part, as an on-wire correction
    ///
    /// Timestamp fields on the wire carry whole nanoseconds; the remainder
    /// travels in the correctionField.
    pub fn subnanos(&self) -> TimeInterval {
        let scaled_nanos: i64 = (self.inner.frac().to_bits() >> 16) as i64;
        TimeInterval(fixed::types::I48F16::from_bits(scaled_nanos))
    }
}

impl From<WireTimestamp> for Time {
    fn from(timestamp: WireTimestamp) -> Self {
        Self::from_secs_nanos(timestamp.seconds, timestamp.nanos)
    }
}

impl From<Time> for WireTimestamp {
    fn from(time: Time) -> Self {
        WireTimestamp {
            seconds: time.secs(),
            nanos: time.subsec_nanos(),
        }
    }
}

impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Self::Output {
        if rhs.nanos().is_negative() {
            if self.inner.to_num::<I96F32>() < rhs.nanos().abs() {
                Self::default()
            } else {
                Self {
                    inner: self.inner - rhs.nanos().unsigned_abs(),
                }
            }
        } else {
            Self {
                inner: self.inner + rhs.nanos().unsigned_abs(),
            }
        }
    }
}

impl AddAssign<Duration> for Time {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl Sub<Duration> for Time {
    type Output = Time;

    fn sub(self, rhs: Duration) -> Self::Output {
        self + -rhs
    }
}

impl SubAssign<Duration> for Time {
    fn sub_assign(&mut self, rhs: Duration) {
        *self = *self - rhs;
    }
}

impl Sub for Time {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration::from_fixed_nanos(self.inner.to_num::<I96F32>() - rhs.inner.to_num::<I96F32>())
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_arithmetic() {
        let a = Time::from_nanos(100);

        assert_eq!(a + Duration::from_nanos(50), Time::from_nanos(150));
        assert_eq!(a - Duration::from_nanos(50), Time::from_nanos(50));
        assert_eq!(a + Duration::from_nanos(-50), Time::from_nanos(50));
        assert_eq!(
            Time::from_nanos(150) - Time::from_nanos(100),
            Duration::from_nanos(50)
        );
        assert_eq!(
            Time::from_nanos(100) - Time::from_nanos(150),
            Duration::from_nanos(-50)
        );
    }

    #[test]
    fn underflow_saturates_at_origin() {
        assert_eq!(
            Time::from_nanos(10) - Duration::from_nanos(20),
            Time::default()
        );
    }

    #[test]
    fn seconds_split() {
        let t = Time::from_secs_nanos(5, 999_999_999);
        assert_eq!(t.secs(), 5);
        assert_eq!(t.subsec_nanos(), 999_999_999);
    }

    #[test]
    fn wire_round_trip() {
        let wire = WireTimestamp {
            seconds: 12345,
            nanos: 678_910,
        };
        assert_eq!(WireTimestamp::from(Time::from(wire)), wire);
    }
}

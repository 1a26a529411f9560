use core::{
    fmt,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign},
};

use az::Cast;
use fixed::types::I96F32;

use super::Interval;
use crate::datastructures::common::TimeInterval;

/// A signed amount of time
///
/// The fractional bits hold sub-nanosecond precision so that accumulated
/// correctionField values do not lose their 2^-16 ns resolution.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct Duration {
    /// Time in nanoseconds
    inner: I96F32,
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Duration::from_nanos(i64::deserialize(deserializer)?))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Duration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // whole nanoseconds are enough for configuration and reporting
        serializer.serialize_i64(self.nanos_rounded() as i64)
    }
}

impl Duration {
    /// A duration of zero length
    pub const ZERO: Duration = Duration {
        inner: I96F32::ZERO,
    };

    /// Create an instance with the given amount of seconds
    pub fn from_secs(secs: i64) -> Self {
        let inner = I96F32::from_num(secs) * 1_000_000_000;
        Self { inner }
    }

    /// Create an instance with the given amount of milliseconds
    pub fn from_millis(millis: i64) -> Self {
        let inner = I96F32::from_num(millis) * 1_000_000;
        Self { inner }
    }

    /// Create an instance with the given amount of microseconds
    pub fn from_micros(micros: i64) -> Self {
        let inner = I96F32::from_num(micros) * 1_000;
        Self { inner }
    }

    /// Create an instance with the given amount of nanoseconds
    pub fn from_nanos(nanos: i64) -> Self {
        let inner = I96F32::from_num(nanos);
        Self { inner }
    }

    /// Create an instance from a fixed-point amount of nanoseconds
    pub fn from_fixed_nanos<F: Into<I96F32>>(nanos: F) -> Self {
        Self {
            inner: nanos.into(),
        }
    }

    /// Create an instance from an [`Interval`]
    pub fn from_interval(interval: Interval) -> Self {
        let seconds = interval.seconds();
        Self {
            inner: I96F32::from_num(seconds * 1_000_000_000.0),
        }
    }

    /// The number of nanoseconds in this duration
    pub fn nanos(&self) -> I96F32 {
        self.inner
    }

    /// The whole number of nanoseconds, rounded towards zero
    pub fn nanos_rounded(&self) -> i128 {
        self.inner.to_num()
    }

    /// The number of nanoseconds as a float
    pub fn nanos_lossy(&self) -> f64 {
        self.inner.cast()
    }

    /// The whole number of seconds, rounded towards zero
    pub fn secs(&self) -> i64 {
        (self.inner / 1_000_000_000).to_num()
    }

    /// The duration in seconds as a float
    pub fn seconds(&self) -> f64 {
        self.nanos_lossy() / 1e9
    }

    /// The absolute value
    pub fn abs(self) -> Duration {
        if self.inner.is_negative() {
            -self
        } else {
            self
        }
    }

    /// Converts to the on-wire scaled nanosecond representation, saturating
    /// at the bounds of [`TimeInterval`]
    pub fn to_time_interval(self) -> TimeInterval {
        TimeInterval::from(self)
    }
}

impl From<TimeInterval> for Duration {
    fn from(interval: TimeInterval) -> Self {
        // a TimeInterval is I48F16 nanoseconds, which always fits
        Self {
            inner: interval.0.into(),
        }
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Self::Output {
        Self { inner: -self.inner }
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner + rhs.inner,
        }
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        self.inner += rhs.inner;
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner - rhs.inner,
        }
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Self) {
        self.inner -= rhs.inner;
    }
}

impl<T: Into<I96F32>> Mul<T> for Duration {
    type Output = Duration;

    fn mul(self, rhs: T) -> Self::Output {
        Self {
            inner: self.inner * rhs.into(),
        }
    }
}

impl<T: Into<I96F32>> Div<T> for Duration {
    type Output = Duration;

    fn div(self, rhs: T) -> Self::Output {
        Self {
            inner: self.inner / rhs.into(),
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.nanos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(Duration::from_secs(2).nanos(), 2_000_000_000);
        assert_eq!(Duration::from_millis(2).nanos(), 2_000_000);
        assert_eq!(Duration::from_micros(2).nanos(), 2_000);
        assert_eq!(Duration::from_nanos(2).nanos(), 2);
        assert_eq!(Duration::from_secs(-3).secs(), -3);
    }

    #[test]
    fn arithmetic() {
        let a = Duration::from_nanos(500);
        let b = Duration::from_nanos(-300);

        assert_eq!((a + b).nanos_rounded(), 200);
        assert_eq!((a - b).nanos_rounded(), 800);
        assert_eq!((b * 2).nanos_rounded(), -600);
        assert_eq!((a / 2).nanos_rounded(), 250);
        assert_eq!(b.abs(), Duration::from_nanos(300));
        assert_eq!(-b, Duration::from_nanos(300));
    }

    #[test]
    fn interval_round_trip() {
        let duration = Duration::from_nanos(1234);
        let interval = duration.to_time_interval();
        assert_eq!(Duration::from(interval), duration);
    }
}

use super::Duration;

/// A log2 representation of seconds, used for the pacing of periodic PTP
/// messages
///
/// `logAnnounceInterval`, `logSyncInterval` and the delay request intervals
/// all travel on the wire in this form.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval(i8);

impl core::fmt::Debug for Interval {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Interval")
            .field("seconds", &self.seconds())
            .field("log_base_2", &self.0)
            .finish()
    }
}

impl Interval {
    /// An interval of one second
    pub const ONE_SECOND: Self = Self(0);

    /// An interval of two seconds
    pub const TWO_SECONDS: Self = Self(1);

    /// Construct an [`Interval`] from log2 seconds
    pub const fn from_log_2(log_2: i8) -> Self {
        Self(log_2)
    }

    /// The log2 of the number of seconds of this interval
    pub const fn as_log_2(self) -> i8 {
        self.0
    }

    /// The number of seconds as a float
    pub fn seconds(self) -> f64 {
        libm::exp2(self.0 as f64)
    }

    /// Turn this into a [`Duration`]
    pub fn as_duration(self) -> Duration {
        Duration::from_interval(self)
    }
}

impl From<i8> for Interval {
    fn from(value: i8) -> Self {
        Self::from_log_2(value)
    }
}

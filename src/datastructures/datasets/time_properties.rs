use crate::datastructures::common::TimeSource;

/// A concrete implementation of the PTP Time Properties dataset
/// (IEEE1588-2019 section 8.2.4)
///
/// This dataset describes the timescale the instance distributes, including
/// pending leap seconds and the traceability of the time source.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimePropertiesDS {
    /// The offset off UTC time compared to TAI time in seconds
    pub current_utc_offset: i16,
    /// Whether the `current_utc_offset` is considered correct
    pub current_utc_offset_valid: bool,
    /// The last minute of the current UTC day will have 59 seconds
    pub leap59: bool,
    /// The last minute of the current UTC day will have 61 seconds
    pub leap61: bool,
    /// Whether the timescale is traceable to a primary reference
    pub time_traceable: bool,
    /// Whether the frequency determining the timescale is traceable to a
    /// primary reference
    pub frequency_traceable: bool,
    /// Whether the timescale of the instance is PTP (TAI) or arbitrary
    pub ptp_timescale: bool,
    /// The source driving the grandmaster's clock
    pub time_source: TimeSource,
}

impl TimePropertiesDS {
    /// Create a Time Properties data set for the PTP timescale
    pub fn new_ptp_time(
        current_utc_offset: i16,
        current_utc_offset_valid: bool,
        leap59: bool,
        leap61: bool,
        time_traceable: bool,
        frequency_traceable: bool,
        time_source: TimeSource,
    ) -> Self {
        TimePropertiesDS {
            current_utc_offset,
            current_utc_offset_valid,
            leap59,
            leap61,
            time_traceable,
            frequency_traceable,
            ptp_timescale: true,
            time_source,
        }
    }

    /// Create a Time Properties data set for an arbitrary timescale
    pub fn new_arbitrary_time(
        time_traceable: bool,
        frequency_traceable: bool,
        time_source: TimeSource,
    ) -> Self {
        TimePropertiesDS {
            current_utc_offset: 0,
            current_utc_offset_valid: false,
            leap59: false,
            leap61: false,
            time_traceable,
            frequency_traceable,
            ptp_timescale: false,
            time_source,
        }
    }

    /// Whether the time is the PTP (TAI derived) timescale
    pub fn is_ptp(&self) -> bool {
        self.ptp_timescale
    }
}

impl Default for TimePropertiesDS {
    fn default() -> Self {
        Self::new_arbitrary_time(false, false, TimeSource::InternalOscillator)
    }
}

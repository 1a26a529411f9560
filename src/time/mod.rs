//! Types describing points in time ([`Time`]), differences between two
//! instants ([`Duration`]), and the log2 message pacing used by PTP
//! ([`Interval`])
//!
//! All protocol arithmetic is done on these fixed-point types rather than
//! [`core::time`] types, as they map directly onto the on-wire scaled
//! nanosecond representation.

mod duration;
mod instant;
mod interval;

pub use duration::Duration;
pub use instant::Time;
pub use interval::Interval;

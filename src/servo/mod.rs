//! The clock discipline servo
//!
//! The servo turns the offsets produced by the measurement pipeline into
//! frequency adjustments for the local clock. It deliberately does not talk
//! to the clock itself; the port applies the returned actions through the
//! [`Clock`](crate::Clock) trait so that all hardware access stays on one
//! seam.

mod pi;

pub use pi::PiServo;

use crate::time::Duration;

/// Tuning parameters of the [`PiServo`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoConfig {
    /// Proportional gain of the controller
    pub kp: f64,
    /// Integral gain of the controller
    pub ki: f64,
    /// Offsets at or below this magnitude count towards lock
    pub lock_threshold_ns: u64,
    /// Offsets above this magnitude drop the lock again; must be larger
    /// than `lock_threshold_ns` to get hysteresis
    pub unlock_threshold_ns: u64,
    /// How many consecutive in-threshold samples are needed to declare lock
    pub lock_samples: u8,
    /// Offsets beyond this magnitude are corrected by stepping the clock
    /// instead of slewing
    pub step_threshold: Duration,
    /// Bound on the frequency adjustment output, in parts per billion
    pub max_frequency_ppb: f64,
    /// Bound on the integral term, in parts per billion
    pub integral_limit_ppb: f64,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            kp: 0.7,
            ki: 0.3,
            lock_threshold_ns: 100_000,
            unlock_threshold_ns: 500_000,
            lock_samples: 4,
            step_threshold: Duration::from_secs(1),
            // 100 ppm
            max_frequency_ppb: 100_000.0,
            integral_limit_ppb: 50_000.0,
        }
    }
}

/// What the servo wants done to the clock after absorbing a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoAction {
    /// Slew the clock by adjusting its frequency
    AdjustFrequency {
        /// Frequency adjustment in parts per billion
        ppb: f64,
    },
    /// The offset was too large to slew away; set the clock directly and
    /// start over
    StepClock {
        /// The correction to apply
        offset: Duration,
    },
}

/// The synchronization state of the servo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LockState {
    /// Not (yet) tracking the master within the lock threshold
    Unlocked,
    /// Offsets have stayed within the lock threshold
    Locked,
    /// Input samples stopped; the frequency output is frozen at its last
    /// value
    Holdover,
}

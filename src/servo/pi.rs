//! Implementation of [`PiServo`]

use super::{LockState, ServoAction, ServoConfig};
use crate::time::{Duration, Time};

/// A discrete time PI controller disciplining the local clock
///
/// The phase input stays in integer nanoseconds; floats only appear on the
/// parts-per-billion output path.
#[derive(Debug)]
pub struct PiServo {
    config: ServoConfig,
    /// Integral term, in parts per billion
    integral_ppb: f64,
    /// The last frequency adjustment handed out
    last_frequency_ppb: f64,
    last_update: Option<Time>,
    lock_state: LockState,
    samples_in_threshold: u8,
}

impl PiServo {
    pub fn new(config: ServoConfig) -> Self {
        debug_assert!(config.unlock_threshold_ns > config.lock_threshold_ns);

        Self {
            config,
            integral_ppb: 0.0,
            last_frequency_ppb: 0.0,
            last_update: None,
            lock_state: LockState::Unlocked,
            samples_in_threshold: 0,
        }
    }

    /// Absorb one offset measurement taken at `now`
    pub fn sample(&mut self, offset: Duration, now: Time) -> ServoAction {
        if offset.abs() > self.config.step_threshold {
            log::warn!("Offset {} too large to slew, stepping clock", offset);
            self.reset();
            return ServoAction::StepClock { offset: -offset };
        }

        let offset_ns = offset.nanos_lossy();

        // Normalize the integral contribution to the actual sample spacing
        let dt = match self.last_update {
            Some(last_update) => (now - last_update).seconds().max(1e-3),
            None => 1.0,
        };
        self.last_update = Some(now);

        self.integral_ppb += self.config.ki * offset_ns * dt;
        self.integral_ppb = self.integral_ppb.clamp(
            -self.config.integral_limit_ppb,
            self.config.integral_limit_ppb,
        );

        let ppb = (self.config.kp * offset_ns + self.integral_ppb).clamp(
            -self.config.max_frequency_ppb,
            self.config.max_frequency_ppb,
        );
        self.last_frequency_ppb = ppb;

        self.update_lock_state(offset);

        ServoAction::AdjustFrequency { ppb }
    }

    fn update_lock_state(&mut self, offset: Duration) {
        let magnitude_ns = offset.abs().nanos_rounded() as u128;

        if magnitude_ns <= self.config.lock_threshold_ns as u128 {
            self.samples_in_threshold = self.samples_in_threshold.saturating_add(1);
            if self.samples_in_threshold >= self.config.lock_samples {
                if self.lock_state != LockState::Locked {
                    log::info!("Servo locked");
                }
                self.lock_state = LockState::Locked;
            }
        } else if magnitude_ns > self.config.unlock_threshold_ns as u128 {
            if self.lock_state == LockState::Locked {
                log::warn!("Servo lost lock, offset {}", offset);
            }
            self.lock_state = LockState::Unlocked;
            self.samples_in_threshold = 0;
        } else if self.lock_state != LockState::Locked {
            // between the thresholds: existing lock survives (hysteresis)
            // but new lock progress starts over
            self.samples_in_threshold = 0;
        }
    }

    /// Freeze the frequency output because input samples stopped arriving
    ///
    /// The last frequency adjustment stays in effect on the hardware; the
    /// servo only records that it is coasting.
    pub fn enter_holdover(&mut self) {
        if self.lock_state != LockState::Holdover {
            log::warn!("Servo entering holdover");
        }
        self.lock_state = LockState::Holdover;
        self.samples_in_threshold = 0;
    }

    /// Forget all controller state
    ///
    /// Used when the port stops being a slave or after a clock step, since
    /// history from before either event no longer describes the clock.
    pub fn reset(&mut self) {
        self.integral_ppb = 0.0;
        self.last_frequency_ppb = 0.0;
        self.last_update = None;
        self.lock_state = LockState::Unlocked;
        self.samples_in_threshold = 0;
    }

    /// The current lock state
    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    /// Whether the servo currently considers itself locked
    pub fn is_locked(&self) -> bool {
        self.lock_state == LockState::Locked
    }

    /// The most recent frequency adjustment, in parts per billion
    pub fn frequency_ppb(&self) -> f64 {
        self.last_frequency_ppb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_servo() -> PiServo {
        PiServo::new(ServoConfig::default())
    }

    #[test]
    fn proportional_and_integral_terms() {
        let mut servo = test_servo();

        let ServoAction::AdjustFrequency { ppb } =
            servo.sample(Duration::from_nanos(1000), Time::from_secs(1))
        else {
            panic!("expected a frequency adjustment");
        };

        // first sample: kp * 1000 + ki * 1000 * 1s
        assert!((ppb - 1000.0).abs() < 1e-9);

        let ServoAction::AdjustFrequency { ppb } =
            servo.sample(Duration::from_nanos(1000), Time::from_secs(2))
        else {
            panic!("expected a frequency adjustment");
        };

        // the integral term accumulates
        assert!((ppb - 1300.0).abs() < 1e-9);
    }

    #[test]
    fn output_is_clamped() {
        let mut servo = test_servo();

        let ServoAction::AdjustFrequency { ppb } =
            servo.sample(Duration::from_millis(900), Time::from_secs(1))
        else {
            panic!("expected a frequency adjustment");
        };

        assert_eq!(ppb, 100_000.0);
    }

    #[test]
    fn anti_windup_clamps_the_integral() {
        let mut servo = test_servo();

        // keep feeding a large offset; the integral must not run away
        for i in 1..100 {
            servo.sample(Duration::from_millis(500), Time::from_secs(i));
        }
        assert!(servo.integral_ppb <= 50_000.0);

        // and it recovers immediately once the error flips sign
        let ServoAction::AdjustFrequency { ppb } =
            servo.sample(Duration::from_millis(-500), Time::from_secs(200))
        else {
            panic!("expected a frequency adjustment");
        };
        assert!(ppb < 0.0 || ppb < 100_000.0);
    }

    #[test]
    fn large_offset_requests_step_and_resets() {
        let mut servo = test_servo();

        servo.sample(Duration::from_nanos(50), Time::from_secs(1));

        let action = servo.sample(Duration::from_secs(2), Time::from_secs(2));
        assert_eq!(
            action,
            ServoAction::StepClock {
                offset: Duration::from_secs(-2)
            }
        );
        assert_eq!(servo.integral_ppb, 0.0);
        assert_eq!(servo.lock_state(), LockState::Unlocked);
    }

    #[test]
    fn lock_needs_consecutive_samples() {
        let mut servo = test_servo();

        for i in 1..=3 {
            servo.sample(Duration::from_nanos(50), Time::from_secs(i));
            assert!(!servo.is_locked());
        }
        servo.sample(Duration::from_nanos(50), Time::from_secs(4));
        assert!(servo.is_locked());
    }

    #[test]
    fn unlock_has_hysteresis() {
        let mut servo = test_servo();

        for i in 1..=4 {
            servo.sample(Duration::from_nanos(50), Time::from_secs(i));
        }
        assert!(servo.is_locked());

        // above lock threshold but below unlock threshold: still locked
        servo.sample(Duration::from_nanos(200_000), Time::from_secs(5));
        assert!(servo.is_locked());

        // above the unlock threshold: lock is lost
        servo.sample(Duration::from_nanos(600_000), Time::from_secs(6));
        assert!(!servo.is_locked());
    }

    #[test]
    fn holdover_freezes_frequency() {
        let mut servo = test_servo();

        servo.sample(Duration::from_nanos(1000), Time::from_secs(1));
        let frozen = servo.frequency_ppb();

        servo.enter_holdover();
        assert_eq!(servo.lock_state(), LockState::Holdover);
        assert_eq!(servo.frequency_ppb(), frozen);
    }
}

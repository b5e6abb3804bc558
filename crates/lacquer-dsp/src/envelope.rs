//! Envelope follower for dynamics processors
//!
//! One-pole smoother over a target gain with split rise/fall time
//! constants: `a = exp(-1 / (sr * t))`, attack branch when the target is
//! below the current value (gain falling = signal being reduced).

/// Split attack/release one-pole gain follower.
///
/// Operates in the linear gain domain; 1.0 is unity.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    attack_coeff: f64,
    release_coeff: f64,
    value: f64,
    sample_rate: f64,
}

impl EnvelopeFollower {
    pub fn new(sample_rate: f64, attack_ms: f64, release_ms: f64) -> Self {
        let mut follower = Self {
            attack_coeff: 0.0,
            release_coeff: 0.0,
            value: 1.0,
            sample_rate,
        };
        follower.set_attack_ms(attack_ms);
        follower.set_release_ms(release_ms);
        follower
    }

    pub fn set_attack_ms(&mut self, ms: f64) {
        self.attack_coeff = Self::coeff(self.sample_rate, ms);
    }

    pub fn set_release_ms(&mut self, ms: f64) {
        self.release_coeff = Self::coeff(self.sample_rate, ms);
    }

    #[inline]
    fn coeff(sample_rate: f64, ms: f64) -> f64 {
        (-1.0 / (sample_rate * (ms / 1000.0).max(1e-6))).exp()
    }

    /// Advance one sample towards `target` and return the smoothed gain.
    #[inline(always)]
    pub fn process(&mut self, target: f64) -> f64 {
        let a = if target < self.value {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.value = a * self.value + (1.0 - a) * target;
        self.value
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Back to unity gain
    pub fn reset(&mut self) {
        self.value = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_unity() {
        let follower = EnvelopeFollower::new(48000.0, 10.0, 100.0);
        assert_eq!(follower.value(), 1.0);
    }

    #[test]
    fn test_attack_faster_than_release() {
        let mut down = EnvelopeFollower::new(48000.0, 1.0, 100.0);
        let mut up = EnvelopeFollower::new(48000.0, 1.0, 100.0);

        // Drive down for 1ms, then watch it recover more slowly
        for _ in 0..48 {
            down.process(0.5);
        }
        let after_attack = down.value();
        assert!(after_attack < 0.7, "attack too slow: {after_attack}");

        up.value = 0.5;
        for _ in 0..48 {
            up.process(1.0);
        }
        let after_release = up.value();
        assert!(
            after_release < 0.75,
            "release should be slower than attack: {after_release}"
        );
    }

    #[test]
    fn test_converges_to_target() {
        let mut follower = EnvelopeFollower::new(48000.0, 1.0, 10.0);
        for _ in 0..48000 {
            follower.process(0.25);
        }
        assert!((follower.value() - 0.25).abs() < 1e-6);
    }
}

//! Duty cycle sweep arithmetic, without any timing or hardware access.

/// The boundary at which the sweep turned around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Lower,
    Upper,
}

/// Inclusive duty cycle limits in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DutyRange {
    pub min: f64,
    pub max: f64,
}

impl DutyRange {
    pub fn contains(&self, duty: f64) -> bool {
        self.min <= duty && duty <= self.max
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Oscillator {
    current: f64,
    step: f64,
    range: DutyRange,
}

impl Oscillator {
    pub fn new(current: f64, step: f64, range: DutyRange) -> Self {
        Self { current, step, range }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn range(&self) -> DutyRange {
        self.range
    }

    /// Moves `current` by one step. If that leaves the range, the direction
    /// is flipped and the flipped step is applied twice, bouncing the value
    /// back inside.
    pub fn advance(&mut self) -> Option<Turn> {
        self.current += self.step;

        let turn = if self.current > self.range.max {
            Turn::Upper
        } else if self.current < self.range.min {
            Turn::Lower
        } else {
            return None;
        };

        self.step = -self.step;
        self.current += self.step;
        self.current += self.step;
        Some(turn)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const RANGE: DutyRange = DutyRange { min: 2.1, max: 10.9 };

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn should_reach_lower_bound_after_39_steps_from_center() {
        let mut osc = Oscillator::new(6.0, -0.1, RANGE);
        for _ in 0..39 {
            assert_eq!(osc.advance(), None);
        }
        assert_close(osc.current(), 2.1);
        assert_close(osc.step(), -0.1);

        assert_eq!(osc.advance(), Some(Turn::Lower));
        assert_close(osc.current(), 2.2);
        assert_close(osc.step(), 0.1);
    }

    #[test]
    fn should_turn_at_upper_bound() {
        let mut osc = Oscillator::new(10.85, 0.1, RANGE);
        assert_eq!(osc.advance(), Some(Turn::Upper));
        assert_close(osc.current(), 10.75);
        assert_close(osc.step(), -0.1);
        assert_eq!(osc.advance(), None);
        assert_close(osc.current(), 10.65);
    }

    #[test]
    fn should_bounce_by_twice_the_flipped_step() {
        let mut osc = Oscillator::new(2.15, -0.1, RANGE);
        assert_eq!(osc.advance(), Some(Turn::Lower));
        // 2.05 is out of range, so the result is 2.05 + 2 * 0.1
        assert_close(osc.current(), 2.05 + 2.0 * 0.1);
        assert_close(osc.step(), 0.1);
    }

    #[test]
    fn should_not_turn_when_landing_exactly_on_a_bound() {
        let range = DutyRange { min: 0.0, max: 1.0 };
        let mut osc = Oscillator::new(0.5, 0.5, range);
        assert_eq!(osc.advance(), None);
        assert_eq!(osc.current(), 1.0);
        assert_eq!(osc.advance(), Some(Turn::Upper));
        assert_eq!(osc.current(), 0.5);
        assert_eq!(osc.step(), -0.5);
    }

    #[test]
    fn should_only_flip_step_at_turns() {
        let mut osc = Oscillator::new(6.0, -0.1, RANGE);
        for _ in 0..1000 {
            let before = osc.step();
            match osc.advance() {
                Some(Turn::Lower) => assert!(before < 0.0 && osc.step() > 0.0),
                Some(Turn::Upper) => assert!(before > 0.0 && osc.step() < 0.0),
                None => assert_eq!(before, osc.step()),
            }
        }
    }

    #[test]
    fn should_stay_within_range_for_random_sweeps() {
        let mut rng = SmallRng::seed_from_u64(0x5e7f0);

        for _ in 0..500 {
            let min = rng.gen_range(0.0..50.0);
            let max = min + rng.gen_range(0.5..50.0);
            let range = DutyRange { min, max };
            let magnitude = rng.gen_range(0.001..=(max - min) / 2.0);
            let step = if rng.gen_bool(0.5) { magnitude } else { -magnitude };
            let start = rng.gen_range(min..=max);

            let mut osc = Oscillator::new(start, step, range);
            for _ in 0..2000 {
                osc.advance();
                assert!(
                    range.contains(osc.current()),
                    "{} left [{}, {}] with step {}",
                    osc.current(),
                    min,
                    max,
                    osc.step()
                );
            }
        }
    }
}

// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Step-wise decay driven by the global step:
//
//   each step:  if step > threshold:
//                   threshold += every
//                   lr        *= decay
//               emit lr
//
// The schedule is an infinite Iterator<Item = f64>. A resumed
// run fast-forwards it with `starting_at(global_step)` so the
// rate continues where the previous run left off.
//
// Reference: Rust Book §13 (Iterators)

use crate::domain::hparams::Hyperparameters;

#[derive(Debug, Clone)]
pub struct LrSchedule {
    lr:        f64,
    threshold: u64,
    every:     u64,
    decay:     f64,
    step:      u64,
}

impl LrSchedule {
    pub fn new(lr: f64, start_at: u64, every: u64, decay: f64) -> Self {
        Self { lr, threshold: start_at, every, decay, step: 0 }
    }

    pub fn from_hparams(h: &Hyperparameters) -> Self {
        Self::new(h.learning_rate, h.decay_start_at, h.decay_every, h.decay_rate)
    }

    /// Replay the first `step` yields.
    pub fn starting_at(mut self, step: u64) -> Self {
        for _ in 0..step {
            self.advance();
        }
        self
    }

    fn advance(&mut self) -> f64 {
        if self.step > self.threshold {
            self.threshold += self.every;
            self.lr *= self.decay;
        }
        self.step += 1;
        self.lr
    }
}

impl Iterator for LrSchedule {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.advance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_sequence() {
        let rates: Vec<f64> = LrSchedule::new(0.1, 2, 3, 0.5).take(6).collect();
        assert_eq!(rates, vec![0.1, 0.1, 0.1, 0.05, 0.05, 0.05]);
    }

    #[test]
    fn test_starting_at_matches_replay() {
        let full: Vec<f64> = LrSchedule::new(1.0, 1, 2, 0.5).take(10).collect();
        let resumed: Vec<f64> = LrSchedule::new(1.0, 1, 2, 0.5).starting_at(6).take(4).collect();
        assert_eq!(&full[6..], resumed.as_slice());
    }

    #[test]
    fn test_constant_before_decay_start() {
        let h = Hyperparameters::default();
        let first: Vec<f64> = LrSchedule::from_hparams(&h).take(100).collect();
        assert!(first.iter().all(|&lr| lr == h.learning_rate));
    }
}

// ============================================================
// Layer 5 — Beam Search Bookkeeping
// ============================================================
// Host-side state of a beam search over `batch` examples with
// `width` hypotheses each. The decoder runs on the device; after
// every step its log-probabilities come back here and `advance`
// decides which hypotheses survive.
//
//   score(hyp)  = Σ log p(token)         no length penalty
//   candidates  = live hyp × every token, finished hyp × <EOS>
//   survivors   = top `width` candidates per example
//
// Rows are laid out example-major: row = example · width + k.
// `advance` returns, for every new row, the row it extends
// (so the caller can reorder decoder state) and the token it
// appended (the next decoder input).
//
// At the first step only hypothesis 0 of each example is live,
// so the initial beam does not contain `width` copies of the
// same prefix.
//
// Reference: Sutskever, Vinyals & Le (2014) §3.1

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    pub tokens:   Vec<usize>,
    pub score:    f64,
    pub finished: bool,
}

impl Hypothesis {
    fn dead() -> Self {
        Self { tokens: Vec::new(), score: f64::NEG_INFINITY, finished: false }
    }

    fn is_live(&self) -> bool {
        self.score > f64::NEG_INFINITY
    }
}

#[derive(Debug, Clone)]
pub struct BeamSearch {
    width:  usize,
    eos_id: usize,
    /// One beam per example, sorted by score (rank 0 first)
    beams:  Vec<Vec<Hypothesis>>,
}

/// Result of one `advance`: per new row, its parent row and appended token.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamStep {
    pub parents: Vec<usize>,
    pub tokens:  Vec<usize>,
}

impl BeamSearch {
    pub fn new(batch: usize, width: usize, eos_id: usize) -> Self {
        let beams = (0..batch)
            .map(|_| {
                let mut beam = vec![Hypothesis::dead(); width];
                if let Some(first) = beam.first_mut() {
                    first.score = 0.0;
                }
                beam
            })
            .collect();
        Self { width, eos_id, beams }
    }

    pub fn rows(&self) -> usize {
        self.beams.len() * self.width
    }

    /// `log_probs`: row-major [rows, vocab].
    pub fn advance(&mut self, log_probs: &[f32], vocab: usize) -> BeamStep {
        let mut parents = Vec::with_capacity(self.rows());
        let mut tokens  = Vec::with_capacity(self.rows());

        for (example, beam) in self.beams.iter_mut().enumerate() {
            // (score, parent k, token)
            let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
            for (k, hyp) in beam.iter().enumerate() {
                if !hyp.is_live() {
                    continue;
                }
                if hyp.finished {
                    candidates.push((hyp.score, k, self.eos_id));
                    continue;
                }
                let row = (example * self.width + k) * vocab;
                candidates.extend(
                    log_probs[row..row + vocab]
                        .iter()
                        .enumerate()
                        .map(|(v, &lp)| (hyp.score + lp as f64, k, v)),
                );
            }

            candidates.sort_by(|a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(Ordering::Equal)
                    .then(a.1.cmp(&b.1))
                    .then(a.2.cmp(&b.2))
            });
            candidates.truncate(self.width);

            let mut next_beam = Vec::with_capacity(self.width);
            for &(score, k, token) in &candidates {
                let parent = &beam[k];
                let mut hyp = parent.clone();
                hyp.score = score;
                if !parent.finished {
                    hyp.tokens.push(token);
                    hyp.finished = token == self.eos_id;
                }
                next_beam.push(hyp);
                parents.push(example * self.width + k);
                tokens.push(token);
            }
            // Fewer candidates than width only happens with a tiny vocabulary
            while next_beam.len() < self.width {
                next_beam.push(Hypothesis::dead());
                parents.push(example * self.width);
                tokens.push(self.eos_id);
            }
            *beam = next_beam;
        }

        BeamStep { parents, tokens }
    }

    /// Every live hypothesis has produced <EOS>.
    pub fn is_done(&self) -> bool {
        self.beams
            .iter()
            .flatten()
            .filter(|h| h.is_live())
            .all(|h| h.finished)
    }

    /// Rank-0 tokens of each example, through the first <EOS>.
    pub fn best(&self) -> Vec<Vec<usize>> {
        self.beams
            .iter()
            .map(|beam| beam.first().map(|h| h.tokens.clone()).unwrap_or_default())
            .collect()
    }

    pub fn hypotheses(&self, example: usize) -> &[Hypothesis] {
        &self.beams[example]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EOS: usize = 3;

    fn ln(p: &[f32]) -> Vec<f32> {
        p.iter().map(|x| x.ln()).collect()
    }

    #[test]
    fn test_first_step_expands_only_first_hypothesis() {
        let mut search = BeamSearch::new(1, 2, EOS);
        // two identical rows: without the dead-start rule both beams would pick token 0
        let probs = [ln(&[0.6, 0.3, 0.05, 0.05]), ln(&[0.6, 0.3, 0.05, 0.05])].concat();
        let step = search.advance(&probs, 4);
        assert_eq!(step.tokens, vec![0, 1]);
        assert_eq!(step.parents, vec![0, 0]);
    }

    #[test]
    fn test_beam_beats_greedy() {
        // greedy picks 0 (0.6) then at best 0.4; token 1 (0.4) then 0.9 wins: 0.36 > 0.24
        let mut search = BeamSearch::new(1, 2, EOS);
        search.advance(&[ln(&[0.6, 0.4, 1e-9, 1e-9]), ln(&[0.25; 4])].concat(), 4);
        let step = search.advance(
            &[ln(&[0.1, 0.1, 0.4, 0.4]), ln(&[0.05, 0.05, 1e-9, 0.9])].concat(),
            4,
        );
        assert_eq!(step.parents[0], 1);
        assert_eq!(search.best(), vec![vec![1, EOS]]);
    }

    #[test]
    fn test_finished_hypotheses_are_carried() {
        let mut search = BeamSearch::new(1, 2, EOS);
        search.advance(&[ln(&[0.1, 0.1, 0.1, 0.7]), ln(&[0.25; 4])].concat(), 4);
        // rank 0 ended with <EOS>; rank 1 keeps going
        assert!(search.hypotheses(0)[0].finished);
        assert!(!search.is_done());

        search.advance(&[ln(&[0.25; 4]), ln(&[0.1, 0.1, 0.1, 0.7])].concat(), 4);
        let best = &search.hypotheses(0)[0];
        assert_eq!(best.tokens, vec![EOS]);
        assert!((best.score - 0.7f64.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_done_when_all_finished() {
        let mut search = BeamSearch::new(2, 1, EOS);
        search.advance(&[ln(&[0.1, 0.1, 0.1, 0.7]), ln(&[0.1, 0.1, 0.1, 0.7])].concat(), 4);
        assert!(search.is_done());
        assert_eq!(search.best(), vec![vec![EOS], vec![EOS]]);
    }
}

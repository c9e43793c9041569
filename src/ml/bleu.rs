// ============================================================
// Layer 5 — BLEU Scorer
// ============================================================
// Corpus-level BLEU with one reference per generated sequence.
//
//   matches[n]   Σ clipped n-gram overlaps of order n
//   possible[n]  Σ max(len(hyp) − n + 1, 0)
//   p[n]         (m+1)/(p+1) when smoothing, else m/p (0 if p = 0)
//   combined     0 if any p[n] = 0, else see BleuMean
//   bp           1 if hyp/ref > 1, else exp(1 − ref/hyp)
//   bleu         combined · bp
//
// Empty reference mass or empty generated mass scores 0.0.
//
// Reference: Papineni et al. (2002) BLEU

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, hash::Hash};

/// How per-order precisions are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BleuMean {
    /// exp(Σ ln p / N), the standard geometric mean
    #[default]
    Geometric,
    /// exp(Σ p / N); scores an exact match as e rather than 1
    LinearExponent,
}

#[derive(Debug, Clone, Copy)]
pub struct BleuScorer {
    pub max_order: usize,
    pub smooth:    bool,
    pub mean:      BleuMean,
}

/// Every n-gram of order 1..=max_order with its count.
fn ngram_counts<T: Eq + Hash>(segment: &[T], max_order: usize) -> HashMap<&[T], usize> {
    let mut counts = HashMap::new();
    for order in 1..=max_order {
        for gram in segment.windows(order) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

impl BleuScorer {
    pub fn new(max_order: usize, smooth: bool) -> Self {
        Self { max_order, smooth, mean: BleuMean::default() }
    }

    pub fn with_mean(mut self, mean: BleuMean) -> Self {
        self.mean = mean;
        self
    }

    pub fn score<T: Eq + Hash>(&self, generated: &[Vec<T>], references: &[Vec<T>]) -> f64 {
        let n = self.max_order;
        if n == 0 {
            return 0.0;
        }

        let mut matches  = vec![0usize; n];
        let mut possible = vec![0usize; n];
        let mut hyp_len  = 0usize;
        let mut ref_len  = 0usize;

        for (hyp, refr) in generated.iter().zip(references) {
            hyp_len += hyp.len();
            ref_len += refr.len();

            let ref_counts = ngram_counts(refr, n);
            for (gram, count) in ngram_counts(hyp, n) {
                if let Some(&r) = ref_counts.get(gram) {
                    matches[gram.len() - 1] += count.min(r);
                }
            }
            for order in 1..=n {
                possible[order - 1] += (hyp.len() + 1).saturating_sub(order);
            }
        }

        if ref_len == 0 || hyp_len == 0 {
            return 0.0;
        }

        let precisions: Vec<f64> = matches
            .iter()
            .zip(&possible)
            .map(|(&m, &p)| {
                if self.smooth {
                    (m as f64 + 1.0) / (p as f64 + 1.0)
                } else if p > 0 {
                    m as f64 / p as f64
                } else {
                    0.0
                }
            })
            .collect();

        if precisions.iter().any(|&p| p <= 0.0) {
            return 0.0;
        }

        let combined = match self.mean {
            BleuMean::Geometric      => (precisions.iter().map(|p| p.ln()).sum::<f64>() / n as f64).exp(),
            BleuMean::LinearExponent => (precisions.iter().sum::<f64>() / n as f64).exp(),
        };

        let ratio = hyp_len as f64 / ref_len as f64;
        let bp = if ratio > 1.0 { 1.0 } else { (1.0 - 1.0 / ratio).exp() };

        combined * bp
    }
}

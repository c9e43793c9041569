// ============================================================
// Layer 4 — Padded Batch Generator
// ============================================================
// Cuts a ParallelCorpus into contiguous minibatches and pads
// each side to the batch's own longest sequence.
//
//   corpus  : [s0 t0] [s1 t1] [s2 t2] [s3 t3] [s4 t4]
//   batch=2 : [s0 t0 | s1 t1] [s2 t2 | s3 t3]   (s4 t4 dropped)
//
// Every target gets <EOS> appended before padding, and the
// recorded lengths are the true per-row lengths (target lengths
// include the <EOS>).
//
// forever = false → exactly floor(N / batch) batches
// forever = true  → the same sequence of batches, repeated;
//                   a corpus smaller than one batch yields nothing
//
// Collation goes through Burn's Batcher trait: Seq2SeqBatcher
// turns a Vec of (source, target) pairs into a Seq2SeqBatch on
// its device. The batch keeps its padded host rows as well, for
// BLEU and the printed examples.
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §13 (Iterators)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::corpus::ParallelCorpus;
use crate::domain::vocabulary::{EOS_ID, GO_ID, PAD_ID};

/// One training example: encoder ids and decoder ids, unpadded.
pub type SequencePair = (Vec<usize>, Vec<usize>);

// ─── PaddedBatch ──────────────────────────────────────────────────────────────
/// The host side of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedBatch {
    /// Encoder rows, each padded to the longest input of the batch
    pub inputs:      Vec<Vec<usize>>,
    pub input_lens:  Vec<usize>,
    /// Decoder rows with <EOS> appended, then padded
    pub targets:     Vec<Vec<usize>>,
    pub target_lens: Vec<usize>,
}

/// Pad every row to the longest one. Returns the rows and their true lengths.
pub fn pad_rows(rows: &[Vec<usize>], pad_id: usize) -> (Vec<Vec<usize>>, Vec<usize>) {
    let lens: Vec<usize> = rows.iter().map(Vec::len).collect();
    let width = lens.iter().copied().max().unwrap_or(0);
    let padded = rows
        .iter()
        .map(|r| {
            let mut row = r.clone();
            row.resize(width, pad_id);
            row
        })
        .collect();
    (padded, lens)
}

impl PaddedBatch {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn input_width(&self) -> usize {
        self.inputs.first().map_or(0, Vec::len)
    }

    pub fn target_width(&self) -> usize {
        self.targets.first().map_or(0, Vec::len)
    }

    /// Unpadded target row `i` (including its <EOS>).
    pub fn target(&self, i: usize) -> &[usize] {
        &self.targets[i][..self.target_lens[i]]
    }

    /// Unpadded input row `i`.
    pub fn input(&self, i: usize) -> &[usize] {
        &self.inputs[i][..self.input_lens[i]]
    }
}

// ─── Seq2SeqBatch ─────────────────────────────────────────────────────────────
/// A batch on a Burn device. `b` = batch size, `S`/`T` = padded widths.
#[derive(Debug, Clone)]
pub struct Seq2SeqBatch<B: Backend> {
    /// [b, S]
    pub sources:        Tensor<B, 2, Int>,
    /// [b, S], 1.0 on real tokens, 0.0 on padding
    pub source_mask:    Tensor<B, 2>,
    /// [b, T], <GO> followed by the targets shifted right by one
    pub decoder_inputs: Tensor<B, 2, Int>,
    /// [b, T]
    pub targets:        Tensor<B, 2, Int>,
    /// [b, T]
    pub target_mask:    Tensor<B, 2>,
    /// The same rows on the host
    pub host:           PaddedBatch,
}

/// Equal-width rows → [rows, width] Int tensor.
pub fn int_tensor<B: Backend>(rows: &[Vec<usize>], device: &B::Device) -> Tensor<B, 2, Int> {
    let width = rows.first().map_or(0, Vec::len);
    let flat: Vec<i32> = rows.iter().flat_map(|r| r.iter().map(|&x| x as i32)).collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([rows.len(), width])
}

/// Lengths → [rows, width] float mask with 1.0 for positions < len.
pub fn length_mask<B: Backend>(lens: &[usize], width: usize, device: &B::Device) -> Tensor<B, 2> {
    let flat: Vec<f32> = lens
        .iter()
        .flat_map(|&len| (0..width).map(move |t| if t < len { 1.0 } else { 0.0 }))
        .collect();
    Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([lens.len(), width])
}

// ─── Seq2SeqBatcher ───────────────────────────────────────────────────────────
/// Collates sequence pairs into device tensors. Both vocabularies share
/// the reserved ids, so one pad id serves both sides.
#[derive(Clone, Debug)]
pub struct Seq2SeqBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> Seq2SeqBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Append <EOS> to every target, then pad both sides.
    pub fn pad(&self, items: &[SequencePair]) -> PaddedBatch {
        let sources: Vec<Vec<usize>> = items.iter().map(|(s, _)| s.clone()).collect();
        let with_eos: Vec<Vec<usize>> = items
            .iter()
            .map(|(_, t)| t.iter().copied().chain(std::iter::once(EOS_ID)).collect())
            .collect();
        let (inputs, input_lens)   = pad_rows(&sources, PAD_ID);
        let (targets, target_lens) = pad_rows(&with_eos, PAD_ID);
        PaddedBatch { inputs, input_lens, targets, target_lens }
    }
}

impl<B: Backend> Batcher<SequencePair, Seq2SeqBatch<B>> for Seq2SeqBatcher<B> {
    fn batch(&self, items: Vec<SequencePair>) -> Seq2SeqBatch<B> {
        let host = self.pad(&items);

        // ── Teacher-forcing inputs: <GO> + targets[:, :-1] ────────────────────
        let decoder_inputs: Vec<Vec<usize>> = host
            .targets
            .iter()
            .map(|t| {
                std::iter::once(GO_ID)
                    .chain(t.iter().copied().take(t.len().saturating_sub(1)))
                    .collect()
            })
            .collect();

        Seq2SeqBatch {
            sources:        int_tensor(&host.inputs, &self.device),
            source_mask:    length_mask(&host.input_lens, host.input_width(), &self.device),
            decoder_inputs: int_tensor(&decoder_inputs, &self.device),
            targets:        int_tensor(&host.targets, &self.device),
            target_mask:    length_mask(&host.target_lens, host.target_width(), &self.device),
            host,
        }
    }
}

// ─── PaddedBatches ────────────────────────────────────────────────────────────
/// Walks a corpus in order, one contiguous window per batch, and hands
/// each window to the batcher.
pub struct PaddedBatches<'a, B: Backend> {
    corpus:     &'a ParallelCorpus,
    batcher:    &'a Seq2SeqBatcher<B>,
    batch_size: usize,
    forever:    bool,
    cursor:     usize,
}

impl<'a, B: Backend> PaddedBatches<'a, B> {
    pub fn new(
        corpus:     &'a ParallelCorpus,
        batcher:    &'a Seq2SeqBatcher<B>,
        batch_size: usize,
        forever:    bool,
    ) -> Self {
        Self { corpus, batcher, batch_size, forever, cursor: 0 }
    }

    /// Start at batch `index` instead of the first one (resume).
    pub fn starting_at(mut self, index: usize) -> Self {
        self.cursor = index;
        self
    }

    /// Whole batches in one pass.
    pub fn batches_per_pass(&self) -> usize {
        if self.batch_size == 0 { 0 } else { self.corpus.len() / self.batch_size }
    }
}

impl<B: Backend> Iterator for PaddedBatches<'_, B> {
    type Item = Seq2SeqBatch<B>;

    fn next(&mut self) -> Option<Seq2SeqBatch<B>> {
        let n_batches = self.batches_per_pass();
        if n_batches == 0 {
            return None;
        }
        if self.cursor >= n_batches {
            if !self.forever {
                return None;
            }
            self.cursor = 0;
        }

        let start = self.cursor * self.batch_size;
        let end   = start + self.batch_size;
        self.cursor += 1;

        let items: Vec<SequencePair> = (start..end)
            .map(|i| (self.corpus.sources[i].clone(), self.corpus.targets[i].clone()))
            .collect();
        Some(self.batcher.batch(items))
    }
}

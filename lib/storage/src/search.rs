//! Distance kernels and bounded top-k selection for brute-force ranking.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

use docvec_core::MetricType;

/// Dot product with two accumulators for better pipelining.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);
    let mut sum1 = 0.0f32;
    let mut sum2 = 0.0f32;
    let mut chunks_a = a.chunks_exact(2);
    let mut chunks_b = b.chunks_exact(2);
    for (x, y) in (&mut chunks_a).zip(&mut chunks_b) {
        sum1 += x[0] * y[0];
        sum2 += x[1] * y[1];
    }
    for (x, y) in chunks_a.remainder().iter().zip(chunks_b.remainder()) {
        sum1 += x * y;
    }
    sum1 + sum2
}

#[inline]
pub fn norm(a: &[f32]) -> f32 {
    dot(a, a).sqrt()
}

#[inline]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// `1 - cos(a, b)`. Zero vectors are maximally distant.
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    let (na, nb) = (norm(a), norm(b));
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot(a, b) / (na * nb)
}

/// Scores a dense candidate against the query under `metric`.
#[inline]
pub fn dense_score(metric: MetricType, query: &[f32], candidate: &[f32]) -> f32 {
    match metric {
        MetricType::L2 => l2_distance(query, candidate),
        MetricType::Cosine => cosine_distance(query, candidate),
        MetricType::Ip | MetricType::MipsL2 => dot(query, candidate),
    }
}

/// Sparse query prepared for repeated dot products.
pub struct SparseQuery {
    weights: AHashMap<u32, f32>,
}

impl SparseQuery {
    pub fn new(indices: &[u32], values: &[f32]) -> Self {
        let mut weights = AHashMap::with_capacity(indices.len());
        for (&i, &v) in indices.iter().zip(values) {
            *weights.entry(i).or_insert(0.0) += v;
        }
        Self { weights }
    }

    pub fn dot(&self, indices: &[u32], values: &[f32]) -> f32 {
        indices
            .iter()
            .zip(values)
            .filter_map(|(i, v)| self.weights.get(i).map(|w| w * v))
            .sum()
    }
}

/// Whether `score` survives a radius bound. A radius of zero disables the
/// bound.
#[inline]
pub fn within_radius(score: f32, radius: f32, higher_is_better: bool) -> bool {
    if radius <= 0.0 {
        return true;
    }
    if higher_is_better {
        score >= radius
    } else {
        score <= radius
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Ranked {
    key: OrderedFloat<f32>,
    doc_id: i64,
    slot: usize,
}

/// Keeps the best `k` of a stream of scored candidates.
///
/// Ties are broken by ascending `doc_id` so results are stable across runs.
pub struct TopK {
    k: usize,
    higher_is_better: bool,
    heap: BinaryHeap<Ranked>,
}

impl TopK {
    pub fn new(k: usize, higher_is_better: bool) -> Self {
        Self {
            k,
            higher_is_better,
            heap: BinaryHeap::with_capacity(k.min(1024) + 1),
        }
    }

    /// Offers the candidate stored at `slot`.
    pub fn push(&mut self, score: f32, doc_id: i64, slot: usize) {
        if self.k == 0 || score.is_nan() {
            return;
        }
        let key = if self.higher_is_better { -score } else { score };
        self.heap.push(Ranked {
            key: OrderedFloat(key),
            doc_id,
            slot,
        });
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// `(slot, score)` pairs, best first.
    pub fn into_sorted(self) -> Vec<(usize, f32)> {
        let flip = self.higher_is_better;
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|r| {
                let score = if flip { -r.key.0 } else { r.key.0 };
                (r.slot, score)
            })
            .collect()
    }
}

use std::cmp::Ordering;

use num::{Num, ToPrimitive};

use super::SparseVec;

impl<N> SparseVec<N>
where
    N: Num + Copy + ToPrimitive,
{
    /// Walk the union of both index sets in ascending order, handing `f` the
    /// pair of values at each index (0 where a side has no entry).
    fn merge_with<F>(&self, other: &Self, mut f: F)
    where
        F: FnMut(f64, f64),
    {
        let value = |v: &N| v.to_f64().unwrap_or(0.0);
        let (ia, va) = (self.indices(), self.values());
        let (ib, vb) = (other.indices(), other.values());
        let (mut i, mut j) = (0, 0);
        while i < ia.len() && j < ib.len() {
            match ia[i].cmp(&ib[j]) {
                Ordering::Equal => {
                    f(value(&va[i]), value(&vb[j]));
                    i += 1;
                    j += 1;
                }
                Ordering::Less => {
                    f(value(&va[i]), 0.0);
                    i += 1;
                }
                Ordering::Greater => {
                    f(0.0, value(&vb[j]));
                    j += 1;
                }
            }
        }
        va[i..].iter().for_each(|v| f(value(v), 0.0));
        vb[j..].iter().for_each(|v| f(0.0, value(v)));
    }

    /// false when either side is empty or the dimensions differ
    fn comparable(&self, other: &Self) -> bool {
        self.dim() == other.dim() && self.nnz() > 0 && other.nnz() > 0
    }

    /// Σ(a_i * b_i)
    pub fn dot(&self, other: &Self) -> f64 {
        let mut dot = 0.0;
        self.merge_with(other, |a, b| dot += a * b);
        dot
    }

    /// Σ(a_i^2)
    pub fn norm_sq(&self) -> f64 {
        self.iter()
            .map(|(_, v)| v.to_f64().unwrap_or(0.0).powi(2))
            .sum()
    }

    /// Cosine similarity
    /// cos(θ) = Σ(a_i * b_i) / (||a|| * ||b||)
    ///
    /// 0 when either vector is empty or has zero norm, or the dimensions
    /// differ.
    pub fn cosine_similarity(&self, other: &Self) -> f64 {
        if !self.comparable(other) {
            return 0.0;
        }
        let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
        self.merge_with(other, |a, b| {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        });
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }

    /// Squared Hellinger distance
    /// H²(a, b) = 1/2 * Σ(sqrt(a_i) - sqrt(b_i))^2
    ///
    /// Values are expected to be non-negative; negative ones count as 0.
    /// 0 when either vector is empty or the dimensions differ.
    pub fn squared_hellinger_distance(&self, other: &Self) -> f64 {
        if !self.comparable(other) {
            return 0.0;
        }
        let mut sum = 0.0;
        self.merge_with(other, |a, b| {
            sum += (a.max(0.0).sqrt() - b.max(0.0).sqrt()).powi(2);
        });
        0.5 * sum
    }

    /// Jensen-Shannon distance, the square root of the Jensen-Shannon
    /// divergence with base-2 logarithms, so it lies in `[0, 1]`.
    ///
    /// Both vectors are L1 normalized into distributions first (negative
    /// values count as 0). 0 when either vector is empty, sums to 0, or the
    /// dimensions differ.
    pub fn jensen_shannon_distance(&self, other: &Self) -> f64 {
        if !self.comparable(other) {
            return 0.0;
        }
        let (mut sum_a, mut sum_b) = (0.0, 0.0);
        self.merge_with(other, |a, b| {
            sum_a += a.max(0.0);
            sum_b += b.max(0.0);
        });
        if sum_a == 0.0 || sum_b == 0.0 {
            return 0.0;
        }
        // p * log2(p / m), 0 where p is 0
        let kl_term = |p: f64, m: f64| if p > 0.0 { p * (p / m).log2() } else { 0.0 };
        let mut divergence = 0.0;
        self.merge_with(other, |a, b| {
            let (p, q) = (a.max(0.0) / sum_a, b.max(0.0) / sum_b);
            let m = 0.5 * (p + q);
            divergence += 0.5 * (kl_term(p, m) + kl_term(q, m));
        });
        divergence.max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn dot_and_norm() {
        let a = SparseVec::from_entries(5, vec![(0, 1.0), (2, 2.0), (4, 3.0)]);
        let b = SparseVec::from_entries(5, vec![(2, 4.0), (3, 1.0), (4, -1.0)]);
        assert_eq!(a.dot(&b), 5.0);
        assert_eq!(a.norm_sq(), 14.0);
    }

    #[test]
    fn cosine() {
        let a = SparseVec::from_entries(3, vec![(0, 1.0), (1, 1.0)]);
        let b = SparseVec::from_entries(3, vec![(1, 2.0), (2, 2.0)]);
        assert!(close(a.cosine_similarity(&b), 0.5));
        assert!(close(a.cosine_similarity(&a), 1.0));

        let ints: SparseVec<u32> = SparseVec::from_entries(3, vec![(0, 3), (2, 4)]);
        assert!(close(ints.cosine_similarity(&ints), 1.0));
    }

    #[test]
    fn empty_or_mismatched_vectors_compare_as_zero() {
        let a = SparseVec::from_entries(3, vec![(0, 1.0)]);
        let empty = SparseVec::<f64>::new(3);
        let wide = SparseVec::from_entries(4, vec![(0, 1.0)]);
        for score in [
            a.cosine_similarity(&empty),
            empty.cosine_similarity(&a),
            a.cosine_similarity(&wide),
            a.squared_hellinger_distance(&empty),
            a.jensen_shannon_distance(&empty),
            a.jensen_shannon_distance(&wide),
        ] {
            assert_eq!(score, 0.0);
        }
    }

    #[test]
    fn vectors_without_mass_compare_as_zero() {
        let a = SparseVec::from_entries(2, vec![(0, 1.0)]);
        let negative = SparseVec::from_entries(2, vec![(1, -2.0)]);
        assert_eq!(a.jensen_shannon_distance(&negative), 0.0);
        assert_eq!(a.cosine_similarity(&negative), 0.0);
    }

    #[test]
    fn hellinger() {
        let p = SparseVec::from_entries(2, vec![(0, 0.5), (1, 0.5)]);
        let q = SparseVec::from_entries(2, vec![(0, 1.0)]);
        let expected = 0.5 * ((0.5f64.sqrt() - 1.0).powi(2) + 0.5);
        assert!(close(p.squared_hellinger_distance(&q), expected));
        assert_eq!(p.squared_hellinger_distance(&p), 0.0);

        let disjoint = SparseVec::from_entries(3, vec![(2, 1.0)]);
        let other = SparseVec::from_entries(3, vec![(0, 1.0)]);
        assert!(close(disjoint.squared_hellinger_distance(&other), 1.0));
    }

    #[test]
    fn jensen_shannon() {
        let p = SparseVec::from_entries(3, vec![(0, 0.7), (1, 0.3)]);
        let q = SparseVec::from_entries(3, vec![(2, 1.0)]);
        // disjoint supports are as far apart as it gets
        assert!(close(p.jensen_shannon_distance(&q), 1.0));
        assert_eq!(p.jensen_shannon_distance(&p), 0.0);

        // scale does not matter, the vectors are normalized first
        let doubled = SparseVec::from_entries(3, vec![(0, 1.4), (1, 0.6)]);
        assert!(close(p.jensen_shannon_distance(&doubled), 0.0));

        let a = SparseVec::from_entries(2, vec![(0, 1.0)]);
        let b = SparseVec::from_entries(2, vec![(0, 1.0), (1, 1.0)]);
        // JSD = 1/2 * (1 * log2(1 / 0.75)) + 1/2 * (0.5 * log2(0.5 / 0.75) + 0.5 * log2(0.5 / 0.25))
        let jsd = 0.5 * (1.0f64 / 0.75).log2()
            + 0.5 * (0.5 * (0.5f64 / 0.75).log2() + 0.5 * 2.0f64.log2());
        assert!(close(a.jensen_shannon_distance(&b), jsd.sqrt()));
        assert!(close(b.jensen_shannon_distance(&a), jsd.sqrt()));
    }
}

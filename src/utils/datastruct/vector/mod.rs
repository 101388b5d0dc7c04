pub mod idf;
mod math;

pub use idf::IdfVector;

use num::{Num, NumCast};
use serde::{Deserialize, Serialize};

/// SparseVec keeps only the non-zero entries of a fixed-dimension vector.
///
/// `indices` are strictly ascending and `values` is parallel to them.
/// Every index is below `dim`.
///
/// Comparison: `dot`, `cosine_similarity`, `squared_hellinger_distance`,
/// `jensen_shannon_distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVec<N> {
    dim: usize,
    indices: Vec<usize>,
    values: Vec<N>,
}

impl<N> SparseVec<N>
where
    N: Num + Copy,
{
    /// All-zero vector of dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from unordered `(index, value)` pairs.
    ///
    /// Zero values and indices at or above `dim` are dropped; repeated
    /// indices are summed.
    pub fn from_entries<I>(dim: usize, entries: I) -> Self
    where
        I: IntoIterator<Item = (usize, N)>,
    {
        let mut entries: Vec<(usize, N)> = entries
            .into_iter()
            .filter(|&(idx, _)| idx < dim)
            .collect();
        entries.sort_unstable_by_key(|&(idx, _)| idx);

        let mut vec = Self::new(dim);
        for (idx, value) in entries {
            match vec.indices.last() {
                Some(&last) if last == idx => {
                    if let Some(v) = vec.values.last_mut() {
                        *v = *v + value;
                    }
                }
                _ => {
                    vec.indices.push(idx);
                    vec.values.push(value);
                }
            }
        }
        vec.drop_zeros();
        vec
    }

    /// Like [`from_entries`](Self::from_entries) with `f64` input cast to `N`.
    /// Values `N` cannot represent are treated as zero.
    pub fn from_f64_entries<I>(dim: usize, entries: I) -> Self
    where
        N: NumCast,
        I: IntoIterator<Item = (usize, f64)>,
    {
        Self::from_entries(
            dim,
            entries
                .into_iter()
                .filter_map(|(idx, v)| <N as NumCast>::from(v).map(|n| (idx, n))),
        )
    }

    fn drop_zeros(&mut self) {
        let mut keep = 0;
        for i in 0..self.values.len() {
            if !self.values[i].is_zero() {
                self.indices[keep] = self.indices[i];
                self.values[keep] = self.values[i];
                keep += 1;
            }
        }
        self.indices.truncate(keep);
        self.values.truncate(keep);
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored (non-zero) entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[inline]
    pub fn values(&self) -> &[N] {
        &self.values
    }

    /// Value at `index`, zero when absent.
    pub fn get(&self, index: usize) -> N {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => N::zero(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, N)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn to_dense(&self) -> Vec<N> {
        let mut dense = vec![N::zero(); self.dim];
        for (idx, value) in self.iter() {
            dense[idx] = value;
        }
        dense
    }
}

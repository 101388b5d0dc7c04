use serde::{Deserialize, Serialize};

use crate::vectorizer::ngram::NgramId;

/// Per-order inverse document frequencies.
///
/// `idf_vecs[order - 1][id]` is `ln(doc_num / df)` for n-grams seen in at
/// least one document and 0 otherwise. Dense, since nearly every slot is
/// filled once a corpus is built.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct IdfVector {
    pub idf_vecs: Vec<Vec<f64>>,
    /// document count the values were computed from
    pub doc_num: u64,
}

impl IdfVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// IDF of `id` at `order`, 0 outside the computed range.
    #[inline]
    pub fn get(&self, order: usize, id: NgramId) -> f64 {
        order
            .checked_sub(1)
            .and_then(|o| self.idf_vecs.get(o))
            .and_then(|v| v.get(id as usize))
            .copied()
            .unwrap_or(0.0)
    }

    /// Values of one order, indexed by id.
    pub fn order(&self, order: usize) -> Option<&[f64]> {
        order
            .checked_sub(1)
            .and_then(|o| self.idf_vecs.get(o))
            .map(Vec::as_slice)
    }

    #[inline]
    pub fn max_order(&self) -> usize {
        self.idf_vecs.len()
    }
}

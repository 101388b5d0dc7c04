use ahash::RandomState;
use indexmap::IndexMap;
use num::{Num, NumCast};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::datastruct::vector::SparseVec;
use crate::vectorizer::counting::CountingNgramDictionary;
use crate::vectorizer::feature::{FeatureDictionary, FeatureId};
use crate::vectorizer::key::check_order;
use crate::vectorizer::ngram::{NgramDictionary, NgramId};
use crate::vectorizer::token::{AnnotatedDocument, TokenForm};

/// How an [`AnnotatedDocument`] is turned into n-grams.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentOptions {
    pub token_form: TokenForm,
    /// let n-grams span sentence boundaries (never field boundaries)
    pub cross_sentences: bool,
    /// also register sub-grams through `get_or_add_recursive`
    pub recursive: bool,
}

/// CorpusDocument struct
/// Sparse numeric form of one document.
///
/// Holds one id -> value map per n-gram order (raw counts until a TF-IDF
/// transform overwrites them), a per-order length, and the structured
/// features. Ids refer to the dictionary the document was built against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CorpusDocument {
    id: String,
    label: Option<String>,
    /// `ngrams[order - 1]`
    ngrams: Vec<IndexMap<NgramId, f64, RandomState>>,
    /// `lengths[order - 1]`, sum of the raw counts of that order
    lengths: Vec<f64>,
    features: IndexMap<FeatureId, f64, RandomState>,
}

impl CorpusDocument {
    /// Empty document holding orders `1..=max_order`.
    pub fn new(id: impl Into<String>, label: Option<String>, max_order: usize) -> Self {
        Self {
            id: id.into(),
            label,
            ngrams: (0..max_order).map(|_| IndexMap::default()).collect(),
            lengths: vec![0.0; max_order],
            features: IndexMap::default(),
        }
    }

    /// Count every n-gram of `doc`, registering new ones in `dictionary`.
    ///
    /// Each occurrence increments the n-gram's term frequency; each distinct
    /// n-gram increments its document frequency once. N-grams a frozen
    /// dictionary does not know are dropped, as are features a frozen
    /// feature dictionary does not know. The corpus document count is left
    /// to the caller.
    ///
    /// Counters only move once every n-gram of the document resolved. On
    /// error the dictionary is rolled back to its state before the call.
    ///
    /// # Arguments
    /// * `doc` - annotated input
    /// * `dictionary` - shared counting dictionary
    /// * `features` - shared feature dictionary
    /// * `options` - token form and window settings
    pub fn build(
        doc: &AnnotatedDocument,
        dictionary: &mut CountingNgramDictionary,
        features: &mut FeatureDictionary,
        options: &DocumentOptions,
    ) -> Result<Self> {
        let checkpoint = dictionary.checkpoint();
        let mut document = match Self::resolve(doc, dictionary, options) {
            Ok(document) => document,
            Err(e) => {
                dictionary.rollback(&checkpoint);
                return Err(e);
            }
        };
        for (order, ngrams) in (1..).zip(&document.ngrams) {
            for (&id, &count) in ngrams {
                dictionary.increment_term_frequency(order, id, count as u64)?;
                dictionary.increment_doc_frequency(order, id)?;
            }
        }
        for (name, value) in doc.features() {
            if let Some(fid) = features.get_or_add(name) {
                document.features.insert(fid, value);
            }
        }
        Ok(document)
    }

    /// ids of every window of `doc`, registering them, no counter touched
    fn resolve(
        doc: &AnnotatedDocument,
        dictionary: &mut CountingNgramDictionary,
        options: &DocumentOptions,
    ) -> Result<Self> {
        let max_order = dictionary.max_order();
        let mut document = Self::new(doc.id(), doc.label().map(str::to_owned), max_order);
        for ngram in doc.ngrams(options.token_form, max_order, options.cross_sentences) {
            let id = if options.recursive {
                dictionary.get_or_add_recursive(&ngram[..])?
            } else {
                dictionary.get_or_add(&ngram[..])?
            };
            if let Some(id) = id {
                document.increment(ngram.len() - 1, id, 1.0);
            }
        }
        Ok(document)
    }

    /// Read-only counterpart of [`build`](Self::build): unknown n-grams and
    /// features are dropped and no counter is touched.
    pub fn lookup(
        doc: &AnnotatedDocument,
        dictionary: &CountingNgramDictionary,
        features: &FeatureDictionary,
        options: &DocumentOptions,
    ) -> Self {
        let max_order = dictionary.max_order();
        let mut document = Self::new(doc.id(), doc.label().map(str::to_owned), max_order);
        for ngram in doc.ngrams(options.token_form, max_order, options.cross_sentences) {
            if let Some(id) = dictionary.get_index(&ngram[..]) {
                document.increment(ngram.len() - 1, id, 1.0);
            }
        }
        for (name, value) in doc.features() {
            if let Some(fid) = features.get_id(name) {
                document.features.insert(fid, value);
            }
        }
        document
    }

    /// add `count` at `ngrams[slot][id]`, true when the id is new here
    fn increment(&mut self, slot: usize, id: NgramId, count: f64) -> bool {
        self.lengths[slot] += count;
        let mut inserted = false;
        *self.ngrams[slot].entry(id).or_insert_with(|| {
            inserted = true;
            0.0
        }) += count;
        inserted
    }

    /// Add `count` to n-gram `id` of `order`.
    ///
    /// # Returns
    /// * `true` when the n-gram was not yet present in this document.
    pub fn add_or_increment(&mut self, order: usize, id: NgramId, count: f64) -> Result<bool> {
        check_order(order, self.order())?;
        Ok(self.increment(order - 1, id, count))
    }

    /// Copy of this document with every n-gram id translated through `table`
    /// (`table[order - 1][old_id]`). Dropped n-grams no longer count towards
    /// the lengths.
    pub fn remap(&self, table: &[Vec<Option<NgramId>>]) -> Self {
        let mut remapped = Self::new(self.id.clone(), self.label.clone(), self.ngrams.len());
        remapped.features = self.features.clone();
        for (slot, ngrams) in self.ngrams.iter().enumerate() {
            let Some(ids) = table.get(slot) else {
                continue;
            };
            for (&id, &count) in ngrams {
                if let Some(Some(new_id)) = ids.get(id as usize) {
                    remapped.increment(slot, *new_id, count);
                }
            }
        }
        remapped
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Highest order held.
    #[inline]
    pub fn order(&self) -> usize {
        self.ngrams.len()
    }

    /// Value of n-gram `id` of `order`, 0 when absent.
    pub fn value(&self, order: usize, id: NgramId) -> f64 {
        self.ngrams(order)
            .and_then(|m| m.get(&id))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn ngrams(&self, order: usize) -> Option<&IndexMap<NgramId, f64, RandomState>> {
        order.checked_sub(1).and_then(|slot| self.ngrams.get(slot))
    }

    pub(crate) fn ngrams_mut(&mut self, order: usize) -> Option<&mut IndexMap<NgramId, f64, RandomState>> {
        order.checked_sub(1).and_then(|slot| self.ngrams.get_mut(slot))
    }

    pub(crate) fn all_ngrams_mut(&mut self) -> impl Iterator<Item = &mut IndexMap<NgramId, f64, RandomState>> {
        self.ngrams.iter_mut()
    }

    /// Distinct n-grams over all orders.
    pub fn nnz(&self) -> usize {
        self.ngrams.iter().map(IndexMap::len).sum()
    }

    /// Total count of order-`order` n-grams, 0 for orders not held.
    pub fn length(&self, order: usize) -> f64 {
        order
            .checked_sub(1)
            .and_then(|slot| self.lengths.get(slot))
            .copied()
            .unwrap_or(0.0)
    }

    /// Override the length of `order`. Ignored for orders not held.
    pub fn set_length(&mut self, order: usize, length: f64) {
        if let Some(l) = order.checked_sub(1).and_then(|slot| self.lengths.get_mut(slot)) {
            *l = length;
        }
    }

    pub fn features(&self) -> &IndexMap<FeatureId, f64, RandomState> {
        &self.features
    }

    pub fn feature(&self, id: FeatureId) -> Option<f64> {
        self.features.get(&id).copied()
    }

    pub fn set_feature(&mut self, id: FeatureId, value: f64) {
        self.features.insert(id, value);
    }

    /// Sparse row over `space`. Values `N` cannot represent become zero.
    pub fn to_sparse_vec<N>(&self, space: &FeatureSpace) -> SparseVec<N>
    where
        N: Num + NumCast + Copy,
    {
        let ngram_entries = self.ngrams.iter().enumerate().flat_map(|(slot, ngrams)| {
            ngrams
                .iter()
                .filter_map(move |(&id, &v)| space.column(slot + 1, id).map(|col| (col, v)))
        });
        let feature_entries = self
            .features
            .iter()
            .filter_map(|(&fid, &v)| space.feature_column(fid).map(|col| (col, v)));
        SparseVec::from_f64_entries(space.dim(), ngram_entries.chain(feature_entries))
    }

    pub fn to_dense<N>(&self, space: &FeatureSpace) -> Vec<N>
    where
        N: Num + NumCast + Copy,
    {
        self.to_sparse_vec(space).to_dense()
    }
}

/// Column layout shared by every exported document row: order-1 n-grams,
/// then order 2, ..., then structured features. Reserved id slots get no
/// column.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpace {
    /// first column of each order, plus the first feature column at the end
    offsets: Vec<usize>,
    /// real ids per order
    counts: Vec<usize>,
    num_features: usize,
}

impl FeatureSpace {
    pub fn new(dictionary: &NgramDictionary, features: &FeatureDictionary) -> Self {
        let counts: Vec<usize> = (1..=dictionary.max_order())
            .map(|order| dictionary.ngram_count(order))
            .collect();
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        let mut next = 0;
        for &count in &counts {
            offsets.push(next);
            next += count;
        }
        offsets.push(next);
        Self {
            offsets,
            counts,
            num_features: features.len(),
        }
    }

    /// Column of n-gram `id` of `order`.
    pub fn column(&self, order: usize, id: NgramId) -> Option<usize> {
        let slot = order.checked_sub(1)?;
        let count = *self.counts.get(slot)?;
        let id = id as usize;
        (id >= 1 && id <= count).then(|| self.offsets[slot] + id - 1)
    }

    pub fn feature_column(&self, id: FeatureId) -> Option<usize> {
        let id = id as usize;
        (id < self.num_features).then(|| self.feature_offset() + id)
    }

    #[inline]
    fn feature_offset(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    /// Total number of columns.
    #[inline]
    pub fn dim(&self) -> usize {
        self.feature_offset() + self.num_features
    }

    /// Column names in column order: n-gram terms joined with `_`, then
    /// feature names.
    pub fn column_names(&self, dictionary: &NgramDictionary, features: &FeatureDictionary) -> Vec<String> {
        let mut names = Vec::with_capacity(self.dim());
        for (slot, &count) in self.counts.iter().enumerate() {
            for id in 1..=count {
                names.push(dictionary.label(slot + 1, id as NgramId).unwrap_or_default());
            }
        }
        names.extend(features.iter().take(self.num_features).map(|(_, name)| name.to_owned()));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::vectorizer::token::{TextField, DEFAULT_FIELD};

    fn annotated(id: &str, sentences: Vec<Vec<&str>>) -> AnnotatedDocument {
        AnnotatedDocument::new(id).with_field(DEFAULT_FIELD, TextField::from_words(sentences))
    }

    #[test]
    fn build_counts_and_document_frequency() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        let mut features = FeatureDictionary::new();
        let doc = annotated("a", vec![vec!["x", "y", "x", "y"]]).with_feature("len", 4.0);
        let built = CorpusDocument::build(&doc, &mut dict, &mut features, &DocumentOptions::default()).unwrap();

        let x = dict.get_index(&["x"]).unwrap();
        let xy = dict.get_index(&["x", "y"]).unwrap();
        assert_eq!(built.value(1, x), 2.0);
        assert_eq!(built.value(2, xy), 2.0);
        assert_eq!(built.length(1), 4.0);
        assert_eq!(built.length(2), 3.0);
        assert_eq!(dict.ngram_frequency(&["x"]), 2);
        assert_eq!(dict.ngram_doc_frequency(&["x"]), 1);
        assert_eq!(dict.ngram_doc_frequency(&["y", "x"]), 1);
        assert_eq!(built.feature(0), Some(4.0));
        assert_eq!(dict.num_docs(), 0);
    }

    #[test]
    fn lookup_leaves_counters_alone() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        let mut features = FeatureDictionary::new();
        let first = annotated("a", vec![vec!["x", "y"]]);
        CorpusDocument::build(&first, &mut dict, &mut features, &DocumentOptions::default()).unwrap();

        let second = annotated("b", vec![vec!["x", "z", "x"]]).with_feature("unknown", 1.0);
        let looked = CorpusDocument::lookup(&second, &dict, &features, &DocumentOptions::default());
        assert_eq!(looked.value(1, 1), 2.0);
        assert_eq!(looked.nnz(), 1);
        assert_eq!(looked.length(1), 2.0);
        assert!(looked.features().is_empty());
        assert_eq!(dict.ngram_frequency(&["x"]), 1);
        assert_eq!(dict.terms().get_id("z"), None);
    }

    #[test]
    fn add_or_increment_reports_new_entries() {
        let mut doc = CorpusDocument::new("d", None, 2);
        assert!(doc.add_or_increment(1, 3, 1.0).unwrap());
        assert!(!doc.add_or_increment(1, 3, 2.0).unwrap());
        assert_eq!(doc.value(1, 3), 3.0);
        assert_eq!(doc.length(1), 3.0);
        assert!(matches!(doc.add_or_increment(3, 1, 1.0), Err(Error::UnsupportedOrder { .. })));
        doc.set_length(1, 10.0);
        assert_eq!(doc.length(1), 10.0);
    }

    #[test]
    fn remap_drops_and_recomputes_lengths() {
        let mut doc = CorpusDocument::new("d", Some("pos".into()), 1);
        doc.add_or_increment(1, 1, 2.0).unwrap();
        doc.add_or_increment(1, 2, 3.0).unwrap();
        doc.set_feature(0, 1.5);
        let table = vec![vec![None, None, Some(1)]];
        let remapped = doc.remap(&table);
        assert_eq!(remapped.value(1, 1), 3.0);
        assert_eq!(remapped.nnz(), 1);
        assert_eq!(remapped.length(1), 3.0);
        assert_eq!(remapped.feature(0), Some(1.5));
        assert_eq!(remapped.label(), Some("pos"));
    }

    #[test]
    fn feature_space_layout() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        let mut features = FeatureDictionary::new();
        let doc = annotated("a", vec![vec!["p", "q"]]).with_feature("f", 0.5);
        let built = CorpusDocument::build(&doc, &mut dict, &mut features, &DocumentOptions::default()).unwrap();

        let space = FeatureSpace::new(dict.dictionary(), &features);
        assert_eq!(space.dim(), 4);
        assert_eq!(space.column(1, 1), Some(0));
        assert_eq!(space.column(1, 2), Some(1));
        assert_eq!(space.column(2, 1), Some(2));
        assert_eq!(space.column(2, 0), None);
        assert_eq!(space.feature_column(0), Some(3));
        assert_eq!(
            space.column_names(dict.dictionary(), &features),
            vec!["p", "q", "p_q", "f"]
        );
        assert_eq!(built.to_dense::<f64>(&space), vec![1.0, 1.0, 1.0, 0.5]);
        let sparse: SparseVec<u8> = built.to_sparse_vec(&space);
        assert_eq!(sparse.indices(), &[0, 1, 2]);
    }
}

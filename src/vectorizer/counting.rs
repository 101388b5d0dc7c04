use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use crate::config::{COUNTER_GROWTH_DENOMINATOR, COUNTER_GROWTH_NUMERATOR, INITIAL_COUNTER_CAPACITY};
use crate::error::{Error, Result};
use crate::utils::datastruct::vector::IdfVector;
use crate::vectorizer::key::check_order;
use crate::vectorizer::ngram::{NgramDictionary, NgramId};
use crate::vectorizer::term::TermDictionary;

/// Frequency arrays of one order, indexed by dense id.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
struct OrderCounts {
    term_freq: Vec<u64>,
    doc_freq: Vec<u64>,
    /// occurrences of every n-gram of this order
    total: u64,
}

impl OrderCounts {
    fn with_capacity(cap: usize) -> Self {
        Self {
            term_freq: vec![0; cap],
            doc_freq: vec![0; cap],
            total: 0,
        }
    }

    /// grow ×1.5 until `needed` slots exist, never shrink
    fn ensure(&mut self, needed: usize) {
        let mut cap = self.term_freq.len().max(INITIAL_COUNTER_CAPACITY);
        while cap < needed {
            cap = (cap * COUNTER_GROWTH_NUMERATOR / COUNTER_GROWTH_DENOMINATOR).max(cap + 1);
        }
        if cap > self.term_freq.len() {
            self.term_freq.resize(cap, 0);
            self.doc_freq.resize(cap, 0);
        }
    }
}

/// CountingNgramDictionary struct
/// An [`NgramDictionary`] that also tracks corpus statistics:
/// - term frequency (total occurrences) per n-gram
/// - document frequency (documents containing it) per n-gram
/// - total n-gram occurrences per order
/// - number of documents
///
/// Counters stop changing once the dictionary is frozen, so IDF values
/// computed afterwards stay stable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CountingNgramDictionary {
    dictionary: NgramDictionary,
    /// `counts[order - 1]`
    counts: Vec<OrderCounts>,
    num_docs: u64,
}

impl CountingNgramDictionary {
    /// Create an empty dictionary for orders `1..=max_order`.
    pub fn new(max_order: usize) -> Result<Self> {
        let dictionary = NgramDictionary::new(max_order)?;
        let counts = (0..max_order)
            .map(|_| OrderCounts::with_capacity(INITIAL_COUNTER_CAPACITY))
            .collect();
        Ok(Self {
            dictionary,
            counts,
            num_docs: 0,
        })
    }

    #[inline]
    pub fn dictionary(&self) -> &NgramDictionary {
        &self.dictionary
    }

    #[inline]
    pub fn terms(&self) -> &TermDictionary {
        self.dictionary.terms()
    }

    #[inline]
    pub fn max_order(&self) -> usize {
        self.dictionary.max_order()
    }

    /// See [`NgramDictionary::get_or_add`].
    pub fn get_or_add<S: AsRef<str>>(&mut self, ngram: &[S]) -> Result<Option<NgramId>> {
        let id = self.dictionary.get_or_add(ngram)?;
        self.grow_counters();
        Ok(id)
    }

    /// See [`NgramDictionary::get_or_add_recursive`].
    pub fn get_or_add_recursive<S: AsRef<str>>(&mut self, ngram: &[S]) -> Result<Option<NgramId>> {
        let id = self.dictionary.get_or_add_recursive(ngram)?;
        self.grow_counters();
        Ok(id)
    }

    pub(crate) fn checkpoint(&self) -> Vec<usize> {
        self.dictionary.checkpoint()
    }

    /// Undo every registration since `checkpoint`, clearing the counters of
    /// the dropped ids.
    pub(crate) fn rollback(&mut self, checkpoint: &[usize]) {
        self.dictionary.rollback(checkpoint);
        for (order, counts) in (1..).zip(self.counts.iter_mut()) {
            let size = self.dictionary.size(order);
            for slot in size..counts.term_freq.len() {
                counts.total -= counts.term_freq[slot];
                counts.term_freq[slot] = 0;
                counts.doc_freq[slot] = 0;
            }
        }
    }

    fn grow_counters(&mut self) {
        for (idx, counts) in self.counts.iter_mut().enumerate() {
            counts.ensure(self.dictionary.size(idx + 1));
        }
    }

    #[inline]
    pub fn get_index<S: AsRef<str>>(&self, ngram: &[S]) -> Option<NgramId> {
        self.dictionary.get_index(ngram)
    }

    #[inline]
    pub fn get_ngram(&self, order: usize, id: NgramId) -> Option<Vec<&str>> {
        self.dictionary.get_ngram(order, id)
    }

    #[inline]
    pub fn size(&self, order: usize) -> usize {
        self.dictionary.size(order)
    }

    /// Freeze the vocabulary and every counter.
    pub fn freeze(&mut self) {
        self.dictionary.freeze();
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.dictionary.is_frozen()
    }

    fn slot(&self, order: usize, id: NgramId) -> Result<usize> {
        check_order(order, self.max_order())?;
        let size = self.dictionary.size(order);
        if id as usize >= size {
            return Err(Error::IdOutOfRange { order, id, size });
        }
        Ok(id as usize)
    }

    /// Add `delta` occurrences of `id`. No-op when frozen.
    ///
    /// # Arguments
    /// * `order` - n-gram order
    /// * `id` - id previously handed out by this dictionary
    /// * `delta` - number of occurrences
    pub fn increment_term_frequency(&mut self, order: usize, id: NgramId, delta: u64) -> Result<()> {
        let slot = self.slot(order, id)?;
        if self.is_frozen() {
            return Ok(());
        }
        let counts = &mut self.counts[order - 1];
        counts.term_freq[slot] += delta;
        counts.total += delta;
        Ok(())
    }

    /// Count one more document containing `id`. No-op when frozen.
    pub fn increment_doc_frequency(&mut self, order: usize, id: NgramId) -> Result<()> {
        let slot = self.slot(order, id)?;
        if self.is_frozen() {
            return Ok(());
        }
        self.counts[order - 1].doc_freq[slot] += 1;
        Ok(())
    }

    /// Count one more document. No-op when frozen.
    pub fn increment_num_docs(&mut self) {
        if !self.is_frozen() {
            self.num_docs += 1;
        }
    }

    #[inline]
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    /// Occurrences of `id`, 0 when unknown.
    pub fn term_frequency(&self, order: usize, id: NgramId) -> u64 {
        order
            .checked_sub(1)
            .and_then(|o| self.counts.get(o))
            .and_then(|c| c.term_freq.get(id as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Documents containing `id`, 0 when unknown.
    pub fn doc_frequency(&self, order: usize, id: NgramId) -> u64 {
        order
            .checked_sub(1)
            .and_then(|o| self.counts.get(o))
            .and_then(|c| c.doc_freq.get(id as usize))
            .copied()
            .unwrap_or(0)
    }

    pub fn ngram_frequency<S: AsRef<str>>(&self, ngram: &[S]) -> u64 {
        self.get_index(ngram)
            .map_or(0, |id| self.term_frequency(ngram.len(), id))
    }

    pub fn ngram_doc_frequency<S: AsRef<str>>(&self, ngram: &[S]) -> u64 {
        self.get_index(ngram)
            .map_or(0, |id| self.doc_frequency(ngram.len(), id))
    }

    /// Occurrences of all n-grams of `order`.
    pub fn total_ngrams(&self, order: usize) -> u64 {
        order
            .checked_sub(1)
            .and_then(|o| self.counts.get(o))
            .map_or(0, |c| c.total)
    }

    /// `ln(num_docs / df)` for every id of every order, 0 where df is 0.
    pub fn compute_idf(&self) -> IdfVector {
        let doc_num = self.num_docs;
        let idf_vecs = (1..=self.max_order())
            .map(|order| {
                let doc_freq = &self.counts[order - 1].doc_freq;
                (0..self.dictionary.size(order))
                    .map(|id| match doc_freq.get(id).copied().unwrap_or(0) {
                        0 => 0.0,
                        _ if doc_num == 0 => 0.0,
                        df => (doc_num as f64 / df as f64).ln(),
                    })
                    .collect()
            })
            .collect();
        IdfVector { idf_vecs, doc_num }
    }

    /// Build a new dictionary holding only n-grams with
    /// `term_frequency >= min_count` and `doc_frequency >= min_doc_freq`.
    ///
    /// Every order is filtered, unigrams included. Survivors are re-added in
    /// ascending id order, so ids are dense again but not preserved. A
    /// higher-order n-gram is only kept when all of its terms were kept.
    ///
    /// # Returns
    /// * the trimmed dictionary, with counts, document count and frozen
    ///   state carried over.
    pub fn trim_tail(&self, min_count: u64, min_doc_freq: u64) -> Result<Self> {
        let mut trimmed = Self::new(self.max_order())?;
        trimmed.num_docs = self.num_docs;
        for order in 1..=self.max_order() {
            for id in self.dictionary.ids(order) {
                let tf = self.term_frequency(order, id);
                let df = self.doc_frequency(order, id);
                if tf < min_count || df < min_doc_freq {
                    continue;
                }
                let Some(ngram) = self.dictionary.get_ngram(order, id) else {
                    continue;
                };
                if order > 1 && !ngram.iter().all(|term| trimmed.terms().contains(term)) {
                    trace!(order, old = id, tf, df, "dropped n-gram over a trimmed term");
                    continue;
                }
                let Some(new_id) = trimmed.get_or_add(&ngram[..])? else {
                    continue;
                };
                trace!(order, old = id, new = new_id, tf, df, "kept n-gram");
                let counts = &mut trimmed.counts[order - 1];
                counts.term_freq[new_id as usize] = tf;
                counts.doc_freq[new_id as usize] = df;
                counts.total += tf;
            }
        }
        if self.is_frozen() {
            trimmed.freeze();
        }
        for order in 1..=self.max_order() {
            info!(
                order,
                before = self.dictionary.ngram_count(order),
                after = trimmed.dictionary.ngram_count(order),
                min_count,
                min_doc_freq,
                "trimmed n-gram dictionary"
            );
        }
        Ok(trimmed)
    }

    /// Translate every id of this dictionary into the id space of `trimmed`.
    ///
    /// `table[order - 1][old_id]` is the new id, `None` when the n-gram did
    /// not survive.
    pub fn remap_table(&self, trimmed: &Self) -> Vec<Vec<Option<NgramId>>> {
        (1..=self.max_order())
            .map(|order| {
                (0..self.dictionary.size(order))
                    .map(|id| {
                        self.dictionary
                            .get_ngram(order, id as NgramId)
                            .and_then(|ngram| trimmed.get_index(&ngram[..]))
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Count every n-gram of each document, one document frequency per
    /// distinct n-gram per document.
    fn count_docs(dict: &mut CountingNgramDictionary, docs: &[&[&[&str]]]) {
        for doc in docs {
            let mut seen = std::collections::HashSet::new();
            for &ngram in doc.iter() {
                let id = dict.get_or_add(ngram).unwrap().unwrap();
                dict.increment_term_frequency(ngram.len(), id, 1).unwrap();
                if seen.insert((ngram.len(), id)) {
                    dict.increment_doc_frequency(ngram.len(), id).unwrap();
                }
            }
            dict.increment_num_docs();
        }
    }

    #[test]
    fn counters_track_frequencies() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        count_docs(
            &mut dict,
            &[
                &[&["a"], &["b"], &["a", "b"], &["a"]],
                &[&["a"], &["c"], &["a", "c"]],
            ],
        );
        assert_eq!(dict.num_docs(), 2);
        assert_eq!(dict.ngram_frequency(&["a"]), 3);
        assert_eq!(dict.ngram_doc_frequency(&["a"]), 2);
        assert_eq!(dict.ngram_frequency(&["a", "b"]), 1);
        assert_eq!(dict.ngram_frequency(&["z"]), 0);
        assert_eq!(dict.total_ngrams(1), 5);
        assert_eq!(dict.total_ngrams(2), 2);
    }

    #[test]
    fn counters_grow_past_initial_capacity() {
        let mut dict = CountingNgramDictionary::new(1).unwrap();
        for i in 0..100 {
            let word = format!("w{}", i);
            let id = dict.get_or_add(&[word.as_str()]).unwrap().unwrap();
            dict.increment_term_frequency(1, id, i + 1).unwrap();
        }
        assert_eq!(dict.size(1), 101);
        assert_eq!(dict.ngram_frequency(&["w99"]), 100);
        assert!(dict.counts[0].term_freq.len() >= 101);
    }

    #[test]
    fn frozen_counters_do_not_move() {
        let mut dict = CountingNgramDictionary::new(1).unwrap();
        let id = dict.get_or_add(&["a"]).unwrap().unwrap();
        dict.increment_term_frequency(1, id, 2).unwrap();
        dict.increment_num_docs();
        dict.freeze();

        dict.increment_term_frequency(1, id, 5).unwrap();
        dict.increment_doc_frequency(1, id).unwrap();
        dict.increment_num_docs();
        assert_eq!(dict.term_frequency(1, id), 2);
        assert_eq!(dict.doc_frequency(1, id), 0);
        assert_eq!(dict.num_docs(), 1);
    }

    #[test]
    fn bad_ids_are_errors() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        dict.get_or_add(&["a"]).unwrap();
        assert!(matches!(
            dict.increment_term_frequency(1, 5, 1),
            Err(Error::IdOutOfRange { order: 1, id: 5, size: 2 })
        ));
        assert!(matches!(
            dict.increment_doc_frequency(3, 1),
            Err(Error::UnsupportedOrder { order: 3, max: 2 })
        ));
    }

    #[test]
    fn idf_per_order() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        count_docs(
            &mut dict,
            &[
                &[&["a"], &["b"], &["a", "b"]],
                &[&["a"], &["c"]],
                &[&["b"], &["a", "b"]],
            ],
        );
        let idf = dict.compute_idf();
        let a = dict.get_index(&["a"]).unwrap();
        let c = dict.get_index(&["c"]).unwrap();
        let ab = dict.get_index(&["a", "b"]).unwrap();
        assert_eq!(idf.doc_num, 3);
        assert!((idf.get(1, a) - (3.0f64 / 2.0).ln()).abs() < 1e-12);
        assert!((idf.get(1, c) - 3.0f64.ln()).abs() < 1e-12);
        assert!((idf.get(2, ab) - (3.0f64 / 2.0).ln()).abs() < 1e-12);
        assert_eq!(idf.get(1, 0), 0.0);
    }

    #[test]
    fn idf_of_empty_dictionary_is_zero() {
        let mut dict = CountingNgramDictionary::new(1).unwrap();
        dict.get_or_add(&["a"]).unwrap();
        let idf = dict.compute_idf();
        assert_eq!(idf.doc_num, 0);
        assert!(idf.idf_vecs[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn trim_tail_keeps_frequent_ngrams() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        count_docs(
            &mut dict,
            &[
                &[&["rare"], &["x"], &["x", "y"], &["y"]],
                &[&["x"], &["y"], &["x", "y"]],
                &[&["x"], &["z"]],
            ],
        );
        let trimmed = dict.trim_tail(2, 2).unwrap();
        assert_eq!(trimmed.terms().get_id("x"), Some(1));
        assert_eq!(trimmed.terms().get_id("y"), Some(2));
        assert_eq!(trimmed.terms().get_id("rare"), None);
        assert_eq!(trimmed.terms().get_id("z"), None);
        assert_eq!(trimmed.size(1), 3);
        assert_eq!(trimmed.size(2), 2);
        assert_eq!(trimmed.ngram_frequency(&["x"]), 3);
        assert_eq!(trimmed.ngram_doc_frequency(&["x", "y"]), 2);
        assert_eq!(trimmed.total_ngrams(1), 5);
        assert_eq!(trimmed.num_docs(), 3);
        assert!(!trimmed.is_frozen());

        let table = dict.remap_table(&trimmed);
        let rare = dict.get_index(&["rare"]).unwrap();
        let y = dict.get_index(&["y"]).unwrap();
        assert_eq!(table[0][rare as usize], None);
        assert_eq!(table[0][y as usize], Some(2));
        assert_eq!(table[0][0], None);
    }

    #[test]
    fn trim_tail_drops_ngrams_over_trimmed_terms() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        // "b" only ever appears inside the bigram
        count_docs(
            &mut dict,
            &[&[&["a"], &["a", "b"]], &[&["a"], &["a", "b"]]],
        );
        assert_eq!(dict.ngram_frequency(&["b"]), 0);

        let trimmed = dict.trim_tail(1, 1).unwrap();
        assert_eq!(trimmed.terms().get_id("a"), Some(1));
        assert_eq!(trimmed.terms().get_id("b"), None);
        assert_eq!(trimmed.get_index(&["a", "b"]), None);
        assert_eq!(trimmed.size(2), 1);

        let table = dict.remap_table(&trimmed);
        let b = dict.get_index(&["b"]).unwrap();
        let ab = dict.get_index(&["a", "b"]).unwrap();
        assert_eq!(table[0][b as usize], None);
        assert_eq!(table[1][ab as usize], None);
    }

    #[test]
    fn rollback_forgets_new_entries_and_their_counts() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        count_docs(&mut dict, &[&[&["a"], &["a", "b"]]]);
        let checkpoint = dict.checkpoint();

        let c = dict.get_or_add(&["c"]).unwrap().unwrap();
        dict.increment_term_frequency(1, c, 4).unwrap();
        dict.get_or_add(&["b", "c"]).unwrap();
        dict.rollback(&checkpoint);

        assert_eq!(dict.checkpoint(), checkpoint);
        assert_eq!(dict.get_index(&["c"]), None);
        assert_eq!(dict.get_index(&["b", "c"]), None);
        assert_eq!(dict.total_ngrams(1), 1);
        assert_eq!(dict.get_or_add(&["d"]).unwrap(), Some(c));
        assert_eq!(dict.term_frequency(1, c), 0);
    }

    #[test]
    fn trim_tail_with_zero_thresholds_keeps_everything() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        count_docs(&mut dict, &[&[&["a"], &["b"], &["a", "b"]]]);
        dict.freeze();
        let trimmed = dict.trim_tail(0, 0).unwrap();
        assert_eq!(trimmed.size(1), dict.size(1));
        assert_eq!(trimmed.size(2), dict.size(2));
        assert!(trimmed.is_frozen());
    }

    #[test]
    fn cbor_round_trip() {
        let mut dict = CountingNgramDictionary::new(2).unwrap();
        count_docs(&mut dict, &[&[&["a"], &["b"], &["a", "b"]]]);
        let bytes = serde_cbor::to_vec(&dict).unwrap();
        let back: CountingNgramDictionary = serde_cbor::from_slice(&bytes).unwrap();
        assert_eq!(back.get_index(&["a", "b"]), Some(1));
        assert_eq!(back.ngram_frequency(&["b"]), 1);
        assert_eq!(back, dict);
    }
}

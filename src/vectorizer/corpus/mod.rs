mod config;

pub use config::CorpusConfig;

use ahash::RandomState;
use indexmap::IndexSet;
use num::{Num, NumCast};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::utils::datastruct::vector::{IdfVector, SparseVec};
use crate::vectorizer::counting::CountingNgramDictionary;
use crate::vectorizer::document::{CorpusDocument, FeatureSpace};
use crate::vectorizer::feature::{FeatureDictionary, FeatureId};
use crate::vectorizer::tfidf::TfIdfTransform;
use crate::vectorizer::token::AnnotatedDocument;

/// Corpus struct
/// Ordered collection of documents sharing one counting n-gram dictionary.
///
/// Lifecycle:
/// - `add_document` while building; counts and vocabulary grow
/// - optional `trim_tail` to drop rare n-grams and re-index every document
/// - `finalize` freezes the vocabulary, caches IDF and applies the
///   configured weighting
///
/// After `finalize` no document can be added and the IDF never changes.
/// New documents can still be vectorized against the frozen vocabulary with
/// `vectorize`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Corpus {
    config: CorpusConfig,
    dictionary: CountingNgramDictionary,
    features: FeatureDictionary,
    documents: Vec<CorpusDocument>,
    class_labels: IndexSet<String, RandomState>,
    /// documents added, stored or not
    added: usize,
    finalized: bool,
    idf: Option<IdfVector>,
    /// transform the stored documents were weighted with
    weighting: Option<TfIdfTransform>,
}

impl Corpus {
    /// Create an empty corpus with a fresh dictionary.
    pub fn new(config: CorpusConfig) -> Result<Self> {
        let dictionary = CountingNgramDictionary::new(config.max_order)?;
        Ok(Self::with_dictionary(config, dictionary, FeatureDictionary::new()))
    }

    /// Create a corpus over an existing vocabulary.
    ///
    /// The dictionary decides the maximum order. With
    /// `config.frozen_vocabulary` both dictionaries are frozen up front, so
    /// documents only pick up n-grams and features already known and the
    /// dictionary statistics stay untouched.
    pub fn with_dictionary(
        mut config: CorpusConfig,
        mut dictionary: CountingNgramDictionary,
        mut features: FeatureDictionary,
    ) -> Self {
        if config.max_order != dictionary.max_order() {
            debug!(
                configured = config.max_order,
                dictionary = dictionary.max_order(),
                "using the dictionary's max order"
            );
            config.max_order = dictionary.max_order();
        }
        if config.frozen_vocabulary {
            dictionary.freeze();
            features.freeze();
        }
        Self {
            config,
            dictionary,
            features,
            documents: Vec::new(),
            class_labels: IndexSet::with_hasher(RandomState::new()),
            added: 0,
            finalized: false,
            idf: None,
            weighting: None,
        }
    }

    /// Count `doc` into the dictionary and store its sparse form.
    ///
    /// # Returns
    /// * position of the document in insertion order; with
    ///   `config.index_only` the document is counted but not stored.
    ///
    /// # Errors
    /// * `CorpusFinalized` after `finalize`.
    pub fn add_document(&mut self, doc: &AnnotatedDocument) -> Result<usize> {
        if self.finalized {
            return Err(Error::CorpusFinalized);
        }
        let options = self.config.document_options();
        let document = CorpusDocument::build(doc, &mut self.dictionary, &mut self.features, &options)?;
        self.dictionary.increment_num_docs();
        if let Some(label) = doc.label() {
            self.class_labels.insert(label.to_owned());
        }
        if !self.config.index_only {
            self.documents.push(document);
        }
        self.added += 1;
        Ok(self.added - 1)
    }

    /// Register a structured feature name.
    /// `None` once the feature dictionary is frozen and `name` is unknown.
    pub fn add_feature(&mut self, name: &str) -> Option<FeatureId> {
        self.features.get_or_add(name)
    }

    /// Drop every n-gram below the thresholds and re-index all stored
    /// documents against the trimmed dictionary.
    ///
    /// # Arguments
    /// * `min_count` - minimum corpus term frequency
    /// * `min_doc_freq` - minimum document frequency
    pub fn trim_tail(&mut self, min_count: u64, min_doc_freq: u64) -> Result<()> {
        if self.finalized {
            return Err(Error::CorpusFinalized);
        }
        let trimmed = self.dictionary.trim_tail(min_count, min_doc_freq)?;
        let table = self.dictionary.remap_table(&trimmed);
        self.documents = self
            .documents
            .par_iter()
            .map(|doc| doc.remap(&table))
            .collect();
        self.dictionary = trimmed;
        info!(
            documents = self.documents.len(),
            vocabulary = self.dictionary.terms().size(),
            "re-indexed documents after trim"
        );
        Ok(())
    }

    /// Freeze the vocabulary, cache IDF and apply `config.weighting`.
    /// Calling it again does nothing.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.freeze_statistics();
        if let Some(transform) = self.config.weighting {
            self.weigh_documents(transform);
        }
    }

    fn freeze_statistics(&mut self) {
        if self.finalized {
            return;
        }
        self.dictionary.freeze();
        self.features.freeze();
        self.idf = Some(self.dictionary.compute_idf());
        self.finalized = true;
        info!(
            documents = self.added,
            num_docs = self.dictionary.num_docs(),
            vocabulary = self.dictionary.terms().size(),
            "finalized corpus"
        );
    }

    fn weigh_documents(&mut self, transform: TfIdfTransform) {
        let Some(idf) = self.idf.as_ref() else {
            return;
        };
        self.documents
            .par_iter_mut()
            .for_each(|doc| transform.weigh_document(doc, idf));
        self.weighting = Some(transform);
        debug!(?transform, documents = self.documents.len(), "weighted documents");
    }

    /// Weigh every stored document with `transform`, finalizing first.
    ///
    /// # Errors
    /// * `AlreadyWeighted` when weights were applied before.
    pub fn apply_weighting(&mut self, transform: TfIdfTransform) -> Result<()> {
        if self.weighting.is_some() {
            return Err(Error::AlreadyWeighted);
        }
        self.freeze_statistics();
        self.weigh_documents(transform);
        Ok(())
    }

    /// Sparse form of a new document against the current vocabulary, weighted
    /// like the stored documents once the corpus has been weighted. Nothing
    /// in the corpus changes.
    pub fn vectorize(&self, doc: &AnnotatedDocument) -> CorpusDocument {
        let options = self.config.document_options();
        let mut document = CorpusDocument::lookup(doc, &self.dictionary, &self.features, &options);
        if let (Some(transform), Some(idf)) = (self.weighting, self.idf.as_ref()) {
            transform.weigh_document(&mut document, idf);
        }
        document
    }

    #[inline]
    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    /// Cached IDF, `None` before `finalize`.
    #[inline]
    pub fn idf(&self) -> Option<&IdfVector> {
        self.idf.as_ref()
    }

    #[inline]
    pub fn documents(&self) -> &[CorpusDocument] {
        &self.documents
    }

    #[inline]
    pub fn document(&self, index: usize) -> Option<&CorpusDocument> {
        self.documents.get(index)
    }

    /// Stored documents.
    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents passed to `add_document`, stored or not.
    #[inline]
    pub fn added(&self) -> usize {
        self.added
    }

    #[inline]
    pub fn dictionary(&self) -> &CountingNgramDictionary {
        &self.dictionary
    }

    #[inline]
    pub fn features(&self) -> &FeatureDictionary {
        &self.features
    }

    /// Feature weights are the only part of the feature dictionary that can
    /// change after `finalize`.
    pub fn set_feature_weight(&mut self, id: FeatureId, weight: f64) -> bool {
        self.features.set_weight(id, weight)
    }

    /// Class labels in first-seen order.
    pub fn class_labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.class_labels.iter().map(String::as_str)
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    #[inline]
    pub fn is_weighted(&self) -> bool {
        self.weighting.is_some()
    }

    pub fn feature_space(&self) -> FeatureSpace {
        FeatureSpace::new(self.dictionary.dictionary(), &self.features)
    }

    /// Stored documents ranked by cosine similarity to `query` over the
    /// corpus feature space, best first. Documents sharing nothing with
    /// `query` are left out.
    ///
    /// # Returns
    /// * at most `top` pairs of document position and score
    pub fn most_similar(&self, query: &CorpusDocument, top: usize) -> Vec<(usize, f64)> {
        let space = self.feature_space();
        let query: SparseVec<f64> = query.to_sparse_vec(&space);
        let mut scored: Vec<(usize, f64)> = self
            .documents
            .par_iter()
            .enumerate()
            .map(|(idx, doc)| (idx, query.cosine_similarity(&doc.to_sparse_vec(&space))))
            .filter(|&(_, score)| score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(top);
        scored
    }

    /// One sparse row per stored document over [`feature_space`](Self::feature_space).
    pub fn sparse_vectors<N>(&self) -> Vec<SparseVec<N>>
    where
        N: Num + NumCast + Copy + Send,
    {
        let space = self.feature_space();
        self.documents
            .par_iter()
            .map(|doc| doc.to_sparse_vec(&space))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::key;
    use crate::vectorizer::tfidf::{NormType, TfType};
    use crate::vectorizer::token::{TextField, DEFAULT_FIELD};

    fn doc(id: &str, words: &[&str]) -> AnnotatedDocument {
        AnnotatedDocument::new(id).with_field(DEFAULT_FIELD, TextField::from_words([words.to_vec()]))
    }

    #[test]
    fn finalized_corpus_rejects_changes() {
        let mut corpus = Corpus::new(CorpusConfig::default()).unwrap();
        assert_eq!(corpus.add_document(&doc("a", &["x", "y"])).unwrap(), 0);
        corpus.finalize();
        corpus.finalize();
        assert!(corpus.is_finalized());
        assert!(corpus.dictionary().is_frozen());
        assert!(matches!(corpus.add_document(&doc("b", &["x"])), Err(Error::CorpusFinalized)));
        assert!(matches!(corpus.trim_tail(1, 1), Err(Error::CorpusFinalized)));
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn index_only_counts_without_storing() {
        let mut corpus = Corpus::new(CorpusConfig::default().with_index_only(true)).unwrap();
        corpus.add_document(&doc("a", &["x"])).unwrap();
        assert_eq!(corpus.add_document(&doc("b", &["x", "y"])).unwrap(), 1);
        assert!(corpus.is_empty());
        assert_eq!(corpus.added(), 2);
        assert_eq!(corpus.dictionary().num_docs(), 2);
        assert_eq!(corpus.dictionary().ngram_doc_frequency(&["x"]), 2);
    }

    #[test]
    fn class_labels_in_first_seen_order() {
        let mut corpus = Corpus::new(CorpusConfig::new(1)).unwrap();
        for (id, label) in [("a", "spam"), ("b", "ham"), ("c", "spam")] {
            corpus.add_document(&doc(id, &["w"]).with_label(label)).unwrap();
        }
        assert_eq!(corpus.class_labels().collect::<Vec<_>>(), vec!["spam", "ham"]);
        assert_eq!(corpus.document(1).unwrap().label(), Some("ham"));
    }

    #[test]
    fn weighting_is_applied_once() {
        let config = CorpusConfig::new(1).with_weighting(TfIdfTransform::default());
        let mut corpus = Corpus::new(config).unwrap();
        corpus.add_document(&doc("a", &["x", "y"])).unwrap();
        corpus.add_document(&doc("b", &["x"])).unwrap();
        corpus.finalize();
        assert!(corpus.is_weighted());
        let y = corpus.dictionary().get_index(&["y"]).unwrap();
        assert!((corpus.documents()[0].value(1, y) - 2.0f64.ln()).abs() < 1e-12);
        assert!(matches!(
            TfIdfTransform::default().transform_corpus(&mut corpus),
            Err(Error::AlreadyWeighted)
        ));
    }

    #[test]
    fn transform_finalizes_first() {
        let mut corpus = Corpus::new(CorpusConfig::new(1)).unwrap();
        corpus.add_document(&doc("a", &["x", "y"])).unwrap();
        corpus.add_document(&doc("b", &["x"])).unwrap();
        TfIdfTransform::new(TfType::Raw, NormType::L2)
            .transform_corpus(&mut corpus)
            .unwrap();
        assert!(corpus.is_finalized());
        assert_eq!(corpus.idf().unwrap().doc_num, 2);
        let y = corpus.dictionary().get_index(&["y"]).unwrap();
        // "x" appears everywhere, so "y" carries the whole norm
        assert!((corpus.documents()[0].value(1, y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn vectorize_uses_frozen_vocabulary() {
        let config = CorpusConfig::new(1).with_weighting(TfIdfTransform::default());
        let mut corpus = Corpus::new(config).unwrap();
        corpus.add_document(&doc("a", &["x", "y"])).unwrap();
        corpus.add_document(&doc("b", &["x"])).unwrap();
        corpus.finalize();

        let vec = corpus.vectorize(&doc("new", &["y", "y", "z"]));
        let y = corpus.dictionary().get_index(&["y"]).unwrap();
        assert!((vec.value(1, y) - 2.0 * 2.0f64.ln()).abs() < 1e-12);
        assert_eq!(vec.nnz(), 1);
        assert_eq!(corpus.dictionary().terms().get_id("z"), None);
        assert_eq!(corpus.idf().unwrap().doc_num, 2);
    }

    #[test]
    fn fixed_vocabulary_corpus() {
        let mut source = Corpus::new(CorpusConfig::new(1)).unwrap();
        source.add_document(&doc("a", &["x", "y"])).unwrap();
        let dictionary = source.dictionary().clone();

        let config = CorpusConfig::new(2).with_frozen_vocabulary(true);
        let mut fixed = Corpus::with_dictionary(config, dictionary, FeatureDictionary::new());
        assert_eq!(fixed.config().max_order, 1);
        fixed.add_document(&doc("b", &["y", "q"])).unwrap();
        assert_eq!(fixed.documents()[0].nnz(), 1);
        assert_eq!(fixed.dictionary().num_docs(), 1);
        assert_eq!(fixed.dictionary().ngram_frequency(&["y"]), 1);
    }

    #[test]
    fn most_similar_ranks_by_cosine() {
        let config = CorpusConfig::new(1).with_weighting(TfIdfTransform::default());
        let mut corpus = Corpus::new(config).unwrap();
        corpus.add_document(&doc("cats", &["cat", "purr", "cat"])).unwrap();
        corpus.add_document(&doc("dogs", &["dog", "bark"])).unwrap();
        corpus.add_document(&doc("both", &["cat", "dog"])).unwrap();
        corpus.finalize();

        let query = corpus.vectorize(&doc("q", &["cat"]));
        let ranked = corpus.most_similar(&query, 10);
        let order: Vec<usize> = ranked.iter().map(|&(idx, _)| idx).collect();
        assert_eq!(order, vec![2, 0]);
        assert!(ranked[0].1 > ranked[1].1);
        assert!(ranked.iter().all(|&(_, score)| score <= 1.0 + 1e-12));

        assert_eq!(corpus.most_similar(&query, 1).len(), 1);
        let unknown = corpus.vectorize(&doc("q", &["fish"]));
        assert!(corpus.most_similar(&unknown, 10).is_empty());
    }

    #[test]
    fn overflowing_document_leaves_statistics_untouched() {
        // fill the term ids up to the order-3 operand limit
        let mut dictionary = CountingNgramDictionary::new(3).unwrap();
        for i in 0..key::id_limit(3) - 1 {
            dictionary.get_or_add(&[format!("w{}", i)]).unwrap();
        }
        let mut corpus = Corpus::with_dictionary(CorpusConfig::new(3), dictionary, FeatureDictionary::new());

        // "fresh" gets id 2^20, which no trigram key can hold
        let err = corpus.add_document(&doc("a", &["w0", "w1", "fresh"])).unwrap_err();
        assert!(matches!(err, Error::EncodingOverflow { order: 3, .. }));
        let dict = corpus.dictionary();
        assert_eq!(dict.num_docs(), 0);
        assert_eq!(dict.ngram_frequency(&["w0"]), 0);
        assert_eq!(dict.ngram_doc_frequency(&["w0"]), 0);
        assert_eq!(dict.total_ngrams(1), 0);
        assert_eq!(dict.get_index(&["fresh"]), None);
        assert_eq!(dict.dictionary().ngram_count(2), 0);
        assert_eq!(dict.size(1) as u64, key::id_limit(3));
        assert_eq!(corpus.added(), 0);
        assert!(corpus.is_empty());

        assert_eq!(corpus.add_document(&doc("b", &["w0", "w1"])).unwrap(), 0);
        corpus.finalize();
        let idf = corpus.idf().unwrap();
        let w0 = corpus.dictionary().get_index(&["w0"]).unwrap();
        assert_eq!(corpus.dictionary().num_docs(), 1);
        assert_eq!(corpus.dictionary().ngram_doc_frequency(&["w0"]), 1);
        assert_eq!(idf.get(1, w0), 0.0);
        assert!(idf.idf_vecs.iter().flatten().all(|&v| v >= 0.0));
    }

    #[test]
    fn recursive_ingestion_counts_like_plain_ingestion() {
        let docs = [doc("a", &["a", "b", "c", "d"]), doc("b", &["b", "c", "d", "e", "b", "c"])];
        let mut plain = Corpus::new(CorpusConfig::new(3)).unwrap();
        let mut recursive = Corpus::new(CorpusConfig::new(3).with_recursive(true)).unwrap();
        for d in &docs {
            plain.add_document(d).unwrap();
            recursive.add_document(d).unwrap();
        }

        assert_eq!(recursive.documents(), plain.documents());
        let dict = recursive.dictionary();
        assert_eq!(dict.dictionary().ngram_count(2), 5);
        assert_eq!(dict.dictionary().ngram_count(3), 5);
        assert_eq!(dict.ngram_frequency(&["b", "c"]), 3);
        assert_eq!(dict.ngram_doc_frequency(&["b", "c"]), 2);
        assert_eq!(dict.ngram_frequency(&["b", "c", "d"]), 2);
        assert_eq!(dict.ngram_doc_frequency(&["b", "c", "d"]), 2);
        assert_eq!(dict.ngram_doc_frequency(&["e", "b", "c"]), 1);
        assert_eq!(dict.ngram_frequency(&["a", "c"]), 0);
        for order in 1..=3 {
            assert_eq!(dict.total_ngrams(order), plain.dictionary().total_ngrams(order));
            for id in dict.dictionary().ids(order) {
                assert_eq!(dict.term_frequency(order, id), plain.dictionary().term_frequency(order, id));
                assert_eq!(dict.doc_frequency(order, id), plain.dictionary().doc_frequency(order, id));
            }
        }
    }

    #[test]
    fn sparse_rows_follow_feature_space() {
        let mut corpus = Corpus::new(CorpusConfig::new(1)).unwrap();
        corpus
            .add_document(&doc("a", &["x", "y", "x"]).with_feature("score", 2.0))
            .unwrap();
        corpus.add_document(&doc("b", &["y"])).unwrap();
        let rows: Vec<SparseVec<u32>> = corpus.sparse_vectors();
        assert_eq!(corpus.feature_space().dim(), 3);
        assert_eq!(rows[0].to_dense(), vec![2, 1, 2]);
        assert_eq!(rows[1].to_dense(), vec![0, 1, 0]);
    }
}

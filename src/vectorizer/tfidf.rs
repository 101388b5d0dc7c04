use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::datastruct::vector::IdfVector;
use crate::vectorizer::corpus::Corpus;
use crate::vectorizer::document::CorpusDocument;

/// Term frequency variant.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TfType {
    /// raw count
    #[default]
    Raw,
    /// count / length of the order
    LengthNorm,
    /// 1 + ln(count / length), 0 for a zero count
    LogLengthNorm,
}

impl TfType {
    /// Term frequency of an n-gram seen `count` times in a document whose
    /// n-grams of the same order total `length`. A zero length leaves the
    /// count unchanged.
    #[inline]
    pub fn apply(self, count: f64, length: f64) -> f64 {
        if length <= 0.0 {
            return count;
        }
        match self {
            TfType::Raw => count,
            TfType::LengthNorm => count / length,
            TfType::LogLengthNorm if count > 0.0 => 1.0 + (count / length).ln(),
            TfType::LogLengthNorm => 0.0,
        }
    }
}

/// Vector normalization applied after weighting, across all orders at once.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NormType {
    #[default]
    None,
    L1,
    L2,
}

/// TF-IDF weighting of corpus documents.
///
/// Every value becomes `tf(count, length) * idf(order, id)`, then the whole
/// document vector is normalized according to `norm`.
///
/// # Examples
/// ```
/// use tf_idf_corpus::utils::datastruct::vector::IdfVector;
/// use tf_idf_corpus::vectorizer::document::CorpusDocument;
/// use tf_idf_corpus::vectorizer::tfidf::{NormType, TfIdfTransform, TfType};
///
/// let mut doc = CorpusDocument::new("d", None, 1);
/// doc.add_or_increment(1, 1, 2.0).unwrap();
/// doc.add_or_increment(1, 2, 2.0).unwrap();
/// let idf = IdfVector { idf_vecs: vec![vec![0.0, 1.0, 3.0]], doc_num: 10 };
///
/// TfIdfTransform::new(TfType::LengthNorm, NormType::L1).weigh_document(&mut doc, &idf);
/// assert!((doc.value(1, 1) - 0.25).abs() < 1e-12);
/// assert!((doc.value(1, 2) - 0.75).abs() < 1e-12);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TfIdfTransform {
    pub tf: TfType,
    pub norm: NormType,
}

impl TfIdfTransform {
    pub fn new(tf: TfType, norm: NormType) -> Self {
        Self { tf, norm }
    }

    /// Replace the counts of `doc` by TF-IDF weights.
    ///
    /// # Arguments
    /// * `doc` - document holding raw counts
    /// * `idf` - IDF values in the same id space as `doc`
    pub fn weigh_document(&self, doc: &mut CorpusDocument, idf: &IdfVector) {
        let mut norm_sum = 0.0;
        for order in 1..=doc.order() {
            let length = doc.length(order);
            let Some(ngrams) = doc.ngrams_mut(order) else {
                continue;
            };
            for (&id, value) in ngrams.iter_mut() {
                let weight = self.tf.apply(*value, length) * idf.get(order, id);
                norm_sum += match self.norm {
                    NormType::None => 0.0,
                    NormType::L1 => weight.abs(),
                    NormType::L2 => weight * weight,
                };
                *value = weight;
            }
        }
        if norm_sum <= 0.0 {
            return;
        }
        let divisor = match self.norm {
            NormType::L2 => norm_sum.sqrt(),
            _ => norm_sum,
        };
        for ngrams in doc.all_ngrams_mut() {
            for value in ngrams.values_mut() {
                *value /= divisor;
            }
        }
    }

    /// Weigh every document of `corpus` with IDF values from the corpus
    /// itself, finalizing it first when needed.
    ///
    /// # Errors
    /// * `AlreadyWeighted` when the corpus documents already hold weights.
    pub fn transform_corpus(&self, corpus: &mut Corpus) -> Result<()> {
        corpus.apply_weighting(*self)
    }
}

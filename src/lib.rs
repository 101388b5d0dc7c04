//! This crate turns annotated, tokenized documents into n-gram dictionaries,
//! corpus frequency statistics and TF-IDF weighted sparse vectors.

pub mod config;
pub mod error;
pub mod utils;
pub mod vectorizer;

/// Error and Result types
/// Every fallible operation of the crate returns `error::Result<T>`.
/// Unknown terms or n-grams are reported as `None`, never as errors.
pub use error::{Error, Result};

/// Corpus
/// The top-level struct of this crate.
/// It owns one counting n-gram dictionary, a feature dictionary and the
/// sparse form of every document added to it.
///
/// Lifecycle:
/// - `add_document` counts a document and stores its n-gram vector
/// - `trim_tail` drops rare n-grams and re-indexes every stored document
/// - `finalize` freezes the vocabulary, caches IDF and applies the configured
///   TF-IDF weighting
///
/// # Serialization
/// Supported (CBOR through `save` / `load`, or any serde format).
/// The dictionaries, documents and cached IDF are all included.
pub use vectorizer::corpus::Corpus;

/// Corpus configuration
/// Maximum order, token form, sentence handling, storage mode and optional
/// weighting. Loadable from JSON.
pub use vectorizer::corpus::CorpusConfig;

/// Input document model
/// Documents arrive already tokenized and annotated:
/// - `AnnotatedDocument`: id, optional class label, named text fields, named
///   numeric features
/// - `TextField`: sentences of tokens
/// - `AnnotatedToken`: token text plus optional lemma, POS, stem and segment
/// - `TokenForm`: which string of a token enters the dictionary
pub use vectorizer::token::{AnnotatedDocument, AnnotatedToken, Annotation, TextField, TokenForm};

/// Corpus Document
/// Sparse per-order n-gram vectors of one document, with per-order lengths
/// and structured features. Holds raw counts until weighted.
pub use vectorizer::document::{CorpusDocument, FeatureSpace};

/// Dictionaries
/// - `TermDictionary`: term <-> dense id, id 0 reserved
/// - `NgramDictionary`: per-order dense ids over packed n-gram keys
/// - `CountingNgramDictionary`: an `NgramDictionary` with term frequency,
///   document frequency and document count
/// - `FeatureDictionary`: structured feature names and weights
///
/// All of them can be frozen; a frozen dictionary resolves known entries and
/// never grows.
pub use vectorizer::{
    counting::CountingNgramDictionary, feature::FeatureDictionary, ngram::NgramDictionary,
    term::TermDictionary,
};

/// TF-IDF Transform
/// Replaces document counts with `tf(count, length) * idf` and optionally
/// L1/L2 normalizes the result.
///
/// TF variants:
/// - Raw
/// - LengthNorm
/// - LogLengthNorm
pub use vectorizer::tfidf::{NormType, TfIdfTransform, TfType};

/// IDF Vector and Sparse Vector
/// - `IdfVector`: per-order `ln(N / df)` values
/// - `SparseVec<N>`: sorted sparse row, generic over the numeric type
///   (f32, f64, u8, u16, u32, ...)
pub use utils::datastruct::vector::{IdfVector, SparseVec};

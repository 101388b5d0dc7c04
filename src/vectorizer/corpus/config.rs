use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_CORPUS_ORDER;
use crate::error::Result;
use crate::vectorizer::document::DocumentOptions;
use crate::vectorizer::tfidf::TfIdfTransform;
use crate::vectorizer::token::TokenForm;

/// Runtime options of a [`Corpus`](super::Corpus).
///
/// Missing keys fall back to the defaults when loaded from JSON:
///
/// ```
/// use tf_idf_corpus::vectorizer::corpus::CorpusConfig;
/// use tf_idf_corpus::vectorizer::token::TokenForm;
///
/// let config = CorpusConfig::from_json(r#"{ "max_order": 3, "token_form": "Lemma" }"#).unwrap();
/// assert_eq!(config.max_order, 3);
/// assert_eq!(config.token_form, TokenForm::Lemma);
/// assert!(!config.cross_sentences);
/// assert!(config.weighting.is_none());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct CorpusConfig {
    /// highest n-gram order counted
    pub max_order: usize,
    pub token_form: TokenForm,
    pub cross_sentences: bool,
    pub recursive: bool,
    /// count documents without storing them
    pub index_only: bool,
    /// never grow the dictionary passed to `Corpus::with_dictionary`
    pub frozen_vocabulary: bool,
    /// applied by `finalize` when set
    pub weighting: Option<TfIdfTransform>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            max_order: DEFAULT_CORPUS_ORDER,
            token_form: TokenForm::default(),
            cross_sentences: false,
            recursive: false,
            index_only: false,
            frozen_vocabulary: false,
            weighting: None,
        }
    }
}

impl CorpusConfig {
    pub fn new(max_order: usize) -> Self {
        Self {
            max_order,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_token_form(mut self, token_form: TokenForm) -> Self {
        self.token_form = token_form;
        self
    }

    #[must_use]
    pub fn with_cross_sentences(mut self, cross_sentences: bool) -> Self {
        self.cross_sentences = cross_sentences;
        self
    }

    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub fn with_index_only(mut self, index_only: bool) -> Self {
        self.index_only = index_only;
        self
    }

    #[must_use]
    pub fn with_frozen_vocabulary(mut self, frozen: bool) -> Self {
        self.frozen_vocabulary = frozen;
        self
    }

    #[must_use]
    pub fn with_weighting(mut self, weighting: TfIdfTransform) -> Self {
        self.weighting = Some(weighting);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            token_form: self.token_form,
            cross_sentences: self.cross_sentences,
            recursive: self.recursive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::tfidf::{NormType, TfType};

    #[test]
    fn builders_and_json_agree() {
        let built = CorpusConfig::new(3)
            .with_token_form(TokenForm::Stem)
            .with_cross_sentences(true)
            .with_weighting(TfIdfTransform::new(TfType::LengthNorm, NormType::L2));
        let json = serde_json::to_string(&built).unwrap();
        assert_eq!(CorpusConfig::from_json(&json).unwrap(), built);
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(CorpusConfig::from_json("{}").unwrap(), CorpusConfig::default());
        assert!(CorpusConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, r#"{"index_only": true}"#).unwrap();
        let config = CorpusConfig::from_json_file(&path).unwrap();
        assert!(config.index_only);
        assert_eq!(config.max_order, DEFAULT_CORPUS_ORDER);
    }
}

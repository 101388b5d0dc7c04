use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};
use std::iter;

use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::SEGMENT_SEPARATOR;

/// Field name used when a document has a single body of text.
pub const DEFAULT_FIELD: &str = "text";

/// Kinds of annotation an upstream pipeline may attach to a token.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Annotation {
    Lemma,
    Pos,
    Stem,
    Segment,
}

/// One token as produced by an external tokenizer/tagger.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AnnotatedToken {
    text: String,
    annotations: HashMap<Annotation, String, RandomState>,
}

impl AnnotatedToken {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotations: HashMap::default(),
        }
    }

    #[must_use]
    pub fn with_annotation(mut self, kind: Annotation, value: impl Into<String>) -> Self {
        self.add_annotation(kind, value);
        self
    }

    pub fn add_annotation(&mut self, kind: Annotation, value: impl Into<String>) {
        self.annotations.insert(kind, value.into());
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn annotation(&self, kind: Annotation) -> Option<&str> {
        self.annotations.get(&kind).map(String::as_str)
    }
}

pub type Sentence = Vec<AnnotatedToken>;

/// A named body of text, split into sentences of tokens.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TextField {
    sentences: Vec<Sentence>,
}

impl TextField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sentences(sentences: Vec<Sentence>) -> Self {
        Self { sentences }
    }

    /// Build from plain words, one inner iterator per sentence.
    ///
    /// # Examples
    /// ```
    /// use tf_idf_corpus::vectorizer::token::TextField;
    /// let field = TextField::from_words([vec!["the", "dog"], vec!["it", "ran"]]);
    /// assert_eq!(field.sentences().len(), 2);
    /// assert_eq!(field.len(), 4);
    /// ```
    pub fn from_words<I, S, W>(sentences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = W>,
        W: Into<String>,
    {
        let sentences = sentences
            .into_iter()
            .map(|s| s.into_iter().map(AnnotatedToken::new).collect())
            .collect();
        Self { sentences }
    }

    pub fn add_sentence(&mut self, sentence: Sentence) {
        self.sentences.push(sentence);
    }

    #[inline]
    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    /// Number of tokens over all sentences.
    pub fn len(&self) -> usize {
        self.sentences.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Input document: identity, optional class label, ordered text fields and
/// named numeric features.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AnnotatedDocument {
    id: String,
    label: Option<String>,
    fields: IndexMap<String, TextField, RandomState>,
    features: IndexMap<String, f64, RandomState>,
}

impl AnnotatedDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, field: TextField) -> Self {
        self.add_field(name, field);
        self
    }

    #[must_use]
    pub fn with_feature(mut self, name: impl Into<String>, value: f64) -> Self {
        self.add_feature(name, value);
        self
    }

    /// Replaces a field of the same name.
    pub fn add_field(&mut self, name: impl Into<String>, field: TextField) {
        self.fields.insert(name.into(), field);
    }

    pub fn add_feature(&mut self, name: impl Into<String>, value: f64) {
        self.features.insert(name.into(), value);
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn field(&self, name: &str) -> Option<&TextField> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &TextField)> + '_ {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn features(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.features.iter().map(|(name, &value)| (name.as_str(), value))
    }

    /// Number of tokens over all fields.
    pub fn length(&self) -> usize {
        self.fields.values().map(TextField::len).sum()
    }

    /// Sliding n-gram windows over every field.
    pub fn ngrams(&self, form: TokenForm, max_order: usize, cross_sentences: bool) -> NgramWindows<'_> {
        NgramWindows::new(self, form, max_order, cross_sentences)
    }
}

/// Which string a token contributes to the dictionary.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenForm {
    /// text as tokenized
    Raw,
    #[default]
    Lowercase,
    /// `<segment>_<lowercase>` when a segment annotation exists
    LowercaseSegmented,
    Lemma,
    /// `<segment>_<lemma>` when a segment annotation exists
    SegmentedLemma,
    Stem,
}

impl TokenForm {
    /// Form of `token`. Lemma and stem fall back to the lowercase text.
    pub fn apply<'a>(&self, token: &'a AnnotatedToken) -> Cow<'a, str> {
        match self {
            TokenForm::Raw => Cow::Borrowed(token.text()),
            TokenForm::Lowercase => lowercase(token.text()),
            TokenForm::LowercaseSegmented => segmented(token, lowercase(token.text())),
            TokenForm::Lemma => annotation_or_lowercase(token, Annotation::Lemma),
            TokenForm::SegmentedLemma => {
                segmented(token, annotation_or_lowercase(token, Annotation::Lemma))
            }
            TokenForm::Stem => annotation_or_lowercase(token, Annotation::Stem),
        }
    }
}

/// borrows unless some character changes under lowercasing (titlecase too)
fn lowercase(text: &str) -> Cow<'_, str> {
    if text.chars().any(|c| c.to_lowercase().ne(iter::once(c))) {
        Cow::Owned(text.to_lowercase())
    } else {
        Cow::Borrowed(text)
    }
}

fn annotation_or_lowercase(token: &AnnotatedToken, kind: Annotation) -> Cow<'_, str> {
    match token.annotation(kind) {
        Some(value) => Cow::Borrowed(value),
        None => lowercase(token.text()),
    }
}

fn segmented<'a>(token: &'a AnnotatedToken, form: Cow<'a, str>) -> Cow<'a, str> {
    match token.annotation(Annotation::Segment) {
        Some(segment) => Cow::Owned(format!("{}{}{}", segment, SEGMENT_SEPARATOR, form)),
        None => form,
    }
}

/// NgramWindows iterator
/// Walks the tokens of a document and, for each token, yields the n-grams
/// ending at it: lengths 1, 2, ... up to `max_order` or the number of tokens
/// seen since the window was last cleared.
///
/// The window is cleared at every field start, and at every sentence start
/// unless `cross_sentences` is set.
///
/// # Examples
/// ```
/// use tf_idf_corpus::vectorizer::token::{AnnotatedDocument, TextField, TokenForm};
/// let doc = AnnotatedDocument::new("d")
///     .with_field("text", TextField::from_words([vec!["A", "b"]]));
/// let grams: Vec<Vec<String>> = doc
///     .ngrams(TokenForm::Lowercase, 2, false)
///     .map(|g| g.into_iter().map(|t| t.into_owned()).collect())
///     .collect();
/// assert_eq!(grams, vec![vec!["a"], vec!["b"], vec!["a", "b"]]);
/// ```
pub struct NgramWindows<'a> {
    form: TokenForm,
    max_order: usize,
    cross_sentences: bool,
    fields: indexmap::map::Values<'a, String, TextField>,
    sentences: std::slice::Iter<'a, Sentence>,
    tokens: std::slice::Iter<'a, AnnotatedToken>,
    window: VecDeque<Cow<'a, str>>,
    /// length of the next suffix to emit from `window`
    next_len: usize,
}

impl<'a> NgramWindows<'a> {
    pub fn new(doc: &'a AnnotatedDocument, form: TokenForm, max_order: usize, cross_sentences: bool) -> Self {
        let max_order = max_order.max(1);
        Self {
            form,
            max_order,
            cross_sentences,
            fields: doc.fields.values(),
            sentences: <&[Sentence]>::default().iter(),
            tokens: <&[AnnotatedToken]>::default().iter(),
            window: VecDeque::with_capacity(max_order),
            next_len: 1,
        }
    }

    fn next_token(&mut self) -> Option<&'a AnnotatedToken> {
        loop {
            if let Some(token) = self.tokens.next() {
                return Some(token);
            }
            match self.sentences.next() {
                Some(sentence) => {
                    if !self.cross_sentences {
                        self.window.clear();
                    }
                    self.tokens = sentence.iter();
                }
                None => {
                    let field = self.fields.next()?;
                    self.window.clear();
                    self.sentences = field.sentences.iter();
                }
            }
        }
    }
}

impl<'a> Iterator for NgramWindows<'a> {
    type Item = Vec<Cow<'a, str>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let len = self.window.len();
            if self.next_len <= len {
                let gram = self.window.range(len - self.next_len..).cloned().collect();
                self.next_len += 1;
                return Some(gram);
            }
            let token = self.next_token()?;
            if self.window.len() == self.max_order {
                self.window.pop_front();
            }
            self.window.push_back(self.form.apply(token));
            self.next_len = 1;
        }
    }
}

pub mod corpus;
pub mod counting;
pub mod document;
pub mod feature;
pub mod key;
pub mod ngram;
pub mod serde;
pub mod term;
pub mod tfidf;
pub mod token;

pub use corpus::{Corpus, CorpusConfig};
pub use counting::CountingNgramDictionary;
pub use document::{CorpusDocument, DocumentOptions, FeatureSpace};
pub use feature::{FeatureDictionary, FeatureId};
pub use key::NgramKey;
pub use ngram::{NgramDictionary, NgramId};
pub use term::{TermDictionary, TermId};
pub use tfidf::{NormType, TfIdfTransform, TfType};
pub use token::{AnnotatedDocument, AnnotatedToken, Annotation, NgramWindows, TextField, TokenForm};

/// Result type used across the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by the dictionary, codec, corpus and persistence layers.
///
/// Unknown terms or n-grams are not errors: lookups against a frozen
/// vocabulary return `None` instead.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// N-gram order outside the configured `1..=max` range.
    #[error("unsupported n-gram order {order}, supported orders are 1..={max}")]
    UnsupportedOrder { order: usize, max: usize },

    /// A term id does not fit in the operand field of the packed key.
    #[error("term id {id} exceeds the order-{order} key limit of {limit}")]
    EncodingOverflow { order: usize, id: u64, limit: u64 },

    /// Every dense id of an order is taken; order 1 is the term dictionary.
    #[error("order-{order} id space is exhausted at {size} entries")]
    IdSpaceExhausted { order: usize, size: usize },

    /// A packed key with payload bits outside its operand fields.
    #[error("malformed n-gram key {0:#018x}")]
    MalformedKey(u64),

    /// Documents or vocabulary were modified after `finalize`.
    #[error("corpus is finalized and can no longer be modified")]
    CorpusFinalized,

    /// TF-IDF weights were already applied to the corpus documents.
    #[error("corpus documents are already tf-idf weighted")]
    AlreadyWeighted,

    /// A counter was addressed with an id the dictionary never handed out.
    #[error("order-{order} id {id} is out of range, dictionary size is {size}")]
    IdOutOfRange { order: usize, id: u32, size: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CBOR or JSON encoding/decoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_cbor::Error> for Error {
    fn from(e: serde_cbor::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

//! Compile-time constants for the dictionary and key layout.
//!
//! Runtime corpus options live in [`crate::vectorizer::corpus::CorpusConfig`].

/// Highest n-gram order a dictionary can be built for.
pub const MAX_SUPPORTED_ORDER: usize = 3;

/// Number of high bits of a packed key holding `order - 1`.
pub const ORDER_TAG_BITS: u32 = 2;

/// Bits left for operands once the order tag is stored.
pub const KEY_PAYLOAD_BITS: u32 = u64::BITS - ORDER_TAG_BITS;

/// Term ids are `u32`, so no operand field is ever wider than this.
pub const MAX_OPERAND_BITS: u32 = u32::BITS;

/// Id reserved in every dense id space. Real entries start at 1.
pub const SENTINEL_ID: u32 = 0;

/// Surface form stored in the reserved term slot.
/// Empty token forms never resolve to a real term.
pub const SENTINEL_TERM: &str = "";

/// Initial length of the per-order frequency arrays.
pub const INITIAL_COUNTER_CAPACITY: usize = 10;

/// Growth factor of the frequency arrays, as `numerator / denominator`.
pub const COUNTER_GROWTH_NUMERATOR: usize = 3;
pub const COUNTER_GROWTH_DENOMINATOR: usize = 2;

/// Separator used when an n-gram is rendered as a single column name.
pub const NGRAM_LABEL_SEPARATOR: &str = "_";

/// Separator between a segment annotation and the token text.
pub const SEGMENT_SEPARATOR: &str = "_";

/// Default maximum order of a new corpus.
pub const DEFAULT_CORPUS_ORDER: usize = 2;

static_assertions::const_assert!(MAX_SUPPORTED_ORDER >= 1);
static_assertions::const_assert!(MAX_SUPPORTED_ORDER <= 1 << ORDER_TAG_BITS);
static_assertions::const_assert!(DEFAULT_CORPUS_ORDER <= MAX_SUPPORTED_ORDER);

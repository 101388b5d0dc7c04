use std::io::{self, Write};

use ahash::RandomState;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::config::{SENTINEL_ID, SENTINEL_TERM};
use crate::error::{Error, Result};

/// Dense id of a term. Doubles as the order-1 n-gram id.
pub type TermId = u32;

/// TermDictionary struct
/// Bidirectional map between normalized term strings and dense ids.
///
/// Ids are handed out in first-seen order starting at 1 and are never reused.
/// Id 0 is a reserved slot holding the empty string, so an empty dictionary
/// already has `size() == 1` and the empty string never resolves to a term.
///
/// # Examples
/// ```
/// use tf_idf_corpus::vectorizer::term::TermDictionary;
/// let mut terms = TermDictionary::new();
/// assert_eq!(terms.get_or_add("dog").unwrap(), Some(1));
/// assert_eq!(terms.get_or_add("bone").unwrap(), Some(2));
/// assert_eq!(terms.get_or_add("dog").unwrap(), Some(1));
///
/// terms.freeze();
/// assert_eq!(terms.get_or_add("cat").unwrap(), None);
/// assert_eq!(terms.size(), 3);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TermDictionary {
    /// position in the set is the term id
    terms: IndexSet<Box<str>, RandomState>,
    frozen: bool,
}

impl Default for TermDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl TermDictionary {
    /// Create an empty, growable dictionary
    pub fn new() -> Self {
        let mut terms = IndexSet::with_hasher(RandomState::new());
        terms.insert(Box::from(SENTINEL_TERM));
        Self {
            terms,
            frozen: false,
        }
    }

    /// Return the id of `word`, inserting it if the dictionary is not frozen.
    ///
    /// # Arguments
    /// * `word` - normalized term form
    ///
    /// # Returns
    /// * `Ok(None)` when the dictionary is frozen and `word` is unknown, or
    ///   when `word` is empty.
    /// * `Err(IdSpaceExhausted)` when every `TermId` is taken.
    pub fn get_or_add(&mut self, word: &str) -> Result<Option<TermId>> {
        if word == SENTINEL_TERM {
            return Ok(None);
        }
        if let Some(id) = self.get_id(word) {
            return Ok(Some(id));
        }
        if self.frozen {
            return Ok(None);
        }
        let id = self.next_id(0)?;
        self.terms.insert(Box::from(word));
        Ok(Some(id))
    }

    /// Id the `offset`-th term added from now on would get.
    pub(crate) fn next_id(&self, offset: usize) -> Result<TermId> {
        let size = self.terms.len();
        size.checked_add(offset)
            .and_then(|id| TermId::try_from(id).ok())
            .ok_or(Error::IdSpaceExhausted { order: 1, size })
    }

    /// Forget every term past the first `size` id slots.
    pub(crate) fn truncate(&mut self, size: usize) {
        self.terms.truncate(size.max(1));
    }

    /// Lookup only. Never inserts.
    #[inline]
    pub fn get_id(&self, word: &str) -> Option<TermId> {
        match self.terms.get_index_of(word) {
            Some(0) | None => None,
            Some(idx) => Some(idx as TermId),
        }
    }

    /// Surface form of `id`, `None` for the sentinel and unknown ids.
    #[inline]
    pub fn get_word(&self, id: TermId) -> Option<&str> {
        if id == SENTINEL_ID {
            return None;
        }
        self.terms.get_index(id as usize).map(|w| &**w)
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.get_id(word).is_some()
    }

    /// Number of id slots, sentinel included.
    #[inline]
    pub fn size(&self) -> usize {
        self.terms.len()
    }

    /// Number of real terms.
    #[inline]
    pub fn term_count(&self) -> usize {
        self.terms.len() - 1
    }

    /// Stop handing out new ids. Cannot be undone.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Real terms in id order.
    pub fn words(&self) -> impl Iterator<Item = (TermId, &str)> + '_ {
        self.terms
            .iter()
            .enumerate()
            .skip(1)
            .map(|(idx, w)| (idx as TermId, &**w))
    }

    /// Write the word list, one term per line in id order.
    pub fn write_words<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for (_, word) in self.words() {
            writeln!(writer, "{}", word)?;
        }
        writer.flush()
    }
}

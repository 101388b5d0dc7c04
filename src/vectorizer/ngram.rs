use ahash::RandomState;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{MAX_SUPPORTED_ORDER, NGRAM_LABEL_SEPARATOR, SENTINEL_ID, SENTINEL_TERM};
use crate::error::{Error, Result};
use crate::vectorizer::key::{self, check_order, NgramKey};
use crate::vectorizer::term::{TermDictionary, TermId};

/// Dense id of an n-gram inside its order. Order-1 ids are term ids.
pub type NgramId = u32;

/// NgramDictionary struct
/// Assigns dense per-order ids to n-grams of order 1..=`max_order`.
///
/// Unigrams live in the wrapped [`TermDictionary`]. Every higher order keeps
/// an insertion-ordered set of packed keys; the position of a key in the set
/// is its id, so the set serves as both the key -> id map and the id -> key
/// array. Position 0 of every order is reserved.
///
/// # Examples
/// ```
/// use tf_idf_corpus::vectorizer::ngram::NgramDictionary;
/// let mut dict = NgramDictionary::new(2).unwrap();
/// let id = dict.get_or_add(&["the", "dog"]).unwrap().unwrap();
/// assert_eq!(id, 1);
/// assert_eq!(dict.get_ngram(2, id), Some(vec!["the", "dog"]));
/// assert_eq!(dict.get_index(&["dog"]), Some(2));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NgramDictionary {
    max_order: usize,
    terms: TermDictionary,
    /// keys of order `o` at `higher[o - 2]`
    higher: Vec<IndexSet<NgramKey, RandomState>>,
}

impl NgramDictionary {
    /// Create an empty dictionary for orders `1..=max_order`.
    ///
    /// # Arguments
    /// * `max_order` - highest n-gram order, at most [`MAX_SUPPORTED_ORDER`]
    pub fn new(max_order: usize) -> Result<Self> {
        check_order(max_order, MAX_SUPPORTED_ORDER)?;
        let mut higher = Vec::with_capacity(max_order.saturating_sub(1));
        for order in 2..=max_order {
            let mut keys = IndexSet::with_hasher(RandomState::new());
            keys.insert(key::encode(order, &vec![SENTINEL_ID; order])?);
            higher.push(keys);
        }
        Ok(Self {
            max_order,
            terms: TermDictionary::new(),
            higher,
        })
    }

    #[inline]
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    #[inline]
    pub fn terms(&self) -> &TermDictionary {
        &self.terms
    }

    /// Id of `ngram`, registering it (and its missing terms) when unfrozen.
    ///
    /// # Returns
    /// * `Ok(None)` when the dictionary is frozen and the n-gram or one of its
    ///   terms is unknown.
    /// * `Err(UnsupportedOrder)` when `ngram.len()` is outside `1..=max_order`,
    ///   `Err(EncodingOverflow)` when a term id does not fit the key.
    pub fn get_or_add<S: AsRef<str>>(&mut self, ngram: &[S]) -> Result<Option<NgramId>> {
        self.insert(ngram, false)
    }

    /// Like [`get_or_add`](Self::get_or_add), but every contiguous sub-gram
    /// of order 2..len is registered as well.
    pub fn get_or_add_recursive<S: AsRef<str>>(&mut self, ngram: &[S]) -> Result<Option<NgramId>> {
        self.insert(ngram, true)
    }

    /// Resolve every term id and encode every key before touching the
    /// dictionary, so a failing n-gram leaves no trace.
    fn insert<S: AsRef<str>>(&mut self, ngram: &[S], recursive: bool) -> Result<Option<NgramId>> {
        let order = ngram.len();
        check_order(order, self.max_order)?;
        let Some(ids) = self.staged_term_ids(ngram)? else {
            return Ok(None);
        };
        let mut keys = Vec::new();
        if recursive {
            for width in 2..order {
                for window in ids.windows(width) {
                    keys.push((width, key::encode(width, window)?));
                }
            }
        }
        if order > 1 {
            keys.push((order, key::encode(order, &ids)?));
        }
        self.check_key_capacity(&keys)?;

        for term in ngram {
            self.terms.get_or_add(term.as_ref())?;
        }
        let mut id = Some(ids[0]);
        for (width, packed) in keys {
            id = self.insert_key(width, packed);
        }
        Ok(id)
    }

    /// Term ids `ngram` would get, counting terms not yet added.
    /// `None` when a term is empty, or unknown to a frozen dictionary.
    fn staged_term_ids<S: AsRef<str>>(&self, ngram: &[S]) -> Result<Option<Vec<TermId>>> {
        let mut ids = Vec::with_capacity(ngram.len());
        let mut fresh: Vec<&str> = Vec::new();
        for term in ngram {
            let term = term.as_ref();
            if let Some(id) = self.terms.get_id(term) {
                ids.push(id);
                continue;
            }
            if term == SENTINEL_TERM || self.terms.is_frozen() {
                return Ok(None);
            }
            let offset = match fresh.iter().position(|&t| t == term) {
                Some(offset) => offset,
                None => {
                    fresh.push(term);
                    fresh.len() - 1
                }
            };
            ids.push(self.terms.next_id(offset)?);
        }
        Ok(Some(ids))
    }

    fn check_key_capacity(&self, keys: &[(usize, NgramKey)]) -> Result<()> {
        for order in 2..=self.max_order {
            let pending = keys.iter().filter(|(width, _)| *width == order).count();
            if pending == 0 {
                continue;
            }
            let size = self.higher[order - 2].len();
            if NgramId::try_from(size + pending - 1).is_err() {
                warn!(order, size, "n-gram id space exhausted");
                return Err(Error::IdSpaceExhausted { order, size });
            }
        }
        Ok(())
    }

    /// Id of `packed`, added unless frozen. Capacity is checked by the caller.
    fn insert_key(&mut self, order: usize, packed: NgramKey) -> Option<NgramId> {
        let frozen = self.terms.is_frozen();
        let keys = &mut self.higher[order - 2];
        if let Some(idx) = keys.get_index_of(&packed) {
            return Some(idx as NgramId);
        }
        if frozen {
            return None;
        }
        let (idx, _) = keys.insert_full(packed);
        Some(idx as NgramId)
    }

    /// Current size of every order, to [`rollback`](Self::rollback) to.
    pub(crate) fn checkpoint(&self) -> Vec<usize> {
        (1..=self.max_order).map(|order| self.size(order)).collect()
    }

    /// Drop every term and n-gram added after `checkpoint` was taken.
    pub(crate) fn rollback(&mut self, checkpoint: &[usize]) {
        for (slot, &size) in checkpoint.iter().enumerate() {
            match slot {
                0 => self.terms.truncate(size),
                _ => self.higher[slot - 1].truncate(size.max(1)),
            }
        }
    }

    /// Lookup only. Unsupported orders and unknown terms give `None`.
    pub fn get_index<S: AsRef<str>>(&self, ngram: &[S]) -> Option<NgramId> {
        let order = ngram.len();
        if order == 0 || order > self.max_order {
            debug!(order, max_order = self.max_order, "lookup with unsupported n-gram order");
            return None;
        }
        let ids = ngram
            .iter()
            .map(|term| self.terms.get_id(term.as_ref()))
            .collect::<Option<Vec<_>>>()?;
        self.get_index_by_ids(&ids)
    }

    /// Lookup by term ids.
    pub fn get_index_by_ids(&self, ids: &[TermId]) -> Option<NgramId> {
        match ids.len() {
            0 => None,
            1 => {
                let id = ids[0];
                (id != SENTINEL_ID && (id as usize) < self.terms.size()).then_some(id)
            }
            order if order <= self.max_order => {
                let packed = key::encode(order, ids).ok()?;
                match self.higher[order - 2].get_index_of(&packed) {
                    Some(0) | None => None,
                    Some(idx) => Some(idx as NgramId),
                }
            }
            _ => None,
        }
    }

    /// Packed key of an existing n-gram.
    pub fn key_of(&self, order: usize, id: NgramId) -> Option<NgramKey> {
        if id == SENTINEL_ID || id as usize >= self.size(order) {
            return None;
        }
        if order == 1 {
            return key::encode(1, &[id]).ok();
        }
        self.higher[order - 2].get_index(id as usize).copied()
    }

    /// Term ids of an existing n-gram.
    pub fn term_ids(&self, order: usize, id: NgramId) -> Option<Vec<TermId>> {
        let packed = self.key_of(order, id)?;
        key::decode(packed).ok().map(|(_, ids)| ids)
    }

    /// Surface terms of an existing n-gram.
    ///
    /// # Arguments
    /// * `order` - n-gram order
    /// * `id` - id within that order
    pub fn get_ngram(&self, order: usize, id: NgramId) -> Option<Vec<&str>> {
        self.term_ids(order, id)?
            .into_iter()
            .map(|term| self.terms.get_word(term))
            .collect()
    }

    /// Terms joined with `_`, used as column names.
    pub fn label(&self, order: usize, id: NgramId) -> Option<String> {
        self.get_ngram(order, id)
            .map(|terms| terms.join(NGRAM_LABEL_SEPARATOR))
    }

    /// Number of id slots of `order`, reserved slot included.
    /// 0 for orders the dictionary does not hold.
    pub fn size(&self, order: usize) -> usize {
        match order {
            1 => self.terms.size(),
            o if o >= 2 && o <= self.max_order => self.higher[o - 2].len(),
            _ => 0,
        }
    }

    /// Number of real n-grams of `order`.
    #[inline]
    pub fn ngram_count(&self, order: usize) -> usize {
        self.size(order).saturating_sub(1)
    }

    /// Real ids of `order`, ascending.
    pub fn ids(&self, order: usize) -> impl Iterator<Item = NgramId> {
        1..self.size(order).max(1) as NgramId
    }

    /// Stop handing out new ids for every order. Cannot be undone.
    pub fn freeze(&mut self) {
        self.terms.freeze();
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.terms.is_frozen()
    }
}

use ahash::RandomState;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Dense id of a structured feature, starting at 0.
pub type FeatureId = u32;

/// Names and weights of structured (non n-gram) document features.
///
/// Every feature starts with weight 1.0.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeatureDictionary {
    names: IndexSet<String, RandomState>,
    weights: Vec<f64>,
    frozen: bool,
}

impl Default for FeatureDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureDictionary {
    pub fn new() -> Self {
        Self {
            names: IndexSet::with_hasher(RandomState::new()),
            weights: Vec::new(),
            frozen: false,
        }
    }

    /// Id of `name`, registering it unless frozen.
    pub fn get_or_add(&mut self, name: &str) -> Option<FeatureId> {
        if let Some(id) = self.get_id(name) {
            return Some(id);
        }
        if self.frozen {
            return None;
        }
        let id = FeatureId::try_from(self.names.len()).ok()?;
        self.names.insert(name.to_owned());
        self.weights.push(1.0);
        Some(id)
    }

    #[inline]
    pub fn get_id(&self, name: &str) -> Option<FeatureId> {
        self.names.get_index_of(name).map(|idx| idx as FeatureId)
    }

    #[inline]
    pub fn get_name(&self, id: FeatureId) -> Option<&str> {
        self.names.get_index(id as usize).map(String::as_str)
    }

    /// Weight of `id`, 1.0 for unknown ids.
    #[inline]
    pub fn weight(&self, id: FeatureId) -> f64 {
        self.weights.get(id as usize).copied().unwrap_or(1.0)
    }

    /// Returns `false` when `id` is unknown.
    pub fn set_weight(&mut self, id: FeatureId, weight: f64) -> bool {
        match self.weights.get_mut(id as usize) {
            Some(w) => {
                *w = weight;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx as FeatureId, name.as_str()))
    }
}

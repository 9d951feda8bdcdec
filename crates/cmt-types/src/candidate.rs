//! Eligible compute candidates
//!
//! A [`CandidateList`] is the unit of state the recommendation view publishes
//! and every downstream view consumes. Lists are built whole and replaced
//! whole; nothing mutates one in place.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Normalize an externally supplied hourly price.
///
/// Missing, zero, negative and non-finite prices all collapse to `None`.
#[inline]
#[must_use]
pub fn normalize_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(normalize_price(raw))
}

/// One eligible sizing option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibleCandidate {
    /// Instance type identifier, unique within a list
    pub instance_type: String,
    /// Virtual CPU count
    #[serde(rename = "vCPU")]
    pub vcpu: u32,
    /// Memory in GiB
    #[serde(rename = "memory_GB")]
    pub memory_gb: f64,
    /// Hourly price, absent when unknown or non-positive
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price_per_hour: Option<f64>,
}

impl EligibleCandidate {
    /// Create an unpriced candidate
    #[inline]
    #[must_use]
    pub fn new(instance_type: impl Into<String>, vcpu: u32, memory_gb: f64) -> Self {
        Self {
            instance_type: instance_type.into(),
            vcpu,
            memory_gb,
            price_per_hour: None,
        }
    }

    /// Attach a price, normalizing non-positive values to absent
    #[inline]
    #[must_use]
    pub fn with_price(mut self, price: Option<f64>) -> Self {
        self.price_per_hour = normalize_price(price);
        self
    }

    /// Whether a usable price is attached
    #[inline]
    #[must_use]
    pub fn is_priced(&self) -> bool {
        self.price_per_hour.is_some()
    }

    /// Whether the resource figures are usable (positive vCPU and memory)
    #[inline]
    #[must_use]
    pub fn has_valid_shape(&self) -> bool {
        self.vcpu > 0 && self.memory_gb.is_finite() && self.memory_gb > 0.0
    }
}

/// Ordered candidates, unique by instance type
///
/// Construction keeps the first occurrence of each instance type, so a list
/// restored from a hand-edited snapshot still upholds uniqueness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<EligibleCandidate>", into = "Vec<EligibleCandidate>")]
pub struct CandidateList {
    entries: Vec<EligibleCandidate>,
}

impl CandidateList {
    /// Build a list, dropping later duplicates of an instance type
    #[must_use]
    pub fn new(candidates: Vec<EligibleCandidate>) -> Self {
        let mut seen = HashSet::with_capacity(candidates.len());
        let entries = candidates
            .into_iter()
            .filter(|c| seen.insert(c.instance_type.clone()))
            .collect();
        Self { entries }
    }

    /// Empty list
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First (best ranked) entry
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&EligibleCandidate> {
        self.entries.first()
    }

    /// Look up an entry by instance type
    #[must_use]
    pub fn get(&self, instance_type: &str) -> Option<&EligibleCandidate> {
        self.entries.iter().find(|c| c.instance_type == instance_type)
    }

    /// Whether an instance type is present
    #[inline]
    #[must_use]
    pub fn contains(&self, instance_type: &str) -> bool {
        self.get(instance_type).is_some()
    }

    /// Entries in order
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[EligibleCandidate] {
        &self.entries
    }

    /// At most `limit` leading entries
    #[inline]
    #[must_use]
    pub fn head(&self, limit: usize) -> &[EligibleCandidate] {
        &self.entries[..self.entries.len().min(limit)]
    }

    /// Instance type identifiers in order
    #[must_use]
    pub fn instance_types(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.instance_type.clone()).collect()
    }

    /// Number of entries carrying a price
    #[must_use]
    pub fn priced_count(&self) -> usize {
        self.entries.iter().filter(|c| c.is_priced()).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EligibleCandidate> {
        self.entries.iter()
    }

    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<EligibleCandidate> {
        self.entries
    }
}

impl From<Vec<EligibleCandidate>> for CandidateList {
    fn from(candidates: Vec<EligibleCandidate>) -> Self {
        Self::new(candidates)
    }
}

impl From<CandidateList> for Vec<EligibleCandidate> {
    fn from(list: CandidateList) -> Self {
        list.entries
    }
}

impl FromIterator<EligibleCandidate> for CandidateList {
    fn from_iter<I: IntoIterator<Item = EligibleCandidate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a EligibleCandidate;
    type IntoIter = std::slice::Iter<'a, EligibleCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

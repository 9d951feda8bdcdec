//! Candidate ranking
//!
//! Order: priced before unpriced, then ascending price, then ascending vCPU,
//! then ascending memory.

use cmt_types::EligibleCandidate;
use std::cmp::Ordering;

/// Ranking comparator
#[must_use]
pub fn rank_cmp(a: &EligibleCandidate, b: &EligibleCandidate) -> Ordering {
    let by_price = match (a.price_per_hour, b.price_per_hour) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_price
        .then_with(|| a.vcpu.cmp(&b.vcpu))
        .then_with(|| a.memory_gb.total_cmp(&b.memory_gb))
}

/// Sort candidates into ranking order
#[must_use]
pub fn rank_candidates(mut candidates: Vec<EligibleCandidate>) -> Vec<EligibleCandidate> {
    candidates.sort_by(rank_cmp);
    candidates
}

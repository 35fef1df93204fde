//! Merges candidate lists from both strategies and both universes.

use std::cmp::Ordering;
use std::collections::HashMap;

use market_data::models::instrument::Universe;

use crate::candidate::{Candidate, CandidateCategory};

/// Merges candidate lists into one ranked list.
///
/// Order: category priority (wave phase, MA crossover, volume surge,
/// up-trend), then score descending, then code ascending. An instrument
/// appears at most once per category; the highest-scoring entry is kept.
pub fn aggregate<I>(lists: I) -> Vec<Candidate>
where
    I: IntoIterator<Item = Vec<Candidate>>,
{
    let mut best: HashMap<(CandidateCategory, Universe, String), Candidate> = HashMap::new();
    for candidate in lists.into_iter().flatten() {
        let key = (
            candidate.category,
            candidate.instrument.universe,
            candidate.instrument.code.clone(),
        );
        match best.get(&key) {
            Some(existing) if existing.score >= candidate.score => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    }

    let mut out: Vec<Candidate> = best.into_values().collect();
    out.sort_by(compare);
    out
}

fn compare(a: &Candidate, b: &Candidate) -> Ordering {
    a.category
        .cmp(&b.category)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.instrument.code.cmp(&b.instrument.code))
        .then_with(|| a.instrument.universe.cmp(&b.instrument.universe))
}

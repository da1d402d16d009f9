//! Header vocabulary derivation.
//!
//! The vocabulary is the fixed, sorted set of lowercase header names the
//! whole feature space is built over. It is computed once from the training
//! corpus and then frozen inside the persisted artifact; the predict path
//! loads it and never recomputes it, otherwise vector width would drift
//! from the trained model.

use crate::response::ParsedResponse;
use std::collections::BTreeSet;

/// The canonical ordered header-name vocabulary.
pub type HeaderVocabulary = Vec<String>;

/// Headers excluded from the vocabulary by default.
///
/// `date` changes on every response and `server` names the HTTP server
/// rather than the framework; both drown out discriminative signal.
#[must_use]
pub fn default_excluded_headers() -> BTreeSet<String> {
    ["date", "server"].iter().map(ToString::to_string).collect()
}

/// Builds the vocabulary from a training corpus.
///
/// Collects the union of lowercase header names across all responses,
/// drops the excluded names, and sorts lexicographically so the feature
/// layout is reproducible run to run.
#[must_use]
pub fn build_vocabulary(
    corpus: &[ParsedResponse],
    excluded: &BTreeSet<String>,
) -> HeaderVocabulary {
    let names: BTreeSet<&str> = corpus
        .iter()
        .flat_map(|r| r.headers.iter())
        .map(|h| h.name.as_str())
        .filter(|name| !excluded.contains(*name))
        .collect();
    names.into_iter().map(ToString::to_string).collect()
}

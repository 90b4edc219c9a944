//! Ordering candidates by how well their target attributes match the caller's
//! preferences.

use std::collections::HashMap;

use crate::candidate::Candidate;
use crate::model::OtherHasher;

/// A match on this attribute is mandatory.
pub const REQUIRED: i32 = 9999;
/// A match on this attribute disqualifies the candidate.
pub const FORBIDDEN: i32 = -9999;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preference {
    pub value: String,
    pub priority: i32,
}

pub type Preferences = HashMap<String, Preference, OtherHasher>;

/// Score of one candidate; negative means it is out.
pub fn score(candidate: &Candidate, schema: &[String], desired: &Preferences) -> i32 {
    let mut score = 0;
    for (index, attribute) in schema.iter().enumerate() {
        let Some(preference) = desired.get(attribute) else {
            continue;
        };
        if preference.value.is_empty() {
            continue;
        }
        let actual = candidate.attributes.get(index).map(String::as_str).unwrap_or_default();
        if actual == preference.value {
            if preference.priority == FORBIDDEN {
                return -1;
            }
            score += 1;
        } else if preference.priority == REQUIRED {
            return -1;
        }
    }
    score
}

/// Drops disqualified candidates and sorts the rest best first. Candidates with
/// equal scores keep their order of preference.
pub fn rank(candidates: Vec<Candidate>, schema: &[String], desired: &Preferences) -> Vec<Candidate> {
    let mut scored: Vec<(i32, Candidate)> = candidates
        .into_iter()
        .map(|c| (score(&c, schema, desired), c))
        .filter(|(s, _)| *s >= 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, c)| c).collect()
}

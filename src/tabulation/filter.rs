use std::collections::BTreeSet;

use crate::model::{
    api::{Filter, NormalizedFilter},
    common::BallotStyleId,
    election::Election,
};

/// Resolve the filter's districts into ballot styles.
///
/// The ballot styles of the requested districts are intersected with any
/// ballot styles the filter already names. An empty result is kept as an
/// explicit empty set, which matches nothing.
pub fn normalize(filter: Filter, election: &Election) -> NormalizedFilter {
    let Filter {
        ballot_style_ids,
        precinct_ids,
        batch_ids,
        scanner_ids,
        voting_methods,
        adjudication_flags,
        district_ids,
    } = filter;

    let ballot_style_ids = match district_ids {
        None => ballot_style_ids,
        Some(district_ids) => {
            let in_districts: BTreeSet<BallotStyleId> = election
                .ballot_styles
                .iter()
                .filter(|style| style.districts.iter().any(|d| district_ids.contains(d)))
                .map(|style| style.id.clone())
                .collect();
            Some(match ballot_style_ids {
                Some(existing) => existing.intersection(&in_districts).cloned().collect(),
                None => in_districts,
            })
        }
    };

    NormalizedFilter {
        ballot_style_ids,
        precinct_ids,
        batch_ids,
        scanner_ids,
        voting_methods,
        adjudication_flags,
    }
}

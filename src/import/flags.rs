use crate::model::{
    common::{AdjudicationFlags, Votes},
    election::{Contest, Election},
};

/// Compute the adjudication flags of a record with the given canonical votes.
///
/// Contests unknown to the election are ignored; records are validated
/// before this is called.
pub fn adjudication_flags(votes: &Votes, election: &Election) -> AdjudicationFlags {
    let mut flags = AdjudicationFlags {
        is_blank: votes.values().all(Vec::is_empty),
        ..AdjudicationFlags::default()
    };
    for (contest_id, selections) in votes {
        let Some(contest) = election.contest(contest_id) else {
            continue;
        };
        let seats = contest.seats() as usize;
        flags.has_overvote |= selections.len() > seats;
        flags.has_undervote |= selections.len() < seats;
        flags.has_write_in |= selections
            .iter()
            .any(|option_id| Contest::is_write_in_option(option_id));
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{common::canonical_votes, election::ElectionDefinition};

    fn votes(entries: &[(&str, &[&str])]) -> Votes {
        canonical_votes(entries.iter().map(|(contest, options)| {
            (
                contest.to_string(),
                options.iter().map(|o| o.to_string()).collect(),
            )
        }))
    }

    #[test]
    fn blank_record() {
        let election = ElectionDefinition::example().election;
        let flags = adjudication_flags(&votes(&[("mayor", &[]), ("measure-1", &[])]), &election);
        assert!(flags.is_blank);
        assert!(flags.has_undervote);
        assert!(!flags.has_overvote);
        assert!(!flags.has_write_in);
    }

    #[test]
    fn overvote_and_write_in() {
        let election = ElectionDefinition::example().election;
        let flags = adjudication_flags(
            &votes(&[("mayor", &["alice", "bob"]), ("council", &["write-in-1", "dave"])]),
            &election,
        );
        assert!(!flags.is_blank);
        assert!(flags.has_overvote);
        assert!(!flags.has_undervote);
        assert!(flags.has_write_in);
    }

    #[test]
    fn partial_council_is_undervote() {
        let election = ElectionDefinition::example().election;
        let flags = adjudication_flags(&votes(&[("council", &["carol"])]), &election);
        assert!(flags.has_undervote);
        assert!(!flags.has_overvote);
    }

    #[test]
    fn repeated_selection_is_not_an_overvote() {
        let election = ElectionDefinition::example().election;
        let flags = adjudication_flags(&votes(&[("mayor", &["alice", "alice"])]), &election);
        assert!(!flags.has_overvote);
        assert!(!flags.has_undervote);
    }
}

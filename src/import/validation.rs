//! Checks a record against the election definition before it is stored.

use crate::model::{
    cvr::{ParsedRecord, ReportMetadata},
    election::ElectionDefinition,
};

use super::error::ValidationError;

/// Hand-marked ballots have at most this many sheets.
pub const MAX_SHEETS_PER_BALLOT: u32 = 20;

/// Validate one record. Checks run in a fixed order and the first failure
/// is returned:
///
/// 1. the record's election hash matches the definition, unless
///    `skip_election_hash_check` is set;
/// 2. the precinct exists;
/// 3. the ballot style exists;
/// 4. every voted contest is on the ballot style;
/// 5. the batch is declared by the export;
/// 6. hand-marked sheet numbers are between one and
///    [`MAX_SHEETS_PER_BALLOT`];
/// 7. every selection is an option of its contest;
/// 8. every located write-in is on a page the record has an image for.
pub fn validate(
    record: &ParsedRecord,
    definition: &ElectionDefinition,
    report: &ReportMetadata,
    skip_election_hash_check: bool,
) -> Result<(), ValidationError> {
    let election = &definition.election;

    if !skip_election_hash_check && record.election_hash != definition.election_hash {
        return Err(ValidationError::ElectionMismatch {
            expected: definition.election_hash.clone(),
            found: record.election_hash.clone(),
        });
    }

    if election.precinct(&record.precinct_id).is_none() {
        return Err(ValidationError::UnknownPrecinct(record.precinct_id.clone()));
    }

    let ballot_style = election
        .ballot_style(&record.ballot_style_id)
        .ok_or_else(|| ValidationError::UnknownBallotStyle(record.ballot_style_id.clone()))?;

    let applicable: Vec<_> = election.contests_for_ballot_style(ballot_style).collect();
    for contest_id in record.votes.keys() {
        if !applicable.iter().any(|contest| &contest.id == contest_id) {
            return Err(ValidationError::ContestNotOnBallotStyle {
                contest_id: contest_id.clone(),
                ballot_style_id: ballot_style.id.clone(),
            });
        }
    }

    if !report.has_batch(&record.batch_id) {
        return Err(ValidationError::UnknownBatch(record.batch_id.clone()));
    }

    if let Some(sheet_number) = record.sheet_number {
        if !(1..=MAX_SHEETS_PER_BALLOT).contains(&sheet_number) {
            return Err(ValidationError::InvalidSheetNumber(sheet_number));
        }
    }

    for (contest_id, selections) in &record.votes {
        // Presence was checked above.
        let Some(contest) = applicable.iter().find(|contest| &contest.id == contest_id) else {
            continue;
        };
        if let Some(option_id) = selections
            .iter()
            .find(|option_id| !contest.is_valid_option(option_id))
        {
            return Err(ValidationError::InvalidContestOption {
                contest_id: contest_id.clone(),
                option_id: option_id.clone(),
            });
        }
    }

    for mark in &record.write_ins {
        if let Some(side) = mark.side {
            if record.image(side).is_none() {
                return Err(ValidationError::InvalidWriteInImageLocation {
                    contest_id: mark.contest_id.clone(),
                    side,
                });
            }
        }
    }

    Ok(())
}

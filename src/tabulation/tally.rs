//! Pure tabulation over already loaded records.

use std::collections::{BTreeMap, HashMap};

use crate::model::{
    api::{AggregateResult, CardCounts, ContestResult, GroupBy, GroupResult, NormalizedFilter, GROUP_KEY_ROOT},
    common::{Card, OptionId, VotingMethod, WriteInAdjudication},
    db::{CastVoteRecord, ManualResultsRecord, ScannerBatch, WriteIn},
    election::{Contest, Election},
    mongodb::Id,
};

/// Tally the records matching the filter into one result per group, then add
/// the matching manual results.
///
/// Write-ins adjudicated for an official candidate count for that candidate.
/// Those adjudicated invalid do not count and leave an undervote instead.
///
/// Manual results have no batch, scanner or adjudication flags, so they are
/// left out entirely when the filter or grouping uses any of those.
pub fn tabulate(
    election: &Election,
    records: &[CastVoteRecord],
    batches: &[ScannerBatch],
    write_ins: &[WriteIn],
    manual_results: &[ManualResultsRecord],
    filter: &NormalizedFilter,
    group_by: &GroupBy,
) -> AggregateResult {
    let batch_scanners: HashMap<&str, &str> = batches
        .iter()
        .map(|batch| (batch.batch_id.as_str(), batch.scanner_id.as_str()))
        .collect();
    let mut adjudications: HashMap<(Id, &str, &str), &WriteInAdjudication> = HashMap::new();
    for write_in in write_ins {
        if let Some(adjudication) = &write_in.adjudication {
            adjudications.insert(
                (
                    write_in.cast_vote_record_id,
                    write_in.contest_id.as_str(),
                    write_in.option_id.as_str(),
                ),
                adjudication,
            );
        }
    }

    let mut results = AggregateResult::new();
    for record in records {
        let scanner_id = batch_scanners
            .get(record.batch_id.as_str())
            .copied()
            .unwrap_or(record.scanner_id.as_str());
        if !matches(record, scanner_id, filter) {
            continue;
        }

        let dimensions = Dimensions::of_record(record, scanner_id);
        let group = results
            .entry(group_key(&dimensions, group_by))
            .or_insert_with(|| new_group(election, &dimensions, group_by));

        match record.card {
            Card::Bmd => group.card_counts.bmd += 1,
            Card::Hmpb { sheet_number } => {
                let index = sheet_number.saturating_sub(1) as usize;
                if group.card_counts.hmpb.len() <= index {
                    group.card_counts.hmpb.resize(index + 1, 0);
                }
                group.card_counts.hmpb[index] += 1;
            }
        }

        for (contest_id, selections) in &record.votes {
            let Some(contest) = election.contest(contest_id) else {
                continue;
            };
            let selections: Vec<OptionId> = selections
                .iter()
                .filter_map(|option_id| {
                    if !Contest::is_write_in_option(option_id) {
                        return Some(option_id.clone());
                    }
                    match adjudications.get(&(record.id, contest_id.as_str(), option_id.as_str())) {
                        Some(WriteInAdjudication::OfficialCandidate { candidate_id }) => {
                            Some(candidate_id.clone())
                        }
                        Some(WriteInAdjudication::Invalid) => None,
                        Some(WriteInAdjudication::WriteInCandidate { .. }) | None => {
                            Some(option_id.clone())
                        }
                    }
                })
                .collect();

            let result = group
                .contest_results
                .entry(contest_id.clone())
                .or_insert_with(|| empty_contest_result(contest));
            tally_contest(result, contest.seats() as u64, &selections);
        }
    }

    if includes_manual_results(filter, group_by) {
        for manual in manual_results
            .iter()
            .filter(|manual| manual_matches(manual, filter))
        {
            add_manual_results(&mut results, election, manual, group_by);
        }
    }
    results
}

fn includes_manual_results(filter: &NormalizedFilter, group_by: &GroupBy) -> bool {
    filter.batch_ids.is_none()
        && filter.scanner_ids.is_none()
        && filter.adjudication_flags.is_none()
        && !group_by.group_by_batch
        && !group_by.group_by_scanner
}

fn manual_matches(manual: &ManualResultsRecord, filter: &NormalizedFilter) -> bool {
    filter
        .ballot_style_ids
        .as_ref()
        .map_or(true, |ids| ids.contains(&manual.ballot_style_id))
        && filter
            .precinct_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&manual.precinct_id))
        && filter
            .voting_methods
            .as_ref()
            .map_or(true, |methods| methods.contains(&manual.voting_method))
}

fn add_manual_results(
    results: &mut AggregateResult,
    election: &Election,
    manual: &ManualResultsRecord,
    group_by: &GroupBy,
) {
    let dimensions = Dimensions {
        ballot_style_id: &manual.ballot_style_id,
        batch_id: None,
        precinct_id: &manual.precinct_id,
        scanner_id: None,
        voting_method: manual.voting_method,
    };
    let group = results
        .entry(group_key(&dimensions, group_by))
        .or_insert_with(|| new_group(election, &dimensions, group_by));
    group.card_counts.manual += manual.ballot_count;

    for (contest_id, counted) in &manual.contest_results {
        let Some(contest) = election.contest(contest_id) else {
            continue;
        };
        let result = group
            .contest_results
            .entry(contest_id.clone())
            .or_insert_with(|| empty_contest_result(contest));
        result.ballots += counted.ballots;
        result.overvotes += counted.overvotes;
        result.undervotes += counted.undervotes;
        for (option_id, count) in &counted.tallies {
            *result.tallies.entry(option_id.clone()).or_insert(0) += count;
        }
    }
}

fn tally_contest(result: &mut ContestResult, seats: u64, selections: &[OptionId]) {
    result.ballots += 1;
    let count = selections.len() as u64;
    if count > seats {
        result.overvotes += seats;
        return;
    }
    result.undervotes += seats - count;
    for option_id in selections {
        *result.tallies.entry(option_id.clone()).or_insert(0) += 1;
    }
}

fn matches(record: &CastVoteRecord, scanner_id: &str, filter: &NormalizedFilter) -> bool {
    filter
        .ballot_style_ids
        .as_ref()
        .map_or(true, |ids| ids.contains(&record.ballot_style_id))
        && filter
            .precinct_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&record.precinct_id))
        && filter
            .batch_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&record.batch_id))
        && filter
            .scanner_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(scanner_id))
        && filter
            .voting_methods
            .as_ref()
            .map_or(true, |methods| methods.contains(&record.voting_method))
        && filter
            .adjudication_flags
            .as_ref()
            .map_or(true, |flags| flags.iter().any(|flag| record.flags.has(*flag)))
}

/// Where a tallied ballot falls along each groupable dimension. Hand-counted
/// ballots have no batch or scanner.
struct Dimensions<'a> {
    ballot_style_id: &'a str,
    batch_id: Option<&'a str>,
    precinct_id: &'a str,
    scanner_id: Option<&'a str>,
    voting_method: VotingMethod,
}

impl<'a> Dimensions<'a> {
    fn of_record(record: &'a CastVoteRecord, scanner_id: &'a str) -> Self {
        Self {
            ballot_style_id: &record.ballot_style_id,
            batch_id: Some(record.batch_id.as_str()),
            precinct_id: &record.precinct_id,
            scanner_id: Some(scanner_id),
            voting_method: record.voting_method,
        }
    }
}

/// Group key such as `root&ballotStyleId=1&votingMethod=precinct`, with the
/// grouped dimensions in alphabetical order.
fn group_key(dimensions: &Dimensions, group_by: &GroupBy) -> String {
    let values = [
        (group_by.group_by_ballot_style, "ballotStyleId", Some(dimensions.ballot_style_id)),
        (group_by.group_by_batch, "batchId", dimensions.batch_id),
        (group_by.group_by_precinct, "precinctId", Some(dimensions.precinct_id)),
        (group_by.group_by_scanner, "scannerId", dimensions.scanner_id),
        (
            group_by.group_by_voting_method,
            "votingMethod",
            Some(dimensions.voting_method.as_str()),
        ),
    ];
    let mut key = GROUP_KEY_ROOT.to_string();
    for (enabled, name, value) in values {
        let (true, Some(value)) = (enabled, value) else {
            continue;
        };
        key.push('&');
        key.push_str(name);
        key.push('=');
        key.push_str(&escape_key_value(value));
    }
    key
}

fn escape_key_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '&' | '=') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn new_group(
    election: &Election,
    dimensions: &Dimensions,
    group_by: &GroupBy,
) -> GroupResult {
    GroupResult {
        ballot_style_id: group_by
            .group_by_ballot_style
            .then(|| dimensions.ballot_style_id.to_string()),
        batch_id: dimensions
            .batch_id
            .filter(|_| group_by.group_by_batch)
            .map(str::to_string),
        precinct_id: group_by
            .group_by_precinct
            .then(|| dimensions.precinct_id.to_string()),
        scanner_id: dimensions
            .scanner_id
            .filter(|_| group_by.group_by_scanner)
            .map(str::to_string),
        voting_method: group_by
            .group_by_voting_method
            .then_some(dimensions.voting_method),
        card_counts: CardCounts::default(),
        contest_results: election
            .contests
            .iter()
            .map(|contest| (contest.id.clone(), empty_contest_result(contest)))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn empty_contest_result(contest: &Contest) -> ContestResult {
    ContestResult {
        tallies: contest
            .valid_options()
            .into_iter()
            .map(|option_id| (option_id, 0))
            .collect(),
        ..ContestResult::default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    use crate::model::{
        common::{AdjudicationFlag, AdjudicationFlags, Side, VotingMethod},
        db::{CastVoteRecordCore, ManualResultsCore, ScannerBatchCore, WriteInCore},
        election::ElectionDefinition,
    };

    fn record(ballot_id: &str, votes: &[(&str, &[&str])]) -> CastVoteRecord {
        let mut core = CastVoteRecordCore::example(Id::new(), ballot_id);
        core.votes = votes
            .iter()
            .map(|(contest, options)| {
                (
                    contest.to_string(),
                    options.iter().map(|o| o.to_string()).collect(),
                )
            })
            .collect();
        CastVoteRecord {
            id: Id::new(),
            record: core,
        }
    }

    fn root(results: &AggregateResult) -> &GroupResult {
        &results[GROUP_KEY_ROOT]
    }

    #[test]
    fn counts_overvotes_and_undervotes() {
        let election = ElectionDefinition::example().election;
        let records = vec![
            record("1", &[("mayor", &["alice"]), ("measure-1", &["yes"])]),
            record("2", &[("mayor", &["alice", "bob"]), ("measure-1", &["yes", "no"])]),
            record("3", &[("mayor", &[]), ("measure-1", &[])]),
        ];
        let results = tabulate(
            &election,
            &records,
            &[],
            &[],
            &[],
            &NormalizedFilter::default(),
            &GroupBy::default(),
        );
        assert_eq!(results.len(), 1);
        let group = root(&results);
        assert_eq!(group.card_counts.bmd, 3);

        let mayor = &group.contest_results["mayor"];
        assert_eq!(mayor.ballots, 3);
        assert_eq!(mayor.overvotes, 1);
        assert_eq!(mayor.undervotes, 1);
        assert_eq!(mayor.tallies["alice"], 1);
        assert_eq!(mayor.tallies["bob"], 0);

        let measure = &group.contest_results["measure-1"];
        assert_eq!(measure.overvotes, 1);
        assert_eq!(measure.undervotes, 1);
        assert_eq!(measure.tallies["yes"], 1);
        assert_eq!(measure.tallies["no"], 0);

        // Not on any of these cards.
        assert_eq!(group.contest_results["council"].ballots, 0);
    }

    #[test]
    fn multi_seat_undervotes_count_empty_seats() {
        let election = ElectionDefinition::example().election;
        let records = vec![
            record("1", &[("council", &["carol"])]),
            record("2", &[("council", &["carol", "dave", "erin"])]),
        ];
        let results = tabulate(
            &election,
            &records,
            &[],
            &[],
            &[],
            &NormalizedFilter::default(),
            &GroupBy::default(),
        );
        let council = &root(&results).contest_results["council"];
        assert_eq!(council.undervotes, 1);
        assert_eq!(council.overvotes, 2);
        assert_eq!(council.tallies["carol"], 1);
    }

    #[test]
    fn adjudicated_write_ins() {
        let election = ElectionDefinition::example().election;
        let official = record("1", &[("mayor", &["write-in-0"])]);
        let invalid = record("2", &[("mayor", &["write-in-0"])]);
        let pending = record("3", &[("mayor", &["write-in-0"])]);
        let write_in = |record: &CastVoteRecord, adjudication| WriteIn {
            id: Id::new(),
            write_in: WriteInCore {
                adjudication,
                ..WriteInCore::new(
                    record.election_id,
                    record.id,
                    "mayor".to_string(),
                    "write-in-0".to_string(),
                    Side::Front,
                    false,
                )
            },
        };
        let write_ins = vec![
            write_in(
                &official,
                Some(WriteInAdjudication::OfficialCandidate {
                    candidate_id: "bob".to_string(),
                }),
            ),
            write_in(&invalid, Some(WriteInAdjudication::Invalid)),
            write_in(&pending, None),
        ];
        let results = tabulate(
            &election,
            &[official, invalid, pending],
            &[],
            &write_ins,
            &[],
            &NormalizedFilter::default(),
            &GroupBy::default(),
        );
        let mayor = &root(&results).contest_results["mayor"];
        assert_eq!(mayor.tallies["bob"], 1);
        assert_eq!(mayor.tallies["write-in-0"], 1);
        assert_eq!(mayor.undervotes, 1);
        assert_eq!(mayor.ballots, 3);
    }

    #[test]
    fn groups_by_dimensions() {
        let election = ElectionDefinition::example().election;
        let mut a = record("1", &[("mayor", &["alice"])]);
        a.voting_method = VotingMethod::Absentee;
        a.card = Card::Hmpb { sheet_number: 2 };
        let b = record("2", &[("mayor", &["bob"])]);
        let c = record("3", &[("mayor", &["bob"])]);
        let group_by = GroupBy {
            group_by_voting_method: true,
            group_by_ballot_style: true,
            ..GroupBy::default()
        };
        let results = tabulate(
            &election,
            &[a, b, c],
            &[],
            &[],
            &[],
            &NormalizedFilter::default(),
            &group_by,
        );
        let keys: Vec<_> = results.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "root&ballotStyleId=1&votingMethod=absentee",
                "root&ballotStyleId=1&votingMethod=precinct",
            ]
        );
        let absentee = &results["root&ballotStyleId=1&votingMethod=absentee"];
        assert_eq!(absentee.card_counts.hmpb, vec![0, 1]);
        assert_eq!(absentee.voting_method, Some(VotingMethod::Absentee));
        assert_eq!(absentee.ballot_style_id.as_deref(), Some("1"));
        assert!(absentee.precinct_id.is_none());
        let precinct = &results["root&ballotStyleId=1&votingMethod=precinct"];
        assert_eq!(precinct.contest_results["mayor"].tallies["bob"], 2);
    }

    #[test]
    fn group_key_values_are_escaped() {
        let mut a = record("1", &[]);
        a.batch_id = "a&b=c\\d".to_string();
        let group_by = GroupBy {
            group_by_batch: true,
            ..GroupBy::default()
        };
        assert_eq!(
            group_key(&Dimensions::of_record(&a, "scanner-1"), &group_by),
            "root&batchId=a\\&b\\=c\\\\d"
        );
    }

    #[test]
    fn filters_restrict_records() {
        let election = ElectionDefinition::example().election;
        let mut flagged = record("1", &[("mayor", &[])]);
        flagged.flags = AdjudicationFlags {
            has_undervote: true,
            is_blank: true,
            ..AdjudicationFlags::default()
        };
        let mut other_batch = record("2", &[("mayor", &["alice"])]);
        other_batch.batch_id = "batch-2".to_string();
        let records = vec![flagged, other_batch, record("3", &[("mayor", &["bob"])])];
        // batch-2 was scanned by scanner-2 according to the export metadata.
        let batches = vec![ScannerBatch {
            id: Id::new(),
            batch: ScannerBatchCore {
                election_id: Id::new(),
                batch_id: "batch-2".to_string(),
                scanner_id: "scanner-2".to_string(),
                label: "Batch 2".to_string(),
            },
        }];

        let count = |filter: NormalizedFilter| {
            tabulate(&election, &records, &batches, &[], &[], &filter, &GroupBy::default())
                .get(GROUP_KEY_ROOT)
                .map_or(0, |group| group.card_counts.total())
        };

        assert_eq!(count(NormalizedFilter::default()), 3);
        assert_eq!(
            count(NormalizedFilter {
                scanner_ids: Some(BTreeSet::from(["scanner-2".to_string()])),
                ..NormalizedFilter::default()
            }),
            1
        );
        assert_eq!(
            count(NormalizedFilter {
                adjudication_flags: Some(BTreeSet::from([AdjudicationFlag::IsBlank])),
                ..NormalizedFilter::default()
            }),
            1
        );
        assert_eq!(
            count(NormalizedFilter {
                ballot_style_ids: Some(BTreeSet::new()),
                ..NormalizedFilter::default()
            }),
            0
        );
        assert_eq!(
            count(NormalizedFilter {
                voting_methods: Some(BTreeSet::from([VotingMethod::Absentee])),
                ..NormalizedFilter::default()
            }),
            0
        );
    }

    fn manual(voting_method: VotingMethod) -> ManualResultsRecord {
        let mut results = ManualResultsCore::example(Id::new());
        results.voting_method = voting_method;
        ManualResultsRecord {
            id: Id::new(),
            results,
        }
    }

    #[test]
    fn manual_results_join_scanned_results() {
        let election = ElectionDefinition::example().election;
        let records = vec![record("1", &[("mayor", &["alice"])])];
        let manual_results = vec![manual(VotingMethod::Absentee)];
        let tally = |filter: NormalizedFilter, group_by: GroupBy| {
            tabulate(&election, &records, &[], &[], &manual_results, &filter, &group_by)
        };

        let results = tally(NormalizedFilter::default(), GroupBy::default());
        let group = root(&results);
        assert_eq!(group.card_counts.bmd, 1);
        assert_eq!(group.card_counts.manual, 10);
        assert_eq!(group.card_counts.total(), 11);
        let mayor = &group.contest_results["mayor"];
        assert_eq!(mayor.ballots, 11);
        assert_eq!(mayor.tallies["alice"], 9);
        assert_eq!(mayor.overvotes, 1);
        assert_eq!(mayor.undervotes, 1);

        let by_method = tally(
            NormalizedFilter::default(),
            GroupBy {
                group_by_voting_method: true,
                ..GroupBy::default()
            },
        );
        let absentee = &by_method["root&votingMethod=absentee"];
        assert_eq!((absentee.card_counts.bmd, absentee.card_counts.manual), (0, 10));
        assert_eq!(absentee.contest_results["council"].ballots, 0);
        let precinct = &by_method["root&votingMethod=precinct"];
        assert_eq!((precinct.card_counts.bmd, precinct.card_counts.manual), (1, 0));

        let precinct_only = tally(
            NormalizedFilter {
                voting_methods: Some(BTreeSet::from([VotingMethod::Precinct])),
                ..NormalizedFilter::default()
            },
            GroupBy::default(),
        );
        assert_eq!(root(&precinct_only).card_counts.manual, 0);
    }

    #[test]
    fn manual_results_skipped_for_scanner_dimensions() {
        let election = ElectionDefinition::example().election;
        let manual_results = vec![manual(VotingMethod::Absentee)];
        let by_batch = GroupBy {
            group_by_batch: true,
            ..GroupBy::default()
        };
        let by_scanner = NormalizedFilter {
            scanner_ids: Some(BTreeSet::from(["scanner-1".to_string()])),
            ..NormalizedFilter::default()
        };
        let flagged = NormalizedFilter {
            adjudication_flags: Some(BTreeSet::from([AdjudicationFlag::HasOvervote])),
            ..NormalizedFilter::default()
        };

        for (filter, group_by) in [
            (NormalizedFilter::default(), by_batch),
            (by_scanner, GroupBy::default()),
            (flagged, GroupBy::default()),
        ] {
            let results = tabulate(&election, &[], &[], &[], &manual_results, &filter, &group_by);
            assert!(results.is_empty());
        }

        // Without scanned records the manual results form the only group.
        let results = tabulate(
            &election,
            &[],
            &[],
            &[],
            &manual_results,
            &NormalizedFilter::default(),
            &GroupBy::default(),
        );
        assert_eq!(root(&results).card_counts.total(), 10);
    }
}

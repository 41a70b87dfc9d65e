//! Aggregation over evaluation records: per-judge totals and the
//! cross-judge leaderboard.
//!
//! Divisor policy: a judge qualifies for a team's average when they are
//! non-admin AND have submitted. Teams with zero qualifying judges report
//! average 0. Every configured team appears in the leaderboard even with
//! no rows; unconfigured teams found in the sheet are appended in
//! first-seen order. Ties keep encounter order (stable sort).

use std::collections::{BTreeMap, HashMap};

use crate::model::{EvaluationRecord, LeaderboardRow, ScoreMap};
use crate::rubric;
use crate::users::UserDirectory;

/// Unweighted sum over the fixed criterion set. Keys outside the rubric
/// are ignored; missing criteria count 0.
pub fn record_total(scores: &ScoreMap) -> u32 {
    rubric::criteria()
        .map(|c| u32::from(scores.get(c).copied().unwrap_or(0)))
        .sum()
}

/// Per-team totals for one judge, keyed by trimmed team name.
pub fn totals_for<'a, I>(records: I, judge: &str) -> BTreeMap<String, u32>
where
    I: IntoIterator<Item = &'a EvaluationRecord>,
{
    let judge = judge.trim();
    records
        .into_iter()
        .filter(|r| r.judge.trim() == judge)
        .map(|r| (r.team.trim().to_string(), record_total(&r.scores)))
        .collect()
}

#[derive(Debug, Default)]
struct TeamAggregate {
    total_judges: usize,
    qualifying_sum: u32,
    qualifying_judges: usize,
}

/// Rank teams descending by average qualifying total.
pub fn leaderboard<'a, I>(
    records: I,
    teams: &[String],
    users: &UserDirectory,
) -> Vec<LeaderboardRow>
where
    I: IntoIterator<Item = &'a EvaluationRecord>,
{
    let mut order: Vec<String> = Vec::new();
    let mut aggregates: HashMap<String, TeamAggregate> = HashMap::new();
    for team in teams {
        let team = team.trim().to_string();
        if !aggregates.contains_key(&team) {
            order.push(team.clone());
            aggregates.insert(team, TeamAggregate::default());
        }
    }

    for record in records {
        let team = record.team.trim().to_string();
        let agg = aggregates.entry(team.clone()).or_insert_with(|| {
            order.push(team.clone());
            TeamAggregate::default()
        });
        agg.total_judges += 1;

        let qualifies = users
            .find_judge(&record.judge)
            .is_some_and(|u| !u.is_admin && u.has_submitted);
        if qualifies {
            agg.qualifying_sum += record_total(&record.scores);
            agg.qualifying_judges += 1;
        }
    }

    let mut rows: Vec<LeaderboardRow> = order
        .into_iter()
        .map(|team| {
            let agg = &aggregates[&team];
            let average = if agg.qualifying_judges > 0 {
                f64::from(agg.qualifying_sum) / agg.qualifying_judges as f64
            } else {
                0.0
            };
            LeaderboardRow {
                team,
                average,
                total_judge_count: agg.total_judges,
                submitted_judge_count: agg.qualifying_judges,
            }
        })
        .collect();

    // sort_by is stable, so equal averages keep encounter order.
    rows.sort_by(|a, b| b.average.total_cmp(&a.average));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet;
    use std::path::PathBuf;

    fn scores(pairs: &[(&str, u8)]) -> ScoreMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    fn record(team: &str, judge: &str, pairs: &[(&str, u8)]) -> EvaluationRecord {
        EvaluationRecord::new(team, judge, scores(pairs))
    }

    fn directory(csv: &str) -> UserDirectory {
        let rows = sheet::read_all(csv.as_bytes(), &PathBuf::from("users.csv")).unwrap();
        UserDirectory::from_rows(&rows)
    }

    const JUDGES: &str = "USERID,Name,Username,Password,Admin,Submitted\n\
                          u1,Alice,alice,pw,false,true\n\
                          u2,Bob,bob,pw,false,true\n\
                          u3,Carol,carol,pw,false,false\n\
                          u4,Admin,admin,pw,true,true\n";

    #[test]
    fn total_sums_only_rubric_criteria() {
        let mut map = scores(&[("Creativity", 7), ("Audience Appeal", 5)]);
        map.insert("Not A Criterion".to_string(), 10);
        assert_eq!(record_total(&map), 12);
        assert_eq!(record_total(&ScoreMap::new()), 0);
    }

    #[test]
    fn totals_for_groups_by_team_for_one_judge() {
        let records = vec![
            record("Blue", "alice", &[("Creativity", 7)]),
            record("Red", "alice", &[("Creativity", 4), ("Audience Appeal", 4)]),
            record("Blue", "bob", &[("Creativity", 10)]),
        ];
        let totals = totals_for(&records, " alice ");
        assert_eq!(totals.len(), 2);
        assert_eq!(totals["Blue"], 7);
        assert_eq!(totals["Red"], 8);
    }

    #[test]
    fn leaderboard_sorts_descending_by_average() {
        let users = directory(JUDGES);
        let records = vec![
            record("Blue", "alice", &[("Creativity", 1)]),
            record("Red", "alice", &[("Creativity", 3)]),
            record("Green", "alice", &[("Creativity", 2)]),
        ];
        let teams = vec!["Blue".into(), "Red".into(), "Green".into()];
        let rows = leaderboard(&records, &teams, &users);
        let order: Vec<&str> = rows.iter().map(|r| r.team.as_str()).collect();
        assert_eq!(order, ["Red", "Green", "Blue"]);
    }

    #[test]
    fn equal_averages_keep_encounter_order() {
        let users = directory(JUDGES);
        let records = vec![
            record("Blue", "alice", &[("Creativity", 5)]),
            record("Red", "alice", &[("Creativity", 5)]),
            record("Green", "alice", &[("Creativity", 5)]),
        ];
        let teams = vec!["Blue".into(), "Red".into(), "Green".into()];
        let rows = leaderboard(&records, &teams, &users);
        let order: Vec<&str> = rows.iter().map(|r| r.team.as_str()).collect();
        assert_eq!(order, ["Blue", "Red", "Green"]);
    }

    #[test]
    fn only_submitted_non_admin_judges_divide_the_average() {
        let users = directory(JUDGES);
        let records = vec![
            record("Blue", "alice", &[("Creativity", 10)]),
            record("Blue", "carol", &[("Creativity", 2)]),
            record("Blue", "admin", &[("Creativity", 2)]),
        ];
        let teams = vec!["Blue".into()];
        let rows = leaderboard(&records, &teams, &users);
        // carol has not submitted and admin is an admin: only alice counts.
        assert_eq!(rows[0].average, 10.0);
        assert_eq!(rows[0].total_judge_count, 3);
        assert_eq!(rows[0].submitted_judge_count, 1);
    }

    #[test]
    fn zero_qualifying_judges_reports_zero_average() {
        let users = directory(JUDGES);
        let records = vec![record("Blue", "carol", &[("Creativity", 9)])];
        let teams = vec!["Blue".into()];
        let rows = leaderboard(&records, &teams, &users);
        assert_eq!(rows[0].average, 0.0);
        assert!(rows[0].average.is_finite());
        assert_eq!(rows[0].total_judge_count, 1);
        assert_eq!(rows[0].submitted_judge_count, 0);
    }

    #[test]
    fn configured_team_with_no_rows_appears_with_zero_counts() {
        let users = directory(JUDGES);
        let records = vec![record("Blue", "alice", &[("Creativity", 6)])];
        let teams = vec!["Blue".into(), "Red".into()];
        let rows = leaderboard(&records, &teams, &users);
        assert_eq!(rows.len(), 2);
        let red = rows.iter().find(|r| r.team == "Red").unwrap();
        assert_eq!(red.average, 0.0);
        assert_eq!(red.total_judge_count, 0);
        assert_eq!(red.submitted_judge_count, 0);
    }

    #[test]
    fn unconfigured_team_found_in_rows_is_included() {
        let users = directory(JUDGES);
        let records = vec![record("Surprise", "alice", &[("Creativity", 6)])];
        let rows = leaderboard(&records, &[], &users);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].team, "Surprise");
        assert_eq!(rows[0].average, 6.0);
    }
}

use std::collections::HashMap;

use crate::models::{Category, PointTransaction, RankingEntry};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum RankBy {
    Actor,
    Subject,
}

/// Builds a leaderboard over the given window of transactions.
///
/// Every roster name appears exactly once even with no activity; the full
/// roster is merged with the aggregated totals so zero-activity entities
/// rank at 0 rather than vanishing. Names appearing only in the ledger
/// (e.g. snapshots of since-removed roster entries) are appended after the
/// roster in first-seen order. Ties keep insertion order.
pub fn rank(
    roster: &[String],
    transactions: &[PointTransaction],
    by: RankBy,
    category: Category,
) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = Vec::with_capacity(roster.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(roster.len());

    for name in roster {
        if index.contains_key(name) {
            continue;
        }
        index.insert(name.clone(), entries.len());
        entries.push(RankingEntry {
            name: name.clone(),
            total_points: 0,
        });
    }

    for tx in transactions {
        if Category::parse(&tx.category) != Some(category) {
            continue;
        }
        let name = match by {
            RankBy::Actor => &tx.actor_name,
            RankBy::Subject => &tx.subject_name,
        };
        let position = *index.entry(name.clone()).or_insert_with(|| {
            entries.push(RankingEntry {
                name: name.clone(),
                total_points: 0,
            });
            entries.len() - 1
        });
        entries[position].total_points += tx.points.abs();
    }

    // Vec::sort_by is stable, so ties keep insertion order.
    entries.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn award(subject_name: &str, actor_name: &str, points: i64) -> PointTransaction {
        let occurred_at = Utc.with_ymd_and_hms(2026, 3, 16, 9, 0, 0).unwrap();
        PointTransaction {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            form_id: Uuid::new_v4(),
            category: "award".to_string(),
            actor_id: Uuid::new_v4(),
            actor_name: actor_name.to_string(),
            subject_id: Uuid::new_v4(),
            subject_name: subject_name.to_string(),
            points,
            occurred_at,
            recorded_at: occurred_at,
        }
    }

    fn names(entries: &[RankingEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn zero_activity_students_still_rank() {
        let roster = vec![
            "Milo Andersen".to_string(),
            "Priya Nair".to_string(),
            "Sam Okafor".to_string(),
        ];
        let txs = vec![award("Priya Nair", "Dana Whitfield", 20)];
        let entries = rank(&roster, &txs, RankBy::Subject, Category::Award);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "Priya Nair");
        assert_eq!(entries[0].total_points, 20);
        assert_eq!(entries[1].total_points, 0);
        assert_eq!(entries[2].total_points, 0);
    }

    #[test]
    fn ties_keep_roster_order() {
        let roster = vec![
            "Milo Andersen".to_string(),
            "Priya Nair".to_string(),
            "Sam Okafor".to_string(),
        ];
        let entries = rank(&roster, &[], RankBy::Subject, Category::Award);
        assert_eq!(names(&entries), ["Milo Andersen", "Priya Nair", "Sam Okafor"]);
    }

    #[test]
    fn actor_ranking_groups_by_submitter() {
        let roster = vec!["Dana Whitfield".to_string(), "Lee Tran".to_string()];
        let txs = vec![
            award("Milo Andersen", "Lee Tran", 5),
            award("Priya Nair", "Lee Tran", 7),
            award("Sam Okafor", "Dana Whitfield", 4),
        ];
        let entries = rank(&roster, &txs, RankBy::Actor, Category::Award);
        assert_eq!(names(&entries), ["Lee Tran", "Dana Whitfield"]);
        assert_eq!(entries[0].total_points, 12);
    }

    #[test]
    fn other_categories_do_not_count() {
        let roster = vec!["Milo Andersen".to_string()];
        let mut deduct = award("Milo Andersen", "Dana Whitfield", 5);
        deduct.category = "deduct".to_string();
        let entries = rank(&roster, &[deduct], RankBy::Subject, Category::Award);
        assert_eq!(entries[0].total_points, 0);
    }

    #[test]
    fn ledger_only_names_are_appended_once() {
        let roster = vec!["Milo Andersen".to_string()];
        let txs = vec![
            award("Departed Student", "Dana Whitfield", 3),
            award("Departed Student", "Dana Whitfield", 2),
        ];
        let entries = rank(&roster, &txs, RankBy::Subject, Category::Award);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Departed Student");
        assert_eq!(entries[0].total_points, 5);
    }
}

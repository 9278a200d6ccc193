//! Table selection for a party.
//!
//! Rules, applied in order:
//! 1. Best-fit single table: the smallest free table with `seats >= party_size`.
//! 2. Otherwise the cheapest pair of free tables sharing a join group, where
//!    "cheapest" is the smallest combined seat count.
//!
//! At most two tables are ever combined. Ties keep the first candidate found,
//! so the result is a pure function of the input order.

use thiserror::Error;

use crate::models::Table;
use crate::overlap::BusySet;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no table or table combination fits a party of {party_size}")]
pub struct NoTablesAvailable {
    pub party_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Single { table_id: String, seats: u32 },
    Combined { table_ids: [String; 2], seats: u32 },
}

impl Assignment {
    pub fn table_ids(&self) -> Vec<String> {
        match self {
            Assignment::Single { table_id, .. } => vec![table_id.clone()],
            Assignment::Combined { table_ids, .. } => table_ids.to_vec(),
        }
    }

    pub fn seats(&self) -> u32 {
        match self {
            Assignment::Single { seats, .. } | Assignment::Combined { seats, .. } => *seats,
        }
    }
}

pub fn assign_tables(
    tables: &[Table],
    busy: &BusySet,
    party_size: u32,
) -> Result<Assignment, NoTablesAvailable> {
    let mut free: Vec<&Table> = tables
        .iter()
        .filter(|t| t.active && !busy.contains(&t.table_id))
        .collect();

    // Stable: equal seat counts keep catalog order.
    free.sort_by_key(|t| t.seats);

    if let Some(t) = free.iter().find(|t| t.seats >= party_size) {
        return Ok(Assignment::Single {
            table_id: t.table_id.clone(),
            seats: t.seats,
        });
    }

    best_pair(&free, party_size).ok_or(NoTablesAvailable { party_size })
}

/// Groups keep first-seen order so enumeration is deterministic.
fn join_groups<'a>(free: &[&'a Table]) -> Vec<(&'a str, Vec<&'a Table>)> {
    let mut groups: Vec<(&'a str, Vec<&'a Table>)> = Vec::new();

    for t in free {
        let Some(group) = t.join_group.as_deref().filter(|g| !g.is_empty()) else {
            continue;
        };

        match groups.iter_mut().find(|(g, _)| *g == group) {
            Some((_, members)) => members.push(t),
            None => groups.push((group, vec![t])),
        }
    }

    groups
}

fn best_pair(free: &[&Table], party_size: u32) -> Option<Assignment> {
    let mut best: Option<Assignment> = None;

    for (_, members) in join_groups(free) {
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let seats = members[i].seats.saturating_add(members[j].seats);
                if seats < party_size {
                    continue;
                }

                let better = best.as_ref().is_none_or(|b| seats < b.seats());
                if better {
                    best = Some(Assignment::Combined {
                        table_ids: [members[i].table_id.clone(), members[j].table_id.clone()],
                        seats,
                    });
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(id: &str, seats: u32, group: Option<&str>) -> Table {
        Table {
            table_id: id.to_string(),
            restaurant_id: "r1".to_string(),
            name: format!("Table {id}"),
            seats,
            join_group: group.map(str::to_string),
            active: true,
        }
    }

    #[test]
    fn picks_smallest_single_table_that_fits() {
        let tables = vec![table("t4", 4, None), table("t6", 6, None), table("t8", 8, None)];

        let got = assign_tables(&tables, &BusySet::new(), 5).unwrap();
        assert_eq!(got.table_ids(), vec!["t6"]);
        assert_eq!(got.seats(), 6);
    }

    #[test]
    fn input_order_does_not_change_single_pick() {
        let tables = vec![table("t8", 8, None), table("t4", 4, None), table("t6", 6, None)];

        let got = assign_tables(&tables, &BusySet::new(), 5).unwrap();
        assert_eq!(got.table_ids(), vec!["t6"]);
    }

    #[test]
    fn busy_table_is_skipped() {
        let tables = vec![table("t4", 4, None), table("t6", 6, None), table("t8", 8, None)];
        let busy = BusySet::from(["t6".to_string()]);

        let got = assign_tables(&tables, &busy, 5).unwrap();
        assert_eq!(got.table_ids(), vec!["t8"]);
    }

    #[test]
    fn inactive_table_is_skipped() {
        let mut tables = vec![table("t6", 6, None), table("t8", 8, None)];
        tables[0].active = false;

        let got = assign_tables(&tables, &BusySet::new(), 5).unwrap();
        assert_eq!(got.table_ids(), vec!["t8"]);
    }

    #[test]
    fn combines_pair_with_smallest_seat_sum() {
        let tables = vec![
            table("a2", 2, Some("A")),
            table("a3", 3, Some("A")),
            table("a4", 4, Some("A")),
        ];

        let got = assign_tables(&tables, &BusySet::new(), 6).unwrap();
        assert_eq!(
            got,
            Assignment::Combined {
                table_ids: ["a2".to_string(), "a4".to_string()],
                seats: 6,
            }
        );
    }

    #[test]
    fn tables_without_join_group_never_combine() {
        let tables = vec![table("t2", 2, None), table("t3", 3, None)];

        let err = assign_tables(&tables, &BusySet::new(), 10).unwrap_err();
        assert_eq!(err, NoTablesAvailable { party_size: 10 });
    }

    #[test]
    fn pairs_never_cross_join_groups() {
        let tables = vec![table("a4", 4, Some("A")), table("b4", 4, Some("B"))];

        assert!(assign_tables(&tables, &BusySet::new(), 7).is_err());
    }

    #[test]
    fn empty_join_group_is_treated_as_none() {
        let tables = vec![table("x3", 3, Some("")), table("y3", 3, Some(""))];

        assert!(assign_tables(&tables, &BusySet::new(), 5).is_err());
    }

    #[test]
    fn tie_between_groups_keeps_first_enumerated() {
        // Sorted by seats: b2, a3, a3b, b3. Group B is seen first.
        let tables = vec![
            table("a3", 3, Some("A")),
            table("b2", 2, Some("B")),
            table("a3b", 3, Some("A")),
            table("b3", 3, Some("B")),
        ];

        let got = assign_tables(&tables, &BusySet::new(), 5).unwrap();
        assert_eq!(got.table_ids(), vec!["b2", "b3"]);
    }

    #[test]
    fn busy_member_is_excluded_from_combination() {
        let tables = vec![
            table("a2", 2, Some("A")),
            table("a3", 3, Some("A")),
            table("a4", 4, Some("A")),
        ];
        let busy = BusySet::from(["a2".to_string()]);

        let got = assign_tables(&tables, &busy, 6).unwrap();
        assert_eq!(got.table_ids(), vec!["a3", "a4"]);
    }

    fn arb_tables() -> impl Strategy<Value = Vec<Table>> {
        prop::collection::vec(
            (1u32..12, prop::option::of(0u8..3), any::<bool>()),
            0..10,
        )
        .prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (seats, group, active))| Table {
                    table_id: format!("t{i}"),
                    restaurant_id: "r1".to_string(),
                    name: format!("Table {i}"),
                    seats,
                    join_group: group.map(|g| format!("g{g}")),
                    active,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn never_assigns_busy_or_inactive_tables(
            tables in arb_tables(),
            busy_idx in prop::collection::btree_set(0usize..10, 0..5),
            party in 1u32..25,
        ) {
            let busy: BusySet = busy_idx.into_iter().map(|i| format!("t{i}")).collect();

            if let Ok(a) = assign_tables(&tables, &busy, party) {
                let ids = a.table_ids();
                prop_assert!(ids.len() <= 2);
                prop_assert!(a.seats() >= party);

                let mut seats = 0;
                for id in &ids {
                    prop_assert!(!busy.contains(id));
                    let t = tables.iter().find(|t| &t.table_id == id).unwrap();
                    prop_assert!(t.active);
                    seats += t.seats;
                }
                prop_assert_eq!(seats, a.seats());

                if ids.len() == 2 {
                    prop_assert_ne!(&ids[0], &ids[1]);
                }
            }
        }

        #[test]
        fn single_pick_wastes_fewest_seats(
            tables in arb_tables(),
            party in 1u32..12,
        ) {
            let busy = BusySet::new();
            if let Ok(Assignment::Single { seats, .. }) = assign_tables(&tables, &busy, party) {
                let min_fit = tables
                    .iter()
                    .filter(|t| t.active && t.seats >= party)
                    .map(|t| t.seats)
                    .min()
                    .unwrap();
                prop_assert_eq!(seats, min_fit);
            }
        }

        #[test]
        fn combination_only_when_no_single_fits(
            tables in arb_tables(),
            party in 1u32..25,
        ) {
            let busy = BusySet::new();
            if let Ok(Assignment::Combined { .. }) = assign_tables(&tables, &busy, party) {
                prop_assert!(tables.iter().all(|t| !t.active || t.seats < party));
            }
        }
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use labstock_core::{ItemCode, RoomCode};

use crate::fact::{StockFact, StockFactKind};
use crate::policy::BaselinePolicy;

/// The terms the quantity is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBreakdown {
    /// Physical quantity of the latest opname, 0 when never counted.
    pub baseline: i64,
    /// Global position of that opname.
    pub baseline_position: Option<u64>,
    pub transfer_in: i64,
    pub transfer_out: i64,
    pub receipts: i64,
    pub consumption: i64,
}

impl StockBreakdown {
    /// `None` when the terms do not combine inside `i64`.
    pub fn quantity(&self) -> Option<i64> {
        self.baseline
            .checked_add(self.transfer_in)?
            .checked_add(self.receipts)?
            .checked_sub(self.transfer_out)?
            .checked_sub(self.consumption)
    }
}

/// The recorded history of a (room, item) sums outside the `i64` range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stock of {item} in {room} is out of range")]
pub struct StockOverflow {
    pub room: RoomCode,
    pub item: ItemCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub room: RoomCode,
    pub item: ItemCode,
    /// Not clamped; a ledger that moved out more than it counted reports negative.
    pub quantity: i64,
    pub policy: BaselinePolicy,
    pub breakdown: StockBreakdown,
}

/// Current quantity of `item` in `room`.
///
/// `quantity = latest opname + transfers in + receipts - transfers out - consumption`,
/// where "latest" means highest global position. Under
/// [`BaselinePolicy::SinceLatestOpname`] only movements positioned after that
/// opname are summed. Input order does not matter.
pub fn compose_stock(
    facts: &[StockFact],
    room: &RoomCode,
    item: &ItemCode,
    policy: BaselinePolicy,
) -> Result<StockLevel, StockOverflow> {
    let overflow = || StockOverflow {
        room: room.clone(),
        item: item.clone(),
    };

    let relevant = || facts.iter().filter(|f| f.touches(room, item));

    let latest_opname = relevant()
        .filter(|f| f.kind == StockFactKind::OpnameCount)
        .max_by_key(|f| f.position);

    let mut breakdown = StockBreakdown {
        baseline: latest_opname.map_or(0, |f| f.quantity),
        baseline_position: latest_opname.map(|f| f.position),
        ..StockBreakdown::default()
    };

    let window_start = match (policy, breakdown.baseline_position) {
        (BaselinePolicy::SinceLatestOpname, Some(position)) => Some(position),
        _ => None,
    };

    for fact in relevant() {
        if window_start.is_some_and(|start| fact.position <= start) {
            continue;
        }
        let term = match fact.kind {
            StockFactKind::OpnameCount => continue,
            StockFactKind::TransferIn => &mut breakdown.transfer_in,
            StockFactKind::TransferOut => &mut breakdown.transfer_out,
            StockFactKind::Receipt => &mut breakdown.receipts,
            StockFactKind::Consumption => &mut breakdown.consumption,
        };
        *term = term.checked_add(fact.quantity).ok_or_else(overflow)?;
    }

    Ok(StockLevel {
        room: room.clone(),
        item: item.clone(),
        quantity: breakdown.quantity().ok_or_else(overflow)?,
        policy,
        breakdown,
    })
}

/// Every fact touching `room`, in commit order.
pub fn room_movements(facts: &[StockFact], room: &RoomCode) -> Vec<StockFact> {
    let mut movements: Vec<StockFact> = facts.iter().filter(|f| &f.room == room).cloned().collect();
    movements.sort_by_key(|f| f.position);
    movements
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use labstock_core::AggregateId;

    fn room(code: &str) -> RoomCode {
        RoomCode::new(code).unwrap()
    }

    fn item(code: &str) -> ItemCode {
        ItemCode::new(code).unwrap()
    }

    fn fact(position: u64, room_code: &str, kind: StockFactKind, quantity: i64) -> StockFact {
        StockFact {
            position,
            room: room(room_code),
            item: item("X"),
            kind,
            quantity,
            record_id: AggregateId::new(),
            counterpart: None,
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn never_counted_starts_at_zero() {
        let level = compose_stock(&[], &room("A"), &item("X"), BaselinePolicy::AllHistory).unwrap();
        assert_eq!(level.quantity, 0);
        assert_eq!(level.breakdown.baseline_position, None);
    }

    #[test]
    fn partial_transfer_moves_between_rooms() {
        let facts = vec![
            fact(1, "A", StockFactKind::OpnameCount, 10),
            fact(2, "A", StockFactKind::TransferOut, 4),
            fact(2, "B", StockFactKind::TransferIn, 4),
        ];
        let a = compose_stock(&facts, &room("A"), &item("X"), BaselinePolicy::AllHistory).unwrap();
        let b = compose_stock(&facts, &room("B"), &item("X"), BaselinePolicy::AllHistory).unwrap();
        assert_eq!(a.quantity, 6);
        assert_eq!(b.quantity, 4);
    }

    #[test]
    fn latest_opname_wins_by_position() {
        let facts = vec![
            fact(7, "A", StockFactKind::OpnameCount, 3),
            fact(2, "A", StockFactKind::OpnameCount, 50),
        ];
        let level = compose_stock(&facts, &room("A"), &item("X"), BaselinePolicy::AllHistory).unwrap();
        assert_eq!(level.breakdown.baseline, 3);
        assert_eq!(level.breakdown.baseline_position, Some(7));
    }

    #[test]
    fn policies_differ_only_before_the_baseline() {
        let facts = vec![
            fact(1, "A", StockFactKind::Receipt, 5),
            fact(2, "A", StockFactKind::Consumption, 1),
            fact(3, "A", StockFactKind::OpnameCount, 4),
            fact(4, "A", StockFactKind::Consumption, 2),
        ];

        let all = compose_stock(&facts, &room("A"), &item("X"), BaselinePolicy::AllHistory).unwrap();
        assert_eq!(all.quantity, 4 + 5 - 1 - 2);

        let since = compose_stock(
            &facts,
            &room("A"),
            &item("X"),
            BaselinePolicy::SinceLatestOpname,
        ).unwrap();
        assert_eq!(since.quantity, 4 - 2);
        assert_eq!(since.breakdown.receipts, 0);
    }

    #[test]
    fn quantity_is_not_clamped() {
        let facts = vec![fact(1, "A", StockFactKind::Consumption, 3)];
        let level = compose_stock(&facts, &room("A"), &item("X"), BaselinePolicy::AllHistory).unwrap();
        assert_eq!(level.quantity, -3);
    }

    #[test]
    fn overflowing_history_is_an_error() {
        let facts = vec![
            fact(1, "A", StockFactKind::Receipt, i64::MAX),
            fact(2, "A", StockFactKind::Receipt, 1),
        ];
        let err = compose_stock(&facts, &room("A"), &item("X"), BaselinePolicy::AllHistory)
            .unwrap_err();
        assert_eq!(err.room, room("A"));

        let facts = vec![
            fact(1, "A", StockFactKind::OpnameCount, i64::MAX),
            fact(2, "A", StockFactKind::TransferIn, 1),
        ];
        assert!(compose_stock(&facts, &room("A"), &item("X"), BaselinePolicy::AllHistory).is_err());
    }

    #[test]
    fn movements_are_listed_in_commit_order() {
        let facts = vec![
            fact(5, "A", StockFactKind::Consumption, 1),
            fact(3, "B", StockFactKind::TransferIn, 2),
            fact(1, "A", StockFactKind::OpnameCount, 9),
        ];
        let listed = room_movements(&facts, &room("A"));
        let positions: Vec<u64> = listed.iter().map(|f| f.position).collect();
        assert_eq!(positions, vec![1, 5]);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn kind() -> impl Strategy<Value = StockFactKind> {
            prop_oneof![
                Just(StockFactKind::OpnameCount),
                Just(StockFactKind::TransferIn),
                Just(StockFactKind::TransferOut),
                Just(StockFactKind::Receipt),
                Just(StockFactKind::Consumption),
            ]
        }

        fn history() -> impl Strategy<Value = Vec<StockFact>> {
            prop::collection::vec((kind(), 0i64..100, prop::bool::ANY), 0..40).prop_map(|raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, (kind, qty, in_a))| {
                        fact(i as u64 + 1, if in_a { "A" } else { "B" }, kind, qty)
                    })
                    .collect()
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: the quantity equals the stock formula over the breakdown.
            #[test]
            fn quantity_matches_formula(facts in history()) {
                for policy in [BaselinePolicy::AllHistory, BaselinePolicy::SinceLatestOpname] {
                    let level = compose_stock(&facts, &room("A"), &item("X"), policy).unwrap();
                    let b = &level.breakdown;
                    prop_assert_eq!(
                        level.quantity,
                        b.baseline + b.transfer_in + b.receipts - b.transfer_out - b.consumption
                    );
                }
            }

            /// Property: composition does not depend on input order.
            #[test]
            fn order_independent(facts in history()) {
                let mut reversed = facts.clone();
                reversed.reverse();
                for policy in [BaselinePolicy::AllHistory, BaselinePolicy::SinceLatestOpname] {
                    prop_assert_eq!(
                        compose_stock(&facts, &room("A"), &item("X"), policy).unwrap(),
                        compose_stock(&reversed, &room("A"), &item("X"), policy).unwrap()
                    );
                }
            }

            /// Property: without any opname both policies agree.
            #[test]
            fn policies_agree_without_opname(facts in history()) {
                let no_opname: Vec<_> = facts
                    .into_iter()
                    .filter(|f| f.kind != StockFactKind::OpnameCount)
                    .collect();
                prop_assert_eq!(
                    compose_stock(&no_opname, &room("A"), &item("X"), BaselinePolicy::AllHistory).unwrap().quantity,
                    compose_stock(&no_opname, &room("A"), &item("X"), BaselinePolicy::SinceLatestOpname).unwrap().quantity
                );
            }

            /// Property: facts of another room never change the result.
            #[test]
            fn other_rooms_are_ignored(facts in history()) {
                let only_a: Vec<_> = facts.iter().filter(|f| f.room == room("A")).cloned().collect();
                prop_assert_eq!(
                    compose_stock(&facts, &room("A"), &item("X"), BaselinePolicy::AllHistory).unwrap(),
                    compose_stock(&only_a, &room("A"), &item("X"), BaselinePolicy::AllHistory).unwrap()
                );
            }
        }
    }
}

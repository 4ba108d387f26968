//! Debt simplifier.
//!
//! Greedy min-cash-flow matching: the current debtor pays the current creditor
//! `min(|debt|, credit)` and whichever side reaches zero is advanced. This
//! usually reduces the number of transfers a lot but is not guaranteed to find
//! the theoretical minimum. Amounts are exact cents, so "settled" means zero.

use serde::Serialize;
use uuid::Uuid;

use super::balance::Balance;
use crate::domain::UserId;

/// One suggested transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub from: Uuid,
    pub to: Uuid,
    pub amount: i64,
}

/// Produces at most `balances.len() - 1` transfers that bring every balance to zero.
/// Debtors and creditors keep their input order.
pub fn simplify(balances: &[Balance]) -> Vec<Settlement> {
    let mut debtors: Vec<(UserId, i64)> = balances
        .iter()
        .filter(|b| b.amount < 0)
        .map(|b| (b.user_id, -b.amount))
        .collect();
    let mut creditors: Vec<(UserId, i64)> = balances
        .iter()
        .filter(|b| b.amount > 0)
        .map(|b| (b.user_id, b.amount))
        .collect();

    let mut transfers = Vec::new();
    let (mut d, mut c) = (0, 0);
    while d < debtors.len() && c < creditors.len() {
        let amount = debtors[d].1.min(creditors[c].1);
        transfers.push(Settlement {
            from: debtors[d].0,
            to: creditors[c].0,
            amount,
        });
        debtors[d].1 -= amount;
        creditors[c].1 -= amount;
        if debtors[d].1 == 0 {
            d += 1;
        }
        if creditors[c].1 == 0 {
            c += 1;
        }
    }
    transfers
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn bal(user_id: UserId, amount: i64) -> Balance {
        Balance { user_id, amount }
    }

    fn apply(balances: &[Balance], transfers: &[Settlement]) -> Vec<i64> {
        balances
            .iter()
            .map(|b| {
                let paid: i64 = transfers.iter().filter(|t| t.from == b.user_id).map(|t| t.amount).sum();
                let received: i64 = transfers.iter().filter(|t| t.to == b.user_id).map(|t| t.amount).sum();
                b.amount + paid - received
            })
            .collect()
    }

    #[test]
    fn single_debt_is_one_transfer() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let transfers = simplify(&[bal(a, 500), bal(b, -500)]);
        assert_eq!(transfers, vec![Settlement { from: b, to: a, amount: 500 }]);
    }

    #[test]
    fn settled_balances_need_no_transfers() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(simplify(&[bal(a, 0), bal(b, 0)]).is_empty());
        assert!(simplify(&[]).is_empty());
    }

    #[test]
    fn greedy_matching_follows_input_order() {
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let balances = [bal(a, 700), bal(b, -400), bal(c, 300), bal(d, -600)];
        let transfers = simplify(&balances);
        assert_eq!(
            transfers,
            vec![
                Settlement { from: b, to: a, amount: 400 },
                Settlement { from: d, to: a, amount: 300 },
                Settlement { from: d, to: c, amount: 300 },
            ]
        );
    }

    #[test]
    fn transfers_zero_every_balance_within_bound() {
        let people: Vec<UserId> = (0..6).map(|_| Uuid::new_v4()).collect();
        let balances = vec![
            bal(people[0], 1_234),
            bal(people[1], -333),
            bal(people[2], -901),
            bal(people[3], 2_000),
            bal(people[4], -1_999),
            bal(people[5], -1),
        ];
        let transfers = simplify(&balances);
        assert!(transfers.len() <= balances.len() - 1);
        assert!(transfers.iter().all(|t| t.amount > 0));
        assert!(apply(&balances, &transfers).iter().all(|b| *b == 0));
    }
}

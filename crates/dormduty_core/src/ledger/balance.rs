//! Net balance per participant.
//!
//! Positive balance: the participant is owed money. Negative: they owe money.
//! Every expense and payment moves the same amount in both directions, so the
//! balances of a closed member set always sum to zero.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Expense, Payment, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub user_id: Uuid,
    pub amount: i64,
}

/// Net balances in member order; users that only show up in expenses or
/// payments are appended after the members.
pub fn balances(expenses: &[Expense], payments: &[Payment], members: &[UserId]) -> Vec<Balance> {
    let mut out: Vec<Balance> = Vec::with_capacity(members.len());
    for member in members {
        entry(&mut out, *member);
    }

    for expense in expenses {
        *entry(&mut out, expense.payer_id) += expense.amount;
        for share in expense.shares.iter() {
            *entry(&mut out, share.user_id) -= share.amount;
        }
    }

    // A payment settles debt: the payer's balance rises, the payee's falls.
    for payment in payments {
        *entry(&mut out, payment.from_user_id) += payment.amount;
        *entry(&mut out, payment.to_user_id) -= payment.amount;
    }

    out
}

fn entry(balances: &mut Vec<Balance>, user_id: UserId) -> &mut i64 {
    let index = match balances.iter().position(|b| b.user_id == user_id) {
        Some(index) => index,
        None => {
            balances.push(Balance { user_id, amount: 0 });
            balances.len() - 1
        }
    };
    &mut balances[index].amount
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{allocate, SplitStrategy};
    use chrono::Utc;
    use uuid::Uuid;

    fn expense(payer: UserId, amount: i64, participants: &[UserId]) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            room_id: Uuid::nil(),
            payer_id: payer,
            description: "groceries".into(),
            amount,
            currency: "USD".into(),
            split: SplitStrategy::Equal,
            shares: allocate(amount, participants, &SplitStrategy::Equal).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn payment(from: UserId, to: UserId, amount: i64) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            room_id: Uuid::nil(),
            from_user_id: from,
            to_user_id: to,
            amount,
            method: Some("cash".into()),
            expense_id: None,
            created_at: Utc::now(),
        }
    }

    fn amount_of(balances: &[Balance], id: UserId) -> i64 {
        balances.iter().find(|b| b.user_id == id).unwrap().amount
    }

    #[test]
    fn payer_is_owed_everyone_elses_share() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let result = balances(&[expense(a, 9_000, &[a, b, c])], &[], &[a, b, c]);
        assert_eq!(amount_of(&result, a), 6_000);
        assert_eq!(amount_of(&result, b), -3_000);
        assert_eq!(amount_of(&result, c), -3_000);
    }

    #[test]
    fn members_without_activity_start_at_zero() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let result = balances(&[], &[], &[a, b]);
        assert_eq!(result, vec![Balance { user_id: a, amount: 0 }, Balance { user_id: b, amount: 0 }]);
    }

    #[test]
    fn payments_settle_debt() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let result = balances(
            &[expense(a, 1_000, &[a, b])],
            &[payment(b, a, 500)],
            &[a, b],
        );
        assert_eq!(amount_of(&result, a), 0);
        assert_eq!(amount_of(&result, b), 0);
    }

    #[test]
    fn outsiders_are_appended_and_sum_stays_zero() {
        let (a, b, guest) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let result = balances(
            &[expense(a, 3_001, &[a, b, guest])],
            &[payment(guest, a, 400)],
            &[a, b],
        );
        assert_eq!(result.len(), 3);
        assert_eq!(result[2].user_id, guest);
        assert_eq!(result.iter().map(|b| b.amount).sum::<i64>(), 0);
    }

    #[test]
    fn any_sequence_of_activity_sums_to_zero() {
        let people: Vec<UserId> = (0..5).map(|_| Uuid::new_v4()).collect();
        let mut expenses = Vec::new();
        let mut payments = Vec::new();
        for i in 0..25usize {
            let payer = people[i % people.len()];
            let participants = &people[..(i % people.len()) + 1];
            expenses.push(expense(payer, 997 * (i as i64 + 1), participants));
            if i % 3 == 0 {
                payments.push(payment(people[(i + 1) % 5], people[(i + 3) % 5], 123 * i as i64));
            }
        }
        let result = balances(&expenses, &payments, &people);
        assert_eq!(result.iter().map(|b| b.amount).sum::<i64>(), 0);
    }
}

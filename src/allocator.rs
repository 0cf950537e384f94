//! Split allocation strategies.
//!
//! Pure functions from a total amount and a strategy input to a list of
//! per-participant allocations that sum exactly to the total. Rounding
//! remainders always land on the last participant in stable order, which
//! is why the map-based strategies take `BTreeMap` keyed by user id:
//! iteration order is significant and must be reproducible.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::constants::split_tolerance;
use crate::error::LedgerError;
use crate::models::SplitType;
use crate::money::Money;

/// Strategy input for one expense, dispatched through [`allocate`].
#[derive(Clone, Debug)]
pub enum SplitStrategy {
    Equal { participants: Vec<Uuid> },
    ExactAmount { amounts: BTreeMap<Uuid, Decimal> },
    Percentage { percentages: BTreeMap<Uuid, Decimal> },
    Shares { shares: BTreeMap<Uuid, u32> },
}

impl SplitStrategy {
    /// Every user referenced by the strategy input, in allocation order.
    pub fn participants(&self) -> Vec<Uuid> {
        match self {
            SplitStrategy::Equal { participants } => participants.clone(),
            SplitStrategy::ExactAmount { amounts } => amounts.keys().copied().collect(),
            SplitStrategy::Percentage { percentages } => percentages.keys().copied().collect(),
            SplitStrategy::Shares { shares } => shares.keys().copied().collect(),
        }
    }
}

/// One participant's share as produced by an allocation strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    pub user_id: Uuid,
    pub amount: Money,
    pub split_type: SplitType,
    pub percentage: Option<Decimal>,
}

pub fn allocate(total: &Money, strategy: &SplitStrategy) -> Result<Vec<Allocation>, LedgerError> {
    match strategy {
        SplitStrategy::Equal { participants } => allocate_equal(total, participants),
        SplitStrategy::ExactAmount { amounts } => allocate_exact(total, amounts),
        SplitStrategy::Percentage { percentages } => allocate_percentages(total, percentages),
        SplitStrategy::Shares { shares } => allocate_shares(total, shares),
    }
}

/// `total / N` rounded half-up for every participant except the last,
/// which absorbs the remainder so the sum is exact.
pub fn allocate_equal(
    total: &Money,
    participants: &[Uuid],
) -> Result<Vec<Allocation>, LedgerError> {
    ensure_positive_total(total)?;
    if participants.is_empty() {
        return Err(LedgerError::EmptyParticipants);
    }
    let mut seen = HashSet::new();
    for user_id in participants {
        if !seen.insert(*user_id) {
            return Err(LedgerError::DuplicateParticipant(*user_id));
        }
    }

    let share = total.div(participants.len())?;
    let mut allocations = Vec::with_capacity(participants.len());
    let mut allocated = Money::zero(total.currency().clone());

    for (idx, user_id) in participants.iter().enumerate() {
        let amount = if idx + 1 == participants.len() {
            total.checked_sub(&allocated)?
        } else {
            share.clone()
        };
        allocated = allocated.checked_add(&amount)?;
        allocations.push(Allocation {
            user_id: *user_id,
            amount,
            split_type: SplitType::Equal,
            percentage: None,
        });
    }

    ensure_all_positive(&allocations)?;
    Ok(allocations)
}

/// Amounts are taken verbatim; the sum must stay within 0.01 of the total.
pub fn allocate_exact(
    total: &Money,
    amounts: &BTreeMap<Uuid, Decimal>,
) -> Result<Vec<Allocation>, LedgerError> {
    ensure_positive_total(total)?;
    if amounts.is_empty() {
        return Err(LedgerError::EmptyParticipants);
    }

    let sum: Decimal = amounts.values().copied().sum();
    if (total.amount() - sum).abs() > split_tolerance() {
        return Err(LedgerError::SplitSumMismatch {
            expected: total.amount(),
            actual: sum,
        });
    }

    let allocations: Vec<Allocation> = amounts
        .iter()
        .map(|(user_id, amount)| Allocation {
            user_id: *user_id,
            amount: Money::new(*amount, total.currency().clone()),
            split_type: SplitType::ExactAmount,
            percentage: None,
        })
        .collect();

    ensure_all_positive(&allocations)?;
    Ok(allocations)
}

/// `total * p / 100` rounded half-up per entry; the last entry absorbs
/// the remainder. Percentages must sum to 100 within 0.01.
pub fn allocate_percentages(
    total: &Money,
    percentages: &BTreeMap<Uuid, Decimal>,
) -> Result<Vec<Allocation>, LedgerError> {
    ensure_positive_total(total)?;
    if percentages.is_empty() {
        return Err(LedgerError::EmptyParticipants);
    }

    let hundred = Decimal::from(100u32);
    for (user_id, pct) in percentages {
        if *pct < Decimal::ZERO || *pct > hundred {
            return Err(LedgerError::PercentageOutOfRange {
                user: *user_id,
                percentage: *pct,
            });
        }
    }
    let sum: Decimal = percentages.values().copied().sum();
    if (sum - hundred).abs() > split_tolerance() {
        return Err(LedgerError::PercentageSumMismatch { sum });
    }

    let mut allocations = Vec::with_capacity(percentages.len());
    let mut allocated = Money::zero(total.currency().clone());

    for (idx, (user_id, pct)) in percentages.iter().enumerate() {
        let amount = if idx + 1 == percentages.len() {
            total.checked_sub(&allocated)?
        } else {
            total.ratio(*pct, hundred)?
        };
        allocated = allocated.checked_add(&amount)?;
        allocations.push(Allocation {
            user_id: *user_id,
            amount,
            split_type: SplitType::Percentage,
            percentage: Some(*pct),
        });
    }

    ensure_all_positive(&allocations)?;
    Ok(allocations)
}

/// `total * s / Σs` rounded half-up per entry; the last entry absorbs
/// the remainder.
pub fn allocate_shares(
    total: &Money,
    shares: &BTreeMap<Uuid, u32>,
) -> Result<Vec<Allocation>, LedgerError> {
    ensure_positive_total(total)?;
    if shares.is_empty() {
        return Err(LedgerError::EmptyParticipants);
    }

    let total_shares: u64 = shares.values().map(|s| u64::from(*s)).sum();
    if total_shares == 0 {
        return Err(LedgerError::ZeroTotalShares);
    }

    let mut allocations = Vec::with_capacity(shares.len());
    let mut allocated = Money::zero(total.currency().clone());

    for (idx, (user_id, weight)) in shares.iter().enumerate() {
        let amount = if idx + 1 == shares.len() {
            total.checked_sub(&allocated)?
        } else {
            total.ratio(Decimal::from(*weight), Decimal::from(total_shares))?
        };
        allocated = allocated.checked_add(&amount)?;
        allocations.push(Allocation {
            user_id: *user_id,
            amount,
            split_type: SplitType::Shares,
            percentage: None,
        });
    }

    ensure_all_positive(&allocations)?;
    Ok(allocations)
}

fn ensure_positive_total(total: &Money) -> Result<(), LedgerError> {
    if !total.is_positive() {
        return Err(LedgerError::NonPositiveAmount(total.amount()));
    }
    Ok(())
}

fn ensure_all_positive(allocations: &[Allocation]) -> Result<(), LedgerError> {
    for allocation in allocations {
        if !allocation.amount.is_positive() {
            return Err(LedgerError::AllocationRoundsToZero {
                user: allocation.user_id,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn eur(amount: Decimal) -> Money {
        Money::new(amount, Currency::new("EUR").unwrap())
    }

    // Fixed ids so BTreeMap order is predictable in assertions
    fn user(n: u8) -> Uuid {
        Uuid::from_u128(n as u128)
    }

    fn amounts_of(allocations: &[Allocation]) -> Vec<Decimal> {
        allocations.iter().map(|a| a.amount.amount()).collect()
    }

    fn sum_of(allocations: &[Allocation]) -> Decimal {
        allocations.iter().map(|a| a.amount.amount()).sum()
    }

    #[test]
    fn equal_split_of_100_by_three() {
        let allocations = allocate_equal(&eur(dec!(100.00)), &[user(1), user(2), user(3)]).unwrap();
        assert_eq!(
            amounts_of(&allocations),
            vec![dec!(33.33), dec!(33.33), dec!(33.34)]
        );
        assert_eq!(sum_of(&allocations), dec!(100.00));
    }

    #[rstest]
    #[case(dec!(100.00), 3)]
    #[case(dec!(0.05), 3)]
    #[case(dec!(99.99), 7)]
    #[case(dec!(1234.56), 11)]
    #[case(dec!(10.00), 1)]
    fn equal_split_sums_exactly(#[case] total: Decimal, #[case] n: u8) {
        let participants: Vec<Uuid> = (1..=n).map(user).collect();
        let allocations = allocate_equal(&eur(total), &participants).unwrap();
        assert_eq!(allocations.len(), n as usize);
        assert_eq!(sum_of(&allocations), total);
    }

    #[test]
    fn equal_split_rejects_empty_participants() {
        let err = allocate_equal(&eur(dec!(10)), &[]).unwrap_err();
        assert!(matches!(err, LedgerError::EmptyParticipants));
    }

    #[test]
    fn equal_split_rejects_duplicates() {
        let err = allocate_equal(&eur(dec!(10)), &[user(1), user(1)]).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateParticipant(u) if u == user(1)));
    }

    #[test]
    fn equal_split_rejects_shares_that_round_to_zero() {
        // 0.01 over two people: first takes the whole cent, last gets 0.00
        let err = allocate_equal(&eur(dec!(0.01)), &[user(1), user(2)]).unwrap_err();
        assert!(matches!(err, LedgerError::AllocationRoundsToZero { .. }));
    }

    #[test]
    fn equal_split_rejects_non_positive_total() {
        let err = allocate_equal(&eur(dec!(0)), &[user(1)]).unwrap_err();
        assert!(matches!(err, LedgerError::NonPositiveAmount(_)));
    }

    #[test]
    fn percentages_summing_to_100_allocate_exactly() {
        let percentages = BTreeMap::from([
            (user(1), dec!(33.33)),
            (user(2), dec!(33.33)),
            (user(3), dec!(33.34)),
        ]);
        let allocations = allocate_percentages(&eur(dec!(90.00)), &percentages).unwrap();
        assert_eq!(sum_of(&allocations), dec!(90.00));
        assert_eq!(allocations[0].percentage, Some(dec!(33.33)));
        assert_eq!(allocations[0].split_type, SplitType::Percentage);
    }

    #[test]
    fn percentages_off_by_more_than_tolerance_are_rejected() {
        let percentages = BTreeMap::from([(user(1), dec!(50)), (user(2), dec!(49))]);
        let err = allocate_percentages(&eur(dec!(100.00)), &percentages).unwrap_err();
        assert!(matches!(err, LedgerError::PercentageSumMismatch { sum } if sum == dec!(99)));
    }

    #[test]
    fn percentage_entries_outside_range_are_rejected() {
        let percentages = BTreeMap::from([(user(1), dec!(101)), (user(2), dec!(-1))]);
        let err = allocate_percentages(&eur(dec!(100.00)), &percentages).unwrap_err();
        assert!(matches!(err, LedgerError::PercentageOutOfRange { .. }));
    }

    #[rstest]
    #[case(dec!(100.00))]
    #[case(dec!(0.07))]
    #[case(dec!(777.77))]
    fn percentage_split_sums_exactly(#[case] total: Decimal) {
        let percentages = BTreeMap::from([
            (user(1), dec!(33.33)),
            (user(2), dec!(33.33)),
            (user(3), dec!(33.34)),
        ]);
        let allocations = allocate_percentages(&eur(total), &percentages).unwrap();
        assert_eq!(sum_of(&allocations), total);
    }

    #[test]
    fn shares_split_by_weight_with_last_absorbing_remainder() {
        let shares = BTreeMap::from([(user(1), 2u32), (user(2), 1u32)]);
        let allocations = allocate_shares(&eur(dec!(100.00)), &shares).unwrap();
        assert_eq!(amounts_of(&allocations), vec![dec!(66.67), dec!(33.33)]);
        assert_eq!(sum_of(&allocations), dec!(100.00));
    }

    #[rstest]
    #[case(dec!(100.00), &[1, 1, 1])]
    #[case(dec!(10.01), &[3, 2, 2])]
    #[case(dec!(250.00), &[5, 3, 1, 1])]
    fn shares_split_sums_exactly(#[case] total: Decimal, #[case] weights: &[u32]) {
        let shares: BTreeMap<Uuid, u32> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| (user(i as u8 + 1), *w))
            .collect();
        let allocations = allocate_shares(&eur(total), &shares).unwrap();
        assert_eq!(sum_of(&allocations), total);
    }

    #[test]
    fn zero_total_shares_are_rejected() {
        let shares = BTreeMap::from([(user(1), 0u32), (user(2), 0u32)]);
        let err = allocate_shares(&eur(dec!(100.00)), &shares).unwrap_err();
        assert!(matches!(err, LedgerError::ZeroTotalShares));
    }

    #[test]
    fn exact_amounts_are_taken_verbatim() {
        let amounts = BTreeMap::from([(user(1), dec!(60.00)), (user(2), dec!(40.00))]);
        let allocations = allocate_exact(&eur(dec!(100.00)), &amounts).unwrap();
        assert_eq!(amounts_of(&allocations), vec![dec!(60.00), dec!(40.00)]);
    }

    #[test]
    fn exact_amounts_within_tolerance_pass() {
        let amounts = BTreeMap::from([(user(1), dec!(60.00)), (user(2), dec!(39.99))]);
        assert!(allocate_exact(&eur(dec!(100.00)), &amounts).is_ok());
    }

    #[test]
    fn exact_amounts_beyond_tolerance_are_rejected() {
        let amounts = BTreeMap::from([(user(1), dec!(60.00)), (user(2), dec!(39.00))]);
        let err = allocate_exact(&eur(dec!(100.00)), &amounts).unwrap_err();
        assert!(
            matches!(err, LedgerError::SplitSumMismatch { expected, actual }
                if expected == dec!(100.00) && actual == dec!(99.00))
        );
    }

    #[test]
    fn exact_amounts_must_be_positive() {
        let amounts = BTreeMap::from([(user(1), dec!(100.00)), (user(2), dec!(0.00))]);
        let err = allocate_exact(&eur(dec!(100.00)), &amounts).unwrap_err();
        assert!(matches!(err, LedgerError::AllocationRoundsToZero { user: u } if u == user(2)));
    }

    #[test]
    fn dispatch_matches_direct_calls() {
        let strategy = SplitStrategy::Equal {
            participants: vec![user(1), user(2), user(3)],
        };
        let via_dispatch = allocate(&eur(dec!(100.00)), &strategy).unwrap();
        let direct = allocate_equal(&eur(dec!(100.00)), &[user(1), user(2), user(3)]).unwrap();
        assert_eq!(via_dispatch, direct);
    }
}

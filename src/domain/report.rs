//! Completion reporting over finished transactions.
//!
//! All sums are exact decimals. The kiloliter and crore conversions produce
//! display strings only and never feed back into stored or compared values.

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use serde::Serialize;

use super::transaction::Transaction;

const LITERS_PER_KILOLITER: i64 = 1_000;
const UNITS_PER_CRORE: i64 = 10_000_000;
const DISPLAY_DECIMALS: i64 = 2;
const RATIO_DECIMALS: i64 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerTotals {
    pub total_volume: BigDecimal,
    pub total_cost: BigDecimal,
}

impl Default for BuyerTotals {
    fn default() -> Self {
        Self {
            total_volume: BigDecimal::from(0),
            total_cost: BigDecimal::from(0),
        }
    }
}

/// Sums volume and cost per buyer. Buyer names match exactly, case included.
pub fn aggregate_by_buyer(transactions: &[Transaction]) -> BTreeMap<String, BuyerTotals> {
    let mut totals: BTreeMap<String, BuyerTotals> = BTreeMap::new();
    for tx in transactions {
        let entry = totals.entry(tx.buyer.clone()).or_default();
        entry.total_volume += &tx.volume;
        entry.total_cost += &tx.cost;
    }
    totals
}

pub fn total_volume(transactions: &[Transaction]) -> BigDecimal {
    transactions
        .iter()
        .fold(BigDecimal::from(0), |acc, tx| acc + &tx.volume)
}

pub fn total_cost(transactions: &[Transaction]) -> BigDecimal {
    transactions
        .iter()
        .fold(BigDecimal::from(0), |acc, tx| acc + &tx.cost)
}

/// `total_volume / capacity`, or `None` when capacity is not positive.
pub fn completion_ratio(total_volume: &BigDecimal, capacity: &BigDecimal) -> Option<BigDecimal> {
    if capacity <= &BigDecimal::from(0) {
        return None;
    }
    Some(total_volume.clone() / capacity.clone())
}

pub fn to_kiloliters(liters: &BigDecimal) -> String {
    to_display(liters.clone() / BigDecimal::from(LITERS_PER_KILOLITER))
}

pub fn to_crore_scale(amount: &BigDecimal) -> String {
    to_display(amount.clone() / BigDecimal::from(UNITS_PER_CRORE))
}

fn to_display(value: BigDecimal) -> String {
    value
        .round(DISPLAY_DECIMALS)
        .with_scale(DISPLAY_DECIMALS)
        .to_string()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerRow {
    pub buyer: String,
    pub total_volume: BigDecimal,
    pub total_cost: BigDecimal,
    pub total_volume_kl: String,
    pub total_cost_crore: String,
}

/// Everything the completed-cycles view shows: per-buyer rows, grand totals
/// and progress against the tender capacity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub transaction_count: usize,
    pub buyers: Vec<BuyerRow>,
    pub total_volume: BigDecimal,
    pub total_cost: BigDecimal,
    pub total_volume_kl: String,
    pub total_cost_crore: String,
    pub capacity: BigDecimal,
    pub remaining_volume: BigDecimal,
    pub completion_ratio: Option<BigDecimal>,
}

pub fn build_report(completed: &[Transaction], capacity: &BigDecimal) -> CompletionReport {
    let buyers = aggregate_by_buyer(completed)
        .into_iter()
        .map(|(buyer, totals)| BuyerRow {
            buyer,
            total_volume_kl: to_kiloliters(&totals.total_volume),
            total_cost_crore: to_crore_scale(&totals.total_cost),
            total_volume: totals.total_volume,
            total_cost: totals.total_cost,
        })
        .collect();

    let volume = total_volume(completed);
    let cost = total_cost(completed);

    CompletionReport {
        transaction_count: completed.len(),
        buyers,
        total_volume_kl: to_kiloliters(&volume),
        total_cost_crore: to_crore_scale(&cost),
        remaining_volume: capacity.clone() - volume.clone(),
        completion_ratio: completion_ratio(&volume, capacity).map(|r| r.round(RATIO_DECIMALS)),
        capacity: capacity.clone(),
        total_volume: volume,
        total_cost: cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::NewTransaction;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn tx(buyer: &str, volume: &str, cost: &str) -> Transaction {
        Transaction::new(NewTransaction {
            buyer: buyer.to_string(),
            volume: BigDecimal::from_str(volume).unwrap(),
            cost: BigDecimal::from_str(cost).unwrap(),
            city: "Pune".to_string(),
            feedstock: "UCO".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        })
    }

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn aggregates_same_buyer() {
        let txs = vec![tx("Acme", "1000", "50000"), tx("Acme", "2000", "90000")];

        let totals = aggregate_by_buyer(&txs);

        assert_eq!(totals.len(), 1);
        assert_eq!(totals["Acme"].total_volume, dec("3000"));
        assert_eq!(totals["Acme"].total_cost, dec("140000"));
    }

    #[test]
    fn buyer_match_is_case_sensitive() {
        let txs = vec![tx("Acme", "1", "1"), tx("acme", "2", "2"), tx("Acme ", "3", "3")];

        assert_eq!(aggregate_by_buyer(&txs).len(), 3);
    }

    #[test]
    fn decimal_sums_do_not_drift() {
        let txs = vec![tx("A", "0.1", "0.1"), tx("B", "0.2", "0.2")];

        assert_eq!(total_volume(&txs), dec("0.3"));
        assert_eq!(total_cost(&txs), dec("0.3"));
    }

    #[test]
    fn empty_input_sums_to_zero() {
        assert!(aggregate_by_buyer(&[]).is_empty());
        assert_eq!(total_volume(&[]), BigDecimal::from(0));
        assert_eq!(total_cost(&[]), BigDecimal::from(0));
    }

    #[test]
    fn completion_ratio_bounds() {
        let capacity = dec("30000000");

        assert_eq!(
            completion_ratio(&BigDecimal::from(0), &capacity),
            Some(BigDecimal::from(0))
        );
        assert_eq!(completion_ratio(&capacity, &capacity), Some(BigDecimal::from(1)));
        assert_eq!(completion_ratio(&dec("3000"), &dec("6000")), Some(dec("0.5")));
        assert_eq!(completion_ratio(&dec("3000"), &BigDecimal::from(0)), None);
        assert_eq!(completion_ratio(&dec("3000"), &dec("-1")), None);
    }

    #[test]
    fn display_conversions() {
        assert_eq!(to_kiloliters(&dec("2500")), "2.50");
        assert_eq!(to_crore_scale(&dec("12500000")), "1.25");
        assert_eq!(to_kiloliters(&dec("0")), "0.00");
        assert_eq!(to_kiloliters(&dec("1234")), "1.23");
        assert_eq!(to_crore_scale(&dec("100000000")), "10.00");
    }

    #[test]
    fn report_rolls_up_completed_cycles() {
        let txs = vec![
            tx("Acme", "1000", "50000"),
            tx("Acme", "2000", "90000"),
            tx("Globex", "500", "25000"),
        ];

        let report = build_report(&txs, &dec("30000000"));

        assert_eq!(report.transaction_count, 3);
        assert_eq!(report.buyers.len(), 2);
        assert_eq!(report.buyers[0].buyer, "Acme");
        assert_eq!(report.buyers[0].total_volume_kl, "3.00");
        assert_eq!(report.buyers[0].total_cost_crore, "0.01");
        assert_eq!(report.total_volume, dec("3500"));
        assert_eq!(report.total_cost, dec("165000"));
        assert_eq!(report.remaining_volume, dec("29996500"));
        assert!(report.completion_ratio.is_some());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn shuffling_does_not_change_totals(
            (original, shuffled) in prop::collection::vec(
                (0usize..4, 1u32..1_000_000, 0u32..100, 1u32..100_000_000),
                0..30,
            )
            .prop_flat_map(|entries| (Just(entries.clone()), Just(entries).prop_shuffle()))
        ) {
            let build = |entries: &[(usize, u32, u32, u32)]| -> Vec<Transaction> {
                entries
                    .iter()
                    .map(|(buyer, liters, cents, cost)| {
                        tx(
                            &format!("buyer-{}", buyer),
                            &format!("{}.{:02}", liters, cents),
                            &cost.to_string(),
                        )
                    })
                    .collect()
            };
            let a = build(&original);
            let b = build(&shuffled);

            prop_assert_eq!(aggregate_by_buyer(&a), aggregate_by_buyer(&b));
            prop_assert_eq!(total_volume(&a), total_volume(&b));
            prop_assert_eq!(total_cost(&a), total_cost(&b));
        }
    }
}

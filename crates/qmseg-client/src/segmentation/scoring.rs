use std::collections::HashMap;

use tracing::debug;

use crate::config::ThresholdScope;
use crate::segmentation::cohort::Cohort;
use crate::segmentation::quantile::{composite_score, quantile_set, quartile_rank};
use crate::segmentation::types::{CohortResult, DerivedRecord, QuantileSet, ScoredSalesRecord};

/// Scores one with-sales cohort. Breakpoints always come from the cohort's own
/// members and are fixed before any record is ranked; `scope` only decides
/// which population the ranking pass runs over. Empty cohorts yield `None`.
pub fn score_cohort(
    cohort: &Cohort<'_>,
    population: &[DerivedRecord],
    scope: ThresholdScope,
) -> Option<CohortResult> {
    let quantiles = quantile_set(&cohort.members)?;

    let records = match scope {
        ThresholdScope::PerCohort => cohort
            .members
            .iter()
            .map(|record| rank_record(record, &quantiles))
            .collect::<Vec<ScoredSalesRecord>>(),
        ThresholdScope::GlobalApply => {
            let mut ranked_population = population
                .iter()
                .map(|record| (record.row, rank_record(record, &quantiles)))
                .collect::<HashMap<usize, ScoredSalesRecord>>();
            cohort
                .members
                .iter()
                .filter_map(|record| ranked_population.remove(&record.row))
                .collect::<Vec<ScoredSalesRecord>>()
        }
    };

    debug!(
        cohort = ?cohort.key,
        members = cohort.members.len(),
        scope = scope.as_str(),
        quantity_p50 = quantiles.quantity.p50,
        monetary_p50 = quantiles.monetary_value.p50,
        "scored cohort"
    );

    Some(CohortResult {
        key: cohort.key.clone(),
        quantiles,
        records,
    })
}

fn rank_record(record: &DerivedRecord, quantiles: &QuantileSet) -> ScoredSalesRecord {
    let quantity_quartile = quartile_rank(record.item.quantity, &quantiles.quantity);
    let monetary_quartile = quartile_rank(record.monetary_value, &quantiles.monetary_value);
    ScoredSalesRecord {
        row: record.row,
        item: record.item.clone(),
        monetary_value: record.monetary_value,
        quantity_quartile,
        monetary_quartile,
        score: composite_score(quantity_quartile, monetary_quartile),
    }
}

#[cfg(test)]
mod tests {
    use super::score_cohort;
    use crate::config::ThresholdScope;
    use crate::segmentation::cohort::sales_cohorts;
    use crate::segmentation::derive::derive_profitability;
    use crate::segmentation::types::{CohortKey, ItemRecord};

    fn item(item_no: &str, quantity: f64, profit: f64, department: &str) -> ItemRecord {
        ItemRecord {
            item_no: item_no.to_string(),
            status: "Aktiv".to_string(),
            quantity,
            amount: profit + 100.0,
            cost: 100.0,
            days: 365,
            count: 4,
            department: Some(department.to_string()),
        }
    }

    #[test]
    fn eight_item_cohort_gets_expected_ranks_and_scores() {
        let records = derive_profitability(
            (1..=8)
                .map(|value| {
                    item(
                        &format!("1000{value}"),
                        f64::from(value),
                        f64::from(9 - value) * 10.0,
                        "DRY",
                    )
                })
                .collect(),
        );
        let cohorts = sales_cohorts(&records, false);
        let scored = score_cohort(&cohorts[0], &records, ThresholdScope::PerCohort);
        assert!(scored.is_some());
        if let Some(result) = scored {
            assert_eq!(result.key, CohortKey::All);
            assert_eq!(result.quantiles.quantity.p25, 2.75);
            assert_eq!(result.quantiles.quantity.p50, 4.5);
            assert_eq!(result.quantiles.quantity.p75, 6.25);

            let by_item = |item_no: &str| {
                result
                    .records
                    .iter()
                    .find(|record| record.item.item_no == item_no)
                    .map(|record| (record.quantity_quartile, record.monetary_quartile, record.score))
            };
            // Quantity 2 / profit 70, quantity 5 / profit 40, quantity 7 / profit 20.
            assert_eq!(by_item("10002"), Some((4, 1, 41)));
            assert_eq!(by_item("10005"), Some((2, 3, 23)));
            assert_eq!(by_item("10007"), Some((1, 4, 14)));

            assert!(
                result
                    .records
                    .iter()
                    .all(|record| (11..=44).contains(&record.score))
            );
        }
    }

    #[test]
    fn department_thresholds_do_not_leak_between_cohorts() {
        let records = derive_profitability(vec![
            item("A1", 1.0, 1.0, "SMALL"),
            item("A2", 2.0, 2.0, "SMALL"),
            item("A3", 3.0, 3.0, "SMALL"),
            item("A4", 4.0, 4.0, "SMALL"),
            item("B1", 100.0, 100.0, "LARGE"),
            item("B2", 200.0, 200.0, "LARGE"),
            item("B3", 300.0, 300.0, "LARGE"),
            item("B4", 400.0, 400.0, "LARGE"),
        ]);
        let cohorts = sales_cohorts(&records, true);
        assert_eq!(cohorts.len(), 2);

        for cohort in &cohorts {
            let scored = score_cohort(cohort, &records, ThresholdScope::PerCohort);
            assert!(scored.is_some());
            if let Some(result) = scored {
                let scores = result
                    .records
                    .iter()
                    .map(|record| record.score)
                    .collect::<Vec<u8>>();
                // Each department spreads across all four buckets on its own scale.
                assert_eq!(scores, vec![44, 33, 22, 11]);
            }
        }
    }

    #[test]
    fn global_apply_keeps_only_cohort_rows_aligned_by_source_row() {
        let records = derive_profitability(vec![
            item("A1", 1.0, 5.0, "SMALL"),
            item("B1", 100.0, 500.0, "LARGE"),
            item("A2", 2.0, 6.0, "SMALL"),
            item("B2", 200.0, 600.0, "LARGE"),
            item("A3", 3.0, 7.0, "SMALL"),
            item("A4", 4.0, 8.0, "SMALL"),
        ]);
        let cohorts = sales_cohorts(&records, true);

        for cohort in &cohorts {
            let per_cohort = score_cohort(cohort, &records, ThresholdScope::PerCohort);
            let global = score_cohort(cohort, &records, ThresholdScope::GlobalApply);
            assert!(global.is_some());
            assert_eq!(per_cohort, global);
            if let Some(result) = global {
                assert!(
                    result
                        .records
                        .iter()
                        .all(|record| record.item.department.as_ref()
                            == cohort.key.department().map(str::to_string).as_ref())
                );
                assert_eq!(result.records.len(), cohort.members.len());
            }
        }
    }

    #[test]
    fn all_zero_cohort_is_scored_without_error() {
        let records = derive_profitability(vec![
            item("Z1", 0.0, 0.0, "DRY"),
            item("Z2", 0.0, 0.0, "DRY"),
        ]);
        let cohorts = sales_cohorts(&records, false);
        let scored = score_cohort(&cohorts[0], &records, ThresholdScope::PerCohort);
        assert!(scored.is_some());
        if let Some(result) = scored {
            assert_eq!(result.quantiles.quantity.p75, 0.0);
            assert!(result.records.iter().all(|record| record.score == 44));
        }
    }
}

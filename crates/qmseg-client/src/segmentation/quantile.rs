use crate::segmentation::types::{Breakpoints, DerivedRecord, QuantileLevel, QuantileSet};

/// Quantile of an ascending slice, interpolating linearly between the two
/// closest ranks at position `(n - 1) * q`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let lower_value = sorted[lower];
    let upper_value = sorted[upper.min(sorted.len() - 1)];
    Some(lower_value + (upper_value - lower_value) * (position - lower as f64))
}

pub fn breakpoints(values: &[f64]) -> Option<Breakpoints> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|left, right| left.total_cmp(right));
    Some(Breakpoints {
        p25: quantile_sorted(&sorted, QuantileLevel::P25.fraction())?,
        p50: quantile_sorted(&sorted, QuantileLevel::P50.fraction())?,
        p75: quantile_sorted(&sorted, QuantileLevel::P75.fraction())?,
    })
}

/// Breakpoints of both measures over one cohort. `None` for an empty cohort.
pub fn quantile_set(records: &[&DerivedRecord]) -> Option<QuantileSet> {
    let quantities = records
        .iter()
        .map(|record| record.item.quantity)
        .collect::<Vec<f64>>();
    let monetary_values = records
        .iter()
        .map(|record| record.monetary_value)
        .collect::<Vec<f64>>();
    Some(QuantileSet {
        quantity: breakpoints(&quantities)?,
        monetary_value: breakpoints(&monetary_values)?,
    })
}

/// Bucket 4 holds values at or below the 25th percentile, bucket 1 values
/// above the 75th.
pub fn quartile_rank(value: f64, breakpoints: &Breakpoints) -> u8 {
    if value <= breakpoints.p25 {
        4
    } else if value <= breakpoints.p50 {
        3
    } else if value <= breakpoints.p75 {
        2
    } else {
        1
    }
}

pub fn composite_score(quantity_quartile: u8, monetary_quartile: u8) -> u8 {
    quantity_quartile * 10 + monetary_quartile
}

use crate::config::SegmentationSettings;
use crate::segmentation::types::{DerivedRecord, ScoredNoSalesRecord};

pub const DISCONTINUED_SCORE: u8 = 0;
pub const STALE_SCORE: u8 = 1;
pub const RECENT_SCORE: u8 = 2;

/// Discontinued items score 0 whatever their age; otherwise items older than
/// `stale_days` score 1 and newer ones 2.
pub fn no_sales_score(status: &str, days: i64, settings: &SegmentationSettings) -> u8 {
    if status == settings.discontinued_marker {
        return DISCONTINUED_SCORE;
    }
    if days > settings.stale_days {
        STALE_SCORE
    } else {
        RECENT_SCORE
    }
}

pub fn score_no_sales(
    without_sales: Vec<DerivedRecord>,
    settings: &SegmentationSettings,
) -> Vec<ScoredNoSalesRecord> {
    without_sales
        .into_iter()
        .map(|record| ScoredNoSalesRecord {
            row: record.row,
            score: no_sales_score(&record.item.status, record.item.days, settings),
            item: record.item,
        })
        .collect()
}

// Aggregator
// Collapses filtered rows into one summary per contract. Reduction rules per
// column: total = max (the per-contract figure repeats across rows and some
// duplicates carry a blank/zero), exercised and pending = sum (per-row
// contributions), percent fields = first observed.

use crate::normalize::ContractRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// AGGREGATED CONTRACT
// ============================================================================

/// One row of the dashboard table: a distinct (contract number, description)
/// pair within the filtered set. Ephemeral: recomputed on every filter
/// change, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedContract {
    pub contract_no: String,
    pub description: String,
    pub total: f64,
    pub exercised: f64,
    pub pending: f64,
    pub pct_paid: f64,
    pub pct_pending: f64,
    /// Source rows collapsed into this group.
    pub row_count: usize,
}

/// Group the filtered rows by (contract number, description). Groups keep the
/// order in which their first row appeared; max and sum are order-independent
/// and the normalizer preserves source order for the first-seen percents.
pub fn aggregate(rows: &[ContractRecord]) -> Vec<AggregatedContract> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut groups: Vec<AggregatedContract> = Vec::new();

    for row in rows {
        let key = (row.contract_no.clone(), row.description.clone());
        match index.get(&key) {
            Some(&i) => {
                let group = &mut groups[i];
                group.total = group.total.max(row.total);
                group.exercised += row.exercised;
                group.pending += row.pending;
                group.row_count += 1;
            }
            None => {
                index.insert(key, groups.len());
                groups.push(AggregatedContract {
                    contract_no: row.contract_no.clone(),
                    description: row.description.clone(),
                    total: row.total,
                    exercised: row.exercised,
                    pending: row.pending,
                    pct_paid: row.pct_paid,
                    pct_pending: row.pct_pending,
                    row_count: 1,
                });
            }
        }
    }

    groups
}

// ============================================================================
// SUMMARY TOTALS
// ============================================================================

/// Filtered-set totals for the metric tiles. Sums the already-deduplicated
/// per-contract figures, so repeated total rows do not double-count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub total: f64,
    pub exercised: f64,
    pub pending: f64,
}

pub fn summary_totals(groups: &[AggregatedContract]) -> SummaryTotals {
    groups.iter().fold(SummaryTotals::default(), |acc, g| {
        SummaryTotals {
            total: acc.total + g.total,
            exercised: acc.exercised + g.exercised,
            pending: acc.pending + g.pending,
        }
    })
}

// ============================================================================
// TESTS
// ============================================================================

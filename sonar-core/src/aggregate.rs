//! Ordering and tallying of a job's collected results.

use sonar_scanner::{Priority, TargetResult};

/// Reachable before unreachable, then High, Medium, Low.
///
/// The sort is stable: results with the same key keep completion order.
pub fn order_results(results: &mut [TargetResult]) {
    results.sort_by_key(|result| (!result.reachable, result.priority.rank()));
}

/// Integer percentage of `processed` over `total`, rounded down
pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (processed.min(total) * 100 / total) as u8
}

/// Counts shown at the end of a job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultSummary {
    pub total: usize,
    pub reachable: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ResultSummary {
    pub fn from_results(results: &[TargetResult]) -> Self {
        let mut summary = ResultSummary {
            total: results.len(),
            ..Default::default()
        };

        for result in results.iter().filter(|r| r.reachable) {
            summary.reachable += 1;
            match result.priority {
                Priority::High => summary.high += 1,
                Priority::Medium => summary.medium += 1,
                Priority::Low => summary.low += 1,
            }
        }
        summary
    }
}

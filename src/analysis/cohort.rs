//! Cohort retention matrix with right-censoring marks.
//!
//! The most recent calendar period in the data is usually only partly
//! elapsed, so any cell that lands on or after it undercounts retention.
//! Such cells are flagged `is_truncated` for the display to set apart.

use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::types::{CohortMatrix, CohortMatrixCell, CohortRow};
use crate::utils::{percent_of, YearMonth};

struct CohortStats {
    size: u64,
    has_follow_up: bool,
}

/// Build the retention matrix for `YYYY-MM` cohorts.
///
/// A cohort's lag `n` maps to the calendar month `n` months after the
/// cohort month.
pub fn build_cohort_matrix(rows: &[CohortRow], min_cohort_size: u64) -> Result<CohortMatrix> {
    build_cohort_matrix_with(rows, min_cohort_size, |cohort, lag| {
        let start: YearMonth = cohort.parse()?;
        Ok(start.add_months(lag))
    })
}

/// Build the retention matrix with a caller-supplied mapping from
/// `(cohort, lag)` to the calendar period it observes.
///
/// * A cohort is kept when its size is at least `min_cohort_size` and it
///   has at least one row with `lag >= 1`.
/// * `max_lag` is the largest lag among kept cohorts' rows.
/// * Missing `(cohort, lag)` observations become `value: None` gaps.
/// * Every cell's percentage is taken against the cohort's single size,
///   the largest one its rows report.
/// * The censoring boundary is the latest period mapped from *any* row,
///   kept or not; observed cells at or past it are truncated.
pub fn build_cohort_matrix_with<P, F>(
    rows: &[CohortRow],
    min_cohort_size: u64,
    observation_period: F,
) -> Result<CohortMatrix>
where
    P: Ord,
    F: Fn(&str, u32) -> Result<P>,
{
    let mut boundary: Option<P> = None;
    for row in rows {
        let period = observation_period(&row.cohort_key, row.lag)?;
        if boundary.as_ref().map_or(true, |b| period > *b) {
            boundary = Some(period);
        }
    }
    let Some(boundary) = boundary else {
        return Ok(CohortMatrix::default());
    };

    let mut stats: BTreeMap<&str, CohortStats> = BTreeMap::new();
    let mut observed: HashMap<(&str, u32), &CohortRow> = HashMap::new();
    for row in rows {
        let entry = stats.entry(row.cohort_key.as_str()).or_insert(CohortStats {
            size: row.cohort_size,
            has_follow_up: false,
        });
        if entry.size != row.cohort_size {
            warn!(
                "cohort {} reports sizes {} and {}; using the larger",
                row.cohort_key, entry.size, row.cohort_size
            );
            entry.size = entry.size.max(row.cohort_size);
        }
        entry.has_follow_up |= row.lag >= 1;

        if observed.insert((row.cohort_key.as_str(), row.lag), row).is_some() {
            warn!(
                "duplicate retention row for cohort {} lag {}; keeping the last",
                row.cohort_key, row.lag
            );
        }
    }

    let cohorts: Vec<&str> = stats
        .iter()
        .filter(|(_, s)| s.size >= min_cohort_size && s.has_follow_up)
        .map(|(cohort, _)| *cohort)
        .collect();

    let max_lag = rows
        .iter()
        .filter(|r| cohorts.contains(&r.cohort_key.as_str()))
        .map(|r| r.lag)
        .max()
        .unwrap_or(0);

    let mut matrix = Vec::with_capacity(cohorts.len());
    for &cohort in &cohorts {
        let size = stats.get(cohort).map_or(0, |s| s.size);
        let mut series = Vec::with_capacity(max_lag as usize + 1);
        for lag in 0..=max_lag {
            let cell = match observed.get(&(cohort, lag)) {
                Some(row) => CohortMatrixCell {
                    cohort_key: cohort.to_string(),
                    lag,
                    value: Some(percent_of(row.retained_count as f64, size as f64)),
                    is_truncated: observation_period(cohort, lag)? >= boundary,
                    retained_count: Some(row.retained_count),
                    cohort_size: size,
                },
                None => CohortMatrixCell {
                    cohort_key: cohort.to_string(),
                    lag,
                    value: None,
                    is_truncated: false,
                    retained_count: None,
                    cohort_size: size,
                },
            };
            series.push(cell);
        }
        matrix.push(series);
    }

    debug!(
        "cohort matrix: {} of {} cohorts kept, max lag {}",
        cohorts.len(),
        stats.len(),
        max_lag
    );

    Ok(CohortMatrix {
        cohorts: cohorts.into_iter().map(str::to_string).collect(),
        max_lag,
        matrix,
    })
}

/// The censoring boundary of `YYYY-MM` cohort rows, as a `YYYY-MM` key.
pub fn last_observed_month(rows: &[CohortRow]) -> Result<Option<YearMonth>> {
    let mut last: Option<YearMonth> = None;
    for row in rows {
        let month = row.cohort_key.parse::<YearMonth>()?.add_months(row.lag);
        last = Some(last.map_or(month, |l| l.max(month)));
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatsError;
    use pretty_assertions::assert_eq;

    fn row(cohort: &str, lag: u32, retained: u64, size: u64) -> CohortRow {
        CohortRow {
            cohort_key: cohort.to_string(),
            lag,
            retained_count: retained,
            cohort_size: size,
        }
    }

    fn sample() -> Vec<CohortRow> {
        vec![
            row("2025-11", 0, 40, 40),
            row("2025-11", 1, 10, 40),
            row("2025-11", 2, 4, 40),
            row("2025-12", 0, 20, 20),
            row("2025-12", 1, 5, 20),
        ]
    }

    #[test]
    fn test_truncation_boundary() {
        let matrix = build_cohort_matrix(&sample(), 10).unwrap();
        assert_eq!(matrix.cohorts, vec!["2025-11", "2025-12"]);
        assert_eq!(matrix.max_lag, 2);

        assert!(!matrix.cell("2025-11", 1).unwrap().is_truncated);
        assert!(matrix.cell("2025-11", 2).unwrap().is_truncated);
        assert!(matrix.cell("2025-12", 1).unwrap().is_truncated);
        assert!(!matrix.cell("2025-12", 0).unwrap().is_truncated);

        let gap = matrix.cell("2025-12", 2).unwrap();
        assert_eq!(gap.value, None);
        assert!(!gap.is_truncated);
    }

    #[test]
    fn test_retention_values() {
        let matrix = build_cohort_matrix(&sample(), 10).unwrap();
        assert_eq!(matrix.cell("2025-11", 0).unwrap().value, Some(100.0));
        assert_eq!(matrix.cell("2025-11", 1).unwrap().value, Some(25.0));
        assert_eq!(matrix.cell("2025-12", 1).unwrap().retained_count, Some(5));
        assert!(matrix.matrix.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn test_conflicting_sizes_share_one_denominator() {
        let rows = vec![
            row("2025-10", 0, 40, 40),
            row("2025-10", 1, 10, 50),
            row("2025-10", 2, 5, 40),
            row("2025-11", 0, 1, 1),
        ];
        let matrix = build_cohort_matrix(&rows, 10).unwrap();
        for cell in &matrix.matrix[0] {
            assert_eq!(cell.cohort_size, 50);
            let expected = percent_of(cell.retained_count.unwrap() as f64, 50.0);
            assert_eq!(cell.value, Some(expected));
        }
        assert_eq!(matrix.cell("2025-10", 0).unwrap().value, Some(80.0));
        assert_eq!(matrix.cell("2025-10", 2).unwrap().value, Some(10.0));
    }

    #[test]
    fn test_small_cohort_excluded() {
        let mut rows = sample();
        rows.push(row("2025-10", 0, 5, 5));
        rows.push(row("2025-10", 1, 3, 5));
        let matrix = build_cohort_matrix(&rows, 10).unwrap();
        assert!(!matrix.cohorts.contains(&"2025-10".to_string()));
    }

    #[test]
    fn test_cohort_without_follow_up_excluded() {
        let mut rows = sample();
        rows.push(row("2026-01", 0, 50, 50));
        let matrix = build_cohort_matrix(&rows, 10).unwrap();
        assert_eq!(matrix.cohorts, vec!["2025-11", "2025-12"]);
    }

    #[test]
    fn test_excluded_rows_still_move_boundary() {
        // 2026-01 has no follow-up, but its lag-0 row is still the latest observation.
        let rows = vec![
            row("2025-10", 0, 30, 30),
            row("2025-10", 1, 9, 30),
            row("2026-01", 0, 50, 50),
        ];
        let matrix = build_cohort_matrix(&rows, 10).unwrap();
        assert!(!matrix.cell("2025-10", 1).unwrap().is_truncated);
        assert_eq!(last_observed_month(&rows).unwrap().unwrap().to_string(), "2026-01");
    }

    #[test]
    fn test_gap_is_not_interpolated() {
        let rows = vec![row("2025-06", 0, 20, 20), row("2025-06", 2, 4, 20)];
        let matrix = build_cohort_matrix(&rows, 10).unwrap();
        let cell = matrix.cell("2025-06", 1).unwrap();
        assert_eq!(cell.value, None);
        assert_eq!(cell.retained_count, None);
        assert_eq!(matrix.cell("2025-06", 2).unwrap().value, Some(20.0));
    }

    #[test]
    fn test_empty_input() {
        let matrix = build_cohort_matrix(&[], 10).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.max_lag, 0);
    }

    #[test]
    fn test_malformed_cohort_key() {
        let rows = vec![row("Nov 2025", 0, 1, 1)];
        assert!(matches!(
            build_cohort_matrix(&rows, 1),
            Err(StatsError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_custom_period_mapping() {
        // Integer week cohorts: period = cohort + lag.
        let rows = vec![row("10", 0, 12, 12), row("10", 1, 6, 12), row("11", 0, 12, 12)];
        let matrix = build_cohort_matrix_with(&rows, 1, |cohort, lag| {
            cohort
                .parse::<u32>()
                .map(|c| c + lag)
                .map_err(|_| StatsError::InvalidFormat {
                    value: cohort.to_string(),
                    expected: "integer week",
                })
        })
        .unwrap();
        assert_eq!(matrix.cohorts, vec!["10"]);
        assert!(matrix.cell("10", 1).unwrap().is_truncated);
    }
}

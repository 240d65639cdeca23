//! Sorting and top-N selection shared by every ranked chart.
//!
//! Sorts are stable: rows with equal metrics keep their input order. Callers
//! that need a deterministic tie-break over unordered input must pre-sort by
//! a secondary key.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first; horizontal bar charts draw the last row on top
    Ascending,
    Descending,
}

fn compare(a: f64, b: f64, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => a.total_cmp(&b),
        SortDirection::Descending => b.total_cmp(&a),
    }
}

/// A copy of `rows` stably sorted by `metric`.
pub fn sort_by_metric<T, F>(rows: &[T], metric: F, direction: SortDirection) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> f64,
{
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| compare(metric(a), metric(b), direction));
    sorted
}

/// The `n` rows with the largest `metric`, returned in `direction` order.
pub fn top_n<T, F>(rows: &[T], metric: F, n: usize, direction: SortDirection) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> f64,
{
    let mut top = sort_by_metric(rows, &metric, SortDirection::Descending);
    top.truncate(n);
    if direction == SortDirection::Ascending {
        top.sort_by(|a, b| compare(metric(a), metric(b), direction));
    }
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows() -> Vec<(&'static str, f64)> {
        vec![("a", 3.0), ("b", 10.0), ("c", 1.0), ("d", 10.0), ("e", 5.0)]
    }

    #[test]
    fn test_sort_ascending_is_stable() {
        let sorted = sort_by_metric(&rows(), |r| r.1, SortDirection::Ascending);
        let names: Vec<_> = sorted.iter().map(|r| r.0).collect();
        assert_eq!(names, vec!["c", "a", "e", "b", "d"]);
    }

    #[test]
    fn test_top_n_descending() {
        let top = top_n(&rows(), |r| r.1, 3, SortDirection::Descending);
        let names: Vec<_> = top.iter().map(|r| r.0).collect();
        assert_eq!(names, vec!["b", "d", "e"]);
    }

    #[test]
    fn test_top_n_ascending_for_horizontal_bars() {
        let top = top_n(&rows(), |r| r.1, 3, SortDirection::Ascending);
        let names: Vec<_> = top.iter().map(|r| r.0).collect();
        assert_eq!(names, vec!["e", "b", "d"]);
    }

    #[test]
    fn test_top_n_larger_than_input() {
        let top = top_n(&rows(), |r| r.1, 50, SortDirection::Descending);
        assert_eq!(top.len(), 5);
        assert!(top_n(&Vec::<(&str, f64)>::new(), |r| r.1, 3, SortDirection::Ascending).is_empty());
    }
}

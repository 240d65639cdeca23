use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::percent_of;
use crate::types::{CategoryBucket, CountedRow, ShareRow};

/// Placeholder the pipeline writes for an unresolved key (e.g. an unknown country).
pub const UNKNOWN_KEY: &str = "-";

/// Whether `key` is the sentinel for "unknown".
///
/// Rows with this key are dropped from rollups entirely rather than
/// landing in the default bucket.
pub fn is_unknown_key(key: &str, sentinel: &str) -> bool {
    key.trim() == sentinel
}

/// Roll counted rows up into buckets.
///
/// Rows keyed by [`UNKNOWN_KEY`] are filtered out first. Every other row
/// goes to `bucket_of(key)`, or to `default_bucket` when the lookup yields
/// nothing, so the bucket total equals the total of the kept rows. Buckets
/// come back in order of first occurrence.
pub fn rollup<F, S>(rows: &[CountedRow], bucket_of: F, default_bucket: &str) -> Vec<CategoryBucket>
where
    F: Fn(&str) -> Option<S>,
    S: AsRef<str>,
{
    rollup_excluding(rows, bucket_of, default_bucket, UNKNOWN_KEY)
}

/// [`rollup`] with a caller-chosen sentinel key.
pub fn rollup_excluding<F, S>(
    rows: &[CountedRow],
    bucket_of: F,
    default_bucket: &str,
    sentinel: &str,
) -> Vec<CategoryBucket>
where
    F: Fn(&str) -> Option<S>,
    S: AsRef<str>,
{
    let mut buckets: Vec<CategoryBucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows.iter().filter(|r| !is_unknown_key(&r.key, sentinel)) {
        let name = match bucket_of(&row.key) {
            Some(bucket) => bucket.as_ref().to_string(),
            None => default_bucket.to_string(),
        };
        match index.get(&name) {
            Some(&i) => buckets[i].value += row.count,
            None => {
                index.insert(name.clone(), buckets.len());
                buckets.push(CategoryBucket {
                    name,
                    value: row.count,
                });
            }
        }
    }

    buckets
}

/// A static `key -> bucket` lookup, e.g. country code to world region.
///
/// Passed explicitly into rollups; the crate holds no global tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketTable {
    pub buckets: BTreeMap<String, String>,
    pub default_bucket: String,
}

impl BucketTable {
    pub fn new(default_bucket: impl Into<String>) -> Self {
        Self {
            buckets: BTreeMap::new(),
            default_bucket: default_bucket.into(),
        }
    }

    /// Build a table where every key in a group maps to that group's bucket.
    pub fn from_groups<'a, I>(default_bucket: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [&'a str])>,
    {
        let mut table = Self::new(default_bucket);
        for (bucket, keys) in groups {
            for key in keys {
                table.buckets.insert((*key).to_string(), bucket.to_string());
            }
        }
        table
    }

    pub fn bucket_of(&self, key: &str) -> Option<&str> {
        self.buckets.get(key).map(String::as_str)
    }

    pub fn rollup(&self, rows: &[CountedRow], sentinel: &str) -> Vec<CategoryBucket> {
        rollup_excluding(rows, |k| self.bucket_of(k), &self.default_bucket, sentinel)
    }
}

/// Attach each row's percentage of the total.
pub fn with_shares(rows: &[CountedRow]) -> Vec<ShareRow> {
    let total: u64 = rows.iter().map(|r| r.count).sum();
    rows.iter()
        .map(|r| ShareRow {
            name: r.key.clone(),
            value: r.count,
            pct: percent_of(r.count as f64, total as f64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn regions() -> BucketTable {
        BucketTable::from_groups(
            "Other",
            [
                ("Americas", &["US", "CA", "BR"][..]),
                ("Europe", &["DE", "FR"][..]),
            ],
        )
    }

    #[test]
    fn test_rollup_insertion_order() {
        let rows = vec![
            CountedRow::new("DE", 5),
            CountedRow::new("US", 10),
            CountedRow::new("FR", 2),
            CountedRow::new("CA", 1),
        ];
        let result = regions().rollup(&rows, UNKNOWN_KEY);
        assert_eq!(
            result,
            vec![
                CategoryBucket { name: "Europe".to_string(), value: 7 },
                CategoryBucket { name: "Americas".to_string(), value: 11 },
            ]
        );
    }

    #[test]
    fn test_unmapped_keys_go_to_default_bucket() {
        let rows = vec![CountedRow::new("JP", 4), CountedRow::new("US", 1)];
        let result = regions().rollup(&rows, UNKNOWN_KEY);
        assert_eq!(result[0], CategoryBucket { name: "Other".to_string(), value: 4 });
    }

    #[test]
    fn test_sentinel_rows_are_excluded() {
        let rows = vec![CountedRow::new("-", 1000), CountedRow::new("ZZ", 3)];
        let result = regions().rollup(&rows, UNKNOWN_KEY);
        assert_eq!(result, vec![CategoryBucket { name: "Other".to_string(), value: 3 }]);
    }

    #[test]
    fn test_empty_input() {
        let result = rollup(&[], |_: &str| None::<&str>, "Other");
        assert!(result.is_empty());
    }

    #[test]
    fn test_rollup_with_closure() {
        let rows = vec![CountedRow::new("click", 3), CountedRow::new("hover", 2)];
        let result = rollup(&rows, |_| Some("Interaction"), "Other");
        assert_eq!(result, vec![CategoryBucket { name: "Interaction".to_string(), value: 5 }]);
    }

    #[test]
    fn test_with_shares() {
        let rows = vec![CountedRow::new("a", 1), CountedRow::new("b", 3)];
        let shares = with_shares(&rows);
        assert_eq!(shares[0].pct, 25.0);
        assert_eq!(shares[1].pct, 75.0);
        assert!(with_shares(&[CountedRow::new("z", 0)])[0].pct == 0.0);
    }
}

mod aggregation;
mod format;
mod ratio;
mod selection;

pub use aggregation::{is_unknown_key, rollup, rollup_excluding, with_shares, BucketTable, UNKNOWN_KEY};
pub use format::{format_compact, format_count, format_month, format_month_long, format_pct, YearMonth};
pub use ratio::{percent_of, round_to, safe_ratio};
pub use selection::{sort_by_metric, top_n, SortDirection};

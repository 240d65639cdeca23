mod cache;
pub mod cohort;
pub mod flow;
pub mod funnel;
pub mod insights;
pub mod traffic;


pub use cache::ReportCache;
pub use cohort::{build_cohort_matrix, build_cohort_matrix_with, last_observed_month};
pub use flow::{build_flow, split_scaled, FlowBranch, FlowGraph, FlowScale, DEFAULT_EXPONENT};
pub use funnel::{request_funnel, RequestFunnel};
pub use traffic::{monthly_error_trend, overview_stats, region_shares, top_countries, tool_ranking, OverviewStats};

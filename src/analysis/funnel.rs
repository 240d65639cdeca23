//! The request funnel: how every logged request breaks down into human
//! tool visits, supporting infrastructure requests and automated traffic.

use log::{debug, warn};
use serde::Serialize;

use super::flow::{build_flow, FlowBranch, FlowGraph, FlowScale};
use crate::data::{RequestTypeRow, ToolVisitRow, TrafficTypeRow};
use crate::error::Result;
use crate::utils::{round_to, safe_ratio};

pub const HUMAN_TRAFFIC: &str = "Likely Human";
pub const BOT_TRAFFIC: &str = "Bot";
pub const AI_TRAFFIC: &str = "AI-Assistant / Bot";

pub const ALL_REQUESTS: &str = "All Requests";
pub const NON_HUMAN: &str = "Non-Human";
pub const INFRA_REQUESTS: &str = "Infra Requests";
pub const TOOL_VISITS: &str = "Tool Visits";
pub const BOT_CRAWLERS: &str = "Bot Crawlers";
pub const AI_ASSISTANT_BOT: &str = "AI-Assistant Bot";

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFunnel {
    pub graph: FlowGraph,
    /// Human requests per tool visit, rounded to a whole number
    pub overhead_ratio: f64,
    pub human_requests: u64,
    pub infra_requests: u64,
    pub non_human_requests: u64,
}

/// Count of one traffic category, zero when the pipeline omitted it.
pub fn traffic_count(traffic: &[TrafficTypeRow], category: &str) -> u64 {
    match traffic.iter().find(|t| t.traffic_type == category) {
        Some(row) => row.count,
        None => {
            warn!("traffic category {:?} missing, counting it as zero", category);
            0
        }
    }
}

/// Human requests per tool visit.
pub fn overhead_ratio(human_requests: u64, total_visits: u64) -> f64 {
    round_to(safe_ratio(human_requests as f64, total_visits as f64), 0)
}

/// Build the four-level request funnel.
///
/// ```text
/// All Requests ─┬─ Likely Human ─┬─ Infra Requests ── request types
///               │                └─ Tool Visits ───── tools
///               └─ Non-Human ────┬─ Bot Crawlers
///                                └─ AI-Assistant Bot
/// ```
///
/// Infra requests are the human requests that were not tool visits,
/// clamped at zero. Every level splits its parent with `scale`. With no
/// requests, visits or request types the funnel is empty.
pub fn request_funnel(
    traffic: &[TrafficTypeRow],
    total_visits: u64,
    tool_visits: &[ToolVisitRow],
    request_types: &[RequestTypeRow],
    scale: FlowScale,
) -> Result<RequestFunnel> {
    let total: u64 = traffic.iter().map(|t| t.count).sum();
    if total == 0 && total_visits == 0 && request_types.is_empty() {
        debug!("no request data, request funnel left empty");
        return Ok(RequestFunnel::default());
    }
    let human = traffic_count(traffic, HUMAN_TRAFFIC);
    let bot = traffic_count(traffic, BOT_TRAFFIC);
    let ai = traffic_count(traffic, AI_TRAFFIC);
    let non_human = bot + ai;
    let infra = human.saturating_sub(total_visits);

    if human + non_human != total {
        debug!(
            "{} requests fall outside the funnel's traffic categories",
            total.saturating_sub(human + non_human)
        );
    }

    let tree = FlowBranch::new(
        ALL_REQUESTS,
        total as f64,
        vec![
            FlowBranch::new(
                HUMAN_TRAFFIC,
                human as f64,
                vec![
                    FlowBranch::new(
                        INFRA_REQUESTS,
                        infra as f64,
                        request_types
                            .iter()
                            .map(|r| FlowBranch::leaf(r.request_type.clone(), r.count as f64))
                            .collect(),
                    ),
                    FlowBranch::new(
                        TOOL_VISITS,
                        total_visits as f64,
                        tool_visits
                            .iter()
                            .map(|t| FlowBranch::leaf(t.tool.clone(), t.visits as f64))
                            .collect(),
                    ),
                ],
            ),
            FlowBranch::new(
                NON_HUMAN,
                non_human as f64,
                vec![
                    FlowBranch::leaf(BOT_CRAWLERS, bot as f64),
                    FlowBranch::leaf(AI_ASSISTANT_BOT, ai as f64),
                ],
            ),
        ],
    );

    Ok(RequestFunnel {
        graph: build_flow(&tree, scale)?,
        overhead_ratio: overhead_ratio(human, total_visits),
        human_requests: human,
        infra_requests: infra,
        non_human_requests: non_human,
    })
}

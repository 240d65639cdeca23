//! Weighted flow normalization for layered flow (sankey) diagrams.
//!
//! Raw counts can span several orders of magnitude, which would make small
//! branches invisible. Drawn widths therefore follow a concave transform of
//! the true counts (square root by default). The root gets the transform of
//! its own total; every level below splits its parent's already-scaled
//! value among the children in proportion to the transform of each child's
//! actual count. The transform is never applied twice, and siblings always
//! sum to their parent's scaled value.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::error::{Result, StatsError};
use crate::types::{FlowLink, FlowNode};
use crate::utils::percent_of;

pub const DEFAULT_EXPONENT: f64 = 0.5;

/// The concave transform used to turn actual counts into visual weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowScale {
    exponent: f64,
}

impl FlowScale {
    /// A power transform `x^exponent`, with `exponent` in `(0, 1]`.
    pub fn new(exponent: f64) -> Result<Self> {
        if !exponent.is_finite() || exponent <= 0.0 || exponent > 1.0 {
            return Err(StatsError::InvalidConfig(format!(
                "flow exponent must be in (0, 1], got {exponent}"
            )));
        }
        Ok(Self { exponent })
    }

    pub fn sqrt() -> Self {
        Self {
            exponent: DEFAULT_EXPONENT,
        }
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    /// Visual weight of one actual count. Negative and `NaN` counts clamp to zero.
    pub fn weight(&self, actual: f64) -> f64 {
        let actual = actual.max(0.0);
        if self.exponent == DEFAULT_EXPONENT {
            actual.sqrt()
        } else {
            actual.powf(self.exponent)
        }
    }

    /// Scaled value of a root node: the absolute transform of its total.
    pub fn root_value(&self, total_actual: f64) -> f64 {
        self.weight(total_actual)
    }

    /// Split `parent_scaled` among children in proportion to their weights.
    ///
    /// All-zero children get all-zero values. A single child with a positive
    /// count receives `parent_scaled` unchanged.
    pub fn split(&self, parent_scaled: f64, child_actuals: &[f64]) -> Vec<f64> {
        let weights: Vec<f64> = child_actuals.iter().map(|&v| self.weight(v)).collect();
        let total_weight: f64 = weights.iter().sum();

        if !(total_weight > 0.0) {
            return vec![0.0; child_actuals.len()];
        }
        if weights.len() == 1 {
            return vec![parent_scaled];
        }

        weights
            .iter()
            .map(|w| w / total_weight * parent_scaled)
            .collect()
    }
}

impl Default for FlowScale {
    fn default() -> Self {
        Self::sqrt()
    }
}

/// Square-root weighted split of a parent's scaled value.
pub fn split_scaled(parent_scaled: f64, child_actuals: &[f64]) -> Vec<f64> {
    FlowScale::sqrt().split(parent_scaled, child_actuals)
}

/// One node of the input hierarchy, carrying only true counts.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowBranch {
    pub name: String,
    pub actual: f64,
    pub children: Vec<FlowBranch>,
}

impl FlowBranch {
    pub fn new(name: impl Into<String>, actual: f64, children: Vec<FlowBranch>) -> Self {
        Self {
            name: name.into(),
            actual,
            children,
        }
    }

    pub fn leaf(name: impl Into<String>, actual: f64) -> Self {
        Self::new(name, actual, Vec::new())
    }
}

/// Nodes and links ready for a layered flow diagram.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FlowGraph {
    /// Ordered by depth, then by sibling order
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

impl FlowGraph {
    pub fn node(&self, name: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn link(&self, source: &str, target: &str) -> Option<&FlowLink> {
        self.links
            .iter()
            .find(|l| l.source == source && l.target == target)
    }

    /// Sum of scaled values leaving `source`.
    pub fn outflow(&self, source: &str) -> f64 {
        self.links
            .iter()
            .filter(|l| l.source == source)
            .map(|l| l.value)
            .sum()
    }

    /// Sum of scaled values of all nodes at `depth`.
    pub fn depth_total(&self, depth: u32) -> f64 {
        self.nodes
            .iter()
            .filter(|n| n.depth == depth)
            .map(|n| n.value)
            .sum()
    }

    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

/// Lay out a hierarchy as a flow graph.
///
/// Node names must be unique across the whole tree because the rendering
/// layer identifies nodes by name.
pub fn build_flow(root: &FlowBranch, scale: FlowScale) -> Result<FlowGraph> {
    let grand_total = root.actual;
    let mut graph = FlowGraph::default();
    let mut seen: HashSet<&str> = HashSet::new();

    let root_value = scale.root_value(root.actual);
    seen.insert(root.name.as_str());
    graph.nodes.push(FlowNode {
        name: root.name.clone(),
        depth: 0,
        value: root_value,
        actual_value: root.actual,
        pct_of_total: percent_of(root.actual, grand_total),
    });

    let mut queue: VecDeque<(&FlowBranch, f64, u32)> = VecDeque::new();
    queue.push_back((root, root_value, 0));

    while let Some((branch, value, depth)) = queue.pop_front() {
        let actuals: Vec<f64> = branch.children.iter().map(|c| c.actual).collect();
        let scaled = scale.split(value, &actuals);

        for (child, child_value) in branch.children.iter().zip(scaled) {
            if !seen.insert(child.name.as_str()) {
                return Err(StatsError::DuplicateFlowNode(child.name.clone()));
            }
            graph.nodes.push(FlowNode {
                name: child.name.clone(),
                depth: depth + 1,
                value: child_value,
                actual_value: child.actual,
                pct_of_total: percent_of(child.actual, grand_total),
            });
            graph.links.push(FlowLink {
                source: branch.name.clone(),
                target: child.name.clone(),
                value: child_value,
                actual_value: child.actual,
            });
            queue.push_back((child, child_value, depth + 1));
        }
    }

    debug!(
        "built flow graph: {} nodes, {} links, root {} (scaled {:.3})",
        graph.nodes.len(),
        graph.links.len(),
        root.name,
        root_value
    );

    Ok(graph)
}

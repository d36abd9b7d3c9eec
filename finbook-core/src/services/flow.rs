//! Flow service - income/expense flow summary for the sankey chart

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;

/// Aggregated absolute total for one category on one side of the flow
#[derive(Debug, Clone)]
pub struct CategoryFlowTotal {
    pub name: String,
    pub is_income: bool,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowNode {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowLink {
    pub source: String,
    pub target: String,
    pub value: Decimal,
}

/// Nodes and links feeding the dashboard's sankey chart
#[derive(Debug, Clone, Serialize)]
pub struct FlowSummary {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

/// Central node every flow passes through
const CENTER_NODE: &str = "Total Income";

/// Flow summary aggregation
pub struct FlowService {
    repository: Arc<DuckDbRepository>,
}

impl FlowService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Build the income -> Total Income -> expenses flow graph.
    ///
    /// Income and expense totals are kept separate even when a category
    /// has both; a name on both sides gets an "(Income)" suffix on the
    /// income node since sankey nodes are identified by name. Income left
    /// over after expenses flows to an "Excess" node.
    pub fn summary(&self) -> Result<FlowSummary> {
        let totals = self.repository.get_category_flow_totals()?;

        let income: Vec<&CategoryFlowTotal> = totals.iter().filter(|t| t.is_income).collect();
        let expenses: Vec<&CategoryFlowTotal> = totals.iter().filter(|t| !t.is_income).collect();

        let total_income: Decimal = income.iter().map(|t| t.value).sum();
        let total_expenses: Decimal = expenses.iter().map(|t| t.value).sum();

        let mut nodes = vec![FlowNode {
            name: CENTER_NODE.to_string(),
        }];
        let mut links = Vec::new();

        for t in &income {
            let node_name = if expenses.iter().any(|e| e.name == t.name) {
                format!("{} (Income)", t.name)
            } else {
                t.name.clone()
            };
            nodes.push(FlowNode {
                name: node_name.clone(),
            });
            links.push(FlowLink {
                source: node_name,
                target: CENTER_NODE.to_string(),
                value: t.value,
            });
        }

        for t in &expenses {
            nodes.push(FlowNode {
                name: t.name.clone(),
            });
            links.push(FlowLink {
                source: CENTER_NODE.to_string(),
                target: t.name.clone(),
                value: t.value,
            });
        }

        let excess = total_income - total_expenses;
        if excess > Decimal::ZERO {
            nodes.push(FlowNode {
                name: "Excess".to_string(),
            });
            links.push(FlowLink {
                source: CENTER_NODE.to_string(),
                target: "Excess".to_string(),
                value: excess,
            });
        }

        Ok(FlowSummary { nodes, links })
    }
}

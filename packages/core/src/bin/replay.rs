//! Move Replay Binary
//!
//! Loads a flat record list and a list of moves from a JSON file, runs the
//! moves through the move processor against an in-memory store and prints the
//! resulting nested tree.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p arbor-core --bin arbor-replay --features dev-tools -- scenario.json
//! ```
//!
//! The scenario file looks like:
//!
//! ```json
//! {
//!   "nodes": [{ "id": 1, "parentId": -1, "order": 1 }],
//!   "moves": [{ "nodeId": 1, "newParentId": -1, "position": "inside" }],
//!   "config": { "revalidateMoves": true }
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `ARBOR_MAX_DEPTH`, `ARBOR_AUTO_SAVE`: configuration overrides
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use arbor_core::config::TreeConfig;
use arbor_core::db::MemoryTreeStore;
use arbor_core::models::{MoveIntent, TreeNode};
use arbor_core::services::{MoveOutcome, TreeService};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Scenario {
    nodes: Vec<TreeNode>,
    #[serde(default)]
    moves: Vec<MoveIntent>,
    #[serde(default)]
    config: TreeConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: arbor-replay <scenario.json>"))?;

    let raw = tokio::fs::read_to_string(&path).await?;
    let mut scenario: Scenario = serde_json::from_str(&raw)?;
    scenario
        .config
        .apply_env_overrides()
        .map_err(|e| anyhow::anyhow!("Invalid environment override: {}", e))?;

    tracing::info!(
        "Replaying {} move(s) over {} record(s) from {}",
        scenario.moves.len(),
        scenario.nodes.len(),
        path
    );

    let store = Arc::new(MemoryTreeStore::with_nodes(scenario.nodes));
    let service = TreeService::new(store, scenario.config)?;
    let report = service.submit_moves(scenario.moves).await?;

    for (index, outcome) in report.outcomes.iter().enumerate() {
        match outcome {
            MoveOutcome::Applied(applied) => tracing::info!(
                "#{} moved {} under {:?}",
                index,
                applied.node_id,
                applied.new_parent
            ),
            MoveOutcome::NodeMissing => tracing::warn!("#{} skipped: node not found", index),
            MoveOutcome::Rejected(reason) => tracing::warn!("#{} rejected: {}", index, reason),
        }
    }

    let tree = service.load_tree().await?;
    println!("{}", serde_json::to_string_pretty(&tree.to_items())?);
    Ok(())
}

//! Reference remapper: points every user of a loser at the winner, then
//! deletes losers nothing references any more.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::adapters::AssetGraph;
use crate::domain::AssetId;

use super::dedupe::RemapPlan;

/// What happened to one loser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoserStatus {
    /// All references moved and the loser was deleted
    Removed,

    /// All rewrites succeeded but references remain (e.g. held by linked data)
    Retained { remaining: usize },

    /// A rewrite was refused; later references were left untouched
    RewriteFailed { holder: AssetId, remaining: usize },
}

/// Per-loser remap outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoserOutcome {
    pub loser: AssetId,
    pub winner: AssetId,

    /// Holders successfully redirected
    pub rewritten: usize,

    #[serde(flatten)]
    pub status: LoserStatus,
}

impl LoserOutcome {
    /// Partial remap failure: the loser is still in the graph
    pub fn is_failure(&self) -> bool {
        !matches!(self.status, LoserStatus::Removed)
    }
}

/// Outcomes of applying one or more remap plans
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemapReport {
    pub outcomes: Vec<LoserOutcome>,
}

impl RemapReport {
    /// Losers that were deleted
    pub fn removed(&self) -> impl Iterator<Item = &LoserOutcome> {
        self.outcomes.iter().filter(|o| !o.is_failure())
    }

    /// Losers left in place
    pub fn failures(&self) -> impl Iterator<Item = &LoserOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }
}

/// Apply a remap plan.
///
/// Each loser is handled independently and all-or-nothing: every holder is
/// checked with [`AssetGraph::can_rewrite`] first, and a single refusal leaves
/// all of that loser's references in place. The other losers carry on.
pub fn remap(graph: &mut dyn AssetGraph, plan: &RemapPlan) -> Vec<LoserOutcome> {
    let outcomes: Vec<LoserOutcome> = plan
        .losers
        .iter()
        .filter(|l| *l != &plan.winner)
        .map(|loser| remap_loser(graph, loser, &plan.winner))
        .collect();

    info!(
        winner = %plan.winner,
        losers = outcomes.len(),
        failed = outcomes.iter().filter(|o| o.is_failure()).count(),
        "Remap plan applied"
    );
    outcomes
}

fn remap_loser(graph: &mut dyn AssetGraph, loser: &AssetId, winner: &AssetId) -> LoserOutcome {
    let holders = graph.referrers(loser);
    let mut rewritten = 0;

    let mut failed_holder = holders
        .iter()
        .find(|holder| !graph.can_rewrite(holder, winner))
        .cloned();

    if failed_holder.is_none() {
        for holder in holders {
            if graph.rewrite_reference(&holder, loser, winner) {
                rewritten += 1;
            } else {
                // Allowed by the check but refused anyway
                failed_holder = Some(holder);
                break;
            }
        }
    }

    let status = match failed_holder {
        Some(holder) => {
            let remaining = graph.get_reference_count(loser);
            warn!(%loser, %holder, remaining, "Reference rewrite refused, keeping loser");
            LoserStatus::RewriteFailed { holder, remaining }
        }
        None if graph.delete_if_unreferenced(loser) => {
            debug!(%loser, %winner, rewritten, "Loser removed");
            LoserStatus::Removed
        }
        None => {
            let remaining = graph.get_reference_count(loser);
            warn!(%loser, remaining, "Loser still referenced, not deleted");
            LoserStatus::Retained { remaining }
        }
    };

    LoserOutcome {
        loser: loser.clone(),
        winner: winner.clone(),
        rewritten,
        status,
    }
}

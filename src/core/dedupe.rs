//! Duplicate resolver: groups `Name`, `Name.001`, `Name.002`, ... and picks
//! the one to keep.
//!
//! Cleanup runs in two phases like catalog assignment: [`DedupeSession::preview`]
//! snapshots groups and reference counts, [`DedupeSession::apply`] refuses to
//! remap if that snapshot no longer matches the graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::adapters::AssetGraph;
use crate::domain::{AssetId, AssetType};

use super::remap::{remap, RemapReport};
use super::session::SessionError;
use super::signature::{Phase, SignatureBuilder};

/// Split a trailing `.NNN` (exactly three digits) off a name
pub fn split_numeric_suffix(name: &str) -> (&str, Option<u16>) {
    if let Some((base, digits)) = name.rsplit_once('.') {
        if digits.len() == 3 && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = digits.parse() {
                return (base, Some(n));
            }
        }
    }
    (name, None)
}

/// One member of a duplicate group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: AssetId,
    pub name: String,
    pub suffix: Option<u16>,

    /// Usage count when the group was built
    pub reference_count: usize,
}

/// Same-typed assets sharing a base name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub asset_type: AssetType,
    pub base_name: String,
    pub candidates: Vec<Candidate>,
}

/// Keep `winner`, fold `losers` into it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemapPlan {
    pub winner: AssetId,
    pub losers: BTreeSet<AssetId>,
}

/// Group local assets by type and base name; singletons are dropped
pub fn find_duplicates(graph: &dyn AssetGraph) -> Vec<DuplicateGroup> {
    let mut buckets: BTreeMap<(AssetType, String), Vec<Candidate>> = BTreeMap::new();

    for asset in graph.all_assets().into_iter().filter(|a| !a.linked) {
        let (base, suffix) = split_numeric_suffix(&asset.name);
        let key = (asset.asset_type, base.to_string());
        let reference_count = graph.get_reference_count(&asset.id);

        buckets.entry(key).or_default().push(Candidate {
            id: asset.id,
            name: asset.name,
            suffix,
            reference_count,
        });
    }

    buckets
        .into_iter()
        .filter(|(_, candidates)| candidates.len() > 1)
        .map(|((asset_type, base_name), mut candidates)| {
            candidates.sort_by(|a, b| a.suffix.cmp(&b.suffix).then_with(|| a.id.cmp(&b.id)));
            DuplicateGroup {
                asset_type,
                base_name,
                candidates,
            }
        })
        .collect()
}

/// Pick the winner of a group.
///
/// Precedence: the only candidate without a numeric suffix; otherwise the
/// highest reference count, then the lowest suffix, then the lowest id.
/// Returns `None` for an empty group.
pub fn resolve(group: &DuplicateGroup) -> Option<RemapPlan> {
    let canonical: Vec<&Candidate> = group
        .candidates
        .iter()
        .filter(|c| c.suffix.is_none())
        .collect();

    let winner = match canonical.as_slice() {
        [only] => *only,
        _ => group.candidates.iter().min_by(|a, b| {
            b.reference_count
                .cmp(&a.reference_count)
                .then_with(|| a.suffix.cmp(&b.suffix))
                .then_with(|| a.id.cmp(&b.id))
        })?,
    };

    Some(RemapPlan {
        winner: winner.id.clone(),
        losers: group
            .candidates
            .iter()
            .filter(|c| c.id != winner.id)
            .map(|c| c.id.clone())
            .collect(),
    })
}

/// Snapshot taken by a dedupe preview
#[derive(Debug, Clone, Serialize)]
pub struct DedupePreview {
    pub groups: Vec<DuplicateGroup>,
    pub plans: Vec<RemapPlan>,
    pub signature: String,
}

impl DedupePreview {
    /// Total assets that apply would try to remove
    pub fn loser_count(&self) -> usize {
        self.plans.iter().map(|p| p.losers.len()).sum()
    }
}

/// Two-phase duplicate cleanup session
#[derive(Debug)]
pub struct DedupeSession {
    phase: Phase,
    context: Option<DedupePreview>,
}

impl Default for DedupeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupeSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            context: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Find duplicate groups and plan their resolution without mutating
    #[instrument(skip(self, graph))]
    pub fn preview(&mut self, graph: &dyn AssetGraph) -> &DedupePreview {
        let preview = build_dedupe_preview(graph);
        info!(
            groups = preview.groups.len(),
            losers = preview.loser_count(),
            "Duplicate preview built"
        );

        self.phase = Phase::Previewed;
        self.context.insert(preview)
    }

    /// Remap and delete losers from the previewed plans
    #[instrument(skip(self, graph))]
    pub fn apply(&mut self, graph: &mut dyn AssetGraph) -> Result<RemapReport, SessionError> {
        let context = match (self.phase, self.context.take()) {
            (Phase::Previewed, Some(context)) => context,
            _ => return Err(SessionError::NoPreview),
        };

        let live = group_signature(&find_duplicates(&*graph));
        if live != context.signature {
            warn!("Duplicate preview is stale, refusing to remap");
            self.phase = Phase::Stale;
            return Err(SessionError::StaleSignature {
                expected: context.signature,
                actual: live,
            });
        }

        let mut report = RemapReport::default();
        for plan in &context.plans {
            debug!(winner = %plan.winner, losers = plan.losers.len(), "Remapping group");
            report.outcomes.extend(remap(graph, plan));
        }

        self.phase = Phase::Applied;
        info!(
            removed = report.removed().count(),
            failed = report.failures().count(),
            "Duplicate cleanup applied"
        );
        Ok(report)
    }
}

/// Build a dedupe preview without a session
pub fn build_dedupe_preview(graph: &dyn AssetGraph) -> DedupePreview {
    let groups = find_duplicates(graph);
    let plans = groups.iter().filter_map(resolve).collect();
    let signature = group_signature(&groups);

    DedupePreview {
        groups,
        plans,
        signature,
    }
}

fn group_signature(groups: &[DuplicateGroup]) -> String {
    let mut builder = SignatureBuilder::new();
    for group in groups {
        builder
            .field("type", group.asset_type.to_string())
            .field("base", &group.base_name);
        for candidate in &group.candidates {
            builder
                .field("id", candidate.id.as_str())
                .field("name", &candidate.name)
                .field("refs", candidate.reference_count.to_string());
        }
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryAssetGraph;
    use crate::domain::Asset;

    fn candidate(id: &str, refs: usize) -> Candidate {
        let (_, suffix) = split_numeric_suffix(id);
        Candidate {
            id: AssetId::from(id),
            name: id.to_string(),
            suffix,
            reference_count: refs,
        }
    }

    fn group(candidates: Vec<Candidate>) -> DuplicateGroup {
        DuplicateGroup {
            asset_type: AssetType::Object,
            base_name: "Chair".to_string(),
            candidates,
        }
    }

    #[test]
    fn test_split_numeric_suffix() {
        assert_eq!(split_numeric_suffix("Chair.001"), ("Chair", Some(1)));
        assert_eq!(split_numeric_suffix("Chair.120"), ("Chair", Some(120)));
        assert_eq!(split_numeric_suffix("Chair"), ("Chair", None));
        assert_eq!(split_numeric_suffix("Chair.01"), ("Chair.01", None));
        assert_eq!(split_numeric_suffix("Chair.0001"), ("Chair.0001", None));
        assert_eq!(split_numeric_suffix("Chair.00a"), ("Chair.00a", None));
        assert_eq!(split_numeric_suffix("v1.2.003"), ("v1.2", Some(3)));
    }

    #[test]
    fn test_unique_canonical_name_wins() {
        let plan = resolve(&group(vec![
            candidate("Chair", 0),
            candidate("Chair.001", 3),
            candidate("Chair.002", 1),
        ]))
        .unwrap();

        assert_eq!(plan.winner, AssetId::from("Chair"));
        assert_eq!(plan.losers.len(), 2);
    }

    #[test]
    fn test_reference_count_wins_without_canonical() {
        let plan = resolve(&group(vec![candidate("Chair.001", 3), candidate("Chair.002", 1)])).unwrap();
        assert_eq!(plan.winner, AssetId::from("Chair.001"));

        let plan = resolve(&group(vec![candidate("Chair.001", 1), candidate("Chair.002", 4)])).unwrap();
        assert_eq!(plan.winner, AssetId::from("Chair.002"));
    }

    #[test]
    fn test_ties_break_on_suffix_then_id() {
        let plan = resolve(&group(vec![candidate("Chair.004", 2), candidate("Chair.002", 2)])).unwrap();
        assert_eq!(plan.winner, AssetId::from("Chair.002"));

        let mut a = candidate("Chair.003", 2);
        a.id = AssetId::from("id-b");
        let mut b = candidate("Chair.003", 2);
        b.id = AssetId::from("id-a");
        let plan = resolve(&group(vec![a, b])).unwrap();
        assert_eq!(plan.winner, AssetId::from("id-a"));
    }

    #[test]
    fn test_resolution_is_order_independent() {
        let forward = vec![candidate("Chair.001", 2), candidate("Chair.002", 2), candidate("Chair.003", 5)];
        let mut backward = forward.clone();
        backward.reverse();

        assert_eq!(resolve(&group(forward)), resolve(&group(backward)));
    }

    #[test]
    fn test_find_duplicates_groups_by_type_and_base() {
        let graph = MemoryAssetGraph::new(vec![
            Asset::new("MA:Chair", AssetType::Material, "Chair"),
            Asset::new("OB:Chair", AssetType::Object, "Chair"),
            Asset::new("OB:Chair.001", AssetType::Object, "Chair.001"),
            Asset::new("OB:chair.002", AssetType::Object, "chair.002"),
            Asset::new("OB:Chair.002", AssetType::Object, "Chair.002").linked(),
            Asset::new("OB:Lamp", AssetType::Object, "Lamp"),
        ])
        .with_users("OB:Chair.001", 2);

        let groups = find_duplicates(&graph);

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.asset_type, AssetType::Object);
        assert_eq!(group.base_name, "Chair");
        assert_eq!(group.candidates.len(), 2);
        assert_eq!(group.candidates[1].reference_count, 2);
    }
}

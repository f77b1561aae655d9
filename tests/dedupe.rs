//! Duplicate Cleanup Integration Tests
//!
//! Grouping, winner selection and remapping through the two-phase session.

use cataloger::core::{DedupeSession, LoserStatus, Phase, SessionError};
use cataloger::domain::{Asset, AssetId, AssetType};
use cataloger::{AssetGraph, MemoryAssetGraph};

fn id(s: &str) -> AssetId {
    AssetId::from(s)
}

#[test]
fn test_bare_name_wins_regardless_of_usage() {
    let mut graph = MemoryAssetGraph::new(vec![
        Asset::new("OB:Chair", AssetType::Object, "Chair"),
        Asset::new("OB:Chair.001", AssetType::Object, "Chair.001"),
        Asset::new("OB:Chair.002", AssetType::Object, "Chair.002"),
    ])
    .with_users("OB:Chair.001", 3)
    .with_users("OB:Chair.002", 1);

    let mut session = DedupeSession::new();
    let preview = session.preview(&graph);
    assert_eq!(preview.groups.len(), 1);
    assert_eq!(preview.plans[0].winner, id("OB:Chair"));
    assert_eq!(preview.loser_count(), 2);

    let report = session.apply(&mut graph).unwrap();
    assert_eq!(report.removed().count(), 2);
    assert_eq!(report.failures().count(), 0);
    assert_eq!(graph.get_reference_count(&id("OB:Chair")), 4);
    assert!(graph.asset(&id("OB:Chair.001")).is_none());
    assert!(graph.asset(&id("OB:Chair.002")).is_none());
    assert_eq!(session.phase(), Phase::Applied);
}

#[test]
fn test_most_used_wins_without_bare_name() {
    let mut graph = MemoryAssetGraph::new(vec![
        Asset::new("OB:Chair.001", AssetType::Object, "Chair.001"),
        Asset::new("OB:Chair.002", AssetType::Object, "Chair.002"),
    ])
    .with_users("OB:Chair.001", 3)
    .with_users("OB:Chair.002", 1);

    let mut session = DedupeSession::new();
    assert_eq!(session.preview(&graph).plans[0].winner, id("OB:Chair.001"));

    let report = session.apply(&mut graph).unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].loser, id("OB:Chair.002"));
    assert_eq!(report.outcomes[0].rewritten, 1);
    assert_eq!(graph.get_reference_count(&id("OB:Chair.001")), 4);
}

#[test]
fn test_same_name_different_type_is_not_a_duplicate() {
    let graph = MemoryAssetGraph::new(vec![
        Asset::new("MA:Wood", AssetType::Material, "Wood"),
        Asset::new("NG:Wood.001", AssetType::NodeGroup, "Wood.001"),
        Asset::new("MA:Wood.1", AssetType::Material, "Wood.1"),
    ]);

    let mut session = DedupeSession::new();
    assert!(session.preview(&graph).groups.is_empty());
}

#[test]
fn test_reference_change_makes_preview_stale() {
    let mut graph = MemoryAssetGraph::new(vec![
        Asset::new("MA:Wood.001", AssetType::Material, "Wood.001"),
        Asset::new("MA:Wood.002", AssetType::Material, "Wood.002"),
        Asset::new("OB:Chair", AssetType::Object, "Chair"),
    ])
    .with_users("MA:Wood.001", 1)
    .with_users("MA:Wood.002", 1);

    let mut session = DedupeSession::new();
    assert_eq!(session.preview(&graph).plans[0].winner, id("MA:Wood.001"));

    graph.add_reference("OB:Chair", "MA:Wood.002");

    assert!(matches!(
        session.apply(&mut graph),
        Err(SessionError::StaleSignature { .. })
    ));
    assert_eq!(session.phase(), Phase::Stale);
    assert!(graph.asset(&id("MA:Wood.001")).is_some());
    assert!(graph.asset(&id("MA:Wood.002")).is_some());

    // The fresh plan follows the new usage
    assert_eq!(session.preview(&graph).plans[0].winner, id("MA:Wood.002"));
    assert_eq!(session.apply(&mut graph).unwrap().removed().count(), 1);
}

#[test]
fn test_linked_holder_is_reported_not_dropped() {
    let mut graph = MemoryAssetGraph::new(vec![
        Asset::new("MA:Wood", AssetType::Material, "Wood"),
        Asset::new("MA:Wood.001", AssetType::Material, "Wood.001"),
        Asset::new("MA:Wood.002", AssetType::Material, "Wood.002"),
        Asset::new("OB:Lib", AssetType::Object, "Lib").linked(),
        Asset::new("OB:Chair", AssetType::Object, "Chair"),
    ])
    .with_reference("OB:Lib", "MA:Wood.001")
    .with_reference("OB:Chair", "MA:Wood.002");

    let mut session = DedupeSession::new();
    session.preview(&graph);
    let report = session.apply(&mut graph).unwrap();

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].loser, id("MA:Wood.001"));
    assert_eq!(
        failures[0].status,
        LoserStatus::RewriteFailed {
            holder: id("OB:Lib"),
            remaining: 1
        }
    );
    assert!(graph.asset(&id("MA:Wood.001")).is_some());

    // The other loser is unaffected
    assert_eq!(report.removed().count(), 1);
    assert!(graph.asset(&id("MA:Wood.002")).is_none());
    assert_eq!(graph.referrers(&id("MA:Wood")), vec![id("OB:Chair")]);
}

#[test]
fn test_apply_requires_preview() {
    let mut graph = MemoryAssetGraph::new(Vec::new());
    let mut session = DedupeSession::new();
    assert!(matches!(session.apply(&mut graph), Err(SessionError::NoPreview)));
}

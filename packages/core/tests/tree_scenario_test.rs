//! Integration tests for tree construction and branch materialization
//!
//! Tests cover:
//! - Level assignment for roots and nested children
//! - Child listing order
//! - Nested branch output for both materialization strategies
//! - Orphans left behind by deleting a parent

use anyhow::Result;
use serde_json::json;
use std::collections::HashMap;
use tempfile::TempDir;
use treenode_core::{
    BranchConfig, BranchStrategy, NodeInput, NodeService, NodeServiceConfig, NodeTree,
};

/// Test helper: Create a service on a fresh database file
async fn create_test_env(strategy: BranchStrategy) -> Result<(NodeService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let config = NodeServiceConfig {
        branch: BranchConfig {
            strategy,
            ..BranchConfig::default()
        },
        ..NodeServiceConfig::default()
    };
    let service = NodeService::open(temp_dir.path().join("tree.db"), config).await?;
    Ok((service, temp_dir))
}

/// Every child in the tree must match `list_children` for its node
fn assert_tree_matches(tree: &NodeTree, children_of: &HashMap<i64, Vec<i64>>) {
    let expected = children_of
        .get(&tree.node.node_id)
        .cloned()
        .unwrap_or_default();
    let actual: Vec<i64> = tree.children.iter().map(|c| c.node.node_id).collect();
    assert_eq!(actual, expected, "children of {}", tree.node.node_id);

    for child in &tree.children {
        assert_eq!(child.node.parent_id, Some(tree.node.node_id));
        assert_eq!(child.node.node_level, tree.node.node_level + 1);
        assert_tree_matches(child, children_of);
    }
}

#[tokio::test]
async fn test_three_level_scenario() -> Result<()> {
    for strategy in [BranchStrategy::PerNode, BranchStrategy::Bulk] {
        let (service, _temp) = create_test_env(strategy).await?;

        let a = service.create_root(NodeInput::new("A", None)).await?;
        let b = service
            .create_child(a.node_id, NodeInput::new("B", None))
            .await?;
        let c = service
            .create_child(b.node_id, NodeInput::new("C", None))
            .await?;
        assert_eq!((a.node_level, b.node_level, c.node_level), (0, 1, 2));

        let tree = service.get_branch(a.node_id).await?;
        let value = serde_json::to_value(&tree)?;

        assert_eq!(value["node_name"], "A");
        assert_eq!(value["is_root"], true);
        assert_eq!(value["children"][0]["node_name"], "B");
        assert_eq!(value["children"][0]["node_level"], 1);
        assert_eq!(value["children"][0]["children"][0]["node_name"], "C");
        assert_eq!(value["children"][0]["children"][0]["node_level"], 2);
        assert_eq!(value["children"][0]["children"][0]["children"], json!([]));
    }
    Ok(())
}

#[tokio::test]
async fn test_wide_tree_matches_child_listing() -> Result<()> {
    let (service, _temp) = create_test_env(BranchStrategy::PerNode).await?;

    let root = service.create_root(NodeInput::new("root", None)).await?;
    let mut frontier = vec![root.clone()];
    for depth in 1..=3 {
        let mut next = Vec::new();
        for parent in &frontier {
            for i in 0..3 {
                let name = format!("d{}-{}-{}", depth, parent.node_id, i);
                next.push(
                    service
                        .create_child(parent.node_id, NodeInput::new(name, None))
                        .await?,
                );
            }
        }
        frontier = next;
    }

    let mut children_of: HashMap<i64, Vec<i64>> = HashMap::new();
    for node in service.list_nodes().await? {
        let children = service.list_children(node.node_id).await?;
        children_of.insert(
            node.node_id,
            children.iter().map(|c| c.node_id).collect(),
        );
    }

    let tree = service.get_branch(root.node_id).await?;
    assert_eq!(tree.size(), 1 + 3 + 9 + 27);
    assert_eq!(tree.height(), 3);
    assert_tree_matches(&tree, &children_of);

    // Same rows, assembled from one recursive query
    let bulk = NodeService::new(
        service.store().clone(),
        NodeServiceConfig {
            branch: BranchConfig {
                strategy: BranchStrategy::Bulk,
                ..BranchConfig::default()
            },
            ..NodeServiceConfig::default()
        },
    );
    assert_eq!(bulk.get_branch(root.node_id).await?, tree);
    Ok(())
}

#[tokio::test]
async fn test_children_listing_is_creation_order() -> Result<()> {
    let (service, _temp) = create_test_env(BranchStrategy::PerNode).await?;

    let parent = service.create_root(NodeInput::new("parent", None)).await?;
    let other = service.create_root(NodeInput::new("other", None)).await?;

    let mut created = Vec::new();
    for name in ["zeta", "alpha", "mid"] {
        created.push(
            service
                .create_child(parent.node_id, NodeInput::new(name, None))
                .await?
                .node_id,
        );
        service
            .create_child(other.node_id, NodeInput::new("noise", None))
            .await?;
    }

    let listed: Vec<i64> = service
        .list_children(parent.node_id)
        .await?
        .iter()
        .map(|n| n.node_id)
        .collect();
    assert_eq!(listed, created);
    Ok(())
}

#[tokio::test]
async fn test_orphans_survive_parent_delete() -> Result<()> {
    let (service, _temp) = create_test_env(BranchStrategy::PerNode).await?;

    let root = service.create_root(NodeInput::new("root", None)).await?;
    let child = service
        .create_child(root.node_id, NodeInput::new("child", None))
        .await?;
    let grandchild = service
        .create_child(child.node_id, NodeInput::new("grandchild", None))
        .await?;

    service.delete_node(child.node_id).await?;

    // The orphan is still reachable by the dead parent's id
    let orphans = service.list_children(child.node_id).await?;
    assert_eq!(orphans, vec![grandchild.clone()]);

    // It is neither a root nor part of the surviving branch
    assert!(service
        .list_roots()
        .await?
        .iter()
        .all(|n| n.node_id != grandchild.node_id));
    assert!(service.get_branch(root.node_id).await?.children.is_empty());
    Ok(())
}

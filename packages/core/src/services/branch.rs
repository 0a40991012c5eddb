//! Branch Materializer - Nested Subtree Assembly
//!
//! Turns a starting node and the flat parent/child rows below it into a
//! `NodeTree`. Two strategies produce the same nested shape:
//!
//! - **PerNode**: one `list_children` round-trip per node. Sibling subtrees
//!   are fetched concurrently; each child list keeps the store's order.
//! - **Bulk**: one recursive `list_subtree` query, then an adjacency list
//!   (`parent_id → children`) is walked in memory.
//!
//! Stored data is not trusted to be a forest. Both strategies stop at
//! `max_depth` and report a revisited node as `CycleDetected`, and the whole
//! run is bounded by `timeout`.

use crate::db::{NodeStore, SubtreeRow};
use crate::models::{Node, NodeId, NodeTree};
use crate::services::error::NodeServiceError;
use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on subtree depth below the start node
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Largest accepted `max_depth`; larger settings are lowered to this
///
/// Assembly and serialization of a `NodeTree` recurse once per level.
pub const MAX_DEPTH_CEILING: usize = 10_000;

/// Default wall-clock bound for one materialization
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How a subtree is loaded from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchStrategy {
    /// Recursive per-node fetch with concurrent siblings
    #[default]
    PerNode,
    /// Single recursive query assembled in memory
    Bulk,
}

impl FromStr for BranchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-node" | "per_node" | "pernode" => Ok(Self::PerNode),
            "bulk" => Ok(Self::Bulk),
            other => Err(format!(
                "unknown branch strategy '{}' (expected 'per-node' or 'bulk')",
                other
            )),
        }
    }
}

/// Limits and strategy for subtree materialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchConfig {
    pub strategy: BranchStrategy,
    pub max_depth: usize,
    pub timeout: Duration,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            strategy: BranchStrategy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Assembles nested subtrees from a `NodeStore`
#[derive(Clone)]
pub struct BranchMaterializer {
    store: Arc<dyn NodeStore>,
    config: BranchConfig,
}

impl BranchMaterializer {
    pub fn new(store: Arc<dyn NodeStore>, mut config: BranchConfig) -> Self {
        if config.max_depth > MAX_DEPTH_CEILING {
            tracing::warn!(
                "Branch depth limit {} lowered to {}",
                config.max_depth,
                MAX_DEPTH_CEILING
            );
            config.max_depth = MAX_DEPTH_CEILING;
        }
        Self { store, config }
    }

    pub fn config(&self) -> &BranchConfig {
        &self.config
    }

    /// Materialize the subtree rooted at `root`
    ///
    /// `root` must already have been fetched; a missing start node is the
    /// caller's concern.
    ///
    /// # Errors
    ///
    /// - `CycleDetected` if a node is reached twice
    /// - `DepthLimitExceeded` if the subtree is deeper than `max_depth`
    /// - `BranchTimeout` if the run takes longer than `timeout`
    /// - `DatabaseError` for store faults
    pub async fn materialize(&self, root: Node) -> Result<NodeTree, NodeServiceError> {
        let root_id = root.node_id;
        let work = async {
            match self.config.strategy {
                BranchStrategy::PerNode => self.expand(root, Vec::new()).await,
                BranchStrategy::Bulk => self.materialize_bulk(root).await,
            }
        };

        match tokio::time::timeout(self.config.timeout, work).await {
            Ok(Ok(tree)) => {
                tracing::debug!(
                    "Materialized branch {} ({} nodes, height {})",
                    root_id,
                    tree.size(),
                    tree.height()
                );
                Ok(tree)
            }
            Ok(Err(e)) => {
                if e.is_data_integrity() {
                    tracing::warn!("Refusing to materialize branch {}: {}", root_id, e);
                }
                Err(e)
            }
            Err(_) => Err(NodeServiceError::BranchTimeout {
                node_id: root_id,
                timeout_ms: self.config.timeout.as_millis(),
            }),
        }
    }

    /// Per-node recursion; `ancestors` is the path from the start node down to
    /// (but excluding) `node`.
    fn expand(
        &self,
        node: Node,
        ancestors: Vec<NodeId>,
    ) -> BoxFuture<'_, Result<NodeTree, NodeServiceError>> {
        async move {
            if ancestors.contains(&node.node_id) {
                return Err(NodeServiceError::CycleDetected {
                    node_id: node.node_id,
                });
            }
            if ancestors.len() > self.config.max_depth {
                return Err(NodeServiceError::DepthLimitExceeded {
                    limit: self.config.max_depth,
                });
            }

            let children = self.store.list_children(node.node_id).await?;
            if children.is_empty() {
                return Ok(NodeTree::leaf(node));
            }

            let mut path = ancestors;
            path.push(node.node_id);

            let subtrees = try_join_all(
                children
                    .into_iter()
                    .map(|child| self.expand(child, path.clone())),
            )
            .await?;

            Ok(NodeTree {
                node,
                children: subtrees,
            })
        }
        .boxed()
    }

    async fn materialize_bulk(&self, root: Node) -> Result<NodeTree, NodeServiceError> {
        let rows = self
            .store
            .list_subtree(root.node_id, self.config.max_depth)
            .await?;

        let mut adjacency = build_adjacency(rows, self.config.max_depth)?;
        Ok(assemble(root, &mut adjacency))
    }
}

/// Group subtree rows by parent, keeping row order within each group.
///
/// The start node (depth 0) is skipped; the caller supplies it.
fn build_adjacency(
    rows: Vec<SubtreeRow>,
    max_depth: usize,
) -> Result<HashMap<NodeId, Vec<Node>>, NodeServiceError> {
    let mut seen: HashSet<NodeId> = HashSet::with_capacity(rows.len());
    let mut adjacency: HashMap<NodeId, Vec<Node>> = HashMap::new();

    for row in rows {
        // With one parent per node, reaching a node twice means a loop
        if !seen.insert(row.node.node_id) {
            return Err(NodeServiceError::CycleDetected {
                node_id: row.node.node_id,
            });
        }
        if row.depth > max_depth {
            return Err(NodeServiceError::DepthLimitExceeded { limit: max_depth });
        }
        if row.depth == 0 {
            continue;
        }
        if let Some(parent_id) = row.node.parent_id {
            adjacency.entry(parent_id).or_default().push(row.node);
        }
    }

    Ok(adjacency)
}

fn assemble(node: Node, adjacency: &mut HashMap<NodeId, Vec<Node>>) -> NodeTree {
    let children = adjacency.remove(&node.node_id).unwrap_or_default();
    NodeTree {
        node,
        children: children
            .into_iter()
            .map(|child| assemble(child, adjacency))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseError, DatabaseService, LeafDelete, LibsqlStore};
    use crate::models::NewNode;
    use async_trait::async_trait;
    use chrono::Utc;
    use tempfile::TempDir;

    async fn create_test_store() -> (Arc<LibsqlStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (Arc::new(LibsqlStore::new(db)), temp_dir)
    }

    async fn add(store: &LibsqlStore, name: &str, parent: Option<&Node>) -> Node {
        let new_node = NewNode {
            node_name: name.to_string(),
            description: None,
            parent_id: parent.map(|p| p.node_id),
            node_level: parent.map(Node::child_level).unwrap_or(0),
            creation_date: Utc::now(),
        };
        let id = store.insert(new_node).await.unwrap();
        store.get_by_id(id).await.unwrap().unwrap()
    }

    fn materializer(store: Arc<dyn NodeStore>, strategy: BranchStrategy) -> BranchMaterializer {
        BranchMaterializer::new(
            store,
            BranchConfig {
                strategy,
                ..BranchConfig::default()
            },
        )
    }

    fn names(tree: &NodeTree) -> Vec<String> {
        tree.children
            .iter()
            .map(|c| c.node.node_name.clone())
            .collect()
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("bulk".parse::<BranchStrategy>(), Ok(BranchStrategy::Bulk));
        assert_eq!(
            "Per-Node".parse::<BranchStrategy>(),
            Ok(BranchStrategy::PerNode)
        );
        assert!("breadth".parse::<BranchStrategy>().is_err());
    }

    #[tokio::test]
    async fn test_leaf_has_empty_children() {
        let (store, _temp) = create_test_store().await;
        let leaf = add(&store, "Leaf", None).await;

        for strategy in [BranchStrategy::PerNode, BranchStrategy::Bulk] {
            let tree = materializer(store.clone(), strategy)
                .materialize(leaf.clone())
                .await
                .unwrap();
            assert_eq!(tree, NodeTree::leaf(leaf.clone()));
        }
    }

    #[tokio::test]
    async fn test_strategies_agree() {
        let (store, _temp) = create_test_store().await;
        let root = add(&store, "Root", None).await;
        let a = add(&store, "A", Some(&root)).await;
        let b = add(&store, "B", Some(&root)).await;
        let _a1 = add(&store, "A1", Some(&a)).await;
        let _b1 = add(&store, "B1", Some(&b)).await;
        let _a2 = add(&store, "A2", Some(&a)).await;
        let _unrelated = add(&store, "Elsewhere", None).await;

        let per_node = materializer(store.clone(), BranchStrategy::PerNode)
            .materialize(root.clone())
            .await
            .unwrap();
        let bulk = materializer(store.clone(), BranchStrategy::Bulk)
            .materialize(root)
            .await
            .unwrap();

        assert_eq!(per_node, bulk);
        assert_eq!(per_node.size(), 6);
        assert_eq!(names(&per_node), vec!["A", "B"]);
        assert_eq!(names(&per_node.children[0]), vec!["A1", "A2"]);
        assert_eq!(names(&per_node.children[1]), vec!["B1"]);
    }

    #[tokio::test]
    async fn test_cycle_detected_by_both_strategies() {
        let (store, _temp) = create_test_store().await;
        let a = add(&store, "A", None).await;
        let b = add(&store, "B", Some(&a)).await;

        // Close the loop behind the API's back: A's parent becomes B
        let conn = store.database().connect().unwrap();
        conn.execute(
            "UPDATE tree_nodes SET parent_id = ? WHERE node_id = ?",
            (b.node_id, a.node_id),
        )
        .await
        .unwrap();

        for strategy in [BranchStrategy::PerNode, BranchStrategy::Bulk] {
            let err = materializer(store.clone(), strategy)
                .materialize(a.clone())
                .await
                .unwrap_err();
            assert!(
                matches!(err, NodeServiceError::CycleDetected { .. }),
                "{:?} should report a cycle, got {:?}",
                strategy,
                err
            );
        }
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let (store, _temp) = create_test_store().await;
        let root = add(&store, "L0", None).await;
        let l1 = add(&store, "L1", Some(&root)).await;
        let _l2 = add(&store, "L2", Some(&l1)).await;

        for strategy in [BranchStrategy::PerNode, BranchStrategy::Bulk] {
            let shallow = BranchMaterializer::new(
                store.clone(),
                BranchConfig {
                    strategy,
                    max_depth: 1,
                    ..BranchConfig::default()
                },
            );
            let err = shallow.materialize(root.clone()).await.unwrap_err();
            assert!(matches!(
                err,
                NodeServiceError::DepthLimitExceeded { limit: 1 }
            ));

            let exact = BranchMaterializer::new(
                store.clone(),
                BranchConfig {
                    strategy,
                    max_depth: 2,
                    ..BranchConfig::default()
                },
            );
            assert_eq!(exact.materialize(root.clone()).await.unwrap().height(), 2);
        }
    }

    #[tokio::test]
    async fn test_oversized_depth_limit_is_lowered() {
        let (store, _temp) = create_test_store().await;
        let a = add(&store, "A", None).await;
        let b = add(&store, "B", Some(&a)).await;
        let _c = add(&store, "C", Some(&b)).await;

        for strategy in [BranchStrategy::PerNode, BranchStrategy::Bulk] {
            let unbounded = BranchMaterializer::new(
                store.clone(),
                BranchConfig {
                    strategy,
                    max_depth: usize::MAX,
                    ..BranchConfig::default()
                },
            );
            assert_eq!(unbounded.config().max_depth, MAX_DEPTH_CEILING);

            let tree = unbounded.materialize(a.clone()).await.unwrap();
            assert_eq!(tree.size(), 3, "{:?}", strategy);
            assert_eq!(tree.height(), 2);
        }
    }

    #[tokio::test]
    async fn test_bulk_cycle_with_deep_limit_fails_fast() {
        let (store, _temp) = create_test_store().await;
        let a = add(&store, "A", None).await;
        let b = add(&store, "B", Some(&a)).await;

        let conn = store.database().connect().unwrap();
        conn.execute(
            "UPDATE tree_nodes SET parent_id = ? WHERE node_id = ?",
            (b.node_id, a.node_id),
        )
        .await
        .unwrap();

        let bulk = BranchMaterializer::new(
            store.clone(),
            BranchConfig {
                strategy: BranchStrategy::Bulk,
                max_depth: 1 << 40,
                timeout: Duration::from_millis(200),
            },
        );

        let started = std::time::Instant::now();
        let err = bulk.materialize(a.clone()).await.unwrap_err();
        assert!(matches!(err, NodeServiceError::CycleDetected { node_id } if node_id == a.node_id));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// Store whose child lookups never answer in time
    struct StalledStore {
        inner: Arc<LibsqlStore>,
    }

    #[async_trait]
    impl NodeStore for StalledStore {
        async fn list_all(&self) -> Result<Vec<Node>, DatabaseError> {
            self.inner.list_all().await
        }
        async fn get_by_id(&self, id: NodeId) -> Result<Option<Node>, DatabaseError> {
            self.inner.get_by_id(id).await
        }
        async fn list_roots(&self) -> Result<Vec<Node>, DatabaseError> {
            self.inner.list_roots().await
        }
        async fn list_children(&self, parent_id: NodeId) -> Result<Vec<Node>, DatabaseError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            self.inner.list_children(parent_id).await
        }
        async fn count_children(&self, parent_id: NodeId) -> Result<u64, DatabaseError> {
            self.inner.count_children(parent_id).await
        }
        async fn insert(&self, node: NewNode) -> Result<NodeId, DatabaseError> {
            self.inner.insert(node).await
        }
        async fn update(
            &self,
            id: NodeId,
            node_name: &str,
            description: Option<&str>,
        ) -> Result<bool, DatabaseError> {
            self.inner.update(id, node_name, description).await
        }
        async fn delete(&self, id: NodeId) -> Result<bool, DatabaseError> {
            self.inner.delete(id).await
        }
        async fn delete_leaf(&self, id: NodeId) -> Result<LeafDelete, DatabaseError> {
            self.inner.delete_leaf(id).await
        }
        async fn delete_subtree(&self, id: NodeId) -> Result<u64, DatabaseError> {
            self.inner.delete_subtree(id).await
        }
        async fn list_subtree(
            &self,
            root_id: NodeId,
            max_depth: usize,
        ) -> Result<Vec<SubtreeRow>, DatabaseError> {
            self.inner.list_subtree(root_id, max_depth).await
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let (store, _temp) = create_test_store().await;
        let root = add(&store, "Root", None).await;

        let stalled = BranchMaterializer::new(
            Arc::new(StalledStore { inner: store }),
            BranchConfig {
                strategy: BranchStrategy::PerNode,
                timeout: Duration::from_millis(20),
                ..BranchConfig::default()
            },
        );

        let err = stalled.materialize(root.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            NodeServiceError::BranchTimeout { node_id, timeout_ms: 20 } if node_id == root.node_id
        ));
    }
}

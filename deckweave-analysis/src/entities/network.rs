//! Entity network construction and graph metrics.

use deckweave_core::types::collections::FxHashMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::info;

use super::types::{EntityArena, EntityId, Relationship};

const PAGERANK_DAMPING: f64 = 0.85;
const PAGERANK_TOLERANCE: f64 = 1e-6;
const PAGERANK_MAX_ITERATIONS: usize = 100;

/// Per-entity metrics computed from the relationship graph.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkNode {
    pub entity: EntityId,
    pub name: String,
    /// Degree centrality: (in + out) / (n - 1).
    pub centrality: f64,
    /// Normalized betweenness centrality.
    pub betweenness: f64,
    pub degree: usize,
    /// Weighted PageRank score.
    pub influence_score: f64,
}

/// Directed entity graph with edge weight = relationship strength.
/// Parallel relationships between the same pair collapse to one edge;
/// the last strength written wins.
pub struct EntityNetwork {
    graph: DiGraph<EntityId, f64>,
    index_of: FxHashMap<EntityId, NodeIndex>,
}

impl EntityNetwork {
    pub fn build(arena: &EntityArena, relationships: &[Relationship]) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of = FxHashMap::default();

        for (id, _) in arena.iter() {
            index_of.insert(id, graph.add_node(id));
        }
        for rel in relationships {
            let (Some(&source), Some(&target)) =
                (index_of.get(&rel.source), index_of.get(&rel.target))
            else {
                continue;
            };
            graph.update_edge(source, target, rel.strength);
        }

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built entity network"
        );
        Self { graph, index_of }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index_of.contains_key(&id)
    }

    fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges_directed(node, Direction::Outgoing).count()
            + self.graph.edges_directed(node, Direction::Incoming).count()
    }

    /// Degree centrality, betweenness, and weighted PageRank for every
    /// node, keyed by entity name.
    pub fn analyze_metrics(&self, arena: &EntityArena) -> FxHashMap<String, NetworkNode> {
        let n = self.graph.node_count();
        let betweenness = self.betweenness_centrality();
        let pagerank = self.pagerank();

        let mut metrics = FxHashMap::default();
        for node in self.graph.node_indices() {
            let entity_id = self.graph[node];
            let degree = self.degree(node);
            let centrality = if n > 1 {
                degree as f64 / (n - 1) as f64
            } else {
                0.0
            };
            let name = arena.get(entity_id).name.clone();
            metrics.insert(
                name.clone(),
                NetworkNode {
                    entity: entity_id,
                    name,
                    centrality,
                    betweenness: betweenness[node.index()],
                    degree,
                    influence_score: pagerank[node.index()],
                },
            );
        }
        metrics
    }

    /// Brandes' algorithm over unweighted directed shortest paths,
    /// scaled by 1/((n-1)(n-2)) when n > 2.
    fn betweenness_centrality(&self) -> Vec<f64> {
        let n = self.graph.node_count();
        let mut centrality = vec![0.0; n];
        if n < 3 {
            return centrality;
        }

        for source in self.graph.node_indices() {
            let mut stack: Vec<NodeIndex> = Vec::new();
            let mut predecessors: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0f64; n];
            let mut dist = vec![-1i64; n];
            sigma[source.index()] = 1.0;
            dist[source.index()] = 0;

            let mut queue = VecDeque::new();
            queue.push_back(source);
            while let Some(v) = queue.pop_front() {
                stack.push(v);
                for w in self.graph.neighbors_directed(v, Direction::Outgoing) {
                    if dist[w.index()] < 0 {
                        dist[w.index()] = dist[v.index()] + 1;
                        queue.push_back(w);
                    }
                    if dist[w.index()] == dist[v.index()] + 1 {
                        sigma[w.index()] += sigma[v.index()];
                        predecessors[w.index()].push(v);
                    }
                }
            }

            let mut delta = vec![0.0f64; n];
            while let Some(w) = stack.pop() {
                for &v in &predecessors[w.index()] {
                    delta[v.index()] +=
                        sigma[v.index()] / sigma[w.index()] * (1.0 + delta[w.index()]);
                }
                if w != source {
                    centrality[w.index()] += delta[w.index()];
                }
            }
        }

        let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
        for value in &mut centrality {
            *value *= scale;
        }
        centrality
    }

    /// Power-iteration PageRank with edge-weight-proportional
    /// transitions; dangling mass is spread uniformly.
    fn pagerank(&self) -> Vec<f64> {
        let n = self.graph.node_count();
        if n == 0 {
            return Vec::new();
        }

        let out_weight: Vec<f64> = self
            .graph
            .node_indices()
            .map(|v| {
                self.graph
                    .edges_directed(v, Direction::Outgoing)
                    .map(|e| *e.weight())
                    .sum()
            })
            .collect();

        let uniform = 1.0 / n as f64;
        let mut rank = vec![uniform; n];

        for _ in 0..PAGERANK_MAX_ITERATIONS {
            let mut next = vec![(1.0 - PAGERANK_DAMPING) * uniform; n];

            let dangling_mass: f64 = self
                .graph
                .node_indices()
                .filter(|v| out_weight[v.index()] <= 0.0)
                .map(|v| rank[v.index()])
                .sum();
            for value in &mut next {
                *value += PAGERANK_DAMPING * dangling_mass * uniform;
            }

            for edge in self.graph.edge_references() {
                let source = edge.source().index();
                let target = edge.target().index();
                if out_weight[source] > 0.0 {
                    next[target] +=
                        PAGERANK_DAMPING * rank[source] * edge.weight() / out_weight[source];
                }
            }

            let change: f64 = next
                .iter()
                .zip(&rank)
                .map(|(a, b)| (a - b).abs())
                .sum();
            rank = next;
            if change < n as f64 * PAGERANK_TOLERANCE {
                break;
            }
        }
        rank
    }

    /// Weakly connected components as entity-name groups, largest
    /// first; names sorted within each group.
    pub fn entity_clusters(&self, arena: &EntityArena) -> Vec<Vec<String>> {
        let n = self.graph.node_count();
        let mut union_find = UnionFind::new(n);
        for edge in self.graph.edge_references() {
            union_find.union(edge.source().index(), edge.target().index());
        }

        let mut groups: FxHashMap<usize, Vec<String>> = FxHashMap::default();
        for node in self.graph.node_indices() {
            let root = union_find.find(node.index());
            groups
                .entry(root)
                .or_default()
                .push(arena.get(self.graph[node]).name.clone());
        }

        let mut clusters: Vec<Vec<String>> = groups.into_values().collect();
        for cluster in &mut clusters {
            cluster.sort_unstable();
        }
        clusters.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));
        clusters
    }
}

//! Agglomerative document clustering over a composite similarity.

use deckweave_core::config::SynthesisConfig;
use deckweave_core::types::collections::{FxHashMap, FxHashSet};

use super::types::{ContentCluster, DocumentNode};

/// Jaccard overlap of two string sets, with an empty-union guard.
fn jaccard(a: &FxHashSet<String>, b: &FxHashSet<String>) -> f64 {
    let union = a.union(b).count().max(1);
    a.intersection(b).count() as f64 / union as f64
}

/// Groups document nodes by entity, topic, and metric-key overlap using
/// average-linkage agglomerative merging.
pub struct SemanticClusteringEngine {
    similarity_threshold: f64,
    min_cluster_size: usize,
}

impl SemanticClusteringEngine {
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            similarity_threshold: config.effective_cluster_similarity_threshold(),
            min_cluster_size: config.effective_min_cluster_size(),
        }
    }

    /// Cluster nodes; groups smaller than the minimum size are dropped.
    pub fn cluster_documents(&self, nodes: &[DocumentNode]) -> Vec<ContentCluster> {
        let matrix = self.build_similarity_matrix(nodes);
        let assignments = self.hierarchical_clustering(&matrix);

        let mut ids: Vec<usize> = assignments.keys().copied().collect();
        ids.sort_unstable();

        let mut clusters = Vec::new();
        for cluster_id in ids {
            let members = &assignments[&cluster_id];
            if members.len() >= self.min_cluster_size {
                let member_nodes: Vec<&DocumentNode> =
                    members.iter().map(|&i| &nodes[i]).collect();
                clusters.push(create_cluster(cluster_id, &member_nodes));
            }
        }
        clusters
    }

    fn build_similarity_matrix(&self, nodes: &[DocumentNode]) -> Vec<Vec<f64>> {
        let n = nodes.len();
        let mut matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i + 1..n {
                let sim = calculate_similarity(&nodes[i], &nodes[j]);
                matrix[i][j] = sim;
                matrix[j][i] = sim;
            }
        }
        matrix
    }

    /// Repeatedly merge the most similar cluster pair until no pair
    /// clears the threshold. Merged clusters get fresh IDs past `n`.
    fn hierarchical_clustering(&self, matrix: &[Vec<f64>]) -> FxHashMap<usize, Vec<usize>> {
        let n = matrix.len();
        let mut clusters: FxHashMap<usize, Vec<usize>> =
            (0..n).map(|i| (i, vec![i])).collect();
        let mut next_id = n;

        while clusters.len() > 1 {
            let mut keys: Vec<usize> = clusters.keys().copied().collect();
            keys.sort_unstable();

            let mut max_sim = 0.0;
            let mut merge_pair = None;
            for (i, &c1) in keys.iter().enumerate() {
                for &c2 in &keys[i + 1..] {
                    let sim = cluster_similarity(&clusters[&c1], &clusters[&c2], matrix);
                    if sim > max_sim && sim >= self.similarity_threshold {
                        max_sim = sim;
                        merge_pair = Some((c1, c2));
                    }
                }
            }

            let Some((c1, c2)) = merge_pair else { break };
            let mut merged = clusters.remove(&c1).unwrap_or_default();
            merged.extend(clusters.remove(&c2).unwrap_or_default());
            clusters.insert(next_id, merged);
            next_id += 1;
        }
        clusters
    }
}

/// Composite similarity: 0.4 entities + 0.3 topics + 0.3 metric keys.
fn calculate_similarity(node1: &DocumentNode, node2: &DocumentNode) -> f64 {
    let entity_sim = jaccard(&node1.entities, &node2.entities);
    let topic_sim = jaccard(&node1.topics, &node2.topics);

    let keys1: FxHashSet<String> = node1.key_metrics.keys().cloned().collect();
    let keys2: FxHashSet<String> = node2.key_metrics.keys().cloned().collect();
    let metric_sim = jaccard(&keys1, &keys2);

    0.4 * entity_sim + 0.3 * topic_sim + 0.3 * metric_sim
}

/// Average linkage over all cross-pairs.
fn cluster_similarity(cluster1: &[usize], cluster2: &[usize], matrix: &[Vec<f64>]) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for &i in cluster1 {
        for &j in cluster2 {
            total += matrix[i][j];
            count += 1;
        }
    }
    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}

fn create_cluster(cluster_id: usize, nodes: &[&DocumentNode]) -> ContentCluster {
    let mut entities = FxHashSet::default();
    let mut topics = FxHashSet::default();
    let mut documents = FxHashSet::default();
    let mut time_refs: Vec<&String> = Vec::new();

    for node in nodes {
        entities.extend(node.entities.iter().cloned());
        topics.extend(node.topics.iter().cloned());
        documents.insert(node.doc_id.clone());
        time_refs.extend(node.time_references.iter());
    }

    let time_range = if time_refs.is_empty() {
        None
    } else {
        time_refs.sort_unstable();
        Some((
            time_refs[0].clone(),
            time_refs[time_refs.len() - 1].clone(),
        ))
    };

    let importance_score =
        nodes.iter().map(|n| n.confidence_score).sum::<f64>() / nodes.len() as f64;

    ContentCluster {
        cluster_id: format!("cluster_{cluster_id}"),
        theme: determine_cluster_theme(nodes),
        documents,
        entities,
        topics,
        time_range,
        importance_score,
    }
}

/// Most frequent topic across members; ties go to the lexicographically
/// smallest topic, and topic-free clusters fall back to `general`.
fn determine_cluster_theme(nodes: &[&DocumentNode]) -> String {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for node in nodes {
        for topic in &node.topics {
            *counts.entry(topic.as_str()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|(t1, c1), (t2, c2)| c1.cmp(c2).then(t2.cmp(t1)))
        .map(|(topic, _)| topic.to_string())
        .unwrap_or_else(|| "general".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deckweave_core::types::value::ScalarValue;

    fn node(doc_id: &str, entities: &[&str], topics: &[&str], metrics: &[&str]) -> DocumentNode {
        DocumentNode {
            doc_id: doc_id.to_string(),
            doc_type: super::super::types::DocumentType::Unknown,
            source_path: format!("{doc_id}.txt"),
            content: String::new(),
            extraction_date: 0,
            metadata: FxHashMap::default(),
            entities: entities.iter().map(|s| s.to_string()).collect(),
            topics: topics.iter().map(|s| s.to_string()).collect(),
            key_metrics: metrics
                .iter()
                .map(|k| (k.to_string(), ScalarValue::Number(1.0)))
                .collect(),
            time_references: FxHashSet::default(),
            confidence_score: 0.8,
            content_hash: String::new(),
        }
    }

    fn engine() -> SemanticClusteringEngine {
        SemanticClusteringEngine::new(&SynthesisConfig::default())
    }

    #[test]
    fn identical_nodes_cluster_together() {
        let nodes = vec![
            node("a", &["Acme Corp"], &["revenue", "growth"], &["revenue"]),
            node("b", &["Acme Corp"], &["revenue", "growth"], &["revenue"]),
            node("c", &["Zed Ltd"], &["risk"], &[]),
        ];
        let clusters = engine().cluster_documents(&nodes);
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].documents.contains("a"));
        assert!(clusters[0].documents.contains("b"));
        assert!(!clusters[0].documents.contains("c"));
    }

    #[test]
    fn singletons_are_dropped() {
        let nodes = vec![
            node("a", &["Acme Corp"], &["revenue"], &[]),
            node("b", &["Zed Ltd"], &["risk"], &[]),
        ];
        assert!(engine().cluster_documents(&nodes).is_empty());
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        assert!(engine().cluster_documents(&[]).is_empty());
    }

    #[test]
    fn theme_is_most_frequent_topic_with_lexicographic_ties() {
        let a = node("a", &[], &["growth", "revenue"], &[]);
        let b = node("b", &[], &["growth", "revenue"], &[]);
        let theme = determine_cluster_theme(&[&a, &b]);
        assert_eq!(theme, "growth");
    }

    #[test]
    fn theme_falls_back_to_general() {
        let a = node("a", &[], &[], &[]);
        assert_eq!(determine_cluster_theme(&[&a]), "general");
    }

    #[test]
    fn importance_is_mean_confidence() {
        let mut a = node("a", &["X Corp"], &["risk"], &[]);
        let mut b = node("b", &["X Corp"], &["risk"], &[]);
        a.confidence_score = 0.6;
        b.confidence_score = 1.0;
        let cluster = create_cluster(0, &[&a, &b]);
        assert!((cluster.importance_score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn composite_similarity_weights() {
        let a = node("a", &["X"], &["risk"], &["m"]);
        let b = node("b", &["X"], &["risk"], &["m"]);
        assert!((calculate_similarity(&a, &b) - 1.0).abs() < 1e-12);

        // Only entities overlap here; empty metric sets contribute 0.
        let c = node("c", &["X"], &[], &[]);
        let d = node("d", &["X"], &["risk"], &[]);
        let sim = calculate_similarity(&c, &d);
        assert!((sim - 0.4).abs() < 1e-12);
    }
}

//! Cross-document theme extraction via TF-IDF and density clustering.

use deckweave_core::config::InsightConfig;
use deckweave_core::errors::InsightError;
use deckweave_core::types::collections::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use super::types::Theme;
use crate::synthesis::DocumentNode;

const MAX_FEATURES: usize = 1000;

/// English stopwords excluded from the TF-IDF vocabulary.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now",
    "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "same", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
    "you", "your", "yours", "yourself", "yourselves",
];

/// Lowercased alphanumeric tokens of length >= 2.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// L2-normalized TF-IDF vectors over a shared vocabulary of at most
/// `MAX_FEATURES` terms, ranked by corpus frequency.
fn tfidf_vectors(texts: &[Vec<String>]) -> Vec<Vec<f64>> {
    let stopwords: FxHashSet<&str> = STOPWORDS.iter().copied().collect();

    let mut corpus_counts: FxHashMap<&str, usize> = FxHashMap::default();
    for tokens in texts {
        for token in tokens {
            if !stopwords.contains(token.as_str()) {
                *corpus_counts.entry(token).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(MAX_FEATURES);

    let vocab: FxHashMap<&str, usize> = ranked
        .iter()
        .enumerate()
        .map(|(i, (term, _))| (*term, i))
        .collect();

    let n_docs = texts.len();
    let mut doc_freq = vec![0usize; vocab.len()];
    let mut term_counts: Vec<FxHashMap<usize, usize>> = Vec::with_capacity(n_docs);
    for tokens in texts {
        let mut counts: FxHashMap<usize, usize> = FxHashMap::default();
        for token in tokens {
            if let Some(&idx) = vocab.get(token.as_str()) {
                *counts.entry(idx).or_insert(0) += 1;
            }
        }
        for &idx in counts.keys() {
            doc_freq[idx] += 1;
        }
        term_counts.push(counts);
    }

    // Smoothed idf: ln((1 + n) / (1 + df)) + 1.
    let idf: Vec<f64> = doc_freq
        .iter()
        .map(|&df| ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0)
        .collect();

    term_counts
        .into_iter()
        .map(|counts| {
            let mut vector = vec![0.0; vocab.len()];
            for (idx, count) in counts {
                vector[idx] = count as f64 * idf[idx];
            }
            let norm: f64 = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for v in &mut vector {
                    *v /= norm;
                }
            }
            vector
        })
        .collect()
}

/// Cosine similarity of pre-normalized vectors.
fn cosine(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

const UNVISITED: i64 = -2;
const NOISE: i64 = -1;

/// DBSCAN over a precomputed distance matrix. Returns one label per
/// point; noise points keep label -1.
fn dbscan(distances: &[Vec<f64>], eps: f64, min_samples: usize) -> Vec<i64> {
    let n = distances.len();
    let mut labels = vec![UNVISITED; n];
    let region = |p: usize| -> Vec<usize> {
        (0..n).filter(|&q| distances[p][q] <= eps).collect()
    };

    let mut cluster_id = 0i64;
    for p in 0..n {
        if labels[p] != UNVISITED {
            continue;
        }
        let neighbors = region(p);
        if neighbors.len() < min_samples {
            labels[p] = NOISE;
            continue;
        }

        labels[p] = cluster_id;
        let mut seeds: Vec<usize> = neighbors.into_iter().filter(|&q| q != p).collect();
        let mut i = 0;
        while i < seeds.len() {
            let q = seeds[i];
            i += 1;
            if labels[q] == NOISE {
                labels[q] = cluster_id;
            }
            if labels[q] != UNVISITED {
                continue;
            }
            labels[q] = cluster_id;
            let q_neighbors = region(q);
            if q_neighbors.len() >= min_samples {
                seeds.extend(q_neighbors);
            }
        }
        cluster_id += 1;
    }
    labels
}

/// Groups documents with similar term profiles into named themes.
pub struct ThemeExtractor {
    eps: f64,
    min_support: usize,
}

impl ThemeExtractor {
    pub fn new(config: &InsightConfig) -> Self {
        Self {
            eps: config.effective_theme_eps(),
            min_support: config.effective_theme_min_support(),
        }
    }

    /// Extract themes from the batch. An empty batch yields no themes;
    /// a non-empty batch smaller than the support floor is an error.
    pub fn extract_themes(&self, nodes: &[DocumentNode]) -> Result<Vec<Theme>, InsightError> {
        let usable: Vec<&DocumentNode> = nodes
            .iter()
            .filter(|n| !n.content.trim().is_empty())
            .collect();
        if usable.is_empty() {
            return Ok(Vec::new());
        }
        if usable.len() < self.min_support {
            return Err(InsightError::InsufficientData {
                analysis: "theme extraction".to_string(),
                needed: self.min_support,
                actual: usable.len(),
            });
        }

        let tokens: Vec<Vec<String>> = usable.iter().map(|n| tokenize(&n.content)).collect();
        let vectors = tfidf_vectors(&tokens);

        let n = vectors.len();
        let distances: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| (1.0 - cosine(&vectors[i], &vectors[j])).max(0.0))
                    .collect()
            })
            .collect();

        let labels = dbscan(&distances, self.eps, self.min_support);

        let mut members: FxHashMap<i64, Vec<usize>> = FxHashMap::default();
        for (i, &label) in labels.iter().enumerate() {
            if label >= 0 {
                members.entry(label).or_default().push(i);
            }
        }
        debug!(
            documents = n,
            clusters = members.len(),
            "theme clustering complete"
        );

        let mut themes: Vec<Theme> = members
            .into_iter()
            .map(|(label, indices)| {
                let frequency = indices.len();
                let documents: Vec<String> = indices
                    .iter()
                    .map(|&i| usable[i].doc_id.clone())
                    .collect();
                let mut entities: Vec<String> = indices
                    .iter()
                    .flat_map(|&i| usable[i].entities.iter().cloned())
                    .collect::<FxHashSet<String>>()
                    .into_iter()
                    .collect();
                entities.sort_unstable();

                let confidence = 0.6 * (frequency as f64 / 10.0).min(1.0)
                    + 0.4 * (entities.len() as f64 / 5.0).min(1.0);
                Theme {
                    name: format!("Theme_{label}"),
                    documents,
                    frequency,
                    entities,
                    confidence,
                }
            })
            .collect();

        themes.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        info!(themes = themes.len(), "extracted themes");
        Ok(themes)
    }
}

//! CART classification tree over [`FeatureVector`]s.
//!
//! Nodes live in a flat arena with the root at index 0. Splits send a row
//! left when its feature value is `<= threshold`.

use rand::{rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::model::{FeatureKind, FeatureVector, Label};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: FeatureKind,
        threshold: f64,
        left: u32,
        right: u32,
    },
    Leaf {
        cancel_rate: f64,
        samples: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features considered per split. The search keeps going past this
    /// number only while no valid split has been found.
    pub max_features: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: FeatureKind::ALL.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: FeatureKind,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    rows: &'a [FeatureVector],
    labels: &'a [Label],
    params: &'a TreeParams,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grows a tree on `sample`, a list of row indices that may repeat
    /// (bootstrap draws).
    pub fn fit(
        rows: &[FeatureVector],
        labels: &[Label],
        sample: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut builder = TreeBuilder {
            rows,
            labels,
            params,
            nodes: Vec::new(),
        };
        builder.grow(sample.to_vec(), 0, rng);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn predict_proba(&self, features: &FeatureVector) -> f64 {
        let mut index = 0usize;
        loop {
            match &self.nodes[index] {
                Node::Leaf { cancel_rate, .. } => return *cancel_rate,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features.value(*feature) <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        fn depth_from(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + depth_from(nodes, *left as usize).max(depth_from(nodes, *right as usize))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            depth_from(&self.nodes, 0)
        }
    }

    /// Checks that every child index points forward into the arena, so
    /// traversal of a persisted tree always terminates.
    pub fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                Node::Leaf { cancel_rate, .. } => (0.0..=1.0).contains(cancel_rate),
                Node::Split { left, right, threshold, .. } => {
                    let (left, right) = (*left as usize, *right as usize);
                    threshold.is_finite()
                        && left > i
                        && right > i
                        && left < self.nodes.len()
                        && right < self.nodes.len()
                }
            })
    }
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

impl TreeBuilder<'_> {
    fn grow(&mut self, sample: Vec<usize>, depth: usize, rng: &mut StdRng) -> u32 {
        let index = self.nodes.len() as u32;
        let total = sample.len();
        let positives = sample.iter().filter(|&&i| self.labels[i] == 1).count();

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        let pure = positives == 0 || positives == total;
        if depth_reached || pure || total < self.params.min_samples_split {
            self.push_leaf(positives, total);
            return index;
        }

        let Some(split) = self.best_split(&sample, positives, rng) else {
            self.push_leaf(positives, total);
            return index;
        };

        let (left_sample, right_sample): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.rows[i].value(split.feature) <= split.threshold);

        // Placeholder, patched once both children have been grown.
        self.nodes.push(Node::Leaf {
            cancel_rate: 0.0,
            samples: 0,
        });
        let left = self.grow(left_sample, depth + 1, rng);
        let right = self.grow(right_sample, depth + 1, rng);
        self.nodes[index as usize] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn push_leaf(&mut self, positives: usize, total: usize) {
        let cancel_rate = if total == 0 {
            0.0
        } else {
            positives as f64 / total as f64
        };
        self.nodes.push(Node::Leaf {
            cancel_rate,
            samples: total as u32,
        });
    }

    fn best_split(&self, sample: &[usize], positives: usize, rng: &mut StdRng) -> Option<SplitCandidate> {
        let mut features = FeatureKind::ALL;
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        for (visited, feature) in features.into_iter().enumerate() {
            if visited >= self.params.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_split_for(sample, positives, feature) {
                if best.as_ref().is_none_or(|b| candidate.impurity < b.impurity) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn best_split_for(&self, sample: &[usize], positives: usize, feature: FeatureKind) -> Option<SplitCandidate> {
        let mut values: Vec<(f64, Label)> = sample
            .iter()
            .map(|&i| (self.rows[i].value(feature), self.labels[i]))
            .collect();
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = values.len();
        let mut left_positives = 0usize;
        let mut best: Option<SplitCandidate> = None;

        for i in 0..total - 1 {
            if values[i].1 == 1 {
                left_positives += 1;
            }
            let (current, next) = (values[i].0, values[i + 1].0);
            if current >= next {
                continue;
            }

            let left_total = i + 1;
            let right_total = total - left_total;
            let impurity = (left_total as f64 * gini(left_positives, left_total)
                + right_total as f64 * gini(positives - left_positives, right_total))
                / total as f64;

            if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                let mut threshold = current + (next - current) / 2.0;
                if threshold >= next || !threshold.is_finite() {
                    threshold = current;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
        best
    }
}

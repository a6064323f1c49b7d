//! Random forest and feature scaling primitives.
//!
//! A small CART implementation (Gini impurity, bootstrap sampling, random
//! feature subsets per split) sized for the five-feature traffic model.

use rand::seq::index::sample;
use rand::Rng;

use crate::models::FEATURE_COUNT;

pub type Sample = [f64; FEATURE_COUNT];

/// Zero-mean, unit-variance feature scaler
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Sample,
    scale: Sample,
}

impl StandardScaler {
    /// Fit on a training set. Constant features keep a scale of 1.0.
    pub fn fit(samples: &[Sample]) -> Self {
        let n = samples.len().max(1) as f64;
        let mut mean = [0.0; FEATURE_COUNT];
        for row in samples {
            for (m, value) in mean.iter_mut().zip(row) {
                *m += value / n;
            }
        }

        let mut scale = [0.0; FEATURE_COUNT];
        for row in samples {
            for i in 0..FEATURE_COUNT {
                scale[i] += (row[i] - mean[i]).powi(2) / n;
            }
        }
        for s in scale.iter_mut() {
            *s = s.sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Self { mean, scale }
    }

    pub fn transform(&self, row: &Sample) -> Sample {
        let mut out = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            out[i] = (row[i] - self.mean[i]) / self.scale[i];
        }
        out
    }

    pub fn mean(&self) -> &Sample {
        &self.mean
    }

    pub fn scale(&self) -> &Sample {
        &self.scale
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        /// Fraction of positive samples that reached the leaf
        probability: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Tree growth limits
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub max_features: usize,
    pub min_samples_split: usize,
}

/// Binary decision tree
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    importance: Sample,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

impl DecisionTree {
    /// Grow a tree over `indices` (which may contain repeats) of the data set.
    pub fn fit<R: Rng + ?Sized>(
        rng: &mut R,
        samples: &[Sample],
        labels: &[bool],
        indices: Vec<usize>,
        params: TreeParams,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            importance: [0.0; FEATURE_COUNT],
        };
        tree.grow(rng, samples, labels, indices, 0, params);
        tree
    }

    fn grow<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        samples: &[Sample],
        labels: &[bool],
        indices: Vec<usize>,
        depth: usize,
        params: TreeParams,
    ) -> usize {
        let positives = indices.iter().filter(|&&i| labels[i]).count();
        let total = indices.len();
        let node_id = self.nodes.len();
        let probability = if total == 0 {
            0.0
        } else {
            positives as f64 / total as f64
        };
        self.nodes.push(Node::Leaf { probability });

        let pure = positives == 0 || positives == total;
        if pure || depth >= params.max_depth || total < params.min_samples_split {
            return node_id;
        }

        // Visit features in random order; past `max_features`, keep looking only
        // until some split has been found.
        let order = sample(rng, FEATURE_COUNT, FEATURE_COUNT);
        let max_features = params.max_features.clamp(1, FEATURE_COUNT);
        let mut best: Option<BestSplit> = None;
        for (visited, feature) in order.iter().enumerate() {
            if visited >= max_features && best.is_some() {
                break;
            }
            if let Some(split) = Self::best_split(samples, labels, &indices, feature, positives) {
                if best.as_ref().map_or(true, |b| split.decrease > b.decrease) {
                    best = Some(split);
                }
            }
        }

        let Some(split) = best else {
            return node_id;
        };

        self.importance[split.feature] += split.decrease;
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| samples[i][split.feature] <= split.threshold);

        let left = self.grow(rng, samples, labels, left_idx, depth + 1, params);
        let right = self.grow(rng, samples, labels, right_idx, depth + 1, params);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    // Weighted impurity decrease is reported unnormalized (counts, not fractions).
    fn best_split(
        samples: &[Sample],
        labels: &[bool],
        indices: &[usize],
        feature: usize,
        positives: usize,
    ) -> Option<BestSplit> {
        let total = indices.len();
        let mut column: Vec<(f64, bool)> = indices
            .iter()
            .map(|&i| (samples[i][feature], labels[i]))
            .collect();
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let parent = total as f64 * gini(positives, total);
        let mut best: Option<BestSplit> = None;
        let mut left_pos = 0;

        for k in 1..total {
            if column[k - 1].1 {
                left_pos += 1;
            }
            let (prev, next) = (column[k - 1].0, column[k].0);
            if prev == next {
                continue;
            }
            let right_pos = positives - left_pos;
            let child =
                k as f64 * gini(left_pos, k) + (total - k) as f64 * gini(right_pos, total - k);
            let decrease = parent - child;
            if decrease > best.as_ref().map_or(0.0, |b| b.decrease) {
                best = Some(BestSplit {
                    feature,
                    threshold: prev + (next - prev) / 2.0,
                    decrease,
                });
            }
        }

        best
    }

    /// Probability of the positive class
    pub fn predict(&self, row: &Sample) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { probability } => return *probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Impurity decrease per feature, normalized to sum to 1 (all zeros for a stump).
    pub fn feature_importance(&self) -> Sample {
        normalize(self.importance)
    }
}

fn normalize(mut values: Sample) -> Sample {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
    values
}

/// Bagged ensemble of decision trees
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit `n_estimators` trees on bootstrap resamples of the data.
    pub fn fit<R: Rng + ?Sized>(
        rng: &mut R,
        samples: &[Sample],
        labels: &[bool],
        n_estimators: usize,
        max_depth: usize,
    ) -> Self {
        let params = TreeParams {
            max_depth,
            max_features: (FEATURE_COUNT as f64).sqrt() as usize,
            min_samples_split: 2,
        };
        let n = samples.len();

        let trees = (0..n_estimators)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(&mut *rng, samples, labels, bootstrap, params)
            })
            .collect();

        Self { trees }
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Mean positive-class probability across trees
    pub fn predict_proba(&self, row: &Sample) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|tree| tree.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    /// Mean decrease in impurity, averaged over trees and normalized to sum to 1
    pub fn feature_importance(&self) -> Sample {
        let mut total = [0.0; FEATURE_COUNT];
        for tree in &self.trees {
            for (t, v) in total.iter_mut().zip(tree.feature_importance()) {
                *t += v;
            }
        }
        normalize(total)
    }
}

//! The pluggable predictor interface (spec §4.G "Predictor interface")
//! and its four concrete implementations: a logistic-style linear
//! model, a small variance-reduction decision tree, a one-hidden-layer
//! feed-forward network, and a weighted ensemble over any of the above.
//!
//! All four share one contract so the Pre-loader depends only on the
//! trait (spec §9 "Predictor as a strategy"), never a concrete model.
//! None pull in an ML framework — `statrs` (already in the teacher's
//! stack) supplies the logistic function the linear and neural models'
//! activations and online updates share, and the variance computation
//! behind the decision tree's split scoring; everything else is plain
//! arithmetic over `[f64; FEATURE_COUNT]`, matching the corpus's
//! outlier-detection modules (`patterns::outliers`) in spirit: several
//! small, explicit, independently testable scoring methods behind one
//! selection/ensemble layer.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

/// One labelled observation used for (re)training: a candidate's
/// feature vector at prediction time, and whether it was actually
/// accessed soon after (spec §4.G "observed_accessed").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPattern {
    pub features: FeatureVector,
    pub accessed: bool,
}

/// Four-method interface every predictor implements (spec §4.G). The
/// core depends only on this; concrete models are interchangeable.
pub trait Predictor: Send + Sync {
    /// Batch (re)train from scratch on the given patterns.
    fn train(&self, patterns: &[TrainingPattern]);
    /// Score one candidate's feature vector into `[0, 1]`.
    fn predict(&self, features: &FeatureVector) -> f64;
    /// Relative importance per named feature, summing to ~1.0.
    fn feature_importance(&self) -> HashMap<String, f64>;
    /// Apply a single gradient-style update from one fresh observation.
    /// Models that cannot update incrementally (e.g. the decision tree)
    /// are a documented no-op rather than an error.
    fn update_online(&self, pattern: &TrainingPattern, observed_accessed: bool);
}

fn sigmoid(x: f64) -> f64 {
    statrs::function::logistic::logistic(x)
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

// ─── Linear (logistic-style) predictor ─────────────────────────────────

/// `sigmoid(w . x + b)`. Trained by a handful of full-batch gradient
/// steps; `update_online` takes exactly one SGD step per observation
/// (spec §4.G "a single gradient-style step per observation").
pub struct LinearPredictor {
    weights: RwLock<[f64; FEATURE_COUNT]>,
    bias: RwLock<f64>,
    learning_rate: f64,
    epochs: usize,
}

impl LinearPredictor {
    pub fn new() -> Self {
        Self::with_learning_rate(0.1, 50)
    }

    pub fn with_learning_rate(learning_rate: f64, epochs: usize) -> Self {
        Self {
            weights: RwLock::new([0.0; FEATURE_COUNT]),
            bias: RwLock::new(0.0),
            learning_rate,
            epochs,
        }
    }

    fn score(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let weights = self.weights.read();
        let bias = *self.bias.read();
        let dot: f64 = weights.iter().zip(x.iter()).map(|(w, v)| w * v).sum();
        sigmoid(dot + bias)
    }

    fn sgd_step(&self, x: &[f64; FEATURE_COUNT], label: f64) {
        let prediction = self.score(x);
        let error = label - prediction;
        let mut weights = self.weights.write();
        for (w, v) in weights.iter_mut().zip(x.iter()) {
            *w += self.learning_rate * error * v;
        }
        *self.bias.write() += self.learning_rate * error;
    }
}

impl Default for LinearPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for LinearPredictor {
    fn train(&self, patterns: &[TrainingPattern]) {
        if patterns.is_empty() {
            return;
        }
        for _ in 0..self.epochs {
            for pattern in patterns {
                let label = if pattern.accessed { 1.0 } else { 0.0 };
                self.sgd_step(&pattern.features.as_array(), label);
            }
        }
    }

    fn predict(&self, features: &FeatureVector) -> f64 {
        clamp01(self.score(&features.as_array()))
    }

    fn feature_importance(&self) -> HashMap<String, f64> {
        let weights = self.weights.read();
        let total: f64 = weights.iter().map(|w| w.abs()).sum::<f64>().max(1e-9);
        FEATURE_NAMES
            .iter()
            .zip(weights.iter())
            .map(|(name, w)| (name.to_string(), w.abs() / total))
            .collect()
    }

    fn update_online(&self, pattern: &TrainingPattern, observed_accessed: bool) {
        let label = if observed_accessed { 1.0 } else { 0.0 };
        self.sgd_step(&pattern.features.as_array(), label);
    }
}

// ─── Decision tree predictor ────────────────────────────────────────────

struct TreeNode {
    feature: usize,
    threshold: f64,
    left: Box<TreeNode>,
    right: Box<TreeNode>,
}

enum Tree {
    Leaf(f64),
    Split(TreeNode),
}

/// A shallow CART-style regression tree over the `{0, 1}` access
/// label, split by variance reduction. Rebuilt wholesale on `train`;
/// `update_online` cannot graft a single observation into an existing
/// split without risking an inconsistent tree, so it is a documented
/// no-op (spec §4.G: "for models that support it").
pub struct DecisionTreePredictor {
    max_depth: usize,
    min_samples_split: usize,
    tree: RwLock<Option<Tree>>,
    importance: RwLock<[f64; FEATURE_COUNT]>,
}

impl DecisionTreePredictor {
    pub fn new() -> Self {
        Self::with_limits(4, 4)
    }

    pub fn with_limits(max_depth: usize, min_samples_split: usize) -> Self {
        Self {
            max_depth,
            min_samples_split,
            tree: RwLock::new(None),
            importance: RwLock::new([0.0; FEATURE_COUNT]),
        }
    }

    fn variance(labels: &[f64]) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        use statrs::statistics::Statistics;
        labels.population_variance()
    }

    fn build(
        rows: &[([f64; FEATURE_COUNT], f64)],
        depth: usize,
        max_depth: usize,
        min_samples_split: usize,
        importance: &mut [f64; FEATURE_COUNT],
    ) -> Tree {
        let labels: Vec<f64> = rows.iter().map(|(_, y)| *y).collect();
        let leaf_value = labels.iter().sum::<f64>() / labels.len().max(1) as f64;

        if depth >= max_depth || rows.len() < min_samples_split {
            return Tree::Leaf(leaf_value);
        }

        let parent_variance = Self::variance(&labels);
        if parent_variance <= f64::EPSILON {
            return Tree::Leaf(leaf_value);
        }

        let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, reduction)
        for feature in 0..FEATURE_COUNT {
            let mut values: Vec<f64> = rows.iter().map(|(x, _)| x[feature]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();
            for window in values.windows(2) {
                let threshold = (window[0] + window[1]) / 2.0;
                let left_labels: Vec<f64> =
                    rows.iter().filter(|(x, _)| x[feature] <= threshold).map(|(_, y)| *y).collect();
                let right_labels: Vec<f64> =
                    rows.iter().filter(|(x, _)| x[feature] > threshold).map(|(_, y)| *y).collect();
                if left_labels.is_empty() || right_labels.is_empty() {
                    continue;
                }
                let weighted = (left_labels.len() as f64 * Self::variance(&left_labels)
                    + right_labels.len() as f64 * Self::variance(&right_labels))
                    / rows.len() as f64;
                let reduction = parent_variance - weighted;
                if best.map(|(_, _, best_reduction)| reduction > best_reduction).unwrap_or(true) {
                    best = Some((feature, threshold, reduction));
                }
            }
        }

        let Some((feature, threshold, reduction)) = best else {
            return Tree::Leaf(leaf_value);
        };
        if reduction <= f64::EPSILON {
            return Tree::Leaf(leaf_value);
        }
        importance[feature] += reduction;

        let left_rows: Vec<_> = rows.iter().filter(|(x, _)| x[feature] <= threshold).cloned().collect();
        let right_rows: Vec<_> = rows.iter().filter(|(x, _)| x[feature] > threshold).cloned().collect();

        Tree::Split(TreeNode {
            feature,
            threshold,
            left: Box::new(Self::build(&left_rows, depth + 1, max_depth, min_samples_split, importance)),
            right: Box::new(Self::build(&right_rows, depth + 1, max_depth, min_samples_split, importance)),
        })
    }

    fn walk(tree: &Tree, x: &[f64; FEATURE_COUNT]) -> f64 {
        match tree {
            Tree::Leaf(value) => *value,
            Tree::Split(node) => {
                if x[node.feature] <= node.threshold {
                    Self::walk(&node.left, x)
                } else {
                    Self::walk(&node.right, x)
                }
            }
        }
    }
}

impl Default for DecisionTreePredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for DecisionTreePredictor {
    fn train(&self, patterns: &[TrainingPattern]) {
        if patterns.is_empty() {
            *self.tree.write() = None;
            return;
        }
        let rows: Vec<([f64; FEATURE_COUNT], f64)> = patterns
            .iter()
            .map(|p| (p.features.as_array(), if p.accessed { 1.0 } else { 0.0 }))
            .collect();
        let mut importance = [0.0; FEATURE_COUNT];
        let tree = Self::build(&rows, 0, self.max_depth, self.min_samples_split, &mut importance);
        *self.importance.write() = importance;
        *self.tree.write() = Some(tree);
    }

    fn predict(&self, features: &FeatureVector) -> f64 {
        let guard = self.tree.read();
        match guard.as_ref() {
            Some(tree) => clamp01(Self::walk(tree, &features.as_array())),
            None => 0.0,
        }
    }

    fn feature_importance(&self) -> HashMap<String, f64> {
        let importance = self.importance.read();
        let total: f64 = importance.iter().sum::<f64>().max(1e-9);
        FEATURE_NAMES
            .iter()
            .zip(importance.iter())
            .map(|(name, v)| (name.to_string(), v / total))
            .collect()
    }

    fn update_online(&self, _pattern: &TrainingPattern, _observed_accessed: bool) {
        // No-op by design: see struct doc comment.
    }
}

// ─── Small feed-forward network ────────────────────────────────────────

/// One hidden layer, sigmoid activations throughout (spec §4.G: "small
/// feed-forward network with sigmoid activations"). Trained with plain
/// backpropagation; `update_online` runs one step of the same gradient
/// rule on a single example.
pub struct NeuralPredictor {
    hidden_size: usize,
    learning_rate: f64,
    epochs: usize,
    w1: RwLock<Vec<[f64; FEATURE_COUNT]>>, // hidden_size x inputs
    b1: RwLock<Vec<f64>>,
    w2: RwLock<Vec<f64>>, // hidden_size
    b2: RwLock<f64>,
}

impl NeuralPredictor {
    pub fn new() -> Self {
        Self::with_hidden_size(8, 0.1, 200)
    }

    pub fn with_hidden_size(hidden_size: usize, learning_rate: f64, epochs: usize) -> Self {
        // Deterministic small init (no RNG dependency): alternating
        // small signed magnitudes, never producing an all-zero layer
        // that would leave gradients stuck in symmetry.
        let w1 = (0..hidden_size)
            .map(|h| {
                let mut row = [0.0; FEATURE_COUNT];
                for (i, slot) in row.iter_mut().enumerate() {
                    let sign = if (h + i) % 2 == 0 { 1.0 } else { -1.0 };
                    *slot = sign * 0.05 * ((i + 1) as f64 / FEATURE_COUNT as f64);
                }
                row
            })
            .collect();
        let w2 = (0..hidden_size)
            .map(|h| if h % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        Self {
            hidden_size,
            learning_rate,
            epochs,
            w1: RwLock::new(w1),
            b1: RwLock::new(vec![0.0; hidden_size]),
            w2: RwLock::new(w2),
            b2: RwLock::new(0.0),
        }
    }

    fn forward(&self, x: &[f64; FEATURE_COUNT]) -> (Vec<f64>, f64) {
        let w1 = self.w1.read();
        let b1 = self.b1.read();
        let w2 = self.w2.read();
        let b2 = *self.b2.read();

        let hidden: Vec<f64> = (0..self.hidden_size)
            .map(|h| {
                let sum: f64 = w1[h].iter().zip(x.iter()).map(|(w, v)| w * v).sum::<f64>() + b1[h];
                sigmoid(sum)
            })
            .collect();
        let output = sigmoid(hidden.iter().zip(w2.iter()).map(|(h, w)| h * w).sum::<f64>() + b2);
        (hidden, output)
    }

    fn backward(&self, x: &[f64; FEATURE_COUNT], label: f64) {
        let (hidden, output) = self.forward(x);
        let output_error = label - output;
        let output_delta = output_error * output * (1.0 - output);

        let mut w1 = self.w1.write();
        let mut b1 = self.b1.write();
        let mut w2 = self.w2.write();
        let mut b2 = self.b2.write();

        for h in 0..self.hidden_size {
            let hidden_error = output_delta * w2[h];
            let hidden_delta = hidden_error * hidden[h] * (1.0 - hidden[h]);
            for (w, v) in w1[h].iter_mut().zip(x.iter()) {
                *w += self.learning_rate * hidden_delta * v;
            }
            b1[h] += self.learning_rate * hidden_delta;
            w2[h] += self.learning_rate * output_delta * hidden[h];
        }
        *b2 += self.learning_rate * output_delta;
    }
}

impl Default for NeuralPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for NeuralPredictor {
    fn train(&self, patterns: &[TrainingPattern]) {
        if patterns.is_empty() {
            return;
        }
        for _ in 0..self.epochs {
            for pattern in patterns {
                let label = if pattern.accessed { 1.0 } else { 0.0 };
                self.backward(&pattern.features.as_array(), label);
            }
        }
    }

    fn predict(&self, features: &FeatureVector) -> f64 {
        clamp01(self.forward(&features.as_array()).1)
    }

    fn feature_importance(&self) -> HashMap<String, f64> {
        // Approximate: sum of |w1| across hidden units per input,
        // weighted by the output layer's |w2| for that unit.
        let w1 = self.w1.read();
        let w2 = self.w2.read();
        let mut per_feature = [0.0; FEATURE_COUNT];
        for h in 0..self.hidden_size {
            for (f, w) in w1[h].iter().enumerate() {
                per_feature[f] += w.abs() * w2[h].abs();
            }
        }
        let total: f64 = per_feature.iter().sum::<f64>().max(1e-9);
        FEATURE_NAMES
            .iter()
            .zip(per_feature.iter())
            .map(|(name, v)| (name.to_string(), v / total))
            .collect()
    }

    fn update_online(&self, pattern: &TrainingPattern, observed_accessed: bool) {
        let label = if observed_accessed { 1.0 } else { 0.0 };
        self.backward(&pattern.features.as_array(), label);
    }
}

// ─── Ensemble ────────────────────────────────────────────────────────

/// A weighted sum over any number of member predictors — itself just
/// another implementation of [`Predictor`] (spec §9: "The 'ensemble' is
/// itself an implementation of the same interface over a weighted sum
/// of others").
pub struct EnsemblePredictor {
    members: Vec<(Box<dyn Predictor>, f64)>,
}

impl EnsemblePredictor {
    pub fn new(members: Vec<(Box<dyn Predictor>, f64)>) -> Self {
        Self { members }
    }

    /// The three reference models in equal proportion.
    pub fn default_trio() -> Self {
        Self::new(vec![
            (Box::new(LinearPredictor::new()), 1.0),
            (Box::new(DecisionTreePredictor::new()), 1.0),
            (Box::new(NeuralPredictor::new()), 1.0),
        ])
    }

    fn total_weight(&self) -> f64 {
        self.members.iter().map(|(_, w)| w).sum::<f64>().max(1e-9)
    }
}

impl Predictor for EnsemblePredictor {
    fn train(&self, patterns: &[TrainingPattern]) {
        for (member, _) in &self.members {
            member.train(patterns);
        }
    }

    fn predict(&self, features: &FeatureVector) -> f64 {
        let total = self.total_weight();
        let weighted: f64 = self
            .members
            .iter()
            .map(|(member, weight)| member.predict(features) * weight)
            .sum();
        clamp01(weighted / total)
    }

    fn feature_importance(&self) -> HashMap<String, f64> {
        let total = self.total_weight();
        let mut merged: HashMap<String, f64> = FEATURE_NAMES.iter().map(|n| (n.to_string(), 0.0)).collect();
        for (member, weight) in &self.members {
            for (name, importance) in member.feature_importance() {
                *merged.entry(name).or_insert(0.0) += importance * weight / total;
            }
        }
        merged
    }

    fn update_online(&self, pattern: &TrainingPattern, observed_accessed: bool) {
        for (member, _) in &self.members {
            member.update_online(pattern, observed_accessed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(values: [f64; FEATURE_COUNT], accessed: bool) -> TrainingPattern {
        TrainingPattern {
            features: FeatureVector {
                temporal_proximity: values[0],
                spatial_proximity: values[1],
                access_frequency: values[2],
                file_type: values[3],
                directory_depth: values[4],
                dependency_count: values[5],
                mean_dependency_strength: values[6],
                in_degree: values[7],
                entry_point: values[8],
                core_file: values[9],
                workspace_relevance: values[10],
                time_of_day: values[11],
                day_of_week: values[12],
            },
            accessed,
        }
    }

    fn separable_patterns() -> Vec<TrainingPattern> {
        let mut patterns = Vec::new();
        for _ in 0..20 {
            patterns.push(pattern([1.0; FEATURE_COUNT], true));
            patterns.push(pattern([0.0; FEATURE_COUNT], false));
        }
        patterns
    }

    #[test]
    fn linear_predictor_learns_separable_pattern() {
        let model = LinearPredictor::new();
        model.train(&separable_patterns());
        assert!(model.predict(&pattern([1.0; FEATURE_COUNT], true).features) > 0.7);
        assert!(model.predict(&pattern([0.0; FEATURE_COUNT], false).features) < 0.3);
    }

    #[test]
    fn linear_predictor_importance_sums_to_one() {
        let model = LinearPredictor::new();
        model.train(&separable_patterns());
        let importance: f64 = model.feature_importance().values().sum();
        assert!((importance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn untrained_predictors_stay_in_unit_range() {
        let linear = LinearPredictor::new();
        let tree = DecisionTreePredictor::new();
        let nn = NeuralPredictor::new();
        let sample = pattern([0.5; FEATURE_COUNT], true).features;
        for score in [linear.predict(&sample), tree.predict(&sample), nn.predict(&sample)] {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn decision_tree_learns_separable_pattern() {
        let model = DecisionTreePredictor::new();
        model.train(&separable_patterns());
        assert!(model.predict(&pattern([1.0; FEATURE_COUNT], true).features) > 0.7);
        assert!(model.predict(&pattern([0.0; FEATURE_COUNT], false).features) < 0.3);
    }

    #[test]
    fn neural_predictor_learns_separable_pattern() {
        let model = NeuralPredictor::new();
        model.train(&separable_patterns());
        assert!(model.predict(&pattern([1.0; FEATURE_COUNT], true).features) > 0.6);
        assert!(model.predict(&pattern([0.0; FEATURE_COUNT], false).features) < 0.4);
    }

    #[test]
    fn ensemble_averages_member_scores() {
        let ensemble = EnsemblePredictor::default_trio();
        ensemble.train(&separable_patterns());
        let score = ensemble.predict(&pattern([1.0; FEATURE_COUNT], true).features);
        assert!((0.0..=1.0).contains(&score));
        assert!(score > 0.5);
    }

    #[test]
    fn update_online_nudges_linear_toward_label() {
        let model = LinearPredictor::new();
        let before = model.predict(&pattern([1.0; FEATURE_COUNT], true).features);
        for _ in 0..50 {
            model.update_online(&pattern([1.0; FEATURE_COUNT], true), true);
        }
        let after = model.predict(&pattern([1.0; FEATURE_COUNT], true).features);
        assert!(after > before);
    }

    #[test]
    fn decision_tree_update_online_is_a_documented_no_op() {
        let model = DecisionTreePredictor::new();
        model.train(&separable_patterns());
        let before = model.predict(&pattern([1.0; FEATURE_COUNT], true).features);
        model.update_online(&pattern([0.0; FEATURE_COUNT], false), false);
        let after = model.predict(&pattern([1.0; FEATURE_COUNT], true).features);
        assert_eq!(before, after);
    }
}

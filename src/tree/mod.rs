//! Decision tree and random forest classifiers.
//!
//! CART trees with Gini impurity, and a bootstrap-aggregated forest with
//! majority voting. Seeded random states make training reproducible; the
//! fitted forest is serde-serializable so it can travel inside the model
//! artifact.

mod helpers;

use crate::error::{HuellaError, Result};
use crate::primitives::Matrix;
use helpers::build_tree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal node carrying the predicted class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Leaf {
    pub(crate) class_label: usize,
}

/// Internal node splitting one feature at a threshold.
///
/// The impurity decrease and sample count are recorded at build time so
/// feature importances fall out of a single traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Split {
    pub(crate) feature_idx: usize,
    pub(crate) threshold: f32,
    pub(crate) gain: f32,
    pub(crate) n_samples: usize,
    pub(crate) left: Box<TreeNode>,
    pub(crate) right: Box<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum TreeNode {
    Leaf(Leaf),
    Split(Split),
}

/// Decision tree classifier using the CART algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    tree: Option<TreeNode>,
    max_depth: Option<usize>,
    n_features: Option<usize>,
}

impl DecisionTreeClassifier {
    /// Creates a classifier with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: None,
            max_depth: None,
            n_features: None,
        }
    }

    /// Sets the maximum depth of the tree (root has depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Fits the tree to training data.
    ///
    /// # Errors
    ///
    /// Returns an error for empty data or a sample/label count mismatch.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        let (n_rows, n_cols) = x.shape();
        if n_rows != y.len() {
            return Err(HuellaError::dimension_mismatch("samples", n_rows, y.len()));
        }
        if n_rows == 0 {
            return Err(HuellaError::empty_input("training data"));
        }

        self.n_features = Some(n_cols);
        self.tree = Some(build_tree(x, y, 0, self.max_depth));
        Ok(())
    }

    /// Predicts class labels for samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree is unfitted or the input width
    /// disagrees with the width seen at fit time.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        let tree = self.tree.as_ref().ok_or(HuellaError::ValidationError {
            message: "DecisionTreeClassifier not fitted".to_string(),
        })?;
        let (n_samples, n_features) = x.shape();
        if let Some(expected) = self.n_features {
            if n_features != expected {
                return Err(HuellaError::dimension_mismatch(
                    "features",
                    expected,
                    n_features,
                ));
            }
        }

        let mut predictions = Vec::with_capacity(n_samples);
        for row in 0..n_samples {
            let mut node = tree;
            let label = loop {
                match node {
                    TreeNode::Leaf(leaf) => break leaf.class_label,
                    TreeNode::Split(split) => {
                        node = if x.get(row, split.feature_idx) <= split.threshold {
                            &split.left
                        } else {
                            &split.right
                        };
                    }
                }
            };
            predictions.push(label);
        }
        Ok(predictions)
    }

    /// Accuracy on test data.
    ///
    /// # Errors
    ///
    /// Propagates prediction errors.
    pub fn score(&self, x: &Matrix<f32>, y: &[usize]) -> Result<f32> {
        let predictions = self.predict(x)?;
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(pred, truth)| pred == truth)
            .count();
        Ok(correct as f32 / y.len() as f32)
    }

    /// Per-feature importance: impurity decrease weighted by the samples
    /// reaching each split, summed over the tree. Unnormalized.
    #[must_use]
    pub fn feature_importances(&self, n_features: usize) -> Vec<f32> {
        let mut importances = vec![0.0; n_features];
        if let Some(tree) = &self.tree {
            accumulate_importances(tree, &mut importances);
        }
        importances
    }
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn accumulate_importances(node: &TreeNode, importances: &mut [f32]) {
    if let TreeNode::Split(split) = node {
        if split.feature_idx < importances.len() {
            importances[split.feature_idx] += split.gain * split.n_samples as f32;
        }
        accumulate_importances(&split.left, importances);
        accumulate_importances(&split.right, importances);
    }
}

/// Random forest classifier: bagged CART trees with majority voting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTreeClassifier>,
    n_estimators: usize,
    max_depth: Option<usize>,
    random_state: Option<u64>,
    n_features: Option<usize>,
}

impl RandomForestClassifier {
    /// Creates a forest with `n_estimators` trees.
    #[must_use]
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            random_state: None,
            n_features: None,
        }
    }

    /// Sets the maximum depth for each tree.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Sets the random state for reproducible bootstrap sampling.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Number of features the forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    /// Fits the forest: each tree trains on a bootstrap sample.
    ///
    /// # Errors
    ///
    /// Returns an error for empty data or a sample/label count mismatch.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &[usize]) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples != y.len() {
            return Err(HuellaError::dimension_mismatch(
                "samples", n_samples, y.len(),
            ));
        }
        if n_samples == 0 {
            return Err(HuellaError::empty_input("training data"));
        }

        self.n_features = Some(n_features);
        self.trees = Vec::with_capacity(self.n_estimators);

        for i in 0..self.n_estimators {
            let seed = self.random_state.map(|s| s + i as u64);
            let indices = bootstrap_sample(n_samples, seed);

            let mut data = Vec::with_capacity(n_samples * n_features);
            let mut labels = Vec::with_capacity(n_samples);
            for &idx in &indices {
                for col in 0..n_features {
                    data.push(x.get(idx, col));
                }
                labels.push(y[idx]);
            }
            let bootstrap_x = Matrix::from_vec(n_samples, n_features, data)
                .map_err(|e| HuellaError::Other(e.to_string()))?;

            let mut tree = match self.max_depth {
                Some(depth) => DecisionTreeClassifier::new().with_max_depth(depth),
                None => DecisionTreeClassifier::new(),
            };
            tree.fit(&bootstrap_x, &labels)?;
            self.trees.push(tree);
        }

        Ok(())
    }

    /// Predicts by majority vote across trees, ties broken toward the
    /// lowest class id.
    ///
    /// # Errors
    ///
    /// Returns an error if the forest is unfitted or the input width
    /// disagrees with the width seen at fit time.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vec<usize>> {
        if self.trees.is_empty() {
            return Err(HuellaError::ValidationError {
                message: "RandomForestClassifier not fitted".to_string(),
            });
        }

        let n_samples = x.n_rows();
        let per_tree: Vec<Vec<usize>> = self
            .trees
            .iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<_>>()?;

        let mut predictions = Vec::with_capacity(n_samples);
        for sample_idx in 0..n_samples {
            let mut votes: BTreeMap<usize, usize> = BTreeMap::new();
            for tree_predictions in &per_tree {
                *votes.entry(tree_predictions[sample_idx]).or_insert(0) += 1;
            }
            let mut winner = 0;
            let mut best_count = 0;
            for (class, count) in votes {
                if count > best_count {
                    best_count = count;
                    winner = class;
                }
            }
            predictions.push(winner);
        }
        Ok(predictions)
    }

    /// Accuracy on test data.
    ///
    /// # Errors
    ///
    /// Propagates prediction errors.
    pub fn score(&self, x: &Matrix<f32>, y: &[usize]) -> Result<f32> {
        let predictions = self.predict(x)?;
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(pred, truth)| pred == truth)
            .count();
        Ok(correct as f32 / y.len() as f32)
    }

    /// Forest-level feature importances: per-tree importances averaged
    /// and normalized to sum to 1.0. `None` before fitting.
    #[must_use]
    pub fn feature_importances(&self) -> Option<Vec<f32>> {
        let n_features = self.n_features?;
        if self.trees.is_empty() {
            return None;
        }

        let mut totals = vec![0.0; n_features];
        for tree in &self.trees {
            for (slot, importance) in totals
                .iter_mut()
                .zip(tree.feature_importances(n_features))
            {
                *slot += importance;
            }
        }

        let n_trees = self.trees.len() as f32;
        for value in &mut totals {
            *value /= n_trees;
        }
        let sum: f32 = totals.iter().sum();
        if sum > 0.0 {
            for value in &mut totals {
                *value /= sum;
            }
        }
        Some(totals)
    }
}

/// Draws `n_samples` indices with replacement, seeded when a random
/// state is given.
fn bootstrap_sample(n_samples: usize, random_state: Option<u64>) -> Vec<usize> {
    use rand::distributions::{Distribution, Uniform};
    use rand::SeedableRng;

    let dist = Uniform::from(0..n_samples);
    let mut indices = Vec::with_capacity(n_samples);

    if let Some(seed) = random_state {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        for _ in 0..n_samples {
            indices.push(dist.sample(&mut rng));
        }
    } else {
        let mut rng = rand::thread_rng();
        for _ in 0..n_samples {
            indices.push(dist.sample(&mut rng));
        }
    }

    indices
}

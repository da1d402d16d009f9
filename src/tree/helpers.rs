//! Internal helpers for CART tree building.

use super::{Leaf, Split, TreeNode};
use crate::primitives::Matrix;
use std::collections::{BTreeMap, HashSet};

/// Gini impurity of a label set: 1 - Σ p_i².
pub(super) fn gini_impurity(labels: &[usize]) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }

    // BTreeMap for deterministic iteration order
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0usize) += 1;
    }

    let n = labels.len() as f32;
    let mut gini = 1.0;
    for count in counts.values() {
        let p = *count as f32 / n;
        gini -= p * p;
    }
    gini
}

/// Sample-weighted Gini impurity of a two-way split.
pub(super) fn gini_split(left: &[usize], right: &[usize]) -> f32 {
    let n_left = left.len() as f32;
    let n_right = right.len() as f32;
    let n_total = n_left + n_right;
    if n_total == 0.0 {
        return 0.0;
    }
    (n_left / n_total) * gini_impurity(left) + (n_right / n_total) * gini_impurity(right)
}

/// Most frequent class, ties broken toward the lowest class id.
pub(super) fn majority_class(labels: &[usize]) -> usize {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0usize) += 1;
    }
    // Ascending key order plus a strictly-greater test → ties keep the
    // lowest class id.
    let mut best_label = 0;
    let mut best_count = 0;
    for (label, count) in counts {
        if count > best_count {
            best_count = count;
            best_label = label;
        }
    }
    best_label
}

/// Best (threshold, gain) for one feature column, if any split improves
/// on the parent impurity.
fn best_split_for_column(column: &[f32], y: &[usize]) -> Option<(f32, f32)> {
    if column.len() < 2 {
        return None;
    }

    let mut unique: Vec<f32> = column.to_vec();
    unique.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    unique.dedup();
    if unique.len() < 2 {
        return None;
    }

    let parent_impurity = gini_impurity(y);
    let mut best_gain = 0.0;
    let mut best_threshold = 0.0;

    for pair in unique.windows(2) {
        let threshold = (pair[0] + pair[1]) / 2.0;
        let mut left = Vec::new();
        let mut right = Vec::new();
        for (idx, &val) in column.iter().enumerate() {
            if val <= threshold {
                left.push(y[idx]);
            } else {
                right.push(y[idx]);
            }
        }
        if left.is_empty() || right.is_empty() {
            continue;
        }
        let gain = parent_impurity - gini_split(&left, &right);
        if gain > best_gain {
            best_gain = gain;
            best_threshold = threshold;
        }
    }

    (best_gain > 0.0).then_some((best_threshold, best_gain))
}

/// Best (feature, threshold, gain) across all columns.
fn best_split(x: &Matrix<f32>, y: &[usize]) -> Option<(usize, f32, f32)> {
    let (n_samples, n_features) = x.shape();
    if n_samples < 2 {
        return None;
    }

    let mut best: Option<(usize, f32, f32)> = None;
    for feature_idx in 0..n_features {
        let column: Vec<f32> = (0..n_samples).map(|row| x.get(row, feature_idx)).collect();
        if let Some((threshold, gain)) = best_split_for_column(&column, y) {
            if best.map_or(true, |(_, _, g)| gain > g) {
                best = Some((feature_idx, threshold, gain));
            }
        }
    }
    best
}

/// Partitions row indices on a feature threshold; `None` when one side
/// would be empty.
fn partition_rows(
    x: &Matrix<f32>,
    feature_idx: usize,
    threshold: f32,
) -> Option<(Vec<usize>, Vec<usize>)> {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for row in 0..x.n_rows() {
        if x.get(row, feature_idx) <= threshold {
            left.push(row);
        } else {
            right.push(row);
        }
    }
    if left.is_empty() || right.is_empty() {
        None
    } else {
        Some((left, right))
    }
}

/// Copies the selected rows into a new (matrix, labels) pair.
fn take_rows(x: &Matrix<f32>, y: &[usize], indices: &[usize]) -> (Matrix<f32>, Vec<usize>) {
    let n_cols = x.n_cols();
    let mut data = Vec::with_capacity(indices.len() * n_cols);
    let mut labels = Vec::with_capacity(indices.len());
    for &idx in indices {
        for col in 0..n_cols {
            data.push(x.get(idx, col));
        }
        labels.push(y[idx]);
    }
    let matrix = Matrix::from_vec(indices.len(), n_cols, data)
        .expect("row subset dimensions are consistent by construction");
    (matrix, labels)
}

/// Builds a CART tree recursively.
pub(super) fn build_tree(
    x: &Matrix<f32>,
    y: &[usize],
    depth: usize,
    max_depth: Option<usize>,
) -> TreeNode {
    let n_samples = y.len();

    let unique: HashSet<usize> = y.iter().copied().collect();
    if unique.len() == 1 {
        return TreeNode::Leaf(Leaf { class_label: y[0] });
    }
    if max_depth.is_some_and(|max| depth >= max) {
        return TreeNode::Leaf(Leaf {
            class_label: majority_class(y),
        });
    }

    let Some((feature_idx, threshold, gain)) = best_split(x, y) else {
        return TreeNode::Leaf(Leaf {
            class_label: majority_class(y),
        });
    };

    let Some((left_rows, right_rows)) = partition_rows(x, feature_idx, threshold) else {
        return TreeNode::Leaf(Leaf {
            class_label: majority_class(y),
        });
    };

    let (left_x, left_y) = take_rows(x, y, &left_rows);
    let (right_x, right_y) = take_rows(x, y, &right_rows);

    TreeNode::Split(Split {
        feature_idx,
        threshold,
        gain,
        n_samples,
        left: Box::new(build_tree(&left_x, &left_y, depth + 1, max_depth)),
        right: Box::new(build_tree(&right_x, &right_y, depth + 1, max_depth)),
    })
}

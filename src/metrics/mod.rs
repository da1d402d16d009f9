//! Classification metrics for evaluating classifier performance.
//!
//! Provides accuracy, per-class precision/recall/F1 with support counts,
//! and confusion-matrix computation for multi-class classification.

use crate::primitives::Matrix;

/// Per-class evaluation summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    /// TP / (TP + FP)
    pub precision: f32,
    /// TP / (TP + FN)
    pub recall: f32,
    /// Harmonic mean of precision and recall.
    pub f1: f32,
    /// Number of true instances of the class.
    pub support: usize,
}

/// Compute classification accuracy.
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use huella::metrics::accuracy;
///
/// let y_true = vec![0, 1, 2, 0, 1, 2];
/// let y_pred = vec![0, 2, 1, 0, 0, 1];
/// let acc = accuracy(&y_pred, &y_true);
/// assert!((acc - 0.333333).abs() < 0.001);
/// ```
#[must_use]
pub fn accuracy(y_pred: &[usize], y_true: &[usize]) -> f32 {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let correct = y_pred
        .iter()
        .zip(y_true.iter())
        .filter(|(p, t)| p == t)
        .count();
    correct as f32 / y_true.len() as f32
}

/// Per-class precision, recall, F1 and support over `n_classes` classes.
///
/// Classes with no predictions and no true instances get all-zero
/// metrics, keeping the output aligned with the label-encoder id space.
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
#[must_use]
pub fn per_class_metrics(y_pred: &[usize], y_true: &[usize], n_classes: usize) -> Vec<ClassMetrics> {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let (tp, fp, fn_counts, support) = compute_tp_fp_fn(y_pred, y_true, n_classes);

    (0..n_classes)
        .map(|i| {
            let precision = ratio(tp[i], tp[i] + fp[i]);
            let recall = ratio(tp[i], tp[i] + fn_counts[i]);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support: support[i],
            }
        })
        .collect()
}

fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}

/// Compute confusion matrix.
///
/// Returns a matrix where element `[i,j]` is the count of samples with
/// true label i and predicted label j.
///
/// # Panics
///
/// Panics if vectors have different lengths or are empty.
///
/// # Examples
///
/// ```
/// use huella::metrics::confusion_matrix;
///
/// let y_true = vec![0, 0, 1, 1, 2, 2];
/// let y_pred = vec![0, 1, 1, 1, 2, 0];
/// let cm = confusion_matrix(&y_pred, &y_true, 3);
/// assert_eq!(cm.shape(), (3, 3));
/// assert_eq!(cm.get(0, 0), 1);
/// assert_eq!(cm.get(2, 0), 1);
/// ```
#[must_use]
pub fn confusion_matrix(y_pred: &[usize], y_true: &[usize], n_classes: usize) -> Matrix<usize> {
    assert_eq!(y_pred.len(), y_true.len(), "Vectors must have same length");
    assert!(!y_true.is_empty(), "Vectors cannot be empty");

    let mut data = vec![0usize; n_classes * n_classes];
    for (&true_label, &pred_label) in y_true.iter().zip(y_pred.iter()) {
        if true_label < n_classes && pred_label < n_classes {
            data[true_label * n_classes + pred_label] += 1;
        }
    }

    Matrix::from_vec(n_classes, n_classes, data)
        .expect("confusion matrix dimensions match data length")
}

/// TP, FP, FN and support per class.
fn compute_tp_fp_fn(
    y_pred: &[usize],
    y_true: &[usize],
    n_classes: usize,
) -> (Vec<usize>, Vec<usize>, Vec<usize>, Vec<usize>) {
    let mut tp = vec![0usize; n_classes];
    let mut fp = vec![0usize; n_classes];
    let mut fn_counts = vec![0usize; n_classes];
    let mut support = vec![0usize; n_classes];

    for (&true_label, &pred_label) in y_true.iter().zip(y_pred.iter()) {
        if true_label < n_classes {
            support[true_label] += 1;
        }
        if true_label == pred_label {
            if true_label < n_classes {
                tp[true_label] += 1;
            }
        } else {
            if pred_label < n_classes {
                fp[pred_label] += 1;
            }
            if true_label < n_classes {
                fn_counts[true_label] += 1;
            }
        }
    }

    (tp, fp, fn_counts, support)
}

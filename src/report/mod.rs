//! Diagnostic reporting: evaluation tables and feature rankings.
//!
//! Everything here is a side artifact for a human; prediction correctness
//! never depends on it. Rankings aggregate all per-header presence slots
//! into one combined "Header Presence" entry before sorting, so the long
//! tail of near-zero single-header importances does not crowd out
//! interpretable signals like the status code or a specific header value.

use crate::encoding::{FeatureName, FieldKind};
use crate::metrics::{accuracy, confusion_matrix, per_class_metrics, ClassMetrics};
use crate::model::TrainOutcome;
use crate::primitives::Matrix;
use std::fmt::Write as _;

/// How many ranked features the reports show.
const TOP_N: usize = 10;

/// Continuous columns are discretized into this many equal-width bins
/// for information-gain estimation.
const MI_BINS: usize = 10;

/// Columns with at most this many distinct values are treated as
/// already-discrete categories.
const MAX_DISCRETE: usize = 16;

/// One named entry of a feature ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    /// Human-readable slot name (post aggregation).
    pub name: String,
    /// Importance or information-gain score.
    pub score: f32,
}

/// Collapses every presence slot into a single "Header Presence" entry
/// (scores summed), keeping all other slots as-is.
#[must_use]
pub fn aggregate_presence(names: &[FeatureName], scores: &[f32]) -> Vec<RankedFeature> {
    let mut presence_total = 0.0;
    let mut ranked = Vec::new();

    for (name, &score) in names.iter().zip(scores.iter()) {
        if name.kind == FieldKind::Presence {
            presence_total += score;
        } else {
            ranked.push(RankedFeature {
                name: name.to_string(),
                score,
            });
        }
    }

    ranked.push(RankedFeature {
        name: "Header Presence".to_string(),
        score: presence_total,
    });
    ranked
}

/// Aggregates, sorts descending and keeps the top entries.
#[must_use]
pub fn top_features(names: &[FeatureName], scores: &[f32], n: usize) -> Vec<RankedFeature> {
    let mut ranked = aggregate_presence(names, scores);
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

/// Mutual information between each feature column and the class labels,
/// in nats.
///
/// Discrete code columns are keyed by exact value; continuous columns
/// (more than [`MAX_DISCRETE`] distinct values) are discretized into
/// [`MI_BINS`] equal-width bins first.
#[must_use]
pub fn mutual_information(x: &Matrix<f32>, y: &[usize]) -> Vec<f32> {
    let (n_samples, n_features) = x.shape();
    if n_samples == 0 || n_samples != y.len() {
        return vec![0.0; n_features];
    }

    (0..n_features)
        .map(|col| {
            let column: Vec<f32> = (0..n_samples).map(|row| x.get(row, col)).collect();
            let bins = discretize(&column);
            discrete_mutual_information(&bins, y)
        })
        .collect()
}

/// Maps a column to small bin indices.
fn discretize(column: &[f32]) -> Vec<usize> {
    let mut distinct: Vec<f32> = column.to_vec();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distinct.dedup();

    if distinct.len() <= MAX_DISCRETE {
        return column
            .iter()
            .map(|v| {
                distinct
                    .iter()
                    .position(|d| d == v)
                    .unwrap_or(0)
            })
            .collect();
    }

    let min = distinct[0];
    let max = distinct[distinct.len() - 1];
    let span = max - min;
    column
        .iter()
        .map(|&v| {
            let normalized = (v - min) / span;
            ((normalized * MI_BINS as f32) as usize).min(MI_BINS - 1)
        })
        .collect()
}

/// MI over two discrete sequences: Σ p(a,b) ln(p(a,b) / (p(a) p(b))).
fn discrete_mutual_information(a: &[usize], b: &[usize]) -> f32 {
    use std::collections::BTreeMap;

    let n = a.len() as f32;
    let mut joint: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    let mut marginal_a: BTreeMap<usize, usize> = BTreeMap::new();
    let mut marginal_b: BTreeMap<usize, usize> = BTreeMap::new();

    for (&av, &bv) in a.iter().zip(b.iter()) {
        *joint.entry((av, bv)).or_insert(0) += 1;
        *marginal_a.entry(av).or_insert(0) += 1;
        *marginal_b.entry(bv).or_insert(0) += 1;
    }

    let mut mi = 0.0;
    for (&(av, bv), &count) in &joint {
        let p_joint = count as f32 / n;
        let p_a = marginal_a[&av] as f32 / n;
        let p_b = marginal_b[&bv] as f32 / n;
        mi += p_joint * (p_joint / (p_a * p_b)).ln();
    }
    mi.max(0.0)
}

/// Renders a per-class evaluation table with accuracy and macro/weighted
/// averages, in the familiar classification-report shape.
#[must_use]
pub fn render_classification_report(
    per_class: &[ClassMetrics],
    classes: &[String],
    acc: f32,
) -> String {
    let name_width = classes
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max("weighted avg".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>name_width$}  precision  recall  f1-score  support",
        ""
    );
    let _ = writeln!(out);

    let total_support: usize = per_class.iter().map(|m| m.support).sum();
    for (name, metrics) in classes.iter().zip(per_class.iter()) {
        let _ = writeln!(
            out,
            "{name:>name_width$}  {:>9.2}  {:>6.2}  {:>8.2}  {:>7}",
            metrics.precision, metrics.recall, metrics.f1, metrics.support
        );
    }

    let n = per_class.len().max(1) as f32;
    let macro_p = per_class.iter().map(|m| m.precision).sum::<f32>() / n;
    let macro_r = per_class.iter().map(|m| m.recall).sum::<f32>() / n;
    let macro_f = per_class.iter().map(|m| m.f1).sum::<f32>() / n;

    let weight = |value: f32, support: usize| -> f32 {
        if total_support == 0 {
            0.0
        } else {
            value * support as f32 / total_support as f32
        }
    };
    let weighted_p: f32 = per_class.iter().map(|m| weight(m.precision, m.support)).sum();
    let weighted_r: f32 = per_class.iter().map(|m| weight(m.recall, m.support)).sum();
    let weighted_f: f32 = per_class.iter().map(|m| weight(m.f1, m.support)).sum();

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:>name_width$}  {:>9}  {:>6}  {acc:>8.2}  {total_support:>7}",
        "accuracy", "", ""
    );
    let _ = writeln!(
        out,
        "{:>name_width$}  {macro_p:>9.2}  {macro_r:>6.2}  {macro_f:>8.2}  {total_support:>7}",
        "macro avg"
    );
    let _ = writeln!(
        out,
        "{:>name_width$}  {weighted_p:>9.2}  {weighted_r:>6.2}  {weighted_f:>8.2}  {total_support:>7}",
        "weighted avg"
    );
    out
}

/// Renders a labeled true × predicted confusion matrix.
#[must_use]
pub fn render_confusion_matrix(cm: &Matrix<usize>, classes: &[String]) -> String {
    let label_width = classes
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max("true \\ predicted".len());
    let cell_width = classes.iter().map(String::len).max().unwrap_or(0).max(5);

    let mut out = String::new();
    let _ = write!(out, "{:<label_width$}", "true \\ predicted");
    for name in classes {
        let _ = write!(out, "  {name:>cell_width$}");
    }
    let _ = writeln!(out);

    for (row, name) in classes.iter().enumerate() {
        let _ = write!(out, "{name:<label_width$}");
        for col in 0..classes.len() {
            let _ = write!(out, "  {:>cell_width$}", cm.get(row, col));
        }
        let _ = writeln!(out);
    }
    out
}

/// Renders one titled top-N ranking.
#[must_use]
pub fn render_feature_ranking(title: &str, ranked: &[RankedFeature]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    for (idx, feature) in ranked.iter().enumerate() {
        let _ = writeln!(out, "{:>4}. {:<32} {:.4}", idx + 1, feature.name, feature.score);
    }
    out
}

/// Composes the full training diagnostics: evaluation tables plus both
/// top-10 feature rankings.
#[must_use]
pub fn render_training_report(outcome: &TrainOutcome) -> String {
    let classes = outcome.artifact.labels.classes();
    let n_classes = classes.len();
    let acc = accuracy(&outcome.y_pred, &outcome.y_test);
    let per_class = per_class_metrics(&outcome.y_pred, &outcome.y_test, n_classes);
    let cm = confusion_matrix(&outcome.y_pred, &outcome.y_test, n_classes);
    let names = outcome.artifact.registry.feature_names();

    let mut out = String::new();
    let _ = writeln!(out, "=== Evaluation (held-out split) ===");
    out.push_str(&render_classification_report(
        &per_class,
        classes,
        acc,
    ));
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Confusion Matrix ===");
    out.push_str(&render_confusion_matrix(&cm, classes));

    if let Some(importances) = outcome.artifact.forest.feature_importances() {
        let ranked = top_features(&names, &importances, TOP_N);
        let _ = writeln!(out);
        out.push_str(&render_feature_ranking(
            "=== Top 10 Feature Importances ===",
            &ranked,
        ));
    }

    let information_gain = mutual_information(&outcome.x, &outcome.y);
    let ranked = top_features(&names, &information_gain, TOP_N);
    let _ = writeln!(out);
    out.push_str(&render_feature_ranking(
        "=== Top 10 Information Gain ===",
        &ranked,
    ));

    out
}

//! Reproducible train/test splitting.

use crate::error::{HuellaError, Result};
use crate::primitives::Matrix;

/// Splits a feature matrix and its labels into train and test partitions.
///
/// The partition is a seeded shuffle, so a fixed `random_state` makes
/// evaluation metrics reproducible run to run.
///
/// # Errors
///
/// Returns an error when `test_size` is outside (0, 1), when the sample
/// counts disagree, or when either partition would be empty.
///
/// # Examples
///
/// ```
/// use huella::model_selection::train_test_split;
/// use huella::primitives::Matrix;
///
/// let x = Matrix::from_vec(10, 1, (0..10).map(|i| i as f32).collect()).unwrap();
/// let y: Vec<usize> = (0..10).map(|i| i % 2).collect();
/// let (x_train, x_test, y_train, y_test) =
///     train_test_split(&x, &y, 0.2, Some(42)).unwrap();
/// assert_eq!(x_train.n_rows(), 8);
/// assert_eq!(x_test.n_rows(), 2);
/// assert_eq!(y_train.len(), 8);
/// assert_eq!(y_test.len(), 2);
/// ```
pub fn train_test_split(
    x: &Matrix<f32>,
    y: &[usize],
    test_size: f32,
    random_state: Option<u64>,
) -> Result<(Matrix<f32>, Matrix<f32>, Vec<usize>, Vec<usize>)> {
    let n_train = validate_split_inputs(x, y, test_size)?;
    let n_samples = x.n_rows();

    let indices = shuffle_indices(n_samples, random_state);
    let (train_indices, test_indices) = indices.split_at(n_train);

    let (x_train, y_train) = extract_samples(x, y, train_indices);
    let (x_test, y_test) = extract_samples(x, y, test_indices);

    Ok((x_train, x_test, y_train, y_test))
}

fn validate_split_inputs(x: &Matrix<f32>, y: &[usize], test_size: f32) -> Result<usize> {
    if test_size <= 0.0 || test_size >= 1.0 {
        return Err(HuellaError::ValidationError {
            message: format!("test_size must be between 0 and 1, got {test_size}"),
        });
    }

    let n_samples = x.n_rows();
    if n_samples != y.len() {
        return Err(HuellaError::dimension_mismatch(
            "samples",
            n_samples,
            y.len(),
        ));
    }

    let n_test = (n_samples as f32 * test_size).round() as usize;
    let n_train = n_samples - n_test;
    if n_test == 0 || n_train == 0 {
        return Err(HuellaError::ValidationError {
            message: format!(
                "split would leave an empty partition (n_train={n_train}, n_test={n_test})"
            ),
        });
    }

    Ok(n_train)
}

fn shuffle_indices(n_samples: usize, random_state: Option<u64>) -> Vec<usize> {
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    let mut indices: Vec<usize> = (0..n_samples).collect();
    if let Some(seed) = random_state {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);
    } else {
        let mut rng = rand::thread_rng();
        indices.shuffle(&mut rng);
    }
    indices
}

fn extract_samples(x: &Matrix<f32>, y: &[usize], indices: &[usize]) -> (Matrix<f32>, Vec<usize>) {
    let n_features = x.n_cols();
    let mut x_data = Vec::with_capacity(indices.len() * n_features);
    let mut y_data = Vec::with_capacity(indices.len());

    for &idx in indices {
        for col in 0..n_features {
            x_data.push(x.get(idx, col));
        }
        y_data.push(y[idx]);
    }

    let x_subset = Matrix::from_vec(indices.len(), n_features, x_data)
        .expect("subset dimensions are consistent by construction");
    (x_subset, y_data)
}

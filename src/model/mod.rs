//! The persisted model artifact and the train/predict drivers.
//!
//! A trained model never travels apart from its encoding schema: the
//! forest, the fitted encoding registry (vocabulary included) and the
//! framework label encoder persist as one atomic bundle, so a predict run
//! can never load a model against a mismatched vocabulary or encoder set.
//!
//! On-disk framing:
//!
//! ```text
//! [4-byte magic: "HLLA"]
//! [1-byte format version]
//! [bincode payload: forest + registry + label encoder]
//! [4-byte CRC32 of all preceding bytes, little-endian]
//! ```

use crate::encoding::{EncodingRegistry, LabelEncoder};
use crate::error::{HuellaError, Result};
use crate::primitives::Matrix;
use crate::response::{parse_response, ParsedResponse, RawSample};
use crate::schema::{build_vocabulary, default_excluded_headers};
use crate::tree::RandomForestClassifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Artifact magic bytes.
const ARTIFACT_MAGIC: [u8; 4] = *b"HLLA";

/// Current artifact format version.
const ARTIFACT_VERSION: u8 = 1;

/// Smallest possible artifact: magic + version + checksum.
const ARTIFACT_OVERHEAD: usize = 9;

/// The atomic train-time bundle a predict run loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// The trained forest.
    pub forest: RandomForestClassifier,
    /// The fitted encoding registry, vocabulary included.
    pub registry: EncodingRegistry,
    /// Framework name ↔ class id mapping.
    pub labels: LabelEncoder,
}

/// One per-record prediction outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    /// A class id that resolved through the persisted label encoder.
    Framework(String),
    /// A class id with no reverse mapping; reported, never fatal.
    Unknown(usize),
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prediction::Framework(name) => write!(f, "{name}"),
            Prediction::Unknown(id) => write!(f, "unknown framework (label {id})"),
        }
    }
}

impl ModelArtifact {
    /// Serializes the bundle into the framed byte format.
    ///
    /// # Errors
    ///
    /// Returns an error if payload serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload =
            bincode::serialize(self).map_err(|e| HuellaError::Serialization(e.to_string()))?;

        let mut output = Vec::with_capacity(payload.len() + ARTIFACT_OVERHEAD);
        output.extend_from_slice(&ARTIFACT_MAGIC);
        output.push(ARTIFACT_VERSION);
        output.extend_from_slice(&payload);
        let crc = crc32(&output);
        output.extend_from_slice(&crc.to_le_bytes());
        Ok(output)
    }

    /// Deserializes a framed artifact, verifying magic, version and
    /// checksum, then the internal schema consistency.
    ///
    /// # Errors
    ///
    /// Any framing or schema mismatch is fatal; the predict path must not
    /// run against a bundle it cannot fully trust.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ARTIFACT_OVERHEAD {
            return Err(HuellaError::FormatError {
                message: format!("artifact too small: {} bytes", bytes.len()),
            });
        }
        if bytes[..4] != ARTIFACT_MAGIC {
            return Err(HuellaError::FormatError {
                message: "bad magic, not a huella artifact".to_string(),
            });
        }
        if bytes[4] != ARTIFACT_VERSION {
            return Err(HuellaError::UnsupportedVersion {
                found: bytes[4],
                supported: ARTIFACT_VERSION,
            });
        }

        let body = &bytes[..bytes.len() - 4];
        let stored = u32::from_le_bytes(
            bytes[bytes.len() - 4..]
                .try_into()
                .expect("slice is exactly four bytes"),
        );
        let actual = crc32(body);
        if stored != actual {
            return Err(HuellaError::ChecksumMismatch {
                expected: stored,
                actual,
            });
        }

        let artifact: Self = bincode::deserialize(&body[5..])
            .map_err(|e| HuellaError::Serialization(e.to_string()))?;
        artifact.validate_schema()?;
        Ok(artifact)
    }

    /// Writes the bundle to disk.
    ///
    /// # Errors
    ///
    /// Returns serialization or I/O errors.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Loads and fully verifies a bundle from disk.
    ///
    /// # Errors
    ///
    /// Returns I/O, framing, or schema errors.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Checks that the registry's vector width matches the width the
    /// forest was trained on.
    fn validate_schema(&self) -> Result<()> {
        let registry_width = self.registry.n_features();
        match self.forest.n_features() {
            Some(forest_width) if forest_width == registry_width => Ok(()),
            Some(forest_width) => Err(HuellaError::dimension_mismatch(
                "registry width vs forest width",
                forest_width,
                registry_width,
            )),
            None => Err(HuellaError::ValidationError {
                message: "artifact contains an unfitted forest".to_string(),
            }),
        }
    }

    /// Predicts a framework for every sample in a corpus.
    ///
    /// A class id with no reverse mapping yields a per-record
    /// [`Prediction::Unknown`] and processing continues.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty corpus or a schema mismatch.
    pub fn predict_samples(&self, samples: &[RawSample]) -> Result<Vec<Prediction>> {
        let parsed: Vec<ParsedResponse> = samples.iter().map(parse_response).collect();
        let x = self.registry.encode_corpus(&parsed)?;
        debug!(rows = x.n_rows(), cols = x.n_cols(), "encoded predict corpus");

        let class_ids = self.forest.predict(&x)?;
        Ok(class_ids
            .into_iter()
            .map(|id| match self.labels.decode(id) {
                Some(name) => Prediction::Framework(name.to_string()),
                None => Prediction::Unknown(id),
            })
            .collect())
    }
}

/// Training hyperparameters; defaults mirror the corpus the tool was
/// built against.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Trees in the forest.
    pub n_estimators: usize,
    /// Held-out fraction for evaluation.
    pub test_size: f32,
    /// Seed for the train/test partition.
    pub split_seed: u64,
    /// Seed for bootstrap sampling.
    pub forest_seed: u64,
    /// Header names excluded from the vocabulary.
    pub excluded_headers: BTreeSet<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            test_size: 0.2,
            split_seed: 42,
            forest_seed: 22,
            excluded_headers: default_excluded_headers(),
        }
    }
}

/// Everything a training run produces: the artifact plus the evaluation
/// inputs the diagnostic report is built from.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// The persistable bundle.
    pub artifact: ModelArtifact,
    /// Full encoded matrix (used for information-gain diagnostics).
    pub x: Matrix<f32>,
    /// Full encoded labels, parallel to `x`.
    pub y: Vec<usize>,
    /// Held-out true labels.
    pub y_test: Vec<usize>,
    /// Held-out predictions, parallel to `y_test`.
    pub y_pred: Vec<usize>,
}

/// Trains a model end to end: vocabulary → registry → matrix → split →
/// forest → held-out evaluation.
///
/// # Errors
///
/// Returns a validation error for an empty corpus or records missing a
/// framework label, and propagates split/fit failures.
pub fn train_model(samples: &[RawSample], config: &TrainConfig) -> Result<TrainOutcome> {
    if samples.is_empty() {
        return Err(HuellaError::empty_input("training corpus"));
    }

    let mut labels = Vec::with_capacity(samples.len());
    for (idx, sample) in samples.iter().enumerate() {
        match &sample.framework {
            Some(label) => labels.push(label.as_str()),
            None => {
                return Err(HuellaError::ValidationError {
                    message: format!("training record {idx} has no framework label"),
                })
            }
        }
    }

    let parsed: Vec<ParsedResponse> = samples.iter().map(parse_response).collect();
    let vocabulary = build_vocabulary(&parsed, &config.excluded_headers);
    info!(
        samples = samples.len(),
        vocabulary = vocabulary.len(),
        "building encoding registry"
    );

    let registry = EncodingRegistry::fit(&parsed, vocabulary);
    let x = registry.encode_corpus(&parsed)?;
    debug!(rows = x.n_rows(), cols = x.n_cols(), "encoded training matrix");

    let label_encoder = LabelEncoder::fit(labels.iter().copied());
    let y = label_encoder.transform(labels.iter().copied())?;

    // A corpus too small for a held-out partition still trains; the
    // evaluation then runs on the training set itself.
    let n_test = (y.len() as f32 * config.test_size).round() as usize;
    let (x_train, x_test, y_train, y_test) = if n_test == 0 || n_test == y.len() {
        warn!(
            samples = y.len(),
            "corpus too small for a held-out split; evaluating on the training set"
        );
        (x.clone(), x.clone(), y.clone(), y.clone())
    } else {
        crate::model_selection::train_test_split(&x, &y, config.test_size, Some(config.split_seed))?
    };

    let mut forest =
        RandomForestClassifier::new(config.n_estimators).with_random_state(config.forest_seed);
    forest.fit(&x_train, &y_train)?;
    let y_pred = forest.predict(&x_test)?;
    info!(
        classes = label_encoder.n_classes(),
        accuracy = crate::metrics::accuracy(&y_pred, &y_test),
        "forest trained"
    );

    Ok(TrainOutcome {
        artifact: ModelArtifact {
            forest,
            registry,
            labels: label_encoder,
        },
        x,
        y,
        y_test,
        y_pred,
    })
}

/// Bitwise CRC32 (IEEE polynomial).
fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_samples() -> Vec<RawSample> {
        let mut samples = Vec::new();
        for i in 0..6 {
            samples.push(RawSample {
                response: "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nX-Powered-By: PHP/8.1\r\n\r\n"
                    .to_string(),
                response_time: 0.10 + f64::from(i) * 0.01,
                framework: Some("laravel".to_string()),
            });
            samples.push(RawSample {
                response: "HTTP/1.1 404 Not Found\r\ncontent-type: application/json\r\n\r\n"
                    .to_string(),
                response_time: 0.30 + f64::from(i) * 0.01,
                framework: Some("symfony".to_string()),
            });
        }
        samples
    }

    fn small_config() -> TrainConfig {
        TrainConfig {
            n_estimators: 10,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_train_model_produces_consistent_artifact() {
        let outcome = train_model(&training_samples(), &small_config()).expect("trains");
        let artifact = &outcome.artifact;
        assert_eq!(
            artifact.forest.n_features(),
            Some(artifact.registry.n_features())
        );
        assert_eq!(artifact.labels.classes(), ["laravel", "symfony"]);
        assert_eq!(outcome.y_test.len(), outcome.y_pred.len());
    }

    #[test]
    fn test_train_model_rejects_unlabeled_records() {
        let mut samples = training_samples();
        samples[3].framework = None;
        assert!(train_model(&samples, &small_config()).is_err());
    }

    #[test]
    fn test_train_model_rejects_empty_corpus() {
        assert!(train_model(&[], &small_config()).is_err());
    }

    #[test]
    fn test_artifact_bytes_roundtrip() {
        let outcome = train_model(&training_samples(), &small_config()).expect("trains");
        let bytes = outcome.artifact.to_bytes().expect("serializes");
        let restored = ModelArtifact::from_bytes(&bytes).expect("deserializes");
        assert_eq!(restored, outcome.artifact);
    }

    #[test]
    fn test_artifact_bad_magic_rejected() {
        let outcome = train_model(&training_samples(), &small_config()).expect("trains");
        let mut bytes = outcome.artifact.to_bytes().expect("serializes");
        bytes[0] = b'X';
        let err = ModelArtifact::from_bytes(&bytes).expect_err("must fail");
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_artifact_corrupted_payload_rejected() {
        let outcome = train_model(&training_samples(), &small_config()).expect("trains");
        let mut bytes = outcome.artifact.to_bytes().expect("serializes");
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        let err = ModelArtifact::from_bytes(&bytes).expect_err("must fail");
        assert!(err.to_string().contains("Checksum"));
    }

    #[test]
    fn test_artifact_unsupported_version_rejected() {
        let outcome = train_model(&training_samples(), &small_config()).expect("trains");
        let mut bytes = outcome.artifact.to_bytes().expect("serializes");
        bytes[4] = 99;
        // Checksum covers the version byte, so refresh it to reach the
        // version check.
        let body_len = bytes.len() - 4;
        let crc = crc32(&bytes[..body_len]).to_le_bytes();
        bytes[body_len..].copy_from_slice(&crc);
        let err = ModelArtifact::from_bytes(&bytes).expect_err("must fail");
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_artifact_truncated_rejected() {
        assert!(ModelArtifact::from_bytes(b"HLL").is_err());
    }

    #[test]
    fn test_artifact_file_roundtrip() {
        let outcome = train_model(&training_samples(), &small_config()).expect("trains");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.hla");
        outcome.artifact.save(&path).expect("saves");
        let restored = ModelArtifact::load(&path).expect("loads");
        assert_eq!(restored, outcome.artifact);
    }

    #[test]
    fn test_predict_samples_roundtrip() {
        let samples = training_samples();
        let outcome = train_model(&samples, &small_config()).expect("trains");
        let predictions = outcome
            .artifact
            .predict_samples(&samples[..2])
            .expect("predicts");
        assert_eq!(
            predictions[0],
            Prediction::Framework("laravel".to_string())
        );
        assert_eq!(
            predictions[1],
            Prediction::Framework("symfony".to_string())
        );
    }

    #[test]
    fn test_predict_samples_with_novel_values() {
        let outcome = train_model(&training_samples(), &small_config()).expect("trains");
        let novel = RawSample {
            response: "HTTP/1.1 500 Oops\r\nX-Never-Seen: ???\r\nContent-Type: text/weird\r\n\r\n"
                .to_string(),
            response_time: 9.9,
            framework: None,
        };
        // Novel headers and categories must encode, not fail.
        let predictions = outcome.artifact.predict_samples(&[novel]).expect("predicts");
        assert_eq!(predictions.len(), 1);
        assert!(matches!(predictions[0], Prediction::Framework(_)));
    }

    #[test]
    fn test_prediction_display() {
        assert_eq!(
            Prediction::Framework("laravel".to_string()).to_string(),
            "laravel"
        );
        assert_eq!(
            Prediction::Unknown(7).to_string(),
            "unknown framework (label 7)"
        );
    }

    #[test]
    fn test_crc32_known_vector() {
        // Standard IEEE CRC32 of "123456789".
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }
}

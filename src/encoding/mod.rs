//! Categorical encoders and the fitted encoding registry.
//!
//! The registry is the train/predict contract: it owns one categorical
//! encoder per (vocabulary header, field) pair plus one for the status
//! message, and the vocabulary itself. Fitting happens once, on the
//! training corpus; the predict run loads the registry read-only and
//! transforms new responses into vectors that are identical in width and
//! slot meaning to the training matrix. Values never seen at fit time map
//! to a reserved unknown code instead of failing or resizing the vector.

use crate::error::{HuellaError, Result};
use crate::primitives::Matrix;
use crate::response::{CasingStyle, ParsedResponse};
use crate::schema::HeaderVocabulary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Code reserved for categories not observed during fitting.
pub const UNKNOWN_CODE: u32 = 0;

/// Sentinel value slotted in for headers absent from a response.
pub const ABSENT_VALUE: &str = "unknown";

/// Casing label slotted in for headers absent from a response.
pub const ABSENT_CASING: &str = "other";

/// A fitted mapping from category strings to stable ordinal codes.
///
/// Fitted categories get codes `1..=n` in sorted category order; anything
/// else encodes to [`UNKNOWN_CODE`]. The fitted set is immutable, so a
/// category unseen at fit time is permanently unknown to this encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    categories: Vec<String>,
}

impl CategoryEncoder {
    /// Fits an encoder over the observed category values.
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: BTreeSet<&str> = values.into_iter().collect();
        Self {
            categories: unique.into_iter().map(ToString::to_string).collect(),
        }
    }

    /// Encodes one value; unknown values get [`UNKNOWN_CODE`].
    #[must_use]
    pub fn encode(&self, value: &str) -> u32 {
        match self.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            Ok(idx) => idx as u32 + 1,
            Err(_) => UNKNOWN_CODE,
        }
    }

    /// The fitted categories in code order (code = index + 1).
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of fitted categories (excluding the unknown bucket).
    #[must_use]
    pub fn n_categories(&self) -> usize {
        self.categories.len()
    }
}

/// Maps framework names to integer class ids and back.
///
/// Fitted once at train time and persisted with the model; predict-time
/// class ids are resolved through the persisted mapping, never re-derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fits over the distinct labels seen at training (sorted).
    pub fn fit<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: BTreeSet<&str> = labels.into_iter().collect();
        Self {
            classes: unique.into_iter().map(ToString::to_string).collect(),
        }
    }

    /// Encodes a framework name to its class id.
    #[must_use]
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    /// Encodes a batch of labels, failing on any label outside the fitted
    /// set.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending label.
    pub fn transform<'a, I>(&self, labels: I) -> Result<Vec<usize>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        labels
            .into_iter()
            .map(|label| {
                self.encode(label).ok_or_else(|| HuellaError::ValidationError {
                    message: format!("label not in fitted set: {label}"),
                })
            })
            .collect()
    }

    /// Resolves a class id back to its framework name.
    #[must_use]
    pub fn decode(&self, class_id: usize) -> Option<&str> {
        self.classes.get(class_id).map(String::as_str)
    }

    /// Class names in id order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

/// The field a feature-vector slot encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Binary presence slot for one vocabulary header.
    Presence,
    /// Raw response time.
    ResponseTime,
    /// Numeric status code (0 when absent).
    StatusCode,
    /// Categorical code for one vocabulary header's value.
    Value,
    /// Categorical code for one vocabulary header's name casing.
    Casing,
    /// Categorical code for the status message.
    StatusMessage,
}

/// One named slot of the feature-vector schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureName {
    /// What the slot encodes.
    pub kind: FieldKind,
    /// The vocabulary header this slot belongs to, when per-header.
    pub header: Option<String>,
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.header) {
            (FieldKind::Presence, _) => write!(f, "Header Presence"),
            (FieldKind::ResponseTime, _) => write!(f, "Response Time"),
            (FieldKind::StatusCode, _) => write!(f, "Status Code"),
            (FieldKind::Value, Some(h)) => write!(f, "{h} Value"),
            (FieldKind::Casing, Some(h)) => write!(f, "{h} Casing"),
            (FieldKind::StatusMessage, _) => write!(f, "Status Message"),
            // Per-header kinds always carry a header; this arm is for
            // completeness of the match.
            (kind, None) => write!(f, "{kind:?}"),
        }
    }
}

/// A fixed-width encoded sample.
pub type FeatureVector = Vec<f32>;

/// The fitted transform store shared between training and prediction.
///
/// Layout of every produced vector (V = vocabulary size, width 3V + 3):
///
/// ```text
/// [presence_0 .. presence_V-1,
///  response_time, status_code,
///  value_code_0, casing_code_0, .. value_code_V-1, casing_code_V-1,
///  status_message_code]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingRegistry {
    vocabulary: HeaderVocabulary,
    value_encoders: Vec<CategoryEncoder>,
    casing_encoders: Vec<CategoryEncoder>,
    status_message_encoder: CategoryEncoder,
}

impl EncodingRegistry {
    /// Fits the registry over a training corpus.
    ///
    /// For each vocabulary header, one encoder is fitted over the observed
    /// value strings and one over the observed casing labels, with absent
    /// headers contributing the [`ABSENT_VALUE`]/[`ABSENT_CASING`]
    /// sentinels so those categories are always representable. One global
    /// encoder covers the status message.
    #[must_use]
    pub fn fit(corpus: &[ParsedResponse], vocabulary: HeaderVocabulary) -> Self {
        let mut value_encoders = Vec::with_capacity(vocabulary.len());
        let mut casing_encoders = Vec::with_capacity(vocabulary.len());

        for header in &vocabulary {
            let values = corpus
                .iter()
                .map(|r| r.header(header).map_or(ABSENT_VALUE, |h| h.value.as_str()));
            value_encoders.push(CategoryEncoder::fit(values));

            let casings = corpus.iter().map(|r| {
                r.header(header).map_or(ABSENT_CASING, |h| {
                    CasingStyle::classify(&h.original).as_label()
                })
            });
            casing_encoders.push(CategoryEncoder::fit(casings));
        }

        let status_message_encoder =
            CategoryEncoder::fit(corpus.iter().map(|r| r.status_message.as_str()));

        Self {
            vocabulary,
            value_encoders,
            casing_encoders,
            status_message_encoder,
        }
    }

    /// Encodes one parsed response into a fixed-width vector.
    ///
    /// Never fails and never resizes: unseen categories encode to
    /// [`UNKNOWN_CODE`], an absent status code encodes to 0.0.
    #[must_use]
    pub fn transform(&self, parsed: &ParsedResponse) -> FeatureVector {
        let mut features = Vec::with_capacity(self.n_features());

        for header in &self.vocabulary {
            features.push(if parsed.header(header).is_some() { 1.0 } else { 0.0 });
        }

        features.push(parsed.response_time as f32);
        features.push(f32::from(parsed.status_code));

        for (idx, header) in self.vocabulary.iter().enumerate() {
            let (value, casing) = match parsed.header(header) {
                Some(entry) => (
                    entry.value.as_str(),
                    CasingStyle::classify(&entry.original).as_label(),
                ),
                None => (ABSENT_VALUE, ABSENT_CASING),
            };
            features.push(self.value_encoders[idx].encode(value) as f32);
            features.push(self.casing_encoders[idx].encode(casing) as f32);
        }

        features.push(self.status_message_encoder.encode(&parsed.status_message) as f32);

        features
    }

    /// Encodes a whole corpus into a rectangular feature matrix.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty corpus.
    pub fn encode_corpus(&self, corpus: &[ParsedResponse]) -> Result<Matrix<f32>> {
        if corpus.is_empty() {
            return Err(HuellaError::empty_input("corpus to encode"));
        }
        let rows: Vec<FeatureVector> = corpus.iter().map(|r| self.transform(r)).collect();
        Matrix::from_rows(&rows).map_err(|e| HuellaError::Other(e.to_string()))
    }

    /// The vector width this registry produces.
    #[must_use]
    pub fn n_features(&self) -> usize {
        3 * self.vocabulary.len() + 3
    }

    /// The frozen vocabulary.
    #[must_use]
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Slot names parallel to the vector layout, for reporting.
    #[must_use]
    pub fn feature_names(&self) -> Vec<FeatureName> {
        let mut names = Vec::with_capacity(self.n_features());
        for header in &self.vocabulary {
            names.push(FeatureName {
                kind: FieldKind::Presence,
                header: Some(header.clone()),
            });
        }
        names.push(FeatureName {
            kind: FieldKind::ResponseTime,
            header: None,
        });
        names.push(FeatureName {
            kind: FieldKind::StatusCode,
            header: None,
        });
        for header in &self.vocabulary {
            names.push(FeatureName {
                kind: FieldKind::Value,
                header: Some(header.clone()),
            });
            names.push(FeatureName {
                kind: FieldKind::Casing,
                header: Some(header.clone()),
            });
        }
        names.push(FeatureName {
            kind: FieldKind::StatusMessage,
            header: None,
        });
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{parse_response, RawSample};
    use crate::schema::{build_vocabulary, default_excluded_headers};

    fn parsed(response: &str, response_time: f64) -> ParsedResponse {
        parse_response(&RawSample {
            response: response.to_string(),
            response_time,
            framework: None,
        })
    }

    fn fitted() -> (Vec<ParsedResponse>, EncodingRegistry) {
        let corpus = vec![
            parsed("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n", 0.12),
            parsed("HTTP/1.1 200 OK\r\nX-Powered-By: PHP/8.1\r\n\r\n", 0.08),
        ];
        let vocab = build_vocabulary(&corpus, &default_excluded_headers());
        let registry = EncodingRegistry::fit(&corpus, vocab);
        (corpus, registry)
    }

    #[test]
    fn test_category_encoder_codes_are_sorted_and_stable() {
        let encoder = CategoryEncoder::fit(["beta", "alpha", "beta"]);
        assert_eq!(encoder.categories(), ["alpha", "beta"]);
        assert_eq!(encoder.encode("alpha"), 1);
        assert_eq!(encoder.encode("beta"), 2);
        assert_eq!(encoder.encode("gamma"), UNKNOWN_CODE);
    }

    #[test]
    fn test_label_encoder_roundtrip() {
        let labels = LabelEncoder::fit(["symfony", "laravel", "symfony"]);
        assert_eq!(labels.classes(), ["laravel", "symfony"]);
        assert_eq!(labels.encode("laravel"), Some(0));
        assert_eq!(labels.decode(1), Some("symfony"));
        assert_eq!(labels.decode(7), None);
        assert!(labels.encode("django").is_none());
    }

    #[test]
    fn test_label_encoder_transform_rejects_unseen() {
        let labels = LabelEncoder::fit(["laravel"]);
        assert!(labels.transform(["laravel", "django"]).is_err());
    }

    #[test]
    fn test_vector_width_invariant() {
        let (corpus, registry) = fitted();
        let a = registry.transform(&corpus[0]);
        let b = registry.transform(&corpus[1]);
        let empty = registry.transform(&parsed("garbage", 0.0));
        assert_eq!(a.len(), registry.n_features());
        assert_eq!(b.len(), a.len());
        assert_eq!(empty.len(), a.len());
    }

    #[test]
    fn test_transform_idempotent_on_fitting_sample() {
        let (corpus, registry) = fitted();
        let first = registry.transform(&corpus[0]);
        let again = registry.transform(&corpus[0]);
        assert_eq!(first, again);
    }

    #[test]
    fn test_presence_slots() {
        let (corpus, registry) = fitted();
        // vocabulary = ["content-type", "x-powered-by"]
        let v = registry.transform(&corpus[0]);
        assert_eq!(&v[..2], &[1.0, 0.0]);
        let w = registry.transform(&corpus[1]);
        assert_eq!(&w[..2], &[0.0, 1.0]);
    }

    #[test]
    fn test_numeric_slots_pass_through() {
        let (corpus, registry) = fitted();
        let v = registry.transform(&corpus[0]);
        let vocab_len = registry.vocabulary().len();
        assert!((v[vocab_len] - 0.12).abs() < 1e-6);
        assert!((v[vocab_len + 1] - 200.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_absent_status_code_imputed_zero() {
        let (_, registry) = fitted();
        let v = registry.transform(&parsed("no status here", 0.3));
        let vocab_len = registry.vocabulary().len();
        assert_eq!(v[vocab_len + 1], 0.0);
    }

    #[test]
    fn test_unseen_value_maps_to_unknown_code() {
        let (_, registry) = fitted();
        let novel = parsed(
            "HTTP/1.1 200 OK\r\nContent-Type: application/never-seen\r\n\r\n",
            0.1,
        );
        let v = registry.transform(&novel);
        let vocab_len = registry.vocabulary().len();
        // content-type is vocabulary index 0; its value slot follows the
        // presence block and the two numeric slots.
        let value_slot = vocab_len + 2;
        assert_eq!(v[value_slot], UNKNOWN_CODE as f32);
    }

    #[test]
    fn test_unseen_casing_maps_to_unknown_code() {
        let (_, registry) = fitted();
        // Fitted casings for content-type are {titlecase, other}; an
        // all-caps spelling was never observed.
        let novel = parsed("HTTP/1.1 200 OK\r\nCONTENT-TYPE: text/html\r\n\r\n", 0.1);
        let v = registry.transform(&novel);
        let vocab_len = registry.vocabulary().len();
        let casing_slot = vocab_len + 3;
        assert_eq!(v[casing_slot], UNKNOWN_CODE as f32);
    }

    #[test]
    fn test_absent_header_uses_sentinel_categories() {
        let (corpus, registry) = fitted();
        // Sample 0 lacks x-powered-by, so its value slot carries the
        // fitted "unknown" sentinel category, not the unknown code.
        let v = registry.transform(&corpus[0]);
        let vocab_len = registry.vocabulary().len();
        let xpb_value_slot = vocab_len + 2 + 2;
        assert_ne!(v[xpb_value_slot], UNKNOWN_CODE as f32);
    }

    #[test]
    fn test_encode_corpus_rectangular() {
        let (corpus, registry) = fitted();
        let matrix = registry.encode_corpus(&corpus).expect("encodes");
        assert_eq!(matrix.shape(), (2, registry.n_features()));
    }

    #[test]
    fn test_encode_corpus_empty_fails() {
        let (_, registry) = fitted();
        assert!(registry.encode_corpus(&[]).is_err());
    }

    #[test]
    fn test_feature_names_parallel_layout() {
        let (_, registry) = fitted();
        let names = registry.feature_names();
        assert_eq!(names.len(), registry.n_features());
        assert_eq!(names[0].to_string(), "Header Presence");
        let vocab_len = registry.vocabulary().len();
        assert_eq!(names[vocab_len].to_string(), "Response Time");
        assert_eq!(names[vocab_len + 1].to_string(), "Status Code");
        assert_eq!(names[vocab_len + 2].to_string(), "content-type Value");
        assert_eq!(names[vocab_len + 3].to_string(), "content-type Casing");
        assert_eq!(
            names.last().expect("nonempty").to_string(),
            "Status Message"
        );
    }

    #[test]
    fn test_registry_serde_roundtrip() {
        let (corpus, registry) = fitted();
        let bytes = bincode::serialize(&registry).expect("serializes");
        let restored: EncodingRegistry = bincode::deserialize(&bytes).expect("deserializes");
        assert_eq!(restored, registry);
        assert_eq!(restored.transform(&corpus[0]), registry.transform(&corpus[0]));
    }
}

//! Huella: web framework fingerprinting from raw HTTP responses.
//!
//! Huella learns a random-forest classifier over structural features of raw
//! HTTP response captures (header set, header value formatting, header-name
//! capitalization, status line, timing) and uses it to guess which web
//! framework produced an opaque response. Captures come from a raw-socket
//! fuzzer, so parsing assumes CRLF-delimited dumps rather than spec-compliant
//! HTTP.
//!
//! # Quick Start
//!
//! ```
//! use huella::encoding::EncodingRegistry;
//! use huella::response::{parse_response, RawSample};
//! use huella::schema::{build_vocabulary, default_excluded_headers};
//!
//! let samples = vec![
//!     RawSample {
//!         response: "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n".into(),
//!         response_time: 0.12,
//!         framework: Some("laravel".into()),
//!     },
//! ];
//! let parsed: Vec<_> = samples.iter().map(parse_response).collect();
//! let vocab = build_vocabulary(&parsed, &default_excluded_headers());
//! let registry = EncodingRegistry::fit(&parsed, vocab);
//! let vector = registry.transform(&parsed[0]);
//! assert_eq!(vector.len(), registry.n_features());
//! ```
//!
//! # Modules
//!
//! - [`response`]: Raw response parsing into a structural representation
//! - [`schema`]: Header vocabulary derivation from a training corpus
//! - [`encoding`]: Categorical encoders and the fitted encoding registry
//! - [`tree`]: Decision tree and random forest classifiers
//! - [`model_selection`]: Reproducible train/test splitting
//! - [`metrics`]: Classification evaluation metrics
//! - [`model`]: The persisted model artifact (one atomic bundle)
//! - [`report`]: Diagnostic reports (importances, confusion matrix)
//! - [`primitives`]: Core Vector and Matrix types

pub mod encoding;
pub mod error;
pub mod metrics;
pub mod model;
pub mod model_selection;
pub mod primitives;
pub mod report;
pub mod response;
pub mod schema;
pub mod tree;

pub use error::{HuellaError, Result};

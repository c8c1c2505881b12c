//! # Prever
//!
//! Tabular inference for three prediction verticals: crop recommendation,
//! diabetes classification and liver-disease risk.
//!
//! Every request goes through the same fixed pipeline:
//!
//! 1. **Validate**: raw untyped fields are checked for presence, numeric
//!    format and range, and coerced to numbers ([`validate`])
//! 2. **Derive**: engineered ratio features are computed ([`features`])
//! 3. **Transform**: fitted scalers are applied in order ([`transform`])
//! 4. **Predict**: a frozen model maps the vector to a numeric label ([`model`])
//! 5. **Decode**: the label becomes a category and a response body ([`decode`])
//!
//! The per-vertical schema ([`schema`]) drives every stage, and fitted
//! artifacts are loaded from JSON bundles ([`artifact`]) and cross-checked
//! against it at startup.
//!
//! ## Example
//!
//! ```rust
//! use prever::{demo, schema::Vertical, validate::RawRecord};
//!
//! let pipeline = demo::bundle(Vertical::Crop)
//!     .and_then(|b| b.into_pipeline(Vertical::Crop))
//!     .expect("reference bundle loads");
//!
//! let record: RawRecord = [
//!     ("Nitrogen", "90"),
//!     ("Phosporus", "42"),
//!     ("Potassium", "43"),
//!     ("Temperature", "20.8"),
//!     ("Humidity", "82.0"),
//!     ("pH", "6.5"),
//!     ("Rainfall", "202.9"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let prediction = pipeline.predict(&record).expect("valid record");
//! assert_eq!(prediction.category, "Rice");
//! ```
//!
//! ## Serving
//!
//! With the default `server` feature, [`api::create_router`] exposes the
//! pipelines over HTTP and the `prever` binary wires it to a TCP listener.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // usize -> f64 for metrics
#![allow(clippy::cast_possible_truncation)] // u128 -> u64 for metrics
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]

#[cfg(feature = "server")]
pub mod api;
pub mod artifact;
pub mod batch;
pub mod cli;
pub mod config;
pub mod decode;
pub mod demo;
pub mod error;
pub mod features;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod transform;
pub mod validate;

// Re-exports for convenience
pub use error::{PreverError, Result};
pub use pipeline::Pipeline;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

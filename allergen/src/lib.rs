#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Allergen
//!
//! Allergen detects the major food allergens mentioned in free-form text, such as product
//! descriptions and ingredient lists, with one TF-IDF vectorizer and one linear classifier per
//! allergen.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{prelude::*, stdin, BufReader};
//!
//! use allergen::{Model, Predictor};
//!
//! let mut f = BufReader::new(File::open("model.bin").unwrap());
//! let model = Model::read(&mut f).unwrap();
//! let predictor = Predictor::new(model).unwrap();
//!
//! for line in stdin().lock().lines() {
//!     let p = predictor.predict(line.unwrap()).unwrap();
//!     println!("{}", serde_json::to_string(&p).unwrap());
//! }
//! ```
//!
//! Training requires **crate feature** `train`. For more details, see [`Trainer`].

mod classifier;
mod dataset;
mod labels;
mod locator;
mod metrics;
mod model;
mod normalizer;
mod predictor;
mod vectorizer;

#[cfg(feature = "train")]
mod trainer;

pub mod errors;

pub use classifier::{sigmoid, Capability, Classifier, LabelClassifier, OneVsRestClassifier};
pub use dataset::{Dataset, TEXT_COLUMN};
pub use errors::{AllergenError, Result};
pub use labels::{label_index, LabelMap, LABELS, N_LABELS};
pub use locator::{ModelLocator, DEFAULT_MODEL_PATH, MODEL_ENV};
pub use metrics::{EvaluationReport, LabelScore};
pub use model::Model;
pub use normalizer::{normalize, normalize_document, StringFilter, TextNormalizer};
pub use predictor::{
    threshold, ErrorResponse, PredictRequest, Prediction, Predictor, DEFAULT_THRESHOLD,
};
pub use vectorizer::{FeatureVector, Vectorizer, VectorizerConfig, Vocabulary};

#[cfg(feature = "train")]
pub use trainer::{SolverType, Trainer, TrainerConfig};

use serde::{Deserialize, Serialize};

use crate::classifier::{sigmoid, Capability, Classifier, OneVsRestClassifier};
use crate::errors::Result;
use crate::labels::{LabelMap, N_LABELS};
use crate::model::Model;
use crate::normalizer::normalize;
use crate::vectorizer::{FeatureVector, Vectorizer};

/// Default decision threshold. It is below 0.5 to favor recall: a missed allergen is worse than
/// a false alarm.
pub const DEFAULT_THRESHOLD: f64 = 0.2;

/// Marks a label active iff its score is at least `cutoff`.
pub fn threshold(scores: &[f64; N_LABELS], cutoff: f64) -> [bool; N_LABELS] {
    scores.map(|s| s >= cutoff)
}

/// Result of one prediction.
///
/// When the model produces no scores, `scores` and `threshold` are absent and not serialized.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<LabelMap<f64>>,

    pub labels: LabelMap<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl Prediction {
    /// Returns `true` if the given allergen is detected.
    pub fn is_active(&self, label: &str) -> bool {
        self.labels.get(label).is_some_and(|&v| v == 1)
    }
}

/// Request body of a prediction. A missing or non-string `text` is the absent document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    text: Option<serde_json::Value>,
}

impl PredictRequest {
    pub fn new<S>(text: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            text: Some(serde_json::Value::String(text.into())),
        }
    }

    /// The document, if `text` holds a string.
    pub fn document(&self) -> Option<&str> {
        self.text.as_ref().and_then(serde_json::Value::as_str)
    }
}

/// Error body returned in place of a [`Prediction`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl<E> From<E> for ErrorResponse
where
    E: std::error::Error,
{
    fn from(e: E) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

/// Predictor.
///
/// The capability tier is selected once, when the predictor is created, and applied to every
/// label of every request. A predictor is never mutated by [`Predictor::predict`], so it can be
/// shared between threads.
///
/// # Examples
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
///
/// use allergen::{Model, Predictor};
///
/// let mut f = BufReader::new(File::open("model.bin").unwrap());
/// let model = Model::read(&mut f).unwrap();
/// let predictor = Predictor::new(model).unwrap();
///
/// let p = predictor.predict("Contains peanuts and milk").unwrap();
/// println!("{}", serde_json::to_string(&p).unwrap());
/// ```
pub struct Predictor<C = OneVsRestClassifier> {
    vectorizer: Vectorizer,
    classifier: C,
    capability: Capability,
    threshold: f64,
}

// Compile-time verification of thread-safety
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Predictor>();
};

impl Predictor {
    /// Creates a new predictor.
    ///
    /// # Arguments
    ///
    /// * `model` - A model data.
    ///
    /// # Returns
    ///
    /// A new predictor.
    ///
    /// # Errors
    ///
    /// If the vocabulary cannot be indexed, an error variant will be returned.
    pub fn new(model: Model) -> Result<Self> {
        let vectorizer = Vectorizer::new(model.vocabulary)?;
        Ok(Self::with_classifier(vectorizer, model.classifier))
    }
}

impl<C> Predictor<C>
where
    C: Classifier,
{
    /// Creates a predictor from a vectorizer and any classifier trained against its vocabulary.
    pub fn with_classifier(vectorizer: Vectorizer, classifier: C) -> Self {
        let capability = Capability::select(&classifier);
        log::info!("inference tier: {capability}");
        Self {
            vectorizer,
            classifier,
            capability,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Sets the decision threshold applied to scores.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// The capability tier used by this predictor.
    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    /// Predicts the allergens of a raw text.
    ///
    /// # Errors
    ///
    /// [`crate::AllergenError::Prediction`] is returned if the classifier cannot score the
    /// features.
    pub fn predict<S>(&self, text: S) -> Result<Prediction>
    where
        S: AsRef<str>,
    {
        let text = normalize(text);
        let x = self.vectorizer.transform(&text);
        log::debug!("{:?}: {} active features", text, x.entries().len());
        self.predict_features(&x)
    }

    /// Predicts the allergens of a document that may be absent.
    pub fn predict_document(&self, document: Option<&str>) -> Result<Prediction> {
        self.predict(document.unwrap_or(""))
    }

    /// Predicts the allergens of a feature vector.
    pub fn predict_features(&self, x: &FeatureVector) -> Result<Prediction> {
        let scores = match self.capability {
            Capability::ProbabilityScoring => self.classifier.predict_proba(x)?,
            Capability::DecisionScoring => self.classifier.decision_function(x)?.map(sigmoid),
            Capability::HardLabelOnly => {
                let labels = self.classifier.predict_labels(x)?;
                return Ok(Prediction {
                    scores: None,
                    labels: LabelMap::new(labels.map(u8::from)),
                    threshold: None,
                });
            }
        };
        let labels = threshold(&scores, self.threshold);
        Ok(Prediction {
            scores: Some(LabelMap::new(scores)),
            labels: LabelMap::new(labels.map(u8::from)),
            threshold: Some(self.threshold),
        })
    }

    /// Predicts the binary decision of each label, ignoring scores.
    pub fn predict_labels(&self, text: &str) -> Result<[bool; N_LABELS]> {
        let x = self.vectorizer.transform(&normalize(text));
        self.classifier.predict_labels(&x)
    }
}

//! One-vs-rest linear classifiers and their capability tiers.

use core::fmt;
use core::str::FromStr;

use bincode::{Decode, Encode};

use crate::errors::{AllergenError, Result};
use crate::labels::N_LABELS;
use crate::vectorizer::FeatureVector;

/// What kind of output a classifier can produce.
///
/// The variants are ordered from least to most capable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Decode, Encode)]
pub enum Capability {
    /// Binary decisions only.
    HardLabelOnly,

    /// Real-valued margins `w·x + b`.
    DecisionScoring,

    /// Probabilities `sigmoid(w·x + b)`.
    ProbabilityScoring,
}

impl Capability {
    /// All tiers, most capable first.
    pub const PREFERENCE: [Self; 3] = [
        Self::ProbabilityScoring,
        Self::DecisionScoring,
        Self::HardLabelOnly,
    ];

    /// Selects the most capable tier supported by `classifier`. Hard labels are the last resort.
    pub fn select<C>(classifier: &C) -> Self
    where
        C: Classifier + ?Sized,
    {
        Self::PREFERENCE
            .into_iter()
            .find(|&cap| classifier.supports(cap))
            .unwrap_or(Self::HardLabelOnly)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::HardLabelOnly => write!(f, "hard"),
            Self::DecisionScoring => write!(f, "decision"),
            Self::ProbabilityScoring => write!(f, "probability"),
        }
    }
}

impl FromStr for Capability {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "probability" => Ok(Self::ProbabilityScoring),
            "decision" => Ok(Self::DecisionScoring),
            "hard" => Ok(Self::HardLabelOnly),
            _ => Err("Could not parse a capability value"),
        }
    }
}

#[inline(always)]
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Multi-label classifier over the allergen categories.
///
/// Implementations declare the tiers they support; the methods of unsupported tiers return
/// [`AllergenError::Prediction`].
pub trait Classifier {
    /// Returns `true` if the classifier can produce outputs of the given tier.
    fn supports(&self, capability: Capability) -> bool;

    /// Probability of each label, in label order.
    fn predict_proba(&self, x: &FeatureVector) -> Result<[f64; N_LABELS]>;

    /// Raw margin of each label, in label order.
    fn decision_function(&self, x: &FeatureVector) -> Result<[f64; N_LABELS]>;

    /// Binary decision of each label, in label order.
    fn predict_labels(&self, x: &FeatureVector) -> Result<[bool; N_LABELS]>;
}

/// Binary linear classifier of one label.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct LabelClassifier {
    pub(crate) weights: Vec<f64>,
    pub(crate) bias: f64,
}

impl LabelClassifier {
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Computes `w·x + b`.
    ///
    /// # Errors
    ///
    /// [`AllergenError::Prediction`] is returned if `x` does not match the weight vector.
    pub fn decision(&self, x: &FeatureVector) -> Result<f64> {
        if x.dim() != self.weights.len() {
            return Err(AllergenError::prediction(format!(
                "feature vector of length {} for {} weights",
                x.dim(),
                self.weights.len()
            )));
        }
        let mut z = self.bias;
        for &(i, v) in x.entries() {
            let w = self.weights.get(i as usize).ok_or_else(|| {
                AllergenError::prediction(format!("feature index {i} is out of range"))
            })?;
            z += w * v;
        }
        if z.is_nan() {
            return Err(AllergenError::prediction("decision value is NaN"));
        }
        Ok(z)
    }
}

/// One independent [`LabelClassifier`] per allergen.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct OneVsRestClassifier {
    pub(crate) classifiers: Vec<LabelClassifier>,
    pub(crate) capability: Capability,
}

impl OneVsRestClassifier {
    /// Creates a classifier.
    ///
    /// # Arguments
    ///
    /// * `classifiers` - One classifier per label, in label order.
    /// * `capability` - The most capable tier this model answers. Lower tiers are implied.
    ///
    /// # Errors
    ///
    /// If the number of classifiers is not the number of labels, or the weight vectors differ in
    /// length, an error variant will be returned.
    pub fn new(classifiers: Vec<LabelClassifier>, capability: Capability) -> Result<Self> {
        if classifiers.len() != N_LABELS {
            return Err(AllergenError::invalid_argument(
                "classifiers",
                format!("{} classifiers for {} labels", classifiers.len(), N_LABELS),
            ));
        }
        let dim = classifiers[0].weights.len();
        if classifiers.iter().any(|c| c.weights.len() != dim) {
            return Err(AllergenError::invalid_argument(
                "classifiers",
                "weight vectors differ in length",
            ));
        }
        Ok(Self {
            classifiers,
            capability,
        })
    }

    pub fn classifiers(&self) -> &[LabelClassifier] {
        &self.classifiers
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Lowers the capability tier. Raising it is not allowed.
    pub fn downgrade(&mut self, capability: Capability) -> Result<()> {
        if capability > self.capability {
            return Err(AllergenError::invalid_argument(
                "capability",
                format!("cannot raise `{}` to `{}`", self.capability, capability),
            ));
        }
        self.capability = capability;
        Ok(())
    }

    fn decisions(&self, x: &FeatureVector) -> Result<[f64; N_LABELS]> {
        let mut zs = [0.0; N_LABELS];
        for (z, c) in zs.iter_mut().zip(&self.classifiers) {
            *z = c.decision(x)?;
        }
        Ok(zs)
    }

    fn unsupported(&self, capability: Capability) -> AllergenError {
        AllergenError::prediction(format!(
            "`{capability}` output is not available from a `{}` model",
            self.capability
        ))
    }
}

impl Classifier for OneVsRestClassifier {
    fn supports(&self, capability: Capability) -> bool {
        capability <= self.capability
    }

    fn predict_proba(&self, x: &FeatureVector) -> Result<[f64; N_LABELS]> {
        if !self.supports(Capability::ProbabilityScoring) {
            return Err(self.unsupported(Capability::ProbabilityScoring));
        }
        Ok(self.decisions(x)?.map(sigmoid))
    }

    fn decision_function(&self, x: &FeatureVector) -> Result<[f64; N_LABELS]> {
        if !self.supports(Capability::DecisionScoring) {
            return Err(self.unsupported(Capability::DecisionScoring));
        }
        self.decisions(x)
    }

    fn predict_labels(&self, x: &FeatureVector) -> Result<[bool; N_LABELS]> {
        Ok(self.decisions(x)?.map(|z| z > 0.0))
    }
}

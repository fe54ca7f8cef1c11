use std::io::{Read, Write};

use bincode::{Decode, Encode};

use crate::classifier::{Capability, OneVsRestClassifier};
use crate::errors::{AllergenError, Result};
use crate::labels::LABELS;
use crate::vectorizer::Vocabulary;

/// Model data: the label order, the frozen vocabulary, and one linear classifier per label.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct Model {
    pub(crate) labels: Vec<String>,
    pub(crate) vocabulary: Vocabulary,
    pub(crate) classifier: OneVsRestClassifier,
}

impl Model {
    /// Creates a model from its parts.
    ///
    /// # Errors
    ///
    /// If the classifiers do not match the vocabulary, an error variant will be returned.
    pub fn new(vocabulary: Vocabulary, classifier: OneVsRestClassifier) -> Result<Self> {
        let model = Self {
            labels: LABELS.iter().map(|l| l.to_string()).collect(),
            vocabulary,
            classifier,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn classifier(&self) -> &OneVsRestClassifier {
        &self.classifier
    }

    pub fn capability(&self) -> Capability {
        self.classifier.capability
    }

    /// Lowers the capability tier stored in the model.
    pub fn downgrade(&mut self, capability: Capability) -> Result<()> {
        self.classifier.downgrade(capability)
    }

    /// Exports the model data.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        let config = bincode::config::standard();
        bincode::encode_into_std_write(self, wtr, config)?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Returns
    ///
    /// A model data read from `rdr`.
    ///
    /// # Errors
    ///
    /// A stream that cannot be decoded, or a model whose parts do not agree with each other,
    /// gives [`AllergenError::ArtifactLoad`].
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let config = bincode::config::standard();
        let model: Self = bincode::decode_from_std_read(rdr, config)
            .map_err(|e| AllergenError::invalid_artifact(format!("failed to decode: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.labels.iter().map(String::as_str).ne(LABELS) {
            return Err(AllergenError::invalid_artifact(format!(
                "label order {:?} does not match {:?}",
                self.labels, LABELS
            )));
        }
        self.vocabulary
            .validate()
            .map_err(|e| AllergenError::invalid_artifact(format!("vocabulary: {e}")))?;
        if self.classifier.classifiers.len() != LABELS.len() {
            return Err(AllergenError::invalid_artifact(format!(
                "{} classifiers for {} labels",
                self.classifier.classifiers.len(),
                LABELS.len()
            )));
        }
        for (label, c) in LABELS.iter().zip(&self.classifier.classifiers) {
            if c.weights.len() != self.vocabulary.len() {
                return Err(AllergenError::invalid_artifact(format!(
                    "classifier `{label}` has {} weights for a vocabulary of {} terms",
                    c.weights.len(),
                    self.vocabulary.len()
                )));
            }
        }
        Ok(())
    }
}

//! Definition of errors.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = AllergenError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum AllergenError {
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    LabelValue(#[from] LabelValueError),

    #[error(transparent)]
    ArtifactLoad(#[from] ArtifactLoadError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgumentError),

    #[error("TrainError: {0}")]
    Train(String),

    #[error(transparent)]
    CastError(#[from] core::num::TryFromIntError),

    #[error(transparent)]
    EncodeError(#[from] bincode::error::EncodeError),

    #[error(transparent)]
    CsvError(#[from] csv::Error),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl AllergenError {
    pub(crate) fn empty_vocabulary(n_docs: usize, min_df: usize, max_df_count: f64) -> Self {
        Self::Vocabulary(VocabularyError {
            n_docs,
            min_df,
            max_df_count,
        })
    }

    pub(crate) fn schema(row: Option<usize>, column: &str) -> Self {
        Self::Schema(SchemaError {
            row,
            column: column.to_string(),
        })
    }

    pub(crate) fn label_value<S>(row: usize, column: &str, value: S) -> Self
    where
        S: Into<String>,
    {
        Self::LabelValue(LabelValueError {
            row,
            column: column.to_string(),
            value: value.into(),
        })
    }

    /// Creates an artifact load error for `path`.
    pub fn artifact_load<P, S>(path: P, msg: S) -> Self
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        Self::ArtifactLoad(ArtifactLoadError {
            path: Some(path.into()),
            msg: msg.into(),
        })
    }

    pub(crate) fn invalid_artifact<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::ArtifactLoad(ArtifactLoadError {
            path: None,
            msg: msg.into(),
        })
    }

    pub(crate) fn prediction<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Prediction(PredictionError { msg: msg.into() })
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }
}

/// Error used when frequency filtering leaves no term in the vocabulary.
#[derive(Debug, Error)]
#[error(
    "VocabularyError: no term left after filtering {n_docs} documents \
     (min_df: {min_df}, max document count: {max_df_count})"
)]
pub struct VocabularyError {
    /// Number of documents in the corpus.
    pub(crate) n_docs: usize,

    /// Minimum document frequency.
    pub(crate) min_df: usize,

    /// Maximum document frequency, as an absolute count.
    pub(crate) max_df_count: f64,
}

/// Error used when the text column or a label column is missing.
#[derive(Debug, Error)]
#[error("SchemaError: {}: missing column `{column}`", display_row(.row))]
pub struct SchemaError {
    /// 1-based data row, or `None` for the header.
    pub(crate) row: Option<usize>,

    /// Name of the missing column.
    pub(crate) column: String,
}

impl SchemaError {
    /// Name of the missing column.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// 1-based data row, or `None` when the header lacks the column.
    pub fn row(&self) -> Option<usize> {
        self.row
    }
}

fn display_row(row: &Option<usize>) -> String {
    row.map_or_else(|| "header".to_string(), |row| format!("row {row}"))
}

/// Error used when a label cell holds something other than 0 or 1.
#[derive(Debug, Error)]
#[error("LabelValueError: row {row}: column `{column}`: invalid label value {value:?}")]
pub struct LabelValueError {
    /// 1-based data row.
    pub(crate) row: usize,

    /// Name of the label column.
    pub(crate) column: String,

    /// The rejected cell content.
    pub(crate) value: String,
}

impl LabelValueError {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn row(&self) -> usize {
        self.row
    }
}

/// Error used when a model artifact cannot be located, decoded or validated.
#[derive(Debug, Error)]
#[error("ArtifactLoadError: {}{msg}", display_path(.path))]
pub struct ArtifactLoadError {
    /// The artifact path, when known.
    pub(crate) path: Option<PathBuf>,

    /// Error message.
    pub(crate) msg: String,
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!("{}: ", path.display()))
        .unwrap_or_default()
}

/// Error used when the prediction pipeline fails.
#[derive(Debug, Error)]
#[error("PredictionError: {msg}")]
pub struct PredictionError {
    /// Error message.
    pub(crate) msg: String,
}

/// Error used when the argument is invalid.
#[derive(Debug, Error)]
#[error("InvalidArgumentError: {arg}: {msg}")]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

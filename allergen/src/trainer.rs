use core::str::FromStr;

use liblinear::LibLinearModel;

use crate::classifier::{Capability, LabelClassifier, OneVsRestClassifier};
use crate::dataset::Dataset;
use crate::errors::{AllergenError, Result};
use crate::labels::{LABELS, N_LABELS};
use crate::metrics::EvaluationReport;
use crate::model::Model;
use crate::vectorizer::{FeatureVector, Vectorizer, VectorizerConfig};

/// Solver type.
///
/// Only the solvers that train one binary classifier are available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverType {
    /// L2-regularized logistic regression (primal).
    L2RegularizedLogistic = 0,

    /// L2-regularized L2-loss support vector classification (dual).
    L2RegularizedL2LossSVCDual = 1,

    /// L2-regularized L2-loss support vector classification (primal).
    L2RegularizedL2LossSVC = 2,

    /// L2-regularized L1-loss support vector classification (dual)
    L2RegularizedL1LossSVCDual = 3,

    /// L1-regularized L2-loss support vector classification
    L1RegularizedL2LossSVC = 5,

    /// L1-regularized logistic regression
    L1RegularizedLogistic = 6,

    /// L2-regularized logistic regression (dual).
    L2RegularizedLogisticDual = 7,
}

impl SolverType {
    /// Logistic solvers give probabilities; the others only give margins.
    pub const fn capability(self) -> Capability {
        match self {
            Self::L2RegularizedLogistic
            | Self::L1RegularizedLogistic
            | Self::L2RegularizedLogisticDual => Capability::ProbabilityScoring,
            _ => Capability::DecisionScoring,
        }
    }
}

impl FromStr for SolverType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::L2RegularizedLogistic),
            "1" => Ok(Self::L2RegularizedL2LossSVCDual),
            "2" => Ok(Self::L2RegularizedL2LossSVC),
            "3" => Ok(Self::L2RegularizedL1LossSVCDual),
            "5" => Ok(Self::L1RegularizedL2LossSVC),
            "6" => Ok(Self::L1RegularizedLogistic),
            "7" => Ok(Self::L2RegularizedLogisticDual),
            _ => Err("Unsupported solver type."),
        }
    }
}

impl From<SolverType> for liblinear::SolverType {
    fn from(solver: SolverType) -> Self {
        match solver {
            SolverType::L2RegularizedLogistic => Self::L2R_LR,
            SolverType::L2RegularizedL2LossSVCDual => Self::L2R_L2LOSS_SVC_DUAL,
            SolverType::L2RegularizedL2LossSVC => Self::L2R_L2LOSS_SVC,
            SolverType::L2RegularizedL1LossSVCDual => Self::L2R_L1LOSS_SVC_DUAL,
            SolverType::L1RegularizedL2LossSVC => Self::L1R_L2LOSS_SVC,
            SolverType::L1RegularizedLogistic => Self::L1R_LR,
            SolverType::L2RegularizedLogisticDual => Self::L2R_LR_DUAL,
        }
    }
}

/// Settings of a training run.
///
/// There is no iteration cap: liblinear stops on `eps` and bounds the number of iterations
/// internally. A run that hits that bound is not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainerConfig {
    pub vectorizer: VectorizerConfig,
    pub solver: SolverType,

    /// The tolerance of the termination criterion.
    pub eps: f64,

    /// The parameter C.
    pub cost: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerConfig::default(),
            solver: SolverType::L2RegularizedLogistic,
            eps: 1e-4,
            cost: 1.0,
        }
    }
}

/// Trainer.
///
/// Fits the vocabulary on the training split, then one binary classifier per label.
///
/// # Examples
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufWriter;
///
/// use allergen::{Dataset, Trainer, TrainerConfig};
///
/// let train = Dataset::from_csv_reader(File::open("train.csv").unwrap()).unwrap();
/// let val = Dataset::from_csv_reader(File::open("val.csv").unwrap()).unwrap();
///
/// let trainer = Trainer::new(TrainerConfig::default());
/// let (model, report) = trainer.train(&train, &val).unwrap();
/// println!("{report}");
///
/// let mut f = BufWriter::new(File::create("model.bin").unwrap());
/// model.write(&mut f).unwrap();
/// ```
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Trains a model and evaluates it on the validation split with hard labels.
    ///
    /// # Errors
    ///
    /// Vocabulary and solver errors are returned as is.
    pub fn train(&self, train: &Dataset, val: &Dataset) -> Result<(Model, EvaluationReport)> {
        let model = self.fit(train)?;

        let vectorizer = Vectorizer::new(model.vocabulary.clone())?;
        let mut predictions = Vec::with_capacity(val.len());
        for text in val.texts() {
            let x = vectorizer.transform(text);
            let mut labels = [false; N_LABELS];
            for (label, c) in labels.iter_mut().zip(&model.classifier.classifiers) {
                *label = c.decision(&x)? > 0.0;
            }
            predictions.push(labels);
        }
        let report = EvaluationReport::new(val.labels(), &predictions);
        log::info!("macro F1: {}", report.macro_f1);

        Ok((model, report))
    }

    /// Trains a model without evaluation.
    pub fn fit(&self, train: &Dataset) -> Result<Model> {
        let vectorizer = Vectorizer::fit(train.texts(), self.config.vectorizer.clone())?;
        let n_features = vectorizer.vocabulary().len();

        let xs: Vec<Vec<(u32, f64)>> = train
            .texts()
            .iter()
            .map(|text| to_liblinear_features(&vectorizer.transform(text)))
            .collect();

        liblinear::toggle_liblinear_stdout_output(false);
        let classifiers: Result<Vec<_>> = LABELS
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let ys: Vec<f64> = train.label_column(i).map(|y| f64::from(u8::from(y))).collect();
                log::info!("training `{label}`...");
                self.train_label(label, &xs, ys, n_features)
            })
            .collect();
        liblinear::toggle_liblinear_stdout_output(true);
        let classifiers = classifiers?;

        let classifier = OneVsRestClassifier::new(classifiers, self.config.solver.capability())?;
        Model::new(vectorizer.into_vocabulary(), classifier)
    }

    fn train_label(
        &self,
        label: &str,
        xs: &[Vec<(u32, f64)>],
        ys: Vec<f64>,
        n_features: usize,
    ) -> Result<LabelClassifier> {
        let n_pos = ys.iter().filter(|&&y| y > 0.0).count();
        if n_pos == 0 || n_pos == ys.len() {
            log::warn!(
                "`{label}` has only one class ({n_pos} of {} positive); using a constant classifier",
                ys.len()
            );
            return Ok(constant_classifier(n_pos, ys.len(), n_features));
        }

        let mut builder = liblinear::Builder::new();
        let training_input = liblinear::util::TrainingInput::from_sparse_features(ys, xs.to_vec())
            .map_err(|e| AllergenError::Train(format!("liblinear error: {e:?}")))?;
        builder.problem().input_data(training_input).bias(1.0);
        builder
            .parameters()
            .solver_type(self.config.solver.into())
            .stopping_criterion(self.config.eps)
            .constraints_violation_cost(self.config.cost);
        let model = builder
            .build_model()
            .map_err(|e| AllergenError::Train(e.to_string()))?;

        let pos_idx = model
            .labels()
            .iter()
            .position(|&cls| cls == 1)
            .ok_or_else(|| AllergenError::Train(format!("`{label}`: positive class is lost")))?;
        let pos_idx = i32::try_from(pos_idx)?;

        let mut weights = Vec::with_capacity(n_features);
        for fid in 0..n_features {
            weights.push(model.feature_coefficient(i32::try_from(fid)? + 1, pos_idx));
        }
        let bias = model.label_bias(pos_idx);

        Ok(LabelClassifier::new(weights, bias))
    }
}

/// Converts to 1-based liblinear indices.
fn to_liblinear_features(x: &FeatureVector) -> Vec<(u32, f64)> {
    x.entries().iter().map(|&(i, v)| (i + 1, v)).collect()
}

/// Classifier predicting the Laplace-smoothed prevalence for every input.
fn constant_classifier(n_pos: usize, n: usize, n_features: usize) -> LabelClassifier {
    let p = (n_pos as f64 + 0.5) / (n as f64 + 1.0);
    LabelClassifier::new(vec![0.0; n_features], (p / (1.0 - p)).ln())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::classifier::sigmoid;
    use crate::predictor::Predictor;

    fn push(ds: &mut Dataset, text: &str, active: &[&str]) {
        let mut labels = [false; N_LABELS];
        for a in active {
            labels[crate::labels::label_index(a).unwrap()] = true;
        }
        ds.push(text, labels);
    }

    fn toy_train() -> Dataset {
        let mut ds = Dataset::new();
        push(&mut ds, "Roasted peanuts and salt", &["peanuts"]);
        push(&mut ds, "Peanut butter with honey", &["peanuts"]);
        push(&mut ds, "Crushed peanuts, sugar", &["peanuts"]);
        push(&mut ds, "Peanut butter cookies with milk", &["peanuts", "milk"]);
        push(&mut ds, "Whole milk and sugar", &["milk"]);
        push(&mut ds, "Skim milk with honey", &["milk"]);
        push(&mut ds, "Rice with salt", &[]);
        push(&mut ds, "Steamed rice and beans", &[]);
        push(&mut ds, "Beans with salt and pepper", &[]);
        push(&mut ds, "Pepper and rice", &[]);
        ds
    }

    fn toy_val() -> Dataset {
        let mut ds = Dataset::new();
        push(&mut ds, "Salted peanuts", &["peanuts"]);
        push(&mut ds, "Milk and honey", &["milk"]);
        push(&mut ds, "Rice and beans", &[]);
        ds
    }

    #[test]
    fn test_solver_from_str() {
        assert_eq!(Ok(SolverType::L2RegularizedLogistic), "0".parse());
        assert_eq!(Ok(SolverType::L2RegularizedLogisticDual), "7".parse());
        assert!("4".parse::<SolverType>().is_err());
    }

    #[test]
    fn test_solver_capability() {
        assert_eq!(
            Capability::ProbabilityScoring,
            SolverType::L2RegularizedLogistic.capability()
        );
        assert_eq!(
            Capability::DecisionScoring,
            SolverType::L2RegularizedL2LossSVCDual.capability()
        );
    }

    #[test]
    fn test_constant_classifier() {
        let c = constant_classifier(0, 6, 3);

        assert_eq!(vec![0.0; 3], c.weights());
        assert!((sigmoid(c.bias()) - 0.5 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_train() {
        let trainer = Trainer::new(TrainerConfig::default());
        let (model, report) = trainer.train(&toy_train(), &toy_val()).unwrap();

        assert_eq!(Capability::ProbabilityScoring, model.capability());
        assert_eq!(N_LABELS, report.labels.len());
        assert!((0.0..=1.0).contains(&report.macro_f1));
        for c in model.classifier().classifiers() {
            assert_eq!(model.vocabulary().len(), c.weights().len());
        }

        let vocab = model.vocabulary();
        assert!(vocab.terms().iter().any(|t| t == "peanuts"));
        assert!(vocab.terms().iter().any(|t| t == "milk"));
        assert!(!vocab.terms().iter().any(|t| t == "cookies"));
    }

    #[test]
    fn test_train_learns_direction() {
        let trainer = Trainer::new(TrainerConfig::default());
        let model = trainer.fit(&toy_train()).unwrap();
        let predictor = Predictor::new(model).unwrap();

        let nutty = predictor.predict("peanut butter").unwrap();
        let plain = predictor.predict("rice and beans").unwrap();
        let nutty = nutty.scores.unwrap();
        let plain = plain.scores.unwrap();
        assert!(nutty["peanuts"] > plain["peanuts"]);

        let creamy = predictor.predict("whole milk").unwrap().scores.unwrap();
        assert!(creamy["milk"] > plain["milk"]);
    }

    #[test]
    fn test_train_single_class_label() {
        let trainer = Trainer::new(TrainerConfig::default());
        let model = trainer.fit(&toy_train()).unwrap();

        let fish = &model.classifier().classifiers()[4];
        assert!(fish.weights().iter().all(|&w| w == 0.0));
        assert!((sigmoid(fish.bias()) - 0.5 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_train_svc_is_decision_scoring() {
        let config = TrainerConfig {
            solver: SolverType::L2RegularizedL2LossSVCDual,
            ..TrainerConfig::default()
        };
        let model = Trainer::new(config).fit(&toy_train()).unwrap();

        assert_eq!(Capability::DecisionScoring, model.capability());
        let predictor = Predictor::new(model).unwrap();
        let p = predictor.predict("peanut butter").unwrap();
        assert!(p.scores.unwrap().values().iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_train_round_trip_scores() {
        let model = Trainer::new(TrainerConfig::default())
            .fit(&toy_train())
            .unwrap();
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        let loaded = Model::read(&mut buf.as_slice()).unwrap();

        let before = Predictor::new(model).unwrap();
        let after = Predictor::new(loaded).unwrap();
        for text in ["peanut butter", "milk", "rice and beans", "unknown words", ""] {
            assert_eq!(before.predict(text).unwrap(), after.predict(text).unwrap());
        }
    }

    #[test]
    fn test_train_empty_vocabulary() {
        let mut ds = Dataset::new();
        push(&mut ds, "apple", &[]);
        push(&mut ds, "banana", &["milk"]);
        push(&mut ds, "cherry", &[]);
        let err = Trainer::new(TrainerConfig::default()).fit(&ds).err().unwrap();

        assert!(matches!(err, AllergenError::Vocabulary(_)));
    }
}

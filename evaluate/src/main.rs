use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use allergen::{
    Dataset, EvaluationReport, Model, ModelLocator, Predictor, DEFAULT_THRESHOLD, N_LABELS,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "A program to evaluate the accuracy of allergen models.")]
struct Args {
    /// The model file to use. Falls back to $ALLERGEN_MODEL and the default model path.
    #[arg(long)]
    model: Option<PathBuf>,

    /// A labeled corpus (CSV with a `text` column and one column per allergen)
    #[arg(long)]
    data: PathBuf,

    /// Scores at or above this value mark the allergen as present
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Evaluate the classifiers' own decisions (margin > 0) instead of thresholded scores
    #[arg(long)]
    hard: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let path = ModelLocator::new().explicit(args.model.as_ref()).resolve()?;
    log::info!("Loading model file {} ...", path.display());
    let mut f = zstd::Decoder::new(File::open(&path)?)?;
    let model = Model::read(&mut f)?;
    let predictor = Predictor::new(model)?.threshold(args.threshold);

    log::info!("Loading {:?} ...", args.data);
    let dataset = Dataset::from_csv_reader(BufReader::new(File::open(&args.data)?))?;

    log::info!("Start evaluation ({} tier)", predictor.capability());
    let mut predictions: Vec<[bool; N_LABELS]> = Vec::with_capacity(dataset.len());
    for text in dataset.texts() {
        let labels = if args.hard {
            predictor.predict_labels(text)?
        } else {
            let p = predictor.predict(text)?;
            let mut labels = [false; N_LABELS];
            for (l, &v) in labels.iter_mut().zip(p.labels.values()) {
                *l = v == 1;
            }
            labels
        };
        predictions.push(labels);
    }
    let report = EvaluationReport::new(dataset.labels(), &predictions);

    if args.json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{report}");
    }
    if report.macro_f1 == 0.0 {
        log::warn!("no allergen was detected correctly in {} documents", dataset.len());
    }

    Ok(())
}

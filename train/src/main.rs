use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use allergen::{Dataset, SolverType, Trainer, TrainerConfig, VectorizerConfig};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "A program to train allergen models.")]
struct Args {
    /// A labeled training corpus (CSV with a `text` column and one column per allergen)
    #[arg(long)]
    train: PathBuf,

    /// A labeled validation corpus in the same format
    #[arg(long)]
    val: PathBuf,

    /// The file to write the trained model to
    #[arg(long)]
    model: PathBuf,

    /// The shortest word n-gram
    #[arg(long, default_value = "1")]
    ngram_min: u8,

    /// The longest word n-gram
    #[arg(long, default_value = "2")]
    ngram_max: u8,

    /// Terms found in fewer documents than this value are dropped
    #[arg(long, default_value = "2")]
    min_df: usize,

    /// Terms found in a larger fraction of documents than this value are dropped
    #[arg(long, default_value = "0.95")]
    max_df: f64,

    /// Tokens shorter than this value are ignored, where the length is in characters
    #[arg(long, default_value = "2")]
    min_token_len: usize,

    /// The epsilon stopping criterion for classifier training
    #[arg(long, default_value = "0.0001")]
    eps: f64,

    /// The cost hyperparameter for classifier training
    #[arg(long, default_value = "1.0")]
    cost: f64,

    /// The solver. {0, 1, 2, 3, 5, 6, 7} (see LIBLINEAR documentation for more details)
    #[arg(long, default_value = "0")]
    solver: SolverType,

    /// Print the validation report as JSON
    #[arg(long)]
    report_json: bool,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    log::info!("Loading {:?} ...", args.train);
    let train = Dataset::from_csv_reader(BufReader::new(File::open(&args.train)?))?;
    log::info!("Loading {:?} ...", args.val);
    let val = Dataset::from_csv_reader(BufReader::new(File::open(&args.val)?))?;

    let config = TrainerConfig {
        vectorizer: VectorizerConfig {
            ngram_range: (args.ngram_min, args.ngram_max),
            min_df: args.min_df,
            max_df: args.max_df,
            min_token_len: args.min_token_len,
        },
        solver: args.solver,
        eps: args.eps,
        cost: args.cost,
    };

    log::info!("Start training...");
    let (model, report) = Trainer::new(config).train(&train, &val)?;
    log::info!("Finish training.");

    if args.report_json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{report}");
    }

    let mut f = zstd::Encoder::new(File::create(args.model)?, 19)?;
    f.multithread(args.zstd_workers)?;
    model.write(&mut f)?;
    f.finish()?;

    Ok(())
}

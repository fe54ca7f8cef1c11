use std::fs;
use std::path::PathBuf;

use allergen::{Capability, Model};
use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(about = "A program to manipulate trained models.")]
struct Args {
    /// Input path of the model file
    #[arg(long)]
    model_in: PathBuf,

    /// Output path of the model file
    #[arg(long)]
    model_out: Option<PathBuf>,

    /// Output the vocabulary contained in the model.
    #[arg(long)]
    dump_vocab: Option<PathBuf>,

    /// Output the classifier weights contained in the model.
    #[arg(long)]
    dump_weights: Option<PathBuf>,

    /// Lower the capability tier of the model: {probability, decision, hard}.
    #[arg(long)]
    capability: Option<Capability>,
}

#[derive(Serialize)]
struct TermRecord<'a> {
    index: usize,
    term: &'a str,
    idf: f64,
}

#[derive(Serialize)]
struct WeightRecord<'a> {
    label: &'a str,
    term: &'a str,
    weight: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    log::info!("Loading model file...");
    let mut f = zstd::Decoder::new(fs::File::open(args.model_in)?)?;
    let mut model = Model::read(&mut f)?;
    log::info!(
        "{} terms, {} tier",
        model.vocabulary().len(),
        model.capability()
    );

    if let Some(path) = args.dump_vocab {
        log::info!("Saving vocabulary file...");
        let file = fs::File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        let vocab = model.vocabulary();
        for (index, (term, &idf)) in vocab.terms().iter().zip(vocab.idf()).enumerate() {
            wtr.serialize(TermRecord { index, term, idf })?;
        }
        wtr.flush()?;
    }

    if let Some(path) = args.dump_weights {
        log::info!("Saving weight file...");
        let file = fs::File::create(path)?;
        let mut wtr = csv::Writer::from_writer(file);
        let terms = model.vocabulary().terms();
        for (label, c) in model.labels().iter().zip(model.classifier().classifiers()) {
            wtr.serialize(WeightRecord {
                label,
                term: "",
                weight: c.bias(),
            })?;
            for (term, &weight) in terms.iter().zip(c.weights()) {
                if weight != 0.0 {
                    wtr.serialize(WeightRecord {
                        label,
                        term,
                        weight,
                    })?;
                }
            }
        }
        wtr.flush()?;
    }

    if let Some(capability) = args.capability {
        log::info!("Changing capability to {capability}...");
        model.downgrade(capability)?;
    }

    if let Some(path) = args.model_out {
        log::info!("Saving model file...");
        let mut f = zstd::Encoder::new(fs::File::create(path)?, 19)?;
        model.write(&mut f)?;
        f.finish()?;
    }

    Ok(())
}

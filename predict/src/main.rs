use std::fs::File;
use std::io::{self, prelude::*, stdin, stdout, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use allergen::{
    AllergenError, ErrorResponse, Model, ModelLocator, PredictRequest, Predictor,
    DEFAULT_THRESHOLD,
};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "A program to detect allergens. Reads one document per line and writes one JSON \
             response per line."
)]
struct Args {
    /// The model file to use. Falls back to $ALLERGEN_MODEL, then to the default model path in
    /// the working directory and next to the executable.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Scores at or above this value mark the allergen as present
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Each input line is a JSON object `{"text": ...}` instead of raw text
    #[arg(long)]
    json: bool,
}

fn load_model(args: &Args) -> Result<Model, AllergenError> {
    let path = ModelLocator::new().explicit(args.model.as_ref()).resolve()?;
    log::info!("Loading model file {} ...", path.display());
    let load = || -> Result<Model, AllergenError> {
        let mut f = zstd::Decoder::new(File::open(&path)?)?;
        Model::read(&mut f)
    };
    load().map_err(|e| match e {
        AllergenError::ArtifactLoad(_) => e,
        e => AllergenError::artifact_load(&path, e.to_string()),
    })
}

fn respond(predictor: &Predictor, line: &str, json: bool) -> Result<String, ErrorResponse> {
    let prediction = if json {
        let request: PredictRequest = serde_json::from_str(line)?;
        predictor.predict_document(request.document())?
    } else {
        predictor.predict(line)?
    };
    Ok(serde_json::to_string(&prediction)?)
}

/// Answers every line of `rdr` with one JSON line. Lines are decoded lossily, so no input ends
/// the loop early.
fn serve<R, W>(predictor: &Predictor, rdr: R, wtr: &mut W, json: bool) -> io::Result<usize>
where
    R: BufRead,
    W: Write,
{
    let mut n_docs = 0;
    for line in rdr.split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        let line = String::from_utf8_lossy(&line);
        let response = match respond(predictor, &line, json) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("{}", e.error);
                serde_json::to_string(&e)?
            }
        };
        writeln!(wtr, "{response}")?;
        n_docs += 1;
    }
    Ok(n_docs)
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let model = match load_model(&args) {
        Ok(model) => model,
        Err(e) => {
            log::error!("{e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let predictor = Predictor::new(model)?.threshold(args.threshold);

    log::info!("Start prediction");
    let mut out = BufWriter::new(stdout().lock());
    let start = Instant::now();
    let n_docs = serve(&predictor, stdin().lock(), &mut out, args.json)?;
    out.flush()?;
    let duration = start.elapsed();
    log::info!("Elapsed: {} [sec]", duration.as_secs_f64());
    log::info!("Speed: {} [docs/sec]", n_docs as f64 / duration.as_secs_f64());

    Ok(ExitCode::SUCCESS)
}

//! Classifies endoscopy images from the command line.
//!
//! ```text
//! cargo run --release --example classify -- \
//!     --model webdemo/assets/models/classifier.onnx \
//!     --labels webdemo/assets/labels.txt \
//!     --enhanced-dir out/ scan1.jpg scan2.png
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use gidc::{Clahe, Classifier, Labels, Options};
use tracing::{error, info};
use web_time::Instant;

#[derive(Parser)]
#[command(name = "classify")]
#[command(about = "Gastrointestinal disease classification of endoscopy images")]
struct Args {
    /// Path to the ONNX classifier
    #[arg(short, long)]
    model: PathBuf,

    /// Path to the labels file (`<index> <name>` per line)
    #[arg(short, long)]
    labels: PathBuf,

    /// Write the CLAHE-enhanced images into this directory
    #[arg(long)]
    enhanced_dir: Option<PathBuf>,

    /// CLAHE clip limit
    #[arg(long, default_value_t = 2.0)]
    clip_limit: f32,

    /// CLAHE tile grid size (same number of rows and columns)
    #[arg(long, default_value_t = 8)]
    tiles: u32,

    /// Image files to classify
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let clahe = Clahe::new(args.clip_limit, args.tiles, args.tiles)?;
    let labels = Labels::from_path(&args.labels)?;
    let classifier = Classifier::from_path(&args.model, Options::default())?;
    info!("loaded model with {} classes", labels.len());

    if let Some(dir) = &args.enhanced_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }

    for path in &args.images {
        if let Err(e) = run_one(path, &clahe, &classifier, &labels, args.enhanced_dir.as_deref()) {
            error!("{}: {e:#}", path.display());
        }
    }
    Ok(())
}

fn run_one(
    path: &Path,
    clahe: &Clahe,
    classifier: &Classifier,
    labels: &Labels,
    enhanced_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(path)?;
    let file_name = path.to_string_lossy();
    let img = gidc::decode_upload(&file_name, &bytes)?;

    let clock = Instant::now();
    let enhanced = clahe.apply_rgb(&img)?;
    info!("CLAHE took {:?}", clock.elapsed());

    if let Some(dir) = enhanced_dir {
        let name = path.file_name().context("image path has no file name")?;
        let out = dir.join(name).with_extension("png");
        enhanced.save(&out).with_context(|| format!("save {}", out.display()))?;
    }

    let clock = Instant::now();
    let prediction = classifier.classify(&enhanced, labels)?;
    info!("prediction took {:?}", clock.elapsed());
    info!(
        "{}: {} (score: {}%)",
        path.display(),
        prediction.label,
        prediction.confidence()
    );
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

//! wdsvm Command Line Interface
//!
//! Classifies examples with saved weighted-degree RBF models, inspects model
//! files and evaluates the kernel directly.

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use wdsvm::core::{Result, SVMError};
use wdsvm::{
    CSVDataset, Kernel, Prediction, SerializableModel, SupportVectorModel,
    WeightedDegreeRBFKernel, SVM,
};

#[derive(Parser)]
#[command(name = "wdsvm")]
#[command(about = "Support vector machine inference with a weighted-degree RBF kernel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify examples with a saved model
    Classify(ClassifyArgs),
    /// Evaluate a saved model on labelled examples
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
    /// Compute the kernel value between two feature rows
    Kernel(KernelArgs),
    /// Assemble a model file from explicit coefficients
    Create(CreateArgs),
}

#[derive(Args)]
struct ModelInputs {
    /// Saved model file
    #[arg(short, long)]
    model: PathBuf,

    /// Training features the support vector indices refer to (CSV)
    #[arg(long)]
    train: PathBuf,

    /// Examples to classify (CSV)
    #[arg(long)]
    data: PathBuf,

    /// Classify sequentially instead of in parallel blocks
    #[arg(long)]
    sequential: bool,

    /// Precompute the support vector x example kernel block first
    #[arg(long)]
    precompute: bool,
}

#[derive(Args)]
struct ClassifyArgs {
    #[command(flatten)]
    inputs: ModelInputs,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Decision threshold separating the two labels
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    threshold: f64,

    /// Also print raw decision values
    #[arg(long)]
    scores: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    #[command(flatten)]
    inputs: ModelInputs,

    /// Show detailed metrics
    #[arg(long)]
    detailed: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

#[derive(Args)]
struct KernelArgs {
    /// Feature file (CSV)
    #[arg(long)]
    data: PathBuf,

    /// Gaussian bandwidth
    #[arg(short, long, default_value = "1.0")]
    width: f64,

    /// Number of nested window sizes
    #[arg(long, default_value = "1")]
    degree: usize,

    /// Values per property block
    #[arg(long, default_value = "1")]
    nof_properties: usize,

    /// First row index
    #[arg(long, default_value = "0")]
    row_a: usize,

    /// Second row index
    #[arg(long, default_value = "0")]
    row_b: usize,
}

#[derive(Args)]
struct CreateArgs {
    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Gaussian bandwidth
    #[arg(short, long, default_value = "1.0")]
    width: f64,

    /// Number of nested window sizes
    #[arg(long, default_value = "1")]
    degree: usize,

    /// Values per property block
    #[arg(long, default_value = "1")]
    nof_properties: usize,

    /// Bias term
    #[arg(short, long, default_value = "0.0", allow_hyphen_values = true)]
    bias: f64,

    /// Support vector as INDEX:ALPHA (repeatable)
    #[arg(long = "sv", value_parser = parse_support_vector, allow_hyphen_values = true)]
    support_vectors: Vec<(usize, f64)>,
}

fn parse_support_vector(s: &str) -> std::result::Result<(usize, f64), String> {
    let (index, alpha) = s
        .split_once(':')
        .ok_or_else(|| format!("expected INDEX:ALPHA, got '{s}'"))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid support vector index '{index}'"))?;
    let alpha = alpha
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid alpha '{alpha}'"))?;
    Ok((index, alpha))
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Classify(args) => classify_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
        Commands::Kernel(args) => kernel_command(args),
        Commands::Create(args) => create_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

/// Load the model and attach training features and examples
fn load_machine(inputs: &ModelInputs, labelled: bool) -> Result<(SVM, Option<Vec<f64>>)> {
    info!("Loading model from: {:?}", inputs.model);
    let mut svm: SVM = SVM::from_file(&inputs.model)?;

    info!("Loading training features from: {:?}", inputs.train);
    let train = CSVDataset::from_file(&inputs.train, false)?;
    info!("Loading examples from: {:?}", inputs.data);
    let (examples, labels) = CSVDataset::from_file(&inputs.data, labelled)?.into_parts();
    info!(
        "{} training rows, {} examples of width {}",
        train.len(),
        examples.len(),
        examples.dim()
    );

    svm.set_features(Arc::new(train.into_parts().0), Arc::new(examples))?;
    if inputs.sequential {
        svm.set_batch_computation_enabled(false);
    }
    if inputs.precompute {
        svm.set_precomputed_subkernels_enabled(true);
    }
    svm.init_kernel_optimization()?;

    info!(
        "Classifying with {} support vectors",
        svm.num_support_vectors()
    );
    Ok((svm, labels))
}

fn classify_command(args: ClassifyArgs) -> Result<()> {
    let (svm, _) = load_machine(&args.inputs, false)?;
    let predictions = svm.classify_with_threshold(None, args.threshold)?;

    if let Some(output_path) = &args.output {
        let file = File::create(output_path).map_err(SVMError::IoError)?;
        let mut writer = BufWriter::new(file);
        write_predictions(&mut writer, &predictions, args.scores)?;
        writer.flush().map_err(SVMError::IoError)?;
        info!("Predictions saved to: {output_path:?}");
    } else {
        let stdout = std::io::stdout();
        write_predictions(&mut stdout.lock(), &predictions, args.scores)?;
    }

    Ok(())
}

fn write_predictions<W: Write>(writer: &mut W, predictions: &[Prediction], scores: bool) -> Result<()> {
    writeln!(writer, "# Predictions for {} samples", predictions.len())?;
    writeln!(
        writer,
        "# Format: sample_index predicted_label{}",
        if scores { " decision_value" } else { "" }
    )?;
    for (i, pred) in predictions.iter().enumerate() {
        if scores {
            writeln!(writer, "{} {:.0} {:.6}", i, pred.label, pred.decision_value)?;
        } else {
            writeln!(writer, "{} {:.0}", i, pred.label)?;
        }
    }
    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    let (svm, labels) = load_machine(&args.inputs, true)?;
    let labels = labels.ok_or(SVMError::EmptyDataset)?;
    let metrics = svm.evaluate(None, &labels)?;

    println!("Accuracy: {:.2}%", metrics.accuracy() * 100.0);
    if args.detailed {
        println!("Precision: {:.4}", metrics.precision());
        println!("Recall: {:.4}", metrics.recall());
        println!("F1 Score: {:.4}", metrics.f1_score());
        println!("Specificity: {:.4}", metrics.specificity());
        println!(
            "Confusion: TP={} TN={} FP={} FN={}",
            metrics.true_positives,
            metrics.true_negatives,
            metrics.false_positives,
            metrics.false_negatives
        );
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    let model = SerializableModel::load_from_file(&args.model)?;
    model.print_summary();
    Ok(())
}

fn kernel_command(args: KernelArgs) -> Result<()> {
    let kernel = WeightedDegreeRBFKernel::new(args.width, args.degree, args.nof_properties)?;
    let dataset = CSVDataset::from_file(&args.data, false)?;
    let features = dataset.features();

    for row in [args.row_a, args.row_b] {
        if row >= features.len() {
            return Err(SVMError::IndexOutOfBounds {
                index: row,
                len: features.len(),
            });
        }
    }
    kernel.check_dim(features.dim())?;

    let value = kernel.compute(features.row(args.row_a), features.row(args.row_b));
    println!("{value:.12}");
    Ok(())
}

fn create_command(args: CreateArgs) -> Result<()> {
    let kernel = WeightedDegreeRBFKernel::new(args.width, args.degree, args.nof_properties)?;
    let (svs, alphas): (Vec<usize>, Vec<f64>) = args.support_vectors.iter().copied().unzip();

    let mut svm = SVM::new(kernel);
    svm.set_model(SupportVectorModel::from_parts(args.bias, alphas, svs)?);
    svm.save_to_file(&args.output)?;

    info!("Model saved to: {:?}", args.output);
    Ok(())
}

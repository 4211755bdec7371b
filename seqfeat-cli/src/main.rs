use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use seqfeat::config::{ConversionConfig, OrderConfig, SplitConfig};
use seqfeat::converter::{self, SplitSummary};
use seqfeat::extractor::TemplateSet;
use seqfeat::get_version;
use seqfeat::history::OrderPreset;
use seqfeat::window::DEFAULT_FILLER_LENGTH;

#[derive(Debug, Args)]
#[clap(
    author,
    about = "Convert every split listed in a JSON configuration",
    version = get_version(),
)]
struct ConvertArgs {
    config_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Convert a single corpus file",
    version = get_version(),
)]
struct ExtractArgs {
    /// Write the feature history table to this file
    #[arg(short, long)]
    features: Option<PathBuf>,

    /// Stop after this many sentences (0 converts all)
    #[arg(short = 'n', long, default_value = "0")]
    max_sentences: usize,

    #[arg(short, long, value_enum, default_value = "standard")]
    templates: Templates,

    #[arg(short, long, value_enum, default_value = "standard")]
    orders: Orders,

    #[arg(long, default_value_t = DEFAULT_FILLER_LENGTH)]
    filler_length: usize,

    corpus_file: PathBuf,
    output_file: PathBuf,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Templates {
    Standard,
    WithSecondPrevious,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Orders {
    Standard,
    Alternate,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Convert(ConvertArgs),
    Extract(ExtractArgs),
}

#[derive(Debug, Parser)]
#[clap(
    name = "seqfeat",
    author,
    about = "A feature conversion command line interface for sequence taggers",
    version = get_version(),
)]
struct CommandArgs {
    #[clap(subcommand)]
    command: Commands,
}

impl ExtractArgs {
    fn into_config(self) -> ConversionConfig {
        let split = SplitConfig {
            name: self
                .corpus_file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "corpus".to_string()),
            input: self.corpus_file,
            output: self.output_file,
            features: self.features,
            max_sentences: Some(self.max_sentences),
        };

        let mut config = ConversionConfig::new(vec![split]);
        config.filler_length = self.filler_length;
        config.templates = match self.templates {
            Templates::Standard => TemplateSet::Standard,
            Templates::WithSecondPrevious => TemplateSet::WithSecondPrevious,
        };
        config.orders = OrderConfig::Preset(match self.orders {
            Orders::Standard => OrderPreset::Standard,
            Orders::Alternate => OrderPreset::Alternate,
        });
        config
    }
}

fn running_flag() -> Result<Arc<AtomicBool>, Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        if r.load(Ordering::SeqCst) {
            r.store(false, Ordering::SeqCst);
        } else {
            std::process::exit(130);
        }
    })?;

    Ok(running)
}

fn report(summaries: &[SplitSummary]) {
    for summary in summaries {
        match summary.table_entries {
            Some(entries) => println!(
                "{}: {} sentences, {} rows, {} history entries",
                summary.name, summary.sentences, summary.rows, entries
            ),
            None => println!(
                "{}: {} sentences, {} rows",
                summary.name, summary.sentences, summary.rows
            ),
        }
    }
}

fn convert(args: ConvertArgs) -> Result<(), Box<dyn Error>> {
    let config = ConversionConfig::from_path(args.config_file.as_path())?;
    let running = running_flag()?;

    let summaries = converter::run(&config, &running)?;

    report(&summaries);
    println!("Conversion completed successfully.");
    Ok(())
}

fn extract(args: ExtractArgs) -> Result<(), Box<dyn Error>> {
    let config = args.into_config();
    let running = running_flag()?;

    let summaries = converter::run(&config, &running)?;

    report(&summaries);
    println!("Feature extraction completed successfully.");
    Ok(())
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = CommandArgs::parse();

    match args.command {
        Commands::Convert(args) => convert(args),
        Commands::Extract(args) => extract(args),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("seqfeat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

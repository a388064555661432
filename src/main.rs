//! Command-line front end for the prospect splitter.

use clap::{Parser, ValueEnum};
use log::info;
use prospect_splitter::{process_file, splitter_config_schema, SplitterConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Text,
    Markdown,
    Json,
    Csv,
}

/// Classify a daily prospect CSV by job title and split it evenly across accounts
#[derive(Parser, Debug)]
#[command(name = "prospect-splitter")]
#[command(about = "Splits a daily prospect CSV into per-category, per-account files")]
struct Args {
    /// Prospect CSV to split
    #[arg(required_unless_present = "print_config_schema")]
    input: Option<PathBuf>,

    /// Directory for the generated files
    #[arg(long, short, default_value = ".")]
    output: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Shuffle seed for a reproducible split
    #[arg(long)]
    seed: Option<u64>,

    /// Header name of the job title column
    #[arg(long)]
    title_field: Option<String>,

    /// Prefix for generated file names (defaults to the input file stem)
    #[arg(long)]
    base_name: Option<String>,

    /// Account name; repeat to replace the configured accounts
    #[arg(long = "bucket")]
    buckets: Vec<String>,

    /// Also write a zip archive of all generated files
    #[arg(long)]
    archive: bool,

    /// How to print the summary
    #[arg(long, value_enum, default_value = "text")]
    summary_format: SummaryFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the JSON Schema of the configuration file and exit
    #[arg(long)]
    print_config_schema: bool,
}

fn build_config(args: &Args) -> prospect_splitter::Result<SplitterConfig> {
    let mut config = match &args.config {
        Some(path) => SplitterConfig::from_path(path)?,
        None => SplitterConfig::default(),
    };

    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(title_field) = &args.title_field {
        config.title_field = title_field.clone();
    }
    if args.base_name.is_some() {
        config.base_name = args.base_name.clone();
    }
    if !args.buckets.is_empty() {
        config.buckets = args.buckets.clone();
    }

    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> prospect_splitter::Result<()> {
    if args.print_config_schema {
        println!("{}", splitter_config_schema()?);
        return Ok(());
    }

    let config = build_config(args)?;
    let Some(input) = &args.input else {
        return Ok(());
    };

    let result = process_file(input, &config)?;
    let written = result.write_outputs(&args.output, args.archive)?;
    info!("Generated {} files", written.len());

    let summary = result.summary();
    let rendered = match args.summary_format {
        SummaryFormat::Text => summary.to_text(),
        SummaryFormat::Markdown => summary.to_markdown(),
        SummaryFormat::Json => summary.to_json()?,
        SummaryFormat::Csv => summary.to_csv()?,
    };
    println!("{}", rendered);

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

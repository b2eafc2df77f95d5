//! BLF Converter CLI Application
//!
//! Command-line front end for the blf-decoder library:
//! - `convert`: write the records of a BLF file as CSV or JSON lines
//! - `info`: print the file header and per object-type counts

use anyhow::{Context, Result};
use blf_decoder::Decoder;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod config;
mod convert;
mod output;
mod report;

use config::AppConfig;
use convert::{ConvertError, ConvertOptions};
use output::OutputFormat;

/// BLF Converter - Decode Vector BLF CAN logs
#[derive(Parser, Debug)]
#[command(name = "blf-cli")]
#[command(about = "Convert BLF (Binary Logging Format) files to CSV", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a BLF file to CSV or JSON lines
    Convert {
        /// Path to input BLF file
        input: PathBuf,

        /// Path to output file (default: input with .csv extension)
        output: Option<PathBuf>,

        /// Include error frames in the output
        #[arg(long)]
        include_errors: bool,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Path to configuration file (TOML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Show the file header and object statistics of a BLF file
    Info {
        /// Path to input BLF file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::debug!("BLF Converter CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using decoder library v{}", blf_decoder::VERSION);

    match args.command {
        Command::Convert {
            input,
            output,
            include_errors,
            format,
            config,
        } => {
            let app_config = match config {
                Some(path) => {
                    log::info!("Loading configuration from: {:?}", path);
                    config::load_config(&path)?
                }
                None => AppConfig::default(),
            };
            let options = ConvertOptions {
                include_errors: include_errors || app_config.output.include_errors,
                format: format.unwrap_or(app_config.output.format),
                progress_interval: app_config.output.progress_interval,
            };
            let output = output.unwrap_or_else(|| convert::default_output_path(&input, options.format));
            run_convert(&input, &output, app_config, &options, args.quiet)
        }
        Command::Info { input } => run_info(&input),
    }
}

fn run_convert(
    input: &Path,
    output: &Path,
    app_config: AppConfig,
    options: &ConvertOptions,
    quiet: bool,
) -> Result<()> {
    if !quiet {
        report::print_conversion_start(input, output, options.include_errors);
    }

    let decoder = Decoder::with_config(app_config.decoder);
    match convert::convert(input, output, &decoder, options) {
        Ok(summary) => {
            if !quiet {
                report::print_summary(&summary);
            }
            Ok(())
        }
        Err(ConvertError::Decode { source, summary }) => {
            report::print_partial_summary(&summary);
            let kind = source.kind();
            Err(source).with_context(|| format!("Decoding {:?} failed ({})", input, kind))
        }
        Err(e) => Err(e.into()),
    }
}

fn run_info(input: &Path) -> Result<()> {
    let mut records = Decoder::new()
        .decode_file(input)
        .with_context(|| format!("Failed to open {:?}", input))?;

    let mut failure = None;
    for record in records.by_ref() {
        if let Err(e) = record {
            failure = Some(e);
            break;
        }
    }

    report::print_file_info(input, records.file_header(), records.stats());

    match failure {
        Some(e) => Err(e).with_context(|| format!("Decoding {:?} stopped early", input)),
        None => Ok(()),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

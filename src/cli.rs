use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load delimited files into SQLite and integrate title catalogs",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create one table per input file with an inferred schema and load its rows
    Load(LoadArgs),
    /// Match the source catalogs against the rating catalog into the integrated table
    Integrate(IntegrateArgs),
    /// Print the schema and CREATE TABLE statement inferred for a file
    Infer(InferArgs),
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// SQLite database file (overrides the configuration)
    #[arg(long)]
    pub database: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub store: StoreArgs,
    /// Input files to load, replacing the configured list
    #[arg(short = 'i', long = "input", action = clap::ArgAction::Append)]
    pub inputs: Vec<String>,
    /// Directory the input files are resolved against
    #[arg(long = "input-dir")]
    pub input_dir: Option<PathBuf>,
    /// Strings at least this long are stored as TEXT
    #[arg(long = "text-threshold")]
    pub text_threshold: Option<usize>,
    /// Delimiter override (supports ',', 'tab', ';', '|'); chosen by extension otherwise
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Skip files whose table already exists instead of failing
    #[arg(long = "skip-existing")]
    pub skip_existing: bool,
}

#[derive(Debug, Args)]
pub struct IntegrateArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Args)]
pub struct InferArgs {
    /// File to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML configuration file supplying null markers and the text threshold
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Write the inferred schema as YAML to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Key column (defaults to the first column)
    #[arg(long = "key")]
    pub key: Option<String>,
    /// Strings at least this long are stored as TEXT
    #[arg(long = "text-threshold")]
    pub text_threshold: Option<usize>,
    /// Delimiter override (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

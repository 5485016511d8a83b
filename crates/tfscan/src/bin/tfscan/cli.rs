//! tfscan cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; tfscan ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan terraform configuration against a rule set
    ///
    /// Exits with status 1 when violations are found.
    Scan(ScanCommand),

    /// Print the normalized configuration the rule engine would receive
    Extract(ExtractCommand),
}

#[derive(Parser, Debug)]
pub struct ScanCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Rule engine program
    ///
    /// Receives the normalized configuration as JSON on stdin and must print
    /// `{ "violations": [...], "warnings": [...], "passed": [...] }` to stdout.
    #[clap(short = 'e', long = "engine")]
    pub engine: String,

    /// Argument passed to the rule engine program
    ///
    /// Can be specified multiple times, e.g.
    /// --engine opa --engine-arg eval --engine-arg=--stdin-input ...
    #[clap(long = "engine-arg", allow_hyphen_values(true))]
    pub engine_args: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct ExtractCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// File or directory to scan, several paths are read as a list of files
    #[clap(required(true))]
    pub paths: Vec<PathBuf>,

    /// File name suffix picked up in directories
    #[clap(long = "suffix", default_value = ".tf")]
    pub suffix: String,

    /// Directory name that is skipped in directories
    #[clap(long = "cache-dir", default_value = ".terraform")]
    pub cache_dir: String,

    /// Additional nested block kind to extract
    ///
    /// Followed directly below a resource and one level further down.
    #[clap(long = "follow")]
    pub follow: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

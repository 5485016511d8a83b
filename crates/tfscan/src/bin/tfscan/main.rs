mod cli;

use serde::Serialize;
use tfscan::document::Aggregator;
use tfscan::extract::{Extractor, NestingTable, MAX_DEPTH};
use tfscan::rules::CommandRuleEngine;
use tfscan::scan::Scanner;
use tfscan::sources::{SourceOptions, Sources};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TFSCAN_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Scan(scan_cli) => scan(scan_cli),
        cli::Command::Extract(extract_cli) => extract(extract_cli),
    };

    match command_result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            for error in e.chain() {
                eprintln!("{error}")
            }
            std::process::exit(1);
        }
    }
}

/// Returns `false` when violations were found
pub fn scan(cli: cli::ScanCommand) -> anyhow::Result<bool> {
    let engine = CommandRuleEngine::new(cli.engine, cli.engine_args);
    let scanner = Scanner::new(engine)
        .with_aggregator(aggregator(&cli.input))
        .with_source_options(source_options(&cli.input));

    let result = match cli.input.paths.as_slice() {
        [path] => scanner.scan_path(path)?,
        paths => scanner.scan_files(paths)?,
    };

    output(&cli.output, &result)?;
    Ok(!result.has_violations())
}

pub fn extract(cli: cli::ExtractCommand) -> anyhow::Result<bool> {
    let sources = load(&cli.input)?;
    let document = aggregator(&cli.input).parse(&sources.concatenated())?;

    output(&cli.output, &document)?;
    Ok(true)
}

fn load(input: &cli::InputArgs) -> anyhow::Result<Sources> {
    let sources = match input.paths.as_slice() {
        [path] => Sources::from_path(path, &source_options(input))?,
        paths => Sources::from_files(paths)?,
    };

    Ok(sources)
}

fn source_options(input: &cli::InputArgs) -> SourceOptions {
    SourceOptions {
        suffix: input.suffix.clone(),
        cache_dir: input.cache_dir.clone(),
    }
}

fn aggregator(input: &cli::InputArgs) -> Aggregator {
    let nesting = input
        .follow
        .iter()
        .fold(NestingTable::default(), |table, kind| {
            table.follow(kind.as_str(), 1..=MAX_DEPTH)
        });

    Aggregator::new(Extractor::new(nesting))
}

fn output(output: &cli::OutputArgs, value: &impl Serialize) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), value)?;
            println!();
        }
    };

    Ok(())
}

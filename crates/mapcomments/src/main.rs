//! mapcomments - Generate a Go map from doc comments of exported types and fields

use eyre::{Result, WrapErr};
use mapcomments::{Args, GenerateOptions, Output};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args: Args = figue::from_std_args()
        .into_result()
        .map(|output| output.get())
        .wrap_err("Failed to parse command line arguments")?;

    init_logging(args.verbose);

    let options = GenerateOptions::try_from(args)?;

    eprintln!(
        "{} Harvesting {} package(s)...",
        "->".blue().bold(),
        options.packages.len()
    );
    for package in &options.packages {
        eprintln!("   {}", package.cyan());
    }

    let report = mapcomments::generate(&options).wrap_err("Failed to generate comment map")?;

    if let Output::File(path) = &report.output {
        eprintln!(
            "{} Wrote {} comments to {}",
            "OK".green().bold(),
            report.entries.to_string().green(),
            path.display()
        );
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default: warn, or debug with `-v`)
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

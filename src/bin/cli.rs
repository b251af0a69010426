//! restscan CLI - list the REST routes a CMS source tree registers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use restscan::{detect, extract_routes, output, Config, Dialect};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "restscan")]
#[command(about = "Static REST route discovery for WordPress, Drupal and Joomla sources", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract routes and write them as JSON
    Extract {
        /// Root directories to scan
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip detection and use this dialect (wordpress, drupal, joomla)
        #[arg(long)]
        dialect: Option<Dialect>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the dialect detected for the given directories
    Detect {
        /// Root directories to classify
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Logs go to stderr so stdout stays a clean JSON document.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Extract {
            dirs,
            output: destination,
            dialect,
            config,
        } => {
            let mut config = config.as_deref().map(Config::load).unwrap_or_default();
            if dialect.is_some() {
                config.analysis.dialect = dialect;
            }

            let report = extract_routes(&dirs, &config);

            match destination.or_else(|| config.output.path.clone()) {
                Some(path) => {
                    output::write_report(&path, &report)
                        .with_context(|| format!("writing report to {}", path.display()))?;
                    eprintln!(
                        "✓ {} routes ({} dialect) written to {}",
                        report.routes.len(),
                        report.dialect,
                        path.display()
                    );
                }
                None => {
                    let json = output::render_report(&report).context("rendering report")?;
                    print!("{}", json);
                }
            }
        }

        Commands::Detect { dirs } => {
            println!("{}", detect(&dirs));
        }
    }

    Ok(())
}

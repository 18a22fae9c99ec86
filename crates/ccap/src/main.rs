//! ccap - builds, previews and publishes the CarrierCapture.jl documentation.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use ccap_site::{process_env, DocsConfig};

mod commands;

#[derive(Parser)]
#[command(name = "ccap")]
#[command(about = "CarrierCapture.jl documentation builder and configuration-coordinate tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to docs.toml config file
    #[arg(short, long, default_value = "docs.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter docs.toml and page sources next to the config path
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Build the documentation site
    Build {
        /// Output directory (defaults to config or "build")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write pages as dir/index.html
        #[arg(long, overrides_with = "no_pretty_urls")]
        pretty_urls: bool,

        /// Write pages as dir/page.html
        #[arg(long)]
        no_pretty_urls: bool,

        /// Fail on missing docstrings
        #[arg(long)]
        strict: bool,

        /// Skip minification
        #[arg(long)]
        no_minify: bool,
    },

    /// Publish a built site to the pages branch
    Deploy {
        /// Directory to publish (defaults to config or "build")
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Remote repository, without scheme
        #[arg(long)]
        repo: Option<String>,

        /// Deploy to the development folder outside CI
        #[arg(long)]
        force: bool,

        /// Log git commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Build the site, then deploy it
    Make {
        /// Deploy to the development folder outside CI
        #[arg(long)]
        force: bool,

        /// Log git commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Preview the built documentation
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Directory to serve (defaults to the build directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Start development server with live reload
    Dev {
        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },

    /// Mass-weighted displacement between two POSCAR structures
    DeltaQ {
        /// Initial structure
        #[arg(short, long, default_value = "./POSCAR_i")]
        initial: PathBuf,

        /// Final structure
        #[arg(short = 'f', long = "final", default_value = "./POSCAR_f")]
        final_: PathBuf,

        /// Intermediate structure to project onto the initial-final path
        #[arg(short = 'm', long)]
        intermediate: Option<PathBuf>,

        /// Report plain displacement instead of mass-weighted
        #[arg(long)]
        no_weight: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(&cli.config, force)?;
        }
        Commands::Build {
            output,
            pretty_urls,
            no_pretty_urls,
            strict,
            no_minify,
        } => {
            let config = DocsConfig::load(&cli.config, &process_env)?;
            let pretty = match (pretty_urls, no_pretty_urls) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let options = commands::build::BuildOptions {
                output,
                pretty_urls: pretty,
                strict,
                minify: if no_minify { Some(false) } else { None },
            };
            commands::build::run(config, options)?;
        }
        Commands::Deploy {
            dir,
            repo,
            force,
            dry_run,
        } => {
            let config = DocsConfig::load(&cli.config, &process_env)?;
            commands::deploy::run(&config, dir, repo, force, dry_run)?;
        }
        Commands::Make { force, dry_run } => {
            let config = DocsConfig::load(&cli.config, &process_env)?;
            commands::make::run(&config, force, dry_run)?;
        }
        Commands::Serve { port, dir } => {
            let config = DocsConfig::load(&cli.config, &process_env)?;
            commands::serve::run(port, dir.unwrap_or_else(|| config.build_dir())).await?;
        }
        Commands::Dev { port, no_open } => {
            let config = DocsConfig::load(&cli.config, &process_env)?;
            commands::dev::run(config, cli.config, port, !no_open).await?;
        }
        Commands::DeltaQ {
            initial,
            final_,
            intermediate,
            no_weight,
        } => {
            commands::delta_q::run(&initial, &final_, intermediate.as_deref(), !no_weight)?;
        }
    }

    Ok(())
}

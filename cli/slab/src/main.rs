//! slab CLI: fetch, resolve, and load remote packages from the command line.

mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Overrides;

#[derive(Parser)]
#[command(name = "slab", version, about = "Load remote packages at run time")]
struct Cli {
    /// Configuration file (default: nearest slab.toml above the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Package source (index, bucket)
    #[arg(long, global = true)]
    backend: Option<String>,
    /// Package index root
    #[arg(long, global = true)]
    index_url: Option<String>,
    /// Object store bucket
    #[arg(long, global = true)]
    bucket: Option<String>,
    /// Key prefix inside the bucket
    #[arg(long, global = true)]
    prefix: Option<String>,
    /// Interpreter tag artifacts must carry (e.g., cp311)
    #[arg(long, global = true)]
    interpreter: Option<String>,
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a package and its dependencies
    Load {
        /// Package name
        name: String,
        /// Version constraint (e.g., ">=1.2", "==2.0.0")
        #[arg(long)]
        version: Option<String>,
        /// Load this object key instead of searching the bucket
        #[arg(long, conflicts_with = "version")]
        key: Option<String>,
    },
    /// Print the dependency closure of a package without executing it
    Resolve {
        /// Package name
        name: String,
        /// Version constraint
        #[arg(long)]
        version: Option<String>,
    },
    /// Show the entries and metadata of a local wheel archive
    Inspect {
        /// Path to the archive
        archive: PathBuf,
    },
    /// Parse a dependency specifier
    Parse {
        /// Specifier, e.g. "requests (>=2.0)"
        specifier: String,
    },
    /// Show the platform and interpreter tags artifacts are matched against
    Platform,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Log to stderr so command output on stdout stays clean.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let overrides = Overrides {
        backend: cli.backend,
        index_url: cli.index_url,
        bucket: cli.bucket,
        prefix: cli.prefix,
        interpreter: cli.interpreter,
    };

    match cli.command {
        Commands::Inspect { archive } => commands::inspect::run(&archive),
        Commands::Parse { specifier } => commands::parse::run(&specifier),
        Commands::Platform => {
            let found = config::locate(&cwd, cli.config.as_deref())?;
            let loader = config::resolve(found.as_ref(), &overrides)?;
            commands::platform::run(&loader, found.as_ref())
        }
        Commands::Load { name, version, key } => {
            let found = config::locate(&cwd, cli.config.as_deref())?;
            let loader = config::resolve(found.as_ref(), &overrides)?;
            block_on(commands::load::run(
                &loader,
                &name,
                version.as_deref(),
                key.as_deref(),
            ))
        }
        Commands::Resolve { name, version } => {
            let found = config::locate(&cwd, cli.config.as_deref())?;
            let loader = config::resolve(found.as_ref(), &overrides)?;
            block_on(commands::resolve::run(&loader, &name, version.as_deref()))
        }
    }
}

fn block_on<F>(future: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = anyhow::Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

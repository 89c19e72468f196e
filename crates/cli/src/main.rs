mod commands;

use std::path::PathBuf;

use bash_compiler_core::CompileError;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Bash source-to-source compiler.
#[derive(Parser)]
#[command(
    name = "bash-compiler",
    version,
    about = "Bundle namespaced bash functions into a single standalone script"
)]
struct Cli {
    /// Output format for errors and reports (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the configured skeleton into a standalone script
    Compile {
        /// Path to the compiler configuration (TOML)
        config: PathBuf,
        /// Output file (defaults to the configured output, then stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show the file each function name resolves to
    Resolve {
        /// Path to the compiler configuration (TOML)
        config: PathBuf,
        /// Function names such as Log::info
        #[arg(required = true)]
        names: Vec<String>,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        tracing_subscriber::EnvFilter::new(default)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compile { config, out } => {
            commands::compile::cmd_compile(&config, out.as_deref(), cli.output, cli.quiet);
        }
        Commands::Resolve { config, names } => {
            commands::resolve::cmd_resolve(&config, &names, cli.output, cli.quiet);
        }
    }
}

pub(crate) fn report_error(err: &CompileError, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", err),
        OutputFormat::Json => eprintln!("{}", err.to_json_value()),
    }
}

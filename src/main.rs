/*!
 * bbcombine CLI
 */

use clap::{Parser, Subcommand, ValueEnum};
use bbcombine::{
    cli_style::{self, combine_summary_table},
    combine_files,
    config::{CombineConfig, LengthPolicy, LogLevel},
    error::{CombineError, Result, EXIT_SUCCESS},
    logging,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bbcombine")]
#[command(
    version,
    about = "Interleave two baseband capture files block by block",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// First input file (its blocks come first in each pair)
    #[arg(value_name = "FILE1")]
    file1: Option<PathBuf>,

    /// Second input file
    #[arg(value_name = "FILE2")]
    file2: Option<PathBuf>,

    /// Output file (created or truncated, twice the input size)
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Number of worker threads (0 = auto)
    #[arg(short = 't', long = "threads", alias = "workers")]
    threads: Option<usize>,

    /// Chunk size in KB
    #[arg(long)]
    chunk_size: Option<usize>,

    /// What to do when the inputs differ in size
    #[arg(long, value_enum)]
    length_policy: Option<LengthPolicyArg>,

    /// Keep the partially written output if the run fails
    #[arg(long)]
    keep_partial: bool,

    /// Hide progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the run statistics as a single JSON object
    #[arg(long)]
    json: bool,

    /// Path to config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Start from a preset instead of the defaults (fast, safe)
    #[arg(long, value_enum, conflicts_with = "config")]
    profile: Option<ProfileArg>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_enum)]
    log_level: Option<LogLevelArg>,

    /// Path to log file (default: stderr)
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Enable verbose logging (equivalent to --log-level=debug)
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file with the default settings
    InitConfig {
        /// Where to write the TOML file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    /// Every core, no progress bar
    Fast,
    /// One worker, inputs must match in size
    Safe,
}

impl From<ProfileArg> for CombineConfig {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Fast => CombineConfig::fast_preset(),
            ProfileArg::Safe => CombineConfig::safe_preset(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LengthPolicyArg {
    Reject,
    Truncate,
}

impl From<LengthPolicyArg> for LengthPolicy {
    fn from(arg: LengthPolicyArg) -> Self {
        match arg {
            LengthPolicyArg::Reject => LengthPolicy::Reject,
            LengthPolicyArg::Truncate => LengthPolicy::Truncate,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            cli_style::print_error(&e.to_string(), suggestion(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        return handle_subcommand(command);
    }

    let mut config = match (cli.config, cli.profile) {
        (Some(ref path), _) => CombineConfig::from_file(path)?,
        (None, Some(profile)) => profile.into(),
        (None, None) => CombineConfig::default(),
    };

    // Explicit flags override the config file
    if let Some(threads) = cli.threads {
        config.workers = threads;
    }
    if let Some(kb) = cli.chunk_size {
        config.chunk_size = kb
            .checked_mul(1024)
            .ok_or_else(|| CombineError::Config(format!("Chunk size too large: {} KB", kb)))?;
    }
    if let Some(policy) = cli.length_policy {
        config.length_policy = policy.into();
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log;
    }
    config.keep_partial |= cli.keep_partial;
    config.verbose |= cli.verbose;
    if cli.no_progress || cli.json {
        config.show_progress = false;
    }

    if let Err(e) = logging::init_logging(&config) {
        cli_style::print_warning(&format!("Failed to initialize logging: {}", e));
    }

    let file1 = cli
        .file1
        .ok_or_else(|| CombineError::Config("First input file required".to_string()))?;
    let file2 = cli
        .file2
        .ok_or_else(|| CombineError::Config("Second input file required".to_string()))?;
    let output = cli
        .output
        .ok_or_else(|| CombineError::Config("Output path required (-o)".to_string()))?;

    let stats = combine_files(&file1, &file2, &output, &config)?;

    if cli.json {
        let json = stats
            .to_json()
            .map_err(|e| CombineError::Config(format!("Failed to encode stats: {}", e)))?;
        println!("{}", json);
    } else {
        println!(
            "Total time taken: {:.2} seconds",
            stats.duration.as_secs_f64()
        );
        println!("{}", combine_summary_table(&stats));
        cli_style::print_success(&format!("Combined output written to {}", output.display()));
    }

    Ok(())
}

fn handle_subcommand(command: Commands) -> Result<()> {
    match command {
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(CombineError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            CombineConfig::default().to_file(&path)?;
            cli_style::print_success(&format!("Wrote default configuration to {}", path.display()));
            Ok(())
        }
    }
}

fn suggestion(err: &CombineError) -> Option<&'static str> {
    match err {
        CombineError::LengthMismatch { .. } => {
            Some("Use --length-policy truncate to combine only the common prefix")
        }
        CombineError::InvalidChunkSize => Some("Pass a positive --chunk-size in KB"),
        CombineError::SourceNotFound(_) => Some("Check the input paths"),
        _ => None,
    }
}

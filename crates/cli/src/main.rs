use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use re_parity::canonicalize_or_current;
use re_parity::commands::{
    cache_clear_command, check_command, find_command, init_command, list_backends_command,
    list_runs_command, CheckOptions, FindTarget, Workspace,
};

/// Static parity checks between reversed source and the original binary.
///
/// This CLI is a thin wrapper around `parity-core` (exposed in code as `parity_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "re-parity",
    version,
    about = "Source-vs-binary parity checks for reverse-engineering projects",
    long_about = None
)]
struct Cli {
    /// Config file path. Relative paths inside it resolve against its directory.
    #[arg(long, global = true, default_value = "re-parity.yaml")]
    config: String,

    /// Dotted config override such as `parity.call_count_warn_diff=5` (repeatable).
    #[arg(long = "set", global = true, value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Log verbosity.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score hooks GREEN/YELLOW/RED by comparing source bodies with decompiler data.
    Check(CheckArgs),

    /// Locate one function body in the source tree and show its metrics.
    Find(FindArgs),

    /// Write a config template.
    Init {
        /// Profile template: gta-reversed or openrct2.
        #[arg(long)]
        profile: Option<String>,

        /// Overwrite an existing config file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// List decompiler backends compiled into this binary.
    Backends {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Remove every cached decompiler/ASM blob.
    CacheClear,

    /// List recorded parity runs.
    Runs {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Only check these addresses (repeatable). Unknown addresses are checked by address alone.
    #[arg(long = "address")]
    addresses: Vec<String>,

    /// Regex matched against `Class::Function` and the class path.
    #[arg(long)]
    filter: Option<String>,

    /// Check at most this many hooks.
    #[arg(long)]
    limit: Option<usize>,

    /// Run source-only detectors without a decompiler backend.
    #[arg(long, default_value_t = false)]
    skip_ghidra: bool,

    /// Also check registry rows not yet marked reversed.
    #[arg(long, default_value_t = false)]
    include_unreversed: bool,

    /// Write a JSON report to this path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Exit non-zero when any hook scores RED.
    #[arg(long, default_value_t = false)]
    strict_exit: bool,

    /// Store the run summary in the parity cache database.
    #[arg(long, default_value_t = false)]
    record: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["address", "class_name"])))]
struct FindArgs {
    /// Class name (last segment of the class path).
    #[arg(long = "class", requires = "fn_name")]
    class_name: Option<String>,

    /// Function name.
    #[arg(long = "function", requires = "class_name")]
    fn_name: Option<String>,

    /// Hook address.
    #[arg(long, conflicts_with = "class_name")]
    address: Option<String>,

    /// Emit JSON instead of human-readable text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.into())
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Check(args) => {
            let ws = Workspace::load(&cli.config, &cli.overrides)?;
            let opts = CheckOptions {
                addresses: args.addresses,
                filter: args.filter,
                limit: args.limit,
                skip_ghidra: args.skip_ghidra,
                include_unreversed: args.include_unreversed,
                output: args.output,
                strict_exit: args.strict_exit,
                record: args.record,
            };
            check_command(&ws, &opts)?;
        }
        Command::Find(args) => {
            let ws = Workspace::load(&cli.config, &cli.overrides)?;
            let target = match (args.address, args.class_name, args.fn_name) {
                (Some(address), _, _) => FindTarget::Address(address),
                (None, Some(class_name), Some(fn_name)) => {
                    FindTarget::Symbol { class_name, fn_name }
                }
                _ => anyhow::bail!("Provide --address or both --class and --function"),
            };
            find_command(&ws, &target, args.json)?;
        }
        Command::Init { profile, force } => {
            let config_path = canonicalize_or_current(&cli.config)?;
            init_command(&config_path, profile.as_deref(), force)?;
        }
        Command::Backends { json } => list_backends_command(json)?,
        Command::CacheClear => {
            let ws = Workspace::load(&cli.config, &cli.overrides)?;
            cache_clear_command(&ws)?;
        }
        Command::Runs { json } => {
            let ws = Workspace::load(&cli.config, &cli.overrides)?;
            list_runs_command(&ws, json)?;
        }
    }

    Ok(())
}

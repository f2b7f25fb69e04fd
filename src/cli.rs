//! CLI definitions for sysdiagnose
//!
//! The clap structure lives in the library so integration tests can parse
//! argument vectors without spawning the binary.

use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Build clap styles for consistent CLI appearance.
///
/// - Green: headers, usage, command names
/// - White: descriptions, placeholders
pub fn build_cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::White.on_default())
        .valid(AnsiColor::White.on_default())
        .invalid(AnsiColor::Red.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

#[derive(Parser)]
#[command(name = "sysdiagnose")]
#[command(about = "[ sysdiagnose ] - ingest iOS sysdiagnose archives and run parsers and analyzers")]
#[command(
    long_about = "sysdiagnose - forensic case management for iOS sysdiagnose archives.

Each archive becomes a case identified by the first 8 hex characters of its
SHA-256. Known artifacts are located inside the extracted tree, parsers turn
them into JSON, and analyzers derive reports from the parsed data.

QUICK START:
    sysdiagnose init sysdiagnose_2024.tar.gz     Ingest an archive
    sysdiagnose list cases                       Show ingested cases
    sysdiagnose parse 1a2b3c4d --all             Run every parser
    sysdiagnose analyze 1a2b3c4d --all           Run every analyzer
    sysdiagnose status 1a2b3c4d                  Show case progress

Data lives in ~/.local/share/sysdiagnose unless configured otherwise in
~/.config/sysdiagnose/config.toml."
)]
#[command(version, styles = build_cli_styles())]
pub struct Cli {
    /// Log debug output to the console
    #[arg(short, long, global = true, help = "Enable debug output on stderr")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest an archive as a new case
    #[command(long_about = "Ingest a sysdiagnose archive (.tar or .tar.gz) as a case.

The archive is fingerprinted, extracted into the case directory, and its
known artifacts are resolved into the case manifest. An archive that was
already ingested is rejected unless --force is given, which re-extracts it
under the same case id.

EXAMPLES:
    sysdiagnose init sysdiagnose_2024.01.01_iPhone.tar.gz
    sysdiagnose init archive.tar.gz --force")]
    Init {
        #[arg(help = "Path to the sysdiagnose archive")]
        archive: PathBuf,
        #[arg(short, long, help = "Re-extract an archive that was already ingested")]
        force: bool,
    },

    /// List cases, parsers or analyzers
    #[command(
        visible_alias = "ls",
        long_about = "List ingested cases or the available plugins.

EXAMPLES:
    sysdiagnose list cases
    sysdiagnose list parsers
    sysdiagnose ls analyzers"
    )]
    List {
        #[arg(value_enum, help = "What to list")]
        what: ListTarget,
    },

    /// Run parsers on a case
    #[command(long_about = "Run parsers on an ingested case.

Each parser reads one artifact and writes parsed_data/<case>/<parser>.json.
By default the first failure aborts the run; with --ignore-errors failing
parsers are skipped and the rest still run.

EXAMPLES:
    sysdiagnose parse 1a2b3c4d --all
    sysdiagnose parse 1a2b3c4d ps brctl
    sysdiagnose parse 1a2b3c4d --all --ignore-errors --workers 4")]
    Parse(RunArgs),

    /// Run analyzers on a case
    #[command(long_about = "Run analyzers on a parsed case.

Each analyzer reads the case's parsed data and writes
analyzed_data/<case>/<analyzer>.<ext>.

EXAMPLES:
    sysdiagnose analyze 1a2b3c4d --all
    sysdiagnose analyze 1a2b3c4d process_census")]
    Analyze(RunArgs),

    /// Show the lifecycle state of a case
    #[command(long_about = "Show which parsers and analyzers have produced output for a case.

EXAMPLE:
    sysdiagnose status 1a2b3c4d")]
    Status {
        #[arg(help = "Case id")]
        case_id: String,
    },

    /// Delete every case and all extracted, parsed and analyzed data
    #[command(long_about = "Delete the application data directory contents.

Removes the case registry and every extracted, parsed and analyzed case.
Asks for confirmation unless --yes is given.

EXAMPLES:
    sysdiagnose clear
    sysdiagnose clear -y")]
    Clear {
        #[arg(short = 'y', long = "yes", help = "Skip the confirmation prompt")]
        yes: bool,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Shared arguments of `parse` and `analyze`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    #[arg(help = "Case id")]
    pub case_id: String,

    #[arg(
        help = "Plugins to run, in order",
        required_unless_present = "all",
        conflicts_with = "all"
    )]
    pub plugins: Vec<String>,

    #[arg(short, long, help = "Run every registered plugin")]
    pub all: bool,

    #[arg(short, long, help = "Skip failing plugins instead of aborting")]
    pub ignore_errors: bool,

    #[arg(long, help = "Worker threads when ignoring errors (overrides config)")]
    pub workers: Option<usize>,

    #[arg(long, help = "Per-plugin timeout in seconds, 0 for none (overrides config)")]
    pub timeout: Option<u64>,
}

impl RunArgs {
    /// Selected plugin names, `None` for `--all`.
    pub fn selection(&self) -> Option<&[String]> {
        (!self.all).then_some(self.plugins.as_slice())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListTarget {
    Cases,
    Parsers,
    Analyzers,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration as TOML
    #[command(long_about = "Display the effective configuration in TOML format.

EXAMPLE:
    sysdiagnose config show")]
    Show,
    /// Write the default configuration file if none exists
    #[command(long_about = "Create ~/.config/sysdiagnose/config.toml with default values.

An existing file is left untouched.

EXAMPLE:
    sysdiagnose config init")]
    Init,
}

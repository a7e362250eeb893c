use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sectioned_diff::{Algorithm, DiffOptions};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "sectioned",
    about = "Diff and replay sectioned collections",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

impl Cli {
    /// `--verbose` lowers the log threshold from `INFO` to `DEBUG`.
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the change stream that turns one collection file into another
    Diff(PairArgs),
    /// Print the edit script between two flat JSON arrays
    Script(PairArgs),
    /// Replay a diff through an observed collection and check the result
    Verify(PairArgs),
}

/// Two input files plus diff settings.
#[derive(Args)]
pub struct PairArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    #[command(flatten)]
    pub settings: DiffSettings,
}

#[derive(Args, Clone, Debug)]
pub struct DiffSettings {
    #[arg(long, default_value = "lcs")]
    pub algorithm: AlgorithmArg,
    /// Report moved elements as a delete plus an insert
    #[arg(long)]
    pub no_moves: bool,
}

impl DiffSettings {
    pub fn options(&self) -> DiffOptions {
        DiffOptions {
            algorithm: self.algorithm.into(),
            detect_moves: !self.no_moves,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum AlgorithmArg {
    Lcs,
    Myers,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Lcs => Algorithm::Lcs,
            AlgorithmArg::Myers => Algorithm::Myers,
        }
    }
}

//! Command line tool for inspecting and combining JSON-encoded deltas.
//!
//! Every command reads deltas from files (`-` for stdin) and prints the
//! resulting delta as JSON, except `text` which prints the inserted text.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{
  ArgAction,
  Parser,
  Subcommand,
};
use eyre::Result;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "delta")]
#[command(about = "Compose, invert and slice rich-text deltas")]
struct Cli {
  /// Config file (defaults to <config dir>/the-delta/config.toml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Pretty-print JSON output
  #[arg(long, global = true)]
  pretty: bool,

  /// Fail on records that match no operation instead of skipping them
  #[arg(long, global = true)]
  strict: bool,

  /// More logging (-v debug, -vv trace). RUST_LOG takes precedence
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Compose deltas left to right into one
  Compose {
    /// Two or more deltas, applied in order
    #[arg(required = true, num_args = 2..)]
    deltas: Vec<PathBuf>,
  },
  /// Build the delta that undoes DELTA, given the document it applied to
  Invert { delta: PathBuf, base: PathBuf },
  /// Extract [START, END) of a delta
  Slice {
    delta: PathBuf,
    start: usize,
    end:   Option<usize>,
  },
  /// Re-encode a delta in normalized form
  Normalize { delta: PathBuf },
  /// Print the text inserted by a delta
  Text { delta: PathBuf },
}

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let mut config = Config::load(cli.config.as_deref())?;
  config.pretty |= cli.pretty;
  config.strict |= cli.strict;
  log::debug!("effective config: {config:?}");

  let output = commands::run(&cli.command, &config)?;
  println!("{output}");
  Ok(())
}

//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Extract bibliographies and resolve in-text citations from scholarly XML.
///
/// Reads JATS, TEI, Wiley and `BioC` documents, writes one citation graph per
/// document as JSON Lines.
#[derive(Parser, Debug)]
#[command(name = "citegraph")]
#[command(author, version, about)]
pub struct Args {
    /// XML files or directories containing `*.xml` files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Documents processed at once (1-64) [default: 8]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub concurrency: Option<u8>,

    /// Per-document time budget in seconds (1-600) [default: 30]
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: Option<u64>,

    /// Write JSON Lines here instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Print a coverage summary to stderr when done
    #[arg(long)]
    pub report: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/citegraph/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Widest numeral range expanded into individual citations (1-10000) [default: 100]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub max_range_span: Option<u32>,
}

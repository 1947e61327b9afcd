use clap::Parser;
use std::path::PathBuf;

use crate::config::BackendKind;

/// Translate a JSON list of subtitle lines read from stdin.
///
/// Prints the translated list as JSON on stdout, or `{"error": ...}` with
/// exit status 1 on failure.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Source language code (e.g. en)
    #[arg(short, long)]
    pub source: String,

    /// Target language code (e.g. fr)
    #[arg(short, long)]
    pub target: String,

    /// Translation backend, overriding the config file
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

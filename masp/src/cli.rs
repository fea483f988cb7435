//! Command-line surface (§6): a `#[derive(Parser)]` struct whose doc
//! comments double as the generated `--help` text.

use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;

/// MASP: an assembly-source preprocessor derived from GNU `gasp`.
///
/// Performs macro expansion, conditional assembly, file inclusion,
/// symbolic assignment, and directive translation, emitting standard
/// GNU-assembler source.
#[derive(Parser, Debug)]
#[clap(about, version)]
pub struct Cli {
    /// Write output to this path instead of stdout.
    #[clap(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Preprocess mode (default directive translation). Present for
    /// command-line compatibility with `gasp`-derived invocations; MASP
    /// always translates directives, so this flag has no additional
    /// effect.
    #[clap(short = 'p')]
    pub preprocess: bool,

    /// Enable source-copy emission: each original input line is written
    /// as a comment before its translated form.
    #[clap(short = 's')]
    pub copy_source: bool,

    /// Source-copy comment character.
    #[clap(short = 'c', default_value = ";")]
    pub comment_char: char,

    /// Add a directory to the `.INCLUDE` search path. May be repeated.
    #[clap(short = 'I', value_name = "DIR")]
    pub include_dir: Vec<PathBuf>,

    /// Print a shell completion script for the given shell and exit.
    #[clap(long = "completions", value_name = "SHELL")]
    pub completions: Option<Shell>,

    /// Input source files, processed in order; their outputs concatenate
    /// into a single output stream.
    #[clap(value_name = "FILE", last = false)]
    pub inputs: Vec<PathBuf>,
}

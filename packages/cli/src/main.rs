//! `gdoc`: command-line inspector for compound documents.
//!
//! Provides four subcommands:
//!
//! - **`validate`**: check a document against the structural rules.
//! - **`render`**: print a human-readable summary of a document.
//! - **`fmt`**: re-encode a document, compact or indented.
//! - **`includes`**: show how an `include` query parameter is normalized.
//!
//! Document subcommands read JSON from a file path or from stdin (`-`).

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use graphdoc::{render_document, validate_document, CompoundDocument, IncludePaths, Settings};
use tracing_subscriber::EnvFilter;

/// gdoc: compound document CLI
///
/// Validate, render and reformat compound documents.
#[derive(Parser)]
#[command(name = "gdoc", version, about, long_about = None)]
struct Cli {
    /// Log filter directives, e.g. `graphdoc=debug`.
    #[arg(long, global = true, env = "GDOC_LOG", default_value = "graphdoc=warn")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a compound document.
    ///
    /// Checks ids and types, member names, uniqueness across primary and
    /// included resources, full linkage, error statuses and link URIs.
    /// Exits 0 if the document is valid, 1 otherwise.
    ///
    /// Pass `-` as FILE to read from stdin.
    Validate {
        /// Path to a JSON file, or `-` for stdin.
        file: PathBuf,
    },

    /// Render a compound document as human-readable text.
    ///
    /// Pass `-` as FILE to read from stdin.
    Render {
        /// Path to a JSON file, or `-` for stdin.
        file: PathBuf,
    },

    /// Re-encode a compound document.
    ///
    /// Output is compact unless --pretty is given or GRAPHDOC_PRETTY is set.
    Fmt {
        /// Path to a JSON file, or `-` for stdin.
        file: PathBuf,

        /// Indent the output.
        #[arg(long)]
        pretty: bool,
    },

    /// Print the normalized paths of an `include` query value, one per line.
    ///
    /// Example:
    ///   gdoc includes "comments, comments/author"
    Includes {
        /// The raw query value.
        query: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).unwrap_or_else(|_| "graphdoc=warn".into()))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Validate { file } => {
            let document = parse_document(&read_input(&file));
            match validate_document(&document) {
                Ok(()) => println!("valid"),
                Err(e) => {
                    eprintln!("error: {e}");
                    process::exit(1);
                }
            }
        }

        Command::Render { file } => {
            let document = parse_document(&read_input(&file));
            print!("{}", render_document(&document));
        }

        Command::Fmt { file, pretty } => {
            let document = parse_document(&read_input(&file));
            let mut settings = Settings::from_env();
            settings.pretty |= pretty;
            tracing::debug!("fmt: encoding as {}", settings.media_type);
            let json = settings
                .encode(&document)
                .unwrap_or_else(|e| fatal(&format!("failed to encode document: {e}")));
            println!("{json}");
        }

        Command::Includes { query } => {
            for path in IncludePaths::parse(&query).iter() {
                println!("{path}");
            }
        }
    }
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &PathBuf) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {e}")));
        buf
    } else {
        fs::read_to_string(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {e}", path.display())))
    }
}

/// Parse a JSON string as a compound document, exiting on failure.
fn parse_document(json: &str) -> CompoundDocument {
    serde_json::from_str(json)
        .unwrap_or_else(|e| fatal(&format!("failed to parse input as a compound document: {e}")))
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("gdoc: {msg}");
    process::exit(2);
}

//! apidoc — export `@Annotation(...)` facts from documented source files as JSON.
//!
//! - **stdin mode**: `apidoc < User.php`
//! - **file mode**: `apidoc -o api.json src/Controller/*.php`
//!
//! Output shape: `{ "Namespace\\Declaration": { "member": { "Annotation": [ ... ] } } }`.

use anyhow::{Context, Result};
use apidoc::source;
use apidoc::{ConsolidationRules, Declaration, Extraction, Extractor};
use clap::Parser;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "apidoc",
    about = "Extract @Annotation(...) facts from documentation comments as JSON"
)]
struct Cli {
    /// Input files, glob patterns or directories (scanned recursively). Reads stdin when omitted.
    files: Vec<String>,

    /// Output file. Writes to stdout when omitted.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Annotation whose `name` argument prefixes member routes
    #[arg(long, default_value = "ApiRoute")]
    route_annotation: String,

    /// Annotation broadcast from a declaration to all of its annotated members
    #[arg(long, default_value = "ApiSector")]
    sector_annotation: String,

    /// Warn about and skip declarations with malformed annotations instead of failing
    #[arg(long)]
    skip_invalid: bool,

    /// Log more (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

type Output = IndexMap<String, Extraction>;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let extractor = Extractor::new().with_rules(ConsolidationRules {
        route: cli.route_annotation.clone(),
        sector: cli.sector_annotation.clone(),
    });

    let declarations = if cli.files.is_empty() {
        read_stdin()?
    } else {
        read_files(&cli.files)?
    };

    let output = extract(&extractor, &declarations, cli.skip_invalid)?;
    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .context("failed to serialize annotations")?;

    match cli.output {
        Some(ref path) => fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", json),
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// stdin mode: read one source file from stdin.
fn read_stdin() -> Result<Vec<Declaration>> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    Ok(source::collect(&input))
}

/// file mode: collect declarations from every input file, in path order.
fn read_files(patterns: &[String]) -> Result<Vec<Declaration>> {
    let mut declarations = Vec::new();
    for path in source_files(patterns)? {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let found = source::collect(&content);
        debug!(file = %path.display(), declarations = found.len(), "collected");
        declarations.extend(found);
    }
    Ok(declarations)
}

/// Run extraction for every declaration.
///
/// A malformed comment aborts the run unless `skip_invalid` is set, in which
/// case the offending declaration is left out.
fn extract(extractor: &Extractor, declarations: &[Declaration], skip_invalid: bool) -> Result<Output> {
    let mut output = Output::new();
    for declaration in declarations {
        match extractor.extract(declaration) {
            Ok(members) => {
                output.insert(declaration.name.clone(), members);
            }
            Err(e) if skip_invalid => {
                warn!(declaration = %declaration.name, error = %e, "skipping declaration");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to extract {}", declaration.name));
            }
        }
    }
    Ok(output)
}

/// File extensions collected when an input is a directory.
const SUPPORTED_EXTENSIONS: &[&str] = &["php", "inc"];

/// What one command-line input refers to.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    File(&'a Path),
    Directory(&'a Path),
    Pattern(&'a str),
}

impl<'a> Input<'a> {
    fn classify(arg: &'a str) -> Self {
        let path = Path::new(arg);
        if path.is_file() {
            Input::File(path)
        } else if path.is_dir() {
            Input::Directory(path)
        } else {
            Input::Pattern(arg)
        }
    }

    fn files(&self) -> Result<Vec<PathBuf>> {
        match self {
            Input::File(path) => Ok(vec![path.to_path_buf()]),
            Input::Directory(dir) => sources_under(dir),
            Input::Pattern(pattern) => glob_files(pattern),
        }
    }
}

/// Resolve inputs to a sorted, duplicate-free list of source files.
fn source_files(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();
    for arg in inputs {
        let found = Input::classify(arg).files()?;
        if found.is_empty() {
            warn!(input = %arg, "no files matched");
        }
        files.extend(found);
    }
    Ok(files.into_iter().collect())
}

/// Source files anywhere below `dir`.
fn sources_under(dir: &Path) -> Result<Vec<PathBuf>> {
    let root = glob::Pattern::escape(&dir.to_string_lossy());
    let mut found = Vec::new();
    for ext in SUPPORTED_EXTENSIONS {
        found.extend(glob_files(&format!("{root}/**/*.{ext}"))?);
    }
    Ok(found)
}

fn glob_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect())
}

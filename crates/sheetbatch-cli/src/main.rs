//! sheetbatch CLI - apply batches of block updates to xlsx workbooks

mod manifest;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sheetbatch::prelude::*;
use sheetbatch::{Sheet, XlsxReader};

use crate::manifest::{Manifest, Payload};

#[derive(Parser)]
#[command(name = "sheetbatch")]
#[command(
    author,
    version,
    about = "Apply block updates to xlsx workbooks with one write per file"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every update of a JSON manifest, then save
    Apply {
        /// Manifest file: {"updates": [{"path", "sheet", "origin", "values", ...}]}
        manifest: PathBuf,

        /// Buffer updates and save each workbook once, or save after every update
        #[arg(short, long, value_enum, default_value = "cached")]
        mode: Mode,

        /// Skip fsync before replacing files
        #[arg(long)]
        no_sync: bool,
    },

    /// List all sheets in a workbook
    Sheets {
        /// Input xlsx file
        input: PathBuf,
    },

    /// Print the populated rows of a sheet, tab-separated after the row number
    Show {
        /// Input xlsx file
        input: PathBuf,

        /// Sheet name (case-sensitive)
        #[arg(short, long)]
        sheet: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Cached,
    Immediate,
}

impl From<Mode> for UpdateMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Cached => UpdateMode::Cached,
            Mode::Immediate => UpdateMode::Immediate,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            manifest,
            mode,
            no_sync,
        } => apply(&manifest, mode, no_sync),
        Commands::Sheets { input } => list_sheets(&input),
        Commands::Show { input, sheet } => show_sheet(&input, &sheet),
    }
}

fn apply(manifest_path: &Path, mode: Mode, no_sync: bool) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;

    let options = SessionOptions {
        mode: mode.into(),
        sync_on_flush: !no_sync,
    };
    let updater = options.build_updater();

    let mut failed_updates = 0;
    for (i, update) in manifest.updates.iter().enumerate() {
        let outcome = update.payload().and_then(|payload| {
            let applied = match payload {
                Payload::Plain(block) => updater.update(&update.path, &update.sheet, &block),
                Payload::Labeled(labeled) => {
                    updater.update_labeled(&update.path, &update.sheet, labeled)
                }
            };
            Ok(applied?)
        });

        if let Err(err) = outcome {
            failed_updates += 1;
            eprintln!(
                "update {} ({} / {}): {:#}",
                i + 1,
                update.path.display(),
                update.sheet,
                err
            );
        }
    }

    let results = updater.save_all();
    let mut failed_saves = 0;
    for result in &results {
        match &result.status {
            FlushStatus::Success => println!("saved\t{}", result.path.display()),
            FlushStatus::Skipped => println!("skipped\t{}", result.path.display()),
            FlushStatus::Failed(err) => {
                failed_saves += 1;
                println!("failed\t{}\t{}", result.path.display(), err);
            }
        }
    }

    let applied = manifest.updates.len() - failed_updates;
    eprintln!(
        "Applied {} of {} updates, {} workbooks saved",
        applied,
        manifest.updates.len(),
        results.iter().filter(|r| r.is_success()).count()
    );

    if failed_updates > 0 || failed_saves > 0 {
        bail!(
            "{} updates and {} saves failed",
            failed_updates,
            failed_saves
        );
    }
    Ok(())
}

fn list_sheets(input: &Path) -> Result<()> {
    let loaded = XlsxReader::read_file(input)
        .with_context(|| format!("Failed to open '{}'", input.display()))?;

    for (i, name) in loaded.workbook.sheet_names().iter().enumerate() {
        println!("{}\t{}", i, name);
    }

    Ok(())
}

fn show_sheet(input: &Path, name: &str) -> Result<()> {
    let loaded = XlsxReader::read_file(input)
        .with_context(|| format!("Failed to open '{}'", input.display()))?;
    let sheet = loaded
        .workbook
        .sheet_by_name(name)
        .with_context(|| format!("Sheet '{}' not found", name))?;

    let lines = sheet_lines(sheet);
    if lines.is_empty() {
        eprintln!("Warning: Sheet appears to be empty");
    }
    for line in lines {
        println!("{}", line);
    }

    Ok(())
}

/// One line per populated row: the row number, then columns A up to the
/// row's last stored cell
///
/// Work is proportional to the stored cells, not to the used range.
fn sheet_lines(sheet: &Sheet) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<(u32, Vec<String>)> = None;

    for (row, col, value) in sheet.iter_cells() {
        if current.as_ref().map_or(true, |(r, _)| *r != row) {
            if let Some((r, fields)) = current.take() {
                lines.push(format!("{}\t{}", r, fields.join("\t")));
            }
            current = Some((row, Vec::new()));
        }
        if let Some((_, fields)) = current.as_mut() {
            fields.resize(col as usize - 1, String::new());
            fields.push(cell_text(value));
        }
    }
    if let Some((r, fields)) = current {
        lines.push(format!("{}\t{}", r, fields.join("\t")));
    }
    lines
}

/// Render a value for tab-separated output
fn cell_text(value: &CellValue) -> String {
    let text = match value {
        CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        other => other.to_string(),
    };
    text.replace(['\t', '\n', '\r'], " ")
}

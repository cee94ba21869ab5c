//! JSON manifest of block updates

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sheetbatch::{CellBlock, CellValue, LabeledBlock};

#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub updates: Vec<UpdateSpec>,
}

/// One block destined for `sheet` of the workbook at `path`
#[derive(Debug, Deserialize)]
pub struct UpdateSpec {
    pub path: PathBuf,
    pub sheet: String,
    /// 1-based `[row, col]` of the top-left value
    pub origin: [u32; 2],
    pub values: Vec<Vec<ManifestValue>>,
    #[serde(default)]
    pub row_labels: Option<Vec<ManifestValue>>,
    #[serde(default)]
    pub column_headers: Option<Vec<ManifestValue>>,
}

/// A cell value as written in JSON
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ManifestValue {
    Null(()),
    Bool(bool),
    Number(f64),
    Text(String),
    Date { date: String },
}

impl ManifestValue {
    pub fn to_cell_value(&self) -> Result<CellValue> {
        Ok(match self {
            ManifestValue::Null(()) => CellValue::Empty,
            ManifestValue::Bool(b) => CellValue::Boolean(*b),
            ManifestValue::Number(n) => CellValue::number(*n),
            ManifestValue::Text(s) => CellValue::text(s),
            ManifestValue::Date { date } => parse_date(date)?.into(),
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD[THH:MM:SS]", s))
}

fn to_cell_values(values: &[ManifestValue]) -> Result<Vec<CellValue>> {
    values.iter().map(ManifestValue::to_cell_value).collect()
}

/// What an update turns into once its values are converted
pub enum Payload {
    Plain(CellBlock),
    Labeled(LabeledBlock),
}

impl UpdateSpec {
    pub fn payload(&self) -> Result<Payload> {
        let values = self
            .values
            .iter()
            .map(|row| to_cell_values(row))
            .collect::<Result<Vec<_>>>()?;
        let block = CellBlock::new(values, self.origin[0], self.origin[1])?;

        if self.row_labels.is_none() && self.column_headers.is_none() {
            return Ok(Payload::Plain(block));
        }

        let mut labeled = LabeledBlock::new(block);
        if let Some(labels) = &self.row_labels {
            labeled = labeled.with_row_labels(to_cell_values(labels)?)?;
        }
        if let Some(headers) = &self.column_headers {
            labeled = labeled.with_column_headers(to_cell_values(headers)?)?;
        }
        Ok(Payload::Labeled(labeled))
    }
}

impl Manifest {
    /// Read a manifest; relative workbook paths resolve against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        let mut manifest: Manifest = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse manifest '{}'", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for update in &mut manifest.updates {
            if update.path.is_relative() {
                update.path = base.join(&update.path);
            }
        }
        if manifest.updates.is_empty() {
            bail!("Manifest '{}' contains no updates", path.display());
        }
        Ok(manifest)
    }
}

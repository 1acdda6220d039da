#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Readers for the row lists produced by the document ingestion pipeline.
//!
//! The pipeline publishes either a `name,url` CSV or a JSON manifest of the
//! documents it managed to fetch. Both are turned into [`DocumentRow`]s
//! without validation; the indexer decides what is usable.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crion_search_models::DocumentRow;
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading rows.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// Opening or reading the input failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The CSV header could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The manifest is not valid JSON of the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The manifest written by the ingestion pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// ISO-8601 timestamp of the pipeline run.
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub items: Vec<ManifestItem>,
}

/// One fetched document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestItem {
    /// Short hash of the URL.
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    pub url: Option<String>,
    /// Relative path of the extracted text.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub txt: String,
}

impl Manifest {
    /// The manifest's documents as index rows, in manifest order.
    #[must_use]
    pub fn rows(&self) -> Vec<DocumentRow> {
        self.items
            .iter()
            .map(|item| DocumentRow {
                name: item.name.clone(),
                url: item.url.clone(),
            })
            .collect()
    }
}

/// Reads `name,url` rows from CSV. Extra columns are ignored and short
/// records yield missing fields; records that cannot be decoded at all are
/// skipped.
///
/// # Errors
///
/// * If the header row cannot be read
pub fn read_rows_csv(reader: impl Read) -> Result<Vec<DocumentRow>, LoaderError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.headers()?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in csv_reader.deserialize::<DocumentRow>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping malformed CSV record: {e}");
            }
        }
    }

    log::debug!("Read {} CSV rows ({skipped} skipped)", rows.len());

    Ok(rows)
}

/// Reads `name,url` rows from a CSV file.
///
/// # Errors
///
/// * If the file cannot be opened
/// * If the header row cannot be read
pub fn load_rows_csv(path: &Path) -> Result<Vec<DocumentRow>, LoaderError> {
    read_rows_csv(open(path)?)
}

/// Parses a JSON manifest.
///
/// # Errors
///
/// * If the input is not a valid manifest
pub fn read_manifest(reader: impl Read) -> Result<Manifest, LoaderError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Parses a JSON manifest file.
///
/// # Errors
///
/// * If the file cannot be opened
/// * If the file is not a valid manifest
pub fn load_manifest(path: &Path) -> Result<Manifest, LoaderError> {
    read_manifest(open(path)?)
}

/// Loads rows from `path`, reading `.json` files as a manifest and anything
/// else as CSV.
///
/// # Errors
///
/// * If the file cannot be opened or parsed
pub fn load_rows(path: &Path) -> Result<Vec<DocumentRow>, LoaderError> {
    let rows = if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    {
        load_manifest(path)?.rows()
    } else {
        load_rows_csv(path)?
    };

    log::info!("Loaded {} rows from {}", rows.len(), path.display());

    Ok(rows)
}

fn open(path: &Path) -> Result<BufReader<File>, LoaderError> {
    File::open(path).map(BufReader::new).map_err(|e| LoaderError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

//! Write sector tables to CSV, bundle them into a zip archive and record a
//! run manifest.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use zip::write::FileOptions;
use zip::CompressionMethod;

use crate::calibrate::CalibrationReport;
use crate::data::model::Table;
use crate::pipeline::RunOutcome;
use crate::sectors::Sector;

pub const ARCHIVE_NAME: &str = "energy-estimates-data.zip";
pub const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedSector {
    pub sector: String,
    pub rows: usize,
    pub path: PathBuf,
}

/// Summary of one run, written next to the published files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub sectors: Vec<PublishedSector>,
    pub archive: Option<PathBuf>,
    pub calibration: Option<CalibrationReport>,
}

/// Writes results under `<root>/sectors/`.
#[derive(Debug, Clone)]
pub struct Publisher {
    root: PathBuf,
}

impl Publisher {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn file_name(sector: Sector) -> String {
        format!("{sector}-data.csv")
    }

    pub fn sector_path(&self, sector: Sector) -> PathBuf {
        self.root.join("sectors").join(Self::file_name(sector))
    }

    pub fn archive_path(&self) -> PathBuf {
        self.root.join(ARCHIVE_NAME)
    }

    pub fn publish(&self, outcome: &RunOutcome) -> Result<Manifest> {
        let mut sectors = Vec::with_capacity(outcome.outputs.len());
        for output in &outcome.outputs {
            let path = self.sector_path(output.sector);
            write_csv(&output.table, &path)?;
            log::info!(
                "wrote {} {} rows to {}",
                output.table.len(),
                output.sector,
                path.display()
            );
            sectors.push(PublishedSector {
                sector: output.sector.to_string(),
                rows: output.table.len(),
                path,
            });
        }

        let archive = if sectors.len() > 1 {
            let path = self.archive_path();
            let files: Vec<&Path> = sectors.iter().map(|s| s.path.as_path()).collect();
            write_archive(&files, &path)?;
            log::info!("bundled {} sectors into {}", files.len(), path.display());
            Some(path)
        } else {
            None
        };

        let manifest = Manifest {
            sectors,
            archive,
            calibration: outcome.calibration.clone(),
        };
        let manifest_path = self.root.join(MANIFEST_NAME);
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&manifest_path, json)
            .with_context(|| format!("writing {}", manifest_path.display()))?;
        Ok(manifest)
    }
}

/// Write a table as CSV. Missing values are empty cells.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Bundle files into a deflated zip, each stored under its file name.
pub fn write_archive(files: &[&Path], archive_path: &Path) -> Result<()> {
    if let Some(parent) = archive_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(archive_path)
        .with_context(|| format!("creating {}", archive_path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;
        zip.start_file(name, options)?;
        let mut source = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        io::copy(&mut source, &mut zip)?;
    }
    zip.finish()?.flush()?;
    Ok(())
}

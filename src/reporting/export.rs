//! Flat tabular export of a financial report
//!
//! A [`ReportWorkbook`] holds one sheet per table. Sheets serialize to CSV
//! individually, as one flat document with the sheet title in front of each
//! section, or as one file per sheet in a directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::traits::TabularSection;
use crate::types::*;

/// One exported table with its headers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn from_section(section: &dyn TabularSection) -> Self {
        Self {
            name: section.title().to_string(),
            headers: section.headers().into_iter().map(String::from).collect(),
            rows: section.rows(),
        }
    }

    /// File name used when the sheet is written on its own
    pub fn file_name(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        format!("{stem}.csv")
    }

    /// Serialize the header row and data rows as CSV
    pub fn to_csv(&self) -> EscrowResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

        writer
            .write_record(&self.headers)
            .map_err(|e| EscrowError::Export(e.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| EscrowError::Export(e.to_string()))?;
        }

        writer
            .into_inner()
            .map_err(|e| EscrowError::Export(e.to_string()))
    }
}

/// Ordered collection of sheets making up one exported report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWorkbook {
    pub sheets: Vec<Sheet>,
}

impl ReportWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_section(&mut self, section: &dyn TabularSection) {
        self.sheets.push(Sheet::from_section(section));
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Every sheet in one CSV document. Each section starts with a
    /// single-field title row, followed by its header row and data rows.
    pub fn to_csv_document(&self) -> EscrowResult<Vec<u8>> {
        // sections have different widths
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());

        for sheet in &self.sheets {
            writer
                .write_record([sheet.name.as_str()])
                .map_err(|e| EscrowError::Export(e.to_string()))?;
            writer
                .write_record(&sheet.headers)
                .map_err(|e| EscrowError::Export(e.to_string()))?;
            for row in &sheet.rows {
                writer
                    .write_record(row)
                    .map_err(|e| EscrowError::Export(e.to_string()))?;
            }
        }

        writer
            .into_inner()
            .map_err(|e| EscrowError::Export(e.to_string()))
    }

    /// Write one CSV file per sheet into `dir`, returning the written paths
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> EscrowResult<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(self.sheets.len());
        for sheet in &self.sheets {
            let path = dir.join(sheet.file_name());
            std::fs::write(&path, sheet.to_csv()?)?;
            log::debug!("wrote sheet '{}' to {}", sheet.name, path.display());
            written.push(path);
        }
        Ok(written)
    }
}

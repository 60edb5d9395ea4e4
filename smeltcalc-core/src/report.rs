use crate::{calculator::Requirements, catalog::Catalog, error::SmeltError};
use csv::Writer;
use serde::Serialize;
use std::fs;
use std::io;

#[derive(Debug, Serialize)]
struct SummaryEntry<'a> {
    target: &'a str,
    material_id: &'a str,
    material_name: &'a str,
    millibuckets: f64,
    ingots: f64,
}

/// Writes calculation summaries as CSV rows, one per base material.
pub struct SummaryWriter<W: io::Write> {
    writer: Writer<W>,
    origin: String,
}

impl SummaryWriter<fs::File> {
    pub fn create(path: &str) -> Result<Self, SmeltError> {
        let writer = Writer::from_path(path).map_err(|e| SmeltError::CsvError(path.to_string(), e))?;
        Ok(Self {
            writer,
            origin: path.to_string(),
        })
    }
}

impl<W: io::Write> SummaryWriter<W> {
    pub fn from_writer(inner: W) -> Self {
        Self {
            writer: Writer::from_writer(inner),
            origin: "<writer>".to_string(),
        }
    }

    pub fn write_requirements(
        &mut self,
        requirements: &Requirements,
        catalog: &dyn Catalog,
    ) -> Result<(), SmeltError> {
        for row in requirements.summary_rows(catalog) {
            let entry = SummaryEntry {
                target: &requirements.target,
                material_id: &row.material_id,
                material_name: &row.name,
                millibuckets: row.millibuckets,
                ingots: row.ingots,
            };
            self.writer
                .serialize(entry)
                .map_err(|e| SmeltError::CsvError(self.origin.clone(), e))?;
        }
        self.writer
            .flush()
            .map_err(|e| SmeltError::FileIO(self.origin.clone(), e))?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, SmeltError> {
        let origin = self.origin;
        self.writer
            .into_inner()
            .map_err(|e| SmeltError::FileIO(origin, e.into_error()))
    }
}

use pwstackcore::output::{CoherenceStore, StoreError, TraceStore};
use pwstackcore::processing::Coharray;
use pwstackcore::seismic::ThreeComponentSeismogram;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one JSON document per saved record.
pub struct JsonLinesStore {
    path: PathBuf,
    writer: BufWriter<File>,
    records: usize,
}

#[derive(Serialize)]
struct CoherenceRecord<'a> {
    gridid: Option<i64>,
    sta: Option<String>,
    coherence: &'a Coharray,
}

impl JsonLinesStore {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered records and return how many were written.
    pub fn finish(mut self) -> Result<usize, StoreError> {
        self.writer.flush()?;
        Ok(self.records)
    }

    fn write_record<T: Serialize>(&mut self, record: &T) -> Result<(), StoreError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }
}

impl TraceStore for JsonLinesStore {
    fn save(&mut self, trace: &ThreeComponentSeismogram) -> Result<(), StoreError> {
        self.write_record(trace)
    }
}

impl CoherenceStore for JsonLinesStore {
    fn save(&mut self, coh: &Coharray, trace: &ThreeComponentSeismogram) -> Result<(), StoreError> {
        let record = CoherenceRecord {
            gridid: trace.metadata.get_int("gridid").ok(),
            sta: trace.metadata.get_string("sta").ok(),
            coherence: coh,
        };
        self.write_record(&record)
    }
}

//! Polars-based loading of raw table files.
//!
//! Every column is read as text so that malformed cells survive loading and
//! can be counted and dropped row by row instead of failing the whole read.
//! Plain CSV files are scanned lazily, so the column projection and the
//! item filter of event tables are applied while the file is parsed.
//! Gzip-compressed files are decompressed in memory first.

use std::path::{Path, PathBuf};

use icustate_model::options::DEFAULT_CHUNK_ROWS;
use polars::prelude::*;

use crate::error::{IngestError, Result};
use crate::tables::TableSpec;

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Rows handed to a chunk processor at a time.
    pub chunk_rows: usize,
    /// Low memory mode - trades performance for memory efficiency.
    pub low_memory: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            chunk_rows: DEFAULT_CHUNK_ROWS,
            low_memory: false,
        }
    }
}

impl ReadOptions {
    pub fn with_chunk_rows(mut self, rows: usize) -> Self {
        self.chunk_rows = rows;
        self
    }

    pub fn with_low_memory(mut self, enabled: bool) -> Self {
        self.low_memory = enabled;
        self
    }
}

/// Reads the projected columns of one raw table.
#[derive(Debug, Clone)]
pub struct RawTableReader {
    spec: TableSpec,
    path: PathBuf,
    options: ReadOptions,
}

impl RawTableReader {
    pub fn new(spec: TableSpec, path: impl AsRef<Path>, options: ReadOptions) -> Self {
        Self {
            spec,
            path: path.as_ref().to_path_buf(),
            options,
        }
    }

    pub fn options(&self) -> ReadOptions {
        self.options
    }

    /// Lazy scan of the table's declared columns, all as text.
    ///
    /// A zero-byte file scans as an empty frame with the declared columns.
    pub fn scan(&self) -> Result<LazyFrame> {
        let size = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| self.read_error(PolarsError::from(e)))?;
        if size == 0 {
            return Ok(self.empty_frame()?.lazy());
        }

        let mut lf = if self.is_compressed() {
            CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .with_low_memory(self.options.low_memory)
                .try_into_reader_with_file_path(Some(self.path.clone()))
                .map_err(|e| self.read_error(e))?
                .finish()
                .map_err(|e| self.read_error(e))?
                .lazy()
        } else {
            let path = self.path.to_string_lossy();
            LazyCsvReader::new(PlPath::new(&path))
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .with_low_memory(self.options.low_memory)
                .finish()
                .map_err(|e| self.read_error(e))?
        };

        let schema = lf.collect_schema().map_err(|e| self.read_error(e))?;
        self.check_columns(&schema)?;
        let projection: Vec<Expr> = self.spec.columns.iter().map(|c| col(*c)).collect();
        Ok(lf.select(projection))
    }

    /// Reads the table's declared columns as text.
    pub fn read(&self) -> Result<DataFrame> {
        let df = self.scan()?.collect().map_err(|e| self.read_error(e))?;
        tracing::debug!(
            table = self.spec.name,
            path = %self.path.display(),
            rows = df.height(),
            "raw table loaded"
        );
        Ok(df)
    }

    /// Reads only the rows whose `item_column` parses to one of `items`.
    ///
    /// Rows with an unparseable item id never match.
    pub fn read_items(&self, item_column: &str, items: impl IntoIterator<Item = i64>) -> Result<DataFrame> {
        let items: Vec<i64> = items.into_iter().collect();
        let wanted = lit(Series::new("items".into(), items.as_slice())).implode();
        let df = self
            .scan()?
            .filter(
                col(item_column)
                    .str()
                    .strip_chars(lit(NULL))
                    .cast(DataType::Int64)
                    .is_in(wanted, false),
            )
            .collect()
            .map_err(|e| self.read_error(e))?;
        tracing::debug!(
            table = self.spec.name,
            path = %self.path.display(),
            items = items.len(),
            rows = df.height(),
            "event rows loaded"
        );
        Ok(df)
    }

    fn is_compressed(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "gz")
    }

    fn check_columns(&self, schema: &Schema) -> Result<()> {
        for column in self.spec.columns {
            if !schema.contains(column) {
                return Err(IngestError::MissingColumn {
                    table: self.spec.name.to_string(),
                    column: (*column).to_string(),
                });
            }
        }
        Ok(())
    }

    fn empty_frame(&self) -> Result<DataFrame> {
        let columns = self
            .spec
            .columns
            .iter()
            .map(|c| Series::new_empty(PlSmallStr::from(*c), &DataType::String).into())
            .collect::<Vec<Column>>();
        Ok(DataFrame::new(columns)?)
    }

    fn read_error(&self, source: PolarsError) -> IngestError {
        IngestError::Read {
            table: self.spec.name.to_string(),
            path: self.path.clone(),
            source,
        }
    }
}

/// Calls `processor(offset, chunk)` for consecutive slices of at most `chunk_rows` rows.
///
/// A `chunk_rows` of zero processes the frame as a single chunk.
pub fn for_each_chunk<E, F>(
    df: &DataFrame,
    chunk_rows: usize,
    mut processor: F,
) -> std::result::Result<(), E>
where
    F: FnMut(usize, DataFrame) -> std::result::Result<(), E>,
{
    let total_rows = df.height();
    let chunk_size = if chunk_rows == 0 {
        total_rows.max(1)
    } else {
        chunk_rows
    };

    let mut offset = 0;
    while offset < total_rows {
        let end = (offset + chunk_size).min(total_rows);
        let chunk = df.slice(offset as i64, end - offset);
        processor(offset, chunk)?;
        offset = end;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables;

    #[test]
    fn chunks_cover_every_row_once() {
        let df = DataFrame::new(vec![
            Series::new("x".into(), (0..10).collect::<Vec<i64>>()).into(),
        ])
        .unwrap();
        let mut seen = Vec::new();
        for_each_chunk(&df, 4, |offset, chunk| {
            seen.push((offset, chunk.height()));
            Ok::<(), PolarsError>(())
        })
        .unwrap();
        assert_eq!(seen, vec![(0, 4), (4, 4), (8, 2)]);
    }

    #[test]
    fn reads_projected_columns_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputevents.csv");
        std::fs::write(
            &path,
            "subject_id,stay_id,charttime,itemid,value,valueuom\n\
             1,10,2150-01-01 10:15:00,226559,150,ml\n\
             1,10,2150-01-01 11:00:00,226559,,ml\n",
        )
        .unwrap();

        let reader = RawTableReader::new(tables::OUTPUTEVENTS, &path, ReadOptions::default());
        let df = reader.read().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 4);
        assert_eq!(df.column("value").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn item_filter_is_applied_while_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chartevents.csv");
        std::fs::write(
            &path,
            "subject_id,stay_id,itemid,charttime,valuenum,warning\n\
             1,10,220045,2150-01-01 10:15:00,80,0\n\
             1,10,220277,2150-01-01 10:15:00,97,0\n\
             1,10,bad,2150-01-01 10:20:00,70,0\n\
             1,10,226512,2150-01-01 10:30:00,72.5,0\n",
        )
        .unwrap();

        let reader = RawTableReader::new(tables::CHARTEVENTS, &path, ReadOptions::default());
        let df = reader.read_items("itemid", [220045, 226512]).unwrap();
        assert_eq!(df.width(), tables::CHARTEVENTS.columns.len());
        let items: Vec<Option<&str>> = df.column("itemid").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(items, vec![Some("220045"), Some("226512")]);
        assert_eq!(reader.read().unwrap().height(), 4);
    }

    #[test]
    fn low_memory_scan_reads_the_same_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputevents.csv");
        std::fs::write(
            &path,
            "stay_id,charttime,itemid,value\n\
             10,2150-01-01 10:15:00,226559,150\n\
             10,2150-01-01 11:15:00,226560,20\n",
        )
        .unwrap();

        let options = ReadOptions::default().with_low_memory(true);
        let reader = RawTableReader::new(tables::OUTPUTEVENTS, &path, options);
        assert!(reader.options().low_memory);
        let df = reader.read_items("itemid", [226559]).unwrap();
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputevents.csv");
        std::fs::write(&path, "stay_id,itemid\n10,226559\n").unwrap();

        let reader = RawTableReader::new(tables::OUTPUTEVENTS, &path, ReadOptions::default());
        assert!(matches!(
            reader.read(),
            Err(IngestError::MissingColumn { ref column, .. }) if column == "charttime"
        ));
    }

    #[test]
    fn zero_byte_file_reads_as_empty_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inputevents.csv");
        std::fs::write(&path, "").unwrap();

        let reader = RawTableReader::new(tables::INPUTEVENTS, &path, ReadOptions::default());
        let df = reader.read().unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), tables::INPUTEVENTS.columns.len());
    }
}

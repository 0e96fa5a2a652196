//! Chunked reader for depth-keyed CSV files.
//!
//! Expected layout: a header row, then one row per frame with the depth in
//! the first column and `source_width` pixel values after it:
//!
//! ```text
//! depth,col1,col2,...,col200
//! 9000.1,12,15,...,201
//! ```
//!
//! Empty pixel fields read as NaN (and end up clamped to 0). Rows that do not
//! parse are reported per row instead of failing the file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{FrameError, Result};

/// A parsed data row.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    /// 1-based line number in the file.
    pub line: usize,
    pub depth: f64,
    pub values: Vec<f64>,
}

/// A data row that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub line: usize,
    pub message: String,
}

/// Up to `chunk_size` consecutive data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvChunk {
    pub rows: Vec<CsvRow>,
    pub failures: Vec<RowFailure>,
}

impl CsvChunk {
    /// Data rows read, parsed or not.
    pub fn len(&self) -> usize {
        self.rows.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest and largest parsed depth in the chunk.
    pub fn depth_range(&self) -> Option<(f64, f64)> {
        self.rows.iter().map(|row| row.depth).fold(None, |acc, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
    }
}

/// Streams a CSV file as chunks of rows.
pub struct CsvFrameReader<R> {
    reader: R,
    source_width: usize,
    chunk_size: usize,
    columns: Vec<String>,
    line: usize,
    buf: String,
    done: bool,
}

impl CsvFrameReader<BufReader<File>> {
    /// Open a CSV file and validate its header.
    pub fn open(path: &Path, source_width: usize, chunk_size: usize) -> Result<Self> {
        let file = File::open(path).map_err(|e| FrameError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to open CSV: {}", e),
        })?;
        Self::new(BufReader::new(file), source_width, chunk_size)
    }
}

impl<R: BufRead> CsvFrameReader<R> {
    /// Read the header and check it has one depth column plus `source_width`
    /// pixel columns.
    pub fn new(mut reader: R, source_width: usize, chunk_size: usize) -> Result<Self> {
        let mut header = String::new();
        let read = reader.read_line(&mut header)?;
        if read == 0 || header.trim().is_empty() {
            return Err(FrameError::Parse {
                message: "CSV file has no header row".to_string(),
                help: Some("The first line must name the depth and pixel columns".to_string()),
            });
        }

        let columns: Vec<String> = header
            .trim_end_matches(['\r', '\n'])
            .split(',')
            .map(|c| c.trim().to_string())
            .collect();

        let pixel_columns = columns.len().saturating_sub(1);
        if pixel_columns != source_width {
            return Err(FrameError::ShapeMismatch {
                expected: source_width,
                actual: pixel_columns,
            });
        }

        Ok(Self {
            reader,
            source_width,
            chunk_size: chunk_size.max(1),
            columns,
            line: 1,
            buf: String::new(),
            done: false,
        })
    }

    /// Header column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Read the next chunk. `Ok(None)` once the file is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<CsvChunk>> {
        let mut chunk = CsvChunk::default();

        while !self.done && chunk.len() < self.chunk_size {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                self.done = true;
                break;
            }
            self.line += 1;

            let text = self.buf.trim_end_matches(['\r', '\n']);
            if text.trim().is_empty() {
                continue;
            }

            match parse_row(text, self.source_width) {
                Ok((depth, values)) => chunk.rows.push(CsvRow {
                    line: self.line,
                    depth,
                    values,
                }),
                Err(message) => chunk.failures.push(RowFailure {
                    line: self.line,
                    message,
                }),
            }
        }

        Ok((!chunk.is_empty()).then_some(chunk))
    }
}

impl<R: BufRead> Iterator for CsvFrameReader<R> {
    type Item = Result<CsvChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn parse_row(text: &str, source_width: usize) -> std::result::Result<(f64, Vec<f64>), String> {
    let mut fields = text.split(',').map(str::trim);

    let depth_field = fields.next().unwrap_or_default();
    let depth: f64 = depth_field
        .parse()
        .map_err(|_| format!("invalid depth {:?}", depth_field))?;
    if !depth.is_finite() {
        return Err(format!("depth {:?} is not finite", depth_field));
    }

    let values = fields
        .map(|field| {
            if field.is_empty() {
                Ok(f64::NAN)
            } else {
                field
                    .parse::<f64>()
                    .map_err(|_| format!("invalid pixel value {:?}", field))
            }
        })
        .collect::<std::result::Result<Vec<f64>, String>>()?;

    if values.len() != source_width {
        return Err(format!(
            "expected {} pixel values, got {}",
            source_width,
            values.len()
        ));
    }

    Ok((depth, values))
}

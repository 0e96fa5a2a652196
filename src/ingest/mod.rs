//! CSV ingestion: read rows in chunks, turn them into frames, upsert them.

mod reader;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{FrameError, Result};
use crate::render::{default_workers, FramePipeline};
use crate::store::{Frame, FrameStore};

pub use reader::{CsvChunk, CsvFrameReader, CsvRow, RowFailure};

/// Default number of rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Chunks between progress log events.
const PROGRESS_EVERY: usize = 10;

/// Summary of one ingested file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub path: PathBuf,
    /// Data rows read, including failed ones.
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub frames_upserted: usize,
    pub chunks_processed: usize,
    /// Pixel samples clamped into `[0, 255]` across all frames.
    pub clamped_samples: usize,
    pub duration_seconds: f64,
    pub rows_per_second: f64,
}

/// Drives CSV files through a [`FramePipeline`] into a [`FrameStore`].
#[derive(Debug, Clone)]
pub struct Ingestor {
    pipeline: Arc<FramePipeline>,
    chunk_size: usize,
    workers: usize,
}

impl Ingestor {
    pub fn new(pipeline: FramePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: default_workers(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Ingest one CSV file.
    ///
    /// Rows that fail to parse or process are skipped and counted; the file
    /// only fails as a whole when its header is wrong or I/O breaks. Reading
    /// and encoding run on the blocking pool; only the upserts are awaited on
    /// the runtime.
    pub async fn ingest_file(&self, path: &Path, store: &dyn FrameStore) -> Result<IngestReport> {
        let started = Instant::now();
        let source_width = self.pipeline.config().source_width;
        let chunk_size = self.chunk_size;
        let mut reader = {
            let path = path.to_path_buf();
            run_blocking(move || CsvFrameReader::open(&path, source_width, chunk_size)).await??
        };

        tracing::info!(
            path = %path.display(),
            chunk_size,
            source_width,
            target_width = self.pipeline.config().target_width,
            "starting ingest"
        );

        let mut report = IngestReport {
            path: path.to_path_buf(),
            rows_processed: 0,
            rows_failed: 0,
            frames_upserted: 0,
            chunks_processed: 0,
            clamped_samples: 0,
            duration_seconds: 0.0,
            rows_per_second: 0.0,
        };

        loop {
            let pipeline = Arc::clone(&self.pipeline);
            let workers = self.workers;
            let (returned, step) = run_blocking(move || {
                let step = reader.next_chunk().and_then(|chunk| {
                    chunk
                        .map(|chunk| {
                            let processed = process_chunk(&pipeline, workers, &chunk)?;
                            Ok::<_, FrameError>((chunk, processed))
                        })
                        .transpose()
                });
                (reader, step)
            })
            .await?;
            reader = returned;

            let Some((chunk, processed)) = step? else {
                break;
            };
            report.chunks_processed += 1;
            report.rows_processed += chunk.len();

            for failure in &chunk.failures {
                tracing::warn!(line = failure.line, reason = %failure.message, "skipping row");
            }
            report.rows_failed += chunk.failures.len() + processed.failed;
            report.clamped_samples += processed.clamped;
            report.frames_upserted += store.upsert_frames(processed.frames).await?;

            tracing::debug!(
                chunk = report.chunks_processed,
                rows = chunk.len(),
                depth_range = ?chunk.depth_range(),
                "processed chunk"
            );

            if report.chunks_processed % PROGRESS_EVERY == 0 {
                let elapsed = started.elapsed().as_secs_f64();
                tracing::info!(
                    rows_processed = report.rows_processed,
                    chunks_processed = report.chunks_processed,
                    rows_per_second = rate(report.rows_processed, elapsed),
                    "ingest progress"
                );
            }
        }

        report.duration_seconds = started.elapsed().as_secs_f64();
        report.rows_per_second = rate(report.rows_processed, report.duration_seconds);

        tracing::info!(
            path = %path.display(),
            rows_processed = report.rows_processed,
            rows_failed = report.rows_failed,
            frames_upserted = report.frames_upserted,
            duration_seconds = report.duration_seconds,
            "ingest complete"
        );

        Ok(report)
    }

    /// Ingest every CSV file found under `paths`, in discovery order.
    pub async fn ingest_paths(
        &self,
        paths: &[PathBuf],
        store: &dyn FrameStore,
    ) -> Result<Vec<IngestReport>> {
        let mut reports = Vec::new();
        for file in discover_csv_files(paths)? {
            reports.push(self.ingest_file(&file, store).await?);
        }
        Ok(reports)
    }
}

/// Encoded output of one chunk.
#[derive(Debug)]
struct ProcessedChunk {
    frames: Vec<Frame>,
    /// Rows the pipeline rejected.
    failed: usize,
    clamped: usize,
}

/// Encode a chunk's rows in parallel.
fn process_chunk(
    pipeline: &FramePipeline,
    workers: usize,
    chunk: &CsvChunk,
) -> Result<ProcessedChunk> {
    let values: Vec<&[f64]> = chunk.rows.iter().map(|row| row.values.as_slice()).collect();
    let results = pipeline.process_many(&values, workers);

    let mut processed = ProcessedChunk {
        frames: Vec::with_capacity(results.len()),
        failed: 0,
        clamped: 0,
    };

    for (row, result) in chunk.rows.iter().zip(results) {
        match result {
            Ok(encoded) => {
                processed.clamped += encoded.clamped;
                processed.frames.push(Frame::from_encoded(row.depth, encoded));
            }
            Err(e) if e.is_row_error() => {
                tracing::warn!(line = row.line, depth = row.depth, error = %e, "failed to process row");
                processed.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(processed)
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FrameError::Task {
            message: e.to_string(),
        })
}

fn rate(rows: usize, seconds: f64) -> f64 {
    if seconds > 0.0 {
        rows as f64 / seconds
    } else {
        0.0
    }
}

/// Expand files and directories into a sorted list of `.csv` files.
///
/// Files named explicitly are kept whatever their extension; directories are
/// walked recursively for `*.csv`.
pub fn discover_csv_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            return Err(FrameError::Io {
                path: path.clone(),
                message: "No such file or directory".to_string(),
            });
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::is_png;
    use crate::store::{FrameQuery, MemoryFrameStore};
    use std::fmt::Write as _;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::tempdir;

    fn csv(rows: &[(f64, f64)], width: usize) -> String {
        let mut text = String::from("depth");
        for i in 1..=width {
            let _ = write!(text, ",col{}", i);
        }
        text.push('\n');
        for (depth, value) in rows {
            let _ = write!(text, "{}", depth);
            for _ in 0..width {
                let _ = write!(text, ",{}", value);
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test]
    async fn test_ingest_file_upserts_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frames.csv");
        std::fs::write(&path, csv(&[(100.0, 10.0), (100.5, 300.0), (101.0, 128.0)], 200)).unwrap();

        let store = MemoryFrameStore::new();
        let ingestor = Ingestor::new(FramePipeline::default()).with_chunk_size(2);
        let report = ingestor.ingest_file(&path, &store).await.unwrap();

        assert_eq!(report.rows_processed, 3);
        assert_eq!(report.rows_failed, 0);
        assert_eq!(report.frames_upserted, 3);
        assert_eq!(report.chunks_processed, 2);
        assert_eq!(report.clamped_samples, 200);

        let frame = store.get_frame(100.5).await.unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (150, 1));
        assert!(is_png(&frame.png));
    }

    #[tokio::test]
    async fn test_bad_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frames.csv");
        let mut text = csv(&[(1.0, 5.0)], 4);
        text.push_str("oops,1,2,3,4\n2.0,1,2\n");
        std::fs::write(&path, text).unwrap();

        let store = MemoryFrameStore::new();
        let pipeline = FramePipeline::new(
            crate::render::PipelineConfig {
                source_width: 4,
                target_width: 3,
                ..Default::default()
            },
            crate::colour::ColorLut::default(),
        );
        let report = Ingestor::new(pipeline)
            .with_workers(1)
            .ingest_file(&path, &store)
            .await
            .unwrap();

        assert_eq!(report.rows_processed, 3);
        assert_eq!(report.rows_failed, 2);
        assert_eq!(report.frames_upserted, 1);
    }

    #[tokio::test]
    async fn test_wrong_header_fails_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("narrow.csv");
        std::fs::write(&path, csv(&[(1.0, 5.0)], 10)).unwrap();

        let store = MemoryFrameStore::new();
        let err = Ingestor::new(FramePipeline::default())
            .ingest_file(&path, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::ShapeMismatch { expected: 200, actual: 10 }));
    }

    /// Records whether a concurrently spawned task had run by the time of the
    /// first upsert.
    struct WatchingStore {
        inner: MemoryFrameStore,
        ticked: Arc<AtomicBool>,
        ticked_before_upsert: AtomicBool,
    }

    #[async_trait::async_trait]
    impl FrameStore for WatchingStore {
        async fn upsert_frames(&self, frames: Vec<Frame>) -> Result<usize> {
            if self.ticked.load(Ordering::SeqCst) {
                self.ticked_before_upsert.store(true, Ordering::SeqCst);
            }
            self.inner.upsert_frames(frames).await
        }

        async fn get_frame(&self, depth: f64) -> Result<Option<Frame>> {
            self.inner.get_frame(depth).await
        }

        async fn frames_in_range(&self, query: &FrameQuery) -> Result<Vec<Frame>> {
            self.inner.frames_in_range(query).await
        }

        async fn count_frames(&self, depth_min: Option<f64>, depth_max: Option<f64>) -> Result<usize> {
            self.inner.count_frames(depth_min, depth_max).await
        }

        async fn depth_bounds(&self) -> Result<Option<(f64, f64)>> {
            self.inner.depth_bounds().await
        }

        async fn delete_frame(&self, depth: f64) -> Result<bool> {
            self.inner.delete_frame(depth).await
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_ingest_leaves_runtime_free_while_encoding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frames.csv");
        let rows: Vec<(f64, f64)> = (0..50).map(|i| (i as f64, 100.0)).collect();
        std::fs::write(&path, csv(&rows, 200)).unwrap();

        let ticked = Arc::new(AtomicBool::new(false));
        let store = WatchingStore {
            inner: MemoryFrameStore::new(),
            ticked: Arc::clone(&ticked),
            ticked_before_upsert: AtomicBool::new(false),
        };
        let ticker = tokio::spawn({
            let ticked = Arc::clone(&ticked);
            async move { ticked.store(true, Ordering::SeqCst) }
        });

        let report = Ingestor::new(FramePipeline::default())
            .ingest_file(&path, &store)
            .await
            .unwrap();
        ticker.await.unwrap();

        assert_eq!(report.frames_upserted, 50);
        assert!(store.ticked_before_upsert.load(Ordering::SeqCst));
    }

    #[test]
    fn test_discover_csv_files() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.csv"), "").unwrap();
        std::fs::write(dir.path().join("nested/a.CSV"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = discover_csv_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.csv", "a.CSV"]);

        assert!(discover_csv_files(&[dir.path().join("missing")]).is_err());
    }
}

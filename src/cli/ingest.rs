//! Ingest command implementation.
//!
//! Reads CSV files, encodes every row into a PNG frame and upserts the
//! frames into the directory store.

use std::path::{Path, PathBuf};

use clap::Args;

use crate::config::Settings;
use crate::error::Result;
use crate::ingest::{discover_csv_files, IngestReport, Ingestor};
use crate::output::Printer;
use crate::render::{FramePipeline, ResampleFilter};
use crate::store::DirectoryFrameStore;

/// Ingest CSV files into the frame store
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// CSV files or directories to scan for *.csv
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Frame store directory
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Rows processed per batch
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Pixel columns per row
    #[arg(long)]
    pub source_width: Option<usize>,

    /// Width of encoded frames
    #[arg(long)]
    pub target_width: Option<u32>,

    /// Resampling filter
    #[arg(long, value_enum)]
    pub filter: Option<ResampleFilter>,

    /// Print ingest reports as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl IngestArgs {
    /// Apply command line overrides on top of file settings.
    fn apply(&self, mut settings: Settings) -> Result<Settings> {
        if let Some(store) = &self.store {
            settings.store = store.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            settings.chunk_size = chunk_size;
        }
        if let Some(source_width) = self.source_width {
            settings.source_width = source_width;
        }
        if let Some(target_width) = self.target_width {
            settings.target_width = target_width;
        }
        if let Some(filter) = self.filter {
            settings.filter = filter;
        }
        settings.validate()?;
        Ok(settings)
    }
}

pub async fn run(args: IngestArgs, config: Option<&Path>, printer: &Printer) -> Result<()> {
    let settings = args.apply(super::load_settings(config)?)?;

    let files = discover_csv_files(&args.paths)?;
    if files.is_empty() {
        printer.no_input();
        return Ok(());
    }

    let store = DirectoryFrameStore::open(&settings.store).await?;
    let pipeline = FramePipeline::new(settings.pipeline_config(), settings.lut()?);
    let ingestor = Ingestor::new(pipeline).with_chunk_size(settings.chunk_size);

    let mut reports: Vec<IngestReport> = Vec::with_capacity(files.len());
    for file in &files {
        printer.ingesting(file);
        let report = ingestor.ingest_file(file, &store).await?;
        printer.ingest_report(&report);
        reports.push(report);
    }

    let frames: usize = reports.iter().map(|r| r.frames_upserted).sum();
    printer.ingest_finished(frames, &settings.store);

    if args.json {
        printer.json(&reports)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> IngestArgs {
        IngestArgs {
            paths: vec![PathBuf::from("data")],
            store: None,
            chunk_size: None,
            source_width: None,
            target_width: None,
            filter: None,
            json: false,
        }
    }

    #[test]
    fn test_overrides_win_over_settings() {
        let args = IngestArgs {
            store: Some(PathBuf::from("out")),
            chunk_size: Some(50),
            filter: Some(ResampleFilter::Nearest),
            ..args()
        };
        let settings = args.apply(Settings::default()).unwrap();
        assert_eq!(settings.store, PathBuf::from("out"));
        assert_eq!(settings.chunk_size, 50);
        assert_eq!(settings.filter, ResampleFilter::Nearest);
        assert_eq!(settings.target_width, 150);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = IngestArgs {
            chunk_size: Some(0),
            ..args()
        };
        assert!(args.apply(Settings::default()).is_err());
    }
}

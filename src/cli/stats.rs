use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;

use crate::error::Result;
use crate::output::Printer;
use crate::service::FrameService;
use crate::store::DirectoryFrameStore;

/// Show frame count and depth range of the store
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Frame store directory
    #[arg(long)]
    pub store: Option<PathBuf>,
}

pub async fn run(args: StatsArgs, config: Option<&Path>, printer: &Printer) -> Result<()> {
    let settings = super::load_settings(config)?;
    let store_dir = args.store.unwrap_or(settings.store);
    let store = DirectoryFrameStore::open(&store_dir).await?;
    let service = FrameService::new(Arc::new(store), &settings.cache);

    let health = service.health().await?;
    printer.store_summary(&health, &store_dir);
    printer.json(&health)?;

    Ok(())
}

use clap::Parser;
use depthframe::cli::{Cli, Commands};
use depthframe::logging;
use depthframe::output::Printer;
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let printer = Printer::new();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Ingest(args) => depthframe::cli::ingest::run(args, config, &printer).await?,
        Commands::Query(args) => depthframe::cli::query::run(args, config, &printer).await?,
        Commands::Colormap(args) => depthframe::cli::colormap::run(args, config, &printer)?,
        Commands::Stats(args) => depthframe::cli::stats::run(args, config, &printer).await?,
        Commands::Completions(args) => depthframe::cli::completions::run(args)?,
    }

    Ok(())
}

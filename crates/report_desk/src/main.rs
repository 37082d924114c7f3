use app::AppBuilder;
use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use report_desk::cli::{self, Cli};
use report_desk::{errors, ReportDesk};

#[tokio::main]
async fn main() -> Result<()> {
    errors::init()?;
    let args = Cli::parse();
    let ctx = AppBuilder::<ReportDesk>::new(env!("CARGO_PKG_VERSION"))
        .with_console(args.verbose)
        .build()
        .map_err(|err| eyre!("initialisation failed: {err}"))?;
    cli::run(args, &ctx).await
}

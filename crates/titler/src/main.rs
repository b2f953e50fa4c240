use crate::prelude::*;
use clap::Parser;

mod error;
mod inspect;
mod ocr;
mod pipeline;
mod prelude;
mod rename;
mod settings;
mod translate;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Rename PDF files after the title found on their first page"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Pipeline configuration file (TOML)
    #[clap(long, env = "TITLER_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Translation endpoint (LibreTranslate compatible)
    #[clap(long, env = "TITLER_TRANSLATE_URL", global = true)]
    translate_url: Option<String>,

    /// API key sent to the translation endpoint
    #[clap(long, env = "TITLER_TRANSLATE_API_KEY", global = true, hide_env_values = true)]
    translate_api_key: Option<String>,

    /// Whether to display additional information.
    #[clap(long, env = "TITLER_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Copy PDFs into a directory under names taken from their titles
    Rename(crate::rename::RenameOptions),

    /// Show the title extraction result for a single PDF
    Inspect(crate::inspect::InspectOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Rename(options) => crate::rename::run(options, app.global).await,
        SubCommands::Inspect(options) => crate::inspect::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}

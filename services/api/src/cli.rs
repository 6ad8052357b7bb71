use crate::demo::{run_catalog_check, run_catalog_show, run_demo, CatalogArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use clinic_modules::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Clinic Module Manager",
    about = "Serve and exercise the clinic module activation engine from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect or verify a module catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Apply a sequence of module toggles for one tenant and print the cascade
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Verify the catalog builds a dependency graph (no dangling ids, no cycles)
    Check(CatalogArgs),
    /// Print each module with its dependencies, dependents, and activation order
    Show(CatalogArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Catalog {
            command: CatalogCommand::Check(args),
        } => run_catalog_check(args),
        Command::Catalog {
            command: CatalogCommand::Show(args),
        } => run_catalog_show(args),
        Command::Demo(args) => run_demo(args),
    }
}

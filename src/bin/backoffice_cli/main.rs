//! backoffice-cli: headless client for the storefront admin API.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod io;
mod print;


use clap::Parser;
use tracing::error;

use backoffice::config;
use backoffice::domain::resources::{
    Categories, News, Orders, Pages, Products, Recipes, Recruitment, Users,
};
use backoffice::infra::telemetry;

use args::{Cli, Commands};
use client::{CliError, Ctx, build_ctx};
use handlers::{content, resources, session};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = config::load(&cli.overrides)?;
    telemetry::init(&settings.logging)?;
    let ctx = build_ctx(&settings)?;

    let result = run(&ctx, cli.command).await;
    if let Err(err) = &result {
        error!(error = %err, "command failed");
    }
    result
}

async fn run(ctx: &Ctx, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Session(cmd) => session::handle(ctx, cmd.action)?,
        Commands::Orders(cmd) => resources::handle::<Orders>(ctx, cmd.action).await?,
        Commands::Products(cmd) => resources::handle::<Products>(ctx, cmd.action).await?,
        Commands::Recipes(cmd) => resources::handle::<Recipes>(ctx, cmd.action).await?,
        Commands::News(cmd) => resources::handle::<News>(ctx, cmd.action).await?,
        Commands::Categories(cmd) => resources::handle::<Categories>(ctx, cmd.action).await?,
        Commands::Recruitment(cmd) => resources::handle::<Recruitment>(ctx, cmd.action).await?,
        Commands::Users(cmd) => resources::handle::<Users>(ctx, cmd.action).await?,
        Commands::Pages(cmd) => resources::handle::<Pages>(ctx, cmd.action).await?,
        Commands::Content(cmd) => content::handle(ctx, cmd.action).await?,
    }

    Ok(())
}

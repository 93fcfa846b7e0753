//! Command-line surface for `backoffice-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use backoffice::config::Overrides;

#[derive(Parser, Debug)]
#[command(
    name = "backoffice-cli",
    version,
    about = "Storefront back-office API client",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stored bearer token
    Session(SessionArgs),
    /// Orders (status filter)
    Orders(ResourceArgs),
    /// Products (category filter)
    Products(ResourceArgs),
    /// Recipes (category filter)
    Recipes(ResourceArgs),
    /// News (type and category filters)
    News(ResourceArgs),
    /// Categories (single page of up to 100)
    Categories(ResourceArgs),
    /// Job postings (status filter)
    Recruitment(ResourceArgs),
    /// Back-office users (role filter)
    Users(ResourceArgs),
    /// Static pages
    Pages(ResourceArgs),
    /// Rich-text helpers
    Content(ContentArgs),
}

#[derive(Parser, Debug)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub action: SessionCmd,
}

#[derive(Subcommand, Debug)]
pub enum SessionCmd {
    /// Store a bearer token for later commands
    SetToken {
        /// File containing the token (takes precedence over env)
        #[arg(long)]
        token_file: Option<PathBuf>,
        /// Token from env (no flag so it never lands in shell history)
        #[arg(hide = true, env = "BACKOFFICE_TOKEN")]
        token_env: Option<String>,
    },
    /// Show whether a token is stored and when it expires
    Show,
    /// Forget the stored token
    Clear,
}

#[derive(Parser, Debug)]
pub struct ResourceArgs {
    #[command(subcommand)]
    pub action: ResourceCmd,
}

#[derive(Subcommand, Debug)]
pub enum ResourceCmd {
    /// List one page, driven by URL-style parameters
    List(ListArgs),
    /// Fetch one record
    Get { id: i64 },
    /// Create a record from a JSON object
    Create {
        #[arg(long)]
        data_file: PathBuf,
    },
    /// Replace a record with a JSON object
    Update {
        id: i64,
        #[arg(long)]
        data_file: PathBuf,
    },
    /// Delete a record
    Delete { id: i64 },
}

#[derive(Args, Debug, Default, Clone)]
pub struct ListArgs {
    /// Starting query string, e.g. `keyword=ao&page=2`
    #[arg(long)]
    pub query: Option<String>,

    /// Filter to merge into the parameters; a blank value removes the key
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// Parameter key to remove
    #[arg(long = "remove", value_name = "KEY")]
    pub remove: Vec<String>,

    /// 1-based page to show
    #[arg(long)]
    pub page: Option<u32>,

    /// Print the page as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ContentArgs {
    #[command(subcommand)]
    pub action: ContentCmd,
}

#[derive(Subcommand, Debug)]
pub enum ContentCmd {
    /// Print editor HTML with unsafe markup removed
    Sanitize { file: PathBuf },
    /// Add heading anchors and print the outline as JSON
    Toc { file: PathBuf },
    /// Upload an image the way the editor does
    Upload { file: PathBuf },
}

pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

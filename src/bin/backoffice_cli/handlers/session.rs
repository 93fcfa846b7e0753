#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::args::SessionCmd;
use crate::client::{CliError, Ctx};
use crate::io::read_text;
use crate::print::print_json;

pub fn handle(ctx: &Ctx, cmd: SessionCmd) -> Result<(), CliError> {
    match cmd {
        SessionCmd::SetToken {
            token_file,
            token_env,
        } => set_token(ctx, token_file, token_env),
        SessionCmd::Show => show(ctx),
        SessionCmd::Clear => {
            ctx.session.clear()?;
            println!("session cleared");
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionInfo {
    signed_in: bool,
    token_preview: Option<String>,
    expires_at: Option<String>,
    expired: bool,
    file: Option<String>,
    login_path: String,
}

fn set_token(
    ctx: &Ctx,
    token_file: Option<PathBuf>,
    token_env: Option<String>,
) -> Result<(), CliError> {
    let token = match token_file {
        Some(path) => read_text(&path)?,
        None => token_env.ok_or(CliError::MissingToken)?,
    };
    ctx.session.save(&token)?;
    println!("session saved");
    Ok(())
}

fn show(ctx: &Ctx) -> Result<(), CliError> {
    let token = ctx.session.token();
    let expires_at = ctx.session.expires_at();
    let info = SessionInfo {
        signed_in: token.is_some(),
        token_preview: token.as_deref().map(preview),
        expires_at: expires_at
            .map(|at| at.format(&Rfc3339))
            .transpose()
            .map_err(|e| CliError::InvalidInput(e.to_string()))?,
        expired: expires_at.is_some_and(|at| at <= OffsetDateTime::now_utc()),
        file: ctx.session.file().map(|p| p.display().to_string()),
        login_path: ctx.session.login_path().to_string(),
    };
    print_json(&info)
}

fn preview(token: &str) -> String {
    let head: String = token.chars().take(8).collect();
    format!("{head}…")
}

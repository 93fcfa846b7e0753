#![deny(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use bytes::Bytes;

use backoffice::application::content::{EditorSession, UploadOutcome, extract_toc, sanitize_html};

use crate::args::ContentCmd;
use crate::client::{CliError, Ctx};
use crate::io::{file_name, read_bytes, read_text};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: ContentCmd) -> Result<(), CliError> {
    match cmd {
        ContentCmd::Sanitize { file } => {
            println!("{}", sanitize_html(&read_text(&file)?));
            Ok(())
        }
        ContentCmd::Toc { file } => {
            let doc = extract_toc(&sanitize_html(&read_text(&file)?))?;
            print_json(&doc)
        }
        ContentCmd::Upload { file } => {
            let bytes = Bytes::from(read_bytes(&file)?);
            let editor = EditorSession::open(Arc::clone(&ctx.client));
            let outcome = editor.upload_image(&file_name(&file), bytes).await?;
            editor.close();
            match outcome {
                UploadOutcome::Inserted(image) => print_json(&image),
                UploadOutcome::Discarded => Err(CliError::InvalidInput(
                    "upload finished after the editor closed".to_string(),
                )),
            }
        }
    }
}

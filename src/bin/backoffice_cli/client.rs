#![deny(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use thiserror::Error;

use backoffice::application::content::ContentError;
use backoffice::application::error::ApiError;
use backoffice::application::fetcher::ListFetcher;
use backoffice::application::filters::FilterError;
use backoffice::application::records::RecordService;
use backoffice::application::session::{Session, SessionError};
use backoffice::config::{LoadError, Settings};
use backoffice::infra::error::InfraError;
use backoffice::infra::http::ApiClient;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("request failed: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("token is required (use --token-file or BACKOFFICE_TOKEN)")]
    MissingToken,
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("{message}")]
    Load { message: String },
    #[error("session expired; sign in again at {login_path}")]
    SessionExpired { login_path: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Everything a command needs, built once per invocation.
pub struct Ctx {
    pub session: Arc<Session>,
    pub client: Arc<ApiClient>,
    pub records: RecordService<ApiClient>,
}

impl Ctx {
    pub fn new(settings: &Settings, session: Arc<Session>) -> Result<Self, CliError> {
        let client = Arc::new(ApiClient::new(&settings.api, Arc::clone(&session))?);
        let fetcher = ListFetcher::new(Arc::clone(&client), &settings.cache);
        Ok(Self {
            records: RecordService::new(fetcher),
            session,
            client,
        })
    }

    pub fn fetcher(&self) -> &ListFetcher<ApiClient> {
        self.records.fetcher()
    }
}

pub fn build_ctx(settings: &Settings) -> Result<Ctx, CliError> {
    let session = Arc::new(Session::load(&settings.session));
    Ctx::new(settings, session)
}

//! List screen state machine.
//!
//! A [`ListScreen`] turns parameter changes into fetches and fetch outcomes
//! into a renderable [`ScreenState`]. Each load takes a scope ticket; an
//! outcome is applied only while its ticket is current, so a slow response
//! can never overwrite a newer one or touch an unmounted screen.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::error::{ApiError, ErrorPlaceholder};
use crate::application::fetcher::{ListFetcher, ListQuery};
use crate::application::pagination::{Pager, ResultPage};
use crate::application::params::ParamSet;
use crate::application::scope::Scope;
use crate::application::session::Session;
use crate::application::transport::Transport;
use crate::domain::resources::Resource;

/// Successfully loaded page plus derived navigation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListView<T> {
    pub page: ResultPage<T>,
    pub pager: Pager,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenState<T> {
    Idle,
    Loading { query: ListQuery },
    Success(ListView<T>),
    Error(ErrorPlaceholder),
    /// The server rejected the session; the user must sign in again.
    SessionExpired { login_path: String },
}

impl<T> ScreenState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// Superseded by a newer load or the screen was unmounted.
    Stale,
}

pub struct ListScreen<R: Resource, T> {
    fetcher: ListFetcher<T>,
    session: Arc<Session>,
    scope: Scope,
    state: watch::Sender<ScreenState<R::Record>>,
    resource: PhantomData<R>,
}

impl<R: Resource, T: Transport> ListScreen<R, T> {
    pub fn new(fetcher: ListFetcher<T>, session: Arc<Session>) -> Self {
        let (state, _) = watch::channel(ScreenState::Idle);
        Self {
            fetcher,
            session,
            scope: Scope::new(),
            state,
            resource: PhantomData,
        }
    }

    pub fn state(&self) -> ScreenState<R::Record> {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ScreenState<R::Record>> {
        self.state.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        !self.scope.is_closed()
    }

    /// Load the page selected by `params` and publish the outcome.
    pub async fn load(&self, params: &ParamSet) -> LoadOutcome {
        let query = ListQuery::for_resource(&R::SPEC, params);
        let ticket = self.scope.ticket();
        if !self.scope.is_current(ticket) {
            return LoadOutcome::Stale;
        }
        self.state.send_replace(ScreenState::Loading {
            query: query.clone(),
        });

        let result = self.fetcher.fetch::<R>(params).await;

        if !self.scope.is_current(ticket) {
            debug!(resource = R::SPEC.name, "discarding superseded list response");
            return LoadOutcome::Stale;
        }
        let next = self.settle(result);
        self.state.send_replace(next);
        LoadOutcome::Applied
    }

    /// Reload whenever the request-relevant part of the parameters changes.
    /// Returns when the screen is unmounted or the parameter source goes away.
    pub async fn follow(&self, mut params: watch::Receiver<ParamSet>) {
        let mut last: Option<ListQuery> = None;
        loop {
            let current = params.borrow_and_update().clone();
            let query = ListQuery::for_resource(&R::SPEC, &current);
            if last.as_ref() != Some(&query) {
                last = Some(query);
                tokio::select! {
                    _ = self.load(&current) => {}
                    () = self.scope.closed() => return,
                }
            }
            tokio::select! {
                changed = params.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                () = self.scope.closed() => return,
            }
        }
    }

    /// Stop applying results. In-flight requests still complete and fill the cache.
    pub fn unmount(&self) {
        self.scope.close();
        debug!(resource = R::SPEC.name, "list screen unmounted");
    }

    fn settle(
        &self,
        result: Result<ResultPage<R::Record>, ApiError>,
    ) -> ScreenState<R::Record> {
        match result {
            Ok(page) => {
                let pager = Pager::for_page(&page, R::SPEC.page_size);
                if pager.is_out_of_range() {
                    info!(
                        resource = R::SPEC.name,
                        page = %pager.current,
                        total_pages = pager.total_pages(),
                        "requested page is past the end"
                    );
                }
                ScreenState::Success(ListView { page, pager })
            }
            Err(err) if err.is_unauthorized() => {
                let login_path = self.session.reset();
                ScreenState::SessionExpired { login_path }
            }
            Err(err) => {
                warn!(resource = R::SPEC.name, error = %err, "list load failed");
                ScreenState::Error(ErrorPlaceholder::from_error(&err))
            }
        }
    }
}

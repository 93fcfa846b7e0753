#![deny(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use backoffice::application::error::{ApiError, GENERIC_FAILURE_MESSAGE};
use backoffice::application::filters::control_for;
use backoffice::application::pagination::PageCursor;
use backoffice::application::params::ParamStore;
use backoffice::application::screen::{ListScreen, ListView, ScreenState};
use backoffice::domain::resources::{PAGE_KEY, Resource};
use backoffice::infra::http::ApiClient;
use backoffice::presentation::table::{RowAction, TableRow, render_list, row_actions};

use crate::args::{ListArgs, ResourceCmd};
use crate::client::{CliError, Ctx};
use crate::io::read_json_object;
use crate::print::print_json;

pub async fn handle<R>(ctx: &Ctx, cmd: ResourceCmd) -> Result<(), CliError>
where
    R: Resource,
    R::Record: TableRow,
{
    match cmd {
        ResourceCmd::List(args) => list::<R>(ctx, &args).await,
        ResourceCmd::Get { id } => get::<R>(ctx, id).await,
        ResourceCmd::Create { data_file } => {
            let body = read_json_object(&data_file)?;
            let created = ctx
                .records
                .create::<R>(&body)
                .await
                .map_err(|err| api_failure(ctx, err))?;
            print_json(&created)
        }
        ResourceCmd::Update { id, data_file } => {
            let body = read_json_object(&data_file)?;
            let updated: Value = ctx
                .records
                .update::<R>(id, &body)
                .await
                .map_err(|err| api_failure(ctx, err))?;
            print_json(&updated)
        }
        ResourceCmd::Delete { id } => {
            ctx.records
                .delete::<R>(id)
                .await
                .map_err(|err| api_failure(ctx, err))?;
            println!("deleted {} {id}", R::SPEC.name);
            Ok(())
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListOutput<'a, T> {
    query: &'a str,
    page_number: PageCursor,
    total_pages: u32,
    total_elements: u64,
    rows: Vec<RowOutput<'a, T>>,
}

#[derive(Serialize)]
struct RowOutput<'a, T> {
    record: &'a T,
    actions: Vec<RowAction>,
}

impl<'a, T: TableRow> ListOutput<'a, T> {
    fn new<R: Resource>(query: &'a str, view: &'a ListView<T>) -> Self {
        Self {
            query,
            page_number: view.pager.current,
            total_pages: view.pager.total_pages(),
            total_elements: view.pager.total_elements,
            rows: view
                .page
                .content
                .iter()
                .map(|record| RowOutput {
                    record,
                    actions: row_actions(&R::SPEC, record.id()),
                })
                .collect(),
        }
    }
}

/// Seed a store from `--query`, then apply removals, merges and the page
/// in that order, so filter changes reset the page unless `--page` is given.
pub fn prepare_params<R: Resource>(args: &ListArgs) -> Result<ParamStore, CliError> {
    let store = ParamStore::from_query(args.query.as_deref().unwrap_or_default());

    if !args.remove.is_empty() {
        store.remove(&args.remove);
    }
    for (key, value) in &args.set {
        control_for(&R::SPEC, key)?.write(&store, value)?;
    }
    if let Some(page) = args.page {
        let cursor = PageCursor::new(page)
            .ok_or_else(|| CliError::InvalidInput("--page starts at 1".to_string()))?;
        if cursor == PageCursor::FIRST {
            store.remove([PAGE_KEY]);
        } else {
            store.set([(PAGE_KEY, cursor.to_string())]);
        }
    }
    Ok(store)
}

async fn list<R>(ctx: &Ctx, args: &ListArgs) -> Result<(), CliError>
where
    R: Resource,
    R::Record: TableRow,
{
    let store = prepare_params::<R>(args)?;
    let screen: ListScreen<R, ApiClient> =
        ListScreen::new(ctx.fetcher().clone(), Arc::clone(&ctx.session));
    screen.load(&store.read()).await;
    let location = store.location();

    match screen.state() {
        ScreenState::Success(view) => {
            if args.json {
                print_json(&ListOutput::new::<R>(&location, &view))?;
            } else {
                println!("{}", render_list(&R::SPEC, &view));
                if !location.is_empty() {
                    println!("query: ?{location}");
                }
            }
            Ok(())
        }
        ScreenState::Error(placeholder) => Err(CliError::Load {
            message: placeholder.message,
        }),
        ScreenState::SessionExpired { login_path } => Err(CliError::SessionExpired { login_path }),
        ScreenState::Idle | ScreenState::Loading { .. } => Err(CliError::Load {
            message: GENERIC_FAILURE_MESSAGE.to_string(),
        }),
    }
}

async fn get<R: Resource>(ctx: &Ctx, id: i64) -> Result<(), CliError> {
    let record = ctx
        .records
        .get::<R>(id)
        .await
        .map_err(|err| api_failure(ctx, err))?;
    print_json(&record)
}

/// A rejected token ends the session the same way a list load does.
fn api_failure(ctx: &Ctx, err: ApiError) -> CliError {
    if err.is_unauthorized() {
        CliError::SessionExpired {
            login_path: ctx.session.reset(),
        }
    } else {
        CliError::Api(err)
    }
}

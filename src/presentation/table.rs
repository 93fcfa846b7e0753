//! Plain-text rendering of list screens.

use backoffice_api_types::{
    CategoryRecord, NewsRecord, OrderRecord, PageRecord, ProductRecord, RecipeRecord,
    RecruitmentRecord, UserRecord,
};
use serde::Serialize;

use crate::application::screen::{ListView, ScreenState};
use crate::domain::resources::ResourceSpec;

const COLUMN_GAP: &str = "  ";
const MAX_CELL_CHARS: usize = 40;
const EMPTY_CELL: &str = "-";

/// A record that can be shown as one table row.
pub trait TableRow {
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> i64;

    /// One cell per entry of [`TableRow::COLUMNS`].
    fn cells(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAction {
    pub label: &'static str,
    pub command: String,
}

/// Commands a user can run against one row.
pub fn row_actions(spec: &ResourceSpec, id: i64) -> Vec<RowAction> {
    actions_for(spec, &id.to_string())
}

fn actions_for(spec: &ResourceSpec, id: &str) -> Vec<RowAction> {
    vec![
        RowAction {
            label: "view",
            command: format!("{} get {id}", spec.name),
        },
        RowAction {
            label: "edit",
            command: format!("{} update {id} --data-file <FILE>", spec.name),
        },
        RowAction {
            label: "delete",
            command: format!("{} delete {id}", spec.name),
        },
    ]
}

pub fn render_table<T: TableRow>(rows: &[T]) -> String {
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.cells().into_iter().map(|c| truncate(&c)).collect())
        .collect();

    let mut widths: Vec<usize> = T::COLUMNS.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = T::COLUMNS.iter().map(|h| (*h).to_string()).collect();
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format_line(&header, &widths));
    lines.push(format_line(&rule, &widths));
    for cells in &body {
        lines.push(format_line(cells, &widths));
    }
    lines.join("\n")
}

/// Table, pager summary and row action hint for a loaded page.
pub fn render_list<T: TableRow>(spec: &ResourceSpec, view: &ListView<T>) -> String {
    let pager = &view.pager;
    let mut out = if view.page.content.is_empty() {
        if pager.is_out_of_range() {
            format!(
                "no results on page {} (last page is {})",
                pager.current,
                pager.total_pages()
            )
        } else {
            "no results".to_string()
        }
    } else {
        render_table(&view.page.content)
    };

    out.push_str("\n\n");
    out.push_str(&pager.summary());
    if !view.page.content.is_empty() {
        let hint: Vec<String> = actions_for(spec, "<ID>")
            .into_iter()
            .map(|action| action.command)
            .collect();
        out.push_str("\nactions: ");
        out.push_str(&hint.join(" | "));
    }
    out
}

pub fn render_state<T: TableRow>(spec: &ResourceSpec, state: &ScreenState<T>) -> String {
    match state {
        ScreenState::Idle => String::new(),
        ScreenState::Loading { .. } => format!("loading {}…", spec.name),
        ScreenState::Success(view) => render_list(spec, view),
        ScreenState::Error(placeholder) => format!("error: {}", placeholder.message),
        ScreenState::SessionExpired { login_path } => {
            format!("session expired; sign in again at {login_path}")
        }
    }
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    padded.join(COLUMN_GAP).trim_end().to_string()
}

fn truncate(cell: &str) -> String {
    let cell = cell.replace(['\n', '\r', '\t'], " ");
    if cell.chars().count() <= MAX_CELL_CHARS {
        return cell;
    }
    let mut short: String = cell.chars().take(MAX_CELL_CHARS - 1).collect();
    short.push('…');
    short
}

fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(EMPTY_CELL)
        .to_string()
}

fn amount(value: Option<f64>) -> String {
    value.map_or_else(|| EMPTY_CELL.to_string(), |v| v.to_string())
}

fn joined(values: &[String]) -> String {
    if values.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        values.join(", ")
    }
}

impl TableRow for OrderRecord {
    const COLUMNS: &'static [&'static str] = &["ID", "CODE", "CUSTOMER", "STATUS", "TOTAL"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            or_dash(self.code.as_deref()),
            or_dash(self.customer_name.as_deref()),
            self.status.as_str().to_string(),
            amount(self.total_amount),
        ]
    }
}

impl TableRow for ProductRecord {
    const COLUMNS: &'static [&'static str] = &["ID", "NAME", "PRICE", "CATEGORIES"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            amount(self.price),
            joined(&self.category_names),
        ]
    }
}

impl TableRow for RecipeRecord {
    const COLUMNS: &'static [&'static str] = &["ID", "TITLE", "CATEGORIES"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            joined(&self.category_names),
        ]
    }
}

impl TableRow for NewsRecord {
    const COLUMNS: &'static [&'static str] = &["ID", "TITLE", "TYPE", "CATEGORIES"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            or_dash(self.news_type.as_deref()),
            joined(&self.category_names),
        ]
    }
}

impl TableRow for CategoryRecord {
    const COLUMNS: &'static [&'static str] = &["ID", "NAME", "TYPE"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            or_dash(self.category_type.as_deref()),
        ]
    }
}

impl TableRow for RecruitmentRecord {
    const COLUMNS: &'static [&'static str] = &["ID", "TITLE", "STATUS", "LOCATION"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.status.as_str().to_string(),
            or_dash(self.location.as_deref()),
        ]
    }
}

impl TableRow for UserRecord {
    const COLUMNS: &'static [&'static str] = &["ID", "USERNAME", "EMAIL", "ROLE"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.username.clone(),
            or_dash(self.email.as_deref()),
            self.role.as_str().to_string(),
        ]
    }
}

impl TableRow for PageRecord {
    const COLUMNS: &'static [&'static str] = &["ID", "TITLE", "SLUG"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            or_dash(self.slug.as_deref()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use backoffice_api_types::OrderStatus;
    use serde_json::Map;

    use super::*;
    use crate::application::error::{ApiError, ErrorPlaceholder};
    use crate::application::pagination::{PageCursor, Pager, ResultPage};
    use crate::domain::resources::{Orders, Resource};

    fn order(id: i64, customer: Option<&str>, status: OrderStatus, total: Option<f64>) -> OrderRecord {
        OrderRecord {
            id,
            code: Some(format!("DH{id}")),
            customer_name: customer.map(str::to_string),
            status,
            total_amount: total,
            attributes: Map::new(),
        }
    }

    fn view(content: Vec<OrderRecord>, total: u64, page: u32) -> ListView<OrderRecord> {
        let current = PageCursor::new(page).expect("non-zero");
        ListView {
            page: ResultPage {
                content,
                total_elements: total,
                page_number: current,
            },
            pager: Pager::new(current, total, Orders::SPEC.page_size),
        }
    }

    #[test]
    fn renders_aligned_table_with_pager() {
        let view = view(
            vec![
                order(1, Some("Nguyễn An"), OrderStatus::Pending, Some(150_000.0)),
                order(12, None, OrderStatus::Delivered, None),
            ],
            12,
            1,
        );

        insta::assert_snapshot!(render_list(&Orders::SPEC, &view), @r"
        ID  CODE  CUSTOMER   STATUS     TOTAL
        --  ----  ---------  ---------  ------
        1   DH1   Nguyễn An  PENDING    150000
        12  DH12  -          DELIVERED  -

        page 1 of 2 (12 items)
        actions: orders get <ID> | orders update <ID> --data-file <FILE> | orders delete <ID>
        ");
    }

    #[test]
    fn empty_page_says_no_results() {
        let rendered = render_list(&Orders::SPEC, &view(Vec::new(), 0, 1));
        assert_eq!(rendered, "no results\n\npage 1 of 1 (0 items)");
    }

    #[test]
    fn page_past_end_is_explained() {
        let rendered = render_list(&Orders::SPEC, &view(Vec::new(), 25, 5));
        assert!(rendered.starts_with("no results on page 5 (last page is 3)"));
    }

    #[test]
    fn long_cells_are_truncated() {
        let long = "x".repeat(60);
        let rendered = render_table(&[order(1, Some(&long), OrderStatus::Pending, None)]);
        assert!(rendered.contains(&format!("{}…", "x".repeat(39))));
        assert!(!rendered.contains(&long));
    }

    #[test]
    fn error_and_session_states_render_messages() {
        let state: ScreenState<OrderRecord> =
            ScreenState::Error(ErrorPlaceholder::from_error(&ApiError::Validation {
                status: 400,
                message: "Mã đơn không hợp lệ".to_string(),
            }));
        assert_eq!(render_state(&Orders::SPEC, &state), "error: Mã đơn không hợp lệ");

        let expired: ScreenState<OrderRecord> = ScreenState::SessionExpired {
            login_path: "/login".to_string(),
        };
        assert_eq!(
            render_state(&Orders::SPEC, &expired),
            "session expired; sign in again at /login"
        );
    }
}

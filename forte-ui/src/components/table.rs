//! Paginated, filterable, sortable table

use std::cmp::Ordering;

use super::{ComponentError, Render, SortOrder};
use crate::pagination::{calculate_pagination, Pagination};
use crate::view::escape_html;

const DEFAULT_EMPTY_MESSAGE: &str = "No results";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub key: String,
    pub label: String,
    pub sortable: bool,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            sortable: true,
        }
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }
}

/// Table over string rows
///
/// Rows hold one cell per column, in column order.
#[derive(Debug, Clone)]
pub struct TableComponent {
    id: String,
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    page: usize,
    page_size: usize,
    filter: String,
    sort: Option<(usize, SortOrder)>,
    empty_message: String,
}

impl TableComponent {
    pub fn new(id: impl Into<String>, columns: Vec<Column>, page_size: usize) -> Self {
        Self {
            id: id.into(),
            columns,
            rows: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
            filter: String::new(),
            sort: None,
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = message.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Filter rows by a case-insensitive substring of any cell
    ///
    /// Returns to page 1.
    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.trim().to_string();
        self.page = 1;
    }

    /// Current sort column key and order
    pub fn sort(&self) -> Option<(&str, SortOrder)> {
        self.sort
            .map(|(index, order)| (self.columns[index].key.as_str(), order))
    }

    /// Sort by `key`; sorting by the current column again flips the order
    pub fn sort_by(&mut self, key: &str) -> Result<SortOrder, ComponentError> {
        let index = self
            .columns
            .iter()
            .position(|c| c.key == key)
            .ok_or_else(|| ComponentError::UnknownColumn(key.to_string()))?;
        if !self.columns[index].sortable {
            return Err(ComponentError::NotSortable(key.to_string()));
        }

        let order = match self.sort {
            Some((current, order)) if current == index => order.toggled(),
            _ => SortOrder::Asc,
        };
        self.sort = Some((index, order));
        Ok(order)
    }

    pub fn pagination(&self) -> Pagination {
        calculate_pagination(self.matching_rows().len(), self.page, self.page_size)
    }

    /// Move to the next page; false when already on the last page
    pub fn next_page(&mut self) -> bool {
        let pagination = self.pagination();
        if !pagination.has_next() {
            return false;
        }
        self.page = pagination.page + 1;
        true
    }

    /// Move to the previous page; false when already on the first page
    pub fn previous_page(&mut self) -> bool {
        let pagination = self.pagination();
        if !pagination.has_previous() {
            return false;
        }
        self.page = pagination.page - 1;
        true
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.page = page;
        self.page = self.pagination().page;
    }

    /// Filtered and sorted rows across all pages
    pub fn matching_rows(&self) -> Vec<&[String]> {
        let needle = self.filter.to_lowercase();
        let mut rows: Vec<&[String]> = self
            .rows
            .iter()
            .map(Vec::as_slice)
            .filter(|row| {
                needle.is_empty() || row.iter().any(|cell| cell.to_lowercase().contains(&needle))
            })
            .collect();

        if let Some((index, order)) = self.sort {
            rows.sort_by(|a, b| {
                let a = a.get(index).map(String::as_str).unwrap_or_default();
                let b = b.get(index).map(String::as_str).unwrap_or_default();
                match order {
                    SortOrder::Asc => compare_cells(a, b),
                    SortOrder::Desc => compare_cells(b, a),
                }
            });
        }
        rows
    }

    /// Rows on the current page
    pub fn page_rows(&self) -> Vec<&[String]> {
        let rows = self.matching_rows();
        let range = calculate_pagination(rows.len(), self.page, self.page_size).range(rows.len());
        rows[range].to_vec()
    }

    fn render_header(&self, out: &mut String) {
        out.push_str("<thead><tr>");
        for (index, column) in self.columns.iter().enumerate() {
            let label = escape_html(&column.label);
            if !column.sortable {
                out.push_str(&format!("<th>{}</th>", label));
                continue;
            }
            let aria = match self.sort {
                Some((current, order)) if current == index => {
                    format!(r#" aria-sort="{}""#, order.aria())
                }
                _ => String::new(),
            };
            out.push_str(&format!(
                r#"<th{}><button type="button" data-action="sort-{}">{}</button></th>"#,
                aria,
                escape_html(&column.key),
                label
            ));
        }
        out.push_str("</tr></thead>");
    }

    fn render_pager(&self, out: &mut String, pagination: &Pagination) {
        let disabled = |flag: bool| if flag { "" } else { " disabled" };
        out.push_str(&format!(
            concat!(
                r#"<nav class="pager">"#,
                r#"<button type="button" data-action="prev-page"{}>Previous</button>"#,
                r#"<span class="page-info">Page {} of {}</span>"#,
                r#"<button type="button" data-action="next-page"{}>Next</button>"#,
                "</nav>"
            ),
            disabled(pagination.has_previous()),
            pagination.page,
            pagination.total_pages.max(1),
            disabled(pagination.has_next()),
        ));
    }
}

/// Numeric cells compare by value, anything else case-insensitively
fn compare_cells(a: &str, b: &str) -> Ordering {
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

fn numeric(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    let plain = !cell.is_empty()
        && cell
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'));
    if plain {
        cell.parse().ok()
    } else {
        None
    }
}

impl Render for TableComponent {
    fn render(&self, out: &mut String) {
        out.push_str(&format!(
            r#"<div class="data-table" id="{}">"#,
            escape_html(&self.id)
        ));

        let rows = self.matching_rows();
        if rows.is_empty() {
            out.push_str(&format!(
                r#"<p class="empty-state">{}</p></div>"#,
                escape_html(&self.empty_message)
            ));
            return;
        }

        let pagination = calculate_pagination(rows.len(), self.page, self.page_size);
        out.push_str("<table>");
        self.render_header(out);
        out.push_str("<tbody>");
        for row in &rows[pagination.range(rows.len())] {
            out.push_str("<tr>");
            for cell in row.iter() {
                out.push_str(&format!("<td>{}</td>", escape_html(cell)));
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table>");
        self.render_pager(out, &pagination);
        out.push_str("</div>");
    }
}

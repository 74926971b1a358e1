use crate::config::SourceConfig;
use crate::error::{EtlError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static HEADER_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th").unwrap());
static FOOTNOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const MAX_SPAN: usize = 1000;

/// Rule for picking the table to extract out of a page.
pub trait TableMatcher: Send + Sync {
    /// Short description used in log messages.
    fn describe(&self) -> String;

    fn matches(&self, table: ElementRef<'_>) -> bool;
}

/// Matches tables with the given class whose header cells mention `marker`.
#[derive(Debug, Clone)]
pub struct HeaderMarkerMatcher {
    pub table_class: String,
    pub marker: String,
}

impl HeaderMarkerMatcher {
    pub fn new(table_class: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            table_class: table_class.into(),
            marker: marker.into(),
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.table_class.clone(), config.header_marker.clone())
    }
}

impl TableMatcher for HeaderMarkerMatcher {
    fn describe(&self) -> String {
        format!(
            "table.{} with a header containing '{}'",
            self.table_class, self.marker
        )
    }

    fn matches(&self, table: ElementRef<'_>) -> bool {
        table.value().classes().any(|c| c == self.table_class)
            && table
                .select(&HEADER_CELL)
                .any(|th| th.text().collect::<String>().contains(&self.marker))
    }
}

/// First table in document order accepted by `matcher`.
pub fn find_table<'a>(document: &'a Html, matcher: &dyn TableMatcher) -> Option<ElementRef<'a>> {
    document.select(&TABLE).find(|table| matcher.matches(*table))
}

/// Text of a cell as a reader sees it: hidden elements and footnote markers
/// dropped, whitespace collapsed.
pub fn cell_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_visible_text(element, &mut raw);
    let without_notes = FOOTNOTE.replace_all(&raw, "");
    WHITESPACE
        .replace_all(&without_notes, " ")
        .trim()
        .to_string()
}

fn collect_visible_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push(' '),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if !is_hidden(child) {
                        collect_visible_text(child, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let el = element.value();
    if matches!(el.name(), "style" | "script") {
        return true;
    }
    el.attr("style")
        .map(|style| {
            let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
            compact.to_ascii_lowercase().contains("display:none")
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    header: bool,
    rowspan: usize,
    colspan: usize,
}

impl Cell {
    fn from_element(element: ElementRef<'_>) -> Self {
        Self {
            text: cell_text(element),
            header: element.value().name() == "th",
            rowspan: span(element, "rowspan"),
            colspan: span(element, "colspan"),
        }
    }
}

fn span(element: ElementRef<'_>, attr: &str) -> usize {
    element
        .value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
        .min(MAX_SPAN)
}

fn belongs_to(row: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    (*row)
        .ancestors()
        .find(|node| {
            node.value()
                .as_element()
                .map_or(false, |el| el.name() == "table")
        })
        .map_or(false, |node| node.id() == (*table).id())
}

#[derive(Debug, Clone)]
struct Carry {
    text: String,
    remaining: usize,
}

fn take_carry(pending: &mut [Option<Carry>], col: usize) -> Option<String> {
    let slot = pending.get_mut(col)?;
    let carry = slot.as_mut()?;
    let text = carry.text.clone();
    carry.remaining -= 1;
    if carry.remaining == 0 {
        *slot = None;
    }
    Some(text)
}

/// Lays out cells on a grid, repeating spanned cells into every slot they cover.
fn expand_spans(rows: Vec<Vec<Cell>>) -> Vec<Vec<String>> {
    let mut grid = Vec::with_capacity(rows.len());
    let mut pending: Vec<Option<Carry>> = Vec::new();

    for cells in rows {
        let mut out = Vec::new();
        let mut cells = cells.into_iter();
        let mut col = 0;

        loop {
            if let Some(text) = take_carry(&mut pending, col) {
                out.push(text);
                col += 1;
                continue;
            }
            let Some(cell) = cells.next() else { break };
            for _ in 0..cell.colspan {
                if cell.rowspan > 1 {
                    if pending.len() <= col {
                        pending.resize(col + 1, None);
                    }
                    pending[col] = Some(Carry {
                        text: cell.text.clone(),
                        remaining: cell.rowspan - 1,
                    });
                }
                out.push(cell.text.clone());
                col += 1;
            }
        }

        while col < pending.len() {
            out.push(take_carry(&mut pending, col).unwrap_or_default());
            col += 1;
        }
        grid.push(out);
    }
    grid
}

/// A table flattened to one header label per column plus its data rows.
#[derive(Debug, Clone)]
pub struct HtmlTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl HtmlTable {
    /// Reads `table` into a rectangular grid.
    ///
    /// Leading rows made only of `th` cells form the header; with several
    /// header rows the innermost (last) label of each column is kept.
    pub fn from_element(table: ElementRef<'_>) -> Result<Self> {
        let rows: Vec<Vec<Cell>> = table
            .select(&ROW)
            .filter(|tr| belongs_to(*tr, table))
            .map(|tr| {
                tr.children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| matches!(c.value().name(), "th" | "td"))
                    .map(Cell::from_element)
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();

        let header_count = rows
            .iter()
            .take_while(|cells| cells.iter().all(|c| c.header))
            .count();
        if header_count == 0 {
            return Err(EtlError::MalformedTable(
                "table has no header row".to_string(),
            ));
        }

        let mut rows = rows;
        let body = rows.split_off(header_count);
        let header_grid = expand_spans(rows);
        let mut body_grid = expand_spans(body);

        let width = header_grid
            .iter()
            .chain(body_grid.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        let mut headers = vec![String::new(); width];
        for (col, label) in headers.iter_mut().enumerate() {
            if let Some(text) = header_grid
                .last()
                .and_then(|row| row.get(col))
            {
                *label = text.trim().to_string();
            }
        }
        for row in &mut body_grid {
            row.resize(width, String::new());
        }

        Ok(Self {
            headers,
            rows: body_grid,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.headers.iter().position(|h| h == label)
    }
}

use crate::models::table::Table;
use crate::errors::{Result, EtlError};
use crate::scrapers::base::{ensure_success, ConstituentSource};
use crate::util::cell_value;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

const USER_AGENT: &str = concat!("sp500_etl/", env!("CARGO_PKG_VERSION"));

/// 维基百科成分股表格抓取器
pub struct WikipediaScraper {
    client: Client,
    table_selector: String,
}

impl WikipediaScraper {
    pub fn new(table_selector: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(EtlError::RequestError)?;

        Ok(Self::with_client(client, table_selector))
    }

    pub fn with_client(client: Client, table_selector: &str) -> Self {
        Self {
            client,
            table_selector: table_selector.to_string(),
        }
    }
}

#[async_trait]
impl ConstituentSource for WikipediaScraper {
    fn source_name(&self) -> &'static str {
        "wikipedia"
    }

    async fn fetch_constituents(&self, url: &str) -> Result<Table> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        ensure_success(response.status(), &format!("GET {}", url))?;

        let body = response.text().await?;
        debug!("Received {} bytes", body.len());

        parse_constituent_table(&body, &self.table_selector)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| EtlError::ConfigError(format!("Invalid CSS selector '{}': {:?}", css, e)))
}

// 合并单元格内的空白字符
fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn child_elements<'a>(parent: ElementRef<'a>, names: &'a [&'a str]) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |e| names.contains(&e.value().name()))
}

// 只取本表自己的行，单元格里嵌套的表格不算
fn table_rows(table: ElementRef) -> Vec<ElementRef> {
    let mut rows = Vec::new();
    for child in child_elements(table, &["tr", "thead", "tbody", "tfoot"]) {
        if child.value().name() == "tr" {
            rows.push(child);
        } else {
            rows.extend(child_elements(child, &["tr"]));
        }
    }
    rows
}

fn row_cells(row: ElementRef) -> Vec<ElementRef> {
    child_elements(row, &["th", "td"]).collect()
}

fn is_header_row(cells: &[ElementRef]) -> bool {
    !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th")
}

/// Parse the first table matching `table_selector` into a header-keyed `Table`.
///
/// The header is the first row made only of `<th>` cells, or the first row
/// when no such row exists. Every later row with at least one `<td>` becomes
/// a data row; empty cells are missing values. Rows and cells of tables
/// nested inside a cell are not rows of their own.
pub fn parse_constituent_table(html: &str, table_selector: &str) -> Result<Table> {
    let document = Html::parse_document(html);
    let table_sel = selector(table_selector)?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| EtlError::ParseError(format!("No table matching '{}' found", table_selector)))?;

    let rows: Vec<Vec<ElementRef>> = table_rows(table).into_iter().map(row_cells).collect();
    if rows.is_empty() {
        return Err(EtlError::ParseError("Constituent table has no rows".to_string()));
    }

    let header_pos = rows.iter().position(|cells| is_header_row(cells)).unwrap_or(0);

    let headers: Vec<String> = rows[header_pos].iter().map(|c| cell_text(*c)).collect();
    if headers.is_empty() {
        return Err(EtlError::ParseError("Constituent table has an empty header row".to_string()));
    }

    let mut parsed = Table::new(headers);
    for cells in rows.iter().skip(header_pos + 1) {
        if !cells.iter().any(|c| c.value().name() == "td") {
            continue;
        }
        parsed.push_row(cells.iter().map(|c| cell_value(&cell_text(*c))).collect());
    }

    Ok(parsed)
}

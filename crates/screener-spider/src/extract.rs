use crate::error::ExtractError;
use crate::normalize::fit;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Company header text the upstream shows for affiliate listings, which carry no snapshot.
const AFFILIATE: &str = "Affiliate";

lazy_static! {
    static ref SNAPSHOT_TABLE: Selector = selector("table.snapshot-table2");
    static ref ROW: Selector = selector("tr");
    static ref CELL: Selector = selector("td");
    static ref TAB_LINK: Selector = selector("a.tab-link");
    static ref COMPANY: Selector = selector(".quote-header_ticker-wrapper_company");
    static ref SECTOR: Selector = selector(r#"a[href*="f=sec_"]"#);
    static ref INDUSTRY: Selector = selector(r#"a[href*="f=ind_"]"#);
    static ref COUNTRY: Selector = selector(r#"a[href*="f=geo_"]"#);
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid css")
}

/// The raw, untyped content of one quote page; the intermediate artifact form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub ticker: String,
    #[serde(rename = "company_name", default)]
    pub company: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Upstream label -> raw cell text.
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Snapshot(RawSnapshot),
    /// An affiliate listing; there is nothing to load.
    Affiliate,
}

/// Read the descriptive header and the snapshot table of a quote page.
///
/// Fields may appear in any order and any may be missing. The only failure is a page without
/// a (non-empty) snapshot table, which means the page layout changed.
pub fn extract(ticker: &str, html: &str) -> Result<Extracted, ExtractError> {
    let document = Html::parse_document(html);

    let tab_link = first_text(&document, &TAB_LINK);
    if tab_link.as_deref() == Some(AFFILIATE) {
        debug!("affiliate listing for [{ticker}]");
        return Ok(Extracted::Affiliate);
    }

    let table = document
        .select(&SNAPSHOT_TABLE)
        .next()
        .ok_or_else(|| ExtractError {
            ticker: ticker.to_string(),
            reason: "snapshot table not found".to_string(),
        })?;

    let mut fields = BTreeMap::new();
    for row in table.select(&ROW) {
        let cells: Vec<ElementRef> = row.select(&CELL).collect();
        for pair in cells.chunks_exact(2) {
            let label = joined_text(&pair[0]);
            if label.is_empty() {
                continue;
            }
            let value = joined_text(&pair[1]);
            insert_field(&mut fields, ticker, label, value);
        }
    }

    if fields.is_empty() {
        return Err(ExtractError {
            ticker: ticker.to_string(),
            reason: "snapshot table has no label/value cells".to_string(),
        });
    }

    let company = first_text(&document, &COMPANY).or(tab_link);
    trace!("extracted {} fields for [{ticker}]", fields.len());

    Ok(Extracted::Snapshot(RawSnapshot {
        ticker: ticker.to_string(),
        company,
        sector: first_text(&document, &SECTOR),
        industry: first_text(&document, &INDUSTRY),
        country: first_text(&document, &COUNTRY),
        fields,
    }))
}

// a repeated label keeps the value that best fits its declared kind, the later one on a tie
fn insert_field(fields: &mut BTreeMap<String, String>, ticker: &str, label: String, value: String) {
    if let Some(previous) = fields.get(&label) {
        if fit(&label, previous) > fit(&label, &value) {
            trace!(
                "label \"{label}\" repeated for [{ticker}], keeping \"{previous}\" over \"{value}\""
            );
            return;
        }
        trace!("label \"{label}\" repeated for [{ticker}], replacing \"{previous}\"");
    }
    fields.insert(label, value);
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|element| joined_text(&element))
        .find(|text| !text.is_empty())
}

// text nodes of an element, each trimmed, joined by single spaces
fn joined_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#![allow(dead_code)]

use screener_spider::fetch::RetryPolicy;
use screener_spider::normalize::schema::{Kind, Split, SCHEMA};
use screener_spider::Config;
use std::path::Path;
use std::time::Duration;

/// A well-formed raw value for every metric kind.
fn sample(kind: Kind) -> &'static str {
    match kind {
        Kind::Number => "12.34",
        Kind::Percent => "5.60%",
        Kind::Date => "Dec 12, 1980",
        Kind::Text => "DJIA, S&amp;P 500",
        Kind::Split(Split::PriceAndPercent) => "237.23 -3.94%",
        Kind::Split(Split::PercentPair) => "10.00% 20.00%",
        Kind::Split(Split::AmountAndPercent) => "0.96 (0.41%)",
        Kind::Split(Split::Range) => "164.08 - 237.23",
    }
}

/// Every declared label with a valid value, minus `omit`.
pub fn fields(omit: &[&str]) -> Vec<(String, String)> {
    SCHEMA
        .iter()
        .map(|metric| (metric.labels[0], metric.kind))
        .filter(|(label, _)| !omit.contains(label))
        .map(|(label, kind)| {
            let value = match label {
                "Market Cap" => "3.52T",
                _ => sample(kind),
            };
            (label.to_string(), value.to_string())
        })
        .collect()
}

/// A quote page with a descriptive header and a snapshot table of `fields`, four pairs per row.
pub fn quote_page(company: &str, sector: Option<&str>, fields: &[(String, String)]) -> String {
    let sector = sector
        .map(|s| format!(r#"<a class="tab-link" href="screener.ashx?v=111&f=sec_x">{s}</a>"#))
        .unwrap_or_default();

    let rows = fields
        .chunks(4)
        .map(|row| {
            let cells = row
                .iter()
                .map(|(label, value)| format!("<td>{label}</td><td><b>{value}</b></td>"))
                .collect::<String>();
            format!("<tr>{cells}</tr>")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<html><body>
        <div class="quote-header">
            <h2 class="quote-header_ticker-wrapper_company"><a href="/c">{company}</a></h2>
            {sector}
            <a class="tab-link" href="screener.ashx?v=111&f=geo_usa">USA</a>
        </div>
        <table class="snapshot-table2">
        {rows}
        </table>
        </body></html>"#
    )
}

pub fn affiliate_page() -> String {
    r#"<html><body><a class="tab-link" href="/a">Affiliate</a></body></html>"#.to_string()
}

pub fn redesigned_page() -> String {
    "<html><body><div class=\"new-layout\">nothing familiar</div></body></html>".to_string()
}

/// Settings pointing every path into `dir` and the upstream at `server_uri`, with short waits.
pub fn config(dir: &Path, server_uri: &str) -> Config {
    Config {
        scrape_delay: Duration::from_millis(20),
        csv_path: dir.join("StockSource.csv"),
        db_path: dir.join("stocks.db"),
        quote_url: format!("{server_uri}/quote.ashx"),
        fetch_timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            multiplier: 2.0,
            max_backoff: Duration::from_millis(50),
        },
        raw_output: dir.join("raw").join("stock_data_latest.json"),
        ..Config::default()
    }
}

pub fn write_csv(dir: &Path, contents: &str) {
    std::fs::write(dir.join("StockSource.csv"), contents).unwrap();
}

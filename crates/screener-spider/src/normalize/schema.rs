//! The declared metric table.
//!
//! Each entry names the upstream label(s) a metric is published under, the store column(s) it
//! lands in and how the raw text is typed. Adding a metric means adding a row here; the
//! normalizer, the store DDL and the upsert statement are all derived from this table.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// How a raw value is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Plain or suffixed number, `"1.2B"` -> `1.2e9`.
    Number,
    /// `"12.4%"` -> `0.124`.
    Percent,
    Date,
    Text,
    /// A composite value decomposed into several typed columns.
    Split(Split),
}

/// Decomposition rules for composite values. Every rule yields exactly two parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// `"237.23 -3.94%"`: a price and its distance as a percent.
    PriceAndPercent,
    /// `"65.40% 37.40%"`: two percents, either of which may be `-`.
    PercentPair,
    /// `"0.96 (0.41%)"`: an amount and the yield it represents.
    AmountAndPercent,
    /// `"164.08 - 237.23"`: a low-high range; low never exceeds high.
    Range,
}

impl Kind {
    /// The scalar kind of every derived column, in column order.
    pub fn parts(self) -> &'static [Kind] {
        match self {
            Kind::Number => &[Kind::Number],
            Kind::Percent => &[Kind::Percent],
            Kind::Date => &[Kind::Date],
            Kind::Text => &[Kind::Text],
            Kind::Split(Split::PriceAndPercent) => &[Kind::Number, Kind::Percent],
            Kind::Split(Split::PercentPair) => &[Kind::Percent, Kind::Percent],
            Kind::Split(Split::AmountAndPercent) => &[Kind::Number, Kind::Percent],
            Kind::Split(Split::Range) => &[Kind::Number, Kind::Number],
        }
    }

    /// SQLite column affinity for a scalar kind.
    pub fn sql_type(self) -> &'static str {
        match self {
            Kind::Number | Kind::Percent => "REAL",
            Kind::Date | Kind::Text | Kind::Split(_) => "TEXT",
        }
    }
}

#[derive(Debug)]
pub struct Metric {
    pub labels: &'static [&'static str],
    pub columns: &'static [&'static str],
    pub kind: Kind,
}

const fn metric(
    labels: &'static [&'static str],
    columns: &'static [&'static str],
    kind: Kind,
) -> Metric {
    Metric {
        labels,
        columns,
        kind,
    }
}

use Kind::{Date, Number, Percent, Text};
const PRICE_AND_PERCENT: Kind = Kind::Split(Split::PriceAndPercent);
const PERCENT_PAIR: Kind = Kind::Split(Split::PercentPair);
const AMOUNT_AND_PERCENT: Kind = Kind::Split(Split::AmountAndPercent);
const RANGE: Kind = Kind::Split(Split::Range);

pub static SCHEMA: &[Metric] = &[
    // descriptive
    metric(&["Index"], &["market_index"], Text),
    metric(&["Earnings"], &["earnings_date"], Text),
    metric(&["Option/Short"], &["option_short"], Text),
    metric(&["IPO"], &["ipo_date"], Date),
    metric(&["Employees"], &["employees"], Number),
    // price and trading
    metric(&["Price"], &["price"], Number),
    metric(&["Change"], &["price_change"], Percent),
    metric(&["Prev Close"], &["prev_close"], Number),
    metric(&["Volume"], &["volume"], Number),
    metric(&["Avg Volume"], &["avg_volume"], Number),
    metric(&["Rel Volume"], &["rel_volume"], Number),
    metric(&["Target Price"], &["target_price"], Number),
    metric(&["Recom"], &["recommendation"], Number),
    metric(&["52W Range"], &["week_52_range_low", "week_52_range_high"], RANGE),
    metric(&["52W High"], &["week_52_high", "week_52_high_pct"], PRICE_AND_PERCENT),
    metric(&["52W Low"], &["week_52_low", "week_52_low_pct"], PRICE_AND_PERCENT),
    // size
    metric(&["Market Cap"], &["market_cap"], Number),
    metric(&["Enterprise Value"], &["enterprise_value"], Number),
    metric(&["Income"], &["income"], Number),
    metric(&["Sales"], &["sales"], Number),
    metric(&["Shs Outstand"], &["shares_outstanding"], Number),
    metric(&["Shs Float"], &["shares_float"], Number),
    // valuation
    metric(&["P/E"], &["pe_ratio"], Number),
    metric(&["Forward P/E"], &["forward_pe"], Number),
    metric(&["PEG"], &["peg_ratio"], Number),
    metric(&["P/S"], &["ps_ratio"], Number),
    metric(&["P/B"], &["pb_ratio"], Number),
    metric(&["P/C"], &["pc_ratio"], Number),
    metric(&["P/FCF"], &["pfcf_ratio"], Number),
    metric(&["EV/Sales"], &["ev_sales"], Number),
    metric(&["EV/EBITDA"], &["ev_ebitda"], Number),
    metric(&["Book/sh"], &["book_per_share"], Number),
    metric(&["Cash/sh"], &["cash_per_share"], Number),
    // earnings and growth
    metric(&["EPS (ttm)"], &["eps_ttm"], Number),
    metric(&["EPS next Q"], &["eps_next_q"], Number),
    metric(&["EPS this Y"], &["eps_this_y"], Percent),
    metric(&["EPS next Y"], &["eps_growth_next_y"], Percent),
    metric(&["EPS next 5Y"], &["eps_growth_next_5y"], Percent),
    metric(&["EPS past 3/5Y"], &["eps_past_3y", "eps_past_5y"], PERCENT_PAIR),
    metric(&["Sales past 3/5Y"], &["sales_past_3y", "sales_past_5y"], PERCENT_PAIR),
    metric(&["EPS Y/Y TTM"], &["eps_growth_ttm"], Percent),
    metric(&["Sales Y/Y TTM"], &["revenue_growth_ttm"], Percent),
    metric(&["EPS Q/Q"], &["eps_qoq"], Percent),
    metric(&["Sales Q/Q"], &["sales_qyq"], Percent),
    metric(&["EPS/Sales Surpr."], &["eps_surprise", "sales_surprise"], PERCENT_PAIR),
    // profitability
    metric(&["Gross Margin"], &["gross_margin"], Percent),
    metric(&["Oper. Margin", "Operating Margin"], &["operating_margin"], Percent),
    metric(&["Profit Margin"], &["profit_margin"], Percent),
    metric(&["ROA"], &["roa"], Percent),
    metric(&["ROE"], &["roe"], Percent),
    metric(&["ROI"], &["roi"], Percent),
    metric(&["ROIC"], &["roic"], Percent),
    // balance sheet
    metric(&["Debt/Eq"], &["debt_to_equity"], Number),
    metric(&["LT Debt/Eq"], &["lt_debt_to_equity"], Number),
    metric(&["Current Ratio"], &["current_ratio"], Number),
    metric(&["Quick Ratio"], &["quick_ratio"], Number),
    // dividends
    metric(&["Dividend TTM"], &["dividend_ttm", "dividend_yield"], AMOUNT_AND_PERCENT),
    metric(&["Dividend Est."], &["dividend_est", "dividend_yield_est"], AMOUNT_AND_PERCENT),
    metric(&["Dividend Ex-Date"], &["ex_dividend_date"], Date),
    metric(&["Dividend Gr. 3/5Y"], &["dividend_gr_3y", "dividend_gr_5y"], PERCENT_PAIR),
    metric(&["Payout"], &["payout_ratio"], Percent),
    // ownership and short interest
    metric(&["Insider Own"], &["insider_own"], Percent),
    metric(&["Insider Trans"], &["insider_trans"], Percent),
    metric(&["Inst Own"], &["inst_own"], Percent),
    metric(&["Inst Trans"], &["inst_trans"], Percent),
    metric(&["Short Float"], &["short_float"], Percent),
    metric(&["Short Ratio"], &["short_ratio"], Number),
    metric(&["Short Interest"], &["short_interest"], Number),
    // technicals
    metric(&["RSI (14)"], &["rsi"], Number),
    metric(&["Beta"], &["beta"], Number),
    metric(&["ATR (14)"], &["atr"], Number),
    metric(&["Volatility"], &["volatility_week", "volatility_month"], PERCENT_PAIR),
    metric(&["SMA20"], &["sma20"], Percent),
    metric(&["SMA50"], &["sma50"], Percent),
    metric(&["SMA200"], &["sma200"], Percent),
    // performance
    metric(&["Perf Week"], &["perf_week"], Percent),
    metric(&["Perf Month"], &["perf_month"], Percent),
    metric(&["Perf Quarter"], &["perf_quarter"], Percent),
    metric(&["Perf Half Y"], &["perf_half_y"], Percent),
    metric(&["Perf YTD"], &["perf_ytd"], Percent),
    metric(&["Perf Year"], &["perf_year"], Percent),
    metric(&["Perf 3Y"], &["perf_3y"], Percent),
    metric(&["Perf 5Y"], &["perf_5y"], Percent),
    metric(&["Perf 10Y"], &["perf_10y"], Percent),
];

lazy_static! {
    static ref BY_LABEL: HashMap<&'static str, &'static Metric> = SCHEMA
        .iter()
        .flat_map(|metric| metric.labels.iter().map(move |label| (*label, metric)))
        .collect();
}

/// The metric published under `label`, if it is declared.
pub fn lookup(label: &str) -> Option<&'static Metric> {
    BY_LABEL.get(label).copied()
}

/// Every metric column with its scalar kind, in schema order.
pub fn columns() -> impl Iterator<Item = (&'static str, Kind)> {
    SCHEMA.iter().flat_map(|metric| {
        metric
            .columns
            .iter()
            .copied()
            .zip(metric.kind.parts().iter().copied())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_metric_declares_one_column_per_part() {
        for metric in SCHEMA {
            assert_eq!(
                metric.columns.len(),
                metric.kind.parts().len(),
                "{:?}",
                metric.labels
            );
        }
    }

    #[test]
    fn labels_and_columns_are_unique() {
        let mut labels = HashSet::new();
        let mut columns = HashSet::new();
        for metric in SCHEMA {
            for label in metric.labels {
                assert!(labels.insert(*label), "duplicate label {label}");
            }
            for column in metric.columns {
                assert!(columns.insert(*column), "duplicate column {column}");
            }
        }
        assert!(columns.len() >= 90, "{} columns", columns.len());
    }

    #[test]
    fn aliases_resolve_to_the_same_metric() {
        let a = lookup("Oper. Margin").unwrap();
        let b = lookup("Operating Margin").unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(lookup("Not A Label").is_none());
    }
}

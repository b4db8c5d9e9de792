mod parse;
pub mod schema;

use crate::error::{Error, NormalizeError};
use crate::extract::RawSnapshot;
use chrono::NaiveDate;
use parse::{clean_text, is_placeholder, parse_date, parse_number, parse_percent, split_composite};
use schema::{Kind, Metric, Split, SCHEMA};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A typed metric value. Placeholders never survive normalization; they become `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Unknown,
}

impl Value {
    pub fn is_known(&self) -> bool {
        !matches!(self, Value::Unknown)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Market capitalization bucket, always derived from the record's current `market_cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapTier {
    Mega,
    Large,
    Mid,
    Small,
    Micro,
}

impl CapTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapTier::Mega => "Mega",
            CapTier::Large => "Large",
            CapTier::Mid => "Mid",
            CapTier::Small => "Small",
            CapTier::Micro => "Micro",
        }
    }
}

/// Lower bounds, in dollars, of each tier above micro.
#[derive(Debug, Clone, PartialEq)]
pub struct TierPolicy {
    pub mega: f64,
    pub large: f64,
    pub mid: f64,
    pub small: f64,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            mega: 200e9,
            large: 10e9,
            mid: 2e9,
            small: 300e6,
        }
    }
}

impl TierPolicy {
    /// The bounds must be finite, positive and strictly descending.
    pub fn validate(&self) -> Result<(), Error> {
        let ladder = [self.mega, self.large, self.mid, self.small];
        let descending = ladder.windows(2).all(|pair| pair[0] > pair[1]);
        if ladder.iter().all(|b| b.is_finite() && *b > 0.0) && descending {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "market cap tiers must be positive and descending, got {ladder:?}"
            )))
        }
    }

    pub fn tier(&self, market_cap: f64) -> CapTier {
        if market_cap >= self.mega {
            CapTier::Mega
        } else if market_cap >= self.large {
            CapTier::Large
        } else if market_cap >= self.mid {
            CapTier::Mid
        } else if market_cap >= self.small {
            CapTier::Small
        } else {
            CapTier::Micro
        }
    }
}

/// One fully typed row of the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRecord {
    pub ticker: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub market_cap_tier: Option<CapTier>,
    /// Every schema column, known or not.
    pub values: BTreeMap<&'static str, Value>,
    /// Fields that could not be typed; each one's columns are `Unknown`.
    pub issues: Vec<NormalizeError>,
}

impl StockRecord {
    pub fn value(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&Value::Unknown)
    }

    pub fn known_count(&self) -> usize {
        self.values.values().filter(|v| v.is_known()).count()
    }

    pub fn unknown_columns(&self) -> Vec<&'static str> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_known())
            .map(|(column, _)| *column)
            .collect()
    }
}

/// Type every declared metric of `raw`.
///
/// Total over the schema: the record carries every column, and a field that fails to parse
/// degrades to `Unknown` without touching any other field.
pub fn normalize(raw: &RawSnapshot, tiers: &TierPolicy) -> StockRecord {
    let mut values = BTreeMap::new();
    let mut issues = vec![];

    for metric in SCHEMA {
        let found = metric
            .labels
            .iter()
            .find_map(|label| raw.fields.get(*label).map(|value| (*label, value)));

        let parts = match found {
            None => None,
            Some((label, value)) => match normalize_field(metric, value) {
                Ok(parts) => parts,
                Err(reason) => {
                    let err = NormalizeError {
                        label: label.to_string(),
                        raw: value.clone(),
                        reason,
                    };
                    warn!("failed to normalize field for [{}], error({err})", raw.ticker);
                    issues.push(err);
                    None
                }
            },
        };

        match parts {
            Some(parts) => values.extend(metric.columns.iter().copied().zip(parts)),
            None => values.extend(metric.columns.iter().map(|column| (*column, Value::Unknown))),
        }
    }

    for label in raw.fields.keys() {
        if schema::lookup(label).is_none() {
            debug!("unmapped label \"{label}\" for [{}]", raw.ticker);
        }
    }

    let market_cap_tier = values
        .get("market_cap")
        .and_then(Value::as_f64)
        .map(|cap| tiers.tier(cap));

    StockRecord {
        ticker: raw.ticker.clone(),
        company_name: non_empty(raw.company.as_deref()),
        sector: non_empty(raw.sector.as_deref()),
        industry: non_empty(raw.industry.as_deref()),
        country: non_empty(raw.country.as_deref()),
        market_cap_tier,
        values,
        issues,
    }
}

/// How well a raw value suits the metric declared under `label`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fit {
    Rejected,
    Placeholder,
    Typed,
}

/// Rank `raw` against the declared kind of `label`; undeclared labels accept anything.
///
/// Used to choose between the values of a label the upstream publishes more than once.
pub fn fit(label: &str, raw: &str) -> Fit {
    let Some(metric) = schema::lookup(label) else {
        return Fit::Typed;
    };
    match normalize_field(metric, raw) {
        Ok(Some(_)) => Fit::Typed,
        Ok(None) => Fit::Placeholder,
        Err(_) => Fit::Rejected,
    }
}

// `Ok(None)` for a placeholder, otherwise one value per declared column
fn normalize_field(metric: &Metric, raw: &str) -> Result<Option<Vec<Value>>, String> {
    if is_placeholder(raw) {
        return Ok(None);
    }

    let Kind::Split(split) = metric.kind else {
        return scalar(metric.kind, raw).map(|value| Some(vec![value]));
    };

    let part_kinds = metric.kind.parts();
    let parts = split_composite(split, raw);
    if parts.len() != part_kinds.len() {
        return Err(format!(
            "expected {} parts, found {}",
            part_kinds.len(),
            parts.len()
        ));
    }

    let values = parts
        .iter()
        .zip(part_kinds)
        .map(|(part, kind)| {
            if is_placeholder(part) {
                Ok(Value::Unknown)
            } else {
                scalar(*kind, part)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if split == Split::Range {
        if let (Some(low), Some(high)) = (values[0].as_f64(), values[1].as_f64()) {
            if low > high {
                return Err(format!("range low {low} exceeds high {high}"));
            }
        }
    }

    Ok(Some(values))
}

fn scalar(kind: Kind, raw: &str) -> Result<Value, String> {
    match kind {
        Kind::Number => parse_number(raw).map(Value::Number),
        Kind::Percent => parse_percent(raw).map(Value::Number),
        Kind::Date => parse_date(raw).map(Value::Date),
        Kind::Text => Ok(Value::Text(clean_text(raw))),
        Kind::Split(_) => Err("composite value in scalar position".to_string()),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(clean_text)
        .filter(|value| !value.is_empty() && !is_placeholder(value))
}

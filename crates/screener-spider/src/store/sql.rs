use crate::normalize::schema;

//////////////////////////////////////////////////////////////////
// stocks
//////////////////////////////////////////////////////////////////

/// Identity and descriptive columns that precede the metric columns.
pub(crate) static IDENTITY_COLUMNS: [(&str, &str); 5] = [
    ("company_name", "TEXT"),
    ("sector", "TEXT"),
    ("industry", "TEXT"),
    ("country", "TEXT"),
    ("market_cap_tier", "TEXT"),
];

/// Descriptive columns keep their previous value when the current page does not carry one.
pub(crate) static STICKY_COLUMNS: [&str; 4] = ["company_name", "sector", "industry", "country"];

pub(crate) static CREATE_INDEXES: [&str; 5] = [
    "CREATE INDEX IF NOT EXISTS idx_sector ON stocks(sector)",
    "CREATE INDEX IF NOT EXISTS idx_industry ON stocks(industry)",
    "CREATE INDEX IF NOT EXISTS idx_market_cap ON stocks(market_cap)",
    "CREATE INDEX IF NOT EXISTS idx_pe_ratio ON stocks(pe_ratio)",
    "CREATE INDEX IF NOT EXISTS idx_price ON stocks(price)",
];

pub(crate) static TABLE_INFO: &str = "SELECT name FROM pragma_table_info('stocks')";

/// Tracked tickers, largest companies first; tickers without a cap keep alphabetical order.
pub(crate) static SELECT_TICKERS: &str = "
    SELECT ticker
    FROM stocks
    ORDER BY market_cap DESC NULLS LAST, ticker
";

pub(crate) static COUNT_STOCKS: &str = "SELECT COUNT(*) FROM stocks";

//////////////////////////////////////////////////////////////////
// snapshot metadata
//////////////////////////////////////////////////////////////////

/// `snapshot_meta` holds run bookkeeping read by the serving layer.
pub(crate) static CREATE_META: &str = "
    CREATE TABLE IF NOT EXISTS snapshot_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

pub(crate) static UPSERT_META: &str = "
    INSERT INTO snapshot_meta (key, value, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT (key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
";

pub(crate) static SELECT_META: &str = "SELECT value FROM snapshot_meta WHERE key = ?";

lazy_static::lazy_static! {
    /// Every `stocks` column after `ticker`, with its declared type, in table order.
    pub(crate) static ref STOCK_COLUMNS: Vec<(&'static str, &'static str)> = IDENTITY_COLUMNS
        .iter()
        .copied()
        .chain(schema::columns().map(|(column, kind)| (column, kind.sql_type())))
        .chain(std::iter::once(("last_updated", "TEXT")))
        .collect();

    /// `stocks` is one row per ticker: identity, descriptive columns, tier and every metric.
    pub(crate) static ref CREATE_STOCKS: String = {
        let columns = STOCK_COLUMNS
            .iter()
            .map(|(column, sql_type)| format!("        {column} {sql_type}"))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TABLE IF NOT EXISTS stocks (\n        ticker TEXT PRIMARY KEY,\n{columns}\n    )")
    };

    /// Insert-or-overwrite keyed by ticker. Metrics, tier and timestamp are always replaced.
    pub(crate) static ref UPSERT_STOCK: String = {
        let names = STOCK_COLUMNS.iter().map(|(column, _)| *column).collect::<Vec<_>>();
        let placeholders = vec!["?"; names.len() + 1].join(", ");
        let updates = names
            .iter()
            .map(|column| {
                if STICKY_COLUMNS.contains(column) {
                    format!("{column} = COALESCE(excluded.{column}, stocks.{column})")
                } else {
                    format!("{column} = excluded.{column}")
                }
            })
            .collect::<Vec<_>>()
            .join(",\n        ");
        format!(
            "INSERT INTO stocks (ticker, {})\n    VALUES ({placeholders})\n    ON CONFLICT (ticker) DO UPDATE SET\n        {updates}",
            names.join(", ")
        )
    };
}

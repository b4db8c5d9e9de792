use criterion::*;
use screener_spider::extract::{extract, Extracted};
use screener_spider::normalize::schema::{Kind, Split, SCHEMA};
use screener_spider::normalize::{normalize, TierPolicy};

// a quote page carrying every declared metric
fn full_page() -> String {
    let cells = SCHEMA
        .iter()
        .map(|metric| {
            let value = match metric.kind {
                Kind::Number => "1.52B",
                Kind::Percent => "-3.94%",
                Kind::Date => "Aug 12, 2024",
                Kind::Text => "S&amp;P 500",
                Kind::Split(Split::PriceAndPercent) => "237.23-3.94%",
                Kind::Split(Split::PercentPair) => "65.40% 37.40%",
                Kind::Split(Split::AmountAndPercent) => "0.96 (0.41%)",
                Kind::Split(Split::Range) => "164.08 - 237.23",
            };
            format!("<td>{}</td><td><b>{value}</b></td>", metric.labels[0])
        })
        .collect::<Vec<_>>();

    let rows = cells
        .chunks(6)
        .map(|row| format!("<tr>{}</tr>", row.concat()))
        .collect::<String>();
    format!(r#"<html><body><table class="snapshot-table2">{rows}</table></body></html>"#)
}

fn benchmark_extract(c: &mut Criterion) {
    let page = full_page();

    c.bench_function("extract quote page", |b| {
        b.iter(|| extract(black_box("AAPL"), black_box(&page)).unwrap())
    });
}

fn benchmark_normalize(c: &mut Criterion) {
    let Extracted::Snapshot(raw) = extract("AAPL", &full_page()).unwrap() else {
        panic!("benchmark page is not a snapshot");
    };
    let tiers = TierPolicy::default();

    c.bench_function("normalize snapshot", |b| {
        b.iter(|| normalize(black_box(&raw), &tiers))
    });
}

criterion_group!(benches, benchmark_extract, benchmark_normalize);
criterion_main!(benches);

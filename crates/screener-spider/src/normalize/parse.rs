use super::schema::Split;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

const DATE_FORMATS: [&str; 3] = ["%b %d, %Y", "%m/%d/%Y", "%Y-%m-%d"];

lazy_static! {
    // "5.45-13.94%" or "5.4513.94%" when the upstream drops the separator. Prices carry
    // exactly two decimals, which fixes the split point; anything else is not guessed at.
    static ref PRICE_AND_PERCENT: Regex =
        Regex::new(r"^([\d,]+\.\d{2})(-?\d+(?:\.\d+)?%)$").expect("valid regex");
    // "65.40%37.40%"
    static ref PERCENT_PAIR: Regex =
        Regex::new(r"^(-?\d+(?:\.\d+)?%|-)(-?\d+(?:\.\d+)?%|-)$").expect("valid regex");
    // "0.96 (0.41%)"
    static ref AMOUNT_AND_PERCENT: Regex =
        Regex::new(r"^(\S+)\s*\(([^()]+)\)$").expect("valid regex");
}

/// `"-"`, `"- -"`, `"N/A"` and blanks carry no value.
pub(crate) fn is_placeholder(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty()
        || raw.eq_ignore_ascii_case("n/a")
        || raw.chars().all(|c| c == '-' || c.is_whitespace())
}

/// Parse a plain or suffixed number; thousands separators are ignored.
pub(crate) fn parse_number(raw: &str) -> Result<f64, String> {
    let clean = raw.trim().replace(',', "");
    if clean.ends_with('%') {
        return Err("unexpected percent sign".to_string());
    }

    let (digits, scale) = match clean.char_indices().last() {
        Some((i, 'K')) => (&clean[..i], 1e3),
        Some((i, 'M')) => (&clean[..i], 1e6),
        Some((i, 'B')) => (&clean[..i], 1e9),
        Some((i, 'T')) => (&clean[..i], 1e12),
        _ => (clean.as_str(), 1.0),
    };

    let value: f64 = digits
        .parse()
        .map_err(|err| format!("not a number ({err})"))?;
    if !value.is_finite() {
        return Err("not a finite number".to_string());
    }
    Ok(value * scale)
}

/// Parse `"12.4%"` into the fraction `0.124`.
pub(crate) fn parse_percent(raw: &str) -> Result<f64, String> {
    let clean = raw.trim().replace(',', "");
    let digits = clean
        .strip_suffix('%')
        .ok_or_else(|| "missing percent sign".to_string())?;
    let value: f64 = digits
        .trim()
        .parse()
        .map_err(|err| format!("not a percent ({err})"))?;
    if !value.is_finite() {
        return Err("not a finite percent".to_string());
    }
    Ok(value / 100.0)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .ok_or_else(|| "unrecognised date".to_string())
}

/// Trimmed, with inner whitespace runs collapsed to one space.
pub(crate) fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Break a composite value into its raw parts. The caller checks the part count.
pub(crate) fn split_composite(split: Split, raw: &str) -> Vec<String> {
    let raw = raw.trim();
    let captured = |re: &Regex| {
        re.captures(raw).map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
    };

    match split {
        Split::PriceAndPercent => {
            captured(&PRICE_AND_PERCENT).unwrap_or_else(|| whitespace_parts(raw))
        }
        Split::PercentPair => captured(&PERCENT_PAIR).unwrap_or_else(|| whitespace_parts(raw)),
        Split::AmountAndPercent => {
            captured(&AMOUNT_AND_PERCENT).unwrap_or_else(|| whitespace_parts(raw))
        }
        // a spaced hyphen separates the bounds, so negative bounds survive
        Split::Range => raw
            .split(" - ")
            .map(|part| part.trim().to_string())
            .collect(),
    }
}

fn whitespace_parts(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn suffixes_scale_to_raw_units() {
        assert!(close(parse_number("1.2B").unwrap(), 1.2e9));
        assert!(close(parse_number("450M").unwrap(), 4.5e8));
        assert!(close(parse_number("12.3K").unwrap(), 1.23e4));
        assert!(close(parse_number("3.52T").unwrap(), 3.52e12));
        assert!(close(parse_number("44,594,000").unwrap(), 44_594_000.0));
        assert!(close(parse_number("-0.75").unwrap(), -0.75));
    }

    #[test]
    fn numbers_reject_percent_and_garbage() {
        assert!(parse_number("12%").is_err());
        assert!(parse_number("abc").is_err());
        assert!(parse_number("1.2X").is_err());
    }

    #[test]
    fn percents_become_fractions_with_sign() {
        assert!(close(parse_percent("12.4%").unwrap(), 0.124));
        assert!(close(parse_percent("-3.0%").unwrap(), -0.03));
        assert!(close(parse_percent("1,250.00%").unwrap(), 12.5));
        assert!(parse_percent("12.4").is_err());
    }

    #[test]
    fn placeholders_are_recognised() {
        for raw in ["-", " - ", "- -", "N/A", "n/a", "", "   "] {
            assert!(is_placeholder(raw), "{raw:?}");
        }
        for raw in ["-1", "0", "0.00%", "Yes / No"] {
            assert!(!is_placeholder(raw), "{raw:?}");
        }
    }

    #[test]
    fn dates_accept_the_upstream_formats() {
        let expected = NaiveDate::from_ymd_opt(1980, 12, 12).unwrap();
        assert_eq!(parse_date("Dec 12, 1980").unwrap(), expected);
        assert_eq!(parse_date("12/12/1980").unwrap(), expected);
        assert_eq!(parse_date("1980-12-12").unwrap(), expected);
        assert!(parse_date("Oct 30 AMC").is_err());
    }

    #[test]
    fn composites_split_spaced_and_packed_forms() {
        assert_eq!(
            split_composite(Split::PriceAndPercent, "237.23 -3.94%"),
            vec!["237.23", "-3.94%"]
        );
        assert_eq!(
            split_composite(Split::PriceAndPercent, "5.45-13.94%"),
            vec!["5.45", "-13.94%"]
        );
        assert_eq!(
            split_composite(Split::PriceAndPercent, "5.4513.94%"),
            vec!["5.45", "13.94%"]
        );
        assert_eq!(
            split_composite(Split::PriceAndPercent, "1,234.500.12%"),
            vec!["1,234.50", "0.12%"]
        );
        assert_eq!(
            split_composite(Split::PercentPair, "65.40%37.40%"),
            vec!["65.40%", "37.40%"]
        );
        assert_eq!(
            split_composite(Split::PercentPair, "- 4.10%"),
            vec!["-", "4.10%"]
        );
        assert_eq!(
            split_composite(Split::AmountAndPercent, "0.96 (0.41%)"),
            vec!["0.96", "0.41%"]
        );
        assert_eq!(
            split_composite(Split::Range, "164.08 - 237.23"),
            vec!["164.08", "237.23"]
        );
    }

    #[test]
    fn composites_report_wrong_part_counts() {
        assert_eq!(split_composite(Split::Range, "164.08").len(), 1);
        assert_eq!(split_composite(Split::Range, "1 - 2 - 3").len(), 3);
        assert_eq!(split_composite(Split::PercentPair, "1% 2% 3%").len(), 3);
    }

    #[test]
    fn packed_prices_without_two_decimals_are_not_split() {
        // a single part is a wrong part count for the normalizer
        for raw in ["5.4-3.94%", "54513.94%", "5.451-3.94%"] {
            assert_eq!(split_composite(Split::PriceAndPercent, raw).len(), 1, "{raw}");
        }
    }
}

//! Price and timestamp cleanup for order rows.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::model::{OrderRecord, PricedOrder};

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Parse a messy price string into a number.
///
/// - missing → 0.0
/// - `¢` and `,` act as decimal separators
/// - everything except digits and `.` is dropped
/// - unparsable remainder (e.g. `1.2.3`) → 0.0
/// - prices marked `€` or `EUR` are multiplied by `eur_rate`
pub fn clean_currency(raw: Option<&str>, eur_rate: f64) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let s = raw.trim().replace('¢', ".").replace(',', ".");
    let digits: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    let Ok(value) = digits.parse::<f64>() else {
        return 0.0;
    };
    if s.contains('€') || s.contains("EUR") {
        value * eur_rate
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

static ISO_ZONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(T\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)(?:Z|[+-]\d{2}(?::?\d{2})?)$").unwrap()
});
static LONE_M: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bM\b").unwrap());
static OC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[o0]c").unwrap());
static OCTTOBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Octtober").unwrap());
static OCTT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Octt").unwrap());
static P_DOTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)P\.\.").unwrap());
static A_DOTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)A\.\.").unwrap());
static JUNK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9:\-/.]").unwrap());
static SPACED_AM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bA\s*M\b").unwrap());
static SPACED_PM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bP\s*M\b").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static TIME_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2}:\d{2}(?::\d{2})?(?:\s?[AP]M)?)\s+(.*)$").unwrap()
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %I:%M:%S%p",
    "%m/%d/%Y %I:%M%p",
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
    "%B %d %Y %H:%M:%S",
    "%B %d %Y %H:%M",
    "%B %d %Y %I:%M:%S %p",
    "%B %d %Y %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%d %B %Y %I:%M %p",
    "%d-%B-%Y %H:%M:%S",
    "%d-%B-%Y %H:%M",
    "%d-%B-%Y %I:%M %p",
    "%Y-%B-%d %H:%M:%S",
    "%Y %B %d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m/%d/%y",
    "%m.%d.%Y",
    "%Y.%m.%d",
    "%B %d %Y",
    "%d %B %Y",
    "%d-%B-%Y",
    "%Y-%B-%d",
    "%Y %B %d",
];

/// Repair the known corruptions in a raw timestamp and normalize spacing.
///
/// An ISO-8601 zone designator (`Z`, `+02:00`) is dropped; the wall-clock
/// time is kept as written.
pub fn repair_timestamp(raw: &str) -> String {
    let s = ISO_ZONE.replace(raw.trim(), "$1");
    let s = LONE_M.replace_all(&s, "");
    let s = OC.replace_all(&s, "Oct");
    let s = OCTTOBER.replace_all(&s, "Oct");
    let s = OCTT.replace_all(&s, "Oct");
    let s = P_DOTS.replace_all(&s, "PM");
    let s = A_DOTS.replace_all(&s, "AM");
    let s = s.replace(" -", "-");
    let s = JUNK.replace_all(&s, " ");
    let s = SPACED_AM.replace_all(&s, "AM");
    let s = SPACED_PM.replace_all(&s, "PM");
    let s = SPACES.replace_all(&s, " ");
    let s = s.trim();

    match TIME_FIRST.captures(s) {
        Some(caps) => format!("{} {}", &caps[2], &caps[1]),
        None => s.to_string(),
    }
}

/// Parse a raw order timestamp, month-first. Returns `None` when nothing
/// recognizable remains.
///
/// Trailing tokens that defeat every format (zone names, stray words) are
/// dropped one at a time until a format matches.
pub fn parse_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?;
    if raw.trim().is_empty() || raw.trim().eq_ignore_ascii_case("nan") {
        return None;
    }

    let repaired = repair_timestamp(raw);
    let tokens: Vec<&str> = repaired.split(' ').filter(|t| !t.is_empty()).collect();

    (1..=tokens.len()).rev().find_map(|n| parse_candidate(&tokens[..n].join(" ")))
}

fn parse_candidate(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Attach `paid_price = quantity * unit price` and the calendar date.
pub fn price_orders(orders: &[OrderRecord], eur_rate: f64) -> Vec<PricedOrder> {
    orders
        .iter()
        .map(|order| {
            let unit = clean_currency(order.unit_price.as_deref(), eur_rate);
            let timestamp_clean = parse_timestamp(order.timestamp.as_deref());
            PricedOrder {
                order: order.clone(),
                paid_price: order.quantity * unit,
                timestamp_clean,
                date: timestamp_clean.map(|t| t.date()),
            }
        })
        .collect()
}

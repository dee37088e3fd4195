use std::path::Path;

use serde_json::Value;

use crate::config::{IdentityConfig, OrderColumns, UserColumns};
use crate::error::IdentityError;
use crate::model::{CatalogRecord, IdentityInput, OrderRecord, UserId, UserRecord};

/// Cell values treated as missing, matching common dataframe exports.
const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// `None` for empty cells and missing-value tokens. Whitespace-only cells
/// are values, not missing.
pub fn cell(raw: Option<&str>) -> Option<&str> {
    let raw = raw?;
    if raw.is_empty() || MISSING_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw)
    }
}

#[derive(Debug, Default)]
pub struct LoadedUsers {
    pub records: Vec<UserRecord>,
    /// Rows dropped because their ID cell was missing.
    pub skipped: usize,
}

fn read_headers(
    table: &str,
    reader: &mut csv::Reader<&[u8]>,
) -> Result<Vec<String>, IdentityError> {
    Ok(reader
        .headers()
        .map_err(|e| csv_err(table, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect())
}

fn csv_err(table: &str, e: csv::Error) -> IdentityError {
    IdentityError::Csv {
        table: table.into(),
        message: e.to_string(),
    }
}

fn raw_row(headers: &[String], record: &csv::StringRecord) -> Vec<(String, String)> {
    headers
        .iter()
        .zip(record.iter())
        .map(|(h, v)| (h.clone(), v.to_string()))
        .collect()
}

fn position(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn require(table: &str, headers: &[String], name: &str) -> Result<usize, IdentityError> {
    position(headers, name).ok_or_else(|| IdentityError::MissingColumn {
        table: table.into(),
        column: name.into(),
    })
}

/// Load the user table. `id`, `phone` and `email` columns must exist; any
/// other columns ride along in `raw_fields`.
pub fn load_users_csv(csv_data: &str, columns: &UserColumns) -> Result<LoadedUsers, IdentityError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());
    let headers = read_headers("users", &mut reader)?;

    let id_idx = require("users", &headers, &columns.id)?;
    let phone_idx = require("users", &headers, &columns.phone)?;
    let email_idx = require("users", &headers, &columns.email)?;

    let mut loaded = LoadedUsers::default();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_err("users", e))?;

        let Some(id) = cell(record.get(id_idx)).and_then(UserId::parse) else {
            tracing::warn!(row = i + 1, "users: skipping row without an id");
            loaded.skipped += 1;
            continue;
        };

        loaded.records.push(UserRecord {
            id,
            phone: cell(record.get(phone_idx)).map(str::to_string),
            email: cell(record.get(email_idx)).map(str::to_string),
            raw_fields: raw_row(&headers, &record),
        });
    }

    tracing::debug!(rows = loaded.records.len(), skipped = loaded.skipped, "users loaded");
    Ok(loaded)
}

/// Load the order table. `quantity` and `unit_price` must exist; `user_id`,
/// `timestamp` and `book_id` are picked up when present.
pub fn load_orders_csv(
    csv_data: &str,
    columns: &OrderColumns,
) -> Result<Vec<OrderRecord>, IdentityError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());
    let headers = read_headers("orders", &mut reader)?;

    let quantity_idx = require("orders", &headers, &columns.quantity)?;
    let price_idx = require("orders", &headers, &columns.unit_price)?;
    let user_idx = position(&headers, &columns.user_id);
    let ts_idx = position(&headers, &columns.timestamp);
    let book_idx = position(&headers, &columns.book_id);

    let optional = |record: &csv::StringRecord, idx: Option<usize>| -> Option<String> {
        cell(idx.and_then(|i| record.get(i)))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let mut orders = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_err("orders", e))?;

        let quantity = match cell(record.get(quantity_idx)).filter(|s| !s.trim().is_empty()) {
            None => 0.0,
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| IdentityError::QuantityParse {
                table: "orders".into(),
                row: i + 1,
                value: raw.into(),
            })?,
        };

        orders.push(OrderRecord {
            user_id: user_idx.and_then(|ui| cell(record.get(ui))).and_then(UserId::parse),
            quantity,
            unit_price: cell(record.get(price_idx)).map(str::to_string),
            timestamp: optional(&record, ts_idx),
            book_id: optional(&record, book_idx),
            raw_fields: raw_row(&headers, &record),
        });
    }

    tracing::debug!(rows = orders.len(), "orders loaded");
    Ok(orders)
}

fn json_err(message: impl Into<String>) -> IdentityError {
    IdentityError::Json {
        table: "catalog".into(),
        message: message.into(),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Load the catalog from a JSON array of book objects.
///
/// Authors come from `:author` when any record carries that field, otherwise
/// from `authors`. Either may hold a single name or a list of names.
pub fn load_catalog_json(json: &str) -> Result<Vec<CatalogRecord>, IdentityError> {
    let root: Value = serde_json::from_str(json).map_err(|e| json_err(e.to_string()))?;
    let Value::Array(items) = root else {
        return Err(json_err("expected a top-level array of books"));
    };

    let mut books = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        if !item.is_object() {
            return Err(json_err(format!("entry {i} is not an object")));
        }
        books.push(item);
    }

    let author_field = if books.iter().any(|b| b.get(":author").is_some()) {
        ":author"
    } else {
        "authors"
    };

    let records = books
        .into_iter()
        .map(|book| {
            let authors = match book.get(author_field) {
                Some(Value::Array(names)) => names.iter().filter_map(scalar_text).collect(),
                Some(value) => scalar_text(value).into_iter().collect(),
                None => Vec::new(),
            };
            CatalogRecord {
                id: book.get(":id").and_then(scalar_text),
                authors,
                raw_json: book.to_string(),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(rows = records.len(), author_field, "catalog loaded");
    Ok(records)
}

/// Read every table named in `config`, resolving paths against `base_dir`.
pub fn load_input(
    config: &IdentityConfig,
    base_dir: &Path,
) -> Result<IdentityInput, IdentityError> {
    let read = |file: &str| -> Result<String, IdentityError> {
        let path = base_dir.join(file);
        std::fs::read_to_string(&path)
            .map_err(|e| IdentityError::Io(format!("cannot read {}: {e}", path.display())))
    };

    let users = load_users_csv(&read(&config.users.file)?, &config.users.columns)?;

    let orders = match config.orders {
        Some(ref source) => load_orders_csv(&read(&source.file)?, &source.columns)?,
        None => Vec::new(),
    };

    let catalog = match config.catalog {
        Some(ref source) => load_catalog_json(&read(&source.file)?)?,
        None => Vec::new(),
    };

    Ok(IdentityInput {
        users: users.records,
        orders,
        catalog,
        skipped_user_rows: users.skipped,
    })
}

//! CSV writers for the augmented user and order tables.

use std::io::Write;

use shopkeep_identity::model::{ResolvedOrder, ResolvedUser};

const USER_EXTRA_COLUMNS: &[&str] = &["real_user_id"];
const ORDER_EXTRA_COLUMNS: &[&str] = &["paid_price", "date", "real_user_id"];

fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer)
}

/// Write users in table order: every source column, then `real_user_id`.
pub fn write_users_csv(users: &[ResolvedUser], writer: impl Write) -> Result<(), String> {
    let source_columns: Vec<&str> = users
        .first()
        .map(|u| u.record.raw_fields.iter().map(|(h, _)| h.as_str()).collect())
        .unwrap_or_default();

    let mut csv = csv_writer(writer);
    let header = source_columns.iter().chain(USER_EXTRA_COLUMNS);
    csv.write_record(header)
        .map_err(|e| format!("CSV write error: {e}"))?;

    for u in users {
        let mut row: Vec<String> = source_columns
            .iter()
            .map(|h| u.record.field(h).unwrap_or("").to_string())
            .collect();
        row.push(u.real_user_id.to_string());

        csv.write_record(&row)
            .map_err(|e| format!("CSV write error: {e}"))?;
    }

    csv.flush().map_err(|e| format!("CSV flush error: {e}"))?;
    Ok(())
}

/// Write orders with every source column, then `paid_price`, `date` and
/// `real_user_id`. Unparsed dates and unresolved users are left blank.
pub fn write_orders_csv(orders: &[ResolvedOrder], writer: impl Write) -> Result<(), String> {
    let source_columns: Vec<&str> = orders
        .first()
        .map(|o| o.priced.order.raw_fields.iter().map(|(h, _)| h.as_str()).collect())
        .unwrap_or_default();

    let mut csv = csv_writer(writer);
    let header = source_columns.iter().chain(ORDER_EXTRA_COLUMNS);
    csv.write_record(header)
        .map_err(|e| format!("CSV write error: {e}"))?;

    for o in orders {
        let mut row: Vec<String> = source_columns
            .iter()
            .map(|h| o.priced.order.field(h).unwrap_or("").to_string())
            .collect();
        row.push(format_amount(o.priced.paid_price));
        row.push(o.priced.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default());
        row.push(o.real_user_id.as_ref().map(|id| id.to_string()).unwrap_or_default());

        csv.write_record(&row)
            .map_err(|e| format!("CSV write error: {e}"))?;
    }

    csv.flush().map_err(|e| format!("CSV flush error: {e}"))?;
    Ok(())
}

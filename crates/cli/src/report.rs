//! `shopkeep report`: metrics block as plain text.

use std::path::PathBuf;

use shopkeep_identity::engine::run_file;
use shopkeep_identity::model::Metrics;

use crate::CliError;

const TOP_DAYS: usize = 5;

pub fn cmd_report(config_path: PathBuf) -> Result<(), CliError> {
    let (config, result) = run_file(&config_path)?;
    print!("{}", render_report(&config.name, &result.metrics));
    Ok(())
}

pub fn render_report(name: &str, m: &Metrics) -> String {
    let mut lines = vec![
        format!("Report: {name}"),
        String::new(),
        format!("Total revenue:       {:.2}", m.total_revenue),
        format!("Unique users:        {}", m.unique_users),
        format!("Unique author sets:  {}", m.unique_author_sets),
        format!("Top author:          {}", m.top_author.as_deref().unwrap_or("-")),
    ];

    match m.top_buyer {
        Some(ref buyer) => {
            let aliases: Vec<String> = buyer.aliases.iter().map(|a| a.to_string()).collect();
            lines.push(format!("Top buyer:           {} (spent {:.2})", buyer.id, buyer.spent));
            lines.push(format!("Top buyer aliases:   {}", aliases.join(", ")));
        }
        None => lines.push("Top buyer:           -".to_string()),
    }

    lines.push(String::new());
    if m.daily_revenue.is_empty() {
        lines.push("No dated orders.".to_string());
    } else {
        lines.push(format!("Top {} days by revenue:", TOP_DAYS.min(m.daily_revenue.len())));
        for day in m.daily_revenue.iter().take(TOP_DAYS) {
            lines.push(format!("  {}  {:>12.2}", day.date.format("%Y-%m-%d"), day.revenue));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

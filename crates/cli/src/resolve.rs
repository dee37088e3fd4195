//! `shopkeep resolve` / `shopkeep validate`: config-driven identity resolution.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use shopkeep_identity::engine::run_file;
use shopkeep_identity::{IdentityConfig, IdentityRun};

use crate::exit_codes::EXIT_CLUSTER_ANOMALY;
use crate::export::{write_orders_csv, write_users_csv};
use crate::CliError;

pub struct ResolveArgs {
    pub config: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub users_out: Option<PathBuf>,
    pub orders_out: Option<PathBuf>,
    pub strict: bool,
    pub max_cluster: Option<usize>,
}

pub fn cmd_resolve(args: ResolveArgs) -> Result<(), CliError> {
    tracing::debug!(config = %args.config.display(), strict = args.strict, "resolve");
    let (_, result) = run_file(&args.config)?;

    // Output
    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    if let Some(ref path) = args.users_out {
        write_table(path, |w| write_users_csv(&result.users, w))?;
    }
    if let Some(ref path) = args.orders_out {
        write_table(path, |w| write_orders_csv(&result.orders, w))?;
    }

    print_summary(&result);
    check_anomalies(&result, args.strict, args.max_cluster)
}

fn write_table(
    path: &Path,
    write: impl FnOnce(BufWriter<File>) -> Result<(), String>,
) -> Result<(), CliError> {
    let file = File::create(path)
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
    write(BufWriter::new(file)).map_err(CliError::runtime)?;
    tracing::debug!(path = %path.display(), "table written");
    eprintln!("wrote {}", path.display());
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &IdentityRun) {
    let s = &result.summary;
    eprintln!(
        "'{}': {} users -> {} identities ({} merged into {} clusters, largest {})",
        result.meta.config_name,
        s.distinct_users,
        s.clusters,
        s.merged_users,
        result.clusters.len(),
        s.largest_cluster,
    );
    if s.skipped_user_rows > 0 {
        eprintln!("skipped {} user row(s) without an id", s.skipped_user_rows);
    }
    if s.orders > 0 {
        eprintln!(
            "orders: {} total, {} resolved, {} without identity",
            s.orders, s.orders_resolved, s.orders_unresolved,
        );
    }
    if s.duplicate_rows_dropped > 0 {
        eprintln!("dropped {} duplicate row(s)", s.duplicate_rows_dropped);
    }
}

fn check_anomalies(
    result: &IdentityRun,
    strict: bool,
    max_cluster: Option<usize>,
) -> Result<(), CliError> {
    let s = &result.summary;

    let oversized = max_cluster.filter(|max| s.largest_cluster > *max);
    if let Some(max) = oversized {
        let message = format!("largest cluster has {} users (max {max})", s.largest_cluster);
        if strict {
            return Err(CliError::new(EXIT_CLUSTER_ANOMALY, message)
                .with_hint("inspect `clusters` in the --json output"));
        }
        eprintln!("warning: {message}");
    }

    if s.absence_key_clusters > 0 {
        let message = format!(
            "{} cluster(s) joined through a missing phone or email (missing_attributes = \"{}\")",
            s.absence_key_clusters, result.meta.missing_attributes,
        );
        if strict {
            return Err(CliError::new(EXIT_CLUSTER_ANOMALY, message)
                .with_hint("set missing_attributes = \"skip\" under [matching]"));
        }
        eprintln!("warning: {message}");
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::runtime(format!("cannot read config: {e}")))?;

    let config = IdentityConfig::from_toml(&config_str)?;
    eprintln!(
        "valid: identity config '{}' (users: {}, orders: {}, catalog: {}, missing attributes: {})",
        config.name,
        config.users.file,
        config.orders.as_ref().map_or("-", |o| o.file.as_str()),
        config.catalog.as_ref().map_or("-", |c| c.file.as_str()),
        config.matching.missing_attributes,
    );
    Ok(())
}

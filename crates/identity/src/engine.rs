use std::path::Path;

use crate::clean::price_orders;
use crate::config::IdentityConfig;
use crate::error::IdentityError;
use crate::graph::build_graph;
use crate::loader::load_input;
use crate::materialize::{
    apply_to_orders, apply_to_users, dedup_catalog, dedup_orders, dedup_users, user_lookup,
};
use crate::metrics::compute_metrics;
use crate::model::{Cluster, IdentityInput, IdentityRun, RunMeta, RunSummary};
use crate::normalize::Normalizer;
use crate::resolve::{resolve, Resolution};

/// Resolve identities and materialize the dependent tables.
///
/// normalize → graph → components → mapping → users/orders → dedup → metrics.
pub fn run(config: &IdentityConfig, input: &IdentityInput) -> IdentityRun {
    let span = tracing::info_span!("identity_run", name = %config.name);
    let _enter = span.enter();

    let normalizer = Normalizer::new(&config.matching);
    let graph = build_graph(&input.users, &normalizer);
    let Resolution { mapping, clusters } = resolve(&graph);
    tracing::debug!(users = mapping.len(), clusters = clusters.len(), "components resolved");

    let (users, users_dropped) = dedup_users(apply_to_users(&input.users, &mapping));
    let (priced, orders_dropped) =
        dedup_orders(price_orders(&input.orders, config.pricing.eur_rate));
    let orders = apply_to_orders(&priced, &user_lookup(&users));
    let (catalog, books_dropped) = dedup_catalog(input.catalog.clone());

    let metrics = compute_metrics(&users, &orders, &catalog);

    let merged: Vec<Cluster> = clusters.into_iter().filter(|c| c.members.len() > 1).collect();
    let absence_key_clusters = merged
        .iter()
        .filter(|c| c.keys.iter().any(|k| normalizer.is_absence_key(k)))
        .count();
    if absence_key_clusters > 0 {
        tracing::warn!(
            clusters = absence_key_clusters,
            policy = %normalizer.policy(),
            "users merged through a missing phone or email"
        );
    }

    let groups = mapping.groups();
    let orders_resolved = orders.iter().filter(|o| o.real_user_id.is_some()).count();
    let summary = RunSummary {
        raw_users: input.users.len(),
        skipped_user_rows: input.skipped_user_rows,
        distinct_users: mapping.len(),
        graph_nodes: graph.node_count(),
        graph_edges: graph.edge_count(),
        clusters: groups.len(),
        merged_users: merged.iter().map(|c| c.members.len()).sum(),
        largest_cluster: groups.values().map(Vec::len).max().unwrap_or(0),
        orders: orders.len(),
        orders_resolved,
        orders_unresolved: orders.len() - orders_resolved,
        duplicate_rows_dropped: users_dropped + orders_dropped + books_dropped,
        absence_key_clusters,
    };

    tracing::info!(
        users = summary.distinct_users,
        clusters = summary.clusters,
        merged = summary.merged_users,
        orders = summary.orders,
        "identity resolution complete"
    );

    IdentityRun {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            missing_attributes: normalizer.policy(),
        },
        summary,
        mapping: mapping.entries(),
        clusters: merged,
        metrics,
        users,
        orders,
    }
}

/// Load the config at `config_path`, read its tables relative to the
/// config's directory, and run.
pub fn run_file(config_path: &Path) -> Result<(IdentityConfig, IdentityRun), IdentityError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        IdentityError::Io(format!("cannot read config {}: {e}", config_path.display()))
    })?;
    let config = IdentityConfig::from_toml(&config_str)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let input = load_input(&config, base_dir)?;
    let result = run(&config, &input);
    Ok((config, result))
}

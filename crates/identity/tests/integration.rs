use std::path::PathBuf;

use chrono::NaiveDate;
use shopkeep_identity::config::MissingAttributePolicy;
use shopkeep_identity::engine::{run, run_file};
use shopkeep_identity::loader::load_input;
use shopkeep_identity::{IdentityConfig, IdentityError, IdentityRun, UserId};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_and_run(config_toml: &str) -> IdentityRun {
    let config = IdentityConfig::from_toml(config_toml).unwrap();
    let input = load_input(&config, &fixtures_dir()).unwrap();
    run(&config, &input)
}

fn canonical(result: &IdentityRun, id: i64) -> UserId {
    result
        .mapping
        .iter()
        .find(|e| e.id == UserId::from(id))
        .map(|e| e.canonical_id.clone())
        .unwrap_or_else(|| panic!("user {id} missing from mapping"))
}

fn ids(raw: &[i64]) -> Vec<UserId> {
    raw.iter().copied().map(UserId::from).collect()
}

const SKIP_CONFIG: &str = r#"
name = "Skip Fixture"

[users]
file = "users.csv"

[orders]
file = "orders.csv"

[catalog]
file = "books.json"

[matching]
missing_attributes = "skip"
"#;

// -------------------------------------------------------------------------
// Merge policy (default)
// -------------------------------------------------------------------------

#[test]
fn fixture_resolves_clusters() {
    let (config, result) = run_file(&fixtures_dir().join("shop.identity.toml")).unwrap();
    assert_eq!(config.name, "Shop Fixture");
    assert_eq!(result.meta.missing_attributes, MissingAttributePolicy::Merge);

    let s = &result.summary;
    assert_eq!(s.raw_users, 9);
    assert_eq!(s.skipped_user_rows, 1);
    assert_eq!(s.distinct_users, 8);
    assert_eq!(s.clusters, 4);
    assert_eq!(s.merged_users, 6);
    assert_eq!(s.largest_cluster, 3);
    assert_eq!(s.absence_key_clusters, 1);

    for n in [1, 2, 5] {
        assert_eq!(canonical(&result, n), UserId::from(1));
    }
    for n in [3, 4, 8] {
        assert_eq!(canonical(&result, n), UserId::from(3));
    }
    assert_eq!(canonical(&result, 6), UserId::from(6));
    assert_eq!(canonical(&result, 7), UserId::from(7));

    assert_eq!(result.clusters.len(), 2);
    assert_eq!(result.clusters[0].members, ids(&[1, 2, 5]));
    assert_eq!(result.clusters[1].members, ids(&[3, 4, 8]));
}

#[test]
fn fixture_materializes_tables() {
    let (_, result) = run_file(&fixtures_dir().join("shop.identity.toml")).unwrap();

    // Duplicate user 6, order o1 and book b1 are each dropped once.
    assert_eq!(result.summary.duplicate_rows_dropped, 3);
    assert_eq!(result.users.len(), 8);
    assert!(result.users.iter().all(|u| u.real_user_id <= u.record.id));

    assert_eq!(result.summary.orders, 6);
    assert_eq!(result.summary.orders_resolved, 4);
    assert_eq!(result.summary.orders_unresolved, 2);

    let by_user: Vec<Option<UserId>> =
        result.orders.iter().map(|o| o.real_user_id.clone()).collect();
    assert_eq!(
        by_user,
        vec![
            Some(UserId::from(1)),
            Some(UserId::from(1)),
            Some(UserId::from(3)),
            Some(UserId::from(3)),
            None,
            None,
        ]
    );

    let paid: Vec<f64> = result.orders.iter().map(|o| o.priced.paid_price).collect();
    assert_eq!(paid, vec![20.0, 24.0, 12.5, 15.0, 7.0, 3.0]);
    assert_eq!(result.orders[2].priced.date, NaiveDate::from_ymd_opt(2024, 10, 5));
    assert_eq!(result.orders[5].priced.date, None);
}

#[test]
fn fixture_metrics() {
    let (_, result) = run_file(&fixtures_dir().join("shop.identity.toml")).unwrap();
    let m = &result.metrics;

    let days: Vec<(NaiveDate, f64)> =
        m.daily_revenue.iter().map(|d| (d.date, d.revenue)).collect();
    assert_eq!(
        days,
        vec![
            (NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 44.0),
            (NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(), 22.0),
            (NaiveDate::from_ymd_opt(2024, 10, 5).unwrap(), 12.5),
        ]
    );
    assert_eq!(m.total_revenue, 78.5);
    assert_eq!(m.unique_users, 4);
    assert_eq!(m.unique_author_sets, 3);
    assert_eq!(m.top_author.as_deref(), Some("Tim McNamara"));

    let top = m.top_buyer.as_ref().unwrap();
    assert_eq!(top.id, UserId::from(1));
    assert_eq!(top.spent, 44.0);
    assert_eq!(top.aliases, ids(&[1, 2, 5]));
}

// -------------------------------------------------------------------------
// Skip policy
// -------------------------------------------------------------------------

#[test]
fn skip_policy_keeps_missing_phones_apart() {
    let result = load_and_run(SKIP_CONFIG);

    assert_eq!(result.meta.missing_attributes, MissingAttributePolicy::Skip);
    assert_eq!(result.summary.clusters, 5);
    assert_eq!(result.summary.merged_users, 5);
    assert_eq!(result.summary.absence_key_clusters, 0);
    assert_eq!(canonical(&result, 4), UserId::from(3));
    assert_eq!(canonical(&result, 8), UserId::from(8));
    assert_eq!(result.clusters[1].members, ids(&[3, 4]));
}

#[test]
fn skip_policy_leaves_orders_on_the_same_buyers() {
    let result = load_and_run(SKIP_CONFIG);
    let top = result.metrics.top_buyer.as_ref().unwrap();
    assert_eq!(top.id, UserId::from(1));
    assert_eq!(result.summary.orders_resolved, 4);
}

// -------------------------------------------------------------------------
// Degenerate inputs
// -------------------------------------------------------------------------

#[test]
fn users_only_config() {
    let result = load_and_run("name = \"Users Only\"\n[users]\nfile = \"users.csv\"\n");
    assert_eq!(result.summary.orders, 0);
    assert!(result.metrics.daily_revenue.is_empty());
    assert!(result.metrics.top_buyer.is_none());
    assert!(result.metrics.top_author.is_none());
    assert_eq!(result.metrics.unique_users, 4);
}

#[test]
fn header_only_users_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("users.csv"), "id,phone,email\n").unwrap();
    let config_path = dir.path().join("empty.identity.toml");
    std::fs::write(&config_path, "name = \"Empty\"\n[users]\nfile = \"users.csv\"\n").unwrap();

    let (_, result) = run_file(&config_path).unwrap();
    assert!(result.mapping.is_empty());
    assert_eq!(result.summary.clusters, 0);
}

#[test]
fn renamed_columns() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("people.csv"),
        "uid,tel,mail\n10,555 0100,x@y.com\n11,555-0100,z@y.com\n",
    )
    .unwrap();
    let config_path = dir.path().join("people.identity.toml");
    std::fs::write(
        &config_path,
        r#"
name = "Renamed"

[users]
file = "people.csv"
[users.columns]
id = "uid"
phone = "tel"
email = "mail"
"#,
    )
    .unwrap();

    let (_, result) = run_file(&config_path).unwrap();
    assert_eq!(canonical(&result, 11), UserId::from(10));
}

#[test]
fn missing_column_is_reported() {
    let config = IdentityConfig::from_toml(
        "name = \"Bad\"\n[users]\nfile = \"users.csv\"\n[users.columns]\nphone = \"mobile\"\n",
    )
    .unwrap();
    let err = load_input(&config, &fixtures_dir()).unwrap_err();
    assert!(matches!(
        err,
        IdentityError::MissingColumn { ref column, .. } if column == "mobile"
    ));
}

#[test]
fn missing_file_is_io_error() {
    let err = run_file(&fixtures_dir().join("nope.identity.toml")).unwrap_err();
    assert!(matches!(err, IdentityError::Io(_)));
}

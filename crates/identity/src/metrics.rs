use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use crate::model::{
    CatalogRecord, DailyRevenue, Metrics, ResolvedOrder, ResolvedUser, TopBuyer, UserId,
};

/// Compute report metrics over the resolved tables.
pub fn compute_metrics(
    users: &[ResolvedUser],
    orders: &[ResolvedOrder],
    catalog: &[CatalogRecord],
) -> Metrics {
    let daily_revenue = daily_revenue(orders);
    let total_revenue = daily_revenue.iter().map(|d| d.revenue).sum();

    let unique_users = users
        .iter()
        .map(|u| &u.real_user_id)
        .collect::<HashSet<_>>()
        .len();

    let unique_author_sets = catalog
        .iter()
        .map(CatalogRecord::author_set)
        .collect::<HashSet<_>>()
        .len();

    Metrics {
        daily_revenue,
        total_revenue,
        unique_users,
        unique_author_sets,
        top_author: top_author(orders, catalog),
        top_buyer: top_buyer(users, orders),
    }
}

/// Revenue per calendar date, highest first. Ties keep date order.
pub fn daily_revenue(orders: &[ResolvedOrder]) -> Vec<DailyRevenue> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for o in orders {
        if let Some(date) = o.priced.date {
            *by_date.entry(date).or_insert(0.0) += o.priced.paid_price;
        }
    }

    let mut days: Vec<DailyRevenue> = by_date
        .into_iter()
        .map(|(date, revenue)| DailyRevenue { date, revenue })
        .collect();
    days.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    days
}

/// Author set with the most units sold, names joined by `", "`.
///
/// Orders join the catalog on `book_id == :id`; a book listed twice counts
/// once per listing. Ties go to the lexicographically smallest set.
pub fn top_author(orders: &[ResolvedOrder], catalog: &[CatalogRecord]) -> Option<String> {
    let mut sets_by_id: HashMap<&str, Vec<Vec<String>>> = HashMap::new();
    for book in catalog {
        if let Some(ref id) = book.id {
            sets_by_id.entry(id.as_str()).or_default().push(book.author_set());
        }
    }

    let mut units: BTreeMap<Vec<String>, f64> = BTreeMap::new();
    for o in orders {
        let Some(ref book_id) = o.priced.order.book_id else {
            continue;
        };
        for set in sets_by_id.get(book_id.as_str()).into_iter().flatten() {
            *units.entry(set.clone()).or_insert(0.0) += o.priced.order.quantity;
        }
    }

    let mut best: Option<(&Vec<String>, f64)> = None;
    for (set, qty) in &units {
        if best.map_or(true, |(_, top)| *qty > top) {
            best = Some((set, *qty));
        }
    }
    best.map(|(set, _)| set.join(", "))
}

/// Canonical user with the highest total spend, plus every raw ID that
/// resolves to it in table order. Ties go to the smallest canonical ID.
pub fn top_buyer(users: &[ResolvedUser], orders: &[ResolvedOrder]) -> Option<TopBuyer> {
    let mut spend: BTreeMap<&UserId, f64> = BTreeMap::new();
    for o in orders {
        if let Some(ref id) = o.real_user_id {
            *spend.entry(id).or_insert(0.0) += o.priced.paid_price;
        }
    }

    let mut best: Option<(&UserId, f64)> = None;
    for (id, total) in &spend {
        if best.map_or(true, |(_, top)| *total > top) {
            best = Some((*id, *total));
        }
    }
    let (id, spent) = best?;

    let mut seen = HashSet::new();
    let aliases = users
        .iter()
        .filter(|u| &u.real_user_id == id)
        .map(|u| u.record.id.clone())
        .filter(|alias| seen.insert(alias.clone()))
        .collect();

    Some(TopBuyer {
        id: id.clone(),
        spent,
        aliases,
    })
}

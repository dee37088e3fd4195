use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::model::{
    CatalogRecord, IdentityMapping, PricedOrder, ResolvedOrder, ResolvedUser, UserId, UserRecord,
};

/// Attach `real_user_id` to every user row. IDs absent from the mapping
/// fall back to themselves.
pub fn apply_to_users(users: &[UserRecord], mapping: &IdentityMapping) -> Vec<ResolvedUser> {
    users
        .iter()
        .map(|record| ResolvedUser {
            real_user_id: mapping.canonical_or_self(&record.id),
            record: record.clone(),
        })
        .collect()
}

/// Raw user ID → canonical ID, as carried by the resolved user table.
pub fn user_lookup(users: &[ResolvedUser]) -> HashMap<UserId, UserId> {
    users
        .iter()
        .map(|u| (u.record.id.clone(), u.real_user_id.clone()))
        .collect()
}

/// Join each order's user reference through `lookup`. Orders without a
/// user reference, or whose user is unknown, keep `real_user_id = None`.
pub fn apply_to_orders(
    orders: &[PricedOrder],
    lookup: &HashMap<UserId, UserId>,
) -> Vec<ResolvedOrder> {
    orders
        .iter()
        .map(|priced| ResolvedOrder {
            real_user_id: priced
                .order
                .user_id
                .as_ref()
                .and_then(|id| lookup.get(id))
                .cloned(),
            priced: priced.clone(),
        })
        .collect()
}

/// Keep the first row of every group of exact duplicates. Returns the kept
/// rows and how many were dropped.
fn dedup_by<T, K, F>(rows: Vec<T>, key: F) -> (Vec<T>, usize)
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<T> = rows.into_iter().filter(|r| seen.insert(key(r))).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Users compare by their full source row and canonical ID.
pub fn dedup_users(users: Vec<ResolvedUser>) -> (Vec<ResolvedUser>, usize) {
    dedup_by(users, ResolvedUser::clone)
}

/// Orders compare by their full source row.
pub fn dedup_orders(orders: Vec<PricedOrder>) -> (Vec<PricedOrder>, usize) {
    dedup_by(orders, |o| o.order.raw_fields.clone())
}

pub fn dedup_catalog(books: Vec<CatalogRecord>) -> (Vec<CatalogRecord>, usize) {
    dedup_by(books, |b| b.raw_json.clone())
}

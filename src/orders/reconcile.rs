//! Merging the server's order history into the local cache

use std::collections::{HashMap, HashSet};

use super::Order;

/// Result of [`reconcile_orders`]
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReconciliation {
    /// Merged list, newest first
    pub orders: Vec<Order>,
    /// Orders the cache did not have
    pub added: usize,
    /// Cached orders replaced by the server's copy
    pub updated: usize,
    /// Cached orders the server no longer lists
    pub dropped: usize,
}

/// Merge the server's history into the cached list.
///
/// The server's copy wins for status, totals, timestamps and lines. Customer
/// and delivery fields are missing from history entries, so the cached values
/// are kept for those. A cached order the server does not list survives only
/// while it is newer than everything the server returned, which covers an
/// order created moments ago that the history endpoint has not caught up
/// with.
pub fn reconcile_orders(cached: &[Order], remote: Vec<Order>) -> OrderReconciliation {
    let by_id: HashMap<i64, &Order> = cached.iter().map(|order| (order.id, order)).collect();
    let newest_remote = remote.iter().map(|order| order.created_at).max();

    let mut added = 0;
    let mut updated = 0;
    let mut seen = HashSet::new();
    let mut orders = Vec::with_capacity(remote.len());

    for mut order in remote {
        if !seen.insert(order.id) {
            continue;
        }
        match by_id.get(&order.id) {
            Some(local) => {
                fill_customer_fields(&mut order, local);
                if order != **local {
                    updated += 1;
                }
            }
            None => added += 1,
        }
        orders.push(order);
    }

    let mut dropped = 0;
    for local in cached {
        if seen.contains(&local.id) {
            continue;
        }
        let keep = match newest_remote {
            Some(newest) => local.created_at > newest,
            None => false,
        };
        if keep && seen.insert(local.id) {
            orders.push(local.clone());
        } else if !keep {
            dropped += 1;
        }
    }

    orders.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    OrderReconciliation {
        orders,
        added,
        updated,
        dropped,
    }
}

fn fill_customer_fields(order: &mut Order, local: &Order) {
    fn keep(field: &mut Option<String>, local: &Option<String>) {
        if field.is_none() {
            field.clone_from(local);
        }
    }

    keep(&mut order.customer_name, &local.customer_name);
    keep(&mut order.customer_email, &local.customer_email);
    keep(&mut order.customer_phone, &local.customer_phone);
    keep(&mut order.delivery_address, &local.delivery_address);
    keep(&mut order.delivery_city, &local.delivery_city);
    keep(&mut order.delivery_postal_code, &local.delivery_postal_code);
    keep(&mut order.notes, &local.notes);

    if order.items.is_empty() && !local.items.is_empty() {
        order.items = local.items.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::OrderStatus;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn order(id: i64, created_at: NaiveDateTime, status: OrderStatus) -> Order {
        Order {
            id,
            total: Decimal::from(100),
            status,
            created_at,
            updated_at: Some(created_at),
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            delivery_address: None,
            delivery_city: None,
            delivery_postal_code: None,
            notes: None,
            items: Vec::new(),
        }
    }

    #[test]
    fn test_remote_status_wins_and_local_customer_fields_survive() {
        let mut local = order(1, at(1, 10), OrderStatus::Pending);
        local.customer_name = Some("Ana".to_string());
        local.delivery_city = Some("Maputo".to_string());

        let remote = vec![order(1, at(1, 10), OrderStatus::Shipped)];
        let result = reconcile_orders(&[local], remote);

        assert_eq!(result.orders.len(), 1);
        assert_eq!(result.orders[0].status, OrderStatus::Shipped);
        assert_eq!(result.orders[0].customer_name.as_deref(), Some("Ana"));
        assert_eq!(result.orders[0].delivery_city.as_deref(), Some("Maputo"));
        assert_eq!(result.updated, 1);
        assert_eq!(result.added, 0);
    }

    #[test]
    fn test_unchanged_order_is_not_counted_as_updated() {
        let local = order(1, at(1, 10), OrderStatus::Pending);
        let result = reconcile_orders(&[local.clone()], vec![local]);
        assert_eq!(result.updated, 0);
        assert_eq!(result.added, 0);
        assert_eq!(result.dropped, 0);
    }

    #[test]
    fn test_recent_local_order_survives_until_server_lists_it() {
        let just_placed = order(9, at(5, 12), OrderStatus::Pending);
        let stale = order(2, at(1, 9), OrderStatus::Pending);
        let remote = vec![order(3, at(3, 8), OrderStatus::Delivered)];

        let result = reconcile_orders(&[just_placed, stale], remote);

        let ids: Vec<i64> = result.orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![9, 3]);
        assert_eq!(result.added, 1);
        assert_eq!(result.dropped, 1);
    }

    #[test]
    fn test_empty_history_drops_cache() {
        let cached = vec![order(1, at(1, 10), OrderStatus::Pending)];
        let result = reconcile_orders(&cached, Vec::new());
        assert!(result.orders.is_empty());
        assert_eq!(result.dropped, 1);
    }

    #[test]
    fn test_sorted_newest_first_without_duplicates() {
        let remote = vec![
            order(1, at(1, 10), OrderStatus::Pending),
            order(4, at(4, 10), OrderStatus::Pending),
            order(4, at(4, 10), OrderStatus::Pending),
            order(2, at(4, 10), OrderStatus::Pending),
        ];
        let result = reconcile_orders(&[], remote);

        let ids: Vec<i64> = result.orders.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![4, 2, 1]);
        assert_eq!(result.added, 3);
    }
}

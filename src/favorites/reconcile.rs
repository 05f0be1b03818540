//! Pull/diff/merge of favorites against the server

use std::collections::HashSet;

use super::{Favorite, PendingChange};

/// Pending changes the server has not applied yet.
///
/// An `Add` is already satisfied when the server lists the product, a
/// `Remove` when it does not.
pub fn pending_to_replay(remote: &[Favorite], pending: &[PendingChange]) -> Vec<PendingChange> {
    let listed: HashSet<i64> = remote.iter().map(|favorite| favorite.product_id).collect();

    pending
        .iter()
        .copied()
        .filter(|change| match change {
            PendingChange::Add(id) => !listed.contains(id),
            PendingChange::Remove(id) => listed.contains(id),
        })
        .collect()
}

/// The server's list with still-pending local changes applied on top.
///
/// Unconfirmed additions go first, matching the server's newest-first order.
pub fn merge_favorites(remote: Vec<Favorite>, pending: &[PendingChange]) -> Vec<Favorite> {
    let removed: HashSet<i64> = pending
        .iter()
        .filter_map(|change| match change {
            PendingChange::Remove(id) => Some(*id),
            PendingChange::Add(_) => None,
        })
        .collect();

    let mut seen = HashSet::new();
    let mut merged: Vec<Favorite> = Vec::with_capacity(remote.len());

    for change in pending.iter().rev() {
        if let PendingChange::Add(id) = change {
            let listed = remote.iter().any(|favorite| favorite.product_id == *id);
            if !listed && seen.insert(*id) {
                merged.push(Favorite::unconfirmed(*id));
            }
        }
    }

    for favorite in remote {
        if removed.contains(&favorite.product_id) || !seen.insert(favorite.product_id) {
            continue;
        }
        merged.push(favorite);
    }

    merged
}

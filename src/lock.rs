use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// State behind these locks is plain data that is valid after any panic, so a
// poisoned lock is recovered instead of propagated.

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

//! Lock helpers. A poisoned lock surfaces as `PcalError::Concurrency`.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{PcalError, PcalResult};

/// Read lock helper.
pub fn read<T>(lock: &RwLock<T>) -> PcalResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|e| PcalError::Concurrency(e.to_string()))
}

/// Write lock helper.
pub fn write<T>(lock: &RwLock<T>) -> PcalResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|e| PcalError::Concurrency(e.to_string()))
}

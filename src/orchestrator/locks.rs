// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-light adaptation locks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::LightId;

/// Guard held while a light is being adapted or settled.
pub type AdaptationGuard = OwnedMutexGuard<()>;

/// One async mutex per light.
///
/// At most one adaptation or settle wait runs per light. Guards are owned,
/// so they can be held across awaits and are released on every exit path,
/// including when the holding future is dropped.
#[derive(Debug, Default)]
pub struct AdaptationLocks {
    locks: parking_lot::Mutex<HashMap<LightId, Arc<Mutex<()>>>>,
}

impl AdaptationLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock for `light` if it is free.
    #[must_use]
    pub fn try_lock(&self, light: &LightId) -> Option<AdaptationGuard> {
        self.lock_for(light).try_lock_owned().ok()
    }

    /// Waits for the lock of `light`.
    pub async fn lock(&self, light: &LightId) -> AdaptationGuard {
        self.lock_for(light).lock_owned().await
    }

    /// Returns `true` if the lock of `light` is currently held.
    #[must_use]
    pub fn is_locked(&self, light: &LightId) -> bool {
        self.locks
            .lock()
            .get(light)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    fn lock_for(&self, light: &LightId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.lock().entry(light.clone()).or_default())
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Debouncing of off-to-on flicker after a turn-off.
//!
//! A light that is turned off with a transition may still report `on` for a
//! while, and a host that polls it can observe off → on → off. Adapting on
//! that spurious `on` would switch the light back on. The
//! [`TransitionDebouncer`] holds such a turn-on back until the turn-off had
//! time to settle:
//!
//! 1. no on-to-off was observed, or the off-to-on came from a `turn_on`
//!    call: proceed
//! 2. wait the turn-off transition (at least the minimum delay) measured
//!    from the on-to-off observation
//! 3. check up to three times whether the light went off, waiting the
//!    minimum delay between checks: suppress if it did
//! 4. suppress anyway if the turn-off had a transition, else proceed
//!
//! A `turn_on` call for the light cancels the wait through
//! [`TransitionDebouncer::cancel`].

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::host::{LightHost, ServiceCall};
use crate::types::{CausationId, LightId};

/// Number of settle checks before giving up.
const SETTLE_CHECKS: usize = 3;

/// Result of [`TransitionDebouncer::should_suppress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// The turn-on is genuine; adapt the light.
    Proceed,
    /// The turn-on is the tail of a turn-off; leave the light alone.
    Suppress,
    /// The wait was cancelled by a `turn_on` call or a newer wait.
    Cancelled,
}

impl SettleOutcome {
    /// Returns `true` unless the turn-on is suppressed.
    #[must_use]
    pub const fn should_adapt(self) -> bool {
        !matches!(self, Self::Suppress)
    }
}

#[derive(Debug)]
struct OffObservation {
    at: Instant,
    causation: CausationId,
}

/// Debounce state of one light.
#[derive(Debug, Default)]
pub struct TransitionWatch {
    on_to_off: Option<OffObservation>,
    cancel: Option<oneshot::Sender<()>>,
}

impl TransitionWatch {
    /// Returns `true` while a settle wait is pending.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.cancel.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Returns when the light was last seen going from on to off.
    #[must_use]
    pub fn last_on_to_off(&self) -> Option<Instant> {
        self.on_to_off.as_ref().map(|seen| seen.at)
    }
}

/// Settle waits for all lights of an adapter.
#[derive(Debug)]
pub struct TransitionDebouncer {
    min_delay: Duration,
    watches: Mutex<HashMap<LightId, TransitionWatch>>,
}

impl TransitionDebouncer {
    /// Creates a debouncer waiting at least `min_delay` after a turn-off.
    #[must_use]
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            watches: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the minimum delay.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Records that `light` was seen going from on to off, now.
    pub fn record_on_to_off(&self, light: &LightId, causation: &CausationId) {
        self.watches.lock().entry(light.clone()).or_default().on_to_off = Some(OffObservation {
            at: Instant::now(),
            causation: causation.clone(),
        });
    }

    /// Cancels a pending settle wait for `light`.
    ///
    /// Returns `true` if a waiting task was woken.
    pub fn cancel(&self, light: &LightId) -> bool {
        let sender = self
            .watches
            .lock()
            .get_mut(light)
            .and_then(|watch| watch.cancel.take());
        let cancelled = sender.is_some_and(|tx| tx.send(()).is_ok());
        if cancelled {
            tracing::debug!(light = %light, "Cancelled settle wait");
        }
        cancelled
    }

    /// Returns `true` while a settle wait is pending for `light`.
    #[must_use]
    pub fn is_waiting(&self, light: &LightId) -> bool {
        self.watches
            .lock()
            .get(light)
            .is_some_and(TransitionWatch::is_waiting)
    }

    /// Decides whether an off-to-on change of `light` should be ignored.
    ///
    /// # Arguments
    ///
    /// * `light` - The light that turned on
    /// * `off_to_on` - Causation of the off-to-on change
    /// * `turn_on` - Last `turn_on` call for the light
    /// * `turn_off` - Last `turn_off` call for the light
    /// * `host` - Used to check whether the light went off meanwhile
    pub async fn should_suppress<H: LightHost + ?Sized>(
        &self,
        light: &LightId,
        off_to_on: &CausationId,
        turn_on: Option<&ServiceCall>,
        turn_off: Option<&ServiceCall>,
        host: &H,
    ) -> SettleOutcome {
        let Some((seen_at, on_to_off)) = self.on_to_off(light) else {
            return SettleOutcome::Proceed;
        };
        if turn_on.is_some_and(|call| call.causation == *off_to_on) {
            return SettleOutcome::Proceed;
        }

        let turn_off_transition = turn_off.and_then(|call| call.transition);
        let delay = match turn_off {
            Some(call) if call.causation == on_to_off => call
                .transition
                .map_or(self.min_delay, |transition| transition.max(self.min_delay)),
            _ => self.min_delay,
        };

        let elapsed = seen_at.elapsed();
        if elapsed > delay {
            return SettleOutcome::Proceed;
        }

        let mut delay = delay - elapsed;
        tracing::debug!(light = %light, ?delay, "Waiting before adapting light");
        for _ in 0..SETTLE_CHECKS {
            if !self.sleep_cancellable(light, delay).await {
                return SettleOutcome::Cancelled;
            }
            if !host.is_on(light) {
                tracing::debug!(light = %light, "Light went off while settling");
                return SettleOutcome::Suppress;
            }
            delay = self.min_delay;
        }

        if turn_off_transition.is_some() {
            tracing::debug!(light = %light, "Ignoring turn-on after a turn-off with transition");
            return SettleOutcome::Suppress;
        }
        SettleOutcome::Proceed
    }

    fn on_to_off(&self, light: &LightId) -> Option<(Instant, CausationId)> {
        let watches = self.watches.lock();
        let seen = watches.get(light)?.on_to_off.as_ref()?;
        Some((seen.at, seen.causation.clone()))
    }

    /// Sleeps `delay`; returns `false` if cancelled first.
    async fn sleep_cancellable(&self, light: &LightId, delay: Duration) -> bool {
        let (tx, rx) = oneshot::channel();
        self.watches.lock().entry(light.clone()).or_default().cancel = Some(tx);

        tokio::select! {
            () = tokio::time::sleep(delay) => true,
            _ = rx => false,
        }
    }
}

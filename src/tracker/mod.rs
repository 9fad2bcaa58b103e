// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Manual-control detection.
//!
//! The [`ManualControlTracker`] watches the service calls and state changes
//! the host reports and decides when a light has been taken over by
//! something other than the adapter. Two signals exist:
//!
//! - **Service calls**: a `turn_on` that was not issued by an adapter and
//!   sets a brightness or color attribute the adapter manages
//! - **State drift**: the light's attributes differ significantly from
//!   everything the adapter last sent and saw, for two consecutive cycles
//!
//! Either flips the light into manual control and publishes
//! [`AdapterEvent::ManualControl`] once. The flag stays until the light is
//! turned off, reset, or explicitly released.

mod record;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

pub use record::ManualControlRecord;

use crate::event::{AdapterEvent, EventBus};
use crate::host::{Service, ServiceCall, StateChanged};
use crate::state::{ChangeThresholds, LightAttributes, StateSnapshot};
use crate::types::{CausationId, LightId};

/// Consecutive significant changes that flip a light to manual control.
const CHANGES_BEFORE_TAKEOVER: u8 = 2;

/// Tracks manual control for a set of lights.
///
/// Records live behind per-light mutexes inside a registry lock, so
/// observing one light never blocks another. No lock is held across an
/// await point.
#[derive(Debug)]
pub struct ManualControlTracker {
    records: RwLock<HashMap<LightId, Arc<Mutex<ManualControlRecord>>>>,
    thresholds: ChangeThresholds,
    events: EventBus,
}

impl ManualControlTracker {
    /// Creates a tracker publishing to `events`.
    #[must_use]
    pub fn new(thresholds: ChangeThresholds, events: EventBus) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            thresholds,
            events,
        }
    }

    /// Starts tracking `light`. Tracking twice is a no-op.
    pub fn track(&self, light: &LightId) {
        self.record_for(light);
    }

    /// Returns `true` if `light` is tracked.
    #[must_use]
    pub fn is_tracked(&self, light: &LightId) -> bool {
        self.records.read().contains_key(light)
    }

    /// Returns all tracked lights, sorted.
    #[must_use]
    pub fn tracked(&self) -> Vec<LightId> {
        let mut lights: Vec<_> = self.records.read().keys().cloned().collect();
        lights.sort();
        lights
    }

    /// Returns the thresholds used for state drift.
    #[must_use]
    pub fn thresholds(&self) -> &ChangeThresholds {
        &self.thresholds
    }

    /// Records a light service call.
    ///
    /// `turn_off` also fully resets the light. An external `turn_on` only
    /// becomes takeover evidence for lights that `light_is_on` reports as on
    /// when the call arrives. Calls that target no tracked light are
    /// ignored. Returns `true` if the call was recorded.
    pub fn observe_service_call(&self, call: &ServiceCall, light_is_on: impl Fn(&LightId) -> bool) -> bool {
        let records: Vec<_> = call
            .lights
            .iter()
            .filter_map(|light| self.existing(light).map(|record| (light, record)))
            .collect();
        if records.is_empty() {
            return false;
        }

        for (light, record) in records {
            let mut record = record.lock();
            match call.service {
                Service::TurnOn => {
                    tracing::debug!(light = %light, causation = %call.causation, "Recorded turn_on call");
                    record.last_turn_on = Some(call.clone());
                    record.pending_takeover =
                        (!call.causation.is_self_originated() && light_is_on(light)).then(|| call.clone());
                }
                Service::TurnOff => {
                    tracing::debug!(light = %light, causation = %call.causation, "Recorded turn_off call");
                    record.last_turn_off = Some(call.clone());
                    record.reset(false);
                }
            }
        }
        true
    }

    /// Records the state a tracked light reported while on.
    ///
    /// Only states caused by an adapter command are kept; they are the
    /// references for [`significant_change`](Self::significant_change).
    pub fn observe_state_change(&self, change: &StateChanged) {
        let Some(new) = change.new.filter(|state| state.is_on()) else {
            return;
        };
        if !change.causation.is_self_originated() {
            return;
        }
        let Some(record) = self.existing(&change.light) else {
            return;
        };
        tracing::trace!(light = %change.light, causation = %change.causation, "Recorded state snapshot");
        record
            .lock()
            .push_snapshot(StateSnapshot::new(new, change.causation.clone()));
    }

    /// Decides whether `light` is under manual control.
    ///
    /// A light already flagged stays flagged. Otherwise a pending external
    /// `turn_on` flags it when `force` is not set and the call set a color
    /// attribute while colors are adapted or a brightness attribute while
    /// brightness is adapted. The call is consumed once it flagged the
    /// light.
    pub fn is_manually_controlled(
        &self,
        light: &LightId,
        force: bool,
        adapt_brightness: bool,
        adapt_color: bool,
    ) -> bool {
        let Some(record) = self.existing(light) else {
            return false;
        };
        let mut record = record.lock();
        if record.manual_control {
            return true;
        }

        let Some(call) = record.pending_takeover.as_ref() else {
            return false;
        };
        let takes_over =
            !force && ((adapt_color && call.sets_color()) || (adapt_brightness && call.sets_brightness()));
        if !takes_over {
            return false;
        }

        let causation = call.causation.clone();
        record.pending_takeover = None;
        record.manual_control = true;
        drop(record);
        tracing::info!(light = %light, causation = %causation, "Light was turned on with attributes, marking as manually controlled");
        self.events.publish(AdapterEvent::ManualControl {
            light: light.clone(),
            causation,
        });
        true
    }

    /// Checks whether `current` drifted away from what the adapter set.
    ///
    /// Without recorded snapshots nothing is compared and `false` is
    /// returned. The attributes must differ significantly from every
    /// snapshot and, when a command was recorded, from the command as well.
    /// The second significant result in a row flips the light to manual
    /// control; a non-significant result clears the streak.
    pub fn significant_change(
        &self,
        light: &LightId,
        current: &LightAttributes,
        adapt_brightness: bool,
        adapt_color: bool,
    ) -> bool {
        let Some(record) = self.existing(light) else {
            return false;
        };
        let mut record = record.lock();
        if record.snapshots.is_empty() {
            return false;
        }

        let differs = |reference: &LightAttributes| {
            current.significant_change(reference, &self.thresholds, adapt_brightness, adapt_color)
        };
        let mut change = None;
        for snapshot in &record.snapshots {
            match differs(snapshot.attributes()) {
                Some(found) => change = change.or(Some(found)),
                None => {
                    change = None;
                    break;
                }
            }
        }
        if change.is_some()
            && let Some(commanded) = record.commanded.as_ref()
        {
            change = differs(commanded);
        }

        let Some(change) = change else {
            record.change_count = 0;
            return false;
        };

        record.change_count = record.change_count.saturating_add(1);
        tracing::debug!(light = %light, %change, count = record.change_count, "Significant change detected");
        if record.change_count < CHANGES_BEFORE_TAKEOVER || record.manual_control {
            return true;
        }

        record.manual_control = true;
        drop(record);
        tracing::info!(light = %light, "Light was changed externally, marking as manually controlled");
        self.events.publish(AdapterEvent::ManualControl {
            light: light.clone(),
            causation: CausationId::external(),
        });
        true
    }

    /// Remembers the attributes the adapter just sent to `light`.
    pub fn record_commanded(&self, light: &LightId, attributes: LightAttributes) {
        self.record_for(light).lock().commanded = Some(attributes);
    }

    /// Clears detection state for `light`.
    pub fn reset(&self, light: &LightId, keep_manual_control: bool) {
        if let Some(record) = self.existing(light) {
            record.lock().reset(keep_manual_control);
            tracing::debug!(light = %light, keep_manual_control, "Reset light tracking");
        }
    }

    /// Marks or releases `light`.
    ///
    /// Marking publishes [`AdapterEvent::ManualControl`] if the light was
    /// not flagged yet. Releasing fully resets the light.
    pub fn set_manual_control(&self, light: &LightId, manual: bool, causation: &CausationId) {
        let record = self.record_for(light);
        let mut record = record.lock();
        if !manual {
            record.reset(false);
            return;
        }
        if record.manual_control {
            return;
        }
        record.manual_control = true;
        drop(record);
        self.events.publish(AdapterEvent::ManualControl {
            light: light.clone(),
            causation: causation.clone(),
        });
    }

    /// Returns `true` if `light` is flagged, without running detection.
    #[must_use]
    pub fn is_flagged(&self, light: &LightId) -> bool {
        self.existing(light)
            .is_some_and(|record| record.lock().manual_control)
    }

    /// Returns the flagged lights, sorted.
    #[must_use]
    pub fn manually_controlled(&self) -> Vec<LightId> {
        let mut lights: Vec<_> = self
            .records
            .read()
            .iter()
            .filter(|(_, record)| record.lock().manual_control)
            .map(|(light, _)| light.clone())
            .collect();
        lights.sort();
        lights
    }

    /// Returns the last `turn_on` call recorded for `light`.
    #[must_use]
    pub fn last_turn_on(&self, light: &LightId) -> Option<ServiceCall> {
        self.existing(light)?.lock().last_turn_on.clone()
    }

    /// Returns the last `turn_off` call recorded for `light`.
    #[must_use]
    pub fn last_turn_off(&self, light: &LightId) -> Option<ServiceCall> {
        self.existing(light)?.lock().last_turn_off.clone()
    }

    /// Returns a copy of the record for `light`.
    #[must_use]
    pub fn record(&self, light: &LightId) -> Option<ManualControlRecord> {
        Some(self.existing(light)?.lock().clone())
    }

    fn existing(&self, light: &LightId) -> Option<Arc<Mutex<ManualControlRecord>>> {
        self.records.read().get(light).cloned()
    }

    fn record_for(&self, light: &LightId) -> Arc<Mutex<ManualControlRecord>> {
        if let Some(record) = self.existing(light) {
            return record;
        }
        Arc::clone(self.records.write().entry(light.clone()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ServiceAttribute;
    use crate::state::LightState;

    fn light() -> LightId {
        LightId::new("light.desk")
    }

    fn tracker() -> (ManualControlTracker, tokio::sync::broadcast::Receiver<AdapterEvent>) {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let tracker = ManualControlTracker::new(ChangeThresholds::default(), bus);
        tracker.track(&light());
        (tracker, rx)
    }

    fn turn_on(causation: CausationId) -> ServiceCall {
        ServiceCall::new(Service::TurnOn, vec![light()], causation)
    }

    fn ours(sequence: u64) -> CausationId {
        CausationId::adapter("test", "interval", sequence, None)
    }

    fn snapshot(tracker: &ManualControlTracker, attrs: LightAttributes, causation: CausationId) {
        tracker.observe_state_change(&StateChanged::new(
            light(),
            Some(LightState::on(attrs)),
            Some(LightState::on(attrs)),
            causation,
        ));
    }

    // ========================================================================
    // Service calls
    // ========================================================================

    #[test]
    fn untracked_calls_are_ignored() {
        let (tracker, _rx) = tracker();
        let call = ServiceCall::new(Service::TurnOn, vec![LightId::new("light.other")], CausationId::external());
        assert!(!tracker.observe_service_call(&call, |_| true));
        assert!(tracker.last_turn_on(&LightId::new("light.other")).is_none());
    }

    #[test]
    fn external_brightness_turn_on_takes_over() {
        let (tracker, mut rx) = tracker();
        let call = turn_on(CausationId::external()).with_attribute(ServiceAttribute::BrightnessPct);
        assert!(tracker.observe_service_call(&call, |_| true));

        assert!(tracker.is_manually_controlled(&light(), false, true, true));
        assert!(rx.try_recv().unwrap().is_manual_control());

        // Already flagged: true again, no second event.
        assert!(tracker.is_manually_controlled(&light(), false, true, true));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn attributes_only_count_for_adapted_aspects() {
        let (tracker, _rx) = tracker();
        tracker.observe_service_call(&turn_on(CausationId::external()).with_attribute(ServiceAttribute::ColorTemp), |_| true);
        assert!(!tracker.is_manually_controlled(&light(), false, true, false));
        assert!(tracker.is_manually_controlled(&light(), false, false, true));
    }

    #[test]
    fn plain_forced_or_own_turn_on_does_not_take_over() {
        let (tracker, _rx) = tracker();

        tracker.observe_service_call(&turn_on(CausationId::external()), |_| true);
        assert!(!tracker.is_manually_controlled(&light(), false, true, true));

        tracker.observe_service_call(&turn_on(CausationId::external()).with_attribute(ServiceAttribute::Brightness), |_| true);
        assert!(!tracker.is_manually_controlled(&light(), true, true, true));

        tracker.observe_service_call(&turn_on(ours(1)).with_attribute(ServiceAttribute::Brightness), |_| true);
        assert!(!tracker.is_manually_controlled(&light(), false, true, true));
    }

    #[test]
    fn turn_on_while_off_is_not_a_takeover() {
        let (tracker, mut rx) = tracker();
        let call = turn_on(CausationId::external()).with_attribute(ServiceAttribute::Brightness);
        assert!(tracker.observe_service_call(&call, |_| false));

        assert!(!tracker.is_manually_controlled(&light(), false, true, true));
        assert_eq!(tracker.last_turn_on(&light()), Some(call));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn released_light_is_not_taken_over_again_by_the_same_call() {
        let (tracker, mut rx) = tracker();
        let call = turn_on(CausationId::external()).with_attribute(ServiceAttribute::Brightness);
        tracker.observe_service_call(&call, |_| true);
        assert!(tracker.is_manually_controlled(&light(), false, true, true));
        assert!(rx.try_recv().unwrap().is_manual_control());

        tracker.set_manual_control(&light(), false, &CausationId::external());
        assert!(!tracker.is_manually_controlled(&light(), false, true, true));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reset_drops_pending_takeover() {
        let (tracker, _rx) = tracker();
        tracker.observe_service_call(
            &turn_on(CausationId::external()).with_attribute(ServiceAttribute::ColorTemp),
            |_| true,
        );
        tracker.reset(&light(), true);
        assert!(!tracker.is_manually_controlled(&light(), false, true, true));
        assert!(tracker.last_turn_on(&light()).is_some());
    }

    #[test]
    fn turn_off_clears_manual_control() {
        let (tracker, _rx) = tracker();
        tracker.set_manual_control(&light(), true, &CausationId::external());
        assert!(tracker.is_flagged(&light()));

        let off = ServiceCall::new(Service::TurnOff, vec![light()], CausationId::external());
        tracker.observe_service_call(&off, |_| true);
        assert!(!tracker.is_flagged(&light()));
        assert_eq!(tracker.last_turn_off(&light()), Some(off));
    }

    // ========================================================================
    // State drift
    // ========================================================================

    #[test]
    fn no_snapshots_means_no_change() {
        let (tracker, _rx) = tracker();
        let current = LightAttributes::new().with_brightness(255);
        assert!(!tracker.significant_change(&light(), &current, true, true));
    }

    #[test]
    fn external_states_are_not_recorded() {
        let (tracker, _rx) = tracker();
        snapshot(&tracker, LightAttributes::new().with_brightness(10), CausationId::external());
        assert!(tracker.record(&light()).unwrap().snapshots.is_empty());
    }

    #[test]
    fn two_consecutive_changes_take_over() {
        let (tracker, mut rx) = tracker();
        snapshot(&tracker, LightAttributes::new().with_brightness(100), ours(1));
        let moved = LightAttributes::new().with_brightness(200);

        assert!(tracker.significant_change(&light(), &moved, true, true));
        assert!(!tracker.is_flagged(&light()));
        assert!(tracker.significant_change(&light(), &moved, true, true));
        assert!(tracker.is_flagged(&light()));
        assert!(rx.try_recv().unwrap().is_manual_control());
    }

    #[test]
    fn quiet_cycle_resets_the_streak() {
        let (tracker, _rx) = tracker();
        let base = LightAttributes::new().with_brightness(100);
        snapshot(&tracker, base, ours(1));
        let moved = LightAttributes::new().with_brightness(200);

        assert!(tracker.significant_change(&light(), &moved, true, true));
        assert!(!tracker.significant_change(&light(), &base, true, true));
        assert!(tracker.significant_change(&light(), &moved, true, true));
        assert!(!tracker.is_flagged(&light()));
    }

    #[test]
    fn matching_any_snapshot_is_not_a_change() {
        let (tracker, _rx) = tracker();
        let cause = ours(1);
        snapshot(&tracker, LightAttributes::new().with_brightness(100), cause.clone());
        snapshot(&tracker, LightAttributes::new().with_brightness(200), cause);

        let current = LightAttributes::new().with_brightness(200);
        assert!(!tracker.significant_change(&light(), &current, true, true));
    }

    #[test]
    fn matching_the_command_is_not_a_change() {
        let (tracker, _rx) = tracker();
        snapshot(&tracker, LightAttributes::new().with_brightness(100), ours(1));
        tracker.record_commanded(&light(), LightAttributes::new().with_brightness(200));

        let current = LightAttributes::new().with_brightness(205);
        assert!(!tracker.significant_change(&light(), &current, true, true));
        assert_eq!(tracker.record(&light()).unwrap().change_count, 0);
    }

    #[test]
    fn reset_keeping_manual_control() {
        let (tracker, _rx) = tracker();
        snapshot(&tracker, LightAttributes::new().with_brightness(1), ours(1));
        tracker.set_manual_control(&light(), true, &CausationId::external());

        tracker.reset(&light(), true);
        let record = tracker.record(&light()).unwrap();
        assert!(record.manual_control);
        assert!(record.snapshots.is_empty());

        tracker.set_manual_control(&light(), false, &CausationId::external());
        assert!(tracker.manually_controlled().is_empty());
    }

    #[test]
    fn manually_controlled_lists_flagged_lights() {
        let (tracker, _rx) = tracker();
        let other = LightId::new("light.bed");
        tracker.set_manual_control(&other, true, &CausationId::external());
        assert_eq!(tracker.manually_controlled(), vec![other.clone()]);
        assert_eq!(tracker.tracked(), vec![other, light()]);
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the adapter against an in-memory host.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;

use sunlight_lib::capabilities::LightCapabilities;
use sunlight_lib::color::StandardColorConverter;
use sunlight_lib::command::LightCommand;
use sunlight_lib::config::AdaptationConfig;
use sunlight_lib::error::{Error, HostError, ScheduleError};
use sunlight_lib::event::AdapterEvent;
use sunlight_lib::host::{HostEvent, LightHost, Service, ServiceCall, StateChanged};
use sunlight_lib::orchestrator::{Adapter, ApplyRequest, LightOutcome};
use sunlight_lib::solar::DailyEphemeris;
use sunlight_lib::state::{LightAttributes, LightState};
use sunlight_lib::types::{CausationId, LightId};

// ============================================================================
// In-memory host
// ============================================================================

struct MockLight {
    capabilities: LightCapabilities,
    state: LightState,
    failing: bool,
}

#[derive(Debug, Clone)]
struct Sent {
    light: LightId,
    command: LightCommand,
    causation: CausationId,
    at: Instant,
}

#[derive(Default)]
struct MockHost {
    lights: Mutex<HashMap<LightId, MockLight>>,
    sent: Mutex<Vec<Sent>>,
}

impl MockHost {
    fn with_light(self, name: &str, on: bool) -> Self {
        let state = if on {
            LightState::on(LightAttributes::new().with_brightness(128).with_color_temp(300))
        } else {
            LightState::off()
        };
        self.lights.lock().insert(
            LightId::new(name),
            MockLight {
                capabilities: LightCapabilities::rgbcct_light(),
                state,
                failing: false,
            },
        );
        self
    }

    fn set_state(&self, light: &LightId, state: LightState) {
        if let Some(entry) = self.lights.lock().get_mut(light) {
            entry.state = state;
        }
    }

    fn set_failing(&self, light: &LightId) {
        if let Some(entry) = self.lights.lock().get_mut(light) {
            entry.failing = true;
        }
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }
}

impl LightHost for MockHost {
    async fn send_command(
        &self,
        light: &LightId,
        command: &LightCommand,
        causation: &CausationId,
    ) -> Result<(), HostError> {
        let mut lights = self.lights.lock();
        let entry = lights
            .get_mut(light)
            .ok_or_else(|| HostError::UnknownLight(light.to_string()))?;
        if entry.failing {
            return Err(HostError::CommandRejected(light.to_string()));
        }

        entry.state.on = true;
        let attrs = &mut entry.state.attributes;
        if let Some(brightness) = command.brightness {
            attrs.brightness = Some(brightness);
        }
        if let Some(mired) = command.color_temp {
            attrs.color_temp = Some(mired);
            attrs.rgb_color = None;
        }
        if let Some(rgb) = command.rgb_color {
            attrs.rgb_color = Some(rgb);
            attrs.color_temp = None;
        }

        self.sent.lock().push(Sent {
            light: light.clone(),
            command: *command,
            causation: causation.clone(),
            at: Instant::now(),
        });
        Ok(())
    }

    fn capabilities(&self, light: &LightId) -> Option<LightCapabilities> {
        self.lights.lock().get(light).map(|entry| entry.capabilities)
    }

    fn state(&self, light: &LightId) -> Option<LightState> {
        self.lights.lock().get(light).map(|entry| entry.state)
    }
}

// ============================================================================
// Helpers
// ============================================================================

type TestAdapter = Adapter<MockHost, DailyEphemeris, StandardColorConverter>;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
}

fn desk() -> LightId {
    LightId::new("light.desk")
}

fn sofa() -> LightId {
    LightId::new("light.sofa")
}

fn config() -> AdaptationConfig {
    AdaptationConfig::new("living_room").with_lights(["light.desk", "light.sofa"])
}

fn adapter_with(config: AdaptationConfig, host: MockHost) -> TestAdapter {
    Adapter::new(config, host, DailyEphemeris::temperate(), StandardColorConverter)
        .unwrap()
        .with_clock(noon)
}

fn adapter(host: MockHost) -> TestAdapter {
    adapter_with(config(), host)
}

fn manual_control_events(rx: &mut broadcast::Receiver<AdapterEvent>) -> Vec<LightId> {
    let mut lights = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let AdapterEvent::ManualControl { light, .. } = event {
            lights.push(light);
        }
    }
    lights
}

fn state_changed(light: LightId, old: LightState, new: LightState, causation: CausationId) -> HostEvent {
    StateChanged::new(light, Some(old), Some(new), causation).into()
}

fn on() -> LightState {
    LightState::on(LightAttributes::new())
}

// ============================================================================
// Adapter switch and cycle
// ============================================================================

mod cycle {
    use super::*;

    #[tokio::test]
    async fn turn_on_adapts_lights_that_are_on() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true).with_light("light.sofa", false));

        let report = adapter.turn_on(true).await.unwrap().unwrap();
        let settings = adapter.settings().unwrap();

        assert_eq!(report.adapted(), vec![&desk()]);
        assert_eq!(report.outcome(&sofa()), Some(&LightOutcome::Off));

        let sent = adapter.host().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].light, desk());
        assert_eq!(sent[0].command.brightness, Some(255));
        assert_eq!(sent[0].command.color_temp, Some(settings.color_temp_mired));
        assert_eq!(sent[0].command.transition, Some(Duration::from_secs(1)));
        assert!(sent[0].causation.is_self_originated());
    }

    #[tokio::test]
    async fn second_turn_on_is_a_noop() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        assert!(adapter.turn_on(true).await.unwrap().is_some());
        assert!(adapter.turn_on(true).await.unwrap().is_none());
        assert_eq!(adapter.host().sent().len(), 1);
    }

    #[tokio::test]
    async fn tick_uses_the_interval_transition_and_needs_the_adapter_on() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));

        assert!(adapter.tick().await.unwrap().is_empty());
        assert!(adapter.host().sent().is_empty());

        adapter.turn_on(false).await.unwrap();
        let report = adapter.tick().await.unwrap();
        assert_eq!(report.adapted(), vec![&desk()]);
        assert_eq!(adapter.host().sent()[0].command.transition, Some(Duration::from_secs(45)));

        adapter.turn_off();
        assert!(adapter.tick().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_once_adapts_on_turn_on_only() {
        let config = AdaptationConfig {
            only_once: true,
            ..config()
        };
        let adapter = adapter_with(config, MockHost::default().with_light("light.desk", true));

        adapter.turn_on(true).await.unwrap();
        assert_eq!(adapter.host().sent().len(), 1);

        let report = adapter.tick().await.unwrap();
        assert!(report.is_empty());
        assert_eq!(adapter.host().sent().len(), 1);
        assert!(adapter.settings().is_some());
    }

    #[tokio::test]
    async fn host_failure_does_not_abort_the_batch() {
        let host = MockHost::default().with_light("light.desk", true).with_light("light.sofa", true);
        host.set_failing(&desk());
        let adapter = adapter(host);

        let report = adapter.turn_on(true).await.unwrap().unwrap();
        assert_eq!(report.failed().len(), 1);
        assert_eq!(report.failed()[0].0, &desk());
        assert_eq!(report.adapted(), vec![&sofa()]);
    }

    #[tokio::test]
    async fn locked_light_is_skipped() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        adapter.turn_on(false).await.unwrap();

        let guard = adapter.locks().try_lock(&desk()).unwrap();
        let report = adapter.tick().await.unwrap();
        assert_eq!(report.outcome(&desk()), Some(&LightOutcome::Locked));
        drop(guard);

        let report = adapter.tick().await.unwrap();
        assert!(report.outcome(&desk()).unwrap().is_adapted());
    }

    #[tokio::test]
    async fn schedule_ordering_error_aborts_the_cycle() {
        let config = AdaptationConfig {
            sunrise_offset: TimeDelta::hours(7),
            ..config()
        };
        let adapter = adapter_with(config, MockHost::default().with_light("light.desk", true));

        let err = adapter.turn_on(true).await.unwrap_err();
        assert!(matches!(err, Error::Schedule(ScheduleError::Ordering(_))));
        assert!(adapter.host().sent().is_empty());
    }

    #[tokio::test]
    async fn sleep_mode_uses_sleep_values() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        adapter.turn_on(false).await.unwrap();

        let report = adapter.set_sleep_mode(true).await.unwrap().unwrap();
        assert!(report.outcome(&desk()).unwrap().is_adapted());

        let sent = adapter.host().sent();
        let cmd = sent.last().unwrap().command;
        assert_eq!(cmd.brightness, Some(3));
        assert_eq!(cmd.color_temp, Some(500));
        assert_eq!(cmd.transition, Some(Duration::from_secs(1)));
        assert!(adapter.is_sleep_mode());
    }

    #[tokio::test]
    async fn adapt_color_switch_limits_the_command() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        adapter.set_adapt_color(false);
        adapter.turn_on(true).await.unwrap();

        let cmd = adapter.host().sent()[0].command;
        assert!(cmd.brightness.is_some());
        assert!(cmd.color_temp.is_none());
        assert!(cmd.rgb_color.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_every_interval_until_shutdown() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        adapter.turn_on(false).await.unwrap();

        adapter.run(tokio::time::sleep(Duration::from_secs(200))).await;
        assert_eq!(adapter.host().sent().len(), 2);
    }
}

// ============================================================================
// Manual control
// ============================================================================

mod manual_control {
    use super::*;

    #[tokio::test]
    async fn external_turn_on_with_brightness_takes_over() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        let mut rx = adapter.subscribe();
        adapter.turn_on(false).await.unwrap();

        let call = ServiceCall::from_service_data(
            Service::TurnOn,
            vec![desk()],
            &serde_json::json!({"brightness": 50}),
            CausationId::external(),
        );
        assert!(adapter.handle_event(call.into()).await.unwrap().is_none());

        let report = adapter.tick().await.unwrap();
        assert_eq!(report.outcome(&desk()), Some(&LightOutcome::ManuallyControlled));
        assert_eq!(manual_control_events(&mut rx), vec![desk()]);

        let off = ServiceCall::new(Service::TurnOff, vec![desk()], CausationId::external());
        adapter.handle_event(off.into()).await.unwrap();
        assert!(!adapter.tracker().is_flagged(&desk()));
    }

    fn brightness_turn_on() -> HostEvent {
        ServiceCall::from_service_data(
            Service::TurnOn,
            vec![desk()],
            &serde_json::json!({"brightness": 50}),
            CausationId::external(),
        )
        .into()
    }

    #[tokio::test]
    async fn released_light_stays_adapted() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        let mut rx = adapter.subscribe();
        adapter.turn_on(false).await.unwrap();

        adapter.handle_event(brightness_turn_on()).await.unwrap();
        assert_eq!(
            adapter.tick().await.unwrap().outcome(&desk()),
            Some(&LightOutcome::ManuallyControlled)
        );
        assert_eq!(manual_control_events(&mut rx), vec![desk()]);

        adapter.set_manual_control(&[desk()], false, None).await.unwrap();
        assert!(!adapter.tracker().is_flagged(&desk()));

        let report = adapter.tick().await.unwrap();
        assert!(report.outcome(&desk()).unwrap().is_adapted());
        assert!(!adapter.tracker().is_flagged(&desk()));
        assert!(manual_control_events(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn sleep_toggle_releases_for_good() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        adapter.turn_on(false).await.unwrap();

        adapter.handle_event(brightness_turn_on()).await.unwrap();
        assert_eq!(
            adapter.tick().await.unwrap().outcome(&desk()),
            Some(&LightOutcome::ManuallyControlled)
        );

        adapter.set_sleep_mode(true).await.unwrap();
        adapter.set_sleep_mode(false).await.unwrap();
        assert!(adapter.tick().await.unwrap().outcome(&desk()).unwrap().is_adapted());
    }

    #[tokio::test]
    async fn turn_on_from_off_with_brightness_is_not_manual() {
        let adapter = adapter(MockHost::default().with_light("light.desk", false));
        let mut rx = adapter.subscribe();
        adapter.turn_on(false).await.unwrap();

        adapter.handle_event(brightness_turn_on()).await.unwrap();
        adapter.host().set_state(&desk(), on());
        let report = adapter
            .handle_event(state_changed(desk(), LightState::off(), on(), CausationId::external()))
            .await
            .unwrap()
            .unwrap();
        assert!(report.outcome(&desk()).unwrap().is_adapted());

        let report = adapter.tick().await.unwrap();
        assert!(report.outcome(&desk()).unwrap().is_adapted());
        assert!(manual_control_events(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn take_over_disabled_keeps_adapting() {
        let config = config().with_take_over_control(false);
        let adapter = adapter_with(config, MockHost::default().with_light("light.desk", true));
        adapter.turn_on(false).await.unwrap();
        adapter.tracker().set_manual_control(&desk(), true, &CausationId::external());

        let report = adapter.tick().await.unwrap();
        assert!(report.outcome(&desk()).unwrap().is_adapted());
    }

    #[tokio::test]
    async fn set_manual_control_marks_and_releases() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        let mut rx = adapter.subscribe();
        adapter.turn_on(false).await.unwrap();

        assert!(adapter.set_manual_control(&[desk()], true, None).await.unwrap().is_none());
        assert_eq!(manual_control_events(&mut rx), vec![desk()]);
        assert_eq!(
            adapter.tick().await.unwrap().outcome(&desk()),
            Some(&LightOutcome::ManuallyControlled)
        );

        let report = adapter.set_manual_control(&[desk()], false, None).await.unwrap().unwrap();
        assert!(report.outcome(&desk()).unwrap().is_adapted());
        assert_eq!(adapter.host().sent().last().unwrap().command.transition, Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn drift_takes_over_after_two_cycles() {
        let config = config().with_detect_external_changes(true);
        let adapter = adapter_with(config, MockHost::default().with_light("light.desk", true));
        let mut rx = adapter.subscribe();
        adapter.turn_on(true).await.unwrap();

        // The host reports the state the command produced.
        let sent = adapter.host().sent();
        let reported = adapter.host().state(&desk()).unwrap();
        adapter
            .handle_event(state_changed(desk(), reported, reported, sent[0].causation.clone()))
            .await
            .unwrap();

        // Somebody dims the light outside of any light service.
        let dimmed = LightState::on(LightAttributes {
            brightness: Some(10),
            ..reported.attributes
        });
        adapter.host().set_state(&desk(), dimmed);

        let first = adapter.tick().await.unwrap();
        assert_eq!(first.outcome(&desk()), Some(&LightOutcome::SignificantChange));
        assert!(!adapter.tracker().is_flagged(&desk()));

        let second = adapter.tick().await.unwrap();
        assert_eq!(second.outcome(&desk()), Some(&LightOutcome::SignificantChange));
        assert_eq!(manual_control_events(&mut rx), vec![desk()]);

        let third = adapter.tick().await.unwrap();
        assert_eq!(third.outcome(&desk()), Some(&LightOutcome::ManuallyControlled));
        assert_eq!(adapter.host().sent().len(), 1);
    }

    #[tokio::test]
    async fn unchanged_light_keeps_being_adapted_with_detection_on() {
        let config = config().with_detect_external_changes(true);
        let adapter = adapter_with(config, MockHost::default().with_light("light.desk", true));
        adapter.turn_on(true).await.unwrap();

        let sent = adapter.host().sent();
        let reported = adapter.host().state(&desk()).unwrap();
        adapter
            .handle_event(state_changed(desk(), reported, reported, sent[0].causation.clone()))
            .await
            .unwrap();

        for _ in 0..3 {
            let report = adapter.tick().await.unwrap();
            assert!(report.outcome(&desk()).unwrap().is_adapted());
        }
    }
}

// ============================================================================
// Services
// ============================================================================

mod services {
    use super::*;

    #[tokio::test]
    async fn apply_skips_off_lights_unless_asked() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true).with_light("light.sofa", false));

        let report = adapter.apply(ApplyRequest::new()).await.unwrap();
        assert_eq!(report.adapted(), vec![&desk()]);
        assert_eq!(report.outcome(&sofa()), Some(&LightOutcome::Off));

        let report = adapter
            .apply(ApplyRequest::new().with_lights(vec![sofa()]).with_turn_on_lights(true))
            .await
            .unwrap();
        assert_eq!(report.adapted(), vec![&sofa()]);
        assert!(adapter.host().is_on(&sofa()));
    }

    #[tokio::test]
    async fn apply_ignores_manual_control_and_uses_request_options() {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        adapter.tracker().set_manual_control(&desk(), true, &CausationId::external());
        let parent = CausationId::external();

        let report = adapter
            .apply(
                ApplyRequest::new()
                    .with_transition(Duration::from_secs(3))
                    .with_adapt(true, false)
                    .with_parent(parent.clone()),
            )
            .await
            .unwrap();
        assert!(report.outcome(&desk()).unwrap().is_adapted());

        let sent = adapter.host().sent();
        assert_eq!(sent[0].command.transition, Some(Duration::from_secs(3)));
        assert!(sent[0].command.color_temp.is_none());
        assert_eq!(sent[0].causation.parent(), Some(parent.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn separate_commands_send_color_then_brightness() {
        let config = config().with_separate_turn_on_commands(true);
        let adapter = adapter_with(config, MockHost::default().with_light("light.desk", true));

        adapter
            .apply(ApplyRequest::new().with_transition(Duration::from_secs(10)))
            .await
            .unwrap();

        let sent = adapter.host().sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].command.color_temp.is_some());
        assert!(sent[0].command.brightness.is_none());
        assert_eq!(sent[0].command.transition, Some(Duration::from_secs(5)));
        assert!(sent[1].command.brightness.is_some());
        assert!(sent[1].command.color_temp.is_none());
        assert_eq!(sent[1].at - sent[0].at, Duration::from_secs(5));
        assert_eq!(sent[0].causation, sent[1].causation);
    }
}

// ============================================================================
// Turn-on debounce
// ============================================================================

mod debounce {
    use super::*;

    async fn switched_on_adapter() -> TestAdapter {
        let adapter = adapter(MockHost::default().with_light("light.desk", true));
        adapter.turn_on(false).await.unwrap();
        adapter
    }

    #[tokio::test(start_paused = true)]
    async fn flicker_back_to_off_is_suppressed() {
        let adapter = switched_on_adapter().await;
        let mut rx = adapter.subscribe();

        adapter
            .handle_event(state_changed(desk(), on(), LightState::off(), CausationId::external()))
            .await
            .unwrap();
        adapter.host().set_state(&desk(), LightState::off());

        let start = Instant::now();
        let report = adapter
            .handle_event(state_changed(desk(), LightState::off(), on(), CausationId::external()))
            .await
            .unwrap();
        assert!(report.is_none());
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert!(adapter.host().sent().is_empty());
        assert!(matches!(rx.try_recv(), Ok(AdapterEvent::SettleSuppressed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn light_that_stays_on_is_adapted_after_settling() {
        let adapter = switched_on_adapter().await;

        adapter
            .handle_event(state_changed(desk(), on(), LightState::off(), CausationId::external()))
            .await
            .unwrap();

        let start = Instant::now();
        let report = adapter
            .handle_event(state_changed(desk(), LightState::off(), on(), CausationId::external()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(15));
        assert!(report.outcome(&desk()).unwrap().is_adapted());
        assert_eq!(adapter.host().sent()[0].command.transition, Some(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn turn_on_call_cancels_the_wait() {
        let adapter = switched_on_adapter().await;

        adapter
            .handle_event(state_changed(desk(), on(), LightState::off(), CausationId::external()))
            .await
            .unwrap();

        let start = Instant::now();
        let settle = adapter.handle_event(state_changed(desk(), LightState::off(), on(), CausationId::external()));
        let call = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let call = ServiceCall::new(Service::TurnOn, vec![desk()], CausationId::external());
            adapter.handle_event(call.into()).await.unwrap();
        };
        let (report, ()) = tokio::join!(settle, call);

        assert!(report.unwrap().unwrap().outcome(&desk()).unwrap().is_adapted());
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn first_turn_on_is_adapted_right_away() {
        let adapter = switched_on_adapter().await;
        adapter.host().set_state(&desk(), on());

        let report = adapter
            .handle_event(state_changed(desk(), LightState::off(), on(), CausationId::external()))
            .await
            .unwrap()
            .unwrap();
        assert!(report.outcome(&desk()).unwrap().is_adapted());
    }

    #[tokio::test]
    async fn events_for_other_lights_are_ignored() {
        let adapter = switched_on_adapter().await;
        let other = LightId::new("light.garage");

        let report = adapter
            .handle_event(state_changed(other, LightState::off(), on(), CausationId::external()))
            .await
            .unwrap();
        assert!(report.is_none());
    }
}

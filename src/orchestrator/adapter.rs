// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The adapter: one instance controlling a set of lights.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use super::locks::AdaptationLocks;
use super::report::{AdaptationReport, LightOutcome};
use crate::color::ColorConverter;
use crate::command::{CommandOptions, LightCommand, build_command, split_command};
use crate::config::AdaptationConfig;
use crate::debounce::{SettleOutcome, TransitionDebouncer};
use crate::error::{HostError, Result};
use crate::event::{AdapterEvent, EventBus};
use crate::host::{HostEvent, LightHost, Service, ServiceCall, StateChanged};
use crate::solar::{Ephemeris, Interpolator, LightSettings, ScheduleBuilder, SettingsProjector};
use crate::tracker::ManualControlTracker;
use crate::types::{CausationId, LightId};

/// Source of the current instant.
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct SwitchState {
    on: bool,
    sleep: bool,
    adapt_brightness: bool,
    adapt_color: bool,
    settings: Option<LightSettings>,
}

/// Arguments of [`Adapter::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyRequest {
    /// Lights to adapt; empty means every configured light.
    pub lights: Vec<LightId>,
    /// Transition; `None` uses the configured one.
    pub transition: Option<Duration>,
    /// Whether brightness is set.
    pub adapt_brightness: bool,
    /// Whether color is set.
    pub adapt_color: bool,
    /// Send RGB instead of color temperature where both are supported.
    pub prefer_rgb_color: bool,
    /// Send RGB outside a light's color temperature range.
    pub extend_color_temp_range: bool,
    /// Also adapt (and so turn on) lights that are off.
    pub turn_on_lights: bool,
    /// Causation of the service call that asked for this.
    pub parent: Option<CausationId>,
}

impl Default for ApplyRequest {
    fn default() -> Self {
        Self {
            lights: Vec::new(),
            transition: None,
            adapt_brightness: true,
            adapt_color: true,
            prefer_rgb_color: false,
            extend_color_temp_range: false,
            turn_on_lights: false,
            parent: None,
        }
    }
}

impl ApplyRequest {
    /// Creates a request for every configured light.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the request to `lights`.
    #[must_use]
    pub fn with_lights(mut self, lights: Vec<LightId>) -> Self {
        self.lights = lights;
        self
    }

    /// Sets the transition.
    #[must_use]
    pub fn with_transition(mut self, transition: Duration) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Sets which aspects are adapted.
    #[must_use]
    pub fn with_adapt(mut self, brightness: bool, color: bool) -> Self {
        self.adapt_brightness = brightness;
        self.adapt_color = color;
        self
    }

    /// Includes lights that are off.
    #[must_use]
    pub fn with_turn_on_lights(mut self, turn_on: bool) -> Self {
        self.turn_on_lights = turn_on;
        self
    }

    /// Sets the parent causation.
    #[must_use]
    pub fn with_parent(mut self, parent: CausationId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Adapts a set of lights to the sun.
///
/// The adapter is driven from outside: the host calls [`tick`](Self::tick)
/// (or [`run`](Self::run)) for the periodic cycle, feeds light notifications
/// into [`handle_event`](Self::handle_event), and maps its own switches and
/// services onto [`turn_on`](Self::turn_on), [`set_sleep_mode`](Self::set_sleep_mode),
/// [`apply`](Self::apply) and friends. The adapter starts switched off.
///
/// # Examples
///
/// ```no_run
/// use sunlight_lib::color::StandardColorConverter;
/// use sunlight_lib::config::AdaptationConfig;
/// use sunlight_lib::orchestrator::Adapter;
/// use sunlight_lib::solar::DailyEphemeris;
/// # use sunlight_lib::{capabilities::LightCapabilities, command::LightCommand, error::HostError,
/// #     host::LightHost, state::LightState, types::{CausationId, LightId}};
/// # struct MyHost;
/// # impl LightHost for MyHost {
/// #     async fn send_command(&self, _: &LightId, _: &LightCommand, _: &CausationId) -> Result<(), HostError> { Ok(()) }
/// #     fn capabilities(&self, _: &LightId) -> Option<LightCapabilities> { None }
/// #     fn state(&self, _: &LightId) -> Option<LightState> { None }
/// # }
///
/// # async fn demo() -> sunlight_lib::Result<()> {
/// let config = AdaptationConfig::new("living_room").with_lights(["light.sofa"]);
/// let adapter = Adapter::new(config, MyHost, DailyEphemeris::temperate(), StandardColorConverter)?;
///
/// adapter.turn_on(true).await?;
/// adapter.run(tokio::time::sleep(std::time::Duration::from_secs(3600))).await;
/// # Ok(())
/// # }
/// ```
pub struct Adapter<H, E, C> {
    config: AdaptationConfig,
    host: H,
    ephemeris: E,
    schedule: ScheduleBuilder,
    interpolator: Interpolator,
    projector: SettingsProjector<C>,
    tracker: ManualControlTracker,
    debouncer: TransitionDebouncer,
    locks: AdaptationLocks,
    events: EventBus,
    state: Mutex<SwitchState>,
    tag: String,
    sequence: AtomicU64,
    clock: Clock,
}

impl<H: LightHost, E: Ephemeris, C: ColorConverter> Adapter<H, E, C> {
    /// Creates a switched-off adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`](crate::Error::Value) if the configuration
    /// does not validate.
    pub fn new(config: AdaptationConfig, host: H, ephemeris: E, converter: C) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new();
        let tracker = ManualControlTracker::new(config.thresholds, events.clone());
        for light in &config.lights {
            tracker.track(light);
        }

        Ok(Self {
            schedule: config.schedule_builder(),
            interpolator: config.interpolator(),
            projector: config.projector(converter),
            debouncer: TransitionDebouncer::new(config.turning_off_delay),
            tag: format!("{}_{:04x}", config.name, short_hash(&config.name)),
            config,
            host,
            ephemeris,
            tracker,
            locks: AdaptationLocks::new(),
            events,
            state: Mutex::new(SwitchState {
                on: false,
                sleep: false,
                adapt_brightness: true,
                adapt_color: true,
                settings: None,
            }),
            sequence: AtomicU64::new(0),
            clock: Box::new(Utc::now),
        })
    }

    /// Replaces the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AdaptationConfig {
        &self.config
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns the manual-control tracker.
    #[must_use]
    pub fn tracker(&self) -> &ManualControlTracker {
        &self.tracker
    }

    /// Returns the transition debouncer.
    #[must_use]
    pub fn debouncer(&self) -> &TransitionDebouncer {
        &self.debouncer
    }

    /// Returns the per-light adaptation locks.
    #[must_use]
    pub fn locks(&self) -> &AdaptationLocks {
        &self.locks
    }

    /// Returns the event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribes to adapter events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AdapterEvent> {
        self.events.subscribe()
    }

    /// Returns `true` if the adapter is switched on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state.lock().on
    }

    /// Returns `true` if sleep mode is active.
    #[must_use]
    pub fn is_sleep_mode(&self) -> bool {
        self.state.lock().sleep
    }

    /// Returns the settings computed by the last cycle.
    #[must_use]
    pub fn settings(&self) -> Option<LightSettings> {
        self.state.lock().settings
    }

    // =========================================================================
    // Adaptation
    // =========================================================================

    /// Computes the settings for the current instant and stores them.
    ///
    /// # Errors
    ///
    /// Returns a schedule, ephemeris or interpolation error. Schedule
    /// ordering errors are configuration problems and repeat every cycle
    /// until the configuration changes.
    pub fn update_settings(&self) -> Result<LightSettings> {
        let now = (self.clock)();
        let sleep = self.state.lock().sleep;

        let schedule = self.schedule.build(&self.ephemeris, now)?;
        let point = self.interpolator.evaluate(&schedule, now, sleep)?;
        let settings = self.projector.project(point, schedule.sun_position);

        self.state.lock().settings = Some(settings);
        Ok(settings)
    }

    /// Updates the settings and adapts `lights`.
    ///
    /// Lights that are off are skipped, as are manually controlled lights
    /// when take-over control is enabled. With `only_once` set, only forced
    /// cycles adapt. Host failures are recorded per light in the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be computed; no light is
    /// touched in that case.
    pub async fn adapt_lights(
        &self,
        lights: &[LightId],
        transition: Duration,
        force: bool,
        causation: &CausationId,
    ) -> Result<AdaptationReport> {
        if let Err(err) = self.update_settings() {
            tracing::error!(adapter = %self.config.name, error = %err, "Could not compute light settings");
            return Err(err);
        }

        let mut report = AdaptationReport::new();
        if (self.config.only_once && !force) || lights.is_empty() {
            return Ok(report);
        }

        let options = self.command_options(transition);
        for light in lights {
            let outcome = if !self.host.is_on(light) {
                LightOutcome::Off
            } else if self.config.take_over_control
                && self.tracker.is_manually_controlled(
                    light,
                    force,
                    options.adapt_brightness,
                    options.adapt_color,
                )
            {
                tracing::debug!(light = %light, "Light is manually controlled, not adapting");
                LightOutcome::ManuallyControlled
            } else {
                self.adapt_light(light, &options, force, causation).await?
            };
            report.push(light.clone(), outcome);
        }
        Ok(report)
    }

    /// Sends the current settings to one light.
    ///
    /// Nothing happens if the light is already being adapted. Unless
    /// `force` is set, a light that drifted from the last command is left
    /// alone when take-over control and external-change detection are both
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns an error only if no settings were computed yet and computing
    /// them fails. Host failures come back as [`LightOutcome::Failed`].
    pub async fn adapt_light(
        &self,
        light: &LightId,
        options: &CommandOptions,
        force: bool,
        causation: &CausationId,
    ) -> Result<LightOutcome> {
        let Some(_guard) = self.locks.try_lock(light) else {
            tracing::debug!(light = %light, "Light is already being adapted, skipping");
            return Ok(LightOutcome::Locked);
        };

        let settings = match self.settings() {
            Some(settings) => settings,
            None => self.update_settings()?,
        };
        let Some(capabilities) = self.host.capabilities(light) else {
            tracing::warn!(light = %light, "Host does not know the light");
            return Ok(LightOutcome::Failed(HostError::UnknownLight(light.to_string())));
        };
        let command = build_command(&settings, &capabilities, options);

        if self.config.take_over_control && self.config.detect_external_changes && !force {
            if let Err(err) = self.host.refresh(light).await {
                tracing::warn!(light = %light, error = %err, "Could not refresh light");
                return Ok(LightOutcome::Failed(err));
            }
            let current = self
                .host
                .state(light)
                .map(|state| state.attributes)
                .unwrap_or_default();
            if self.tracker.significant_change(
                light,
                &current,
                options.adapt_brightness,
                options.adapt_color,
            ) {
                return Ok(LightOutcome::SignificantChange);
            }
        }

        self.tracker.record_commanded(light, command.attributes());
        tracing::debug!(light = %light, causation = %causation, data = %command.to_service_data(), "Adapting light");
        if let Err(err) = self.send(light, &command, options, causation).await {
            tracing::warn!(light = %light, error = %err, "Could not adapt light");
            return Ok(LightOutcome::Failed(err));
        }

        self.events.publish(AdapterEvent::Adapted {
            light: light.clone(),
            command,
            causation: causation.clone(),
        });
        Ok(LightOutcome::Adapted(command))
    }

    async fn send(
        &self,
        light: &LightId,
        command: &LightCommand,
        options: &CommandOptions,
        causation: &CausationId,
    ) -> std::result::Result<(), HostError> {
        if !self.config.separate_turn_on_commands {
            return self.host.send_command(light, command, causation).await;
        }

        let parts = split_command(command, options.adapt_brightness, options.adapt_color);
        let mut previous_transition = None;
        for part in &parts {
            if let Some(wait) = previous_transition.take() {
                tokio::time::sleep(wait).await;
            }
            self.host.send_command(light, part, causation).await?;
            previous_transition = part.transition;
        }
        Ok(())
    }

    fn command_options(&self, transition: Duration) -> CommandOptions {
        let state = self.state.lock();
        CommandOptions {
            transition,
            adapt_brightness: state.adapt_brightness,
            adapt_color: state.adapt_color,
            prefer_rgb_color: self.config.prefer_rgb_color,
            extend_color_temp_range: self.config.extend_color_temp_range,
        }
    }

    /// Runs the periodic cycle once.
    ///
    /// Does nothing while the adapter is off.
    ///
    /// # Errors
    ///
    /// See [`adapt_lights`](Self::adapt_lights).
    pub async fn tick(&self) -> Result<AdaptationReport> {
        if !self.is_on() {
            return Ok(AdaptationReport::new());
        }
        let causation = self.causation("interval", None);
        self.adapt_lights(&self.config.lights, self.config.transition, false, &causation)
            .await
    }

    /// Calls [`tick`](Self::tick) every configured interval until
    /// `shutdown` completes.
    ///
    /// The first cycle runs one interval after the call. Errors are logged
    /// and the loop keeps going.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::debug!(adapter = %self.config.name, "Adaptation loop stopped");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(err) = self.tick().await {
                        tracing::error!(adapter = %self.config.name, error = %err, "Adaptation cycle failed");
                    }
                }
            }
        }
    }

    // =========================================================================
    // Host notifications
    // =========================================================================

    /// Processes a notification from the host.
    ///
    /// Returns the report when the notification led to an adaptation, which
    /// happens when a controlled light is switched on and the debouncer
    /// lets it through.
    ///
    /// # Errors
    ///
    /// See [`adapt_lights`](Self::adapt_lights).
    pub async fn handle_event(&self, event: HostEvent) -> Result<Option<AdaptationReport>> {
        match event {
            HostEvent::ServiceCall(call) => {
                self.handle_service_call(&call);
                Ok(None)
            }
            HostEvent::StateChanged(change) => self.handle_state_change(&change).await,
        }
    }

    fn handle_service_call(&self, call: &ServiceCall) {
        if call.service == Service::TurnOn {
            for light in &call.lights {
                self.debouncer.cancel(light);
            }
        }
        self.tracker.observe_service_call(call, |light| self.host.is_on(light));
    }

    async fn handle_state_change(&self, change: &StateChanged) -> Result<Option<AdaptationReport>> {
        self.tracker.observe_state_change(change);
        if !self.is_on() || !self.config.lights.contains(&change.light) {
            return Ok(None);
        }
        let light = &change.light;

        if change.is_on_to_off() {
            tracing::debug!(light = %light, "Light turned off");
            self.debouncer.record_on_to_off(light, &change.causation);
            self.tracker.reset(light, false);
            return Ok(None);
        }
        if !change.is_off_to_on() {
            return Ok(None);
        }

        tracing::debug!(light = %light, causation = %change.causation, "Light turned on");
        self.tracker.reset(light, true);
        let outcome = {
            let _guard = self.locks.lock(light).await;
            let turn_on = self.tracker.last_turn_on(light);
            let turn_off = self.tracker.last_turn_off(light);
            self.debouncer
                .should_suppress(
                    light,
                    &change.causation,
                    turn_on.as_ref(),
                    turn_off.as_ref(),
                    &self.host,
                )
                .await
        };
        if outcome == SettleOutcome::Suppress {
            self.events.publish(AdapterEvent::SettleSuppressed {
                light: light.clone(),
            });
            return Ok(None);
        }

        let causation = self.causation("light_event", Some(&change.causation));
        self.adapt_lights(
            std::slice::from_ref(light),
            self.config.initial_transition,
            true,
            &causation,
        )
        .await
        .map(Some)
    }

    // =========================================================================
    // Switches
    // =========================================================================

    /// Switches the adapter on.
    ///
    /// Tracking of all lights is reset. With `adapt_lights` the lights are
    /// adapted right away using the initial transition. Switching on an
    /// adapter that is already on does nothing and returns `None`.
    ///
    /// # Errors
    ///
    /// See [`adapt_lights`](Self::adapt_lights).
    pub async fn turn_on(&self, adapt_lights: bool) -> Result<Option<AdaptationReport>> {
        {
            let mut state = self.state.lock();
            if state.on {
                return Ok(None);
            }
            state.on = true;
        }
        tracing::info!(adapter = %self.config.name, "Adapter switched on");
        self.reset_all();

        if !adapt_lights {
            return Ok(None);
        }
        let causation = self.causation("turn_on", None);
        self.adapt_lights(&self.config.lights, self.config.initial_transition, true, &causation)
            .await
            .map(Some)
    }

    /// Switches the adapter off and resets tracking of all lights.
    pub fn turn_off(&self) {
        self.state.lock().on = false;
        tracing::info!(adapter = %self.config.name, "Adapter switched off");
        self.reset_all();
    }

    /// Enters or leaves sleep mode.
    ///
    /// While the adapter is on, tracking is reset and all lights are
    /// adapted with the sleep transition.
    ///
    /// # Errors
    ///
    /// See [`adapt_lights`](Self::adapt_lights).
    pub async fn set_sleep_mode(&self, sleep: bool) -> Result<Option<AdaptationReport>> {
        self.state.lock().sleep = sleep;
        tracing::info!(adapter = %self.config.name, sleep, "Sleep mode changed");
        if !self.is_on() {
            return Ok(None);
        }

        self.reset_all();
        let causation = self.causation("sleep", None);
        self.adapt_lights(&self.config.lights, self.config.sleep_transition, true, &causation)
            .await
            .map(Some)
    }

    /// Enables or disables brightness adaptation.
    pub fn set_adapt_brightness(&self, enabled: bool) {
        self.state.lock().adapt_brightness = enabled;
    }

    /// Enables or disables color adaptation.
    pub fn set_adapt_color(&self, enabled: bool) {
        self.state.lock().adapt_color = enabled;
    }

    fn reset_all(&self) {
        for light in &self.config.lights {
            self.tracker.reset(light, false);
        }
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Adapts lights right away, ignoring manual control.
    ///
    /// Uses the settings of the last cycle (computing them if there are
    /// none) and the request's own options instead of the adapter's
    /// switches. Lights that are off are skipped unless
    /// `turn_on_lights` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if settings are needed and cannot be computed.
    pub async fn apply(&self, request: ApplyRequest) -> Result<AdaptationReport> {
        let lights = if request.lights.is_empty() {
            self.config.lights.clone()
        } else {
            request.lights.clone()
        };
        for light in &lights {
            self.tracker.track(light);
        }

        let options = CommandOptions {
            transition: request.transition.unwrap_or(self.config.transition),
            adapt_brightness: request.adapt_brightness,
            adapt_color: request.adapt_color,
            prefer_rgb_color: request.prefer_rgb_color,
            extend_color_temp_range: request.extend_color_temp_range,
        };
        let causation = self.causation("service", request.parent.as_ref());

        let mut report = AdaptationReport::new();
        for light in lights {
            let outcome = if request.turn_on_lights || self.host.is_on(&light) {
                self.adapt_light(&light, &options, true, &causation).await?
            } else {
                LightOutcome::Off
            };
            report.push(light, outcome);
        }
        Ok(report)
    }

    /// Marks lights as manually controlled, or releases them.
    ///
    /// An empty `lights` slice means every configured light. Marking
    /// publishes [`AdapterEvent::ManualControl`] per newly marked light.
    /// Releasing resets the lights and, while the adapter is on, adapts them
    /// with the initial transition.
    ///
    /// # Errors
    ///
    /// See [`adapt_lights`](Self::adapt_lights).
    pub async fn set_manual_control(
        &self,
        lights: &[LightId],
        manual: bool,
        parent: Option<&CausationId>,
    ) -> Result<Option<AdaptationReport>> {
        let lights = if lights.is_empty() {
            self.config.lights.as_slice()
        } else {
            lights
        };

        if manual {
            let causation = parent.cloned().unwrap_or_else(CausationId::external);
            for light in lights {
                self.tracker.set_manual_control(light, true, &causation);
            }
            return Ok(None);
        }

        for light in lights {
            self.tracker.set_manual_control(light, false, &CausationId::external());
        }
        if !self.is_on() {
            return Ok(None);
        }
        let causation = self.causation("service", parent);
        self.adapt_lights(lights, self.config.initial_transition, true, &causation)
            .await
            .map(Some)
    }

    fn causation(&self, trigger: &str, parent: Option<&CausationId>) -> CausationId {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        CausationId::adapter(&self.tag, trigger, sequence, parent)
    }
}

/// 16-bit FNV-1a fold of `name`, used to tag causation identifiers.
#[allow(clippy::cast_possible_truncation)]
fn short_hash(name: &str) -> u16 {
    let hash = name.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    });
    ((hash >> 16) ^ hash) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hash_is_stable() {
        assert_eq!(short_hash("living_room"), short_hash("living_room"));
        assert_ne!(short_hash("living_room"), short_hash("bedroom"));
    }

    #[test]
    fn apply_request_defaults() {
        let request = ApplyRequest::new();
        assert!(request.lights.is_empty());
        assert!(request.adapt_brightness);
        assert!(request.adapt_color);
        assert!(!request.turn_on_lights);
    }
}

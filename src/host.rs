// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary to the platform that owns the lights.
//!
//! The adapter never talks to devices itself. It sends [`LightCommand`]s
//! through a [`LightHost`] and learns about the world from the
//! [`HostEvent`]s the host feeds into
//! [`Adapter::handle_event`](crate::orchestrator::Adapter::handle_event).
//!
//! # Causation
//!
//! Every command carries a [`CausationId`]. A host is expected to attach
//! that identifier to the [`StateChanged`] notifications the command
//! produces, and to attach [`CausationId::external`] identifiers to changes
//! it did not get from an adapter.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capabilities::LightCapabilities;
use crate::command::LightCommand;
use crate::error::HostError;
use crate::state::LightState;
use crate::types::{CausationId, LightId};

/// Light control provided by the host platform.
#[allow(async_fn_in_trait)]
pub trait LightHost {
    /// Sends a turn-on command to a light.
    ///
    /// # Arguments
    ///
    /// * `light` - The target light
    /// * `command` - Attributes and transition to apply
    /// * `causation` - Identifier the host echoes on resulting state changes
    ///
    /// # Errors
    ///
    /// Returns `HostError` if the light is unknown or the command fails.
    async fn send_command(
        &self,
        light: &LightId,
        command: &LightCommand,
        causation: &CausationId,
    ) -> Result<(), HostError>;

    /// Returns what the light supports, or `None` if it is unknown.
    fn capabilities(&self, light: &LightId) -> Option<LightCapabilities>;

    /// Returns the last known state of the light.
    fn state(&self, light: &LightId) -> Option<LightState>;

    /// Returns `true` if the light is known and on.
    fn is_on(&self, light: &LightId) -> bool {
        self.state(light).is_some_and(|state| state.is_on())
    }

    /// Asks the host to poll the light so that [`state`](Self::state)
    /// reflects the device.
    ///
    /// The default does nothing, for hosts whose state is always current.
    ///
    /// # Errors
    ///
    /// Returns `HostError` if the light could not be polled.
    async fn refresh(&self, light: &LightId) -> Result<(), HostError> {
        let _ = light;
        Ok(())
    }
}

/// Light service observed on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    /// `light.turn_on`
    TurnOn,
    /// `light.turn_off`
    TurnOff,
}

/// Service data keys that matter for manual-control detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceAttribute {
    /// `brightness`
    Brightness,
    /// `brightness_pct`
    BrightnessPct,
    /// `brightness_step`
    BrightnessStep,
    /// `brightness_step_pct`
    BrightnessStepPct,
    /// `white_value`
    WhiteValue,
    /// `color_name`
    ColorName,
    /// `color_temp`
    ColorTemp,
    /// `kelvin`
    Kelvin,
    /// `hs_color`
    HsColor,
    /// `rgb_color`
    RgbColor,
    /// `xy_color`
    XyColor,
}

impl ServiceAttribute {
    /// Parses a service data key, returning `None` for keys that are
    /// neither brightness nor color attributes.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let attr = match key {
            "brightness" => Self::Brightness,
            "brightness_pct" => Self::BrightnessPct,
            "brightness_step" => Self::BrightnessStep,
            "brightness_step_pct" => Self::BrightnessStepPct,
            "white_value" => Self::WhiteValue,
            "color_name" => Self::ColorName,
            "color_temp" => Self::ColorTemp,
            "kelvin" => Self::Kelvin,
            "hs_color" => Self::HsColor,
            "rgb_color" => Self::RgbColor,
            "xy_color" => Self::XyColor,
            _ => return None,
        };
        Some(attr)
    }

    /// Returns `true` for attributes that set a color.
    #[must_use]
    pub const fn is_color(self) -> bool {
        matches!(
            self,
            Self::ColorName
                | Self::ColorTemp
                | Self::Kelvin
                | Self::HsColor
                | Self::RgbColor
                | Self::XyColor
        )
    }

    /// Returns `true` for attributes that set brightness.
    #[must_use]
    pub const fn is_brightness(self) -> bool {
        !self.is_color()
    }
}

/// A light service call seen on the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    /// Which service was called.
    pub service: Service,
    /// Lights targeted by the call.
    pub lights: Vec<LightId>,
    /// Brightness and color attributes present in the call.
    pub attributes: BTreeSet<ServiceAttribute>,
    /// Requested transition, if any.
    pub transition: Option<Duration>,
    /// Identifier of the call.
    pub causation: CausationId,
}

impl ServiceCall {
    /// Creates a call without attributes or transition.
    #[must_use]
    pub fn new(service: Service, lights: Vec<LightId>, causation: CausationId) -> Self {
        Self {
            service,
            lights,
            attributes: BTreeSet::new(),
            transition: None,
            causation,
        }
    }

    /// Creates a call from raw service data.
    ///
    /// Brightness and color keys become [`ServiceAttribute`]s and a numeric
    /// `transition` (seconds) becomes the transition. Other keys are ignored.
    #[must_use]
    pub fn from_service_data(
        service: Service,
        lights: Vec<LightId>,
        data: &serde_json::Value,
        causation: CausationId,
    ) -> Self {
        let mut call = Self::new(service, lights, causation);
        if let Some(map) = data.as_object() {
            call.attributes = map
                .keys()
                .filter_map(|key| ServiceAttribute::from_key(key))
                .collect();
            call.transition = map
                .get("transition")
                .and_then(serde_json::Value::as_f64)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
        }
        call
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: ServiceAttribute) -> Self {
        self.attributes.insert(attribute);
        self
    }

    /// Sets the transition.
    #[must_use]
    pub fn with_transition(mut self, transition: Duration) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Returns `true` if the call sets a color attribute.
    #[must_use]
    pub fn sets_color(&self) -> bool {
        self.attributes.iter().any(|attr| attr.is_color())
    }

    /// Returns `true` if the call sets a brightness attribute.
    #[must_use]
    pub fn sets_brightness(&self) -> bool {
        self.attributes.iter().any(|attr| attr.is_brightness())
    }
}

/// A state change of one light.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChanged {
    /// The light that changed.
    pub light: LightId,
    /// State before the change, `None` when the light just appeared.
    pub old: Option<LightState>,
    /// State after the change, `None` when the light was removed.
    pub new: Option<LightState>,
    /// Causation the host attached to the change.
    pub causation: CausationId,
}

impl StateChanged {
    /// Creates a state change notification.
    #[must_use]
    pub fn new(
        light: LightId,
        old: Option<LightState>,
        new: Option<LightState>,
        causation: CausationId,
    ) -> Self {
        Self {
            light,
            old,
            new,
            causation,
        }
    }

    /// Returns `true` if the light went from off to on.
    #[must_use]
    pub fn is_off_to_on(&self) -> bool {
        matches!((self.old, self.new), (Some(old), Some(new)) if !old.is_on() && new.is_on())
    }

    /// Returns `true` if the light went from on to off.
    #[must_use]
    pub fn is_on_to_off(&self) -> bool {
        matches!((self.old, self.new), (Some(old), Some(new)) if old.is_on() && !new.is_on())
    }
}

/// Notification fed into the adapter by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A light service was called.
    ServiceCall(ServiceCall),
    /// A light changed state.
    StateChanged(StateChanged),
}

impl From<ServiceCall> for HostEvent {
    fn from(call: ServiceCall) -> Self {
        Self::ServiceCall(call)
    }
}

impl From<StateChanged> for HostEvent {
    fn from(change: StateChanged) -> Self {
        Self::StateChanged(change)
    }
}

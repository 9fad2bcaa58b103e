// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light state as reported by the host.

use serde::{Deserialize, Serialize};

use crate::types::{CausationId, RgbColor};

/// Attribute values of a light, or of a command sent to it.
///
/// Absent fields are attributes the light does not report (or the command
/// did not set). Brightness and white value use the host's 0-255 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LightAttributes {
    /// Brightness (0-255).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// White channel level (0-255).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_value: Option<u8>,
    /// Color temperature in mireds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<u16>,
    /// RGB color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<RgbColor>,
}

impl LightAttributes {
    /// Creates an empty attribute set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            brightness: None,
            white_value: None,
            color_temp: None,
            rgb_color: None,
        }
    }

    /// Sets the brightness.
    #[must_use]
    pub const fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    /// Sets the white value.
    #[must_use]
    pub const fn with_white_value(mut self, white_value: u8) -> Self {
        self.white_value = Some(white_value);
        self
    }

    /// Sets the color temperature in mireds.
    #[must_use]
    pub const fn with_color_temp(mut self, mired: u16) -> Self {
        self.color_temp = Some(mired);
        self
    }

    /// Sets the RGB color.
    #[must_use]
    pub const fn with_rgb_color(mut self, color: RgbColor) -> Self {
        self.rgb_color = Some(color);
        self
    }

    /// Returns `true` if no attribute is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.brightness.is_none()
            && self.white_value.is_none()
            && self.color_temp.is_none()
            && self.rgb_color.is_none()
    }
}

/// On/off state plus attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LightState {
    /// Whether the light is on.
    pub on: bool,
    /// Reported attributes; meaningful only while on.
    #[serde(default)]
    pub attributes: LightAttributes,
}

impl LightState {
    /// A light that is on with `attributes`.
    #[must_use]
    pub const fn on(attributes: LightAttributes) -> Self {
        Self {
            on: true,
            attributes,
        }
    }

    /// A light that is off.
    #[must_use]
    pub const fn off() -> Self {
        Self {
            on: false,
            attributes: LightAttributes::new(),
        }
    }

    /// Returns `true` if the light is on.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        self.on
    }
}

/// A reported state together with the causation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    /// The reported state.
    pub state: LightState,
    /// Causation of the change.
    pub causation: CausationId,
}

impl StateSnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub const fn new(state: LightState, causation: CausationId) -> Self {
        Self { state, causation }
    }

    /// Returns the snapshot's attributes.
    #[must_use]
    pub const fn attributes(&self) -> &LightAttributes {
        &self.state.attributes
    }
}

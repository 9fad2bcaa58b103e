// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light commands.
//!
//! A [`LightCommand`] is the payload the adapter hands to the host for one
//! light. It is built from the cycle's [`LightSettings`] and the light's
//! [`LightCapabilities`]: attributes the light cannot take are never set.
//!
//! # Attribute selection
//!
//! | Light supports | Attribute sent |
//! |----------------|----------------|
//! | transition | `transition` |
//! | brightness (when adapting brightness) | `brightness` (0-255) |
//! | white value (when adapting brightness) | `white_value` (0-255) |
//! | color only | `rgb_color` |
//! | color temperature only | `color_temp` clamped to the light's range |
//! | both | `rgb_color` or clamped `color_temp`, see [`build_command`] |
//!
//! # Examples
//!
//! ```
//! use sunlight_lib::capabilities::LightCapabilities;
//! use sunlight_lib::color::StandardColorConverter;
//! use sunlight_lib::command::{CommandOptions, build_command};
//! use sunlight_lib::solar::{CurvePoint, SettingsProjector};
//!
//! let settings = SettingsProjector::new(StandardColorConverter).project(
//!     CurvePoint { brightness_pct: 50.0, color_temp_kelvin: 2500.0, is_night: false },
//!     10.0,
//! );
//!
//! let cmd = build_command(&settings, &LightCapabilities::cct_light(), &CommandOptions::default());
//! assert_eq!(cmd.brightness, Some(128));
//! assert_eq!(cmd.color_temp, Some(400));
//! assert!(cmd.rgb_color.is_none());
//! ```
//!
//! [`LightSettings`]: crate::solar::LightSettings
//! [`LightCapabilities`]: crate::capabilities::LightCapabilities

mod build;

use std::time::Duration;

use serde::{Serialize, Serializer};

pub use build::{CommandOptions, build_command, split_command};

use crate::state::LightAttributes;
use crate::types::RgbColor;

/// A turn-on command for one light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LightCommand {
    /// Transition duration, serialized in seconds.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_seconds"
    )]
    pub transition: Option<Duration>,
    /// Brightness (0-255).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// White channel level (0-255).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_value: Option<u8>,
    /// Color temperature in mireds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<u16>,
    /// RGB color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rgb_color: Option<RgbColor>,
}

impl LightCommand {
    /// Creates an empty command.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            transition: None,
            brightness: None,
            white_value: None,
            color_temp: None,
            rgb_color: None,
        }
    }

    /// Sets the transition.
    #[must_use]
    pub const fn with_transition(mut self, transition: Duration) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Returns the attributes this command asks for.
    ///
    /// This is what the tracker compares later state reports against.
    #[must_use]
    pub const fn attributes(&self) -> LightAttributes {
        LightAttributes {
            brightness: self.brightness,
            white_value: self.white_value,
            color_temp: self.color_temp,
            rgb_color: self.rgb_color,
        }
    }

    /// Returns `true` if the command sets no attribute.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.attributes().is_empty()
    }

    /// Returns the host service data for this command.
    #[must_use]
    pub fn to_service_data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[allow(clippy::ref_option)]
fn serialize_seconds<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(duration) => serializer.serialize_f64(duration.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_has_no_attributes() {
        let cmd = LightCommand::new().with_transition(Duration::from_secs(2));
        assert!(cmd.is_empty());
        assert!(cmd.attributes().is_empty());
    }

    #[test]
    fn service_data_uses_seconds_and_skips_absent_fields() {
        let cmd = LightCommand {
            transition: Some(Duration::from_millis(1500)),
            brightness: Some(128),
            color_temp: Some(370),
            ..LightCommand::new()
        };
        assert_eq!(
            cmd.to_service_data(),
            serde_json::json!({"transition": 1.5, "brightness": 128, "color_temp": 370})
        );
    }

    #[test]
    fn rgb_serializes_as_triple() {
        let cmd = LightCommand {
            rgb_color: Some(RgbColor::new(255, 120, 0)),
            ..LightCommand::new()
        };
        assert_eq!(
            cmd.to_service_data(),
            serde_json::json!({"rgb_color": [255, 120, 0]})
        );
    }

    #[test]
    fn attributes_mirror_fields() {
        let cmd = LightCommand {
            brightness: Some(10),
            white_value: Some(10),
            ..LightCommand::new()
        };
        assert_eq!(
            cmd.attributes(),
            LightAttributes::new().with_brightness(10).with_white_value(10)
        );
    }
}

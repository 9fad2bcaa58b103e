// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command building from settings and capabilities.

use std::time::Duration;

use super::LightCommand;
use crate::capabilities::{Feature, LightCapabilities};
use crate::solar::LightSettings;

/// Per-call options for [`build_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOptions {
    /// Transition requested for the command.
    pub transition: Duration,
    /// Whether brightness and white value are set.
    pub adapt_brightness: bool,
    /// Whether color temperature or RGB is set.
    pub adapt_color: bool,
    /// Send RGB instead of color temperature to lights that take both.
    pub prefer_rgb_color: bool,
    /// Send RGB when the color temperature is outside the light's range.
    pub extend_color_temp_range: bool,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            transition: Duration::ZERO,
            adapt_brightness: true,
            adapt_color: true,
            prefer_rgb_color: false,
            extend_color_temp_range: false,
        }
    }
}

impl CommandOptions {
    /// Sets the transition.
    #[must_use]
    pub const fn with_transition(mut self, transition: Duration) -> Self {
        self.transition = transition;
        self
    }

    /// Sets which aspects are adapted.
    #[must_use]
    pub const fn with_adapt(mut self, brightness: bool, color: bool) -> Self {
        self.adapt_brightness = brightness;
        self.adapt_color = color;
        self
    }

    /// Prefers RGB over color temperature.
    #[must_use]
    pub const fn with_prefer_rgb_color(mut self, prefer: bool) -> Self {
        self.prefer_rgb_color = prefer;
        self
    }

    /// Falls back to RGB outside the light's color temperature range.
    #[must_use]
    pub const fn with_extend_color_temp_range(mut self, extend: bool) -> Self {
        self.extend_color_temp_range = extend;
        self
    }
}

/// Builds the command that moves a light towards `settings`.
///
/// Lights taking both RGB and color temperature get RGB when the color
/// temperature is outside their range and the range may be extended, when
/// RGB is preferred, or when the night color is active. Otherwise they get
/// the color temperature clamped into their range.
#[must_use]
pub fn build_command(
    settings: &LightSettings,
    capabilities: &LightCapabilities,
    options: &CommandOptions,
) -> LightCommand {
    let mut cmd = LightCommand::new();

    if capabilities.supports(Feature::Transition) {
        cmd.transition = Some(options.transition);
    }

    if options.adapt_brightness {
        let level = pct_to_level(settings.brightness_pct);
        if capabilities.supports(Feature::Brightness) {
            cmd.brightness = Some(level);
        }
        if capabilities.supports(Feature::WhiteValue) {
            cmd.white_value = Some(level);
        }
    }

    if options.adapt_color {
        let range = capabilities.mired_range();
        let mired = settings.color_temp_mired;
        let color = capabilities.supports(Feature::Color);
        let color_temp = capabilities.supports(Feature::ColorTemp);

        if color && color_temp {
            let use_rgb = (options.extend_color_temp_range && !range.contains(mired))
                || options.prefer_rgb_color
                || settings.night_color_active();
            if use_rgb {
                cmd.rgb_color = Some(settings.rgb_color);
            } else {
                cmd.color_temp = Some(range.clamp(mired));
            }
        } else if color {
            cmd.rgb_color = Some(settings.rgb_color);
        } else if color_temp {
            cmd.color_temp = Some(range.clamp(mired));
        }
    }

    cmd
}

/// Splits `cmd` into a color part and a brightness part.
///
/// Each part carries half the transition. Parts for aspects that are not
/// adapted, and parts left without attributes, are dropped.
#[must_use]
pub fn split_command(cmd: &LightCommand, adapt_brightness: bool, adapt_color: bool) -> Vec<LightCommand> {
    let transition = cmd.transition.map(|t| t / 2);
    let mut parts = Vec::with_capacity(2);

    if adapt_color {
        let part = LightCommand {
            transition,
            brightness: None,
            white_value: None,
            ..*cmd
        };
        if !part.is_empty() {
            parts.push(part);
        }
    }
    if adapt_brightness {
        let part = LightCommand {
            transition,
            color_temp: None,
            rgb_color: None,
            ..*cmd
        };
        if !part.is_empty() {
            parts.push(part);
        }
    }

    parts
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pct_to_level(pct: f64) -> u8 {
    (255.0 * pct / 100.0).round().clamp(0.0, 255.0) as u8
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Significant attribute changes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::LightAttributes;
use crate::types::RgbColor;

/// Minimum differences that count as a significant change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeThresholds {
    /// Brightness and white value difference on the 0-255 scale.
    pub brightness: u8,
    /// Color temperature difference in mireds.
    pub color_temp: u16,
    /// Redmean distance between RGB colors.
    pub rgb_redmean: f64,
}

impl Default for ChangeThresholds {
    fn default() -> Self {
        Self {
            brightness: 25,
            color_temp: 20,
            rgb_redmean: 80.0,
        }
    }
}

/// The first attribute found to differ significantly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeChange {
    /// Brightness moved by more than the threshold.
    Brightness {
        /// Previous value.
        from: u8,
        /// Current value.
        to: u8,
    },
    /// White value moved by more than the threshold.
    WhiteValue {
        /// Previous value.
        from: u8,
        /// Current value.
        to: u8,
    },
    /// Color temperature moved by more than the threshold.
    ColorTemp {
        /// Previous value in mireds.
        from: u16,
        /// Current value in mireds.
        to: u16,
    },
    /// RGB color moved further than the redmean threshold.
    RgbColor {
        /// Previous color.
        from: RgbColor,
        /// Current color.
        to: RgbColor,
        /// Redmean distance between both.
        distance: f64,
    },
    /// The light left RGB mode or color temperature mode.
    ModeSwitch,
}

impl fmt::Display for AttributeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Brightness { from, to } => write!(f, "brightness {from} -> {to}"),
            Self::WhiteValue { from, to } => write!(f, "white value {from} -> {to}"),
            Self::ColorTemp { from, to } => write!(f, "color temp {from} -> {to} mired"),
            Self::RgbColor { from, to, distance } => {
                write!(f, "rgb {from} -> {to} (redmean {distance:.1})")
            }
            Self::ModeSwitch => f.write_str("switched between RGB and color temp"),
        }
    }
}

impl LightAttributes {
    /// Compares `self` (current) with `previous`.
    ///
    /// Brightness and white value are compared only when adapting
    /// brightness, color temperature and RGB only when adapting color, and
    /// only when both sides report the attribute. Leaving RGB or color
    /// temperature mode always counts.
    #[must_use]
    pub fn significant_change(
        &self,
        previous: &Self,
        thresholds: &ChangeThresholds,
        adapt_brightness: bool,
        adapt_color: bool,
    ) -> Option<AttributeChange> {
        if adapt_brightness {
            if let (Some(from), Some(to)) = (previous.brightness, self.brightness)
                && from.abs_diff(to) > thresholds.brightness
            {
                return Some(AttributeChange::Brightness { from, to });
            }
            if let (Some(from), Some(to)) = (previous.white_value, self.white_value)
                && from.abs_diff(to) > thresholds.brightness
            {
                return Some(AttributeChange::WhiteValue { from, to });
            }
        }

        if adapt_color {
            if let (Some(from), Some(to)) = (previous.color_temp, self.color_temp)
                && from.abs_diff(to) > thresholds.color_temp
            {
                return Some(AttributeChange::ColorTemp { from, to });
            }
            if let (Some(from), Some(to)) = (previous.rgb_color, self.rgb_color) {
                let distance = from.redmean_distance(&to);
                if distance > thresholds.rgb_redmean {
                    return Some(AttributeChange::RgbColor { from, to, distance });
                }
            }
        }

        let left_rgb = previous.rgb_color.is_some() && self.rgb_color.is_none();
        let left_color_temp = previous.color_temp.is_some() && self.color_temp.is_none();
        (left_rgb || left_color_temp).then_some(AttributeChange::ModeSwitch)
    }
}

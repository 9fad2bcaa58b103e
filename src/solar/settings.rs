// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Projection of curve values onto every color space a light may use.

use serde::{Deserialize, Serialize};

use super::interpolation::CurvePoint;
use crate::color::ColorConverter;
use crate::types::{HsColor, RgbColor, XyColor};

/// Target settings for one adaptation cycle.
///
/// Produced fresh every cycle and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightSettings {
    /// Brightness in percent.
    pub brightness_pct: f64,
    /// Color temperature in Kelvin.
    pub color_temp_kelvin: f64,
    /// Color temperature in mireds.
    pub color_temp_mired: u16,
    /// RGB equivalent, or the night color when the override is active.
    pub rgb_color: RgbColor,
    /// CIE xy equivalent of `rgb_color`.
    pub xy_color: XyColor,
    /// Hue/saturation equivalent of `rgb_color`.
    pub hs_color: HsColor,
    /// Sun elevation in degrees.
    pub sun_position: f64,
    /// Whether the instant lies in a night segment.
    pub is_night: bool,
    /// Whether the night color override is enabled.
    pub use_night_color: bool,
}

impl LightSettings {
    /// Returns `true` if the night color replaces the Kelvin-derived color.
    #[must_use]
    pub fn night_color_active(&self) -> bool {
        self.is_night && self.use_night_color
    }
}

/// Turns a [`CurvePoint`] into [`LightSettings`].
#[derive(Debug, Clone, Default)]
pub struct SettingsProjector<C> {
    converter: C,
    use_night_color: bool,
    night_color: Option<RgbColor>,
}

impl<C: ColorConverter> SettingsProjector<C> {
    /// Creates a projector without night color.
    #[must_use]
    pub fn new(converter: C) -> Self {
        Self {
            converter,
            use_night_color: false,
            night_color: None,
        }
    }

    /// Replaces the RGB output with `color` during night segments.
    #[must_use]
    pub fn with_night_color(mut self, color: RgbColor) -> Self {
        self.use_night_color = true;
        self.night_color = Some(color);
        self
    }

    /// Returns the color converter.
    #[must_use]
    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Projects `point`.
    ///
    /// The night color only changes the RGB, xy and hs fields; Kelvin and
    /// mired values stay as interpolated.
    #[must_use]
    pub fn project(&self, point: CurvePoint, sun_position: f64) -> LightSettings {
        let kelvin = point.color_temp_kelvin;
        let rgb_color = match self.night_color {
            Some(night) if self.use_night_color && point.is_night => night,
            _ => self.converter.kelvin_to_rgb(kelvin),
        };
        let xy_color = self.converter.rgb_to_xy(rgb_color);
        let hs_color = self.converter.xy_to_hs(xy_color);

        let settings = LightSettings {
            brightness_pct: point.brightness_pct,
            color_temp_kelvin: kelvin,
            color_temp_mired: self.converter.kelvin_to_mired(kelvin),
            rgb_color,
            xy_color,
            hs_color,
            sun_position,
            is_night: point.is_night,
            use_night_color: self.use_night_color,
        };
        tracing::debug!(
            sun_position,
            brightness_pct = settings.brightness_pct,
            kelvin,
            mired = settings.color_temp_mired,
            rgb = %settings.rgb_color,
            night = settings.is_night,
            "Calculated light settings"
        );
        settings
    }
}

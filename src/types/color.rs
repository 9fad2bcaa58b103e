// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color-space value types and color temperature unit helpers.

use std::fmt;

/// CIE 1931 chromaticity coordinates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct XyColor {
    /// x coordinate (0.0-1.0).
    pub x: f64,
    /// y coordinate (0.0-1.0).
    pub y: f64,
}

impl XyColor {
    /// Creates a chromaticity pair.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for XyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Hue/saturation pair.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HsColor {
    /// Hue in degrees (0.0-360.0).
    pub hue: f64,
    /// Saturation in percent (0.0-100.0).
    pub saturation: f64,
}

impl HsColor {
    /// Creates a hue/saturation pair.
    #[must_use]
    pub const fn new(hue: f64, saturation: f64) -> Self {
        Self { hue, saturation }
    }
}

impl fmt::Display for HsColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.hue, self.saturation)
    }
}

/// Converts a color temperature in Kelvin to mireds, rounding down.
///
/// # Examples
///
/// ```
/// use sunlight_lib::types::kelvin_to_mired;
///
/// assert_eq!(kelvin_to_mired(2000.0), 500);
/// assert_eq!(kelvin_to_mired(6500.0), 153);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn kelvin_to_mired(kelvin: f64) -> u16 {
    if kelvin <= 0.0 {
        return u16::MAX;
    }
    (1_000_000.0 / kelvin).floor().clamp(0.0, f64::from(u16::MAX)) as u16
}

/// Converts mireds to Kelvin, rounding down.
#[must_use]
pub fn mired_to_kelvin(mired: u16) -> f64 {
    if mired == 0 {
        return f64::INFINITY;
    }
    (1_000_000.0 / f64::from(mired)).floor()
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RGB color type with parsing and the redmean color distance.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// RGB color with 8-bit channels (0-255).
///
/// Serialized as a `[r, g, b]` array, so configuration files can only ever
/// hold a valid triple.
///
/// # Examples
///
/// ```
/// use sunlight_lib::types::RgbColor;
///
/// let color = RgbColor::new(255, 128, 0);
/// assert_eq!(color.red(), 255);
///
/// let parsed: RgbColor = "255, 128, 0".parse().unwrap();
/// assert_eq!(parsed, color);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct RgbColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl RgbColor {
    /// Creates a new RGB color.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Returns the red component.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Returns the green component.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Returns the blue component.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }

    /// Perceptual distance to `other` using the "redmean" metric.
    ///
    /// The red and blue channels are weighted by the mean red intensity of
    /// the two colors. The distance between black and white is about 765.
    ///
    /// See <https://www.compuphase.com/cmetric.htm>.
    #[must_use]
    pub fn redmean_distance(&self, other: &Self) -> f64 {
        let r_hat = (f64::from(self.red) + f64::from(other.red)) / 2.0;
        let delta_r = f64::from(self.red) - f64::from(other.red);
        let delta_g = f64::from(self.green) - f64::from(other.green);
        let delta_b = f64::from(self.blue) - f64::from(other.blue);

        let red_term = (2.0 + r_hat / 256.0) * delta_r.powi(2);
        let green_term = 4.0 * delta_g.powi(2);
        let blue_term = (2.0 + (255.0 - r_hat) / 256.0) * delta_b.powi(2);
        (red_term + green_term + blue_term).sqrt()
    }

    /// Creates a white color.
    #[must_use]
    pub const fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Creates a black color.
    #[must_use]
    pub const fn black() -> Self {
        Self::new(0, 0, 0)
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::white()
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.red, self.green, self.blue)
    }
}

impl FromStr for RgbColor {
    type Err = ValueError;

    /// Parses a `r, g, b` triple, optionally wrapped in parentheses or
    /// brackets.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s
            .trim()
            .trim_start_matches(['(', '['])
            .trim_end_matches([')', ']']);

        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        let [r, g, b] = parts.as_slice() else {
            return Err(ValueError::InvalidRgbColor(s.to_string()));
        };
        let channel = |part: &str| {
            part.parse::<u8>()
                .map_err(|_| ValueError::InvalidRgbColor(s.to_string()))
        };
        Ok(Self::new(channel(r)?, channel(g)?, channel(b)?))
    }
}

impl From<[u8; 3]> for RgbColor {
    fn from([red, green, blue]: [u8; 3]) -> Self {
        Self::new(red, green, blue)
    }
}

impl From<RgbColor> for [u8; 3] {
    fn from(color: RgbColor) -> Self {
        [color.red, color.green, color.blue]
    }
}

impl From<(u8, u8, u8)> for RgbColor {
    fn from((red, green, blue): (u8, u8, u8)) -> Self {
        Self::new(red, green, blue)
    }
}

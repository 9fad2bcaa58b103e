// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color-space conversions.
//!
//! The settings projector only needs four pure conversions. They are kept
//! behind the [`ColorConverter`] trait so a host can plug in the exact
//! functions it uses elsewhere; [`StandardColorConverter`] is the default.

use crate::types::{HsColor, RgbColor, XyColor, kelvin_to_mired};

/// Pure, deterministic color conversions used by the settings projector.
pub trait ColorConverter {
    /// Converts Kelvin to mireds.
    fn kelvin_to_mired(&self, kelvin: f64) -> u16;

    /// Approximates the RGB color of a black body at `kelvin`.
    fn kelvin_to_rgb(&self, kelvin: f64) -> RgbColor;

    /// Converts an sRGB color to CIE xy chromaticity.
    fn rgb_to_xy(&self, rgb: RgbColor) -> XyColor;

    /// Converts CIE xy chromaticity to hue/saturation.
    fn xy_to_hs(&self, xy: XyColor) -> HsColor;
}

/// Default conversions.
///
/// - Kelvin → RGB: Tanner Helland's black-body fit, clamped to 1000-40000 K.
/// - RGB → xy: sRGB gamma expansion followed by the Wide RGB D65 matrix.
/// - xy → hs: the inverse matrix at full brightness, then RGB → HSV.
///
/// # Examples
///
/// ```
/// use sunlight_lib::color::{ColorConverter, StandardColorConverter};
///
/// let conv = StandardColorConverter;
/// let rgb = conv.kelvin_to_rgb(6600.0);
/// assert_eq!(rgb.red(), 255);
/// assert_eq!(conv.kelvin_to_mired(2500.0), 400);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardColorConverter;

impl ColorConverter for StandardColorConverter {
    fn kelvin_to_mired(&self, kelvin: f64) -> u16 {
        kelvin_to_mired(kelvin)
    }

    fn kelvin_to_rgb(&self, kelvin: f64) -> RgbColor {
        let t = kelvin.clamp(1000.0, 40000.0) / 100.0;

        let red = if t <= 66.0 {
            255.0
        } else {
            329.698_727_446 * (t - 60.0).powf(-0.133_204_759_2)
        };
        let green = if t <= 66.0 {
            99.470_802_586_1 * t.ln() - 161.119_568_166_1
        } else {
            288.122_169_528_3 * (t - 60.0).powf(-0.075_514_849_2)
        };
        let blue = if t >= 66.0 {
            255.0
        } else if t <= 19.0 {
            0.0
        } else {
            138.517_731_223_1 * (t - 10.0).ln() - 305.044_792_730_7
        };

        RgbColor::new(to_channel(red), to_channel(green), to_channel(blue))
    }

    fn rgb_to_xy(&self, rgb: RgbColor) -> XyColor {
        if rgb == RgbColor::black() {
            return XyColor::new(0.0, 0.0);
        }
        let expand = |c: u8| {
            let c = f64::from(c) / 255.0;
            if c > 0.040_45 {
                ((c + 0.055) / 1.055).powf(2.4)
            } else {
                c / 12.92
            }
        };
        let (r, g, b) = (expand(rgb.red()), expand(rgb.green()), expand(rgb.blue()));

        let x = r * 0.664_511 + g * 0.154_324 + b * 0.162_028;
        let y = r * 0.283_881 + g * 0.668_433 + b * 0.047_685;
        let z = r * 0.000_088 + g * 0.072_310 + b * 0.986_039;
        let sum = x + y + z;

        XyColor::new(round3(x / sum), round3(y / sum))
    }

    fn xy_to_hs(&self, xy: XyColor) -> HsColor {
        let y_lum = 1.0;
        let vy = if xy.y == 0.0 { 1e-11 } else { xy.y };
        let x = (y_lum / vy) * xy.x;
        let z = (y_lum / vy) * (1.0 - xy.x - vy);

        let r = x * 1.656_492 - y_lum * 0.354_851 - z * 0.255_038;
        let g = -x * 0.707_196 + y_lum * 1.655_397 + z * 0.036_152;
        let b = x * 0.051_713 - y_lum * 0.121_364 + z * 1.011_530;

        let compress = |c: f64| {
            let c = if c <= 0.003_130_8 {
                12.92 * c
            } else {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            };
            c.max(0.0)
        };
        let (mut r, mut g, mut b) = (compress(r), compress(g), compress(b));
        let max = r.max(g).max(b);
        if max > 1.0 {
            r /= max;
            g /= max;
            b /= max;
        }

        let (hue, saturation) = rgb_to_hs(r, g, b);
        HsColor::new(round3(hue), round3(saturation))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Hue in degrees and saturation in percent for channels in 0.0-1.0.
#[allow(clippy::many_single_char_names)]
fn rgb_to_hs(r: f64, g: f64, b: f64) -> (f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max == 0.0 { 0.0 } else { delta / max * 100.0 };

    let hue = if delta < f64::EPSILON {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if (max - g).abs() < f64::EPSILON {
        60.0 * (((b - r) / delta) + 2.0)
    } else {
        60.0 * (((r - g) / delta) + 4.0)
    };

    (hue, saturation)
}

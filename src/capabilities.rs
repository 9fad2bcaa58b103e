// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light capabilities.
//!
//! A light declares which attributes it accepts as a [`FeatureSet`] plus the
//! mired range its white channels can reproduce. The command builder filters
//! every payload through these, so asking a brightness-only light for a color
//! is never an error: the color is simply left out.
//!
//! Capabilities are supplied by the host, either built directly with the
//! presets and [`CapabilitiesBuilder`] or derived from the host's color modes
//! with [`LightCapabilities::from_color_modes`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single controllable attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Dimming.
    Brightness,
    /// Legacy separate white channel level.
    WhiteValue,
    /// RGB/HS/xy color.
    Color,
    /// White color temperature.
    ColorTemp,
    /// Timed fades between states.
    Transition,
}

impl Feature {
    const ALL: [Self; 5] = [
        Self::Brightness,
        Self::WhiteValue,
        Self::Color,
        Self::ColorTemp,
        Self::Transition,
    ];

    const fn bit(self) -> u8 {
        match self {
            Self::Brightness => 1,
            Self::WhiteValue => 1 << 1,
            Self::Color => 1 << 2,
            Self::ColorTemp => 1 << 3,
            Self::Transition => 1 << 4,
        }
    }
}

/// A set of [`Feature`]s.
///
/// # Examples
///
/// ```
/// use sunlight_lib::capabilities::{Feature, FeatureSet};
///
/// let set = FeatureSet::empty().with(Feature::Brightness).with(Feature::Color);
/// assert!(set.contains(Feature::Color));
/// assert!(!set.contains(Feature::ColorTemp));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureSet(u8);

impl FeatureSet {
    /// The empty set (an on/off-only light).
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns a copy with `feature` added.
    #[must_use]
    pub const fn with(self, feature: Feature) -> Self {
        Self(self.0 | feature.bit())
    }

    /// Returns a copy with `feature` removed.
    #[must_use]
    pub const fn without(self, feature: Feature) -> Self {
        Self(self.0 & !feature.bit())
    }

    /// Returns `true` if `feature` is in the set.
    #[must_use]
    pub const fn contains(self, feature: Feature) -> bool {
        self.0 & feature.bit() != 0
    }

    /// Returns `true` if no feature is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the contained features.
    pub fn iter(self) -> impl Iterator<Item = Feature> {
        Feature::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for FeatureSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for FeatureSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<Feature>::deserialize(deserializer)?.into_iter().collect())
    }
}

/// Inclusive range of color temperatures in mireds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MiredRange {
    /// Coolest supported value.
    pub min: u16,
    /// Warmest supported value.
    pub max: u16,
}

impl MiredRange {
    /// Creates a range; the bounds are swapped if given in reverse.
    #[must_use]
    pub const fn new(min: u16, max: u16) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Returns `true` if `mired` is inside the range.
    #[must_use]
    pub const fn contains(&self, mired: u16) -> bool {
        self.min <= mired && mired <= self.max
    }

    /// Clamps `mired` into the range.
    #[must_use]
    pub fn clamp(&self, mired: u16) -> u16 {
        mired.clamp(self.min, self.max)
    }
}

impl Default for MiredRange {
    /// 153-500 mireds (6500 K down to 2000 K).
    fn default() -> Self {
        Self::new(153, 500)
    }
}

/// Color modes a host may report for a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// On/off only.
    OnOff,
    /// Dimmable, no color.
    Brightness,
    /// White color temperature.
    ColorTemp,
    /// Hue/saturation.
    Hs,
    /// CIE xy.
    Xy,
    /// RGB.
    Rgb,
    /// RGB plus a white channel.
    Rgbw,
    /// RGB plus cold and warm white channels.
    Rgbww,
    /// White channel only.
    White,
}

impl ColorMode {
    const fn features(self) -> FeatureSet {
        let dimmable = FeatureSet::empty().with(Feature::Brightness);
        match self {
            Self::OnOff => FeatureSet::empty(),
            Self::Brightness | Self::White => dimmable,
            Self::ColorTemp => dimmable.with(Feature::ColorTemp),
            Self::Hs | Self::Xy | Self::Rgb | Self::Rgbw | Self::Rgbww => {
                dimmable.with(Feature::Color)
            }
        }
    }
}

/// Capabilities of a light.
///
/// # Examples
///
/// ```
/// use sunlight_lib::capabilities::{Feature, LightCapabilities, MiredRange};
///
/// let bulb = LightCapabilities::rgbcct_light().with_mired_range(MiredRange::new(153, 370));
/// assert!(bulb.supports(Feature::Color));
/// assert_eq!(bulb.mired_range().clamp(454), 370);
///
/// let plain = LightCapabilities::dimmable_light();
/// assert!(!plain.supports(Feature::ColorTemp));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LightCapabilities {
    features: FeatureSet,
    #[serde(default)]
    mired_range: MiredRange,
}

impl LightCapabilities {
    /// Creates capabilities from a feature set and mired range.
    #[must_use]
    pub const fn new(features: FeatureSet, mired_range: MiredRange) -> Self {
        Self {
            features,
            mired_range,
        }
    }

    /// An on/off-only light.
    #[must_use]
    pub const fn on_off() -> Self {
        Self::new(FeatureSet::empty(), MiredRange::new(153, 500))
    }

    /// A dimmable white light with transitions.
    #[must_use]
    pub const fn dimmable_light() -> Self {
        Self::new(
            FeatureSet::empty()
                .with(Feature::Brightness)
                .with(Feature::Transition),
            MiredRange::new(153, 500),
        )
    }

    /// A tunable white (CCT) light with transitions.
    #[must_use]
    pub const fn cct_light() -> Self {
        Self::new(
            Self::dimmable_light().features.with(Feature::ColorTemp),
            MiredRange::new(153, 500),
        )
    }

    /// An RGB light with transitions.
    #[must_use]
    pub const fn rgb_light() -> Self {
        Self::new(
            Self::dimmable_light().features.with(Feature::Color),
            MiredRange::new(153, 500),
        )
    }

    /// An RGB plus tunable white light with transitions.
    #[must_use]
    pub const fn rgbcct_light() -> Self {
        Self::new(
            Self::cct_light().features.with(Feature::Color),
            MiredRange::new(153, 500),
        )
    }

    /// Derives capabilities from the color modes a host reports.
    ///
    /// Every mode other than on/off implies brightness. `extra` carries the
    /// features that are not expressed as color modes, such as transitions.
    #[must_use]
    pub fn from_color_modes(extra: FeatureSet, modes: &[ColorMode]) -> Self {
        let features = modes
            .iter()
            .flat_map(|mode| mode.features().iter())
            .chain(extra.iter())
            .collect();
        Self::new(features, MiredRange::default())
    }

    /// Sets the supported mired range.
    #[must_use]
    pub const fn with_mired_range(mut self, range: MiredRange) -> Self {
        self.mired_range = range;
        self
    }

    /// Returns `true` if the light supports `feature`.
    #[must_use]
    pub const fn supports(&self, feature: Feature) -> bool {
        self.features.contains(feature)
    }

    /// Returns the feature set.
    #[must_use]
    pub const fn features(&self) -> FeatureSet {
        self.features
    }

    /// Returns the supported mired range.
    #[must_use]
    pub const fn mired_range(&self) -> MiredRange {
        self.mired_range
    }

    /// Returns `true` if the light has both color and color temperature.
    #[must_use]
    pub const fn supports_color_and_temp(&self) -> bool {
        self.supports(Feature::Color) && self.supports(Feature::ColorTemp)
    }
}

/// Builder for custom capabilities.
#[derive(Debug, Default)]
pub struct CapabilitiesBuilder {
    inner: LightCapabilities,
}

impl CapabilitiesBuilder {
    /// Creates a builder for an on/off-only light.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables brightness.
    #[must_use]
    pub fn with_brightness(self) -> Self {
        self.with(Feature::Brightness)
    }

    /// Enables the white value channel.
    #[must_use]
    pub fn with_white_value(self) -> Self {
        self.with(Feature::WhiteValue)
    }

    /// Enables color.
    #[must_use]
    pub fn with_color(self) -> Self {
        self.with(Feature::Color)
    }

    /// Enables color temperature.
    #[must_use]
    pub fn with_color_temp(self) -> Self {
        self.with(Feature::ColorTemp)
    }

    /// Enables transitions.
    #[must_use]
    pub fn with_transition(self) -> Self {
        self.with(Feature::Transition)
    }

    /// Sets the mired range.
    #[must_use]
    pub fn mired_range(mut self, min: u16, max: u16) -> Self {
        self.inner.mired_range = MiredRange::new(min, max);
        self
    }

    /// Builds the capabilities.
    #[must_use]
    pub fn build(self) -> LightCapabilities {
        self.inner
    }

    fn with(mut self, feature: Feature) -> Self {
        self.inner.features = self.inner.features.with(feature);
        self
    }
}

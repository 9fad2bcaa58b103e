// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter configuration.
//!
//! [`AdaptationConfig`] holds every option of one adapter instance. It is
//! plain data: the host owns the schema and hands over an already-typed
//! value, either built in code or parsed from JSON with
//! [`AdaptationConfig::from_json_str`]. Missing fields take their defaults.
//!
//! Durations are written in seconds (`"transition": 45`), sunrise/sunset
//! offsets in signed whole seconds and the night color as `[r, g, b]`.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use sunlight_lib::config::AdaptationConfig;
//!
//! let config = AdaptationConfig::from_json_str(r#"{
//!     "name": "living_room",
//!     "lights": ["light.sofa", "light.desk"],
//!     "observer": {"latitude": 52.37, "longitude": 4.89, "elevation": 0},
//!     "time_zone": "Europe/Amsterdam",
//!     "max_brightness": 80,
//!     "transition": 30
//! }"#).unwrap();
//!
//! assert_eq!(config.lights.len(), 2);
//! assert_eq!(config.transition, Duration::from_secs(30));
//! assert!(config.take_over_control);
//! ```

mod seconds;

use std::time::Duration;

use chrono::{NaiveTime, TimeDelta};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::color::ColorConverter;
use crate::error::{Result, ValueError};
use crate::solar::{Depression, Interpolator, Observer, ScheduleBuilder, SettingsProjector};
use crate::state::ChangeThresholds;
use crate::types::{LightId, RgbColor};

/// Longest transition a host accepts, in seconds.
const MAX_TRANSITION_SECS: f64 = 6553.0;

/// Configuration of one adapter instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Instance name, used in causation identifiers and logs.
    pub name: String,
    /// Lights this adapter controls.
    pub lights: Vec<LightId>,
    /// Observer location passed to the ephemeris.
    pub observer: Observer,
    /// Time zone of fixed sunrise/sunset times.
    pub time_zone: Tz,

    /// Brightness at night, in percent.
    pub min_brightness: f64,
    /// Brightness during the day, in percent.
    pub max_brightness: f64,
    /// Color temperature at solar midnight, in Kelvin.
    pub min_color_temp: f64,
    /// Color temperature at solar noon, in Kelvin.
    pub max_color_temp: f64,
    /// Kelvin at the edges of the blue hours.
    pub dawn_color_temp: f64,
    /// Kelvin between blue and golden hour.
    pub blue_hour_color_temp: f64,
    /// Kelvin at the end of the morning golden hour.
    pub sunrise_color_temp: f64,
    /// Kelvin at the start of the evening golden hour.
    pub sunset_color_temp: f64,
    /// Kelvin at the end of the evening blue hour.
    pub dusk_color_temp: f64,
    /// Brightness in sleep mode, in percent.
    pub sleep_brightness: f64,
    /// Color temperature in sleep mode, in Kelvin.
    pub sleep_color_temp: f64,

    /// Fixed local sunrise time replacing the computed one.
    pub sunrise_time: Option<NaiveTime>,
    /// Fixed local sunset time replacing the computed one.
    pub sunset_time: Option<NaiveTime>,
    /// Shift applied to the sunrise.
    #[serde(with = "seconds::offset")]
    pub sunrise_offset: TimeDelta,
    /// Shift applied to the sunset.
    #[serde(with = "seconds::offset")]
    pub sunset_offset: TimeDelta,
    /// Elevation in degrees that counts as sunrise/sunset.
    pub horizon: Option<f64>,
    /// Twilight depression for dawn and dusk.
    pub depression: Depression,

    /// Thresholds for detecting external changes.
    pub thresholds: ChangeThresholds,
    /// Minimum wait before trusting an off-to-on change after a turn-off.
    #[serde(with = "seconds::duration")]
    pub turning_off_delay: Duration,
    /// Transition of interval adaptations.
    #[serde(with = "seconds::duration")]
    pub transition: Duration,
    /// Transition when a light is switched on.
    #[serde(with = "seconds::duration")]
    pub initial_transition: Duration,
    /// Transition when sleep mode is toggled.
    #[serde(with = "seconds::duration")]
    pub sleep_transition: Duration,
    /// Period of the adaptation cycle.
    #[serde(with = "seconds::duration")]
    pub interval: Duration,

    /// Adapt only when a light is switched on.
    pub only_once: bool,
    /// Stop adapting lights changed by something else.
    pub take_over_control: bool,
    /// Also detect changes that did not go through a light service.
    pub detect_external_changes: bool,
    /// Send RGB instead of color temperature where both are supported.
    pub prefer_rgb_color: bool,
    /// Send RGB when the color temperature is outside a light's range.
    pub extend_color_temp_range: bool,
    /// Send color and brightness as two commands.
    pub separate_turn_on_commands: bool,
    /// Replace the color with `night_color` during night segments.
    pub use_night_color: bool,
    /// Color used at night when `use_night_color` is set.
    pub night_color: RgbColor,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        let curves = Interpolator::default();
        Self {
            name: "default".to_string(),
            lights: Vec::new(),
            observer: Observer::default(),
            time_zone: Tz::UTC,
            min_brightness: curves.min_brightness,
            max_brightness: curves.max_brightness,
            min_color_temp: curves.min_color_temp,
            max_color_temp: curves.max_color_temp,
            dawn_color_temp: curves.dawn_color_temp,
            blue_hour_color_temp: curves.blue_hour_color_temp,
            sunrise_color_temp: curves.sunrise_color_temp,
            sunset_color_temp: curves.sunset_color_temp,
            dusk_color_temp: curves.dusk_color_temp,
            sleep_brightness: curves.sleep_brightness,
            sleep_color_temp: curves.sleep_color_temp,
            sunrise_time: None,
            sunset_time: None,
            sunrise_offset: TimeDelta::zero(),
            sunset_offset: TimeDelta::zero(),
            horizon: None,
            depression: Depression::Civil,
            thresholds: ChangeThresholds::default(),
            turning_off_delay: Duration::from_secs(5),
            transition: Duration::from_secs(45),
            initial_transition: Duration::from_secs(1),
            sleep_transition: Duration::from_secs(1),
            interval: Duration::from_secs(90),
            only_once: false,
            take_over_control: true,
            detect_external_changes: false,
            prefer_rgb_color: false,
            extend_color_temp_range: false,
            separate_turn_on_commands: false,
            use_night_color: false,
            night_color: RgbColor::new(255, 56, 0),
        }
    }
}

impl AdaptationConfig {
    /// Creates a default configuration named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for malformed JSON
    /// and [`Error::Value`](crate::Error::Value) if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the controlled lights.
    #[must_use]
    pub fn with_lights<I, L>(mut self, lights: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<LightId>,
    {
        self.lights = lights.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the observer location.
    #[must_use]
    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the time zone of fixed sunrise/sunset times.
    #[must_use]
    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Sets the interval transition.
    #[must_use]
    pub fn with_transition(mut self, transition: Duration) -> Self {
        self.transition = transition;
        self
    }

    /// Sets the adaptation period.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Enables or disables take-over detection.
    #[must_use]
    pub fn with_take_over_control(mut self, enabled: bool) -> Self {
        self.take_over_control = enabled;
        self
    }

    /// Enables or disables detection of changes made outside light services.
    #[must_use]
    pub fn with_detect_external_changes(mut self, enabled: bool) -> Self {
        self.detect_external_changes = enabled;
        self
    }

    /// Sends color and brightness as separate commands.
    #[must_use]
    pub fn with_separate_turn_on_commands(mut self, enabled: bool) -> Self {
        self.separate_turn_on_commands = enabled;
        self
    }

    /// Enables the night color override.
    #[must_use]
    pub fn with_night_color(mut self, color: RgbColor) -> Self {
        self.use_night_color = true;
        self.night_color = color;
        self
    }

    /// Checks ranges and orderings.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValueError`] found.
    pub fn validate(&self) -> std::result::Result<(), ValueError> {
        in_range("latitude", self.observer.latitude, -90.0, 90.0)?;
        in_range("longitude", self.observer.longitude, -180.0, 180.0)?;

        in_range("min_brightness", self.min_brightness, 1.0, 100.0)?;
        in_range("max_brightness", self.max_brightness, 1.0, 100.0)?;
        in_range("sleep_brightness", self.sleep_brightness, 1.0, 100.0)?;
        ordered(
            "min_brightness",
            self.min_brightness,
            "max_brightness",
            self.max_brightness,
        )?;

        for (field, kelvin) in [
            ("min_color_temp", self.min_color_temp),
            ("max_color_temp", self.max_color_temp),
            ("dawn_color_temp", self.dawn_color_temp),
            ("blue_hour_color_temp", self.blue_hour_color_temp),
            ("sunrise_color_temp", self.sunrise_color_temp),
            ("sunset_color_temp", self.sunset_color_temp),
            ("dusk_color_temp", self.dusk_color_temp),
            ("sleep_color_temp", self.sleep_color_temp),
        ] {
            in_range(field, kelvin, 1000.0, 10000.0)?;
        }
        ordered(
            "min_color_temp",
            self.min_color_temp,
            "max_color_temp",
            self.max_color_temp,
        )?;

        if let Some(horizon) = self.horizon {
            in_range("horizon", horizon, -90.0, 90.0)?;
        }

        for (field, duration) in [
            ("transition", self.transition),
            ("initial_transition", self.initial_transition),
            ("sleep_transition", self.sleep_transition),
        ] {
            in_range(field, duration.as_secs_f64(), 0.0, MAX_TRANSITION_SECS)?;
        }
        if self.interval.is_zero() {
            return Err(ValueError::ZeroDuration("interval"));
        }
        Ok(())
    }

    /// Returns a schedule builder for the configured location and overrides.
    #[must_use]
    pub fn schedule_builder(&self) -> ScheduleBuilder {
        ScheduleBuilder::new(self.observer)
            .with_depression(self.depression)
            .with_time_zone(self.time_zone)
            .with_sunrise_time(self.sunrise_time)
            .with_sunset_time(self.sunset_time)
            .with_sunrise_offset(self.sunrise_offset)
            .with_sunset_offset(self.sunset_offset)
            .with_horizon(self.horizon)
    }

    /// Returns the curves described by this configuration.
    #[must_use]
    pub fn interpolator(&self) -> Interpolator {
        Interpolator {
            min_brightness: self.min_brightness,
            max_brightness: self.max_brightness,
            min_color_temp: self.min_color_temp,
            max_color_temp: self.max_color_temp,
            dawn_color_temp: self.dawn_color_temp,
            blue_hour_color_temp: self.blue_hour_color_temp,
            sunrise_color_temp: self.sunrise_color_temp,
            sunset_color_temp: self.sunset_color_temp,
            dusk_color_temp: self.dusk_color_temp,
            sleep_brightness: self.sleep_brightness,
            sleep_color_temp: self.sleep_color_temp,
        }
    }

    /// Returns a projector using `converter` and the night color setting.
    #[must_use]
    pub fn projector<C: ColorConverter>(&self, converter: C) -> SettingsProjector<C> {
        let projector = SettingsProjector::new(converter);
        if self.use_night_color {
            projector.with_night_color(self.night_color)
        } else {
            projector
        }
    }
}

fn in_range(field: &'static str, actual: f64, min: f64, max: f64) -> std::result::Result<(), ValueError> {
    if (min..=max).contains(&actual) {
        Ok(())
    } else {
        Err(ValueError::OutOfRange {
            field,
            min,
            max,
            actual,
        })
    }
}

fn ordered(
    min_field: &'static str,
    min: f64,
    max_field: &'static str,
    max: f64,
) -> std::result::Result<(), ValueError> {
    if min <= max {
        Ok(())
    } else {
        Err(ValueError::InvertedRange {
            min_field,
            max_field,
            min,
            max,
        })
    }
}

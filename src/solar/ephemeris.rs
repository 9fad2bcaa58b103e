// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary to the astronomical event oracle.
//!
//! This crate does not compute sun positions. A host supplies an
//! [`Ephemeris`] implementation backed by whatever astronomy code it already
//! uses. [`DailyEphemeris`] repeats one fixed day and is handy for fixed
//! schedules and tests.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EphemerisError;

/// Location of the observer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    /// Latitude in degrees, positive north.
    pub latitude: f64,
    /// Longitude in degrees, positive east.
    pub longitude: f64,
    /// Height above sea level in meters.
    pub elevation: f64,
}

impl Observer {
    /// Creates an observer.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
        }
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// Sun depression below the horizon that defines dawn and dusk.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depression {
    /// 6 degrees.
    #[default]
    Civil,
    /// 12 degrees.
    Nautical,
    /// 18 degrees.
    Astronomical,
    /// Any other depression in degrees.
    Custom(f64),
}

impl Depression {
    /// Returns the depression in degrees below the horizon.
    #[must_use]
    pub fn degrees(self) -> f64 {
        match self {
            Self::Civil => 6.0,
            Self::Nautical => 12.0,
            Self::Astronomical => 18.0,
            Self::Custom(degrees) => degrees,
        }
    }
}

/// Whether the sun is rising or setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SunDirection {
    /// Morning.
    Rising,
    /// Evening.
    Setting,
}

/// A `[start, end]` pair of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First instant of the window.
    pub start: DateTime<Utc>,
    /// Last instant of the window.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Raw sun events for one calendar date, all in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEvents {
    /// Start of morning twilight for the requested depression.
    pub dawn: DateTime<Utc>,
    /// Sunrise.
    pub sunrise: DateTime<Utc>,
    /// Highest point of the sun.
    pub noon: DateTime<Utc>,
    /// Sunset.
    pub sunset: DateTime<Utc>,
    /// End of evening twilight for the requested depression.
    pub dusk: DateTime<Utc>,
    /// Lowest point of the sun. May fall on the previous or next calendar
    /// date depending on longitude.
    pub midnight: DateTime<Utc>,
    /// Morning blue hour.
    pub blue_hour_morning: TimeWindow,
    /// Evening blue hour.
    pub blue_hour_evening: TimeWindow,
    /// Morning golden hour.
    pub golden_hour_morning: TimeWindow,
    /// Evening golden hour.
    pub golden_hour_evening: TimeWindow,
}

/// Astronomical event oracle.
///
/// Implementations must be pure for a given input: the schedule builder
/// calls them several times per evaluation and never caches results.
pub trait Ephemeris {
    /// Returns the sun events of `date` for `observer`.
    ///
    /// # Errors
    ///
    /// Returns [`EphemerisError`] when an event does not occur on that date
    /// (polar day or night) or the date is not covered.
    fn events(
        &self,
        observer: &Observer,
        date: NaiveDate,
        depression: Depression,
    ) -> Result<DayEvents, EphemerisError>;

    /// Returns the instant on `date` when the sun crosses `elevation`
    /// degrees in `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`EphemerisError::ElevationNotReached`] when the sun never
    /// crosses that elevation.
    fn time_at_elevation(
        &self,
        observer: &Observer,
        elevation: f64,
        date: NaiveDate,
        direction: SunDirection,
    ) -> Result<DateTime<Utc>, EphemerisError>;

    /// Returns the sun's elevation in degrees at `at`.
    fn solar_elevation(&self, observer: &Observer, at: DateTime<Utc>) -> f64;
}

impl<E: Ephemeris + ?Sized> Ephemeris for &E {
    fn events(
        &self,
        observer: &Observer,
        date: NaiveDate,
        depression: Depression,
    ) -> Result<DayEvents, EphemerisError> {
        (**self).events(observer, date, depression)
    }

    fn time_at_elevation(
        &self,
        observer: &Observer,
        elevation: f64,
        date: NaiveDate,
        direction: SunDirection,
    ) -> Result<DateTime<Utc>, EphemerisError> {
        (**self).time_at_elevation(observer, elevation, date, direction)
    }

    fn solar_elevation(&self, observer: &Observer, at: DateTime<Utc>) -> f64 {
        (**self).solar_elevation(observer, at)
    }
}

/// UTC times of day for every event of a [`DailyEphemeris`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTemplate {
    /// Dawn.
    pub dawn: NaiveTime,
    /// Sunrise.
    pub sunrise: NaiveTime,
    /// Solar noon.
    pub noon: NaiveTime,
    /// Sunset.
    pub sunset: NaiveTime,
    /// Dusk.
    pub dusk: NaiveTime,
    /// Solar midnight, taken on the same calendar date.
    pub midnight: NaiveTime,
    /// Morning blue hour start/end.
    pub blue_hour_morning: (NaiveTime, NaiveTime),
    /// Evening blue hour start/end.
    pub blue_hour_evening: (NaiveTime, NaiveTime),
    /// Morning golden hour start/end.
    pub golden_hour_morning: (NaiveTime, NaiveTime),
    /// Evening golden hour start/end.
    pub golden_hour_evening: (NaiveTime, NaiveTime),
}

/// An ephemeris that repeats the same UTC day on every date.
///
/// Depression and observer are ignored. The solar elevation is a piecewise
/// linear approximation: 0° at sunrise and sunset, `peak_elevation` at noon
/// and its negative at midnight.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use sunlight_lib::solar::{DailyEphemeris, Depression, Ephemeris, Observer};
///
/// let ephemeris = DailyEphemeris::temperate();
/// let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
/// let events = ephemeris.events(&Observer::default(), date, Depression::Civil).unwrap();
/// assert!(events.dawn < events.sunrise);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DailyEphemeris {
    template: DayTemplate,
    peak_elevation: f64,
    elevations: Vec<(f64, NaiveTime, NaiveTime)>,
}

impl DailyEphemeris {
    /// Creates an ephemeris from a day template.
    #[must_use]
    pub fn new(template: DayTemplate) -> Self {
        Self {
            template,
            peak_elevation: 60.0,
            elevations: Vec::new(),
        }
    }

    /// A mid-latitude equinox-like day: sunrise 06:30, noon 12:15,
    /// sunset 18:00, solar midnight 00:15 (UTC).
    #[must_use]
    pub fn temperate() -> Self {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        Self::new(DayTemplate {
            dawn: t(6, 0),
            sunrise: t(6, 30),
            noon: t(12, 15),
            sunset: t(18, 0),
            dusk: t(18, 30),
            midnight: t(0, 15),
            blue_hour_morning: (t(5, 50), t(6, 10)),
            blue_hour_evening: (t(18, 20), t(18, 40)),
            golden_hour_morning: (t(6, 10), t(7, 10)),
            golden_hour_evening: (t(17, 20), t(18, 20)),
        })
    }

    /// Sets the elevation reached at noon.
    #[must_use]
    pub fn with_peak_elevation(mut self, degrees: f64) -> Self {
        self.peak_elevation = degrees;
        self
    }

    /// Registers the crossing times for an elevation used by
    /// [`Ephemeris::time_at_elevation`].
    #[must_use]
    pub fn with_elevation_crossing(
        mut self,
        elevation: f64,
        rising: NaiveTime,
        setting: NaiveTime,
    ) -> Self {
        self.elevations.push((elevation, rising, setting));
        self
    }

    /// Returns the template.
    #[must_use]
    pub fn template(&self) -> &DayTemplate {
        &self.template
    }

    fn at(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        date.and_time(time).and_utc()
    }

    fn window(date: NaiveDate, (start, end): (NaiveTime, NaiveTime)) -> TimeWindow {
        TimeWindow::new(Self::at(date, start), Self::at(date, end))
    }
}

impl Ephemeris for DailyEphemeris {
    fn events(
        &self,
        _observer: &Observer,
        date: NaiveDate,
        _depression: Depression,
    ) -> Result<DayEvents, EphemerisError> {
        let t = &self.template;
        Ok(DayEvents {
            dawn: Self::at(date, t.dawn),
            sunrise: Self::at(date, t.sunrise),
            noon: Self::at(date, t.noon),
            sunset: Self::at(date, t.sunset),
            dusk: Self::at(date, t.dusk),
            midnight: Self::at(date, t.midnight),
            blue_hour_morning: Self::window(date, t.blue_hour_morning),
            blue_hour_evening: Self::window(date, t.blue_hour_evening),
            golden_hour_morning: Self::window(date, t.golden_hour_morning),
            golden_hour_evening: Self::window(date, t.golden_hour_evening),
        })
    }

    fn time_at_elevation(
        &self,
        _observer: &Observer,
        elevation: f64,
        date: NaiveDate,
        direction: SunDirection,
    ) -> Result<DateTime<Utc>, EphemerisError> {
        let (_, rising, setting) = self
            .elevations
            .iter()
            .find(|(e, _, _)| (e - elevation).abs() < 1e-9)
            .ok_or(EphemerisError::ElevationNotReached { elevation, date })?;
        let time = match direction {
            SunDirection::Rising => *rising,
            SunDirection::Setting => *setting,
        };
        Ok(Self::at(date, time))
    }

    #[allow(clippy::cast_precision_loss)]
    fn solar_elevation(&self, _observer: &Observer, at: DateTime<Utc>) -> f64 {
        let t = &self.template;
        let date = at.date_naive();
        let noon = Self::at(date, t.noon);
        let sunrise = Self::at(date, t.sunrise);
        let sunset = Self::at(date, t.sunset);
        let seconds = |d: TimeDelta| d.num_seconds() as f64;

        if at >= sunrise && at <= sunset {
            let (from, to) = if at <= noon { (sunrise, noon) } else { (sunset, noon) };
            let span = seconds(to - from).abs().max(1.0);
            return self.peak_elevation * (1.0 - seconds(at - to).abs() / span);
        }
        let (edge, span) = if at < sunrise {
            (sunrise, seconds(sunrise - Self::at(date, t.midnight)).max(1.0))
        } else {
            let next_midnight = Self::at(date, t.midnight) + TimeDelta::days(1);
            (sunset, seconds(next_midnight - sunset).max(1.0))
        };
        let fraction = (seconds(at - edge).abs() / span).min(1.0);
        -self.peak_elevation * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    #[test]
    fn depression_degrees() {
        assert!((Depression::Civil.degrees() - 6.0).abs() < f64::EPSILON);
        assert!((Depression::Astronomical.degrees() - 18.0).abs() < f64::EPSILON);
        assert!((Depression::Custom(3.5).degrees() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn depression_serde_is_lowercase() {
        let d: Depression = serde_json::from_str("\"nautical\"").unwrap();
        assert_eq!(d, Depression::Nautical);
        let d: Depression = serde_json::from_str(r#"{"custom": 4.0}"#).unwrap();
        assert_eq!(d, Depression::Custom(4.0));
    }

    #[test]
    fn daily_events_follow_date() {
        let eph = DailyEphemeris::temperate();
        let events = eph.events(&Observer::default(), date(), Depression::Civil).unwrap();
        assert_eq!(events.sunrise.date_naive(), date());
        assert!(events.noon > events.sunrise && events.sunset > events.noon);
    }

    #[test]
    fn elevation_crossing_must_be_registered() {
        let eph = DailyEphemeris::temperate();
        let err = eph
            .time_at_elevation(&Observer::default(), 3.0, date(), SunDirection::Rising)
            .unwrap_err();
        assert!(matches!(err, EphemerisError::ElevationNotReached { .. }));

        let rising = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        let setting = NaiveTime::from_hms_opt(17, 30, 0).unwrap();
        let eph = eph.with_elevation_crossing(3.0, rising, setting);
        let at = eph
            .time_at_elevation(&Observer::default(), 3.0, date(), SunDirection::Setting)
            .unwrap();
        assert_eq!(at.time(), setting);
    }

    #[test]
    fn elevation_peaks_at_noon() {
        let eph = DailyEphemeris::temperate().with_peak_elevation(45.0);
        let obs = Observer::default();
        let noon = date().and_hms_opt(12, 15, 0).unwrap().and_utc();
        let sunrise = date().and_hms_opt(6, 30, 0).unwrap().and_utc();
        let night = date().and_hms_opt(22, 0, 0).unwrap().and_utc();
        assert!((eph.solar_elevation(&obs, noon) - 45.0).abs() < 1e-9);
        assert!(eph.solar_elevation(&obs, sunrise).abs() < 1e-9);
        assert!(eph.solar_elevation(&obs, night) < 0.0);
    }
}

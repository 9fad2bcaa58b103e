// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Piecewise brightness and color temperature curves.
//!
//! Brightness rises from dawn to sunrise, stays at its maximum until sunset
//! and falls until dusk. Color temperature runs through eight segments from
//! one solar midnight to the next:
//!
//! | segment | from → to | exponent |
//! |---------|-----------|----------|
//! | midnight → blue hour | min → dawn | 1/6 |
//! | blue hour → golden hour | dawn → blue hour | 1/2 |
//! | golden hour (morning) | blue hour → sunrise | 1/2 |
//! | golden hour → noon | sunrise → max | 1/4 |
//! | noon → golden hour | max → sunset | 1/4 |
//! | golden hour (evening) | sunset → blue hour | 1/2 |
//! | golden hour → blue hour end | blue hour → dusk | 1/2 |
//! | blue hour end → midnight | dusk → min | 1/6 |
//!
//! Segments are half-open `[start, end)`, except the flat brightness
//! segment `[sunrise, sunset]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::SolarSchedule;
use crate::error::InterpolationError;

/// Raw curve values at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Brightness in percent.
    pub brightness_pct: f64,
    /// Color temperature in Kelvin.
    pub color_temp_kelvin: f64,
    /// Whether the instant lies in a segment touching solar midnight.
    pub is_night: bool,
}

/// Which end of a segment the eased position is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Measure {
    FromStart,
    FromEnd,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    name: &'static str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    from: f64,
    to: f64,
    exponent: f64,
    measure: Measure,
    night: bool,
}

impl Segment {
    fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    fn value(&self, at: DateTime<Utc>) -> Result<f64, InterpolationError> {
        Ok(match self.measure {
            Measure::FromStart => {
                let p = position(self.name, self.start, self.end, at, self.exponent)?;
                self.from + (self.to - self.from) * p
            }
            Measure::FromEnd => {
                let p = 1.0 - position(self.name, self.start, self.end, at, 1.0)?;
                self.to + (self.from - self.to) * p.powf(self.exponent)
            }
        })
    }
}

/// Position of `at` inside `[start, end]` raised to `exponent`.
#[allow(clippy::cast_precision_loss)]
fn position(
    name: &'static str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    at: DateTime<Utc>,
    exponent: f64,
) -> Result<f64, InterpolationError> {
    let span = (end - start).num_milliseconds();
    if span <= 0 {
        return Err(InterpolationError::DegenerateSegment { name, start, end });
    }
    let elapsed = (at - start).num_milliseconds() as f64;
    Ok((elapsed / span as f64).clamp(0.0, 1.0).powf(exponent))
}

/// Interpolation anchors.
///
/// Brightness values are percentages, color temperatures are Kelvin.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use sunlight_lib::solar::{DailyEphemeris, Interpolator, Observer, ScheduleBuilder};
///
/// let schedule = ScheduleBuilder::new(Observer::default())
///     .build(&DailyEphemeris::temperate(), Utc.with_ymd_and_hms(2024, 3, 20, 6, 15, 0).unwrap())
///     .unwrap();
/// let interpolator = Interpolator::default().with_brightness_range(1.0, 100.0);
/// let pct = interpolator.brightness_pct(&schedule, Utc.with_ymd_and_hms(2024, 3, 20, 6, 15, 0).unwrap());
/// assert!((pct - 25.75).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interpolator {
    /// Brightness outside dawn..dusk.
    pub min_brightness: f64,
    /// Brightness between sunrise and sunset.
    pub max_brightness: f64,
    /// Color temperature at solar midnight.
    pub min_color_temp: f64,
    /// Color temperature at solar noon.
    pub max_color_temp: f64,
    /// Color temperature at the start of the morning blue hour and the end
    /// of the evening one.
    pub dawn_color_temp: f64,
    /// Color temperature between blue and golden hour.
    pub blue_hour_color_temp: f64,
    /// Color temperature at the end of the morning golden hour.
    pub sunrise_color_temp: f64,
    /// Color temperature at the start of the evening golden hour.
    pub sunset_color_temp: f64,
    /// Color temperature at the end of the evening blue hour.
    pub dusk_color_temp: f64,
    /// Fixed brightness in sleep mode.
    pub sleep_brightness: f64,
    /// Fixed color temperature in sleep mode.
    pub sleep_color_temp: f64,
}

impl Default for Interpolator {
    fn default() -> Self {
        Self {
            min_brightness: 1.0,
            max_brightness: 100.0,
            min_color_temp: 2000.0,
            max_color_temp: 5500.0,
            dawn_color_temp: 2500.0,
            blue_hour_color_temp: 3500.0,
            sunrise_color_temp: 4000.0,
            sunset_color_temp: 3500.0,
            dusk_color_temp: 2500.0,
            sleep_brightness: 1.0,
            sleep_color_temp: 1000.0,
        }
    }
}

impl Interpolator {
    /// Sets the brightness range in percent.
    #[must_use]
    pub fn with_brightness_range(mut self, min: f64, max: f64) -> Self {
        self.min_brightness = min;
        self.max_brightness = max;
        self
    }

    /// Sets the color temperature range in Kelvin.
    #[must_use]
    pub fn with_color_temp_range(mut self, min: f64, max: f64) -> Self {
        self.min_color_temp = min;
        self.max_color_temp = max;
        self
    }

    /// Sets the sleep mode values.
    #[must_use]
    pub fn with_sleep(mut self, brightness: f64, color_temp: f64) -> Self {
        self.sleep_brightness = brightness;
        self.sleep_color_temp = color_temp;
        self
    }

    /// Evaluates both curves at `at`.
    ///
    /// In sleep mode the fixed sleep values are returned and `is_night` is
    /// `false`.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::DegenerateSegment`] if a matching
    /// segment has no positive span.
    pub fn evaluate(
        &self,
        schedule: &SolarSchedule,
        at: DateTime<Utc>,
        sleep: bool,
    ) -> Result<CurvePoint, InterpolationError> {
        if sleep {
            return Ok(CurvePoint {
                brightness_pct: self.sleep_brightness,
                color_temp_kelvin: self.sleep_color_temp,
                is_night: false,
            });
        }
        let (color_temp_kelvin, is_night) = self.color_temp(schedule, at)?;
        Ok(CurvePoint {
            brightness_pct: self.brightness_pct(schedule, at),
            color_temp_kelvin,
            is_night,
        })
    }

    /// Brightness in percent at `at`.
    #[must_use]
    pub fn brightness_pct(&self, schedule: &SolarSchedule, at: DateTime<Utc>) -> f64 {
        let delta = self.max_brightness - self.min_brightness;

        if schedule.sunrise <= at && at <= schedule.sunset {
            return self.max_brightness;
        }
        if schedule.dawn <= at
            && at < schedule.sunrise
            && let Ok(p) = position("dawn", schedule.dawn, schedule.sunrise, at, 2.0)
        {
            return self.min_brightness + delta * p;
        }
        if schedule.sunset < at
            && at < schedule.dusk
            && let Ok(p) = position("dusk", schedule.sunset, schedule.dusk, at, 1.0)
        {
            return self.min_brightness + delta * (1.0 - p).powi(2);
        }
        self.min_brightness
    }

    /// Color temperature in Kelvin at `at`, with the night flag.
    ///
    /// Falls back to the minimum color temperature, not night, when no
    /// segment contains `at`.
    ///
    /// # Errors
    ///
    /// Returns [`InterpolationError::DegenerateSegment`] if the matching
    /// segment has no positive span.
    pub fn color_temp(
        &self,
        schedule: &SolarSchedule,
        at: DateTime<Utc>,
    ) -> Result<(f64, bool), InterpolationError> {
        for segment in self.segments(schedule) {
            if segment.contains(at) {
                let kelvin = segment.value(at)?;
                tracing::trace!(
                    segment = segment.name,
                    kelvin,
                    night = segment.night,
                    "Color temperature segment"
                );
                return Ok((kelvin, segment.night));
            }
        }
        tracing::debug!(%at, "No color temperature segment matched");
        Ok((self.min_color_temp, false))
    }

    fn segments(&self, s: &SolarSchedule) -> [Segment; 8] {
        use Measure::{FromEnd, FromStart};

        let seg = |name, start, end, from, to, exponent, measure, night| Segment {
            name,
            start,
            end,
            from,
            to,
            exponent,
            measure,
            night,
        };
        [
            seg(
                "midnight_to_blue_hour",
                s.previous_midnight,
                s.next_blue_hour_morning_start,
                self.min_color_temp,
                self.dawn_color_temp,
                1.0 / 6.0,
                FromEnd,
                true,
            ),
            seg(
                "blue_hour_morning",
                s.blue_hour_morning.start,
                s.golden_hour_morning.start,
                self.dawn_color_temp,
                self.blue_hour_color_temp,
                0.5,
                FromStart,
                false,
            ),
            seg(
                "golden_hour_morning",
                s.golden_hour_morning.start,
                s.golden_hour_morning.end,
                self.blue_hour_color_temp,
                self.sunrise_color_temp,
                0.5,
                FromStart,
                false,
            ),
            seg(
                "morning_to_noon",
                s.golden_hour_morning.end,
                s.noon,
                self.sunrise_color_temp,
                self.max_color_temp,
                0.25,
                FromStart,
                false,
            ),
            seg(
                "noon_to_evening",
                s.noon,
                s.golden_hour_evening.start,
                self.max_color_temp,
                self.sunset_color_temp,
                0.25,
                FromEnd,
                false,
            ),
            seg(
                "golden_hour_evening",
                s.golden_hour_evening.start,
                s.golden_hour_evening.end,
                self.sunset_color_temp,
                self.blue_hour_color_temp,
                0.5,
                FromEnd,
                false,
            ),
            seg(
                "blue_hour_evening",
                s.golden_hour_evening.end,
                s.blue_hour_evening.end,
                self.blue_hour_color_temp,
                self.dusk_color_temp,
                0.5,
                FromEnd,
                false,
            ),
            seg(
                "blue_hour_to_midnight",
                s.blue_hour_evening.end,
                s.next_midnight,
                self.dusk_color_temp,
                self.min_color_temp,
                1.0 / 6.0,
                FromStart,
                true,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;
    use crate::solar::{DailyEphemeris, Observer, ScheduleBuilder};

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, h, m, 0).unwrap()
    }

    fn schedule(at: DateTime<Utc>) -> SolarSchedule {
        ScheduleBuilder::new(Observer::default())
            .build(&DailyEphemeris::temperate(), at)
            .unwrap()
    }

    fn interpolator() -> Interpolator {
        Interpolator::default().with_brightness_range(1.0, 100.0)
    }

    // ========================================================================
    // Brightness
    // ========================================================================

    #[test]
    fn brightness_reference_points() {
        let i = interpolator();
        let at = utc(6, 15);
        assert!((i.brightness_pct(&schedule(at), at) - 25.75).abs() < 1e-9);
        let at = utc(12, 0);
        assert!((i.brightness_pct(&schedule(at), at) - 100.0).abs() < f64::EPSILON);
        let at = utc(5, 0);
        assert!((i.brightness_pct(&schedule(at), at) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn brightness_is_continuous_at_sunrise_and_sunset() {
        let i = interpolator();
        let eps = TimeDelta::milliseconds(1);
        for edge in [utc(6, 30), utc(18, 0)] {
            let s = schedule(edge);
            let before = i.brightness_pct(&s, edge - eps);
            let at = i.brightness_pct(&s, edge);
            let after = i.brightness_pct(&s, edge + eps);
            assert!((before - at).abs() < 0.01, "{edge}: {before} vs {at}");
            assert!((after - at).abs() < 0.01, "{edge}: {after} vs {at}");
        }
    }

    #[test]
    fn evening_falls_towards_dusk() {
        let i = interpolator();
        let at = utc(18, 15);
        // ((18:30 - 18:15) / 30 min)^2 * 99 + 1
        assert!((i.brightness_pct(&schedule(at), at) - 25.75).abs() < 1e-9);
        let at = utc(18, 30);
        assert!((i.brightness_pct(&schedule(at), at) - 1.0).abs() < f64::EPSILON);
    }

    // ========================================================================
    // Color temperature
    // ========================================================================

    #[test]
    fn color_temp_hits_the_anchor_at_every_boundary() {
        let i = Interpolator::default();
        let s = schedule(utc(12, 0));
        let boundaries = [
            (s.blue_hour_morning.start, i.dawn_color_temp),
            (s.golden_hour_morning.start, i.blue_hour_color_temp),
            (s.golden_hour_morning.end, i.sunrise_color_temp),
            (s.noon, i.max_color_temp),
            (s.golden_hour_evening.start, i.sunset_color_temp),
            (s.golden_hour_evening.end, i.blue_hour_color_temp),
            (s.blue_hour_evening.end, i.dusk_color_temp),
        ];
        for (edge, anchor) in boundaries {
            let (at, _) = i.color_temp(&s, edge).unwrap();
            assert!((at - anchor).abs() < 1e-9, "{edge}: {at} != {anchor}");
        }
    }

    /// Closed form of one segment, written out independently of `Segment`.
    #[allow(clippy::cast_precision_loss)]
    fn eased(
        (start, end, from, to, exponent, from_end): (DateTime<Utc>, DateTime<Utc>, f64, f64, f64, bool),
        at: DateTime<Utc>,
    ) -> f64 {
        let x = (at - start).num_milliseconds() as f64 / (end - start).num_milliseconds() as f64;
        if from_end {
            to + (from - to) * (1.0 - x).powf(exponent)
        } else {
            from + (to - from) * x.powf(exponent)
        }
    }

    #[test]
    fn color_temp_matches_each_segment_on_both_sides_of_a_boundary() {
        let i = Interpolator::default();
        let s = schedule(utc(12, 0));
        let segments = [
            (s.previous_midnight, s.next_blue_hour_morning_start, i.min_color_temp, i.dawn_color_temp, 1.0 / 6.0, true),
            (s.blue_hour_morning.start, s.golden_hour_morning.start, i.dawn_color_temp, i.blue_hour_color_temp, 0.5, false),
            (s.golden_hour_morning.start, s.golden_hour_morning.end, i.blue_hour_color_temp, i.sunrise_color_temp, 0.5, false),
            (s.golden_hour_morning.end, s.noon, i.sunrise_color_temp, i.max_color_temp, 0.25, false),
            (s.noon, s.golden_hour_evening.start, i.max_color_temp, i.sunset_color_temp, 0.25, true),
            (s.golden_hour_evening.start, s.golden_hour_evening.end, i.sunset_color_temp, i.blue_hour_color_temp, 0.5, true),
            (s.golden_hour_evening.end, s.blue_hour_evening.end, i.blue_hour_color_temp, i.dusk_color_temp, 0.5, true),
            (s.blue_hour_evening.end, s.next_midnight, i.dusk_color_temp, i.min_color_temp, 1.0 / 6.0, false),
        ];
        let eps = TimeDelta::milliseconds(1);

        for segment in segments {
            let (start, end, ..) = segment;
            for at in [start + eps, end - eps] {
                let (kelvin, _) = i.color_temp(&s, at).unwrap();
                let expected = eased(segment, at);
                assert!((kelvin - expected).abs() < 1e-6, "{at}: {kelvin} != {expected}");
            }
        }
        for pair in segments.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn color_temp_is_continuous_at_midnight() {
        let i = Interpolator::default();
        let s = schedule(utc(12, 0));
        let eps = TimeDelta::milliseconds(1);
        let (before, night_before) = i.color_temp(&s, s.next_midnight - eps).unwrap();
        assert!(night_before);
        assert!((before - i.min_color_temp).abs() < 20.0, "{before}");

        let (at, night) = i.color_temp(&s, s.previous_midnight).unwrap();
        assert!(night);
        assert!((at - i.min_color_temp).abs() < f64::EPSILON);
    }

    #[test]
    fn noon_is_coolest() {
        let i = Interpolator::default();
        let (kelvin, night) = i.color_temp(&schedule(utc(12, 15)), utc(12, 15)).unwrap();
        assert!((kelvin - i.max_color_temp).abs() < f64::EPSILON);
        assert!(!night);
    }

    #[test]
    fn night_segments_are_flagged() {
        let i = Interpolator::default();
        let at = utc(3, 0);
        let (kelvin, night) = i.color_temp(&schedule(at), at).unwrap();
        assert!(night);
        assert!(kelvin > i.min_color_temp && kelvin < i.dawn_color_temp);

        let at = utc(22, 0);
        let (_, night) = i.color_temp(&schedule(at), at).unwrap();
        assert!(night);
    }

    #[test]
    fn uncovered_instant_falls_back_to_min_and_day() {
        let i = Interpolator::default();
        let s = schedule(utc(12, 0));
        let far = s.next_midnight + TimeDelta::days(3);
        assert_eq!(i.color_temp(&s, far).unwrap(), (i.min_color_temp, false));
    }

    #[test]
    fn degenerate_span_is_refused() {
        let err = position("x", utc(6, 0), utc(6, 0), utc(6, 0), 0.5).unwrap_err();
        assert!(matches!(err, InterpolationError::DegenerateSegment { name: "x", .. }));
    }

    #[test]
    fn sleep_overrides_curves() {
        let i = Interpolator::default().with_sleep(5.0, 1800.0);
        let p = i.evaluate(&schedule(utc(12, 0)), utc(12, 0), true).unwrap();
        assert_eq!(
            p,
            CurvePoint {
                brightness_pct: 5.0,
                color_temp_kelvin: 1800.0,
                is_night: false,
            }
        );
    }
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solar schedule construction.
//!
//! A [`SolarSchedule`] is rebuilt for every evaluation from three candidate
//! days (yesterday, today and tomorrow) and reduced to the one whose color
//! temperature curve covers the query instant. Schedules are never cached.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::ephemeris::{Depression, Ephemeris, Observer, SunDirection, TimeWindow};
use crate::error::{Result, ScheduleError};

/// The four primary sun events whose order is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarEvent {
    /// Sunrise, after offsets and overrides.
    Sunrise,
    /// Solar noon.
    Noon,
    /// Sunset, after offsets and overrides.
    Sunset,
    /// Solar midnight.
    Midnight,
}

impl fmt::Display for SolarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sunrise => "sunrise",
            Self::Noon => "noon",
            Self::Sunset => "sunset",
            Self::Midnight => "midnight",
        };
        f.write_str(name)
    }
}

const CANONICAL_ORDER: [SolarEvent; 4] = [
    SolarEvent::Sunrise,
    SolarEvent::Noon,
    SolarEvent::Sunset,
    SolarEvent::Midnight,
];

/// A primary event at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Which event.
    pub event: SolarEvent,
    /// When it happens.
    pub at: DateTime<Utc>,
}

impl TimedEvent {
    const fn new(event: SolarEvent, at: DateTime<Utc>) -> Self {
        Self { event, at }
    }
}

/// Named sun events for one calendar day, relative to a query instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarSchedule {
    /// Start of morning twilight.
    pub dawn: DateTime<Utc>,
    /// Sunrise after overrides and offsets.
    pub sunrise: DateTime<Utc>,
    /// Solar noon.
    pub noon: DateTime<Utc>,
    /// Sunset after overrides and offsets.
    pub sunset: DateTime<Utc>,
    /// End of evening twilight.
    pub dusk: DateTime<Utc>,
    /// Solar midnight as reported for this date.
    pub midnight: DateTime<Utc>,
    /// Solar midnight that opens the night segment.
    pub previous_midnight: DateTime<Utc>,
    /// Solar midnight that closes the night segment.
    pub next_midnight: DateTime<Utc>,
    /// Start of the blue hour that ends the night segment.
    pub next_blue_hour_morning_start: DateTime<Utc>,
    /// Morning blue hour.
    pub blue_hour_morning: TimeWindow,
    /// Morning golden hour.
    pub golden_hour_morning: TimeWindow,
    /// Evening golden hour.
    pub golden_hour_evening: TimeWindow,
    /// Evening blue hour.
    pub blue_hour_evening: TimeWindow,
    /// Sun elevation in degrees at the query instant.
    pub sun_position: f64,
    bracketing: (TimedEvent, TimedEvent),
}

impl SolarSchedule {
    /// Returns the primary events immediately before and after the query
    /// instant, taken from all three candidate days.
    #[must_use]
    pub fn bracketing(&self) -> (TimedEvent, TimedEvent) {
        self.bracketing
    }

    /// Returns `true` if a color temperature segment of this day contains
    /// `at`.
    #[must_use]
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        let night = self.previous_midnight <= at && at < self.next_blue_hour_morning_start;
        let day = self.blue_hour_morning.start <= at && at < self.next_midnight;
        night || day
    }

    fn primary_events(&self) -> [TimedEvent; 4] {
        [
            TimedEvent::new(SolarEvent::Sunrise, self.sunrise),
            TimedEvent::new(SolarEvent::Noon, self.noon),
            TimedEvent::new(SolarEvent::Sunset, self.sunset),
            TimedEvent::new(SolarEvent::Midnight, self.midnight),
        ]
    }
}

/// Builds [`SolarSchedule`]s from an [`Ephemeris`].
///
/// # Examples
///
/// ```
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use sunlight_lib::solar::{DailyEphemeris, Observer, ScheduleBuilder};
///
/// let builder = ScheduleBuilder::new(Observer::new(52.37, 4.89, 0.0))
///     .with_sunrise_offset(TimeDelta::minutes(15));
/// let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
/// let schedule = builder.build(&DailyEphemeris::temperate(), now).unwrap();
/// assert_eq!(schedule.sunrise, Utc.with_ymd_and_hms(2024, 3, 20, 6, 45, 0).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleBuilder {
    observer: Observer,
    depression: Depression,
    time_zone: Tz,
    sunrise_time: Option<NaiveTime>,
    sunset_time: Option<NaiveTime>,
    sunrise_offset: TimeDelta,
    sunset_offset: TimeDelta,
    horizon: Option<f64>,
}

impl ScheduleBuilder {
    /// Creates a builder for `observer` with civil twilight, UTC and no
    /// overrides.
    #[must_use]
    pub fn new(observer: Observer) -> Self {
        Self {
            observer,
            depression: Depression::Civil,
            time_zone: Tz::UTC,
            sunrise_time: None,
            sunset_time: None,
            sunrise_offset: TimeDelta::zero(),
            sunset_offset: TimeDelta::zero(),
            horizon: None,
        }
    }

    /// Sets the twilight depression used for dawn and dusk.
    #[must_use]
    pub fn with_depression(mut self, depression: Depression) -> Self {
        self.depression = depression;
        self
    }

    /// Sets the time zone that fixed sunrise/sunset times are given in.
    #[must_use]
    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    /// Replaces the sunrise with a fixed local time of day.
    #[must_use]
    pub fn with_sunrise_time(mut self, time: Option<NaiveTime>) -> Self {
        self.sunrise_time = time;
        self
    }

    /// Replaces the sunset with a fixed local time of day.
    #[must_use]
    pub fn with_sunset_time(mut self, time: Option<NaiveTime>) -> Self {
        self.sunset_time = time;
        self
    }

    /// Shifts the sunrise.
    #[must_use]
    pub fn with_sunrise_offset(mut self, offset: TimeDelta) -> Self {
        self.sunrise_offset = offset;
        self
    }

    /// Shifts the sunset.
    #[must_use]
    pub fn with_sunset_offset(mut self, offset: TimeDelta) -> Self {
        self.sunset_offset = offset;
        self
    }

    /// Uses the crossings of this elevation (in degrees) as sunrise and
    /// sunset, for a landscape horizon that hides the sun earlier.
    #[must_use]
    pub fn with_horizon(mut self, horizon: Option<f64>) -> Self {
        self.horizon = horizon;
        self
    }

    /// Returns the observer.
    #[must_use]
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// Builds the schedule around `now`.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::Ordering`] if sunrise, noon, sunset and midnight of
    ///   any candidate day are not a rotation of that order
    /// - [`ScheduleError::NonexistentLocalTime`] if a fixed time falls in a
    ///   daylight saving gap
    /// - [`ScheduleError::NoBracketingEvents`] if no primary event lies on
    ///   both sides of `now`
    /// - any [`EphemerisError`](crate::error::EphemerisError) from the oracle
    pub fn build<E: Ephemeris + ?Sized>(
        &self,
        ephemeris: &E,
        now: DateTime<Utc>,
    ) -> Result<SolarSchedule> {
        let yesterday = self.candidate(ephemeris, now - TimeDelta::days(1), now)?;
        let today = self.candidate(ephemeris, now, now)?;
        let tomorrow = self.candidate(ephemeris, now + TimeDelta::days(1), now)?;

        let mut events: Vec<TimedEvent> = [yesterday, today, tomorrow]
            .iter()
            .flat_map(SolarSchedule::primary_events)
            .collect();
        events.sort_by_key(|e| e.at);
        let index = events.partition_point(|e| e.at <= now);
        if index == 0 || index == events.len() {
            return Err(ScheduleError::NoBracketingEvents(now).into());
        }
        let bracketing = (events[index - 1], events[index]);

        // today, then yesterday, then tomorrow
        let mut schedule = [today, yesterday, tomorrow]
            .into_iter()
            .find(|c| c.covers(now))
            .unwrap_or(today);
        schedule.bracketing = bracketing;
        schedule.sun_position = ephemeris.solar_elevation(&self.observer, now);

        tracing::trace!(
            %now,
            sunrise = %schedule.sunrise,
            sunset = %schedule.sunset,
            previous = %bracketing.0.event,
            next = %bracketing.1.event,
            "Built solar schedule"
        );
        Ok(schedule)
    }

    fn candidate<E: Ephemeris + ?Sized>(
        &self,
        ephemeris: &E,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<SolarSchedule> {
        let date = at.date_naive();
        let tomorrow = date + TimeDelta::days(1);
        let events = ephemeris.events(&self.observer, date, self.depression)?;
        let next_events = ephemeris.events(&self.observer, tomorrow, self.depression)?;

        let (sunrise, sunset) = self.sunrise_sunset(ephemeris, date, events.sunrise, events.sunset)?;

        let (previous_midnight, next_midnight, next_blue_hour_morning_start) =
            if events.midnight.date_naive() < date && events.noon < at {
                (
                    next_events.midnight,
                    next_events.midnight,
                    next_events.blue_hour_morning.start,
                )
            } else {
                (
                    events.midnight,
                    next_events.midnight,
                    events.blue_hour_morning.start,
                )
            };

        let schedule = SolarSchedule {
            dawn: events.dawn,
            sunrise,
            noon: events.noon,
            sunset,
            dusk: events.dusk,
            midnight: events.midnight,
            previous_midnight,
            next_midnight,
            next_blue_hour_morning_start,
            blue_hour_morning: events.blue_hour_morning,
            golden_hour_morning: events.golden_hour_morning,
            golden_hour_evening: events.golden_hour_evening,
            blue_hour_evening: events.blue_hour_evening,
            sun_position: 0.0,
            bracketing: (
                TimedEvent::new(SolarEvent::Sunrise, sunrise),
                TimedEvent::new(SolarEvent::Sunset, sunset),
            ),
        };
        validate_order(&schedule.primary_events()).inspect_err(|e| {
            tracing::error!(%now, %date, error = %e, "Sun events are out of order");
        })?;
        Ok(schedule)
    }

    fn sunrise_sunset<E: Ephemeris + ?Sized>(
        &self,
        ephemeris: &E,
        date: NaiveDate,
        sunrise: DateTime<Utc>,
        sunset: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let (sunrise, sunset) = match self.horizon {
            Some(horizon) if self.sunrise_time.is_none() || self.sunset_time.is_none() => (
                ephemeris.time_at_elevation(
                    &self.observer,
                    horizon,
                    date,
                    SunDirection::Rising,
                )?,
                ephemeris.time_at_elevation(
                    &self.observer,
                    horizon,
                    date,
                    SunDirection::Setting,
                )?,
            ),
            _ => (
                match self.sunrise_time {
                    Some(time) => self.localize(date, time)?,
                    None => sunrise,
                },
                match self.sunset_time {
                    Some(time) => self.localize(date, time)?,
                    None => sunset,
                },
            ),
        };
        Ok((sunrise + self.sunrise_offset, sunset + self.sunset_offset))
    }

    /// Interprets `time` on `date` in the configured zone. Ambiguous times
    /// resolve to the earlier instant.
    fn localize(&self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>> {
        self.time_zone
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| ScheduleError::NonexistentLocalTime(time, date).into())
    }
}

/// Checks that the events, sorted by time, are a rotation of
/// sunrise → noon → sunset → midnight.
fn validate_order(events: &[TimedEvent; 4]) -> std::result::Result<(), ScheduleError> {
    let mut sorted = *events;
    sorted.sort_by_key(|e| e.at);
    let names: Vec<SolarEvent> = sorted.iter().map(|e| e.event).collect();

    let is_rotation = (0..CANONICAL_ORDER.len()).any(|shift| {
        names
            .iter()
            .enumerate()
            .all(|(i, name)| *name == CANONICAL_ORDER[(i + shift) % CANONICAL_ORDER.len()])
    });
    if is_rotation {
        Ok(())
    } else {
        Err(ScheduleError::Ordering(names))
    }
}

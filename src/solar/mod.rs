// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sun-driven brightness and color temperature.
//!
//! The pipeline runs once per adaptation cycle:
//!
//! 1. [`ScheduleBuilder`] asks an [`Ephemeris`] for yesterday, today and
//!    tomorrow and keeps the day around `now`
//! 2. [`Interpolator`] maps `now` onto the brightness and color temperature
//!    curves
//! 3. [`SettingsProjector`] converts the result into every color space

mod ephemeris;
mod interpolation;
mod schedule;
mod settings;

pub use ephemeris::{
    DailyEphemeris, DayEvents, DayTemplate, Depression, Ephemeris, Observer, SunDirection,
    TimeWindow,
};
pub use interpolation::{CurvePoint, Interpolator};
pub use schedule::{ScheduleBuilder, SolarEvent, SolarSchedule, TimedEvent};
pub use settings::{LightSettings, SettingsProjector};

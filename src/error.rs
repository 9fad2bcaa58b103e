// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `sunlight_lib` library.
//!
//! This module provides the error hierarchy for the adaptation pipeline:
//! configuration validation, solar schedule construction, interpolation,
//! and host communication.

use thiserror::Error;

use crate::solar::SolarEvent;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration or input value was rejected.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The solar schedule for the current instant could not be built.
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// The ephemeris collaborator failed to produce an event.
    #[error("ephemeris error: {0}")]
    Ephemeris(#[from] EphemerisError),

    /// Interpolation hit a segment that cannot be evaluated.
    #[error("interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// The host failed to execute a command.
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("{field} value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
        /// The actual value that was provided.
        actual: f64,
    },

    /// A lower bound is greater than its upper bound.
    #[error("{min_field} ({min}) must not exceed {max_field} ({max})")]
    InvertedRange {
        /// Name of the lower bound field.
        min_field: &'static str,
        /// Name of the upper bound field.
        max_field: &'static str,
        /// The lower bound value.
        min: f64,
        /// The upper bound value.
        max: f64,
    },

    /// A duration that must be positive was zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// An RGB color string could not be parsed.
    #[error("invalid RGB color: {0}")]
    InvalidRgbColor(String),
}

/// Errors raised while building the solar schedule.
///
/// These are configuration problems: they are never retried and the
/// adapter stays non-functional until the configuration changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The primary sun events are not a rotation of
    /// sunrise → noon → sunset → midnight.
    #[error(
        "sun events {0:?} are not in the expected order; the sunrise/sunset offset may be too \
         large or a fixed sunrise/sunset time may be past noon/midnight"
    )]
    Ordering(Vec<SolarEvent>),

    /// A fixed time of day does not exist in the configured time zone.
    #[error("fixed time {0} does not exist on {1} in the configured time zone")]
    NonexistentLocalTime(chrono::NaiveTime, chrono::NaiveDate),

    /// No candidate day produced events around the requested instant.
    #[error("no sun events bracket {0}")]
    NoBracketingEvents(chrono::DateTime<chrono::Utc>),
}

/// Errors reported by an [`Ephemeris`](crate::solar::Ephemeris) implementation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EphemerisError {
    /// The sun never reaches the requested elevation on that date.
    #[error("the sun never reaches {elevation}° on {date}")]
    ElevationNotReached {
        /// Requested elevation in degrees.
        elevation: f64,
        /// The date that was queried.
        date: chrono::NaiveDate,
    },

    /// The implementation has no data for that date.
    #[error("no ephemeris data for {0}")]
    NoData(chrono::NaiveDate),
}

/// Errors raised by the interpolation engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    /// A segment's end instant does not come after its start instant.
    #[error("segment {name} has a non-positive span ({start} .. {end})")]
    DegenerateSegment {
        /// Segment name.
        name: &'static str,
        /// Segment start.
        start: chrono::DateTime<chrono::Utc>,
        /// Segment end.
        end: chrono::DateTime<chrono::Utc>,
    },
}

/// Errors reported by a [`LightHost`](crate::host::LightHost).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host does not know the light.
    #[error("unknown light: {0}")]
    UnknownLight(String),

    /// The host rejected the command.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// The host could not be reached.
    #[error("host unavailable: {0}")]
    Unavailable(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            field: "min_brightness",
            min: 1.0,
            max: 100.0,
            actual: 150.0,
        };
        assert_eq!(
            err.to_string(),
            "min_brightness value 150 is out of range [1, 100]"
        );
    }

    #[test]
    fn error_from_schedule_error() {
        let err: Error = ScheduleError::Ordering(vec![SolarEvent::Noon]).into();
        assert!(matches!(err, Error::Schedule(ScheduleError::Ordering(_))));
    }

    #[test]
    fn host_error_display() {
        let err = HostError::UnknownLight("light.kitchen".to_string());
        assert_eq!(err.to_string(), "unknown light: light.kitchen");
    }
}

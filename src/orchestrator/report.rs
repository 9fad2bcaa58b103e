// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outcome of an adaptation cycle.

use crate::command::LightCommand;
use crate::error::HostError;
use crate::types::LightId;

/// What happened to one light during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum LightOutcome {
    /// The command was sent.
    Adapted(LightCommand),
    /// The light is off and was left alone.
    Off,
    /// The light is under manual control.
    ManuallyControlled,
    /// Another adaptation of the light is in progress.
    Locked,
    /// The light drifted from the last command and was left alone.
    SignificantChange,
    /// The host failed; the rest of the batch went on.
    Failed(HostError),
}

impl LightOutcome {
    /// Returns `true` if a command was sent.
    #[must_use]
    pub fn is_adapted(&self) -> bool {
        matches!(self, Self::Adapted(_))
    }
}

/// Per-light outcomes of one cycle, in the order the lights were visited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdaptationReport {
    outcomes: Vec<(LightId, LightOutcome)>,
}

impl AdaptationReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, light: LightId, outcome: LightOutcome) {
        self.outcomes.push((light, outcome));
    }

    /// Returns the outcome for `light`.
    #[must_use]
    pub fn outcome(&self, light: &LightId) -> Option<&LightOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == light)
            .map(|(_, outcome)| outcome)
    }

    /// Iterates over all outcomes.
    pub fn iter(&self) -> impl Iterator<Item = (&LightId, &LightOutcome)> {
        self.outcomes.iter().map(|(light, outcome)| (light, outcome))
    }

    /// Returns the lights that received a command.
    #[must_use]
    pub fn adapted(&self) -> Vec<&LightId> {
        self.iter()
            .filter(|(_, outcome)| outcome.is_adapted())
            .map(|(light, _)| light)
            .collect()
    }

    /// Returns the lights whose command failed.
    #[must_use]
    pub fn failed(&self) -> Vec<(&LightId, &HostError)> {
        self.iter()
            .filter_map(|(light, outcome)| match outcome {
                LightOutcome::Failed(err) => Some((light, err)),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of lights visited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns `true` if no light was visited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

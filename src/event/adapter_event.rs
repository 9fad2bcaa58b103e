// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adapter event types.

use serde::Serialize;

use crate::command::LightCommand;
use crate::types::{CausationId, LightId};

/// Events emitted by an adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterEvent {
    /// A light was marked as manually controlled.
    ///
    /// Published once per transition into the manual state.
    ManualControl {
        /// The light.
        light: LightId,
        /// Causation of the change that triggered detection.
        causation: CausationId,
    },

    /// A command was sent to a light.
    Adapted {
        /// The light.
        light: LightId,
        /// The command as sent (before any split).
        command: LightCommand,
        /// Causation attached to the command.
        causation: CausationId,
    },

    /// A turn-on was ignored because it looked like the end of a
    /// turn-off transition.
    SettleSuppressed {
        /// The light.
        light: LightId,
    },
}

impl AdapterEvent {
    /// Returns the light the event is about.
    #[must_use]
    pub fn light(&self) -> &LightId {
        match self {
            Self::ManualControl { light, .. }
            | Self::Adapted { light, .. }
            | Self::SettleSuppressed { light } => light,
        }
    }

    /// Returns `true` for [`AdapterEvent::ManualControl`].
    #[must_use]
    pub fn is_manual_control(&self) -> bool {
        matches!(self, Self::ManualControl { .. })
    }
}

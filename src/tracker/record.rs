// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-light tracking state.

use crate::host::ServiceCall;
use crate::state::{LightAttributes, StateSnapshot};

/// What the tracker knows about one light.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualControlRecord {
    /// Whether the adapter has stopped adapting this light.
    pub manual_control: bool,
    /// Most recent `turn_on` call targeting the light.
    pub last_turn_on: Option<ServiceCall>,
    /// Most recent `turn_off` call targeting the light.
    pub last_turn_off: Option<ServiceCall>,
    /// External `turn_on` that arrived while the light was on and has not
    /// been acted on yet.
    pub pending_takeover: Option<ServiceCall>,
    /// States reported after the adapter's most recent command.
    pub snapshots: Vec<StateSnapshot>,
    /// Attributes of the adapter's most recent command.
    pub commanded: Option<LightAttributes>,
    /// Consecutive cycles with a significant external change.
    pub change_count: u8,
}

impl ManualControlRecord {
    /// Clears detection state; keeps the manual flag if asked to.
    ///
    /// The last service calls survive a reset; a pending takeover does not.
    pub(crate) fn reset(&mut self, keep_manual_control: bool) {
        if !keep_manual_control {
            self.manual_control = false;
        }
        self.pending_takeover = None;
        self.snapshots.clear();
        self.commanded = None;
        self.change_count = 0;
    }

    /// Stores `snapshot`, grouping snapshots that share a causation.
    pub(crate) fn push_snapshot(&mut self, snapshot: StateSnapshot) {
        match self.snapshots.first() {
            Some(first) if first.causation == snapshot.causation => self.snapshots.push(snapshot),
            _ => self.snapshots = vec![snapshot],
        }
    }
}

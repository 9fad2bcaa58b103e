// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Adaptation orchestration.
//!
//! An [`Adapter`] ties the pieces together for one set of lights:
//!
//! ```text
//!  tick / switch / service            host notification
//!            │                               │
//!            ▼                               ▼
//!   schedule → curves → settings      tracker + debouncer
//!            │                               │
//!            └──────────► gate ◄─────────────┘
//!                          │
//!                          ▼
//!                 build command → host
//! ```
//!
//! Every command leaves with a fresh [`CausationId`](crate::types::CausationId)
//! so the state changes it causes can be told apart from a person's.

mod adapter;
mod locks;
mod report;

pub use adapter::{Adapter, ApplyRequest, Clock};
pub use locks::{AdaptationGuard, AdaptationLocks};
pub use report::{AdaptationReport, LightOutcome};

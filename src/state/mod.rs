// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observed light state.
//!
//! [`LightState`] is what the host reports for a light. Snapshots of it,
//! tagged with the causation of the change, feed the manual-control tracker,
//! which compares them with [`LightAttributes::significant_change`].
//!
//! # Examples
//!
//! ```
//! use sunlight_lib::state::{AttributeChange, ChangeThresholds, LightAttributes};
//!
//! let commanded = LightAttributes::new().with_brightness(100);
//! let observed = LightAttributes::new().with_brightness(200);
//!
//! let change = observed.significant_change(&commanded, &ChangeThresholds::default(), true, true);
//! assert_eq!(change, Some(AttributeChange::Brightness { from: 100, to: 200 }));
//! ```

mod attribute_change;
mod light_state;

pub use attribute_change::{AttributeChange, ChangeThresholds};
pub use light_state::{LightAttributes, LightState, StateSnapshot};

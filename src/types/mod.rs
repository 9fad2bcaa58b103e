// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the adaptation pipeline.
//!
//! # Types
//!
//! - [`LightId`] - Host identifier of a light
//! - [`CausationId`] - Tag correlating commands with the state changes they caused
//! - [`RgbColor`] - 8-bit RGB triple with the redmean distance
//! - [`XyColor`], [`HsColor`] - Derived color-space values

mod causation;
mod color;
mod light_id;
mod rgb_color;

pub use causation::{CausationId, Origin};
pub use color::{HsColor, XyColor, kelvin_to_mired, mired_to_kelvin};
pub use light_id::LightId;
pub use rgb_color::RgbColor;

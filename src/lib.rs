// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `sunlight_lib` - Sun-driven brightness and color temperature for lights.
//!
//! The library computes, from the position of the sun, a target brightness
//! and color temperature for a set of lights and keeps sending it to them,
//! until somebody takes a light over by hand.
//!
//! # Pipeline
//!
//! - [`solar`]: daily sun events from an [`Ephemeris`](solar::Ephemeris),
//!   brightness and color temperature curves, and projection into every
//!   color space ([`color`])
//! - [`command`]: turning the settings into a per-light command that only
//!   uses what the light supports ([`capabilities`])
//! - [`tracker`] and [`debounce`]: manual-control detection, and protection
//!   against the off-on flicker of lights that are still turning off
//! - [`orchestrator`]: the [`Adapter`] that runs the cycle and reacts to
//!   host notifications
//!
//! The host platform is abstracted by [`LightHost`](host::LightHost); it
//! executes commands and reports state changes through
//! [`HostEvent`](host::HostEvent)s.
//!
//! # Quick Start
//!
//! ```no_run
//! use sunlight_lib::{AdaptationConfig, Adapter};
//! use sunlight_lib::color::StandardColorConverter;
//! use sunlight_lib::solar::DailyEphemeris;
//! # use sunlight_lib::{capabilities::LightCapabilities, command::LightCommand, error::HostError,
//! #     host::LightHost, state::LightState, types::{CausationId, LightId}};
//! # struct MyHost;
//! # impl LightHost for MyHost {
//! #     async fn send_command(&self, _: &LightId, _: &LightCommand, _: &CausationId) -> Result<(), HostError> { Ok(()) }
//! #     fn capabilities(&self, _: &LightId) -> Option<LightCapabilities> { None }
//! #     fn state(&self, _: &LightId) -> Option<LightState> { None }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> sunlight_lib::Result<()> {
//!     let config = AdaptationConfig::from_json_str(r#"{
//!         "name": "living_room",
//!         "lights": ["light.sofa"],
//!         "observer": {"latitude": 52.37, "longitude": 4.89, "elevation": 0}
//!     }"#)?;
//!     let adapter = Adapter::new(config, MyHost, DailyEphemeris::temperate(), StandardColorConverter)?;
//!
//!     let mut events = adapter.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("{event:?}");
//!         }
//!     });
//!
//!     adapter.turn_on(true).await?;
//!     adapter.run(std::future::pending()).await;
//!     Ok(())
//! }
//! ```

pub mod capabilities;
pub mod color;
pub mod command;
pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod host;
pub mod orchestrator;
pub mod solar;
pub mod state;
pub mod tracker;
pub mod types;

pub use capabilities::{CapabilitiesBuilder, Feature, LightCapabilities};
pub use command::{CommandOptions, LightCommand};
pub use config::AdaptationConfig;
pub use error::{Error, Result};
pub use event::{AdapterEvent, EventBus};
pub use host::{HostEvent, LightHost};
pub use orchestrator::{AdaptationReport, Adapter, ApplyRequest, LightOutcome};
pub use solar::LightSettings;
pub use types::{CausationId, LightId, RgbColor};

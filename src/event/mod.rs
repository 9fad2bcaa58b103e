// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notifications published by an adapter.
//!
//! Each [`Adapter`](crate::orchestrator::Adapter) owns an [`EventBus`].
//! The host subscribes to it to learn when a light was taken over by a
//! person (so it can fire its own platform event), when an adaptation was
//! sent, and when a turn-on was dropped as the tail of a turn-off
//! transition.
//!
//! # Examples
//!
//! ```
//! use sunlight_lib::event::{AdapterEvent, EventBus};
//! use sunlight_lib::types::{CausationId, LightId};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(AdapterEvent::ManualControl {
//!     light: LightId::new("light.desk"),
//!     causation: CausationId::external(),
//! });
//! assert!(rx.try_recv().is_ok());
//! ```

mod adapter_event;
mod event_bus;

pub use adapter_event::AdapterEvent;
pub use event_bus::EventBus;

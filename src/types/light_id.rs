// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Light identifier type.

use std::fmt;
use std::sync::Arc;

/// Identifier of a light as known by the host (e.g. `light.kitchen`).
///
/// Cloning is cheap: the name is reference counted.
///
/// # Examples
///
/// ```
/// use sunlight_lib::types::LightId;
///
/// let id = LightId::new("light.kitchen");
/// assert_eq!(id.as_str(), "light.kitchen");
/// assert_eq!(id, LightId::from("light.kitchen"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(Arc<str>);

impl LightId {
    /// Creates a light identifier.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LightId({})", self.0)
    }
}

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LightId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LightId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl serde::Serialize for LightId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for LightId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name))
    }
}

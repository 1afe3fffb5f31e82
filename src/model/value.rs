//! Attribute values as supplied by the host runtime.
//!
//! A configured attribute is either absent, not yet known (its value depends
//! on something the host has not resolved), or a concrete value.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A possibly-unset, possibly-unknown attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttrValue<T> {
    /// The attribute was not set.
    #[default]
    Null,
    /// The attribute will only be known later.
    Unknown,
    /// A concrete value.
    Known(T),
}

impl<T> AttrValue<T> {
    /// Returns true if the value is not yet known.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns true if the attribute was not set.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts an optional value, mapping `None` to [`AttrValue::Null`].
    #[must_use]
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Known)
    }

    /// Returns the concrete value, if any.
    #[must_use]
    pub const fn known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            Self::Null | Self::Unknown => None,
        }
    }
}

impl<T> From<T> for AttrValue<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl From<&str> for AttrValue<String> {
    fn from(value: &str) -> Self {
        Self::Known(value.to_string())
    }
}

// Configuration files cannot express unknown values, so they (de)serialize
// as plain optional values. Unknown is written as null.
impl<T: Serialize> Serialize for AttrValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.known().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for AttrValue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from_option)
    }
}

//! Per-field parse outcome.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;

use crate::error::Result;

/// State of a known field after parsing.
///
/// Schema violations never abort a parse: a value of the wrong shape is
/// kept verbatim in [`Slot::Mistyped`] so the validator can report it and the
/// writer can emit it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Absent,
    Value(T),
    Mistyped {
        raw: Value,
        expected: &'static str,
        reason: String,
    },
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Slot<T> {
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub const fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub const fn is_mistyped(&self) -> bool {
        matches!(self, Self::Mistyped { .. })
    }
}

impl<T: DeserializeOwned> Slot<T> {
    /// Interpret a raw value as `T`, keeping it verbatim when it does not fit.
    pub fn from_raw(raw: Option<Value>, expected: &'static str) -> Self {
        let Some(raw) = raw else {
            return Self::Absent;
        };
        match serde_yaml::from_value::<T>(raw.clone()) {
            Ok(value) => Self::Value(value),
            Err(err) => Self::Mistyped {
                raw,
                expected,
                reason: err.to_string(),
            },
        }
    }
}

impl<T: Serialize> Slot<T> {
    /// Value to emit for this field, `None` when absent.
    pub fn to_yaml(&self) -> Result<Option<Value>> {
        match self {
            Self::Absent => Ok(None),
            Self::Value(value) => Ok(Some(serde_yaml::to_value(value)?)),
            Self::Mistyped { raw, .. } => Ok(Some(raw.clone())),
        }
    }
}

impl<T> From<T> for Slot<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

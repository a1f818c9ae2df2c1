//! JSON wire form for [`TextOp`].
//!
//! An operation is an array of components: a positive integer retains, a
//! string inserts, a negative integer deletes. `[1, "b", 1]` keeps one char,
//! inserts `b`, then keeps one more.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::OtError;
use crate::op::{Component, TextOp};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawComponent {
    Count(i64),
    Text(String),
}

impl TryFrom<RawComponent> for Component {
    type Error = OtError;

    fn try_from(raw: RawComponent) -> Result<Self, Self::Error> {
        match raw {
            RawComponent::Count(0) => Err(OtError::InvalidComponent("zero-length count".into())),
            RawComponent::Count(n) if n > 0 => Ok(Component::Retain(n.unsigned_abs() as usize)),
            RawComponent::Count(n) => Ok(Component::Delete(n.unsigned_abs() as usize)),
            RawComponent::Text(s) if s.is_empty() => {
                Err(OtError::InvalidComponent("empty insertion".into()))
            }
            RawComponent::Text(s) => Ok(Component::Insert(s)),
        }
    }
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Retain(n) => serializer.serialize_u64(*n as u64),
            Self::Insert(s) => serializer.serialize_str(s),
            Self::Delete(n) => serializer.serialize_i64(-(*n as i64)),
        }
    }
}

impl Serialize for TextOp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.components().len()))?;
        for component in self.components() {
            seq.serialize_element(component)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for TextOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<RawComponent>::deserialize(deserializer)?;
        let components = raw
            .into_iter()
            .map(Component::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(de::Error::custom)?;
        Ok(TextOp::from_components(components))
    }
}

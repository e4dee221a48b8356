//! Entity identity and metadata types

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque identifier for a monitored entity.
///
/// Backends deliver entity ids either as strings or as bare numbers. Both
/// forms deserialize into the same newtype, numbers in their decimal string
/// form, so lookups behave identically regardless of the wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntityIdVisitor;

        impl Visitor<'_> for EntityIdVisitor {
            type Value = EntityId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an entity id as a string or a number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(EntityId(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(EntityId(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(EntityId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(EntityId(v.to_string()))
            }
        }

        deserializer.deserialize_any(EntityIdVisitor)
    }
}

/// Data type of an entity's primary value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueDataType {
    #[default]
    Number,
    Text,
    Boolean,
    Enum,
}

/// Declared attribute metadata for an entity's value.
///
/// All fields are optional; widgets fall back to defaults for anything the
/// backend does not declare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValueAttribute {
    /// Unit of measurement (e.g. "°C", "%", "kWh")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Declared minimum value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Declared maximum value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Decimal places to render for numeric values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default)]
    pub data_type: ValueDataType,
}

/// Entity metadata record seeded into the registry snapshot.
///
/// This is the explicit form of the backend's entity option payload: `id`
/// and `key` are required, everything else is best-effort metadata. Records
/// failing [`EntityOption::is_valid`] are discarded at the registry boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityOption {
    pub id: EntityId,
    /// Data-point key (e.g. "door_alarm", "temperature")
    pub key: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Entity category reported by the backend (e.g. "telemetry", "attribute")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_attribute: Option<ValueAttribute>,
}

impl EntityOption {
    pub fn new(id: impl Into<EntityId>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            name: String::new(),
            entity_type: None,
            value_attribute: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_attribute(mut self, attribute: ValueAttribute) -> Self {
        self.value_attribute = Some(attribute);
        self
    }

    /// A record without an id cannot be resolved and is rejected at the
    /// registry boundary.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Persisted widget → entity reference, the `{ value, rawData }` wire shape.
///
/// `value` carries the entity id (it is the option value of the entity
/// picker); `rawData` is the full entity option captured at configuration
/// time, used to resolve keys and attributes without a snapshot lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBinding {
    pub value: EntityId,
    #[serde(default, rename = "rawData", skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<EntityOption>,
}

impl EntityBinding {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            value: id.into(),
            raw_data: None,
        }
    }

    pub fn with_raw_data(mut self, option: EntityOption) -> Self {
        self.raw_data = Some(option);
        self
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_accepts_string_or_number() {
        let from_str: EntityId = serde_json::from_str("\"dev-42\"").unwrap();
        assert_eq!(from_str.as_str(), "dev-42");

        let from_number: EntityId = serde_json::from_str("42").unwrap();
        assert_eq!(from_number.as_str(), "42");

        // A numeric and a string form of the same id resolve identically
        assert_eq!(from_number, EntityId::from("42"));
    }

    #[test]
    fn test_binding_wire_shape() {
        let binding = EntityBinding::new("temp-1")
            .with_raw_data(EntityOption::new("temp-1", "temperature").with_name("Temperature"));
        let json = serde_json::to_string(&binding).unwrap();
        assert!(json.contains("\"rawData\""));

        let deserialized: EntityBinding = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.entity_id().as_str(), "temp-1");
        assert_eq!(deserialized.raw_data.unwrap().key, "temperature");
    }

    #[test]
    fn test_option_validity() {
        assert!(EntityOption::new("a", "k").is_valid());
        assert!(!EntityOption::new("", "k").is_valid());
    }
}

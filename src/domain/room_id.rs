//! Type-safe room identifier.
//!
//! [`RoomId`] is a newtype wrapper around [`uuid::Uuid`] so that room
//! identifiers cannot be confused with event or approval UUIDs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a hotel room type.
///
/// Rooms are owned by the external room catalogue; the pricing engine only
/// references them. Used as the cache-key subject, the event target and the
/// approval reply keyword argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct RoomId(uuid::Uuid);

impl RoomId {
    /// Creates a new random `RoomId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `RoomId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl From<uuid::Uuid> for RoomId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RoomId> for uuid::Uuid {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_generates_unique_ids() {
        assert_ne!(RoomId::new(), RoomId::new());
    }

    #[test]
    fn parses_from_display() {
        let id = RoomId::new();
        let Ok(parsed) = id.to_string().parse::<RoomId>() else {
            panic!("display output should parse");
        };
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_garbage() {
        assert!("room-42".parse::<RoomId>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let uuid = uuid::Uuid::new_v4();
        let json = serde_json::to_string(&RoomId::from_uuid(uuid)).unwrap_or_default();
        assert_eq!(json, format!("\"{uuid}\""));
    }
}

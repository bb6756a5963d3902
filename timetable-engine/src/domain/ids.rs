//! Identifier types for network and timetable entities.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when parsing an invalid identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} id {value:?}: {reason}")]
pub struct InvalidId {
    kind: &'static str,
    value: String,
    reason: &'static str,
}

/// Check the shared identifier rules.
///
/// Identifiers must be non-empty, carry no leading or trailing whitespace,
/// and contain no control characters.
fn validate(kind: &'static str, s: &str) -> Result<(), InvalidId> {
    let fail = |reason| {
        Err(InvalidId {
            kind,
            value: s.to_string(),
            reason,
        })
    };

    if s.is_empty() {
        return fail("must not be empty");
    }
    if s.trim() != s {
        return fail("must not have surrounding whitespace");
    }
    if s.chars().any(char::is_control) {
        return fail("must not contain control characters");
    }
    Ok(())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Parse an identifier, rejecting empty or malformed input.
            pub fn parse(s: &str) -> Result<Self, InvalidId> {
                validate($kind, s)?;
                Ok(Self(s.to_string()))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

string_id!(
    /// Station identifier, e.g. `S1`.
    StationId,
    "station"
);

string_id!(
    /// Platform identifier, unique within its station (e.g. `S2P1`).
    PlatformId,
    "platform"
);

string_id!(
    /// Directed segment identifier, e.g. `seg_S1_S2`.
    SegmentId,
    "segment"
);

string_id!(
    /// Train identifier, e.g. `T001`.
    TrainId,
    "train"
);

string_id!(
    /// Event identifier, unique within one train's events.
    EventId,
    "event"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_ids() {
        assert!(StationId::parse("S1").is_ok());
        assert!(PlatformId::parse("S2P1").is_ok());
        assert!(SegmentId::parse("seg_S1_S2").is_ok());
        assert!(TrainId::parse("T001").is_ok());
        assert!(EventId::parse("E1").is_ok());
    }

    #[test]
    fn reject_empty() {
        assert!(StationId::parse("").is_err());
        assert!(TrainId::parse("").is_err());
    }

    #[test]
    fn reject_surrounding_whitespace() {
        assert!(StationId::parse(" S1").is_err());
        assert!(StationId::parse("S1 ").is_err());
        assert!(StationId::parse("   ").is_err());
    }

    #[test]
    fn reject_control_characters() {
        assert!(TrainId::parse("T0\n01").is_err());
        assert!(TrainId::parse("T\t1").is_err());
    }

    #[test]
    fn error_display() {
        let err = SegmentId::parse("").unwrap_err();
        assert_eq!(err.to_string(), "invalid segment id \"\": must not be empty");
    }

    #[test]
    fn display_and_debug() {
        let id = StationId::parse("S2").unwrap();
        assert_eq!(format!("{}", id), "S2");
        assert_eq!(format!("{:?}", id), "StationId(S2)");
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = TrainId::parse("T001").unwrap();
        let b = TrainId::parse("T002").unwrap();
        assert!(a < b);
    }

    #[test]
    fn serde_roundtrip_through_string() {
        let id: PlatformId = serde_json::from_str("\"S1P3\"").unwrap();
        assert_eq!(id.as_str(), "S1P3");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"S1P3\"");
    }

    #[test]
    fn serde_rejects_invalid() {
        let result: Result<StationId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}

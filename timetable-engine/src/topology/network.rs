//! Network records: stations, platforms and segments.
//!
//! These are the persisted shapes of the fixed infrastructure. They are
//! plain data; [`super::TopologyGraph`] checks the cross-record invariants.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::{PlatformId, SegmentId, StationId};

use super::error::TopologyError;

/// A platform at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    #[serde(rename = "platform_id")]
    pub id: PlatformId,
    pub length_m: f64,
    #[serde(default)]
    pub electrified: bool,
}

impl Platform {
    /// True if a train of `length_m` fits alongside this platform.
    pub fn fits(&self, length_m: f64) -> bool {
        length_m <= self.length_m
    }
}

/// A station with its ordered platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    #[serde(rename = "station_id", alias = "_id")]
    pub id: StationId,
    pub name: String,
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

impl Station {
    /// Look up a platform by id.
    pub fn platform(&self, id: &PlatformId) -> Option<&Platform> {
        self.platforms.iter().find(|p| &p.id == id)
    }

    /// Returns the platforms in their declared order.
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }
}

/// A directed track segment between two stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "segment_id", alias = "_id")]
    pub id: SegmentId,
    pub from: StationId,
    pub to: StationId,
    /// Maximum number of trains on the segment at once.
    pub capacity: u32,
    /// Nominal run time in seconds.
    pub travel_time_sec: u32,
}

impl Segment {
    /// Returns the nominal run time as a Duration.
    pub fn travel_time(&self) -> Duration {
        Duration::seconds(i64::from(self.travel_time_sec))
    }
}

/// The on-disk network document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkDocument {
    pub stations: Vec<Station>,
    pub segments: Vec<Segment>,
}

impl NetworkDocument {
    /// Parse a network document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, TopologyError> {
        serde_json::from_str(text).map_err(|e| TopologyError::Json {
            message: e.to_string(),
        })
    }

    /// Read and parse a network document from disk.
    pub fn load(path: &Path) -> Result<Self, TopologyError> {
        let text = std::fs::read_to_string(path).map_err(|source| TopologyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SEED: &str = r#"{
        "stations": [
            { "station_id": "S2", "name": "WestSide", "platforms": [
                { "platform_id": "S2P1", "length_m": 200, "electrified": true },
                { "platform_id": "S2P2", "length_m": 250, "electrified": false }
            ] }
        ],
        "segments": [
            { "segment_id": "seg_S1_S2", "from": "S1", "to": "S2", "capacity": 1, "travel_time_sec": 1200 }
        ]
    }"#;

    #[test]
    fn parse_document() {
        let doc = NetworkDocument::from_json(SEED).unwrap();
        assert_eq!(doc.stations.len(), 1);
        assert_eq!(doc.stations[0].platforms.len(), 2);
        assert!(doc.stations[0].platforms[0].electrified);
        assert_eq!(doc.segments[0].travel_time(), Duration::minutes(20));
    }

    #[test]
    fn station_accepts_mongo_style_id() {
        let json = r#"{ "_id": "S1", "name": "Central" }"#;
        let station: Station = serde_json::from_str(json).unwrap();
        assert_eq!(station.id.as_str(), "S1");
        assert!(station.platforms.is_empty());
    }

    #[test]
    fn platform_lookup_and_fit() {
        let doc = NetworkDocument::from_json(SEED).unwrap();
        let station = &doc.stations[0];
        let p1 = station.platform(&PlatformId::parse("S2P1").unwrap()).unwrap();
        assert!(p1.fits(200.0));
        assert!(!p1.fits(200.5));
        assert!(station.platform(&PlatformId::parse("S2P9").unwrap()).is_none());
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = NetworkDocument::from_json("{ \"stations\": 3 }").unwrap_err();
        assert!(matches!(err, TopologyError::Json { .. }));
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();

        let doc = NetworkDocument::load(file.path()).unwrap();
        assert_eq!(doc.segments.len(), 1);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NetworkDocument::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, TopologyError::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }
}

//! Shared test data: the three-station morning network.

use chrono::NaiveDate;

use crate::constraints::Constraint;
use crate::domain::{
    EventId, EventKind, PlatformId, Priority, RailTime, SegmentId, StationId, TimeWindow, Train,
    TrainClass, TrainId,
};
use crate::timetable::{DwellPolicy, EventRecord, Timetable};
use crate::topology::{NetworkDocument, TopologyGraph};

pub const NETWORK_JSON: &str = r#"{
    "stations": [
        { "station_id": "S1", "name": "Central", "platforms": [
            { "platform_id": "S1P1", "length_m": 250, "electrified": false },
            { "platform_id": "S1P2", "length_m": 250, "electrified": false },
            { "platform_id": "S1P3", "length_m": 300, "electrified": false },
            { "platform_id": "S1P4", "length_m": 350, "electrified": false }
        ] },
        { "station_id": "S2", "name": "WestSide", "platforms": [
            { "platform_id": "S2P1", "length_m": 200, "electrified": true },
            { "platform_id": "S2P2", "length_m": 250, "electrified": false }
        ] },
        { "station_id": "S3", "name": "EastEnd", "platforms": [
            { "platform_id": "S3P1", "length_m": 220, "electrified": false },
            { "platform_id": "S3P2", "length_m": 220, "electrified": false },
            { "platform_id": "S3P3", "length_m": 300, "electrified": false }
        ] }
    ],
    "segments": [
        { "segment_id": "seg_S1_S2", "from": "S1", "to": "S2", "capacity": 1, "travel_time_sec": 1200 },
        { "segment_id": "seg_S2_S3", "from": "S2", "to": "S3", "capacity": 1, "travel_time_sec": 1500 }
    ]
}"#;

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 20).unwrap()
}

pub fn time(s: &str) -> RailTime {
    RailTime::parse_hhmm(s, date()).unwrap()
}

pub fn window(start: &str, end: &str) -> TimeWindow {
    TimeWindow::new(time(start), time(end)).unwrap()
}

pub fn topology() -> TopologyGraph {
    TopologyGraph::from_document(NetworkDocument::from_json(NETWORK_JSON).unwrap()).unwrap()
}

/// A train whose class follows its priority (0 express, 3+ freight).
pub fn train(id: &str, priority: u8, length_m: f64) -> Train {
    let class = match priority {
        0 => TrainClass::Express,
        p if p >= 3 => TrainClass::Freight,
        _ => TrainClass::Passenger,
    };
    Train {
        id: TrainId::parse(id).unwrap(),
        class,
        priority: Priority(priority),
        avg_speed_kmh: 100.0,
        length_m,
    }
}

#[allow(clippy::too_many_arguments)]
fn record(
    kind: EventKind,
    train: &str,
    event: &str,
    station: &str,
    platform: &str,
    at: &str,
    dwell_sec: u32,
    earliness_sec: u32,
    lateness_sec: u32,
) -> EventRecord {
    EventRecord {
        train_id: TrainId::parse(train).unwrap(),
        event_id: EventId::parse(event).unwrap(),
        kind,
        station_id: StationId::parse(station).unwrap(),
        platform_id: PlatformId::parse(platform).unwrap(),
        scheduled_time: time(at),
        actual_time: None,
        dwell_sec: Some(dwell_sec),
        earliness_sec,
        lateness_sec,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn arrival(
    train: &str,
    event: &str,
    station: &str,
    platform: &str,
    at: &str,
    dwell_sec: u32,
    earliness_sec: u32,
    lateness_sec: u32,
) -> EventRecord {
    record(
        EventKind::Arrival,
        train,
        event,
        station,
        platform,
        at,
        dwell_sec,
        earliness_sec,
        lateness_sec,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn departure(
    train: &str,
    event: &str,
    station: &str,
    platform: &str,
    at: &str,
    dwell_sec: u32,
    earliness_sec: u32,
    lateness_sec: u32,
) -> EventRecord {
    record(
        EventKind::Departure,
        train,
        event,
        station,
        platform,
        at,
        dwell_sec,
        earliness_sec,
        lateness_sec,
    )
}

pub fn seed_trains() -> Vec<Train> {
    vec![
        Train {
            id: TrainId::parse("T001").unwrap(),
            class: TrainClass::Passenger,
            priority: Priority(1),
            avg_speed_kmh: 100.0,
            length_m: 200.0,
        },
        Train {
            id: TrainId::parse("T002").unwrap(),
            class: TrainClass::Freight,
            priority: Priority(3),
            avg_speed_kmh: 60.0,
            length_m: 500.0,
        },
        Train {
            id: TrainId::parse("T003").unwrap(),
            class: TrainClass::Express,
            priority: Priority(0),
            avg_speed_kmh: 120.0,
            length_m: 180.0,
        },
    ]
}

pub fn seed_records() -> Vec<EventRecord> {
    vec![
        departure("T001", "E1", "S1", "S1P2", "08:00", 120, 60, 300),
        arrival("T001", "E2", "S2", "S2P1", "08:20", 300, 60, 300),
        departure("T002", "E1", "S2", "S2P2", "08:10", 180, 120, 600),
        arrival("T002", "E2", "S3", "S3P3", "08:35", 600, 120, 600),
        departure("T003", "E1", "S1", "S1P1", "08:15", 90, 60, 180),
        arrival("T003", "E2", "S2", "S2P1", "08:35", 240, 60, 180),
    ]
}

pub fn seed_timetable(topology: &TopologyGraph) -> Timetable {
    Timetable::build(
        topology,
        seed_trains(),
        seed_records(),
        &DwellPolicy::default(),
    )
    .unwrap()
}

pub fn seed_constraints() -> Vec<Constraint> {
    vec![
        Constraint::Maintenance {
            segment_id: SegmentId::parse("seg_S1_S2").unwrap(),
            start: time("07:30"),
            end: time("07:50"),
            description: Some("Track closed for inspection".to_string()),
        },
        Constraint::Headway {
            segment_id: SegmentId::parse("seg_S2_S3").unwrap(),
            min_gap_sec: 300,
            description: None,
        },
        Constraint::PlatformMaintenance {
            station_id: StationId::parse("S1").unwrap(),
            platform_id: PlatformId::parse("S1P3").unwrap(),
            start: time("08:00"),
            end: time("10:00"),
            description: Some("Platform renovation".to_string()),
        },
    ]
}

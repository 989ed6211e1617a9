use super::*;
use crate::test_fixtures::{at, line_with_zones, running_line, start_car, vin, worker, T0};

mod store;
mod toggle;

// --- Shared test helpers ------------------------------------------------

/// Station snapshot by zone id, panicking on absence.
fn station(line: &Line, zone: u32) -> Station {
    line.list_stations()
        .unwrap()
        .into_iter()
        .find(|s| s.zone_id == ZoneId(zone))
        .unwrap()
}

fn sum_buckets(station: &Station) -> f64 {
    station.time_accumulation.work_minutes
        + station.time_accumulation.starve_minutes
        + station.time_accumulation.block_minutes
}

fn assert_minutes(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected} minutes, got {actual}"
    );
}

#[test]
fn test_list_stations_orders_line_then_maintenance() {
    let (line, _) = line_with_zones(4);
    let stations = line.list_stations().unwrap();
    let ids: Vec<u32> = stations.iter().map(|s| s.zone_id.0).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 0]);
}

#[test]
fn test_station_json_shape() {
    // The daemon and dashboard consume these records as JSON; newtypes must
    // flatten to their inner values.
    let line = running_line(1);
    start_car(&line, 1, "VIN123", T0);

    let json = serde_json::to_value(station(&line, 1)).unwrap();
    assert_eq!(json["zone_id"], 1);
    assert_eq!(json["current_car"]["vin"], "VIN123");
    assert_eq!(json["flying_car"], serde_json::Value::Null);
    assert_eq!(json["time_accumulation"]["work_minutes"], 0.0);
}

#[test]
fn test_new_line_starts_switched_off_and_empty() {
    let (line, _) = line_with_zones(3);
    let system = line.get_system_state().unwrap();
    assert!(!system.is_on);
    for station in line.list_stations().unwrap() {
        assert!(station.current_car.is_none());
        assert!(station.flying_car.is_none());
        assert_minutes(sum_buckets(&station), 0.0);
    }
}

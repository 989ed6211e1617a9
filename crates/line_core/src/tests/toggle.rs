use super::*;

#[test]
fn test_toggle_on_records_actor_and_emits_event() {
    let (line, _) = line_with_zones(2);
    let (state, events) = line
        .toggle_system(true, Some(WorkerId("supervisor".to_string())), at(1))
        .unwrap();

    assert!(state.is_on);
    assert_eq!(state.last_toggled_at, at(1));
    assert_eq!(state.last_toggled_by, Some(WorkerId("supervisor".to_string())));
    assert!(events
        .iter()
        .any(|e| matches!(&e.event, Event::SystemToggled { is_on: true, .. })));
}

#[test]
fn test_toggle_to_same_state_is_noop() {
    let (line, _) = line_with_zones(2);
    let (state, events) = line.toggle_system(false, None, at(5)).unwrap();
    assert!(!state.is_on);
    // Counters and toggle timestamp untouched, nothing emitted.
    assert_eq!(state.last_toggled_at, T0);
    assert_minutes(state.today_off_minutes, 0.0);
    assert!(events.is_empty());
}

#[test]
fn test_toggle_accumulates_interval_into_prior_bucket() {
    let (line, _) = line_with_zones(2);
    line.toggle_system(true, None, at(10)).unwrap();
    let (state, _) = line.toggle_system(false, None, at(25)).unwrap();

    // Off from T0 to +10, on from +10 to +25.
    assert_minutes(state.today_off_minutes, 10.0);
    assert_minutes(state.today_on_minutes, 15.0);
}

#[test]
fn test_scenario_pause_five_minutes_accumulates_nothing() {
    let line = running_line(2);
    start_car(&line, 1, "VIN1", T0);
    line.tick(at(1)).unwrap();

    line.toggle_system(false, None, at(1)).unwrap();
    line.tick(at(3)).unwrap();
    line.tick(at(6)).unwrap();
    line.toggle_system(true, None, at(6)).unwrap();

    // Only the first minute is on the books.
    for station in line.list_stations().unwrap() {
        assert_minutes(sum_buckets(&station), 1.0);
    }

    // A minute after resuming, exactly one more minute lands.
    line.tick(at(7)).unwrap();
    for station in line.list_stations().unwrap() {
        assert_minutes(sum_buckets(&station), 2.0);
    }
}

#[test]
fn test_resume_without_intervening_ticks_credits_no_gap() {
    // The daemon might be down while the line is off; resume alone must
    // still zero out the gap.
    let line = running_line(1);
    start_car(&line, 1, "VIN1", T0);
    line.tick(at(1)).unwrap();
    line.toggle_system(false, None, at(1)).unwrap();
    // No frozen ticks at all between off and on.
    line.toggle_system(true, None, at(30)).unwrap();
    line.tick(at(31)).unwrap();

    assert_minutes(station(&line, 1).time_accumulation.work_minutes, 2.0);
}

#[test]
fn test_reset_statistics_restarts_the_toggle_interval() {
    let (line, _) = line_with_zones(1);
    line.toggle_system(true, None, T0).unwrap();
    line.reset_statistics(at(100)).unwrap();

    // Only the span after the reset lands back in the day counter.
    let (state, _) = line.toggle_system(false, None, at(120)).unwrap();
    assert_minutes(state.today_on_minutes, 20.0);
    assert_minutes(state.today_off_minutes, 0.0);
}

#[test]
fn test_reset_all_zones_clears_occupancy_and_counters() {
    let line = running_line(2);
    start_car(&line, 1, "VIN1", T0);
    start_car(&line, 2, "VIN2", T0);
    line.complete_work(ZoneId(2), &vin("VIN2"), T0).unwrap();
    line.tick(at(5)).unwrap();

    line.reset_all_zones(at(6)).unwrap();

    let stations = line.list_stations().unwrap();
    assert_eq!(stations.len(), 3, "zone set preserved");
    for station in stations {
        assert!(station.current_car.is_none());
        assert!(station.flying_car.is_none());
        assert!(station.current_worker.is_none());
        assert_minutes(sum_buckets(&station), 0.0);
        assert_minutes(station.caused_stop_time.total_minutes, 0.0);
    }
}

#[test]
fn test_reset_statistics_preserves_occupancy() {
    let line = running_line(2);
    start_car(&line, 1, "VIN1", T0);
    line.tick(at(5)).unwrap();

    line.reset_statistics(at(6)).unwrap();

    let z1 = station(&line, 1);
    assert_eq!(z1.current_car.as_ref().unwrap().vin, vin("VIN1"));
    assert_minutes(sum_buckets(&z1), 0.0);
    assert_minutes(z1.caused_stop_time.total_minutes, 0.0);
    assert_eq!(z1.caused_stop_time.last_reset_at, at(6));

    let system = line.get_system_state().unwrap();
    assert_minutes(system.today_on_minutes, 0.0);
    assert_minutes(system.today_off_minutes, 0.0);
}

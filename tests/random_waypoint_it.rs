use std::fs;
use std::path::Path;

use rust_ev_sim::simulation::config::{
    Config, Consumption, Logging, Mobility, MobilitySource, Output, RandomWaypoint, Simulation,
    WriteEvents,
};
use rust_ev_sim::simulation::consumption::engine::RecuperationRule;
use rust_ev_sim::simulation::controller::{run, TRACE_FILE};
use rust_ev_sim::simulation::id::VehicleId;
use rust_ev_sim::simulation::logging::init_std_out_logging_thread_local;

fn create_config(seed: u64, output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.set_simulation(Simulation {
        start_time: 0.,
        end_time: 300.,
    });
    config.set_consumption(Consumption {
        vehicle_attributes: String::from("./assets/bus/vehicleAttributes.xml"),
        update_interval: 2.,
        recuperation: RecuperationRule::Multiplicative,
        baseline: true,
    });
    config.set_mobility(Mobility {
        source: MobilitySource::RandomWaypoint(RandomWaypoint {
            num_vehicles: 5,
            width: 1000.,
            height: 500.,
            min_speed: 1.,
            max_speed: 15.,
            pause_time: 10.,
            seed,
        }),
    });
    config.set_output(Output {
        output_dir: output_dir.to_path_buf(),
        logging: Logging::None,
        write_events: WriteEvents::Csv,
    });
    config
}

#[test]
fn random_waypoint_scenario_is_deterministic() {
    let _guard = init_std_out_logging_thread_local();
    let dir = tempfile::tempdir().unwrap();

    let first = run(&create_config(42, &dir.path().join("first"))).unwrap();
    let second = run(&create_config(42, &dir.path().join("second"))).unwrap();

    // node 4 has no battery, node 2 has no attributes
    let ids: Vec<_> = first.vehicles.iter().map(|v| v.vehicle).collect();
    assert_eq!(
        vec![VehicleId::new(0), VehicleId::new(1), VehicleId::new(3)],
        ids
    );

    for (a, b) in first.vehicles.iter().zip(second.vehicles.iter()) {
        assert_eq!(a.total_energy_consumed_wh, b.total_energy_consumed_wh);
        assert_eq!(a.remaining_energy_wh, b.remaining_energy_wh);
    }

    let first_trace = fs::read_to_string(dir.path().join("first").join(TRACE_FILE)).unwrap();
    let second_trace = fs::read_to_string(dir.path().join("second").join(TRACE_FILE)).unwrap();
    assert_eq!(first_trace, second_trace);
    // ticks at 2, 4, ..., 298 for three vehicles
    assert_eq!(1 + 3 * 149, first_trace.lines().count());
}

#[test]
fn random_waypoint_seed_changes_movement() {
    let _guard = init_std_out_logging_thread_local();
    let dir = tempfile::tempdir().unwrap();

    let first = run(&create_config(1, &dir.path().join("first"))).unwrap();
    let second = run(&create_config(2, &dir.path().join("second"))).unwrap();

    // the bus moves in both runs, but along different routes
    assert_ne!(
        first.vehicles[0].total_energy_consumed_wh,
        second.vehicles[0].total_energy_consumed_wh
    );
}

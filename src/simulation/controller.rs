use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use tracing::{info, warn};

use crate::simulation::config::{
    write_config, CommandLineArgs, Config, ConfigError, MobilitySource, WriteEvents,
};
use crate::simulation::events::{EventsLogger, EventsPublisher};
use crate::simulation::io::csv_events::CsvEnergyTraceWriter;
use crate::simulation::logging::init_logging;
use crate::simulation::mobility::Mobility;
use crate::simulation::simulation::{Simulation, SimulationSummary};
use crate::simulation::vehicles;

pub const TRACE_FILE: &str = "energy_trace.tsv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Parses the command line, sets up logging and runs the configured scenario.
pub fn run_from_args() -> Result<SimulationSummary, ConfigError> {
    let args = CommandLineArgs::parse();
    let config = Config::from_file(&args)?;

    let output_dir = output_dir(&config);
    fs::create_dir_all(&output_dir)?;
    let _guards = init_logging(&config, &output_dir);
    info!("Started with args: {:?}", args);

    run(&config)
}

/// Loads mobility and vehicle attributes, runs the simulation and writes the output files.
///
/// Broken vehicle records and vehicles that can't be admitted are skipped. Everything else that
/// goes wrong ends the run.
pub fn run(config: &Config) -> Result<SimulationSummary, ConfigError> {
    let output_dir = output_dir(config);
    fs::create_dir_all(&output_dir)?;

    let simulation_config = config.simulation();
    let consumption = config.consumption()?;
    let source = resolve_source(config, config.mobility()?.source);
    let mobility = Mobility::from_source(&source, simulation_config.end_time)?;

    let attributes_path = config.resolve(&consumption.vehicle_attributes);
    let profiles = vehicles::io::from_file(&attributes_path)?
        .into_iter()
        .filter_map(|record| match record {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Skipping vehicle record: {e}");
                None
            }
        })
        .sorted_by_key(|(id, _)| *id)
        .collect_vec();

    let mut events = EventsPublisher::new();
    match config.output().write_events {
        WriteEvents::None => {}
        WriteEvents::Csv => events.add_subscriber(Box::new(CsvEnergyTraceWriter::from_file(
            &output_dir.join(TRACE_FILE),
        )?)),
        WriteEvents::Log => events.add_subscriber(Box::new(EventsLogger {})),
    }

    let mut simulation = Simulation::new(
        simulation_config.start_time,
        simulation_config.end_time,
        mobility,
        (&consumption).into(),
        events,
    );
    for (id, profile) in profiles {
        // rejections are logged by the simulation
        let _ = simulation.admit(id, profile);
    }
    simulation.run();

    let summary = simulation.summary();
    for vehicle in &summary.vehicles {
        info!(
            "Vehicle {} total consumed: {} Wh",
            vehicle.vehicle, vehicle.total_energy_consumed_wh
        );
    }

    info!("Writing output files:");
    info!("    ... Summary ...");
    let file = File::create(output_dir.join(SUMMARY_FILE))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &summary)?;
    info!("    ... Config ...");
    write_config(config, &output_dir)?;

    Ok(summary)
}

fn output_dir(config: &Config) -> PathBuf {
    config.resolve(&config.output().output_dir.to_string_lossy())
}

fn resolve_source(config: &Config, source: MobilitySource) -> MobilitySource {
    match source {
        MobilitySource::Ns2Trace { trace_file } => MobilitySource::Ns2Trace {
            trace_file: config.resolve(&trace_file).to_string_lossy().to_string(),
        },
        random => random,
    }
}
